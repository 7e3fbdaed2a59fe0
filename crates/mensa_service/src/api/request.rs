use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct FindQuery {
    pub name: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MenuQuery {
    /// `html` for the rendered chat text, anything else for raw JSON.
    pub format: Option<String>,
    /// ISO date, `today`, `tomorrow` or an English weekday name.
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddRatingRequest {
    pub author: Option<String>,
    pub stars: i32,
    pub comment: Option<String>,
    #[serde(rename = "mensaId")]
    pub mensa_id: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeleteRatingQuery {
    /// Id of the review to delete.
    pub id: i32,
}
