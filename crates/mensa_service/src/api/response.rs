use mensa_service_entity::{mensa, review};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct MensaInfo {
    pub id: i32,
    pub name: String,
    pub city: String,
    pub address: String,
}

impl From<mensa::Model> for MensaInfo {
    fn from(m: mensa::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            city: m.city,
            address: m.address,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RatingResponse {
    pub id: i32,
    pub author: String,
    pub stars: i32,
    pub comment: Option<String>,
    pub timestamp: String,
}

impl From<review::Model> for RatingResponse {
    fn from(r: review::Model) -> Self {
        Self {
            id: r.id,
            author: r.author,
            stars: r.stars,
            comment: r.comment,
            timestamp: r.timestamp,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteRatingResponse {
    pub deleted: u64,
}
