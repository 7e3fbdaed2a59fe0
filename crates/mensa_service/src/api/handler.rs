use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Json, Path, Query};
use axum::response::{IntoResponse, Response};
use chrono::Local;
use mensa_service_entity::prelude::Mensa;
use sea_orm::{DatabaseConnection, EntityTrait};
use tracing::warn;

use crate::api::error::ApiError;
use crate::api::request::{AddRatingRequest, DeleteRatingQuery, FindQuery, MenuQuery};
use crate::api::response::{DeleteRatingResponse, MensaInfo, RatingResponse};
use crate::dialogue::{format, ChatReply, ChatRequest, DialogueEngine};
use crate::directory::CanteenDirectory;
use crate::dishes::{DishIndex, DishInfo};
use crate::error::ServiceError;
use crate::menu::MenuService;
use crate::openmensa::{effective_menu_date, Meal};
use crate::ratings::{RatingRow, RatingStore};

#[utoipa::path(
    get,
    path = "/mensa/find",
    params(FindQuery),
    responses(
        (status = 200, body = Vec<MensaInfo>),
        (status = 400, description = "neither name nor city given"),
    )
)]
pub async fn find_mensas(
    Extension(directory): Extension<Arc<CanteenDirectory>>,
    Query(query): Query<FindQuery>,
) -> Result<Json<Vec<MensaInfo>>, ApiError> {
    if let Err(e) = directory.refresh_all().await {
        warn!("canteen refresh failed: {:#}", e);
    }
    let canteens = directory.find(query.name.as_deref(), query.city.as_deref()).await?;
    Ok(Json(canteens.into_iter().map(MensaInfo::from).collect()))
}

#[utoipa::path(
    get,
    path = "/mensa/dishes",
    responses((status = 200, body = Vec<DishInfo>))
)]
pub async fn list_dishes(Extension(dishes): Extension<Arc<DishIndex>>) -> Result<Json<Vec<DishInfo>>, ApiError> {
    Ok(Json(dishes.list().await?))
}

#[utoipa::path(
    get,
    path = "/mensa/{id}",
    params(
        ("id" = i32, Path, description = "canteen id"),
        MenuQuery,
    ),
    responses(
        (status = 200, body = Vec<Meal>),
        (status = 404, description = "unknown canteen or closed on that day"),
        (status = 502, description = "upstream menu service failed"),
    )
)]
pub async fn get_menu(
    Path(id): Path<i32>,
    Query(query): Query<MenuQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(menu): Extension<Arc<MenuService>>,
    Extension(ratings): Extension<Arc<RatingStore>>,
) -> Result<Response, ApiError> {
    let canteen = Mensa::find_by_id(id)
        .one(db.as_ref())
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| ServiceError::NotFound(format!("mensa {} not found", id)))?;

    let menu_date = effective_menu_date(Local::now().date_naive(), query.date.as_deref());
    let items = menu.fetch_menu(canteen.id, menu_date.date).await?;

    if query.format.as_deref() == Some("html") {
        let mut averages = HashMap::new();
        for item in &items {
            let avg = ratings.average(item.id).await;
            if avg >= 1.0 {
                averages.insert(item.id, avg);
            }
        }
        let mut text = format::menu_header(&canteen.name, &menu_date);
        text.push_str(&format::render_menu(&items, &averages));
        return Ok(text.into_response());
    }
    Ok(Json(items).into_response())
}

#[utoipa::path(
    get,
    path = "/mensa/dishes/{id}/ratings",
    params(("id" = i32, Path, description = "dish id")),
    responses((status = 200, body = Vec<RatingRow>))
)]
pub async fn get_ratings(
    Path(id): Path<i32>,
    Extension(ratings): Extension<Arc<RatingStore>>,
) -> Result<Json<Vec<RatingRow>>, ApiError> {
    Ok(Json(ratings.list_for_dish(id).await?))
}

#[utoipa::path(
    post,
    path = "/mensa/dishes/{id}/ratings",
    params(("id" = i32, Path, description = "dish id")),
    request_body = AddRatingRequest,
    responses(
        (status = 200, body = RatingResponse),
        (status = 400, description = "stars out of range"),
        (status = 404, description = "unknown dish"),
    )
)]
pub async fn add_rating(
    Path(id): Path<i32>,
    Extension(ratings): Extension<Arc<RatingStore>>,
    Json(body): Json<AddRatingRequest>,
) -> Result<Json<RatingResponse>, ApiError> {
    let saved = ratings
        .add(id, body.mensa_id, body.stars, body.author.as_deref(), body.comment.as_deref())
        .await?;
    Ok(Json(saved.into()))
}

#[utoipa::path(
    delete,
    path = "/mensa/dishes/{id}/ratings",
    params(
        ("id" = i32, Path, description = "dish id"),
        DeleteRatingQuery,
    ),
    responses(
        (status = 200, body = DeleteRatingResponse),
        (status = 404, description = "no such review"),
    )
)]
pub async fn delete_rating(
    Path(_dish_id): Path<i32>,
    Query(query): Query<DeleteRatingQuery>,
    Extension(ratings): Extension<Arc<RatingStore>>,
) -> Result<Json<DeleteRatingResponse>, ApiError> {
    let deleted = ratings.delete(query.id).await?;
    if deleted == 0 {
        return Err(ServiceError::NotFound(format!("review {} not found", query.id)).into());
    }
    Ok(Json(DeleteRatingResponse { deleted }))
}

#[utoipa::path(
    post,
    path = "/mensa/menu",
    request_body = ChatRequest,
    responses((status = 200, body = ChatReply))
)]
pub async fn chat_menu(
    Extension(engine): Extension<Arc<DialogueEngine>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatReply> {
    Json(engine.menu(request).await)
}

#[utoipa::path(
    post,
    path = "/mensa/prepareReview",
    request_body = ChatRequest,
    responses((status = 200, body = ChatReply))
)]
pub async fn chat_prepare_review(
    Extension(engine): Extension<Arc<DialogueEngine>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatReply> {
    Json(engine.prepare_review(request).await)
}

#[utoipa::path(
    post,
    path = "/mensa/submitReview",
    request_body = ChatRequest,
    responses((status = 200, body = ChatReply))
)]
pub async fn chat_submit_review(
    Extension(engine): Extension<Arc<DialogueEngine>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatReply> {
    Json(engine.submit_review(request).await)
}
