pub mod error;
pub mod handler;
pub mod request;
pub mod response;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};
use sea_orm::DatabaseConnection;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::dialogue::DialogueEngine;
use crate::directory::CanteenDirectory;
use crate::dishes::DishIndex;
use crate::menu::MenuService;
use crate::ratings::RatingStore;

#[derive(OpenApi)]
#[openapi(
    paths(
        handler::find_mensas,
        handler::list_dishes,
        handler::get_menu,
        handler::get_ratings,
        handler::add_rating,
        handler::delete_rating,
        handler::chat_menu,
        handler::chat_prepare_review,
        handler::chat_submit_review,
    ),
    info(title = "mensa-service", description = "Canteen menus and dish ratings backed by OpenMensa")
)]
struct ApiDoc;

#[allow(clippy::too_many_arguments)]
pub fn router(
    db: Arc<DatabaseConnection>,
    directory: Arc<CanteenDirectory>,
    dishes: Arc<DishIndex>,
    menu: Arc<MenuService>,
    ratings: Arc<RatingStore>,
    engine: Arc<DialogueEngine>,
) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/mensa/find", get(handler::find_mensas))
        .route("/mensa/dishes", get(handler::list_dishes))
        .route(
            "/mensa/dishes/{id}/ratings",
            get(handler::get_ratings)
                .post(handler::add_rating)
                .delete(handler::delete_rating),
        )
        .route("/mensa/{id}", get(handler::get_menu))
        .route("/mensa/menu", post(handler::chat_menu))
        .route("/mensa/prepareReview", post(handler::chat_prepare_review))
        .route("/mensa/submitReview", post(handler::chat_submit_review))
        .layer(Extension(db))
        .layer(Extension(directory))
        .layer(Extension(dishes))
        .layer(Extension(menu))
        .layer(Extension(ratings))
        .layer(Extension(engine))
}
