//! Persisted dish ratings with aggregate retrieval.

use std::sync::Arc;

use chrono::Utc;
use mensa_service_entity::prelude::{Dish, Review};
use mensa_service_entity::{dish, mensa, review};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QuerySelect, RelationTrait, Set,
};
use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::error::ServiceError;

/// A rating joined with its dish and canteen, as shown to API consumers.
#[derive(Debug, Clone, PartialEq, FromQueryResult, Serialize, ToSchema)]
pub struct RatingRow {
    pub author: String,
    pub stars: i32,
    pub comment: Option<String>,
    pub timestamp: String,
    pub category: String,
    pub mensa_name: String,
    pub city: String,
}

pub struct RatingStore {
    db: Arc<DatabaseConnection>,
}

impl RatingStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persist a rating. The dish must already be known to the catalog and
    /// stars must be within 1..=5; the author defaults to `anonymous`.
    pub async fn add(
        &self,
        dish_id: i32,
        mensa_id: i32,
        stars: i32,
        author: Option<&str>,
        comment: Option<&str>,
    ) -> Result<review::Model, ServiceError> {
        if !(1..=5).contains(&stars) {
            return Err(ServiceError::Validation("stars must be between 1 and 5".into()));
        }
        if Dish::find_by_id(dish_id).one(self.db.as_ref()).await?.is_none() {
            return Err(ServiceError::NotFound(format!("dish {} not found", dish_id)));
        }

        let model = review::ActiveModel {
            author: Set(author.filter(|a| !a.is_empty()).unwrap_or("anonymous").to_string()),
            mensa_id: Set(mensa_id),
            dish_id: Set(dish_id),
            stars: Set(stars),
            comment: Set(comment.map(str::to_string)),
            timestamp: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await?;

        info!(review_id = model.id, dish_id, mensa_id, stars, "rating added");
        Ok(model)
    }

    /// Delete a rating by its id. Returns the number of deleted rows.
    pub async fn delete(&self, review_id: i32) -> Result<u64, ServiceError> {
        let result = Review::delete_by_id(review_id).exec(self.db.as_ref()).await?;
        info!(review_id, "rating deleted");
        Ok(result.rows_affected)
    }

    /// All ratings for a dish, joined with dish category and canteen
    /// name/city.
    pub async fn list_for_dish(&self, dish_id: i32) -> Result<Vec<RatingRow>, ServiceError> {
        Ok(Review::find()
            .select_only()
            .column(review::Column::Author)
            .column(review::Column::Stars)
            .column(review::Column::Comment)
            .column(review::Column::Timestamp)
            .column(dish::Column::Category)
            .column_as(mensa::Column::Name, "mensa_name")
            .column(mensa::Column::City)
            .join(JoinType::InnerJoin, review::Relation::Dish.def())
            .join(JoinType::InnerJoin, review::Relation::Mensa.def())
            .filter(review::Column::DishId.eq(dish_id))
            .into_model::<RatingRow>()
            .all(self.db.as_ref())
            .await?)
    }

    /// Average star rating for a dish. `-1.0` when there are no reviews,
    /// `-2.0` on a store failure; callers must treat negatives as "no usable
    /// average", never as a real rating.
    pub async fn average(&self, dish_id: i32) -> f32 {
        match self.average_inner(dish_id).await {
            Ok(Some(avg)) => avg as f32,
            Ok(None) => -1.0,
            Err(e) => {
                error!("failed to compute average for dish {}: {}", dish_id, e);
                -2.0
            }
        }
    }

    async fn average_inner(&self, dish_id: i32) -> Result<Option<f64>, DbErr> {
        let stars: Vec<i32> = Review::find()
            .select_only()
            .column(review::Column::Stars)
            .filter(review::Column::DishId.eq(dish_id))
            .into_tuple()
            .all(self.db.as_ref())
            .await?;
        if stars.is_empty() {
            return Ok(None);
        }
        Ok(Some(stars.iter().map(|s| *s as f64).sum::<f64>() / stars.len() as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mensa_service_migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn store_with_seed() -> RatingStore {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        mensa::ActiveModel {
            id: Set(187),
            name: Set("Mensa Academica".into()),
            city: Set("Aachen".into()),
            address: Set("Pontwall 3".into()),
        }
        .insert(&db)
        .await
        .unwrap();

        dish::ActiveModel {
            id: Set(42),
            mensa_id: Set(187),
            name: Set("Schnitzel".into()),
            category: Set("Klassiker".into()),
        }
        .insert(&db)
        .await
        .unwrap();

        RatingStore::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_stars_out_of_range_fail_validation() {
        let store = store_with_seed().await;
        for stars in [0, -1, 6, 42] {
            let err = store.add(42, 187, stars, Some("alice"), None).await.unwrap_err();
            assert_matches!(err, ServiceError::Validation(_));
        }
        for stars in 1..=5 {
            store.add(42, 187, stars, Some("alice"), None).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_unknown_dish_fails_not_found() {
        let store = store_with_seed().await;
        let err = store.add(999, 187, 3, None, None).await.unwrap_err();
        assert_matches!(err, ServiceError::NotFound(_));
    }

    #[tokio::test]
    async fn test_add_list_average_round_trip() {
        let store = store_with_seed().await;
        assert_eq!(store.average(42).await, -1.0);

        let saved = store.add(42, 187, 5, Some("alice"), Some("great")).await.unwrap();
        assert_eq!(saved.author, "alice");
        assert_eq!(saved.stars, 5);

        let rows = store.list_for_dish(42).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].author, "alice");
        assert_eq!(rows[0].comment.as_deref(), Some("great"));
        assert_eq!(rows[0].category, "Klassiker");
        assert_eq!(rows[0].mensa_name, "Mensa Academica");
        assert_eq!(rows[0].city, "Aachen");

        assert!((store.average(42).await - 5.0).abs() < f32::EPSILON);

        store.add(42, 187, 3, None, None).await.unwrap();
        assert!((store.average(42).await - 4.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_anonymous_author_default_and_delete() {
        let store = store_with_seed().await;
        let saved = store.add(42, 187, 4, None, None).await.unwrap();
        assert_eq!(saved.author, "anonymous");

        assert_eq!(store.delete(saved.id).await.unwrap(), 1);
        assert!(store.list_for_dish(42).await.unwrap().is_empty());
        assert_eq!(store.delete(saved.id).await.unwrap(), 0);
    }
}
