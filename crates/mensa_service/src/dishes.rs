//! Deduplicated catalog of every dish the service has seen on a menu.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use mensa_service_entity::dish;
use mensa_service_entity::prelude::Dish;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, FromQueryResult, QuerySelect, Set};
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::ServiceError;
use crate::openmensa::{is_closed_name, Meal};

/// Distinct dish row as exposed on `/mensa/dishes`.
#[derive(Debug, Clone, PartialEq, FromQueryResult, Serialize, ToSchema)]
pub struct DishInfo {
    pub id: i32,
    pub name: String,
    pub category: String,
}

/// Closed sentinels never describe food, and Luxembourgish canteens list
/// drinks (`Boisson`) on the menu. Neither belongs in the dish catalog.
pub fn should_persist(item: &Meal) -> bool {
    !is_closed_name(&item.name) && !item.name.contains("Boisson") && !item.category.contains("Boisson")
}

pub struct DishIndex {
    db: Arc<DatabaseConnection>,
    last_update: DashMap<i32, Instant>,
    cooldown: Duration,
}

impl DishIndex {
    pub fn new(db: Arc<DatabaseConnection>, cooldown: Duration) -> Self {
        Self {
            db,
            last_update: DashMap::new(),
            cooldown,
        }
    }

    /// Persist the dishes of a fetched menu, ignoring conflicts on the
    /// upstream id. Skipped entirely while the per-canteen cooldown holds,
    /// so menu fetches stay cheap. Returns the number of rows sent to the
    /// store (0 when gated).
    pub async fn save_from_menu(&self, mensa_id: i32, items: &[Meal]) -> Result<usize, ServiceError> {
        if let Some(last) = self.last_update.get(&mensa_id) {
            if last.elapsed() < self.cooldown {
                debug!("dish update for mensa {} still on cooldown", mensa_id);
                return Ok(0);
            }
        }
        self.last_update.insert(mensa_id, Instant::now());

        let models: Vec<dish::ActiveModel> = items
            .iter()
            .filter(|item| should_persist(item))
            .map(|item| dish::ActiveModel {
                id: Set(item.id),
                mensa_id: Set(mensa_id),
                name: Set(item.name.clone()),
                category: Set(item.category.clone()),
            })
            .collect();

        if models.is_empty() {
            return Ok(0);
        }
        let count = models.len();

        Dish::insert_many(models)
            .on_conflict(OnConflict::column(dish::Column::Id).do_nothing().to_owned())
            .exec_without_returning(self.db.as_ref())
            .await?;

        info!("saved {} dishes for mensa {}", count, mensa_id);
        Ok(count)
    }

    /// All dishes ever seen, distinct by (name, id, category).
    pub async fn list(&self) -> Result<Vec<DishInfo>, ServiceError> {
        Ok(Dish::find()
            .select_only()
            .column(dish::Column::Id)
            .column(dish::Column::Name)
            .column(dish::Column::Category)
            .distinct()
            .into_model::<DishInfo>()
            .all(self.db.as_ref())
            .await?)
    }
}

/// First menu item whose category or name contains the keyword,
/// case-insensitively.
pub fn match_keyword<'a>(items: &'a [Meal], keyword: &str) -> Option<&'a Meal> {
    let keyword = keyword.to_lowercase();
    items
        .iter()
        .find(|item| item.category.to_lowercase().contains(&keyword) || item.name.to_lowercase().contains(&keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mensa_service_migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    fn meal(id: i32, name: &str, category: &str) -> Meal {
        Meal {
            id,
            name: name.into(),
            category: category.into(),
        }
    }

    #[test]
    fn test_should_persist_filters_sentinels_and_beverages() {
        assert!(should_persist(&meal(1, "Schnitzel", "Klassiker")));
        assert!(!should_persist(&meal(2, "geschlossen", "Info")));
        assert!(!should_persist(&meal(3, "closed", "Info")));
        assert!(!should_persist(&meal(4, "Boisson du jour", "Getränke")));
        assert!(!should_persist(&meal(5, "Cola", "Boisson")));
    }

    #[tokio::test]
    async fn test_save_from_menu_writes_once_within_cooldown() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let index = DishIndex::new(Arc::new(db), Duration::from_secs(6 * 60 * 60));

        let items = vec![
            meal(1, "Schnitzel", "Klassiker"),
            meal(2, "Gemüsepfanne", "Vegetarisch"),
            meal(3, "geschlossen", "Info"),
        ];
        assert_eq!(index.save_from_menu(187, &items).await.unwrap(), 2);
        assert_eq!(index.list().await.unwrap().len(), 2);

        // Second save inside the cooldown must not touch the store.
        assert_eq!(index.save_from_menu(187, &items).await.unwrap(), 0);
        assert_eq!(index.list().await.unwrap().len(), 2);

        // Another canteen is gated independently.
        let other = vec![meal(4, "Pizza Salami", "Pizza")];
        assert_eq!(index.save_from_menu(188, &other).await.unwrap(), 1);
        assert_eq!(index.list().await.unwrap().len(), 3);
    }

    #[test]
    fn test_match_keyword_on_category_and_name() {
        let items = vec![
            meal(1, "Spaghetti Bolognese", "Pasta"),
            meal(2, "Gemüsepfanne", "Vegetarisch"),
        ];
        assert_eq!(match_keyword(&items, "vegetarisch").unwrap().id, 2);
        assert_eq!(match_keyword(&items, "PASTA").unwrap().id, 1);
        assert_eq!(match_keyword(&items, "spaghetti").unwrap().id, 1);
        assert!(match_keyword(&items, "pizza").is_none());
    }
}
