//! Menu fetching: the OpenMensa client composed with the dish index.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::dishes::{match_keyword, DishIndex};
use crate::error::ServiceError;
use crate::openmensa::{menu_is_closed, Meal, OpenMensaClient};

pub struct MenuService {
    client: Arc<OpenMensaClient>,
    dishes: Arc<DishIndex>,
}

impl MenuService {
    pub fn new(client: Arc<OpenMensaClient>, dishes: Arc<DishIndex>) -> Self {
        Self { client, dishes }
    }

    /// Fetch a canteen's menu for a date.
    ///
    /// Fails with [`ServiceError::Closed`] when the upstream day record says
    /// closed or when every returned item is a closed sentinel. A successful
    /// fetch feeds the dish index as a side effect (rate-limited there); the
    /// items themselves are returned unfiltered, display filtering is the
    /// caller's business.
    pub async fn fetch_menu(&self, mensa_id: i32, date: NaiveDate) -> Result<Vec<Meal>, ServiceError> {
        if self.client.day_closed(mensa_id, date).await? {
            return Err(ServiceError::Closed { mensa_id, date });
        }

        let items = self.client.daily_menu(mensa_id, date).await?;
        if menu_is_closed(&items) {
            return Err(ServiceError::Closed { mensa_id, date });
        }

        info!(mensa_id, %date, "menu fetched");
        if let Err(e) = self.dishes.save_from_menu(mensa_id, &items).await {
            // Persisting the catalog must never break a menu request.
            warn!("failed to save dishes for mensa {}: {}", mensa_id, e);
        }
        Ok(items)
    }

    /// First item of the current menu whose category or name matches the
    /// keyword. Used by the review dialogue to turn "the vegetarian one"
    /// into a concrete dish.
    pub async fn find_by_keyword(
        &self,
        mensa_id: i32,
        keyword: &str,
        date: NaiveDate,
    ) -> Result<Meal, ServiceError> {
        let items = self.fetch_menu(mensa_id, date).await?;
        match_keyword(&items, keyword)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("no dish matched {:?}", keyword)))
    }
}
