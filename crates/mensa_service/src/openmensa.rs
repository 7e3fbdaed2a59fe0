//! OpenMensa v2 API client.
//!
//! Covers the three endpoints the service needs:
//! 1. the paginated canteen list (`/canteens?page=N`, `x-total-pages` header)
//! 2. the daily menu of a canteen (`/canteens/{id}/days/{date}/meals`)
//! 3. the lightweight open/closed check (`/canteens/{id}/days/{date}`)

use chrono::{Datelike, Days, NaiveDate, Weekday};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::config::{CONNECT_TIMEOUT, REQUEST_TIMEOUT};
use crate::error::ServiceError;

/// Dish names signalling that a counter serves nothing that day.
const CLOSED_SENTINELS: [&str; 2] = ["closed", "geschlossen"];

/// A single item of a daily menu as returned by the meals endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Meal {
    pub id: i32,
    pub name: String,
    pub category: String,
}

/// One canteen record of the paginated canteen list.
#[derive(Debug, Clone, Deserialize)]
pub struct CanteenRecord {
    pub id: i32,
    pub name: String,
    pub city: String,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DayStatus {
    closed: bool,
}

/// The menu date a request resolves to, with a flag for the weekend shift so
/// the chat layer can explain why a Saturday query shows Monday's menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuDate {
    pub date: NaiveDate,
    pub weekend_shifted: bool,
}

impl MenuDate {
    pub fn weekday(&self) -> String {
        self.date.format("%A").to_string()
    }
}

pub fn is_closed_name(name: &str) -> bool {
    let lowered = name.to_lowercase();
    CLOSED_SENTINELS.iter().any(|s| lowered.contains(s))
}

/// A non-empty menu where every item carries a closed sentinel means the
/// canteen is closed even when the open/closed endpoint claims otherwise.
pub fn menu_is_closed(items: &[Meal]) -> bool {
    !items.is_empty() && items.iter().all(|item| is_closed_name(&item.name))
}

/// Resolve the date a menu request refers to.
///
/// An explicit ISO date wins and is used as-is. Otherwise `today`,
/// `tomorrow` and English weekday names are interpreted relative to the
/// injected `today`, and a result landing on a weekend is shifted to the
/// following Monday since canteens are closed then.
pub fn effective_menu_date(today: NaiveDate, requested: Option<&str>) -> MenuDate {
    let requested = requested.map(str::trim).filter(|s| !s.is_empty());

    if let Some(raw) = requested {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return MenuDate {
                date,
                weekend_shifted: false,
            };
        }
    }

    let base = match requested {
        None => today,
        Some(raw) if raw.eq_ignore_ascii_case("today") => today,
        Some(raw) if raw.eq_ignore_ascii_case("tomorrow") => today + Days::new(1),
        Some(raw) => match raw.parse::<Weekday>() {
            Ok(weekday) => {
                let delta =
                    weekday.num_days_from_monday() as i64 - today.weekday().num_days_from_monday() as i64;
                today + chrono::Duration::days(delta)
            }
            Err(_) => {
                debug!("unrecognized day {:?}, falling back to today", raw);
                today
            }
        },
    };

    match base.weekday() {
        Weekday::Sat => MenuDate {
            date: base + Days::new(2),
            weekend_shifted: true,
        },
        Weekday::Sun => MenuDate {
            date: base + Days::new(1),
            weekend_shifted: true,
        },
        _ => MenuDate {
            date: base,
            weekend_shifted: false,
        },
    }
}

/// Thin HTTP client for the OpenMensa API.
pub struct OpenMensaClient {
    client: Client,
    base_url: String,
}

impl OpenMensaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .user_agent(concat!("mensa-service-rs/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build http client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch the menu of a canteen for a date. Returns the items as-is;
    /// closed detection and display filtering are caller concerns.
    pub async fn daily_menu(&self, mensa_id: i32, date: NaiveDate) -> Result<Vec<Meal>, ServiceError> {
        let url = format!("{}/canteens/{}/days/{}/meals", self.base_url, mensa_id, date);
        debug!("fetching menu: {}", url);
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ServiceError::Closed { mensa_id, date });
        }
        let meals = response.error_for_status()?.json::<Vec<Meal>>().await?;
        Ok(meals)
    }

    /// Ask the upstream whether a canteen is marked closed on a date.
    pub async fn day_closed(&self, mensa_id: i32, date: NaiveDate) -> Result<bool, ServiceError> {
        let url = format!("{}/canteens/{}/days/{}", self.base_url, mensa_id, date);
        debug!("checking open state: {}", url);
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            // No day record means no menu, which the callers treat as closed.
            return Ok(true);
        }
        let status = response.error_for_status()?.json::<DayStatus>().await?;
        Ok(status.closed)
    }

    /// Fetch one page of the canteen list. Returns the records together with
    /// the total page count from the `x-total-pages` header.
    pub async fn canteen_page(&self, page: u32) -> Result<(Vec<CanteenRecord>, u32), ServiceError> {
        let url = format!("{}/canteens?page={}", self.base_url, page);
        debug!("fetching canteen list: {}", url);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        let total_pages = response
            .headers()
            .get("x-total-pages")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);
        let records = response.json::<Vec<CanteenRecord>>().await?;
        Ok((records, total_pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_weekday_date_unchanged() {
        // 2024-03-06 is a Wednesday.
        let resolved = effective_menu_date(date("2024-03-06"), None);
        assert_eq!(resolved.date, date("2024-03-06"));
        assert!(!resolved.weekend_shifted);
    }

    #[test]
    fn test_saturday_shifts_to_monday() {
        // 2024-03-09 is a Saturday, the following Monday is the 11th.
        let resolved = effective_menu_date(date("2024-03-09"), None);
        assert_eq!(resolved.date, date("2024-03-11"));
        assert!(resolved.weekend_shifted);
    }

    #[test]
    fn test_sunday_shifts_to_monday() {
        let resolved = effective_menu_date(date("2024-03-10"), None);
        assert_eq!(resolved.date, date("2024-03-11"));
        assert!(resolved.weekend_shifted);
    }

    #[test]
    fn test_tomorrow_and_weekday_names() {
        let wednesday = date("2024-03-06");
        assert_eq!(
            effective_menu_date(wednesday, Some("tomorrow")).date,
            date("2024-03-07")
        );
        assert_eq!(
            effective_menu_date(wednesday, Some("Friday")).date,
            date("2024-03-08")
        );
        // Asking for Saturday lands on the following Monday.
        let saturday = effective_menu_date(wednesday, Some("Saturday"));
        assert_eq!(saturday.date, date("2024-03-11"));
        assert!(saturday.weekend_shifted);
    }

    #[test]
    fn test_explicit_date_wins_without_shift() {
        let resolved = effective_menu_date(date("2024-03-06"), Some("2024-03-09"));
        assert_eq!(resolved.date, date("2024-03-09"));
        assert!(!resolved.weekend_shifted);
    }

    #[test]
    fn test_closed_sentinel_detection() {
        assert!(is_closed_name("geschlossen"));
        assert!(is_closed_name("Mensa heute GESCHLOSSEN"));
        assert!(is_closed_name("closed"));
        assert!(!is_closed_name("Schnitzel"));

        let closed_menu = vec![
            Meal {
                id: 1,
                name: "closed".into(),
                category: "Info".into(),
            },
            Meal {
                id: 2,
                name: "geschlossen".into(),
                category: "Info".into(),
            },
        ];
        assert!(menu_is_closed(&closed_menu));

        let open_menu = vec![
            Meal {
                id: 1,
                name: "closed".into(),
                category: "Info".into(),
            },
            Meal {
                id: 2,
                name: "Schnitzel".into(),
                category: "Klassiker".into(),
            },
        ];
        assert!(!menu_is_closed(&open_menu));
        assert!(!menu_is_closed(&[]));
    }
}
