use chrono::NaiveDate;
use thiserror::Error;

/// Error taxonomy shared by every component behind the HTTP surface.
///
/// Disambiguation is intentionally absent: resolving a fuzzy canteen query to
/// several candidates is a normal outcome and modelled as
/// [`crate::directory::Resolution::Ambiguous`] instead of an error.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("no matching record: {0}")]
    NotFound(String),
    #[error("canteen {mensa_id} is closed on {date}")]
    Closed { mensa_id: i32, date: NaiveDate },
    #[error("upstream request failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("database error: {0}")]
    Store(#[from] sea_orm::DbErr),
}

impl ServiceError {
    /// True when the upstream API could not be reached at all, as opposed to
    /// answering with garbage or a non-2xx status.
    pub fn is_unreachable(&self) -> bool {
        match self {
            ServiceError::Fetch(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
