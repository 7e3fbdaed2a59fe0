//! Fuzzy canteen lookup against the locally mirrored OpenMensa canteen list.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use mensa_service_entity::mensa;
use mensa_service_entity::prelude::Mensa;
use parking_lot::Mutex;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{debug, info, warn};

use crate::dialogue::context::DialogueContext;
use crate::error::ServiceError;
use crate::openmensa::OpenMensaClient;

/// Outcome of resolving a fuzzy name/city query. Several matches are a
/// normal result that keeps the dialogue open, not an error.
#[derive(Debug, Clone)]
pub enum Resolution {
    Unique(mensa::Model),
    Ambiguous(Disambiguation),
}

/// Numbered candidate list shown to the user when a query is not unique.
#[derive(Debug, Clone, PartialEq)]
pub struct Disambiguation {
    /// Rendered list, ready to be used as the chat reply.
    pub prompt: String,
    /// Names in display order, stored in the context for `number_selection`.
    pub names: Vec<String>,
}

/// Build the numbered list for ambiguous matches. `open` carries one
/// best-effort open/closed flag per candidate; `None` leaves the entry
/// unannotated.
pub fn build_disambiguation(
    candidates: &[mensa::Model],
    open: &[Option<bool>],
    cap: usize,
) -> Disambiguation {
    let shown = candidates.len().min(cap);
    let mut prompt = String::from("I found the following mensas: \n");
    let mut names = Vec::with_capacity(shown);

    for (i, candidate) in candidates.iter().take(cap).enumerate() {
        match open.get(i).copied().flatten() {
            Some(false) => prompt.push_str(&format!("{}. {} (closed)\n", i + 1, candidate.name)),
            _ => prompt.push_str(&format!("{}. {}\n", i + 1, candidate.name)),
        }
        names.push(candidate.name.clone());
    }

    if candidates.len() > cap {
        prompt.push_str(&format!("and {} more...\n", candidates.len() - cap));
        prompt.push_str("Specify the name of your mensa more clearly, if your mensa is not on the list\n");
    }
    prompt.push_str("Please specify your mensa.");

    Disambiguation { prompt, names }
}

pub struct CanteenDirectory {
    db: Arc<DatabaseConnection>,
    client: Arc<OpenMensaClient>,
    last_refresh: Mutex<Option<Instant>>,
    refresh_interval: Duration,
    max_candidates: usize,
}

impl CanteenDirectory {
    pub fn new(
        db: Arc<DatabaseConnection>,
        client: Arc<OpenMensaClient>,
        refresh_interval: Duration,
        max_candidates: usize,
    ) -> Self {
        Self {
            db,
            client,
            last_refresh: Mutex::new(None),
            refresh_interval,
            max_candidates,
        }
    }

    /// Case-insensitive substring search over name and/or city. Asking for
    /// neither is a caller error.
    pub async fn find(
        &self,
        name: Option<&str>,
        city: Option<&str>,
    ) -> Result<Vec<mensa::Model>, ServiceError> {
        if name.is_none() && city.is_none() {
            return Err(ServiceError::Validation(
                "either a canteen name or a city is required".into(),
            ));
        }

        let mut query = Mensa::find();
        if let Some(name) = name {
            query = query.filter(mensa::Column::Name.contains(name.trim()));
        }
        if let Some(city) = city {
            query = query.filter(mensa::Column::City.contains(city.trim()));
        }
        Ok(query.all(self.db.as_ref()).await?)
    }

    /// Collapse a candidate list to a single canteen or a numbered
    /// disambiguation list. The truncated name list is remembered in the
    /// caller's context so a later `number_selection` turn can index into it.
    pub async fn resolve(
        &self,
        candidates: Vec<mensa::Model>,
        ctx: &mut DialogueContext,
    ) -> Result<Resolution, ServiceError> {
        match candidates.len() {
            0 => Err(ServiceError::NotFound("no canteen matched the query".into())),
            1 => Ok(Resolution::Unique(candidates.into_iter().next().expect("len checked"))),
            _ => {
                let open = self.open_flags(&candidates).await;
                let disambiguation = build_disambiguation(&candidates, &open, self.max_candidates);
                ctx.set_current_selection(disambiguation.names.clone());
                Ok(Resolution::Ambiguous(disambiguation))
            }
        }
    }

    /// Best-effort open/closed annotation for a candidate list. Failures
    /// degrade to an unannotated entry.
    async fn open_flags(&self, candidates: &[mensa::Model]) -> Vec<Option<bool>> {
        let today = Local::now().date_naive();
        let mut flags = Vec::with_capacity(candidates.len().min(self.max_candidates));
        for candidate in candidates.iter().take(self.max_candidates) {
            match self.client.day_closed(candidate.id, today).await {
                Ok(closed) => flags.push(Some(!closed)),
                Err(e) => {
                    debug!("open check failed for mensa {}: {}", candidate.id, e);
                    flags.push(None);
                }
            }
        }
        flags
    }

    /// Mirror the upstream canteen list. No-op when the last refresh is
    /// fresher than the configured interval, so this is safe to call at the
    /// start of every request.
    pub async fn refresh_all(&self) -> Result<usize> {
        {
            let mut last = self.last_refresh.lock();
            if let Some(at) = *last {
                if at.elapsed() < self.refresh_interval {
                    return Ok(0);
                }
            }
            // Claim the slot before the slow part so concurrent requests
            // don't all start paging through the upstream.
            *last = Some(Instant::now());
        }

        info!("refreshing canteen mirror");
        let (first_page, total_pages) = self
            .client
            .canteen_page(1)
            .await
            .context("failed to fetch canteen list")?;

        let mut upserted = self.upsert_canteens(first_page).await?;
        for page in 2..=total_pages {
            let (records, _) = self
                .client
                .canteen_page(page)
                .await
                .with_context(|| format!("failed to fetch canteen list page {}", page))?;
            upserted += self.upsert_canteens(records).await?;
        }

        info!("canteen mirror refreshed, {} records processed", upserted);
        Ok(upserted)
    }

    async fn upsert_canteens(&self, records: Vec<crate::openmensa::CanteenRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let count = records.len();
        let models: Vec<mensa::ActiveModel> = records
            .into_iter()
            .map(|record| mensa::ActiveModel {
                id: Set(record.id),
                name: Set(record.name),
                city: Set(record.city),
                address: Set(record.address.unwrap_or_default()),
            })
            .collect();

        Mensa::insert_many(models)
            .on_conflict(
                OnConflict::column(mensa::Column::Id)
                    .update_columns([mensa::Column::Name, mensa::Column::City, mensa::Column::Address])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| {
                warn!("canteen upsert failed: {}", e);
                e
            })?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canteen(id: i32, name: &str) -> mensa::Model {
        mensa::Model {
            id,
            name: name.to_string(),
            city: "Aachen".to_string(),
            address: String::new(),
        }
    }

    #[test]
    fn test_disambiguation_is_numbered_and_annotated() {
        let candidates = vec![canteen(1, "Mensa Academica"), canteen(2, "Mensa Vita")];
        let open = vec![Some(true), Some(false)];
        let d = build_disambiguation(&candidates, &open, 20);

        assert_eq!(d.names, vec!["Mensa Academica", "Mensa Vita"]);
        assert!(d.prompt.contains("1. Mensa Academica\n"));
        assert!(d.prompt.contains("2. Mensa Vita (closed)\n"));
        assert!(d.prompt.ends_with("Please specify your mensa."));
        assert!(!d.prompt.contains("more..."));
    }

    #[test]
    fn test_disambiguation_annotation_failure_degrades_silently() {
        let candidates = vec![canteen(1, "A"), canteen(2, "B")];
        let d = build_disambiguation(&candidates, &[None, None], 20);
        assert!(d.prompt.contains("1. A\n"));
        assert!(d.prompt.contains("2. B\n"));
        assert!(!d.prompt.contains("closed"));
    }

    #[test]
    fn test_disambiguation_truncates_at_cap() {
        let candidates: Vec<_> = (0..25).map(|i| canteen(i, &format!("Mensa {}", i))).collect();
        let d = build_disambiguation(&candidates, &[], 20);

        assert_eq!(d.names.len(), 20);
        assert!(d.prompt.contains("20. Mensa 19\n"));
        assert!(!d.prompt.contains("21."));
        assert!(d.prompt.contains("and 5 more...\n"));
        assert!(d.prompt.contains("more clearly"));
    }

    #[test]
    fn test_disambiguation_length_is_min_of_matches_and_cap() {
        for total in [2usize, 5, 19, 20, 21, 40] {
            let candidates: Vec<_> = (0..total as i32).map(|i| canteen(i, &format!("M{}", i))).collect();
            let d = build_disambiguation(&candidates, &[], 20);
            assert_eq!(d.names.len(), total.min(20));
        }
    }
}
