//! The bot-facing dialogue layer: menu queries and the two-phase review
//! conversation, carried across stateless HTTP turns via the context store.

pub mod context;
pub mod format;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::dialogue::context::{
    ContextStore, ContextValue, KEY_CATEGORY, KEY_CITY, KEY_CURRENT_SELECTION, KEY_DEFAULT_MENSA, KEY_INTENT,
    KEY_MENSA, KEY_NUMBER, KEY_REVIEW_START, KEY_SELECTED_DISH, KEY_SELECTED_MENSA, KEY_SELECTED_STARS,
};
use crate::directory::{CanteenDirectory, Resolution};
use crate::error::ServiceError;
use crate::menu::MenuService;
use crate::openmensa::effective_menu_date;
use crate::ratings::RatingStore;

/// Inbound chat message as sent by the bot framework. Decoded once at the
/// boundary; everything behind it works with typed fields.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ChatRequest {
    pub email: Option<String>,
    pub channel: Option<String>,
    pub intent: Option<String>,
    pub mensa: Option<String>,
    pub city: Option<String>,
    pub category: Option<String>,
    pub number: Option<f64>,
    pub msg: Option<String>,
    pub day: Option<String>,
}

impl ChatRequest {
    /// External identity the conversation context is keyed by.
    pub fn user_key(&self) -> Option<&str> {
        self.email.as_deref().or(self.channel.as_deref())
    }

    pub fn intent(&self) -> Option<Intent> {
        self.intent.as_deref().and_then(|s| Intent::from_str(s).ok())
    }

    pub fn number_as_i64(&self) -> Option<i64> {
        self.number.map(|n| n as i64)
    }
}

/// Dialogue step tags understood by the engine. Unknown tags fall through to
/// the default handling of each operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
pub enum Intent {
    #[strum(serialize = "menu")]
    Menu,
    #[strum(serialize = "quit")]
    Quit,
    #[strum(serialize = "rejection")]
    Rejection,
    #[strum(serialize = "confirmation")]
    Confirmation,
    #[strum(serialize = "number_selection")]
    NumberSelection,
    #[strum(serialize = "chooseMensaAndMeal")]
    ChooseMensaAndMeal,
    #[strum(serialize = "stars")]
    Stars,
}

/// Chat reply: the text is shown verbatim, `closeContext` tells the bot
/// framework whether the conversation is finished.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChatReply {
    pub text: String,
    #[serde(rename = "closeContext")]
    pub close_context: bool,
}

impl ChatReply {
    pub fn open(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            close_context: false,
        }
    }

    pub fn closing(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            close_context: true,
        }
    }
}

/// A user-facing failure of a dialogue turn. Rendered verbatim as the reply
/// text, never as an HTTP error.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatError {
    pub text: String,
    pub close_context: bool,
}

impl ChatError {
    pub fn open(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            close_context: false,
        }
    }

    pub fn closing(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            close_context: true,
        }
    }

    fn problem() -> Self {
        Self::closing("Sorry, a problem occured 🙁")
    }
}

impl From<ChatError> for ChatReply {
    fn from(e: ChatError) -> Self {
        ChatReply {
            text: e.text,
            close_context: e.close_context,
        }
    }
}

type ChatResult = Result<ChatReply, ChatError>;

pub struct DialogueEngine {
    pub directory: Arc<CanteenDirectory>,
    pub menu: Arc<MenuService>,
    pub ratings: Arc<RatingStore>,
    pub contexts: Arc<ContextStore>,
}

impl DialogueEngine {
    pub fn new(
        directory: Arc<CanteenDirectory>,
        menu: Arc<MenuService>,
        ratings: Arc<RatingStore>,
        contexts: Arc<ContextStore>,
    ) -> Self {
        Self {
            directory,
            menu,
            ratings,
            contexts,
        }
    }

    /// The `menu` bot operation.
    pub async fn menu(&self, request: ChatRequest) -> ChatReply {
        let start = Instant::now();
        let reply = match self.menu_turn(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                debug!("menu turn ended with chat error: {}", e.text);
                e.into()
            }
        };
        info!(
            user = request.user_key().unwrap_or("unknown"),
            elapsed_ms = start.elapsed().as_millis() as u64,
            task = "getMenu",
            "chat turn handled"
        );
        reply
    }

    async fn menu_turn(&self, request: &ChatRequest) -> ChatResult {
        let user_key = request
            .user_key()
            .ok_or_else(|| ChatError::closing("I could not figure out who you are 🙁 Please provide an email or channel."))?;

        // Cheap no-op unless the 30 day interval has elapsed.
        if let Err(e) = self.directory.refresh_all().await {
            warn!("canteen refresh failed: {:#}", e);
        }

        let handle = self.contexts.entry(user_key);
        let mut ctx = handle.lock().await;

        let mut mensa_name = request.mensa.clone();
        let city = request.city.clone();

        match request.intent() {
            Some(Intent::Quit) => {
                drop(ctx);
                self.contexts.remove(user_key);
                return Ok(ChatReply::closing("Alright. 🙃"));
            }
            Some(Intent::Rejection) => return Ok(ChatReply::closing("ok.")),
            Some(Intent::Confirmation) => {
                if let Some(selected) = ctx.selected_mensa().cloned() {
                    ctx.set(KEY_DEFAULT_MENSA, ContextValue::Text(selected.name));
                    return Ok(ChatReply::closing("Alright. Done! 🎉"));
                }
                return Ok(ChatReply::closing("ok."));
            }
            Some(Intent::NumberSelection) => {
                if let Some(selection) = ctx.current_selection().map(<[String]>::to_vec) {
                    let index = request.number_as_i64().unwrap_or(0) - 1;
                    if index >= 0 && (index as usize) < selection.len() {
                        mensa_name = Some(selection[index as usize].clone());
                    }
                    // An out-of-range number leaves the name unset, so the
                    // turn falls back to the default mensa or asks again.
                    // Either way the stale selection list is dropped.
                    ctx.remove(KEY_CURRENT_SELECTION);
                }
            }
            Some(Intent::Menu) => {
                // Two menu intents in a row: the user is now answering the
                // "which mensa?" question, so the raw message is the name.
                if mensa_name.is_none() && ctx.intent() == Some("menu") {
                    mensa_name = request.msg.clone();
                }
            }
            _ => {}
        }

        if mensa_name.is_none() && city.is_none() {
            mensa_name = ctx.default_mensa().map(str::to_string);
            if mensa_name.is_none() {
                return Err(ChatError::closing(
                    "Please specify the mensa, for which you want to get the menu.\nYou can also ask me about which mensas are available in your city",
                ));
            }
        }

        ctx.merge_request(request);

        let mensa = self.resolve_mensa(mensa_name.as_deref(), city.as_deref(), &mut ctx).await?;

        let menu_date = effective_menu_date(Local::now().date_naive(), request.day.as_deref());
        let items = match self.menu.fetch_menu(mensa.id, menu_date.date).await {
            Ok(items) => items,
            Err(ServiceError::Closed { .. }) => {
                return Err(ChatError::closing(format!(
                    "Unfortunately, {} is closed on {} 😔",
                    mensa.name,
                    menu_date.weekday()
                )))
            }
            Err(e) if e.is_unreachable() => {
                return Err(ChatError::closing(
                    "I could not reach the menu service 🙁 Please try again later.",
                ))
            }
            Err(ServiceError::Fetch(_)) => {
                return Err(ChatError::closing(format!(
                    "The menu for {} on {} has not been published yet 😔",
                    mensa.name,
                    menu_date.weekday()
                )))
            }
            Err(e) => {
                error!("menu fetch failed: {}", e);
                return Err(ChatError::problem());
            }
        };

        info!(
            mensa_id = mensa.id,
            mensa_name = %mensa.name,
            city = %mensa.city,
            day = %menu_date.date,
            "menu queried"
        );

        let mut averages = HashMap::new();
        for item in &items {
            let avg = self.ratings.average(item.id).await;
            if avg >= 1.0 {
                averages.insert(item.id, avg);
            }
        }

        let mut text = format::menu_header(&mensa.name, &menu_date);
        text.push_str(&format::render_menu(&items, &averages));

        let mut close_context = true;
        if ctx.default_mensa() != Some(mensa.name.as_str()) {
            // Offer to remember a non-default canteen; the confirmation
            // intent of the next turn picks this up.
            text.push_str(&format!(
                "\n\n Do you want to set {} as your default mensa?\nIf you do, you can just write /menu to get the menu for this mensa next time 🙂",
                mensa.name
            ));
            close_context = false;
        }
        ctx.set_selected_mensa(mensa);

        Ok(ChatReply { text, close_context })
    }

    /// The first phase of the review dialogue: figure out canteen and dish,
    /// then collect the stars.
    pub async fn prepare_review(&self, request: ChatRequest) -> ChatReply {
        match self.prepare_turn(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                debug!("prepare turn ended with chat error: {}", e.text);
                e.into()
            }
        }
    }

    async fn prepare_turn(&self, request: &ChatRequest) -> ChatResult {
        let mut intent = request.intent();
        if intent == Some(Intent::Quit) {
            return Ok(ChatReply::closing("Alright. 🙃"));
        }

        let user_key = request
            .user_key()
            .ok_or_else(|| ChatError::closing("I could not figure out who you are 🙁 Please provide an email or channel."))?;
        let handle = self.contexts.entry(user_key);
        let mut ctx = handle.lock().await;

        let mut mensa_name = request.mensa.clone();

        // A number answer to a canteen disambiguation list: pick the name
        // and continue the carried chooseMensaAndMeal step.
        if intent == Some(Intent::NumberSelection) && ctx.intent() == Some("chooseMensaAndMeal") {
            if let Some(selection) = ctx.current_selection().map(<[String]>::to_vec) {
                let index = request.number_as_i64().unwrap_or(0) - 1;
                if index >= 0 && (index as usize) < selection.len() {
                    mensa_name = Some(selection[index as usize].clone());
                }
                intent = Some(Intent::ChooseMensaAndMeal);
                ctx.remove(KEY_CURRENT_SELECTION);
            }
        }

        ctx.merge_request(request);

        if mensa_name.is_none() {
            mensa_name = ctx.text(KEY_MENSA).map(str::to_string);
        }
        let category = ctx.text(KEY_CATEGORY).map(str::to_string);
        let city = ctx.text(KEY_CITY).map(str::to_string);
        let stars = ctx.number(KEY_NUMBER);

        match intent {
            Some(Intent::ChooseMensaAndMeal) | Some(Intent::Confirmation) => {
                if ctx.get(KEY_REVIEW_START).is_none() {
                    ctx.set(KEY_REVIEW_START, ContextValue::Number(Utc::now().timestamp_millis()));
                }

                let mensa = match ctx.selected_mensa().cloned() {
                    Some(mensa) => mensa,
                    None => {
                        let name = mensa_name.ok_or_else(|| {
                            ChatError::closing(
                                "I could not determine the mensa, you visited 🙁. Could you please repeat that? 😇",
                            )
                        })?;
                        self.resolve_mensa(Some(&name), city.as_deref(), &mut ctx).await?
                    }
                };
                ctx.set_selected_mensa(mensa.clone());

                let dish = match ctx.selected_dish().cloned() {
                    Some(dish) => dish,
                    None => {
                        let category = category.ok_or_else(|| {
                            ChatError::closing(
                                "I could not determine the category of your dish 🙁. Could you please repeat that? 😇",
                            )
                        })?;
                        let date = effective_menu_date(Local::now().date_naive(), None);
                        match self.menu.find_by_keyword(mensa.id, &category, date.date).await {
                            Ok(dish) => dish,
                            Err(ServiceError::NotFound(_)) => {
                                return Err(ChatError::closing(format!("Could not find a dish for {} 💁\n ", category)))
                            }
                            Err(ServiceError::Closed { .. }) => {
                                return Err(ChatError::closing(format!(
                                    "Unfortunately, {} is closed on {} 😔",
                                    mensa.name,
                                    date.weekday()
                                )))
                            }
                            Err(e) if e.is_unreachable() => {
                                return Err(ChatError::closing(
                                    "I could not reach the menu service 🙁 Please try again later.",
                                ))
                            }
                            Err(e) => {
                                error!("dish lookup failed: {}", e);
                                return Err(ChatError::problem());
                            }
                        }
                    }
                };
                ctx.set_selected_dish(dish.clone());

                Ok(ChatReply::open(format!(
                    "You ate {} at {}.\n Is this correct?",
                    dish.name, mensa.name
                )))
            }
            Some(Intent::Stars) | Some(Intent::NumberSelection) => {
                let stars = stars.ok_or_else(|| ChatError::open("Please only provide integer numbers for the stars 😇"))?;
                if !(1..=5).contains(&stars) {
                    return Err(ChatError::open("Stars must be between 1 and 5"));
                }
                ctx.set(KEY_SELECTED_STARS, ContextValue::Number(stars));
                Ok(ChatReply::open(
                    "Please comment your rating. If you don't want to add a comment just type \"no\"",
                ))
            }
            Some(Intent::Rejection) => {
                // The bot got canteen or dish wrong; start that part over.
                ctx.remove(KEY_SELECTED_MENSA);
                ctx.remove(KEY_SELECTED_DISH);
                Ok(ChatReply::open(
                    "Ok. Which mensa did you visit and what did you eat? 😇",
                ))
            }
            Some(Intent::Menu) => {
                // The user answered the canteen question with a name.
                let mensa = self.resolve_mensa(mensa_name.as_deref(), city.as_deref(), &mut ctx).await?;
                let text = format!("Alright, you went to mensa {}. Correct?", mensa.name);
                ctx.set_selected_mensa(mensa);
                ctx.set(KEY_INTENT, ContextValue::Text("chooseMensaAndMeal".into()));
                Ok(ChatReply::open(text))
            }
            _ => Ok(ChatReply::open("Sorry, I did not get that 🙁")),
        }
    }

    /// The final review step: everything needed must already be in context.
    pub async fn submit_review(&self, request: ChatRequest) -> ChatReply {
        match self.submit_turn(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                debug!("submit turn ended with chat error: {}", e.text);
                e.into()
            }
        }
    }

    async fn submit_turn(&self, request: &ChatRequest) -> ChatResult {
        let user_key = request
            .user_key()
            .ok_or_else(|| ChatError::closing("I could not figure out who you are 🙁 Please provide an email or channel."))?;
        let handle = self.contexts.entry(user_key);
        let mut ctx = handle.lock().await;

        ctx.merge_request(request);

        // A rejection means the user declined to comment.
        let comment = if request.intent() == Some(Intent::Rejection) {
            None
        } else {
            request.msg.clone()
        };

        let dish = ctx
            .selected_dish()
            .cloned()
            .ok_or_else(|| ChatError::open("Sorry, I could not find the dish, you selected earlier, in my records 🙁"))?;
        let mensa = ctx
            .selected_mensa()
            .cloned()
            .ok_or_else(|| ChatError::open("Sorry, I could not find the mensa, you selected earlier, in my records 🙁"))?;
        let stars = ctx
            .selected_stars()
            .ok_or_else(|| ChatError::open("Sorry, I could not find the stars, you selected earlier, in my records 🙁"))?;

        match self
            .ratings
            .add(dish.id, mensa.id, stars as i32, request.email.as_deref(), comment.as_deref())
            .await
        {
            Ok(saved) => {
                ctx.remove(KEY_SELECTED_STARS);
                ctx.remove(KEY_SELECTED_MENSA);
                ctx.remove(KEY_SELECTED_DISH);
                if let Some(start) = ctx.number(KEY_REVIEW_START) {
                    info!(
                        user = user_key,
                        review_id = saved.id,
                        elapsed_ms = Utc::now().timestamp_millis() - start,
                        task = "review",
                        "review submitted"
                    );
                    ctx.remove(KEY_REVIEW_START);
                }
                Ok(ChatReply::closing(
                    "Alright your review is saved. Thanks for providing your feedback 😊",
                ))
            }
            Err(ServiceError::Validation(_)) => Err(ChatError::open("Stars must be between 1 and 5")),
            Err(ServiceError::NotFound(_)) => Err(ChatError::open(
                "Sorry, I could not find the dish, you selected earlier, in my records 🙁",
            )),
            Err(e) => {
                error!("failed to store review: {}", e);
                Err(ChatError::problem())
            }
        }
    }

    async fn resolve_mensa(
        &self,
        name: Option<&str>,
        city: Option<&str>,
        ctx: &mut context::DialogueContext,
    ) -> Result<mensa_service_entity::mensa::Model, ChatError> {
        let candidates = match self.directory.find(name, city).await {
            Ok(candidates) => candidates,
            Err(ServiceError::Validation(_)) => {
                return Err(ChatError::closing(
                    "Please specify the mensa, for which you want to get the menu.\nYou can also ask me about which mensas are available in your city",
                ))
            }
            Err(e) => {
                error!("canteen lookup failed: {}", e);
                return Err(ChatError::problem());
            }
        };
        match self.directory.resolve(candidates, ctx).await {
            Ok(Resolution::Unique(mensa)) => Ok(mensa),
            Ok(Resolution::Ambiguous(d)) => Err(ChatError::open(d.prompt)),
            Err(ServiceError::NotFound(_)) => {
                Err(ChatError::closing("Sorry, I could not find a mensa with that name. 💁"))
            }
            Err(e) => {
                error!("canteen resolution failed: {}", e);
                Err(ChatError::problem())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DISH_UPDATE_COOLDOWN, MENSA_REFRESH_INTERVAL};
    use crate::dishes::DishIndex;
    use crate::openmensa::{Meal, OpenMensaClient};
    use mensa_service_entity::{dish, mensa};
    use mensa_service_migration::{Migrator, MigratorTrait};
    use sea_orm::{ActiveModelTrait, Database, Set};

    async fn engine() -> DialogueEngine {
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

        let db = Arc::new(db);
        // Points at nothing routable; the tests below never fetch a menu.
        let client = Arc::new(OpenMensaClient::new("http://127.0.0.1:9"));
        let dishes = Arc::new(DishIndex::new(db.clone(), DISH_UPDATE_COOLDOWN));
        DialogueEngine::new(
            Arc::new(CanteenDirectory::new(db.clone(), client.clone(), MENSA_REFRESH_INTERVAL, 20)),
            Arc::new(MenuService::new(client, dishes)),
            Arc::new(RatingStore::new(db)),
            Arc::new(ContextStore::new()),
        )
    }

    fn request(email: &str, intent: &str) -> ChatRequest {
        ChatRequest {
            email: Some(email.into()),
            intent: Some(intent.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_submit_without_prepare_names_the_dish() {
        let engine = engine().await;
        let reply = engine.submit_review(request("alice@example.org", "confirmation")).await;
        assert!(reply.text.contains("dish"));
        assert!(!reply.close_context);
    }

    #[tokio::test]
    async fn test_stars_validation_in_prepare() {
        let engine = engine().await;
        for bad in [0.0, 6.0, 42.0] {
            let mut req = request("alice@example.org", "stars");
            req.number = Some(bad);
            let reply = engine.prepare_review(req).await;
            assert_eq!(reply.text, "Stars must be between 1 and 5");
            assert!(!reply.close_context);
        }

        let mut req = request("alice@example.org", "stars");
        req.number = Some(4.0);
        let reply = engine.prepare_review(req).await;
        assert!(reply.text.contains("comment"));
        assert!(!reply.close_context);

        let handle = engine.contexts.entry("alice@example.org");
        assert_eq!(handle.lock().await.selected_stars(), Some(4));
    }

    #[tokio::test]
    async fn test_full_review_flow_persists_and_clears_context() {
        let engine = engine().await;
        let key = "alice@example.org";

        // Canteen and dish as prepareReview would have left them.
        {
            let handle = engine.contexts.entry(key);
            let mut ctx = handle.lock().await;
            ctx.set_selected_mensa(mensa::Model {
                id: 187,
                name: "Mensa Academica".into(),
                city: "Aachen".into(),
                address: "Pontwall 3".into(),
            });
            ctx.set_selected_dish(Meal {
                id: 42,
                name: "Schnitzel".into(),
                category: "Klassiker".into(),
            });
        }

        let mut stars = request(key, "stars");
        stars.number = Some(5.0);
        engine.prepare_review(stars).await;

        let mut submit = request(key, "confirmation");
        submit.msg = Some("great".into());
        let reply = engine.submit_review(submit).await;
        assert!(reply.text.contains("review is saved"));
        assert!(reply.close_context);

        assert!((engine.ratings.average(42).await - 5.0).abs() < f32::EPSILON);
        let rows = engine.ratings.list_for_dish(42).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].author, key);
        assert_eq!(rows[0].comment.as_deref(), Some("great"));

        // The three staged fields are consumed by a successful submit.
        let handle = engine.contexts.entry(key);
        let ctx = handle.lock().await;
        assert!(ctx.selected_dish().is_none());
        assert!(ctx.selected_mensa().is_none());
        assert!(ctx.selected_stars().is_none());
    }

    #[tokio::test]
    async fn test_submit_with_rejection_drops_comment() {
        let engine = engine().await;
        let key = "bob@example.org";
        {
            let handle = engine.contexts.entry(key);
            let mut ctx = handle.lock().await;
            ctx.set_selected_mensa(mensa::Model {
                id: 187,
                name: "Mensa Academica".into(),
                city: "Aachen".into(),
                address: String::new(),
            });
            ctx.set_selected_dish(Meal {
                id: 42,
                name: "Schnitzel".into(),
                category: "Klassiker".into(),
            });
            ctx.set(KEY_SELECTED_STARS, ContextValue::Number(3));
        }

        let mut submit = request(key, "rejection");
        submit.msg = Some("this text is not a comment".into());
        let reply = engine.submit_review(submit).await;
        assert!(reply.close_context);

        let rows = engine.ratings.list_for_dish(42).await.unwrap();
        assert_eq!(rows[0].comment, None);
    }

    #[tokio::test]
    async fn test_quit_clears_the_context() {
        let engine = engine().await;
        let key = "carol@example.org";
        {
            let handle = engine.contexts.entry(key);
            handle.lock().await.set(KEY_DEFAULT_MENSA, ContextValue::Text("Vita".into()));
        }
        assert_eq!(engine.contexts.len(), 1);

        let reply = engine.menu(request(key, "quit")).await;
        assert_eq!(reply.text, "Alright. 🙃");
        assert!(reply.close_context);
        assert!(engine.contexts.is_empty());
    }

    #[tokio::test]
    async fn test_menu_without_any_canteen_hint_asks_for_one() {
        let engine = engine().await;
        let reply = engine.menu(request("dave@example.org", "menu")).await;
        assert!(reply.text.contains("Please specify the mensa"));
        assert!(reply.close_context);
    }

    #[tokio::test]
    async fn test_confirmation_sets_default_mensa() {
        let engine = engine().await;
        let key = "erin@example.org";
        {
            let handle = engine.contexts.entry(key);
            handle.lock().await.set_selected_mensa(mensa::Model {
                id: 187,
                name: "Mensa Academica".into(),
                city: "Aachen".into(),
                address: String::new(),
            });
        }

        let reply = engine.menu(request(key, "confirmation")).await;
        assert_eq!(reply.text, "Alright. Done! 🎉");
        assert!(reply.close_context);

        let handle = engine.contexts.entry(key);
        assert_eq!(handle.lock().await.default_mensa(), Some("Mensa Academica"));
    }
}
