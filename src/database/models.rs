//! Contains all the data structures that map to database tables or query results.

use crate::i18n::Lang;
use crate::transport::ChatId;
use sqlx::Type;
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub tg_id: i64,
    pub chat_id: i64,
    pub name: String,
    pub language: String,
}

impl User {
    pub fn chat(&self) -> ChatId {
        ChatId(self.chat_id)
    }

    pub fn lang(&self) -> Option<Lang> {
        self.language.parse().ok()
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub tg_id: i64,
    pub chat_id: i64,
    pub name: String,
    /// Only used when the user is first created; an existing user keeps their language.
    pub language: Lang,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: Uuid,
    pub name_ua: String,
    pub name_en: String,
}

impl Category {
    pub fn name(&self, lang: Lang) -> &str {
        match lang {
            Lang::Ua => &self.name_ua,
            Lang::En => &self.name_en,
        }
    }
}

// Declaration order doubles as the search preference order (`ORDER BY type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type)]
#[sqlx(type_name = "locality_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocalityKind {
    City,
    Urban,
    Settlement,
    Village,
    District,
    State,
    Country,
}

impl LocalityKind {
    /// Settlement-type preference for search results; `None` for administrative units
    /// that are never offered as candidates.
    pub fn search_rank(self) -> Option<u8> {
        match self {
            LocalityKind::City => Some(0),
            LocalityKind::Urban => Some(1),
            LocalityKind::Settlement => Some(2),
            LocalityKind::Village => Some(3),
            LocalityKind::District | LocalityKind::State | LocalityKind::Country => None,
        }
    }

    /// Parses the upper-case type names used by the directory dump and the database enum.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "CITY" => Some(Self::City),
            "URBAN" => Some(Self::Urban),
            "SETTLEMENT" => Some(Self::Settlement),
            "VILLAGE" => Some(Self::Village),
            "DISTRICT" => Some(Self::District),
            "STATE" => Some(Self::State),
            "COUNTRY" => Some(Self::Country),
            _ => None,
        }
    }
}

/// A directory entry as stored in the `locality` table.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Locality {
    pub id: i32,
    pub kind: LocalityKind,
    /// Search key; fuzzy matching runs against this name.
    pub name_ua: String,
    pub public_name_ua: String,
    pub parent_id: Option<i32>,
}

/// One fuzzy-match hit from the locality directory.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct LocalityCandidate {
    pub id: i32,
    pub kind: LocalityKind,
    pub name: String,
    pub region_name: String,
    pub parent_id: Option<i32>,
    /// Edit distance between the query and the locality name.
    pub distance: i32,
}

impl LocalityCandidate {
    /// The `"name, region"` label users must tap to confirm a locality.
    pub fn display(&self) -> String {
        if self.region_name.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.region_name)
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewHelp {
    pub creator_id: Uuid,
    pub category_ids: Vec<Uuid>,
    pub locality_id: i32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Help {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub category_ids: Vec<Uuid>,
    pub locality_id: i32,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A Help joined with its locality label, as shown to users.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct HelpView {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub locality: String,
    pub category_ids: Vec<Uuid>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ExpiringHelp {
    #[sqlx(flatten)]
    pub help: HelpView,
    pub creator_chat_id: i64,
    pub creator_language: String,
    pub warned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub creator_id: Uuid,
    pub category_id: Uuid,
    pub locality_id: i32,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub category_id: Uuid,
    pub locality_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionView {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub category_id: Uuid,
    pub locality: String,
    pub created_at: DateTime<Utc>,
}

/// A subscriber that should hear about a new Help.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionMatch {
    pub subscription_id: Uuid,
    pub creator_id: Uuid,
    pub chat_id: i64,
    pub language: String,
    pub category_id: Uuid,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ExpiringSubscription {
    #[sqlx(flatten)]
    pub subscription: SubscriptionView,
    pub creator_chat_id: i64,
    pub creator_language: String,
    pub warned_at: Option<DateTime<Utc>>,
}
