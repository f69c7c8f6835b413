//! In-process `Storage` with the same semantics as the Postgres implementation.
//! Used by the test suite and by `STORAGE=memory` local runs.

use super::directory::{MAX_EDIT_DISTANCE, levenshtein, normalize_query, rank_candidates};
use super::models::{
    Category, ExpiringHelp, ExpiringSubscription, Help, HelpView, Locality, LocalityCandidate,
    LocalityKind, NewHelp, NewSubscription, NewUser, Subscription, SubscriptionMatch,
    SubscriptionView, User,
};
use super::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Category ids shared with `migrations/0002_seed_categories.sql`.
pub mod seed {
    use uuid::Uuid;

    pub const HOUSING: Uuid = Uuid::from_u128(0x6c6a8b0e_3f1d_4b6e_9a57_1f0c2e9d0001);
    pub const FOOD: Uuid = Uuid::from_u128(0x6c6a8b0e_3f1d_4b6e_9a57_1f0c2e9d0002);
    pub const MEDICINE: Uuid = Uuid::from_u128(0x6c6a8b0e_3f1d_4b6e_9a57_1f0c2e9d0003);
    pub const CLOTHING: Uuid = Uuid::from_u128(0x6c6a8b0e_3f1d_4b6e_9a57_1f0c2e9d0004);
    pub const TRANSPORT: Uuid = Uuid::from_u128(0x6c6a8b0e_3f1d_4b6e_9a57_1f0c2e9d0005);
    pub const ANIMALS: Uuid = Uuid::from_u128(0x6c6a8b0e_3f1d_4b6e_9a57_1f0c2e9d0006);

    pub const LVIV_CITY: i32 = 1000;
    pub const LVIV_VILLAGE: i32 = 1001;
    pub const LEVIV_VILLAGE: i32 = 1002;
    pub const SOKILNYKY: i32 = 1003;
    pub const ZYMNA_VODA: i32 = 1004;
    pub const KYIV: i32 = 1005;
    pub const VORZEL: i32 = 1006;
    pub const BUCHA: i32 = 1007;
}

#[derive(Debug, Clone)]
struct HelpRow {
    help: Help,
    updated_at: Option<DateTime<Utc>>,
    warned_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct SubscriptionRow {
    sub: Subscription,
    updated_at: Option<DateTime<Utc>>,
    warned_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<i64, User>,
    categories: Vec<Category>,
    localities: BTreeMap<i32, Locality>,
    helps: Vec<HelpRow>,
    subscriptions: Vec<SubscriptionRow>,
    now: Option<DateTime<Utc>>,
}

impl Inner {
    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    fn user_by_id(&self, id: Uuid) -> Option<&User> {
        self.users.values().find(|u| u.id == id)
    }

    // Nearest STATE among the first two ancestors, like the SQL join.
    fn region_name(&self, locality: &Locality) -> String {
        let parent = locality.parent_id.and_then(|id| self.localities.get(&id));
        let grandparent = parent
            .and_then(|p| p.parent_id)
            .and_then(|id| self.localities.get(&id));
        [parent, grandparent]
            .into_iter()
            .flatten()
            .find(|l| l.kind == LocalityKind::State)
            .map(|l| l.public_name_ua.clone())
            .unwrap_or_default()
    }

    fn label(&self, locality_id: i32) -> String {
        match self.localities.get(&locality_id) {
            Some(l) => {
                let region = self.region_name(l);
                if region.is_empty() {
                    l.public_name_ua.clone()
                } else {
                    format!("{}, {}", l.public_name_ua, region)
                }
            }
            None => String::new(),
        }
    }

    fn help_view(&self, row: &HelpRow) -> HelpView {
        HelpView {
            id: row.help.id,
            creator_id: row.help.creator_id,
            locality: self.label(row.help.locality_id),
            category_ids: row.help.category_ids.clone(),
            description: row.help.description.clone(),
            created_at: row.help.created_at,
        }
    }

    fn subscription_view(&self, row: &SubscriptionRow) -> SubscriptionView {
        SubscriptionView {
            id: row.sub.id,
            creator_id: row.sub.creator_id,
            category_id: row.sub.category_id,
            locality: self.label(row.sub.locality_id),
            created_at: row.sub.created_at,
        }
    }

    /// `Some(district)` when `locality_id` is a non-city unit directly under a district.
    fn shared_district(&self, locality_id: i32) -> Option<i32> {
        let locality = self.localities.get(&locality_id)?;
        if locality.kind == LocalityKind::City {
            return None;
        }
        let parent = self.localities.get(&locality.parent_id?)?;
        (parent.kind == LocalityKind::District).then_some(parent.id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
    offline: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.inner.get_mut().categories = categories;
        self
    }

    pub fn with_localities(mut self, localities: Vec<Locality>) -> Self {
        self.inner.get_mut().localities = localities.into_iter().map(|l| (l.id, l)).collect();
        self
    }

    /// Seed categories plus a small directory around Lviv and Kyiv.
    pub fn demo() -> Self {
        Self::new()
            .with_categories(demo_categories())
            .with_localities(demo_localities())
    }

    /// While offline every operation fails as if the database were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Pins the clock used for new timestamps.
    pub async fn set_now(&self, now: DateTime<Utc>) {
        self.inner.write().await.now = Some(now);
    }

    /// All Helps including soft-deleted ones, as `(help, deleted)` pairs.
    pub async fn all_helps(&self) -> Vec<(Help, bool)> {
        self.inner
            .read()
            .await
            .helps
            .iter()
            .map(|r| (r.help.clone(), r.deleted_at.is_some()))
            .collect()
    }

    pub async fn all_subscriptions(&self) -> Vec<(Subscription, bool)> {
        self.inner
            .read()
            .await
            .subscriptions
            .iter()
            .map(|r| (r.sub.clone(), r.deleted_at.is_some()))
            .collect()
    }

    fn check_online(&self) -> StorageResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upsert_user(&self, user: NewUser) -> StorageResult<User> {
        self.check_online()?;
        let mut inner = self.inner.write().await;
        let entry = inner.users.entry(user.tg_id).or_insert_with(|| User {
            id: Uuid::new_v4(),
            tg_id: user.tg_id,
            chat_id: user.chat_id,
            name: user.name.clone(),
            language: user.language.code().to_string(),
        });
        entry.chat_id = user.chat_id;
        entry.name = user.name;
        Ok(entry.clone())
    }

    async fn list_categories(&self) -> StorageResult<Vec<Category>> {
        self.check_online()?;
        Ok(self.inner.read().await.categories.clone())
    }

    async fn find_localities(
        &self,
        query: &str,
        limit: i64,
    ) -> StorageResult<Vec<LocalityCandidate>> {
        self.check_online()?;
        let Some(query) = normalize_query(query) else {
            return Ok(Vec::new());
        };
        let inner = self.inner.read().await;
        let candidates = inner
            .localities
            .values()
            .filter(|l| l.kind.search_rank().is_some())
            .filter_map(|l| {
                let distance = levenshtein(&l.name_ua, &query);
                (distance <= MAX_EDIT_DISTANCE).then(|| LocalityCandidate {
                    id: l.id,
                    kind: l.kind,
                    name: l.public_name_ua.clone(),
                    region_name: inner.region_name(l),
                    parent_id: l.parent_id,
                    distance: distance as i32,
                })
            })
            .collect();
        let mut ranked = rank_candidates(candidates);
        ranked.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(ranked)
    }

    async fn create_help(&self, help: NewHelp) -> StorageResult<Help> {
        self.check_online()?;
        let mut inner = self.inner.write().await;
        if !inner.localities.contains_key(&help.locality_id) {
            return Err(StorageError::NotFound);
        }
        let mut category_ids = help.category_ids;
        category_ids.dedup();
        let stored = Help {
            id: Uuid::new_v4(),
            creator_id: help.creator_id,
            category_ids,
            locality_id: help.locality_id,
            description: help.description,
            created_at: inner.now(),
        };
        inner.helps.push(HelpRow {
            help: stored.clone(),
            updated_at: None,
            warned_at: None,
            deleted_at: None,
        });
        Ok(stored)
    }

    async fn find_helps_by_locality_category(
        &self,
        locality_id: i32,
        category_id: Uuid,
    ) -> StorageResult<Vec<HelpView>> {
        self.check_online()?;
        let inner = self.inner.read().await;
        let district = inner.shared_district(locality_id);
        let mut found: Vec<HelpView> = inner
            .helps
            .iter()
            .filter(|r| r.deleted_at.is_none())
            .filter(|r| r.help.category_ids.contains(&category_id))
            .filter(|r| {
                r.help.locality_id == locality_id
                    || district.is_some_and(|d| {
                        inner
                            .localities
                            .get(&r.help.locality_id)
                            .is_some_and(|l| l.parent_id == Some(d))
                    })
            })
            .map(|r| inner.help_view(r))
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn helps_by_user(&self, user_id: Uuid) -> StorageResult<Vec<HelpView>> {
        self.check_online()?;
        let inner = self.inner.read().await;
        Ok(inner
            .helps
            .iter()
            .filter(|r| r.deleted_at.is_none() && r.help.creator_id == user_id)
            .map(|r| inner.help_view(r))
            .collect())
    }

    async fn delete_help(&self, id: Uuid, owner: Uuid) -> StorageResult<bool> {
        self.check_online()?;
        let mut inner = self.inner.write().await;
        let now = inner.now();
        match inner.helps.iter_mut().find(|r| {
            r.help.id == id && r.help.creator_id == owner && r.deleted_at.is_none()
        }) {
            Some(row) => {
                row.deleted_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn keep_help(&self, id: Uuid, owner: Uuid) -> StorageResult<bool> {
        self.check_online()?;
        let mut inner = self.inner.write().await;
        let now = inner.now();
        match inner.helps.iter_mut().find(|r| {
            r.help.id == id && r.help.creator_id == owner && r.deleted_at.is_none()
        }) {
            Some(row) => {
                row.updated_at = Some(now);
                row.warned_at = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_active_helps_by_user(&self, user_id: Uuid) -> StorageResult<i64> {
        self.check_online()?;
        let inner = self.inner.read().await;
        Ok(inner
            .helps
            .iter()
            .filter(|r| r.deleted_at.is_none() && r.help.creator_id == user_id)
            .count() as i64)
    }

    async fn expired_helps(&self, before: DateTime<Utc>) -> StorageResult<Vec<ExpiringHelp>> {
        self.check_online()?;
        let inner = self.inner.read().await;
        let mut out = Vec::new();
        for row in inner.helps.iter().filter(|r| r.deleted_at.is_none()) {
            if row.updated_at.unwrap_or(row.help.created_at) >= before {
                continue;
            }
            let Some(creator) = inner.user_by_id(row.help.creator_id) else {
                continue;
            };
            out.push(ExpiringHelp {
                help: inner.help_view(row),
                creator_chat_id: creator.chat_id,
                creator_language: creator.language.clone(),
                warned_at: row.warned_at,
            });
        }
        Ok(out)
    }

    async fn mark_help_warned(&self, id: Uuid, at: DateTime<Utc>) -> StorageResult<()> {
        self.check_online()?;
        let mut inner = self.inner.write().await;
        if let Some(row) = inner.helps.iter_mut().find(|r| r.help.id == id) {
            row.warned_at = Some(at);
        }
        Ok(())
    }

    async fn create_subscription(&self, sub: NewSubscription) -> StorageResult<Subscription> {
        self.check_online()?;
        let mut inner = self.inner.write().await;
        let duplicate = inner.subscriptions.iter().any(|r| {
            r.deleted_at.is_none()
                && r.sub.creator_id == sub.creator_id
                && r.sub.category_id == sub.category_id
                && r.sub.locality_id == sub.locality_id
        });
        if duplicate {
            return Err(StorageError::AlreadyExists);
        }
        if !inner.localities.contains_key(&sub.locality_id) {
            return Err(StorageError::NotFound);
        }
        let stored = Subscription {
            id: Uuid::new_v4(),
            creator_id: sub.creator_id,
            category_id: sub.category_id,
            locality_id: sub.locality_id,
            created_at: inner.now(),
        };
        inner.subscriptions.push(SubscriptionRow {
            sub: stored.clone(),
            updated_at: None,
            warned_at: None,
            deleted_at: None,
        });
        Ok(stored)
    }

    async fn subscriptions_by_user(&self, user_id: Uuid) -> StorageResult<Vec<SubscriptionView>> {
        self.check_online()?;
        let inner = self.inner.read().await;
        Ok(inner
            .subscriptions
            .iter()
            .filter(|r| r.deleted_at.is_none() && r.sub.creator_id == user_id)
            .map(|r| inner.subscription_view(r))
            .collect())
    }

    async fn find_subscriptions_by_locality_categories(
        &self,
        locality_id: i32,
        category_ids: &[Uuid],
    ) -> StorageResult<Vec<SubscriptionMatch>> {
        self.check_online()?;
        let inner = self.inner.read().await;
        Ok(inner
            .subscriptions
            .iter()
            .filter(|r| {
                r.deleted_at.is_none()
                    && r.sub.locality_id == locality_id
                    && category_ids.contains(&r.sub.category_id)
            })
            .filter_map(|r| {
                let user = inner.user_by_id(r.sub.creator_id)?;
                Some(SubscriptionMatch {
                    subscription_id: r.sub.id,
                    creator_id: r.sub.creator_id,
                    chat_id: user.chat_id,
                    language: user.language.clone(),
                    category_id: r.sub.category_id,
                })
            })
            .collect())
    }

    async fn delete_subscription(&self, id: Uuid, owner: Uuid) -> StorageResult<bool> {
        self.check_online()?;
        let mut inner = self.inner.write().await;
        let now = inner.now();
        match inner.subscriptions.iter_mut().find(|r| {
            r.sub.id == id && r.sub.creator_id == owner && r.deleted_at.is_none()
        }) {
            Some(row) => {
                row.deleted_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn keep_subscription(&self, id: Uuid, owner: Uuid) -> StorageResult<bool> {
        self.check_online()?;
        let mut inner = self.inner.write().await;
        let now = inner.now();
        match inner.subscriptions.iter_mut().find(|r| {
            r.sub.id == id && r.sub.creator_id == owner && r.deleted_at.is_none()
        }) {
            Some(row) => {
                row.updated_at = Some(now);
                row.warned_at = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_active_subscriptions_by_user(&self, user_id: Uuid) -> StorageResult<i64> {
        self.check_online()?;
        let inner = self.inner.read().await;
        Ok(inner
            .subscriptions
            .iter()
            .filter(|r| r.deleted_at.is_none() && r.sub.creator_id == user_id)
            .count() as i64)
    }

    async fn expired_subscriptions(
        &self,
        before: DateTime<Utc>,
    ) -> StorageResult<Vec<ExpiringSubscription>> {
        self.check_online()?;
        let inner = self.inner.read().await;
        let mut out = Vec::new();
        for row in inner.subscriptions.iter().filter(|r| r.deleted_at.is_none()) {
            if row.updated_at.unwrap_or(row.sub.created_at) >= before {
                continue;
            }
            let Some(creator) = inner.user_by_id(row.sub.creator_id) else {
                continue;
            };
            out.push(ExpiringSubscription {
                subscription: inner.subscription_view(row),
                creator_chat_id: creator.chat_id,
                creator_language: creator.language.clone(),
                warned_at: row.warned_at,
            });
        }
        Ok(out)
    }

    async fn mark_subscription_warned(&self, id: Uuid, at: DateTime<Utc>) -> StorageResult<()> {
        self.check_online()?;
        let mut inner = self.inner.write().await;
        if let Some(row) = inner.subscriptions.iter_mut().find(|r| r.sub.id == id) {
            row.warned_at = Some(at);
        }
        Ok(())
    }
}

pub fn demo_categories() -> Vec<Category> {
    [
        (seed::HOUSING, "Житло", "Housing"),
        (seed::FOOD, "Їжа", "Food"),
        (seed::MEDICINE, "Ліки", "Medicine"),
        (seed::CLOTHING, "Одяг", "Clothing"),
        (seed::TRANSPORT, "Транспорт", "Transport"),
        (seed::ANIMALS, "Допомога тваринам", "Animal care"),
    ]
    .into_iter()
    .map(|(id, ua, en)| Category {
        id,
        name_ua: ua.into(),
        name_en: en.into(),
    })
    .collect()
}

pub fn demo_localities() -> Vec<Locality> {
    use LocalityKind::*;
    [
        (1, Country, "Україна", None),
        (10, State, "Львівська область", Some(1)),
        (11, State, "Київська область", Some(1)),
        (12, State, "Волинська область", Some(1)),
        (100, District, "Львівський район", Some(10)),
        (101, District, "Ковельський район", Some(12)),
        (102, District, "Бучанський район", Some(11)),
        (seed::LVIV_CITY, City, "Львів", Some(10)),
        (seed::LVIV_VILLAGE, Village, "Львів", Some(101)),
        (seed::LEVIV_VILLAGE, Village, "Левів", Some(100)),
        (seed::SOKILNYKY, Village, "Сокільники", Some(100)),
        (seed::ZYMNA_VODA, Village, "Зимна Вода", Some(100)),
        (seed::KYIV, City, "Київ", Some(11)),
        (seed::VORZEL, Urban, "Ворзель", Some(102)),
        (seed::BUCHA, City, "Буча", Some(102)),
    ]
    .into_iter()
    .map(|(id, kind, name, parent_id)| Locality {
        id,
        kind,
        name_ua: name.into(),
        public_name_ua: name.into(),
        parent_id,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Lang;

    async fn user(store: &MemoryStorage, tg_id: i64) -> User {
        store
            .upsert_user(NewUser {
                tg_id,
                chat_id: tg_id,
                name: format!("user{tg_id}"),
                language: Lang::Ua,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn city_is_ranked_before_villages() {
        let store = MemoryStorage::demo();
        let found = store.find_localities("львів", 10).await.unwrap();
        let ids: Vec<i32> = found.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![seed::LVIV_CITY, seed::LVIV_VILLAGE, seed::LEVIV_VILLAGE]);
        assert_eq!(found[0].display(), "Львів, Львівська область");
        assert_eq!(found[1].display(), "Львів, Волинська область");
    }

    #[tokio::test]
    async fn upsert_keeps_identity_and_refreshes_chat() {
        let store = MemoryStorage::demo();
        let first = user(&store, 7).await;
        let again = store
            .upsert_user(NewUser {
                tg_id: 7,
                chat_id: 70,
                name: "renamed".into(),
                language: Lang::En,
            })
            .await
            .unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(again.chat_id, 70);
        assert_eq!(again.name, "renamed");
        assert_eq!(again.language, "UA");
    }

    #[tokio::test]
    async fn duplicate_subscription_is_distinguishable() {
        let store = MemoryStorage::demo();
        let u = user(&store, 1).await;
        let sub = NewSubscription {
            creator_id: u.id,
            category_id: seed::FOOD,
            locality_id: seed::KYIV,
        };
        store.create_subscription(sub.clone()).await.unwrap();
        let err = store.create_subscription(sub.clone()).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists));
        assert_eq!(store.count_active_subscriptions_by_user(u.id).await.unwrap(), 1);

        // Once removed, the same triple can be subscribed again.
        let existing = store.subscriptions_by_user(u.id).await.unwrap();
        assert!(store.delete_subscription(existing[0].id, u.id).await.unwrap());
        store.create_subscription(sub).await.unwrap();
    }

    #[tokio::test]
    async fn village_listing_includes_same_district() {
        let store = MemoryStorage::demo();
        let u = user(&store, 1).await;
        store
            .create_help(NewHelp {
                creator_id: u.id,
                category_ids: vec![seed::FOOD],
                locality_id: seed::SOKILNYKY,
                description: "soup".into(),
            })
            .await
            .unwrap();

        let nearby = store
            .find_helps_by_locality_category(seed::ZYMNA_VODA, seed::FOOD)
            .await
            .unwrap();
        assert_eq!(nearby.len(), 1);
        let city = store
            .find_helps_by_locality_category(seed::LVIV_CITY, seed::FOOD)
            .await
            .unwrap();
        assert!(city.is_empty());
    }

    #[tokio::test]
    async fn delete_is_owner_checked() {
        let store = MemoryStorage::demo();
        let owner = user(&store, 1).await;
        let other = user(&store, 2).await;
        let help = store
            .create_help(NewHelp {
                creator_id: owner.id,
                category_ids: vec![seed::HOUSING],
                locality_id: seed::KYIV,
                description: "room".into(),
            })
            .await
            .unwrap();
        assert!(!store.delete_help(help.id, other.id).await.unwrap());
        assert!(store.delete_help(help.id, owner.id).await.unwrap());
        assert!(!store.delete_help(help.id, owner.id).await.unwrap());
        assert_eq!(store.count_active_helps_by_user(owner.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryStorage::demo();
        store.set_offline(true);
        assert!(matches!(
            store.list_categories().await,
            Err(StorageError::Database(_))
        ));
    }
}
