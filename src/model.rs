//! This module defines the shared state every event handler and background task reads.
//! One `AppState` is built at startup and handed around behind an `Arc`.

use crate::config::Config;
use crate::database::Storage;
use crate::database::models::Category;
use crate::i18n::{Lang, Localizer};
use crate::notify::Notifier;
use crate::session::SessionStore;
use crate::transport::Transport;
use anyhow::Context;
use chrono::TimeDelta;
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;

/// Active-entity quotas per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_helps: i64,
    pub max_subscriptions: i64,
}

/// Expiry sweep timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPolicy {
    /// Inactivity after which the creator is asked to keep or delete.
    pub retention: TimeDelta,
    /// How long a keep / delete prompt stays open before the entity is removed.
    pub keep_grace: TimeDelta,
    pub interval: Duration,
}

impl SweepPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            retention: config.retention,
            keep_grace: config.keep_grace,
            interval: config.sweep_interval,
        }
    }
}

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub transport: Arc<dyn Transport>,
    pub i18n: Arc<Localizer>,
    /// Used for users without a stored language and for unknown senders.
    pub lang: Lang,
    /// Loaded once at startup; categories do not change while running.
    pub categories: Arc<Vec<Category>>,
    pub sessions: SessionStore,
    pub notifier: Notifier,
    /// Background jobs (help fan-out) that shutdown waits on.
    pub tasks: TaskTracker,
    pub limits: Limits,
    pub sweep: SweepPolicy,
}

/// Everything `AppState` needs besides the collaborators.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub lang: Lang,
    pub timezone: Tz,
    pub limits: Limits,
    pub sweep: SweepPolicy,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            lang: config.language,
            timezone: config.timezone,
            limits: Limits {
                max_helps: config.max_helps_per_user,
                max_subscriptions: config.max_subscriptions_per_user,
            },
            sweep: SweepPolicy::from_config(config),
        }
    }
}

impl AppState {
    /// Loads the category list and translation tables, then assembles the state.
    pub async fn bootstrap(
        settings: Settings,
        storage: Arc<dyn Storage>,
        transport: Arc<dyn Transport>,
        notifier: Notifier,
    ) -> anyhow::Result<Self> {
        let categories = storage
            .list_categories()
            .await
            .context("failed to load categories")?;
        anyhow::ensure!(!categories.is_empty(), "category table is empty");
        tracing::info!(count = categories.len(), "categories loaded");

        let i18n = Localizer::embedded(settings.timezone).context("failed to load translations")?;

        Ok(Self {
            storage,
            transport,
            i18n: Arc::new(i18n),
            lang: settings.lang,
            categories: Arc::new(categories),
            sessions: SessionStore::new(),
            notifier,
            tasks: TaskTracker::new(),
            limits: settings.limits,
            sweep: settings.sweep,
        })
    }
}
