// Central constants for limits, rendering and background delivery.
pub const MAX_HELPS_PER_USER: i64 = 2;
pub const MAX_SUBSCRIPTIONS_PER_USER: i64 = 5;

// Candidate buttons rendered for one locality lookup.
pub const MAX_LOCALITY_CANDIDATES: i64 = 10;
// Category buttons per keyboard row.
pub const CATEGORY_COLUMNS: usize = 2;

pub const RETENTION_DAYS: i64 = 10;
pub const KEEP_GRACE_HOURS: i64 = 24;
pub const SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

pub const NOTIFY_QUEUE_CAPACITY: usize = 100;
pub const NOTIFY_ENQUEUE_TIMEOUT_MS: u64 = 5_000;
pub const SHUTDOWN_DRAIN_SECS: u64 = 10;

pub const EMOJI_CHECKBOX: &str = "✅";
pub const EMOJI_ITEM: &str = "▪️";
pub const EMOJI_LOCATION: &str = "📍";
pub const EMOJI_TIME: &str = "🕓";
