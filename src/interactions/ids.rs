//! Centralized callback-data prefixes for inline buttons.
//! Every inline button carries `<prefix><entity uuid>`.

use uuid::Uuid;

pub const HELP_DELETE_PREFIX: &str = "help_del_"; // followed by help id
pub const HELP_KEEP_PREFIX: &str = "help_keep_"; // followed by help id
pub const SUBSCRIPTION_DELETE_PREFIX: &str = "sub_del_"; // followed by subscription id
pub const SUBSCRIPTION_KEEP_PREFIX: &str = "sub_keep_"; // followed by subscription id

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    DeleteHelp(Uuid),
    KeepHelp(Uuid),
    DeleteSubscription(Uuid),
    KeepSubscription(Uuid),
}

impl CallbackAction {
    pub fn encode(self) -> String {
        match self {
            CallbackAction::DeleteHelp(id) => format!("{HELP_DELETE_PREFIX}{id}"),
            CallbackAction::KeepHelp(id) => format!("{HELP_KEEP_PREFIX}{id}"),
            CallbackAction::DeleteSubscription(id) => format!("{SUBSCRIPTION_DELETE_PREFIX}{id}"),
            CallbackAction::KeepSubscription(id) => format!("{SUBSCRIPTION_KEEP_PREFIX}{id}"),
        }
    }

    /// Parses callback data; anything malformed yields `None`.
    pub fn parse(data: &str) -> Option<Self> {
        let table: [(&str, fn(Uuid) -> CallbackAction); 4] = [
            (HELP_DELETE_PREFIX, CallbackAction::DeleteHelp),
            (HELP_KEEP_PREFIX, CallbackAction::KeepHelp),
            (SUBSCRIPTION_DELETE_PREFIX, CallbackAction::DeleteSubscription),
            (SUBSCRIPTION_KEEP_PREFIX, CallbackAction::KeepSubscription),
        ];
        table.iter().find_map(|(prefix, build)| {
            let id = data.strip_prefix(prefix)?;
            Uuid::parse_str(id).ok().map(build)
        })
    }
}
