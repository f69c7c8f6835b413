use crate::constants::EMOJI_ITEM;
use crate::dialog::engine;
use crate::dialog::state::Session;
use crate::handler::Turn;
use crate::transport::OutboundMessage;

/// `/start`: a short activity summary when the user has something active, then a
/// fresh role request. Whatever was in progress is gone by now.
pub async fn run(turn: &Turn<'_>, slot: &mut Option<Session>) -> anyhow::Result<()> {
    let storage = &turn.app.storage;
    let helps = storage.count_active_helps_by_user(turn.user.id).await?;
    let subscriptions = storage.count_active_subscriptions_by_user(turn.user.id).await?;

    if helps > 0 || subscriptions > 0 {
        let mut lines = vec![turn.t("cmd_start_activity_header")];
        for (count, key) in [
            (helps, "cmd_start_activity_helps"),
            (subscriptions, "cmd_start_activity_subscriptions"),
        ] {
            if count > 0 {
                let line = turn.t_with(key, &[("count", count.to_string())]);
                lines.push(format!("{EMOJI_ITEM} {line}"));
            }
        }
        turn.send(OutboundMessage::text(lines.join("\n")))
            .await?;
    }

    *slot = Some(engine::begin(turn).await?);
    Ok(())
}
