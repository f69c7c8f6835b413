//! Plain-text cards for Helps and Subscriptions, plus the inline buttons that
//! manage them.

use crate::constants::{EMOJI_ITEM, EMOJI_LOCATION, EMOJI_TIME};
use crate::database::models::{Category, HelpView, SubscriptionView};
use crate::i18n::{Lang, Localizer};
use crate::interactions::ids::CallbackAction;
use crate::transport::{InlineButton, Keyboard};
use uuid::Uuid;

/// Category names for `ids`, in the order of `categories`.
pub fn category_names(categories: &[Category], ids: &[Uuid], lang: Lang) -> Vec<String> {
    categories
        .iter()
        .filter(|c| ids.contains(&c.id))
        .map(|c| c.name(lang).to_string())
        .collect()
}

pub fn help_card(
    i18n: &Localizer,
    lang: Lang,
    categories: &[Category],
    help: &HelpView,
) -> String {
    let mut lines = vec![format!("{EMOJI_LOCATION} {}", help.locality)];
    lines.extend(
        category_names(categories, &help.category_ids, lang)
            .into_iter()
            .map(|name| format!("{EMOJI_ITEM} {name}")),
    );
    lines.push(help.description.clone());
    lines.push(format!(
        "{EMOJI_TIME} {}",
        i18n.format_date_time(help.created_at, lang)
    ));
    lines.join("\n")
}

pub fn subscription_card(
    i18n: &Localizer,
    lang: Lang,
    categories: &[Category],
    sub: &SubscriptionView,
) -> String {
    let category = category_names(categories, &[sub.category_id], lang)
        .pop()
        .unwrap_or_default();
    [
        format!("{EMOJI_LOCATION} {}", sub.locality),
        format!("{EMOJI_ITEM} {category}"),
        format!(
            "{EMOJI_TIME} {}",
            i18n.format_date_time(sub.created_at, lang)
        ),
    ]
    .join("\n")
}

/// Header, one line per selected category, then the footer naming the "next" button.
pub fn chosen_categories(
    i18n: &Localizer,
    lang: Lang,
    categories: &[Category],
    selected: &[Uuid],
) -> String {
    let mut lines = vec![format!(
        "{}:",
        i18n.translate("volunteer_chosen_categories_header", lang)
    )];
    lines.extend(
        category_names(categories, selected, lang)
            .into_iter()
            .map(|name| format!("{EMOJI_ITEM} {name}")),
    );
    lines.push(String::new());
    lines.push(format!(
        "{} \"{}\"",
        i18n.translate("volunteer_chosen_categories_footer", lang),
        i18n.translate("btn_next", lang)
    ));
    lines.join("\n")
}

fn button(i18n: &Localizer, lang: Lang, key: &str, action: CallbackAction) -> InlineButton {
    InlineButton {
        label: i18n.translate(key, lang),
        data: action.encode(),
    }
}

pub fn delete_button(i18n: &Localizer, lang: Lang, action: CallbackAction) -> Keyboard {
    Keyboard::Inline(vec![vec![button(i18n, lang, "btn_delete", action)]])
}

/// Keep / delete pair offered by the expiry sweep.
pub fn keep_or_delete(
    i18n: &Localizer,
    lang: Lang,
    keep: CallbackAction,
    delete: CallbackAction,
) -> Keyboard {
    Keyboard::Inline(vec![vec![
        button(i18n, lang, "btn_keep", keep),
        button(i18n, lang, "btn_delete", delete),
    ]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn help_card_lists_categories_in_display_order() {
        let i18n = Localizer::embedded(chrono_tz::Europe::Kyiv).unwrap();
        let cats: Vec<Category> = [("Їжа", "Food"), ("Ліки", "Medicine")]
            .into_iter()
            .map(|(ua, en)| Category {
                id: Uuid::new_v4(),
                name_ua: ua.into(),
                name_en: en.into(),
            })
            .collect();
        let help = HelpView {
            id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            locality: "Львів, Львівська область".into(),
            category_ids: vec![cats[1].id, cats[0].id],
            description: "need blankets".into(),
            created_at: Utc.with_ymd_and_hms(2022, 3, 4, 22, 30, 0).unwrap(),
        };
        let card = help_card(&i18n, Lang::En, &cats, &help);
        assert_eq!(
            card,
            "📍 Львів, Львівська область\n▪️ Food\n▪️ Medicine\nneed blankets\n🕓 Saturday 5 March 00:30"
        );
    }
}
