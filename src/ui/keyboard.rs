//! Reply-keyboard construction with stable action codes.
//!
//! Every button is a `Control`: the label is what the client shows (and echoes
//! back as text when tapped), the action is what the dialog engine acts on.
//! The engine keeps the controls of the last prompt in the session and resolves
//! inbound text against them, so a translation change never changes behavior.

use crate::constants::{CATEGORY_COLUMNS, EMOJI_CHECKBOX};
use crate::database::models::{Category, LocalityCandidate};
use crate::dialog::state::{Role, VolunteerData};
use crate::i18n::{Lang, Localizer};
use crate::transport::Keyboard;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Role(Role),
    ToggleCategory(Uuid),
    Next,
    PickCategory(Uuid),
    PickLocality(i32),
    Subscribe,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub label: String,
    pub action: ControlAction,
}

/// Rows of controls. Duplicate labels get a numeric suffix so every label
/// resolves to exactly one action.
#[derive(Debug, Clone, Default)]
pub struct ControlPad {
    rows: Vec<Vec<Control>>,
}

impl ControlPad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, items: impl IntoIterator<Item = (String, ControlAction)>) -> Self {
        let mut row = Vec::new();
        for (label, action) in items {
            let label = self.unique_label(label, &row);
            row.push(Control { label, action });
        }
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    /// Lays the items out `columns` per row.
    pub fn grid(
        mut self,
        items: impl IntoIterator<Item = (String, ControlAction)>,
        columns: usize,
    ) -> Self {
        let items: Vec<_> = items.into_iter().collect();
        for chunk in items.chunks(columns.max(1)) {
            self = self.row(chunk.iter().cloned());
        }
        self
    }

    fn unique_label(&self, label: String, pending: &[Control]) -> String {
        let taken = |l: &str| {
            self.rows.iter().flatten().chain(pending).any(|c| c.label == l)
        };
        if !taken(&label) {
            return label;
        }
        (2..)
            .map(|n| format!("{label} ({n})"))
            .find(|candidate| !taken(candidate))
            .unwrap_or(label)
    }

    pub fn keyboard(&self) -> Keyboard {
        Keyboard::Reply(
            self.rows
                .iter()
                .map(|row| row.iter().map(|c| c.label.clone()).collect())
                .collect(),
        )
    }

    pub fn into_controls(self) -> Vec<Control> {
        self.rows.into_iter().flatten().collect()
    }
}

/// Maps inbound text to the action of the control it was rendered from.
pub fn resolve(controls: &[Control], text: &str) -> Option<ControlAction> {
    let text = text.trim();
    if let Some(c) = controls.iter().find(|c| c.label == text) {
        return Some(c.action);
    }
    // Some clients drop the checkbox emoji when echoing a button.
    let bare = strip_checkbox(text);
    controls
        .iter()
        .find(|c| strip_checkbox(&c.label) == bare)
        .map(|c| c.action)
}

fn strip_checkbox(label: &str) -> &str {
    label.strip_prefix(EMOJI_CHECKBOX).unwrap_or(label).trim_start()
}

fn cancel(i18n: &Localizer, lang: Lang) -> (String, ControlAction) {
    (i18n.translate("btn_cancel", lang), ControlAction::Cancel)
}

pub fn role_pad(i18n: &Localizer, lang: Lang) -> ControlPad {
    ControlPad::new()
        .row([
            (
                i18n.translate("btn_role_seeker", lang),
                ControlAction::Role(Role::Seeker),
            ),
            (
                i18n.translate("btn_role_volunteer", lang),
                ControlAction::Role(Role::Volunteer),
            ),
        ])
        .row([cancel(i18n, lang)])
}

/// Checkbox grid; "next" appears on its own row once something is selected.
pub fn volunteer_categories_pad(
    i18n: &Localizer,
    lang: Lang,
    categories: &[Category],
    data: &VolunteerData,
) -> ControlPad {
    let items = categories.iter().map(|c| {
        let label = if data.is_selected(c.id) {
            format!("{EMOJI_CHECKBOX} {}", c.name(lang))
        } else {
            c.name(lang).to_string()
        };
        (label, ControlAction::ToggleCategory(c.id))
    });
    let mut pad = ControlPad::new().grid(items, CATEGORY_COLUMNS);
    if data.has_selection() {
        pad = pad.row([(i18n.translate("btn_next", lang), ControlAction::Next)]);
    }
    pad.row([cancel(i18n, lang)])
}

pub fn seeker_categories_pad(i18n: &Localizer, lang: Lang, categories: &[Category]) -> ControlPad {
    let items = categories
        .iter()
        .map(|c| (c.name(lang).to_string(), ControlAction::PickCategory(c.id)));
    ControlPad::new()
        .grid(items, CATEGORY_COLUMNS)
        .row([cancel(i18n, lang)])
}

/// One candidate per row, labelled `"name, region"`.
pub fn localities_pad(
    i18n: &Localizer,
    lang: Lang,
    candidates: &[LocalityCandidate],
) -> ControlPad {
    candidates
        .iter()
        .fold(ControlPad::new(), |pad, c| {
            pad.row([(c.display(), ControlAction::PickLocality(c.id))])
        })
        .row([cancel(i18n, lang)])
}

pub fn subscribe_pad(i18n: &Localizer, lang: Lang) -> ControlPad {
    ControlPad::new()
        .row([(i18n.translate("btn_subscribe", lang), ControlAction::Subscribe)])
        .row([cancel(i18n, lang)])
}

pub fn cancel_pad(i18n: &Localizer, lang: Lang) -> ControlPad {
    ControlPad::new().row([cancel(i18n, lang)])
}
