//! Key -> string lookup over embedded translation tables, plus date formatting.

use anyhow::Context;
use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const TRANSLATIONS: &str = include_str!("translations.json");
const DATETIME: &str = include_str!("datetime.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lang {
    #[default]
    Ua,
    En,
}

impl Lang {
    pub fn code(self) -> &'static str {
        match self {
            Lang::Ua => "UA",
            Lang::En => "EN",
        }
    }

    /// Maps a client language hint (`uk`, `en-US`, ...) to a supported language.
    pub fn from_client_hint(hint: &str) -> Option<Lang> {
        let primary = hint.split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "uk" | "ua" => Some(Lang::Ua),
            "en" => Some(Lang::En),
            _ => None,
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lang {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UA" | "UK" => Ok(Lang::Ua),
            "EN" => Ok(Lang::En),
            other => Err(format!("unsupported language `{other}`")),
        }
    }
}

#[derive(Deserialize)]
struct RawDateTables {
    week_days: HashMap<String, Vec<String>>,
    months: HashMap<String, Vec<String>>,
}

struct DateTables {
    week_days: HashMap<Lang, Vec<String>>,
    months: HashMap<Lang, Vec<String>>,
}

fn by_lang<V>(raw: HashMap<String, V>) -> anyhow::Result<HashMap<Lang, V>> {
    raw.into_iter()
        .map(|(code, v)| {
            let lang = code.parse::<Lang>().map_err(anyhow::Error::msg)?;
            Ok((lang, v))
        })
        .collect()
}

pub struct Localizer {
    text: HashMap<String, HashMap<Lang, String>>,
    dates: DateTables,
    tz: Tz,
}

impl Localizer {
    /// Loads the tables compiled into the binary.
    pub fn embedded(tz: Tz) -> anyhow::Result<Self> {
        let raw: HashMap<String, HashMap<String, String>> =
            serde_json::from_str(TRANSLATIONS).context("parse translations.json")?;
        let text = raw
            .into_iter()
            .map(|(key, entry)| Ok((key, by_lang(entry)?)))
            .collect::<anyhow::Result<HashMap<_, _>>>()?;
        let raw_dates: RawDateTables =
            serde_json::from_str(DATETIME).context("parse datetime.json")?;
        let dates = DateTables {
            week_days: by_lang(raw_dates.week_days)?,
            months: by_lang(raw_dates.months)?,
        };
        for (lang, days) in &dates.week_days {
            anyhow::ensure!(days.len() == 7, "week_days[{lang}] must have 7 entries");
        }
        for (lang, months) in &dates.months {
            anyhow::ensure!(months.len() == 12, "months[{lang}] must have 12 entries");
        }
        Ok(Self { text, dates, tz })
    }

    /// Returns the translation, falling back to Ukrainian and then to the key itself.
    pub fn translate(&self, key: &str, lang: Lang) -> String {
        let Some(entry) = self.text.get(key) else {
            tracing::warn!(target: "i18n", key, "missing translation key");
            return key.to_string();
        };
        entry
            .get(&lang)
            .or_else(|| entry.get(&Lang::Ua))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Translates and substitutes `{name}` placeholders.
    pub fn translate_with(&self, key: &str, lang: Lang, args: &[(&str, String)]) -> String {
        let mut out = self.translate(key, lang);
        for (name, value) in args {
            out = out.replace(&format!("{{{name}}}"), value);
        }
        out
    }

    /// `"<weekday> <day> <month> HH:MM"` in the configured timezone.
    pub fn format_date_time(&self, ts: DateTime<Utc>, lang: Lang) -> String {
        let local = ts.with_timezone(&self.tz);
        let weekday = local.weekday().num_days_from_sunday() as usize;
        let month = local.month0() as usize;
        let day_name = self
            .dates
            .week_days
            .get(&lang)
            .and_then(|d| d.get(weekday))
            .map(String::as_str)
            .unwrap_or_default();
        let month_name = self
            .dates
            .months
            .get(&lang)
            .and_then(|m| m.get(month))
            .map(String::as_str)
            .unwrap_or_default();
        format!(
            "{} {} {} {:02}:{:02}",
            day_name,
            local.day(),
            month_name,
            local.hour(),
            local.minute()
        )
    }
}
