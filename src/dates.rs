//! Publication-date normalization.
//!
//! Each site prints its dates differently:
//!
//! | Format | Example | Source |
//! |--------|---------|--------|
//! | [`DateFormat::Iso8601`] | `2025-10-16T14:12:42-03:00` | `time[datetime]` attribute |
//! | [`DateFormat::LocalizedLong`] | `16 de Outubro, 2025 \| 02:04 PM` | visible byline text |
//! | [`DateFormat::ShortNumeric`] | `16.10.2025, 14:04` | visible byline text |
//!
//! A date that cannot be parsed is not fatal. Callers keep the article and
//! store it without a timestamp.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

const LOCALIZED_LAYOUT: &str = "%d de %m, %Y | %I:%M %p";
const SHORT_NUMERIC_LAYOUT: &str = "%d.%m.%Y, %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    Iso8601,
    LocalizedLong,
    ShortNumeric,
}

#[derive(Debug, Error)]
pub enum DateParseError {
    #[error("empty date string")]
    Empty,
    #[error("unknown month name {0:?}")]
    UnknownMonth(String),
    #[error("{input:?} does not match {layout:?}")]
    Layout {
        input: String,
        layout: &'static str,
        #[source]
        source: Option<chrono::ParseError>,
    },
}

/// Month-name to month-number lookup for one locale.
#[derive(Debug, Clone)]
pub struct MonthTable {
    months: HashMap<String, u32>,
}

impl MonthTable {
    /// Full and abbreviated Portuguese month names.
    pub fn portuguese() -> Self {
        const FULL: [&str; 12] = [
            "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto",
            "setembro", "outubro", "novembro", "dezembro",
        ];
        const SHORT: [&str; 12] = [
            "jan.", "fev.", "mar.", "abr.", "mai.", "jun.", "jul.", "ago.", "set.", "out.",
            "nov.", "dez.",
        ];
        Self::from_names(FULL.iter().chain(SHORT.iter()).zip((1..=12).cycle()))
    }

    pub fn from_names<S: AsRef<str>>(names: impl IntoIterator<Item = (S, u32)>) -> Self {
        Self {
            months: names
                .into_iter()
                .map(|(name, number)| (name.as_ref().to_lowercase(), number))
                .collect(),
        }
    }

    /// Month number for `token`, ignoring case.
    pub fn number(&self, token: &str) -> Option<u32> {
        self.months.get(&token.to_lowercase()).copied()
    }
}

/// Parses site date strings into offset-aware timestamps.
///
/// Offset-less formats are read in `offset`, which defaults to UTC.
#[derive(Debug, Clone)]
pub struct DateNormalizer {
    months: MonthTable,
    offset: FixedOffset,
    localized: Regex,
}

impl DateNormalizer {
    pub fn new(months: MonthTable) -> Self {
        Self {
            months,
            offset: Utc.fix(),
            localized: Regex::new(r"^(\d{1,2}) de ([^\s,]+),?\s+(.+)$")
                .expect("localized date pattern is valid"),
        }
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn parse(
        &self,
        raw: &str,
        format: DateFormat,
    ) -> Result<DateTime<FixedOffset>, DateParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DateParseError::Empty);
        }
        match format {
            DateFormat::Iso8601 => {
                DateTime::parse_from_rfc3339(raw).map_err(|e| DateParseError::Layout {
                    input: raw.to_string(),
                    layout: "RFC 3339",
                    source: Some(e),
                })
            }
            DateFormat::LocalizedLong => self.parse_localized(raw),
            DateFormat::ShortNumeric => self.parse_naive(raw, SHORT_NUMERIC_LAYOUT),
        }
    }

    fn parse_localized(&self, raw: &str) -> Result<DateTime<FixedOffset>, DateParseError> {
        let caps = self
            .localized
            .captures(raw)
            .ok_or_else(|| DateParseError::Layout {
                input: raw.to_string(),
                layout: LOCALIZED_LAYOUT,
                source: None,
            })?;
        let month_name = &caps[2];
        let month = self
            .months
            .number(month_name)
            .ok_or_else(|| DateParseError::UnknownMonth(month_name.to_string()))?;
        let numeric = format!("{} de {:02}, {}", &caps[1], month, &caps[3]);
        self.parse_naive(&numeric, LOCALIZED_LAYOUT)
    }

    fn parse_naive(
        &self,
        raw: &str,
        layout: &'static str,
    ) -> Result<DateTime<FixedOffset>, DateParseError> {
        let layout_error = |source| DateParseError::Layout {
            input: raw.to_string(),
            layout,
            source,
        };
        let naive = NaiveDateTime::parse_from_str(raw, layout).map_err(|e| layout_error(Some(e)))?;
        self.offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| layout_error(None))
    }
}
