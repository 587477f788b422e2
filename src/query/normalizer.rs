//! Result normalization: one result per entity with canonical dates.

use crate::query::types::{Extraction, MetricResult};
use chrono::{DateTime, Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

/// 出力日付の正規形式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Length of the default look-back window.
pub const DEFAULT_RANGE_DAYS: i64 = 365;

/// Parsed years below this are rejected. chrono's `%Y` accepts any digit
/// count, so `"March 2024"` would otherwise match `%B %d %Y` as year 24.
const MIN_YEAR: i32 = 1000;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%A, %B %d, %Y",
    "%a, %b %d, %Y",
];

// Two-digit years, expanded relative to today.
const SHORT_YEAR_FORMATS: &[&str] = &["%m/%d/%y", "%m-%d-%y", "%d.%m.%y", "%B %d, %y", "%d %B %y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

// Day is borrowed from today, clamped to the month's length.
const MONTH_YEAR_FORMATS: &[&str] = &["%B %Y", "%B, %Y", "%Y-%m", "%Y/%m", "%m/%Y"];

// Year is borrowed from today.
const MONTH_DAY_FORMATS: &[&str] = &["%B %d", "%d %B", "%m/%d"];

static ORDINAL_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("static pattern"));

/// Expands an [`Extraction`] into [`MetricResult`]s.
#[derive(Debug, Clone, Default)]
pub struct ResultNormalizer {
    today: Option<NaiveDate>,
}

impl ResultNormalizer {
    /// Normalizer anchored on the local calendar date at call time.
    pub fn new() -> Self {
        Self { today: None }
    }

    /// 「今日」を固定した正規化器（テスト・ベンチ用）
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// `[today - 365d, today]` formatted as `YYYY-MM-DD`.
    pub fn default_range(&self) -> (String, String) {
        let end = self.today();
        let start = end - Duration::days(DEFAULT_RANGE_DAYS);
        (
            start.format(DATE_FORMAT).to_string(),
            end.format(DATE_FORMAT).to_string(),
        )
    }

    /// One result per entity, in order, duplicates kept.
    pub fn normalize(&self, extraction: &Extraction) -> Vec<MetricResult> {
        let today = self.today();
        let normalizer = Self::with_today(today);
        let (default_start, default_end) = normalizer.default_range();

        let start_date =
            normalizer.normalize_date(extraction.dates.start.as_deref().unwrap_or(&default_start));
        let end_date =
            normalizer.normalize_date(extraction.dates.end.as_deref().unwrap_or(&default_end));

        extraction
            .entities
            .iter()
            .map(|entity| MetricResult {
                entity: entity.clone(),
                parameter: extraction.parameter.clone(),
                start_date: start_date.clone(),
                end_date: end_date.clone(),
            })
            .collect()
    }

    /// Reformat a parseable date as `YYYY-MM-DD`; return anything else
    /// unchanged.
    pub fn normalize_date(&self, input: &str) -> String {
        match parse_date(input, self.today()) {
            Some(date) => date.format(DATE_FORMAT).to_string(),
            None => input.to_string(),
        }
    }
}

/// Permissive date parsing. Fields missing from partial dates are taken
/// from `today`: the day for `March 2024`, month and day for `2024`, the year
/// for `March 31`. A borrowed day past the end of the month is clamped.
pub fn parse_date(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let cleaned = ORDINAL_SUFFIX.replace_all(input.trim(), "$1");
    let text = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Some(dt.date_naive()).filter(plausible);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&text) {
        return Some(dt.date_naive()).filter(plausible);
    }

    let full = |fmt: &&str| NaiveDate::parse_from_str(&text, fmt).ok().filter(plausible);
    if let Some(date) = DATE_FORMATS.iter().find_map(full) {
        return Some(date);
    }

    if let Some(date) = DATETIME_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(&text, fmt)
            .ok()
            .map(|dt| dt.date())
            .filter(plausible)
    }) {
        return Some(date);
    }

    if let Some(date) = SHORT_YEAR_FORMATS.iter().find_map(|fmt| {
        let date = NaiveDate::parse_from_str(&text, fmt).ok()?;
        let year = expand_short_year(date.year().rem_euclid(100), today);
        NaiveDate::from_ymd_opt(year, date.month(), date.day())
    }) {
        return Some(date);
    }

    if text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit()) {
        let year = text[0..4].parse().ok()?;
        let month = text[4..6].parse().ok()?;
        let day = text[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day).filter(plausible);
    }

    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
        let year = text.parse::<i32>().ok().filter(|y| *y >= MIN_YEAR)?;
        return with_clamped_day(year, today.month(), today.day());
    }

    let first_of_month = format!("{} 1", text);
    if let Some(first) = MONTH_YEAR_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(&first_of_month, &format!("{} %d", fmt))
            .ok()
            .filter(plausible)
    }) {
        return with_clamped_day(first.year(), first.month(), today.day());
    }

    let this_year = format!("{} {}", text, today.year());
    MONTH_DAY_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(&this_year, &format!("{} %Y", fmt)).ok()
    })
}

fn plausible(date: &NaiveDate) -> bool {
    date.year() >= MIN_YEAR
}

/// 2桁の年を、今日から前後50年以内に収まる世紀に展開
fn expand_short_year(short: i32, today: NaiveDate) -> i32 {
    let current = today.year();
    let year = current - current.rem_euclid(100) + short;
    if year >= current + 50 {
        year - 100
    } else if year < current - 50 {
        year + 100
    } else {
        year
    }
}

fn with_clamped_day(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map_or(28, |d| d.day());
    NaiveDate::from_ymd_opt(year, month, day.min(last))
}
