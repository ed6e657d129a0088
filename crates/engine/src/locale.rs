//! Locale Formatting Module.
//!
//! Converts between the canonical stored representation of numbers
//! (`-1234.5`) and dates (`2024-03-01`, `2024-03`, `2024`,
//! `2024-03-01T09:30:00`) and the user-facing display strings configured by
//! [`NumberFormat`] and [`DateFormat`].
//!
//! Formatting is total: input that cannot be interpreted is returned as-is
//! and left for validation to flag.

use std::fmt::Write as _;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::column::{Column, ColumnType};
use crate::error::EngineError;
use crate::value::{canonical_number, CellValue};

/// Grouping characters that mark a string as already formatted even when
/// they are not the configured thousands separator.
pub const LEGACY_GROUP_MARKERS: [char; 3] = ['\u{00A0}', '\u{202F}', '\''];

// ============================================================================
// Number format
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NumberFormat {
    pub thousands_separator: char,
    pub decimal_separator: char,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            thousands_separator: ',',
            decimal_separator: '.',
        }
    }
}

impl NumberFormat {
    pub fn new(thousands_separator: char, decimal_separator: char) -> Self {
        Self {
            thousands_separator,
            decimal_separator,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.thousands_separator == self.decimal_separator {
            return Err(EngineError::InvalidNumberFormat(format!(
                "thousands and decimal separators are both '{}'",
                self.decimal_separator
            )));
        }
        for sep in [self.thousands_separator, self.decimal_separator] {
            if sep.is_ascii_digit() || sep == '-' || sep == '+' {
                return Err(EngineError::InvalidNumberFormat(format!(
                    "'{sep}' cannot be used as a separator"
                )));
            }
        }
        Ok(())
    }

    fn is_group_mark(&self, ch: char) -> bool {
        ch == self.thousands_separator || LEGACY_GROUP_MARKERS.contains(&ch)
    }

    /// True when `s` is a well-formed display string that already carries
    /// grouping or a localized decimal mark.
    fn looks_formatted(&self, s: &str) -> bool {
        let marked = s.chars().any(|ch| {
            self.is_group_mark(ch) || (self.decimal_separator != '.' && ch == self.decimal_separator)
        });
        marked && self.ungroup(s).is_some()
    }

    /// Canonical form of a display string. Grouping marks are accepted only
    /// between runs of exactly three digits, so `12,34` is not a number.
    fn ungroup(&self, s: &str) -> Option<String> {
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int, frac) = match body.split_once(self.decimal_separator) {
            Some((int, frac)) => (int, Some(frac)),
            None => (body, None),
        };
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !frac.map_or(true, digits) {
            return None;
        }

        let mut groups = int.split(|ch: char| self.is_group_mark(ch));
        let lead = groups.next().filter(|g| digits(*g))?;
        let mut out = String::with_capacity(s.len());
        if negative {
            out.push('-');
        }
        out.push_str(lead);
        let mut grouped = false;
        for group in groups {
            if !digits(group) || group.len() != 3 {
                return None;
            }
            out.push_str(group);
            grouped = true;
        }
        if grouped && lead.len() > 3 {
            return None;
        }
        if let Some(frac) = frac {
            out.push('.');
            out.push_str(frac);
        }
        Some(out)
    }
}

/// Format a canonical numeric string for display.
///
/// Input that is already correctly grouped with the configured separators
/// (or a legacy grouping marker) is returned unchanged, as is anything that
/// is not a canonical number. Under a `.` thousands separator a canonical
/// value like `1.234` reads as grouped and is kept.
pub fn format_number(raw: &str, format: &NumberFormat) -> String {
    let trimmed = raw.trim();
    if format.looks_formatted(trimmed) {
        return raw.to_string();
    }
    group_canonical(trimmed, format).unwrap_or_else(|| raw.to_string())
}

/// Format a stored number. Numbers carry no separators, so no guard applies.
pub fn format_number_value(n: f64, format: &NumberFormat) -> String {
    let canonical = canonical_number(n);
    group_canonical(&canonical, format).unwrap_or(canonical)
}

/// Parse a display string back to a number.
///
/// Well-formed display text wins: thousands separators and legacy markers
/// must sit on three-digit boundaries, the decimal separator maps to `.`.
/// Otherwise the canonical form (`-1234.5`) is accepted.
pub fn parse_number(display: &str, format: &NumberFormat) -> Option<f64> {
    let trimmed = display.trim();
    let canonical = match format.ungroup(trimmed) {
        Some(canonical) => canonical,
        None => {
            let unsigned = match trimmed.strip_prefix('+') {
                Some(rest) if rest.starts_with('-') => return None,
                Some(rest) => rest,
                None => trimmed,
            };
            split_canonical(unsigned)?;
            unsigned.to_string()
        }
    };
    canonical.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric interpretation of a cell under a number column.
pub fn cell_number(value: &CellValue, format: &NumberFormat) -> Option<f64> {
    match value {
        CellValue::Empty => None,
        CellValue::Number(_) => value.as_number(),
        CellValue::Text(s) => parse_number(s, format),
    }
}

/// Split `-?\d+(\.\d+)?` into (negative, integer digits, fraction digits).
fn split_canonical(s: &str) -> Option<(bool, &str, Option<&str>)> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (int, frac) = match body.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (body, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits(int) || !frac.map_or(true, digits) {
        return None;
    }
    Some((negative, int, frac))
}

fn group_canonical(s: &str, format: &NumberFormat) -> Option<String> {
    let (negative, int, frac) = split_canonical(s)?;

    let mut out = String::with_capacity(s.len() + int.len() / 3 + 1);
    if negative {
        out.push('-');
    }
    let len = int.len();
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(format.thousands_separator);
        }
        out.push(ch);
    }
    if let Some(frac) = frac {
        out.push(format.decimal_separator);
        out.push_str(frac);
    }
    Some(out)
}

// ============================================================================
// Date format
// ============================================================================

/// Precision implied by a date pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Year,
    YearMonth,
    Date,
    DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateToken {
    Year4,
    Year2,
    MonthName,
    MonthAbbrev,
    Month2,
    Month1,
    Day2,
    Day1,
    Hour2,
    Hour1,
    Minute2,
    Second2,
    Literal(char),
}

// Longest tokens first so `MMMM` wins over `MM`.
const TOKENS: [(&str, DateToken); 12] = [
    ("YYYY", DateToken::Year4),
    ("YY", DateToken::Year2),
    ("MMMM", DateToken::MonthName),
    ("MMM", DateToken::MonthAbbrev),
    ("MM", DateToken::Month2),
    ("M", DateToken::Month1),
    ("DD", DateToken::Day2),
    ("D", DateToken::Day1),
    ("HH", DateToken::Hour2),
    ("H", DateToken::Hour1),
    ("mm", DateToken::Minute2),
    ("ss", DateToken::Second2),
];

fn tokenize(pattern: &str) -> Vec<DateToken> {
    let mut tokens = Vec::new();
    let mut rest = pattern;
    'outer: while let Some(ch) = rest.chars().next() {
        for (text, token) in TOKENS {
            if let Some(after) = rest.strip_prefix(text) {
                tokens.push(token);
                rest = after;
                continue 'outer;
            }
        }
        tokens.push(DateToken::Literal(ch));
        rest = &rest[ch.len_utf8()..];
    }
    tokens
}

/// Display pattern for date cells, e.g. `DD/MM/YYYY` or `MMM YYYY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DateFormat {
    pattern: String,
    chrono_format: String,
    granularity: Granularity,
    has_year: bool,
    has_month: bool,
    has_day: bool,
    has_time: bool,
    has_hour: bool,
    has_minute: bool,
}

impl Default for DateFormat {
    fn default() -> Self {
        Self::new("YYYY-MM-DD")
    }
}

impl From<String> for DateFormat {
    fn from(pattern: String) -> Self {
        Self::new(pattern)
    }
}

impl From<DateFormat> for String {
    fn from(format: DateFormat) -> Self {
        format.pattern
    }
}

impl DateFormat {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let tokens = tokenize(&pattern);

        let mut chrono_format = String::with_capacity(pattern.len() * 2);
        for token in &tokens {
            match token {
                DateToken::Year4 => chrono_format.push_str("%Y"),
                DateToken::Year2 => chrono_format.push_str("%y"),
                DateToken::MonthName => chrono_format.push_str("%B"),
                DateToken::MonthAbbrev => chrono_format.push_str("%b"),
                DateToken::Month2 => chrono_format.push_str("%m"),
                DateToken::Month1 => chrono_format.push_str("%-m"),
                DateToken::Day2 => chrono_format.push_str("%d"),
                DateToken::Day1 => chrono_format.push_str("%-d"),
                DateToken::Hour2 => chrono_format.push_str("%H"),
                DateToken::Hour1 => chrono_format.push_str("%-H"),
                DateToken::Minute2 => chrono_format.push_str("%M"),
                DateToken::Second2 => chrono_format.push_str("%S"),
                DateToken::Literal('%') => chrono_format.push_str("%%"),
                DateToken::Literal(ch) => chrono_format.push(*ch),
            }
        }

        let has = |wanted: &[DateToken]| tokens.iter().any(|t| wanted.contains(t));
        let has_year = has(&[DateToken::Year4, DateToken::Year2]);
        let has_month = has(&[
            DateToken::MonthName,
            DateToken::MonthAbbrev,
            DateToken::Month2,
            DateToken::Month1,
        ]);
        let has_day = has(&[DateToken::Day2, DateToken::Day1]);
        let has_hour = has(&[DateToken::Hour2, DateToken::Hour1]);
        let has_minute = has(&[DateToken::Minute2]);
        let has_second = has(&[DateToken::Second2]);

        let granularity = if has_hour || has_minute || has_second {
            Granularity::DateTime
        } else if has_day {
            Granularity::Date
        } else if has_month {
            Granularity::YearMonth
        } else {
            Granularity::Year
        };

        Self {
            pattern,
            chrono_format,
            granularity,
            has_year,
            has_month,
            has_day,
            has_time: has_hour || has_minute || has_second,
            has_hour,
            has_minute,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Parse a string written in this pattern. Fields the pattern lacks
    /// default to the start of their period.
    fn parse_display(&self, input: &str) -> Option<NaiveDateTime> {
        let mut text = input.to_string();
        let mut fmt = self.chrono_format.clone();
        let fills = [
            (self.has_year, "%Y", "1970"),
            (self.has_month, "%m", "01"),
            (self.has_day, "%d", "01"),
            (!self.has_time || self.has_hour, "%H", "00"),
            (!self.has_time || self.has_minute, "%M", "00"),
        ];
        for (present, spec, value) in fills {
            if !present {
                fmt.push('\u{1}');
                fmt.push_str(spec);
                text.push('\u{1}');
                text.push_str(value);
            }
        }

        if self.has_time {
            NaiveDateTime::parse_from_str(&text, &fmt).ok()
        } else {
            NaiveDate::parse_from_str(&text, &fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
    }

    /// Render an instant in this pattern. `None` if the pattern cannot be
    /// rendered.
    pub fn render(&self, instant: &NaiveDateTime) -> Option<String> {
        let mut out = String::new();
        write!(out, "{}", instant.format(&self.chrono_format)).ok()?;
        Some(out)
    }
}

const CANONICAL_DATE_TIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse one of the canonical stored forms: RFC 3339, `YYYY-MM-DD[T ]HH:MM[:SS]`,
/// `YYYY-MM-DD`, `YYYY-MM`, or `YYYY`.
pub fn parse_canonical_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in CANONICAL_DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }

    let (year, month) = match s.split_once('-') {
        Some((year, month)) => (year, Some(month)),
        None => (s, None),
    };
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = match month {
        Some(m) if (1..=2).contains(&m.len()) && m.bytes().all(|b| b.is_ascii_digit()) => {
            m.parse().ok()?
        }
        Some(_) => return None,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}

/// Parse a date typed in `format`, falling back to the canonical forms.
pub fn parse_date(display: &str, format: &DateFormat) -> Option<NaiveDateTime> {
    let trimmed = display.trim();
    if trimmed.is_empty() {
        return None;
    }
    format
        .parse_display(trimmed)
        .or_else(|| parse_canonical_date(trimmed))
}

/// Map a canonical stored date to `format`. Input already in the display
/// pattern, or not a date at all, is returned unchanged.
pub fn format_date(raw: &str, format: &DateFormat) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || format.parse_display(trimmed).is_some() {
        return raw.to_string();
    }
    parse_canonical_date(trimmed)
        .and_then(|instant| format.render(&instant))
        .unwrap_or_else(|| raw.to_string())
}

/// Drop everything finer than `granularity`.
pub fn truncate_to(instant: NaiveDateTime, granularity: Granularity) -> NaiveDateTime {
    let truncated = match granularity {
        Granularity::Year => NaiveDate::from_ymd_opt(instant.year(), 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0)),
        Granularity::YearMonth => NaiveDate::from_ymd_opt(instant.year(), instant.month(), 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0)),
        Granularity::Date => instant.date().and_hms_opt(0, 0, 0),
        Granularity::DateTime => instant.with_nanosecond(0),
    };
    truncated.unwrap_or(instant)
}

/// Date interpretation of a cell. Integral numbers in `1..=9999` are years.
pub fn cell_date(value: &CellValue, format: &DateFormat) -> Option<NaiveDateTime> {
    match value {
        CellValue::Empty => None,
        CellValue::Text(s) => parse_date(s, format),
        CellValue::Number(n) => {
            if n.fract() == 0.0 && (1.0..=9999.0).contains(n) {
                NaiveDate::from_ymd_opt(*n as i32, 1, 1)?.and_hms_opt(0, 0, 0)
            } else {
                None
            }
        }
    }
}

// ============================================================================
// Locale bundle
// ============================================================================

/// Number and date formats of one dataset session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Locale {
    pub number: NumberFormat,
    pub date: DateFormat,
}

impl Locale {
    pub fn new(number: NumberFormat, date: DateFormat) -> Self {
        Self { number, date }
    }
}

/// Display string for a cell under its column's type. Never fails.
pub fn display_value(value: &CellValue, column: &Column, locale: &Locale) -> String {
    match (value, column.column_type) {
        (CellValue::Empty, _) => String::new(),
        (CellValue::Number(n), ColumnType::Number) => format_number_value(*n, &locale.number),
        (CellValue::Text(s), ColumnType::Number) => format_number(s, &locale.number),
        (CellValue::Text(s), ColumnType::Date) => {
            format_date(s, &column.effective_date_format(&locale.date))
        }
        (other, _) => other.raw_text().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn us() -> NumberFormat {
        NumberFormat::default()
    }

    fn eu() -> NumberFormat {
        NumberFormat::new(' ', ',')
    }

    #[test]
    fn test_format_number_groups_integer_part() {
        assert_eq!(format_number("1234567.891", &us()), "1,234,567.891");
        assert_eq!(format_number("-1234", &us()), "-1,234");
        assert_eq!(format_number("999", &us()), "999");
        assert_eq!(format_number("1234.5", &eu()), "1 234,5");
    }

    #[test]
    fn test_format_number_does_not_double_format() {
        assert_eq!(format_number("1,234", &us()), "1,234");
        assert_eq!(format_number("1\u{00A0}234", &us()), "1\u{00A0}234");
        assert_eq!(format_number("1'234", &us()), "1'234");
        assert_eq!(format_number("1 234,5", &eu()), "1 234,5");
    }

    #[test]
    fn test_format_number_passes_through_garbage() {
        assert_eq!(format_number("abc", &us()), "abc");
        assert_eq!(format_number("", &us()), "");
        assert_eq!(format_number("1.2.3", &us()), "1.2.3");
    }

    #[test]
    fn test_format_number_value() {
        assert_eq!(format_number_value(1234.0, &us()), "1,234");
        assert_eq!(format_number_value(-0.25, &eu()), "-0,25");
        assert_eq!(format_number_value(f64::NAN, &us()), "NaN");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1,234", &us()), Some(1234.0));
        assert_eq!(parse_number(" -50 ", &us()), Some(-50.0));
        assert_eq!(parse_number("+7.5", &us()), Some(7.5));
        assert_eq!(parse_number("1 234,5", &eu()), Some(1234.5));
        assert_eq!(parse_number("1\u{202F}000", &us()), Some(1000.0));
        assert_eq!(parse_number("abc", &us()), None);
        assert_eq!(parse_number("+-1", &us()), None);
        assert_eq!(parse_number("1.", &us()), None);
        assert_eq!(parse_number("", &us()), None);
    }

    #[test]
    fn test_dot_grouping_round_trips() {
        let de = NumberFormat::new('.', ',');
        assert_eq!(format_number("1234.5", &de), "1.234,5");
        assert_eq!(parse_number(&format_number("1234.5", &de), &de), Some(1234.5));
        assert_eq!(format_number("12.34", &de), "12,34");
        assert_eq!(parse_number("12,34", &de), Some(12.34));
        assert_eq!(format_number("1.234.567,8", &de), "1.234.567,8");
        assert_eq!(parse_number("1.234.567,8", &de), Some(1234567.8));
        // Canonical input that no grouping could have produced.
        assert_eq!(parse_number("1234.5", &de), Some(1234.5));
        // Correctly grouped text keeps its display meaning.
        assert_eq!(format_number("1.234", &de), "1.234");
        assert_eq!(parse_number("1.234", &de), Some(1234.0));
    }

    #[test]
    fn test_parse_number_requires_three_digit_groups() {
        assert_eq!(parse_number("12,34", &us()), None);
        assert_eq!(parse_number("1,2,3", &us()), None);
        assert_eq!(parse_number("1234,567", &us()), None);
        assert_eq!(parse_number(",123", &us()), None);
        assert_eq!(parse_number("12,345,678.9", &us()), Some(12345678.9));
        assert_eq!(parse_number("-1'234", &us()), Some(-1234.0));
        assert_eq!(parse_number("1 23,5", &eu()), None);
        assert_eq!(format_number("12,34", &us()), "12,34");
    }

    #[test]
    fn test_number_format_validation() {
        assert!(us().validate().is_ok());
        assert!(NumberFormat::new('.', '.').validate().is_err());
        assert!(NumberFormat::new('1', '.').validate().is_err());
        assert!(NumberFormat::new(',', '-').validate().is_err());
    }

    #[test]
    fn test_granularity_from_pattern() {
        assert_eq!(DateFormat::new("YYYY").granularity(), Granularity::Year);
        assert_eq!(DateFormat::new("MMM YYYY").granularity(), Granularity::YearMonth);
        assert_eq!(DateFormat::new("DD/MM/YYYY").granularity(), Granularity::Date);
        assert_eq!(DateFormat::new("YYYY-MM-DD HH:mm").granularity(), Granularity::DateTime);
    }

    #[test]
    fn test_format_date_from_canonical() {
        let dmy = DateFormat::new("DD/MM/YYYY");
        assert_eq!(format_date("2024-03-07", &dmy), "07/03/2024");
        assert_eq!(format_date("07/03/2024", &dmy), "07/03/2024");
        assert_eq!(format_date("not a date", &dmy), "not a date");

        let month = DateFormat::new("MMM YYYY");
        assert_eq!(format_date("2024-03", &month), "Mar 2024");

        let stamp = DateFormat::new("YYYY-MM-DD HH:mm");
        assert_eq!(format_date("2024-03-07T09:05:00", &stamp), "2024-03-07 09:05");
    }

    #[test]
    fn test_parse_date_partial_patterns() {
        let month = DateFormat::new("MM/YYYY");
        let parsed = parse_date("03/2024", &month).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        let year = DateFormat::new("YYYY");
        assert_eq!(parse_date("1999", &year).unwrap().year(), 1999);

        // Canonical values parse under any pattern.
        let dmy = DateFormat::new("DD.MM.YYYY");
        assert!(parse_date("2024-02-29", &dmy).is_some());
        assert!(parse_date("2023-02-29", &dmy).is_none());
        assert!(parse_date("soon", &dmy).is_none());
    }

    #[test]
    fn test_truncate_to_granularity() {
        let instant = NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(13, 45, 10)
            .unwrap();
        let month = truncate_to(instant, Granularity::YearMonth);
        assert_eq!(month.date(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(month.hour(), 0);
        assert_eq!(truncate_to(instant, Granularity::DateTime), instant);
    }

    #[test]
    fn test_cell_date_accepts_year_numbers() {
        let fmt = DateFormat::new("YYYY");
        assert_eq!(cell_date(&CellValue::Number(2020.0), &fmt).unwrap().year(), 2020);
        assert!(cell_date(&CellValue::Number(2020.5), &fmt).is_none());
        assert!(cell_date(&CellValue::Empty, &fmt).is_none());
    }

    #[test]
    fn test_display_value_by_column_type() {
        let locale = Locale::default();
        let qty = Column::number("q", "Qty");
        let when = Column::date("d", "When").with_date_format("DD/MM/YYYY");
        let label = Column::text("t", "Label");

        assert_eq!(display_value(&CellValue::Number(1500.0), &qty, &locale), "1,500");
        assert_eq!(display_value(&CellValue::from("abc"), &qty, &locale), "abc");
        assert_eq!(display_value(&CellValue::from("2024-01-31"), &when, &locale), "31/01/2024");
        assert_eq!(display_value(&CellValue::Number(3.0), &label, &locale), "3");
        assert_eq!(display_value(&CellValue::Empty, &label, &locale), "");
    }

    #[test]
    fn test_locale_serde_shape() {
        let locale: Locale = serde_json::from_str(
            r#"{"number":{"thousandsSeparator":".","decimalSeparator":","},"date":"DD.MM.YYYY"}"#,
        )
        .unwrap();
        assert_eq!(locale.number, NumberFormat::new('.', ','));
        assert_eq!(locale.date.pattern(), "DD.MM.YYYY");
        assert_eq!(
            serde_json::to_value(&locale.date).unwrap(),
            serde_json::json!("DD.MM.YYYY")
        );
    }
}
