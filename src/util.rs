// Value parsers and small numeric helpers.
//
// Everything that has to cope with "dirty" spreadsheet cells lives here so
// the processor can assume clean, typed values. None of these functions
// fail: unparseable input turns into the documented default.
use crate::config::StatusPrecedence;
use crate::types::{CellValue, InventoryStatus};
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Variances smaller than this are treated as an exact match.
pub const VARIANCE_EPSILON: f64 = 1e-9;

/// Spreadsheet serial day of 1970-01-01.
const SERIAL_UNIX_EPOCH: u64 = 25569;
/// Spreadsheet serial day of 9999-12-31, the last date a sheet can hold.
const MAX_SERIAL: f64 = 2_958_466.0;

/// Text dates outside these years are typos or non-dates.
const PLAUSIBLE_YEARS: std::ops::RangeInclusive<i32> = 1900..=9999;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%Y%m%d",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parse a currency cell the way es-CO exports write money:
/// `$` prefix, `.` as thousands separator and `,` as decimal mark.
///
/// - Native numbers are returned as-is.
/// - Blank cells and a lone `-` are 0.
/// - Any text that still fails to parse is 0.
///
/// Plain `1.234` is therefore read as one thousand two hundred thirty four.
pub fn parse_currency(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() || s == "-" {
                return 0.0;
            }
            let cleaned: String = s
                .chars()
                .filter(|c| *c != '$' && *c != '.' && !c.is_whitespace())
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            leading_float(&cleaned).unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

/// Parse a quantity cell (stock, variance).
///
/// Returns `None` when the cell is blank or not numeric so callers can tell
/// "absent" apart from an explicit zero. Text is read as a plain float
/// first; text carrying a decimal comma gets the es-CO rewrite.
pub fn parse_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(n) = s.parse::<f64>() {
                return Some(n).filter(|n| n.is_finite());
            }
            if s.contains(',') {
                let rewritten: String = s
                    .chars()
                    .filter(|c| *c != '.' && !c.is_whitespace())
                    .map(|c| if c == ',' { '.' } else { c })
                    .collect();
                return rewritten.parse::<f64>().ok().filter(|n| n.is_finite());
            }
            None
        }
        _ => None,
    }
}

/// Read the longest numeric prefix of `s`, like JavaScript's `parseFloat`.
fn leading_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let mut seen_digit = false;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return None;
    }
    s[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Normalize any date-ish cell to `YYYY-MM-DD`, or an empty string when
/// nothing sensible can be read.
pub fn parse_date(cell: &CellValue) -> String {
    let date = match cell {
        CellValue::Number(n) => date_from_serial(*n),
        CellValue::Date(d) => Some(*d),
        CellValue::Text(s) => parse_date_text(s),
        CellValue::Empty | CellValue::Bool(_) => None,
    };
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Spreadsheet serial day → calendar date. The fractional part is the
/// time of day and is dropped.
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial >= MAX_SERIAL {
        return None;
    }
    // Day 25569 is the Unix epoch, so day 0 is 1899-12-30.
    let day_zero =
        NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_sub_days(Days::new(SERIAL_UNIX_EPOCH))?;
    day_zero.checked_add_days(Days::new(serial.floor() as u64))
}

fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // Serial numbers that went through a CSV export arrive as text. Shorter
    // numbers are more likely a bare year or a code than a date.
    let int_part = s.split('.').next().unwrap_or(s);
    if int_part.len() >= 5 && int_part.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(serial) = s.parse::<f64>() {
            if let Some(d) = date_from_serial(serial) {
                return Some(d);
            }
        }
    }

    // Drop any time component before looking at the day/month/year tokens.
    let date_part = s
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()
        .unwrap_or(s);
    let tokens: Vec<&str> = date_part.split(|c: char| c == '/' || c == '-').collect();
    if tokens.len() == 3 {
        let digits = |t: &str, len: usize| t.len() == len && t.chars().all(|c| c.is_ascii_digit());
        // (year, month, day, century added to a two-digit year)
        let ymd = if digits(tokens[2], 4) {
            Some((tokens[2], tokens[1], tokens[0], 0))
        } else if digits(tokens[0], 4) {
            Some((tokens[0], tokens[1], tokens[2], 0))
        } else if digits(tokens[2], 2) {
            Some((tokens[2], tokens[1], tokens[0], 2000))
        } else {
            None
        };
        if let Some((y, m, d, century)) = ymd {
            if let (Ok(y), Ok(m), Ok(d)) = (y.parse::<i32>(), m.parse::<u32>(), d.parse::<u32>()) {
                if let Some(date) = NaiveDate::from_ymd_opt(y + century, m, d) {
                    return Some(date).filter(is_plausible);
                }
            }
        }
    }

    parse_date_generic(s).filter(is_plausible)
}

fn is_plausible(date: &NaiveDate) -> bool {
    PLAUSIBLE_YEARS.contains(&date.year())
}

fn parse_date_generic(s: &str) -> Option<NaiveDate> {
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.date_naive())
        .ok()
}

/// Match the free-text status vocabulary used by count sheets.
pub fn status_from_text(raw: &str) -> Option<InventoryStatus> {
    match raw.trim().to_uppercase().as_str() {
        "FALTANTE" | "FALTANTES" => Some(InventoryStatus::Shortage),
        "SOBRANTE" | "SOBRANTES" => Some(InventoryStatus::Surplus),
        "SIN NOVEDAD" | "SINNOVEDAD" => Some(InventoryStatus::NoIssue),
        _ => None,
    }
}

pub fn status_from_variance(variance: f64) -> InventoryStatus {
    if variance <= -VARIANCE_EPSILON {
        InventoryStatus::Shortage
    } else if variance >= VARIANCE_EPSILON {
        InventoryStatus::Surplus
    } else {
        InventoryStatus::NoIssue
    }
}

/// Resolve the canonical status of a count line from its status text and
/// signed variance.
pub fn normalize_status(
    raw: Option<&str>,
    variance: f64,
    precedence: StatusPrecedence,
) -> InventoryStatus {
    let from_text = raw.and_then(status_from_text);
    match precedence {
        StatusPrecedence::TextFirst => {
            from_text.unwrap_or_else(|| status_from_variance(variance))
        }
        StatusPrecedence::SignFirst => match status_from_variance(variance) {
            InventoryStatus::NoIssue => from_text.unwrap_or(InventoryStatus::NoIssue),
            by_sign => by_sign,
        },
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimal places plus thousands separators (e.g. `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages (e.g. `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn currency_uses_es_co_separators() {
        assert!((parse_currency(&text("$1.234,56")) - 1234.56).abs() < 1e-9);
        assert_eq!(parse_currency(&text("$ 150.000")), 150000.0);
        assert_eq!(parse_currency(&text("-$2.500")), -2500.0);
        assert_eq!(parse_currency(&text("1.234")), 1234.0);
    }

    #[test]
    fn currency_defaults_to_zero() {
        assert_eq!(parse_currency(&CellValue::Empty), 0.0);
        assert_eq!(parse_currency(&text("")), 0.0);
        assert_eq!(parse_currency(&text("  -  ")), 0.0);
        assert_eq!(parse_currency(&text("n/a")), 0.0);
        assert_eq!(parse_currency(&CellValue::Bool(true)), 0.0);
        assert_eq!(parse_currency(&CellValue::Number(f64::NAN)), 0.0);
    }

    #[test]
    fn currency_keeps_native_numbers() {
        assert_eq!(parse_currency(&CellValue::Number(75000.5)), 75000.5);
        assert_eq!(parse_currency(&CellValue::Number(-12.0)), -12.0);
    }

    #[test]
    fn currency_reads_numeric_prefix() {
        assert_eq!(parse_currency(&text("$45.000 COP")), 45000.0);
    }

    #[test]
    fn number_parsing() {
        assert_eq!(parse_number(&text(" 12.5 ")), Some(12.5));
        assert_eq!(parse_number(&text("-2,5")), Some(-2.5));
        assert_eq!(parse_number(&text("1.200,75")), Some(1200.75));
        assert_eq!(parse_number(&CellValue::Number(3.0)), Some(3.0));
        assert_eq!(parse_number(&text("")), None);
        assert_eq!(parse_number(&text("abc")), None);
        assert_eq!(parse_number(&text("inf")), None);
        assert_eq!(parse_number(&CellValue::Empty), None);
    }

    #[test]
    fn serial_and_slash_dates_agree() {
        assert_eq!(parse_date(&CellValue::Number(45016.0)), "2023-03-31");
        assert_eq!(parse_date(&text("31/03/2023")), "2023-03-31");
        assert_eq!(parse_date(&CellValue::Number(45000.0)), "2023-03-15");
        assert_eq!(parse_date(&CellValue::Number(25569.0)), "1970-01-01");
    }

    #[test]
    fn serial_time_of_day_is_dropped() {
        assert_eq!(parse_date(&CellValue::Number(45016.75)), "2023-03-31");
        assert_eq!(parse_date(&text("45016")), "2023-03-31");
    }

    #[test]
    fn delimited_dates() {
        assert_eq!(parse_date(&text("2024-03-01")), "2024-03-01");
        assert_eq!(parse_date(&text("05-01-2024")), "2024-01-05");
        assert_eq!(parse_date(&text("2024/2/9")), "2024-02-09");
        assert_eq!(parse_date(&text("2024-03-01 08:15:00")), "2024-03-01");
        assert_eq!(parse_date(&text("2024-03-01T08:15:00Z")), "2024-03-01");
    }

    #[test]
    fn generic_fallback_dates() {
        assert_eq!(parse_date(&text("20240315")), "2024-03-15");
        assert_eq!(parse_date(&text("15.03.2024")), "2024-03-15");
        assert_eq!(parse_date(&text("15 Mar 2024")), "2024-03-15");
    }

    #[test]
    fn two_digit_years_are_day_first() {
        assert_eq!(parse_date(&text("5/3/24")), "2024-03-05");
        assert_eq!(parse_date(&text("31-12-23")), "2023-12-31");
    }

    #[test]
    fn short_numbers_and_odd_years_are_not_dates() {
        assert_eq!(parse_date(&text("2024")), "");
        assert_eq!(parse_date(&text("101")), "");
        assert_eq!(parse_date(&text("0005-03-24")), "");
        assert_eq!(parse_date(&text("24/03/0005")), "");
        assert_eq!(parse_date(&CellValue::Number(2024.0)), "1905-07-16");
    }

    #[test]
    fn native_date_is_formatted() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(parse_date(&CellValue::Date(d)), "2024-02-29");
    }

    #[test]
    fn unparseable_dates_are_empty() {
        assert_eq!(parse_date(&CellValue::Empty), "");
        assert_eq!(parse_date(&text("   ")), "");
        assert_eq!(parse_date(&text("31/02/2023")), "");
        assert_eq!(parse_date(&text("mañana")), "");
        assert_eq!(parse_date(&CellValue::Number(-4.0)), "");
        assert_eq!(parse_date(&CellValue::Number(f64::INFINITY)), "");
    }

    #[test]
    fn status_text_matching() {
        assert_eq!(status_from_text(" faltantes "), Some(InventoryStatus::Shortage));
        assert_eq!(status_from_text("Sobrante"), Some(InventoryStatus::Surplus));
        assert_eq!(status_from_text("Sin novedad"), Some(InventoryStatus::NoIssue));
        assert_eq!(status_from_text("SINNOVEDAD"), Some(InventoryStatus::NoIssue));
        assert_eq!(status_from_text("revisar"), None);
    }

    #[test]
    fn status_text_wins_by_default() {
        let p = StatusPrecedence::TextFirst;
        assert_eq!(normalize_status(Some(""), 3.0, p), InventoryStatus::Surplus);
        assert_eq!(normalize_status(None, -1.0, p), InventoryStatus::Shortage);
        assert_eq!(normalize_status(None, 0.0, p), InventoryStatus::NoIssue);
        assert_eq!(normalize_status(Some("Faltante"), 0.0, p), InventoryStatus::Shortage);
        assert_eq!(normalize_status(Some("Sobrante"), -4.0, p), InventoryStatus::Surplus);
    }

    #[test]
    fn status_sign_first() {
        let p = StatusPrecedence::SignFirst;
        assert_eq!(normalize_status(Some("Sobrante"), -4.0, p), InventoryStatus::Shortage);
        assert_eq!(normalize_status(Some("Faltante"), 0.0, p), InventoryStatus::Shortage);
        assert_eq!(normalize_status(Some("otro"), 0.0, p), InventoryStatus::NoIssue);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-1500.0, 0), "-1,500");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_int(9855), "9,855");
    }
}
