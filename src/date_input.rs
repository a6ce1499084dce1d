use crate::calendar::{Calendar, Date};
use regex::Regex;

// Supported forms:
// - YYYY-MM-DD (e.g., 2024-05-15)
// - YYYY/MM/DD (e.g., 2024/05/15)
// - MM/DD and M/D, completed with the current year of the active calendar
const FULL_DATE_RE_STR: &str = r"^(?P<year>\d{4})[-/](?P<month>\d{1,2})[-/](?P<day>\d{1,2})$";
const SHORT_DATE_RE_STR: &str = r"^(?P<month>\d{1,2})/(?P<day>\d{1,2})$";
const MONTH_RE_STR: &str = r"^(?P<year>\d{4})[-/](?P<month>\d{1,2})$";

fn capture_number<T: std::str::FromStr>(caps: &regex::Captures, group: &str) -> Option<T> {
    caps.name(group)?.as_str().parse().ok()
}

pub fn parse_date(input: &str, calendar: &Calendar) -> Result<Date, String> {
    let full_re = Regex::new(FULL_DATE_RE_STR).map_err(|e| format!("Failed to compile date regex: {}", e))?;
    let short_re = Regex::new(SHORT_DATE_RE_STR).map_err(|e| format!("Failed to compile date regex: {}", e))?;
    let input = input.trim();

    let date = if let Some(caps) = full_re.captures(input) {
        capture_number(&caps, "year")
            .zip(capture_number(&caps, "month"))
            .zip(capture_number(&caps, "day"))
            .map(|((year, month), day)| Date::new(year, month, day))
    } else if let Some(caps) = short_re.captures(input) {
        let year = calendar.today().year;
        capture_number(&caps, "month")
            .zip(capture_number(&caps, "day"))
            .map(|(month, day)| Date::new(year, month, day))
    } else {
        None
    };

    match date {
        Some(date) if calendar.is_valid_date(date) => Ok(date),
        Some(date) => Err(format!("'{}' is not a valid date ({})", input, date)),
        None => Err(format!("Could not parse date '{}'", input)),
    }
}

// Like parse_date, but `none` or an empty string clears the deadline.
pub fn parse_deadline(input: &str, calendar: &Calendar) -> Result<Option<Date>, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    parse_date(trimmed, calendar).map(Some)
}

pub fn parse_month(input: &str) -> Result<(i32, u32), String> {
    let month_re = Regex::new(MONTH_RE_STR).map_err(|e| format!("Failed to compile month regex: {}", e))?;
    let caps = month_re
        .captures(input.trim())
        .ok_or_else(|| format!("Could not parse month '{}'", input))?;
    let year: i32 = capture_number(&caps, "year").ok_or_else(|| format!("Bad year in '{}'", input))?;
    let month: u32 = capture_number(&caps, "month").ok_or_else(|| format!("Bad month in '{}'", input))?;
    if !(1..=12).contains(&month) {
        return Err(format!("Month out of range in '{}'", input));
    }
    Ok((year, month))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::CalendarSystem;
    use chrono::Weekday;

    #[test]
    fn test_full_date_formats() {
        let cal = Calendar::default();
        assert_eq!(parse_date("2024-05-15", &cal).unwrap(), Date::new(2024, 5, 15));
        assert_eq!(parse_date("2024/5/7", &cal).unwrap(), Date::new(2024, 5, 7));
    }

    #[test]
    fn test_short_date_uses_current_year() {
        let cal = Calendar::default();
        let year = cal.today().year;
        assert_eq!(parse_date("5/7", &cal).unwrap(), Date::new(year, 5, 7));
        assert_eq!(parse_date("11/30", &cal).unwrap(), Date::new(year, 11, 30));
    }

    #[test]
    fn test_dates_are_checked_in_the_active_calendar() {
        let gregorian = Calendar::default();
        let persian = Calendar::new(CalendarSystem::Persian, Weekday::Sat);
        assert!(parse_date("2023-02-29", &gregorian).is_err());
        assert!(parse_date("1402-06-31", &gregorian).is_err());
        assert_eq!(parse_date("1402-06-31", &persian).unwrap(), Date::new(1402, 6, 31));
        assert!(parse_date("tomorrow", &gregorian).is_err());
    }

    #[test]
    fn test_deadline_none() {
        let cal = Calendar::default();
        assert_eq!(parse_deadline("none", &cal).unwrap(), None);
        assert_eq!(parse_deadline("", &cal).unwrap(), None);
        assert_eq!(parse_deadline("2024-01-02", &cal).unwrap(), Some(Date::new(2024, 1, 2)));
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-09").unwrap(), (2024, 9));
        assert_eq!(parse_month("1403/12").unwrap(), (1403, 12));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("September").is_err());
    }
}
