use chrono::{Datelike, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Date {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl Date {
    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Date { year, month, day }
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarSystem {
    #[default]
    Gregorian,
    Persian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    pub system: CalendarSystem,
    pub first_weekday: Weekday,
}

impl Default for Calendar {
    fn default() -> Self {
        Calendar {
            system: CalendarSystem::Gregorian,
            first_weekday: Weekday::Mon,
        }
    }
}

impl Calendar {
    pub fn new(system: CalendarSystem, first_weekday: Weekday) -> Self {
        Calendar {
            system,
            first_weekday,
        }
    }

    pub fn is_leap_year(&self, year: i32) -> bool {
        match self.system {
            CalendarSystem::Gregorian => gregorian_is_leap(year),
            CalendarSystem::Persian => persian_is_leap(year),
        }
    }

    // Number of days in the month, or 0 for a month that does not exist.
    pub fn days_in_month(&self, year: i32, month: u32) -> u32 {
        match self.system {
            CalendarSystem::Gregorian => gregorian_days_in_month(year, month),
            CalendarSystem::Persian => persian_days_in_month(year, month),
        }
    }

    pub fn is_valid_date(&self, date: Date) -> bool {
        is_valid_in(self.system, date)
    }

    // Weekday of day 1 of the month, 0 = Monday .. 6 = Sunday.
    pub fn first_weekday_of_month(&self, year: i32, month: u32) -> Option<u32> {
        let gregorian = self.to_primary(Date::new(year, month, 1))?;
        let naive = NaiveDate::from_ymd_opt(gregorian.year, gregorian.month, gregorian.day)?;
        Some(naive.weekday().num_days_from_monday())
    }

    pub fn month_grid(&self, year: i32, month: u32) -> Vec<[u32; 7]> {
        let Some(first) = self.first_weekday_of_month(year, month) else {
            return Vec::new();
        };
        let mut col = ((first + 7 - self.first_weekday.num_days_from_monday()) % 7) as usize;
        let mut weeks = Vec::new();
        let mut week = [0u32; 7];
        for day in 1..=self.days_in_month(year, month) {
            week[col] = day;
            col += 1;
            if col == 7 {
                weeks.push(week);
                week = [0u32; 7];
                col = 0;
            }
        }
        if col > 0 {
            weeks.push(week);
        }
        weeks
    }

    pub fn weekday_columns(&self) -> [Weekday; 7] {
        let mut columns = [self.first_weekday; 7];
        for i in 1..7 {
            columns[i] = columns[i - 1].succ();
        }
        columns
    }

    pub fn to_primary(&self, date: Date) -> Option<Date> {
        convert(date, self.system, CalendarSystem::Gregorian)
    }

    pub fn from_primary(&self, date: Date) -> Option<Date> {
        convert(date, CalendarSystem::Gregorian, self.system)
    }

    pub fn today(&self) -> Date {
        let now = Local::now().date_naive();
        let today = Date::new(now.year(), now.month(), now.day());
        self.from_primary(today).unwrap_or(today)
    }
}

pub fn convert(date: Date, from: CalendarSystem, to: CalendarSystem) -> Option<Date> {
    if !is_valid_in(from, date) {
        return None;
    }
    if from == to {
        return Some(date);
    }
    let days = match from {
        CalendarSystem::Gregorian => gregorian_to_days(date)?,
        CalendarSystem::Persian => persian_to_days(date)?,
    };
    let converted = match to {
        CalendarSystem::Gregorian => days_to_gregorian(days)?,
        CalendarSystem::Persian => days_to_persian(days)?,
    };
    is_valid_in(to, converted).then_some(converted)
}

fn is_valid_in(system: CalendarSystem, date: Date) -> bool {
    let year_ok = match system {
        CalendarSystem::Gregorian => (1..=9999).contains(&date.year),
        CalendarSystem::Persian => date.year >= 1 && persian_year(date.year).is_some(),
    };
    let calendar = Calendar::new(system, Weekday::Mon);
    year_ok && date.day >= 1 && date.day <= calendar.days_in_month(date.year, date.month)
}

fn gregorian_is_leap(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

fn gregorian_days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if gregorian_is_leap(year) => 29,
        2 => 28,
        _ => 0,
    }
}

fn gregorian_to_days(date: Date) -> Option<i32> {
    NaiveDate::from_ymd_opt(date.year, date.month, date.day).map(|d| d.num_days_from_ce())
}

fn days_to_gregorian(days: i32) -> Option<Date> {
    NaiveDate::from_num_days_from_ce_opt(days).map(|d| Date::new(d.year(), d.month(), d.day()))
}

// Years (AP) at which the 33-year leap sub-cycle of the Persian calendar
// shifts. Conversion is defined for years in [BREAKS[0], BREAKS[last]).
const BREAKS: [i32; 20] = [
    -61, 9, 38, 199, 426, 686, 756, 818, 1111, 1181, 1210, 1635, 2060, 2097, 2192, 2262, 2324,
    2394, 2456, 3178,
];

struct PersianYear {
    // 0 for a leap year; 1 means the previous year was leap.
    leap: i32,
    gregorian_year: i32,
    // Day of March (Gregorian) on which Farvardin 1 falls.
    march: i32,
}

fn persian_year(year: i32) -> Option<PersianYear> {
    if year < BREAKS[0] || year >= BREAKS[BREAKS.len() - 1] {
        return None;
    }
    let gregorian_year = year + 621;
    let mut leap_persian = -14;
    let mut previous = BREAKS[0];
    let mut jump = 0;
    for &brk in &BREAKS[1..] {
        jump = brk - previous;
        if year < brk {
            break;
        }
        leap_persian += jump / 33 * 8 + (jump % 33) / 4;
        previous = brk;
    }
    let mut n = year - previous;
    leap_persian += n / 33 * 8 + (n % 33 + 3) / 4;
    if jump % 33 == 4 && jump - n == 4 {
        leap_persian += 1;
    }
    let leap_gregorian = gregorian_year / 4 - (gregorian_year / 100 + 1) * 3 / 4 - 150;
    let march = 20 + leap_persian - leap_gregorian;

    if jump - n < 6 {
        n = n - jump + (jump + 4) / 33 * 33;
    }
    let mut leap = ((n + 1) % 33 - 1) % 4;
    if leap == -1 {
        leap = 4;
    }
    Some(PersianYear {
        leap,
        gregorian_year,
        march,
    })
}

fn persian_is_leap(year: i32) -> bool {
    persian_year(year).is_some_and(|info| info.leap == 0)
}

fn persian_days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1..=6 => 31,
        7..=11 => 30,
        12 if persian_is_leap(year) => 30,
        12 => 29,
        _ => 0,
    }
}

fn persian_to_days(date: Date) -> Option<i32> {
    let info = persian_year(date.year)?;
    let nowruz = gregorian_to_days(Date::new(info.gregorian_year, 3, info.march as u32))?;
    let month = date.month as i32;
    Some(nowruz + (month - 1) * 31 - month / 7 * (month - 7) + date.day as i32 - 1)
}

fn days_to_persian(days: i32) -> Option<Date> {
    let gregorian = days_to_gregorian(days)?;
    let mut year = gregorian.year - 621;
    let info = persian_year(year)?;
    let nowruz = gregorian_to_days(Date::new(info.gregorian_year, 3, info.march as u32))?;
    let mut offset = days - nowruz;
    if offset >= 0 {
        if offset <= 185 {
            return Some(Date::new(year, 1 + (offset / 31) as u32, (offset % 31) as u32 + 1));
        }
        offset -= 186;
    } else {
        year -= 1;
        offset += 179;
        if info.leap == 1 {
            offset += 1;
        }
    }
    if year < BREAKS[0] {
        return None;
    }
    Some(Date::new(year, 7 + (offset / 30) as u32, (offset % 30) as u32 + 1))
}
