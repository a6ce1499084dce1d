use crate::calendar::{Calendar, Date};
use crate::model::{CalendarEntry, Frequency, RepeatedEvent, UserEvent, MAX_REPETITION};

pub fn occurrences(calendar: &Calendar, event: &UserEvent) -> Vec<Date> {
    dates(calendar, event).collect()
}

// Lazy and increasing. Stops early if a date leaves the calendar's range.
fn dates<'a>(calendar: &'a Calendar, event: &'a UserEvent) -> impl Iterator<Item = Date> + 'a {
    let count = if event.frequency == Frequency::Once {
        1
    } else {
        event.repetition.clamp(1, MAX_REPETITION)
    };
    (0..count)
        .map(move |k| occurrence(calendar, event.date, event.frequency, k))
        .take_while(move |date| calendar.is_valid_date(*date))
}

pub fn expand<'a>(
    calendar: &'a Calendar,
    event: &'a UserEvent,
) -> impl Iterator<Item = CalendarEntry> + 'a {
    dates(calendar, event).skip(1).map(move |date| {
        CalendarEntry::Occurrence(RepeatedEvent {
            parent_id: event.item_id,
            date,
            name: event.name.clone(),
            status: event.status,
            privacy: event.privacy,
        })
    })
}

fn occurrence(calendar: &Calendar, anchor: Date, frequency: Frequency, k: u32) -> Date {
    match frequency {
        Frequency::Once => anchor,
        Frequency::Daily => carry_days(calendar, anchor, k),
        Frequency::Weekly => carry_days(calendar, anchor, k.saturating_mul(7)),
        Frequency::Monthly => {
            let (year, month) = add_months(anchor.year, anchor.month, k);
            clamp_day(calendar, year, month, anchor.day)
        }
        Frequency::Yearly => {
            clamp_day(calendar, anchor.year.saturating_add(k as i32), anchor.month, anchor.day)
        }
    }
}

// Moves `days` forward from `anchor`, walking month by month with the real
// length of every month crossed.
fn carry_days(calendar: &Calendar, anchor: Date, days: u32) -> Date {
    let (mut year, mut month) = (anchor.year, anchor.month);
    let mut day = anchor.day as u64 + days as u64;
    loop {
        let length = calendar.days_in_month(year, month) as u64;
        if length == 0 || day <= length {
            break;
        }
        day -= length;
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
    Date::new(year, month, day as u32)
}

fn add_months(year: i32, month: u32, k: u32) -> (i32, u32) {
    let month = month + k;
    if month > 12 {
        let new_year = year + ((month - 1) / 12) as i32;
        (new_year, month - 12 * (new_year - year) as u32)
    } else {
        (year, month)
    }
}

// Days past the end of the month fall back to its last day.
fn clamp_day(calendar: &Calendar, year: i32, month: u32, day: u32) -> Date {
    let last = calendar.days_in_month(year, month);
    Date::new(year, month, day.min(last.max(1)))
}
