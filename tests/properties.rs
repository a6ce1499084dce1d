//! Property-based tests for the calendar, recurrence and persistence layers.

use chrono::Weekday;
use daybook::calendar::convert;
use daybook::recurrence::occurrences;
use daybook::storage::Storage;
use daybook::{Calendar, CalendarSystem, Date, Frequency, Status, Task, UserEvent};
use proptest::prelude::*;
use tempfile::TempDir;

fn any_system() -> impl Strategy<Value = CalendarSystem> {
    prop_oneof![Just(CalendarSystem::Gregorian), Just(CalendarSystem::Persian)]
}

fn any_weekday() -> impl Strategy<Value = Weekday> {
    (0u8..7).prop_map(|n| Weekday::try_from(n).unwrap_or(Weekday::Mon))
}

fn any_calendar() -> impl Strategy<Value = Calendar> {
    (any_system(), any_weekday()).prop_map(|(system, weekday)| Calendar::new(system, weekday))
}

/// A year both systems can represent and convert.
fn year_for(system: CalendarSystem) -> impl Strategy<Value = i32> {
    match system {
        CalendarSystem::Gregorian => 1700i32..2400,
        CalendarSystem::Persian => 1100i32..1800,
    }
}

fn valid_date(calendar: Calendar) -> impl Strategy<Value = Date> {
    (year_for(calendar.system), 1u32..=12, 1u32..=31).prop_map(move |(year, month, day)| {
        let day = day.min(calendar.days_in_month(year, month));
        Date::new(year, month, day)
    })
}

fn valid_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 ,\"'-]{0,24}"
}

fn any_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::Normal),
        Just(Status::Done),
        Just(Status::Important),
        Just(Status::Unimportant),
    ]
}

fn any_frequency() -> impl Strategy<Value = Frequency> {
    prop_oneof![
        Just(Frequency::Once),
        Just(Frequency::Daily),
        Just(Frequency::Weekly),
        Just(Frequency::Monthly),
        Just(Frequency::Yearly),
    ]
}

proptest! {
    #[test]
    fn month_grid_lists_each_day_once(
        calendar in any_calendar(),
        offset in 0i32..700,
        month in 1u32..=12,
    ) {
        let year = match calendar.system {
            CalendarSystem::Gregorian => 1700 + offset,
            CalendarSystem::Persian => 1100 + offset,
        };
        let grid = calendar.month_grid(year, month);
        let days: Vec<u32> = grid.iter().flatten().copied().filter(|day| *day != 0).collect();
        let expected: Vec<u32> = (1..=calendar.days_in_month(year, month)).collect();
        prop_assert_eq!(days, expected);
        prop_assert!(grid.len() >= 4 && grid.len() <= 6);

        let weekday = calendar.first_weekday_of_month(year, month).unwrap_or(0);
        let first = ((weekday + 7 - calendar.first_weekday.num_days_from_monday()) % 7) as usize;
        prop_assert_eq!(grid[0][first], 1);
        prop_assert_eq!(calendar.weekday_columns()[first].num_days_from_monday(), weekday);
        prop_assert!(grid[0][..first].iter().all(|day| *day == 0));
    }

    #[test]
    fn conversion_round_trips(
        (system, date) in any_calendar().prop_flat_map(|calendar| (Just(calendar.system), valid_date(calendar))),
    ) {
        let other = match system {
            CalendarSystem::Gregorian => CalendarSystem::Persian,
            CalendarSystem::Persian => CalendarSystem::Gregorian,
        };
        let converted = convert(date, system, other);
        prop_assert!(converted.is_some());
        prop_assert_eq!(converted.and_then(|d| convert(d, other, system)), Some(date));
    }

    #[test]
    fn occurrences_are_valid_and_increasing(
        (calendar, date) in any_calendar().prop_flat_map(|calendar| (Just(calendar), valid_date(calendar))),
        repetition in 1u32..40,
        frequency in any_frequency(),
    ) {
        let event = UserEvent::new(date, "Recurring").repeating(repetition, frequency);
        let dates = occurrences(&calendar, &event);
        let expected = if frequency == Frequency::Once { 1 } else { repetition as usize };
        prop_assert_eq!(dates.len(), expected);
        prop_assert_eq!(dates[0], date);
        prop_assert!(dates.iter().all(|d| calendar.is_valid_date(*d)));
        prop_assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn saved_store_loads_back_equal(
        calendar in any_calendar(),
        tasks in prop::collection::vec(
            (valid_name(), any_status(), any::<bool>(), 0u8..3, prop::collection::vec(0i64..2_000_000_000, 0..5)),
            0..8,
        ),
        events in prop::collection::vec((valid_name(), any_status(), any::<bool>(), 1u32..5, any_frequency()), 0..8),
        dates in prop::collection::vec(any::<prop::sample::Index>(), 8),
    ) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::with_paths(
            dir.path().join("tasks.csv"),
            dir.path().join("events.csv"),
            calendar,
        );
        let mut store = storage.load();
        let today = calendar.today();
        let day_in_month = |index: &prop::sample::Index| {
            let days = calendar.days_in_month(today.year, today.month) as usize;
            Date::new(today.year, today.month, index.index(days) as u32 + 1)
        };

        for (i, (name, status, privacy, depth, stamps)) in tasks.iter().enumerate() {
            let mut task = Task::new(name.clone()).private(*privacy);
            if i % 2 == 0 {
                task = task.with_deadline(day_in_month(&dates[i]));
            }
            let id = if *depth > 0 && !store.tasks.is_empty() {
                store.tasks.add_subtask(store.tasks.len() - 1, task)
            } else {
                store.tasks.add(task)
            };
            if let Some(id) = id {
                store.tasks.toggle_status(id, *status);
                for stamp in stamps {
                    store.tasks.toggle_timer(id, *stamp);
                }
            }
        }
        for (i, (name, status, privacy, repetition, frequency)) in events.iter().enumerate() {
            let event = UserEvent::new(day_in_month(&dates[i]), name.clone())
                .repeating(*repetition, *frequency)
                .private(*privacy);
            if let Some(id) = store.events.add(event) {
                store.events.toggle_status(id, *status);
            }
        }

        storage.save(&mut store).unwrap();
        prop_assert!(!store.is_changed());

        let loaded = storage.load();
        prop_assert_eq!(loaded.tasks.items(), store.tasks.items());
        prop_assert_eq!(loaded.events.items(), store.events.items());
        prop_assert!(!loaded.is_changed());
    }
}
