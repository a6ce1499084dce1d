use crate::calendar::Calendar;
use crate::model::{CalendarEntry, Status, Task};
use crate::store::TaskList;

fn status_char(status: Status) -> char {
    match status {
        Status::Normal => ' ',
        Status::Done => 'x',
        Status::Important => '!',
        Status::Unimportant => '-',
    }
}

// Attributes follow the name: due date, timer, privacy.
fn format_task_core_content(task: &Task, index: usize, now: i64) -> String {
    let mut attributes: Vec<String> = Vec::new();

    if let Some(deadline) = &task.deadline {
        attributes.push(format!("due:{}", deadline));
    }

    if task.timer.is_started() {
        let running = if task.timer.is_running() { "+" } else { "" };
        attributes.push(format!("timer:{}{}", task.timer.passed_time(now), running));
    }

    if task.privacy {
        attributes.push("private".to_string());
    }

    format!(
        "[{}] {}. {} {}",
        status_char(task.status),
        index,
        task.name,
        attributes.join(" ")
    )
    .trim_end()
    .to_string()
}

pub fn format_task_list(tasks: &TaskList, now: i64) -> String {
    tasks
        .iter()
        .enumerate()
        .map(|(index, task)| {
            let indent = "    ".repeat(task.depth as usize);
            format!("{}- {}", indent, format_task_core_content(task, index, now))
        })
        .collect::<Vec<String>>()
        .join("\n")
}

pub fn format_entries(entries: &[CalendarEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let mut line = format!(
                "{} [{}] {}. {}",
                entry.date(),
                status_char(entry.status()),
                index,
                entry.name()
            );
            match entry {
                CalendarEntry::Definition(event) if event.is_recurring() => {
                    line.push_str(&format!(" ({} x{})", event.frequency, event.repetition));
                }
                CalendarEntry::Occurrence(_) => line.push_str(" (repeat)"),
                _ => {}
            }
            if entry.privacy() {
                line.push_str(" private");
            }
            line
        })
        .collect::<Vec<String>>()
        .join("\n")
}

pub fn format_month_grid(calendar: &Calendar, year: i32, month: u32) -> String {
    let mut lines = vec![format!("{:04}-{:02}", year, month)];
    lines.push(
        calendar
            .weekday_columns()
            .iter()
            .map(|weekday| weekday.to_string()[..2].to_string())
            .collect::<Vec<String>>()
            .join(" "),
    );
    for week in calendar.month_grid(year, month) {
        let row = week
            .iter()
            .map(|day| if *day == 0 { "  ".to_string() } else { format!("{:>2}", day) })
            .collect::<Vec<String>>()
            .join(" ");
        lines.push(row.trim_end().to_string());
    }
    lines.join("\n")
}
