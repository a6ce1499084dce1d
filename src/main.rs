use chrono::Utc;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use daybook::date_input;
use daybook::model::MAX_REPETITION;
use daybook::render;
use daybook::store::parse_selection;
use daybook::{Calendar, CalendarSystem, Config, Error, Frequency, ItemId, ItemStore, Status, Storage, Task, UserEvent};

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal calendar and task manager", long_about = None)]
struct Cli {
    #[arg(long, short = 'c', global = true, help = "Config file path. Defaults to <config dir>/daybook/config.toml")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Use the Persian calendar for this session")]
    persian: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
enum Commands {
    #[command(about = "List tasks")]
    Tasks,
    #[command(about = "Add a task or, with --parent, a subtask")]
    AddTask {
        name: String,
        #[arg(long, help = "Selection index of the parent task")]
        parent: Option<String>,
        #[arg(long, help = "Deadline: YYYY-MM-DD, YYYY/MM/DD, MM/DD or M/D")]
        deadline: Option<String>,
        #[arg(long)]
        private: bool,
    },
    #[command(about = "Toggle a task's status (applies to its subtasks too)")]
    Mark { selection: String, status: StatusArg },
    #[command(about = "Rename a task")]
    RenameTask { selection: String, name: String },
    #[command(about = "Delete a task and its subtasks")]
    DeleteTask { selection: String },
    #[command(about = "Move a task to another position")]
    MoveTask { from: String, to: String },
    #[command(about = "Start or pause a task's timer")]
    Timer {
        selection: String,
        #[arg(long, help = "Clear the timer instead")]
        reset: bool,
    },
    #[command(about = "Set or clear (with 'none') a task's deadline")]
    Deadline { selection: String, date: String },
    #[command(about = "Toggle a task's privacy")]
    PrivateTask { selection: String },
    #[command(about = "List events of a month or a day, including repetitions")]
    Events {
        #[arg(long, help = "Month as YYYY-MM. Defaults to the current month")]
        month: Option<String>,
        #[arg(long, help = "A single day instead of a month", conflicts_with = "month")]
        day: Option<String>,
    },
    #[command(about = "Add an event")]
    AddEvent {
        date: String,
        name: String,
        #[arg(
            long,
            default_value_t = 1,
            value_parser = clap::value_parser!(u32).range(1..=MAX_REPETITION as i64),
            help = "Total number of occurrences"
        )]
        repeat: u32,
        #[arg(long, value_enum, default_value_t = FrequencyArg::Once)]
        every: FrequencyArg,
        #[arg(long)]
        private: bool,
    },
    #[command(about = "Delete an event (selection index within the month view)")]
    DeleteEvent {
        selection: String,
        #[arg(long)]
        month: Option<String>,
    },
    #[command(about = "Rename an event")]
    RenameEvent {
        selection: String,
        name: String,
        #[arg(long)]
        month: Option<String>,
    },
    #[command(about = "Toggle an event's status")]
    MarkEvent {
        selection: String,
        status: StatusArg,
        #[arg(long)]
        month: Option<String>,
    },
    #[command(about = "Move an event to another day of the same month")]
    MoveEvent {
        selection: String,
        day: u32,
        #[arg(long)]
        month: Option<String>,
    },
    #[command(about = "Toggle an event's privacy")]
    PrivateEvent {
        selection: String,
        #[arg(long)]
        month: Option<String>,
    },
    #[command(about = "Show a month grid")]
    Cal {
        #[arg(long, help = "Month as YYYY-MM. Defaults to the current month")]
        month: Option<String>,
    },
    #[command(about = "Dump tasks and events as JSON Lines")]
    Export,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Normal,
    Done,
    Important,
    Unimportant,
}

impl From<StatusArg> for Status {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Normal => Status::Normal,
            StatusArg::Done => Status::Done,
            StatusArg::Important => Status::Important,
            StatusArg::Unimportant => Status::Unimportant,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FrequencyArg {
    Once,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl From<FrequencyArg> for Frequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Once => Frequency::Once,
            FrequencyArg::Daily => Frequency::Daily,
            FrequencyArg::Weekly => Frequency::Weekly,
            FrequencyArg::Monthly => Frequency::Monthly,
            FrequencyArg::Yearly => Frequency::Yearly,
        }
    }
}

fn select_task(store: &ItemStore, input: &str) -> Result<(usize, ItemId), String> {
    let index = store
        .tasks
        .parse_selection(input)
        .ok_or_else(|| format!("Error: no task at selection '{}'.", input))?;
    Ok((index, store.tasks.items()[index].item_id))
}

fn month_or_current(month: Option<&String>, calendar: &Calendar) -> Result<(i32, u32), String> {
    match month {
        Some(text) => date_input::parse_month(text),
        None => {
            let today = calendar.today();
            Ok((today.year, today.month))
        }
    }
}

fn select_event(
    store: &ItemStore,
    input: &str,
    month: Option<&String>,
    calendar: &Calendar,
) -> Result<ItemId, String> {
    let (year, month) = month_or_current(month, calendar)?;
    let entries = store.events.filter_by_month(year, month);
    let index = parse_selection(input, entries.len())
        .ok_or_else(|| format!("Error: no event at selection '{}'.", input))?;
    Ok(entries[index].item_id())
}

fn applied(ok: bool, what: &str) -> Result<(), String> {
    if ok {
        Ok(())
    } else {
        Err(format!("Error: could not {}.", what))
    }
}

fn run(command: Commands, store: &mut ItemStore, calendar: &Calendar, now: i64) -> Result<(), String> {
    match command {
        Commands::Tasks => {
            if store.tasks.is_empty() {
                println!("No tasks.");
            } else {
                println!("{}", render::format_task_list(&store.tasks, now));
            }
        }
        Commands::AddTask { name, parent, deadline, private } => {
            let mut task = Task::new(name).private(private);
            if let Some(text) = deadline {
                task.deadline = date_input::parse_deadline(&text, calendar)?;
            }
            let added = match parent {
                Some(input) => {
                    let (index, _) = select_task(store, &input)?;
                    store.tasks.add_subtask(index, task)
                }
                None => store.tasks.add(task),
            };
            applied(added.is_some(), "add the task (empty, reserved or too long name?)")?;
        }
        Commands::Mark { selection, status } => {
            let (_, id) = select_task(store, &selection)?;
            applied(store.tasks.toggle_status(id, status.into()), "change the status")?;
        }
        Commands::RenameTask { selection, name } => {
            let (_, id) = select_task(store, &selection)?;
            applied(store.tasks.rename(id, &name), "rename the task")?;
        }
        Commands::DeleteTask { selection } => {
            let (_, id) = select_task(store, &selection)?;
            applied(store.tasks.delete(id), "delete the task")?;
        }
        Commands::MoveTask { from, to } => {
            let (from, _) = select_task(store, &from)?;
            let (to, _) = select_task(store, &to)?;
            applied(store.tasks.move_task(from, to), "move the task")?;
        }
        Commands::Timer { selection, reset } => {
            let (_, id) = select_task(store, &selection)?;
            if reset {
                applied(store.tasks.reset_timer(id), "reset the timer")?;
            } else {
                applied(store.tasks.toggle_timer(id, now), "toggle the timer")?;
            }
        }
        Commands::Deadline { selection, date } => {
            let (_, id) = select_task(store, &selection)?;
            let changed = match date_input::parse_deadline(&date, calendar)? {
                Some(d) => store.tasks.change_deadline(id, d.year, d.month, d.day),
                None => store.tasks.change_deadline(id, 0, 0, 0),
            };
            applied(changed, "change the deadline")?;
        }
        Commands::PrivateTask { selection } => {
            let (_, id) = select_task(store, &selection)?;
            applied(store.tasks.toggle_privacy(id), "change privacy")?;
        }
        Commands::Events { month, day } => {
            let entries = match day {
                Some(text) => {
                    let date = date_input::parse_date(&text, calendar)?;
                    store.events.filter_by_day(date.year, date.month, date.day)
                }
                None => {
                    let (year, month) = month_or_current(month.as_ref(), calendar)?;
                    store.events.filter_by_month(year, month)
                }
            };
            if entries.is_empty() {
                println!("No events.");
            } else {
                println!("{}", render::format_entries(&entries));
            }
        }
        Commands::AddEvent { date, name, repeat, every, private } => {
            let date = date_input::parse_date(&date, calendar)?;
            let event = UserEvent::new(date, name)
                .repeating(repeat, every.into())
                .private(private);
            applied(store.events.add(event).is_some(), "add the event (empty, reserved or too long name?)")?;
        }
        Commands::DeleteEvent { selection, month } => {
            let id = select_event(store, &selection, month.as_ref(), calendar)?;
            applied(store.events.delete(id), "delete the event")?;
        }
        Commands::RenameEvent { selection, name, month } => {
            let id = select_event(store, &selection, month.as_ref(), calendar)?;
            applied(store.events.rename(id, &name), "rename the event")?;
        }
        Commands::MarkEvent { selection, status, month } => {
            let id = select_event(store, &selection, month.as_ref(), calendar)?;
            applied(store.events.toggle_status(id, status.into()), "change the status")?;
        }
        Commands::MoveEvent { selection, day, month } => {
            let id = select_event(store, &selection, month.as_ref(), calendar)?;
            applied(store.events.change_day(id, day), "move the event to that day")?;
        }
        Commands::PrivateEvent { selection, month } => {
            let id = select_event(store, &selection, month.as_ref(), calendar)?;
            applied(store.events.toggle_privacy(id), "change privacy")?;
        }
        Commands::Cal { month } => {
            let (year, month) = month_or_current(month.as_ref(), calendar)?;
            println!("{}", render::format_month_grid(calendar, year, month));
        }
        Commands::Export => {
            let mut json_outputs: Vec<String> = Vec::new();
            for task in store.tasks.iter() {
                json_outputs.push(serde_json::to_string(task).map_err(|e| format!("Error serializing task to JSON: {}", e))?);
            }
            for event in store.events.iter() {
                json_outputs.push(serde_json::to_string(event).map_err(|e| format!("Error serializing event to JSON: {}", e))?);
            }
            if !json_outputs.is_empty() {
                println!("{}", json_outputs.join("\n"));
            }
        }
    }
    Ok(())
}

fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).map_err(|e| Error::from(e).to_string())?;
    if cli.persian {
        config.calendar = CalendarSystem::Persian;
    }
    let calendar = config.calendar();
    let storage = Storage::new(&config);
    let mut store = storage.load();

    run(cli.command, &mut store, &calendar, Utc::now().timestamp())?;

    if store.is_changed() {
        storage
            .save(&mut store)
            .map_err(|e| format!("Changes were not saved. {}", Error::from(e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use daybook::Date;

    fn store_with_tasks(names: &[&str]) -> ItemStore {
        let mut store = ItemStore::new(Calendar::default());
        for name in names {
            store.tasks.add(Task::new(*name));
        }
        store
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_invalid_selection_changes_nothing() {
        let mut store = store_with_tasks(&["A"]);
        store.tasks.mark_saved();
        let cal = Calendar::default();
        let result = run(Commands::DeleteTask { selection: "x".to_string() }, &mut store, &cal, 0);
        assert!(result.is_err());
        let result = run(Commands::DeleteTask { selection: "3".to_string() }, &mut store, &cal, 0);
        assert!(result.is_err());
        assert_eq!(store.tasks.len(), 1);
        assert!(!store.is_changed());
    }

    #[test]
    fn test_event_selection_maps_occurrence_to_definition() {
        let mut store = ItemStore::new(Calendar::default());
        store
            .events
            .add(UserEvent::new(Date::new(2024, 4, 29), "Run").repeating(3, Frequency::Daily));
        let cal = Calendar::default();
        let month = Some("2024-05".to_string());
        // The only May entry is the third occurrence.
        let id = select_event(&store, "0", month.as_ref(), &cal).unwrap();
        assert_eq!(id, 1);
        run(
            Commands::DeleteEvent { selection: "0".to_string(), month },
            &mut store,
            &cal,
            0,
        )
        .unwrap();
        assert!(store.events.is_empty());
    }

    #[test]
    fn test_add_subtask_through_parent_selection() {
        let mut store = store_with_tasks(&["A", "B"]);
        let cal = Calendar::default();
        run(
            Commands::AddTask {
                name: "B.1".to_string(),
                parent: Some("1".to_string()),
                deadline: Some("2024-02-29".to_string()),
                private: false,
            },
            &mut store,
            &cal,
            0,
        )
        .unwrap();
        let added = &store.tasks.items()[2];
        assert_eq!(added.name, "B.1");
        assert_eq!(added.depth, 1);
        assert_eq!(added.deadline, Some(Date::new(2024, 2, 29)));
    }
}
