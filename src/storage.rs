use crate::calendar::{Calendar, Date};
use crate::config::Config;
use crate::error::StorageError;
use crate::model::{
    decode_name, encode_name, is_valid_name, Frequency, Status, Task, Timer, UserEvent,
    MAX_ITEM_ID, MAX_REPETITION,
};
use crate::store::{EventList, ItemStore, TaskList};
use csv::{ReaderBuilder, StringRecord, Terminator, Writer, WriterBuilder};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// Columns preceding the name in the current task schema (the deadline).
const DEADLINE_COLUMNS: usize = 3;

#[derive(Debug, Clone)]
pub struct Storage {
    tasks_file: PathBuf,
    events_file: PathBuf,
    calendar: Calendar,
}

#[derive(Debug)]
pub struct StagedWrite {
    temp_path: PathBuf,
    target: PathBuf,
}

impl StagedWrite {
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn commit(self) -> Result<(), StorageError> {
        if let Err(e) = fs::rename(&self.temp_path, &self.target) {
            discard(&self.temp_path);
            return Err(StorageError::io(&self.target, e));
        }
        debug!("Committed {}", self.target.display());
        Ok(())
    }
}

impl Storage {
    pub fn new(config: &Config) -> Self {
        Self::with_paths(&config.tasks_file, &config.events_file, config.calendar())
    }

    pub fn with_paths(
        tasks_file: impl Into<PathBuf>,
        events_file: impl Into<PathBuf>,
        calendar: Calendar,
    ) -> Self {
        Storage {
            tasks_file: tasks_file.into(),
            events_file: events_file.into(),
            calendar,
        }
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn load(&self) -> ItemStore {
        ItemStore {
            tasks: self.load_tasks(),
            events: self.load_events(),
        }
    }

    pub fn load_tasks(&self) -> TaskList {
        let mut tasks = TaskList::new(self.calendar);
        let Some(content) = read_or_create(&self.tasks_file) else {
            return tasks;
        };
        // Old files have no deadline columns and start with a quoted name.
        let offset = if content.starts_with('"') { 0 } else { DEADLINE_COLUMNS };
        let mut previous_depth: Option<u8> = None;
        for (row, record) in read_records(&content).enumerate() {
            match record.ok().and_then(|record| self.parse_task(&record, offset)) {
                Some(mut task) => {
                    // A subtask needs a parent right above it.
                    let deepest = previous_depth.map_or(0, |depth| depth + 1);
                    if task.depth > deepest {
                        warn!(
                            "Task on row {} in {} has no parent, raising it to level {}",
                            row + 1,
                            self.tasks_file.display(),
                            deepest
                        );
                        task.depth = deepest;
                    }
                    previous_depth = Some(task.depth);
                    tasks.push_loaded(task, false);
                }
                None => warn!(
                    "Skipping malformed row {} in {}",
                    row + 1,
                    self.tasks_file.display()
                ),
            }
        }
        info!("Loaded {} tasks from {}", tasks.len(), self.tasks_file.display());
        tasks
    }

    pub fn load_events(&self) -> EventList {
        let mut events = EventList::new(self.calendar);
        let Some(content) = read_or_create(&self.events_file) else {
            return events;
        };
        for (row, record) in read_records(&content).enumerate() {
            match record.ok().and_then(|record| self.parse_event(&record)) {
                Some(event) => {
                    let stored_id = event.item_id;
                    let id = events.push_loaded(event, true);
                    if id != stored_id {
                        warn!(
                            "Duplicate event id {} on row {} in {}, using {}",
                            stored_id,
                            row + 1,
                            self.events_file.display(),
                            id
                        );
                    }
                }
                None => warn!(
                    "Skipping malformed row {} in {}",
                    row + 1,
                    self.events_file.display()
                ),
            }
        }
        info!("Loaded {} events from {}", events.len(), self.events_file.display());
        events
    }

    pub fn save(&self, store: &mut ItemStore) -> Result<(), StorageError> {
        if store.tasks.is_changed() {
            self.save_tasks(&mut store.tasks)?;
        }
        if store.events.is_changed() {
            self.save_events(&mut store.events)?;
        }
        Ok(())
    }

    pub fn save_tasks(&self, tasks: &mut TaskList) -> Result<(), StorageError> {
        self.stage_tasks(tasks)?.commit()?;
        tasks.mark_saved();
        info!("Saved {} tasks to {}", tasks.len(), self.tasks_file.display());
        Ok(())
    }

    pub fn save_events(&self, events: &mut EventList) -> Result<(), StorageError> {
        self.stage_events(events)?.commit()?;
        events.mark_saved();
        info!("Saved {} events to {}", events.len(), self.events_file.display());
        Ok(())
    }

    pub fn stage_tasks(&self, tasks: &TaskList) -> Result<StagedWrite, StorageError> {
        stage(&self.tasks_file, |writer| {
            for task in tasks.iter() {
                let deadline = task.deadline.map(|date| self.to_disk(date));
                let (year, month, day) = deadline.map_or((0, 0, 0), |d| (d.year, d.month, d.day));
                let mut row = vec![
                    year.to_string(),
                    month.to_string(),
                    day.to_string(),
                    encode_name(&task.name, task.depth, task.privacy),
                    task.status.as_str().to_string(),
                ];
                row.extend(task.timer.stamps.iter().map(|stamp| stamp.to_string()));
                writer.write_record(&row)?;
            }
            Ok(())
        })
    }

    pub fn stage_events(&self, events: &EventList) -> Result<StagedWrite, StorageError> {
        stage(&self.events_file, |writer| {
            for event in events.iter() {
                let date = self.to_disk(event.date);
                writer.write_record([
                    event.item_id.to_string(),
                    date.year.to_string(),
                    date.month.to_string(),
                    date.day.to_string(),
                    encode_name(&event.name, 0, event.privacy),
                    event.repetition.to_string(),
                    event.frequency.as_str().to_string(),
                    event.status.as_str().to_string(),
                ])?;
            }
            Ok(())
        })
    }

    fn parse_task(&self, record: &StringRecord, offset: usize) -> Option<Task> {
        let deadline = if offset == DEADLINE_COLUMNS {
            let year: i32 = field(record, 0)?;
            let month: u32 = field(record, 1)?;
            let day: u32 = field(record, 2)?;
            if year == 0 {
                None
            } else {
                Some(self.calendar.from_primary(Date::new(year, month, day))?)
            }
        } else {
            None
        };
        let (name, depth, privacy) = decode_name(record.get(offset)?);
        if !is_valid_name(&name) {
            return None;
        }
        let status: Status = field(record, offset + 1)?;
        let stamps = record
            .iter()
            .skip(offset + 2)
            .map(parse_stamp)
            .collect::<Option<Vec<i64>>>()?;
        Some(Task {
            item_id: 0,
            name,
            depth,
            status,
            timer: Timer::new(stamps),
            privacy,
            deadline,
        })
    }

    fn parse_event(&self, record: &StringRecord) -> Option<UserEvent> {
        let item_id: usize = field(record, 0).filter(|id| *id <= MAX_ITEM_ID)?;
        let date = Date::new(field(record, 1)?, field(record, 2)?, field(record, 3)?);
        let date = self.calendar.from_primary(date)?;
        let (name, _, privacy) = decode_name(record.get(4)?);
        if !is_valid_name(&name) {
            return None;
        }
        let (repetition, frequency, status) = if record.len() < 6 {
            (1, Frequency::Once, Status::Normal)
        } else {
            let repetition: u32 = field(record, 5)?;
            let frequency = match record.get(6) {
                Some(_) => field(record, 6)?,
                None => Frequency::Once,
            };
            let status = match record.get(7) {
                Some(_) => field(record, 7)?,
                None => Status::Normal,
            };
            if repetition > MAX_REPETITION {
                return None;
            }
            (repetition.max(1), frequency, status)
        };
        Some(UserEvent {
            item_id,
            date,
            name,
            repetition,
            frequency,
            status,
            privacy,
        })
    }

    fn to_disk(&self, date: Date) -> Date {
        self.calendar.to_primary(date).unwrap_or_else(|| {
            warn!("Date {} has no primary-calendar equivalent, storing as is", date);
            date
        })
    }
}

fn field<T: std::str::FromStr>(record: &StringRecord, index: usize) -> Option<T> {
    record.get(index)?.trim().parse().ok()
}

fn parse_stamp(value: &str) -> Option<i64> {
    let value = value.trim();
    value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|stamp| stamp.is_finite())
            .map(|stamp| stamp as i64)
    })
}

fn read_records(content: &str) -> impl Iterator<Item = csv::Result<StringRecord>> + '_ {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes())
        .into_records()
}

fn read_or_create(path: &Path) -> Option<String> {
    if !path.exists() {
        match create_placeholder(path) {
            Ok(()) => info!("Created empty data file {}", path.display()),
            Err(e) => warn!("Could not create {}: {}", path.display(), e),
        }
        return None;
    }
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            warn!("Could not read {}, starting empty: {}", path.display(), e);
            None
        }
    }
}

fn create_placeholder(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    File::create(path).map(|_| ())
}

fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    target.with_file_name(name)
}

fn stage<F>(target: &Path, write_rows: F) -> Result<StagedWrite, StorageError>
where
    F: FnOnce(&mut Writer<File>) -> Result<(), StorageError>,
{
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    let temp_path = temp_path_for(target);
    if let Err(e) = write_temp(&temp_path, write_rows) {
        discard(&temp_path);
        return Err(e);
    }
    Ok(StagedWrite {
        temp_path,
        target: target.to_path_buf(),
    })
}

fn write_temp<F>(temp_path: &Path, write_rows: F) -> Result<(), StorageError>
where
    F: FnOnce(&mut Writer<File>) -> Result<(), StorageError>,
{
    let file = File::create(temp_path).map_err(|e| StorageError::io(temp_path, e))?;
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(file);
    write_rows(&mut writer)?;
    let file = writer
        .into_inner()
        .map_err(|e| StorageError::io(temp_path, e.into_error()))?;
    file.sync_all().map_err(|e| StorageError::io(temp_path, e))
}

fn discard(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove {}: {}", temp_path.display(), e);
        }
    }
}
