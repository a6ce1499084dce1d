pub mod calendar;
pub mod config;
pub mod date_input;
pub mod error;
pub mod model;
pub mod recurrence;
pub mod render;
pub mod storage;
pub mod store;

pub use calendar::{Calendar, CalendarSystem, Date};
pub use config::Config;
pub use error::{ConfigError, Error, Result, StorageError};
pub use model::{CalendarEntry, Frequency, ItemId, Status, Task, Timer, UserEvent};
pub use storage::Storage;
pub use store::{EventList, ItemStore, TaskList};
