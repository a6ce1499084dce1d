use crate::calendar::Date;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type ItemId = usize;

pub const MAX_NAME_LENGTH: usize = 500;
pub const MAX_DEPTH: u8 = 2;
pub const MAX_REPETITION: u32 = 10_000;
pub const MAX_ITEM_ID: ItemId = u32::MAX as ItemId;
pub const PRIVACY_MARKER: char = '.';
pub const DEPTH_MARKER: &str = "--";
pub const RESERVED_NAME: &str = ".";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Normal,
    Done,
    Important,
    Unimportant,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Normal => "normal",
            Status::Done => "done",
            Status::Important => "important",
            Status::Unimportant => "unimportant",
        }
    }

    pub fn toggled(self, candidate: Status) -> Status {
        if self == candidate {
            Status::Normal
        } else {
            candidate
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Status::Normal),
            "done" => Ok(Status::Done),
            "important" => Ok(Status::Important),
            "unimportant" => Ok(Status::Unimportant),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Once,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Once => "once",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    // Accepts the full keyword or the single-letter form of older files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" | "n" => Ok(Frequency::Once),
            "daily" | "d" => Ok(Frequency::Daily),
            "weekly" | "w" => Ok(Frequency::Weekly),
            "monthly" | "m" => Ok(Frequency::Monthly),
            "yearly" | "y" => Ok(Frequency::Yearly),
            other => Err(format!("unknown frequency '{}'", other)),
        }
    }
}

// Start/stop stamps in Unix seconds. An odd number of stamps means running.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Timer {
    pub stamps: Vec<i64>,
}

impl Timer {
    pub fn new(stamps: Vec<i64>) -> Self {
        Timer { stamps }
    }

    pub fn is_started(&self) -> bool {
        !self.stamps.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.stamps.len() % 2 == 1
    }

    pub fn toggle(&mut self, now: i64) {
        self.stamps.push(now);
    }

    pub fn reset(&mut self) {
        self.stamps.clear();
    }

    pub fn elapsed_seconds(&self, now: i64) -> i64 {
        let closed: i64 = self.stamps.chunks_exact(2).map(|pair| pair[1] - pair[0]).sum();
        let open = match self.stamps.last() {
            Some(last) if self.is_running() => now - last,
            _ => 0,
        };
        (closed + open).max(0)
    }

    pub fn passed_time(&self, now: i64) -> String {
        let total = self.elapsed_seconds(now);
        let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);
        if total < 3600 {
            format!("{:02}:{:02}", minutes, seconds)
        } else if total < 86_400 {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            let days = total / 86_400;
            format!("{} day{}", days, if days == 1 { "" } else { "s" })
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub item_id: ItemId,
    pub name: String,
    // 0 = top level, 1 = subtask, 2 = sub-subtask.
    pub depth: u8,
    pub status: Status,
    pub timer: Timer,
    pub privacy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Date>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Task {
            item_id: 0,
            name: name.into(),
            depth: 0,
            status: Status::Normal,
            timer: Timer::default(),
            privacy: false,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Date) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn private(mut self, privacy: bool) -> Self {
        self.privacy = privacy;
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserEvent {
    pub item_id: ItemId,
    pub date: Date,
    pub name: String,
    // Total number of occurrences including the anchor, 1..=MAX_REPETITION.
    pub repetition: u32,
    pub frequency: Frequency,
    pub status: Status,
    pub privacy: bool,
}

impl UserEvent {
    pub fn new(date: Date, name: impl Into<String>) -> Self {
        UserEvent {
            item_id: 0,
            date,
            name: name.into(),
            repetition: 1,
            frequency: Frequency::Once,
            status: Status::Normal,
            privacy: false,
        }
    }

    // Clamped to 1..=MAX_REPETITION.
    pub fn repeating(mut self, repetition: u32, frequency: Frequency) -> Self {
        self.repetition = repetition.clamp(1, MAX_REPETITION);
        self.frequency = frequency;
        self
    }

    pub fn private(mut self, privacy: bool) -> Self {
        self.privacy = privacy;
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.repetition > 1 && self.frequency != Frequency::Once
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RepeatedEvent {
    pub parent_id: ItemId,
    pub date: Date,
    pub name: String,
    pub status: Status,
    pub privacy: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CalendarEntry {
    Definition(UserEvent),
    Occurrence(RepeatedEvent),
}

impl CalendarEntry {
    pub fn item_id(&self) -> ItemId {
        match self {
            CalendarEntry::Definition(event) => event.item_id,
            CalendarEntry::Occurrence(occurrence) => occurrence.parent_id,
        }
    }

    pub fn date(&self) -> Date {
        match self {
            CalendarEntry::Definition(event) => event.date,
            CalendarEntry::Occurrence(occurrence) => occurrence.date,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CalendarEntry::Definition(event) => &event.name,
            CalendarEntry::Occurrence(occurrence) => &occurrence.name,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            CalendarEntry::Definition(event) => event.status,
            CalendarEntry::Occurrence(occurrence) => occurrence.status,
        }
    }

    pub fn privacy(&self) -> bool {
        match self {
            CalendarEntry::Definition(event) => event.privacy,
            CalendarEntry::Occurrence(occurrence) => occurrence.privacy,
        }
    }

    pub fn is_occurrence(&self) -> bool {
        matches!(self, CalendarEntry::Occurrence(_))
    }
}

pub trait Item {
    fn item_id(&self) -> ItemId;
    fn set_item_id(&mut self, id: ItemId);
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
    fn status(&self) -> Status;
    fn set_status(&mut self, status: Status);
    fn privacy(&self) -> bool;
    fn set_privacy(&mut self, privacy: bool);

    fn depth(&self) -> u8 {
        0
    }
}

impl Item for Task {
    fn item_id(&self) -> ItemId {
        self.item_id
    }
    fn set_item_id(&mut self, id: ItemId) {
        self.item_id = id;
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
    fn status(&self) -> Status {
        self.status
    }
    fn set_status(&mut self, status: Status) {
        self.status = status;
    }
    fn privacy(&self) -> bool {
        self.privacy
    }
    fn set_privacy(&mut self, privacy: bool) {
        self.privacy = privacy;
    }
    fn depth(&self) -> u8 {
        self.depth
    }
}

impl Item for UserEvent {
    fn item_id(&self) -> ItemId {
        self.item_id
    }
    fn set_item_id(&mut self, id: ItemId) {
        self.item_id = id;
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
    fn status(&self) -> Status {
        self.status
    }
    fn set_status(&mut self, status: Status) {
        self.status = status;
    }
    fn privacy(&self) -> bool {
        self.privacy
    }
    fn set_privacy(&mut self, privacy: bool) {
        self.privacy = privacy;
    }
}

pub fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name.chars().count() <= MAX_NAME_LENGTH
        && name != RESERVED_NAME
        && !name.starts_with(PRIVACY_MARKER)
        && !name.starts_with(DEPTH_MARKER)
}

pub fn encode_name(name: &str, depth: u8, privacy: bool) -> String {
    let mut encoded = String::with_capacity(name.len() + 1 + 2 * depth as usize);
    if privacy {
        encoded.push(PRIVACY_MARKER);
    }
    for _ in 0..depth {
        encoded.push_str(DEPTH_MARKER);
    }
    encoded.push_str(name);
    encoded
}

// Inverse of encode_name: returns (name, depth, privacy).
pub fn decode_name(raw: &str) -> (String, u8, bool) {
    let (rest, privacy) = match raw.strip_prefix(PRIVACY_MARKER) {
        Some(rest) => (rest, true),
        None => (raw, false),
    };
    let mut rest = rest;
    let mut depth = 0u8;
    while let Some(stripped) = rest.strip_prefix(DEPTH_MARKER) {
        rest = stripped;
        depth += 1;
    }
    (rest.to_string(), depth.min(MAX_DEPTH), privacy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_toggle_rules() {
        assert_eq!(Status::Normal.toggled(Status::Important), Status::Important);
        assert_eq!(Status::Important.toggled(Status::Important), Status::Normal);
        assert_eq!(Status::Done.toggled(Status::Important), Status::Important);
    }

    #[test]
    fn test_status_keywords() {
        for status in [Status::Normal, Status::Done, Status::Important, Status::Unimportant] {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
        assert_eq!("DONE".parse::<Status>().unwrap(), Status::Done);
        assert!("finished".parse::<Status>().is_err());
    }

    #[test]
    fn test_frequency_legacy_aliases() {
        assert_eq!("n".parse::<Frequency>().unwrap(), Frequency::Once);
        assert_eq!("d".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!("w".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!("m".parse::<Frequency>().unwrap(), Frequency::Monthly);
        assert_eq!("y".parse::<Frequency>().unwrap(), Frequency::Yearly);
        assert_eq!("monthly".parse::<Frequency>().unwrap(), Frequency::Monthly);
        assert!("fortnightly".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_timer_elapsed_time() {
        let mut timer = Timer::default();
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed_seconds(1_000), 0);

        timer.toggle(1_000);
        assert!(timer.is_running());
        assert_eq!(timer.elapsed_seconds(1_065), 65);

        timer.toggle(1_100);
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed_seconds(5_000), 100);

        timer.toggle(2_000);
        assert_eq!(timer.elapsed_seconds(2_050), 150);

        timer.reset();
        assert!(!timer.is_started());
    }

    #[test]
    fn test_timer_passed_time_text() {
        assert_eq!(Timer::new(vec![0, 65]).passed_time(0), "01:05");
        assert_eq!(Timer::new(vec![0, 3725]).passed_time(0), "01:02:05");
        assert_eq!(Timer::new(vec![0, 86_400]).passed_time(0), "1 day");
        assert_eq!(Timer::new(vec![0, 3 * 86_400 + 5]).passed_time(0), "3 days");
        assert_eq!(Timer::new(vec![100]).passed_time(130), "00:30");
    }

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("Buy milk"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("   "));
        assert!(!is_valid_name(RESERVED_NAME));
        assert!(!is_valid_name(".hidden"));
        assert!(!is_valid_name("--nested"));
        assert!(is_valid_name("a-b"));
        assert!(is_valid_name(&"x".repeat(MAX_NAME_LENGTH)));
        assert!(!is_valid_name(&"x".repeat(MAX_NAME_LENGTH + 1)));
    }

    #[test]
    fn test_name_encoding() {
        assert_eq!(encode_name("Plan", 0, false), "Plan");
        assert_eq!(encode_name("Plan", 1, true), ".--Plan");
        assert_eq!(encode_name("Plan", 2, false), "----Plan");
        assert_eq!(decode_name(".--Plan"), ("Plan".to_string(), 1, true));
        assert_eq!(decode_name("----Plan"), ("Plan".to_string(), 2, false));
        assert_eq!(decode_name("Plan-B"), ("Plan-B".to_string(), 0, false));
    }

    #[test]
    fn test_calendar_entry_maps_back_to_parent() {
        let occurrence = CalendarEntry::Occurrence(RepeatedEvent {
            parent_id: 7,
            date: Date::new(2024, 5, 1),
            name: "Standup".to_string(),
            status: Status::Normal,
            privacy: false,
        });
        assert_eq!(occurrence.item_id(), 7);
        assert!(occurrence.is_occurrence());
        assert_eq!(occurrence.name(), "Standup");
    }

    #[test]
    fn test_repetition_is_clamped() {
        let date = Date::new(2024, 1, 1);
        let event = UserEvent::new(date, "Forever").repeating(u32::MAX, Frequency::Yearly);
        assert_eq!(event.repetition, MAX_REPETITION);
        let event = UserEvent::new(date, "Zero").repeating(0, Frequency::Daily);
        assert_eq!(event.repetition, 1);
    }
}
