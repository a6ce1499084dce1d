use crate::calendar::{Calendar, Date};
use crate::model::{
    is_valid_name, CalendarEntry, Item, ItemId, Status, Task, UserEvent, MAX_DEPTH,
    MAX_REPETITION,
};
use crate::recurrence;

#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
    calendar: Calendar,
    first_id: ItemId,
    next_id: ItemId,
    changed: bool,
}

pub type TaskList = Collection<Task>;
pub type EventList = Collection<UserEvent>;

impl<T: Item> Collection<T> {
    fn with_first_id(calendar: Calendar, first_id: ItemId) -> Self {
        Collection {
            items: Vec::new(),
            calendar,
            first_id,
            next_id: first_id,
            changed: false,
        }
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn mark_saved(&mut self) {
        self.changed = false;
    }

    pub fn get(&self, id: ItemId) -> Option<&T> {
        self.items.iter().find(|item| item.item_id() == id)
    }

    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.item_id() == id)
    }

    pub fn is_valid_selection(&self, index: usize) -> bool {
        index < self.items.len()
    }

    pub fn parse_selection(&self, input: &str) -> Option<usize> {
        parse_selection(input, self.items.len())
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name() == name)
    }

    fn assign_id(&mut self, item: &mut T) -> ItemId {
        let after_max = self
            .items
            .iter()
            .map(|existing| existing.item_id().saturating_add(1))
            .max()
            .unwrap_or(self.first_id);
        let id = after_max.max(self.next_id);
        self.next_id = id.saturating_add(1);
        item.set_item_id(id);
        id
    }

    fn insert_at(&mut self, index: usize, mut item: T) -> ItemId {
        let id = self.assign_id(&mut item);
        self.items.insert(index, item);
        self.changed = true;
        id
    }

    // Adds a loaded item without touching the change flag and returns the id
    // it ends up with. With `keep_id` the item's own id is kept unless another
    // item already holds it.
    pub(crate) fn push_loaded(&mut self, mut item: T, keep_id: bool) -> ItemId {
        let id = item.item_id();
        let id = if keep_id && self.get(id).is_none() {
            self.next_id = self.next_id.max(id.saturating_add(1));
            id
        } else {
            self.assign_id(&mut item)
        };
        self.items.push(item);
        id
    }

    // Deletes an item along with the descendants that directly follow it.
    pub fn delete(&mut self, id: ItemId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let end = self.subtree_end(index);
        self.items.drain(index..end);
        self.changed = true;
        true
    }

    pub fn rename(&mut self, id: ItemId, new_name: &str) -> bool {
        if !is_valid_name(new_name) {
            return false;
        }
        let Some(item) = self.items.iter_mut().find(|item| item.item_id() == id) else {
            return false;
        };
        item.set_name(new_name.to_string());
        self.changed = true;
        true
    }

    pub fn toggle_status(&mut self, id: ItemId, candidate: Status) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let status = self.items[index].status().toggled(candidate);
        let end = self.subtree_end(index);
        for item in &mut self.items[index..end] {
            item.set_status(status);
        }
        self.changed = true;
        true
    }

    pub fn toggle_privacy(&mut self, id: ItemId) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.item_id() == id) else {
            return false;
        };
        let privacy = !item.privacy();
        item.set_privacy(privacy);
        self.changed = true;
        true
    }

    pub fn clear(&mut self) -> bool {
        if self.items.is_empty() {
            return false;
        }
        self.items.clear();
        self.changed = true;
        true
    }

    fn subtree_end(&self, index: usize) -> usize {
        let depth = self.items[index].depth();
        self.items[index + 1..]
            .iter()
            .position(|item| item.depth() <= depth)
            .map_or(self.items.len(), |offset| index + 1 + offset)
    }
}

pub fn parse_selection(input: &str, len: usize) -> Option<usize> {
    input
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|index| *index < len)
}

impl Collection<Task> {
    pub fn new(calendar: Calendar) -> Self {
        Self::with_first_id(calendar, 0)
    }

    fn is_valid_task(&self, task: &Task) -> bool {
        is_valid_name(&task.name)
            && task.depth <= MAX_DEPTH
            && task.deadline.map_or(true, |date| self.calendar.is_valid_date(date))
    }

    // Always top level; nesting goes through add_subtask.
    pub fn add(&mut self, mut task: Task) -> Option<ItemId> {
        task.depth = 0;
        if !self.is_valid_task(&task) {
            return None;
        }
        Some(self.insert_at(self.items.len(), task))
    }

    pub fn import(&mut self, task: Task) -> Option<ItemId> {
        if self.contains_name(&task.name) {
            return None;
        }
        self.add(task)
    }

    pub fn add_subtask(&mut self, parent_index: usize, mut task: Task) -> Option<ItemId> {
        let parent = self.items.get(parent_index)?;
        task.depth = (parent.depth + 1).min(MAX_DEPTH);
        if !self.is_valid_task(&task) {
            return None;
        }
        Some(self.insert_at(parent_index + 1, task))
    }

    pub fn move_task(&mut self, from: usize, to: usize) -> bool {
        if !self.is_valid_selection(from) || !self.is_valid_selection(to) {
            return false;
        }
        if from != to {
            let task = self.items.remove(from);
            self.items.insert(to, task);
        }
        self.changed = true;
        true
    }

    // Sets the deadline; a zero year clears it.
    pub fn change_deadline(&mut self, id: ItemId, year: i32, month: u32, day: u32) -> bool {
        let deadline = if year == 0 {
            None
        } else {
            let date = Date::new(year, month, day);
            if !self.calendar.is_valid_date(date) {
                return false;
            }
            Some(date)
        };
        let Some(task) = self.items.iter_mut().find(|task| task.item_id == id) else {
            return false;
        };
        task.deadline = deadline;
        self.changed = true;
        true
    }

    pub fn toggle_timer(&mut self, id: ItemId, now: i64) -> bool {
        let Some(task) = self.items.iter_mut().find(|task| task.item_id == id) else {
            return false;
        };
        task.timer.toggle(now);
        self.changed = true;
        true
    }

    pub fn reset_timer(&mut self, id: ItemId) -> bool {
        let Some(task) = self.items.iter_mut().find(|task| task.item_id == id) else {
            return false;
        };
        if !task.timer.is_started() {
            return false;
        }
        task.timer.reset();
        self.changed = true;
        true
    }

    pub fn filter_by_day(&self, year: i32, month: u32, day: u32) -> Vec<Task> {
        let date = Date::new(year, month, day);
        self.items
            .iter()
            .filter(|task| task.deadline == Some(date))
            .cloned()
            .collect()
    }

    pub fn filter_by_month(&self, year: i32, month: u32) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .items
            .iter()
            .filter(|task| {
                task.deadline
                    .is_some_and(|date| date.year == year && date.month == month)
            })
            .cloned()
            .collect();
        tasks.sort_by_key(|task| task.deadline.map(|date| date.day));
        tasks
    }
}

impl Collection<UserEvent> {
    pub fn new(calendar: Calendar) -> Self {
        Self::with_first_id(calendar, 1)
    }

    pub fn add(&mut self, mut event: UserEvent) -> Option<ItemId> {
        if !is_valid_name(&event.name)
            || !self.calendar.is_valid_date(event.date)
            || event.repetition > MAX_REPETITION
        {
            return None;
        }
        event.repetition = event.repetition.max(1);
        Some(self.insert_at(self.items.len(), event))
    }

    pub fn import(&mut self, event: UserEvent) -> Option<ItemId> {
        if self.contains_name(&event.name) {
            return None;
        }
        self.add(event)
    }

    pub fn change_day(&mut self, id: ItemId, new_day: u32) -> bool {
        let calendar = self.calendar;
        let Some(event) = self.items.iter_mut().find(|event| event.item_id == id) else {
            return false;
        };
        let date = Date::new(event.date.year, event.date.month, new_day);
        if !calendar.is_valid_date(date) {
            return false;
        }
        event.date = date;
        self.changed = true;
        true
    }

    pub fn entries(&self) -> Vec<CalendarEntry> {
        let (first, last) = (Date::new(i32::MIN, 0, 0), Date::new(i32::MAX, u32::MAX, u32::MAX));
        self.entries_between(first, last)
    }

    // Occurrences are increasing, so expansion stops at the first one past `last`.
    fn entries_between(&self, first: Date, last: Date) -> Vec<CalendarEntry> {
        let mut entries = Vec::new();
        for event in &self.items {
            if event.date > last {
                continue;
            }
            if event.date >= first {
                entries.push(CalendarEntry::Definition(event.clone()));
            }
            entries.extend(
                recurrence::expand(&self.calendar, event)
                    .take_while(|entry| entry.date() <= last)
                    .filter(|entry| entry.date() >= first),
            );
        }
        entries
    }

    pub fn filter_by_day(&self, year: i32, month: u32, day: u32) -> Vec<CalendarEntry> {
        let date = Date::new(year, month, day);
        self.entries_between(date, date)
    }

    pub fn filter_by_month(&self, year: i32, month: u32) -> Vec<CalendarEntry> {
        let mut entries =
            self.entries_between(Date::new(year, month, 1), Date::new(year, month, u32::MAX));
        entries.sort_by_key(|entry| entry.date().day);
        entries
    }
}

#[derive(Debug, Clone)]
pub struct ItemStore {
    pub tasks: TaskList,
    pub events: EventList,
}

impl ItemStore {
    pub fn new(calendar: Calendar) -> Self {
        ItemStore {
            tasks: TaskList::new(calendar),
            events: EventList::new(calendar),
        }
    }

    pub fn is_changed(&self) -> bool {
        self.tasks.is_changed() || self.events.is_changed()
    }
}
