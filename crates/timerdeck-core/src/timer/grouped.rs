//! Category-grouped view model.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::model::{Timer, TimerWithStatus};

/// Timers bucketed by category, in first-appearance order.
///
/// A category key exists iff its sequence is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupedTimers(IndexMap<String, Vec<TimerWithStatus>>);

impl GroupedTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single pass over `timers`, preserving their relative order.
    pub fn from_timers(timers: impl IntoIterator<Item = TimerWithStatus>) -> Self {
        let mut grouped = Self::new();
        for timer in timers {
            grouped.push(timer);
        }
        grouped
    }

    pub fn push(&mut self, timer: TimerWithStatus) {
        self.0
            .entry(timer.timer.category.clone())
            .or_default()
            .push(timer);
    }

    pub fn category(&self, category: &str) -> Option<&[TimerWithStatus]> {
        self.0.get(category).map(Vec::as_slice)
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.0.contains_key(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[TimerWithStatus])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// All timers, category by category.
    pub fn timers(&self) -> impl Iterator<Item = &TimerWithStatus> {
        self.0.values().flatten()
    }

    pub fn get(&self, id: &str) -> Option<&TimerWithStatus> {
        self.timers().find(|t| t.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TimerWithStatus> {
        self.0.values_mut().flatten().find(|t| t.id() == id)
    }

    /// Ids of the timers in `category`, in sequence order.
    pub fn ids_in(&self, category: &str) -> Vec<String> {
        self.category(category)
            .map(|timers| timers.iter().map(|t| t.id().to_string()).collect())
            .unwrap_or_default()
    }

    /// Remove a timer, deleting its category if it becomes empty.
    pub fn remove(&mut self, id: &str) -> Option<TimerWithStatus> {
        let (category, index) = self.0.iter().find_map(|(category, timers)| {
            timers
                .iter()
                .position(|t| t.id() == id)
                .map(|index| (category.clone(), index))
        })?;

        let timers = self.0.get_mut(&category)?;
        let removed = timers.remove(index);
        if timers.is_empty() {
            self.0.shift_remove(&category);
        }
        Some(removed)
    }

    /// Base records for persistence, status and remaining time dropped.
    pub fn to_timers(&self) -> Vec<Timer> {
        self.timers().map(|t| t.timer.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn category_count(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn timer(id: &str, category: &str) -> TimerWithStatus {
        TimerWithStatus::paused(Timer {
            id: id.into(),
            name: format!("timer {id}"),
            duration: 10,
            category: category.into(),
            created_at: 0,
        })
    }

    #[test]
    fn groups_in_first_appearance_order() {
        let grouped = GroupedTimers::from_timers(vec![
            timer("1", "Kitchen"),
            timer("2", "Gym"),
            timer("3", "Kitchen"),
        ]);
        let categories: Vec<_> = grouped.categories().collect();
        assert_eq!(categories, vec!["Kitchen", "Gym"]);
        assert_eq!(grouped.ids_in("Kitchen"), vec!["1", "3"]);
        assert_eq!(grouped.len(), 3);
    }

    #[test]
    fn removing_last_timer_drops_category() {
        let mut grouped =
            GroupedTimers::from_timers(vec![timer("1", "Kitchen"), timer("2", "Gym")]);
        assert!(grouped.remove("2").is_some());
        assert!(!grouped.contains_category("Gym"));
        assert!(grouped.remove("2").is_none());

        grouped.push(timer("4", "Gym"));
        assert!(grouped.contains_category("Gym"));
    }

    #[test]
    fn remove_keeps_category_order() {
        let mut grouped = GroupedTimers::from_timers(vec![
            timer("1", "A"),
            timer("2", "B"),
            timer("3", "C"),
        ]);
        grouped.remove("2");
        let categories: Vec<_> = grouped.categories().collect();
        assert_eq!(categories, vec!["A", "C"]);
    }

    proptest! {
        #[test]
        fn no_empty_categories_after_removals(
            cats in proptest::collection::vec(0u8..4, 1..24),
            removals in proptest::collection::vec(0usize..24, 0..24),
        ) {
            let mut grouped = GroupedTimers::from_timers(
                cats.iter()
                    .enumerate()
                    .map(|(i, c)| timer(&i.to_string(), &format!("cat-{c}"))),
            );
            for r in removals {
                grouped.remove(&r.to_string());
            }
            for (_, timers) in grouped.iter() {
                prop_assert!(!timers.is_empty());
            }
            prop_assert_eq!(grouped.to_timers().len(), grouped.len());
        }
    }
}
