use crate::domain::models::Event;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

pub type DayGroups = BTreeMap<String, Vec<Event>>;

pub fn day_key(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d").to_string()
}

/// Buckets events under the UTC day they start on and, when different, the
/// day they end on. Days strictly between the two are not represented.
pub fn group_events_by_day(events: &[Event]) -> DayGroups {
    let mut groups = DayGroups::new();
    for event in events {
        let start_key = day_key(&event.date_start);
        let end_key = day_key(&event.date_end);
        let spans_two_days = end_key != start_key;
        groups.entry(start_key).or_default().push(event.clone());
        if spans_two_days {
            groups.entry(end_key).or_default().push(event.clone());
        }
    }
    groups
}

/// Most recent day first.
pub fn sorted_day_keys_desc(groups: &DayGroups) -> Vec<String> {
    groups.keys().rev().cloned().collect()
}
