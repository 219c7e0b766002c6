//! Read-only views derived from the store's collections.
//!
//! Nothing here is persisted; every view is recomputed from the current
//! collections on demand. Due dates are compared with the target date as
//! whole strings, so a reminder due `2024-12-21T09:00:00.000Z` is not yet
//! due for `2024-12-21` but is for `2024-12-21T10:00:00.000Z`.

use indexmap::IndexMap;

use crate::models::{
    CareRecord, CareReminder, CareTask, DashboardStats, Plant, PlantCategory, PlantStatus,
    TaskPriority,
};
use crate::utils;

/// Number of care records shown as recent activity
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Shown in place of a plant name when a reminder outlives its plant
pub const UNKNOWN_PLANT_NAME: &str = "Unknown Plant";

fn is_due(next_due: &str, date: &str) -> bool {
    next_due <= date
}

fn is_overdue(next_due: &str, date: &str) -> bool {
    next_due < date
}

/// Sort newest first. Unreadable dates go last; ties keep their order.
pub fn sort_by_date_desc(records: &mut [CareRecord]) {
    records.sort_by(|a, b| {
        let a_key = utils::parse_datetime(&a.date);
        let b_key = utils::parse_datetime(&b.date);
        b_key.cmp(&a_key)
    });
}

/// Most recent care records across all plants
pub fn recent_activity<'a>(
    care_records: impl IntoIterator<Item = &'a CareRecord>,
    limit: usize,
) -> Vec<CareRecord> {
    let mut records: Vec<CareRecord> = care_records.into_iter().cloned().collect();
    sort_by_date_desc(&mut records);
    records.truncate(limit);
    records
}

/// Dashboard counters as of `today` (YYYY-MM-DD).
///
/// `today_tasks` counts every active reminder due on or before today, so
/// overdue reminders are included in both counters.
pub fn dashboard_stats(
    plants: &IndexMap<String, Plant>,
    care_records: &IndexMap<String, CareRecord>,
    reminders: &IndexMap<String, CareReminder>,
    today: &str,
) -> DashboardStats {
    let healthy_plants = plants
        .values()
        .filter(|p| p.status == PlantStatus::Healthy)
        .count();
    let plants_needing_care = plants.values().filter(|p| p.status.needs_care()).count();

    let today_tasks = reminders
        .values()
        .filter(|r| r.is_active && is_due(&r.next_due, today))
        .count();
    let overdue_tasks = reminders
        .values()
        .filter(|r| r.is_active && is_overdue(&r.next_due, today))
        .count();

    DashboardStats {
        total_plants: plants.len(),
        healthy_plants,
        plants_needing_care,
        today_tasks,
        overdue_tasks,
        recent_activity: recent_activity(care_records.values(), RECENT_ACTIVITY_LIMIT),
    }
}

/// Active reminders due on or before `date`, joined with their plant's name
pub fn care_tasks_for_date(
    plants: &IndexMap<String, Plant>,
    reminders: &IndexMap<String, CareReminder>,
    date: &str,
) -> Vec<CareTask> {
    reminders
        .values()
        .filter(|r| r.is_active && is_due(&r.next_due, date))
        .map(|reminder| {
            let overdue = is_overdue(&reminder.next_due, date);
            CareTask {
                id: reminder.id.clone(),
                plant_id: reminder.plant_id.clone(),
                plant_name: plants
                    .get(&reminder.plant_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| UNKNOWN_PLANT_NAME.to_string()),
                care_type: reminder.care_type,
                title: reminder.title.clone(),
                due_date: reminder.next_due.clone(),
                is_overdue: overdue,
                priority: if overdue { TaskPriority::High } else { TaskPriority::Medium },
                completed: false,
                completed_at: None,
            }
        })
        .collect()
}

/// One plant's care log, newest first
pub fn care_history(care_records: &IndexMap<String, CareRecord>, plant_id: &str) -> Vec<CareRecord> {
    let mut records: Vec<CareRecord> = care_records
        .values()
        .filter(|r| r.plant_id == plant_id)
        .cloned()
        .collect();
    sort_by_date_desc(&mut records);
    records
}

/// Case-insensitive match on name, species or nickname, optionally within one category
pub fn search_plants(
    plants: &IndexMap<String, Plant>,
    query: Option<&str>,
    category: Option<PlantCategory>,
) -> Vec<Plant> {
    let query = query
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    plants
        .values()
        .filter(|plant| match &query {
            Some(q) => {
                plant.name.to_lowercase().contains(q)
                    || plant.species.to_lowercase().contains(q)
                    || plant
                        .nickname
                        .as_ref()
                        .is_some_and(|n| n.to_lowercase().contains(q))
            }
            None => true,
        })
        .filter(|plant| category.is_none_or(|c| plant.category == c))
        .cloned()
        .collect()
}
