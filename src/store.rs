//! The plant store: three id-indexed collections kept in memory and
//! mirrored to a [`KeyValueStore`].
//!
//! Every mutation takes the write lock, computes the next value of the
//! affected collection from the current one, writes the whole collection
//! to the backend and only then swaps it into memory and notifies
//! subscribers. A failed write leaves memory untouched.

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, watch};

use crate::dashboard;
use crate::database::{DatabaseError, KeyValueStore};
use crate::models::{
    CareRecord, CareReminder, CareTask, DashboardStats, NewCareRecord, NewPhoto, NewPlant,
    NewReminder, Plant, PlantCategory, PlantPhoto, PlantUpdate, ReminderUpdate,
};
use crate::utils;

pub const PLANTS_KEY: &str = "@plant_care_plants";
pub const CARE_RECORDS_KEY: &str = "@plant_care_records";
pub const REMINDERS_KEY: &str = "@plant_care_reminders";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Everything the store holds at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub plants: IndexMap<String, Plant>,
    pub care_records: IndexMap<String, CareRecord>,
    pub reminders: IndexMap<String, CareReminder>,
    /// True until the first load finishes; collections are not authoritative yet
    pub loading: bool,
}

pub struct PlantStore {
    backend: Arc<dyn KeyValueStore>,
    state: watch::Sender<StoreSnapshot>,
    write_lock: Mutex<()>,
}

fn index_by_id<T>(items: Vec<T>, id: impl Fn(&T) -> &str) -> IndexMap<String, T> {
    items
        .into_iter()
        .map(|item| (id(&item).to_string(), item))
        .collect()
}

fn encode<T: Serialize>(collection: &IndexMap<String, T>) -> Result<String, serde_json::Error> {
    serde_json::to_string(&collection.values().collect::<Vec<_>>())
}

impl PlantStore {
    /// A store in the loading state with empty collections. Call [`load`](Self::load) next.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(StoreSnapshot {
            loading: true,
            ..Default::default()
        });
        Self {
            backend,
            state,
            write_lock: Mutex::new(()),
        }
    }

    /// Create a store and load it from `backend`
    pub async fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        let store = Self::new(backend);
        store.load().await;
        store
    }

    /// (Re)load all three collections. A missing or unreadable key loads as empty.
    pub async fn load(&self) {
        let _guard = self.write_lock.lock().await;
        self.state.send_modify(|s| s.loading = true);

        let (plants, care_records, reminders) = tokio::join!(
            self.load_collection::<Plant>(PLANTS_KEY),
            self.load_collection::<CareRecord>(CARE_RECORDS_KEY),
            self.load_collection::<CareReminder>(REMINDERS_KEY),
        );
        log::info!(
            "Loaded {} plants, {} care records, {} reminders",
            plants.len(),
            care_records.len(),
            reminders.len()
        );

        self.state.send_modify(|s| {
            s.plants = index_by_id(plants, |p| p.id.as_str());
            s.care_records = index_by_id(care_records, |r| r.id.as_str());
            s.reminders = index_by_id(reminders, |r| r.id.as_str());
            s.loading = false;
        });
    }

    /// Same as [`load`](Self::load)
    pub async fn reload(&self) {
        self.load().await;
    }

    async fn load_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        match self.backend.get(key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(items) => items,
                Err(e) => {
                    log::error!("Error decoding '{}', treating it as empty: {}", key, e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::error!("Error loading '{}', treating it as empty: {}", key, e);
                Vec::new()
            }
        }
    }

    async fn persist(&self, key: &str, json: String) -> Result<(), StoreError> {
        self.backend.set(key, json).await.map_err(|e| {
            log::error!("Error saving '{}': {}", key, e);
            StoreError::from(e)
        })
    }

    async fn save_plants(&self, plants: &IndexMap<String, Plant>) -> Result<(), StoreError> {
        self.persist(PLANTS_KEY, encode(plants)?).await
    }

    async fn save_care_records(&self, care_records: &IndexMap<String, CareRecord>) -> Result<(), StoreError> {
        self.persist(CARE_RECORDS_KEY, encode(care_records)?).await
    }

    async fn save_reminders(&self, reminders: &IndexMap<String, CareReminder>) -> Result<(), StoreError> {
        self.persist(REMINDERS_KEY, encode(reminders)?).await
    }

    // ------------------------------------------------------------------
    // Plants
    // ------------------------------------------------------------------

    /// Insert a plant with a fresh id; `created_at` and `updated_at` are equal
    pub async fn add_plant(&self, new: NewPlant) -> Result<Plant, StoreError> {
        let _guard = self.write_lock.lock().await;

        let plant = Plant::from_new(utils::new_id(), utils::timestamp_now(), new);
        let mut plants = self.state.borrow().plants.clone();
        plants.insert(plant.id.clone(), plant.clone());

        self.save_plants(&plants).await?;
        self.state.send_modify(|s| s.plants = plants);
        log::info!("Added plant '{}' ({})", plant.name, plant.id);
        Ok(plant)
    }

    /// Merge `update` into the plant. Unknown ids are a no-op returning `None`.
    pub async fn update_plant(&self, plant_id: &str, update: PlantUpdate) -> Result<Option<Plant>, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.modify_plant(plant_id, |plant| update.apply_to(plant)).await
    }

    /// Attach a photo record to a plant. Unknown ids are a no-op returning `None`.
    pub async fn add_photo(&self, plant_id: &str, new: NewPhoto) -> Result<Option<PlantPhoto>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let photo = new.into_photo(utils::new_id());
        let added = photo.clone();
        let updated = self
            .modify_plant(plant_id, move |plant| plant.photos.push(photo))
            .await?;
        Ok(updated.map(|_| added))
    }

    /// Caller must hold the write lock
    async fn modify_plant<F>(&self, plant_id: &str, f: F) -> Result<Option<Plant>, StoreError>
    where
        F: FnOnce(&mut Plant) + Send,
    {
        let mut plants = self.state.borrow().plants.clone();
        let Some(plant) = plants.get_mut(plant_id) else {
            log::debug!("No plant with id {}, nothing to update", plant_id);
            return Ok(None);
        };
        f(plant);
        plant.updated_at = utils::timestamp_now();
        let updated = plant.clone();

        self.save_plants(&plants).await?;
        self.state.send_modify(|s| s.plants = plants);
        log::debug!("Updated plant {}", plant_id);
        Ok(Some(updated))
    }

    /// Remove a plant with its care records and reminders.
    ///
    /// All three collections are written in one `set_many` call. Returns
    /// false (and writes nothing) if the id is unknown.
    pub async fn delete_plant(&self, plant_id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;

        let (plants, care_records, reminders) = {
            let current = self.state.borrow();
            if !current.plants.contains_key(plant_id) {
                log::debug!("No plant with id {}, nothing to delete", plant_id);
                return Ok(false);
            }
            let mut plants = current.plants.clone();
            plants.shift_remove(plant_id);
            let mut care_records = current.care_records.clone();
            care_records.retain(|_, r| r.plant_id != plant_id);
            let mut reminders = current.reminders.clone();
            reminders.retain(|_, r| r.plant_id != plant_id);
            (plants, care_records, reminders)
        };

        let entries = vec![
            (PLANTS_KEY.to_string(), encode(&plants)?),
            (CARE_RECORDS_KEY.to_string(), encode(&care_records)?),
            (REMINDERS_KEY.to_string(), encode(&reminders)?),
        ];
        self.backend.set_many(entries).await.map_err(|e| {
            log::error!("Error deleting plant {}: {}", plant_id, e);
            StoreError::from(e)
        })?;

        self.state.send_modify(|s| {
            let removed_records = s.care_records.len() - care_records.len();
            let removed_reminders = s.reminders.len() - reminders.len();
            log::info!(
                "Deleted plant {} with {} care records and {} reminders",
                plant_id,
                removed_records,
                removed_reminders
            );
            s.plants = plants;
            s.care_records = care_records;
            s.reminders = reminders;
        });
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Care records
    // ------------------------------------------------------------------

    /// Log a care action.
    ///
    /// The record is written first. Watering, fertilizing, pruning and
    /// repotting then set the owning plant's matching `last_*` stat to the
    /// record's date in a second write. If the plant is gone the stat step
    /// is skipped and the record is kept. If the second write fails the
    /// error is returned but the record stays, as it is already durable.
    pub async fn add_care_record(&self, new: NewCareRecord) -> Result<CareRecord, StoreError> {
        let _guard = self.write_lock.lock().await;

        let record = new.into_record(utils::new_id());
        let mut care_records = self.state.borrow().care_records.clone();
        care_records.insert(record.id.clone(), record.clone());

        self.save_care_records(&care_records).await?;
        self.state.send_modify(|s| s.care_records = care_records);
        log::debug!("Added {} record {} for plant {}", record.care_type, record.id, record.plant_id);

        if record.care_type.updates_stats() {
            let care_type = record.care_type;
            let date = record.date.clone();
            let updated = self
                .modify_plant(&record.plant_id, move |plant| {
                    plant.current_stats.record_care(care_type, &date);
                })
                .await?;
            if updated.is_none() {
                log::warn!(
                    "Care record {} refers to missing plant {}; stats not updated",
                    record.id,
                    record.plant_id
                );
            }
        }

        Ok(record)
    }

    // ------------------------------------------------------------------
    // Reminders
    // ------------------------------------------------------------------

    pub async fn add_reminder(&self, new: NewReminder) -> Result<CareReminder, StoreError> {
        let _guard = self.write_lock.lock().await;

        let reminder = new.into_reminder(utils::new_id());
        let mut reminders = self.state.borrow().reminders.clone();
        reminders.insert(reminder.id.clone(), reminder.clone());

        self.save_reminders(&reminders).await?;
        self.state.send_modify(|s| s.reminders = reminders);
        log::debug!("Added reminder {} for plant {}", reminder.id, reminder.plant_id);
        Ok(reminder)
    }

    /// Merge `update` into the reminder. Unknown ids are a no-op returning `None`.
    pub async fn update_reminder(
        &self,
        reminder_id: &str,
        update: ReminderUpdate,
    ) -> Result<Option<CareReminder>, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut reminders = self.state.borrow().reminders.clone();
        let Some(reminder) = reminders.get_mut(reminder_id) else {
            log::debug!("No reminder with id {}, nothing to update", reminder_id);
            return Ok(None);
        };
        update.apply_to(reminder);
        let updated = reminder.clone();

        self.save_reminders(&reminders).await?;
        self.state.send_modify(|s| s.reminders = reminders);
        Ok(Some(updated))
    }

    // ------------------------------------------------------------------
    // Reset
    // ------------------------------------------------------------------

    /// Erase everything in the backend and in memory
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        self.backend.clear().await.map_err(|e| {
            log::error!("Error clearing data: {}", e);
            StoreError::from(e)
        })?;
        self.state.send_modify(|s| {
            s.plants.clear();
            s.care_records.clear();
            s.reminders.clear();
            s.loading = false;
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that sees a fresh snapshot after every load and successful mutation
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.state.subscribe()
    }

    pub fn plants(&self) -> Vec<Plant> {
        self.state.borrow().plants.values().cloned().collect()
    }

    pub fn plant(&self, plant_id: &str) -> Option<Plant> {
        self.state.borrow().plants.get(plant_id).cloned()
    }

    pub fn care_records(&self) -> Vec<CareRecord> {
        self.state.borrow().care_records.values().cloned().collect()
    }

    pub fn reminders(&self) -> Vec<CareReminder> {
        self.state.borrow().reminders.values().cloned().collect()
    }

    pub fn reminder(&self, reminder_id: &str) -> Option<CareReminder> {
        self.state.borrow().reminders.get(reminder_id).cloned()
    }

    /// Dashboard counters as of the current UTC date
    pub fn dashboard_stats(&self) -> DashboardStats {
        self.dashboard_stats_on(&utils::get_current_date_string())
    }

    pub fn dashboard_stats_on(&self, today: &str) -> DashboardStats {
        let state = self.state.borrow();
        dashboard::dashboard_stats(&state.plants, &state.care_records, &state.reminders, today)
    }

    pub fn care_tasks_for_date(&self, date: &str) -> Vec<CareTask> {
        let state = self.state.borrow();
        dashboard::care_tasks_for_date(&state.plants, &state.reminders, date)
    }

    pub fn care_history(&self, plant_id: &str) -> Vec<CareRecord> {
        dashboard::care_history(&self.state.borrow().care_records, plant_id)
    }

    pub fn search_plants(&self, query: Option<&str>, category: Option<PlantCategory>) -> Vec<Plant> {
        dashboard::search_plants(&self.state.borrow().plants, query, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::models::{CareType, PlantStatus};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory backend whose writes can be switched to fail
    struct FlakyStore {
        inner: Database,
        fail_writes: AtomicBool,
        /// Fail only writes of the plants collection
        fail_plant_writes: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: Database::open_in_memory().unwrap(),
                fail_writes: AtomicBool::new(false),
                fail_plant_writes: AtomicBool::new(false),
            }
        }

        fn check(&self) -> Result<(), DatabaseError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                Err(DatabaseError::LockPoisoned)
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> Result<(), DatabaseError> {
            self.check()?;
            if key == PLANTS_KEY && self.fail_plant_writes.load(Ordering::SeqCst) {
                return Err(DatabaseError::LockPoisoned);
            }
            self.inner.set(key, value).await
        }

        async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), DatabaseError> {
            self.check()?;
            self.inner.set_many(entries).await
        }

        async fn clear(&self) -> Result<(), DatabaseError> {
            self.check()?;
            self.inner.clear().await
        }
    }

    async fn memory_store() -> PlantStore {
        PlantStore::open(Arc::new(Database::open_in_memory().unwrap())).await
    }

    fn new_plant(name: &str) -> NewPlant {
        NewPlant::new(name.to_string(), format!("{} species", name))
    }

    #[tokio::test]
    async fn test_new_store_is_loading_until_loaded() {
        let store = PlantStore::new(Arc::new(Database::open_in_memory().unwrap()));
        assert!(store.is_loading());
        assert!(store.plants().is_empty());

        store.load().await;
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_add_plant_assigns_id_and_timestamps() {
        let store = memory_store().await;
        let plant = store.add_plant(new_plant("Pothos")).await.unwrap();

        assert!(!plant.id.is_empty());
        assert_eq!(plant.created_at, plant.updated_at);
        assert_eq!(store.plant(&plant.id), Some(plant));
    }

    #[tokio::test]
    async fn test_update_plant_refreshes_updated_at() {
        let store = memory_store().await;
        let plant = store.add_plant(new_plant("Fern")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let updated = store
            .update_plant(
                &plant.id,
                PlantUpdate {
                    status: Some(PlantStatus::Sick),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, PlantStatus::Sick);
        assert_eq!(updated.created_at, plant.created_at);
        assert!(updated.updated_at > plant.updated_at);
    }

    #[tokio::test]
    async fn test_update_unknown_ids_are_noops() {
        let store = memory_store().await;
        store.add_plant(new_plant("Fern")).await.unwrap();
        let before = store.snapshot();

        let plant = store.update_plant("missing", PlantUpdate::default()).await.unwrap();
        let reminder = store.update_reminder("missing", ReminderUpdate::default()).await.unwrap();
        let photo = store
            .add_photo(
                "missing",
                NewPhoto {
                    uri: "file:///photo.jpg".to_string(),
                    date: "2024-12-21".to_string(),
                    description: None,
                    tags: vec![],
                    measurements: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(plant, None);
        assert_eq!(reminder, None);
        assert_eq!(photo, None);
        assert!(!store.delete_plant("missing").await.unwrap());
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_add_photo_appends_to_plant() {
        let store = memory_store().await;
        let plant = store.add_plant(new_plant("Monstera")).await.unwrap();

        let photo = store
            .add_photo(
                &plant.id,
                NewPhoto {
                    uri: "file:///monstera.jpg".to_string(),
                    date: "2024-12-21".to_string(),
                    description: Some("New leaf".to_string()),
                    tags: vec!["leaf".to_string()],
                    measurements: None,
                },
            )
            .await
            .unwrap()
            .unwrap();

        let stored = store.plant(&plant.id).unwrap();
        assert_eq!(stored.photos, vec![photo]);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_untouched() {
        let backend = Arc::new(FlakyStore::new());
        let store = PlantStore::open(backend.clone()).await;
        let plant = store.add_plant(new_plant("Cactus")).await.unwrap();
        let before = store.snapshot();

        backend.fail_writes.store(true, Ordering::SeqCst);
        assert!(store.add_plant(new_plant("Aloe")).await.is_err());
        assert!(store.delete_plant(&plant.id).await.is_err());
        assert!(
            store
                .add_care_record(NewCareRecord::new(
                    plant.id.clone(),
                    CareType::Watering,
                    "2024-12-21".to_string()
                ))
                .await
                .is_err()
        );
        assert!(store.clear_all().await.is_err());

        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_care_record_survives_failed_stat_write() {
        let backend = Arc::new(FlakyStore::new());
        let store = PlantStore::open(backend.clone()).await;
        let plant = store.add_plant(new_plant("Cactus")).await.unwrap();

        backend.fail_plant_writes.store(true, Ordering::SeqCst);
        let result = store
            .add_care_record(NewCareRecord::new(
                plant.id.clone(),
                CareType::Watering,
                "2024-12-21".to_string(),
            ))
            .await;
        assert!(result.is_err());

        let records = store.care_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].plant_id, plant.id);
        assert_eq!(store.plant(&plant.id), Some(plant.clone()));

        backend.fail_plant_writes.store(false, Ordering::SeqCst);
        store.reload().await;
        assert_eq!(store.care_records(), records);
        let reloaded = store.plant(&plant.id).unwrap();
        assert_eq!(reloaded.current_stats.last_watered, None);
        assert_eq!(reloaded, plant);
    }

    #[tokio::test]
    async fn test_corrupt_collection_loads_as_empty() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.set(PLANTS_KEY, "{not json".to_string()).await.unwrap();
        db.set(REMINDERS_KEY, "[]".to_string()).await.unwrap();

        let store = PlantStore::open(db).await;
        assert!(!store.is_loading());
        assert!(store.plants().is_empty());
        assert!(store.reminders().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_mutations() {
        let store = memory_store().await;
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        let plant = store.add_plant(new_plant("Basil")).await.unwrap();

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert!(seen.plants.contains_key(&plant.id));
        assert!(!seen.loading);
    }

    #[tokio::test]
    async fn test_clear_all_empties_store_and_backend() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let store = PlantStore::open(db.clone()).await;
        store.add_plant(new_plant("Basil")).await.unwrap();

        store.clear_all().await.unwrap();

        assert!(store.plants().is_empty());
        assert!(db.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let store = memory_store().await;
        let (a, b, c) = tokio::join!(
            store.add_plant(new_plant("A")),
            store.add_plant(new_plant("B")),
            store.add_plant(new_plant("C")),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert_eq!(store.plants().len(), 3);
        store.reload().await;
        assert_eq!(store.plants().len(), 3);
    }
}
