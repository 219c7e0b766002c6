pub mod cli;
pub mod config;
pub mod dashboard;
pub mod database;
pub mod models;
pub mod seed;
pub mod store;
pub mod utils;

pub use config::Config;
pub use database::{Database, DatabaseError, KeyValueStore};
pub use models::{
    CareRecord, CareReminder, CareTask, CareType, DashboardStats, Plant, PlantCategory,
    PlantPhoto, PlantStatus,
};
pub use store::{PlantStore, StoreError, StoreSnapshot};
pub use utils::Profile;
