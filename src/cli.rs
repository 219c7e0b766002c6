use chrono::{Duration, NaiveDate};
use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::models::{
    CareRequirements, CareType, LightRequirement, NewCareRecord, NewPhoto, NewPlant, NewReminder,
    Plant, PlantCategory, PlantDifficulty, PlantStatus, PlantUpdate, ReminderUpdate, ValueRange,
};
use crate::seed;
use crate::store::{PlantStore, StoreError};
use crate::utils::{self, get_current_date_string, parse_date};

#[derive(Parser)]
#[command(name = "plantcare")]
#[command(about = "Plant care tracker - plants, care logs and reminders kept on this machine")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show plant counts, due tasks and recent activity (default if no subcommand)
    Dashboard,
    /// Register a new plant
    Add(AddArgs),
    /// List plants
    List {
        /// Match name, species or nickname (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,
        /// Only plants in this category
        #[arg(long)]
        category: Option<PlantCategory>,
    },
    /// Show a plant with its care history
    Show {
        /// Plant ID
        id: String,
    },
    /// Edit a plant
    Update(UpdateArgs),
    /// Delete a plant together with its care records and reminders
    Delete {
        /// Plant ID
        id: String,
    },
    /// Log a care action (watering, fertilizing, pruning, ...)
    Care(CareArgs),
    /// Attach a photo reference to a plant
    Photo(PhotoArgs),
    /// Create a reminder for a plant
    Remind(RemindArgs),
    /// Edit a reminder
    Reminder(ReminderArgs),
    /// List care tasks due on or before a date
    Tasks {
        /// Date to check (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Add sample plants if there are none
    Seed,
    /// Erase all plants, care records and reminders
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Plant name
    #[arg(short = 'n', long)]
    pub name: String,
    /// Species
    #[arg(short = 's', long)]
    pub species: String,
    #[arg(long)]
    pub variety: Option<String>,
    #[arg(long)]
    pub nickname: Option<String>,
    /// Where the plant came from
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long, default_value = "foliage")]
    pub category: PlantCategory,
    #[arg(long, default_value = "medium")]
    pub difficulty: PlantDifficulty,
    #[arg(long, default_value = "medium")]
    pub light: LightRequirement,
    /// Watering interval in days
    #[arg(long, default_value_t = 7)]
    pub water_every: u32,
    /// Fertilizing interval in days
    #[arg(long, default_value_t = 30)]
    pub fertilize_every: u32,
    #[arg(long, default_value_t = 18.0)]
    pub temp_min: f64,
    #[arg(long, default_value_t = 25.0)]
    pub temp_max: f64,
    #[arg(long, default_value_t = 40.0)]
    pub humidity_min: f64,
    #[arg(long, default_value_t = 60.0)]
    pub humidity_max: f64,
    #[arg(long)]
    pub soil: Option<String>,
    #[arg(long)]
    pub pot: Option<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Plant ID
    pub id: String,
    #[arg(short, long)]
    pub name: Option<String>,
    #[arg(long)]
    pub species: Option<String>,
    /// New nickname, or "" to remove it
    #[arg(long)]
    pub nickname: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    /// New notes, or "" to remove them
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long)]
    pub category: Option<PlantCategory>,
    #[arg(long)]
    pub status: Option<PlantStatus>,
    /// Health score from 1 to 10
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub health_score: Option<u8>,
    /// Height in cm
    #[arg(long)]
    pub height: Option<f64>,
    #[arg(long)]
    pub leaf_count: Option<u32>,
    #[arg(long)]
    pub flowering: Option<bool>,
    #[arg(long)]
    pub fruit: Option<bool>,
}

#[derive(Args, Debug)]
pub struct CareArgs {
    /// Plant ID
    pub plant_id: String,
    /// Care type
    pub care_type: CareType,
    /// When it happened (YYYY-MM-DD or RFC 3339), defaults to now
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long)]
    pub amount: Option<f64>,
    #[arg(long)]
    pub unit: Option<String>,
    /// Fertilizer, pesticide, ... used
    #[arg(long)]
    pub product: Option<String>,
}

#[derive(Args, Debug)]
pub struct PhotoArgs {
    /// Plant ID
    pub plant_id: String,
    /// Local file reference
    pub uri: String,
    /// Date taken (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Comma-separated tags
    #[arg(long)]
    pub tags: Option<String>,
}

#[derive(Args, Debug)]
pub struct RemindArgs {
    /// Plant ID
    pub plant_id: String,
    /// Care type
    pub care_type: CareType,
    /// Reminder title
    pub title: String,
    /// Repeat interval in days
    #[arg(long)]
    pub every: u32,
    /// First due date (YYYY-MM-DD), defaults to today plus the interval
    #[arg(long)]
    pub next_due: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct ReminderArgs {
    /// Reminder ID
    pub id: String,
    #[arg(long)]
    pub active: Option<bool>,
    #[arg(long)]
    pub next_due: Option<String>,
    #[arg(long)]
    pub every: Option<u32>,
    #[arg(long)]
    pub title: Option<String>,
    /// New description, or "" to remove it
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Invalid input: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Trimmed text, or `None` if blank
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Update for an optional text field: absent keeps it, blank clears it
fn text_update(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| non_blank(Some(v)))
}

/// Accept `YYYY-MM-DD` or an RFC 3339 timestamp
fn validate_date(value: &str) -> Result<String, CliError> {
    let value = value.trim();
    if utils::parse_datetime(value).is_some() {
        Ok(value.to_string())
    } else {
        Err(CliError::DateParseError(format!(
            "Invalid date format '{}': expected YYYY-MM-DD or RFC 3339",
            value
        )))
    }
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

fn require_plant(store: &PlantStore, plant_id: &str) -> Result<Plant, CliError> {
    store
        .plant(plant_id)
        .ok_or_else(|| CliError::NotFound(format!("No plant with ID {}", plant_id)))
}

fn describe_last(label: &str, date: Option<&str>) -> String {
    match date {
        Some(date) => match utils::days_since(date, today()) {
            Some(0) => format!("{}: {} (today)", label, utils::date_part(date)),
            Some(days) => format!("{}: {} ({} days ago)", label, utils::date_part(date), days),
            None => format!("{}: {}", label, date),
        },
        None => format!("{}: never", label),
    }
}

/// Build the plant to insert from `add` arguments
pub fn new_plant_from_args(args: AddArgs) -> Result<NewPlant, CliError> {
    let name = args.name.trim().to_string();
    if name.is_empty() {
        return Err(CliError::ValidationError("Plant name is required".to_string()));
    }
    let species = args.species.trim().to_string();
    if species.is_empty() {
        return Err(CliError::ValidationError("Species is required".to_string()));
    }
    if args.temp_min > args.temp_max || args.humidity_min > args.humidity_max {
        return Err(CliError::ValidationError(
            "Range minimum must not exceed its maximum".to_string(),
        ));
    }

    let mut plant = NewPlant::new(name, species);
    let defaults = CareRequirements::default();
    plant.variety = non_blank(args.variety);
    plant.nickname = non_blank(args.nickname);
    if let Some(source) = non_blank(args.source) {
        plant.source = source;
    }
    if let Some(location) = non_blank(args.location) {
        plant.location = location;
    }
    plant.notes = non_blank(args.notes);
    plant.category = args.category;
    plant.difficulty = args.difficulty;
    plant.care_requirements = CareRequirements {
        watering_frequency: args.water_every,
        fertilizing_frequency: args.fertilize_every,
        light_requirement: args.light,
        temperature_range: ValueRange { min: args.temp_min, max: args.temp_max },
        humidity_range: ValueRange { min: args.humidity_min, max: args.humidity_max },
        soil_type: non_blank(args.soil).unwrap_or(defaults.soil_type),
        pot_size: non_blank(args.pot).unwrap_or(defaults.pot_size),
    };
    Ok(plant)
}

/// Handle the add command
pub async fn handle_add(args: AddArgs, store: &PlantStore) -> Result<(), CliError> {
    let new = new_plant_from_args(args)?;
    let plant = store.add_plant(new).await?;
    println!("Plant '{}' added (ID: {})", plant.name, plant.id);
    Ok(())
}

/// Handle the list command
pub fn handle_list(search: Option<String>, category: Option<PlantCategory>, store: &PlantStore) -> Result<(), CliError> {
    let plants = store.search_plants(search.as_deref(), category);
    if plants.is_empty() {
        println!("No plants found");
        return Ok(());
    }

    for plant in plants {
        let watered = match plant.current_stats.last_watered.as_deref() {
            Some(date) => match utils::days_since(date, today()) {
                Some(days) => format!("watered {} days ago", days),
                None => format!("watered {}", date),
            },
            None => "never watered".to_string(),
        };
        println!(
            "{}  {} ({}) [{}] {} - {}",
            plant.id, plant.name, plant.species, plant.status, plant.category, watered
        );
    }
    Ok(())
}

/// Handle the show command
pub fn handle_show(id: &str, store: &PlantStore) -> Result<(), CliError> {
    let plant = require_plant(store, id)?;
    let req = &plant.care_requirements;
    let stats = &plant.current_stats;

    println!("{} ({})", plant.name, plant.species);
    if let Some(ref nickname) = plant.nickname {
        println!("Nickname: {}", nickname);
    }
    if let Some(ref variety) = plant.variety {
        println!("Variety: {}", variety);
    }
    println!("ID: {}", plant.id);
    println!("Category: {}  Difficulty: {}  Status: {}", plant.category, plant.difficulty, plant.status);
    println!("Location: {}  Source: {}", plant.location, plant.source);
    println!("Planted: {}  Acquired: {}", plant.planted_date, plant.acquired_date);
    if let Some(ref notes) = plant.notes {
        println!("Notes: {}", notes);
    }

    println!();
    println!(
        "Care: water every {} days, fertilize every {} days, {} light",
        req.watering_frequency, req.fertilizing_frequency, req.light_requirement
    );
    println!(
        "      {}-{} °C, {}-{}% humidity, {} in a {} pot",
        req.temperature_range.min,
        req.temperature_range.max,
        req.humidity_range.min,
        req.humidity_range.max,
        req.soil_type,
        req.pot_size
    );

    println!();
    println!(
        "Height: {} cm  Leaves: {}  Health: {}/10{}{}",
        stats.height,
        stats.leaf_count,
        stats.health_score,
        if stats.is_flowering { "  flowering" } else { "" },
        if stats.has_fruit { "  fruiting" } else { "" }
    );
    println!("{}", describe_last("Last watered", stats.last_watered.as_deref()));
    println!("{}", describe_last("Last fertilized", stats.last_fertilized.as_deref()));
    println!("{}", describe_last("Last pruned", stats.last_pruned.as_deref()));
    println!("{}", describe_last("Last repotted", stats.last_repotted.as_deref()));

    if !plant.photos.is_empty() {
        println!();
        println!("Photos:");
        for photo in &plant.photos {
            println!(
                "  {}  {}  {}",
                photo.date,
                photo.uri,
                photo.description.as_deref().unwrap_or("")
            );
        }
    }

    let history = store.care_history(&plant.id);
    println!();
    if history.is_empty() {
        println!("Care history: none");
    } else {
        println!("Care history:");
        for record in history {
            println!(
                "  {}  {:<18} {}",
                utils::date_part(&record.date),
                record.care_type,
                record.notes.as_deref().unwrap_or("")
            );
        }
    }
    Ok(())
}

/// Handle the update command
pub async fn handle_update(args: UpdateArgs, store: &PlantStore) -> Result<(), CliError> {
    let plant = require_plant(store, &args.id)?;

    let mut stats = plant.current_stats.clone();
    if let Some(health_score) = args.health_score {
        stats.health_score = health_score;
    }
    if let Some(height) = args.height {
        stats.height = height;
    }
    if let Some(leaf_count) = args.leaf_count {
        stats.leaf_count = leaf_count;
    }
    if let Some(flowering) = args.flowering {
        stats.is_flowering = flowering;
    }
    if let Some(fruit) = args.fruit {
        stats.has_fruit = fruit;
    }

    let update = PlantUpdate {
        name: non_blank(args.name),
        species: non_blank(args.species),
        nickname: text_update(args.nickname),
        location: non_blank(args.location),
        notes: text_update(args.notes),
        category: args.category,
        status: args.status,
        current_stats: (stats != plant.current_stats).then_some(stats),
        ..Default::default()
    };

    if update.is_empty() {
        println!("No changes provided");
        return Ok(());
    }

    match store.update_plant(&args.id, update).await? {
        Some(plant) => println!("Plant '{}' updated", plant.name),
        None => return Err(CliError::NotFound(format!("No plant with ID {}", args.id))),
    }
    Ok(())
}

/// Handle the delete command
pub async fn handle_delete(id: &str, store: &PlantStore) -> Result<(), CliError> {
    if store.delete_plant(id).await? {
        println!("Plant {} deleted with its care records and reminders", id);
        Ok(())
    } else {
        Err(CliError::NotFound(format!("No plant with ID {}", id)))
    }
}

/// Handle the care command
pub async fn handle_care(args: CareArgs, store: &PlantStore) -> Result<(), CliError> {
    let plant = require_plant(store, &args.plant_id)?;
    let date = match args.date {
        Some(date) => validate_date(&date)?,
        None => utils::timestamp_now(),
    };

    let mut new = NewCareRecord::new(plant.id.clone(), args.care_type, date);
    new.notes = non_blank(args.notes);
    new.amount = args.amount;
    new.unit = non_blank(args.unit);
    new.product = non_blank(args.product);

    let record = store.add_care_record(new).await?;
    println!("Logged {} for '{}' (ID: {})", record.care_type, plant.name, record.id);
    Ok(())
}

/// Handle the photo command
pub async fn handle_photo(args: PhotoArgs, store: &PlantStore) -> Result<(), CliError> {
    let date = match args.date {
        Some(date) => validate_date(&date)?,
        None => get_current_date_string(),
    };
    let tags = args
        .tags
        .map(|t| {
            t.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let new = NewPhoto {
        uri: args.uri,
        date,
        description: non_blank(args.description),
        tags,
        measurements: None,
    };

    match store.add_photo(&args.plant_id, new).await? {
        Some(photo) => {
            println!("Photo added (ID: {})", photo.id);
            Ok(())
        }
        None => Err(CliError::NotFound(format!("No plant with ID {}", args.plant_id))),
    }
}

/// Handle the remind command
pub async fn handle_remind(args: RemindArgs, store: &PlantStore) -> Result<(), CliError> {
    let plant = require_plant(store, &args.plant_id)?;
    if args.every == 0 {
        return Err(CliError::ValidationError("Reminder interval must be at least 1 day".to_string()));
    }

    let next_due = match args.next_due {
        Some(date) => {
            parse_date(date.trim()).map_err(|e| {
                CliError::DateParseError(format!("Invalid date format '{}': {}", date, e))
            })?;
            date.trim().to_string()
        }
        None => (today() + Duration::days(i64::from(args.every)))
            .format("%Y-%m-%d")
            .to_string(),
    };

    let reminder = store
        .add_reminder(NewReminder {
            plant_id: plant.id.clone(),
            care_type: args.care_type,
            title: args.title,
            description: non_blank(args.description),
            frequency: args.every,
            next_due,
            is_active: true,
            custom_schedule: None,
        })
        .await?;
    println!(
        "Reminder '{}' for '{}' due {} (ID: {})",
        reminder.title, plant.name, reminder.next_due, reminder.id
    );
    Ok(())
}

/// Handle the reminder (edit) command
pub async fn handle_reminder(args: ReminderArgs, store: &PlantStore) -> Result<(), CliError> {
    let next_due = match args.next_due {
        Some(date) => {
            parse_date(date.trim()).map_err(|e| {
                CliError::DateParseError(format!("Invalid date format '{}': {}", date, e))
            })?;
            Some(date.trim().to_string())
        }
        None => None,
    };

    let update = ReminderUpdate {
        title: non_blank(args.title),
        description: text_update(args.description),
        frequency: args.every,
        next_due,
        is_active: args.active,
        ..Default::default()
    };
    if update.is_empty() {
        println!("No changes provided");
        return Ok(());
    }

    match store.update_reminder(&args.id, update).await? {
        Some(reminder) => {
            println!(
                "Reminder '{}' updated ({}, due {})",
                reminder.title,
                if reminder.is_active { "active" } else { "paused" },
                reminder.next_due
            );
            Ok(())
        }
        None => Err(CliError::NotFound(format!("No reminder with ID {}", args.id))),
    }
}

/// Handle the dashboard command
pub fn handle_dashboard(store: &PlantStore) -> Result<(), CliError> {
    let stats = store.dashboard_stats();

    println!(
        "Plants: {} total, {} healthy, {} need care",
        stats.total_plants, stats.healthy_plants, stats.plants_needing_care
    );
    println!(
        "Tasks:  {} due today ({} overdue)",
        stats.today_tasks, stats.overdue_tasks
    );

    println!();
    if stats.recent_activity.is_empty() {
        println!("Recent activity: none");
    } else {
        println!("Recent activity:");
        for record in &stats.recent_activity {
            let plant_name = store
                .plant(&record.plant_id)
                .map(|p| p.name)
                .unwrap_or_else(|| record.plant_id.clone());
            println!(
                "  {}  {:<18} {}",
                utils::date_part(&record.date),
                record.care_type,
                plant_name
            );
        }
    }
    Ok(())
}

/// Handle the tasks command
pub fn handle_tasks(date: Option<String>, store: &PlantStore) -> Result<(), CliError> {
    let date = match date {
        Some(date) => {
            parse_date(date.trim()).map_err(|e| {
                CliError::DateParseError(format!("Invalid date format '{}': {}", date, e))
            })?;
            date.trim().to_string()
        }
        None => get_current_date_string(),
    };

    let tasks = store.care_tasks_for_date(&date);
    if tasks.is_empty() {
        println!("Nothing due on or before {}", date);
        return Ok(());
    }

    for task in tasks {
        println!(
            "[{}] {}  {} - {} ({}){}",
            task.priority,
            utils::date_part(&task.due_date),
            task.plant_name,
            task.title,
            task.care_type,
            if task.is_overdue { "  OVERDUE" } else { "" }
        );
    }
    Ok(())
}

/// Handle the seed command
pub async fn handle_seed(store: &PlantStore) -> Result<(), CliError> {
    let created = seed::seed_sample_data(store).await?;
    if created == 0 {
        println!("Plants already exist, no sample data added");
    } else {
        println!("Added {} sample plants", created);
    }
    Ok(())
}

/// Handle the reset command
pub async fn handle_reset(yes: bool, store: &PlantStore) -> Result<(), CliError> {
    if !yes {
        return Err(CliError::ValidationError(
            "This erases every plant, care record and reminder; pass --yes to confirm".to_string(),
        ));
    }
    store.clear_all().await?;
    println!("All data erased");
    Ok(())
}
