use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils;

/// Declares a closed enum stored as a snake_case string, with `as_str`,
/// `Display`, `FromStr` and an `ALL` list for help output.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "Unknown {} '{}' (expected one of: {})",
                        $label,
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }
    };
}

string_enum!(PlantCategory, "category" {
    Foliage => "foliage",
    Succulent => "succulent",
    Flowering => "flowering",
    Herb => "herb",
    Vegetable => "vegetable",
    Fruit => "fruit",
    Tree => "tree",
    Vine => "vine",
    Fern => "fern",
    Cactus => "cactus",
    Other => "other",
});

string_enum!(PlantDifficulty, "difficulty" {
    Easy => "easy",
    Medium => "medium",
    Hard => "hard",
});

string_enum!(PlantStatus, "status" {
    Healthy => "healthy",
    NeedsAttention => "needs_attention",
    Sick => "sick",
    Dormant => "dormant",
    Dead => "dead",
});

string_enum!(LightRequirement, "light requirement" {
    Low => "low",
    Medium => "medium",
    High => "high",
    Direct => "direct",
    Indirect => "indirect",
});

string_enum!(CareType, "care type" {
    Watering => "watering",
    Fertilizing => "fertilizing",
    Pruning => "pruning",
    Repotting => "repotting",
    PestControl => "pest_control",
    DiseaseTreatment => "disease_treatment",
    LocationChange => "location_change",
    Measurement => "measurement",
    Photo => "photo",
    Other => "other",
});

string_enum!(TaskPriority, "priority" {
    Low => "low",
    Medium => "medium",
    High => "high",
});

impl CareType {
    /// Care types that update a `last_*` field on the plant
    pub fn updates_stats(&self) -> bool {
        matches!(
            self,
            CareType::Watering | CareType::Fertilizing | CareType::Pruning | CareType::Repotting
        )
    }
}

impl PlantStatus {
    /// Statuses counted as "needs care" on the dashboard
    pub fn needs_care(&self) -> bool {
        matches!(self, PlantStatus::NeedsAttention | PlantStatus::Sick)
    }
}

/// Older stored data wrote "never" as an empty string
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareRequirements {
    pub watering_frequency: u32,    // days
    pub fertilizing_frequency: u32, // days
    pub light_requirement: LightRequirement,
    pub temperature_range: ValueRange,
    pub humidity_range: ValueRange,
    pub soil_type: String,
    pub pot_size: String,
}

impl Default for CareRequirements {
    fn default() -> Self {
        Self {
            watering_frequency: 7,
            fertilizing_frequency: 30,
            light_requirement: LightRequirement::Medium,
            temperature_range: ValueRange { min: 18.0, max: 25.0 },
            humidity_range: ValueRange { min: 40.0, max: 60.0 },
            soil_type: "All-purpose potting mix".to_string(),
            pot_size: "Medium".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantStats {
    pub height: f64, // cm
    pub leaf_count: u32,
    pub health_score: u8, // 1-10
    #[serde(default, deserialize_with = "empty_string_as_none", skip_serializing_if = "Option::is_none")]
    pub last_watered: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none", skip_serializing_if = "Option::is_none")]
    pub last_fertilized: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none", skip_serializing_if = "Option::is_none")]
    pub last_pruned: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none", skip_serializing_if = "Option::is_none")]
    pub last_repotted: Option<String>,
    pub is_flowering: bool,
    pub has_fruit: bool,
}

impl Default for PlantStats {
    fn default() -> Self {
        Self {
            height: 0.0,
            leaf_count: 0,
            health_score: 8,
            last_watered: None,
            last_fertilized: None,
            last_pruned: None,
            last_repotted: None,
            is_flowering: false,
            has_fruit: false,
        }
    }
}

impl PlantStats {
    /// Record a care action against the matching `last_*` field.
    ///
    /// Last write wins: the date is stored even if it is older than the
    /// current value. Returns false for care types that track no stat.
    pub fn record_care(&mut self, care_type: CareType, date: &str) -> bool {
        let field = match care_type {
            CareType::Watering => &mut self.last_watered,
            CareType::Fertilizing => &mut self.last_fertilized,
            CareType::Pruning => &mut self.last_pruned,
            CareType::Repotting => &mut self.last_repotted,
            _ => return false,
        };
        *field = Some(date.to_string());
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoMeasurements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantPhoto {
    pub id: String,
    pub uri: String, // platform-local file reference
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurements: Option<PhotoMeasurements>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: String,
    pub name: String,
    pub species: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default)]
    pub planted_date: String, // YYYY-MM-DD
    #[serde(default)]
    pub acquired_date: String, // YYYY-MM-DD
    pub source: String,
    pub category: PlantCategory,
    pub difficulty: PlantDifficulty,
    pub status: PlantStatus,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub care_requirements: CareRequirements,
    pub current_stats: PlantStats,
    #[serde(default)]
    pub photos: Vec<PlantPhoto>,
    pub created_at: String,
    pub updated_at: String,
}

impl Plant {
    /// Build a stored plant from user input; both timestamps are `now`.
    pub fn from_new(id: String, now: String, new: NewPlant) -> Self {
        Self {
            id,
            name: new.name,
            species: new.species,
            variety: new.variety,
            nickname: new.nickname,
            planted_date: new.planted_date,
            acquired_date: new.acquired_date,
            source: new.source,
            category: new.category,
            difficulty: new.difficulty,
            status: new.status,
            location: new.location,
            notes: new.notes,
            care_requirements: new.care_requirements,
            current_stats: new.current_stats,
            photos: new.photos,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Plant fields supplied by the caller; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlant {
    pub name: String,
    pub species: String,
    pub variety: Option<String>,
    pub nickname: Option<String>,
    pub planted_date: String,
    pub acquired_date: String,
    pub source: String,
    pub category: PlantCategory,
    pub difficulty: PlantDifficulty,
    pub status: PlantStatus,
    pub location: String,
    pub notes: Option<String>,
    pub care_requirements: CareRequirements,
    pub current_stats: PlantStats,
    pub photos: Vec<PlantPhoto>,
}

impl NewPlant {
    pub fn new(name: String, species: String) -> Self {
        let today = utils::get_current_date_string();
        Self {
            name,
            species,
            variety: None,
            nickname: None,
            planted_date: today.clone(),
            acquired_date: today,
            source: "Unknown".to_string(),
            category: PlantCategory::Foliage,
            difficulty: PlantDifficulty::Medium,
            status: PlantStatus::Healthy,
            location: "Not set".to_string(),
            notes: None,
            care_requirements: CareRequirements::default(),
            current_stats: PlantStats::default(),
            photos: Vec::new(),
        }
    }
}

/// Partial plant update; `None` leaves the field as it is.
///
/// Optional text fields take `Some(None)` to clear them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlantUpdate {
    pub name: Option<String>,
    pub species: Option<String>,
    pub variety: Option<Option<String>>,
    pub nickname: Option<Option<String>>,
    pub planted_date: Option<String>,
    pub acquired_date: Option<String>,
    pub source: Option<String>,
    pub category: Option<PlantCategory>,
    pub difficulty: Option<PlantDifficulty>,
    pub status: Option<PlantStatus>,
    pub location: Option<String>,
    pub notes: Option<Option<String>>,
    pub care_requirements: Option<CareRequirements>,
    pub current_stats: Option<PlantStats>,
    pub photos: Option<Vec<PlantPhoto>>,
}

impl PlantUpdate {
    pub fn is_empty(&self) -> bool {
        *self == PlantUpdate::default()
    }

    /// Shallow merge: a present field replaces the whole field.
    pub fn apply_to(self, plant: &mut Plant) {
        if let Some(name) = self.name {
            plant.name = name;
        }
        if let Some(species) = self.species {
            plant.species = species;
        }
        if let Some(variety) = self.variety {
            plant.variety = variety;
        }
        if let Some(nickname) = self.nickname {
            plant.nickname = nickname;
        }
        if let Some(planted_date) = self.planted_date {
            plant.planted_date = planted_date;
        }
        if let Some(acquired_date) = self.acquired_date {
            plant.acquired_date = acquired_date;
        }
        if let Some(source) = self.source {
            plant.source = source;
        }
        if let Some(category) = self.category {
            plant.category = category;
        }
        if let Some(difficulty) = self.difficulty {
            plant.difficulty = difficulty;
        }
        if let Some(status) = self.status {
            plant.status = status;
        }
        if let Some(location) = self.location {
            plant.location = location;
        }
        if let Some(notes) = self.notes {
            plant.notes = notes;
        }
        if let Some(care_requirements) = self.care_requirements {
            plant.care_requirements = care_requirements;
        }
        if let Some(current_stats) = self.current_stats {
            plant.current_stats = current_stats;
        }
        if let Some(photos) = self.photos {
            plant.photos = photos;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareRecord {
    pub id: String,
    pub plant_id: String,
    #[serde(rename = "type")]
    pub care_type: CareType,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_photo: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCareRecord {
    pub plant_id: String,
    pub care_type: CareType,
    pub date: String,
    pub notes: Option<String>,
    pub amount: Option<f64>,
    pub unit: Option<String>,
    pub product: Option<String>,
    pub before_photo: Option<String>,
    pub after_photo: Option<String>,
}

impl NewCareRecord {
    pub fn new(plant_id: String, care_type: CareType, date: String) -> Self {
        Self {
            plant_id,
            care_type,
            date,
            notes: None,
            amount: None,
            unit: None,
            product: None,
            before_photo: None,
            after_photo: None,
        }
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn into_record(self, id: String) -> CareRecord {
        CareRecord {
            id,
            plant_id: self.plant_id,
            care_type: self.care_type,
            date: self.date,
            notes: self.notes,
            amount: self.amount,
            unit: self.unit,
            product: self.product,
            before_photo: self.before_photo,
            after_photo: self.after_photo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareReminder {
    pub id: String,
    pub plant_id: String,
    #[serde(rename = "type")]
    pub care_type: CareType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub frequency: u32, // days
    pub next_due: String,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_schedule: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReminder {
    pub plant_id: String,
    pub care_type: CareType,
    pub title: String,
    pub description: Option<String>,
    pub frequency: u32,
    pub next_due: String,
    pub is_active: bool,
    pub custom_schedule: Option<bool>,
}

impl NewReminder {
    pub fn into_reminder(self, id: String) -> CareReminder {
        CareReminder {
            id,
            plant_id: self.plant_id,
            care_type: self.care_type,
            title: self.title,
            description: self.description,
            frequency: self.frequency,
            next_due: self.next_due,
            is_active: self.is_active,
            custom_schedule: self.custom_schedule,
        }
    }
}

/// Partial reminder update; `None` leaves the field as it is and
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderUpdate {
    pub care_type: Option<CareType>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub frequency: Option<u32>,
    pub next_due: Option<String>,
    pub is_active: Option<bool>,
    pub custom_schedule: Option<bool>,
}

impl ReminderUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ReminderUpdate::default()
    }

    pub fn apply_to(self, reminder: &mut CareReminder) {
        if let Some(care_type) = self.care_type {
            reminder.care_type = care_type;
        }
        if let Some(title) = self.title {
            reminder.title = title;
        }
        if let Some(description) = self.description {
            reminder.description = description;
        }
        if let Some(frequency) = self.frequency {
            reminder.frequency = frequency;
        }
        if let Some(next_due) = self.next_due {
            reminder.next_due = next_due;
        }
        if let Some(is_active) = self.is_active {
            reminder.is_active = is_active;
        }
        if let Some(custom_schedule) = self.custom_schedule {
            reminder.custom_schedule = Some(custom_schedule);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPhoto {
    pub uri: String,
    pub date: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub measurements: Option<PhotoMeasurements>,
}

impl NewPhoto {
    pub fn into_photo(self, id: String) -> PlantPhoto {
        PlantPhoto {
            id,
            uri: self.uri,
            date: self.date,
            description: self.description,
            tags: self.tags,
            measurements: self.measurements,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_plants: usize,
    pub healthy_plants: usize,
    pub plants_needing_care: usize,
    pub today_tasks: usize, // includes overdue
    pub overdue_tasks: usize,
    pub recent_activity: Vec<CareRecord>,
}

/// An active reminder joined with its plant, as shown on a task list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CareTask {
    pub id: String,
    pub plant_id: String,
    pub plant_name: String,
    #[serde(rename = "type")]
    pub care_type: CareType,
    pub title: String,
    pub due_date: String,
    pub is_overdue: bool,
    pub priority: TaskPriority,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&PlantStatus::NeedsAttention).unwrap(), "\"needs_attention\"");
        assert_eq!(serde_json::to_string(&CareType::PestControl).unwrap(), "\"pest_control\"");
        assert_eq!("disease_treatment".parse::<CareType>(), Ok(CareType::DiseaseTreatment));
        assert_eq!(" cactus ".parse::<PlantCategory>(), Ok(PlantCategory::Cactus));
        assert_eq!(PlantCategory::ALL.len(), 11);
        assert_eq!(CareType::ALL.len(), 10);
    }

    #[test]
    fn test_unknown_enum_value_lists_choices() {
        let err = "thirsty".parse::<PlantStatus>().unwrap_err();
        assert!(err.contains("thirsty"));
        assert!(err.contains("needs_attention"));
    }

    #[test]
    fn test_record_care_sets_matching_stat() {
        let mut stats = PlantStats::default();
        assert!(stats.record_care(CareType::Pruning, "2024-05-01"));
        assert_eq!(stats.last_pruned.as_deref(), Some("2024-05-01"));

        assert!(stats.record_care(CareType::Repotting, "2024-05-02"));
        assert_eq!(stats.last_repotted.as_deref(), Some("2024-05-02"));
    }

    #[test]
    fn test_record_care_ignores_untracked_types() {
        let mut stats = PlantStats::default();
        for care_type in [CareType::Photo, CareType::Measurement, CareType::PestControl, CareType::Other] {
            assert!(!stats.record_care(care_type, "2024-05-01"));
        }
        assert_eq!(stats, PlantStats::default());
    }

    #[test]
    fn test_plant_json_uses_camel_case() {
        let plant = Plant::from_new(
            "p1".to_string(),
            "2024-01-01T00:00:00.000Z".to_string(),
            NewPlant::new("Pothos".to_string(), "Epipremnum aureum".to_string()),
        );
        let json = serde_json::to_value(&plant).unwrap();
        assert_eq!(json["careRequirements"]["wateringFrequency"], 7);
        assert_eq!(json["currentStats"]["healthScore"], 8);
        assert_eq!(json["createdAt"], json["updatedAt"]);
        assert!(json["currentStats"].get("lastWatered").is_none());
    }

    #[test]
    fn test_empty_stat_dates_read_as_absent() {
        let json = r#"{
            "height": 12, "leafCount": 4, "healthScore": 7,
            "lastWatered": "", "lastFertilized": "2024-12-01",
            "isFlowering": false, "hasFruit": true
        }"#;
        let stats: PlantStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.last_watered, None);
        assert_eq!(stats.last_fertilized.as_deref(), Some("2024-12-01"));
        assert_eq!(stats.last_pruned, None);
        assert!(stats.has_fruit);
    }

    #[test]
    fn test_care_record_type_field() {
        let record = NewCareRecord::new("p1".to_string(), CareType::Watering, "2024-12-21".to_string())
            .with_notes("regular watering")
            .into_record("r1".to_string());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "watering");
        assert_eq!(json["plantId"], "p1");
        assert!(json.get("amount").is_none());
    }

    #[test]
    fn test_plant_update_is_shallow_merge() {
        let mut plant = Plant::from_new(
            "p1".to_string(),
            "2024-01-01T00:00:00.000Z".to_string(),
            NewPlant::new("Mint".to_string(), "Mentha spicata".to_string()),
        );
        let update = PlantUpdate {
            status: Some(PlantStatus::Sick),
            location: Some("Kitchen".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply_to(&mut plant);

        assert_eq!(plant.status, PlantStatus::Sick);
        assert_eq!(plant.location, "Kitchen");
        assert_eq!(plant.name, "Mint");
        assert!(PlantUpdate::default().is_empty());
    }

    #[test]
    fn test_plant_update_sets_and_clears_optional_text() {
        let mut new = NewPlant::new("Pothos".to_string(), "Epipremnum aureum".to_string());
        new.nickname = Some("Goldie".to_string());
        new.notes = Some("Repot in spring".to_string());
        let mut plant = Plant::from_new("p1".to_string(), "2024-01-01T00:00:00.000Z".to_string(), new);

        PlantUpdate {
            variety: Some(Some("Marble Queen".to_string())),
            nickname: Some(None),
            ..Default::default()
        }
        .apply_to(&mut plant);

        assert_eq!(plant.variety.as_deref(), Some("Marble Queen"));
        assert_eq!(plant.nickname, None);
        assert_eq!(plant.notes.as_deref(), Some("Repot in spring"));

        let json = serde_json::to_value(&plant).unwrap();
        assert!(json.get("nickname").is_none());
    }

    #[test]
    fn test_reminder_update_merges_fields() {
        let mut reminder = NewReminder {
            plant_id: "p1".to_string(),
            care_type: CareType::Watering,
            title: "Water".to_string(),
            description: None,
            frequency: 7,
            next_due: "2024-12-28".to_string(),
            is_active: true,
            custom_schedule: None,
        }
        .into_reminder("m1".to_string());

        ReminderUpdate {
            is_active: Some(false),
            frequency: Some(10),
            description: Some(Some("Bottom water".to_string())),
            ..Default::default()
        }
        .apply_to(&mut reminder);

        assert!(!reminder.is_active);
        assert_eq!(reminder.frequency, 10);
        assert_eq!(reminder.title, "Water");
        assert_eq!(reminder.description.as_deref(), Some("Bottom water"));

        ReminderUpdate {
            description: Some(None),
            ..Default::default()
        }
        .apply_to(&mut reminder);
        assert_eq!(reminder.description, None);
        assert_eq!(reminder.frequency, 10);
    }
}
