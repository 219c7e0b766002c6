use crate::models::{
    CareRequirements, CareType, LightRequirement, NewCareRecord, NewPlant, PlantCategory,
    PlantDifficulty, PlantStats, ValueRange,
};
use crate::store::{PlantStore, StoreError};

fn sample_plants() -> Vec<NewPlant> {
    let mut pothos = NewPlant::new("Golden Pothos".to_string(), "Epipremnum aureum".to_string());
    pothos.variety = Some("Common".to_string());
    pothos.nickname = Some("Goldie".to_string());
    pothos.planted_date = "2024-01-15".to_string();
    pothos.acquired_date = "2024-01-15".to_string();
    pothos.source = "Flower shop".to_string();
    pothos.category = PlantCategory::Foliage;
    pothos.difficulty = PlantDifficulty::Easy;
    pothos.location = "Living room windowsill".to_string();
    pothos.notes = Some("Growing fast, leaves are a deep green".to_string());
    pothos.care_requirements = CareRequirements {
        watering_frequency: 7,
        fertilizing_frequency: 30,
        light_requirement: LightRequirement::Indirect,
        temperature_range: ValueRange { min: 18.0, max: 25.0 },
        humidity_range: ValueRange { min: 40.0, max: 60.0 },
        soil_type: "All-purpose potting mix".to_string(),
        pot_size: "Medium".to_string(),
    };
    pothos.current_stats = PlantStats {
        height: 25.0,
        leaf_count: 15,
        health_score: 9,
        last_watered: Some("2024-12-20".to_string()),
        last_fertilized: Some("2024-12-01".to_string()),
        ..Default::default()
    };

    let mut haworthia = NewPlant::new("Haworthia".to_string(), "Haworthia cooperi".to_string());
    haworthia.planted_date = "2024-02-01".to_string();
    haworthia.acquired_date = "2024-02-01".to_string();
    haworthia.source = "Gift from a friend".to_string();
    haworthia.category = PlantCategory::Succulent;
    haworthia.difficulty = PlantDifficulty::Easy;
    haworthia.location = "Balcony".to_string();
    haworthia.care_requirements = CareRequirements {
        watering_frequency: 14,
        fertilizing_frequency: 60,
        light_requirement: LightRequirement::High,
        temperature_range: ValueRange { min: 15.0, max: 30.0 },
        humidity_range: ValueRange { min: 30.0, max: 50.0 },
        soil_type: "Succulent mix".to_string(),
        pot_size: "Small".to_string(),
    };
    haworthia.current_stats = PlantStats {
        height: 8.0,
        leaf_count: 20,
        health_score: 8,
        last_watered: Some("2024-12-15".to_string()),
        last_fertilized: Some("2024-11-15".to_string()),
        ..Default::default()
    };

    let mut mint = NewPlant::new("Spearmint".to_string(), "Mentha spicata".to_string());
    mint.planted_date = "2024-03-10".to_string();
    mint.acquired_date = "2024-03-10".to_string();
    mint.source = "Grown from seed".to_string();
    mint.category = PlantCategory::Herb;
    mint.difficulty = PlantDifficulty::Easy;
    mint.location = "Kitchen windowsill".to_string();
    mint.notes = Some("Good for tea".to_string());
    mint.care_requirements = CareRequirements {
        watering_frequency: 3,
        fertilizing_frequency: 21,
        light_requirement: LightRequirement::Medium,
        temperature_range: ValueRange { min: 16.0, max: 24.0 },
        humidity_range: ValueRange { min: 50.0, max: 70.0 },
        soil_type: "Loose potting mix".to_string(),
        pot_size: "Medium".to_string(),
    };
    mint.current_stats = PlantStats {
        height: 15.0,
        leaf_count: 30,
        health_score: 9,
        last_watered: Some("2024-12-21".to_string()),
        last_fertilized: Some("2024-12-10".to_string()),
        ..Default::default()
    };

    vec![pothos, haworthia, mint]
}

/// Populate an empty store with three sample plants and their care logs.
///
/// Does nothing if any plant exists, so it is safe to call on every start.
/// Returns how many plants were created.
pub async fn seed_sample_data(store: &PlantStore) -> Result<usize, StoreError> {
    if !store.plants().is_empty() {
        return Ok(0);
    }

    log::info!("Creating sample plant data");
    let samples = sample_plants();
    let count = samples.len();

    for sample in samples {
        let plant = store.add_plant(sample).await?;

        store
            .add_care_record(
                NewCareRecord::new(plant.id.clone(), CareType::Watering, "2024-12-21".to_string())
                    .with_notes("Regular watering"),
            )
            .await?;
        store
            .add_care_record(
                NewCareRecord::new(plant.id.clone(), CareType::Fertilizing, "2024-12-01".to_string())
                    .with_notes("Liquid fertilizer"),
            )
            .await?;
    }

    log::info!("Sample data created ({} plants)", count);
    Ok(count)
}
