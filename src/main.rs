use clap::Parser;
use color_eyre::Result;
use plant_care::{
    Config, Database, PlantStore, Profile,
    cli::{self, Cli, Commands},
    seed,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // --dev selects a separate config and database
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_path(&plant_care::utils::expand_path(path))?,
        None => Config::load_with_profile(profile)?,
    };

    // RUST_LOG overrides the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .init();

    let db_path = config.get_database_path();
    log::debug!("Using database {}", db_path.display());
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?,
    )?;
    let store = PlantStore::open(Arc::new(db)).await;

    // `seed` and `reset` decide for themselves
    let explicit_data_command = matches!(cli.command, Some(Commands::Seed) | Some(Commands::Reset { .. }));
    if config.seed_sample_data && !explicit_data_command {
        seed::seed_sample_data(&store).await?;
    }

    match cli.command {
        None | Some(Commands::Dashboard) => cli::handle_dashboard(&store)?,
        Some(Commands::Add(args)) => cli::handle_add(args, &store).await?,
        Some(Commands::List { search, category }) => cli::handle_list(search, category, &store)?,
        Some(Commands::Show { id }) => cli::handle_show(&id, &store)?,
        Some(Commands::Update(args)) => cli::handle_update(args, &store).await?,
        Some(Commands::Delete { id }) => cli::handle_delete(&id, &store).await?,
        Some(Commands::Care(args)) => cli::handle_care(args, &store).await?,
        Some(Commands::Photo(args)) => cli::handle_photo(args, &store).await?,
        Some(Commands::Remind(args)) => cli::handle_remind(args, &store).await?,
        Some(Commands::Reminder(args)) => cli::handle_reminder(args, &store).await?,
        Some(Commands::Tasks { date }) => cli::handle_tasks(date, &store)?,
        Some(Commands::Seed) => cli::handle_seed(&store).await?,
        Some(Commands::Reset { yes }) => cli::handle_reset(yes, &store).await?,
    }

    Ok(())
}
