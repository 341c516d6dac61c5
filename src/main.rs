use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use taskrem::alarm::ThreadAlarmPlatform;
use taskrem::cli::{Cli, Commands};
use taskrem::delivery::AlertSound;
use taskrem::notify::{CommandSound, DesktopNotifier, Silent};
use taskrem::{
    AlarmScheduler, Config, Database, DeliveryHandler, Profile, ReminderService, ReminderStore,
};

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_path(&PathBuf::from(path))?,
        None => Config::load_with_profile(profile)?,
    };

    taskrem::logging::init_logging(&config.get_log_path(), &config.log_level)?;
    tracing::info!(?profile, "taskrem starting");

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| eyre!("Database path contains invalid UTF-8"))?,
    )?;
    let service = ReminderService::new(Arc::new(ReminderStore::new(db)));

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => run_tui(config, service)?,
        Commands::Add { title, description, at, recurring } => {
            taskrem::cli::handle_add(title, description, at, recurring, &service)?;
        }
        Commands::List => {
            taskrem::cli::handle_list(&service, &config.time_format)?;
        }
        Commands::Delete { at } => {
            taskrem::cli::handle_delete(at, &service)?;
        }
    }

    Ok(())
}

/// Composition root for the interactive session: every long-lived component
/// is built here once and handed to the app.
fn run_tui(config: Config, service: ReminderService) -> Result<()> {
    let (intent_tx, intent_rx) = mpsc::channel();

    let platform = Arc::new(ThreadAlarmPlatform::start(config.exact_alarms, intent_tx.clone())?);
    let scheduler = Arc::new(AlarmScheduler::new(platform, config.repeat_interval()));

    let sound: Box<dyn AlertSound> = if !config.sound_enabled {
        Box::new(Silent)
    } else if let Some(ref file) = config.sound_file {
        Box::new(CommandSound::with_file(taskrem::utils::expand_path(file)))
    } else {
        Box::new(CommandSound::system_default())
    };
    let notifier = DesktopNotifier::new(config.notifications_enabled, intent_tx);
    let delivery = DeliveryHandler::new(service.clone(), Arc::clone(&scheduler), Box::new(notifier), sound);

    let app = taskrem::tui::App::new(config, service, scheduler, delivery, intent_rx)?;
    taskrem::tui::run_event_loop(app)?;

    tracing::info!("taskrem exiting");
    Ok(())
}
