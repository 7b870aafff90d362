//! minicron - a small cron job scheduler.
//!
//! Usage:
//!   minicron run                   Schedule every stored job and run until Ctrl+C
//!   minicron add <name> <command> <schedule>   Register a new job
//!   minicron list                  List stored jobs with next occurrences
//!   minicron edit <id> [..]        Change a job's fields
//!   minicron remove <id>           Delete a job
//!   minicron validate <schedule>   Check an expression and print upcoming fires

use clap::{Parser, Subcommand};
use minicron::{
    Config, ExecutionRunner, Job, JobId, JobStore, JsonJobStore, LogNotifier, NewJob, Notifier,
    Schedule, SchedulerRegistry, ShellExecutor, TelegramNotifier,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// minicron - a small cron job scheduler
#[derive(Parser)]
#[command(name = "minicron")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON job store file (overrides MINICRON_STORE)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule every stored job and run until Ctrl+C
    Run,

    /// Register a new job
    Add {
        /// Job name
        name: String,
        /// Shell command to run
        command: String,
        /// Cron expression (5-field, or 6-field with seconds)
        schedule: String,
        /// Notify on this job's outcomes
        #[arg(short, long)]
        notify: bool,
    },

    /// List stored jobs
    List,

    /// Change fields of an existing job
    Edit {
        /// Job id
        id: u64,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New shell command
        #[arg(long)]
        command: Option<String>,
        /// New cron expression
        #[arg(long)]
        schedule: Option<String>,
        /// Turn outcome notifications on or off
        #[arg(long)]
        notify: Option<bool>,
    },

    /// Delete a job by id
    Remove {
        /// Job id
        id: u64,
    },

    /// Validate a cron expression and print its next occurrences
    Validate {
        /// Cron expression
        expression: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(path) = cli.store {
        config = config.with_store_path(path);
    }

    match cli.command {
        Commands::Run => run_scheduler(config).await?,
        Commands::Add {
            name,
            command,
            schedule,
            notify,
        } => add_job(&config, name, command, schedule, notify).await?,
        Commands::List => list_jobs(&config).await?,
        Commands::Edit {
            id,
            name,
            command,
            schedule,
            notify,
        } => edit_job(&config, id, name, command, schedule, notify).await?,
        Commands::Remove { id } => remove_job(&config, id).await?,
        Commands::Validate { expression } => validate_expression(&expression)?,
    }

    Ok(())
}

fn build_notifier(config: &Config) -> Arc<dyn Notifier> {
    match &config.telegram {
        Some(telegram) => {
            info!("notifying via Telegram chat {}", telegram.chat_id);
            Arc::new(TelegramNotifier::new(&telegram.bot_token, telegram.chat_id))
        }
        None => {
            info!("no Telegram credentials configured, notifications go to the log");
            Arc::new(LogNotifier)
        }
    }
}

/// Schedule everything in the store and run until Ctrl+C.
async fn run_scheduler(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("job store: {}", config.store_path.display());

    let store = Arc::new(JsonJobStore::new(&config.store_path));
    let notifier = build_notifier(&config);
    let runner = ExecutionRunner::new(Arc::clone(&store), Arc::new(ShellExecutor::new()), notifier)
        .with_notify_timeout(config.notify_timeout);
    let registry = SchedulerRegistry::new(Arc::clone(&store), runner);

    let armed = registry.schedule_all().await?;
    if armed == 0 {
        info!("no schedulable jobs in the store");
    } else {
        info!("{} job(s) scheduled", armed);
    }
    info!("press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    info!("shutting down");
    registry.shutdown().await;
    Ok(())
}

/// Validate and register a new job.
async fn add_job(
    config: &Config,
    name: String,
    command: String,
    schedule: String,
    notify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let new = NewJob::new(name, command, schedule)?.with_notification(notify);

    let store = JsonJobStore::new(&config.store_path);
    let job = store.create_job(new).await?;

    println!("Added job {}: {}", job.id, job.name);
    if let Ok(schedule) = job.parsed_schedule() {
        if let Ok(next) = schedule.next() {
            println!("  next occurrence: {}", next);
        }
    }
    Ok(())
}

/// Apply field changes to an existing job.
///
/// A running scheduler reloads the record at each fire, so name, command,
/// and notification changes take effect at the next occurrence. A schedule
/// change needs the scheduler restarted (or the job rescheduled).
async fn edit_job(
    config: &Config,
    id: u64,
    name: Option<String>,
    command: Option<String>,
    schedule: Option<String>,
    notify: Option<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonJobStore::new(&config.store_path);
    let job = store.load_job(JobId::new(id)).await?;

    let schedule_changed = schedule.is_some();
    let updated = NewJob::new(
        name.unwrap_or(job.name),
        command.unwrap_or(job.command),
        schedule.unwrap_or(job.schedule),
    )?
    .with_notification(notify.unwrap_or(job.email_notification));

    let mut replacement = Job::from_new(job.id, updated);
    replacement.status = job.status;
    store.save_job(replacement.clone()).await?;

    println!("Updated job {}: {}", replacement.id, replacement.name);
    if schedule_changed {
        if let Ok(schedule) = replacement.parsed_schedule() {
            if let Ok(next) = schedule.next() {
                println!("  next occurrence: {}", next);
            }
        }
        println!("  restart a running scheduler to apply the new schedule");
    }
    Ok(())
}

/// Print stored jobs with status and next occurrences.
async fn list_jobs(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonJobStore::new(&config.store_path);
    let jobs = store.load_all().await?;

    if jobs.is_empty() {
        println!("No jobs in {}", config.store_path.display());
        return Ok(());
    }

    for job in &jobs {
        println!("{}: {} [{}]", job.id, job.name, job.status);
        println!("  command:  {}", job.command);
        println!("  schedule: {}", job.schedule);
        println!("  notify:   {}", job.email_notification);
        match job.parsed_schedule().and_then(|s| s.next()) {
            Ok(next) => println!("  next:     {}", next),
            Err(e) => println!("  next:     unavailable ({})", e),
        }
    }
    Ok(())
}

/// Delete a job from the store.
async fn remove_job(config: &Config, id: u64) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonJobStore::new(&config.store_path);
    store.delete_job(JobId::new(id)).await?;
    println!("Removed job {}", id);
    Ok(())
}

/// Parse an expression and show its next few occurrences.
fn validate_expression(expression: &str) -> Result<(), Box<dyn std::error::Error>> {
    let schedule = Schedule::parse(expression)?;

    println!("OK: {}", schedule.expression());
    for next in schedule.next_n_after(chrono::Utc::now(), 3) {
        println!("  {}", next);
    }
    Ok(())
}
