//! Command-line front end for taskdeck.
//!
//! # Responsibility
//! - Map commands onto task store operations and render the resulting state.
//! - Keep all business rules in `taskdeck_core`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use taskdeck_core::{
    core_version, init_from_config, AppConfig, HttpMovieCatalog, HttpTaskRepository, MovieCatalog,
    SessionHandle, SqliteStatePersistence, StoreState, TaskId, TaskStore,
};

const DEFAULT_COLLECTION_ID: u64 = 10;

#[derive(Debug, Parser)]
#[command(name = "taskdeck", version, about = "Personal task manager and movie browser")]
struct Cli {
    /// TOML config file; `TASKDECK_*` variables override its values.
    #[arg(long, env = "TASKDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Task backend base URL.
    #[arg(long)]
    api_url: Option<String>,

    /// Local state database.
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show cached tasks without contacting the backend.
    List,
    /// Fetch all tasks from the backend.
    Sync,
    /// Create a task.
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Flip the completion flag of a task.
    Toggle { id: String },
    /// Delete one task.
    Rm { id: String },
    /// Delete several tasks at once.
    RmMany {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
    /// List the movies of one collection.
    Movies {
        #[arg(long, default_value_t = DEFAULT_COLLECTION_ID)]
        collection: u64,
    },
    /// Print the core version.
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(api_url) = cli.api_url {
        config.api_base_url = api_url;
    }
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    config.validate().context("invalid config")?;
    init_from_config(&config).context("failed to initialize logging")?;

    match cli.command {
        Command::Version => {
            println!("taskdeck_core version={}", core_version());
            Ok(())
        }
        Command::Movies { collection } => show_movies(&config, collection).await,
        command => run_task_command(&config, command).await,
    }
}

async fn run_task_command(config: &AppConfig, command: Command) -> Result<()> {
    let session = match config.session() {
        Some(session) => SessionHandle::signed_in(session),
        None => SessionHandle::anonymous(),
    };
    let repo = HttpTaskRepository::new(config.task_client(session)?);
    let storage = SqliteStatePersistence::open(&config.db_path)
        .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
    let store = TaskStore::with_persistence(repo, Arc::new(storage));
    info!("event=cli_command module=cli status=start command={command:?}");

    match command {
        Command::List => {}
        Command::Sync => store.fetch_all().await,
        Command::Add { title } => store.add(&title.join(" ")).await,
        Command::Toggle { id } => store.toggle(&TaskId::from(id)).await,
        Command::Rm { id } => store.remove(&TaskId::from(id)).await,
        Command::RmMany { ids } => {
            let ids: Vec<TaskId> = ids.into_iter().map(TaskId::from).collect();
            store.remove_many(&ids).await;
        }
        Command::Movies { .. } | Command::Version => bail!("`{command:?}` is not a task command"),
    }

    let state = store.snapshot();
    render_tasks(&state);
    if let Some(message) = state.error {
        bail!(message);
    }
    Ok(())
}

fn render_tasks(state: &StoreState) {
    println!(
        "Total Tasks: {} ({} completed)",
        state.tasks.len(),
        state.completed_count()
    );
    for task in &state.tasks {
        let mark = if task.completed { "x" } else { " " };
        println!("[{mark}] {:<8} {}", task.id.as_str(), task.title);
    }
}

async fn show_movies(config: &AppConfig, collection_id: u64) -> Result<()> {
    let catalog = HttpMovieCatalog::new(config.movie_client()?);
    let collection = catalog
        .collection(collection_id)
        .await
        .with_context(|| format!("failed to load movie collection {collection_id}"))?;

    if let Some(name) = collection.name.as_deref() {
        println!("{name}");
    }
    for movie in &collection.parts {
        println!("{} - {}", movie.id, movie.title);
        if !movie.overview.is_empty() {
            println!("    {}", movie.overview);
        }
        if let Some(url) = movie.poster_url() {
            println!("    poster: {url}");
        }
    }
    Ok(())
}
