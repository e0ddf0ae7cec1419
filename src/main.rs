use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::Parser;
use signature_archiver::{
    archive::{self, ArchiveWorkflow},
    config::{ArchiverConfig, DatabaseConfig},
    db::{ArchiveStores, DatabaseRole, DbPool, ProcessingStores},
    observability,
};
use uuid::Uuid;

/// CLI arguments for the signature archiver
#[derive(Parser, Debug)]
#[command(version, about = "Signature archive workflow", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file
    #[arg(short, long, global = true, default_value = "archiver.toml")]
    config: PathBuf,

    /// Server name recorded on each run (defaults to the system hostname)
    #[arg(long, global = true)]
    server_name: Option<String>,

    /// Worker name recorded on each run
    #[arg(long, global = true, default_value = "archiver")]
    worker_name: String,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the archive workflow once and exit
    ///
    /// Exits 0 when the run succeeded or was skipped because another worker
    /// holds the lease, 1 otherwise. The run summary is printed as JSON.
    Run {
        /// Only count eligible records, change nothing
        #[arg(long)]
        dry_run: bool,
        /// Print Prometheus metrics after the run
        #[arg(long)]
        print_metrics: bool,
    },
    /// Run the archive workflow on the configured interval until interrupted
    Worker,
    /// Run database migrations on both databases and exit
    ///
    /// Useful for Kubernetes init containers or CI/CD pipelines.
    Migrate,
    /// Print the watermark the next run would use
    Watermark,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let server_name = args.server_name.clone().unwrap_or_else(|| {
        hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string())
    });

    let mut config = load_config(&args.config);
    if let Command::Run { dry_run: true, .. } = args.command {
        config.archive.dry_run = true;
    }

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Error: Failed to initialize tracing: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = observability::metrics::init_metrics(&config.observability.metrics) {
        tracing::warn!(error = %e, "Failed to initialize metrics, continuing without them");
    }

    tracing::info!(
        config_file = %args.config.display(),
        server = %server_name,
        worker = %args.worker_name,
        "Signature archiver starting"
    );

    match args.command {
        Command::Migrate => run_migrate(&config).await,
        Command::Run { print_metrics, .. } => {
            let workflow = build_workflow(&config).await;
            run_once(&workflow, &server_name, &args.worker_name, print_metrics).await;
        }
        Command::Worker => {
            let workflow = Arc::new(build_workflow(&config).await);
            run_worker(workflow, server_name, args.worker_name).await;
        }
        Command::Watermark => {
            let workflow = build_workflow(&config).await;
            match workflow.current_watermark().await {
                Ok(watermark) => println!("{}", watermark.to_rfc3339()),
                Err(e) => {
                    eprintln!("Error: Failed to compute watermark: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn load_config(path: &Path) -> ArchiverConfig {
    match ArchiverConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

/// Connect to one database, running migrations if asked to.
async fn connect(
    config: &DatabaseConfig,
    role: DatabaseRole,
    migrate: bool,
) -> DbPool {
    let pool = match DbPool::from_config(config, role).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, database = role.as_str(), "Failed to connect to database");
            eprintln!("Error: Failed to connect to {} database: {}", role.as_str(), e);
            std::process::exit(1);
        }
    };

    if migrate {
        if let Err(e) = pool.run_migrations().await {
            tracing::error!(error = %e, database = role.as_str(), "Database migrations failed");
            eprintln!("Error: {} database migrations failed: {}", role.as_str(), e);
            std::process::exit(1);
        }
        tracing::info!(database = role.as_str(), "Database migrations completed");
    }

    pool
}

async fn build_workflow(config: &ArchiverConfig) -> ArchiveWorkflow {
    let processing = connect(
        &config.processing_database,
        DatabaseRole::Processing,
        config.processing_database.run_migrations(),
    )
    .await;
    let archive = connect(
        &config.archive_database,
        DatabaseRole::Archive,
        config.archive_database.run_migrations(),
    )
    .await;

    ArchiveWorkflow::new(
        &ProcessingStores::from_pool(&processing),
        &ArchiveStores::from_pool(&archive),
        config.archive.clone(),
    )
}

async fn run_migrate(config: &ArchiverConfig) {
    connect(&config.processing_database, DatabaseRole::Processing, true).await;
    connect(&config.archive_database, DatabaseRole::Archive, true).await;
    tracing::info!("Database migrations completed successfully");
}

async fn run_once(
    workflow: &ArchiveWorkflow,
    server_name: &str,
    worker_name: &str,
    print_metrics: bool,
) {
    let outcome = workflow
        .execute(Uuid::new_v4(), server_name, worker_name)
        .await;

    if print_metrics && let Some(rendered) = observability::metrics::render_metrics() {
        print!("{}", rendered);
    }

    match outcome {
        Ok(result) => {
            match serde_json::to_string_pretty(&result) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize run summary"),
            }
        }
        Err(e) => {
            eprintln!("Error: Archive run failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_worker(workflow: Arc<ArchiveWorkflow>, server_name: String, worker_name: String) {
    let worker = tokio::spawn(archive::start_archive_worker(
        workflow,
        server_name,
        worker_name,
    ));

    shutdown_signal().await;
    // An interrupted run is picked up again by the next start.
    worker.abort();
    tracing::info!("Archive worker stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
