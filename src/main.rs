// Command-line entry point for tokenscope.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tokenscope::api::server::{start_server, ServerContext};
use tokenscope::application::{AuditRequest, AuditUsecase};
use tokenscope::domain::store::{DiskVariableStore, VariableStore};
use tokenscope::domain::walker::ScanMode;
use tokenscope::infrastructure::concurrency::init_thread_pool;
use tokenscope::infrastructure::config::Config;
use tokenscope::infrastructure::{JsonReportSink, Snapshot, TextReportSink};
use tokenscope::ports::ReportSink;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./tokenscope.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Document snapshot exported by the host
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Resolve variables from a sled store instead of the snapshot
    #[arg(long)]
    store_db: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List variable collections
    Collections {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Find unused variables of a collection on the current page
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Collection id
        #[arg(short, long)]
        collection: String,

        /// Also list every variable of the collection in structural order
        #[arg(long)]
        all: bool,

        /// Scan top-level nodes on the worker pool
        #[arg(long)]
        parallel: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Check the selection for broken variable bindings
    Check {
        #[command(flatten)]
        input: InputArgs,

        /// Node ids to check instead of the snapshot selection
        #[arg(long = "select", value_delimiter = ',')]
        select: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Persist the snapshot's variable catalog into a sled store
    Import {
        #[arg(short, long)]
        snapshot: PathBuf,

        #[arg(long)]
        db: PathBuf,
    },
    /// Serve audit requests as line-delimited JSON over TCP
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        /// Snapshot used when a request does not name one
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn execute(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Collections { input } => {
            let snapshot = Snapshot::load(&input.snapshot)?;
            let store = open_store(&input, &snapshot)?;
            for collection in store.list_collections().await? {
                println!("{}\t{}", collection.id, collection.name);
            }
            Ok(())
        }
        Command::Analyze {
            input,
            collection,
            all,
            parallel,
            output,
        } => {
            let scan_mode = if parallel { ScanMode::Parallel } else { config.scan.mode };
            if scan_mode == ScanMode::Parallel {
                init_thread_pool(config.scan.workers)?;
            }
            let request = AuditRequest::AnalyzeCollection {
                collection_id: collection,
                include_all: all,
            };
            run_and_publish(&config, &input, Vec::new(), scan_mode, request, &output).await
        }
        Command::Check { input, select, output } => {
            let scan_mode = config.scan.mode;
            run_and_publish(&config, &input, select, scan_mode, AuditRequest::CheckBrokenVariables, &output).await
        }
        Command::Import { snapshot, db } => {
            let loaded = Snapshot::load(&snapshot)?;
            let store = DiskVariableStore::new(&db.to_string_lossy())?;
            store
                .import(&loaded.records)
                .with_context(|| format!("Failed to import into {}", db.display()))?;
            info!(
                variables = loaded.records.variables.len(),
                collections = loaded.records.collections.len(),
                db = %db.display(),
                "variable catalog imported"
            );
            Ok(())
        }
        Command::Serve { port, snapshot } => {
            let port = port.unwrap_or(config.server.port);
            start_server(
                port,
                ServerContext {
                    config,
                    default_snapshot: snapshot,
                },
            )
            .await
        }
    }
}

fn open_store(input: &InputArgs, snapshot: &Snapshot) -> Result<Box<dyn VariableStore>> {
    match &input.store_db {
        Some(db) => Ok(Box::new(DiskVariableStore::new(&db.to_string_lossy())?)),
        None => Ok(Box::new(snapshot.memory_store())),
    }
}

async fn run_and_publish(
    config: &Config,
    input: &InputArgs,
    selection: Vec<String>,
    scan_mode: ScanMode,
    request: AuditRequest,
    output: &OutputArgs,
) -> Result<()> {
    let mut snapshot = Snapshot::load(&input.snapshot)?;
    if !selection.is_empty() {
        snapshot.document.select(selection);
    }

    let store = open_store(input, &snapshot)?;
    let policy = config.usage_policy();
    let usecase = AuditUsecase {
        document: &snapshot.document,
        store: store.as_ref(),
        policy: &policy,
        scan_mode,
    };

    let outcome = usecase.run(&request).await?;

    let sink: Box<dyn ReportSink> = match output.format {
        Format::Text => Box::new(TextReportSink {
            output: output.output.clone(),
        }),
        Format::Json => Box::new(JsonReportSink {
            output: output.output.clone(),
        }),
    };
    sink.publish(&outcome)
}
