use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::api::dto::{AuditResultDto, CollectionDto};
use crate::application::{AuditRequest, AuditUsecase};
use crate::infrastructure::config::Config;
use crate::infrastructure::Snapshot;

#[derive(Debug, Deserialize)]
struct CommandReq {
    command: String,
    params: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct SnapshotParams {
    snapshot: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeParams {
    collection_id: String,
    #[serde(default)]
    include_all: bool,
    snapshot: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct CheckParams {
    selection: Option<Vec<String>>,
    snapshot: Option<PathBuf>,
}

enum Reply {
    Data(serde_json::Value),
    Shutdown,
}

/// Settings shared by all connections.
#[derive(Debug, Clone, Default)]
pub struct ServerContext {
    pub config: Config,
    /// Snapshot used when a request does not name one.
    pub default_snapshot: Option<PathBuf>,
}

pub struct Server {
    listener: TcpListener,
    context: Arc<ServerContext>,
    shutdown: Arc<Notify>,
}

impl Server {
    pub async fn bind(port: u16, context: ServerContext) -> Result<Self> {
        let address = format!("127.0.0.1:{}", port);
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind to {}", address))?;

        Ok(Self {
            listener,
            context: Arc::new(context),
            shutdown: Arc::new(Notify::new()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until a client sends `SHUTDOWN`.
    pub async fn run(self) -> Result<()> {
        let address = self.local_addr()?;
        info!(%address, "API server listening");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let context = Arc::clone(&self.context);
                        let shutdown = Arc::clone(&self.shutdown);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, context, shutdown).await {
                                warn!(%peer, error = %e, "connection error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "accept error"),
                },
                _ = self.shutdown.notified() => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        Ok(())
    }
}

pub async fn start_server(port: u16, context: ServerContext) -> Result<()> {
    Server::bind(port, context).await?.run().await
}

async fn handle_connection(stream: TcpStream, context: Arc<ServerContext>, shutdown: Arc<Notify>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (response, stop) = match process_command(trimmed, &context).await {
            Ok(Reply::Data(data)) => (json!({ "status": "success", "data": data }), false),
            Ok(Reply::Shutdown) => (json!({ "status": "success", "data": "Shutting down..." }), true),
            Err(e) => (json!({ "status": "error", "message": format!("{:#}", e) }), false),
        };

        let mut response_str = serde_json::to_string(&response)?;
        response_str.push('\n');
        writer.write_all(response_str.as_bytes()).await?;

        if stop {
            // notify_one keeps a permit if the accept loop is not waiting yet.
            shutdown.notify_one();
            break;
        }
    }
    Ok(())
}

async fn process_command(json_str: &str, context: &ServerContext) -> Result<Reply> {
    let req: CommandReq = serde_json::from_str(json_str).context("Invalid JSON format")?;

    match req.command.as_str() {
        "PING" => Ok(Reply::Data(json!("PONG"))),
        "LIST_COLLECTIONS" => {
            let params: SnapshotParams = parse_params(req.params, "LIST_COLLECTIONS")?;
            let snapshot = load_snapshot(context, params.snapshot).await?;
            let store = snapshot.memory_store();
            let policy = context.config.usage_policy();
            let usecase = AuditUsecase {
                document: &snapshot.document,
                store: &store,
                policy: &policy,
                scan_mode: context.config.scan.mode,
            };
            let collections: Vec<CollectionDto> =
                usecase.list_collections().await?.iter().map(CollectionDto::from).collect();
            Ok(Reply::Data(serde_json::to_value(collections)?))
        }
        "ANALYZE_COLLECTION" => {
            let params: AnalyzeParams = parse_params(req.params, "ANALYZE_COLLECTION")?;
            let snapshot = load_snapshot(context, params.snapshot).await?;
            let request = AuditRequest::AnalyzeCollection {
                collection_id: params.collection_id,
                include_all: params.include_all,
            };
            run_request(context, snapshot, request).await.map(Reply::Data)
        }
        "CHECK_BROKEN" => {
            let params: CheckParams = parse_params(req.params, "CHECK_BROKEN")?;
            let mut snapshot = load_snapshot(context, params.snapshot).await?;
            if let Some(selection) = params.selection {
                snapshot.document.select(selection);
            }
            run_request(context, snapshot, AuditRequest::CheckBrokenVariables)
                .await
                .map(Reply::Data)
        }
        "SHUTDOWN" => Ok(Reply::Shutdown),
        _ => anyhow::bail!("Unknown command: {}", req.command),
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<serde_json::Value>, command: &str) -> Result<T> {
    let value = params.unwrap_or_else(|| json!({}));
    serde_json::from_value(value).with_context(|| format!("Invalid params for {}", command))
}

/// Read and parse the snapshot on the blocking pool.
async fn load_snapshot(context: &ServerContext, requested: Option<PathBuf>) -> Result<Snapshot> {
    let path = requested
        .or_else(|| context.default_snapshot.clone())
        .ok_or_else(|| anyhow::anyhow!("Missing 'snapshot' param and no default snapshot configured"))?;
    tokio::task::spawn_blocking(move || Snapshot::load(&path))
        .await
        .context("Snapshot loader task failed")?
}

async fn run_request(context: &ServerContext, snapshot: Snapshot, request: AuditRequest) -> Result<serde_json::Value> {
    let store = snapshot.memory_store();
    let policy = context.config.usage_policy();
    let usecase = AuditUsecase {
        document: &snapshot.document,
        store: &store,
        policy: &policy,
        scan_mode: context.config.scan.mode,
    };

    let outcome = usecase.run(&request).await?;
    Ok(serde_json::to_value(AuditResultDto::from(&outcome))?)
}
