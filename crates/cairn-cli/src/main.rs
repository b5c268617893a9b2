// ABOUTME: cairn binary - publishes messages to a topic over a write session.
// ABOUTME: Reads stdin line by line, prints server acks, exits on EOF.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tokio::time::timeout;

use cairn_grpc::{create_channel, ChannelConfig, WriteSession, WriteSessionArgs};
use cairn_proto::MessageData;

/// Default topic service address
const DEFAULT_SERVER: &str = "http://127.0.0.1:50051";

/// How long to wait for the handshake acknowledgement.
const INIT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait after dispose for the server to end the stream.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "cairn")]
#[command(about = "Publish messages to cairn topics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish stdin lines to a topic, one message per line
    Publish {
        /// Topic path to publish to
        path: String,

        /// Topic service address
        #[arg(short, long, default_value = DEFAULT_SERVER, env = "CAIRN_SERVER")]
        server: String,

        /// Producer identifier (generated if not provided)
        #[arg(short, long)]
        producer_id: Option<String>,

        /// Pin writes to a specific partition
        #[arg(long)]
        partition_id: Option<i64>,

        /// Auth token to send after attaching
        #[arg(long, env = "CAIRN_TOKEN")]
        token: Option<String>,

        /// Load configuration from a file (default: ~/.config/cairn/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

/// Get XDG-style config directory (~/.config/cairn)
/// Respects XDG_CONFIG_HOME if set, otherwise uses ~/.config
fn xdg_config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("cairn"))
}

/// Get default config path (~/.config/cairn/config.toml)
fn default_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|p| p.join("config.toml"))
}

/// Resolve the config file to use: explicit path > user-global, if it exists.
fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let default = default_config_path()?;
        if default.exists() {
            Some(default)
        } else {
            None
        }
    })
}

/// Read a string value from a parsed config table. Non-string values are
/// ignored rather than coerced.
fn config_str(table: &toml::Table, key: &str) -> Option<String> {
    table.get(key).and_then(|v| v.as_str()).map(String::from)
}

/// Wrap one stdin line as a topic message.
fn message_data(seq_no: u64, line: String) -> MessageData {
    let uncompressed_size = line.len() as i64;
    MessageData {
        seq_no,
        created_at_ms: chrono::Utc::now().timestamp_millis(),
        data: line.into_bytes(),
        uncompressed_size,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    cairn_log::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Publish {
            path,
            server,
            producer_id,
            partition_id,
            token,
            config,
        } => run_publish(path, server, producer_id, partition_id, token, config).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

async fn run_publish(
    path: String,
    server: String,
    producer_id: Option<String>,
    partition_id: Option<i64>,
    token: Option<String>,
    config: Option<PathBuf>,
) -> Result<()> {
    // Settings come from: 1. config file, 2. CLI args / defaults
    let config_path = resolve_config_path(config);
    let (server, producer_id, token) = if let Some(ref config_path) = config_path {
        tracing::info!("loading config from: {}", config_path.display());
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config file: {}", config_path.display()))?;
        let table: toml::Table = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", config_path.display()))?;
        (
            config_str(&table, "server").unwrap_or(server),
            config_str(&table, "producer_id").or(producer_id),
            config_str(&table, "token").or(token),
        )
    } else {
        (server, producer_id, token)
    };
    let producer_id =
        producer_id.unwrap_or_else(|| format!("cairn-{}", uuid::Uuid::new_v4()));

    let channel_config = ChannelConfig::new(&server);
    let channel = create_channel(&channel_config)
        .await
        .with_context(|| format!("failed to connect to {server}"))?;

    let mut args = WriteSessionArgs::new(path.clone())
        .with_producer_id(producer_id)
        .with_get_last_seq_no(true);
    if let Some(partition_id) = partition_id {
        args = args.with_partition_id(partition_id);
    }

    let mut session = WriteSession::connect(args, channel).await?;
    let mut init_rx = session.events().subscribe_init_responses();
    let mut write_rx = session.events().subscribe_write_responses();
    let mut err_rx = session.events().subscribe_errors();
    let mut end_rx = session.events().subscribe_end();

    if let Some(token) = token {
        session.update_token(token).await?;
    }

    let init = timeout(INIT_TIMEOUT, init_rx.recv())
        .await
        .context("timed out waiting for the init response")?
        .context("session ended before the init response")?;
    eprintln!(
        "attached to {} (session {}, partition {}, last_seq_no {})",
        path, init.session_id, init.partition_id, init.last_seq_no
    );

    // Print acks and errors as they arrive; exits once the stream ends.
    let mut printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                resp = write_rx.recv() => match resp {
                    Ok(resp) => {
                        for ack in resp.acks {
                            println!("ack seq_no={} offset={}", ack.seq_no, ack.offset);
                        }
                    }
                    Err(_) => break,
                },
                err = err_rx.recv() => match err {
                    Ok(err) => eprintln!("stream error: {err}"),
                    Err(_) => break,
                },
                end = end_rx.recv() => {
                    if let Ok(cause) = end {
                        tracing::debug!(?cause, "stream ended");
                    }
                    break;
                }
            }
        }
    });

    let mut seq_no = init.last_seq_no + 1;
    let mut published = 0u64;
    let mut lines = BufReader::new(stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        session
            .write(vec![message_data(seq_no, line)])
            .await
            .context("failed to publish line")?;
        seq_no += 1;
        published += 1;
    }

    // Half-close and let the server ack whatever is still in flight.
    session.dispose()?;
    if timeout(SHUTDOWN_TIMEOUT, &mut printer).await.is_err() {
        tracing::warn!("timed out waiting for the server to end the stream");
        printer.abort();
    }

    eprintln!("published {} messages to {}", published, path);
    Ok(())
}

/// Print version information
fn print_version() {
    println!("cairn {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Repository: https://github.com/2389-research/cairn");
}
