//! kvq - Command-line client for the kvqueue daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9999";

#[derive(Parser)]
#[command(name = "kvq")]
#[command(about = "kvqueue CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "KVQUEUE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// List all queues with their counters
    List,

    /// Create a queue
    Create { queue: String },

    /// Delete a queue and its pending messages
    Delete { queue: String },

    /// Show one queue's counters
    Info { queue: String },

    /// Send a message to a queue
    Send { queue: String, message: String },

    /// Receive (and remove) up to 10 messages
    Receive { queue: String },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize)]
struct QueueInfo {
    created_at: i64,
    message_count: u64,
    messages_sent: u64,
    messages_received: u64,
}

#[derive(Tabled)]
struct QueueRow {
    queue: String,
    pending: u64,
    sent: u64,
    received: u64,
    created_at: String,
}

impl QueueRow {
    fn new(queue: String, info: QueueInfo) -> Self {
        Self {
            queue,
            pending: info.message_count,
            sent: info.messages_sent,
            received: info.messages_received,
            created_at: format_timestamp(info.created_at),
        }
    }
}

#[derive(Deserialize)]
struct ListResult {
    queues: BTreeMap<String, QueueInfo>,
}

#[derive(Deserialize)]
struct InfoResult {
    queue: String,
    info: QueueInfo,
}

#[derive(Deserialize)]
struct SendResult {
    message_id: String,
}

#[derive(Deserialize, Tabled)]
struct MessageRow {
    id: String,
    data: String,
}

#[derive(Deserialize)]
struct ReceiveResult {
    status: String,
    message: Option<String>,
    messages: Vec<MessageRow>,
}

/// Render epoch milliseconds as RFC 3339, falling back to the raw number
fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            let result = call_rpc(&cli.rpc_url, "queue.list.v1", json!({})).await?;
            let list: ListResult = serde_json::from_value(result)?;

            if list.queues.is_empty() {
                println!("{}", "No queues".yellow());
            } else {
                let rows: Vec<QueueRow> = list
                    .queues
                    .into_iter()
                    .map(|(name, info)| QueueRow::new(name, info))
                    .collect();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Create { queue } => {
            call_rpc(&cli.rpc_url, "queue.create.v1", json!({ "queue": queue })).await?;
            println!("{}", format!("✓ Queue {} created", queue).green().bold());
        }

        Commands::Delete { queue } => {
            call_rpc(&cli.rpc_url, "queue.delete.v1", json!({ "queue": queue })).await?;
            println!("{}", format!("✓ Queue {} deleted", queue).green().bold());
        }

        Commands::Info { queue } => {
            let result = call_rpc(&cli.rpc_url, "queue.info.v1", json!({ "queue": queue })).await?;
            let info: InfoResult = serde_json::from_value(result)?;
            println!("{}", Table::new(vec![QueueRow::new(info.queue, info.info)]));
        }

        Commands::Send { queue, message } => {
            let params = json!({ "queue": queue, "message": message });
            let result = call_rpc(&cli.rpc_url, "message.send.v1", params).await?;
            let sent: SendResult = serde_json::from_value(result)?;
            println!(
                "{} {}",
                "✓ Message sent:".green().bold(),
                sent.message_id
            );
        }

        Commands::Receive { queue } => {
            let result =
                call_rpc(&cli.rpc_url, "message.receive.v1", json!({ "queue": queue })).await?;
            let batch: ReceiveResult = serde_json::from_value(result)?;

            if batch.status != "ok" {
                let reason = batch.message.unwrap_or_else(|| "unknown error".to_string());
                println!("{} {}", "✗".red(), reason);
            } else if batch.messages.is_empty() {
                println!("{}", format!("Queue {} is empty", queue).yellow());
            } else {
                println!("{}", Table::new(batch.messages));
            }
        }
    }

    Ok(())
}
