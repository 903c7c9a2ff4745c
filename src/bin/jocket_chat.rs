//! Interactive chat client
//!
//! Sends each stdin line as `{"data":{"content":line}}` and prints whatever
//! the server delivers. Stops on EOF or Ctrl+C.
//!
//! Usage: `jocket_chat [settings.yaml]`

use anyhow::Result;
use jocket::{data_packet, EventHandler, Jocket, JocketError, Packet, DATA_KEY};
use jocket_chat::bin_common::{
    init_tracing, load_config_from_env, parse_args, BinaryRunner, ConfigType, JocketSettings,
    RunConfig,
};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Prints events on the client's handler thread
struct ChatPrinter {
    closed_tx: mpsc::UnboundedSender<Option<JocketError>>,
}

impl EventHandler for ChatPrinter {
    fn on_open(&mut self) {
        info!("Connected");
    }

    fn on_close(&mut self, error: Option<JocketError>) {
        match &error {
            Some(e) => warn!("Disconnected: {}", e),
            None => info!("Server closed the session"),
        }
        let _ = self.closed_tx.send(error);
    }

    fn on_packet(&mut self, packet: Packet) {
        println!("< {}", render(&packet));
    }
}

fn render(packet: &Packet) -> String {
    match packet.get(DATA_KEY) {
        Some(data) => data
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| data.to_string()),
        None => Value::Object(packet.clone()).to_string(),
    }
}

struct ChatApp {
    run_config: RunConfig,
    settings: JocketSettings,
    sent: u64,
    received: u64,
}

impl ChatApp {
    fn new(settings: JocketSettings) -> Self {
        Self {
            run_config: RunConfig::new("Jocket Chat").with_status_interval(60),
            settings,
            sent: 0,
            received: 0,
        }
    }

    async fn connect(&self) -> Result<(Jocket, mpsc::UnboundedReceiver<Option<JocketError>>)> {
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        let client = self
            .settings
            .builder()
            .handler(ChatPrinter { closed_tx })
            .build()
            .await?;
        client.open()?;
        Ok((client, closed_rx))
    }
}

impl BinaryRunner for ChatApp {
    async fn run(&mut self) -> Result<()> {
        let (client, mut closed_rx) = self.connect().await?;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut status = tokio::time::interval(self.run_config.status_interval());
        status.tick().await;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("End of input");
                        break;
                    };
                    let text = line.trim();
                    if text.is_empty() {
                        continue;
                    }
                    if !client.is_open() {
                        warn!("Not connected, message dropped");
                        continue;
                    }
                    client.send_packet(data_packet(json!({ "content": text })));
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
                closed = closed_rx.recv() => {
                    // A lost session may come back on its own
                    let recoverable = matches!(closed, Some(Some(_))) && self.settings.auto_reconnect;
                    if !recoverable {
                        break;
                    }
                }
                _ = status.tick() => {
                    let metrics = client.metrics();
                    info!(
                        "Status: {:?} | sent {} | received {} | reconnects {}",
                        metrics.connection_state,
                        metrics.packets_sent,
                        metrics.packets_received,
                        metrics.reconnect_count
                    );
                }
            }
        }

        client.close()?;
        let metrics = client.metrics();
        self.sent = metrics.packets_sent;
        self.received = metrics.packets_received;
        client.shutdown().await?;
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn stats(&self) -> Option<String> {
        Some(format!(
            "Packets sent: {}, received: {}",
            self.sent, self.received
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Settings first, they carry the log level
    let config_type = match parse_args().into_iter().next() {
        Some(path) => ConfigType::Custom(path),
        None => ConfigType::Client,
    };
    let settings = JocketSettings::load(load_config_from_env(config_type))?;

    init_tracing(&settings.log_level);
    settings.log_summary();

    ChatApp::new(settings).execute().await
}
