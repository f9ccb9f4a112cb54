//! CLI for chathub
//!
//! Subcommands:
//! - `server`: run the hub and its WebSocket server
//! - `client`: connect to a running server, print every frame and send each
//!   stdin line as a chat message

use chathub::config::{Settings, load_config};
use chathub::hub::Hub;
use chathub::transport::start_websocket_server;
use chathub::utils::logging;
use clap::Parser;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "chathub")]
enum Command {
    /// Start the hub and the WebSocket server
    Server,
    /// Run a line-based client against a server
    Client {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cmd = Command::parse();

    match cmd {
        Command::Server => {
            let config = match load_config() {
                Ok(config) => config,
                Err(e) => {
                    logging::init("info");
                    error!("Failed to load configuration: {}", e);
                    return;
                }
            };
            logging::init(&config.logging.level);

            if let Err(e) = run_server(config).await {
                error!("Server failed: {}", e);
            }
        }
        Command::Client { url } => {
            logging::init("warn");
            if let Err(e) = run_client(&url).await {
                error!("Client failed: {}", e);
            }
        }
    }
}

async fn run_server(config: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let hub = Hub::spawn(&config.hub);

    tokio::select! {
        res = start_websocket_server(&addr, hub) => {
            let Err(e) = res;
            return Err(e.into());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_client(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (ws_stream, _response) = connect_async(url).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            frame = ws_receiver.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => println!("{text}"),
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            line = lines.next_line() => match line? {
                Some(line) => {
                    let msg = json!({ "type": "message", "text": line });
                    ws_sender.send(WsMessage::text(msg.to_string())).await?;
                }
                None => {
                    ws_sender.close().await?;
                    break;
                }
            },
        }
    }

    Ok(())
}
