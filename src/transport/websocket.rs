//! WebSocket transport
//!
//! This file implements the WebSocket server that connects remote clients to
//! the hub. Responsibilities:
//! - Accept TCP/WebSocket connections, one task per connection
//! - Create a `Client` for each connection (subscribe + join)
//! - Replay the history snapshot, then relay live events and inbound messages
//!   from a single `select!` loop, so the feed is only ever read from one place
//! - On close or error, announce the leave and cancel the subscription

use std::convert::Infallible;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::client::Client;
use crate::hub::{Event, HubHandle};
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::error::TransportError;

/// Consecutive accept failures after which the server gives up.
const MAX_ACCEPT_FAILURES: u32 = 10;

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Bind `addr` and serve WebSocket sessions against `hub`. Only returns if
/// binding fails or the listener keeps failing to accept.
pub async fn start_websocket_server(
    addr: &str,
    hub: HubHandle,
) -> Result<Infallible, TransportError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    info!("WebSocket server listening on ws://{addr}");

    serve(listener, hub).await
}

/// Accept connections from an already bound listener.
///
/// Accept errors (e.g. running out of file descriptors) are retried with an
/// exponential backoff; after `MAX_ACCEPT_FAILURES` in a row the last error
/// is returned.
pub async fn serve(listener: TcpListener, hub: HubHandle) -> Result<Infallible, TransportError> {
    let mut failures = 0u32;

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => {
                failures = 0;
                conn
            }
            Err(e) => {
                failures += 1;
                if failures >= MAX_ACCEPT_FAILURES {
                    return Err(TransportError::Accept(e));
                }
                let delay = accept_backoff(failures);
                warn!(failures, ?delay, "Failed to accept connection: {e}");
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        let hub = hub.clone();
        tokio::spawn(async move {
            debug!(%peer, "Connection accepted");
            if let Err(e) = handle_connection(stream, hub).await {
                warn!(%peer, "Session ended with error: {e}");
            }
        });
    }
}

/// Delay before retrying after `failures` consecutive accept errors.
pub(crate) fn accept_backoff(failures: u32) -> Duration {
    let factor = 1u32 << failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_BASE
        .saturating_mul(factor)
        .min(ACCEPT_BACKOFF_MAX)
}

async fn handle_connection(stream: TcpStream, hub: HubHandle) -> Result<(), TransportError> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (mut client, archive) = Client::connect(hub).await?;

    let relayed = relay(&mut client, archive, &mut ws_sender, &mut ws_receiver).await;

    // Leave and cancel whatever ended the session.
    let left = client.disconnect().await;
    relayed?;
    left?;
    Ok(())
}

async fn relay<S, R>(
    client: &mut Client,
    archive: Vec<Event>,
    ws_sender: &mut S,
    ws_receiver: &mut R,
) -> Result<(), TransportError>
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
    R: Stream<Item = Result<WsMessage, tungstenite::Error>> + Unpin,
{
    for event in archive {
        send_frame(ws_sender, &ServerMessage::Event(event)).await?;
    }

    loop {
        tokio::select! {
            event = client.next_event() => match event {
                Some(event) => send_frame(ws_sender, &ServerMessage::Event(event)).await?,
                None => {
                    debug!(client = %client.id, "Feed closed by hub");
                    return Ok(());
                }
            },
            msg = ws_receiver.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(text.as_str()) {
                        Ok(ClientMessage::Message { text }) => client.say(text).await?,
                        Err(err) => {
                            warn!(
                                client = %client.id,
                                "Invalid client message: {err} | {}",
                                text.as_str().chars().take(100).collect::<String>()
                            );
                            let reply = ServerMessage::Error {
                                message: "invalid message".to_string(),
                            };
                            send_frame(ws_sender, &reply).await?;
                        }
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => return Ok(()),
                // pings are answered by tungstenite; binary frames are ignored
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
        }
    }
}

async fn send_frame<S>(ws_sender: &mut S, frame: &ServerMessage) -> Result<(), TransportError>
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    let json = serde_json::to_string(frame)?;
    ws_sender.send(WsMessage::text(json)).await?;
    Ok(())
}
