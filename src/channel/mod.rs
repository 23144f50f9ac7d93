//! Realtime channel server.
//!
//! A WebSocket endpoint at the fixed path `/ws`. Each connection gets a
//! greeting frame, may subscribe to one address at a time, and receives
//! `NEW_MESSAGE` pushes for it until it disconnects. Malformed client frames
//! produce an `ERROR` event and leave the connection open.

pub mod event;

use crate::generator::AddressKind;
use crate::registry::{ConnectionHandle, ConnectionState};
use crate::AppContext;
use anyhow::Result;
use event::{ClientEvent, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::handshake::server::{ErrorResponse, Request, Response},
    tungstenite::http::StatusCode,
    tungstenite::Message,
};
use tracing::{debug, error, info, warn};

/// The channel lives at this path; everything else is rejected during the
/// handshake.
pub const CHANNEL_PATH: &str = "/ws";

// ─── Server ──────────────────────────────────────────────────────────────────

pub async fn run(ctx: Arc<AppContext>) -> Result<()> {
    let addr = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, path = CHANNEL_PATH, "channel server listening");

    // Graceful shutdown: resolve on SIGTERM (Unix) or Ctrl-C (all platforms).
    // Pinned so we can use it in the select! loop without moving.
    let shutdown = make_shutdown_future();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("shutdown signal received — stopping channel server");
                break;
            }

            conn = listener.accept() => {
                let (stream, peer) = match conn {
                    Ok(c) => c,
                    Err(e) => {
                        error!(err = %e, "accept error");
                        continue;
                    }
                };
                debug!(peer = %peer, "new connection");
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, ctx).await {
                        warn!(peer = %peer, err = %e, "connection error");
                    }
                });
            }
        }
    }

    info!("channel server stopped");
    Ok(())
}

/// Returns a future that resolves when a shutdown signal is received.
///
/// On Unix we listen for SIGTERM *and* Ctrl-C.
/// On other platforms we listen for Ctrl-C only.
async fn make_shutdown_future() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}

async fn handle_connection(stream: tokio::net::TcpStream, ctx: Arc<AppContext>) -> Result<()> {
    // Enforce the fixed channel path during the HTTP upgrade.
    let ws = accept_hdr_async(stream, |req: &Request, response: Response| {
        if req.uri().path() == CHANNEL_PATH {
            Ok(response)
        } else {
            let mut reject = ErrorResponse::new(Some("channel endpoint is /ws".to_string()));
            *reject.status_mut() = StatusCode::NOT_FOUND;
            Err(reject)
        }
    })
    .await?;
    let (mut sink, mut stream) = ws.split();

    // All server→client frames funnel through this queue so they leave in
    // enqueue order.
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let handle = ConnectionHandle::new(outbound_tx);
    debug!(conn = %handle.id, "channel connection accepted");

    // Greet, then open the connection for delivery.
    handle.try_deliver(ServerEvent::connection_status("connected").to_frame());
    handle.set_state(ConnectionState::Open);

    loop {
        tokio::select! {
            // Outgoing frame (pushes, acks, errors)
            frame = outbound_rx.recv() => {
                match frame {
                    Some(json) => {
                        if let Err(e) = sink.send(Message::Text(json)).await {
                            warn!(conn = %handle.id, err = %e, "send error");
                            handle.set_state(ConnectionState::Error);
                            break;
                        }
                    }
                    None => break,
                }
            }
            // Incoming frame from the client
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        dispatch_client_frame(&text, &handle, &ctx).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        handle.set_state(ConnectionState::Closed);
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(conn = %handle.id, err = %e, "channel error");
                        handle.set_state(ConnectionState::Error);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    if !handle.state().is_terminal() {
        handle.set_state(ConnectionState::Closed);
    }
    ctx.registry.unsubscribe_all(handle.id).await;
    debug!(conn = %handle.id, "channel connection closed");
    Ok(())
}

/// Handle one client frame. Replies go through the connection's outbound
/// queue; a payload we cannot parse yields an `ERROR` event and nothing else.
async fn dispatch_client_frame(text: &str, handle: &ConnectionHandle, ctx: &AppContext) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(ev) => ev,
        Err(e) => {
            debug!(conn = %handle.id, err = %e, "malformed client frame");
            handle.try_deliver(ServerEvent::error("Failed to process message").to_frame());
            return;
        }
    };

    match event {
        ClientEvent::SubscribeEmail { email_address } => {
            debug!(conn = %handle.id, address = %email_address, "subscribe");
            ctx.registry.subscribe(handle, &email_address).await;
            handle.try_deliver(ServerEvent::subscribed(email_address.clone()).to_frame());

            // Demo behavior: greet a fresh subscription with one message of
            // each kind so the inbox is never empty.
            if ctx.config.simulate_on_subscribe {
                let inbox = ctx.inbox.clone();
                tokio::spawn(async move {
                    for kind in [AddressKind::Standard, AddressKind::Federated] {
                        if let Err(e) = inbox.simulate_reception(&email_address, kind).await {
                            warn!(err = %e, address = %email_address, "simulate on subscribe failed");
                        }
                    }
                });
            }
        }
    }
}
