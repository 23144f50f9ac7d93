//! Integration tests for the consumer-side sync loop.
//!
//! The loop's correctness story is that the periodic refetch alone keeps the
//! view right — pushes only shave latency. The first test therefore runs
//! with the push path bypassed entirely.

use driftmail::generator::AddressKind;
use driftmail::registry::ConnectionState;
use driftmail::storage::NewMessage;
use driftmail::sync::{InboxView, SyncClient, SyncHandle};
use driftmail::{channel, config::DaemonConfig, rest, AppContext};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Find a free local port by binding to port 0.
fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

struct Servers {
    ctx: Arc<AppContext>,
    ws_url: String,
    api_base_url: String,
    _dir: TempDir,
}

async fn start_servers() -> Servers {
    let dir = TempDir::new().unwrap();
    // Keep the channel quiet: these tests drive simulation explicitly.
    std::fs::write(
        dir.path().join("config.toml"),
        "simulate_on_subscribe = false\n",
    )
    .unwrap();

    let port = find_free_port();
    let rest_port = find_free_port();
    let config = DaemonConfig::new(
        Some(port),
        Some(rest_port),
        Some(dir.path().to_path_buf()),
        Some("error".to_string()),
        None,
    );
    let ctx = Arc::new(AppContext::new(config).await.unwrap());

    let channel_ctx = ctx.clone();
    tokio::spawn(async move {
        let _ = channel::run(channel_ctx).await;
    });
    let rest_ctx = ctx.clone();
    tokio::spawn(async move {
        let _ = rest::start_rest_server(rest_ctx).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    Servers {
        ctx,
        ws_url: format!("ws://127.0.0.1:{port}/ws"),
        api_base_url: format!("http://127.0.0.1:{rest_port}"),
        _dir: dir,
    }
}

/// Block until the view satisfies `cond`, or panic after 5 seconds.
async fn wait_for_view(handle: &SyncHandle, cond: impl Fn(&InboxView) -> bool) -> InboxView {
    let mut view_rx = handle.watch_view();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let view = view_rx.borrow();
                if cond(&view) {
                    return view.clone();
                }
            }
            view_rx.changed().await.expect("sync client alive");
        }
    })
    .await
    .expect("view condition within timeout")
}

fn sample_fields(code: &str) -> NewMessage {
    NewMessage {
        sender: "noreply@nimbus.dev".to_string(),
        sender_name: "Nimbus Auth".to_string(),
        subject: "Nimbus Verification Code".to_string(),
        content: format!("Your Nimbus verification code is: {code}."),
        otp_code: Some(code.to_string()),
    }
}

#[tokio::test]
async fn periodic_refetch_reconciles_with_pushes_disabled() {
    let servers = start_servers().await;
    let address = servers.ctx.storage.create_address("poll@example.com").await.unwrap();

    let (client, handle) = SyncClient::new(&servers.ws_url, &servers.api_base_url);
    let client = client.with_intervals(Duration::from_millis(200), Duration::from_millis(100));
    handle.select_address(Some("poll@example.com".to_string()));
    tokio::spawn(client.run());

    let view = wait_for_view(&handle, |v| v.status == ConnectionState::Open).await;
    assert!(view.messages.is_empty());

    // Append straight to the store — no broadcast, no push. Only the poll
    // can surface these.
    servers
        .ctx
        .storage
        .append_message(address.id, sample_fields("111111"))
        .await
        .unwrap();
    let view = wait_for_view(&handle, |v| v.messages.len() == 1).await;
    assert_eq!(view.messages[0].otp_code.as_deref(), Some("111111"));
    assert!(view.last_refreshed.is_some());

    servers
        .ctx
        .storage
        .append_message(address.id, sample_fields("222222"))
        .await
        .unwrap();
    let view = wait_for_view(&handle, |v| v.messages.len() == 2).await;
    // Full refetch, ascending creation order.
    assert_eq!(view.messages[0].otp_code.as_deref(), Some("111111"));
    assert_eq!(view.messages[1].otp_code.as_deref(), Some("222222"));
}

#[tokio::test]
async fn push_triggers_a_refetch_ahead_of_the_poll() {
    let servers = start_servers().await;

    let (client, handle) = SyncClient::new(&servers.ws_url, &servers.api_base_url);
    // Poll far in the future: only the push path can deliver in time.
    let client = client.with_intervals(Duration::from_secs(300), Duration::from_millis(100));
    handle.select_address(Some("pushed@example.com".to_string()));
    tokio::spawn(client.run());

    wait_for_view(&handle, |v| v.status == ConnectionState::Open).await;
    // Give the SUBSCRIBE_EMAIL frame time to land in the registry.
    tokio::time::sleep(Duration::from_millis(200)).await;

    servers
        .ctx
        .inbox
        .simulate_reception("pushed@example.com", AddressKind::Standard)
        .await
        .unwrap();

    let view = wait_for_view(&handle, |v| v.messages.len() == 1).await;
    assert!(view.messages[0].otp_code.is_some());
}

#[tokio::test]
async fn push_for_another_address_does_not_touch_the_view() {
    let servers = start_servers().await;
    servers.ctx.storage.create_address("mine@example.com").await.unwrap();

    let (client, handle) = SyncClient::new(&servers.ws_url, &servers.api_base_url);
    let client = client.with_intervals(Duration::from_secs(300), Duration::from_millis(100));
    handle.select_address(Some("mine@example.com".to_string()));
    tokio::spawn(client.run());

    wait_for_view(&handle, |v| v.status == ConnectionState::Open).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    servers
        .ctx
        .inbox
        .simulate_reception("theirs@example.com", AddressKind::Standard)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(handle.view().messages.is_empty());
}

#[tokio::test]
async fn client_reconnects_after_the_server_comes_up_late() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "simulate_on_subscribe = false\n",
    )
    .unwrap();
    let port = find_free_port();
    let rest_port = find_free_port();

    let (client, handle) = SyncClient::new(
        format!("ws://127.0.0.1:{port}/ws"),
        format!("http://127.0.0.1:{rest_port}"),
    );
    let client = client.with_intervals(Duration::from_millis(200), Duration::from_millis(100));
    tokio::spawn(client.run());

    // Nothing is listening yet; the loop keeps scheduling reconnects.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_ne!(handle.view().status, ConnectionState::Open);

    let config = DaemonConfig::new(
        Some(port),
        Some(rest_port),
        Some(dir.path().to_path_buf()),
        Some("error".to_string()),
        None,
    );
    let ctx = Arc::new(AppContext::new(config).await.unwrap());
    tokio::spawn(async move {
        let _ = channel::run(ctx).await;
    });

    wait_for_view(&handle, |v| v.status == ConnectionState::Open).await;
}
