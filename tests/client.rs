//! End-to-end tests against an in-process MRC server.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use mrc_client::{
    Action, Call, ConnectionState, Error, LifecycleHooks, MediaLink, MrcClient, Push,
    ReconnectPolicy,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

use common::{MockServer, STEP_TIMEOUT, fast_client, init_logging};

// ============================================================================
// Helpers
// ============================================================================

async fn connected(client: &MrcClient) {
    timeout(STEP_TIMEOUT, client.wait_for_state(ConnectionState::Connected))
        .await
        .expect("connected within timeout")
        .expect("connection task alive");
}

async fn disconnected(client: &MrcClient) {
    timeout(STEP_TIMEOUT, client.wait_for_state(ConnectionState::Disconnected))
        .await
        .expect("disconnected within timeout")
        .expect("connection task alive");
}

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    (Arc::clone(&count), count)
}

// ============================================================================
// Correlation
// ============================================================================

#[tokio::test]
async fn test_status_reply_invokes_handler_once() {
    init_logging();
    let mut server = MockServer::start().await;
    let client = fast_client(server.url());

    client.connect();
    let mut peer = server.accept().await;
    connected(&client).await;

    let (replies_tx, mut replies_rx) = mpsc::unbounded_channel();
    let (count, seen) = counter();
    client.send_with(Call::bt_status(), move |reply| {
        count.fetch_add(1, Ordering::SeqCst);
        let _ = replies_tx.send(reply.payload);
    });

    let frame = peer.recv_json().await;
    assert_eq!(frame, json!({ "action": "btstatus", "_uid": 1 }));

    peer.send_json(json!({ "_uid": 1, "response": { "ok": true } }))
        .await;
    let payload = timeout(STEP_TIMEOUT, replies_rx.recv())
        .await
        .expect("reply within timeout")
        .expect("handler ran");
    assert_eq!(payload, json!({ "ok": true }));

    // Duplicate and unknown ids are discarded.
    peer.send_json(json!({ "_uid": 1, "response": { "ok": false } }))
        .await;
    peer.send_json(json!({ "_uid": 99, "response": {} })).await;

    // Round-trip so the frames above have been processed.
    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.request(Call::upnp_status()).await }
    });
    let frame = peer.recv_json().await;
    assert_eq!(frame["_uid"], json!(2));
    peer.send_json(json!({ "_uid": 2, "response": null })).await;
    pending
        .await
        .expect("request task")
        .expect("reply delivered");

    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_request_parses_typed_reply() {
    init_logging();
    let mut server = MockServer::start().await;
    let client = fast_client(server.url());

    client.connect();
    let mut peer = server.accept().await;
    connected(&client).await;

    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.request(Call::search("https://video.example/watch")).await }
    });

    let frame = peer.recv_json().await;
    assert_eq!(frame["action"], json!("search"));
    assert_eq!(frame["request"]["url"], json!("https://video.example/watch"));
    let uid = frame["_uid"].clone();

    peer.send_json(json!({
        "_uid": uid,
        "response": {
            "src": "https://video.example/watch",
            "url": "https://cdn.example/v.m3u8",
            "title": "Clip",
            "bitrate": [{ "url": "https://cdn.example/720.m3u8", "bitrate": 720 }]
        }
    }))
    .await;

    let reply = pending.await.expect("request task").expect("reply");
    let link: MediaLink = reply.parse().expect("media link");
    assert_eq!(link.title, "Clip");
    assert_eq!(link.bitrate[0].bitrate.as_deref(), Some("720"));
}

#[tokio::test]
async fn test_reply_handler_may_send_again() {
    init_logging();
    let mut server = MockServer::start().await;
    let client = fast_client(server.url());

    client.connect();
    let mut peer = server.accept().await;
    connected(&client).await;

    let (first, first_count) = counter();
    let (second, second_count) = counter();
    let (replies_tx, mut replies_rx) = mpsc::unbounded_channel();
    let inner = client.clone();
    client.send_with(Call::bt_status(), move |_| {
        first.fetch_add(1, Ordering::SeqCst);
        inner.send_with(Call::upnp_status(), move |reply| {
            second.fetch_add(1, Ordering::SeqCst);
            let _ = replies_tx.send(reply.payload);
        });
    });

    assert_eq!(peer.recv_json().await, json!({ "action": "btstatus", "_uid": 1 }));
    peer.send_json(json!({ "_uid": 1, "response": [] })).await;

    // Issued from inside the first handler.
    assert_eq!(peer.recv_json().await, json!({ "action": "upnpstatus", "_uid": 2 }));
    peer.send_json(json!({ "_uid": 2, "response": { "device": "TV", "item": [] } }))
        .await;
    peer.send_json(json!({ "_uid": 2, "response": null })).await;
    peer.send_json(json!({ "_uid": 1, "response": [] })).await;

    let payload = timeout(STEP_TIMEOUT, replies_rx.recv())
        .await
        .expect("reply within timeout")
        .expect("second handler ran");
    assert_eq!(payload["device"], json!("TV"));

    // Round-trip so the duplicates above have been processed.
    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.request(Call::bt_status()).await }
    });
    assert_eq!(peer.recv_json().await["_uid"], json!(3));
    peer.send_json(json!({ "_uid": 3, "response": [] })).await;
    pending.await.expect("request task").expect("reply");

    assert_eq!(first_count.load(Ordering::SeqCst), 1);
    assert_eq!(second_count.load(Ordering::SeqCst), 1);
    assert!(replies_rx.try_recv().is_err());
}

// ============================================================================
// Drop on close
// ============================================================================

#[tokio::test]
async fn test_pending_handler_dropped_on_close() {
    init_logging();
    let mut server = MockServer::start().await;
    let client = fast_client(server.url());

    client.connect();
    let mut peer = server.accept().await;
    connected(&client).await;

    let (count, seen) = counter();
    client.send_with(Call::bt_status(), move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });
    let lost = tokio::spawn({
        let client = client.clone();
        async move { client.request(Call::upnp_status()).await }
    });

    assert_eq!(peer.recv_json().await["_uid"], json!(1));
    assert_eq!(peer.recv_json().await["_uid"], json!(2));
    peer.close().await;

    let err = lost.await.expect("request task").unwrap_err();
    assert!(matches!(err, Error::ReplyDropped));

    // A late reply with the old id on the new socket is ignored.
    let mut peer = server.accept().await;
    connected(&client).await;
    peer.send_json(json!({ "_uid": 1, "response": { "late": true } }))
        .await;

    // Ids continue across reconnects.
    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.request(Call::bt_status()).await }
    });
    let frame = peer.recv_json().await;
    assert_eq!(frame["_uid"], json!(3));
    peer.send_json(json!({ "_uid": 3, "response": [] })).await;
    pending.await.expect("request task").expect("reply");

    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Reconnect
// ============================================================================

#[tokio::test]
async fn test_reconnects_and_reissues_status() {
    init_logging();
    let mut server = MockServer::start().await;
    let client = fast_client(server.url());

    let (opens, open_count) = counter();
    let (closes, close_count) = counter();
    client.connect_with(
        LifecycleHooks::new()
            .on_open(move |client| {
                opens.fetch_add(1, Ordering::SeqCst);
                client.send(Call::bt_status());
            })
            .on_close(move || {
                closes.fetch_add(1, Ordering::SeqCst);
            }),
    );

    let mut peer = server.accept().await;
    assert_eq!(peer.recv_json().await, json!({ "action": "btstatus" }));
    peer.close().await;

    let mut peer = server.accept().await;
    assert_eq!(peer.recv_json().await, json!({ "action": "btstatus" }));

    assert_eq!(open_count.load(Ordering::SeqCst), 2);
    assert!(close_count.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_failed_attempts_keep_retrying() {
    init_logging();
    let (opens, open_count) = counter();
    let (closes, close_count) = counter();

    // Nothing listens on port 1; every attempt fails.
    let client = fast_client("ws://127.0.0.1:1/ws");
    client.connect_with(
        LifecycleHooks::new()
            .on_open(move |_| {
                opens.fetch_add(1, Ordering::SeqCst);
            })
            .on_close(move || {
                closes.fetch_add(1, Ordering::SeqCst);
            }),
    );

    timeout(STEP_TIMEOUT, async {
        while close_count.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("failed attempts keep retrying");

    client.disconnect();
    disconnected(&client).await;
    assert_eq!(open_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_disconnect_suppresses_retry() {
    init_logging();
    let mut server = MockServer::start().await;
    let client = fast_client(server.url());

    client.connect();
    let peer = server.accept().await;
    connected(&client).await;

    client.disconnect();
    peer.wait_closed().await;
    disconnected(&client).await;

    assert!(server.try_accept(Duration::from_millis(300)).await.is_none());
    assert_eq!(client.state(), ConnectionState::Disconnected);

    // Sending while closed is a no-op.
    client.send(Call::bt_status());
    assert!(matches!(
        client.request(Call::bt_status()).await,
        Err(Error::ReplyDropped)
    ));

    // Disconnect is idempotent.
    client.disconnect();
    disconnected(&client).await;
}

#[tokio::test]
async fn test_connect_after_disconnect_reconnects() {
    init_logging();
    let mut server = MockServer::start().await;
    let client = fast_client(server.url());

    client.connect();
    let peer = server.accept().await;
    connected(&client).await;

    client.disconnect();
    peer.wait_closed().await;
    disconnected(&client).await;

    client.connect();
    let mut peer = server.accept().await;
    connected(&client).await;

    client.send(Call::upnp_status());
    assert_eq!(peer.recv_json().await, json!({ "action": "upnpstatus" }));
}

#[tokio::test]
async fn test_server_close_is_acknowledged() {
    init_logging();
    let mut server = MockServer::start().await;
    let client = fast_client(server.url());

    client.connect();
    let mut peer = server.accept().await;
    connected(&client).await;

    let lost = tokio::spawn({
        let client = client.clone();
        async move { client.request(Call::bt_status()).await }
    });
    assert_eq!(peer.recv_json().await["_uid"], json!(1));

    assert!(peer.close_handshake().await, "client should answer the close frame");
    let err = lost.await.expect("request task").unwrap_err();
    assert!(matches!(err, Error::ReplyDropped));

    let mut peer = server.accept().await;
    connected(&client).await;
    client.send(Call::upnp_status());
    assert_eq!(peer.recv_json().await, json!({ "action": "upnpstatus" }));
}

#[tokio::test]
async fn test_never_policy_stays_down() {
    init_logging();
    let mut server = MockServer::start().await;
    let client = MrcClient::builder()
        .endpoint(server.url())
        .reconnect(ReconnectPolicy::never())
        .build()
        .expect("client");

    client.connect();
    let peer = server.accept().await;
    connected(&client).await;

    peer.close().await;
    disconnected(&client).await;
    assert!(server.try_accept(Duration::from_millis(300)).await.is_none());
}

// ============================================================================
// Push
// ============================================================================

#[tokio::test]
async fn test_push_reaches_every_listener() {
    init_logging();
    let mut server = MockServer::start().await;
    let client = fast_client(server.url());

    let mut first = client.subscribe();
    let mut second = client.subscribe();
    let (count, seen) = counter();
    client.on_push(move |push| {
        if push.torrents().is_some() {
            count.fetch_add(1, Ordering::SeqCst);
        }
    });

    client.connect();
    let mut peer = server.accept().await;
    connected(&client).await;

    peer.send_json(json!({
        "action": "btstatus",
        "response": [{ "title": "Movie", "info_hash": "abc", "files": [] }]
    }))
    .await;

    for subscription in [&mut first, &mut second] {
        let push = timeout(STEP_TIMEOUT, subscription.recv())
            .await
            .expect("push within timeout")
            .expect("subscription open");
        assert_eq!(push.torrents().map(|t| t[0].info_hash.as_str()), Some("abc"));
    }
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    // A dropped subscription stops receiving; the other keeps going.
    drop(first);
    peer.send_json(json!({ "action": "upnpupdate", "upnpupdate": null }))
        .await;
    let push = timeout(STEP_TIMEOUT, second.recv())
        .await
        .expect("push within timeout")
        .expect("subscription open");
    assert_eq!(push, Push::UpnpUpdate(None));
    assert_eq!(client.listener_count(), 2);
}

#[tokio::test]
async fn test_malformed_frames_are_discarded() {
    init_logging();
    let mut server = MockServer::start().await;
    let client = fast_client(server.url());
    let mut pushes = client.subscribe();

    client.connect();
    let mut peer = server.accept().await;
    connected(&client).await;

    peer.send_text("{ not json").await;
    peer.send_text("[1, 2, 3]").await;
    peer.send_json(json!({ "_uid": "abc", "response": {} })).await;
    peer.send_json(json!({ "action": "progress", "response": { "pct": 40 } }))
        .await;

    let push = timeout(STEP_TIMEOUT, pushes.recv())
        .await
        .expect("push within timeout")
        .expect("subscription open");
    match push {
        Push::Unknown { action, payload } => {
            assert_eq!(action, Some(Action::from("progress")));
            assert_eq!(payload, json!({ "pct": 40 }));
        }
        other => panic!("expected unknown push, got {other:?}"),
    }

    assert!(client.is_connected());
    assert!(pushes.try_recv().is_none());
}
