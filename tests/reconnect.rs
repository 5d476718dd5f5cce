mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use rts_session::client::{ClientOptions, Subscriber};
use rts_session::connection::{ConnectionOptions, ConnectionState, ReconnectPolicy};
use rts_session::error::ErrorKind;
use rts_session::SessionEvent;

use common::{fast_reconnect, subscriber_creds, wait_for, MockEngine, MockTransport};

async fn wait_for_state(subscriber: &Subscriber, target: ConnectionState) {
    let mut state = subscriber.watch_state();
    tokio::time::timeout(Duration::from_secs(30), state.wait_for(|s| *s == target))
        .await
        .expect("state reached in time")
        .expect("state channel open");
}

#[tokio::test(start_paused = true)]
async fn drop_mid_session_reconnects_and_keeps_subscription() {
    let transport = MockTransport::new();
    let engine = MockEngine::new();
    let subscriber = Subscriber::new(transport.clone(), engine.clone());
    let mut events = subscriber.events();

    subscriber
        .connect_with(subscriber_creds(), fast_reconnect())
        .await
        .unwrap();
    subscriber.subscribe(ClientOptions::default()).await.unwrap();
    wait_for(&mut events, |e| matches!(e, SessionEvent::Subscribed)).await;

    transport.fail_opens(1);
    transport.drop_channel();

    let reconnecting = wait_for(&mut events, |e| matches!(e, SessionEvent::Reconnecting { .. })).await;
    assert!(matches!(reconnecting, SessionEvent::Reconnecting { attempt: 1 }));
    let second = wait_for(&mut events, |e| matches!(e, SessionEvent::Reconnecting { .. })).await;
    assert!(matches!(second, SessionEvent::Reconnecting { attempt: 2 }));
    wait_for(&mut events, |e| matches!(e, SessionEvent::Connected)).await;

    assert_eq!(subscriber.state(), ConnectionState::Connected);
    assert!(subscriber.is_subscribed());
    assert_eq!(engine.stops.load(Ordering::SeqCst), 0);
    assert_eq!(transport.opens.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_reconnect_fails_and_releases_media() {
    let transport = MockTransport::new();
    let engine = MockEngine::new();
    let subscriber = Subscriber::new(transport.clone(), engine.clone());
    let mut events = subscriber.events();

    subscriber
        .connect_with(subscriber_creds(), fast_reconnect())
        .await
        .unwrap();
    subscriber.subscribe(ClientOptions::default()).await.unwrap();

    transport.fail_opens(3);
    transport.drop_channel();

    let error = wait_for(&mut events, |e| matches!(e, SessionEvent::ConnectionError { .. })).await;
    assert!(matches!(error, SessionEvent::ConnectionError { status: -1, .. }));
    wait_for_state(&subscriber, ConnectionState::Failed).await;

    // Media is released by the pump once the connection is given up
    tokio::time::timeout(Duration::from_secs(5), async {
        while engine.stops.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert!(!subscriber.is_subscribed());
    assert_eq!(engine.stops.load(Ordering::SeqCst), 1);

    // A failed session can connect again
    subscriber
        .connect_with(subscriber_creds(), fast_reconnect())
        .await
        .unwrap();
    assert!(subscriber.is_connected());
}

#[tokio::test(start_paused = true)]
async fn drop_without_auto_reconnect_disconnects() {
    let transport = MockTransport::new();
    let engine = MockEngine::new();
    let subscriber = Subscriber::new(transport.clone(), engine.clone());
    let mut events = subscriber.events();

    subscriber
        .connect_with(subscriber_creds(), ConnectionOptions::default().auto_reconnect(false))
        .await
        .unwrap();
    subscriber.subscribe(ClientOptions::default()).await.unwrap();

    transport.drop_channel();

    wait_for(&mut events, |e| matches!(e, SessionEvent::Disconnected)).await;
    wait_for_state(&subscriber, ConnectionState::Disconnected).await;
    assert_eq!(transport.opens.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn initial_connect_retries_transient_failures() {
    let transport = MockTransport::new();
    let subscriber = Subscriber::new(transport.clone(), MockEngine::new());
    transport.fail_opens(2);

    subscriber
        .connect_with(subscriber_creds(), fast_reconnect())
        .await
        .unwrap();

    assert_eq!(transport.opens.load(Ordering::SeqCst), 3);
    assert!(subscriber.is_connected());
}

#[tokio::test(start_paused = true)]
async fn initial_connect_gives_up_after_policy() {
    let transport = MockTransport::new();
    let subscriber = Subscriber::new(transport.clone(), MockEngine::new());
    transport.fail_opens(10);

    let err = subscriber
        .connect_with(subscriber_creds(), fast_reconnect())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.is_retryable());
    assert_eq!(subscriber.state(), ConnectionState::Failed);
    assert_eq!(transport.opens.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn disconnect_during_reconnect_cancels_it() {
    let transport = MockTransport::new();
    let subscriber = Subscriber::new(transport.clone(), MockEngine::new());
    let slow = ConnectionOptions::default().reconnect_policy(
        ReconnectPolicy::default()
            .max_attempts(5)
            .initial_backoff(Duration::from_secs(30))
            .max_backoff(Duration::from_secs(30)),
    );

    subscriber.connect_with(subscriber_creds(), slow).await.unwrap();
    transport.fail_opens(10);
    transport.drop_channel();
    wait_for_state(&subscriber, ConnectionState::Reconnecting).await;

    subscriber.disconnect().await.unwrap();

    assert_eq!(subscriber.state(), ConnectionState::Disconnected);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(subscriber.state(), ConnectionState::Disconnected);
    assert_eq!(transport.opens.load(Ordering::SeqCst), 1);
}
