//! Hardened transport behavior: buffering while disconnected, reconnect.

use std::net::SocketAddr;
use std::time::Duration;

use mirror_relay::config::{DownstreamConfig, ReconnectConfig};
use mirror_relay::transport::ws::WebSocketSink;
use mirror_relay::transport::FeedSink;

mod common;

#[tokio::test]
async fn buffered_records_flush_after_reconnect() {
    let consumer_addr: SocketAddr = "127.0.0.1:29581".parse().unwrap();

    let config = DownstreamConfig {
        endpoint: format!("ws://{}", consumer_addr),
        send_queue_size: 16,
        buffer_on_disconnect_bytes: 64 * 1024,
        reconnect: ReconnectConfig {
            enabled: true,
            base_delay_ms: 10,
            max_delay_ms: 50,
        },
    };

    // Nothing is listening yet: setup failure leaves the sink degraded.
    let mut sink = WebSocketSink::connect(&config).await;
    assert!(!sink.is_connected());

    // Sending while down retains the record (reconnect attempt fails).
    sink.send("first").await.unwrap();
    assert_eq!(sink.buffered_records(), 1);

    // Bring the consumer up; the next send reconnects and flushes.
    let mut frames = common::start_mock_consumer(consumer_addr).await;
    sink.send("second").await.unwrap();
    assert!(sink.is_connected());
    assert_eq!(sink.buffered_records(), 0);

    let first = tokio::time::timeout(Duration::from_secs(5), frames.recv())
        .await
        .expect("frame within deadline")
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), frames.recv())
        .await
        .expect("frame within deadline")
        .unwrap();

    // Oldest buffered record first, then the triggering one.
    assert_eq!(first, "first");
    assert_eq!(second, "second");
}

#[tokio::test]
async fn live_connection_delivers_immediately() {
    let consumer_addr: SocketAddr = "127.0.0.1:29681".parse().unwrap();
    let mut frames = common::start_mock_consumer(consumer_addr).await;

    let config = DownstreamConfig {
        endpoint: format!("ws://{}", consumer_addr),
        ..DownstreamConfig::default()
    };

    let mut sink = WebSocketSink::connect(&config).await;
    assert!(sink.is_connected());

    sink.send("live").await.unwrap();
    let frame = tokio::time::timeout(Duration::from_secs(5), frames.recv())
        .await
        .expect("frame within deadline")
        .unwrap();
    assert_eq!(frame, "live");
    assert_eq!(sink.buffered_records(), 0);

    sink.close().await;
}
