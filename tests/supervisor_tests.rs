//! Integration tests for the relay supervisor and role adapters
//!
//! The real relay binary never runs here: a `/bin/sh` stub mimics its
//! argument handling and startup/exit behavior so the suite stays hermetic.

#![cfg(unix)]

mod common;

use common::{spawn_socks4_echo, stub_payload, FailingAsset, StaticAsset};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::timeout;
use udtgate::relay::{Client, ClientConfig, Server, ServerConfig};
use udtgate::socks::Socks4Dialer;
use udtgate::supervisor::{OutputPolicy, Supervisor};
use udtgate::RelayError;

fn server_config() -> ServerConfig {
    ServerConfig {
        listen_port: 9000,
        peer_addr: "10.0.0.1:9001".to_string(),
    }
}

fn client_config(socks_port: u16) -> ClientConfig {
    ClientConfig {
        socks_port,
        relay_port: 9000,
        peer_addr: "10.0.0.1:9001".to_string(),
    }
}

/// Script that keeps running until interrupted, then exits cleanly.
const WAIT_FOR_INTERRUPT: &str = "trap 'exit 0' INT TERM\nwhile :; do sleep 0.1; done";

#[tokio::test]
async fn test_child_stdout_reaches_sink_in_order() {
    let script = "i=0\nwhile [ $i -lt 200 ]; do echo line-$i; i=$((i+1)); done";
    let (mut sink_read, sink_write) = tokio::io::duplex(1024 * 1024);

    let server = Server::new(server_config())
        .asset_source(Box::new(StaticAsset::new(stub_payload(script))))
        .debug_out(Box::new(sink_write));
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    timeout(Duration::from_secs(30), server.run(shutdown_rx))
        .await
        .expect("run timed out")
        .expect("run failed");

    let mut output = String::new();
    sink_read.read_to_string(&mut output).await.unwrap();
    let lines: Vec<_> = output.lines().collect();
    assert_eq!(lines.len(), 200);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(*line, format!("line-{}", i));
    }
}

#[tokio::test]
async fn test_large_output_with_discard_sink_completes() {
    // Far more output than a pipe buffer holds; without the pumps the
    // child would block on write and the exit-wait would never return.
    let script =
        "i=0\nwhile [ $i -lt 20000 ]; do echo aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa; i=$((i+1)); done";
    let supervisor = Supervisor::new(Box::new(StaticAsset::new(stub_payload(script))));
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let result = timeout(
        Duration::from_secs(60),
        supervisor.run(
            &server_config().params(),
            None,
            OutputPolicy::Silent,
            shutdown_rx,
        ),
    )
    .await
    .expect("run timed out");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_nonzero_exit_is_child_exit_error() {
    let supervisor = Supervisor::new(Box::new(StaticAsset::new(stub_payload("exit 3"))));
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let err = supervisor
        .run(
            &server_config().params(),
            None,
            OutputPolicy::Silent,
            shutdown_rx,
        )
        .await
        .unwrap_err();
    match err {
        RelayError::ChildExit(status) => assert_eq!(status.code(), Some(3)),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_payload_fails_fast() {
    let server = Server::new(server_config()).asset_source(Box::new(FailingAsset));
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let err = timeout(Duration::from_secs(5), server.run(shutdown_rx))
        .await
        .expect("fail-fast path took too long")
        .unwrap_err();
    assert!(matches!(err, RelayError::AssetUnavailable { .. }));
}

#[tokio::test]
async fn test_interrupt_stops_running_client() {
    let client = Client::new(client_config(1080))
        .asset_source(Box::new(StaticAsset::new(stub_payload(WAIT_FOR_INTERRUPT))));
    let stop = client.stop_handle();
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let run = tokio::spawn(client.run(shutdown_rx));
    tokio::time::sleep(Duration::from_millis(400)).await;
    stop.stop();

    let result = timeout(Duration::from_secs(5), run)
        .await
        .expect("relay did not exit after interrupt")
        .unwrap();
    match result {
        // Clean exit from the trap handler, or killed before the trap was
        // installed; both are termination through the interrupt.
        Ok(()) | Err(RelayError::ChildExit(_)) => {}
        Err(other) => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_shutdown_channel_interrupts_relay() {
    let server = Server::new(server_config())
        .asset_source(Box::new(StaticAsset::new(stub_payload(WAIT_FOR_INTERRUPT))));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let run = tokio::spawn(server.run(shutdown_rx));
    tokio::time::sleep(Duration::from_millis(400)).await;
    shutdown_tx.send(true).unwrap();

    let result = timeout(Duration::from_secs(5), run)
        .await
        .expect("relay did not exit after shutdown signal")
        .unwrap();
    match result {
        Ok(()) | Err(RelayError::ChildExit(_)) => {}
        Err(other) => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_stop_is_noop_in_every_state() {
    let server = Server::new(server_config())
        .asset_source(Box::new(StaticAsset::new(stub_payload("exit 0"))));
    let stop = server.stop_handle();

    // Before run: nothing to interrupt.
    stop.stop();
    stop.stop();

    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    server.run(shutdown_rx).await.unwrap();

    // After exit: the pid slot is cleared again.
    stop.stop();
}

#[tokio::test]
async fn test_ready_resolves_once_port_bound() {
    // The listener stands in for the relay's SOCKS endpoint.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let socks_port = listener.local_addr().unwrap().port();

    let client = Client::new(client_config(socks_port))
        .asset_source(Box::new(StaticAsset::new(stub_payload(WAIT_FOR_INTERRUPT))));
    let mut ready = client.ready();
    let stop = client.stop_handle();
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let run = tokio::spawn(client.run(shutdown_rx));

    timeout(Duration::from_secs(5), ready.changed())
        .await
        .expect("readiness probe did not resolve")
        .unwrap();
    assert!(*ready.borrow());

    stop.stop();
    let _ = timeout(Duration::from_secs(5), run).await;
}

#[tokio::test]
async fn test_dial_through_mock_proxy_roundtrip() {
    let proxy_addr = spawn_socks4_echo().await;
    let dialer = Socks4Dialer::new(proxy_addr);

    // Hostname destination exercises the SOCKS4a path.
    let mut stream = dialer.dial("tcp", "example.com:80").await.unwrap();
    stream.write_all(b"ping").await.unwrap();

    let mut reply = [0u8; 4];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(&reply, b"ping");
}

#[tokio::test]
async fn test_client_dialer_matches_socks_port() {
    let client = Client::new(client_config(1080));
    assert_eq!(
        client.dialer().proxy_addr(),
        "127.0.0.1:1080".parse().unwrap()
    );
}
