//! Test utilities for Udtgate integration tests
//!
//! The relay binary is a black box, so these tests supervise a small
//! shell stub standing in for it and speak SOCKS4 to a mock proxy.

use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use udtgate::asset::{AssetSource, RELAY_ASSET};
use udtgate::error::RelayError;

/// Shell stub standing in for the relay binary
pub fn stub_payload(script: &str) -> Vec<u8> {
    format!("#!/bin/sh\n{}\n", script).into_bytes()
}

/// Asset source serving a fixed payload
pub struct StaticAsset(Vec<u8>);

impl StaticAsset {
    /// Create a source serving `payload` as the relay asset
    pub fn new(payload: Vec<u8>) -> Self {
        Self(payload)
    }
}

impl AssetSource for StaticAsset {
    fn asset(&self, name: &str) -> Result<Vec<u8>, RelayError> {
        if name == RELAY_ASSET {
            Ok(self.0.clone())
        } else {
            Err(RelayError::AssetUnavailable {
                name: name.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "unknown asset"),
            })
        }
    }
}

/// Asset source that always fails
pub struct FailingAsset;

impl AssetSource for FailingAsset {
    fn asset(&self, name: &str) -> Result<Vec<u8>, RelayError> {
        Err(RelayError::AssetUnavailable {
            name: name.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "payload withheld"),
        })
    }
}

async fn read_nul_terminated(stream: &mut TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        stream.read_exact(&mut byte).await.unwrap();
        if byte[0] == 0 {
            break;
        }
        out.push(byte[0]);
    }
    out
}

/// Spawn a minimal SOCKS4/SOCKS4a proxy that grants one CONNECT and then
/// echoes everything back on the same stream
pub async fn spawn_socks4_echo() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut head = [0u8; 8];
        stream.read_exact(&mut head).await.unwrap();
        assert_eq!(head[0], 0x04);
        assert_eq!(head[1], 0x01);
        let _userid = read_nul_terminated(&mut stream).await;
        // SOCKS4a marker address 0.0.0.x carries a trailing hostname
        if head[4] == 0 && head[5] == 0 && head[6] == 0 && head[7] != 0 {
            let _hostname = read_nul_terminated(&mut stream).await;
        }

        stream
            .write_all(&[0x00, 90, 0, 0, 0, 0, 0, 0])
            .await
            .unwrap();

        let mut buf = [0u8; 1024];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if stream.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    addr
}
