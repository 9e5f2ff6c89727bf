//! SOCKS4 dial capability
//!
//! Client side of the SOCKS version 4 CONNECT handshake, used to open TCP
//! connections through the relay's local SOCKS endpoint. The SOCKS4a
//! hostname extension is supported for destinations the caller has not
//! resolved.
//!
//! # SOCKS4 CONNECT Request Format
//!
//! ```text
//! +----+----+---------+-------------------+----------+----+
//! | VN | CD | DSTPORT |       DSTIP       |  USERID  |NULL|
//! +----+----+---------+-------------------+----------+----+
//! | 1  | 1  |    2    |         4         | variable | 1  |
//! +----+----+---------+-------------------+----------+----+
//! ```
//!
//! With SOCKS4a, DSTIP is `0.0.0.1` and the hostname follows the user-id,
//! NUL terminated.

use crate::error::Socks4Error;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// SOCKS protocol version sent in requests
pub const SOCKS4_VERSION: u8 = 0x04;
/// CONNECT command
pub const SOCKS4_CMD_CONNECT: u8 = 0x01;
/// Reply code: request granted
pub const SOCKS4_REPLY_GRANTED: u8 = 90;
/// Reply code: request rejected or failed
pub const SOCKS4_REPLY_REJECTED: u8 = 91;
/// Fixed length of a SOCKS4 reply
pub const SOCKS4_REPLY_LEN: usize = 8;

/// Dialing capability bound to a SOCKS4 proxy address
///
/// Derived from a client role configuration; opens TCP connections to
/// arbitrary destinations through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Socks4Dialer {
    proxy_addr: SocketAddr,
}

impl Socks4Dialer {
    /// Create a dialer for the proxy at `proxy_addr`
    pub fn new(proxy_addr: SocketAddr) -> Self {
        Self { proxy_addr }
    }

    /// Proxy address this dialer connects through
    pub fn proxy_addr(&self) -> SocketAddr {
        self.proxy_addr
    }

    /// Open a TCP connection to `addr` ("host:port") through the proxy
    ///
    /// `network` must be `"tcp"`; SOCKS4 carries no other stream kind.
    /// On success the returned stream is connected end to end and the
    /// handshake bytes have been fully consumed.
    pub async fn dial(&self, network: &str, addr: &str) -> Result<TcpStream, Socks4Error> {
        if network != "tcp" {
            return Err(Socks4Error::UnsupportedNetwork(network.to_string()));
        }

        let (host, port) = split_host_port(addr)?;
        let request = connect_request(&host, port);

        let mut stream = TcpStream::connect(self.proxy_addr).await?;
        stream.write_all(&request).await?;
        stream.flush().await?;

        let mut reply = [0u8; SOCKS4_REPLY_LEN];
        stream.read_exact(&mut reply).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                Socks4Error::ShortReply
            } else {
                Socks4Error::Io(err)
            }
        })?;
        parse_reply(&reply)?;

        Ok(stream)
    }
}

/// Build the CONNECT request bytes for `host:port`
///
/// An IPv4 literal produces a plain SOCKS4 request; anything else produces
/// a SOCKS4a request asking the proxy to resolve the hostname.
pub fn connect_request(host: &str, port: u16) -> Vec<u8> {
    let mut request = vec![SOCKS4_VERSION, SOCKS4_CMD_CONNECT];
    request.extend_from_slice(&port.to_be_bytes());

    match host.parse::<Ipv4Addr>() {
        Ok(ip) => {
            request.extend_from_slice(&ip.octets());
            request.push(0x00);
        }
        Err(_) => {
            // SOCKS4a: the invalid destination 0.0.0.1 tells the proxy to
            // resolve the trailing hostname itself.
            request.extend_from_slice(&[0, 0, 0, 1]);
            request.push(0x00);
            request.extend_from_slice(host.as_bytes());
            request.push(0x00);
        }
    }

    request
}

/// Parse an 8-byte proxy reply
pub fn parse_reply(reply: &[u8]) -> Result<(), Socks4Error> {
    if reply.len() < SOCKS4_REPLY_LEN {
        return Err(Socks4Error::ShortReply);
    }
    if reply[0] != 0x00 {
        return Err(Socks4Error::BadVersion(reply[0]));
    }
    match reply[1] {
        SOCKS4_REPLY_GRANTED => Ok(()),
        code => Err(Socks4Error::RequestRejected(code)),
    }
}

fn split_host_port(addr: &str) -> Result<(String, u16), Socks4Error> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| Socks4Error::InvalidAddress(addr.to_string()))?;
    if host.is_empty() {
        return Err(Socks4Error::InvalidAddress(addr.to_string()));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| Socks4Error::InvalidAddress(addr.to_string()))?;
    Ok((host.to_string(), port))
}
