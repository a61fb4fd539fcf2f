use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

use crate::dns::DNSPacket;
use crate::error::DnsError;

/// Sends a query to a single upstream and returns its response, following
/// the standard UDP-first-then-TCP-on-truncation exchange (spec.md §4.5).
///
/// Grounded on the plain `net.Dial`-per-exchange style of the original
/// recursor pool (no persistent connection pooling there either) and on
/// teacher's `tokio::net` usage elsewhere in the tree.
pub struct ExchangeClient {
    timeout: Duration,
}

impl ExchangeClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn exchange(
        &self,
        query: &DNSPacket,
        recursor: SocketAddr,
    ) -> Result<DNSPacket, DnsError> {
        let wire = query
            .to_wire()
            .map_err(|e| DnsError::ProtocolError(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.exchange_udp(&wire, recursor))
            .await
            .map_err(|_| DnsError::Timeout)??;

        if response.header.tc {
            return tokio::time::timeout(self.timeout, self.exchange_tcp(&wire, recursor))
                .await
                .map_err(|_| DnsError::Timeout)?;
        }

        Ok(response)
    }

    async fn exchange_udp(&self, wire: &[u8], recursor: SocketAddr) -> Result<DNSPacket, DnsError> {
        let local_addr = if recursor.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket = UdpSocket::bind(local_addr).await?;
        socket.connect(recursor).await?;
        socket.send(wire).await?;

        let mut buf = vec![0u8; 4096];
        let len = socket.recv(&mut buf).await?;
        DNSPacket::from_wire(&buf[..len]).map_err(|e| DnsError::ProtocolError(e.to_string()))
    }

    async fn exchange_tcp(&self, wire: &[u8], recursor: SocketAddr) -> Result<DNSPacket, DnsError> {
        let mut stream = TcpStream::connect(recursor).await?;
        let len = wire.len() as u16;
        stream.write_all(&len.to_be_bytes()).await?;
        stream.write_all(wire).await?;

        let mut len_buf = [0u8; 2];
        stream.read_exact(&mut len_buf).await?;
        let response_len = u16::from_be_bytes(len_buf) as usize;

        let mut response_buf = vec![0u8; response_len];
        stream.read_exact(&mut response_buf).await?;
        DNSPacket::from_wire(&response_buf).map_err(|e| DnsError::ProtocolError(e.to_string()))
    }
}
