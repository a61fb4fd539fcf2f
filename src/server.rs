use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::{Semaphore, broadcast};
use tracing::{error, info, warn};

use crate::constants::{EDNS_UDP_SIZE, MAX_UDP_PACKET_SIZE};
use crate::dns::DNSPacket;
use crate::graceful_shutdown::GracefulShutdown;
use crate::handlers::Mux;
use crate::resolver::Truncator;

/// Binds a UDP and a TCP listener on the same address/port and dispatches
/// every request through the same [`Mux`], per spec.md §4.10.
///
/// Grounded on teacher's `run_udp_server`/`run_tcp_server` pair, trimmed of
/// the zero-copy buffer pool and the dynamic-update/AXFR special-casing
/// (both out of scope here) and rebuilt against [`DNSPacket`]/[`Mux`]
/// instead of the raw packet views and `resolver::DnsResolver` the teacher
/// used.
pub struct Server {
    mux: Arc<Mux>,
    bind_addr: SocketAddr,
    request_timeout: Duration,
    max_concurrent_udp: usize,
}

impl Server {
    pub fn new(mux: Arc<Mux>, bind_addr: SocketAddr, request_timeout: Duration) -> Self {
        Self {
            mux,
            bind_addr,
            request_timeout,
            max_concurrent_udp: 512,
        }
    }

    /// Runs both listeners until `shutdown` fires, then returns once both
    /// have stopped accepting new work.
    pub async fn run(&self, shutdown: &GracefulShutdown) -> std::io::Result<()> {
        let udp_socket = Arc::new(UdpSocket::bind(self.bind_addr).await?);
        let tcp_listener = TcpListener::bind(self.bind_addr).await?;
        info!("listening on {} (udp+tcp)", self.bind_addr);

        let udp_task = tokio::spawn(Self::run_udp(
            udp_socket,
            self.mux.clone(),
            self.request_timeout,
            self.max_concurrent_udp,
            shutdown.subscribe(),
        ));
        let tcp_task = tokio::spawn(Self::run_tcp(
            tcp_listener,
            self.mux.clone(),
            self.request_timeout,
            shutdown.subscribe(),
        ));

        let (udp_result, tcp_result) = tokio::join!(udp_task, tcp_task);
        udp_result.map_err(std::io::Error::other)?;
        tcp_result.map_err(std::io::Error::other)?;
        Ok(())
    }

    async fn run_udp(
        socket: Arc<UdpSocket>,
        mux: Arc<Mux>,
        request_timeout: Duration,
        max_concurrent: usize,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let mut buf = vec![0u8; EDNS_UDP_SIZE as usize];

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("udp listener stopping");
                    break;
                }
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, peer)) => {
                            let data = buf[..len].to_vec();
                            let socket = socket.clone();
                            let mux = mux.clone();
                            let semaphore = semaphore.clone();
                            tokio::spawn(async move {
                                let _permit = semaphore.acquire_owned().await.ok();
                                let handling = Self::handle_udp_datagram(&socket, &mux, &data, peer);
                                if tokio::time::timeout(request_timeout, handling).await.is_err() {
                                    warn!("udp request from {peer} exceeded its deadline");
                                }
                            });
                        }
                        Err(e) => error!("udp recv error: {e}"),
                    }
                }
            }
        }
    }

    async fn handle_udp_datagram(socket: &UdpSocket, mux: &Mux, data: &[u8], peer: SocketAddr) {
        let request = match DNSPacket::from_wire(data) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("dropping malformed udp query from {peer}: {e}");
                return;
            }
        };

        let mut response = mux.serve(&request).await;
        let max_size = response_bufsize(&request);
        let wire = Truncator::truncate_udp(&mut response, max_size);
        if let Err(e) = socket.send_to(&wire, peer).await {
            error!("udp send to {peer} failed: {e}");
        }
    }

    async fn run_tcp(
        listener: TcpListener,
        mux: Arc<Mux>,
        request_timeout: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("tcp listener stopping");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let mux = mux.clone();
                            tokio::spawn(async move {
                                let handling = Self::handle_tcp_connection(stream, &mux);
                                match tokio::time::timeout(request_timeout, handling).await {
                                    Ok(Ok(())) => {}
                                    Ok(Err(e)) => warn!("tcp connection from {peer} failed: {e}"),
                                    Err(_) => warn!("tcp connection from {peer} exceeded its read deadline"),
                                }
                            });
                        }
                        Err(e) => error!("tcp accept error: {e}"),
                    }
                }
            }
        }
    }

    async fn handle_tcp_connection(mut stream: TcpStream, mux: &Mux) -> std::io::Result<()> {
        let mut len_buf = [0u8; 2];
        stream.read_exact(&mut len_buf).await?;
        let len = u16::from_be_bytes(len_buf) as usize;

        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).await?;

        let request = match DNSPacket::from_wire(&buf) {
            Ok(packet) => packet,
            Err(_) => return Ok(()),
        };

        let response = mux.serve(&request).await;
        let wire = Truncator::serialize_tcp(&response);
        let len = wire.len() as u16;
        stream.write_all(&len.to_be_bytes()).await?;
        stream.write_all(&wire).await?;
        Ok(())
    }
}

/// The UDP response size budget for `request`: the client's advertised
/// EDNS0 payload size if present, else the classic 512-byte default.
fn response_bufsize(request: &DNSPacket) -> usize {
    request
        .edns()
        .map(|opt| opt.payload_size() as usize)
        .unwrap_or(MAX_UDP_PACKET_SIZE)
}
