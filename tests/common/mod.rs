use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

use janus_dns::dns::{
    DNSHeader, DNSPacket, DNSQuestion, DNSResource, DNSResourceClass, DNSResourceType, ResponseCode,
};
use janus_dns::records::Record;

pub fn record_with_group(id: &str, group: &str, ip: &str) -> Record {
    Record {
        id: id.into(),
        group_ids: vec![],
        instance_group: group.into(),
        az: "z1".into(),
        az_id: "1".into(),
        network: "default".into(),
        deployment: "cf".into(),
        ip: ip.parse().unwrap(),
        domain: "bosh.".into(),
        agent_id: None,
    }
}

pub fn dns_query(name: &str, qtype: DNSResourceType) -> DNSPacket {
    DNSPacket {
        header: DNSHeader {
            rd: true,
            ..Default::default()
        },
        questions: vec![DNSQuestion {
            labels: name.split('.').map(String::from).collect(),
            qtype,
            qclass: DNSResourceClass::IN,
        }],
        answers: Vec::new(),
        authorities: Vec::new(),
        additional: Vec::new(),
    }
}

pub fn a_query(name: &str) -> DNSPacket {
    dns_query(name, DNSResourceType::A)
}

/// Binds a UDP socket and never answers anything sent to it — used to
/// simulate a recursor that's timing out on every query, without tripping
/// a connection-refused error the way an unbound port would.
pub async fn spawn_silent_recursor() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            if socket.recv_from(&mut buf).await.is_err() {
                return;
            }
        }
    });
    addr
}

/// Binds a UDP socket that answers every query with a single A record for
/// `answer_ip`, echoing the question back.
pub async fn spawn_answering_recursor(answer_ip: std::net::Ipv4Addr) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 512];
        loop {
            let (len, peer) = match socket.recv_from(&mut buf).await {
                Ok(v) => v,
                Err(_) => return,
            };
            let request = match DNSPacket::from_wire(&buf[..len]) {
                Ok(p) => p,
                Err(_) => continue,
            };
            let question = request.questions[0].clone();
            let mut header = DNSHeader {
                id: request.header.id,
                qr: true,
                ra: true,
                ..Default::default()
            };
            header.set_response_code(ResponseCode::NoError);
            let response = DNSPacket {
                header,
                questions: vec![question.clone()],
                answers: vec![DNSResource {
                    labels: question.labels.clone(),
                    rtype: DNSResourceType::A,
                    rclass: DNSResourceClass::IN,
                    ttl: 60,
                    rdlength: 4,
                    rdata: answer_ip.octets().to_vec(),
                    parsed_rdata: Some(answer_ip.to_string()),
                    raw_class: None,
                }],
                authorities: Vec::new(),
                additional: Vec::new(),
            };
            let wire = response.to_wire().unwrap();
            let _ = socket.send_to(&wire, peer).await;
        }
    });
    addr
}

/// Binds a UDP socket that answers every query with NXDOMAIN and a single
/// SOA authority record, and counts how many queries it has seen.
pub async fn spawn_nxdomain_recursor() -> (SocketAddr, Arc<AtomicUsize>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 512];
        loop {
            let (len, peer) = match socket.recv_from(&mut buf).await {
                Ok(v) => v,
                Err(_) => return,
            };
            hits_clone.fetch_add(1, Ordering::SeqCst);
            let request = match DNSPacket::from_wire(&buf[..len]) {
                Ok(p) => p,
                Err(_) => continue,
            };
            let question = request.questions[0].clone();
            let mut header = DNSHeader {
                id: request.header.id,
                qr: true,
                ra: true,
                ..Default::default()
            };
            header.set_response_code(ResponseCode::NameError);
            let response = DNSPacket {
                header,
                questions: vec![question.clone()],
                answers: Vec::new(),
                authorities: vec![DNSResource {
                    labels: question.labels.clone(),
                    rtype: DNSResourceType::SOA,
                    rclass: DNSResourceClass::IN,
                    ttl: 120,
                    rdlength: 0,
                    rdata: Vec::new(),
                    parsed_rdata: Some(
                        "ns1.example.com. hostmaster.example.com. 1 7200 3600 1209600 120".into(),
                    ),
                    raw_class: None,
                }],
                additional: Vec::new(),
            };
            let wire = response.to_wire().unwrap();
            let _ = socket.send_to(&wire, peer).await;
        }
    });
    (addr, hits)
}

/// Binds a TCP listener that answers every HTTP request with a fixed JSON
/// body, for exercising [`janus_dns::handlers::HttpJsonHandler`] without a
/// real backend.
pub async fn spawn_fake_http_backend(body: String) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(v) => v,
                Err(_) => return,
            };
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let mut total = 0;
                loop {
                    match stream.read(&mut buf[total..]).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => {
                            total += n;
                            if buf[..total].windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}
