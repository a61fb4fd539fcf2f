pub mod common;
pub mod edns;
pub mod enums;
pub mod header;
pub mod packet;
pub mod question;
pub mod resource;

pub use common::PacketComponent;
pub use edns::{EdnsOpt, EdnsOption, EdnsOptionCode};
pub use enums::{DNSResourceClass, DNSResourceType, DnsOpcode, ResponseCode};
pub use header::DNSHeader;
pub use packet::DNSPacket;
pub use question::DNSQuestion;
pub use resource::DNSResource;

/// Errors raised while decoding or encoding the DNS wire format.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid label in domain name")]
    InvalidLabel,
    #[error("invalid bit stream: {0}")]
    InvalidBitStream(String),
}

impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        ParseError::InvalidBitStream(err.to_string())
    }
}
