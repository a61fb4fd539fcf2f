mod discovery;
mod http_json;
mod logger;
mod recursive;

pub use discovery::DiscoveryHandler;
pub use http_json::HttpJsonHandler;
pub use logger::RequestLoggerHandler;
pub use recursive::RecursiveHandler;

use std::sync::Arc;

use async_trait::async_trait;

use crate::dns::{DNSHeader, DNSPacket, DNSQuestion, ResponseCode};

/// Anything that can turn a parsed DNS request into a response message.
///
/// Grounded on teacher's `dns::Handler` trait, which played the same role
/// (one `serve` entry point, `Arc<dyn Handler>` stored by the mux and the
/// decorators); the sync `dns::Handler::handle` signature there is made
/// async here since every concrete handler in this crate awaits network I/O.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn serve(&self, request: &DNSPacket) -> DNSPacket;
}

/// Builds a bare response carrying no answers, the given RCODE, and the
/// request's ID. Used by handlers when they have nothing more specific to
/// say (empty question list, a parse failure turned into FORMERR, etc).
/// `aa` should be true for authoritative (discovery) zones and false for
/// anything forwarded through the recursor pool.
pub(crate) fn empty_response(request: &DNSPacket, question: Option<&DNSQuestion>, rcode: ResponseCode) -> DNSPacket {
    authoritative_empty_response(request, question, rcode, true)
}

pub(crate) fn authoritative_empty_response(
    request: &DNSPacket,
    question: Option<&DNSQuestion>,
    rcode: ResponseCode,
    aa: bool,
) -> DNSPacket {
    let mut header = DNSHeader {
        qr: true,
        aa,
        ra: true,
        id: request.header.id,
        ..Default::default()
    };
    header.set_response_code(rcode);
    DNSPacket {
        header,
        questions: question.cloned().into_iter().collect(),
        answers: Vec::new(),
        authorities: Vec::new(),
        additional: Vec::new(),
    }
}

/// Zone-prefix router: dispatches each request to the registered handler
/// whose zone suffix is the longest match for the question name, falling
/// back to the recursive handler otherwise (spec.md §4.1).
///
/// Grounded on teacher's `dns::Handler` zone-suffix match loop in
/// `resolver.rs`'s query routing, generalized from "BIND zone vs
/// forwarder" to an arbitrary list of registered zones.
pub struct Mux {
    zones: Vec<(String, Arc<dyn Handler>)>,
    fallback: Arc<dyn Handler>,
}

impl Mux {
    pub fn new(fallback: Arc<dyn Handler>) -> Self {
        Self {
            zones: Vec::new(),
            fallback,
        }
    }

    /// Installs `handler` for every name whose lowercased form ends in
    /// `zone_suffix`.
    pub fn register(&mut self, zone_suffix: &str, handler: Arc<dyn Handler>) {
        self.zones.push((zone_suffix.to_ascii_lowercase(), handler));
    }

    fn handler_for(&self, name: &str) -> &Arc<dyn Handler> {
        let lower = name.to_ascii_lowercase();
        self.zones
            .iter()
            .filter(|(suffix, _)| lower.ends_with(suffix.as_str()))
            .max_by_key(|(suffix, _)| suffix.len())
            .map(|(_, handler)| handler)
            .unwrap_or(&self.fallback)
    }

    /// Routes `request` to a handler and returns its response, with the
    /// question section replaced by the request's own questions verbatim
    /// (byte-for-byte, including case) regardless of what the handler did
    /// with them internally.
    pub async fn serve(&self, request: &DNSPacket) -> DNSPacket {
        if request.questions.is_empty() {
            return empty_response(request, None, ResponseCode::NoError);
        }

        let question = &request.questions[0];
        let handler = self.handler_for(&question.name());
        let mut response = handler.serve(request).await;

        response.header.id = request.header.id;
        response.header.qr = true;
        response.questions = request.questions.clone();
        response
    }
}
