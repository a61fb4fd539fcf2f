use crate::dns::enums::ResponseCode;

pub type Result<T> = std::result::Result<T, DnsError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid upstream server: {0}")]
    InvalidUpstreamServer(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("parse error: {0}")]
    ParseError(String),
}

/// Crate-wide error type. Every handler converts whatever it encounters into
/// one of these before it reaches the response-assembly boundary; no error
/// escapes unconverted. Each variant maps onto exactly one RCODE/behavior:
/// `InvalidQuery` -> FORMERR, `UnknownZone` -> REFUSED, `NXDomain` ->
/// NXDOMAIN, `NetworkError` -> retried then SERVFAIL, `ProtocolError` ->
/// SERVFAIL without retry, `Timeout` -> SERVFAIL with TC=0, `InternalError`
/// -> SERVFAIL, logged.
#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("no zone configured for this query")]
    UnknownZone,
    #[error("name does not exist")]
    NXDomain,
    #[error("network error talking to upstream: {0}")]
    NetworkError(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    ProtocolError(String),
    #[error("operation timed out")]
    Timeout,
    #[error("internal error: {0}")]
    InternalError(String),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("no recursor produced a response")]
    NoRecursorResponse,
}

impl DnsError {
    /// The RCODE a handler should answer with for this error, per the
    /// error-handling design: every error maps onto one response code and
    /// none of them ever panics the request task.
    pub fn response_code(&self) -> ResponseCode {
        match self {
            DnsError::InvalidQuery(_) => ResponseCode::FormatError,
            DnsError::UnknownZone => ResponseCode::Refused,
            DnsError::NXDomain => ResponseCode::NameError,
            DnsError::NetworkError(_)
            | DnsError::ProtocolError(_)
            | DnsError::Timeout
            | DnsError::InternalError(_)
            | DnsError::Config(_)
            | DnsError::NoRecursorResponse => ResponseCode::ServerFailure,
        }
    }

    /// Whether the recursor pool should retry the next upstream on this
    /// error. Only network-level failures are retryable; anything else
    /// (including a malformed response) aborts the call, per the
    /// intentionally-preserved serial-pool failover behavior.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DnsError::NetworkError(_) | DnsError::Timeout)
    }
}
