#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DNSResourceType {
    #[default]
    Unknown,
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    SRV,
    OPT,
    CAA,
    ANY,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DNSResourceClass {
    #[default]
    Unknown,
    IN,
    CS,
    CH,
    HS,
}

impl From<u16> for DNSResourceClass {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceClass::IN,
            2 => DNSResourceClass::CS,
            3 => DNSResourceClass::CH,
            4 => DNSResourceClass::HS,
            _ => DNSResourceClass::Unknown,
        }
    }
}

impl From<DNSResourceClass> for u16 {
    fn from(value: DNSResourceClass) -> Self {
        match value {
            DNSResourceClass::IN => 1,
            DNSResourceClass::CS => 2,
            DNSResourceClass::CH => 3,
            DNSResourceClass::HS => 4,
            DNSResourceClass::Unknown => 0,
        }
    }
}

impl From<u16> for DNSResourceType {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceType::A,
            2 => DNSResourceType::NS,
            5 => DNSResourceType::CNAME,
            6 => DNSResourceType::SOA,
            12 => DNSResourceType::PTR,
            15 => DNSResourceType::MX,
            16 => DNSResourceType::TXT,
            28 => DNSResourceType::AAAA,
            33 => DNSResourceType::SRV,
            41 => DNSResourceType::OPT,
            255 => DNSResourceType::ANY,
            257 => DNSResourceType::CAA,
            _ => DNSResourceType::Unknown,
        }
    }
}

impl From<DNSResourceType> for u16 {
    fn from(value: DNSResourceType) -> Self {
        match value {
            DNSResourceType::A => 1,
            DNSResourceType::NS => 2,
            DNSResourceType::CNAME => 5,
            DNSResourceType::SOA => 6,
            DNSResourceType::PTR => 12,
            DNSResourceType::MX => 15,
            DNSResourceType::TXT => 16,
            DNSResourceType::AAAA => 28,
            DNSResourceType::SRV => 33,
            DNSResourceType::OPT => 41,
            DNSResourceType::CAA => 257,
            DNSResourceType::ANY => 255,
            DNSResourceType::Unknown => 0,
        }
    }
}

/// DNS Response Codes (RCODEs) as defined in RFC 1035 and subsequent RFCs
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResponseCode {
    NoError = 0,
    FormatError = 1,
    ServerFailure = 2,
    NameError = 3, // NXDOMAIN
    NotImplemented = 4,
    Refused = 5,
    YXDomain = 6,
    YXRRSet = 7,
    NXRRSet = 8,
    NotAuth = 9,
    NotZone = 10,
    BadOptVersion = 16,
}

impl ResponseCode {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            6 => ResponseCode::YXDomain,
            7 => ResponseCode::YXRRSet,
            8 => ResponseCode::NXRRSet,
            9 => ResponseCode::NotAuth,
            10 => ResponseCode::NotZone,
            16 => ResponseCode::BadOptVersion,
            _ => ResponseCode::ServerFailure,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ResponseCode::NoError)
    }

    /// NXDOMAIN responses are negatively cached; everything else is not.
    pub fn is_cacheable_error(self) -> bool {
        matches!(self, ResponseCode::NameError)
    }

    pub fn description(self) -> &'static str {
        match self {
            ResponseCode::NoError => "No error",
            ResponseCode::FormatError => "Format error",
            ResponseCode::ServerFailure => "Server failure",
            ResponseCode::NameError => "Name error (NXDOMAIN)",
            ResponseCode::NotImplemented => "Not implemented",
            ResponseCode::Refused => "Refused",
            ResponseCode::YXDomain => "Name exists when it should not",
            ResponseCode::YXRRSet => "RR Set exists when it should not",
            ResponseCode::NXRRSet => "RR Set that should exist does not",
            ResponseCode::NotAuth => "Server not authoritative for zone",
            ResponseCode::NotZone => "Name not contained in zone",
            ResponseCode::BadOptVersion => "Bad OPT Version",
        }
    }
}

/// DNS Opcodes as defined in RFC 1035 and subsequent RFCs
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DnsOpcode {
    Query = 0,
    IQuery = 1,
    Status = 2,
    Unassigned3 = 3,
    Notify = 4,
    Update = 5,
    DSO = 6,
}

impl DnsOpcode {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DnsOpcode::Query),
            1 => Some(DnsOpcode::IQuery),
            2 => Some(DnsOpcode::Status),
            3 => Some(DnsOpcode::Unassigned3),
            4 => Some(DnsOpcode::Notify),
            5 => Some(DnsOpcode::Update),
            6 => Some(DnsOpcode::DSO),
            _ => None,
        }
    }

    /// Only QUERY is served; everything else gets NOTIMP.
    pub fn is_implemented(self) -> bool {
        matches!(self, DnsOpcode::Query)
    }

    pub fn description(self) -> &'static str {
        match self {
            DnsOpcode::Query => "Standard query",
            DnsOpcode::IQuery => "Inverse query (obsolete)",
            DnsOpcode::Status => "Server status request",
            DnsOpcode::Unassigned3 => "Unassigned",
            DnsOpcode::Notify => "Zone change notification",
            DnsOpcode::Update => "Dynamic DNS update",
            DnsOpcode::DSO => "DNS Stateful Operations",
        }
    }
}
