use bitstream_io::{BigEndian, BitReader, BitWriter};

use super::{
    ParseError,
    common::PacketComponent,
    edns::EdnsOpt,
    enums::{DNSResourceClass, DNSResourceType},
    header::DNSHeader,
    question::DNSQuestion,
    resource::DNSResource,
};

/// A full DNS message: header, question section, and the three resource
/// record sections (answer/authority/additional).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSPacket {
    pub header: DNSHeader,
    pub questions: Vec<DNSQuestion>,
    pub answers: Vec<DNSResource>,
    pub authorities: Vec<DNSResource>,
    pub additional: Vec<DNSResource>,
}

impl DNSPacket {
    pub fn to_wire(&self) -> Result<Vec<u8>, ParseError> {
        let mut header = self.header.clone();
        header.qdcount = self.questions.len() as u16;
        header.ancount = self.answers.len() as u16;
        header.nscount = self.authorities.len() as u16;
        header.arcount = self.additional.len() as u16;

        let mut buf = Vec::new();
        let mut writer = BitWriter::<_, BigEndian>::new(&mut buf);
        header.write(&mut writer)?;
        for question in &self.questions {
            question.write(&mut writer)?;
        }
        for record in self
            .answers
            .iter()
            .chain(self.authorities.iter())
            .chain(self.additional.iter())
        {
            record.write(&mut writer)?;
        }
        drop(writer);
        Ok(buf)
    }

    /// Serializes with name compression: any owner name that repeats (or
    /// shares a suffix with) one already written earlier in the message is
    /// replaced with a 2-byte pointer per RFC 1035 §4.1.4. Decodes back to
    /// an identical [`DNSPacket`] via [`Self::from_wire`], which already
    /// follows compression pointers.
    pub fn to_wire_compressed(&self) -> Result<Vec<u8>, ParseError> {
        let mut header = self.header.clone();
        header.qdcount = self.questions.len() as u16;
        header.ancount = self.answers.len() as u16;
        header.nscount = self.authorities.len() as u16;
        header.arcount = self.additional.len() as u16;

        let mut buf = Vec::new();
        {
            let mut writer = BitWriter::<_, BigEndian>::new(&mut buf);
            header.write(&mut writer)?;
        }

        let mut names = std::collections::HashMap::new();
        for question in &self.questions {
            super::resource::write_name_compressed(&mut buf, &question.labels, &mut names)?;
            buf.extend_from_slice(&u16::from(question.qtype).to_be_bytes());
            buf.extend_from_slice(&u16::from(question.qclass).to_be_bytes());
        }
        for record in self
            .answers
            .iter()
            .chain(self.authorities.iter())
            .chain(self.additional.iter())
        {
            record.write_with_name_pointer(&mut buf, &mut names)?;
        }
        Ok(buf)
    }

    pub fn from_wire(buf: &[u8]) -> Result<Self, ParseError> {
        let mut reader = BitReader::<_, BigEndian>::new(buf);

        let mut header = DNSHeader::default();
        header.read(&mut reader)?;

        let mut questions = Vec::with_capacity(header.qdcount as usize);
        for _ in 0..header.qdcount {
            let mut question = DNSQuestion::default();
            question.read_with_buffer(&mut reader, buf)?;
            questions.push(question);
        }

        let mut answers = Vec::with_capacity(header.ancount as usize);
        for _ in 0..header.ancount {
            let mut record = DNSResource::default();
            record.read_with_buffer(&mut reader, buf)?;
            answers.push(record);
        }

        let mut authorities = Vec::with_capacity(header.nscount as usize);
        for _ in 0..header.nscount {
            let mut record = DNSResource::default();
            record.read_with_buffer(&mut reader, buf)?;
            authorities.push(record);
        }

        let mut additional = Vec::with_capacity(header.arcount as usize);
        for _ in 0..header.arcount {
            let mut record = DNSResource::default();
            record.read_with_buffer(&mut reader, buf)?;
            additional.push(record);
        }

        Ok(DNSPacket {
            header,
            questions,
            answers,
            authorities,
            additional,
        })
    }

    /// The EDNS0 OPT pseudo-record from the additional section, if present.
    pub fn edns(&self) -> Option<EdnsOpt> {
        let opt = self
            .additional
            .iter()
            .find(|r| r.rtype == DNSResourceType::OPT)?;
        let class = opt.raw_class.unwrap_or(0);
        EdnsOpt::parse_from_resource(class, opt.ttl, &opt.rdata).ok()
    }

    /// Replaces any existing OPT record in the additional section with one
    /// built from `edns`.
    pub fn set_edns(&mut self, edns: &EdnsOpt) {
        self.additional
            .retain(|r| r.rtype != DNSResourceType::OPT);
        let (class, ttl, rdata) = edns.to_resource_format();
        self.additional.push(DNSResource {
            labels: Vec::new(),
            rtype: DNSResourceType::OPT,
            rclass: DNSResourceClass::Unknown,
            ttl,
            rdlength: rdata.len() as u16,
            rdata,
            parsed_rdata: None,
            raw_class: Some(class),
        });
    }

    pub fn question(&self) -> Option<&DNSQuestion> {
        self.questions.first()
    }
}
