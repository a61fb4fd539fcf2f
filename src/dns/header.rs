use bitstream_io::{BitRead, BitWrite, Endianness};

use super::{
    ParseError,
    common::PacketComponent,
    enums::{DnsOpcode, ResponseCode},
};

/// The fixed 12-byte DNS message header (RFC 1035 §4.1.1).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSHeader {
    pub id: u16,
    pub qr: bool,
    pub opcode: u8,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: bool,
    pub ad: bool,
    pub cd: bool,
    pub rcode: u8,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl DNSHeader {
    pub fn opcode(&self) -> Option<DnsOpcode> {
        DnsOpcode::from_u8(self.opcode)
    }

    pub fn response_code(&self) -> ResponseCode {
        ResponseCode::from_u8(self.rcode)
    }

    pub fn set_response_code(&mut self, code: ResponseCode) {
        self.rcode = code.to_u8();
    }
}

impl PacketComponent for DNSHeader {
    fn write<E: Endianness>(
        &self,
        writer: &mut bitstream_io::BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        writer.write_var::<u16>(16, self.id)?;
        writer.write_bit(self.qr)?;
        writer.write_var::<u8>(4, self.opcode)?;
        writer.write_bit(self.aa)?;
        writer.write_bit(self.tc)?;
        writer.write_bit(self.rd)?;
        writer.write_bit(self.ra)?;
        writer.write_bit(self.z)?;
        writer.write_bit(self.ad)?;
        writer.write_bit(self.cd)?;
        writer.write_var::<u8>(4, self.rcode)?;
        writer.write_var::<u16>(16, self.qdcount)?;
        writer.write_var::<u16>(16, self.ancount)?;
        writer.write_var::<u16>(16, self.nscount)?;
        writer.write_var::<u16>(16, self.arcount)?;
        Ok(())
    }

    fn read<E: Endianness>(
        &mut self,
        reader: &mut bitstream_io::BitReader<&[u8], E>,
    ) -> Result<(), ParseError> {
        self.id = reader.read_var::<u16>(16)?;
        self.qr = reader.read_bit()?;
        self.opcode = reader.read_var::<u8>(4)?;
        self.aa = reader.read_bit()?;
        self.tc = reader.read_bit()?;
        self.rd = reader.read_bit()?;
        self.ra = reader.read_bit()?;
        self.z = reader.read_bit()?;
        self.ad = reader.read_bit()?;
        self.cd = reader.read_bit()?;
        self.rcode = reader.read_var::<u8>(4)?;
        self.qdcount = reader.read_var::<u16>(16)?;
        self.ancount = reader.read_var::<u16>(16)?;
        self.nscount = reader.read_var::<u16>(16)?;
        self.arcount = reader.read_var::<u16>(16)?;
        Ok(())
    }
}
