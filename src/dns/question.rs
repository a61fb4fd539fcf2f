use bitstream_io::{BitRead, BitWrite, Endianness};

use super::{
    ParseError,
    common::PacketComponent,
    enums::{DNSResourceClass, DNSResourceType},
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSQuestion {
    pub labels: Vec<String>,
    pub qtype: DNSResourceType,
    pub qclass: DNSResourceClass,
}

impl DNSQuestion {
    pub fn name(&self) -> String {
        self.labels.join(".")
    }
}

impl PacketComponent for DNSQuestion {
    fn write<E: Endianness>(
        &self,
        writer: &mut bitstream_io::BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        self.write_labels(writer, &self.labels)?;
        writer.write_var::<u16>(16, self.qtype.into())?;
        writer.write_var::<u16>(16, self.qclass.into())?;
        Ok(())
    }

    fn read<E: Endianness>(
        &mut self,
        reader: &mut bitstream_io::BitReader<&[u8], E>,
    ) -> Result<(), ParseError> {
        self.labels = self.read_labels(reader)?;
        self.qtype = reader.read_var::<u16>(16)?.into();
        self.qclass = reader.read_var::<u16>(16)?.into();
        Ok(())
    }

    fn read_with_buffer<E: Endianness>(
        &mut self,
        reader: &mut bitstream_io::BitReader<&[u8], E>,
        packet_buf: &[u8],
    ) -> Result<(), ParseError> {
        self.labels = self.read_labels_with_buffer(reader, Some(packet_buf))?;
        self.qtype = reader.read_var::<u16>(16)?.into();
        self.qclass = reader.read_var::<u16>(16)?.into();
        Ok(())
    }
}
