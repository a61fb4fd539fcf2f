use bitstream_io::{BitRead, BitReader, BitWrite};

use super::{
    ParseError,
    common::PacketComponent,
    enums::{DNSResourceClass, DNSResourceType},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DNSResource {
    pub labels: Vec<String>,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub rdlength: u16,
    pub rdata: Vec<u8>,
    pub parsed_rdata: Option<String>,
    /// Raw class value, for EDNS OPT records where class carries the UDP payload size instead.
    pub raw_class: Option<u16>,
}

impl DNSResource {
    pub fn get_soa_fields(&self) -> Option<(String, String, u32, u32, u32, u32, u32)> {
        if self.rtype != DNSResourceType::SOA {
            return None;
        }

        let parsed = self.parsed_rdata.as_ref()?;
        let parts: Vec<&str> = parsed.split(' ').collect();
        if parts.len() != 7 {
            return None;
        }
        let (serial, refresh, retry, expire, minimum) = (
            parts[2].parse::<u32>().ok()?,
            parts[3].parse::<u32>().ok()?,
            parts[4].parse::<u32>().ok()?,
            parts[5].parse::<u32>().ok()?,
            parts[6].parse::<u32>().ok()?,
        );
        Some((
            parts[0].to_string(),
            parts[1].to_string(),
            serial,
            refresh,
            retry,
            expire,
            minimum,
        ))
    }

    /// Minimum TTL field of an SOA record, used as the negative-caching TTL.
    pub fn get_soa_minimum(&self) -> Option<u32> {
        self.get_soa_fields().map(|fields| fields.6)
    }

    pub fn get_srv_fields(&self) -> Option<(u16, u16, u16, String)> {
        if self.rtype != DNSResourceType::SRV {
            return None;
        }
        let parsed = self.parsed_rdata.as_ref()?;
        let parts: Vec<&str> = parsed.split(' ').collect();
        if parts.len() != 4 {
            return None;
        }
        let (priority, weight, port) = (
            parts[0].parse::<u16>().ok()?,
            parts[1].parse::<u16>().ok()?,
            parts[2].parse::<u16>().ok()?,
        );
        Some((priority, weight, port, parts[3].to_string()))
    }

    pub fn get_caa_fields(&self) -> Option<(u8, String, String)> {
        if self.rtype != DNSResourceType::CAA {
            return None;
        }
        let parsed = self.parsed_rdata.as_ref()?;
        let parts: Vec<&str> = parsed.splitn(3, ' ').collect();
        if parts.len() < 2 {
            return None;
        }
        let flags = parts[0].parse::<u8>().ok()?;
        let tag = parts[1].to_string();
        let value = parts.get(2).map(|s| s.to_string()).unwrap_or_default();
        Some((flags, tag, value))
    }

    /// Rebuilds rdata bytes from `parsed_rdata`, expanding any compression
    /// pointers that were followed on read. Falls back to the original raw
    /// bytes when there's no parsed representation or it fails to parse back.
    fn rebuild_rdata(&self) -> Result<Vec<u8>, ParseError> {
        use bitstream_io::{BigEndian, BitWriter};

        let Some(parsed) = &self.parsed_rdata else {
            return Ok(self.rdata.clone());
        };

        match self.rtype {
            DNSResourceType::MX => {
                if let Some(space_pos) = parsed.find(' ') {
                    let priority_str = &parsed[..space_pos];
                    let domain_str = &parsed[space_pos + 1..];

                    if let Ok(priority) = priority_str.parse::<u16>() {
                        let mut rdata = Vec::new();
                        let mut writer = BitWriter::<_, BigEndian>::new(&mut rdata);
                        writer.write_var::<u16>(16, priority)?;
                        let labels: Vec<String> = if domain_str.is_empty() {
                            vec![]
                        } else {
                            domain_str.split('.').map(|s| s.to_string()).collect()
                        };
                        self.write_labels(&mut writer, &labels)?;
                        return Ok(rdata);
                    }
                }
                Ok(self.rdata.clone())
            }
            DNSResourceType::NS | DNSResourceType::CNAME | DNSResourceType::PTR => {
                let mut rdata = Vec::new();
                let mut writer = BitWriter::<_, BigEndian>::new(&mut rdata);
                let labels: Vec<String> = if parsed.is_empty() {
                    vec![]
                } else {
                    parsed.split('.').map(|s| s.to_string()).collect()
                };
                self.write_labels(&mut writer, &labels)?;
                Ok(rdata)
            }
            DNSResourceType::TXT => {
                let mut rdata = Vec::new();
                let txt_parts: Vec<&str> =
                    parsed.split(' ').map(|s| s.trim_matches('"')).collect();
                for part in txt_parts {
                    if part.len() <= 255 {
                        rdata.push(part.len() as u8);
                        rdata.extend_from_slice(part.as_bytes());
                    }
                }
                Ok(rdata)
            }
            DNSResourceType::A => {
                let parts: Vec<&str> = parsed.split('.').collect();
                if parts.len() != 4 {
                    return Ok(self.rdata.clone());
                }
                let mut rdata = Vec::with_capacity(4);
                for part in parts {
                    match part.parse::<u8>() {
                        Ok(byte) => rdata.push(byte),
                        Err(_) => return Ok(self.rdata.clone()),
                    }
                }
                Ok(rdata)
            }
            DNSResourceType::AAAA => {
                let parts: Vec<&str> = parsed.split(':').collect();
                if parts.len() != 8 {
                    return Ok(self.rdata.clone());
                }
                let mut rdata = Vec::with_capacity(16);
                for part in parts {
                    match u16::from_str_radix(part, 16) {
                        Ok(word) => rdata.extend_from_slice(&word.to_be_bytes()),
                        Err(_) => return Ok(self.rdata.clone()),
                    }
                }
                Ok(rdata)
            }
            DNSResourceType::CAA => {
                let parts: Vec<&str> = parsed.splitn(3, ' ').collect();
                if parts.len() < 2 {
                    return Ok(self.rdata.clone());
                }
                let Ok(flags) = parts[0].parse::<u8>() else {
                    return Ok(self.rdata.clone());
                };
                let tag_bytes = parts[1].as_bytes();
                if tag_bytes.len() > 255 {
                    return Ok(self.rdata.clone());
                }
                let mut rdata = Vec::new();
                rdata.push(flags);
                rdata.push(tag_bytes.len() as u8);
                rdata.extend_from_slice(tag_bytes);
                if let Some(value) = parts.get(2) {
                    rdata.extend_from_slice(value.as_bytes());
                }
                Ok(rdata)
            }
            DNSResourceType::SRV => {
                let parts: Vec<&str> = parsed.split(' ').collect();
                if parts.len() != 4 {
                    return Ok(self.rdata.clone());
                }
                let (Ok(priority), Ok(weight), Ok(port)) = (
                    parts[0].parse::<u16>(),
                    parts[1].parse::<u16>(),
                    parts[2].parse::<u16>(),
                ) else {
                    return Ok(self.rdata.clone());
                };
                let mut rdata = Vec::new();
                let mut writer = BitWriter::<_, BigEndian>::new(&mut rdata);
                writer.write_var::<u16>(16, priority)?;
                writer.write_var::<u16>(16, weight)?;
                writer.write_var::<u16>(16, port)?;
                let target_labels: Vec<String> = if parts[3].is_empty() {
                    vec![]
                } else {
                    parts[3].split('.').map(|s| s.to_string()).collect()
                };
                self.write_labels(&mut writer, &target_labels)?;
                Ok(rdata)
            }
            DNSResourceType::SOA => {
                let parts: Vec<&str> = parsed.split(' ').collect();
                if parts.len() != 7 {
                    return Ok(self.rdata.clone());
                }
                let mut rdata = Vec::new();
                let mut writer = BitWriter::<_, BigEndian>::new(&mut rdata);

                let mname_labels: Vec<String> = if parts[0].is_empty() {
                    vec![]
                } else {
                    parts[0].split('.').map(|s| s.to_string()).collect()
                };
                self.write_labels(&mut writer, &mname_labels)?;

                let rname_labels: Vec<String> = if parts[1].is_empty() {
                    vec![]
                } else {
                    parts[1].split('.').map(|s| s.to_string()).collect()
                };
                self.write_labels(&mut writer, &rname_labels)?;

                let (Ok(serial), Ok(refresh), Ok(retry), Ok(expire), Ok(minimum)) = (
                    parts[2].parse::<u32>(),
                    parts[3].parse::<u32>(),
                    parts[4].parse::<u32>(),
                    parts[5].parse::<u32>(),
                    parts[6].parse::<u32>(),
                ) else {
                    return Ok(self.rdata.clone());
                };
                writer.write_var::<u32>(32, serial)?;
                writer.write_var::<u32>(32, refresh)?;
                writer.write_var::<u32>(32, retry)?;
                writer.write_var::<u32>(32, expire)?;
                writer.write_var::<u32>(32, minimum)?;
                Ok(rdata)
            }
            _ => Ok(self.rdata.clone()),
        }
    }

    /// Populates `parsed_rdata` with a human-readable rendering of `rdata`,
    /// following compression pointers into `packet_buf` where a record's
    /// rdata embeds a domain name.
    fn parse_rdata_with_compression(&mut self, packet_buf: &[u8]) -> Result<(), ParseError> {
        if self.rdata.is_empty() {
            return Ok(());
        }

        let parsed = match self.rtype {
            DNSResourceType::A => {
                if self.rdata.len() == 4 {
                    Some(format!(
                        "{}.{}.{}.{}",
                        self.rdata[0], self.rdata[1], self.rdata[2], self.rdata[3]
                    ))
                } else {
                    None
                }
            }
            DNSResourceType::AAAA => {
                if self.rdata.len() == 16 {
                    let mut ipv6_parts = Vec::new();
                    for i in (0..16).step_by(2) {
                        let part = ((self.rdata[i] as u16) << 8) | (self.rdata[i + 1] as u16);
                        ipv6_parts.push(format!("{:x}", part));
                    }
                    Some(ipv6_parts.join(":"))
                } else {
                    None
                }
            }
            DNSResourceType::MX => {
                if self.rdata.len() >= 3 {
                    let priority = ((self.rdata[0] as u16) << 8) | (self.rdata[1] as u16);
                    let domain = self.parse_embedded_name(&self.rdata[2..], packet_buf);
                    Some(format!("{} {}", priority, domain))
                } else {
                    None
                }
            }
            DNSResourceType::NS | DNSResourceType::CNAME | DNSResourceType::PTR => {
                if self.rdata.len() >= 2 && self.rdata[0] & 0xC0 == 0xC0 {
                    let pointer_val = ((self.rdata[0] as u16 & 0x3F) << 8) | (self.rdata[1] as u16);
                    if (pointer_val as usize) < packet_buf.len() {
                        let mut reader = BitReader::<_, bitstream_io::BigEndian>::new(
                            &packet_buf[pointer_val as usize..],
                        );
                        let mut temp_component = Self::default();
                        match temp_component.read_labels_with_buffer(&mut reader, Some(packet_buf))
                        {
                            Ok(labels) => Some(join_labels(&labels)),
                            Err(_) => Some("[parse_error]".to_string()),
                        }
                    } else {
                        Some("[invalid_pointer]".to_string())
                    }
                } else {
                    self.parse_simple_domain(&self.rdata).ok()
                }
            }
            DNSResourceType::TXT => {
                let mut result = Vec::new();
                let mut pos = 0;
                while pos < self.rdata.len() {
                    let len = self.rdata[pos] as usize;
                    pos += 1;
                    if pos + len > self.rdata.len() {
                        break;
                    }
                    if let Ok(text) = String::from_utf8(self.rdata[pos..pos + len].to_vec()) {
                        result.push(format!("\"{}\"", text));
                    }
                    pos += len;
                }
                if result.is_empty() {
                    None
                } else {
                    Some(result.join(" "))
                }
            }
            DNSResourceType::CAA => {
                if self.rdata.len() < 3 {
                    return Ok(());
                }
                let flags = self.rdata[0];
                let tag_length = self.rdata[1] as usize;
                if self.rdata.len() < 2 + tag_length {
                    return Ok(());
                }
                let tag = String::from_utf8(self.rdata[2..2 + tag_length].to_vec())
                    .unwrap_or_else(|_| "[invalid_tag]".to_string());
                let value = if self.rdata.len() > 2 + tag_length {
                    String::from_utf8(self.rdata[2 + tag_length..].to_vec())
                        .unwrap_or_else(|_| "[invalid_value]".to_string())
                } else {
                    String::new()
                };
                Some(format!("{} {} {}", flags, tag, value))
            }
            DNSResourceType::SRV => {
                if self.rdata.len() < 8 {
                    return Ok(());
                }
                let priority = u16::from_be_bytes([self.rdata[0], self.rdata[1]]);
                let weight = u16::from_be_bytes([self.rdata[2], self.rdata[3]]);
                let port = u16::from_be_bytes([self.rdata[4], self.rdata[5]]);
                let target = self.parse_embedded_name(&self.rdata[6..], packet_buf);
                Some(format!("{} {} {} {}", priority, weight, port, target))
            }
            DNSResourceType::SOA => {
                if self.rdata.len() < 22 {
                    return Ok(());
                }

                let mut reader = BitReader::<_, bitstream_io::BigEndian>::new(&self.rdata[..]);
                let mut temp_component = Self::default();
                let mname =
                    match temp_component.read_labels_with_buffer(&mut reader, Some(packet_buf)) {
                        Ok(labels) => join_labels(&labels),
                        Err(_) => return Ok(()),
                    };
                let rname =
                    match temp_component.read_labels_with_buffer(&mut reader, Some(packet_buf)) {
                        Ok(labels) => join_labels(&labels),
                        Err(_) => return Ok(()),
                    };

                // Re-derive the byte offset after both names by walking the
                // raw length-prefixed encoding (not via the bit reader, which
                // has no exposed position).
                let mut pos = skip_name(&self.rdata, 0);
                pos = skip_name(&self.rdata, pos);

                if self.rdata.len() < pos + 20 {
                    return Ok(());
                }
                let serial = be32(&self.rdata, pos);
                let refresh = be32(&self.rdata, pos + 4);
                let retry = be32(&self.rdata, pos + 8);
                let expire = be32(&self.rdata, pos + 12);
                let minimum = be32(&self.rdata, pos + 16);

                Some(format!(
                    "{} {} {} {} {} {} {}",
                    mname, rname, serial, refresh, retry, expire, minimum
                ))
            }
            _ => None,
        };

        self.parsed_rdata = parsed;
        Ok(())
    }

    fn parse_embedded_name(&self, data: &[u8], packet_buf: &[u8]) -> String {
        if data.is_empty() {
            return String::new();
        }
        let mut reader = BitReader::<_, bitstream_io::BigEndian>::new(data);
        let mut temp_component = Self::default();
        match temp_component.read_labels_with_buffer(&mut reader, Some(packet_buf)) {
            Ok(labels) => join_labels(&labels),
            Err(_) => self.parse_simple_domain(data).unwrap_or_default(),
        }
    }

    /// Domain name parser with no compression support, used as a fallback.
    fn parse_simple_domain(&self, data: &[u8]) -> Result<String, ParseError> {
        let mut labels = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            let len = data[pos] as usize;
            if len == 0 {
                break;
            }
            pos += 1;
            if pos + len > data.len() {
                return Err(ParseError::InvalidLabel);
            }
            let label = String::from_utf8(data[pos..pos + len].to_vec())
                .map_err(|_| ParseError::InvalidLabel)?;
            labels.push(label);
            pos += len;
        }

        Ok(labels.join("."))
    }
}

fn join_labels(labels: &[String]) -> String {
    labels
        .iter()
        .filter(|l| !l.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(".")
}

fn skip_name(data: &[u8], mut pos: usize) -> usize {
    while pos < data.len() {
        let len = data[pos];
        if len == 0 {
            return pos + 1;
        } else if len & 0xC0 == 0xC0 {
            return pos + 2;
        } else {
            pos += 1 + len as usize;
        }
    }
    pos
}

fn be32(data: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// Writes a domain name using compression pointers per RFC 1035 §4.1.4:
/// if `labels` (or a suffix of it) was already written earlier in `buf` at
/// an offset within pointer range, emit a 2-byte backreference instead of
/// repeating the labels. Every suffix written along the way is recorded so
/// a later name can point partway into this one.
pub(crate) fn write_name_compressed(
    buf: &mut Vec<u8>,
    labels: &[String],
    names: &mut std::collections::HashMap<Vec<String>, u16>,
) -> Result<(), ParseError> {
    const MAX_POINTER_OFFSET: usize = 0x3FFF;

    let significant: Vec<String> = labels.iter().take_while(|l| !l.is_empty()).cloned().collect();
    let mut remaining = significant.as_slice();

    loop {
        if remaining.is_empty() {
            buf.push(0);
            return Ok(());
        }

        if let Some(&offset) = names.get(remaining) {
            buf.push(0xC0 | (offset >> 8) as u8);
            buf.push((offset & 0xFF) as u8);
            return Ok(());
        }

        let offset = buf.len();
        if offset <= MAX_POINTER_OFFSET {
            names.entry(remaining.to_vec()).or_insert(offset as u16);
        }

        let label = &remaining[0];
        if label.len() > 63 {
            return Err(ParseError::InvalidLabel);
        }
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
        remaining = &remaining[1..];
    }
}

impl DNSResource {
    /// Writes this record directly to a byte buffer (bypassing the bit
    /// writer, which has no notion of "this offset was already written"),
    /// compressing the owner name against every name already written into
    /// `buf` this message. Rdata-embedded names are left exactly as
    /// [`Self::rebuild_rdata`] produces them.
    pub(crate) fn write_with_name_pointer(
        &self,
        buf: &mut Vec<u8>,
        names: &mut std::collections::HashMap<Vec<String>, u16>,
    ) -> Result<(), ParseError> {
        write_name_compressed(buf, &self.labels, names)?;
        buf.extend_from_slice(&u16::from(self.rtype).to_be_bytes());
        let class_value = self.raw_class.unwrap_or_else(|| self.rclass.into());
        buf.extend_from_slice(&class_value.to_be_bytes());
        buf.extend_from_slice(&self.ttl.to_be_bytes());

        let rdata_to_write = self.rebuild_rdata()?;
        buf.extend_from_slice(&(rdata_to_write.len() as u16).to_be_bytes());
        buf.extend_from_slice(&rdata_to_write);
        Ok(())
    }
}

impl PacketComponent for DNSResource {
    fn write<E: bitstream_io::Endianness>(
        &self,
        writer: &mut bitstream_io::BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        self.write_labels(writer, &self.labels)?;
        writer.write_var::<u16>(16, self.rtype.into())?;
        // OPT records stash the UDP payload size in the class field; prefer
        // the raw value when present so it round-trips untranslated.
        let class_value = self.raw_class.unwrap_or_else(|| self.rclass.into());
        writer.write_var::<u16>(16, class_value)?;
        writer.write_var::<u32>(32, self.ttl)?;

        let rdata_to_write = self.rebuild_rdata()?;
        writer.write_var::<u16>(16, rdata_to_write.len() as u16)?;
        writer.write_bytes(&rdata_to_write)?;
        Ok(())
    }

    fn read<E: bitstream_io::Endianness>(
        &mut self,
        reader: &mut bitstream_io::BitReader<&[u8], E>,
    ) -> Result<(), ParseError> {
        self.labels = self.read_labels(reader)?;
        self.rtype = reader.read_var::<u16>(16)?.into();
        let raw_class_value = reader.read_var::<u16>(16)?;
        self.rclass = raw_class_value.into();
        self.raw_class = Some(raw_class_value);
        self.ttl = reader.read_var::<u32>(32)?;
        self.rdlength = reader.read_var::<u16>(16)?;

        if self.rdlength > 0 {
            self.rdata = vec![0u8; self.rdlength as usize];
            if let Err(e) = reader.read_bytes(&mut self.rdata) {
                self.rdata = Vec::new();
                self.rdlength = 0;
                return Err(ParseError::InvalidBitStream(e.to_string()));
            }
        } else {
            self.rdata = Vec::new();
        }

        Ok(())
    }

    fn read_with_buffer<E: bitstream_io::Endianness>(
        &mut self,
        reader: &mut bitstream_io::BitReader<&[u8], E>,
        packet_buf: &[u8],
    ) -> Result<(), ParseError> {
        self.labels = self.read_labels_with_buffer(reader, Some(packet_buf))?;
        self.rtype = reader.read_var::<u16>(16)?.into();
        let raw_class_value = reader.read_var::<u16>(16)?;
        self.rclass = raw_class_value.into();
        self.raw_class = Some(raw_class_value);
        self.ttl = reader.read_var::<u32>(32)?;
        self.rdlength = reader.read_var::<u16>(16)?;

        if self.rdlength > 0 {
            self.rdata = vec![0u8; self.rdlength as usize];
            match reader.read_bytes(&mut self.rdata) {
                Ok(_) => {
                    self.parse_rdata_with_compression(packet_buf)?;
                }
                Err(e) => {
                    self.rdata = Vec::new();
                    self.rdlength = 0;
                    return Err(ParseError::InvalidBitStream(e.to_string()));
                }
            }
        } else {
            self.rdata = Vec::new();
        }

        Ok(())
    }
}
