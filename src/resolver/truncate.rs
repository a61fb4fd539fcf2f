use crate::dns::{DNSPacket, DNSResourceType};

/// Enforces the UDP message-size limit per spec.md §4.9. TCP responses are
/// never truncated.
///
/// Grounded on teacher's response-size handling, which trimmed answer RRs
/// from the tail until a response fit a target size; generalized here to
/// try name compression before dropping anything, to fall back to dropping
/// non-OPT additional records when trimming every answer still isn't
/// enough, and to always set TC once any trimming happened at all.
pub struct Truncator;

impl Truncator {
    pub fn serialize_tcp(packet: &DNSPacket) -> Vec<u8> {
        packet.to_wire_compressed().unwrap_or_default()
    }

    /// Serializes `packet` for a UDP response. First tries name compression
    /// alone (spec.md §4.9 step 1) — a response that only exceeds
    /// `max_size` uncompressed is sent whole once compression closes the
    /// gap, with no trimming and no TC. Only once the compressed form still
    /// doesn't fit does this drop answers (and, if still too big, non-OPT
    /// additional records) from the tail until it does, setting TC.
    pub fn truncate_udp(packet: &mut DNSPacket, max_size: usize) -> Vec<u8> {
        let wire = packet.to_wire_compressed().unwrap_or_default();
        if wire.len() <= max_size {
            return wire;
        }

        while !packet.answers.is_empty() {
            packet.answers.pop();
            let wire = packet.to_wire_compressed().unwrap_or_default();
            if wire.len() <= max_size {
                packet.header.tc = true;
                return wire;
            }
        }

        while let Some(pos) = packet
            .additional
            .iter()
            .position(|r| r.rtype != DNSResourceType::OPT)
        {
            packet.additional.remove(pos);
            let wire = packet.to_wire_compressed().unwrap_or_default();
            if wire.len() <= max_size {
                packet.header.tc = true;
                return wire;
            }
        }

        packet.header.tc = true;
        packet.to_wire_compressed().unwrap_or_default()
    }
}
