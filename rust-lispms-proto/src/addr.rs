//! LISP address types and their wire encoding.
//!
//! Addresses are a closed tagged union: simple AFI-tagged addresses plus one
//! recursive composite variant for LCAF (RFC 8060) addresses. Encoding and
//! decoding live as methods on the types; decoding always fails with
//! [`Error::MalformedPacket`] on truncated or unknown input.

use crate::error::Error;
use crate::wire::{self, get_bytes, get_u16, get_u32, get_u8, need, skip};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// A LISP address: either a simple AFI-tagged address or a composite LCAF
/// address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LispAddr {
    /// AFI 0, used for empty source EIDs in Map-Requests.
    NoAddress,
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Mac([u8; 6]),
    DistinguishedName(String),
    AsNumber(u32),
    Lcaf(LcafAddr),
}

/// The composite (LCAF) address kinds used by the mapping service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LcafAddr {
    /// A flat list of simple addresses.
    AfiList(Vec<LispAddr>),
    /// An address scoped to a virtual network instance.
    InstanceId { iid: u32, address: Box<LispAddr> },
    /// A (source prefix, destination prefix) pair.
    SourceDest {
        src: Box<LispAddr>,
        src_mask: u8,
        dst: Box<LispAddr>,
        dst_mask: u8,
    },
    /// A generic key/value address pair.
    KeyValue {
        key: Box<LispAddr>,
        value: Box<LispAddr>,
    },
    /// An address qualified by IP TOS, protocol and port ranges.
    ApplicationData {
        ip_tos: u32,
        protocol: u8,
        local_port_low: u16,
        local_port_high: u16,
        remote_port_low: u16,
        remote_port_high: u16,
        address: Box<LispAddr>,
    },
    /// An explicit locator path: an ordered list of forwarding hops.
    ExplicitLocatorPath(Vec<ElpHop>),
}

/// One hop of an explicit locator path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElpHop {
    pub lookup: bool,
    pub rloc_probe: bool,
    pub strict: bool,
    pub address: LispAddr,
}

const ELP_HOP_LOOKUP: u16 = 0x04;
const ELP_HOP_RLOC_PROBE: u16 = 0x02;
const ELP_HOP_STRICT: u16 = 0x01;

impl LispAddr {
    /// Number of bytes this address occupies on the wire, AFI included.
    pub fn wire_size(&self) -> usize {
        2 + match self {
            LispAddr::NoAddress => 0,
            LispAddr::Ipv4(_) => 4,
            LispAddr::Ipv6(_) => 16,
            LispAddr::Mac(_) => 6,
            // ASCII bytes plus a terminating NUL
            LispAddr::DistinguishedName(name) => name.len() + 1,
            LispAddr::AsNumber(_) => 4,
            LispAddr::Lcaf(lcaf) => wire::LCAF_HEADER_LEN + lcaf.payload_size(),
        }
    }

    /// Encode this address, AFI first.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            LispAddr::NoAddress => buf.put_u16(wire::AFI_NO_ADDRESS),
            LispAddr::Ipv4(ip) => {
                buf.put_u16(wire::AFI_IPV4);
                buf.put_slice(&ip.octets());
            }
            LispAddr::Ipv6(ip) => {
                buf.put_u16(wire::AFI_IPV6);
                buf.put_slice(&ip.octets());
            }
            LispAddr::Mac(mac) => {
                buf.put_u16(wire::AFI_MAC);
                buf.put_slice(mac);
            }
            LispAddr::DistinguishedName(name) => {
                buf.put_u16(wire::AFI_DISTINGUISHED_NAME);
                buf.put_slice(name.as_bytes());
                buf.put_u8(0);
            }
            LispAddr::AsNumber(asn) => {
                buf.put_u16(wire::AFI_AS_NUMBER);
                buf.put_u32(*asn);
            }
            LispAddr::Lcaf(lcaf) => {
                buf.put_u16(wire::AFI_LCAF);
                lcaf.encode(buf);
            }
        }
    }

    /// Decode one address starting at the AFI field.
    pub fn decode(buf: &mut Bytes) -> Result<Self, Error> {
        let afi = get_u16(buf, "address AFI")?;
        match afi {
            wire::AFI_NO_ADDRESS => Ok(LispAddr::NoAddress),
            wire::AFI_IPV4 => {
                let octets = get_bytes(buf, 4, "IPv4 address")?;
                Ok(LispAddr::Ipv4(Ipv4Addr::new(
                    octets[0], octets[1], octets[2], octets[3],
                )))
            }
            wire::AFI_IPV6 => {
                let octets = get_bytes(buf, 16, "IPv6 address")?;
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(&octets);
                Ok(LispAddr::Ipv6(Ipv6Addr::from(bytes)))
            }
            wire::AFI_MAC => {
                let octets = get_bytes(buf, 6, "MAC address")?;
                let mut mac = [0u8; 6];
                mac.copy_from_slice(&octets);
                Ok(LispAddr::Mac(mac))
            }
            wire::AFI_DISTINGUISHED_NAME => {
                let mut name = Vec::new();
                loop {
                    let byte = get_u8(buf, "distinguished name")?;
                    if byte == 0 {
                        break;
                    }
                    name.push(byte);
                }
                String::from_utf8(name)
                    .map(LispAddr::DistinguishedName)
                    .map_err(|_| {
                        Error::MalformedPacket("distinguished name is not valid UTF-8".into())
                    })
            }
            wire::AFI_AS_NUMBER => Ok(LispAddr::AsNumber(get_u32(buf, "AS number")?)),
            wire::AFI_LCAF => Ok(LispAddr::Lcaf(LcafAddr::decode(buf)?)),
            other => {
                debug!("rejecting unknown address family {}", other);
                Err(Error::MalformedPacket(format!(
                    "unknown address family {}",
                    other
                )))
            }
        }
    }

    /// Byte representation used for ordering locators; families never
    /// intermix in practice, shorter representations sort first.
    pub fn comparison_bytes(&self) -> Vec<u8> {
        match self {
            LispAddr::Ipv4(ip) => ip.octets().to_vec(),
            LispAddr::Ipv6(ip) => ip.octets().to_vec(),
            LispAddr::Mac(mac) => mac.to_vec(),
            LispAddr::DistinguishedName(name) => name.as_bytes().to_vec(),
            LispAddr::AsNumber(asn) => asn.to_be_bytes().to_vec(),
            LispAddr::NoAddress => Vec::new(),
            LispAddr::Lcaf(_) => {
                let mut buf = BytesMut::new();
                self.encode(&mut buf);
                buf.to_vec()
            }
        }
    }

    /// Whether the two addresses belong to the same simple address family.
    pub fn same_family(&self, other: &LispAddr) -> bool {
        matches!(
            (self, other),
            (LispAddr::Ipv4(_), LispAddr::Ipv4(_)) | (LispAddr::Ipv6(_), LispAddr::Ipv6(_))
        )
    }
}

impl LcafAddr {
    fn type_code(&self) -> u8 {
        match self {
            LcafAddr::AfiList(_) => wire::LCAF_AFI_LIST,
            LcafAddr::InstanceId { .. } => wire::LCAF_INSTANCE_ID,
            LcafAddr::ApplicationData { .. } => wire::LCAF_APPLICATION_DATA,
            LcafAddr::ExplicitLocatorPath(_) => wire::LCAF_EXPLICIT_LOCATOR_PATH,
            LcafAddr::SourceDest { .. } => wire::LCAF_SOURCE_DEST,
            LcafAddr::KeyValue { .. } => wire::LCAF_KEY_VALUE,
        }
    }

    /// Size of the sub-type specific body. This is the value of the LCAF
    /// length field: it covers neither the AFI nor the 6-byte LCAF header.
    fn payload_size(&self) -> usize {
        match self {
            LcafAddr::AfiList(list) => list.iter().map(LispAddr::wire_size).sum(),
            LcafAddr::InstanceId { address, .. } => 4 + address.wire_size(),
            LcafAddr::SourceDest { src, dst, .. } => 4 + src.wire_size() + dst.wire_size(),
            LcafAddr::KeyValue { key, value } => key.wire_size() + value.wire_size(),
            LcafAddr::ApplicationData { address, .. } => 12 + address.wire_size(),
            LcafAddr::ExplicitLocatorPath(hops) => {
                hops.iter().map(|h| 2 + h.address.wire_size()).sum()
            }
        }
    }

    /// Encode the LCAF header and body. The caller has already written the
    /// LCAF AFI.
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(0); // rsvd1
        buf.put_u8(0); // flags
        buf.put_u8(self.type_code());
        buf.put_u8(0); // rsvd2
        buf.put_u16(self.payload_size() as u16);
        match self {
            LcafAddr::AfiList(list) => {
                for addr in list {
                    addr.encode(buf);
                }
            }
            LcafAddr::InstanceId { iid, address } => {
                buf.put_u32(*iid);
                address.encode(buf);
            }
            LcafAddr::SourceDest {
                src,
                src_mask,
                dst,
                dst_mask,
            } => {
                buf.put_u16(0); // reserved
                buf.put_u8(*src_mask);
                buf.put_u8(*dst_mask);
                src.encode(buf);
                dst.encode(buf);
            }
            LcafAddr::KeyValue { key, value } => {
                key.encode(buf);
                value.encode(buf);
            }
            LcafAddr::ApplicationData {
                ip_tos,
                protocol,
                local_port_low,
                local_port_high,
                remote_port_low,
                remote_port_high,
                address,
            } => {
                buf.put_slice(&ip_tos.to_be_bytes()[1..]); // 24-bit TOS
                buf.put_u8(*protocol);
                buf.put_u16(*local_port_low);
                buf.put_u16(*local_port_high);
                buf.put_u16(*remote_port_low);
                buf.put_u16(*remote_port_high);
                address.encode(buf);
            }
            LcafAddr::ExplicitLocatorPath(hops) => {
                for hop in hops {
                    let mut flags = 0u16;
                    if hop.lookup {
                        flags |= ELP_HOP_LOOKUP;
                    }
                    if hop.rloc_probe {
                        flags |= ELP_HOP_RLOC_PROBE;
                    }
                    if hop.strict {
                        flags |= ELP_HOP_STRICT;
                    }
                    buf.put_u16(flags);
                    hop.address.encode(buf);
                }
            }
        }
    }

    /// Decode the LCAF header and body. The AFI has already been consumed.
    fn decode(buf: &mut Bytes) -> Result<Self, Error> {
        skip(buf, 2, "LCAF reserved/flags")?;
        let type_code = get_u8(buf, "LCAF type")?;
        skip(buf, 1, "LCAF reserved")?;
        let length = get_u16(buf, "LCAF length")? as usize;
        need(buf, length, "LCAF payload")?;
        // Decode within the declared payload only; nested addresses cannot
        // read past it, which also bounds the recursion.
        let mut body = buf.copy_to_bytes(length);

        let lcaf = match type_code {
            wire::LCAF_AFI_LIST => {
                let mut list = Vec::new();
                while body.has_remaining() {
                    list.push(LispAddr::decode(&mut body)?);
                }
                LcafAddr::AfiList(list)
            }
            wire::LCAF_INSTANCE_ID => {
                let iid = get_u32(&mut body, "instance id")?;
                let address = Box::new(LispAddr::decode(&mut body)?);
                LcafAddr::InstanceId { iid, address }
            }
            wire::LCAF_SOURCE_DEST => {
                skip(&mut body, 2, "source-dest reserved")?;
                let src_mask = get_u8(&mut body, "source mask")?;
                let dst_mask = get_u8(&mut body, "destination mask")?;
                let src = Box::new(LispAddr::decode(&mut body)?);
                let dst = Box::new(LispAddr::decode(&mut body)?);
                LcafAddr::SourceDest {
                    src,
                    src_mask,
                    dst,
                    dst_mask,
                }
            }
            wire::LCAF_KEY_VALUE => {
                let key = Box::new(LispAddr::decode(&mut body)?);
                let value = Box::new(LispAddr::decode(&mut body)?);
                LcafAddr::KeyValue { key, value }
            }
            wire::LCAF_APPLICATION_DATA => {
                let tos_bytes = get_bytes(&mut body, 3, "application data TOS")?;
                let ip_tos =
                    u32::from_be_bytes([0, tos_bytes[0], tos_bytes[1], tos_bytes[2]]);
                let protocol = get_u8(&mut body, "application data protocol")?;
                let local_port_low = get_u16(&mut body, "local port low")?;
                let local_port_high = get_u16(&mut body, "local port high")?;
                let remote_port_low = get_u16(&mut body, "remote port low")?;
                let remote_port_high = get_u16(&mut body, "remote port high")?;
                let address = Box::new(LispAddr::decode(&mut body)?);
                LcafAddr::ApplicationData {
                    ip_tos,
                    protocol,
                    local_port_low,
                    local_port_high,
                    remote_port_low,
                    remote_port_high,
                    address,
                }
            }
            wire::LCAF_EXPLICIT_LOCATOR_PATH => {
                let mut hops = Vec::new();
                while body.has_remaining() {
                    let flags = get_u16(&mut body, "ELP hop flags")?;
                    let address = LispAddr::decode(&mut body)?;
                    hops.push(ElpHop {
                        lookup: flags & ELP_HOP_LOOKUP != 0,
                        rloc_probe: flags & ELP_HOP_RLOC_PROBE != 0,
                        strict: flags & ELP_HOP_STRICT != 0,
                        address,
                    });
                }
                LcafAddr::ExplicitLocatorPath(hops)
            }
            other => {
                debug!("rejecting unknown LCAF type {}", other);
                return Err(Error::MalformedPacket(format!(
                    "unknown LCAF type {}",
                    other
                )));
            }
        };

        if body.has_remaining() {
            return Err(Error::MalformedPacket(format!(
                "LCAF type {} payload has {} trailing bytes",
                type_code,
                body.remaining()
            )));
        }
        Ok(lcaf)
    }
}

impl fmt::Display for LispAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LispAddr::NoAddress => write!(f, "no-address"),
            LispAddr::Ipv4(ip) => write!(f, "{}", ip),
            LispAddr::Ipv6(ip) => write!(f, "{}", ip),
            LispAddr::Mac(mac) => write!(
                f,
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
            ),
            LispAddr::DistinguishedName(name) => write!(f, "{}", name),
            LispAddr::AsNumber(asn) => write!(f, "AS{}", asn),
            LispAddr::Lcaf(LcafAddr::SourceDest {
                src,
                src_mask,
                dst,
                dst_mask,
            }) => write!(f, "{}/{}|{}/{}", src, src_mask, dst, dst_mask),
            LispAddr::Lcaf(LcafAddr::InstanceId { iid, address }) => {
                write!(f, "[{}] {}", iid, address)
            }
            LispAddr::Lcaf(lcaf) => write!(f, "lcaf-{}", lcaf.type_code()),
        }
    }
}

/* ---------------------------------------------------------------- *
 * EIDs and RLOCs
 * ---------------------------------------------------------------- */

/// An end-point identifier: an address plus an optional prefix mask and an
/// optional virtual network (instance) id. Equality covers all three
/// fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Eid {
    pub addr: LispAddr,
    pub mask: Option<u8>,
    pub vni: Option<u32>,
}

impl Eid {
    pub fn new(addr: LispAddr) -> Self {
        Self {
            addr,
            mask: None,
            vni: None,
        }
    }

    /// An EID for an IPv4 prefix in dotted/len notation, host bits zeroed.
    pub fn from_ipv4_prefix(ip: Ipv4Addr, mask: u8) -> Self {
        Self {
            addr: LispAddr::Ipv4(ip),
            mask: Some(mask),
            vni: None,
        }
        .normalized_at(mask)
    }

    pub fn from_ipv6_prefix(ip: Ipv6Addr, mask: u8) -> Self {
        Self {
            addr: LispAddr::Ipv6(ip),
            mask: Some(mask),
            vni: None,
        }
        .normalized_at(mask)
    }

    /// A source-destination EID from two IPv4 prefixes, host bits zeroed in
    /// both components.
    pub fn from_ipv4_src_dst(src: Ipv4Addr, src_mask: u8, dst: Ipv4Addr, dst_mask: u8) -> Self {
        Self {
            addr: LispAddr::Lcaf(LcafAddr::SourceDest {
                src: Box::new(LispAddr::Ipv4(src)),
                src_mask,
                dst: Box::new(LispAddr::Ipv4(dst)),
                dst_mask,
            }),
            mask: None,
            vni: None,
        }
        .normalized()
    }

    pub fn with_vni(mut self, vni: u32) -> Self {
        self.vni = Some(vni);
        self
    }

    /// Whether this EID is keyed by a (source, destination) prefix pair.
    pub fn is_src_dst(&self) -> bool {
        matches!(self.addr, LispAddr::Lcaf(LcafAddr::SourceDest { .. }))
    }

    /// The source component of a source-dest EID as a prefix of its own;
    /// `None` for every other kind. The VNI is carried over.
    pub fn src_component(&self) -> Option<Eid> {
        match &self.addr {
            LispAddr::Lcaf(LcafAddr::SourceDest { src, src_mask, .. }) => Some(Eid {
                addr: (**src).clone(),
                mask: Some(*src_mask),
                vni: self.vni,
            }),
            _ => None,
        }
    }

    /// The destination-only form of a source-dest EID; other EIDs are
    /// returned unchanged. The VNI is carried over.
    pub fn to_dst_only(&self) -> Eid {
        match &self.addr {
            LispAddr::Lcaf(LcafAddr::SourceDest { dst, dst_mask, .. }) => Eid {
                addr: (**dst).clone(),
                mask: Some(*dst_mask),
                vni: self.vni,
            },
            _ => self.clone(),
        }
    }

    /// The mask relevant for specificity comparisons: the destination
    /// component mask for source-dest EIDs, the plain mask otherwise.
    pub fn dst_mask(&self) -> u8 {
        match &self.addr {
            LispAddr::Lcaf(LcafAddr::SourceDest { dst_mask, .. }) => *dst_mask,
            _ => self.mask.unwrap_or_else(|| max_mask(&self.addr)),
        }
    }

    /// Rewrite this EID to the given (shorter) mask, zeroing host bits.
    /// For source-dest EIDs the mask applies to the destination component;
    /// the source component is canonicalized at its own mask.
    pub fn normalized_at(&self, mask: u8) -> Eid {
        let addr = match &self.addr {
            LispAddr::Ipv4(ip) => LispAddr::Ipv4(mask_v4(*ip, mask)),
            LispAddr::Ipv6(ip) => LispAddr::Ipv6(mask_v6(*ip, mask)),
            LispAddr::Lcaf(LcafAddr::SourceDest {
                src,
                src_mask,
                dst,
                dst_mask: _,
            }) => {
                return Eid {
                    addr: LispAddr::Lcaf(LcafAddr::SourceDest {
                        src: Box::new(mask_component(src, *src_mask)),
                        src_mask: *src_mask,
                        dst: Box::new(mask_component(dst, mask)),
                        dst_mask: mask,
                    }),
                    mask: None,
                    vni: self.vni,
                };
            }
            other => other.clone(),
        };
        Eid {
            addr,
            mask: Some(mask),
            vni: self.vni,
        }
    }

    /// Canonical storage form: host bits zeroed at the declared masks. For
    /// source-dest EIDs both components are canonicalized.
    pub fn normalized(&self) -> Eid {
        if !is_maskable(&self.addr) {
            return self.clone();
        }
        if self.is_src_dst() {
            return self.normalized_at(self.dst_mask());
        }
        match self.mask {
            Some(mask) => self.normalized_at(mask),
            None => self.clone(),
        }
    }
}

impl fmt::Display for Eid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(vni) = self.vni {
            write!(f, "[{}] ", vni)?;
        }
        write!(f, "{}", self.addr)?;
        if let Some(mask) = self.mask {
            write!(f, "/{}", mask)?;
        }
        Ok(())
    }
}

/// A routing locator. Not independently owned on the wire: always embedded
/// in a locator record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rloc(pub LispAddr);

impl Rloc {
    pub fn ipv4(ip: Ipv4Addr) -> Self {
        Rloc(LispAddr::Ipv4(ip))
    }

    pub fn addr(&self) -> &LispAddr {
        &self.0
    }
}

impl fmt::Display for Rloc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/* ---------------------------------------------------------------- *
 * Mask utilities
 * ---------------------------------------------------------------- */

/// Whether mask iteration applies to this address kind.
pub fn is_maskable(addr: &LispAddr) -> bool {
    match addr {
        LispAddr::Ipv4(_) | LispAddr::Ipv6(_) => true,
        LispAddr::Lcaf(LcafAddr::SourceDest { .. }) => true,
        LispAddr::Lcaf(LcafAddr::InstanceId { address, .. }) => is_maskable(address),
        _ => false,
    }
}

/// The full host mask for an address family.
pub fn max_mask(addr: &LispAddr) -> u8 {
    match addr {
        LispAddr::Ipv4(_) => 32,
        LispAddr::Ipv6(_) => 128,
        LispAddr::Lcaf(LcafAddr::SourceDest { dst, .. }) => max_mask(dst),
        LispAddr::Lcaf(LcafAddr::InstanceId { address, .. }) => max_mask(address),
        _ => 0,
    }
}

fn mask_component(addr: &LispAddr, mask: u8) -> LispAddr {
    match addr {
        LispAddr::Ipv4(ip) => LispAddr::Ipv4(mask_v4(*ip, mask)),
        LispAddr::Ipv6(ip) => LispAddr::Ipv6(mask_v6(*ip, mask)),
        other => other.clone(),
    }
}

fn mask_v4(ip: Ipv4Addr, mask: u8) -> Ipv4Addr {
    if mask >= 32 {
        return ip;
    }
    let bits = u32::from(ip) & (u32::MAX.checked_shl(32 - mask as u32).unwrap_or(0));
    Ipv4Addr::from(bits)
}

fn mask_v6(ip: Ipv6Addr, mask: u8) -> Ipv6Addr {
    if mask >= 128 {
        return ip;
    }
    let bits = u128::from(ip) & (u128::MAX.checked_shl(128 - mask as u32).unwrap_or(0));
    Ipv6Addr::from(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(addr: &LispAddr) -> LispAddr {
        let mut buf = BytesMut::new();
        addr.encode(&mut buf);
        assert_eq!(buf.len(), addr.wire_size());
        let mut bytes = buf.freeze();
        LispAddr::decode(&mut bytes).expect("decode failed")
    }

    #[test]
    fn simple_address_roundtrip() {
        for addr in [
            LispAddr::NoAddress,
            LispAddr::Ipv4(Ipv4Addr::new(10, 0, 0, 1)),
            LispAddr::Ipv6(Ipv6Addr::LOCALHOST),
            LispAddr::Mac([0, 1, 2, 3, 4, 5]),
            LispAddr::DistinguishedName("node-7".to_string()),
            LispAddr::AsNumber(64512),
        ] {
            assert_eq!(roundtrip(&addr), addr);
        }
    }

    #[test]
    fn source_dest_roundtrip() {
        let addr = LispAddr::Lcaf(LcafAddr::SourceDest {
            src: Box::new(LispAddr::Ipv4(Ipv4Addr::new(10, 0, 0, 0))),
            src_mask: 24,
            dst: Box::new(LispAddr::Ipv4(Ipv4Addr::new(20, 0, 0, 0))),
            dst_mask: 24,
        });
        assert_eq!(roundtrip(&addr), addr);
    }

    #[test]
    fn nested_lcaf_roundtrip() {
        let addr = LispAddr::Lcaf(LcafAddr::InstanceId {
            iid: 42,
            address: Box::new(LispAddr::Lcaf(LcafAddr::ExplicitLocatorPath(vec![
                ElpHop {
                    lookup: false,
                    rloc_probe: true,
                    strict: false,
                    address: LispAddr::Ipv4(Ipv4Addr::new(192, 0, 2, 1)),
                },
                ElpHop {
                    lookup: true,
                    rloc_probe: false,
                    strict: true,
                    address: LispAddr::Ipv4(Ipv4Addr::new(192, 0, 2, 2)),
                },
            ]))),
        });
        assert_eq!(roundtrip(&addr), addr);
    }

    #[test]
    fn truncated_lcaf_is_malformed() {
        let addr = LispAddr::Lcaf(LcafAddr::AfiList(vec![LispAddr::Ipv4(Ipv4Addr::new(
            1, 2, 3, 4,
        ))]));
        let mut buf = BytesMut::new();
        addr.encode(&mut buf);
        let mut truncated = buf.freeze().slice(0..6);
        match LispAddr::decode(&mut truncated) {
            Err(Error::MalformedPacket(_)) => {}
            other => panic!("expected MalformedPacket, got {:?}", other),
        }
    }

    #[test]
    fn unknown_lcaf_type_is_malformed() {
        let mut buf = BytesMut::new();
        buf.put_u16(wire::AFI_LCAF);
        buf.put_u8(0);
        buf.put_u8(0);
        buf.put_u8(99); // unassigned type
        buf.put_u8(0);
        buf.put_u16(0);
        let mut bytes = buf.freeze();
        match LispAddr::decode(&mut bytes) {
            Err(Error::MalformedPacket(_)) => {}
            other => panic!("expected MalformedPacket, got {:?}", other),
        }
    }

    #[test]
    fn eid_normalization_zeroes_host_bits() {
        let eid = Eid::from_ipv4_prefix(Ipv4Addr::new(10, 0, 0, 5), 24);
        assert_eq!(eid.addr, LispAddr::Ipv4(Ipv4Addr::new(10, 0, 0, 0)));
        assert_eq!(eid.mask, Some(24));
    }

    #[test]
    fn source_dest_normalization_zeroes_both_components() {
        let eid = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(10, 0, 0, 7),
            24,
            Ipv4Addr::new(20, 0, 0, 9),
            24,
        );
        match &eid.addr {
            LispAddr::Lcaf(LcafAddr::SourceDest { src, dst, .. }) => {
                assert_eq!(**src, LispAddr::Ipv4(Ipv4Addr::new(10, 0, 0, 0)));
                assert_eq!(**dst, LispAddr::Ipv4(Ipv4Addr::new(20, 0, 0, 0)));
            }
            other => panic!("not source-dest: {:?}", other),
        }
        // host-bit variants collapse to the same storage key
        let canonical = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(10, 0, 0, 0),
            24,
            Ipv4Addr::new(20, 0, 0, 0),
            24,
        );
        assert_eq!(eid, canonical);
        assert_eq!(eid.normalized(), canonical);
    }

    #[test]
    fn src_component_extracted_with_vni() {
        let eid = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(10, 0, 0, 0),
            24,
            Ipv4Addr::new(20, 0, 0, 0),
            24,
        )
        .with_vni(7);
        let src = eid.src_component().unwrap();
        assert_eq!(src.addr, LispAddr::Ipv4(Ipv4Addr::new(10, 0, 0, 0)));
        assert_eq!(src.mask, Some(24));
        assert_eq!(src.vni, Some(7));
        assert!(Eid::from_ipv4_prefix(Ipv4Addr::new(10, 0, 0, 0), 24)
            .src_component()
            .is_none());
    }

    #[test]
    fn dst_only_rewrite_carries_vni() {
        let eid = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(10, 0, 0, 0),
            24,
            Ipv4Addr::new(20, 0, 0, 0),
            24,
        )
        .with_vni(7);
        let dst = eid.to_dst_only();
        assert_eq!(dst.addr, LispAddr::Ipv4(Ipv4Addr::new(20, 0, 0, 0)));
        assert_eq!(dst.mask, Some(24));
        assert_eq!(dst.vni, Some(7));
    }
}
