//! LISP control message types and structures.
//!
//! The four control messages handled by the mapping service (Map-Request,
//! Map-Reply, Map-Register, Map-Notify) with their bit-exact wire encoding
//! (RFC 6830 / RFC 6833 layout). Flag bit positions and the ITR-RLOC
//! count-minus-one convention follow the protocol, not this crate's taste.

#[cfg(test)]
#[path = "msg/tests.rs"]
mod tests;

use crate::addr::{Eid, LispAddr, Rloc};
use crate::error::Error;
use crate::wire::{self, get_bytes, get_u16, get_u32, get_u64, get_u8, skip};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Record TTL (seconds) meaning "delete immediately".
pub const TTL_DELETE: u32 = 0;

/// Record TTL (seconds) meaning "cache indefinitely".
pub const TTL_INDEFINITE: u32 = 0x7fff_ffff;

/// Identifier of the registering device, carried in the Map-Register
/// trailer when the I flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct XtrId(pub [u8; 16]);

impl XtrId {
    /// The reserved all-zero identifier. Accepted on registration with a
    /// warning.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 16]
    }
}

impl fmt::Display for XtrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Site identifier from the Map-Register trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteId(pub [u8; 8]);

/// The action an ITR should take for a negative mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MapReplyAction {
    NoAction = 0,
    NativelyForward = 1,
    SendMapRequest = 2,
    Drop = 3,
}

impl MapReplyAction {
    /// Unknown codes default to `NoAction`.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => MapReplyAction::NativelyForward,
            2 => MapReplyAction::SendMapRequest,
            3 => MapReplyAction::Drop,
            _ => MapReplyAction::NoAction,
        }
    }
}

/// Priority/weight value meaning "do not use this locator".
pub const LOCATOR_UNUSABLE: u8 = 255;

/// The mask byte emitted for an EID. A maskable EID without an explicit
/// mask goes out as a host route; a 0 on the wire would cover the whole
/// address space.
fn wire_mask(eid: &Eid) -> u8 {
    match (&eid.addr, eid.mask) {
        (_, Some(mask)) => mask,
        (LispAddr::Ipv4(_) | LispAddr::Ipv6(_), None) => crate::addr::max_mask(&eid.addr),
        _ => 0,
    }
}

/// One locator within a mapping record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorRecord {
    pub priority: u8,
    pub weight: u8,
    pub multicast_priority: u8,
    pub multicast_weight: u8,
    pub local: bool,
    pub rloc_probed: bool,
    pub routed: bool,
    pub rloc: Rloc,
}

const LOC_FLAG_LOCAL: u8 = 0x04;
const LOC_FLAG_PROBED: u8 = 0x02;
const LOC_FLAG_ROUTED: u8 = 0x01;

impl LocatorRecord {
    pub fn new(rloc: Rloc, priority: u8, weight: u8) -> Self {
        Self {
            priority,
            weight,
            multicast_priority: LOCATOR_UNUSABLE,
            multicast_weight: 0,
            local: false,
            rloc_probed: false,
            routed: true,
            rloc,
        }
    }

    fn wire_size(&self) -> usize {
        6 + self.rloc.0.wire_size()
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.priority);
        buf.put_u8(self.weight);
        buf.put_u8(self.multicast_priority);
        buf.put_u8(self.multicast_weight);
        buf.put_u8(0); // unused flags
        let mut flags = 0u8;
        if self.local {
            flags |= LOC_FLAG_LOCAL;
        }
        if self.rloc_probed {
            flags |= LOC_FLAG_PROBED;
        }
        if self.routed {
            flags |= LOC_FLAG_ROUTED;
        }
        buf.put_u8(flags);
        self.rloc.0.encode(buf);
    }

    fn decode(buf: &mut Bytes) -> Result<Self, Error> {
        let priority = get_u8(buf, "locator priority")?;
        let weight = get_u8(buf, "locator weight")?;
        let multicast_priority = get_u8(buf, "locator multicast priority")?;
        let multicast_weight = get_u8(buf, "locator multicast weight")?;
        skip(buf, 1, "locator unused flags")?;
        let flags = get_u8(buf, "locator flags")?;
        let rloc = Rloc(LispAddr::decode(buf)?);
        Ok(Self {
            priority,
            weight,
            multicast_priority,
            multicast_weight,
            local: flags & LOC_FLAG_LOCAL != 0,
            rloc_probed: flags & LOC_FLAG_PROBED != 0,
            routed: flags & LOC_FLAG_ROUTED != 0,
            rloc,
        })
    }
}

/// An EID-to-locator-set binding.
///
/// The `xtr_id`, `site_id`, `timestamp` and `source_rloc` fields are
/// registration bookkeeping: they are attached by the registrar (or copied
/// from the Map-Register trailer) and never appear in the record's own wire
/// body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub eid: Eid,
    /// Time to live in seconds; see [`TTL_DELETE`] and [`TTL_INDEFINITE`].
    pub ttl: u32,
    pub action: MapReplyAction,
    pub authoritative: bool,
    /// 12-bit mapping version number.
    pub map_version: u16,
    pub locators: Vec<LocatorRecord>,
    pub xtr_id: Option<XtrId>,
    pub site_id: Option<SiteId>,
    #[serde(skip)]
    pub timestamp: Option<SystemTime>,
    pub source_rloc: Option<LispAddr>,
}

const RECORD_FLAG_AUTHORITATIVE: u8 = 0x10;

impl MappingRecord {
    /// A positive record with locators.
    pub fn new(eid: Eid, ttl: u32, locators: Vec<LocatorRecord>) -> Self {
        Self {
            eid,
            ttl,
            action: MapReplyAction::NoAction,
            authoritative: false,
            map_version: 0,
            locators,
            xtr_id: None,
            site_id: None,
            timestamp: None,
            source_rloc: None,
        }
    }

    /// A negative record: no locators, just a policy action.
    pub fn negative(eid: Eid, ttl: u32, action: MapReplyAction) -> Self {
        let mut record = Self::new(eid, ttl, Vec::new());
        record.action = action;
        record
    }

    /// Whether this is a negative mapping.
    pub fn is_negative(&self) -> bool {
        self.locators.is_empty()
    }

    /// Compare the externally visible content, ignoring registration
    /// bookkeeping. Used for change detection on re-registration.
    pub fn same_content(&self, other: &MappingRecord) -> bool {
        self.eid == other.eid
            && self.ttl == other.ttl
            && self.action == other.action
            && self.authoritative == other.authoritative
            && self.locators == other.locators
    }

    pub fn wire_size(&self) -> usize {
        10 + self.eid_wire_addr().wire_size()
            + self.locators.iter().map(LocatorRecord::wire_size).sum::<usize>()
    }

    /// The address actually emitted for the EID: a VNI wraps the address in
    /// an Instance ID LCAF.
    fn eid_wire_addr(&self) -> LispAddr {
        match self.eid.vni {
            Some(iid) => LispAddr::Lcaf(crate::addr::LcafAddr::InstanceId {
                iid,
                address: Box::new(self.eid.addr.clone()),
            }),
            None => self.eid.addr.clone(),
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.ttl);
        buf.put_u8(self.locators.len() as u8);
        buf.put_u8(wire_mask(&self.eid));
        let mut action_byte = (self.action as u8) << 5;
        if self.authoritative {
            action_byte |= RECORD_FLAG_AUTHORITATIVE;
        }
        buf.put_u8(action_byte);
        buf.put_u8(0); // reserved
        buf.put_u16(self.map_version & 0x0fff);
        self.eid_wire_addr().encode(buf);
        for locator in &self.locators {
            locator.encode(buf);
        }
    }

    pub fn decode(buf: &mut Bytes) -> Result<Self, Error> {
        let ttl = get_u32(buf, "record TTL")?;
        let locator_count = get_u8(buf, "locator count")?;
        let mask = get_u8(buf, "mask length")?;
        let action_byte = get_u8(buf, "action/authoritative")?;
        skip(buf, 1, "record reserved")?;
        let map_version = get_u16(buf, "map version")? & 0x0fff;

        let addr = LispAddr::decode(buf)?;
        // Unwrap a VNI wrapper; the record mask byte only applies to plain
        // maskable addresses, composite kinds carry their own masks.
        let (addr, vni) = match addr {
            LispAddr::Lcaf(crate::addr::LcafAddr::InstanceId { iid, address }) => {
                (*address, Some(iid))
            }
            other => (other, None),
        };
        let mask = match addr {
            LispAddr::Ipv4(_) | LispAddr::Ipv6(_) => Some(mask),
            _ => None,
        };
        let eid = Eid { addr, mask, vni };

        let mut locators = Vec::with_capacity(locator_count as usize);
        for _ in 0..locator_count {
            locators.push(LocatorRecord::decode(buf)?);
        }

        Ok(Self {
            eid,
            ttl,
            action: MapReplyAction::from_code(action_byte >> 5),
            authoritative: action_byte & RECORD_FLAG_AUTHORITATIVE != 0,
            map_version,
            locators,
            xtr_id: None,
            site_id: None,
            timestamp: None,
            source_rloc: None,
        })
    }
}

/* ---------------------------------------------------------------- *
 * Map-Register (type 3)
 * ---------------------------------------------------------------- */

/// A registration from an edge device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRegister {
    pub proxy_map_reply: bool,
    pub want_map_notify: bool,
    pub merge_enabled: bool,
    pub nonce: u64,
    pub key_id: u16,
    pub authentication_data: Vec<u8>,
    pub records: Vec<MappingRecord>,
    /// Present when the I flag is set; also copied into each record on
    /// decode.
    pub xtr_id: Option<XtrId>,
    pub site_id: Option<SiteId>,
    /// Transport-level source address, supplied by the receiving transport
    /// rather than the wire body.
    #[serde(skip)]
    pub source_rloc: Option<LispAddr>,
}

const REG_FLAG_PROXY: u8 = 0x08;
const REG_FLAG_XTR_SITE_ID: u8 = 0x02;
const REG_FLAG_MERGE: u8 = 0x04;
const REG_FLAG_WANT_NOTIFY: u8 = 0x01;

impl MapRegister {
    pub fn to_wire(&self) -> Bytes {
        let mut buf = BytesMut::new();
        let mut byte0 = wire::TYPE_MAP_REGISTER << 4;
        if self.proxy_map_reply {
            byte0 |= REG_FLAG_PROXY;
        }
        if self.xtr_id.is_some() {
            byte0 |= REG_FLAG_XTR_SITE_ID;
        }
        buf.put_u8(byte0);
        buf.put_u8(0); // reserved
        let mut byte2 = 0u8;
        if self.merge_enabled {
            byte2 |= REG_FLAG_MERGE;
        }
        if self.want_map_notify {
            byte2 |= REG_FLAG_WANT_NOTIFY;
        }
        buf.put_u8(byte2);
        buf.put_u8(self.records.len() as u8);
        buf.put_u64(self.nonce);
        buf.put_u16(self.key_id);
        buf.put_u16(self.authentication_data.len() as u16);
        buf.put_slice(&self.authentication_data);
        for record in &self.records {
            record.encode(&mut buf);
        }
        if let (Some(xtr_id), Some(site_id)) = (&self.xtr_id, &self.site_id) {
            buf.put_slice(&xtr_id.0);
            buf.put_slice(&site_id.0);
        }
        buf.freeze()
    }

    pub fn from_wire(mut buf: Bytes) -> Result<Self, Error> {
        let byte0 = get_u8(&mut buf, "register type/flags")?;
        if byte0 >> 4 != wire::TYPE_MAP_REGISTER {
            return Err(Error::MalformedPacket(format!(
                "not a Map-Register: type {}",
                byte0 >> 4
            )));
        }
        let proxy_map_reply = byte0 & REG_FLAG_PROXY != 0;
        let xtr_site_id_present = byte0 & REG_FLAG_XTR_SITE_ID != 0;
        skip(&mut buf, 1, "register reserved")?;
        let byte2 = get_u8(&mut buf, "register flags")?;
        let record_count = get_u8(&mut buf, "record count")?;
        let nonce = get_u64(&mut buf, "nonce")?;
        let key_id = get_u16(&mut buf, "key id")?;
        let auth_len = get_u16(&mut buf, "auth data length")? as usize;
        let authentication_data = get_bytes(&mut buf, auth_len, "auth data")?;

        let mut records = Vec::with_capacity(record_count as usize);
        for _ in 0..record_count {
            records.push(MappingRecord::decode(&mut buf)?);
        }

        let (xtr_id, site_id) = if xtr_site_id_present {
            let xtr = get_bytes(&mut buf, 16, "xTR-ID")?;
            let site = get_bytes(&mut buf, 8, "site-ID")?;
            let mut xtr_id = [0u8; 16];
            xtr_id.copy_from_slice(&xtr);
            let mut site_id = [0u8; 8];
            site_id.copy_from_slice(&site);
            (Some(XtrId(xtr_id)), Some(SiteId(site_id)))
        } else {
            (None, None)
        };
        for record in &mut records {
            record.xtr_id = xtr_id;
            record.site_id = site_id;
        }

        Ok(Self {
            proxy_map_reply,
            want_map_notify: byte2 & REG_FLAG_WANT_NOTIFY != 0,
            merge_enabled: byte2 & REG_FLAG_MERGE != 0,
            nonce,
            key_id,
            authentication_data,
            records,
            xtr_id,
            site_id,
            source_rloc: None,
        })
    }
}

/* ---------------------------------------------------------------- *
 * Map-Notify (type 4)
 * ---------------------------------------------------------------- */

/// Acknowledgment of a registration, echoing its nonce and key id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapNotify {
    pub merge_enabled: bool,
    pub nonce: u64,
    pub key_id: u16,
    pub authentication_data: Vec<u8>,
    pub records: Vec<MappingRecord>,
    pub xtr_id: Option<XtrId>,
    pub site_id: Option<SiteId>,
}

impl MapNotify {
    pub fn to_wire(&self) -> Bytes {
        let mut buf = BytesMut::new();
        let mut byte0 = wire::TYPE_MAP_NOTIFY << 4;
        if self.xtr_id.is_some() {
            byte0 |= REG_FLAG_XTR_SITE_ID;
        }
        buf.put_u8(byte0);
        buf.put_u8(0);
        buf.put_u8(if self.merge_enabled { REG_FLAG_MERGE } else { 0 });
        buf.put_u8(self.records.len() as u8);
        buf.put_u64(self.nonce);
        buf.put_u16(self.key_id);
        buf.put_u16(self.authentication_data.len() as u16);
        buf.put_slice(&self.authentication_data);
        for record in &self.records {
            record.encode(&mut buf);
        }
        if let (Some(xtr_id), Some(site_id)) = (&self.xtr_id, &self.site_id) {
            buf.put_slice(&xtr_id.0);
            buf.put_slice(&site_id.0);
        }
        buf.freeze()
    }

    pub fn from_wire(mut buf: Bytes) -> Result<Self, Error> {
        let byte0 = get_u8(&mut buf, "notify type/flags")?;
        if byte0 >> 4 != wire::TYPE_MAP_NOTIFY {
            return Err(Error::MalformedPacket(format!(
                "not a Map-Notify: type {}",
                byte0 >> 4
            )));
        }
        let xtr_site_id_present = byte0 & REG_FLAG_XTR_SITE_ID != 0;
        skip(&mut buf, 1, "notify reserved")?;
        let byte2 = get_u8(&mut buf, "notify flags")?;
        let record_count = get_u8(&mut buf, "record count")?;
        let nonce = get_u64(&mut buf, "nonce")?;
        let key_id = get_u16(&mut buf, "key id")?;
        let auth_len = get_u16(&mut buf, "auth data length")? as usize;
        let authentication_data = get_bytes(&mut buf, auth_len, "auth data")?;

        let mut records = Vec::with_capacity(record_count as usize);
        for _ in 0..record_count {
            records.push(MappingRecord::decode(&mut buf)?);
        }

        let (xtr_id, site_id) = if xtr_site_id_present {
            let xtr = get_bytes(&mut buf, 16, "xTR-ID")?;
            let site = get_bytes(&mut buf, 8, "site-ID")?;
            let mut xtr_id = [0u8; 16];
            xtr_id.copy_from_slice(&xtr);
            let mut site_id = [0u8; 8];
            site_id.copy_from_slice(&site);
            (Some(XtrId(xtr_id)), Some(SiteId(site_id)))
        } else {
            (None, None)
        };

        Ok(Self {
            merge_enabled: byte2 & REG_FLAG_MERGE != 0,
            nonce,
            key_id,
            authentication_data,
            records,
            xtr_id,
            site_id,
        })
    }
}

/* ---------------------------------------------------------------- *
 * Map-Request (type 1)
 * ---------------------------------------------------------------- */

/// A lookup query (or an SMR solicitation when `smr` is set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRequest {
    pub authoritative: bool,
    pub map_data_present: bool,
    pub probe: bool,
    pub smr: bool,
    pub pitr: bool,
    pub smr_invoked: bool,
    pub nonce: u64,
    pub source_eid: Option<Eid>,
    /// Candidate locators of the requester; the wire carries the count
    /// minus one, so a decoded request always has at least one entry and
    /// an empty list is encoded as a single null entry.
    pub itr_rlocs: Vec<Rloc>,
    pub eid_items: Vec<Eid>,
    /// Transport-level source address, supplied by the receiving transport.
    #[serde(skip)]
    pub source_rloc: Option<LispAddr>,
}

const REQ_FLAG_AUTHORITATIVE: u8 = 0x08;
const REQ_FLAG_MAP_DATA: u8 = 0x04;
const REQ_FLAG_PROBE: u8 = 0x02;
const REQ_FLAG_SMR: u8 = 0x01;
const REQ_FLAG_PITR: u8 = 0x80;
const REQ_FLAG_SMR_INVOKED: u8 = 0x40;

impl MapRequest {
    /// A plain query for one EID.
    pub fn query(eid: Eid, itr_rloc: Rloc, nonce: u64) -> Self {
        Self {
            authoritative: false,
            map_data_present: false,
            probe: false,
            smr: false,
            pitr: false,
            smr_invoked: false,
            nonce,
            source_eid: None,
            itr_rlocs: vec![itr_rloc],
            eid_items: vec![eid],
            source_rloc: None,
        }
    }

    pub fn to_wire(&self) -> Bytes {
        let mut buf = BytesMut::new();
        let mut byte0 = wire::TYPE_MAP_REQUEST << 4;
        if self.authoritative {
            byte0 |= REQ_FLAG_AUTHORITATIVE;
        }
        if self.map_data_present {
            byte0 |= REQ_FLAG_MAP_DATA;
        }
        if self.probe {
            byte0 |= REQ_FLAG_PROBE;
        }
        if self.smr {
            byte0 |= REQ_FLAG_SMR;
        }
        buf.put_u8(byte0);
        let mut byte1 = 0u8;
        if self.pitr {
            byte1 |= REQ_FLAG_PITR;
        }
        if self.smr_invoked {
            byte1 |= REQ_FLAG_SMR_INVOKED;
        }
        buf.put_u8(byte1);
        buf.put_u8(self.itr_rlocs.len().saturating_sub(1) as u8);
        buf.put_u8(self.eid_items.len() as u8);
        buf.put_u64(self.nonce);
        match &self.source_eid {
            Some(eid) => MapRequest::encode_request_eid(eid, &mut buf),
            None => buf.put_u16(wire::AFI_NO_ADDRESS),
        }
        if self.itr_rlocs.is_empty() {
            // the count field cannot express zero entries; emit one null
            // ITR-RLOC so the message stays parseable
            buf.put_u16(wire::AFI_NO_ADDRESS);
        } else {
            for rloc in &self.itr_rlocs {
                rloc.0.encode(&mut buf);
            }
        }
        for eid in &self.eid_items {
            buf.put_u8(0); // reserved
            buf.put_u8(wire_mask(eid));
            MapRequest::encode_request_eid(eid, &mut buf);
        }
        buf.freeze()
    }

    /// The source EID has no mask byte of its own; EID items carry theirs
    /// separately.
    fn encode_request_eid(eid: &Eid, buf: &mut BytesMut) {
        match eid.vni {
            Some(iid) => LispAddr::Lcaf(crate::addr::LcafAddr::InstanceId {
                iid,
                address: Box::new(eid.addr.clone()),
            })
            .encode(buf),
            None => eid.addr.encode(buf),
        }
    }

    fn decode_request_eid(buf: &mut Bytes, mask: Option<u8>) -> Result<Eid, Error> {
        let addr = LispAddr::decode(buf)?;
        let (addr, vni) = match addr {
            LispAddr::Lcaf(crate::addr::LcafAddr::InstanceId { iid, address }) => {
                (*address, Some(iid))
            }
            other => (other, None),
        };
        let mask = match addr {
            LispAddr::Ipv4(_) | LispAddr::Ipv6(_) => mask,
            _ => None,
        };
        Ok(Eid { addr, mask, vni })
    }

    pub fn from_wire(mut buf: Bytes) -> Result<Self, Error> {
        let byte0 = get_u8(&mut buf, "request type/flags")?;
        if byte0 >> 4 != wire::TYPE_MAP_REQUEST {
            return Err(Error::MalformedPacket(format!(
                "not a Map-Request: type {}",
                byte0 >> 4
            )));
        }
        let byte1 = get_u8(&mut buf, "request flags")?;
        let itr_count = get_u8(&mut buf, "ITR-RLOC count")? as usize + 1;
        let record_count = get_u8(&mut buf, "EID record count")? as usize;
        let nonce = get_u64(&mut buf, "nonce")?;

        let source_eid = match MapRequest::decode_request_eid(&mut buf, None)? {
            Eid {
                addr: LispAddr::NoAddress,
                ..
            } => None,
            eid => Some(eid),
        };

        let mut itr_rlocs = Vec::with_capacity(itr_count);
        for _ in 0..itr_count {
            itr_rlocs.push(Rloc(LispAddr::decode(&mut buf)?));
        }

        let mut eid_items = Vec::with_capacity(record_count);
        for _ in 0..record_count {
            skip(&mut buf, 1, "EID record reserved")?;
            let mask = get_u8(&mut buf, "EID record mask")?;
            eid_items.push(MapRequest::decode_request_eid(&mut buf, Some(mask))?);
        }

        Ok(Self {
            authoritative: byte0 & REQ_FLAG_AUTHORITATIVE != 0,
            map_data_present: byte0 & REQ_FLAG_MAP_DATA != 0,
            probe: byte0 & REQ_FLAG_PROBE != 0,
            smr: byte0 & REQ_FLAG_SMR != 0,
            pitr: byte1 & REQ_FLAG_PITR != 0,
            smr_invoked: byte1 & REQ_FLAG_SMR_INVOKED != 0,
            nonce,
            source_eid,
            itr_rlocs,
            eid_items,
            source_rloc: None,
        })
    }
}

/* ---------------------------------------------------------------- *
 * Map-Reply (type 2)
 * ---------------------------------------------------------------- */

/// The answer to a Map-Request: one record per queried EID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapReply {
    pub probe: bool,
    pub echo_nonce: bool,
    pub security: bool,
    pub nonce: u64,
    pub records: Vec<MappingRecord>,
}

const REPLY_FLAG_PROBE: u8 = 0x08;
const REPLY_FLAG_ECHO_NONCE: u8 = 0x04;
const REPLY_FLAG_SECURITY: u8 = 0x02;

impl MapReply {
    pub fn new(nonce: u64, records: Vec<MappingRecord>) -> Self {
        Self {
            probe: false,
            echo_nonce: false,
            security: false,
            nonce,
            records,
        }
    }

    pub fn to_wire(&self) -> Bytes {
        let mut buf = BytesMut::new();
        let mut byte0 = wire::TYPE_MAP_REPLY << 4;
        if self.probe {
            byte0 |= REPLY_FLAG_PROBE;
        }
        if self.echo_nonce {
            byte0 |= REPLY_FLAG_ECHO_NONCE;
        }
        if self.security {
            byte0 |= REPLY_FLAG_SECURITY;
        }
        buf.put_u8(byte0);
        buf.put_u8(0);
        buf.put_u8(0);
        buf.put_u8(self.records.len() as u8);
        buf.put_u64(self.nonce);
        for record in &self.records {
            record.encode(&mut buf);
        }
        buf.freeze()
    }

    pub fn from_wire(mut buf: Bytes) -> Result<Self, Error> {
        let byte0 = get_u8(&mut buf, "reply type/flags")?;
        if byte0 >> 4 != wire::TYPE_MAP_REPLY {
            return Err(Error::MalformedPacket(format!(
                "not a Map-Reply: type {}",
                byte0 >> 4
            )));
        }
        skip(&mut buf, 2, "reply reserved")?;
        let record_count = get_u8(&mut buf, "record count")?;
        let nonce = get_u64(&mut buf, "nonce")?;
        let mut records = Vec::with_capacity(record_count as usize);
        for _ in 0..record_count {
            records.push(MappingRecord::decode(&mut buf)?);
        }
        Ok(Self {
            probe: byte0 & REPLY_FLAG_PROBE != 0,
            echo_nonce: byte0 & REPLY_FLAG_ECHO_NONCE != 0,
            security: byte0 & REPLY_FLAG_SECURITY != 0,
            nonce,
            records,
        })
    }
}

/* ---------------------------------------------------------------- *
 * Dispatch
 * ---------------------------------------------------------------- */

/// Any of the four control messages, for transport-level dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    Request(MapRequest),
    Reply(MapReply),
    Register(MapRegister),
    Notify(MapNotify),
}

impl ControlMessage {
    /// Decode a datagram based on the type code in the top 4 bits of byte 0.
    pub fn decode(buf: Bytes) -> Result<Self, Error> {
        let type_code = match buf.first() {
            Some(byte0) => byte0 >> 4,
            None => return Err(Error::MalformedPacket("empty buffer".into())),
        };
        match type_code {
            wire::TYPE_MAP_REQUEST => Ok(ControlMessage::Request(MapRequest::from_wire(buf)?)),
            wire::TYPE_MAP_REPLY => Ok(ControlMessage::Reply(MapReply::from_wire(buf)?)),
            wire::TYPE_MAP_REGISTER => Ok(ControlMessage::Register(MapRegister::from_wire(buf)?)),
            wire::TYPE_MAP_NOTIFY => Ok(ControlMessage::Notify(MapNotify::from_wire(buf)?)),
            other => {
                debug!("rejecting datagram with unknown message type {}", other);
                Err(Error::MalformedPacket(format!(
                    "unknown message type {}",
                    other
                )))
            }
        }
    }
}
