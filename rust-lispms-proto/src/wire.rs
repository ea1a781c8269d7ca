//! Low-level wire constants and checked buffer reads.
//!
//! Constants follow the IANA address-family and LISP (RFC 6830 / RFC 8060)
//! registries. The read helpers fail with [`Error::MalformedPacket`] instead
//! of panicking when the buffer runs dry, so decoding of a truncated
//! datagram surfaces as a distinct error kind.

use crate::error::Error;
use bytes::Buf;

/* ---------------------------------------------------------------- *
 * Address family identifiers (AFIs)
 * ---------------------------------------------------------------- */

pub const AFI_NO_ADDRESS: u16 = 0;
pub const AFI_IPV4: u16 = 1;
pub const AFI_IPV6: u16 = 2;
pub const AFI_DISTINGUISHED_NAME: u16 = 17;
pub const AFI_AS_NUMBER: u16 = 18;
pub const AFI_LCAF: u16 = 16387;
pub const AFI_MAC: u16 = 16389;

/* ---------------------------------------------------------------- *
 * LCAF sub-type codes (RFC 8060)
 * ---------------------------------------------------------------- */

pub const LCAF_AFI_LIST: u8 = 1;
pub const LCAF_INSTANCE_ID: u8 = 2;
pub const LCAF_APPLICATION_DATA: u8 = 4;
pub const LCAF_EXPLICIT_LOCATOR_PATH: u8 = 10;
pub const LCAF_SOURCE_DEST: u8 = 12;
pub const LCAF_KEY_VALUE: u8 = 15;

/// Bytes between the LCAF AFI field and the payload: rsvd1, flags,
/// sub-type, rsvd2, 2-byte length. The length field covers the payload
/// only, not this header.
pub const LCAF_HEADER_LEN: usize = 6;

/* ---------------------------------------------------------------- *
 * Message type codes (top 4 bits of byte 0)
 * ---------------------------------------------------------------- */

pub const TYPE_MAP_REQUEST: u8 = 1;
pub const TYPE_MAP_REPLY: u8 = 2;
pub const TYPE_MAP_REGISTER: u8 = 3;
pub const TYPE_MAP_NOTIFY: u8 = 4;

/// Offset of the authentication data within Map-Register and Map-Notify
/// messages: type/flags (1) + reserved (1) + flags (1) + record count (1)
/// + nonce (8) + key id (2) + auth length (2).
pub const AUTH_DATA_OFFSET: usize = 16;

/* ---------------------------------------------------------------- *
 * Checked reads
 * ---------------------------------------------------------------- */

/// Ensure `len` bytes are available before a read.
pub fn need(buf: &impl Buf, len: usize, what: &str) -> Result<(), Error> {
    if buf.remaining() < len {
        return Err(Error::MalformedPacket(format!(
            "buffer underflow reading {}: need {} bytes, have {}",
            what,
            len,
            buf.remaining()
        )));
    }
    Ok(())
}

pub fn get_u8(buf: &mut impl Buf, what: &str) -> Result<u8, Error> {
    need(buf, 1, what)?;
    Ok(buf.get_u8())
}

pub fn get_u16(buf: &mut impl Buf, what: &str) -> Result<u16, Error> {
    need(buf, 2, what)?;
    Ok(buf.get_u16())
}

pub fn get_u32(buf: &mut impl Buf, what: &str) -> Result<u32, Error> {
    need(buf, 4, what)?;
    Ok(buf.get_u32())
}

pub fn get_u64(buf: &mut impl Buf, what: &str) -> Result<u64, Error> {
    need(buf, 8, what)?;
    Ok(buf.get_u64())
}

pub fn get_bytes(buf: &mut impl Buf, len: usize, what: &str) -> Result<Vec<u8>, Error> {
    need(buf, len, what)?;
    let mut out = vec![0u8; len];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

/// Skip reserved bytes, still length-checked.
pub fn skip(buf: &mut impl Buf, len: usize, what: &str) -> Result<(), Error> {
    need(buf, len, what)?;
    buf.advance(len);
    Ok(())
}
