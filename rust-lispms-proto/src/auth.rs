//! Registration authentication (HMAC over the full message).
//!
//! The MAC covers the entire Map-Register or Map-Notify with the
//! authentication data field zeroed out. Validation re-encodes the decoded
//! message, zeroes the field in place and compares in constant time.

use crate::error::Error;
use crate::msg::{MapNotify, MapRegister};
use crate::wire::AUTH_DATA_OFFSET;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA-256-128, the only algorithm this service speaks.
pub const KEY_ID_HMAC_SHA256_128: u16 = 2;

const HMAC_SHA256_128_LEN: usize = 16;

/// A shared secret provisioned for an EID prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthKey {
    pub key_id: u16,
    pub secret: String,
}

impl AuthKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            key_id: KEY_ID_HMAC_SHA256_128,
            secret: secret.into(),
        }
    }
}

/// The authentication data length for a key id.
pub fn auth_data_len(key_id: u16) -> Result<usize, Error> {
    match key_id {
        KEY_ID_HMAC_SHA256_128 => Ok(HMAC_SHA256_128_LEN),
        other => Err(Error::Authentication(format!(
            "unsupported key id {}",
            other
        ))),
    }
}

fn mac(secret: &str, message: &[u8]) -> Result<HmacSha256, Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Authentication(format!("invalid key: {}", e)))?;
    mac.update(message);
    Ok(mac)
}

fn zero_auth_field(message: &mut [u8], len: usize) -> Result<(), Error> {
    let end = AUTH_DATA_OFFSET + len;
    if message.len() < end {
        return Err(Error::Authentication(
            "message shorter than its authentication data".into(),
        ));
    }
    message[AUTH_DATA_OFFSET..end].fill(0);
    Ok(())
}

/// Check a Map-Register's MAC against the provisioned key.
///
/// Fails on an unsupported key id, a key id mismatch, a wrong-length
/// authentication field or a MAC mismatch.
pub fn validate_register(register: &MapRegister, key: &AuthKey) -> Result<(), Error> {
    if register.key_id != key.key_id {
        return Err(Error::Authentication(format!(
            "key id mismatch: message has {}, key is {}",
            register.key_id, key.key_id
        )));
    }
    let len = auth_data_len(register.key_id)?;
    if register.authentication_data.len() != len {
        return Err(Error::Authentication(format!(
            "authentication data length {} does not match key id {}",
            register.authentication_data.len(),
            register.key_id
        )));
    }
    let mut message = register.to_wire().to_vec();
    zero_auth_field(&mut message, len)?;
    mac(&key.secret, &message)?
        .verify_truncated_left(&register.authentication_data)
        .map_err(|_| Error::Authentication("MAC mismatch".into()))
}

/// Fill in a Map-Notify's authentication data before sending.
pub fn sign_notify(notify: &mut MapNotify, key: &AuthKey) -> Result<(), Error> {
    let len = auth_data_len(key.key_id)?;
    notify.key_id = key.key_id;
    notify.authentication_data = vec![0u8; len];
    let message = notify.to_wire();
    let tag = mac(&key.secret, &message)?.finalize().into_bytes();
    notify.authentication_data = tag[..len].to_vec();
    Ok(())
}

/// Compute the authentication data for a register, for clients and tests.
pub fn sign_register(register: &mut MapRegister, key: &AuthKey) -> Result<(), Error> {
    let len = auth_data_len(key.key_id)?;
    register.key_id = key.key_id;
    register.authentication_data = vec![0u8; len];
    let message = register.to_wire();
    let tag = mac(&key.secret, &message)?.finalize().into_bytes();
    register.authentication_data = tag[..len].to_vec();
    Ok(())
}
