//! Wire-format layer of the LISP mapping service.
//!
//! This crate holds everything that touches bytes on the wire: LISP
//! addresses (including LCAF composites), the four control messages and
//! registration authentication. It is transport-agnostic; the service
//! logic lives in `rust-lispms-core`.

pub mod addr;
pub mod auth;
pub mod error;
pub mod msg;
pub mod wire;

pub use addr::{Eid, LcafAddr, LispAddr, Rloc};
pub use error::Error;
pub use msg::{
    ControlMessage, LocatorRecord, MapNotify, MapRegister, MapReply, MapReplyAction, MapRequest,
    MappingRecord, SiteId, XtrId,
};

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
