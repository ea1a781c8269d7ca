//! Control-plane logic of the LISP mapping service.
//!
//! Builds the map-resolver and map-server roles on top of the wire layer
//! in `rust-lispms-proto`: a longest-prefix-match mapping database, the
//! multi-registrant merge engine, the resolver and registrar message
//! handlers, and the solicit-map-request retry scheduler. Transports,
//! persistence backends and cluster election are collaborators behind
//! small seams ([`smr::SmrSender`], [`registrar::WriteAuthority`], the
//! mapping-changed channel); nothing here touches the network directly.

pub mod config;
pub mod mapdb;
pub mod merge;
pub mod registrar;
pub mod resolver;
pub mod smr;
pub mod subscriber;

pub use config::{ElpPolicy, LookupPolicy, MappingServiceConfig};
pub use mapdb::{MappingDb, MappingLookup, MappingOrigin};
pub use registrar::{MapServer, RegistrationResult, Standalone, WriteAuthority};
pub use resolver::MapResolver;
pub use smr::{SmrScheduler, SmrSender};
pub use subscriber::Subscriber;
