//! Campus Virtual backend library.
//!
//! Hexagonal layout: `domain` holds the entities, ports and services;
//! `inbound` adapts HTTP onto the driving ports; `outbound` implements the
//! driven ports against PostgreSQL and external HTTP collaborators;
//! `server` wires everything together.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use doc::ApiDoc;
pub use middleware::Trace;
