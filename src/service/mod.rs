//! Service layer: the aggregation façade used by HTTP handlers.
//!
//! [`HomeownerService`] reads the current snapshot from the
//! [`super::domain::DatasetCache`] and delegates to the pure functions in
//! [`super::domain::aggregate`].

pub mod homeowner_service;

pub use homeowner_service::{HomeownerService, RankedHomeowner};
