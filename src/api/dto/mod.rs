//! Data Transfer Objects for REST request/response serialization.
//!
//! Response bodies for the aggregation endpoints are the domain report
//! types themselves; this module only adds query parameters and the
//! wrappers that shape HTTP payloads.

pub mod common_dto;
pub mod homeowner_dto;

pub use common_dto::*;
pub use homeowner_dto::*;
