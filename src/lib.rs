//! # rfmd-gateway
//!
//! Cached REST API over a denormalized RFM-D (Recency, Frequency,
//! Monetary, Duration) customer table.
//!
//! The whole table is loaded from BigQuery (or a JSON file) into an
//! in-memory snapshot that is refreshed lazily once it outlives its TTL.
//! Every endpoint is a pure aggregation over the current snapshot.
//!
//! ## Architecture
//!
//! ```text
//! Clients (dashboard, HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── HomeownerService (service/)
//!     │
//!     ├── aggregate + DatasetCache (domain/)
//!     │
//!     └── DataLoader: BigQuery REST / JSON file (loader/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod loader;
pub mod service;
