//! Domain layer: customer records, the dataset snapshot cache, and the
//! aggregations served over it.
//!
//! [`DatasetCache`] is the only stateful component. Everything in
//! [`aggregate`] is a pure function of a [`Dataset`].

pub mod aggregate;
pub mod dataset;
pub mod dataset_cache;
pub mod homeowner;

pub use dataset::Dataset;
pub use dataset_cache::{CacheStatus, DatasetCache};
pub use homeowner::{Homeowner, RawRecord};
