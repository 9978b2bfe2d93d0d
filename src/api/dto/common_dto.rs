//! Shared DTO types used across multiple endpoints.

use serde::Serialize;
use utoipa::ToSchema;

/// A report that is either fully computed or an empty JSON object.
///
/// Serializes `Empty` as `{}` so clients can test for missing keys instead
/// of handling `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MaybeEmpty<T> {
    /// Computed report.
    Ready(T),
    /// No data to report on.
    Empty {},
}

impl<T> From<Option<T>> for MaybeEmpty<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty {}, Self::Ready)
    }
}

/// Plain status message.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Message text.
    pub message: String,
}
