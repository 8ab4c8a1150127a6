//! Data Transfer Objects for REST request/response serialization.
//!
//! Amounts are whole Toman; timestamps are RFC 3339.

pub mod common_dto;
pub mod purchase_dto;

pub use common_dto::*;
pub use purchase_dto::*;
