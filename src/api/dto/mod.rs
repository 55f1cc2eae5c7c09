//! Data Transfer Objects for REST request/response serialization.
//!
//! All decimal amounts are serialized as JSON strings so that no precision
//! is lost to binary floating point on the client side.

pub mod portfolio_dto;
pub mod price_dto;
pub mod reward_dto;

pub use portfolio_dto::*;
pub use price_dto::*;
pub use reward_dto::*;
