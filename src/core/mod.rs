//! # Core Utilities
//!
//! Small helpers shared across the issuance core: random identifier
//! generation and `application/x-www-form-urlencoded` serialization for
//! error responses and credential offer deep links.

pub mod generate;
pub mod jws;
pub mod urlencode;
