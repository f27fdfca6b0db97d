//! A session state machine and credential-request resolver for an
//! [OpenID for Verifiable Credential Issuance](https://openid.net/specs/openid-4-verifiable-credential-issuance-1_0.html)
//! issuer, supporting both the current (draft 13) and legacy (draft 11)
//! wire shapes via the pre-authorized code grant.
//!
//! This crate owns the issuance session lifecycle, offer construction,
//! credential matching, holder-binding extraction, and signer dispatch
//! coordination. It does not speak HTTP, does not verify JWS signatures
//! itself, does not resolve DIDs itself, and does not sign anything itself
//! — those are supplied by the host through the traits in [`store`],
//! [`dispatch`], and the re-exported [`credibil_did`]/[`credibil_infosec`]
//! collaborator crates.
//!
//! # Feature Flags
//!
//! There is no default feature. The following feature is available:
//!
//! * `qrcode` - Enables `OfferBuilder::to_qrcode`, rendering a credential
//!   offer deep link as a PNG data URI.

pub mod binding;
pub mod config;
pub mod core;
pub mod dispatch;
mod error;
pub mod issuer;
pub mod matcher;
pub mod offer;
pub mod provider;
pub mod request;
pub mod resolver;
pub mod session;
pub mod store;
pub mod test_support;
pub mod version;

pub use error::{Error, Result};

/// Re-export DID resolution.
pub mod did {
    pub use credibil_did::*;
}

/// Re-export cryptographic types and functions.
pub mod infosec {
    pub use credibil_infosec::*;
}
