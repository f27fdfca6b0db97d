//! # Provider
//!
//! Re-exports the external collaborator traits this core is generic over,
//! and a convenience `Provider` supertrait for hosts that implement all of
//! them on a single type, mirroring the aggregate provider pattern used
//! elsewhere in the OID4VCI ecosystem.

pub use credibil_did::DidResolver;
pub use credibil_infosec::Signer;

pub use crate::dispatch::{CredentialMapper, MsoMdocSigner, SdJwtVcSigner, W3cVcSigner};
pub use crate::store::{IssuerStore, SessionStore};

/// A single type that implements every collaborator trait this core needs.
///
/// Implementing this (rather than threading six generic parameters through
/// every call site) is optional — every operation in this core takes its
/// collaborators as separate generic bounds so a host can mix and match
/// independently, but a host with one backing implementation for everything
/// can implement `Provider` once and let its methods satisfy all the bounds
/// at each call site.
pub trait Provider:
    SessionStore
    + IssuerStore
    + DidResolver
    + Clone
    + Send
    + Sync
    + CredentialMapper
    + W3cVcSigner
    + SdJwtVcSigner
    + MsoMdocSigner
{
}

impl<T> Provider for T where
    T: SessionStore
        + IssuerStore
        + DidResolver
        + Clone
        + Send
        + Sync
        + CredentialMapper
        + W3cVcSigner
        + SdJwtVcSigner
        + MsoMdocSigner
{
}
