//! # Holder-Binding Extraction
//!
//! Determines which key material a holder's proof of possession is bound
//! to, so the signer dispatch can imprint that key (or DID) into the issued
//! credential (§4.5). This module only inspects the proof's unverified JWS
//! header — actually checking the signature against the resolved key is the
//! signer dispatch's job when it calls into the JWT verify callback.

use credibil_did::{DidResolver, PublicKeyJwk, Resource};

use crate::core::jws;
use crate::request::CredentialRequest;
use crate::{Result, invalid};

/// The key material a holder's proof is bound to.
#[derive(Clone, Debug, PartialEq)]
pub enum HolderBinding {
    /// Bound to a DID URL's verification method.
    Did {
        /// The full `kid` (DID plus fragment) from the proof header.
        did_url: String,
        /// The JWK dereferenced from `did_url`.
        key: PublicKeyJwk,
    },
    /// Bound to a JWK embedded directly in the proof header, for holders
    /// without a DID.
    Jwk {
        /// The embedded JWK.
        key: PublicKeyJwk,
    },
}

impl HolderBinding {
    /// The JWK to imprint into the issued credential's key material,
    /// regardless of which branch produced it.
    #[must_use]
    pub const fn key(&self) -> &PublicKeyJwk {
        match self {
            Self::Did { key, .. } | Self::Jwk { key } => key,
        }
    }
}

/// Extracts holder-binding key material from a credential request's proof.
pub struct HolderBindingExtractor;

impl HolderBindingExtractor {
    /// Determine the holder binding carried by `request`'s proof.
    ///
    /// Inspects the proof JWT's unverified protected header: a `kid` must be
    /// a DID URL with a fragment identifying a verification method; absent
    /// that, an embedded `jwk` is used directly. Exactly one of the two is
    /// required.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingProof` if `request` has no proof;
    /// `Error::UnsupportedKidScheme` if a `kid` is present but is not a
    /// `did:` URL; `Error::AmbiguousKid` if it is a DID URL but carries no
    /// `#fragment`; and `Error::InvalidProof` if the header is otherwise
    /// malformed, neither `kid` nor `jwk` is present, or DID resolution
    /// fails.
    pub async fn extract_binding<R>(
        request: &CredentialRequest, resolver: &R,
    ) -> Result<HolderBinding>
    where
        R: DidResolver + Clone + Send + Sync,
    {
        let proof = request.proof.as_ref().ok_or_else(|| invalid!(MissingProof, "credential request has no proof"))?;

        let header = jws::decode_header(&proof.jwt)
            .map_err(|e| invalid!(InvalidProof, "malformed proof JWT header: {e}"))?;

        if let Some(kid) = header.kid {
            if !kid.starts_with("did:") {
                return Err(invalid!(
                    UnsupportedKidScheme,
                    "proof kid '{kid}' is not a did: URL"
                ));
            }
            if !kid.contains('#') {
                return Err(invalid!(
                    AmbiguousKid,
                    "proof kid '{kid}' has no #fragment identifying a verification method"
                ));
            }
            let key = dereference_kid(&kid, resolver).await?;
            return Ok(HolderBinding::Did { did_url: kid, key });
        }

        if let Some(jwk) = header.jwk {
            return Ok(HolderBinding::Jwk { key: jwk });
        }

        Err(invalid!(InvalidProof, "proof header has neither kid nor jwk"))
    }
}

async fn dereference_kid<R>(kid: &str, resolver: &R) -> Result<PublicKeyJwk>
where
    R: DidResolver + Clone + Send + Sync,
{
    let deref = credibil_did::dereference(kid, None, resolver.clone())
        .await
        .map_err(|e| invalid!(InvalidProof, "issue dereferencing DID URL: {e}"))?;
    let Some(Resource::VerificationMethod(vm)) = deref.content_stream else {
        return Err(invalid!(InvalidProof, "verification method not found for '{kid}'"));
    };
    vm.method_type.jwk().map_err(|e| invalid!(InvalidProof, "JWK not found on verification method: {e}"))
}
