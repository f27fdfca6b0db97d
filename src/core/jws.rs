//! Unverified peeking into a compact JWS.
//!
//! The real cryptographic verification of a holder's proof JWT is an
//! external collaborator's job (§4.5/§6: "the JWS signature itself is
//! separately verified by the signer dispatch's JWT verify callback").
//! What this core needs *before* that verification can even be attempted —
//! which key to resolve, which session a request belongs to — requires only
//! base64url-decoding and JSON-parsing the JWS segments, not checking the
//! signature. That's what lives here.

use anyhow::{Context, Result, anyhow};
use base64ct::{Base64UrlUnpadded, Encoding};
use credibil_infosec::PublicKeyJwk;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// The subset of a JWS protected header this core inspects.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProtectedHeader {
    /// Signing algorithm.
    #[serde(default)]
    pub alg: Option<String>,
    /// Key identifier — expected to be a DID URL with a fragment.
    #[serde(default)]
    pub kid: Option<String>,
    /// An embedded JWK, used when the holder has no DID.
    #[serde(default)]
    pub jwk: Option<PublicKeyJwk>,
}

/// Split a compact JWS into its three base64url segments.
fn segments(compact_jws: &str) -> Result<[&str; 3]> {
    let mut parts = compact_jws.split('.');
    let header = parts.next().context("missing JWS header segment")?;
    let payload = parts.next().context("missing JWS payload segment")?;
    let signature = parts.next().context("missing JWS signature segment")?;
    if parts.next().is_some() {
        return Err(anyhow!("JWS has more than three segments"));
    }
    Ok([header, payload, signature])
}

/// Decode (without verifying) the protected header of a compact JWS.
pub fn decode_header(compact_jws: &str) -> Result<ProtectedHeader> {
    let [header, ..] = segments(compact_jws)?;
    let bytes = Base64UrlUnpadded::decode_vec(header).context("decoding JWS header")?;
    serde_json::from_slice(&bytes).context("parsing JWS header")
}

/// Decode (without verifying) the payload of a compact JWS into `T`.
pub fn decode_payload<T: DeserializeOwned>(compact_jws: &str) -> Result<T> {
    let [_, payload, _] = segments(compact_jws)?;
    let bytes = Base64UrlUnpadded::decode_vec(payload).context("decoding JWS payload")?;
    serde_json::from_slice(&bytes).context("parsing JWS payload")
}
