//! # Issuance Errors
//!
//! Errors raised by the issuance session state machine, the request
//! resolver, the credential matcher, the holder-binding extractor, and the
//! signer dispatch. The taxonomy and session-mutation consequences follow
//! the rules a `SessionStore` implementation must respect (§7 of the core
//! design): only `SignerProducedNothing` and `DeferredUnsupported` ever move
//! a session to `State::Error`.

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::core::urlencode;

/// Errors produced by the issuance core.
#[derive(Error, Debug, Deserialize)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Offer construction constraints were violated (non-unique
    /// configuration ids, an id not supported by the issuer, or an
    /// inconsistent `tx_code`/`user_pin_required` pairing). No session is
    /// written.
    #[error(r#"{{"error": "invalid_offer", "error_description": "{0}"}}"#)]
    InvalidOffer(String),

    /// The session is not in a state that accepts a credential request.
    #[error(r#"{{"error": "invalid_request", "error_description": "{0}"}}"#)]
    InvalidState(String),

    /// The credential request did not include a `proof`.
    #[error(r#"{{"error": "invalid_credential_request", "error_description": "{0}"}}"#)]
    MissingProof(String),

    /// No `c_nonce` could be extracted from the credential request.
    #[error(r#"{{"error": "invalid_nonce", "error_description": "{0}"}}"#)]
    MissingNonce(String),

    /// The extracted `c_nonce` does not match the session's current nonce.
    #[error(r#"{{"error": "invalid_nonce", "error_description": "{0}"}}"#)]
    NonceMismatch(String),

    /// The session's `c_nonce` is missing or has expired.
    #[error(r#"{{"error": "invalid_nonce", "error_description": "{0}"}}"#)]
    NonceExpired(String),

    /// `credential_identifier` does not name an offered configuration.
    #[error(r#"{{"error": "invalid_credential_request", "error_description": "{0}"}}"#)]
    NotOffered(String),

    /// No offered, unissued configuration matches the request's format and
    /// type/vct/doctype constraints.
    #[error(r#"{{"error": "unsupported_credential_type", "error_description": "{0}"}}"#)]
    NoMatchingOffer(String),

    /// The signer's declared output format disagrees with the request's
    /// `format`.
    #[error(r#"{{"error": "invalid_credential_request", "error_description": "{0}"}}"#)]
    FormatMismatch(String),

    /// The matched configuration id has already been issued in this
    /// session.
    #[error(r#"{{"error": "credential_request_denied", "error_description": "{0}"}}"#)]
    AlreadyIssued(String),

    /// The signer produced no credential. The session is moved to `Error`.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    SignerProducedNothing(String),

    /// The inner issuance library returned an `acceptance_token` or
    /// `transaction_id`; deferred issuance is not supported. The session is
    /// moved to `Error`.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    DeferredUnsupported(String),

    /// A holder-binding proof could not be verified or extracted, for
    /// reasons other than the two named kid failures below (a malformed JWT
    /// header, an embedded `jwk` that doesn't parse, a DID that fails to
    /// resolve, ...).
    #[error(r#"{{"error": "invalid_proof", "error_description": "{0}"}}"#)]
    InvalidProof(String),

    /// The proof's `kid` does not start with `did:` (§4.5: only DID-scheme
    /// `kid`s are supported by this core).
    #[error(r#"{{"error": "invalid_proof", "error_description": "{0}"}}"#)]
    UnsupportedKidScheme(String),

    /// The proof's `kid` is a DID URL but carries no `#fragment`, so it does
    /// not unambiguously identify a single verification method (§4.5).
    #[error(r#"{{"error": "invalid_proof", "error_description": "{0}"}}"#)]
    AmbiguousKid(String),

    /// The holder's key advertises no algorithm this issuer's W3C signer
    /// supports (§4.6 W3C signer detail).
    #[error(r#"{{"error": "invalid_proof", "error_description": "{0}"}}"#)]
    NoSupportedAlgorithm(String),

    /// A store lookup found no matching row.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    NotFound(String),

    /// A store lookup that should return at most one row returned more than
    /// one.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    AmbiguousSession(String),
}

impl Error {
    /// Does this error, when surfaced from the signer dispatch, require the
    /// session to be moved to `State::Error`?
    #[must_use]
    pub const fn transitions_to_error(&self) -> bool {
        matches!(self, Self::SignerProducedNothing(_) | Self::DeferredUnsupported(_))
    }
}

/// Wire shape for an `OpenID` error response.
#[derive(Deserialize, Serialize)]
struct OidError {
    error: String,
    error_description: String,
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error as SerdeError;

        let Ok(error) = serde_json::from_str::<OidError>(&self.to_string()) else {
            return Err(SerdeError::custom("issue deserializing Err"));
        };
        error.serialize(serializer)
    }
}

impl Error {
    /// Render the error in `OpenID`-compatible JSON shape.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.to_string()).unwrap_or_default()
    }

    /// Render the error as an `OpenID`-compatible query string.
    #[must_use]
    pub fn to_querystring(&self) -> String {
        urlencode::to_string(&self).unwrap_or_default()
    }
}

/// Result type used throughout the issuance core.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Construct an `Error::InvalidState` (or sibling client-error variant) from
/// a format string.
#[macro_export]
macro_rules! invalid {
    ($variant:ident, $fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::Error::$variant(format!($fmt $(, $arg)*))
    };
}

/// Construct a hard-fail error (`SignerProducedNothing` or
/// `DeferredUnsupported`) that moves the session to `State::Error`.
#[macro_export]
macro_rules! fail {
    ($variant:ident, $fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::Error::$variant(format!($fmt $(, $arg)*))
    };
}
