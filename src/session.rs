//! # Issuance Sessions
//!
//! Per-flow persistent state tracking a single offer from creation through
//! delivery of every offered credential. See invariants I1-I5 in the core
//! design for the constraints a `SessionStore` must uphold across
//! concurrent access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::offer::{CredentialOfferPayload, CredentialOfferPayloadV11, OfferVersion, TxCode};

/// The issuance session's protocol state.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum SessionState {
    /// The offer has been created and persisted.
    OfferCreated,
    /// The wallet has retrieved the offer by its `credential_offer_uri`.
    OfferUriRetrieved,
    /// The wallet has requested an access token (out-of-band).
    AccessTokenRequested,
    /// An access token has been issued.
    AccessTokenCreated,
    /// At least one credential request has been received.
    CredentialRequestReceived,
    /// Some, but not all, offered configurations have been issued.
    CredentialsPartiallyIssued,
    /// Every offered configuration has been issued.
    Completed,
    /// A hard, server-side failure occurred; see `error_message`.
    Error,
}

/// Per-flow persistent issuance state.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct IssuanceSession {
    /// Opaque session id.
    pub id: String,
    /// The issuer this session belongs to.
    pub issuer_id: String,

    /// Unique (per issuer) URI at which the wallet can retrieve the offer.
    pub credential_offer_uri: String,
    /// Canonical, draft-13-shaped offer payload.
    pub credential_offer_payload: CredentialOfferPayload,
    /// Draft-11 projection, present iff the offer was created with
    /// `version = v1.draft11`.
    pub credential_offer_payload_v11: Option<CredentialOfferPayloadV11>,
    /// The version the offer was originally created for.
    pub version: OfferVersion,

    /// The pre-authorized code minted for this offer.
    pub pre_authorized_code: String,
    /// `tx_code` descriptor, present iff `user_pin_required`.
    pub tx_code: Option<TxCode>,
    /// Mirrors `tx_code.is_some()` (invariant I5).
    pub user_pin_required: bool,

    /// Opaque metadata carried end-to-end from offer creation to the final
    /// credential response.
    pub issuance_metadata: serde_json::Map<String, serde_json::Value>,

    /// The configuration ids offered in this session.
    pub offered_credentials: Vec<String>,
    /// Configuration ids already delivered in this session, in delivery
    /// order. A subset of `offered_credentials` (invariant I3).
    pub issued_credentials: Vec<String>,

    /// Current protocol state.
    pub state: SessionState,

    /// Per-session freshness challenge the wallet must echo in its proof.
    pub c_nonce: Option<String>,
    /// Expiry of `c_nonce`.
    pub c_nonce_expires_at: Option<DateTime<Utc>>,

    /// Set iff `state == Error`.
    pub error_message: Option<String>,

    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl IssuanceSession {
    /// Configuration ids offered but not yet issued, in offer order.
    #[must_use]
    pub fn remaining_credentials(&self) -> Vec<&str> {
        self.offered_credentials
            .iter()
            .filter(|id| !self.issued_credentials.iter().any(|issued| issued == *id))
            .map(String::as_str)
            .collect()
    }

    /// Has `configuration_id` already been delivered in this session?
    #[must_use]
    pub fn has_issued(&self, configuration_id: &str) -> bool {
        self.issued_credentials.iter().any(|id| id == configuration_id)
    }

    /// Is the session's `c_nonce` missing or expired?
    #[must_use]
    pub fn nonce_expired(&self) -> bool {
        match self.c_nonce_expires_at {
            Some(exp) => exp <= Utc::now(),
            None => true,
        }
    }

    /// Append `configuration_id` to `issued_credentials`, per §4.6 step 5:
    /// the slot is reserved (and, once persisted, considered consumed)
    /// before the signer is invoked. Does not touch `state` — the signer
    /// call happens between reserving a slot and advancing state, so the
    /// two are split rather than bundled into one mutation.
    pub fn reserve(&mut self, configuration_id: &str) {
        self.issued_credentials.push(configuration_id.to_string());
    }

    /// Advance `state` to `CredentialsPartiallyIssued` or `Completed`
    /// depending on whether any offered configuration remains unissued,
    /// per §4.6 step 10. Called after the signer has successfully produced
    /// a credential for a slot already reserved via `reserve`.
    pub fn advance_state(&mut self) {
        self.state = if self.remaining_credentials().is_empty() {
            SessionState::Completed
        } else {
            SessionState::CredentialsPartiallyIssued
        };
    }

    /// Reserve `configuration_id` and immediately advance `state`, for
    /// callers that don't need the signer call split in between (unit
    /// tests in this module; a host replaying a delivery record).
    pub fn mark_issued(&mut self, configuration_id: &str) {
        self.reserve(configuration_id);
        self.advance_state();
    }

    /// Move the session to `Error`, per §7: only hard server-side failures
    /// do this.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.state = SessionState::Error;
        self.error_message = Some(message.into());
    }

    /// Check the invariants that must hold for any persisted session.
    ///
    /// Used by `SessionStore` implementations (and by tests) as a sanity
    /// check after a write; not called on every read for performance
    /// reasons.
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        let issued_is_subset = self.issued_credentials.iter().all(|id| {
            self.offered_credentials.iter().any(|offered| offered == id)
        });
        let issued_unique = {
            let mut seen = std::collections::HashSet::new();
            self.issued_credentials.iter().all(|id| seen.insert(id))
        };
        let pin_consistent = self.tx_code.is_some() == self.user_pin_required;
        issued_is_subset && issued_unique && pin_consistent
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::offer::{Grants, PreAuthorizedGrant};

    fn session() -> IssuanceSession {
        IssuanceSession {
            id: "sess-1".to_string(),
            issuer_id: "https://issuer.example".to_string(),
            credential_offer_uri: "https://issuer.example/credential_offer/abc".to_string(),
            credential_offer_payload: CredentialOfferPayload {
                credential_issuer: "https://issuer.example".to_string(),
                credential_configuration_ids: vec!["A".to_string(), "B".to_string()],
                grants: Grants {
                    pre_authorized_code: PreAuthorizedGrant {
                        pre_authorized_code: "code".to_string(),
                        tx_code: None,
                        user_pin_required: None,
                    },
                },
            },
            credential_offer_payload_v11: None,
            version: OfferVersion::V1Draft13,
            pre_authorized_code: "code".to_string(),
            tx_code: None,
            user_pin_required: false,
            issuance_metadata: serde_json::Map::new(),
            offered_credentials: vec!["A".to_string(), "B".to_string()],
            issued_credentials: vec![],
            state: SessionState::AccessTokenCreated,
            c_nonce: Some("nonce-1".to_string()),
            c_nonce_expires_at: Some(Utc::now() + Duration::minutes(5)),
            error_message: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn mark_issued_partial_then_complete() {
        let mut s = session();
        s.mark_issued("A");
        assert_eq!(s.state, SessionState::CredentialsPartiallyIssued);
        assert_eq!(s.remaining_credentials(), vec!["B"]);

        s.mark_issued("B");
        assert_eq!(s.state, SessionState::Completed);
        assert!(s.remaining_credentials().is_empty());
    }

    #[test]
    fn nonce_expiry() {
        let mut s = session();
        assert!(!s.nonce_expired());
        s.c_nonce_expires_at = Some(Utc::now() - Duration::seconds(1));
        assert!(s.nonce_expired());
        s.c_nonce_expires_at = None;
        assert!(s.nonce_expired());
    }

    #[test]
    fn invariants_hold_for_fresh_session() {
        assert!(session().invariants_hold());
    }

    #[test]
    fn invariants_catch_pin_mismatch() {
        let mut s = session();
        s.user_pin_required = true;
        assert!(!s.invariants_hold());
    }

    #[test]
    fn mark_error_sets_message() {
        let mut s = session();
        s.mark_error("signer produced nothing");
        assert_eq!(s.state, SessionState::Error);
        assert_eq!(s.error_message.as_deref(), Some("signer produced nothing"));
    }
}
