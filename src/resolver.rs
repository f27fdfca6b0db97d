//! # Request Resolution
//!
//! Correlates an inbound credential request with its issuance session
//! (§4.3), and checks the session is in a state — and carries a nonce — that
//! the request can actually be served against (§4.2/§4.3).

use chrono::Utc;
use serde::Deserialize;

use crate::config::IssuerConfig;
use crate::core::generate;
use crate::request::CredentialRequest;
use crate::session::{IssuanceSession, SessionState};
use crate::store::{SessionQuery, SessionStore};
use crate::{Error, Result, invalid};

/// The states from which a session accepts a credential request.
const REQUEST_ACCEPTING_STATES: [SessionState; 3] = [
    SessionState::AccessTokenCreated,
    SessionState::CredentialRequestReceived,
    SessionState::CredentialsPartiallyIssued,
];

#[derive(Deserialize)]
struct NonceClaim {
    nonce: String,
}

/// Correlates credential requests with issuance sessions.
pub struct RequestResolver;

impl RequestResolver {
    /// Extract a `c_nonce` from `request` and look up the session it
    /// belongs to.
    ///
    /// Probes, in order: (a) `request.c_nonce`, (b) `request.proof.c_nonce`,
    /// (c) the `nonce` claim of the proof JWT's unverified payload. The
    /// first nonce found is used; the others are not cross-checked against
    /// it.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingNonce` if no nonce can be extracted by any
    /// probe, and `Error::NotFound` if no live session carries the extracted
    /// nonce for `issuer_id`.
    pub async fn find_session_for_request(
        store: &impl SessionStore, issuer_id: &str, request: &CredentialRequest,
    ) -> Result<IssuanceSession> {
        let nonce = extract_nonce(request)?;
        let query = SessionQuery::ByNonce { issuer_id: Some(issuer_id.to_string()), c_nonce: nonce.clone() };
        store
            .find_single_by_query(&query)
            .await?
            .ok_or_else(|| invalid!(NotFound, "no session found for nonce '{nonce}'"))
    }

    /// Check that `session` is in a state that accepts `request`, and that
    /// the request's nonce agrees with the session's current, unexpired
    /// nonce.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState` if `session.state` does not accept requests.
    /// - `Error::MissingProof` if `request.proof` is absent.
    /// - `Error::NonceMismatch` if the extracted nonce differs from
    ///   `session.c_nonce`.
    /// - `Error::NonceExpired` if `session.nonce_expired()`.
    pub fn validate_for_credential(session: &IssuanceSession, request: &CredentialRequest) -> Result<()> {
        if !REQUEST_ACCEPTING_STATES.contains(&session.state) {
            return Err(invalid!(
                InvalidState,
                "session '{}' in state {:?} does not accept credential requests",
                session.id,
                session.state
            ));
        }
        if request.proof.is_none() {
            return Err(invalid!(MissingProof, "credential request has no proof"));
        }

        let nonce = extract_nonce(request)?;
        match &session.c_nonce {
            Some(session_nonce) if *session_nonce == nonce => {}
            Some(_) => return Err(invalid!(NonceMismatch, "request nonce does not match session nonce")),
            None => return Err(invalid!(NonceExpired, "session has no active nonce")),
        }

        if session.nonce_expired() {
            return Err(invalid!(NonceExpired, "session '{}' nonce has expired", session.id));
        }
        Ok(())
    }

    /// Mint a fresh `c_nonce` for `session` and persist it, per §11's Nonce
    /// Endpoint (draft 13 moves nonce issuance out of the token response
    /// into its own endpoint the wallet calls separately).
    ///
    /// Re-reads `session` from `store` first so a concurrent refresh (or an
    /// in-flight credential request reading the old nonce) is not lost: the
    /// refreshed nonce is written on top of whatever the store currently
    /// holds, not on top of the caller's possibly-stale copy.
    ///
    /// # Errors
    ///
    /// Returns whatever `store.get_by_id`/`store.update` return.
    pub async fn refresh_nonce(
        store: &impl SessionStore, session_id: &str, config: &IssuerConfig,
    ) -> Result<IssuanceSession> {
        let mut session = store.get_by_id(session_id).await?;
        session.c_nonce = Some(generate::c_nonce());
        session.c_nonce_expires_at = Some(Utc::now() + config.c_nonce_ttl);
        store.update(session.clone()).await?;
        Ok(session)
    }
}

/// Probe order (a)/(b)/(c) for nonce extraction, per §4.3.
fn extract_nonce(request: &CredentialRequest) -> Result<String> {
    if let Some(nonce) = &request.c_nonce {
        return Ok(nonce.clone());
    }
    if let Some(proof) = &request.proof {
        if let Some(nonce) = &proof.c_nonce {
            return Ok(nonce.clone());
        }
        if let Ok(claims) = crate::core::jws::decode_payload::<NonceClaim>(&proof.jwt) {
            return Ok(claims.nonce);
        }
    }
    Err(invalid!(MissingNonce, "no c_nonce found in request, proof, or proof payload"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::{CredentialOfferPayload, Grants, OfferVersion, PreAuthorizedGrant};
    use crate::request::Proof;

    fn session(state: SessionState, nonce: Option<&str>, expires_in_secs: i64) -> IssuanceSession {
        IssuanceSession {
            id: "sess-1".to_string(),
            issuer_id: "https://issuer.example".to_string(),
            credential_offer_uri: "https://issuer.example/credential_offer/abc".to_string(),
            credential_offer_payload: CredentialOfferPayload {
                credential_issuer: "https://issuer.example".to_string(),
                credential_configuration_ids: vec!["A".to_string()],
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
            offered_credentials: vec!["A".to_string()],
            issued_credentials: vec![],
            state,
            c_nonce: nonce.map(ToString::to_string),
            c_nonce_expires_at: Some(chrono::Utc::now() + chrono::Duration::seconds(expires_in_secs)),
            error_message: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn extracts_top_level_nonce() {
        let request = CredentialRequest { c_nonce: Some("abc".to_string()), ..Default::default() };
        assert_eq!(extract_nonce(&request).unwrap(), "abc");
    }

    #[test]
    fn falls_back_to_proof_nonce() {
        let request = CredentialRequest {
            proof: Some(Proof { proof_type: "jwt".to_string(), jwt: "h.p.s".to_string(), c_nonce: Some("def".to_string()) }),
            ..Default::default()
        };
        assert_eq!(extract_nonce(&request).unwrap(), "def");
    }

    #[test]
    fn missing_nonce_everywhere_fails() {
        let request = CredentialRequest::default();
        assert!(matches!(extract_nonce(&request).unwrap_err(), Error::MissingNonce(_)));
    }

    #[test]
    fn validate_rejects_bad_state() {
        let session = session(SessionState::OfferCreated, Some("n"), 60);
        let request = CredentialRequest {
            c_nonce: Some("n".to_string()),
            proof: Some(Proof { proof_type: "jwt".to_string(), jwt: "h.p.s".to_string(), c_nonce: None }),
            ..Default::default()
        };
        assert!(matches!(
            RequestResolver::validate_for_credential(&session, &request).unwrap_err(),
            Error::InvalidState(_)
        ));
    }

    #[test]
    fn validate_rejects_missing_proof() {
        let session = session(SessionState::AccessTokenCreated, Some("n"), 60);
        let request = CredentialRequest { c_nonce: Some("n".to_string()), ..Default::default() };
        assert!(matches!(
            RequestResolver::validate_for_credential(&session, &request).unwrap_err(),
            Error::MissingProof(_)
        ));
    }

    #[test]
    fn validate_rejects_nonce_mismatch() {
        let session = session(SessionState::AccessTokenCreated, Some("n"), 60);
        let request = CredentialRequest {
            c_nonce: Some("different".to_string()),
            proof: Some(Proof { proof_type: "jwt".to_string(), jwt: "h.p.s".to_string(), c_nonce: None }),
            ..Default::default()
        };
        assert!(matches!(
            RequestResolver::validate_for_credential(&session, &request).unwrap_err(),
            Error::NonceMismatch(_)
        ));
    }

    #[test]
    fn validate_rejects_expired_nonce() {
        let session = session(SessionState::AccessTokenCreated, Some("n"), -5);
        let request = CredentialRequest {
            c_nonce: Some("n".to_string()),
            proof: Some(Proof { proof_type: "jwt".to_string(), jwt: "h.p.s".to_string(), c_nonce: None }),
            ..Default::default()
        };
        assert!(matches!(
            RequestResolver::validate_for_credential(&session, &request).unwrap_err(),
            Error::NonceExpired(_)
        ));
    }

    #[test]
    fn validate_accepts_happy_path() {
        let session = session(SessionState::AccessTokenCreated, Some("n"), 60);
        let request = CredentialRequest {
            c_nonce: Some("n".to_string()),
            proof: Some(Proof { proof_type: "jwt".to_string(), jwt: "h.p.s".to_string(), c_nonce: None }),
            ..Default::default()
        };
        RequestResolver::validate_for_credential(&session, &request).unwrap();
    }

    #[tokio::test]
    async fn refresh_nonce_replaces_nonce_and_extends_expiry() {
        let store = crate::test_support::MemorySessionStore::new();
        let original = session(SessionState::AccessTokenCreated, Some("stale-nonce"), -60);
        store.create(original.clone()).await.unwrap();

        let config = IssuerConfig::default();
        let refreshed = RequestResolver::refresh_nonce(&store, &original.id, &config).await.unwrap();

        assert_ne!(refreshed.c_nonce, original.c_nonce);
        assert!(refreshed.c_nonce.is_some());
        assert!(!refreshed.nonce_expired());

        let persisted = store.get_by_id(&original.id).await.unwrap();
        assert_eq!(persisted.c_nonce, refreshed.c_nonce);
        assert_eq!(persisted.c_nonce_expires_at, refreshed.c_nonce_expires_at);
    }
}
