//! # Test Support
//!
//! In-memory and fake implementations of every collaborator trait this core
//! is generic over, so integration tests (and downstream crates writing
//! their own tests against this core) don't need a real database, DID
//! network, or signing key. Not behind `#[cfg(test)]` so the `tests/`
//! directory can use it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

use credibil_did::{DidResolver, Document};
use credibil_infosec::{Algorithm, Curve, KeyType, PublicKeyJwk, Signer};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::binding::HolderBinding;
use crate::dispatch::{CredentialMapper, MsoMdocSigner, SdJwtVcSigner, SignOptions, SignOutcome, W3cVcSigner};
use crate::issuer::{CredentialConfiguration, IssuerRecord};
use crate::session::IssuanceSession;
use crate::store::{IssuerStore, SessionQuery, SessionStore, single_row};
use crate::{Error, Result};

/// An in-memory `SessionStore` keyed by session id, with secondary indexes
/// maintained on every `create`/`update` for `find_single_by_query`.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, IssuanceSession>>>,
}

impl MemorySessionStore {
    /// A fresh, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    async fn create(&self, session: IssuanceSession) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let collision = sessions.values().any(|existing| {
            existing.issuer_id == session.issuer_id
                && existing.credential_offer_uri == session.credential_offer_uri
        });
        if collision {
            return Err(Error::InvalidOffer(format!(
                "a session already exists for offer uri '{}'",
                session.credential_offer_uri
            )));
        }
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn find_single_by_query(&self, query: &SessionQuery) -> Result<Option<IssuanceSession>> {
        let sessions = self.sessions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let matches: Vec<IssuanceSession> = match query {
            SessionQuery::ByOfferUri { issuer_id, credential_offer_uri } => sessions
                .values()
                .filter(|s| &s.issuer_id == issuer_id && &s.credential_offer_uri == credential_offer_uri)
                .cloned()
                .collect(),
            SessionQuery::ByNonce { issuer_id, c_nonce } => sessions
                .values()
                .filter(|s| {
                    issuer_id.as_ref().is_none_or(|id| id == &s.issuer_id)
                        && s.c_nonce.as_deref() == Some(c_nonce.as_str())
                })
                .cloned()
                .collect(),
        };
        single_row(matches)
    }

    async fn get_by_id(&self, id: &str) -> Result<IssuanceSession> {
        let sessions = self.sessions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions.get(id).cloned().ok_or_else(|| Error::NotFound(format!("no session '{id}'")))
    }

    async fn update(&self, session: IssuanceSession) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions.insert(session.id.clone(), session);
        Ok(())
    }
}

/// An in-memory `IssuerStore` keyed by `issuer_id`.
#[derive(Clone, Default)]
pub struct MemoryIssuerStore {
    issuers: Arc<Mutex<HashMap<String, IssuerRecord>>>,
}

impl MemoryIssuerStore {
    /// A store pre-seeded with `issuer`.
    #[must_use]
    pub fn new(issuer: IssuerRecord) -> Self {
        let mut issuers = HashMap::new();
        issuers.insert(issuer.issuer_id.clone(), issuer);
        Self { issuers: Arc::new(Mutex::new(issuers)) }
    }
}

impl IssuerStore for MemoryIssuerStore {
    async fn get(&self, issuer_id: &str) -> Result<IssuerRecord> {
        let issuers = self.issuers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        issuers.get(issuer_id).cloned().ok_or_else(|| Error::NotFound(format!("no issuer '{issuer_id}'")))
    }

    async fn update(&self, issuer: IssuerRecord) -> Result<()> {
        let mut issuers = self.issuers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        issuers.insert(issuer.issuer_id.clone(), issuer);
        Ok(())
    }
}

/// A `DidResolver` that never actually resolves anything.
///
/// Real DID resolution is out of scope for this core (an external
/// collaborator's job); this fake exists so `Provider`-bound generic code
/// compiles and runs in tests that only exercise the embedded-`jwk` holder
/// binding branch, which never calls `resolve`/`dereference`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnreachableDidResolver;

impl DidResolver for UnreachableDidResolver {
    async fn resolve(&self, url: &str) -> anyhow::Result<Document> {
        Err(anyhow::anyhow!("test resolver does not resolve DIDs (requested '{url}')"))
    }
}

/// A `Signer` that signs nothing; present only to satisfy `Provider`'s
/// supertrait bound for hosts that aggregate every collaborator onto one
/// type.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnreachableSigner;

impl Signer for UnreachableSigner {
    async fn try_sign(&self, _msg: &[u8]) -> anyhow::Result<Vec<u8>> {
        Err(anyhow::anyhow!("test signer does not sign"))
    }

    async fn verifying_key(&self) -> anyhow::Result<Vec<u8>> {
        Err(anyhow::anyhow!("test signer has no key"))
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::EdDSA
    }

    async fn verification_method(&self) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("test signer has no verification method"))
    }
}

/// A `CredentialMapper` that builds a trivial, deterministic payload per
/// format from the holder's key, for tests that only care about the
/// dispatch's control flow, not real claim assembly.
#[derive(Clone, Copy, Debug, Default)]
pub struct EchoMapper;

impl CredentialMapper for EchoMapper {
    async fn map(
        &self, _session: &IssuanceSession, configuration_id: &str, configuration: &CredentialConfiguration,
        binding: &HolderBinding,
    ) -> Result<SignOptions> {
        let holder_key = serde_json::to_value(binding.key())
            .map_err(|e| Error::InvalidProof(format!("could not serialize holder key: {e}")))?;
        let body = serde_json::json!({
            "configuration_id": configuration_id,
            "holder_key": holder_key,
        });
        Ok(match configuration.format {
            crate::issuer::CredentialFormat::JwtVcJson => SignOptions::JwtVc { credential: body },
            crate::issuer::CredentialFormat::JwtVcJsonLd | crate::issuer::CredentialFormat::LdpVc => {
                SignOptions::LdpVc { credential: body }
            }
            crate::issuer::CredentialFormat::SdJwtVc => {
                SignOptions::SdJwtVc { claims: body, vct: configuration.vct.clone().unwrap_or_default() }
            }
            crate::issuer::CredentialFormat::MsoMdoc => {
                SignOptions::MsoMdoc { claims: body, doctype: configuration.doctype.clone().unwrap_or_default() }
            }
        })
    }
}

/// A fake format signer that renders `SignOptions` as a JSON string,
/// optionally forced to a fixed `SignOutcome` for exercising the
/// deferred/empty failure paths.
#[derive(Clone, Debug, Default)]
pub struct FakeSigner {
    /// When set, every call returns this outcome instead of encoding the
    /// payload.
    pub forced_outcome: Option<SignOutcome>,
}

impl FakeSigner {
    /// A signer that always succeeds, encoding the payload as JSON.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// A signer that always defers issuance.
    #[must_use]
    pub fn deferring() -> Self {
        Self { forced_outcome: Some(SignOutcome::Deferred) }
    }

    /// A signer that always produces an empty credential.
    #[must_use]
    pub fn producing_nothing() -> Self {
        Self { forced_outcome: Some(SignOutcome::Credential(String::new())) }
    }

    fn render(&self, options: &SignOptions) -> SignOutcome {
        if let Some(outcome) = &self.forced_outcome {
            return outcome.clone();
        }
        let payload = match options {
            SignOptions::JwtVc { credential } | SignOptions::LdpVc { credential } => credential,
            SignOptions::SdJwtVc { claims, .. } | SignOptions::MsoMdoc { claims, .. } => claims,
        };
        SignOutcome::Credential(payload.to_string())
    }
}

impl W3cVcSigner for FakeSigner {
    async fn sign(&self, options: &SignOptions) -> Result<SignOutcome> {
        Ok(self.render(options))
    }
}

impl SdJwtVcSigner for FakeSigner {
    async fn sign(&self, options: &SignOptions) -> Result<SignOutcome> {
        Ok(self.render(options))
    }
}

impl MsoMdocSigner for FakeSigner {
    async fn sign(&self, options: &SignOptions) -> Result<SignOutcome> {
        Ok(self.render(options))
    }
}

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// # Panics
///
/// Panics if the tracing subscriber cannot be set.
pub fn init_tracer() {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::ERROR).finish();
        tracing::subscriber::set_global_default(subscriber).expect("subscriber set");
    });
}

/// An embedded-`jwk` holder key, for tests that exercise the JWK proof
/// branch rather than the DID branch (which needs a real DID resolver).
#[must_use]
pub fn sample_holder_jwk() -> PublicKeyJwk {
    use base64ct::Encoding;
    PublicKeyJwk {
        kty: KeyType::Okp,
        crv: Curve::Ed25519,
        x: base64ct::Base64UrlUnpadded::encode_string(&[1u8; 32]),
        ..PublicKeyJwk::default()
    }
}
