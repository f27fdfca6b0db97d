//! Pre-Authorized Code Flow
//!
//! Exercises the core end to end in the pre-authorized grant, the only
//! grant this crate supports: offer creation, out-of-band token exchange
//! (simulated — the token endpoint itself is out of scope), credential
//! matching, holder-binding extraction, and signer dispatch.

use std::collections::HashMap;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{Duration, Utc};
use credibil_issuer_core::binding::HolderBindingExtractor;
use credibil_issuer_core::dispatch::SignerDispatch;
use credibil_issuer_core::issuer::{CredentialConfiguration, CredentialFormat, IssuerRecord, SupportedConfigurations};
use credibil_issuer_core::offer::{OfferBuilder, OfferVersion, PreAuthConfig};
use credibil_issuer_core::request::{CredentialRequest, Proof};
use credibil_issuer_core::session::SessionState;
use credibil_issuer_core::store::{SessionQuery, SessionStore};
use credibil_issuer_core::test_support::{init_tracer, sample_holder_jwk, EchoMapper, FakeSigner, MemorySessionStore, UnreachableDidResolver};
use credibil_issuer_core::{Error, config::IssuerConfig};

const ISSUER_ID: &str = "https://issuer.example";

fn alice_issuer() -> IssuerRecord {
    let mut map = HashMap::new();
    map.insert(
        "UniversityDegree_SD".to_string(),
        CredentialConfiguration {
            format: CredentialFormat::SdJwtVc,
            credential_definition: None,
            vct: Some("UniversityDegree_SD".to_string()),
            doctype: None,
        },
    );
    IssuerRecord {
        issuer_id: ISSUER_ID.to_string(),
        display: serde_json::Value::Null,
        dpop_alg_values: vec![],
        access_token_public_key_fingerprint: "fp1".to_string(),
        configurations: SupportedConfigurations::Draft13(map),
    }
}

fn config() -> IssuerConfig {
    IssuerConfig { issuer_url: ISSUER_ID.to_string(), ..Default::default() }
}

// Builds a proof JWT with an embedded JWK (no DID resolver required),
// carrying `nonce` in the JWS payload per the proof-JWT probe order (c).
fn proof_jwt(nonce: &str) -> String {
    let jwk = sample_holder_jwk();
    let header = serde_json::json!({"alg": "EdDSA", "jwk": jwk});
    let payload = serde_json::json!({
        "aud": ISSUER_ID,
        "iat": Utc::now().timestamp(),
        "nonce": nonce,
    });
    let h = Base64UrlUnpadded::encode_string(header.to_string().as_bytes());
    let p = Base64UrlUnpadded::encode_string(payload.to_string().as_bytes());
    format!("{h}.{p}.sig")
}

// Bob's wallet has obtained an access token out-of-band (the token endpoint
// is explicitly out of scope for this core); simulate that by advancing the
// session straight to `AccessTokenCreated` with a fresh `c_nonce`.
async fn simulate_token_exchange(store: &MemorySessionStore, session_id: &str, nonce: &str) {
    let mut session = store.get_by_id(session_id).await.expect("session exists");
    session.state = SessionState::AccessTokenCreated;
    session.c_nonce = Some(nonce.to_string());
    session.c_nonce_expires_at = Some(Utc::now() + Duration::minutes(5));
    store.update(session).await.expect("update session");
}

// Should return a credential when using the pre-authorized code flow: Alice
// creates an SD-JWT offer, Bob obtains a token, presents a proof of
// possession, and receives exactly the offered credential.
#[tokio::test]
async fn happy_path_sd_jwt_draft13() {
    init_tracer();

    let issuer = alice_issuer();
    let store = MemorySessionStore::new();
    let did_resolver = UnreachableDidResolver;
    let mapper = EchoMapper;
    let signer = FakeSigner::succeeding();

    // --------------------------------------------------
    // Alice creates a credential offer for Bob
    // --------------------------------------------------
    let (session, offer_uri) = OfferBuilder::create_offer(
        &issuer,
        &["UniversityDegree_SD".to_string()],
        PreAuthConfig { user_pin_required: Some(false), ..Default::default() },
        serde_json::Map::new(),
        OfferVersion::V1Draft13,
        &config(),
    )
    .expect("should create offer");
    assert_eq!(session.state, SessionState::OfferCreated);
    store.create(session.clone()).await.expect("should persist session");

    let deep_link = OfferBuilder::to_deep_link(&offer_uri);
    assert!(deep_link.starts_with("openid-credential-offer://?credential_offer_uri="));

    // --------------------------------------------------
    // Bob obtains a token out-of-band and prepares a proof
    // --------------------------------------------------
    simulate_token_exchange(&store, &session.id, "nonce-1").await;
    let jwt = proof_jwt("nonce-1");

    // --------------------------------------------------
    // Bob requests the credential
    // --------------------------------------------------
    let request = CredentialRequest {
        format: Some(CredentialFormat::SdJwtVc),
        vct: Some("UniversityDegree_SD".to_string()),
        proof: Some(Proof { proof_type: "jwt".to_string(), jwt, c_nonce: None }),
        ..Default::default()
    };

    let current = store
        .find_single_by_query(&SessionQuery::ByNonce {
            issuer_id: Some(ISSUER_ID.to_string()),
            c_nonce: "nonce-1".to_string(),
        })
        .await
        .expect("query ok")
        .expect("session found");

    let issued = SignerDispatch::issue_credential(
        &store,
        &issuer,
        &current,
        &request,
        &mapper,
        &signer,
        &signer,
        &signer,
        &did_resolver,
    )
    .await
    .expect("should issue credential");

    assert_eq!(issued.configuration_id, "UniversityDegree_SD");
    assert_eq!(issued.format, CredentialFormat::SdJwtVc);
    assert!(!issued.credential.is_empty());

    let final_session = store.get_by_id(&session.id).await.expect("session exists");
    assert_eq!(final_session.state, SessionState::Completed);
    assert_eq!(final_session.issued_credentials, vec!["UniversityDegree_SD".to_string()]);
}

// An expired `c_nonce` must be rejected before the request ever reaches the
// matcher, and must leave the session's state untouched (§7).
#[tokio::test]
async fn expired_nonce_is_rejected() {
    use credibil_issuer_core::resolver::RequestResolver;

    init_tracer();

    let issuer = alice_issuer();
    let store = MemorySessionStore::new();

    let (session, _) = OfferBuilder::create_offer(
        &issuer,
        &["UniversityDegree_SD".to_string()],
        PreAuthConfig { user_pin_required: Some(false), ..Default::default() },
        serde_json::Map::new(),
        OfferVersion::V1Draft13,
        &config(),
    )
    .expect("should create offer");
    store.create(session.clone()).await.expect("should persist session");

    let mut stale = store.get_by_id(&session.id).await.expect("session exists");
    stale.state = SessionState::AccessTokenCreated;
    stale.c_nonce = Some("nonce-1".to_string());
    stale.c_nonce_expires_at = Some(Utc::now() - Duration::seconds(1));
    store.update(stale.clone()).await.expect("update session");

    let jwt = proof_jwt("nonce-1");
    let request = CredentialRequest {
        format: Some(CredentialFormat::SdJwtVc),
        vct: Some("UniversityDegree_SD".to_string()),
        proof: Some(Proof { proof_type: "jwt".to_string(), jwt, c_nonce: None }),
        ..Default::default()
    };

    let err = RequestResolver::validate_for_credential(&stale, &request).unwrap_err();
    assert!(matches!(err, Error::NonceExpired(_)));

    let unchanged = store.get_by_id(&session.id).await.expect("session exists");
    assert_eq!(unchanged.state, SessionState::AccessTokenCreated);
}

// Requesting a configuration already issued in this session must be refused
// by the matcher, not re-signed.
#[tokio::test]
async fn duplicate_issuance_is_refused() {
    init_tracer();

    let issuer = alice_issuer();
    let store = MemorySessionStore::new();
    let did_resolver = UnreachableDidResolver;
    let mapper = EchoMapper;
    let signer = FakeSigner::succeeding();

    let (session, _) = OfferBuilder::create_offer(
        &issuer,
        &["UniversityDegree_SD".to_string()],
        PreAuthConfig { user_pin_required: Some(false), ..Default::default() },
        serde_json::Map::new(),
        OfferVersion::V1Draft13,
        &config(),
    )
    .expect("should create offer");
    store.create(session.clone()).await.expect("should persist session");
    simulate_token_exchange(&store, &session.id, "nonce-1").await;

    let request = CredentialRequest {
        format: Some(CredentialFormat::SdJwtVc),
        vct: Some("UniversityDegree_SD".to_string()),
        proof: Some(Proof { proof_type: "jwt".to_string(), jwt: proof_jwt("nonce-1"), c_nonce: None }),
        ..Default::default()
    };

    let first = store.get_by_id(&session.id).await.expect("session exists");
    SignerDispatch::issue_credential(
        &store, &issuer, &first, &request, &mapper, &signer, &signer, &signer, &did_resolver,
    )
    .await
    .expect("first issuance succeeds");

    // A second request against the same (now stale, single-credential)
    // session can no longer find anything left to match.
    simulate_token_exchange(&store, &session.id, "nonce-2").await;
    let second_request = CredentialRequest {
        format: Some(CredentialFormat::SdJwtVc),
        vct: Some("UniversityDegree_SD".to_string()),
        proof: Some(Proof { proof_type: "jwt".to_string(), jwt: proof_jwt("nonce-2"), c_nonce: None }),
        ..Default::default()
    };
    let second = store.get_by_id(&session.id).await.expect("session exists");
    let err = SignerDispatch::issue_credential(
        &store, &issuer, &second, &second_request, &mapper, &signer, &signer, &signer, &did_resolver,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::NoMatchingOffer(_)));
}

// Draft-11 offers must persist the legacy `credentials`/`user_pin_required`
// projection alongside the canonical draft-13 payload.
#[tokio::test]
async fn draft11_offer_projection() {
    init_tracer();

    let issuer = alice_issuer();
    let (session, _) = OfferBuilder::create_offer(
        &issuer,
        &["UniversityDegree_SD".to_string()],
        PreAuthConfig { user_pin_required: Some(true), ..Default::default() },
        serde_json::Map::new(),
        OfferVersion::V1Draft11,
        &config(),
    )
    .expect("should create offer");

    let v11 = session.credential_offer_payload_v11.expect("draft-11 projection present");
    assert_eq!(v11.credentials, vec!["UniversityDegree_SD".to_string()]);
    assert_eq!(v11.grants.pre_authorized_code.user_pin_required, Some(true));
    assert!(v11.grants.pre_authorized_code.tx_code.is_some());
}

// A proof JWT with an embedded `jwk` header resolves to a holder binding
// without ever touching a DID resolver.
#[tokio::test]
async fn embedded_jwk_binding_needs_no_did_resolver() {
    init_tracer();

    let resolver = UnreachableDidResolver;
    let request = CredentialRequest {
        proof: Some(Proof { proof_type: "jwt".to_string(), jwt: proof_jwt("nonce-1"), c_nonce: None }),
        ..Default::default()
    };
    let binding = HolderBindingExtractor::extract_binding(&request, &resolver).await.expect("binding resolves");
    assert_eq!(binding.key(), &sample_holder_jwk());
}
