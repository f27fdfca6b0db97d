//! # Signer Dispatch
//!
//! Coordinates a credential request end to end: match it against the
//! session's remaining offer, extract the holder's binding key, hand both to
//! a caller-supplied mapper to produce a format-specific signing payload,
//! then dispatch to the format's signer (§4.6). Actually producing signed
//! credential bytes is always an external collaborator's job — this module
//! only ever calls into the traits below, never signs anything itself.

use credibil_did::DidResolver;
use tracing::instrument;

use crate::binding::{HolderBinding, HolderBindingExtractor};
use crate::issuer::{CredentialConfiguration, CredentialFormat, IssuerRecord};
use crate::matcher::CredentialMatcher;
use crate::request::CredentialRequest;
use crate::session::IssuanceSession;
use crate::store::SessionStore;
use crate::version::VersionBridge;
use crate::{Result, fail, invalid};

/// The format-specific payload a mapper hands to a signer.
///
/// Each variant carries the credential content the mapper has already
/// assembled (claims, subject data, holder key) in the shape that format's
/// signer expects; this dispatch never inspects the payload itself, only
/// routes on the variant. `SdJwtVc`/`MsoMdoc` additionally carry their own
/// `vct`/`doctype`, independent of the matched configuration's, so format
/// agreement against the request can be checked without trusting the mapper
/// to have copied them across correctly (§4.6 step 6).
#[derive(Clone, Debug)]
pub enum SignOptions {
    /// A `jwt_vc_json` credential payload.
    JwtVc {
        /// The unsigned Verifiable Credential, as JSON.
        credential: serde_json::Value,
    },
    /// An `ldp_vc` / `jwt_vc_json-ld` credential payload, to be secured with
    /// a Data Integrity proof.
    LdpVc {
        /// The unsigned Verifiable Credential, as JSON-LD.
        credential: serde_json::Value,
    },
    /// An SD-JWT VC payload.
    SdJwtVc {
        /// The disclosable claim set.
        claims: serde_json::Value,
        /// The `vct` the signer is issuing, for format-agreement checking.
        vct: String,
    },
    /// An ISO mdoc payload.
    MsoMdoc {
        /// The namespaced claim set.
        claims: serde_json::Value,
        /// The `doctype` the signer is issuing, for format-agreement
        /// checking.
        doctype: String,
    },
}

impl SignOptions {
    /// The format this payload is destined for, for format-agreement
    /// enforcement against the matched configuration and the request.
    #[must_use]
    pub const fn format(&self) -> CredentialFormat {
        match self {
            Self::JwtVc { .. } => CredentialFormat::JwtVcJson,
            Self::LdpVc { .. } => CredentialFormat::LdpVc,
            Self::SdJwtVc { .. } => CredentialFormat::SdJwtVc,
            Self::MsoMdoc { .. } => CredentialFormat::MsoMdoc,
        }
    }
}

/// Enforce §4.6 step 6: the signer's declared output format must agree with
/// the request's. `request.format` is absent on an identifier-based request
/// (§4.4 step 2 bypasses format matching entirely), so the matched
/// configuration's format stands in for it in that case. Likewise `vct`/
/// `doctype` are only cross-checked when the request actually carries one.
fn check_format_agreement(
    options: &SignOptions, request: &CredentialRequest, configuration_format: CredentialFormat,
) -> Result<()> {
    let effective_format = request.format.unwrap_or(configuration_format);
    match options {
        SignOptions::JwtVc { .. } | SignOptions::LdpVc { .. } => matches!(
            effective_format,
            CredentialFormat::JwtVcJson | CredentialFormat::JwtVcJsonLd | CredentialFormat::LdpVc
        )
        .then_some(())
        .ok_or_else(|| {
            invalid!(
                FormatMismatch,
                "signer produced a W3C VC payload for request format '{}'",
                effective_format.as_str()
            )
        }),
        SignOptions::SdJwtVc { vct, .. } => {
            if effective_format != CredentialFormat::SdJwtVc {
                return Err(invalid!(
                    FormatMismatch,
                    "signer produced an SD-JWT VC payload for request format '{}'",
                    effective_format.as_str()
                ));
            }
            if let Some(requested_vct) = &request.vct {
                if requested_vct != vct {
                    return Err(invalid!(
                        FormatMismatch,
                        "signer's vct '{vct}' does not match requested vct '{requested_vct}'"
                    ));
                }
            }
            Ok(())
        }
        SignOptions::MsoMdoc { doctype, .. } => {
            if effective_format != CredentialFormat::MsoMdoc {
                return Err(invalid!(
                    FormatMismatch,
                    "signer produced an mdoc payload for request format '{}'",
                    effective_format.as_str()
                ));
            }
            if let Some(requested_doctype) = &request.doctype {
                if requested_doctype != doctype {
                    return Err(invalid!(
                        FormatMismatch,
                        "signer's doctype '{doctype}' does not match requested doctype '{requested_doctype}'"
                    ));
                }
            }
            Ok(())
        }
    }
}

/// What a format signer produced for a `SignOptions` it was handed.
#[derive(Clone, Debug)]
pub enum SignOutcome {
    /// A successfully signed, encoded credential (compact JWT, CBOR
    /// base64url, etc., depending on format).
    Credential(String),
    /// The inner signing library deferred issuance (returned an
    /// `acceptance_token`/`transaction_id`); unsupported by this core.
    Deferred,
}

/// Maps a matched configuration and holder binding into a signer-ready
/// payload. Supplied by the host — this is where issuer-specific claim
/// assembly (pulling subject attributes from wherever they live) happens.
pub trait CredentialMapper: Send + Sync {
    /// Build the `SignOptions` for issuing `configuration_id`.
    fn map(
        &self, session: &IssuanceSession, configuration_id: &str,
        configuration: &CredentialConfiguration, binding: &HolderBinding,
    ) -> impl Future<Output = Result<SignOptions>> + Send;
}

/// Signs `jwt_vc_json` / `jwt_vc_json-ld` / `ldp_vc` payloads.
pub trait W3cVcSigner: Send + Sync {
    /// Produce a signed credential from `options`.
    fn sign(&self, options: &SignOptions) -> impl Future<Output = Result<SignOutcome>> + Send;
}

/// Signs SD-JWT VC payloads.
pub trait SdJwtVcSigner: Send + Sync {
    /// Produce a signed credential from `options`.
    fn sign(&self, options: &SignOptions) -> impl Future<Output = Result<SignOutcome>> + Send;
}

/// Signs ISO mdoc payloads.
pub trait MsoMdocSigner: Send + Sync {
    /// Produce a signed credential from `options`.
    fn sign(&self, options: &SignOptions) -> impl Future<Output = Result<SignOutcome>> + Send;
}

/// A successfully issued credential, ready to be placed on the wire.
#[derive(Clone, Debug)]
pub struct IssuedCredential {
    /// The configuration id this credential was issued against.
    pub configuration_id: String,
    /// The format the credential was signed in.
    pub format: CredentialFormat,
    /// The encoded credential (compact JWT, CBOR base64url, etc.).
    pub credential: String,
}

/// Coordinates matching, binding extraction, mapping, and signing for a
/// single credential request.
pub struct SignerDispatch;

impl SignerDispatch {
    /// Issue a credential in response to `request`, against `session`.
    ///
    /// Re-reads the session from `store` immediately before committing to
    /// issue, so that two concurrent requests for the same
    /// `credential_identifier`/type racing past the caller's own read both
    /// observe a consistent view: the loser sees its target already in
    /// `issued_credentials` and fails with `Error::AlreadyIssued` instead of
    /// signing a duplicate. The winner's `configuration_id` is appended to
    /// `issued_credentials` and persisted *before* the signer is invoked
    /// (§4.6 step 5) — once a signing call is in flight the slot is
    /// considered consumed even if the signer subsequently fails or the
    /// caller never sees the response.
    ///
    /// # Errors
    ///
    /// - Whatever `CredentialMatcher::resolve` or
    ///   `HolderBindingExtractor::extract_binding` return.
    /// - `Error::FormatMismatch` if the mapper's `SignOptions` format
    ///   disagrees with the request's (or, for identifier-based requests
    ///   lacking a `format`, the matched configuration's).
    /// - `Error::AlreadyIssued` if the matched configuration was issued by a
    ///   concurrent request between the caller's read and this call.
    /// - `Error::DeferredUnsupported` / `Error::SignerProducedNothing` if the
    ///   signer could not produce a credential; the session is moved to
    ///   `State::Error` and persisted before either is returned.
    #[instrument(skip(store, mapper, w3c_signer, sd_jwt_signer, mdoc_signer, did_resolver, request))]
    #[allow(clippy::too_many_arguments)]
    pub async fn issue_credential<Store, Mapper, W3c, SdJwt, Mdoc, Resolver>(
        store: &Store, issuer: &IssuerRecord, session: &IssuanceSession, request: &CredentialRequest,
        mapper: &Mapper, w3c_signer: &W3c, sd_jwt_signer: &SdJwt, mdoc_signer: &Mdoc,
        did_resolver: &Resolver,
    ) -> Result<IssuedCredential>
    where
        Store: SessionStore,
        Mapper: CredentialMapper,
        W3c: W3cVcSigner,
        SdJwt: SdJwtVcSigner,
        Mdoc: MsoMdocSigner,
        Resolver: DidResolver + Clone + Send + Sync,
    {
        let (configuration_id, configuration) = CredentialMatcher::resolve(issuer, session, request)?;
        let binding = HolderBindingExtractor::extract_binding(request, did_resolver).await?;
        let options = mapper.map(session, &configuration_id, &configuration, &binding).await?;

        check_format_agreement(&options, request, configuration.format)?;

        let mut fresh_session = store.get_by_id(&session.id).await?;
        if fresh_session.has_issued(&configuration_id) {
            return Err(invalid!(
                AlreadyIssued,
                "configuration '{configuration_id}' already issued for session '{}'",
                session.id
            ));
        }

        fresh_session.reserve(&configuration_id);
        store.update(fresh_session.clone()).await?;

        let outcome = match configuration.format {
            CredentialFormat::JwtVcJson | CredentialFormat::JwtVcJsonLd | CredentialFormat::LdpVc => {
                w3c_signer.sign(&options).await?
            }
            CredentialFormat::SdJwtVc => sd_jwt_signer.sign(&options).await?,
            CredentialFormat::MsoMdoc => mdoc_signer.sign(&options).await?,
        };

        let credential = match outcome {
            SignOutcome::Deferred => {
                fresh_session.mark_error("signer deferred issuance, which this core does not support");
                store.update(fresh_session).await?;
                return Err(fail!(
                    DeferredUnsupported,
                    "signer deferred issuance of '{configuration_id}'; deferred issuance is unsupported"
                ));
            }
            SignOutcome::Credential(credential) if credential.is_empty() => {
                fresh_session.mark_error("signer produced an empty credential");
                store.update(fresh_session).await?;
                return Err(fail!(
                    SignerProducedNothing,
                    "signer produced no credential for '{configuration_id}'"
                ));
            }
            SignOutcome::Credential(credential) => credential,
        };

        fresh_session.advance_state();
        store.update(fresh_session).await?;

        let format = VersionBridge::response_format_override(configuration.format);
        Ok(IssuedCredential { configuration_id, format, credential })
    }
}
