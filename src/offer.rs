//! # Credential Offers
//!
//! Wire shapes for the credential offer payload (draft-13 canonical, plus
//! the draft-11 legacy projection) and the `OfferBuilder` that mints a new
//! issuance session from a set of offered configuration ids.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::IssuerConfig;
use crate::core::generate;
use crate::issuer::IssuerRecord;
use crate::session::{IssuanceSession, SessionState};
use crate::version::VersionBridge;
use crate::{Error, Result, invalid};

/// The OID4VCI draft version an offer (and its wire-facing translations) is
/// expressed in.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum OfferVersion {
    /// Draft 11 (legacy `credentials` / `user_pin_required` shape).
    #[serde(rename = "v1.draft11")]
    V1Draft11,
    /// Draft 13 (`credential_configuration_ids` / `tx_code` shape).
    #[serde(rename = "v1.draft13")]
    V1Draft13,
}

/// `tx_code` descriptor: an out-of-band transaction code (PIN) the holder
/// must supply alongside the pre-authorized code.
///
/// `user_pin_required = true` with no further detail persists as an empty
/// object, matching the draft-13 wire shape.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TxCode {
    /// `"numeric"` or `"text"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_mode: Option<String>,
    /// Expected code length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Human-readable description shown to the holder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The pre-authorized code grant, in the shape shared by both drafts.
/// `user_pin_required` is only ever populated on the draft-11 projection —
/// draft-13 carries the same information via presence/absence of `tx_code`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PreAuthorizedGrant {
    /// The one-use bearer secret exchanged at the token endpoint.
    #[serde(rename = "pre-authorized_code")]
    pub pre_authorized_code: String,
    /// Present iff a transaction code (PIN) is required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_code: Option<TxCode>,
    /// Draft-11 only: mirrors `tx_code.is_some()`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_pin_required: Option<bool>,
}

/// Grants offered alongside a credential offer. This core only ever
/// populates the pre-authorized code grant (the authorization code grant is
/// out of scope).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Grants {
    /// The pre-authorized code grant.
    #[serde(rename = "urn:ietf:params:oauth:grant-type:pre-authorized_code")]
    pub pre_authorized_code: PreAuthorizedGrant,
}

/// A draft-13 credential offer payload — the canonical, internally
/// persisted shape.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialOfferPayload {
    /// The credential issuer's identifier (base URL).
    pub credential_issuer: String,
    /// Offered configuration ids.
    pub credential_configuration_ids: Vec<String>,
    /// Offered grants.
    pub grants: Grants,
}

/// The draft-11 legacy projection of a credential offer.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialOfferPayloadV11 {
    /// The credential issuer's identifier (base URL).
    pub credential_issuer: String,
    /// Offered configuration ids, under the draft-11 field name.
    pub credentials: Vec<String>,
    /// Offered grants.
    pub grants: Grants,
}

/// Inputs controlling the pre-authorized code grant of a new offer.
#[derive(Clone, Debug, Default)]
pub struct PreAuthConfig {
    /// Caller-supplied pre-authorized code. Generated if absent.
    pub pre_authorized_code: Option<String>,
    /// Whether a `tx_code` (PIN) is required.
    pub user_pin_required: Option<bool>,
    /// Caller-supplied `tx_code` descriptor.
    pub tx_code: Option<TxCode>,
}

impl PreAuthConfig {
    /// Normalize `tx_code`/`user_pin_required` per invariant I5: the two
    /// fields must agree on whether a transaction code is required.
    fn normalize(mut self) -> Result<Self> {
        match (self.user_pin_required, &self.tx_code) {
            (_, Some(_)) => self.user_pin_required = Some(true),
            (Some(true), None) => self.tx_code = Some(TxCode::default()),
            (Some(false), Some(_)) => {
                return Err(invalid!(InvalidOffer, "user_pin_required=false but tx_code set"));
            }
            (Some(false) | None, None) => {}
        }
        Ok(self)
    }
}

/// Builds credential offers and the issuance sessions that back them.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfferBuilder;

impl OfferBuilder {
    /// Create a new credential offer for `offered_credentials`, persisting a
    /// fresh `IssuanceSession` in state `OfferCreated`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidOffer` if `offered_credentials` is empty,
    /// contains duplicates, names a configuration the issuer does not
    /// support, or if `pre_auth_cfg`'s `tx_code`/`user_pin_required` pairing
    /// is inconsistent (invariant I5).
    pub fn create_offer(
        issuer: &IssuerRecord, offered_credentials: &[String], pre_auth_cfg: PreAuthConfig,
        metadata: serde_json::Map<String, serde_json::Value>, version: OfferVersion,
        config: &IssuerConfig,
    ) -> Result<(IssuanceSession, String)> {
        if offered_credentials.is_empty() {
            return Err(invalid!(InvalidOffer, "no credentials offered"));
        }

        let mut seen = std::collections::HashSet::new();
        for id in offered_credentials {
            if !seen.insert(id) {
                return Err(invalid!(InvalidOffer, "duplicate configuration id `{id}`"));
            }
            if !issuer.supports(id) {
                return Err(invalid!(
                    InvalidOffer,
                    "configuration `{id}` not supported by issuer"
                ));
            }
        }

        let pre_auth_cfg = pre_auth_cfg.normalize()?;
        let pre_authorized_code =
            pre_auth_cfg.pre_authorized_code.unwrap_or_else(generate::pre_authorized_code);

        let grant = PreAuthorizedGrant {
            pre_authorized_code: pre_authorized_code.clone(),
            tx_code: pre_auth_cfg.tx_code.clone(),
            user_pin_required: None,
        };

        let payload = CredentialOfferPayload {
            credential_issuer: issuer.issuer_id.clone(),
            credential_configuration_ids: offered_credentials.to_vec(),
            grants: Grants { pre_authorized_code: grant.clone() },
        };

        let payload_v11 = matches!(version, OfferVersion::V1Draft11).then(|| {
            VersionBridge::project_offer_to_v11(
                &issuer.issuer_id,
                offered_credentials,
                &grant,
                pre_auth_cfg.user_pin_required,
            )
        });

        let offer_uri_token = generate::offer_uri_token();
        let credential_offer_uri = format!(
            "{}/{}/{offer_uri_token}",
            config.issuer_url(),
            config.offer_endpoint_path.trim_matches('/')
        );

        let session = IssuanceSession {
            id: generate::session_id(),
            issuer_id: issuer.issuer_id.clone(),
            credential_offer_uri: credential_offer_uri.clone(),
            credential_offer_payload: payload,
            credential_offer_payload_v11: payload_v11,
            version,
            pre_authorized_code,
            tx_code: pre_auth_cfg.tx_code,
            user_pin_required: pre_auth_cfg.user_pin_required.unwrap_or(false),
            issuance_metadata: metadata,
            offered_credentials: offered_credentials.to_vec(),
            state: SessionState::OfferCreated,
            c_nonce: None,
            c_nonce_expires_at: None,
            issued_credentials: Vec::new(),
            error_message: None,
            created_at: Utc::now(),
        };

        Ok((session, credential_offer_uri))
    }

    /// Render a session's credential offer URI as an
    /// `openid-credential-offer://` deep link.
    ///
    /// Per §6, the deep link carries only the offer URI, never the inlined
    /// payload.
    #[must_use]
    pub fn to_deep_link(credential_offer_uri: &str) -> String {
        format!(
            "openid-credential-offer://?credential_offer_uri={}",
            urlencoding::encode(credential_offer_uri)
        )
    }

    /// Render a deep link as a PNG QR code data URI.
    #[cfg(feature = "qrcode")]
    pub fn to_qrcode(credential_offer_uri: &str) -> anyhow::Result<String> {
        use std::io::Cursor;

        use anyhow::Context as _;
        use base64ct::{Base64, Encoding};

        let deep_link = Self::to_deep_link(credential_offer_uri);
        let qr = qrcode::QrCode::new(&deep_link).context("failed to create QR code")?;
        let img_buf = qr.render::<image::Luma<u8>>().build();
        let mut buffer = Vec::new();
        img_buf
            .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .context("failed to encode QR code")?;
        Ok(format!("data:image/png;base64,{}", Base64::encode_string(&buffer)))
    }
}
