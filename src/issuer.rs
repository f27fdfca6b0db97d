//! # Issuer Records
//!
//! The persistent identity of a credential issuer: its supported
//! configurations, display metadata, and the access-token signing key
//! fingerprint used to validate bearer tokens presented at the credential
//! endpoint.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The wire format tag carried by a credential request/response and by each
/// `CredentialConfiguration` an issuer supports.
///
/// Modeled as a closed, tagged variant (rather than the raw format strings
/// the wire protocol uses) so the matcher and signer dispatch can switch on
/// it exhaustively — an unsupported format is a compile error on any new
/// arm, not a runtime branch. See `CredentialFormat::as_str` /
/// `CredentialFormat::from_str` for the wire mapping.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum CredentialFormat {
    /// VC signed as a JWT, not using JSON-LD.
    #[serde(rename = "jwt_vc_json")]
    JwtVcJson,
    /// VC signed as a JWT, using JSON-LD.
    #[serde(rename = "jwt_vc_json-ld")]
    JwtVcJsonLd,
    /// VC secured using a Data Integrity proof over JSON-LD.
    #[serde(rename = "ldp_vc")]
    LdpVc,
    /// SD-JWT VC.
    #[serde(rename = "vc+sd-jwt")]
    SdJwtVc,
    /// ISO mdoc.
    #[serde(rename = "mso_mdoc")]
    MsoMdoc,
}

impl CredentialFormat {
    /// The wire-format string for this format, as used by `format` fields in
    /// requests, responses, and configurations.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JwtVcJson => "jwt_vc_json",
            Self::JwtVcJsonLd => "jwt_vc_json-ld",
            Self::LdpVc => "ldp_vc",
            Self::SdJwtVc => "vc+sd-jwt",
            Self::MsoMdoc => "mso_mdoc",
        }
    }
}

/// A `type` constraint shared by the `jwt_vc_json` and `jwt_vc_json-ld`/
/// `ldp_vc` format families.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialDefinition {
    /// The set of type IRIs the credential asserts, compared as a multiset
    /// (order-independent) by the matcher.
    #[serde(rename = "type")]
    pub type_: Vec<String>,
}

/// An issuer-defined template a future credential request can be matched
/// against.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialConfiguration {
    /// The format this configuration is issued in.
    pub format: CredentialFormat,

    /// Type constraint for `jwt_vc_json` / `jwt_vc_json-ld` / `ldp_vc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_definition: Option<CredentialDefinition>,

    /// SD-JWT VC type identifier, for `vc+sd-jwt`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vct: Option<String>,

    /// ISO mdoc document type identifier, for `mso_mdoc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctype: Option<String>,
}

/// The persistent identity of a credential issuer.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct IssuerRecord {
    /// Opaque, unique issuer identifier.
    pub issuer_id: String,

    /// Free-form display metadata (name, logo, locales, ...), carried
    /// opaquely by this core.
    #[serde(default)]
    pub display: serde_json::Value,

    /// `dpop_signing_alg_values_supported` equivalent; algorithms the issuer
    /// accepts for DPoP-bound access tokens.
    #[serde(default)]
    pub dpop_alg_values: Vec<String>,

    /// Fingerprint of the public key currently used to verify access
    /// tokens. Mutated only via `rotate_key`.
    pub access_token_public_key_fingerprint: String,

    /// Supported credential configurations, exactly one of the draft-13 or
    /// draft-11 legacy shapes.
    pub configurations: SupportedConfigurations,
}

/// Exactly one of the draft-13 (`credential_configurations_supported`) or
/// draft-11 legacy (`credentials_supported`) supported-configuration shapes.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SupportedConfigurations {
    /// Draft-13 `credential_configurations_supported`.
    Draft13(HashMap<String, CredentialConfiguration>),
    /// Draft-11 legacy `credentials_supported`.
    Draft11(HashMap<String, CredentialConfiguration>),
}

impl SupportedConfigurations {
    /// The configurations the issuer supports, regardless of which draft
    /// shape they're persisted under.
    #[must_use]
    pub const fn as_map(&self) -> &HashMap<String, CredentialConfiguration> {
        match self {
            Self::Draft13(map) | Self::Draft11(map) => map,
        }
    }
}

impl IssuerRecord {
    /// Does this issuer support the given credential configuration id?
    #[must_use]
    pub fn supports(&self, configuration_id: &str) -> bool {
        self.configurations.as_map().contains_key(configuration_id)
    }

    /// Rotate the access-token signing key fingerprint.
    ///
    /// A single atomic write: in-flight access tokens signed by the old key
    /// remain valid until their own `exp` — this core does not revoke them.
    pub fn rotate_key(&mut self, new_fingerprint: impl Into<String>) {
        self.access_token_public_key_fingerprint = new_fingerprint.into();
    }
}
