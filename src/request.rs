//! # Credential Requests
//!
//! The wallet-sourced, transient wire shape of a credential request, and
//! its embedded proof-of-possession JWT wrapper. These types are parsed
//! from JSON by the (out-of-scope) HTTP layer and handed to the resolver,
//! matcher, and binding extractor as-is.

use serde::{Deserialize, Serialize};

use crate::issuer::CredentialFormat;

/// A request-side `credential_definition`.
///
/// Carries both `type` and the legacy `types` spelling since different
/// format profiles (and draft versions) disagree on which one is present —
/// the matcher falls back from one to the other per format, rather than
/// this type normalizing them away.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RequestCredentialDefinition {
    /// Type IRIs, under the canonical field name.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<Vec<String>>,
    /// Type IRIs, under the legacy `jwt_vc_json-ld` field name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
}

/// The wallet's proof of possession of key material.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Proof {
    /// Always `"jwt"` for this core.
    pub proof_type: String,
    /// The compact JWS.
    pub jwt: String,
    /// Nonce carried directly on the proof object, one of the three places
    /// a `c_nonce` may appear (§4.3, probe order (b)).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,
}

/// A credential request from a wallet.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialRequest {
    /// The requested format. Mutually informative with
    /// `credential_identifier` — the identifier path bypasses format
    /// matching entirely (§4.4 step 2).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<CredentialFormat>,

    /// Identifier-based request: names an offered configuration directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_identifier: Option<String>,

    /// `jwt_vc_json` / `jwt_vc_json-ld` / `ldp_vc` type constraint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_definition: Option<RequestCredentialDefinition>,

    /// Legacy top-level `types` array, as used by `jwt_vc_json` requests
    /// when `credential_definition` is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,

    /// SD-JWT VC type identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vct: Option<String>,

    /// ISO mdoc document type identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctype: Option<String>,

    /// Top-level nonce, one of the three places a `c_nonce` may appear
    /// (§4.3, probe order (a)).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,

    /// Proof of possession of key material.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

impl CredentialRequest {
    /// The type constraint to compare against a `jwt_vc_json` configuration:
    /// `credential_definition.type`, falling back to the legacy top-level
    /// `types` array.
    #[must_use]
    pub fn jwt_vc_json_types(&self) -> Option<&[String]> {
        self.credential_definition
            .as_ref()
            .and_then(|cd| cd.type_.as_deref())
            .or(self.types.as_deref())
    }

    /// The type constraint to compare against a `jwt_vc_json-ld`/`ldp_vc`
    /// configuration: `credential_definition.type`, falling back to
    /// `credential_definition.types`.
    #[must_use]
    pub fn json_ld_types(&self) -> Option<&[String]> {
        let cd = self.credential_definition.as_ref()?;
        cd.type_.as_deref().or(cd.types.as_deref())
    }
}
