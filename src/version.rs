//! # Version Bridging
//!
//! Translates between the draft-13 canonical shapes this core persists and
//! the draft-11 legacy wire shapes some wallets still speak: `credentials`
//! vs `credential_configuration_ids` at the offer level, and
//! `user_pin_required` vs `tx_code` on the pre-authorized grant.
//!
//! The per-configuration shape (`CredentialConfiguration`) is unchanged
//! between drafts — issuer metadata publishing (`credential_issuer_metadata`
//! vs its draft-11 predecessor) is out of scope for this core.

use std::collections::HashMap;

use crate::issuer::CredentialConfiguration;
use crate::offer::{CredentialOfferPayloadV11, Grants, PreAuthorizedGrant};

/// Draft-11/draft-13 shape translation.
pub struct VersionBridge;

impl VersionBridge {
    /// Project a draft-13 offer's constituent parts into the draft-11 legacy
    /// shape.
    #[must_use]
    pub fn project_offer_to_v11(
        credential_issuer: &str, offered_credentials: &[String], grant: &PreAuthorizedGrant,
        user_pin_required: Option<bool>,
    ) -> CredentialOfferPayloadV11 {
        CredentialOfferPayloadV11 {
            credential_issuer: credential_issuer.to_string(),
            credentials: offered_credentials.to_vec(),
            grants: Grants {
                pre_authorized_code: PreAuthorizedGrant { user_pin_required, ..grant.clone() },
            },
        }
    }

    /// The draft-11-facing view of an issuer's supported configurations.
    ///
    /// The per-configuration shape does not change between drafts; this is
    /// an identity pass-through kept as its own named step so callers that
    /// hand a legacy-shaped view to an external mapper (the signer
    /// dispatch's credential-definition mapper, in particular) have a single
    /// place to extend if a future draft ever does need field-level
    /// translation here.
    #[must_use]
    pub fn configs_v13_to_v11(
        configs: &HashMap<String, CredentialConfiguration>,
    ) -> HashMap<String, CredentialConfiguration> {
        configs.clone()
    }

    /// The draft-13-facing view of configurations read from a draft-11
    /// legacy store. See `configs_v13_to_v11`.
    #[must_use]
    pub fn configs_v11_to_v13(
        configs: &HashMap<String, CredentialConfiguration>,
    ) -> HashMap<String, CredentialConfiguration> {
        configs.clone()
    }

    /// The `format` field to stamp on a credential response for a draft-13
    /// session.
    ///
    /// Draft 13 dropped the top-level `format` field from the credential
    /// response in favor of `credential_configuration_id`-implied format,
    /// but several deployed wallets still expect it; this core always
    /// stamps it from the matched configuration, unconditionally
    /// overwriting any `format` the mapper/signer may have set. This is a
    /// deliberate, narrow override rather than a merge — see `DESIGN.md`
    /// for the reasoning.
    #[must_use]
    pub const fn response_format_override(
        configuration_format: crate::issuer::CredentialFormat,
    ) -> crate::issuer::CredentialFormat {
        configuration_format
    }
}
