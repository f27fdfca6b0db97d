//! # Configuration
//!
//! A plain value type carrying the host-supplied knobs this core needs —
//! not a loader. Reading it from environment variables, a config file, or a
//! secrets manager is the host's job; this core only ever consumes the
//! resulting struct.

use chrono::Duration;

/// Host-supplied configuration for offer creation and nonce management.
#[derive(Clone, Debug)]
pub struct IssuerConfig {
    /// The credential issuer's base URL, used as `credential_issuer` in
    /// offers and as the base for `credential_offer_uri`.
    pub issuer_url: String,
    /// Path segment (no leading/trailing slashes required) at which offers
    /// are retrievable by their `credential_offer_uri`.
    pub offer_endpoint_path: String,
    /// How long a freshly issued `c_nonce` remains valid.
    pub c_nonce_ttl: Duration,
    /// Minimum entropy, in bits, `OfferBuilder` must generate for a
    /// pre-authorized code when the caller doesn't supply one. This core's
    /// default generator (`core::generate::pre_authorized_code`) always
    /// produces 256 bits; this field exists for hosts that plug in their own
    /// generator and want it validated.
    pub pre_authorized_code_min_entropy_bits: u32,
}

impl IssuerConfig {
    /// The `credential_issuer` base URL with no trailing slash.
    #[must_use]
    pub fn issuer_url(&self) -> &str {
        self.issuer_url.trim_end_matches('/')
    }
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            issuer_url: String::new(),
            offer_endpoint_path: "credential_offer".to_string(),
            c_nonce_ttl: Duration::minutes(5),
            pre_authorized_code_min_entropy_bits: 128,
        }
    }
}
