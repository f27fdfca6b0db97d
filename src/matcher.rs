//! # Credential Matching
//!
//! Resolves a wallet's credential request against the session's offered,
//! not-yet-issued configurations (§4.4). Two paths: a direct
//! `credential_identifier` lookup, and a format/type-constrained search over
//! every offered configuration.

use std::collections::HashMap;

use tracing::warn;

use crate::issuer::{CredentialConfiguration, CredentialFormat, IssuerRecord};
use crate::request::CredentialRequest;
use crate::session::IssuanceSession;
use crate::{Error, Result, invalid};

/// Matches credential requests against a session's remaining offer.
pub struct CredentialMatcher;

impl CredentialMatcher {
    /// Find the configuration (and its id) that satisfies `request`, among
    /// `session`'s offered-but-not-yet-issued configurations.
    ///
    /// When `request.credential_identifier` is set, it is looked up
    /// directly: a miss is `Error::NotOffered`, bypassing format matching
    /// entirely. Otherwise every offered, unissued configuration is checked
    /// against the request's format and the format-specific type/vct/doctype
    /// predicate; zero matches is `Error::NoMatchingOffer`. More than one
    /// match is not an error — the first (in offer order) is used and a
    /// warning is logged, since the offer's own construction already
    /// guarantees uniqueness of configuration ids within an offer, so a
    /// collision here can only mean two configurations that are
    /// indistinguishable by the request's constraints.
    ///
    /// # Errors
    ///
    /// See variant docs above.
    pub fn resolve(
        issuer: &IssuerRecord, session: &IssuanceSession, request: &CredentialRequest,
    ) -> Result<(String, CredentialConfiguration)> {
        let offered = offered_configurations(issuer, session);

        if let Some(identifier) = &request.credential_identifier {
            return offered
                .get(identifier)
                .map(|config| (identifier.clone(), (*config).clone()))
                .ok_or_else(|| {
                    invalid!(NotOffered, "credential_identifier '{identifier}' was not offered")
                });
        }

        let Some(format) = request.format else {
            return Err(invalid!(NoMatchingOffer, "request has neither format nor credential_identifier"));
        };

        let mut matches: Vec<(&String, &CredentialConfiguration)> = offered
            .iter()
            .filter(|(_, config)| config.format == format)
            .filter(|(_, config)| matches_predicate(config, request))
            .collect();
        // Deterministic order: the offer's own id order, as captured by
        // `offered_credentials`.
        matches.sort_by_key(|(id, _)| {
            session.offered_credentials.iter().position(|offered_id| offered_id == *id)
        });

        if matches.is_empty() {
            return Err(invalid!(
                NoMatchingOffer,
                "no offered, unissued configuration matches format '{}' and the request's type constraints",
                format.as_str()
            ));
        }
        if matches.len() > 1 {
            warn!(
                count = matches.len(),
                format = format.as_str(),
                "multiple offered configurations match credential request; using the first"
            );
        }

        let (id, config) = matches[0];
        Ok((id.clone(), config.clone()))
    }
}

/// The session's offered configurations that have not yet been issued,
/// looked up in the issuer's current configuration map.
fn offered_configurations<'a>(
    issuer: &'a IssuerRecord, session: &IssuanceSession,
) -> HashMap<&'a String, &'a CredentialConfiguration> {
    let all = issuer.configurations.as_map();
    all.iter()
        .filter(|(id, _)| session.offered_credentials.iter().any(|offered| offered == *id))
        .filter(|(id, _)| !session.has_issued(id))
        .collect()
}

/// Does `config`'s format-specific constraint match the request?
fn matches_predicate(config: &CredentialConfiguration, request: &CredentialRequest) -> bool {
    match config.format {
        CredentialFormat::JwtVcJson => {
            let Some(wanted) = config.credential_definition.as_ref() else { return false };
            request.jwt_vc_json_types().is_some_and(|got| equal_as_sets(&wanted.type_, got))
        }
        CredentialFormat::JwtVcJsonLd | CredentialFormat::LdpVc => {
            let Some(wanted) = config.credential_definition.as_ref() else { return false };
            request.json_ld_types().is_some_and(|got| equal_as_sets(&wanted.type_, got))
        }
        CredentialFormat::SdJwtVc => {
            config.vct.is_some() && config.vct == request.vct
        }
        CredentialFormat::MsoMdoc => {
            config.doctype.is_some() && config.doctype == request.doctype
        }
    }
}

/// Order-independent equality of two string multisets.
fn equal_as_sets(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a_sorted = a.to_vec();
    let mut b_sorted = b.to_vec();
    a_sorted.sort_unstable();
    b_sorted.sort_unstable();
    a_sorted == b_sorted
}
