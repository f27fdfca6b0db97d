//! # Session & Issuer Storage
//!
//! `SessionStore`/`IssuerStore` are the only interfaces this core uses to
//! reach persistence — the actual storage engine (SQL, KV, in-memory) is an
//! external collaborator supplied by the host. The store is the
//! serialization point for session mutations (§5): callers re-read via
//! `get_by_id` before any transition rather than threading a session
//! through a long-lived borrow.

use crate::issuer::IssuerRecord;
use crate::session::IssuanceSession;
use crate::{Error, Result};

/// A correlation-key query against the session store.
///
/// Both variants are single-row lookups by construction: `(issuer_id,
/// credential_offer_uri)` is unique per invariant I1, and `(issuer_id,
/// c_nonce)` is unique among live sessions per invariant I2. A store
/// implementation that finds more than one matching row has a corrupted
/// index and must report `Error::AmbiguousSession`.
#[derive(Clone, Debug)]
pub enum SessionQuery {
    /// Look up the session that owns a previously issued offer URI.
    ByOfferUri {
        /// Owning issuer.
        issuer_id: String,
        /// The offer URI handed to the wallet.
        credential_offer_uri: String,
    },
    /// Look up the live session for a `c_nonce` presented in a credential
    /// request.
    ByNonce {
        /// Owning issuer, when known.
        issuer_id: Option<String>,
        /// The nonce extracted from the request.
        c_nonce: String,
    },
}

/// Persistence for `IssuanceSession` rows.
pub trait SessionStore: Send + Sync {
    /// Persist a newly created session.
    ///
    /// # Errors
    ///
    /// Implementations must fail this call if it would violate the unique
    /// index on `(issuer_id, credential_offer_uri)` (invariant I1).
    fn create(&self, session: IssuanceSession) -> impl Future<Output = Result<()>> + Send;

    /// Find the (at most one) session matching `query`.
    ///
    /// # Errors
    ///
    /// Returns `Error::AmbiguousSession` if more than one row matches.
    fn find_single_by_query(
        &self, query: &SessionQuery,
    ) -> impl Future<Output = Result<Option<IssuanceSession>>> + Send;

    /// Fetch a session by its primary key.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no session with `id` exists.
    fn get_by_id(&self, id: &str) -> impl Future<Output = Result<IssuanceSession>> + Send;

    /// Persist `session`, last-writer-wins by primary key.
    fn update(&self, session: IssuanceSession) -> impl Future<Output = Result<()>> + Send;
}

/// Persistence for `IssuerRecord` rows.
pub trait IssuerStore: Send + Sync {
    /// Fetch an issuer by its identifier.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no issuer with `issuer_id` exists.
    fn get(&self, issuer_id: &str) -> impl Future<Output = Result<IssuerRecord>> + Send;

    /// Persist `issuer`, last-writer-wins by primary key. Used for explicit
    /// updates such as key rotation; the core never deletes an
    /// `IssuerRecord`.
    fn update(&self, issuer: IssuerRecord) -> impl Future<Output = Result<()>> + Send;
}

/// Helper used by in-memory `SessionStore` implementations to turn "more
/// than one match" into the required error rather than silently picking
/// one.
pub(crate) fn single_row(mut matches: Vec<IssuanceSession>) -> Result<Option<IssuanceSession>> {
    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches.remove(0))),
        _ => Err(Error::AmbiguousSession("more than one session matched query".to_string())),
    }
}
