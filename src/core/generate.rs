//! Random identifier generation.
//!
//! Every value here is unguessable-by-construction rather than
//! sequential, since each backs a bearer secret (`pre_authorized_code`) or a
//! correlation key looked up directly from wallet-supplied input
//! (`credential_offer_uri`, `c_nonce`).

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::RngCore;
use rand::rngs::OsRng;

/// Generate a fresh `pre_authorized_code` with at least 128 bits of entropy.
///
/// Uses 32 random bytes (256 bits), base64url-encoded without padding,
/// giving a 43-character opaque token.
#[must_use]
pub fn pre_authorized_code() -> String {
    random_token(32)
}

/// Generate a fresh `c_nonce`.
#[must_use]
pub fn c_nonce() -> String {
    random_token(16)
}

/// Generate the opaque path segment used in a `credential_offer_uri`.
#[must_use]
pub fn offer_uri_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate a fresh issuance session id.
#[must_use]
pub fn session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate a 6-digit numeric transaction code (PIN) for display
/// out-of-band to the holder.
#[must_use]
pub fn tx_code_value() -> String {
    let mut buf = [0u8; 1];
    let mut code = String::with_capacity(6);
    for _ in 0..6 {
        OsRng.fill_bytes(&mut buf);
        code.push(char::from(b'0' + (buf[0] % 10)));
    }
    code
}

fn random_token(num_bytes: usize) -> String {
    let mut bytes = vec![0u8; num_bytes];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}
