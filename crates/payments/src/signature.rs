//! Provider callback signatures.
//!
//! The provider signs `"{external_order_id}|{external_payment_id}"` with
//! HMAC-SHA256 under the shared key secret and sends the lowercase hex digest.

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the hex signature the provider would send for this pair.
pub fn compute_signature(
    secret: &str,
    external_order_id: &str,
    external_payment_id: &str,
) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(external_order_id.as_bytes());
    mac.update(b"|");
    mac.update(external_payment_id.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Compares a computed signature with the one the caller supplied.
///
/// Plain string equality, not constant-time.
pub fn signatures_match(expected: &str, provided: &str) -> bool {
    expected == provided
}

/// Returns whether `signature` is valid for this order/payment pair.
pub fn verify(
    secret: &str,
    external_order_id: &str,
    external_payment_id: &str,
    signature: &str,
) -> Result<bool, InvalidLength> {
    let expected = compute_signature(secret, external_order_id, external_payment_id)?;
    Ok(signatures_match(&expected, signature))
}
