//! Request signing and digest helpers

use crate::types::Params;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Name of the header carrying a request or IPN signature
pub const HMAC_HEADER: &str = "hmac";

/// An encoded parameter set and its signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Form-encoded parameters; exactly the bytes that were signed
    pub encoded_body: Vec<u8>,
    /// Lowercase hex HMAC-SHA512 of `encoded_body`
    pub signature: String,
}

impl SignedRequest {
    /// The encoded parameters as text
    pub fn encoded_str(&self) -> &str {
        // Form encoding only ever produces ASCII
        std::str::from_utf8(&self.encoded_body).unwrap_or_default()
    }
}

/// Encode `params` in canonical order and sign the encoded bytes
pub fn sign_and_encode(private_key: &str, params: &Params) -> SignedRequest {
    let encoded_body = params.to_form_urlencoded().into_bytes();
    let signature = hmac_sha512_hex(private_key.as_bytes(), &encoded_body);

    SignedRequest {
        encoded_body,
        signature,
    }
}

/// Lowercase hex HMAC-SHA512 of `data`
pub fn hmac_sha512_hex(key: &[u8], data: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex HMAC-SHA512 signature over `data`
pub fn verify_hmac_sha512_hex(key: &[u8], data: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };

    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Constant-time check of a hex SHA-256 digest of `data`
pub fn verify_sha256_hex(data: &[u8], digest_hex: &str) -> bool {
    let Ok(provided) = hex::decode(digest_hex.trim()) else {
        return false;
    };

    Sha256::digest(data).as_slice().ct_eq(&provided).into()
}
