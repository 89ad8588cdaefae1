//! X-Hub-Signature-256 verification.
//!
//! The MAC is computed over the raw request bytes. Never feed this a
//! re-serialised body: any byte-level change invalidates the signature.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const PREFIX: &str = "sha256=";

/// Produce the `sha256=<lowercase hex>` signature for `body`.
pub fn sign(body: &[u8], secret: &str) -> String {
    let mut mac = mac_for(secret);
    mac.update(body);
    format!("{PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// True iff `presented` is exactly `sign(body, secret)`.
///
/// The comparison is on the canonical lowercase form; uppercase hex or a
/// missing prefix is rejected. The digest itself is compared in constant time.
pub fn verify(body: &[u8], presented: &str, secret: &str) -> bool {
    let Some(sig_hex) = presented.strip_prefix(PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(sig_hex) else {
        return false;
    };
    if hex::encode(&expected) != sig_hex {
        return false;
    }

    let mut mac = mac_for(secret);
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

fn mac_for(secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length, so this never fails.
    match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts any key length"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"object":"whatsapp_business_account","entry":[]}"#;

    #[test]
    fn signed_body_verifies() {
        let sig = sign(BODY, "top-secret");
        assert!(sig.starts_with("sha256="));
        assert_eq!(sig.len(), PREFIX.len() + 64);
        assert!(verify(BODY, &sig, "top-secret"));
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2.
        let sig = sign(b"what do ya want for nothing?", "Jefe");
        assert_eq!(
            sig,
            "sha256=5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn any_single_byte_change_in_body_fails() {
        let sig = sign(BODY, "top-secret");
        for i in 0..BODY.len() {
            let mut mutated = BODY.to_vec();
            mutated[i] ^= 0x01;
            assert!(!verify(&mutated, &sig, "top-secret"), "byte {i} mutation verified");
        }
    }

    #[test]
    fn any_single_byte_change_in_secret_fails() {
        let secret = "top-secret";
        let sig = sign(BODY, secret);
        for i in 0..secret.len() {
            let mut bytes = secret.as_bytes().to_vec();
            bytes[i] ^= 0x01;
            let mutated = String::from_utf8(bytes).expect("ascii stays utf8");
            assert!(!verify(BODY, &sig, &mutated), "secret byte {i} mutation verified");
        }
    }

    #[test]
    fn rejects_non_canonical_forms() {
        let sig = sign(BODY, "k");
        let hex_part = sig.trim_start_matches(PREFIX);
        assert!(!verify(BODY, hex_part, "k"), "missing prefix");
        assert!(!verify(BODY, &format!("sha256={}", hex_part.to_uppercase()), "k"));
        assert!(!verify(BODY, "sha256=zz", "k"));
        assert!(!verify(BODY, "", "k"));
    }

    #[test]
    fn empty_secret_still_signs() {
        let sig = sign(BODY, "");
        assert!(verify(BODY, &sig, ""));
        assert!(!verify(BODY, &sig, "x"));
    }
}
