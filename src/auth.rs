//! Password checks for cleartext and digest logins.

use md5::{Digest, Md5};
use ternop::ternary;

/// Check a supplied password against the stored one.
///
/// An empty `ts` means a cleartext login and the passwords are compared
/// directly. A non-empty `ts` means the client answered the digest
/// challenge `ts`: `supplied` must be the lowercase hex MD5 digest of
/// the timestamp followed by the stored password. Both paths compare in
/// constant time and malformed input only ever yields `false`.
pub(crate) fn verify(supplied: &str, stored: &str, ts: &str) -> bool {
    ternary!(
        ts.is_empty(),
        secure_compare(supplied.as_bytes(), stored.as_bytes()),
        secure_compare(supplied.as_bytes(), digest(ts, stored).as_bytes())
    )
}

// The digest an honest client answers a challenge with, rendered as the
// 32 lowercase hex digits that appear on the wire
fn digest(ts: &str, stored: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(ts.as_bytes());
    hasher.update(stored.as_bytes());
    let mut hex = String::with_capacity(32);
    for byte in hasher.finalize().iter() {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

// Equal length check first, then accumulate the XOR of every byte pair
// so that the amount of work does not depend on where the first
// mismatch occurs
fn secure_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked APOP example from RFC 1939 section 7
    const TS: &str = "<1896.697170952@dbc.mtview.ca.us>";
    const DIGEST: &str = "c4c9334bac560ecc979e58001b3e22fb";

    #[test]
    fn cleartext_match() {
        assert!(verify("secret", "secret", ""));
    }

    #[test]
    fn cleartext_mismatch() {
        assert!(!verify("guess!", "secret", ""));
    }

    #[test]
    fn cleartext_length_mismatch() {
        assert!(!verify("secre", "secret", ""));
        assert!(!verify("secrets", "secret", ""));
        assert!(!verify("", "secret", ""));
    }

    #[test]
    fn digest_matches_rfc_example() {
        assert_eq!(digest(TS, "tanstaaf"), DIGEST);
    }

    #[test]
    fn challenge_match() {
        assert!(verify(DIGEST, "tanstaaf", TS));
    }

    #[test]
    fn challenge_mismatch() {
        assert!(!verify("c4c9334bac560ecc979e58001b3e22fc", "tanstaaf", TS));
    }

    #[test]
    fn challenge_rejects_the_raw_password() {
        // A client that sends the password where the digest belongs
        assert!(!verify("tanstaaf", "tanstaaf", TS));
    }

    #[test]
    fn mismatches_found_at_every_position() {
        let stored = "aaaaaaaa";
        for i in 0..stored.len() {
            let mut probe = stored.to_owned().into_bytes();
            probe[i] ^= 1;
            let probe = String::from_utf8(probe).unwrap();
            assert!(!verify(&probe, stored, ""));
        }
        assert!(verify(stored, stored, ""));
    }
}
