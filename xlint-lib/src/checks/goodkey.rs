//! Public key acceptance policy.
//!
//! Allows RSA of at least 2048 bits with a sane odd exponent, ECDSA on the
//! NIST P curves, and Ed25519. Everything else is rejected with a reason
//! suitable for a finding message.

use crate::certdata::PublicKeyInfo;

/// Minimum RSA modulus size accepted (CABF BR 6.1.5).
const MIN_RSA_BITS: u32 = 2048;

/// Largest modulus we bother evaluating; anything bigger is suspicious.
const MAX_RSA_BITS: u32 = 16384;

/// Small primes a sound RSA modulus can never be divisible by. Catches
/// catastrophically broken key generators; a full weak-key blocklist (e.g.
/// the Debian weak key set) would slot in next to this test.
const SMALL_PRIMES: &[u64] = &[3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47];

/// Evaluate a public key against the policy.
///
/// Returns `None` when the key is acceptable, or a reason phrased to follow
/// the word "Certificate" in a finding message.
pub fn check(key: Option<&PublicKeyInfo>) -> Option<String> {
    let key = match key {
        Some(key) => key,
        None => return Some("has an unparsable public key".into()),
    };

    match key.algorithm.as_str() {
        "RSA" => check_rsa(key),
        "EC" => check_ec(key),
        "Ed25519" => None,
        other => Some(format!("uses an unsupported public key algorithm ({})", other)),
    }
}

fn check_rsa(key: &PublicKeyInfo) -> Option<String> {
    let modulus = match &key.modulus {
        Some(m) => m,
        None => return Some("has an unparsable RSA public key".into()),
    };
    let bits = key.bits.unwrap_or(0);

    if bits < MIN_RSA_BITS {
        return Some(format!(
            "has a weak RSA key of {} bits, the minimum is {}",
            bits, MIN_RSA_BITS
        ));
    }
    if bits > MAX_RSA_BITS {
        return Some(format!("has an oversized RSA key of {} bits", bits));
    }

    match key.exponent {
        None => return Some("has an unparsable RSA public exponent".into()),
        Some(e) if e % 2 == 0 => {
            return Some(format!("has an even RSA public exponent ({})", e));
        }
        Some(e) if e < 3 => {
            return Some(format!("has an RSA public exponent ({}) that is too small", e));
        }
        Some(_) => {}
    }

    for prime in SMALL_PRIMES {
        if mod_small(modulus, *prime) == 0 {
            return Some(format!("has an RSA modulus divisible by {}", prime));
        }
    }

    None
}

fn check_ec(key: &PublicKeyInfo) -> Option<String> {
    match key.curve.as_deref() {
        Some("P-256") | Some("P-384") | Some("P-521") => None,
        Some(curve) => Some(format!("uses an unsupported elliptic curve ({})", curve)),
        None => Some("has an EC key without named curve parameters".into()),
    }
}

/// Remainder of a big-endian unsigned integer modulo a small divisor.
fn mod_small(bytes: &[u8], divisor: u64) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, b| ((acc << 8) | u64::from(*b)) % divisor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa(bits: u32, exponent: u64, modulus: Vec<u8>) -> PublicKeyInfo {
        PublicKeyInfo {
            algorithm: "RSA".into(),
            bits: Some(bits),
            curve: None,
            modulus: Some(modulus),
            exponent: Some(exponent),
        }
    }

    /// A 2048-bit odd value indivisible by every prime in the table.
    fn clean_modulus() -> Vec<u8> {
        let mut m = vec![0xff; 256];
        for last in (1u8..=255).step_by(2) {
            m[255] = last;
            if SMALL_PRIMES.iter().all(|p| mod_small(&m, *p) != 0) {
                return m;
            }
        }
        unreachable!("some odd tail byte must dodge 14 small primes")
    }

    #[test]
    fn small_rsa_is_rejected() {
        let key = rsa(1024, 65537, vec![0xff; 128]);
        let reason = check(Some(&key)).unwrap();
        assert!(reason.contains("weak RSA key of 1024 bits"), "{reason}");
    }

    #[test]
    fn even_exponent_is_rejected() {
        let key = rsa(2048, 65536, clean_modulus());
        assert!(check(Some(&key)).unwrap().contains("even RSA public exponent"));
    }

    #[test]
    fn divisible_modulus_is_rejected() {
        // 0xff.. repeated is divisible by 3.
        let key = rsa(2048, 65537, vec![0xff; 256]);
        assert!(check(Some(&key)).unwrap().contains("divisible"));
    }

    #[test]
    fn good_rsa_passes() {
        let key = rsa(2048, 65537, clean_modulus());
        assert_eq!(check(Some(&key)), None);
    }

    #[test]
    fn named_curves_pass_others_fail() {
        for (curve, ok) in [("P-256", true), ("P-384", true), ("P-521", true), ("secp192r1", false)] {
            let key = PublicKeyInfo {
                algorithm: "EC".into(),
                bits: None,
                curve: Some(curve.into()),
                modulus: None,
                exponent: None,
            };
            assert_eq!(check(Some(&key)).is_none(), ok, "{curve}");
        }
    }

    #[test]
    fn ed25519_passes_dsa_fails() {
        let ed = PublicKeyInfo {
            algorithm: "Ed25519".into(),
            bits: Some(256),
            curve: None,
            modulus: None,
            exponent: None,
        };
        assert_eq!(check(Some(&ed)), None);

        let dsa = PublicKeyInfo {
            algorithm: "1.2.840.10040.4.1".into(),
            bits: None,
            curve: None,
            modulus: None,
            exponent: None,
        };
        assert!(check(Some(&dsa)).unwrap().contains("unsupported"));
    }

    #[test]
    fn mod_small_matches_arithmetic() {
        assert_eq!(mod_small(&[0x01, 0x00], 7), 256 % 7);
        assert_eq!(mod_small(&[0xff, 0xff], 3), 0xffff % 3);
    }
}
