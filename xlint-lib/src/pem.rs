//! PEM block handling: extraction, decoding, and encoding.

use crate::util;
use crate::XlintError;

/// Extract the DER bytes of a certificate from input that may be PEM or DER.
///
/// If the input begins with `-----BEGIN` (after stripping whitespace), the
/// first `CERTIFICATE` block is decoded. Otherwise the input is returned
/// as-is and treated as DER.
pub fn certificate_der(input: &[u8]) -> Result<Vec<u8>, XlintError> {
    if input.is_empty() {
        return Err(XlintError::PemError("empty input".into()));
    }

    if !util::is_pem(input) {
        return Ok(input.to_vec());
    }

    let (_, pem) = x509_parser::pem::parse_x509_pem(input)
        .map_err(|e| XlintError::PemError(format!("{}", e)))?;

    if pem.label != "CERTIFICATE"
        && pem.label != "TRUSTED CERTIFICATE"
        && pem.label != "X509 CERTIFICATE"
    {
        return Err(XlintError::PemError(format!(
            "expected CERTIFICATE, got {}",
            pem.label
        )));
    }

    Ok(pem.contents)
}

/// Decode one buffered PEM certificate block, as accumulated by the bulk
/// reader between BEGIN and END markers. Returns `None` when the block does
/// not decode to DER.
pub fn decode_block(block: &[u8]) -> Option<Vec<u8>> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(block).ok()?;
    if pem.contents.is_empty() {
        return None;
    }
    Some(pem.contents)
}

/// Encode DER certificate bytes as a PEM `CERTIFICATE` block.
pub fn encode(der: &[u8]) -> String {
    format!(
        "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
        util::base64_wrap(der)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // Not a real certificate; decode_block only checks PEM framing.
    const BLOCK: &str = "-----BEGIN CERTIFICATE-----\nAQIDBAU=\n-----END CERTIFICATE-----\n";

    #[test]
    fn decode_block_roundtrips_base64() {
        let der = decode_block(BLOCK.as_bytes()).unwrap();
        assert_eq!(der, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn decode_block_rejects_garbage() {
        assert!(decode_block(b"-----BEGIN CERTIFICATE-----\n!!!!\n-----END CERTIFICATE-----\n").is_none());
        assert!(decode_block(b"no markers at all").is_none());
    }

    #[test]
    fn encode_wraps_at_64_columns() {
        let der = vec![0u8; 96];
        let pem = encode(&der);
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(pem.ends_with("-----END CERTIFICATE-----\n"));
        let body: Vec<&str> = pem
            .lines()
            .filter(|l| !l.starts_with("-----"))
            .collect();
        assert!(body.iter().all(|l| l.len() <= 64));
    }

    #[test]
    fn der_input_passes_through() {
        let der = vec![0x30, 0x03, 0x02, 0x01, 0x01];
        assert_eq!(certificate_der(&der).unwrap(), der);
    }
}
