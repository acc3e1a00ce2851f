//! Structural linting of DER encodings.
//!
//! Walks the raw TLV tree and reports departures from DER canonical
//! encoding. This deliberately does not use the X.509 parser: the point is
//! to produce useful findings for certificates whose DER is too damaged to
//! parse semantically. Violations that merely break canonical form are
//! Warnings; violations that make the structure unparsable are Errors.

use crate::findings::FindingSet;

// Universal tag numbers with DER-specific encoding rules.
const TAG_BOOLEAN: u8 = 0x01;
const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_OID: u8 = 0x06;
const TAG_SET: u8 = 0x11;

const CONSTRUCTED: u8 = 0x20;
const CLASS_MASK: u8 = 0xc0;
const CLASS_UNIVERSAL: u8 = 0x00;

/// Recursion cap; X.509 structures stay far below this.
const MAX_DEPTH: usize = 32;

/// String types that DER requires to use primitive encoding, plus OCTET
/// STRING and BIT STRING which have the same constraint.
fn must_be_primitive(tag_number: u8) -> bool {
    matches!(
        tag_number,
        TAG_BIT_STRING
            | TAG_OCTET_STRING
            | 0x0c // UTF8String
            | 0x12 // NumericString
            | 0x13 // PrintableString
            | 0x14 // TeletexString
            | 0x16 // IA5String
            | 0x1a // VisibleString
            | 0x1c // UniversalString
            | 0x1e // BMPString
    )
}

/// Lint the structure of a DER encoding.
///
/// Returns findings describing canonical-encoding violations. The input is
/// expected to be exactly one top-level element; trailing bytes are flagged.
pub fn lint_der(der: &[u8]) -> FindingSet {
    let mut findings = FindingSet::new();

    if der.is_empty() {
        findings.err("ASN.1: empty encoding");
        return findings;
    }

    match lint_element(der, 0, 0, &mut findings) {
        Some(consumed) => {
            if consumed < der.len() {
                findings.warning(format!(
                    "ASN.1: {} trailing byte(s) after top-level element",
                    der.len() - consumed
                ));
            }
        }
        None => {
            // lint_element already recorded the reason.
        }
    }

    findings
}

/// Lint one TLV element starting at `der[offset..]`. Returns the total
/// number of bytes consumed from `offset`, or `None` when the structure is
/// unparsable (an Error finding has been recorded).
fn lint_element(der: &[u8], offset: usize, depth: usize, findings: &mut FindingSet) -> Option<usize> {
    if depth > MAX_DEPTH {
        findings.err(format!("ASN.1: nesting deeper than {} levels", MAX_DEPTH));
        return None;
    }

    let buf = &der[offset..];
    let first = *buf.first()?;
    let mut pos = 1;

    // High tag numbers continue in subsequent bytes.
    let tag_number = first & 0x1f;
    if tag_number == 0x1f {
        loop {
            let b = match buf.get(pos) {
                Some(b) => *b,
                None => {
                    findings.err(format!("ASN.1: truncated tag at offset {}", offset));
                    return None;
                }
            };
            pos += 1;
            if b & 0x80 == 0 {
                break;
            }
        }
    }

    let constructed = first & CONSTRUCTED != 0;
    let universal = first & CLASS_MASK == CLASS_UNIVERSAL;

    let (length, header_len) = match lint_length(buf, pos, offset, findings) {
        Some(v) => v,
        None => return None,
    };
    pos = header_len;

    let content = match buf.get(pos..pos + length) {
        Some(c) => c,
        None => {
            findings.err(format!(
                "ASN.1: element at offset {} claims {} content bytes but only {} remain",
                offset,
                length,
                buf.len().saturating_sub(pos)
            ));
            return None;
        }
    };

    if universal && tag_number != 0x1f {
        lint_universal(tag_number, constructed, content, offset, findings);
    }

    if constructed {
        let mut child_offset = offset + pos;
        let end = offset + pos + length;
        let mut child_encodings: Vec<&[u8]> = Vec::new();

        while child_offset < end {
            let consumed = lint_element(der, child_offset, depth + 1, findings)?;
            child_encodings.push(&der[child_offset..child_offset + consumed]);
            child_offset += consumed;
        }

        // DER requires SET elements sorted by their encoded value.
        if universal && tag_number == TAG_SET && !child_encodings.windows(2).all(|w| w[0] <= w[1]) {
            findings.warning(format!(
                "ASN.1: SET at offset {} has elements not in DER order",
                offset
            ));
        }
    }

    Some(pos + length)
}

/// Lint the length octets starting at `buf[pos]`. Returns
/// `(content_length, header_length_including_tag)`.
fn lint_length(
    buf: &[u8],
    pos: usize,
    offset: usize,
    findings: &mut FindingSet,
) -> Option<(usize, usize)> {
    let first = match buf.get(pos) {
        Some(b) => *b,
        None => {
            findings.err(format!("ASN.1: truncated length at offset {}", offset));
            return None;
        }
    };

    if first < 0x80 {
        return Some((first as usize, pos + 1));
    }

    if first == 0x80 {
        findings.err(format!(
            "ASN.1: indefinite length at offset {} is not allowed in DER",
            offset
        ));
        return None;
    }

    let num_octets = (first & 0x7f) as usize;
    if num_octets > std::mem::size_of::<usize>() {
        findings.err(format!("ASN.1: unsupported length of length at offset {}", offset));
        return None;
    }

    let octets = match buf.get(pos + 1..pos + 1 + num_octets) {
        Some(o) => o,
        None => {
            findings.err(format!("ASN.1: truncated length at offset {}", offset));
            return None;
        }
    };

    let mut length: usize = 0;
    for b in octets {
        length = (length << 8) | *b as usize;
    }

    // DER requires the shortest possible length encoding.
    if octets.first() == Some(&0) || length < 0x80 {
        findings.warning(format!(
            "ASN.1: non-minimal length encoding at offset {}",
            offset
        ));
    }

    Some((length, pos + 1 + num_octets))
}

/// Encoding rules specific to universal primitive types.
fn lint_universal(
    tag_number: u8,
    constructed: bool,
    content: &[u8],
    offset: usize,
    findings: &mut FindingSet,
) {
    if constructed {
        if must_be_primitive(tag_number) {
            findings.warning(format!(
                "ASN.1: constructed encoding of primitive type (tag {}) at offset {}",
                tag_number, offset
            ));
        }
        return;
    }

    match tag_number {
        TAG_BOOLEAN => {
            if content.len() != 1 {
                findings.err(format!("ASN.1: BOOLEAN at offset {} must be one byte", offset));
            } else if content[0] != 0x00 && content[0] != 0xff {
                findings.warning(format!(
                    "ASN.1: BOOLEAN at offset {} uses non-DER value 0x{:02x}",
                    offset, content[0]
                ));
            }
        }
        TAG_INTEGER => {
            if content.is_empty() {
                findings.err(format!("ASN.1: empty INTEGER at offset {}", offset));
            } else if content.len() > 1 {
                let non_minimal = (content[0] == 0x00 && content[1] & 0x80 == 0)
                    || (content[0] == 0xff && content[1] & 0x80 != 0);
                if non_minimal {
                    findings.warning(format!(
                        "ASN.1: non-minimal INTEGER encoding at offset {}",
                        offset
                    ));
                }
            }
        }
        TAG_BIT_STRING => {
            if content.is_empty() {
                findings.err(format!("ASN.1: empty BIT STRING at offset {}", offset));
            } else if content[0] > 7 {
                findings.err(format!(
                    "ASN.1: BIT STRING at offset {} declares {} unused bits",
                    offset, content[0]
                ));
            }
        }
        TAG_OID => {
            if content.is_empty() {
                findings.err(format!(
                    "ASN.1: empty OBJECT IDENTIFIER at offset {}",
                    offset
                ));
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Severity;

    fn highest(der: &[u8]) -> Option<Severity> {
        lint_der(der).highest()
    }

    #[test]
    fn minimal_sequence_is_clean() {
        // SEQUENCE { INTEGER 5 }
        let der = [0x30, 0x03, 0x02, 0x01, 0x05];
        assert!(lint_der(&der).is_empty());
    }

    #[test]
    fn indefinite_length_is_an_error() {
        let der = [0x30, 0x80, 0x00, 0x00];
        let findings = lint_der(&der);
        assert_eq!(findings.highest(), Some(Severity::Error));
        assert!(findings.list()[0].message.contains("indefinite"));
    }

    #[test]
    fn non_minimal_length_is_a_warning() {
        // SEQUENCE with long-form length 0x81 0x03 where short form would do
        let der = [0x30, 0x81, 0x03, 0x02, 0x01, 0x05];
        assert_eq!(highest(&der), Some(Severity::Warning));
    }

    #[test]
    fn non_minimal_integer_is_a_warning() {
        // INTEGER with redundant leading zero: 00 05
        let der = [0x02, 0x02, 0x00, 0x05];
        let findings = lint_der(&der);
        assert_eq!(findings.highest(), Some(Severity::Warning));
        assert!(findings.list()[0].message.contains("INTEGER"));
    }

    #[test]
    fn padded_positive_integer_is_clean() {
        // INTEGER 0x00 0xFF is minimal (sign padding required)
        let der = [0x02, 0x02, 0x00, 0xff];
        assert!(lint_der(&der).is_empty());
    }

    #[test]
    fn unsorted_set_is_a_warning() {
        // SET { INTEGER 2, INTEGER 1 } -- elements out of DER order
        let der = [0x31, 0x06, 0x02, 0x01, 0x02, 0x02, 0x01, 0x01];
        let findings = lint_der(&der);
        assert_eq!(findings.highest(), Some(Severity::Warning));
        assert!(findings.list()[0].message.contains("SET"));
    }

    #[test]
    fn sorted_set_is_clean() {
        let der = [0x31, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02];
        assert!(lint_der(&der).is_empty());
    }

    #[test]
    fn truncated_element_is_an_error() {
        let der = [0x30, 0x10, 0x02, 0x01];
        assert_eq!(highest(&der), Some(Severity::Error));
    }

    #[test]
    fn trailing_bytes_are_a_warning() {
        let der = [0x02, 0x01, 0x05, 0xde, 0xad];
        let findings = lint_der(&der);
        assert_eq!(findings.highest(), Some(Severity::Warning));
        assert!(findings.list()[0].message.contains("trailing"));
    }

    #[test]
    fn constructed_octet_string_is_a_warning() {
        // Constructed OCTET STRING wrapping a primitive one
        let der = [0x24, 0x04, 0x04, 0x02, 0xab, 0xcd];
        assert_eq!(highest(&der), Some(Severity::Warning));
    }

    #[test]
    fn boolean_padding_is_flagged() {
        let der = [0x01, 0x01, 0x01];
        let findings = lint_der(&der);
        assert_eq!(findings.highest(), Some(Severity::Warning));
        assert!(findings.list()[0].message.contains("BOOLEAN"));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(highest(&[]), Some(Severity::Error));
    }
}
