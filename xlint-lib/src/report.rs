//! CSV report writing.
//!
//! The writer is the single consumer of the results queue: one row per
//! finding, all findings of one certificate sharing a row number, CRLF
//! terminators, RFC 4180 quoting via the csv crate.

use std::io::Write;
use std::sync::mpsc::Receiver;

use crate::pipeline::LintResult;
use crate::revocation::RevocationCheck;
use crate::util;
use crate::XlintError;

/// Report writer options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Embed the certificate PEM in the last column.
    pub include_pem: bool,
    /// Consult the revocation collaborator for the Revoked column.
    pub check_revoked: bool,
}

const HEADER: &[&str] = &[
    "Number",
    "Issuer",
    "CN",
    "O",
    "Serial",
    "NotBefore",
    "NotAfter",
    "Type",
    "Severity",
    "Error",
    "Revoked",
    "Cert",
];

/// Drain the results queue into CSV rows. Returns the number of
/// certificates written (the final row number counter).
pub fn write_report<W: Write>(
    results: Receiver<LintResult>,
    out: W,
    options: &ReportOptions,
    revocation: Option<&dyn RevocationCheck>,
) -> Result<u64, XlintError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(out);

    writer.write_record(HEADER)?;
    writer.flush()?;

    let mut number: u64 = 0;
    while let Ok(result) = results.recv() {
        write_result(&mut writer, number, &result, options, revocation)?;
        number += 1;
    }

    writer.flush()?;
    Ok(number)
}

/// Write one result: a row per finding, every row sharing the certificate's
/// number.
fn write_result<W: Write>(
    writer: &mut csv::Writer<W>,
    number: u64,
    result: &LintResult,
    options: &ReportOptions,
    revocation: Option<&dyn RevocationCheck>,
) -> Result<(), XlintError> {
    if let Some(data) = &result.cert {
        let issuer = format!(
            "{}, {}",
            data.cert.issuer.common_name().unwrap_or(""),
            data.cert.issuer.organization().unwrap_or("")
        );
        let subject_cn = data.cert.subject.common_name().unwrap_or("");
        let subject_o = data.cert.subject.all("O").join(", ");
        let serial = util::hex_lower_minimal(&data.cert.serial);
        let not_before = format_date(data.cert.not_before);
        let not_after = format_date(data.cert.not_after);
        let cert_type = data.cert_type.to_string();

        // One lookup per certificate, shared by all of its rows.
        let revoked = if options.check_revoked {
            match revocation {
                Some(client) => {
                    let (is_revoked, ok) = client.verify(data);
                    if ok {
                        is_revoked.to_string()
                    } else {
                        "failed".to_string()
                    }
                }
                None => "failed".to_string(),
            }
        } else {
            String::new()
        };

        let cert_pem = if options.include_pem {
            crate::pem::encode(&data.der)
        } else {
            String::new()
        };

        for finding in result.findings.list() {
            writer.write_record([
                number.to_string().as_str(),
                &issuer,
                subject_cn,
                &subject_o,
                &serial,
                &not_before,
                &not_after,
                &cert_type,
                finding.severity.as_upper(),
                &finding.message,
                &revoked,
                &cert_pem,
            ])?;
        }
    } else {
        // PEM decode failures: identifying columns stay blank and the raw
        // block lands in the last column for post-mortems.
        let raw_pem = result.raw_pem.as_deref().unwrap_or("");
        for finding in result.findings.list() {
            writer.write_record([
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                finding.severity.as_upper(),
                &finding.message,
                "",
                raw_pem,
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn format_date(ts: i64) -> String {
    match time::OffsetDateTime::from_unix_timestamp(ts) {
        Ok(dt) => format!("{:04}-{:02}-{:02}", dt.year(), u8::from(dt.month()), dt.day()),
        Err(_) => ts.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certdata::{CertData, CertInfo, DistinguishedName};
    use crate::classify::CertType;
    use crate::findings::FindingSet;

    fn sample_result() -> LintResult {
        let mut cert = CertInfo::default();
        cert.subject = DistinguishedName {
            components: vec![("O".into(), "Acme".into()), ("CN".into(), "example.com".into())],
        };
        cert.issuer = DistinguishedName {
            components: vec![("O".into(), "Example Trust".into()), ("CN".into(), "Example CA".into())],
        };
        cert.serial = vec![0x00, 0xab, 0xcd];
        cert.not_before = 1_600_000_000; // 2020-09-13
        cert.not_after = 1_660_000_000; // 2022-08-08

        let mut findings = FindingSet::new();
        findings.err("Certificate is signed with the weak signature algorithm sha1WithRSAEncryption");
        findings.warning("Certificate is missing the KeyUsage extension");

        LintResult {
            cert: Some(CertData {
                der: vec![1, 2, 3],
                cert,
                cert_type: CertType::Dv,
                issuer: None,
                trusted: false,
            }),
            raw_pem: None,
            findings,
        }
    }

    fn render(results: Vec<LintResult>, options: &ReportOptions) -> String {
        let mut buffer = Vec::new();
        {
            let mut writer = csv::WriterBuilder::new()
                .terminator(csv::Terminator::CRLF)
                .from_writer(&mut buffer);
            writer.write_record(HEADER).unwrap();
            for (number, result) in results.iter().enumerate() {
                write_result(&mut writer, number as u64, result, options, None).unwrap();
            }
        }
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn one_row_per_finding_with_shared_number() {
        let csv = render(vec![sample_result()], &ReportOptions::default());
        let rows: Vec<&str> = csv.trim_end().split("\r\n").collect();
        assert_eq!(rows.len(), 3); // header + 2 findings
        assert!(rows[1].starts_with("0,"));
        assert!(rows[2].starts_with("0,"));
        assert!(rows[1].contains("ERROR"));
        assert!(rows[2].contains("WARNING"));
    }

    #[test]
    fn identifying_columns_are_populated() {
        let csv = render(vec![sample_result()], &ReportOptions::default());
        let row = csv.trim_end().split("\r\n").nth(1).unwrap();
        assert!(row.contains("Example CA, Example Trust"));
        assert!(row.contains("example.com"));
        assert!(row.contains("abcd"));
        assert!(row.contains("2020-09-13"));
        assert!(row.contains("2022-08-08"));
        assert!(row.contains(",DV,"));
        // Revoked and Cert columns stay blank without the options.
        assert!(row.ends_with(",,"));
    }

    #[test]
    fn parse_failures_get_blank_columns_and_raw_pem() {
        let mut findings = FindingSet::new();
        findings.err("Invalid PEM format: base64 decode failed");
        let result = LintResult {
            cert: None,
            raw_pem: Some("-----BEGIN CERTIFICATE-----\ngarbage\n-----END CERTIFICATE-----\n".into()),
            findings,
        };

        let csv = render(vec![result], &ReportOptions::default());
        let row = csv.trim_end().split("\r\n").nth(1).unwrap();
        assert!(row.starts_with(",,,,,,,,ERROR,"));
        assert!(row.contains("garbage"));
    }

    #[test]
    fn include_pem_fills_the_cert_column() {
        let options = ReportOptions {
            include_pem: true,
            check_revoked: false,
        };
        let csv = render(vec![sample_result()], &options);
        assert!(csv.contains("BEGIN CERTIFICATE"));
    }

    #[test]
    fn numbers_increment_per_certificate() {
        let csv = render(
            vec![sample_result(), sample_result()],
            &ReportOptions::default(),
        );
        let rows: Vec<&str> = csv.trim_end().split("\r\n").collect();
        assert!(rows[1].starts_with("0,") && rows[2].starts_with("0,"));
        assert!(rows[3].starts_with("1,") && rows[4].starts_with("1,"));
    }

    #[test]
    fn revoked_without_client_reads_failed() {
        let options = ReportOptions {
            include_pem: false,
            check_revoked: true,
        };
        let csv = render(vec![sample_result()], &options);
        assert!(csv.contains(",failed,"));
    }
}
