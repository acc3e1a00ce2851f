//! Lint findings: severity levels and the per-certificate accumulator.

use serde::Serialize;

/// Severity of a single lint finding.
///
/// Levels are totally ordered from least to most severe, so `FindingSet`
/// consumers can filter with a simple comparison. `Info` is reserved for the
/// "this certificate is acceptable" default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Info,
    Notice,
    Warning,
    Error,
    Alert,
    Critical,
    Emergency,
}

impl Severity {
    /// Name in the casing used for human output ("Warning").
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Notice => "Notice",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Alert => "Alert",
            Severity::Critical => "Critical",
            Severity::Emergency => "Emergency",
        }
    }

    /// Uppercase name used in CSV report rows ("WARNING").
    pub fn as_upper(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Alert => "ALERT",
            Severity::Critical => "CRITICAL",
            Severity::Emergency => "EMERGENCY",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lint observation: a severity and a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// An ordered, append-only collection of findings for one certificate.
///
/// Created per certificate, mutated only by the owning worker, consumed by
/// the report writer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FindingSet {
    findings: Vec<Finding>,
}

impl FindingSet {
    pub fn new() -> Self {
        FindingSet::default()
    }

    /// Append a finding with an explicit severity.
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.findings.push(Finding {
            severity,
            message: message.into(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn notice(&mut self, message: impl Into<String>) {
        self.push(Severity::Notice, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn err(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    pub fn alert(&mut self, message: impl Into<String>) {
        self.push(Severity::Alert, message);
    }

    pub fn critical(&mut self, message: impl Into<String>) {
        self.push(Severity::Critical, message);
    }

    pub fn emergency(&mut self, message: impl Into<String>) {
        self.push(Severity::Emergency, message);
    }

    /// Move all findings of `other` onto the end of this set.
    pub fn append(&mut self, mut other: FindingSet) {
        self.findings.append(&mut other.findings);
    }

    /// All findings in insertion order.
    pub fn list(&self) -> &[Finding] {
        &self.findings
    }

    /// Findings at or above the given severity, in insertion order.
    pub fn list_min(&self, min: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity >= min)
    }

    /// The most severe level present, if any finding exists.
    pub fn highest(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }
}

impl IntoIterator for FindingSet {
    type Item = Finding;
    type IntoIter = std::vec::IntoIter<Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.findings.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_totally_ordered() {
        let levels = [
            Severity::Info,
            Severity::Notice,
            Severity::Warning,
            Severity::Error,
            Severity::Alert,
            Severity::Critical,
            Severity::Emergency,
        ];
        for pair in levels.windows(2) {
            assert!(pair[0] < pair[1], "{} should sort below {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn highest_of_append_is_max_of_parts() {
        let mut a = FindingSet::new();
        a.warning("soft problem");
        let mut b = FindingSet::new();
        b.err("hard problem");
        b.info("note");

        let max = a.highest().max(b.highest());
        a.append(b);
        assert_eq!(a.highest(), max);
        assert_eq!(a.highest(), Some(Severity::Error));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn list_min_filters_below_threshold() {
        let mut fs = FindingSet::new();
        fs.info("a");
        fs.warning("b");
        fs.err("c");
        let errors: Vec<_> = fs.list_min(Severity::Warning).collect();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|f| f.severity >= Severity::Warning));
    }

    #[test]
    fn empty_set_has_no_highest() {
        assert_eq!(FindingSet::new().highest(), None);
        assert!(FindingSet::new().is_empty());
    }

    #[test]
    fn display_includes_level_and_message() {
        let f = Finding {
            severity: Severity::Error,
            message: "Certificate contains no subjectAltName".into(),
        };
        assert_eq!(
            f.to_string(),
            "Error: Certificate contains no subjectAltName"
        );
    }
}
