use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Repaired,
    Skipped,
}

/// Everything that can go wrong (or get fixed) while processing one bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    // Repaired by the sanitizer
    MismatchedOptionClose,
    TagCaseNormalized,
    StrayOuterText,
    // Skipped items / degraded runs
    MissingQuestion,
    EmptyQuestion,
    NoOptions,
    UnparseableFragment,
    NoItemSpans,
    StrictParseFailed,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::MismatchedOptionClose
            | DiagnosticKind::TagCaseNormalized
            | DiagnosticKind::StrayOuterText => Severity::Repaired,
            _ => Severity::Skipped,
        }
    }

    /// Short stable reason string, used for per-reason counts.
    pub fn reason(self) -> &'static str {
        match self {
            DiagnosticKind::MismatchedOptionClose => "mismatched option close tag",
            DiagnosticKind::TagCaseNormalized => "tag case normalized",
            DiagnosticKind::StrayOuterText => "stray text outside bank",
            DiagnosticKind::MissingQuestion => "missing question",
            DiagnosticKind::EmptyQuestion => "empty question",
            DiagnosticKind::NoOptions => "no options",
            DiagnosticKind::UnparseableFragment => "unparseable fragment",
            DiagnosticKind::NoItemSpans => "no item spans found",
            DiagnosticKind::StrictParseFailed => "strict parse failed",
        }
    }
}

/// One record per repaired defect or skipped candidate. `item` is the
/// zero-based index of the item span, `offset` a byte position into the
/// text as it looked when the defect was seen.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, detail: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            detail: detail.into(),
            item: None,
            offset: None,
        }
    }

    pub fn at_item(mut self, item: usize) -> Self {
        self.item = Some(item);
        self
    }

    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sev = match self.severity() {
            Severity::Repaired => "repaired",
            Severity::Skipped => "skipped",
        };
        write!(f, "{}: {}", sev, self.kind.reason())?;
        if !self.detail.is_empty() {
            write!(f, " ({})", self.detail)?;
        }
        if let Some(item) = self.item {
            write!(f, " [item {}]", item)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " [offset {}]", offset)?;
        }
        Ok(())
    }
}

/// Append-only run report. Never influences control flow; read at end of run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ParseReport {
    pub candidates_seen: usize,
    pub accepted: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseReport {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn repaired_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Repaired)
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Skipped)
            .count()
    }

    pub fn counts_by_reason(&self, severity: Severity) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for d in self.diagnostics.iter().filter(|d| d.severity() == severity) {
            *counts.entry(d.kind.reason()).or_insert(0) += 1;
        }
        counts
    }

    pub fn summary(&self) -> String {
        format!(
            "{} accepted, {} skipped, {} repaired ({} spans seen)",
            self.accepted,
            self.skipped_count(),
            self.repaired_count(),
            self.candidates_seen,
        )
    }

    pub fn log_summary(&self) {
        info!("{}", self.summary());
        for d in &self.diagnostics {
            match d.severity() {
                Severity::Skipped => warn!("{}", d),
                Severity::Repaired => debug!("{}", d),
            }
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_split() {
        assert_eq!(
            DiagnosticKind::MismatchedOptionClose.severity(),
            Severity::Repaired
        );
        assert_eq!(DiagnosticKind::NoOptions.severity(), Severity::Skipped);
        assert_eq!(
            DiagnosticKind::StrictParseFailed.severity(),
            Severity::Skipped
        );
    }

    #[test]
    fn counts_by_reason() {
        let mut report = ParseReport::default();
        report.push(Diagnostic::new(DiagnosticKind::NoOptions, "").at_item(0));
        report.push(Diagnostic::new(DiagnosticKind::NoOptions, "").at_item(2));
        report.push(Diagnostic::new(DiagnosticKind::MissingQuestion, "").at_item(1));
        report.push(Diagnostic::new(DiagnosticKind::TagCaseNormalized, "option1"));

        let skipped = report.counts_by_reason(Severity::Skipped);
        assert_eq!(skipped.get("no options"), Some(&2));
        assert_eq!(skipped.get("missing question"), Some(&1));
        assert_eq!(report.repaired_count(), 1);
        assert_eq!(report.skipped_count(), 3);
    }

    #[test]
    fn display_has_reason_and_locator() {
        let d = Diagnostic::new(DiagnosticKind::NoOptions, "question 'What is 2+2?'")
            .at_item(3)
            .at_offset(120);
        let s = d.to_string();
        assert!(s.contains("skipped: no options"));
        assert!(s.contains("[item 3]"));
        assert!(s.contains("[offset 120]"));
    }
}
