pub mod extract;
pub mod sanitize;
pub mod structure;

use crate::dataset::{assemble, BankContext, Dataset};
use crate::report::ParseReport;

/// Recovery policy. Lenient (the default) salvages what it can from broken
/// markup; Strict turns any unrecoverable syntax error into an empty run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    Strict,
    #[default]
    Lenient,
}

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub chapter_no: Option<String>,
    pub chapter_title: Option<String>,
    pub strictness: Strictness,
}

pub struct ParseOutcome {
    pub dataset: Dataset,
    pub report: ParseReport,
}

/// Four-pass pipeline: sanitize → structural parse → per-item validation →
/// tabular assembly. Malformed content never errors out of here; the caller
/// always gets a well-formed (possibly empty) dataset plus the run report.
pub fn parse_bank(raw: &str, opts: &ParseOptions) -> ParseOutcome {
    let mut report = ParseReport::default();

    let cleaned = sanitize::sanitize(raw, &mut report);
    let structure = structure::parse_structure(
        &cleaned.text,
        cleaned.dropped_prefix,
        opts.strictness,
        &mut report,
    );

    let mut records = Vec::with_capacity(structure.candidates.len());
    for candidate in &structure.candidates {
        match extract::extract_record(candidate, structure.bank.topic.as_deref()) {
            Ok(record) => records.push(record),
            Err(diagnostic) => report.push(diagnostic),
        }
    }
    report.accepted = records.len();

    let ctx = BankContext {
        chapter_no: opts.chapter_no.clone(),
        chapter_title: opts.chapter_title.clone(),
    };
    let dataset = assemble(records, &ctx);
    report.log_summary();

    ParseOutcome { dataset, report }
}

// ── Tests ──
