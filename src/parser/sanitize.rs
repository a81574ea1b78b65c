use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::report::{Diagnostic, DiagnosticKind, ParseReport};

static TAG_CASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(</?)(QUIZ_BANK|QUIZ_ITEM|QUESTION|OPTION[0-9]|TOPIC|TAG|PATH)\b").unwrap()
});
static OPTION_PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<OPTION([0-9])([^>]*)>(.*?)</OPTION([0-9])\s*>").unwrap());

/// Sanitizer output. `dropped_prefix` is how many bytes of generator chatter
/// were cut before `<QUIZ_BANK`; adding it to a position in `text` yields the
/// matching byte offset in the original input.
pub struct Sanitized {
    pub text: String,
    pub dropped_prefix: usize,
}

/// Rewrite structurally common defects before any structural parse: tag case,
/// stray text around the bank element, mismatched option close tags. Content
/// inside elements (code blocks, inline markup) is never touched. Every
/// rewrite is recorded as a repaired diagnostic whose offset points into the
/// original input; anything this pass cannot fix is left for the parser's
/// recovery mode.
pub fn sanitize(raw: &str, report: &mut ParseReport) -> Sanitized {
    // Case folding keeps byte lengths, so offsets recorded here and below
    // stay valid in the original input once the trim delta is added back.
    let text = normalize_tag_case(raw, report);
    let (text, dropped_prefix) = trim_outer_text(&text, report);
    let text = repair_option_closes(&text, dropped_prefix, report);
    Sanitized { text, dropped_prefix }
}

/// Fold known tag names to canonical uppercase so structural matching never
/// needs per-comparison case folding. One diagnostic per distinct spelling.
fn normalize_tag_case(raw: &str, report: &mut ParseReport) -> String {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    TAG_CASE_RE
        .replace_all(raw, |caps: &Captures| {
            let name = &caps[2];
            let upper = name.to_uppercase();
            if name != upper && seen.insert(name.to_string()) {
                report.push(
                    Diagnostic::new(
                        DiagnosticKind::TagCaseNormalized,
                        format!("'{}' -> '{}'", name, upper),
                    )
                    .at_offset(caps.get(0).unwrap().start()),
                );
            }
            format!("{}{}", &caps[1], upper)
        })
        .into_owned()
}

/// Drop generator chatter before `<QUIZ_BANK` and after `</QUIZ_BANK>`,
/// returning the kept slice plus the dropped prefix length. Without a bank
/// element the text is passed through for span recovery.
fn trim_outer_text(text: &str, report: &mut ParseReport) -> (String, usize) {
    let Some(open) = text.find("<QUIZ_BANK") else {
        return (text.to_string(), 0);
    };
    if !text[..open].trim().is_empty() {
        report.push(
            Diagnostic::new(DiagnosticKind::StrayOuterText, "text before <QUIZ_BANK> dropped")
                .at_offset(0),
        );
    }
    let mut out = &text[open..];

    const CLOSE: &str = "</QUIZ_BANK>";
    if let Some(close) = out.rfind(CLOSE) {
        let end = close + CLOSE.len();
        if !out[end..].trim().is_empty() {
            report.push(
                Diagnostic::new(DiagnosticKind::StrayOuterText, "text after </QUIZ_BANK> dropped")
                    .at_offset(open + end),
            );
        }
        out = &out[..end];
    }
    (out.to_string(), open)
}

/// Rewrite option close tags whose index differs from their open tag
/// (`<OPTION3>…</OPTION4>` becomes `<OPTION3>…</OPTION3>`). `base` is the
/// trimmed prefix length, added so offsets land in the original input.
fn repair_option_closes(text: &str, base: usize, report: &mut ParseReport) -> String {
    OPTION_PAIR_RE
        .replace_all(text, |caps: &Captures| {
            let open = &caps[1];
            let close = &caps[4];
            if open == close {
                return caps[0].to_string();
            }
            report.push(
                Diagnostic::new(
                    DiagnosticKind::MismatchedOptionClose,
                    format!("</OPTION{}> rewritten to </OPTION{}>", close, open),
                )
                .at_offset(base + caps.get(0).unwrap().start()),
            );
            format!("<OPTION{}{}>{}</OPTION{}>", open, &caps[2], &caps[3], open)
        })
        .into_owned()
}

// ── Tests ──
