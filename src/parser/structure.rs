use std::sync::LazyLock;

use quick_xml::events::Event;
use regex::Regex;
use tracing::debug;

use super::Strictness;
use crate::report::{Diagnostic, DiagnosticKind, ParseReport};

static ITEM_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<QUIZ_ITEM\b[^>]*>").unwrap());
static BANK_TOPIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<QUIZ_BANK\b[^>]*?\btopic\s*=\s*["']([^"']*)["']"#).unwrap()
});
static QUESTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<QUESTION\b[^>]*>(.*?)</QUESTION\s*>").unwrap());
static QUESTION_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<QUESTION\b[^>]*>").unwrap());
static CHILD_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?:OPTION[0-9]|TOPIC|TAG|PATH)\b").unwrap());
static OPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<OPTION([0-9])([^>]*)>(.*?)</OPTION[0-9]\s*>").unwrap());
static CORRECT_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bcorrect\s*=\s*["']?\s*true"#).unwrap());
static TOPIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<TOPIC\b[^>]*>(.*?)</TOPIC\s*>").unwrap());
static TAG_ELEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<TAG\b[^>]*>(.*?)</TAG\s*>").unwrap());
static PATH_ELEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<PATH\b[^>]*>(.*?)</PATH\s*>").unwrap());

/// Root structural element; only the bank-level fallback topic survives it.
#[derive(Debug, Clone, Default)]
pub struct BankNode {
    pub topic: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OptionNode {
    /// Declared option index, 1-based as written in the tag name.
    pub slot: u8,
    pub text: String,
    pub correct: bool,
}

/// One structurally recovered quiz item, prior to validation.
#[derive(Debug, Clone)]
pub struct ItemCandidate {
    pub index: usize,
    /// Byte offset of the item's open tag in the original input.
    pub offset: usize,
    pub question: Option<String>,
    pub options: Vec<OptionNode>,
    pub topic: Option<String>,
    pub tag: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Default)]
pub struct StructureOutcome {
    pub bank: BankNode,
    pub candidates: Vec<ItemCandidate>,
}

/// Strict quick-xml scan first; on failure fall back to locating each
/// QUIZ_ITEM span by delimiter search and parsing every span independently,
/// so one malformed item cannot poison its siblings. Never errors: structural
/// failure degrades to zero candidates plus diagnostics. `base_offset` is the
/// sanitizer's trimmed prefix length, added to every recorded offset so they
/// point into the original input.
pub fn parse_structure(
    xml: &str,
    base_offset: usize,
    strictness: Strictness,
    report: &mut ParseReport,
) -> StructureOutcome {
    if xml.trim().is_empty() {
        return StructureOutcome::default();
    }

    let bank = match strict_scan(xml) {
        Ok(bank) => bank,
        Err((position, err)) => {
            if strictness == Strictness::Strict {
                report.push(
                    Diagnostic::new(DiagnosticKind::StrictParseFailed, err.to_string())
                        .at_offset(base_offset + position as usize),
                );
                return StructureOutcome::default();
            }
            debug!(error = %err, position, "strict parse failed, switching to span recovery");
            BankNode {
                topic: bank_topic_fallback(xml),
            }
        }
    };

    let spans = find_item_spans(xml);
    if spans.is_empty() {
        report.push(Diagnostic::new(
            DiagnosticKind::NoItemSpans,
            "document contains no quiz item spans",
        ));
        return StructureOutcome {
            bank,
            candidates: Vec::new(),
        };
    }

    report.candidates_seen = spans.len();
    let mut candidates = Vec::with_capacity(spans.len());
    for (index, span) in spans.iter().enumerate() {
        if let Some(candidate) = parse_item_span(index, base_offset, span, report) {
            candidates.push(candidate);
        }
    }
    StructureOutcome { bank, candidates }
}

/// Whole-document event walk with end-name checking; also picks up the
/// bank-level topic attribute. Any syntax error aborts the strict attempt.
fn strict_scan(xml: &str) -> Result<BankNode, (u64, quick_xml::Error)> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut topic: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"QUIZ_BANK" => {
                let attr = e
                    .try_get_attribute("topic")
                    .map_err(|e| (reader.buffer_position(), e.into()))?;
                if let Some(attr) = attr {
                    let value = attr
                        .unescape_value()
                        .map_err(|e| (reader.buffer_position(), e.into()))?;
                    let value = value.trim();
                    if !value.is_empty() {
                        topic = Some(value.to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err((reader.buffer_position(), e)),
        }
    }
    Ok(BankNode { topic })
}

fn bank_topic_fallback(xml: &str) -> Option<String> {
    BANK_TOPIC_RE
        .captures(xml)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
}

struct ItemSpan<'a> {
    offset: usize,
    inner: &'a str,
}

/// Slice out one span per QUIZ_ITEM open tag. A span ends at its close tag,
/// or — for unclosed items — at the next item, the bank close, or EOF.
fn find_item_spans(xml: &str) -> Vec<ItemSpan<'_>> {
    let opens: Vec<_> = ITEM_OPEN_RE.find_iter(xml).collect();
    let mut spans = Vec::with_capacity(opens.len());
    for (i, open) in opens.iter().enumerate() {
        let start = open.end();
        let limit = opens.get(i + 1).map(|m| m.start()).unwrap_or(xml.len());
        let window = &xml[start..limit];
        let end = window
            .find("</QUIZ_ITEM>")
            .or_else(|| window.find("</QUIZ_BANK>"))
            .unwrap_or(window.len());
        spans.push(ItemSpan {
            offset: open.start(),
            inner: &window[..end],
        });
    }
    spans
}

fn parse_item_span(
    index: usize,
    base_offset: usize,
    span: &ItemSpan<'_>,
    report: &mut ParseReport,
) -> Option<ItemCandidate> {
    let question = capture_question(span.inner);
    let options: Vec<OptionNode> = OPTION_RE
        .captures_iter(span.inner)
        .filter_map(|c| {
            let slot: u8 = c[1].parse().ok()?;
            Some(OptionNode {
                slot,
                text: c[3].to_string(),
                correct: CORRECT_ATTR_RE.is_match(&c[2]),
            })
        })
        .collect();
    let topic = capture_simple(&TOPIC_RE, span.inner);
    let tag = capture_simple(&TAG_ELEM_RE, span.inner);
    let path = capture_simple(&PATH_ELEM_RE, span.inner);

    if question.is_none() && options.is_empty() && topic.is_none() && tag.is_none() {
        report.push(
            Diagnostic::new(DiagnosticKind::UnparseableFragment, snippet(span.inner))
                .at_item(index)
                .at_offset(base_offset + span.offset),
        );
        return None;
    }

    Some(ItemCandidate {
        index,
        offset: base_offset + span.offset,
        question,
        options,
        topic,
        tag,
        path,
    })
}

/// Question markup verbatim. A closed QUESTION pair wins; an unclosed one is
/// salvaged up to the first option/metadata child or the end of the span.
fn capture_question(inner: &str) -> Option<String> {
    if let Some(c) = QUESTION_RE.captures(inner) {
        return Some(c[1].to_string());
    }
    let open = QUESTION_OPEN_RE.find(inner)?;
    let rest = &inner[open.end()..];
    let end = CHILD_OPEN_RE.find(rest).map(|m| m.start()).unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

fn capture_simple(re: &Regex, inner: &str) -> Option<String> {
    re.captures(inner)
        .map(|c| c[1].trim().to_string())
        .filter(|v| !v.is_empty())
}

fn snippet(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= 60 {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(60).collect();
        format!("{}...", cut)
    }
}

// ── Tests ──
