use crate::dataset::{QuizRecord, UNCLASSIFIED_TOPIC};
use crate::report::{Diagnostic, DiagnosticKind};

use super::structure::ItemCandidate;

/// Validate one candidate and build its record. Pure per-item function: no
/// parse state crosses this boundary, so a failing item can only ever cost
/// itself. Validation rules apply in order and the first failure wins.
pub fn extract_record(
    candidate: &ItemCandidate,
    bank_topic: Option<&str>,
) -> Result<QuizRecord, Diagnostic> {
    let text = match &candidate.question {
        None => return Err(skip(candidate, DiagnosticKind::MissingQuestion, String::new())),
        Some(q) => {
            let trimmed = q.trim();
            if trimmed.is_empty() {
                return Err(skip(candidate, DiagnosticKind::EmptyQuestion, String::new()));
            }
            trimmed.to_string()
        }
    };

    // Fewer than five options is fine; zero is not. Slots outside 1..=5 and
    // duplicate slots are ignored, first occurrence wins.
    let mut options: [String; 5] = std::array::from_fn(|_| String::new());
    let mut filled = [false; 5];
    let mut answer_index: Option<u32> = None;
    let mut any = false;
    for node in &candidate.options {
        if !(1..=5).contains(&node.slot) {
            continue;
        }
        let idx = (node.slot - 1) as usize;
        if !filled[idx] {
            filled[idx] = true;
            options[idx] = node.text.trim().to_string();
            any = true;
        }
        // First correctness marker in document order wins; later ones are
        // informational only.
        if node.correct && answer_index.is_none() {
            answer_index = Some(node.slot as u32);
        }
    }
    if !any {
        return Err(skip(
            candidate,
            DiagnosticKind::NoOptions,
            format!("question '{}'", snippet(&text)),
        ));
    }

    let topic = candidate
        .topic
        .as_deref()
        .filter(|t| !t.is_empty())
        .or(bank_topic.filter(|t| !t.is_empty()))
        .unwrap_or(UNCLASSIFIED_TOPIC)
        .to_string();

    Ok(QuizRecord {
        text,
        options,
        answer_index: answer_index.unwrap_or(1),
        topic,
        chapter_no: None,
        chapter_title: None,
        tag: candidate.tag.clone(),
        path: candidate.path.clone(),
        difficulty: None,
        time_estimate: None,
    })
}

fn skip(candidate: &ItemCandidate, kind: DiagnosticKind, detail: String) -> Diagnostic {
    Diagnostic::new(kind, detail)
        .at_item(candidate.index)
        .at_offset(candidate.offset)
}

fn snippet(s: &str) -> String {
    if s.chars().count() <= 70 {
        s.to_string()
    } else {
        let cut: String = s.chars().take(70).collect();
        format!("{}...", cut)
    }
}

// ── Tests ──
