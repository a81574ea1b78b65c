use anyhow::Result;
use serde::Serialize;

/// Topic sentinel for items with neither an item-level nor a bank-level topic.
pub const UNCLASSIFIED_TOPIC: &str = "unclassified";

/// Fixed column order of the assembled dataset. `tag`/`path` are carried
/// when present in input; `difficulty`/`time_estimate` are filled by the
/// enhancer.
pub const COLUMNS: &[&str] = &[
    "text",
    "options",
    "answer_index",
    "topic",
    "chapter_no",
    "chapter_title",
    "tag",
    "path",
    "difficulty",
    "time_estimate",
];

/// Caller-supplied context stamped onto every row of a batch.
#[derive(Debug, Clone, Default)]
pub struct BankContext {
    pub chapter_no: Option<String>,
    pub chapter_title: Option<String>,
}

/// One accepted quiz item. Options always hold exactly five slots; absent
/// options are empty strings with surviving options kept at their original
/// positions. Embedded formatting markup in `text` and `options` is verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizRecord {
    pub text: String,
    pub options: [String; 5],
    pub answer_index: u32,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_estimate: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub rows: Vec<QuizRecord>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One JSON object per row, newline-terminated.
    pub fn to_jsonl(&self) -> Result<String> {
        let mut out = String::new();
        for row in &self.rows {
            out.push_str(&serde_json::to_string(row)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Tab-separated rows in the fixed `COLUMNS` order, header first.
    /// Options are JSON-encoded into a single cell; absent fields are empty.
    pub fn to_tsv(&self) -> String {
        let mut out = COLUMNS.join("\t");
        out.push('\n');
        for row in &self.rows {
            let fields = [
                flatten(&row.text),
                serde_json::to_string(&row.options).unwrap_or_default(),
                row.answer_index.to_string(),
                flatten(&row.topic),
                row.chapter_no.clone().unwrap_or_default(),
                row.chapter_title.clone().unwrap_or_default(),
                row.tag.clone().unwrap_or_default(),
                row.path.clone().unwrap_or_default(),
                row.difficulty.clone().unwrap_or_default(),
                row.time_estimate.map(|t| t.to_string()).unwrap_or_default(),
            ];
            out.push_str(&fields.join("\t"));
            out.push('\n');
        }
        out
    }
}

fn flatten(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

/// Fold accepted records into the dataset, stamping the chapter context onto
/// every row. Document order is preserved; row count equals record count.
pub fn assemble(records: Vec<QuizRecord>, ctx: &BankContext) -> Dataset {
    let rows = records
        .into_iter()
        .map(|mut r| {
            r.chapter_no = ctx.chapter_no.clone();
            r.chapter_title = ctx.chapter_title.clone();
            r
        })
        .collect();
    Dataset { rows }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> QuizRecord {
        QuizRecord {
            text: text.to_string(),
            options: std::array::from_fn(|i| format!("opt{}", i + 1)),
            answer_index: 1,
            topic: "Arithmetic".to_string(),
            chapter_no: None,
            chapter_title: None,
            tag: None,
            path: None,
            difficulty: None,
            time_estimate: None,
        }
    }

    #[test]
    fn assemble_stamps_context_and_keeps_order() {
        let ctx = BankContext {
            chapter_no: Some("3".to_string()),
            chapter_title: Some("Loops".to_string()),
        };
        let ds = assemble(vec![record("q1"), record("q2")], &ctx);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows[0].text, "q1");
        assert_eq!(ds.rows[1].text, "q2");
        for row in &ds.rows {
            assert_eq!(row.chapter_no.as_deref(), Some("3"));
            assert_eq!(row.chapter_title.as_deref(), Some("Loops"));
        }
    }

    #[test]
    fn assemble_without_context_leaves_fields_absent() {
        let ds = assemble(vec![record("q")], &BankContext::default());
        assert_eq!(ds.rows[0].chapter_no, None);
        assert_eq!(ds.rows[0].chapter_title, None);
        let json = serde_json::to_value(&ds.rows[0]).unwrap();
        assert!(json.get("chapter_no").is_none());
    }

    #[test]
    fn tsv_has_fixed_header_and_one_line_per_row() {
        let ds = assemble(vec![record("q with\ttab")], &BankContext::default());
        let tsv = ds.to_tsv();
        let mut lines = tsv.lines();
        assert_eq!(lines.next().unwrap(), COLUMNS.join("\t"));
        let row = lines.next().unwrap();
        assert_eq!(row.split('\t').count(), COLUMNS.len());
        assert!(row.starts_with("q with tab\t"));
    }

    #[test]
    fn jsonl_one_line_per_row() {
        let ds = assemble(vec![record("q1"), record("q2")], &BankContext::default());
        let jsonl = ds.to_jsonl().unwrap();
        assert_eq!(jsonl.lines().count(), 2);
        let first: serde_json::Value = serde_json::from_str(jsonl.lines().next().unwrap()).unwrap();
        assert_eq!(first["answer_index"], 1);
        assert_eq!(first["options"].as_array().unwrap().len(), 5);
    }
}
