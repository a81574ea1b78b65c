use std::collections::BTreeMap;

use serde::Deserialize;

use crate::dataset::Dataset;

pub const DEFAULT_DIFFICULTY: &str = "medium";
pub const DEFAULT_TIME_ESTIMATE: u32 = 60;

/// Caller-supplied lookup tables. Tag mapping keys are keywords/phrases
/// matched inside a row's topic; difficulty and time tables are keyed by row
/// index. All three are optional and default to empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnhanceTables {
    #[serde(default)]
    pub tag_mapping: BTreeMap<String, String>,
    #[serde(default)]
    pub difficulty_levels: BTreeMap<usize, String>,
    #[serde(default)]
    pub time_estimates: BTreeMap<usize, u32>,
}

/// Augment every row with a canonical tag, a difficulty label, and a time
/// estimate. Pure: the input dataset is untouched and a new one is returned.
/// Already-resolved fields are kept as-is, so re-running with the same tables
/// changes nothing, and no row is ever dropped.
pub fn enhance(dataset: &Dataset, tables: &EnhanceTables) -> Dataset {
    let rows = dataset
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let mut row = r.clone();
            if row.tag.as_deref().is_none_or(str::is_empty) {
                // Unmatched topics fall back to the topic itself, so the tag
                // column is always populated after enhancement.
                row.tag = Some(
                    resolve_tag(&row.topic, &tables.tag_mapping)
                        .unwrap_or_else(|| row.topic.clone()),
                );
            }
            if row.difficulty.is_none() {
                row.difficulty = Some(
                    tables
                        .difficulty_levels
                        .get(&i)
                        .cloned()
                        .unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
                );
            }
            if row.time_estimate.is_none() {
                row.time_estimate =
                    Some(tables.time_estimates.get(&i).copied().unwrap_or(DEFAULT_TIME_ESTIMATE));
            }
            row
        })
        .collect();
    Dataset { rows }
}

/// Longest (most specific) mapping key found inside the topic wins,
/// case-insensitively.
fn resolve_tag(topic: &str, mapping: &BTreeMap<String, String>) -> Option<String> {
    let topic_lc = topic.to_lowercase();
    mapping
        .iter()
        .filter(|(key, _)| !key.is_empty() && topic_lc.contains(&key.to_lowercase()))
        .max_by_key(|(key, _)| key.len())
        .map(|(_, tag)| tag.clone())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::QuizRecord;

    fn row(topic: &str, tag: Option<&str>) -> QuizRecord {
        QuizRecord {
            text: "q".to_string(),
            options: std::array::from_fn(|i| format!("o{}", i)),
            answer_index: 1,
            topic: topic.to_string(),
            chapter_no: None,
            chapter_title: None,
            tag: tag.map(str::to_string),
            path: None,
            difficulty: None,
            time_estimate: None,
        }
    }

    fn tables() -> EnhanceTables {
        EnhanceTables {
            tag_mapping: BTreeMap::from([
                ("operations".to_string(), "arithmetic".to_string()),
                ("basic operations".to_string(), "basic-arithmetic".to_string()),
                ("control flow".to_string(), "flow-control".to_string()),
            ]),
            difficulty_levels: BTreeMap::from([(0, "easy".to_string()), (1, "hard".to_string())]),
            time_estimates: BTreeMap::from([(0, 30), (1, 90)]),
        }
    }

    #[test]
    fn longest_keyword_match_wins() {
        let ds = Dataset {
            rows: vec![row("Basic Operations", None)],
        };
        let out = enhance(&ds, &tables());
        assert_eq!(out.rows[0].tag.as_deref(), Some("basic-arithmetic"));
    }

    #[test]
    fn match_is_case_insensitive_substring() {
        let ds = Dataset {
            rows: vec![row("Advanced CONTROL FLOW in Python", None)],
        };
        let out = enhance(&ds, &tables());
        assert_eq!(out.rows[0].tag.as_deref(), Some("flow-control"));
    }

    #[test]
    fn existing_tag_is_kept() {
        let ds = Dataset {
            rows: vec![row("Basic Operations", Some("hand-picked"))],
        };
        let out = enhance(&ds, &tables());
        assert_eq!(out.rows[0].tag.as_deref(), Some("hand-picked"));
    }

    #[test]
    fn unmatched_topic_falls_back_to_topic_itself() {
        let ds = Dataset {
            rows: vec![row("Geology", None)],
        };
        let out = enhance(&ds, &tables());
        assert_eq!(out.rows[0].tag.as_deref(), Some("Geology"));
        // Unmatched rows still get difficulty/time values.
        assert_eq!(out.rows[0].difficulty.as_deref(), Some("easy"));
        assert_eq!(out.rows[0].time_estimate, Some(30));
    }

    #[test]
    fn index_tables_with_defaults() {
        let ds = Dataset {
            rows: vec![row("a", None), row("b", None), row("c", None)],
        };
        let out = enhance(&ds, &tables());
        assert_eq!(out.rows[0].difficulty.as_deref(), Some("easy"));
        assert_eq!(out.rows[1].difficulty.as_deref(), Some("hard"));
        assert_eq!(out.rows[2].difficulty.as_deref(), Some(DEFAULT_DIFFICULTY));
        assert_eq!(out.rows[2].time_estimate, Some(DEFAULT_TIME_ESTIMATE));
    }

    #[test]
    fn idempotent_and_lossless() {
        let ds = Dataset {
            rows: vec![row("Basic Operations", None), row("Geology", None)],
        };
        let once = enhance(&ds, &tables());
        let twice = enhance(&once, &tables());
        assert_eq!(once, twice);
        assert_eq!(once.len(), ds.len());
    }

    #[test]
    fn input_dataset_is_not_mutated() {
        let ds = Dataset {
            rows: vec![row("Basic Operations", None)],
        };
        let before = ds.clone();
        let _ = enhance(&ds, &tables());
        assert_eq!(ds, before);
    }

    #[test]
    fn tables_deserialize_from_json() {
        let json = r#"{
            "tag_mapping": {"basic operations": "arithmetic"},
            "difficulty_levels": {"0": "easy"},
            "time_estimates": {"0": 30}
        }"#;
        let tables: EnhanceTables = serde_json::from_str(json).unwrap();
        assert_eq!(tables.difficulty_levels.get(&0).map(String::as_str), Some("easy"));
        assert_eq!(tables.time_estimates.get(&0), Some(&30));
    }
}
