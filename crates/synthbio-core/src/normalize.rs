//! Turning raw engine output into a typed [`Answer`].
//!
//! The engine's stdout is untrusted: it may be a JSON document produced by a
//! wrapper script or the plain text printed by the `graphrag` CLI. Nothing
//! here assumes a field is present or well-typed until it has been checked.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{Answer, Citation, EngineError};

/// Default number of citations kept per answer.
pub const DEFAULT_CITATION_LIMIT: usize = 5;

/// How engine stdout should be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// JSON when stdout contains a JSON object, text otherwise.
    #[default]
    Auto,
    Json,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(format!(
                "unknown output format `{other}` (expected auto|json|text)"
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Json => "json",
            Self::Text => "text",
        })
    }
}

/// Ordering applied to citations before they leave the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationOrder {
    /// Keep the order the engine emitted.
    #[default]
    Engine,
    /// Ascending rank, then id. Citations without a rank go last.
    Rank,
}

impl FromStr for CitationOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "engine" => Ok(Self::Engine),
            "rank" => Ok(Self::Rank),
            other => Err(format!(
                "unknown citation order `{other}` (expected engine|rank)"
            )),
        }
    }
}

impl fmt::Display for CitationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Engine => "engine",
            Self::Rank => "rank",
        })
    }
}

/// Dedup, ordering and truncation rules for citations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationPolicy {
    pub order: CitationOrder,

    /// Maximum citations kept. `0` keeps all of them.
    pub limit: usize,
}

impl Default for CitationPolicy {
    fn default() -> Self {
        Self {
            order: CitationOrder::Engine,
            limit: DEFAULT_CITATION_LIMIT,
        }
    }
}

impl CitationPolicy {
    pub fn new(order: CitationOrder, limit: usize) -> Self {
        Self { order, limit }
    }

    /// Apply the policy. The first occurrence of a duplicated id wins.
    pub fn apply(&self, citations: Vec<Citation>) -> Vec<Citation> {
        let mut seen = HashSet::new();
        let mut out: Vec<Citation> = citations
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .collect();

        if self.order == CitationOrder::Rank {
            out.sort_by(compare_by_rank);
        }
        if self.limit > 0 {
            out.truncate(self.limit);
        }
        out
    }
}

fn compare_by_rank(a: &Citation, b: &Citation) -> Ordering {
    match (a.rank, b.rank) {
        (Some(x), Some(y)) => x
            .partial_cmp(&y)
            .unwrap_or(Ordering::Equal)
            .then_with(|| compare_ids(&a.id, &b.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => compare_ids(&a.id, &b.id),
    }
}

/// Numeric ids compare numerically so that "2" sorts before "10".
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Parse raw engine stdout into an answer.
///
/// The returned answer has not had a [`CitationPolicy`] applied yet.
pub fn parse_engine_output(stdout: &str, format: OutputFormat) -> Result<Answer, EngineError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(EngineError::MalformedOutput(
            "engine produced no output".to_string(),
        ));
    }

    match format {
        OutputFormat::Text => parse_text_output(trimmed),
        OutputFormat::Json => match find_json_object(trimmed) {
            Some((_, value)) => answer_from_json(&value),
            None => Err(EngineError::MalformedOutput(
                "expected a JSON object on stdout".to_string(),
            )),
        },
        OutputFormat::Auto => match find_json_object(trimmed) {
            Some((offset, value)) if offset == 0 || has_answer_field(&value) => {
                answer_from_json(&value)
            }
            _ => parse_text_output(trimmed),
        },
    }
}

/// Locate a JSON object in stdout, starting at the first line that opens
/// one. Log lines may precede it and trailing output after it is ignored.
/// Returns the byte offset the object starts at.
fn find_json_object(text: &str) -> Option<(usize, Value)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_start().starts_with('{') {
            let mut values = serde_json::Deserializer::from_str(&text[offset..]).into_iter::<Value>();
            if let Some(Ok(value @ Value::Object(_))) = values.next() {
                return Some((offset, value));
            }
        }
        offset += line.len();
    }
    None
}

/// Whether a JSON object carries an answer field. In auto mode an object
/// found after other text only counts when it does.
fn has_answer_field(value: &Value) -> bool {
    value.get("answer").or_else(|| value.get("response")).is_some()
}

fn parse_text_output(text: &str) -> Result<Answer, EngineError> {
    let body = strip_banner(text).trim();
    if body.is_empty() {
        return Err(EngineError::MalformedOutput(
            "engine printed a banner but no answer".to_string(),
        ));
    }
    let citations = extract_report_citations(body);
    debug!(citations = citations.len(), "parsed text engine output");
    Ok(Answer::new(body).with_citations(citations))
}

fn banner_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*SUCCESS:[^\n]*?Response:[ \t]*(?:\r?\n|$)")
            .expect("static banner regex")
    })
}

fn data_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[Data:([^\]]*)\]").expect("static data ref regex"))
}

fn reports_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Reports\s*\(([^)]*)\)").expect("static reports regex"))
}

/// Drop the `SUCCESS: Global Search Response:` banner the CLI prints,
/// together with any log lines before it.
pub fn strip_banner(text: &str) -> &str {
    match banner_re().find_iter(text).last() {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

/// Report ids referenced by `[Data: Reports (1, 2, +more)]` markers, in
/// first-appearance order, without duplicates.
pub fn extract_report_citations(text: &str) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for data_ref in data_ref_re().captures_iter(text) {
        for reports in reports_re().captures_iter(&data_ref[1]) {
            for raw in reports[1].split(',') {
                let id = raw.trim();
                if id.is_empty() || id.starts_with('+') {
                    continue;
                }
                if seen.insert(id.to_string()) {
                    out.push(Citation::new(id));
                }
            }
        }
    }
    out
}

fn answer_from_json(value: &Value) -> Result<Answer, EngineError> {
    let text = value
        .get("answer")
        .or_else(|| value.get("response"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            EngineError::MalformedOutput("missing string field `answer`".to_string())
        })?;

    let citations = match citation_entries(value) {
        Some(entries) => citations_from_entries(entries),
        None => extract_report_citations(text),
    };

    let mut answer = Answer::new(text).with_citations(citations);
    if let Some(run_dir) = value
        .get("run_dir")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    {
        answer = answer.with_run_dir(run_dir);
    }
    Ok(answer)
}

/// Where structured citation rows may live in a JSON document.
fn citation_entries(value: &Value) -> Option<&Vec<Value>> {
    if let Some(citations) = value.get("citations") {
        if let Some(entries) = citations.as_array() {
            return Some(entries);
        }
        if let Some(entries) = citations.get("reports").and_then(Value::as_array) {
            return Some(entries);
        }
    }
    ["context_data", "context"].iter().find_map(|key| {
        value
            .get(*key)
            .and_then(|ctx| ctx.get("reports"))
            .and_then(Value::as_array)
    })
}

fn citations_from_entries(entries: &[Value]) -> Vec<Citation> {
    let mut out = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        match citation_from_value(entry) {
            Some(citation) => out.push(citation),
            None => warn!(index = idx, "dropping citation entry without usable id"),
        }
    }
    out
}

/// Parse one citation row. Returns `None` when no id can be recovered.
pub fn citation_from_value(value: &Value) -> Option<Citation> {
    let obj = value.as_object()?;
    let id = obj
        .get("id")
        .and_then(scalar_to_string)
        .or_else(|| obj.get("human_readable_id").and_then(scalar_to_string))?;

    let mut citation = Citation::new(id);
    citation.title = obj
        .get("title")
        .or_else(|| obj.get("label"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    citation.rank = obj
        .get("rank")
        .and_then(Value::as_f64)
        .filter(|r| r.is_finite());
    citation.summary = obj
        .get("summary")
        .and_then(Value::as_str)
        .map(str::to_string);
    citation.community = obj.get("community").and_then(scalar_to_string);
    citation.human_readable_id = obj.get("human_readable_id").and_then(scalar_to_string);
    Some(citation)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", f as i64)),
            _ => Some(n.to_string()),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_output_is_malformed() {
        let err = parse_engine_output("  \n", OutputFormat::Auto).unwrap_err();
        assert!(matches!(err, EngineError::MalformedOutput(_)));
    }

    #[test]
    fn test_text_output_strips_banner() {
        let out = "SUCCESS: Global Search Response:\nCRISPR is discussed [Data: Reports (3, 1)].";
        let answer = parse_engine_output(out, OutputFormat::Auto).unwrap();
        assert!(answer.answer.starts_with("CRISPR is discussed"));
        let ids: Vec<_> = answer.citations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[test]
    fn test_text_output_drops_log_lines_before_banner() {
        let out = "INFO: Vector Store Args: {}\ncreating llm client\nSUCCESS: Global Search Response:\nCRISPR is discussed [Data: Reports (3)].";
        let answer = parse_engine_output(out, OutputFormat::Auto).unwrap();
        assert_eq!(answer.answer, "CRISPR is discussed [Data: Reports (3)].");
        assert!(!answer.answer.contains("SUCCESS:"));
        assert_eq!(answer.citations[0].id, "3");
    }

    #[test]
    fn test_strip_banner_without_banner_is_identity() {
        assert_eq!(strip_banner("plain answer\nsecond line"), "plain answer\nsecond line");
    }

    #[test]
    fn test_banner_only_is_malformed() {
        let err = parse_engine_output("SUCCESS: Local Search Response:\n", OutputFormat::Text)
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedOutput(_)));
    }

    #[test]
    fn test_extract_report_citations_dedupes_and_skips_more() {
        let text = "A [Data: Reports (5, 12, +more)]. B [Data: Entities (4); Reports (12, 7)].";
        let ids: Vec<_> = extract_report_citations(text)
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["5", "12", "7"]);
    }

    #[test]
    fn test_extract_ignores_non_report_refs() {
        assert!(extract_report_citations("x [Data: Entities (1, 2)]").is_empty());
        assert!(extract_report_citations("no markers at all").is_empty());
    }

    #[test]
    fn test_json_output_with_reports_object() {
        let out = json!({
            "answer": "Therapies include **gene therapy**.",
            "citations": {"reports": [
                {"id": 4, "title": "Gene therapy", "rank": 9.0},
                {"id": "b7", "label": "mRNA vaccines"}
            ]},
            "run_dir": "output/20250908-145313"
        })
        .to_string();
        let answer = parse_engine_output(&out, OutputFormat::Json).unwrap();
        assert_eq!(answer.citations.len(), 2);
        assert_eq!(answer.citations[0].id, "4");
        assert_eq!(answer.citations[0].rank, Some(9.0));
        assert_eq!(answer.citations[1].title.as_deref(), Some("mRNA vaccines"));
        assert_eq!(answer.run_dir.as_deref(), Some("output/20250908-145313"));
    }

    #[test]
    fn test_json_output_context_data_and_response_alias() {
        let out = json!({
            "response": "ok",
            "context_data": {"reports": [{"id": "1", "rank": "high"}]}
        })
        .to_string();
        let answer = parse_engine_output(&out, OutputFormat::Auto).unwrap();
        assert_eq!(answer.answer, "ok");
        assert_eq!(answer.citations[0].rank, None);
        assert_eq!(answer.run_dir, None);
    }

    #[test]
    fn test_json_after_log_lines() {
        let out = "INFO loading tables\n{\"answer\": \"late\", \"citations\": []}\n";
        let answer = parse_engine_output(out, OutputFormat::Json).unwrap();
        assert_eq!(answer.answer, "late");
        assert!(answer.citations.is_empty());
    }

    #[test]
    fn test_json_followed_by_log_lines() {
        let out = "{\"answer\": \"Gene therapy.\", \"citations\": []}\nINFO done in 3.2s\n";
        let answer = parse_engine_output(out, OutputFormat::Auto).unwrap();
        assert_eq!(answer.answer, "Gene therapy.");
        assert!(answer.citations.is_empty());

        let answer = parse_engine_output(out, OutputFormat::Json).unwrap();
        assert_eq!(answer.answer, "Gene therapy.");
    }

    #[test]
    fn test_auto_keeps_text_containing_unrelated_json() {
        let out = "Example payload:\n{\"gene\": \"BRCA1\"}\nends here";
        let answer = parse_engine_output(out, OutputFormat::Auto).unwrap();
        assert_eq!(answer.answer, out);
    }

    #[test]
    fn test_json_missing_answer_is_malformed() {
        let err = parse_engine_output("{\"citations\": []}", OutputFormat::Json).unwrap_err();
        assert!(err.to_string().contains("answer"));
    }

    #[test]
    fn test_json_mode_rejects_plain_text() {
        let err = parse_engine_output("plain answer", OutputFormat::Json).unwrap_err();
        assert!(matches!(err, EngineError::MalformedOutput(_)));
    }

    #[test]
    fn test_json_without_citation_field_falls_back_to_markers() {
        let out = json!({"answer": "see [Data: Reports (9)]"}).to_string();
        let answer = parse_engine_output(&out, OutputFormat::Auto).unwrap();
        assert_eq!(answer.citations[0].id, "9");
    }

    #[test]
    fn test_entries_without_id_dropped() {
        let entries = vec![json!({"title": "orphan"}), json!("nope"), json!({"id": "2"})];
        let citations = citations_from_entries(&entries);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].id, "2");
    }

    #[test]
    fn test_policy_engine_order_preserved_and_limited() {
        let input = vec![
            Citation::new("2").with_rank(5.0),
            Citation::new("1").with_rank(1.0),
            Citation::new("2").with_rank(0.0),
            Citation::new("3"),
        ];
        let out = CitationPolicy::new(CitationOrder::Engine, 2).apply(input);
        let ids: Vec<_> = out.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(out[0].rank, Some(5.0));
    }

    #[test]
    fn test_policy_rank_order() {
        let input = vec![
            Citation::new("10"),
            Citation::new("2").with_rank(5.0),
            Citation::new("10b").with_rank(1.0),
            Citation::new("1").with_rank(5.0),
        ];
        let out = CitationPolicy::new(CitationOrder::Rank, 0).apply(input);
        let ids: Vec<_> = out.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["10b", "1", "2", "10"]);
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!("rank".parse::<CitationOrder>().unwrap(), CitationOrder::Rank);
    }
}
