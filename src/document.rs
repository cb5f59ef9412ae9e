// Assignment document module: a Markdown file with a YAML frontmatter block
// is split into metadata and body (`parse`), then turned into the payload
// sent to Canvas when creating or editing an assignment (`render`).
//
// Both steps are pure functions over already-read text. Reading the file is
// left to `AssignmentDocument::from_path` so the CLI can report I/O errors
// with the path attached.

use crate::markdown::render_markdown;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat};
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

const DELIMITER: &str = "---";

/// Frontmatter keys holding timestamps that Canvas wants in ISO-8601.
const DATE_FIELDS: [&str; 3] = ["due_at", "unlock_at", "lock_at"];

/// Assignment fields Canvas accepts that are copied through untouched.
const PASSTHROUGH_FIELDS: &[&str] = &[
    "allowed_attempts",
    "allowed_extensions",
    "annotatable_attachment_id",
    "anonymous_grading",
    "assignment_overrides",
    "automatic_peer_reviews",
    "external_tool_tag_attributes",
    "final_grader_id",
    "grade_group_students_individually",
    "grader_comments_visible_to_graders",
    "grader_count",
    "graders_anonymous_to_graders",
    "graders_names_visible_to_final_grader",
    "grading_standard_id",
    "grading_type",
    "group_category_id",
    "hide_in_gradebook",
    "integration_data",
    "integration_id",
    "moderated_grading",
    "notify_of_update",
    "omit_from_final_grade",
    "only_visible_to_overrides",
    "peer_reviews",
    "position",
    "submission_types",
    "turnitin_enabled",
    "turnitin_settings",
    "vericite_enabled",
];

/// Everything that can go wrong while turning a document into a payload.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed document: {0}")]
    MalformedDocument(String),
    #[error("missing required field `{0}`")]
    MissingField(String),
    #[error("invalid date in `{field}`: {value:?}")]
    InvalidDate { field: String, value: String },
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("cannot read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Frontmatter metadata plus the Markdown body that follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentDocument {
    pub metadata: BTreeMap<String, Value>,
    pub body: String,
}

impl AssignmentDocument {
    /// Read and parse an assignment file.
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse(&text)
    }

    /// The required assignment name, as written in the frontmatter.
    pub fn name(&self) -> Option<&Value> {
        self.metadata.get("name")
    }
}

/// The JSON object placed under `assignment` in Canvas create/edit requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentPayload {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_possible: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_group_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_at: Option<String>,
    pub published: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Split `text` into frontmatter and body and parse the frontmatter as a
/// YAML mapping. Anything before the opening `---` line is ignored.
pub fn parse(text: &str) -> Result<AssignmentDocument, DocumentError> {
    let (frontmatter, body) = split_frontmatter(text)?;
    let metadata = parse_metadata(frontmatter)?;
    if !metadata.contains_key("name") {
        return Err(DocumentError::MissingField("name".into()));
    }
    Ok(AssignmentDocument {
        metadata,
        body: body.to_string(),
    })
}

/// Build the Canvas payload: HTML description, typed metadata, normalised
/// dates. Fails without producing anything if any field is unusable.
pub fn render(document: &AssignmentDocument) -> Result<AssignmentPayload, DocumentError> {
    let name = match document.name() {
        Some(value) => scalar_to_string(value).ok_or_else(|| invalid("name", "expected a string"))?,
        None => return Err(DocumentError::MissingField("name".into())),
    };

    let mut payload = AssignmentPayload {
        name,
        description: render_markdown(&document.body),
        points_possible: None,
        assignment_group_id: None,
        due_at: None,
        unlock_at: None,
        lock_at: None,
        published: false,
        extra: BTreeMap::new(),
    };

    for (key, value) in &document.metadata {
        match key.as_str() {
            "name" => {}
            "points_possible" => payload.points_possible = Some(points(value)?),
            "assignment_group_id" => payload.assignment_group_id = Some(identifier(key, value)?),
            "published" => {
                payload.published = value
                    .as_bool()
                    .ok_or_else(|| invalid(key, "expected true or false"))?
            }
            field if DATE_FIELDS.contains(&field) => {
                let date = date_value(field, value)?;
                match field {
                    "due_at" => payload.due_at = Some(date),
                    "unlock_at" => payload.unlock_at = Some(date),
                    _ => payload.lock_at = Some(date),
                }
            }
            field if PASSTHROUGH_FIELDS.contains(&field) => {
                let json = serde_json::to_value(value)
                    .map_err(|e| invalid(field, &e.to_string()))?;
                payload.extra.insert(field.to_string(), json);
            }
            other => warn!(key = other, "ignoring frontmatter key Canvas does not accept"),
        }
    }

    Ok(payload)
}

/// Normalise a human-readable timestamp to ISO-8601.
///
/// Offsets are kept when given (RFC 3339); otherwise the result is a naive
/// `YYYY-MM-DDTHH:MM:SS`, e.g. `January 15, 2023 23:59` becomes
/// `2023-01-15T23:59:00`. Date-only inputs mean midnight.
pub fn normalize_date(text: &str) -> Option<String> {
    const DATE_TIME_FORMATS: [&str; 6] = [
        "%B %d, %Y %H:%M",
        "%B %d, %Y %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    const DATE_FORMATS: [&str; 2] = ["%B %d, %Y", "%Y-%m-%d"];

    let text = text.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(text) {
        return Some(with_offset.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    let naive = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(naive.format("%Y-%m-%dT%H:%M:%S").to_string())
}

fn split_frontmatter(text: &str) -> Result<(&str, &str), DocumentError> {
    let mut offset = 0;
    let mut opened_at = None;

    for line in text.split_inclusive('\n') {
        let next = offset + line.len();
        if line.trim_end() == DELIMITER {
            match opened_at {
                None => opened_at = Some(next),
                Some(start) => return Ok((&text[start..offset], &text[next..])),
            }
        }
        offset = next;
    }

    match opened_at {
        None => Err(DocumentError::MalformedDocument(
            "missing opening `---` frontmatter delimiter".into(),
        )),
        Some(_) => Err(DocumentError::MalformedDocument(
            "missing closing `---` frontmatter delimiter".into(),
        )),
    }
}

fn parse_metadata(frontmatter: &str) -> Result<BTreeMap<String, Value>, DocumentError> {
    if frontmatter.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let value: Value = serde_yaml::from_str(frontmatter).map_err(|e| {
        DocumentError::MalformedDocument(format!("frontmatter is not valid YAML: {e}"))
    })?;

    let mapping = match value {
        Value::Null => return Ok(BTreeMap::new()),
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(DocumentError::MalformedDocument(
                "frontmatter must be a key-value mapping".into(),
            ))
        }
    };

    mapping
        .into_iter()
        .map(|(key, value)| match key {
            Value::String(key) => Ok((key, value)),
            other => Err(DocumentError::MalformedDocument(format!(
                "frontmatter key {other:?} is not a string"
            ))),
        })
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn points(value: &Value) -> Result<f64, DocumentError> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|points| points.is_finite())
    .ok_or_else(|| invalid("points_possible", "expected a finite number"))
}

fn identifier(field: &str, value: &Value) -> Result<u64, DocumentError> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid(field, "expected a numeric id"))
}

fn date_value(field: &str, value: &Value) -> Result<String, DocumentError> {
    let invalid_date = |value: String| DocumentError::InvalidDate {
        field: field.to_string(),
        value,
    };
    match value {
        Value::String(text) => normalize_date(text).ok_or_else(|| invalid_date(text.clone())),
        other => Err(invalid_date(
            serde_yaml::to_string(other)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        )),
    }
}

fn invalid(field: &str, reason: &str) -> DocumentError {
    DocumentError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "---\n\
name: Homework 1\n\
points_possible: 10\n\
assignment_group_id: 42\n\
due_at: January 15, 2023 23:59\n\
submission_types: [online_upload]\n\
---\n\
# Title\n\nSome *italic* text.\n";

    #[test]
    fn splits_frontmatter_and_body() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(doc.metadata["name"], Value::from("Homework 1"));
        assert_eq!(doc.body, "# Title\n\nSome *italic* text.\n");
    }

    #[test]
    fn ignores_text_before_the_opening_delimiter() {
        let doc = parse("draft notes\n---\nname: A\n---\nbody").unwrap();
        assert_eq!(doc.body, "body");
        assert!(!doc.metadata.contains_key("draft notes"));
    }

    #[test]
    fn tolerates_crlf_delimiters() {
        let doc = parse("---\r\nname: A\r\n---\r\nbody\r\n").unwrap();
        assert_eq!(doc.body, "body\r\n");
    }

    #[test]
    fn missing_delimiters_are_malformed() {
        assert!(matches!(parse("name: A\n"), Err(DocumentError::MalformedDocument(_))));
        assert!(matches!(
            parse("---\nname: A\nbody without end"),
            Err(DocumentError::MalformedDocument(_))
        ));
    }

    #[test]
    fn non_mapping_frontmatter_is_malformed() {
        assert!(matches!(
            parse("---\n- a\n- b\n---\nbody"),
            Err(DocumentError::MalformedDocument(_))
        ));
        assert!(matches!(
            parse("---\nname: [unclosed\n---\nbody"),
            Err(DocumentError::MalformedDocument(_))
        ));
    }

    #[test]
    fn name_is_required() {
        match parse("---\npoints_possible: 5\n---\nbody") {
            Err(DocumentError::MissingField(field)) => assert_eq!(field, "name"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(parse("---\n---\nbody"), Err(DocumentError::MissingField(_))));
    }

    #[test]
    fn renders_full_payload() {
        let payload = render(&parse(SAMPLE).unwrap()).unwrap();
        assert_eq!(payload.name, "Homework 1");
        assert_eq!(payload.points_possible, Some(10.0));
        assert_eq!(payload.assignment_group_id, Some(42));
        assert_eq!(payload.due_at.as_deref(), Some("2023-01-15T23:59:00"));
        assert!(payload.description.contains("<h1>Title</h1>"));
        assert!(payload.description.contains("<em>italic</em>"));
        assert_eq!(
            payload.extra["submission_types"],
            serde_json::json!(["online_upload"])
        );
        assert!(!payload.published);
    }

    #[test]
    fn unknown_keys_are_dropped_from_the_payload() {
        let doc = parse("---\nname: A\nauthor: me\ngrading_type: points\n---\n").unwrap();
        let json = serde_json::to_value(render(&doc).unwrap()).unwrap();
        assert!(json.get("author").is_none());
        assert_eq!(json["grading_type"], "points");
        assert!(json.get("due_at").is_none());
    }

    #[test]
    fn bad_due_date_fails() {
        let doc = parse("---\nname: A\ndue_at: sometime next week\n---\n").unwrap();
        match render(&doc) {
            Err(DocumentError::InvalidDate { field, value }) => {
                assert_eq!(field, "due_at");
                assert_eq!(value, "sometime next week");
            }
            other => panic!("unexpected: {other:?}"),
        }
        let doc = parse("---\nname: A\nlock_at: 20230115\n---\n").unwrap();
        assert!(matches!(render(&doc), Err(DocumentError::InvalidDate { .. })));
    }

    #[test]
    fn bad_points_fail() {
        let doc = parse("---\nname: A\npoints_possible: lots\n---\n").unwrap();
        assert!(matches!(render(&doc), Err(DocumentError::InvalidField { .. })));
    }

    #[test]
    fn non_finite_points_fail() {
        for points in [".nan", ".inf", "-.inf", "NaN"] {
            let doc = parse(&format!("---\nname: A\npoints_possible: {points}\n---\n")).unwrap();
            match render(&doc) {
                Err(DocumentError::InvalidField { field, .. }) => {
                    assert_eq!(field, "points_possible")
                }
                other => panic!("{points}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn unlock_and_lock_dates_are_normalized() {
        let doc = parse(
            "---\nname: A\nunlock_at: January 8, 2023 08:00\nlock_at: 2023-01-20 17:30\n---\n",
        )
        .unwrap();
        let payload = render(&doc).unwrap();
        assert_eq!(payload.unlock_at.as_deref(), Some("2023-01-08T08:00:00"));
        assert_eq!(payload.lock_at.as_deref(), Some("2023-01-20T17:30:00"));
        assert!(payload.due_at.is_none());

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["unlock_at"], "2023-01-08T08:00:00");
        assert_eq!(json["lock_at"], "2023-01-20T17:30:00");
    }

    #[test]
    fn normalizes_supported_date_forms() {
        assert_eq!(
            normalize_date("January 15, 2023 23:59").as_deref(),
            Some("2023-01-15T23:59:00")
        );
        assert_eq!(
            normalize_date("Jan 5, 2024 08:30").as_deref(),
            Some("2024-01-05T08:30:00")
        );
        assert_eq!(
            normalize_date("2023-01-15 23:59").as_deref(),
            Some("2023-01-15T23:59:00")
        );
        assert_eq!(normalize_date("2023-01-15").as_deref(), Some("2023-01-15T00:00:00"));
        assert_eq!(
            normalize_date("2023-01-15T23:59:00-05:00").as_deref(),
            Some("2023-01-15T23:59:00-05:00")
        );
        assert_eq!(normalize_date("13/45/2023"), None);
    }
}
