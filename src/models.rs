// Canvas resources as returned by the REST API. Only the fields the CLI
// reads are declared; serde ignores the rest. Fields Canvas omits for some
// roles or course settings are `Option` or defaulted.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Course {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Assignment {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub submission_types: Vec<String>,
    #[serde(default)]
    pub points_possible: Option<f64>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AssignmentGroup {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub group_weight: Option<f64>,
    #[serde(default)]
    pub position: Option<u32>,
}

/// A course user; `sortable_name` is "Last, First".
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub sortable_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    pub fn sort_key(&self) -> &str {
        self.sortable_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Submission {
    pub user_id: u64,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Folder {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub parent_folder_id: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CanvasFile {
    pub id: u64,
    pub display_name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Quiz {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub points_possible: Option<f64>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuizQuestion {
    pub id: u64,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub question_name: Option<String>,
    #[serde(default)]
    pub question_text: Option<String>,
    #[serde(default)]
    pub points_possible: Option<f64>,
    #[serde(default)]
    pub answers: Vec<QuizAnswer>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuizAnswer {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl QuizAnswer {
    pub fn is_correct(&self) -> bool {
        self.weight.unwrap_or(0.0) > 0.0
    }
}

/// First step of a Canvas file upload: where to send the bytes.
#[derive(Deserialize, Debug)]
pub struct UploadTarget {
    pub upload_url: String,
    #[serde(default)]
    pub upload_params: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerates_missing_optional_fields() {
        let user: User = serde_json::from_str(r#"{"id": 7, "name": "Ada Lovelace"}"#).unwrap();
        assert_eq!(user.sort_key(), "Ada Lovelace");
        assert!(user.email.is_none());

        let assignment: Assignment = serde_json::from_str(
            r#"{"id": 1, "name": "HW", "description": null, "extra_field": 3}"#,
        )
        .unwrap();
        assert!(assignment.submission_types.is_empty());
    }

    #[test]
    fn answer_weight_marks_correct() {
        let answers: Vec<QuizAnswer> = serde_json::from_str(
            r#"[{"text": "a", "weight": 100}, {"text": "b", "weight": 0}, {"text": "c"}]"#,
        )
        .unwrap();
        let correct: Vec<bool> = answers.iter().map(QuizAnswer::is_correct).collect();
        assert_eq!(correct, vec![true, false, false]);
    }
}
