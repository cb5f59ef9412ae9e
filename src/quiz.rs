// Quiz documents: a YAML file holding the quiz settings at the top level and
// a `questions` list of multiple-choice questions.
//
//   title: Placement exam
//   time_limit: 30
//   questions:
//     - question_name: Q1
//       question_text: What is 2 + 2?
//       answers: { a: "3", b: "4" }
//       correct: b

use crate::document::DocumentError;
use serde::Deserialize;
use serde_json::json;
use serde_yaml::{Mapping, Value};

/// Settings and questions of a quiz file.
#[derive(Debug, Clone)]
pub struct QuizDocument {
    settings: Mapping,
    pub questions: Vec<QuizQuestion>,
}

/// One multiple-choice question; `correct` names a key of `answers`.
#[derive(Deserialize, Debug, Clone)]
pub struct QuizQuestion {
    pub question_name: String,
    pub question_text: String,
    pub answers: Mapping,
    pub correct: Value,
}

/// Parse a quiz file. `title` and `questions` are required.
pub fn parse_quiz(text: &str) -> Result<QuizDocument, DocumentError> {
    let value: Value = serde_yaml::from_str(text)
        .map_err(|e| DocumentError::MalformedDocument(format!("quiz is not valid YAML: {e}")))?;
    let Value::Mapping(mut settings) = value else {
        return Err(DocumentError::MalformedDocument(
            "quiz must be a key-value mapping".into(),
        ));
    };

    if !settings.contains_key("title") {
        return Err(DocumentError::MissingField("title".into()));
    }
    let questions = settings
        .remove("questions")
        .ok_or_else(|| DocumentError::MissingField("questions".into()))?;
    let questions: Vec<QuizQuestion> = serde_yaml::from_value(questions)
        .map_err(|e| DocumentError::MalformedDocument(format!("bad question list: {e}")))?;

    Ok(QuizDocument { settings, questions })
}

impl QuizDocument {
    pub fn title(&self) -> String {
        match self.settings.get("title") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => serde_yaml::to_string(other)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            None => String::new(),
        }
    }

    /// The quiz object sent to Canvas, with `published` set by the caller.
    pub fn settings(&self, published: bool) -> Result<serde_json::Value, DocumentError> {
        let mut settings = serde_json::to_value(&self.settings).map_err(|e| {
            DocumentError::InvalidField {
                field: "quiz settings".into(),
                reason: e.to_string(),
            }
        })?;
        settings["published"] = json!(published);
        Ok(settings)
    }
}

impl QuizQuestion {
    /// Canvas question payload: one point, weight 100 on the correct answer.
    pub fn to_payload(&self) -> Result<serde_json::Value, DocumentError> {
        if !self.answers.contains_key(&self.correct) {
            return Err(DocumentError::InvalidField {
                field: format!("{}.correct", self.question_name),
                reason: "does not name one of the answers".into(),
            });
        }
        let answers: Vec<serde_json::Value> = self
            .answers
            .iter()
            .map(|(choice, text)| {
                let weight = if *choice == self.correct { 100 } else { 0 };
                json!({ "text": answer_text(text), "weight": weight })
            })
            .collect();

        Ok(json!({
            "question_name": self.question_name,
            "question_text": self.question_text,
            "question_type": "multiple_choice_question",
            "points_possible": 1,
            "answers": answers,
        }))
    }
}

fn answer_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIZ: &str = r#"
title: Placement exam
time_limit: 30
questions:
  - question_name: Q1
    question_text: What is 2 + 2?
    answers:
      c: "5"
      a: "3"
      b: "4"
    correct: b
  - question_name: Q2
    question_text: Pick one
    answers: { 1: "yes", 2: "no" }
    correct: 1
"#;

    #[test]
    fn splits_settings_from_questions() {
        let quiz = parse_quiz(QUIZ).unwrap();
        assert_eq!(quiz.title(), "Placement exam");
        assert_eq!(quiz.questions.len(), 2);

        let settings = quiz.settings(true).unwrap();
        assert_eq!(settings["title"], "Placement exam");
        assert_eq!(settings["time_limit"], 30);
        assert_eq!(settings["published"], true);
        assert!(settings.get("questions").is_none());
    }

    #[test]
    fn answers_keep_order_and_weight_the_correct_one() {
        let quiz = parse_quiz(QUIZ).unwrap();
        let payload = quiz.questions[0].to_payload().unwrap();
        assert_eq!(payload["question_type"], "multiple_choice_question");
        assert_eq!(payload["points_possible"], 1);
        assert_eq!(
            payload["answers"],
            json!([
                { "text": "5", "weight": 0 },
                { "text": "3", "weight": 0 },
                { "text": "4", "weight": 100 },
            ])
        );

        let payload = quiz.questions[1].to_payload().unwrap();
        assert_eq!(payload["answers"][0]["weight"], 100);
        assert_eq!(payload["answers"][1]["text"], "no");
    }

    #[test]
    fn unknown_correct_answer_is_rejected() {
        let quiz = parse_quiz(concat!(
            "title: T\n",
            "questions:\n",
            "  - question_name: Q\n",
            "    question_text: Which\n",
            "    answers: {a: x}\n",
            "    correct: z\n",
        ))
        .unwrap();
        assert!(matches!(
            quiz.questions[0].to_payload(),
            Err(DocumentError::InvalidField { .. })
        ));
    }

    #[test]
    fn title_and_questions_are_required() {
        assert!(matches!(
            parse_quiz("questions: []\n"),
            Err(DocumentError::MissingField(f)) if f == "title"
        ));
        assert!(matches!(
            parse_quiz("title: T\n"),
            Err(DocumentError::MissingField(f)) if f == "questions"
        ));
        assert!(matches!(parse_quiz("- a\n"), Err(DocumentError::MalformedDocument(_))));
    }
}
