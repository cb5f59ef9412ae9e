// Gradebook aggregation: students down the side, assignments across the
// top. Fetching is done by the caller; this module only arranges scores.

use crate::models::{Submission, User};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Gradebook {
    students: Vec<User>,
    assignments: Vec<String>,
    scores: HashMap<u64, HashMap<usize, f64>>,
}

/// A student's name with one cell per assignment, in column order.
#[derive(Debug, PartialEq)]
pub struct GradebookRow {
    pub student: String,
    pub scores: Vec<Option<f64>>,
}

impl Gradebook {
    pub fn new(mut students: Vec<User>) -> Self {
        students.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
        let scores = students.iter().map(|s| (s.id, HashMap::new())).collect();
        Gradebook {
            students,
            assignments: Vec::new(),
            scores,
        }
    }

    /// Add an assignment column. Submissions from users who are not
    /// enrolled students (test students, removed users) are skipped.
    pub fn record(&mut self, assignment: &str, submissions: &[Submission]) {
        let column = self.assignments.len();
        self.assignments.push(assignment.to_string());
        for sub in submissions {
            if let (Some(row), Some(score)) = (self.scores.get_mut(&sub.user_id), sub.score) {
                row.insert(column, score);
            }
        }
    }

    pub fn assignments(&self) -> &[String] {
        &self.assignments
    }

    pub fn rows(&self) -> Vec<GradebookRow> {
        self.students
            .iter()
            .map(|student| {
                let row = self.scores.get(&student.id);
                GradebookRow {
                    student: student.sort_key().to_string(),
                    scores: (0..self.assignments.len())
                        .map(|column| row.and_then(|r| r.get(&column)).copied())
                        .collect(),
                }
            })
            .collect()
    }
}

impl GradebookRow {
    /// Tab-separated line; ungraded cells show as `-`.
    pub fn to_line(&self) -> String {
        let cells: Vec<String> = self
            .scores
            .iter()
            .map(|s| s.map(|v| v.to_string()).unwrap_or_else(|| "-".into()))
            .collect();
        format!("{}\t{}", self.student, cells.join("\t"))
    }
}
