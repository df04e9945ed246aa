//! Step answer grading.
//!
//! Steps store their payload as `jsonb`; this module gives every step kind a
//! typed content schema and a typed submission, and grades them with a pure
//! function. Handlers parse once at the boundary and never poke at raw JSON.

mod content;
pub use content::{
    CodeContent, FillBlanksContent, FreeAnswerContent, NumericContent, QuizMatchingContent,
    QuizMultipleContent, QuizSingleContent, QuizSortingContent, SqlContent, StepContent,
    TextAnswerContent, TextContent, VideoContent, default_content_value, strip_solutions,
};

mod submission;
pub use submission::StepSubmission;

use std::collections::HashSet;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradeError {
    #[error("unknown step type: {0}")]
    UnknownKind(String),
    #[error("step type `{0}` is not interactive")]
    NotInteractive(StepKind),
    #[error("malformed step content: {0}")]
    MalformedContent(serde_json::Error),
    #[error("malformed submission: {0}")]
    MalformedSubmission(serde_json::Error),
    #[error("submission for `{submission}` does not fit a `{content}` step")]
    KindMismatch {
        content: StepKind,
        submission: StepKind,
    },
}

pub type GradeResult<T> = std::result::Result<T, GradeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Text,
    Video,
    QuizSingle,
    QuizMultiple,
    QuizSorting,
    QuizMatching,
    FillBlanks,
    Numeric,
    TextAnswer,
    FreeAnswer,
    Code,
    Sql,
}

impl StepKind {
    pub const ALL: [StepKind; 12] = [
        Self::Text,
        Self::Video,
        Self::QuizSingle,
        Self::QuizMultiple,
        Self::QuizSorting,
        Self::QuizMatching,
        Self::FillBlanks,
        Self::Numeric,
        Self::TextAnswer,
        Self::FreeAnswer,
        Self::Code,
        Self::Sql,
    ];

    pub fn parse(value: &str) -> GradeResult<Self> {
        match value {
            "text" => Ok(Self::Text),
            "video" => Ok(Self::Video),
            "quiz_single" => Ok(Self::QuizSingle),
            "quiz_multiple" => Ok(Self::QuizMultiple),
            "quiz_sorting" => Ok(Self::QuizSorting),
            "quiz_matching" => Ok(Self::QuizMatching),
            "fill_blanks" => Ok(Self::FillBlanks),
            "numeric" => Ok(Self::Numeric),
            "text_answer" => Ok(Self::TextAnswer),
            "free_answer" => Ok(Self::FreeAnswer),
            "code" => Ok(Self::Code),
            "sql" => Ok(Self::Sql),
            other => Err(GradeError::UnknownKind(other.to_string())),
        }
    }

    /// Content steps (text/video) are completed, not answered.
    pub fn is_interactive(self) -> bool {
        !matches!(self, Self::Text | Self::Video)
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Video => "video",
            Self::QuizSingle => "quiz_single",
            Self::QuizMultiple => "quiz_multiple",
            Self::QuizSorting => "quiz_sorting",
            Self::QuizMatching => "quiz_matching",
            Self::FillBlanks => "fill_blanks",
            Self::Numeric => "numeric",
            Self::TextAnswer => "text_answer",
            Self::FreeAnswer => "free_answer",
            Self::Code => "code",
            Self::Sql => "sql",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct Verdict {
    pub is_correct: bool,
    pub message: String,
    pub explanation: String,
}

impl Verdict {
    fn correct<S: Into<String>>(message: S, explanation: &str) -> Self {
        Self {
            is_correct: true,
            message: message.into(),
            explanation: explanation.to_string(),
        }
    }

    fn incorrect<S: Into<String>>(message: S, explanation: &str) -> Self {
        Self {
            is_correct: false,
            message: message.into(),
            explanation: explanation.to_string(),
        }
    }
}

/// Grades one submission against one step's content. Pure; all persistence
/// (attempt counters, progress rows) happens in the caller.
pub fn grade(content: &StepContent, submission: &StepSubmission) -> GradeResult<Verdict> {
    let (content_kind, submission_kind) = (content.kind(), submission.kind());
    if !content_kind.is_interactive() {
        return Err(GradeError::NotInteractive(content_kind));
    }
    if content_kind != submission_kind {
        return Err(GradeError::KindMismatch {
            content: content_kind,
            submission: submission_kind,
        });
    }

    let verdict = match (content, submission) {
        (StepContent::QuizSingle(c), StepSubmission::QuizSingle { selected_index }) => {
            if *selected_index == c.correct_index {
                Verdict::correct("Correct! ✓", &c.explanation)
            } else {
                Verdict::incorrect("Incorrect. Try again.", &c.explanation)
            }
        }
        (StepContent::QuizMultiple(c), StepSubmission::QuizMultiple { selected_indexes }) => {
            let correct: HashSet<usize> = c.correct_indexes.iter().copied().collect();
            let selected: HashSet<usize> = selected_indexes.iter().copied().collect();
            if correct == selected {
                Verdict::correct("Correct! All answers match. ✓", &c.explanation)
            } else {
                Verdict::incorrect("Incorrect. Not every answer is right.", &c.explanation)
            }
        }
        (StepContent::Numeric(c), StepSubmission::Numeric { value }) => {
            if (value - c.answer).abs() <= c.tolerance {
                Verdict::correct(format!("Correct! The answer is {}. ✓", c.answer), &c.explanation)
            } else {
                Verdict::incorrect("Incorrect. Try again.", &c.explanation)
            }
        }
        (StepContent::TextAnswer(c), StepSubmission::TextAnswer { text }) => {
            let user_text = text.trim();
            let matched = c
                .patterns
                .iter()
                .any(|pattern| text_pattern_matches(pattern, user_text, c.case_sensitive));
            if matched {
                Verdict::correct("Correct! ✓", &c.explanation)
            } else {
                Verdict::incorrect("Incorrect. Try again.", &c.explanation)
            }
        }
        (StepContent::QuizSorting(c), StepSubmission::QuizSorting { user_order }) => {
            if *user_order == c.correct_order {
                Verdict::correct("Correct! The order is right. ✓", "")
            } else {
                Verdict::incorrect("Wrong order. Try again.", "")
            }
        }
        (StepContent::QuizMatching(c), StepSubmission::QuizMatching { pairs }) => {
            let correct: HashSet<(usize, usize)> = c.pairs.iter().copied().collect();
            let submitted: HashSet<(usize, usize)> = pairs.iter().copied().collect();
            if correct == submitted {
                Verdict::correct("Correct! Every pair matches. ✓", "")
            } else {
                Verdict::incorrect("Incorrect. Try again.", "")
            }
        }
        (StepContent::FillBlanks(c), StepSubmission::FillBlanks { answers }) => {
            let all_match = answers.len() == c.answers.len()
                && answers
                    .iter()
                    .zip(c.answers.iter())
                    .all(|(user, correct)| {
                        user.trim().to_lowercase() == correct.trim().to_lowercase()
                    });
            if all_match {
                Verdict::correct("Correct! Every blank is filled right. ✓", "")
            } else {
                Verdict::incorrect("Incorrect. Try again.", "")
            }
        }
        (StepContent::FreeAnswer(c), StepSubmission::FreeAnswer { text }) => {
            // Not auto-gradable; accept once long enough and leave the text
            // for the instructor.
            let user_text = text.trim();
            if user_text.chars().count() >= c.min_length {
                Verdict::correct("Your answer was sent to the instructor for review.", "")
            } else {
                Verdict::incorrect(
                    format!("The answer is too short. At least {} characters.", c.min_length),
                    "",
                )
            }
        }
        (StepContent::Code(_), StepSubmission::Code { code }) => {
            // Sandbox execution is out of scope; a non-empty submission is
            // recorded for review.
            if code.trim().is_empty() {
                Verdict::incorrect("Write some code first.", "")
            } else {
                Verdict::correct("The code was submitted for review.", "")
            }
        }
        (StepContent::Sql(_), StepSubmission::Sql { query }) => {
            if query.trim().is_empty() {
                Verdict::incorrect("Write a query first.", "")
            } else {
                Verdict::correct("The query was submitted for review.", "")
            }
        }
        // interactivity and kind equality are checked above
        _ => unreachable!("kind mismatch slipped past the guard"),
    };

    Ok(verdict)
}

/// A pattern is a regex matched at the start of the text; one that does not
/// compile degrades to a literal comparison. Case folding per the content.
fn text_pattern_matches(pattern: &str, text: &str, case_sensitive: bool) -> bool {
    let source = if case_sensitive {
        pattern.to_string()
    } else {
        format!("(?i){pattern}")
    };

    match Regex::new(&source) {
        Ok(re) => re.find(text).is_some_and(|m| m.start() == 0),
        Err(_) => {
            if case_sensitive {
                text == pattern
            } else {
                text.to_lowercase() == pattern.to_lowercase()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn single() -> StepContent {
        StepContent::from_value(
            StepKind::QuizSingle,
            &json!({
                "question": "2 + 2?",
                "choices": ["3", "4", "5"],
                "correct_index": 1,
                "explanation": "Basic arithmetic."
            }),
        )
        .unwrap()
    }

    #[test]
    fn quiz_single_exact_index() {
        let content = single();
        let right = StepSubmission::QuizSingle { selected_index: 1 };
        let wrong = StepSubmission::QuizSingle { selected_index: 2 };

        assert!(grade(&content, &right).unwrap().is_correct);
        let verdict = grade(&content, &wrong).unwrap();
        assert!(!verdict.is_correct);
        assert_eq!(verdict.explanation, "Basic arithmetic.");
    }

    #[test]
    fn quiz_multiple_is_set_equality() {
        let content = StepContent::from_value(
            StepKind::QuizMultiple,
            &json!({
                "question": "Even numbers?",
                "choices": ["1", "2", "3", "4"],
                "correct_indexes": [1, 3]
            }),
        )
        .unwrap();

        let reordered = StepSubmission::QuizMultiple {
            selected_indexes: vec![3, 1],
        };
        let partial = StepSubmission::QuizMultiple {
            selected_indexes: vec![1],
        };
        let extra = StepSubmission::QuizMultiple {
            selected_indexes: vec![1, 3, 0],
        };

        assert!(grade(&content, &reordered).unwrap().is_correct);
        assert!(!grade(&content, &partial).unwrap().is_correct);
        assert!(!grade(&content, &extra).unwrap().is_correct);
    }

    #[test]
    fn numeric_respects_tolerance() {
        let content = StepContent::from_value(
            StepKind::Numeric,
            &json!({ "question": "pi?", "answer": 3.14, "tolerance": 0.01 }),
        )
        .unwrap();

        assert!(grade(&content, &StepSubmission::Numeric { value: 3.15 }).unwrap().is_correct);
        assert!(grade(&content, &StepSubmission::Numeric { value: 3.13 }).unwrap().is_correct);
        assert!(!grade(&content, &StepSubmission::Numeric { value: 3.16 }).unwrap().is_correct);
    }

    #[test]
    fn text_answer_regex_then_literal() {
        let content = StepContent::from_value(
            StepKind::TextAnswer,
            &json!({
                "question": "Who owns borrow checking?",
                "patterns": ["rust(lang)?", "(unclosed"],
                "case_sensitive": false
            }),
        )
        .unwrap();

        // regex pattern, anchored at the start, case-insensitive
        assert!(grade(&content, &StepSubmission::TextAnswer { text: "Rustlang".into() })
            .unwrap()
            .is_correct);
        // broken regex falls back to a literal comparison
        assert!(grade(&content, &StepSubmission::TextAnswer { text: "(unclosed".into() })
            .unwrap()
            .is_correct);
        assert!(!grade(&content, &StepSubmission::TextAnswer { text: "go".into() })
            .unwrap()
            .is_correct);
    }

    #[test]
    fn text_answer_case_sensitivity() {
        let content = StepContent::from_value(
            StepKind::TextAnswer,
            &json!({
                "question": "q",
                "patterns": ["Tokio"],
                "case_sensitive": true
            }),
        )
        .unwrap();

        assert!(grade(&content, &StepSubmission::TextAnswer { text: "Tokio".into() })
            .unwrap()
            .is_correct);
        assert!(!grade(&content, &StepSubmission::TextAnswer { text: "tokio".into() })
            .unwrap()
            .is_correct);
    }

    #[test]
    fn text_answer_trims_user_input() {
        let content = StepContent::from_value(
            StepKind::TextAnswer,
            &json!({ "question": "q", "patterns": ["async"], "case_sensitive": false }),
        )
        .unwrap();

        assert!(grade(&content, &StepSubmission::TextAnswer { text: "  async  ".into() })
            .unwrap()
            .is_correct);
    }

    #[test]
    fn sorting_is_order_sensitive() {
        let content = StepContent::from_value(
            StepKind::QuizSorting,
            &json!({
                "instruction": "sort",
                "items": ["a", "b", "c"],
                "correct_order": [2, 0, 1]
            }),
        )
        .unwrap();

        assert!(grade(&content, &StepSubmission::QuizSorting { user_order: vec![2, 0, 1] })
            .unwrap()
            .is_correct);
        assert!(!grade(&content, &StepSubmission::QuizSorting { user_order: vec![0, 1, 2] })
            .unwrap()
            .is_correct);
    }

    #[test]
    fn matching_is_order_insensitive() {
        let content = StepContent::from_value(
            StepKind::QuizMatching,
            &json!({
                "instruction": "match",
                "left": ["l0", "l1"],
                "right": ["r0", "r1"],
                "pairs": [[0, 1], [1, 0]]
            }),
        )
        .unwrap();

        assert!(grade(
            &content,
            &StepSubmission::QuizMatching { pairs: vec![(1, 0), (0, 1)] }
        )
        .unwrap()
        .is_correct);
        assert!(!grade(
            &content,
            &StepSubmission::QuizMatching { pairs: vec![(0, 0), (1, 1)] }
        )
        .unwrap()
        .is_correct);
    }

    #[test]
    fn fill_blanks_case_insensitive_and_length_checked() {
        let content = StepContent::from_value(
            StepKind::FillBlanks,
            &json!({
                "text_with_blanks": "Rust is {{}} and {{}}",
                "answers": ["fast", "safe"]
            }),
        )
        .unwrap();

        assert!(grade(
            &content,
            &StepSubmission::FillBlanks { answers: vec![" FAST ".into(), "Safe".into()] }
        )
        .unwrap()
        .is_correct);
        // one blank missing
        assert!(!grade(
            &content,
            &StepSubmission::FillBlanks { answers: vec!["fast".into()] }
        )
        .unwrap()
        .is_correct);
    }

    #[test]
    fn free_answer_checks_min_length() {
        let content = StepContent::from_value(
            StepKind::FreeAnswer,
            &json!({ "question": "essay", "min_length": 5, "rubric": "" }),
        )
        .unwrap();

        let long = grade(&content, &StepSubmission::FreeAnswer { text: "long enough".into() })
            .unwrap();
        assert!(long.is_correct);

        let short = grade(&content, &StepSubmission::FreeAnswer { text: "hi".into() }).unwrap();
        assert!(!short.is_correct);
        assert!(short.message.contains('5'));
    }

    #[test]
    fn code_accepts_non_blank_only() {
        let content =
            StepContent::from_value(StepKind::Code, &json!({ "language": "python" })).unwrap();

        assert!(grade(&content, &StepSubmission::Code { code: "print(1)".into() })
            .unwrap()
            .is_correct);
        assert!(!grade(&content, &StepSubmission::Code { code: "   \n".into() })
            .unwrap()
            .is_correct);
    }

    #[test]
    fn content_steps_are_not_gradable() {
        let content = StepContent::default_for(StepKind::Text);
        let err = grade(&content, &StepSubmission::Code { code: "x".into() }).unwrap_err();
        assert!(matches!(err, GradeError::NotInteractive(StepKind::Text)));
    }

    #[test]
    fn mismatched_submission_kind_is_rejected() {
        let content = single();
        let err = grade(&content, &StepSubmission::Numeric { value: 1.0 }).unwrap_err();
        assert!(matches!(err, GradeError::KindMismatch { .. }));
    }
}
