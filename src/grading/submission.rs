use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{GradeError, GradeResult, StepKind};

/// What a student actually sent for one step, keyed by the step's kind.
/// The wire payload is the same flat object the original client sent
/// (`{"selected_index": 2}`, `{"answers": [...]}`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum StepSubmission {
    QuizSingle { selected_index: usize },
    QuizMultiple { selected_indexes: Vec<usize> },
    QuizSorting { user_order: Vec<usize> },
    QuizMatching { pairs: Vec<(usize, usize)> },
    FillBlanks { answers: Vec<String> },
    Numeric { value: f64 },
    TextAnswer { text: String },
    FreeAnswer { text: String },
    Code { code: String },
    Sql { query: String },
}

impl StepSubmission {
    /// Parses a raw submission against the step kind it targets. `untagged`
    /// deserialization cannot tell `text_answer` from `free_answer`, so the
    /// kind always comes from the step row, not from the payload.
    pub fn from_value(kind: StepKind, value: &Value) -> GradeResult<Self> {
        #[derive(Deserialize)]
        struct SelectedIndex {
            selected_index: usize,
        }
        #[derive(Deserialize)]
        struct SelectedIndexes {
            selected_indexes: Vec<usize>,
        }
        #[derive(Deserialize)]
        struct UserOrder {
            user_order: Vec<usize>,
        }
        #[derive(Deserialize)]
        struct Pairs {
            pairs: Vec<(usize, usize)>,
        }
        #[derive(Deserialize)]
        struct Answers {
            answers: Vec<String>,
        }
        #[derive(Deserialize)]
        struct NumericValue {
            value: f64,
        }
        #[derive(Deserialize)]
        struct Text {
            text: String,
        }
        #[derive(Deserialize)]
        struct Code {
            code: String,
        }
        #[derive(Deserialize)]
        struct Query {
            query: String,
        }

        let parse_err = GradeError::MalformedSubmission;
        let submission = match kind {
            StepKind::Text | StepKind::Video => return Err(GradeError::NotInteractive(kind)),
            StepKind::QuizSingle => {
                let s: SelectedIndex =
                    serde_json::from_value(value.clone()).map_err(parse_err)?;
                Self::QuizSingle {
                    selected_index: s.selected_index,
                }
            }
            StepKind::QuizMultiple => {
                let s: SelectedIndexes =
                    serde_json::from_value(value.clone()).map_err(parse_err)?;
                Self::QuizMultiple {
                    selected_indexes: s.selected_indexes,
                }
            }
            StepKind::QuizSorting => {
                let s: UserOrder = serde_json::from_value(value.clone()).map_err(parse_err)?;
                Self::QuizSorting {
                    user_order: s.user_order,
                }
            }
            StepKind::QuizMatching => {
                let s: Pairs = serde_json::from_value(value.clone()).map_err(parse_err)?;
                Self::QuizMatching { pairs: s.pairs }
            }
            StepKind::FillBlanks => {
                let s: Answers = serde_json::from_value(value.clone()).map_err(parse_err)?;
                Self::FillBlanks { answers: s.answers }
            }
            StepKind::Numeric => {
                let s: NumericValue = serde_json::from_value(value.clone()).map_err(parse_err)?;
                Self::Numeric { value: s.value }
            }
            StepKind::TextAnswer => {
                let s: Text = serde_json::from_value(value.clone()).map_err(parse_err)?;
                Self::TextAnswer { text: s.text }
            }
            StepKind::FreeAnswer => {
                let s: Text = serde_json::from_value(value.clone()).map_err(parse_err)?;
                Self::FreeAnswer { text: s.text }
            }
            StepKind::Code => {
                let s: Code = serde_json::from_value(value.clone()).map_err(parse_err)?;
                Self::Code { code: s.code }
            }
            StepKind::Sql => {
                let s: Query = serde_json::from_value(value.clone()).map_err(parse_err)?;
                Self::Sql { query: s.query }
            }
        };
        Ok(submission)
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Self::QuizSingle { .. } => StepKind::QuizSingle,
            Self::QuizMultiple { .. } => StepKind::QuizMultiple,
            Self::QuizSorting { .. } => StepKind::QuizSorting,
            Self::QuizMatching { .. } => StepKind::QuizMatching,
            Self::FillBlanks { .. } => StepKind::FillBlanks,
            Self::Numeric { .. } => StepKind::Numeric,
            Self::TextAnswer { .. } => StepKind::TextAnswer,
            Self::FreeAnswer { .. } => StepKind::FreeAnswer,
            Self::Code { .. } => StepKind::Code,
            Self::Sql { .. } => StepKind::Sql,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_comes_from_the_step_not_the_payload() {
        let value = json!({ "text": "an essay" });
        let as_text = StepSubmission::from_value(StepKind::TextAnswer, &value).unwrap();
        let as_free = StepSubmission::from_value(StepKind::FreeAnswer, &value).unwrap();
        assert_eq!(as_text.kind(), StepKind::TextAnswer);
        assert_eq!(as_free.kind(), StepKind::FreeAnswer);
    }

    #[test]
    fn content_kinds_take_no_submission() {
        let err = StepSubmission::from_value(StepKind::Video, &json!({})).unwrap_err();
        assert!(matches!(err, GradeError::NotInteractive(StepKind::Video)));
    }

    #[test]
    fn missing_field_is_malformed() {
        let err = StepSubmission::from_value(StepKind::Numeric, &json!({ "text": "3" }))
            .unwrap_err();
        assert!(matches!(err, GradeError::MalformedSubmission(_)));
    }
}
