use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{Question, QuestionChoice, Quiz, QuizAttempt, UserAnswer};

/// Instructor view: full question rows with their choices, correct flags
/// included.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QuestionWithChoices {
    pub question: Question,
    pub choices: Vec<QuestionChoice>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QuizDetailResponse {
    pub quiz: Quiz,
    pub questions: Vec<QuestionWithChoices>,
}

// Student-facing copies with the correct flags dropped.

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ChoiceView {
    pub id: Uuid,
    pub text: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QuestionView {
    pub id: Uuid,
    pub qtype: String,
    pub text: String,
    pub points: i32,
    pub choices: Vec<ChoiceView>,
}

impl QuestionView {
    pub fn from_entity(question: &Question, choices: &[QuestionChoice]) -> Self {
        Self {
            id: question.id(),
            qtype: question.qtype().to_string(),
            text: question.text().to_string(),
            points: question.points(),
            choices: choices
                .iter()
                .map(|c| ChoiceView {
                    id: c.id(),
                    text: c.text().to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AttemptStartResponse {
    pub attempt: QuizAttempt,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AnswerSubmission {
    pub question_id: Uuid,
    pub choice_id: Option<Uuid>,
    #[serde(default)]
    pub text_answer: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuizSubmitRequest {
    pub answers: Vec<AnswerSubmission>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AttemptResultResponse {
    pub attempt: QuizAttempt,
    pub answers: Vec<UserAnswer>,
    /// Full questions with correct flags; only present when the quiz shows
    /// answers.
    pub questions: Option<Vec<QuestionWithChoices>>,
}
