use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::grading::strip_solutions;
use crate::model::entity::Step;

/// Step as a student sees it: the payload keeps the question but loses the
/// solution fields.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StepStudentView {
    id: Uuid,
    step_type: String,
    title: String,
    order_index: i32,
    points: i32,
    is_required: bool,
    content: Value,
}

impl StepStudentView {
    pub fn from_entity(step: &Step) -> Self {
        let content = match step.kind() {
            Ok(kind) => strip_solutions(kind, step.content()),
            Err(_) => Value::Object(Default::default()),
        };

        Self {
            id: step.id(),
            step_type: step.step_type().to_string(),
            title: step.title().to_string(),
            order_index: step.order_index(),
            points: step.points(),
            is_required: step.is_required(),
            content,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StepCheckRequest {
    /// Kind-shaped payload, e.g. `{"selected_index": 2}` for a single-choice
    /// step.
    pub answer: Value,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StepCheckResponse {
    pub is_correct: bool,
    pub message: String,
    /// Present for wrong answers only.
    pub explanation: String,
    pub attempts: i32,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StepCompleteResponse {
    pub completed_steps: i64,
    pub total_steps: i64,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StepReorderRequest {
    /// Every step of the lesson, in the order it should get.
    pub step_ids: Vec<Uuid>,
}
