use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{Lesson, LessonProgress, StepProgress};
use crate::web::dto::steps::StepStudentView;

/// Everything the lesson page needs in one response: content, ordered steps
/// (solutions stripped), prev/next navigation and the student's progress.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LessonResponse {
    pub lesson: Lesson,
    pub steps: Vec<StepStudentView>,
    pub prev_lesson_id: Option<Uuid>,
    pub next_lesson_id: Option<Uuid>,
    pub progress: Option<LessonProgress>,
    /// Per-step progress rows; empty until the student is enrolled.
    pub step_progress: Vec<StepProgress>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LessonPositionRequest {
    /// Playback position in seconds.
    pub position: i32,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LessonCompleteResponse {
    pub progress_percentage: f64,
    pub course_completed: bool,
    /// Set when completing this lesson finished the course.
    pub certificate_number: Option<String>,
}
