use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::model::entity::{Course, EnrollmentWithCourseRow, Review};

/// Public course page: the course row, its section/lesson tree and the
/// freshest approved reviews.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CourseDetailResponse {
    pub course: Course,
    pub current_price: i64,
    pub has_discount: bool,
    pub sections: Value,
    pub reviews: Vec<Review>,
}

impl CourseDetailResponse {
    pub fn new(course: Course, sections: Value, reviews: Vec<Review>) -> Self {
        Self {
            current_price: course.current_price(),
            has_discount: course.has_discount(),
            course,
            sections,
            reviews,
        }
    }
}

/// One row of the "my courses" list.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EnrolledCourseResponse {
    pub enrollment_id: Uuid,
    pub enrolled_at: chrono::DateTime<chrono::Utc>,
    pub completed: bool,
    pub progress_percentage: f64,
    pub course: Value,
}

impl From<EnrollmentWithCourseRow> for EnrolledCourseResponse {
    fn from(row: EnrollmentWithCourseRow) -> Self {
        Self {
            enrollment_id: row.id,
            enrolled_at: row.enrolled_at,
            completed: row.completed,
            progress_percentage: row.progress_percentage,
            course: row.course,
        }
    }
}
