use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::entity::Certificate;

/// Public verification result. Invalid numbers return `valid: false` with
/// everything else empty instead of a 404, so the endpoint does not leak
/// which numbers exist as a side channel of status codes.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CertificateVerifyResponse {
    pub valid: bool,
    pub certificate_number: String,
    pub student_name: String,
    pub course_title: String,
    pub instructor_name: String,
    pub issued_at: Option<DateTime<Utc>>,
}

impl CertificateVerifyResponse {
    pub fn found(certificate: &Certificate) -> Self {
        Self {
            valid: true,
            certificate_number: certificate.certificate_number().to_string(),
            student_name: certificate.student_name().to_string(),
            course_title: certificate.course_title().to_string(),
            instructor_name: certificate.instructor_name().to_string(),
            issued_at: Some(*certificate.issued_at()),
        }
    }

    pub fn not_found(number: &str) -> Self {
        Self {
            valid: false,
            certificate_number: number.to_string(),
            student_name: String::new(),
            course_title: String::new(),
            instructor_name: String::new(),
            issued_at: None,
        }
    }
}
