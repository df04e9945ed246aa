use serde::Serialize;

use crate::model::entity::CourseMedia;

/// Media record plus the size rendered for humans (B/KB/MB/GB).
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MediaResponse {
    pub file_size_display: String,
    pub media: CourseMedia,
}

impl From<CourseMedia> for MediaResponse {
    fn from(media: CourseMedia) -> Self {
        Self {
            file_size_display: media.file_size_display(),
            media,
        }
    }
}
