//! Enrollment model matching the `enrollments` collection.

use serde::{Deserialize, Serialize};

use super::RecordId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Cancelled,
}

/// Join record between a user and a course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: RecordId,
    pub user_id: RecordId,
    pub course_id: RecordId,
    pub enrollment_date: String,
    pub status: EnrollmentStatus,
}

/// Request body for creating an enrollment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEnrollment {
    pub user_id: RecordId,
    pub course_id: RecordId,
    pub enrollment_date: String,
    pub status: EnrollmentStatus,
}

/// Aggregate enrollment counts for reports.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentStats {
    pub total: usize,
    /// (course id, enrollment count), in course listing order
    pub by_course: Vec<(RecordId, usize)>,
    /// (user id, enrollment count), in user listing order
    pub by_user: Vec<(RecordId, usize)>,
    pub average_per_course: f64,
    pub average_per_user: f64,
}
