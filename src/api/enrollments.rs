//! Enrollment collection service.

use chrono::Utc;

use super::{ApiClient, CourseService, Resource, ResourceService, UserService};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Course, Enrollment, EnrollmentStats, EnrollmentStatus, NewEnrollment, RecordId, User,
};

impl Resource for Enrollment {
    const COLLECTION: &'static str = "enrollments";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Enrollments plus the course counter bookkeeping that goes with them.
#[derive(Debug, Clone)]
pub struct EnrollmentService {
    enrollments: ResourceService<Enrollment>,
    users: UserService,
    courses: CourseService,
}

impl EnrollmentService {
    /// `courses` must be the same instance the rest of the app uses, so that its
    /// capacity locks are shared.
    pub fn new(client: ApiClient, users: UserService, courses: CourseService) -> Self {
        Self {
            enrollments: ResourceService::new(client),
            users,
            courses,
        }
    }

    pub async fn all(&self) -> AppResult<Vec<Enrollment>> {
        self.enrollments.list(&[]).await
    }

    pub async fn get(&self, id: &RecordId) -> AppResult<Enrollment> {
        self.enrollments.get_by_id(id).await
    }

    /// Enroll a user in a course.
    ///
    /// The capacity check, the enrollment insert and the counter increment all happen
    /// under the course's capacity lock, so concurrent calls cannot oversubscribe it.
    pub async fn create_enrollment(
        &self,
        user_id: &RecordId,
        course_id: &RecordId,
    ) -> AppResult<Enrollment> {
        self.users.get(user_id).await?;

        let guard = self.courses.lock_capacity(course_id).await;

        let course = self.courses.get(course_id).await?;
        if course.is_full() {
            return Err(AppError::Conflict("Course is full".to_string()));
        }

        if self.by_user_and_course(user_id, course_id).await?.is_some() {
            return Err(AppError::Conflict(
                "User is already enrolled in this course".to_string(),
            ));
        }

        let body = NewEnrollment {
            user_id: user_id.clone(),
            course_id: course_id.clone(),
            enrollment_date: Utc::now().to_rfc3339(),
            status: EnrollmentStatus::Active,
        };
        let enrollment = self.enrollments.create(&body).await?;

        if let Err(e) = self.courses.increment_held(&guard).await {
            tracing::warn!(
                "Rolling back enrollment {} after counter update failed: {}",
                enrollment.id,
                e
            );
            if let Err(rollback) = self.enrollments.delete(&enrollment.id).await {
                tracing::error!("Rollback of enrollment {} failed: {}", enrollment.id, rollback);
            }
            return Err(e);
        }

        tracing::info!("User {} enrolled in course {}", user_id, course_id);
        Ok(enrollment)
    }

    /// Delete an enrollment and release its seat.
    ///
    /// The seat is released first. If the delete then fails the seat is taken back, so
    /// the enrollment and the counter never go out of step because of this call. A
    /// counter that is already 0, or a course that no longer exists, is logged as drift
    /// and does not block the delete.
    pub async fn delete_enrollment(&self, id: &RecordId) -> AppResult<bool> {
        let enrollment = self.get(id).await?;

        let guard = self.courses.lock_capacity(&enrollment.course_id).await;
        let released = match self.courses.decrement_held(&guard).await {
            Ok(_) => true,
            Err(AppError::Conflict(msg)) | Err(AppError::NotFound(msg)) => {
                tracing::warn!(
                    "Counter drift on course {} while deleting enrollment {}: {}",
                    enrollment.course_id,
                    id,
                    msg
                );
                false
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.enrollments.delete(id).await {
            if released {
                if let Err(restore) = self.courses.increment_held(&guard).await {
                    tracing::error!(
                        "Restoring seat on course {} failed: {}",
                        enrollment.course_id,
                        restore
                    );
                }
            }
            return Err(e);
        }

        tracing::info!("Enrollment {} deleted", id);
        Ok(true)
    }

    pub async fn cancel_enrollment(
        &self,
        user_id: &RecordId,
        course_id: &RecordId,
    ) -> AppResult<bool> {
        let enrollment = self
            .by_user_and_course(user_id, course_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Enrollment of user {} in course {} not found",
                    user_id, course_id
                ))
            })?;
        self.delete_enrollment(&enrollment.id).await
    }

    pub async fn by_user(&self, user_id: &RecordId) -> AppResult<Vec<Enrollment>> {
        let user_id_str = user_id.as_string();
        let enrollments = self.enrollments.list(&[("userId", &user_id_str)]).await?;
        Ok(enrollments
            .into_iter()
            .filter(|e| &e.user_id == user_id)
            .collect())
    }

    pub async fn by_course(&self, course_id: &RecordId) -> AppResult<Vec<Enrollment>> {
        let course_id_str = course_id.as_string();
        let enrollments = self
            .enrollments
            .list(&[("courseId", &course_id_str)])
            .await?;
        Ok(enrollments
            .into_iter()
            .filter(|e| &e.course_id == course_id)
            .collect())
    }

    pub async fn by_user_and_course(
        &self,
        user_id: &RecordId,
        course_id: &RecordId,
    ) -> AppResult<Option<Enrollment>> {
        Ok(self
            .by_user(user_id)
            .await?
            .into_iter()
            .find(|e| &e.course_id == course_id))
    }

    pub async fn is_user_enrolled(
        &self,
        user_id: &RecordId,
        course_id: &RecordId,
    ) -> AppResult<bool> {
        Ok(self.by_user_and_course(user_id, course_id).await?.is_some())
    }

    /// Courses a user is enrolled in, paired with the enrollment.
    ///
    /// Enrollments pointing at a deleted course are skipped.
    pub async fn user_courses(&self, user_id: &RecordId) -> AppResult<Vec<(Enrollment, Course)>> {
        let mut result = Vec::new();
        for enrollment in self.by_user(user_id).await? {
            match self.courses.get(&enrollment.course_id).await {
                Ok(course) => result.push((enrollment, course)),
                Err(AppError::NotFound(_)) => {
                    tracing::warn!(
                        "Enrollment {} references missing course {}",
                        enrollment.id,
                        enrollment.course_id
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(result)
    }

    /// Users enrolled in a course, paired with the enrollment.
    pub async fn course_students(
        &self,
        course_id: &RecordId,
    ) -> AppResult<Vec<(Enrollment, User)>> {
        let mut result = Vec::new();
        for enrollment in self.by_course(course_id).await? {
            match self.users.get(&enrollment.user_id).await {
                Ok(user) => result.push((enrollment, user)),
                Err(AppError::NotFound(_)) => {
                    tracing::warn!(
                        "Enrollment {} references missing user {}",
                        enrollment.id,
                        enrollment.user_id
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(result)
    }

    pub async fn stats(&self) -> AppResult<EnrollmentStats> {
        let enrollments = self.all().await?;
        let courses = self.courses.all().await?;
        let users = self.users.all().await?;

        let by_course: Vec<(RecordId, usize)> = courses
            .iter()
            .map(|c| {
                let count = enrollments.iter().filter(|e| e.course_id == c.id).count();
                (c.id.clone(), count)
            })
            .collect();
        let by_user: Vec<(RecordId, usize)> = users
            .iter()
            .map(|u| {
                let count = enrollments.iter().filter(|e| e.user_id == u.id).count();
                (u.id.clone(), count)
            })
            .collect();

        Ok(EnrollmentStats {
            total: enrollments.len(),
            by_course,
            by_user,
            average_per_course: average(enrollments.len(), courses.len()),
            average_per_user: average(enrollments.len(), users.len()),
        })
    }
}

/// Mean rounded to one decimal, 0 for an empty denominator.
fn average(total: usize, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (total as f64 / count as f64 * 10.0).round() / 10.0
}
