//! Course collection service and the capacity counter.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Duration, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::validation::{parse_date, validate_course};
use super::{ApiClient, Resource, ResourceService};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Course, CourseStats, CreateCourseRequest, Enrollment, RecordId, UpdateCourseRequest,
    DEFAULT_CAPACITY,
};

impl Resource for Course {
    const COLLECTION: &'static str = "courses";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// One async lock per course id, created on first use.
#[derive(Debug, Default)]
struct CapacityLocks {
    locks: Mutex<HashMap<RecordId, Arc<AsyncMutex<()>>>>,
}

impl CapacityLocks {
    fn lock_for(&self, course_id: &RecordId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(course_id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// Exclusive right to read and change one course's `enrolled` counter.
///
/// The store has no conditional update, so every read-modify-write of the counter made
/// through this process happens while one of these is held.
pub struct CapacityGuard {
    course_id: RecordId,
    _guard: OwnedMutexGuard<()>,
}

impl CapacityGuard {
    pub fn course_id(&self) -> &RecordId {
        &self.course_id
    }
}

/// CRUD and derived queries over `courses`.
#[derive(Debug, Clone)]
pub struct CourseService {
    courses: ResourceService<Course>,
    enrollments: ResourceService<Enrollment>,
    capacity_locks: Arc<CapacityLocks>,
}

impl CourseService {
    pub fn new(client: ApiClient) -> Self {
        Self {
            courses: ResourceService::new(client.clone()),
            enrollments: ResourceService::new(client),
            capacity_locks: Arc::new(CapacityLocks::default()),
        }
    }

    pub async fn all(&self) -> AppResult<Vec<Course>> {
        self.courses.list(&[]).await
    }

    pub async fn get(&self, id: &RecordId) -> AppResult<Course> {
        self.courses.get_by_id(id).await
    }

    /// Filtered listing; filters are applied by the store.
    pub async fn search(&self, filters: &[(&str, &str)]) -> AppResult<Vec<Course>> {
        self.courses.list(filters).await
    }

    pub async fn create(&self, request: &CreateCourseRequest) -> AppResult<Course> {
        validate_course(request)?;

        let mut body = request.clone();
        body.enrolled = Some(request.enrolled.unwrap_or(0));
        body.capacity = Some(request.capacity.unwrap_or(DEFAULT_CAPACITY));

        self.courses.create(&body).await
    }

    /// Partial update. Capacity may never drop below the current enrollment count.
    pub async fn update(&self, id: &RecordId, request: &UpdateCourseRequest) -> AppResult<Course> {
        let current = self.get(id).await?;

        if let Some(capacity) = request.capacity {
            if capacity < current.enrolled {
                return Err(AppError::Conflict(
                    "Capacity cannot be lower than the number of enrolled students".to_string(),
                ));
            }
        }

        self.courses.patch(id, request).await
    }

    /// Delete a course. Refused while enrollments reference it.
    pub async fn delete(&self, id: &RecordId) -> AppResult<bool> {
        let course_id = id.as_string();
        let enrollments = self.enrollments.list(&[("courseId", &course_id)]).await?;
        if !enrollments.is_empty() {
            return Err(AppError::Conflict(
                "Cannot delete a course with enrolled students".to_string(),
            ));
        }
        self.courses.delete(id).await
    }

    pub async fn available(&self) -> AppResult<Vec<Course>> {
        let courses = self.all().await?;
        Ok(courses.into_iter().filter(Course::has_available_spots).collect())
    }

    pub async fn full(&self) -> AppResult<Vec<Course>> {
        let courses = self.all().await?;
        Ok(courses.into_iter().filter(Course::is_full).collect())
    }

    /// Courses starting between today and `days_ahead` days from now, inclusive.
    pub async fn upcoming(&self, days_ahead: i64) -> AppResult<Vec<Course>> {
        let courses = self.all().await?;
        Ok(filter_upcoming(courses, days_ahead))
    }

    pub async fn has_available_spots(&self, id: &RecordId) -> AppResult<bool> {
        Ok(self.get(id).await?.has_available_spots())
    }

    /// Case-insensitive match on title or description.
    pub async fn search_by_title(&self, term: &str) -> AppResult<Vec<Course>> {
        let term = term.to_lowercase();
        let courses = self.all().await?;
        Ok(courses
            .into_iter()
            .filter(|c| {
                c.title.to_lowercase().contains(&term)
                    || c.description.to_lowercase().contains(&term)
            })
            .collect())
    }

    pub async fn stats(&self) -> AppResult<CourseStats> {
        let courses = self.all().await?;

        let total_enrolled: u64 = courses.iter().map(|c| u64::from(c.enrolled)).sum();
        let total_capacity: u64 = courses.iter().map(|c| u64::from(c.capacity)).sum();
        let enrollment_rate = if total_capacity > 0 {
            let rate = total_enrolled as f64 / total_capacity as f64 * 100.0;
            (rate * 10.0).round() / 10.0
        } else {
            0.0
        };

        Ok(CourseStats {
            total: courses.len(),
            available: courses.iter().filter(|c| c.has_available_spots()).count(),
            full: courses.iter().filter(|c| c.is_full()).count(),
            upcoming: filter_upcoming(courses.clone(), 30).len(),
            total_enrolled,
            total_capacity,
            enrollment_rate,
        })
    }

    /// Wait for exclusive access to a course's counter.
    pub async fn lock_capacity(&self, course_id: &RecordId) -> CapacityGuard {
        let lock = self.capacity_locks.lock_for(course_id);
        CapacityGuard {
            course_id: course_id.clone(),
            _guard: lock.lock_owned().await,
        }
    }

    pub async fn increment_enrollment(&self, course_id: &RecordId) -> AppResult<Course> {
        let guard = self.lock_capacity(course_id).await;
        self.increment_held(&guard).await
    }

    pub async fn decrement_enrollment(&self, course_id: &RecordId) -> AppResult<Course> {
        let guard = self.lock_capacity(course_id).await;
        self.decrement_held(&guard).await
    }

    /// Take one seat. Fails with `Conflict` when the course is full.
    pub(crate) async fn increment_held(&self, guard: &CapacityGuard) -> AppResult<Course> {
        let course = self.get(guard.course_id()).await?;
        if course.is_full() {
            return Err(AppError::Conflict("Course is full".to_string()));
        }

        let request = UpdateCourseRequest {
            enrolled: Some(course.enrolled + 1),
            ..Default::default()
        };
        let updated = self.courses.patch(&course.id, &request).await?;
        tracing::debug!("Course {} enrolled {}/{}", updated.id, updated.enrolled, updated.capacity);
        Ok(updated)
    }

    /// Release one seat. Fails with `Conflict` when nobody is enrolled.
    pub(crate) async fn decrement_held(&self, guard: &CapacityGuard) -> AppResult<Course> {
        let course = self.get(guard.course_id()).await?;
        if course.enrolled == 0 {
            return Err(AppError::Conflict(
                "No enrolled students to release".to_string(),
            ));
        }

        let request = UpdateCourseRequest {
            enrolled: Some(course.enrolled - 1),
            ..Default::default()
        };
        let updated = self.courses.patch(&course.id, &request).await?;
        tracing::debug!("Course {} enrolled {}/{}", updated.id, updated.enrolled, updated.capacity);
        Ok(updated)
    }
}

fn filter_upcoming(courses: Vec<Course>, days_ahead: i64) -> Vec<Course> {
    let today = Utc::now().date_naive();
    let horizon = today + Duration::days(days_ahead);
    courses
        .into_iter()
        .filter(|c| {
            c.start_date
                .as_deref()
                .and_then(parse_date)
                .is_some_and(|start| start >= today && start <= horizon)
        })
        .collect()
}
