//! View models and their text rendering.
//!
//! Each render function is pure: same model in, same text out.

use std::fmt::Write;

use crate::errors::AppError;
use crate::models::{Course, CourseStats, Enrollment, EnrollmentStats, User, UserStats};

/// One course as shown in listings.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseCard {
    pub id: String,
    pub title: String,
    pub instructor: String,
    pub start_date: String,
    pub enrolled: u32,
    pub capacity: u32,
}

impl CourseCard {
    pub fn seats_left(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled)
    }
}

impl From<&Course> for CourseCard {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id.to_string(),
            title: course.title.clone(),
            instructor: course.instructor.clone().unwrap_or_else(|| "TBA".to_string()),
            start_date: course.start_date.clone().unwrap_or_else(|| "TBA".to_string()),
            enrolled: course.enrolled,
            capacity: course.capacity,
        }
    }
}

/// Summary shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardModel {
    pub admin_name: String,
    pub users: UserStats,
    pub courses: CourseStats,
    pub enrollments: usize,
}

pub fn render_header(title: &str, user: Option<&User>) -> String {
    let who = match user {
        Some(u) => format!("{} ({})", u.name, u.role),
        None => "guest".to_string(),
    };
    format!("== {} == [{}]\n", title, who)
}

pub fn render_error(err: &AppError) -> String {
    format!("!! {}\n", err.message())
}

pub fn render_course_list(cards: &[CourseCard]) -> String {
    if cards.is_empty() {
        return "No courses available.\n".to_string();
    }
    let mut out = String::new();
    for card in cards {
        let seats = if card.seats_left() == 0 {
            "full".to_string()
        } else {
            format!("{} seats left", card.seats_left())
        };
        let _ = writeln!(
            out,
            "[{}] {} - {} - starts {} - {}/{} ({})",
            card.id, card.title, card.instructor, card.start_date, card.enrolled, card.capacity, seats
        );
    }
    out
}

pub fn render_my_courses(entries: &[(Enrollment, Course)]) -> String {
    if entries.is_empty() {
        return "You are not enrolled in any course yet.\n".to_string();
    }
    let mut out = String::new();
    for (enrollment, course) in entries {
        let _ = writeln!(
            out,
            "[{}] {} - enrolled {} ({:?})",
            course.id, course.title, enrollment.enrollment_date, enrollment.status
        );
    }
    out
}

pub fn render_dashboard(model: &DashboardModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Welcome, {}", model.admin_name);
    let _ = writeln!(
        out,
        "Users: {} ({} admins, {} visitors, {} new in 30 days)",
        model.users.total, model.users.admins, model.users.visitors, model.users.recent_users
    );
    let _ = writeln!(
        out,
        "Courses: {} ({} available, {} full, {} upcoming)",
        model.courses.total, model.courses.available, model.courses.full, model.courses.upcoming
    );
    let _ = writeln!(
        out,
        "Enrollments: {} - seats {}/{} ({}%)",
        model.enrollments,
        model.courses.total_enrolled,
        model.courses.total_capacity,
        model.courses.enrollment_rate
    );
    out
}

pub fn render_users(users: &[User]) -> String {
    if users.is_empty() {
        return "No users.\n".to_string();
    }
    let mut out = String::new();
    for user in users {
        let _ = writeln!(out, "[{}] {} <{}> {}", user.id, user.name, user.email, user.role);
    }
    out
}

pub fn render_enrollments(enrollments: &[Enrollment]) -> String {
    if enrollments.is_empty() {
        return "No enrollments.\n".to_string();
    }
    let mut out = String::new();
    for e in enrollments {
        let _ = writeln!(
            out,
            "[{}] user {} -> course {} on {} ({:?})",
            e.id, e.user_id, e.course_id, e.enrollment_date, e.status
        );
    }
    out
}

pub fn render_reports(courses: &CourseStats, enrollments: &EnrollmentStats) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Occupancy: {}/{} seats ({}%)",
        courses.total_enrolled, courses.total_capacity, courses.enrollment_rate
    );
    let _ = writeln!(
        out,
        "Enrollments: {} total, {} per course, {} per user",
        enrollments.total, enrollments.average_per_course, enrollments.average_per_user
    );
    for (course_id, count) in &enrollments.by_course {
        let _ = writeln!(out, "  course {}: {}", course_id, count);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordId, Role};

    #[test]
    fn test_course_list_marks_full_courses() {
        let cards = vec![
            CourseCard {
                id: "1".to_string(),
                title: "Rust".to_string(),
                instructor: "Ferris".to_string(),
                start_date: "2030-01-01".to_string(),
                enrolled: 3,
                capacity: 3,
            },
            CourseCard {
                id: "2".to_string(),
                title: "Go".to_string(),
                instructor: "Gopher".to_string(),
                start_date: "2030-02-01".to_string(),
                enrolled: 1,
                capacity: 4,
            },
        ];
        let text = render_course_list(&cards);
        assert!(text.contains("[1] Rust - Ferris - starts 2030-01-01 - 3/3 (full)"));
        assert!(text.contains("[2] Go - Gopher - starts 2030-02-01 - 1/4 (3 seats left)"));
    }

    #[test]
    fn test_header_shows_role() {
        let user = User {
            id: RecordId::Int(1),
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            password: String::new(),
            role: Role::Admin,
            phone: None,
            enroll_number: None,
            date_of_admission: None,
        };
        assert_eq!(render_header("Dashboard", Some(&user)), "== Dashboard == [Ana (admin)]\n");
        assert_eq!(render_header("Courses", None), "== Courses == [guest]\n");
    }

    #[test]
    fn test_empty_states() {
        assert_eq!(render_course_list(&[]), "No courses available.\n");
        assert_eq!(render_users(&[]), "No users.\n");
        assert_eq!(render_enrollments(&[]), "No enrollments.\n");
    }
}
