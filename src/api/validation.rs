//! Client-side field checks run before any request reaches the store.

use chrono::{NaiveDate, Utc};

use crate::errors::{AppError, AppResult};
use crate::models::{CreateCourseRequest, NewUser};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// `something@domain.tld` with no whitespace; intentionally loose.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Digits, spaces and `-+()`, with at least ten digits.
pub fn is_valid_phone(phone: &str) -> bool {
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')'));
    allowed && phone.chars().filter(char::is_ascii_digit).count() >= 10
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

pub fn validate_login(email: &str, password: &str) -> AppResult<()> {
    if email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    if !is_valid_email(email) {
        return Err(AppError::Validation("Email format is not valid".to_string()));
    }
    if password.trim().is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_new_user(user: &NewUser) -> AppResult<()> {
    let name_len = user.name.trim().chars().count();
    if name_len == 0 {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if name_len < 2 {
        return Err(AppError::Validation(
            "Name must be at least 2 characters long".to_string(),
        ));
    }
    if name_len > 50 {
        return Err(AppError::Validation(
            "Name cannot exceed 50 characters".to_string(),
        ));
    }

    if user.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    if !is_valid_email(&user.email) {
        return Err(AppError::Validation("Email format is not valid".to_string()));
    }

    if user.password.trim().is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }
    validate_password(&user.password)?;

    if let Some(phone) = &user.phone {
        if !is_valid_phone(phone) {
            return Err(AppError::Validation("Phone format is not valid".to_string()));
        }
    }
    if let Some(enroll_number) = &user.enroll_number {
        if enroll_number.chars().count() < 10 {
            return Err(AppError::Validation(
                "Enroll number must be at least 10 characters long".to_string(),
            ));
        }
    }
    Ok(())
}

pub fn validate_course(course: &CreateCourseRequest) -> AppResult<()> {
    let title_len = course.title.trim().chars().count();
    if title_len == 0 {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if title_len < 3 {
        return Err(AppError::Validation(
            "Title must be at least 3 characters long".to_string(),
        ));
    }
    if title_len > 100 {
        return Err(AppError::Validation(
            "Title cannot exceed 100 characters".to_string(),
        ));
    }

    if course.description.trim().chars().count() < 10 {
        return Err(AppError::Validation(
            "Description must be at least 10 characters long".to_string(),
        ));
    }

    let start_date = course
        .start_date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Start date is required".to_string()))?;
    let start_date = parse_date(start_date)
        .ok_or_else(|| AppError::Validation("Start date format is not valid".to_string()))?;
    if start_date <= Utc::now().date_naive() {
        return Err(AppError::Validation(
            "Start date must be in the future".to_string(),
        ));
    }

    if course
        .duration
        .as_deref()
        .map_or(true, |d| d.trim().is_empty())
    {
        return Err(AppError::Validation("Duration is required".to_string()));
    }

    if let Some(capacity) = course.capacity {
        if !(1..=100).contains(&capacity) {
            return Err(AppError::Validation(
                "Capacity must be between 1 and 100".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(start_date: &str) -> CreateCourseRequest {
        CreateCourseRequest {
            title: "Rust 101".to_string(),
            description: "Ownership, borrowing and lifetimes".to_string(),
            instructor: None,
            start_date: Some(start_date.to_string()),
            duration: Some("8 weeks".to_string()),
            capacity: Some(10),
            enrolled: None,
        }
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@x.com"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@@x.com"));
    }

    #[test]
    fn test_phone_format() {
        assert!(is_valid_phone("+57 (300) 123-4567"));
        assert!(!is_valid_phone("300-12"));
        assert!(!is_valid_phone("300 123 45a7"));
    }

    #[test]
    fn test_new_user_rules() {
        assert!(validate_new_user(&NewUser::visitor("Ana", "ana@x.com", "secret1")).is_ok());
        assert!(matches!(
            validate_new_user(&NewUser::visitor("A", "ana@x.com", "secret1")),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_new_user(&NewUser::visitor("Ana", "ana@x.com", "short")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_course_rules() {
        let future = (Utc::now().date_naive() + chrono::Duration::days(30))
            .format("%Y-%m-%d")
            .to_string();
        assert!(validate_course(&course(&future)).is_ok());
        assert!(validate_course(&course("2001-01-01")).is_err());
        assert!(validate_course(&course("not-a-date")).is_err());

        let mut too_big = course(&future);
        too_big.capacity = Some(101);
        assert!(validate_course(&too_big).is_err());
    }
}
