//! Academy Portal
//!
//! Client core for an admin + visitor course portal backed by a json-server style
//! document store: session store, fragment router and generic resource services.

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod models;
pub mod router;
pub mod storage;
pub mod views;

use std::sync::Arc;

use api::{ApiClient, CourseService, EnrollmentService, UserService};
use auth::AuthService;
use config::Config;
use errors::AppResult;
use models::Role;
use router::{Location, Route, Router, RouterConfig};
use storage::Storage;
use views::Screen;

/// Services shared by the router, the views and the shell.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: AuthService,
    pub users: UserService,
    pub courses: CourseService,
    pub enrollments: EnrollmentService,
}

impl AppState {
    /// Wire every service against one client and one storage backend.
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> AppResult<Self> {
        let client = ApiClient::new(&config.api_url, config.request_timeout)?;

        let users = UserService::new(client.clone());
        let courses = CourseService::new(client.clone());
        let enrollments = EnrollmentService::new(client, users.clone(), courses.clone());
        let auth = AuthService::new(storage, users.clone(), config.session_ttl_hours);

        Ok(Self {
            config: Arc::new(config),
            auth,
            users,
            courses,
            enrollments,
        })
    }
}

/// Create the portal router with all routes.
pub fn create_router(state: &AppState, screen: &Arc<Screen>, location: Arc<Location>) -> Router {
    Router::new(
        RouterConfig::default(),
        Arc::new(state.auth.clone()),
        location,
    )
    // Public
    .route("/courses", Route::public("Available courses", views::courses_view(state, screen)))
    .route("/login", Route::public("Log in", views::login_view(state, screen)))
    .route("/register", Route::public("Register", views::register_view(state, screen)))
    // Visitors
    .route(
        "/my-courses",
        Route::for_role("My courses", views::my_courses_view(state, screen), Role::Visitor),
    )
    // Admins
    .route(
        "/dashboard",
        Route::for_role("Admin dashboard", views::dashboard_view(state, screen), Role::Admin),
    )
    .route(
        "/users",
        Route::for_role("User management", views::users_view(state, screen), Role::Admin),
    )
    .route(
        "/courses-admin",
        Route::for_role("Course management", views::courses_admin_view(state, screen), Role::Admin),
    )
    .route(
        "/enrollments",
        Route::for_role("Enrollment management", views::enrollments_view(state, screen), Role::Admin),
    )
    .route(
        "/reports",
        Route::for_role("Reports", views::reports_view(state, screen), Role::Admin),
    )
}
