//! Academy Portal shell
//!
//! Drives the portal router from the terminal. Lines starting with `#` or `/` change the
//! fragment; everything else is a command.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use academy_portal::config::Config;
use academy_portal::errors::{AppError, AppResult};
use academy_portal::models::{NewUser, RecordId, Role};
use academy_portal::router::{Location, Router};
use academy_portal::storage::FileStorage;
use academy_portal::views::{render_error, Screen};
use academy_portal::{create_router, AppState};

const HELP: &str = "\
#/path                        go to a page (courses, login, register, my-courses,
                              dashboard, users, courses-admin, enrollments, reports)
login <email> <password>
logout
register <name> <email> <password>
enroll <course-id>            enroll the logged-in visitor
cancel <course-id>            cancel the logged-in visitor's enrollment
role <user-id> <admin|visitor>
passwd <current> <new>
help
quit
";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Academy Portal");
    tracing::info!("Document store: {}", config.api_url);
    tracing::info!("Storage path: {:?}", config.storage_path);

    let storage = Arc::new(FileStorage::open(&config.storage_path)?);
    let state = AppState::new(config, storage)?;

    let (screen, mut output) = Screen::new();
    let location = Arc::new(Location::new(""));
    let router = Arc::new(create_router(&state, &screen, location));

    let printer = tokio::spawn(async move {
        while let Some(text) = output.recv().await {
            print!("{}", text);
        }
    });
    let router_task = tokio::spawn(router.clone().run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        if line.starts_with('#') || line.starts_with('/') {
            router.navigate(line);
            continue;
        }
        if let Err(e) = run_command(&state, &router, &screen, line).await {
            screen.print(render_error(&e));
        }
    }

    router_task.abort();
    printer.abort();
    tracing::info!("Bye");
    Ok(())
}

async fn run_command(state: &AppState, router: &Router, screen: &Screen, line: &str) -> AppResult<()> {
    let args: Vec<&str> = line.split_whitespace().collect();
    match args.as_slice() {
        ["help"] => screen.print(HELP),
        ["login", email, password] => {
            let user = state.auth.login(email, password).await?;
            screen.print(format!("Welcome, {}\n", user.name));
            let home = if user.role == Role::Admin { "/dashboard" } else { "/courses" };
            router.navigate(home);
        }
        ["logout"] => {
            state.auth.logout();
            screen.print("Logged out\n");
            router.navigate("/login");
        }
        ["register", name, email, password] => {
            let user = state
                .auth
                .register(&NewUser::visitor(name, email, password))
                .await?;
            screen.print(format!("Registered {}. You can log in now.\n", user.email));
            router.navigate("/login");
        }
        ["enroll", course_id] => {
            let user_id = require_visitor(state)?;
            let enrollment = state
                .enrollments
                .create_enrollment(&user_id, &RecordId::from(*course_id))
                .await?;
            screen.print(format!("Enrolled (enrollment {})\n", enrollment.id));
            show(router, "/my-courses");
        }
        ["cancel", course_id] => {
            let user_id = require_visitor(state)?;
            state
                .enrollments
                .cancel_enrollment(&user_id, &RecordId::from(*course_id))
                .await?;
            screen.print("Enrollment cancelled\n");
            show(router, "/my-courses");
        }
        ["role", user_id, role] => {
            if !state.auth.is_admin() {
                return Err(AppError::InvalidCredentials(
                    "Only admins can change roles".to_string(),
                ));
            }
            let role = Role::parse(role).ok_or_else(|| {
                AppError::Validation(format!("Unknown role {}", role))
            })?;
            let user = state.users.change_role(&RecordId::from(*user_id), role).await?;
            screen.print(format!("{} is now {}\n", user.email, user.role));
        }
        ["passwd", current, new] => {
            state.auth.change_password(current, new).await?;
            screen.print("Password changed\n");
        }
        _ => screen.print(format!("Unknown command: {}\n{}", line, HELP)),
    }
    Ok(())
}

fn require_visitor(state: &AppState) -> AppResult<RecordId> {
    match state.auth.current_user() {
        Some(user) if user.role == Role::Visitor => Ok(user.id),
        Some(_) => Err(AppError::Conflict(
            "Only visitors can enroll in courses".to_string(),
        )),
        None => Err(AppError::InvalidCredentials(
            "Log in first".to_string(),
        )),
    }
}

/// Navigate to `path`, re-rendering it if it is already the current fragment.
fn show(router: &Router, path: &str) {
    if router.location().fragment() == router.normalize(path) {
        router.handle_fragment_change();
    } else {
        router.navigate(path);
    }
}
