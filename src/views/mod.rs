//! Views shown by the terminal shell.
//!
//! Every view fetches through the services, builds a view model and hands the rendered
//! text to the [`Screen`].

mod render;

pub use render::*;

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::AppResult;
use crate::router::{FnView, View, ViewContext};
use crate::AppState;

/// Output sink for views.
///
/// Only the most recent view may print: starting a new one aborts whatever fetch the
/// previous view still had in flight.
pub struct Screen {
    tx: mpsc::UnboundedSender<String>,
    active: Mutex<Option<JoinHandle<()>>>,
}

impl Screen {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let screen = Arc::new(Self {
            tx,
            active: Mutex::new(None),
        });
        (screen, rx)
    }

    /// Print immediately, outside of any view.
    pub fn print(&self, text: impl Into<String>) {
        // The receiver only goes away at shutdown
        let _ = self.tx.send(text.into());
    }

    /// Run a view's work, replacing the previous view's.
    pub fn show<F>(&self, header: String, work: F)
    where
        F: Future<Output = AppResult<String>> + Send + 'static,
    {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let body = match work.await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("View failed: {}", e);
                    render_error(&e)
                }
            };
            let _ = tx.send(format!("{}{}", header, body));
        });

        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

fn view<F, Fut>(state: &AppState, screen: &Arc<Screen>, build: F) -> Arc<dyn View>
where
    F: Fn(AppState, ViewContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<String>> + Send + 'static,
{
    let state = state.clone();
    let screen = screen.clone();
    Arc::new(FnView(move |ctx: ViewContext| {
        let header = render_header(&ctx.title, ctx.user.as_ref());
        screen.show(header, build(state.clone(), ctx));
    }))
}

async fn courses_page(state: AppState, _ctx: ViewContext) -> AppResult<String> {
    let courses = state.courses.available().await?;
    let cards: Vec<CourseCard> = courses.iter().map(CourseCard::from).collect();
    Ok(render_course_list(&cards))
}

async fn login_page(_state: AppState, ctx: ViewContext) -> AppResult<String> {
    Ok(match ctx.user {
        Some(user) => format!("Already logged in as {}. Use `logout` to switch.\n", user.email),
        None => "login <email> <password>\n".to_string(),
    })
}

async fn register_page(_state: AppState, _ctx: ViewContext) -> AppResult<String> {
    Ok("register <name> <email> <password>\n".to_string())
}

async fn my_courses_page(state: AppState, ctx: ViewContext) -> AppResult<String> {
    let Some(user) = ctx.user else {
        return Ok(String::new());
    };
    let entries = state.enrollments.user_courses(&user.id).await?;
    Ok(render_my_courses(&entries))
}

async fn dashboard_page(state: AppState, ctx: ViewContext) -> AppResult<String> {
    let model = DashboardModel {
        admin_name: ctx.user.map(|u| u.name).unwrap_or_default(),
        users: state.users.stats().await?,
        courses: state.courses.stats().await?,
        enrollments: state.enrollments.all().await?.len(),
    };
    Ok(render_dashboard(&model))
}

async fn users_page(state: AppState, _ctx: ViewContext) -> AppResult<String> {
    Ok(render_users(&state.users.all().await?))
}

async fn courses_admin_page(state: AppState, _ctx: ViewContext) -> AppResult<String> {
    let courses = state.courses.all().await?;
    let cards: Vec<CourseCard> = courses.iter().map(CourseCard::from).collect();
    Ok(render_course_list(&cards))
}

async fn enrollments_page(state: AppState, _ctx: ViewContext) -> AppResult<String> {
    Ok(render_enrollments(&state.enrollments.all().await?))
}

async fn reports_page(state: AppState, _ctx: ViewContext) -> AppResult<String> {
    let courses = state.courses.stats().await?;
    let enrollments = state.enrollments.stats().await?;
    Ok(render_reports(&courses, &enrollments))
}

pub fn courses_view(state: &AppState, screen: &Arc<Screen>) -> Arc<dyn View> {
    view(state, screen, courses_page)
}

pub fn login_view(state: &AppState, screen: &Arc<Screen>) -> Arc<dyn View> {
    view(state, screen, login_page)
}

pub fn register_view(state: &AppState, screen: &Arc<Screen>) -> Arc<dyn View> {
    view(state, screen, register_page)
}

pub fn my_courses_view(state: &AppState, screen: &Arc<Screen>) -> Arc<dyn View> {
    view(state, screen, my_courses_page)
}

pub fn dashboard_view(state: &AppState, screen: &Arc<Screen>) -> Arc<dyn View> {
    view(state, screen, dashboard_page)
}

pub fn users_view(state: &AppState, screen: &Arc<Screen>) -> Arc<dyn View> {
    view(state, screen, users_page)
}

pub fn courses_admin_view(state: &AppState, screen: &Arc<Screen>) -> Arc<dyn View> {
    view(state, screen, courses_admin_page)
}

pub fn enrollments_view(state: &AppState, screen: &Arc<Screen>) -> Arc<dyn View> {
    view(state, screen, enrollments_page)
}

pub fn reports_view(state: &AppState, screen: &Arc<Screen>) -> Arc<dyn View> {
    view(state, screen, reports_page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_superseded_view_never_prints() {
        let (screen, mut rx) = Screen::new();

        screen.show("slow\n".to_string(), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, AppError>("stale".to_string())
        });
        screen.show("fast\n".to_string(), async {
            Ok::<_, AppError>("fresh".to_string())
        });

        let first = rx.recv().await.unwrap();
        assert_eq!(first, "fast\nfresh");

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_view_error_renders_banner() {
        let (screen, mut rx) = Screen::new();
        screen.show("h\n".to_string(), async {
            Err::<String, _>(AppError::Conflict("Course is full".to_string()))
        });
        assert_eq!(rx.recv().await.unwrap(), "h\n!! Course is full\n");
    }
}
