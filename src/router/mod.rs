//! Fragment router.
//!
//! The fragment held by [`Location`] is the only routing state. [`Router::navigate`]
//! changes it, and [`Router::run`] reacts to every change by resolving the new path
//! against the route table and the auth/role gates.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;

use crate::auth::AuthService;
use crate::models::{Role, User};

/// Source of the logged-in user consulted by the gates.
pub trait SessionSource: Send + Sync {
    fn current_user(&self) -> Option<User>;
}

impl SessionSource for AuthService {
    fn current_user(&self) -> Option<User> {
        AuthService::current_user(self)
    }
}

/// What a view receives when its route is entered.
#[derive(Debug, Clone)]
pub struct ViewContext {
    pub path: String,
    pub title: String,
    pub user: Option<User>,
}

/// Something the router can show.
///
/// `render` is called synchronously and must not block; views that need data spawn
/// their own work. The router neither awaits nor retries them.
pub trait View: Send + Sync {
    fn render(&self, ctx: ViewContext);
}

/// Adapter turning a closure into a [`View`].
pub struct FnView<F>(pub F);

impl<F> View for FnView<F>
where
    F: Fn(ViewContext) + Send + Sync,
{
    fn render(&self, ctx: ViewContext) {
        (self.0)(ctx)
    }
}

/// A route table entry.
#[derive(Clone)]
pub struct Route {
    pub title: String,
    pub view: Arc<dyn View>,
    pub requires_auth: bool,
    /// Roles allowed in; empty means any
    pub roles: Vec<Role>,
}

impl Route {
    pub fn public(title: &str, view: Arc<dyn View>) -> Self {
        Self {
            title: title.to_string(),
            view,
            requires_auth: false,
            roles: Vec::new(),
        }
    }

    pub fn authenticated(title: &str, view: Arc<dyn View>) -> Self {
        Self {
            requires_auth: true,
            ..Self::public(title, view)
        }
    }

    pub fn for_role(title: &str, view: Arc<dyn View>, role: Role) -> Self {
        Self {
            roles: vec![role],
            ..Self::authenticated(title, view)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    NotFound,
    Unauthenticated,
    Forbidden,
}

/// Outcome of resolving one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Rendered { path: String },
    Redirected { to: String, reason: RedirectReason },
}

/// Fallback paths used by the gates.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub default_route: String,
    pub login_route: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_route: "/courses".to_string(),
            login_route: "/login".to_string(),
        }
    }
}

/// Holder of the current fragment.
#[derive(Debug)]
pub struct Location {
    tx: watch::Sender<String>,
}

impl Location {
    pub fn new(initial: &str) -> Self {
        let (tx, _rx) = watch::channel(initial.to_string());
        Self { tx }
    }

    pub fn fragment(&self) -> String {
        self.tx.borrow().clone()
    }

    /// Set the fragment. Subscribers are only woken when the value actually changes.
    pub fn set(&self, fragment: &str) -> bool {
        self.tx.send_if_modified(|current| {
            if current == fragment {
                false
            } else {
                *current = fragment.to_string();
                true
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }
}

pub struct Router {
    routes: HashMap<String, Route>,
    config: RouterConfig,
    session: Arc<dyn SessionSource>,
    location: Arc<Location>,
    current: RwLock<Option<String>>,
}

impl Router {
    pub fn new(
        config: RouterConfig,
        session: Arc<dyn SessionSource>,
        location: Arc<Location>,
    ) -> Self {
        Self {
            routes: HashMap::new(),
            config,
            session,
            location,
            current: RwLock::new(None),
        }
    }

    /// Register a route. Paths are normalized the same way navigation paths are.
    pub fn route(mut self, path: &str, route: Route) -> Self {
        let path = self.normalize(path);
        self.routes.insert(path, route);
        self
    }

    pub fn location(&self) -> &Arc<Location> {
        &self.location
    }

    /// Last path whose view was rendered.
    pub fn current_path(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn title_of(&self, path: &str) -> Option<&str> {
        self.routes
            .get(&self.normalize(path))
            .map(|r| r.title.as_str())
    }

    /// `#/x`, `x` and `/x` all name the same route; empty means the default route.
    pub fn normalize(&self, raw: &str) -> String {
        let path = raw.trim().trim_start_matches('#');
        if path.is_empty() || path == "/" {
            return self.config.default_route.clone();
        }
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        }
    }

    /// Change the fragment. Resolution happens when the change is observed.
    pub fn navigate(&self, path: &str) {
        let path = self.normalize(path);
        if !self.location.set(&path) {
            tracing::debug!("Already at {}", path);
        }
    }

    /// Resolve a path against the table and the gates, rendering or redirecting.
    pub fn resolve(&self, raw: &str) -> Resolution {
        let path = self.normalize(raw);

        let Some(route) = self.routes.get(&path) else {
            tracing::debug!("No route for {}", path);
            return self.redirect(&self.config.default_route, RedirectReason::NotFound);
        };

        let user = self.session.current_user();

        if route.requires_auth && user.is_none() {
            return self.redirect(&self.config.login_route, RedirectReason::Unauthenticated);
        }

        if !route.roles.is_empty() {
            let allowed = user.as_ref().is_some_and(|u| route.roles.contains(&u.role));
            if !allowed {
                return self.redirect(&self.config.default_route, RedirectReason::Forbidden);
            }
        }

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(path.clone());
        tracing::debug!("Rendering {}", path);
        route.view.render(ViewContext {
            path: path.clone(),
            title: route.title.clone(),
            user,
        });

        Resolution::Rendered { path }
    }

    /// Resolve whatever the fragment currently holds.
    pub fn handle_fragment_change(&self) -> Resolution {
        let fragment = self.location.fragment();
        self.resolve(&fragment)
    }

    /// React to fragment changes for as long as the task runs.
    ///
    /// Resolves the initial fragment first, mirroring a page load.
    pub async fn run(self: Arc<Self>) {
        let mut rx = self.location.subscribe();
        let initial = rx.borrow_and_update().clone();
        self.resolve(&initial);

        while rx.changed().await.is_ok() {
            let fragment = rx.borrow_and_update().clone();
            self.resolve(&fragment);
        }
    }

    fn redirect(&self, to: &str, reason: RedirectReason) -> Resolution {
        tracing::info!("Redirecting to {} ({:?})", to, reason);
        if !self.location.set(to) {
            tracing::warn!("Redirect target {} is already the current fragment", to);
        }
        Resolution::Redirected {
            to: to.to_string(),
            reason,
        }
    }
}
