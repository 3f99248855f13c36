//! Page routes. Pages come from `static_dir` when configured; otherwise a
//! bare fallback is served so the server is usable without assets.

use axum::{Extension, Router, extract::State, response::Html, routing::get};

use crate::session::CurrentUser;
use crate::state::AppState;

/// Pages that need a session; mounted behind the page guard
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route("/register", get(register_page))
}

async fn index(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Html<String> {
    if let Some(page) = static_page(&state, "index.html").await {
        return Html(page);
    }
    Html(format!(
        "<!doctype html><title>calnotes</title>\
         <p>Logged in as {}. <a href=\"/logout\">Log out</a></p>",
        escape_html(&user.username)
    ))
}

async fn login_page(State(state): State<AppState>) -> Html<String> {
    match static_page(&state, "login.html").await {
        Some(page) => Html(page),
        None => Html(credentials_form("Log in", "/login")),
    }
}

async fn register_page(State(state): State<AppState>) -> Html<String> {
    match static_page(&state, "register.html").await {
        Some(page) => Html(page),
        None => Html(credentials_form("Register", "/register")),
    }
}

async fn static_page(state: &AppState, name: &str) -> Option<String> {
    let path = state.static_dir.as_ref()?.join(name);
    tokio::fs::read_to_string(path).await.ok()
}

fn credentials_form(title: &str, action: &str) -> String {
    format!(
        "<!doctype html><title>{title}</title>\
         <form method=\"post\" action=\"{action}\">\
         <input name=\"username\" placeholder=\"username\" required>\
         <input name=\"password\" type=\"password\" placeholder=\"password\" required>\
         <button>{title}</button></form>"
    )
}

fn escape_html(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '&' => "&amp;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            c => c.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>&'\""), "&lt;b&gt;&amp;&#39;&quot;");
        assert_eq!(escape_html("alice"), "alice");
    }
}
