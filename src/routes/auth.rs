//! Registration, login, and logout endpoints

use axum::{
    Form, Json, Router,
    extract::{FromRequest, Request, State},
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use calnotes_core::Session;
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};

use crate::routes::{AppError, SuccessResponse, wants_json};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout).post(logout))
}

/// Username and password, from a form post or a JSON body
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

pub struct Credentials {
    form: CredentialsForm,
    json: bool,
}

impl<S> FromRequest<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json = wants_json(req.headers());
        let json_body = req
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        let form = if json_body {
            let Json(form) = Json::<CredentialsForm>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            form
        } else {
            let Form(form) = Form::<CredentialsForm>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            form
        };

        Ok(Credentials { form, json })
    }
}

/// Reply for JSON clients after login or registration
#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub username: String,
}

/// POST /register - Create an account and log it in
async fn register(
    State(state): State<AppState>,
    credentials: Credentials,
) -> Result<Response, AppError> {
    let Credentials { form, json } = credentials;
    let policy = state.cookies.policy().clone();

    let session = state
        .run(move |store, hasher| {
            let user = calnotes_core::register(store, hasher, &form.username, &form.password)?;
            store.create_session(&user, &policy, Utc::now())
        })
        .await?;

    Ok(session_established(&state, &session, json))
}

/// POST /login - Check credentials and start a session
async fn login(
    State(state): State<AppState>,
    credentials: Credentials,
) -> Result<Response, AppError> {
    let Credentials { form, json } = credentials;
    let policy = state.cookies.policy().clone();

    let session = state
        .run(move |store, hasher| {
            let user = calnotes_core::authenticate(store, hasher, &form.username, &form.password)?;
            store.create_session(&user, &policy, Utc::now())
        })
        .await?;

    info!("login user={}", session.username);
    Ok(session_established(&state, &session, json))
}

fn session_established(state: &AppState, session: &Session, json: bool) -> Response {
    let cookie = [(SET_COOKIE, state.cookies.set_cookie(&session.token))];
    if json {
        let body = Json(LoginResponse {
            success: true,
            username: session.username.clone(),
        });
        (cookie, body).into_response()
    } else {
        (cookie, Redirect::to("/")).into_response()
    }
}

/// GET|POST /logout - Invalidate the session and clear the cookie
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = state.cookies.token_from_headers(&headers) {
        let token = token.to_string();
        if state.run(move |store, _| store.delete_session(&token)).await? {
            info!("logout");
        }
    }

    let cookie = [(SET_COOKIE, state.cookies.clear_cookie())];
    if wants_json(&headers) {
        Ok((cookie, SuccessResponse::ok()).into_response())
    } else {
        Ok((cookie, Redirect::to("/login")).into_response())
    }
}
