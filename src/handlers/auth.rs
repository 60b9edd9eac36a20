use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;

use crate::{
    auth::{Claims, Principal, SESSION_COOKIE},
    errors::{AppError, Result},
    handlers::AppState,
    models::LoginParams,
    utils::{ClientInfo, Params},
};

fn session_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    jar: CookieJar,
    Params(params): Params<LoginParams>,
) -> Result<Response> {
    let outcome = state
        .auth
        .login(
            &params.username,
            &params.password,
            &client.ip_addr,
            &client.user_agent,
        )
        .await;

    match outcome {
        Ok(principal) => {
            let (token, _) = state.auth.issue_session(&principal)?;
            let jar = jar.add(session_cookie(token.clone(), state.config.is_production()));

            Ok((
                jar,
                Json(json!({
                    "message": "Login successful",
                    "username": principal.username,
                    "roles": principal.roles,
                    "token": token,
                })),
            )
                .into_response())
        }
        Err(AppError::TooManyAttempts) => Ok((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "message": AppError::TooManyAttempts.to_string() })),
        )
            .into_response()),
        Err(AppError::Auth(reason)) => Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": format!("Login failed: {}", reason) })),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    session: Option<Extension<Claims>>,
    jar: CookieJar,
) -> Response {
    if let Some(Extension(claims)) = session {
        state.auth.revoke_session(&claims);
        tracing::info!(username = %claims.sub, "User logged out");
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(json!({ "message": "Logged out successfully!" }))).into_response()
}

pub async fn protected(principal: Option<Extension<Principal>>) -> Response {
    match principal {
        Some(Extension(principal)) => Json(json!({
            "message": "Access granted",
            "username": principal.username,
            "authorities": principal.roles,
        }))
        .into_response(),
        None => {
            tracing::warn!("No authenticated principal found");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Unauthorized", "username": null })),
            )
                .into_response()
        }
    }
}
