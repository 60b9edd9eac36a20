use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use std::net::SocketAddr;

use crate::{
    auth::{parse_basic_credentials, Claims, Principal, SESSION_COOKIE},
    errors::{AppError, Result},
    handlers::AppState,
    utils::ClientInfo,
};

/// What a request must present to reach its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

/// True when `path` is `prefix` itself or lies beneath it.
fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .map(|rest| rest.is_empty() || rest.starts_with('/'))
        .unwrap_or(false)
}

/// Access rules, first match wins.
pub fn required_access(method: &Method, path: &str) -> Access {
    if path == "/" || under(path, "/api/auth") {
        return Access::Public;
    }

    if under(path, "/api/categories") {
        if method == Method::GET && path == "/api/categories/all" {
            return Access::Public;
        }
        return Access::Admin;
    }

    if under(path, "/api/upload") || under(path, "/api/jobs") || under(path, "/api/actuator") {
        return Access::Admin;
    }

    if (method == Method::DELETE && under(path, "/api/photos/delete"))
        || (method == Method::PUT && under(path, "/api/photos/rotate"))
    {
        return Access::Admin;
    }

    if method == Method::GET && under(path, "/api/photos") {
        return Access::Public;
    }

    Access::Authenticated
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

/// Works out who is calling. Session tokens that fail to verify are treated
/// as anonymous; Basic credentials go through the full login checks.
async fn resolve_principal(
    state: &AppState,
    headers: &HeaderMap,
    remote: Option<SocketAddr>,
) -> Result<Option<(Principal, Option<Claims>)>> {
    if let Some(token) = bearer_token(headers).or_else(|| cookie_token(headers)) {
        if let Some((principal, claims)) = state.auth.verify_session(&token) {
            return Ok(Some((principal, Some(claims))));
        }
    }

    let basic = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_basic_credentials);

    if let Some((username, password)) = basic {
        let client = ClientInfo::from_parts(headers, remote);

        let principal = state
            .auth
            .login(&username, &password, &client.ip_addr, &client.user_agent)
            .await?;
        return Ok(Some((principal, None)));
    }

    Ok(None)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Authentication required", "status": 401 })),
    )
        .into_response()
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let principal = match resolve_principal(&state, request.headers(), remote).await {
        Ok(principal) => principal,
        Err(AppError::TooManyAttempts) => {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "message": AppError::TooManyAttempts.to_string() })),
            )
                .into_response()
        }
        Err(e) => return e.into_response(),
    };

    let access = required_access(request.method(), request.uri().path());

    match (&principal, access) {
        (_, Access::Public) => {}
        (None, _) => return unauthorized(),
        (Some((p, _)), Access::Admin) if !p.is_admin() => {
            tracing::warn!(username = %p.username, path = %request.uri().path(), "Forbidden");
            return AppError::Forbidden.into_response();
        }
        _ => {}
    }

    if let Some((principal, claims)) = principal {
        if let Some(claims) = claims {
            request.extensions_mut().insert(claims);
        }
        request.extensions_mut().insert(principal);
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_routes() {
        assert_eq!(required_access(&Method::GET, "/"), Access::Public);
        assert_eq!(required_access(&Method::POST, "/api/auth/login"), Access::Public);
        assert_eq!(required_access(&Method::GET, "/api/auth/protected"), Access::Public);
        assert_eq!(required_access(&Method::GET, "/api/categories/all"), Access::Public);
        assert_eq!(required_access(&Method::GET, "/api/photos/abc"), Access::Public);
        assert_eq!(required_access(&Method::GET, "/api/photos/abc/480_x.jpg"), Access::Public);
    }

    #[test]
    fn test_admin_routes() {
        assert_eq!(required_access(&Method::POST, "/api/categories/all"), Access::Admin);
        assert_eq!(required_access(&Method::POST, "/api/categories/create"), Access::Admin);
        assert_eq!(required_access(&Method::PATCH, "/api/categories/name"), Access::Admin);
        assert_eq!(required_access(&Method::POST, "/api/upload/"), Access::Admin);
        assert_eq!(required_access(&Method::GET, "/api/jobs/all"), Access::Admin);
        assert_eq!(required_access(&Method::DELETE, "/api/photos/delete/1"), Access::Admin);
        assert_eq!(required_access(&Method::PUT, "/api/photos/rotate/1"), Access::Admin);
        assert_eq!(required_access(&Method::GET, "/api/actuator/health"), Access::Admin);
    }

    #[test]
    fn test_everything_else_needs_login() {
        assert_eq!(required_access(&Method::GET, "/api/"), Access::Authenticated);
        assert_eq!(required_access(&Method::POST, "/api/photos/abc"), Access::Authenticated);
        assert_eq!(required_access(&Method::GET, "/api/uploads"), Access::Authenticated);
        assert_eq!(required_access(&Method::GET, "/elsewhere"), Access::Authenticated);
    }
}
