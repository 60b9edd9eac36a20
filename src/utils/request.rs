use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequest, FromRequestParts, Query, Request},
    http::{header, request::Parts, HeaderMap},
    Form,
};
use serde::de::DeserializeOwned;
use std::{convert::Infallible, net::SocketAddr};

use crate::errors::AppError;

/// Address and user agent of the caller, as recorded for login attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientInfo {
    pub ip_addr: String,
    pub user_agent: String,
}

impl ClientInfo {
    pub fn from_parts(headers: &HeaderMap, remote: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let ip_addr = match (forwarded, remote) {
            (Some(ip), _) => ip.to_string(),
            (None, Some(addr)) => addr.ip().to_string(),
            (None, None) => "unknown".to_string(),
        };

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Self {
            ip_addr,
            user_agent,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let remote = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::from_parts(&parts.headers, remote))
    }
}

/// Request parameters read from a url-encoded form body, or from the query
/// string for any other request.
#[derive(Debug)]
pub struct Params<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            return Ok(Params(value));
        }

        let Query(value) = Query::<T>::try_from_uri(req.uri())
            .map_err(|e| AppError::Validation(e.body_text()))?;
        Ok(Params(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));

        let info = ClientInfo::from_parts(&headers, Some("127.0.0.1:5000".parse().unwrap()));
        assert_eq!(info.ip_addr, "203.0.113.7");
        assert_eq!(info.user_agent, "curl/8.0");
    }

    #[test]
    fn test_client_ip_falls_back_to_socket() {
        let headers = HeaderMap::new();
        let info = ClientInfo::from_parts(&headers, Some("192.168.1.20:443".parse().unwrap()));
        assert_eq!(info.ip_addr, "192.168.1.20");
        assert_eq!(info.user_agent, "unknown");

        let info = ClientInfo::from_parts(&headers, None);
        assert_eq!(info.ip_addr, "unknown");
    }
}
