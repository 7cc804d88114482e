//! Per-route cross-origin policy.
//!
//! Origins are matched by exact string equality against an allow-list. A
//! request from an unknown origin is still served; it simply gets no CORS
//! headers and the browser enforces the rejection. Preflight `OPTIONS`
//! requests are answered here with `204` and never reach a handler.

use anyhow::{Context, Result, anyhow};
use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
        header::{
            ACCEPT, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
            ACCESS_CONTROL_EXPOSE_HEADERS, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, ORIGIN,
            VARY,
        },
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{collections::HashSet, sync::Arc};
use tracing::debug;
use url::Url;

/// Exact-match set of origins (`scheme://host[:port]`).
#[derive(Debug, Clone, Default)]
pub struct OriginAllowList {
    origins: HashSet<String>,
}

impl OriginAllowList {
    /// Build an allow-list from already normalized origins.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            origins: origins
                .into_iter()
                .map(Into::into)
                .filter(|origin: &String| !origin.is_empty())
                .collect(),
        }
    }

    /// Parse configured origins, rejecting anything that is not a bare origin.
    ///
    /// # Errors
    /// Returns an error if an entry is not an absolute URL or carries a path, query or fragment.
    pub fn parse(origins: &[String]) -> Result<Self> {
        let normalized = origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .map(normalize_origin)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(normalized))
    }

    /// Empty origins never match.
    #[must_use]
    pub fn contains(&self, origin: &str) -> bool {
        !origin.is_empty() && self.origins.contains(origin)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

fn normalize_origin(origin: &str) -> Result<String> {
    let parsed = Url::parse(origin).with_context(|| format!("Invalid origin: {origin}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Origin must include a valid host: {origin}"))?;

    if parsed.path() != "/" || parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(anyhow!(
            "Origin must not include a path, query or fragment: {origin}"
        ));
    }

    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));

    Ok(format!("{}://{}{}", parsed.scheme(), host, port))
}

/// CORS settings for a group of routes.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_list: OriginAllowList,
    allow_methods: Vec<Method>,
    allow_headers: Vec<HeaderName>,
    expose_headers: Vec<HeaderName>,
}

impl CorsPolicy {
    /// Policy with the frontend defaults: common methods, JSON and auth headers,
    /// `Content-Length` exposed and credentials allowed.
    #[must_use]
    pub fn new(allow_list: OriginAllowList) -> Self {
        Self {
            allow_list,
            allow_methods: vec![
                Method::GET,
                Method::PATCH,
                Method::POST,
                Method::HEAD,
                Method::DELETE,
                Method::OPTIONS,
            ],
            allow_headers: vec![
                CONTENT_TYPE,
                HeaderName::from_static("x-xsrf-token"),
                ACCEPT,
                ORIGIN,
                HeaderName::from_static("x-requested-with"),
                AUTHORIZATION,
            ],
            expose_headers: vec![CONTENT_LENGTH],
        }
    }

    /// Return the request's `Origin` header if it is on the allow-list.
    #[must_use]
    pub fn allowed_origin<'a>(&self, headers: &'a HeaderMap) -> Option<&'a HeaderValue> {
        let origin = headers.get(ORIGIN)?;
        let value = origin.to_str().ok()?;
        self.allow_list.contains(value).then_some(origin)
    }

    fn apply(&self, origin: &HeaderValue, headers: &mut HeaderMap, preflight: bool) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );

        if let Some(value) = join_values(self.expose_headers.iter().map(HeaderName::as_str)) {
            headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, value);
        }

        if preflight {
            if let Some(value) = join_values(self.allow_methods.iter().map(Method::as_str)) {
                headers.insert(ACCESS_CONTROL_ALLOW_METHODS, value);
            }
            if let Some(value) = join_values(self.allow_headers.iter().map(HeaderName::as_str)) {
                headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, value);
            }
        }
    }
}

fn join_values<'a>(items: impl Iterator<Item = &'a str>) -> Option<HeaderValue> {
    let joined = items.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        return None;
    }
    HeaderValue::from_str(&joined).ok()
}

/// Middleware: inject CORS headers for allowed origins and answer preflight requests.
pub async fn origin_policy(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = policy.allowed_origin(request.headers()).cloned();

    if origin.is_none()
        && let Some(rejected) = request.headers().get(ORIGIN)
    {
        debug!("origin not in allow-list: {:?}", rejected);
    }

    let preflight = request.method() == Method::OPTIONS;
    let mut response = if preflight {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    // the response depends on Origin even when no CORS headers are sent
    response
        .headers_mut()
        .append(VARY, HeaderValue::from_static("Origin"));

    if let Some(origin) = &origin {
        policy.apply(origin, response.headers_mut(), preflight);
    }

    response
}
