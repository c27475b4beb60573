//! Session Gate
//!
//! Axum middleware that maps an inbound request to an authenticated
//! identity before any upload staging or model dispatch happens. One gate
//! is constructed per process and handed to the router by state, not held
//! as a global.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::session::SessionStore;
use crate::error::ApiError;

/// Name of the cookie carrying the opaque session token
pub const SESSION_COOKIE: &str = "session";

/// Authenticated user injected into request extensions by the gate
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

pub struct SessionGate {
    store: Arc<SessionStore>,
}

impl SessionGate {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Resolve the session cookie in a request to an identity, if any
    pub fn authenticate(&self, req: &Request) -> Option<AuthUser> {
        let token = token_from_headers(req)?;
        let session = self.store.get(token)?;
        Some(AuthUser {
            id: session.user_id,
            email: session.email,
        })
    }

    /// Middleware for capability-invoking endpoints: reject unauthenticated
    /// callers with the 401 shape before the handler runs.
    pub async fn require_session(
        State(gate): State<Arc<SessionGate>>,
        mut req: Request,
        next: Next,
    ) -> Result<Response, ApiError> {
        match gate.authenticate(&req) {
            Some(user) => {
                tracing::debug!("Session gate passed for {}", user.email);
                req.extensions_mut().insert(user);
                Ok(next.run(req).await)
            }
            None => {
                tracing::warn!("Unauthenticated request to {}", req.uri().path());
                Err(ApiError::Unauthenticated)
            }
        }
    }
}

/// Pull the session token out of the Cookie header
fn token_from_headers(req: &Request) -> Option<Uuid> {
    let cookie_header = req.headers().get(header::COOKIE)?.to_str().ok()?;
    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie.strip_prefix(SESSION_COOKIE).and_then(|c| c.strip_prefix('=')) {
            return Uuid::parse_str(value).ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn gate_with_session() -> (SessionGate, Uuid) {
        let store = Arc::new(SessionStore::new(24));
        let token = store.create(Uuid::new_v4(), "gated@example.com");
        (SessionGate::new(store), token)
    }

    fn request_with_cookie(cookie: &str) -> Request {
        Request::builder()
            .uri("/analyze-soil")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn valid_token_resolves_to_identity() {
        let (gate, token) = gate_with_session();
        let req = request_with_cookie(&format!("session={token}"));
        let user = gate.authenticate(&req).unwrap();
        assert_eq!(user.email, "gated@example.com");
    }

    #[test]
    fn token_is_found_among_other_cookies() {
        let (gate, token) = gate_with_session();
        let req = request_with_cookie(&format!("theme=dark; session={token}; lang=en"));
        assert!(gate.authenticate(&req).is_some());
    }

    #[test]
    fn missing_cookie_is_unauthenticated() {
        let (gate, _) = gate_with_session();
        let req = Request::builder().body(Body::empty()).unwrap();
        assert!(gate.authenticate(&req).is_none());
    }

    #[test]
    fn unknown_and_malformed_tokens_are_unauthenticated() {
        let (gate, _) = gate_with_session();

        let req = request_with_cookie(&format!("session={}", Uuid::new_v4()));
        assert!(gate.authenticate(&req).is_none());

        let req = request_with_cookie("session=not-a-uuid");
        assert!(gate.authenticate(&req).is_none());
    }

    #[test]
    fn destroyed_session_no_longer_authenticates() {
        let (gate, token) = gate_with_session();
        gate.store().destroy(token);
        let req = request_with_cookie(&format!("session={token}"));
        assert!(gate.authenticate(&req).is_none());
    }

    mod middleware {
        use super::*;
        use std::sync::atomic::{AtomicBool, Ordering};

        use axum::Router;
        use axum::body::to_bytes;
        use axum::http::{Method, StatusCode};
        use axum::middleware::from_fn_with_state;
        use axum::routing::post;
        use tower::ServiceExt;

        /// Router with one gated route that records whether the handler ran
        fn gated_router(gate: Arc<SessionGate>, reached: Arc<AtomicBool>) -> Router {
            Router::new()
                .route(
                    "/analyze-soil",
                    post(move || {
                        let reached = reached.clone();
                        async move {
                            reached.store(true, Ordering::SeqCst);
                            "ok"
                        }
                    }),
                )
                .layer(from_fn_with_state(gate, SessionGate::require_session))
        }

        #[tokio::test]
        async fn unauthenticated_request_gets_401_and_never_reaches_the_handler() {
            let store = Arc::new(SessionStore::new(24));
            let gate = Arc::new(SessionGate::new(store));
            let reached = Arc::new(AtomicBool::new(false));
            let app = gated_router(gate, reached.clone());

            let response = app
                .oneshot(
                    Request::builder()
                        .method(Method::POST)
                        .uri("/analyze-soil")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "Authentication required");
            assert!(!reached.load(Ordering::SeqCst));
        }

        #[tokio::test]
        async fn authenticated_request_passes_through_the_gate() {
            let store = Arc::new(SessionStore::new(24));
            let token = store.create(Uuid::new_v4(), "farmer@example.com");
            let gate = Arc::new(SessionGate::new(store));
            let reached = Arc::new(AtomicBool::new(false));
            let app = gated_router(gate, reached.clone());

            let response = app
                .oneshot(
                    Request::builder()
                        .method(Method::POST)
                        .uri("/analyze-soil")
                        .header(header::COOKIE, format!("session={token}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert!(reached.load(Ordering::SeqCst));
        }
    }
}
