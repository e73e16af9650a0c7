//! `AuthLayer`: the seam where real authentication plugs in (spec §1 treats
//! HTTP auth as an external collaborator; SPEC_FULL §4.7 fills in the
//! minimum concrete seam so the routes exist and are testable). Any
//! non-empty bearer token is accepted, and the token string itself becomes
//! the caller's [`Identity`] — which flows into the executor's `client_key`
//! for rate limiting instead of the hard-coded `"default"` the source used.

use std::task::Context;
use std::task::Poll;

use axum::Json;
use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use futures_util::future::BoxFuture;
use serde_json::json;
use tower::Layer;
use tower::Service;

#[derive(Clone, Copy, Default)]
pub struct AuthLayer;

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware { inner }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
}

/// The authenticated caller's identity. Until a real auth system replaces
/// this seam, it is exactly the bearer token presented.
#[derive(Clone, Debug)]
pub struct Identity(pub String);

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        let mut inner = self.inner.clone();
        Box::pin(async move {
            match token {
                Some(token) => {
                    req.extensions_mut().insert(Identity(token));
                    inner.call(req).await
                }
                None => Ok((
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "unauthenticated" })),
                )
                    .into_response()),
            }
        })
    }
}
