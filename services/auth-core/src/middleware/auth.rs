//! Auth gate Tower layer.
//!
//! Runs an [`AuthGate`] in front of an HTTP service. Allowed requests carry
//! a [`VerifiedIdentity`](crate::gate::VerifiedIdentity) in their extensions;
//! rejected ones are answered here with an empty body, the mapped status and
//! an `x-correlation-id` header. The inner service is never called on
//! rejection.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use http::{HeaderName, HeaderValue, Request, Response, StatusCode};
use tower::{Layer, Service};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::error::{AuthError, ErrorResponse};
use crate::gate::{AuthGate, GateDecision, GateStage, Rejection};
use crate::observability::{log_allowed, log_rejection};

/// Response header carrying the correlation id of a rejection.
pub const CORRELATION_ID_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

/// Auth gate layer for Tower
#[derive(Debug, Clone)]
pub struct AuthGateLayer {
    gate: Arc<AuthGate>,
}

impl AuthGateLayer {
    /// Creates a layer sharing `gate`.
    #[must_use]
    pub fn new(gate: AuthGate) -> Self {
        Self {
            gate: Arc::new(gate),
        }
    }
}

impl<S> Layer<S> for AuthGateLayer {
    type Service = AuthGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthGateService {
            inner,
            gate: Arc::clone(&self.gate),
        }
    }
}

/// Auth gate service wrapper
#[derive(Debug)]
pub struct AuthGateService<S> {
    inner: S,
    gate: Arc<AuthGate>,
}

impl<S: Clone> Clone for AuthGateService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for AuthGateService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let correlation_id = Uuid::new_v4();
        let gate = Arc::clone(&self.gate);
        // Use the instance that was driven to readiness
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let span = info_span!(
            "auth_gate",
            correlation_id = %correlation_id,
            token_type = %gate.expected(),
        );

        Box::pin(
            async move {
                let header = match req.headers().get(AUTHORIZATION).map(HeaderValue::to_str) {
                    None => Ok(None),
                    Some(Ok(value)) => Ok(Some(value.to_owned())),
                    Some(Err(_)) => Err(AuthError::InvalidAuthorizationHeader),
                };

                let decision = match header {
                    Ok(header) => gate.evaluate(header.as_deref()).await,
                    Err(error) => GateDecision::Rejected(Rejection {
                        stage: GateStage::Start,
                        error,
                    }),
                };

                match decision {
                    GateDecision::Allowed(identity) => {
                        log_allowed(&identity, gate.expected(), correlation_id);
                        req.extensions_mut().insert(identity);
                        inner.call(req).await
                    }
                    GateDecision::Rejected(rejection) => {
                        log_rejection(&rejection, gate.expected(), correlation_id);
                        Ok(reject(&rejection.error, correlation_id))
                    }
                }
            }
            .instrument(span),
        )
    }
}

fn reject<B: Default>(error: &AuthError, correlation_id: Uuid) -> Response<B> {
    let body = ErrorResponse::from_error(error, correlation_id);

    let mut response = Response::new(B::default());
    *response.status_mut() = body.status;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        headers.insert(CORRELATION_ID_HEADER, value);
    }
    if body.status == StatusCode::UNAUTHORIZED {
        headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }

    response
}
