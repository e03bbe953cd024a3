use crate::http::{make_boxed_error_response, make_boxed_response};
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

/// What the admin listener reports about the service it sits next to.
pub trait ServiceStatus: Send + Sync + 'static {
    fn is_ready(&self) -> bool;

    /// Free-form counters rendered on `/stats`.
    fn stats(&self) -> serde_json::Value;
}

/// Serves `/health`, `/ready` and `/stats` on the admin listener.
pub struct AdminService<E> {
    status: Arc<dyn ServiceStatus>,
    _error: PhantomData<fn() -> E>,
}

impl<E> AdminService<E> {
    pub fn new(status: Arc<dyn ServiceStatus>) -> Self {
        Self {
            status,
            _error: PhantomData,
        }
    }
}

impl<E> Service<Request<Incoming>> for AdminService<E>
where
    E: Send + 'static,
{
    type Response = Response<BoxBody<Bytes, E>>;
    type Error = E;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let res = route(self.status.as_ref(), req.uri().path());
        Box::pin(async move { Ok(res) })
    }
}

fn route<E: 'static>(status: &dyn ServiceStatus, path: &str) -> Response<BoxBody<Bytes, E>> {
    match path {
        "/health" => make_boxed_response(StatusCode::OK, "ok\n"),
        "/ready" => match status.is_ready() {
            true => make_boxed_response(StatusCode::OK, "ok\n"),
            false => make_boxed_error_response(StatusCode::SERVICE_UNAVAILABLE),
        },
        "/stats" => {
            let mut res = make_boxed_response(StatusCode::OK, status.stats().to_string());
            res.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            res
        }
        _ => make_boxed_error_response(StatusCode::NOT_FOUND),
    }
}
