use std::sync::Arc;

use lambda_http::{http::Method, Body, Error, Request, RequestExt, Response};
use listings_shared::{
    auth,
    error::ApiError,
    posts::{self, PostFilter},
    response,
    types::Principal,
    users, AppState,
};
use tracing::Instrument;

/// The parts of an API Gateway event the routes look at.
#[derive(Debug, Default)]
pub(crate) struct ApiRequest<'a> {
    pub method: Method,
    pub path: &'a str,
    pub keyword: Option<&'a str>,
    pub lat: Option<&'a str>,
    pub long: Option<&'a str>,
    pub principal: Option<Principal>,
    pub body: &'a [u8],
}

impl<'a> ApiRequest<'a> {
    fn from_event(event: &'a Request) -> Self {
        let query = event.query_string_parameters_ref();

        // The token authorizer's context arrives as free-form authorizer fields.
        let principal = event
            .request_context_ref()
            .and_then(|ctx| ctx.authorizer())
            .and_then(|auth| Principal::from_context(&auth.fields));

        Self {
            method: event.method().clone(),
            path: event.uri().path(),
            keyword: query.and_then(|q| q.first("keyword")),
            lat: query.and_then(|q| q.first("lat")),
            long: query.and_then(|q| q.first("long")),
            principal,
            body: event.body(),
        }
    }

    fn principal(&self) -> Result<&Principal, ApiError> {
        self.principal.as_ref().ok_or(ApiError::Unauthorized)
    }
}

/// Main Lambda handler. Every outcome, including failures, becomes an HTTP
/// response; nothing is surfaced to the runtime as an error.
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let request = ApiRequest::from_event(&event);
    Ok(handle(&state, &request).await)
}

pub(crate) async fn handle(state: &AppState, request: &ApiRequest<'_>) -> Response<Body> {
    let span = tracing::info_span!(
        "request",
        method = %request.method,
        path = request.path,
        user = request.principal.as_ref().map(|p| p.email.as_str()),
    );

    async {
        tracing::info!("API Lambda invoked");
        match route(state, request).await {
            Ok(resp) => {
                tracing::info!(status = resp.status().as_u16(), "Request handled");
                resp
            }
            Err(e) => e.into_response(),
        }
    }
    .instrument(span)
    .await
}

async fn route(state: &AppState, req: &ApiRequest<'_>) -> Result<Response<Body>, ApiError> {
    if req.method == Method::OPTIONS {
        return Ok(response::preflight());
    }

    let parts: Vec<&str> = req.path.split('/').filter(|s| !s.is_empty()).collect();

    match (&req.method, parts.as_slice()) {
        // Users
        (&Method::POST, ["users"]) => auth::register(state, req.body).await,
        (&Method::GET, ["users", "me"]) => users::get_me(state, req.principal()?).await,
        (&Method::GET, ["users", "posts"]) => {
            posts::list_author_posts(state, req.principal()?).await
        }
        (&Method::GET, ["users", ..]) => Err(ApiError::Forbidden),
        (_, ["users", ..]) => Err(ApiError::MethodNotAllowed),

        // Login
        (&Method::POST, ["login"]) => auth::login(state, req.body).await,
        (_, ["login"]) => Err(ApiError::MethodNotAllowed),

        // Posts
        (&Method::POST, ["posts"]) => posts::create_post(state, req.principal()?, req.body).await,
        (&Method::GET, ["posts"]) => {
            req.principal()?;
            let filter = PostFilter::from_query(req.keyword, req.lat, req.long)?;
            posts::list_posts(state, &filter).await
        }
        (&Method::GET, ["posts", post_id]) => {
            req.principal()?;
            posts::get_post(state, post_id).await
        }
        (_, ["posts"] | ["posts", _]) => Err(ApiError::MethodNotAllowed),

        _ => Err(ApiError::RouteNotFound),
    }
}
