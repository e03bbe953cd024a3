use crate::errors::ActivitiesError;
use crate::oauth::OAuthClient;
use crate::service::ActivityService;
use crate::types::ActivityRecord;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

/// Cookie carrying the upstream user id once the OAuth flow completed.
pub const SESSION_COOKIE: &str = "user_id";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ActivityService>,
    pub oauth: Arc<OAuthClient>,
}

pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut router = Router::new()
        .route("/login", get(login))
        .route("/oauth/callback", get(oauth_callback))
        .route("/activities", get(activities));

    if let Some(dir) = static_dir {
        router = router
            .route_service("/", ServeFile::new(dir.join("index.html")))
            .nest_service("/static", ServeDir::new(dir));
    }

    router.with_state(state)
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

async fn login(State(state): State<AppState>) -> Response {
    found(state.oauth.authorize_url().as_str())
}

#[derive(Deserialize, Debug)]
struct CallbackParams {
    code: Option<String>,
}

async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Result<(CookieJar, Response), ActivitiesError> {
    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or(ActivitiesError::MissingCode)?;

    let grant = state.oauth.exchange_code(&code).await.map_err(|e| {
        tracing::error!(error = %e, "authorization code exchange failed");
        ActivitiesError::TokenExchange(e)
    })?;

    state
        .service
        .sessions()
        .insert(&grant.user_id, grant.access_token);
    tracing::info!(user_id = %grant.user_id, "user authorized");

    let cookie = Cookie::build((SESSION_COOKIE, grant.user_id))
        .path("/")
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), found("/")))
}

async fn activities(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Arc<[ActivityRecord]>>, ActivitiesError> {
    let user_id = jar.get(SESSION_COOKIE).map(|cookie| cookie.value());
    state.service.activities(user_id).await.map(Json)
}
