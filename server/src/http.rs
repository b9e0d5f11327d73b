use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, FromRef, FromRequestParts, Path, Query, State},
    http::{self, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use entity::{PhotoError, PhotoPayload, Role};
use platform_api::ApiError;
use platform_authn::{AuthnError, LoginRequest, RESET_PASSWORD_HINT};
use products_hr::{AnalyticsView, Dashboard, EmployeeDetail, FilterCriteria, PhotoResult};
use serde::{Deserialize, Serialize};
use time::Duration as TimeDuration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    graphql::{self, SchemaType},
    portal::{Portal, RequestSession},
};

const SESSION_COOKIE: &str = "__Host-portal_session";
const LANDING_PAGE: &str = "/list";
const NO_DATA: &str = "No data found.";

#[derive(Clone)]
pub struct AppState {
    pub schema: SchemaType,
    pub portal: Arc<Portal>,
    pub config: Arc<AppConfig>,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, portal: Arc<Portal>) -> Self {
        Self {
            schema: graphql::build_schema(portal.clone()),
            cookie_key: config.cookie_key.clone(),
            portal,
            config,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "portal server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    // `any()` cannot be paired with credentials.
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_credentials(true)
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::POST, Method::GET])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route("/", get(login_view_handler))
        .route("/login", post(login_handler))
        .route("/login/provider", post(provider_login_handler))
        .route("/logout", post(logout_handler))
        .route("/graphql", post(graphql_handler))
        .route("/list", get(list_page))
        .route("/details/{id}", get(details_page))
        .route("/photo-result", get(photo_result_page))
        .route("/analytics", get(analytics_page))
        .route("/photos/{id}", post(upload_photo_handler))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

#[derive(Serialize)]
struct RoleOption {
    value: &'static str,
    label: &'static str,
}

#[derive(Serialize)]
struct LoginView {
    roles: Vec<RoleOption>,
    providers: Vec<String>,
    demo_hint: String,
    reset_hint: &'static str,
}

async fn login_view_handler(State(state): State<AppState>) -> Json<LoginView> {
    let authn = &state.portal.authn;
    Json(LoginView {
        roles: Role::ALL
            .iter()
            .map(|role| RoleOption {
                value: role.as_str(),
                label: role.label(),
            })
            .collect(),
        providers: authn.providers().to_vec(),
        demo_hint: authn.credentials().banner(),
        reset_hint: RESET_PASSWORD_HINT,
    })
}

#[derive(Deserialize)]
struct ProviderLogin {
    provider: String,
    #[serde(default)]
    role: Role,
}

#[derive(Serialize)]
struct SignedIn {
    name: String,
    role: Role,
    provider: Option<String>,
    redirect: &'static str,
}

async fn login_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(request): Json<LoginRequest>,
) -> HttpResult<(PrivateCookieJar, Json<SignedIn>)> {
    let user = state.portal.authn.login(&request).map_err(HttpError::from)?;
    start_session(&state, jar, user).await
}

async fn provider_login_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(request): Json<ProviderLogin>,
) -> HttpResult<(PrivateCookieJar, Json<SignedIn>)> {
    let user = state
        .portal
        .authn
        .provider_login(&request.provider, request.role)
        .map_err(HttpError::from)?;
    start_session(&state, jar, user).await
}

async fn start_session(
    state: &AppState,
    jar: PrivateCookieJar,
    user: entity::SessionUser,
) -> HttpResult<(PrivateCookieJar, Json<SignedIn>)> {
    let sessions = &state.portal.sessions;
    let session_id = sessions.start(user.clone()).await;
    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(sessions.ttl().num_minutes()))
        .build();
    Ok((
        jar.add(cookie),
        Json(SignedIn {
            name: user.name,
            role: user.role,
            provider: user.provider,
            redirect: LANDING_PAGE,
        }),
    ))
}

async fn logout_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, StatusCode) {
    if let Some(session_id) = session_id(&jar) {
        state.portal.sessions.end(session_id).await;
    }
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    (jar, StatusCode::NO_CONTENT)
}

async fn graphql_handler(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let req = request.into_inner().data(session);
    state.schema.execute(req).await.into()
}

async fn list_page(
    State(state): State<AppState>,
    PageSession(session): PageSession,
    Query(criteria): Query<FilterCriteria>,
) -> HttpResult<Json<Dashboard>> {
    Ok(Json(state.portal.dashboard(&session, &criteria).await?))
}

async fn details_page(
    State(state): State<AppState>,
    PageSession(session): PageSession,
    Path(id): Path<usize>,
) -> HttpResult<Json<EmployeeDetail>> {
    match state.portal.employee(&session, id).await {
        Ok(detail) => Ok(Json(detail)),
        Err(ApiError::NotFound) => Err(HttpError::new(StatusCode::NOT_FOUND, NO_DATA)),
        Err(err) => Err(err.into()),
    }
}

async fn photo_result_page(
    State(state): State<AppState>,
    PageSession(session): PageSession,
) -> HttpResult<Json<PhotoResult>> {
    Ok(Json(state.portal.photo_result(&session).await?))
}

async fn analytics_page(
    State(state): State<AppState>,
    PageSession(_session): PageSession,
) -> Json<AnalyticsView> {
    Json(state.portal.analytics().await)
}

/// Raw file upload: the body is the image, typed by its `Content-Type`.
async fn upload_photo_handler(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(id): Path<usize>,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResult<Json<PhotoResult>> {
    let mime = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let photo = PhotoPayload::from_bytes(mime, &body).map_err(|err| match err {
        PhotoError::UnsupportedMime(_) => {
            HttpError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, err.to_string())
        }
        other => ApiError::from(other).into(),
    })?;
    match state.portal.upload_photo(&session, id, photo).await {
        Ok(result) => Ok(Json(result)),
        Err(ApiError::NotFound) => Err(HttpError::new(StatusCode::NOT_FOUND, NO_DATA)),
        Err(err) => Err(err.into()),
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.portal.store_status().await;
    Json(HealthResponse {
        ok: true,
        dataset_loaded: status.dataset_loaded,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    dataset_loaded: bool,
    version: &'static str,
}

fn session_id(jar: &PrivateCookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

async fn load_session(parts: &mut Parts, state: &AppState) -> Option<RequestSession> {
    let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state)
        .await
        .ok()?;
    let id = session_id(&jar)?;
    let user = state.portal.sessions.user(id).await?;
    Some(RequestSession { id, user })
}

/// Session required; API callers get `401` without one.
pub struct SessionContext(pub RequestSession);

impl FromRequestParts<AppState> for SessionContext {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        load_session(parts, state)
            .await
            .map(SessionContext)
            .ok_or_else(|| HttpError::new(StatusCode::UNAUTHORIZED, "missing session"))
    }
}

/// Session required; page visitors are sent back to the login view.
pub struct PageSession(pub RequestSession);

impl FromRequestParts<AppState> for PageSession {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        load_session(parts, state)
            .await
            .map(PageSession)
            .ok_or_else(|| Redirect::to("/"))
    }
}

type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let status = match &err {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<AuthnError> for HttpError {
    fn from(err: AuthnError) -> Self {
        let status = match &err {
            AuthnError::InvalidCredentials { .. } => StatusCode::UNAUTHORIZED,
            AuthnError::UnknownProvider(_) => StatusCode::NOT_FOUND,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::testing::loaded_portal;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn router() -> Router {
        let portal = loaded_portal().await;
        build_router(AppState::new(Arc::new(AppConfig::for_tests()), portal))
    }

    fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> http::Request<Body> {
        let mut builder = http::Request::post(uri).header(http::header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(http::header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, cookie: Option<&str>) -> http::Request<Body> {
        let mut builder = http::Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(http::header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    /// Sign in with the demo credentials and return the `name=value` cookie pair.
    async fn sign_in(router: &Router) -> String {
        let response = router
            .clone()
            .oneshot(post_json(
                "/login",
                json!({"username": "test", "password": "123456", "role": "hr"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(http::header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn wrong_password_names_demo_credentials() {
        let response = router()
            .await
            .oneshot(post_json(
                "/login",
                json!({"username": "test", "password": "wrong"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, "Try test / 123456");
    }

    #[tokio::test]
    async fn pages_redirect_without_session() {
        let router = router().await;
        for uri in ["/list", "/details/0", "/photo-result", "/analytics"] {
            let response = router.clone().oneshot(get(uri, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(response.headers()[http::header::LOCATION], "/");
        }
    }

    #[tokio::test]
    async fn graphql_requires_session() {
        let response = router()
            .await
            .oneshot(post_json("/graphql", json!({"query": "{ me { name } }"}), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn session_cookie_unlocks_pages_and_graphql() {
        let router = router().await;
        let cookie = sign_in(&router).await;

        let list = router
            .clone()
            .oneshot(get("/list?location=Tokyo", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(list.status(), StatusCode::OK);
        assert_eq!(body_json(list).await["showing"], json!(2));

        let me = router
            .clone()
            .oneshot(post_json(
                "/graphql",
                json!({"query": "{ me { name role } }"}),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(
            body_json(me).await["data"]["me"],
            json!({"name": "test", "role": "hr"})
        );
    }

    #[tokio::test]
    async fn unknown_detail_id_reports_no_data() {
        let router = router().await;
        let cookie = sign_in(&router).await;
        let response = router
            .clone()
            .oneshot(get("/details/77", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, NO_DATA);
    }

    #[tokio::test]
    async fn raw_upload_sets_photo() {
        let router = router().await;
        let cookie = sign_in(&router).await;

        let rejected = router
            .clone()
            .oneshot(
                http::Request::post("/photos/0")
                    .header(http::header::CONTENT_TYPE, "application/pdf")
                    .header(http::header::COOKIE, &cookie)
                    .body(Body::from("pdf"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let accepted = router
            .clone()
            .oneshot(
                http::Request::post("/photos/0")
                    .header(http::header::CONTENT_TYPE, "image/jpeg")
                    .header(http::header::COOKIE, &cookie)
                    .body(Body::from(vec![0xff, 0xd8, 0xff]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::OK);
        let result = body_json(accepted).await;
        assert_eq!(result["message"], json!("Tiger Nixon's profile photo has been updated."));
        assert!(result["image"].as_str().unwrap().starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let router = router().await;
        let cookie = sign_in(&router).await;
        let response = router
            .clone()
            .oneshot(post_json("/logout", json!({}), Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let after = router
            .clone()
            .oneshot(get("/photo-result", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(after.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn provider_login_names_user_after_role() {
        let router = router().await;
        let response = router
            .clone()
            .oneshot(post_json(
                "/login/provider",
                json!({"provider": "google", "role": "director"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["name"], json!("Director User"));

        let unknown = router
            .oneshot(post_json("/login/provider", json!({"provider": "github"}), None))
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn login_view_and_health_are_public() {
        let router = router().await;
        let view = body_json(router.clone().oneshot(get("/", None)).await.unwrap()).await;
        assert_eq!(view["demo_hint"], json!("Demo credentials: test / 123456"));
        assert_eq!(view["roles"][1], json!({"value": "hr", "label": "HR"}));

        let health = body_json(router.oneshot(get("/health", None)).await.unwrap()).await;
        assert_eq!(health["dataset_loaded"], json!(true));
    }

    #[tokio::test]
    async fn health_stays_loaded_after_failed_reload() {
        use crate::store::{
            RecordStore,
            testing::{StaticSource, sample_rows},
        };

        let source = Arc::new(StaticSource::new(sample_rows()));
        let portal = Portal::new(
            RecordStore::new(source.clone()),
            platform_authn::SessionStore::new(chrono::Duration::minutes(5)),
            platform_authn::AuthnService::new(platform_authn::DemoCredentials::default()),
        );
        portal.refresh().await;
        source.set_failing(true);
        portal.refresh().await;

        let router = build_router(AppState::new(Arc::new(AppConfig::for_tests()), Arc::new(portal)));
        let health = body_json(router.oneshot(get("/health", None)).await.unwrap()).await;
        assert_eq!(health["dataset_loaded"], json!(true));
    }

    #[tokio::test]
    async fn cors_without_origins_mirrors_request() {
        let mut config = AppConfig::for_tests();
        config.cors_allowed_origins = Vec::new();
        let router = build_router(AppState::new(Arc::new(config), loaded_portal().await));

        let request = http::Request::get("/health")
            .header(http::header::ORIGIN, "http://portal.test")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers[http::header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://portal.test"
        );
        assert_eq!(headers[http::header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }
}
