use crate::model::{Project, ProjectsPayload, ThumbnailField};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::StreamExt;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::{sync::RwLock, time::Instant};
use tower_http::services::{ServeDir, ServeFile};
use url::Url;

const DEFAULT_PROJECTS_CACHE_TTL_SECONDS: u64 = 300;
const DEFAULT_PROJECTS_CACHE_MAX_ENTRIES: usize = 64;
const DEFAULT_CONTENT_RESPONSE_MAX_BYTES: usize = 2 * 1024 * 1024;
const DEFAULT_CONTENT_REQUEST_TIMEOUT_MS: u64 = 6_000;
const DEFAULT_CONTENT_CONNECT_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_CONTENT_DATASET: &str = "production";
const DEFAULT_CONTENT_API_VERSION: &str = "2024-01-01";
const DEFAULT_LOG_LEVEL: LogLevel = LogLevel::Info;

const PROJECTS_CACHE_TTL_SECONDS_BOUNDS: (u64, u64) = (1, 86_400);
const PROJECTS_CACHE_MAX_ENTRIES_BOUNDS: (usize, usize) = (1, 1_024);
const CONTENT_RESPONSE_MAX_BYTES_BOUNDS: (usize, usize) = (1_024, 20 * 1024 * 1024);
const CONTENT_REQUEST_TIMEOUT_MS_BOUNDS: (u64, u64) = (100, 120_000);
const CONTENT_CONNECT_TIMEOUT_MS_BOUNDS: (u64, u64) = (100, 30_000);

const USER_AGENT: &str = "showcase-content-client/1.0";
const REQUEST_ID_HEADER: &str = "x-request-id";
const PROJECTS_CACHE_KEY: &str = "projects";

// Published project documents only; drafts never reach the public site.
const PROJECTS_QUERY: &str = "*[_type == \"projects\" && !(_id in path(\"drafts.**\"))] | order(_createdAt desc){ _id, title, slug, summary, thumbnail }";
const PROJECT_BY_SLUG_QUERY: &str = "*[_type == \"projects\" && slug.current == $slug && !(_id in path(\"drafts.**\"))][0]{ _id, title, slug, summary, thumbnail }";

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, PartialEq, Eq)]
enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl PartialOrd for LogLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(level: LogLevel) -> u8 {
            match level {
                LogLevel::Debug => 0,
                LogLevel::Info => 1,
                LogLevel::Warn => 2,
            }
        }

        rank(*self).cmp(&rank(*other))
    }
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
        }
    }
}

#[derive(Clone)]
struct ContentRuntimeConfig {
    query_url: Url,
    token: Option<String>,
    cache_ttl_seconds: u64,
    cache_max_entries: usize,
    response_max_bytes: usize,
    request_timeout: Duration,
    connect_timeout: Duration,
    log_level: LogLevel,
}

impl ContentRuntimeConfig {
    fn from_env() -> Result<Self, &'static str> {
        let dataset = parse_env_non_empty_string("CONTENT_DATASET")
            .unwrap_or_else(|| DEFAULT_CONTENT_DATASET.to_string());
        let api_version = parse_env_non_empty_string("CONTENT_API_VERSION")
            .unwrap_or_else(|| DEFAULT_CONTENT_API_VERSION.to_string());

        let base_url = match parse_env_http_url("CONTENT_API_BASE_URL") {
            Some(url) => url,
            None => {
                let project_id = parse_env_non_empty_string("CONTENT_PROJECT_ID")
                    .ok_or("CONTENT_PROJECT_ID is required when CONTENT_API_BASE_URL is not set")?;
                Url::parse(&format!("https://{project_id}.api.sanity.io"))
                    .map_err(|_| "CONTENT_PROJECT_ID does not form a valid API URL")?
            }
        };

        let query_url = content_query_url(&base_url, &api_version, &dataset)?;

        let cache_ttl_seconds = parse_env_u64_with_bounds(
            "PROJECTS_CACHE_TTL_SECONDS",
            DEFAULT_PROJECTS_CACHE_TTL_SECONDS,
            PROJECTS_CACHE_TTL_SECONDS_BOUNDS,
        );
        let cache_max_entries = parse_env_usize_with_bounds(
            "PROJECTS_CACHE_MAX_ENTRIES",
            DEFAULT_PROJECTS_CACHE_MAX_ENTRIES,
            PROJECTS_CACHE_MAX_ENTRIES_BOUNDS,
        );
        let response_max_bytes = parse_env_usize_with_bounds(
            "CONTENT_RESPONSE_MAX_BYTES",
            DEFAULT_CONTENT_RESPONSE_MAX_BYTES,
            CONTENT_RESPONSE_MAX_BYTES_BOUNDS,
        );
        let request_timeout_ms = parse_env_u64_with_bounds(
            "CONTENT_REQUEST_TIMEOUT_MS",
            DEFAULT_CONTENT_REQUEST_TIMEOUT_MS,
            CONTENT_REQUEST_TIMEOUT_MS_BOUNDS,
        );
        let connect_timeout_ms = parse_env_u64_with_bounds(
            "CONTENT_CONNECT_TIMEOUT_MS",
            DEFAULT_CONTENT_CONNECT_TIMEOUT_MS,
            CONTENT_CONNECT_TIMEOUT_MS_BOUNDS,
        );

        Ok(Self {
            query_url,
            token: parse_env_non_empty_string("CONTENT_API_TOKEN"),
            cache_ttl_seconds,
            cache_max_entries,
            response_max_bytes,
            request_timeout: Duration::from_millis(request_timeout_ms),
            connect_timeout: Duration::from_millis(connect_timeout_ms),
            log_level: parse_log_level("LOG_LEVEL", DEFAULT_LOG_LEVEL),
        })
    }
}

/// Builds the query endpoint URL for the content backend's HTTP API:
/// `{base}/v{version}/data/query/{dataset}`.
fn content_query_url(base: &Url, api_version: &str, dataset: &str) -> Result<Url, &'static str> {
    let version = api_version.strip_prefix('v').unwrap_or(api_version);

    let mut base_string = base.as_str().to_string();
    if !base_string.ends_with('/') {
        base_string.push('/');
    }

    let rebased = Url::parse(&base_string).map_err(|_| "invalid content API base URL")?;
    rebased
        .join(&format!("v{version}/data/query/{dataset}"))
        .map_err(|_| "invalid content API base URL")
}

#[derive(Clone)]
pub struct AppState {
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
    client: reqwest::Client,
    config: ContentRuntimeConfig,
}

#[derive(Clone)]
struct CacheEntry {
    created_at: Instant,
    expires_at: Instant,
    value: CachedValue,
}

#[derive(Clone)]
enum CachedValue {
    List(Vec<Project>),
    Single(Project),
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectPayload {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    project: Option<Project>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ProjectPayload {
    fn ready(project: Project) -> Self {
        Self {
            ok: true,
            project: Some(project),
            error: None,
        }
    }

    fn error(message: &str) -> Self {
        Self {
            ok: false,
            project: None,
            error: Some(message.to_string()),
        }
    }
}

/// Project document as stored in the content backend.
#[derive(Clone, Deserialize)]
struct CmsProjectDocument {
    #[serde(rename = "_id")]
    id: String,
    title: Option<String>,
    slug: Option<CmsSlug>,
    summary: Option<String>,
    thumbnail: Option<ThumbnailField>,
}

#[derive(Clone, Deserialize)]
struct CmsSlug {
    current: Option<String>,
}

#[derive(Deserialize)]
struct ContentListResponse {
    #[serde(default)]
    result: Vec<CmsProjectDocument>,
}

#[derive(Deserialize)]
struct ContentSingleResponse {
    result: Option<CmsProjectDocument>,
}

fn map_document(document: CmsProjectDocument) -> Project {
    Project {
        id: document.id,
        slug: document
            .slug
            .and_then(|slug| slug.current)
            .filter(|value| !value.is_empty()),
        title: document.title,
        summary: document.summary,
        thumbnail: document.thumbnail,
    }
}

fn map_documents(documents: Vec<CmsProjectDocument>) -> Vec<Project> {
    documents
        .into_iter()
        .map(map_document)
        .filter(Project::has_identity)
        .collect()
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let bind_address = format!("0.0.0.0:{port}");
    let config = ContentRuntimeConfig::from_env()?;

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(USER_AGENT)
        .build()?;

    let state = AppState {
        cache: Arc::new(RwLock::new(HashMap::new())),
        client,
        config: config.clone(),
    };

    let static_service = ServeDir::new("dist").not_found_service(ServeFile::new("dist/index.html"));

    let app = Router::new()
        .route("/api/projects", get(get_projects))
        .route("/api/projects/{slug}", get(get_project))
        .fallback_service(static_service)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    log_event(
        &config,
        LogLevel::Info,
        "server_listening",
        serde_json::json!({ "port": port }),
    );
    axum::serve(listener, app).await?;
    Ok(())
}

async fn get_projects(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> axum::response::Response {
    let request_started_at = Instant::now();
    let request_id = resolve_request_id(&headers);

    log_event(
        &state.config,
        LogLevel::Info,
        "projects_request_start",
        serde_json::json!({
            "request_id": request_id.as_str(),
            "method": method.as_str(),
            "path": uri.path(),
        }),
    );

    let cache_hit = read_from_cache(&state, PROJECTS_CACHE_KEY).await;
    log_event(
        &state.config,
        LogLevel::Debug,
        "projects_cache_decision",
        serde_json::json!({
            "request_id": request_id.as_str(),
            "memory_cache": if cache_hit.is_some() { "hit" } else { "miss" },
        }),
    );

    if let Some(CachedValue::List(projects)) = cache_hit {
        log_event(
            &state.config,
            LogLevel::Info,
            "projects_request_complete",
            serde_json::json!({
                "request_id": request_id.as_str(),
                "status": StatusCode::OK.as_u16(),
                "duration_ms": request_started_at.elapsed().as_millis(),
                "cache": "memory_hit",
            }),
        );
        return json_response(
            StatusCode::OK,
            ProjectsPayload {
                ok: true,
                projects,
                error: None,
            },
            cache_control(&format!("public, max-age={}", state.config.cache_ttl_seconds)),
            &request_id,
        );
    }

    match load_projects(&state).await {
        Ok(projects) => {
            write_to_cache(
                &state,
                PROJECTS_CACHE_KEY.to_string(),
                CachedValue::List(projects.clone()),
            )
            .await;

            log_event(
                &state.config,
                LogLevel::Info,
                "projects_request_complete",
                serde_json::json!({
                    "request_id": request_id.as_str(),
                    "status": StatusCode::OK.as_u16(),
                    "duration_ms": request_started_at.elapsed().as_millis(),
                    "cache": "memory_miss",
                    "project_count": projects.len(),
                }),
            );

            json_response(
                StatusCode::OK,
                ProjectsPayload {
                    ok: true,
                    projects,
                    error: None,
                },
                cache_control(&format!("public, max-age={}", state.config.cache_ttl_seconds)),
                &request_id,
            )
        }
        Err(message) => {
            log_event(
                &state.config,
                LogLevel::Warn,
                "projects_request_failed",
                serde_json::json!({
                    "request_id": request_id.as_str(),
                    "error_class": "content_fetch_failed",
                    "message": message,
                    "duration_ms": request_started_at.elapsed().as_millis(),
                }),
            );
            json_response(
                StatusCode::BAD_GATEWAY,
                ProjectsPayload {
                    ok: false,
                    projects: Vec::new(),
                    error: Some(message.to_string()),
                },
                cache_control("no-store"),
                &request_id,
            )
        }
    }
}

async fn get_project(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> axum::response::Response {
    let request_started_at = Instant::now();
    let request_id = resolve_request_id(&headers);

    log_event(
        &state.config,
        LogLevel::Info,
        "project_request_start",
        serde_json::json!({
            "request_id": request_id.as_str(),
            "method": method.as_str(),
            "path": uri.path(),
        }),
    );

    let cache_key = project_cache_key(&slug);
    if let Some(CachedValue::Single(project)) = read_from_cache(&state, &cache_key).await {
        log_event(
            &state.config,
            LogLevel::Info,
            "project_request_complete",
            serde_json::json!({
                "request_id": request_id.as_str(),
                "status": StatusCode::OK.as_u16(),
                "duration_ms": request_started_at.elapsed().as_millis(),
                "cache": "memory_hit",
            }),
        );
        return json_response(
            StatusCode::OK,
            ProjectPayload::ready(project),
            cache_control(&format!("public, max-age={}", state.config.cache_ttl_seconds)),
            &request_id,
        );
    }

    match load_project(&state, &slug).await {
        Ok(Some(project)) => {
            write_to_cache(&state, cache_key, CachedValue::Single(project.clone())).await;

            log_event(
                &state.config,
                LogLevel::Info,
                "project_request_complete",
                serde_json::json!({
                    "request_id": request_id.as_str(),
                    "status": StatusCode::OK.as_u16(),
                    "duration_ms": request_started_at.elapsed().as_millis(),
                    "cache": "memory_miss",
                }),
            );

            json_response(
                StatusCode::OK,
                ProjectPayload::ready(project),
                cache_control(&format!("public, max-age={}", state.config.cache_ttl_seconds)),
                &request_id,
            )
        }
        Ok(None) => {
            log_event(
                &state.config,
                LogLevel::Info,
                "project_request_complete",
                serde_json::json!({
                    "request_id": request_id.as_str(),
                    "status": StatusCode::NOT_FOUND.as_u16(),
                    "duration_ms": request_started_at.elapsed().as_millis(),
                }),
            );
            json_response(
                StatusCode::NOT_FOUND,
                ProjectPayload::error("project not found"),
                cache_control("no-store"),
                &request_id,
            )
        }
        Err(message) => {
            log_event(
                &state.config,
                LogLevel::Warn,
                "project_request_failed",
                serde_json::json!({
                    "request_id": request_id.as_str(),
                    "error_class": "content_fetch_failed",
                    "message": message,
                    "duration_ms": request_started_at.elapsed().as_millis(),
                }),
            );
            json_response(
                StatusCode::BAD_GATEWAY,
                ProjectPayload::error(message),
                cache_control("no-store"),
                &request_id,
            )
        }
    }
}

fn project_cache_key(slug: &str) -> String {
    format!("project:{slug}")
}

fn projects_query_url(config: &ContentRuntimeConfig) -> Url {
    let mut url = config.query_url.clone();
    url.query_pairs_mut().append_pair("query", PROJECTS_QUERY);
    url
}

fn project_query_url(config: &ContentRuntimeConfig, slug: &str) -> Url {
    let mut url = config.query_url.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("query", PROJECT_BY_SLUG_QUERY);
        // GROQ parameters travel JSON-encoded in the query string.
        pairs.append_pair("$slug", &format!("\"{}\"", slug.replace('"', "\\\"")));
    }
    url
}

async fn load_projects(state: &AppState) -> Result<Vec<Project>, &'static str> {
    let body = fetch_content_body(state, projects_query_url(&state.config)).await?;
    let parsed: ContentListResponse =
        serde_json::from_str(&body).map_err(|_| "content response was not valid JSON")?;

    Ok(map_documents(parsed.result))
}

async fn load_project(state: &AppState, slug: &str) -> Result<Option<Project>, &'static str> {
    let body = fetch_content_body(state, project_query_url(&state.config, slug)).await?;
    let parsed: ContentSingleResponse =
        serde_json::from_str(&body).map_err(|_| "content response was not valid JSON")?;

    Ok(parsed
        .result
        .map(map_document)
        .filter(Project::has_identity))
}

async fn fetch_content_body(state: &AppState, url: Url) -> Result<String, &'static str> {
    let mut request = state.client.get(url);
    if let Some(token) = state.config.token.as_ref() {
        request = request.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    let response = request.send().await.map_err(|_| "content request failed")?;
    if !response.status().is_success() {
        return Err("content backend returned non-success status");
    }

    read_limited_body(response, state.config.response_max_bytes).await
}

async fn read_limited_body(
    response: reqwest::Response,
    max_response_bytes: usize,
) -> Result<String, &'static str> {
    let mut stream = response.bytes_stream();
    let mut body: Vec<u8> = Vec::with_capacity(8192);

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|_| "failed reading response body")?;

        if body.len() + chunk.len() > max_response_bytes {
            return Err("response body too large");
        }

        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).to_string())
}

async fn read_from_cache(state: &AppState, key: &str) -> Option<CachedValue> {
    let now = Instant::now();
    {
        let cache = state.cache.read().await;
        let entry = cache.get(key)?;

        if entry.expires_at > now {
            return Some(entry.value.clone());
        }
    }

    let mut cache = state.cache.write().await;
    purge_expired_entries(&mut cache, now);
    cache.remove(key);
    None
}

async fn write_to_cache(state: &AppState, key: String, value: CachedValue) {
    let now = Instant::now();
    let mut cache = state.cache.write().await;

    purge_expired_entries(&mut cache, now);

    if !cache.contains_key(&key) && cache.len() >= state.config.cache_max_entries {
        evict_oldest_entry(&mut cache);
    }

    cache.insert(
        key,
        CacheEntry {
            created_at: now,
            expires_at: now + Duration::from_secs(state.config.cache_ttl_seconds),
            value,
        },
    );
}

fn purge_expired_entries(cache: &mut HashMap<String, CacheEntry>, now: Instant) {
    cache.retain(|_, entry| entry.expires_at > now);
}

fn evict_oldest_entry(cache: &mut HashMap<String, CacheEntry>) {
    let Some(key_to_remove) = cache
        .iter()
        .min_by_key(|(_, entry)| entry.created_at)
        .map(|(key, _)| key.clone())
    else {
        return;
    };

    cache.remove(&key_to_remove);
}

fn json_response<T: Serialize>(
    status: StatusCode,
    payload: T,
    cache_control: HeaderValue,
    request_id: &str,
) -> axum::response::Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, cache_control);
    headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
    response_with_request_id(status, headers, Json(payload), request_id)
}

fn response_with_request_id(
    status: StatusCode,
    mut headers: HeaderMap,
    payload: impl IntoResponse,
    request_id: &str,
) -> axum::response::Response {
    if let Ok(request_id_header) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, request_id_header);
    }
    (status, headers, payload).into_response()
}

fn cache_control(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("no-store"))
}

fn log_event(
    config: &ContentRuntimeConfig,
    level: LogLevel,
    event: &str,
    fields: serde_json::Value,
) {
    if level < config.log_level {
        return;
    }

    let mut payload = serde_json::Map::new();
    payload.insert(
        "ts".to_string(),
        serde_json::Value::Number(serde_json::Number::from(now_unix_seconds())),
    );
    payload.insert(
        "level".to_string(),
        serde_json::Value::String(level.as_str().to_string()),
    );
    payload.insert(
        "event".to_string(),
        serde_json::Value::String(event.to_string()),
    );

    if let serde_json::Value::Object(extra) = fields {
        for (key, value) in extra {
            payload.insert(key, value);
        }
    }

    println!("{}", serde_json::Value::Object(payload));
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_secs())
        .unwrap_or(0)
}

fn now_unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_millis())
        .unwrap_or(0)
}

fn generate_request_id() -> String {
    let counter = REQUEST_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
    format!("req-{}-{counter}", now_unix_millis())
}

fn resolve_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|raw| raw.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(generate_request_id)
}

fn parse_env_u64_with_bounds(name: &str, default: u64, bounds: (u64, u64)) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| (bounds.0..=bounds.1).contains(value))
        .unwrap_or(default)
}

fn parse_env_usize_with_bounds(name: &str, default: usize, bounds: (usize, usize)) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| (bounds.0..=bounds.1).contains(value))
        .unwrap_or(default)
}

fn parse_env_non_empty_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env_http_url(name: &str) -> Option<Url> {
    let value = parse_env_non_empty_string(name)?;
    let parsed = Url::parse(&value).ok()?;

    if parsed.scheme() == "http" || parsed.scheme() == "https" {
        Some(parsed)
    } else {
        None
    }
}

fn parse_log_level(name: &str, default: LogLevel) -> LogLevel {
    match parse_env_non_empty_string(name)
        .unwrap_or_else(|| default.as_str().to_string())
        .to_ascii_lowercase()
        .as_str()
    {
        "debug" => LogLevel::Debug,
        "info" => LogLevel::Info,
        "warn" => LogLevel::Warn,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaItem;

    fn test_runtime_config() -> ContentRuntimeConfig {
        let base = Url::parse("https://f6mhnkv2.api.sanity.io").expect("valid URL");
        ContentRuntimeConfig {
            query_url: content_query_url(&base, DEFAULT_CONTENT_API_VERSION, "production")
                .expect("valid query URL"),
            token: None,
            cache_ttl_seconds: DEFAULT_PROJECTS_CACHE_TTL_SECONDS,
            cache_max_entries: DEFAULT_PROJECTS_CACHE_MAX_ENTRIES,
            response_max_bytes: DEFAULT_CONTENT_RESPONSE_MAX_BYTES,
            request_timeout: Duration::from_millis(DEFAULT_CONTENT_REQUEST_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONTENT_CONNECT_TIMEOUT_MS),
            log_level: DEFAULT_LOG_LEVEL,
        }
    }

    fn test_state() -> AppState {
        AppState {
            cache: Arc::new(RwLock::new(HashMap::new())),
            client: reqwest::Client::new(),
            config: test_runtime_config(),
        }
    }

    fn cached_project(id: &str) -> Project {
        Project {
            id: id.to_string(),
            slug: None,
            title: Some("Cached".to_string()),
            summary: None,
            thumbnail: None,
        }
    }

    #[test]
    fn content_query_url_joins_version_and_dataset() {
        let base = Url::parse("https://f6mhnkv2.api.sanity.io").expect("valid URL");
        let url = content_query_url(&base, "2024-01-01", "production").expect("builds");

        assert_eq!(
            url.as_str(),
            "https://f6mhnkv2.api.sanity.io/v2024-01-01/data/query/production"
        );
    }

    #[test]
    fn content_query_url_accepts_prefixed_version_and_base_path() {
        let base = Url::parse("https://proxy.example.com/cms").expect("valid URL");
        let url = content_query_url(&base, "v2024-01-01", "staging").expect("builds");

        assert_eq!(
            url.as_str(),
            "https://proxy.example.com/cms/v2024-01-01/data/query/staging"
        );
    }

    #[test]
    fn projects_query_url_embeds_the_query() {
        let url = projects_query_url(&test_runtime_config());

        assert!(url.as_str().starts_with(
            "https://f6mhnkv2.api.sanity.io/v2024-01-01/data/query/production?query="
        ));
        let query_value = url
            .query_pairs()
            .find(|(key, _)| key == "query")
            .map(|(_, value)| value.into_owned())
            .expect("query parameter present");
        assert_eq!(query_value, PROJECTS_QUERY);
    }

    #[test]
    fn project_query_url_quotes_the_slug_parameter() {
        let url = project_query_url(&test_runtime_config(), "spring-campaign");

        let slug_value = url
            .query_pairs()
            .find(|(key, _)| key == "$slug")
            .map(|(_, value)| value.into_owned())
            .expect("slug parameter present");
        assert_eq!(slug_value, "\"spring-campaign\"");
    }

    #[test]
    fn map_document_flattens_slug_and_drops_empty_values() {
        let raw = r#"{
            "_id": "doc-1",
            "title": "Spring Campaign",
            "slug": { "current": "spring-campaign" },
            "summary": "Full-bleed motion piece.",
            "thumbnail": { "_type": "video", "asset": { "_ref": "file-a1b2c3-mp4" } }
        }"#;
        let document: CmsProjectDocument = serde_json::from_str(raw).expect("document parses");

        let project = map_document(document);
        assert_eq!(project.id, "doc-1");
        assert_eq!(project.slug.as_deref(), Some("spring-campaign"));
        assert_eq!(project.title.as_deref(), Some("Spring Campaign"));
        assert!(matches!(
            project.effective_thumbnail(),
            Some(MediaItem::Video { .. })
        ));

        let empty_slug: CmsProjectDocument =
            serde_json::from_str(r#"{ "_id": "doc-2", "slug": { "current": "" } }"#)
                .expect("document parses");
        assert_eq!(map_document(empty_slug).slug, None);
    }

    #[test]
    fn map_documents_drops_records_without_identity() {
        let raw = r#"[
            { "_id": "doc-1" },
            { "_id": "" },
            { "_id": "   " },
            { "_id": "doc-2" }
        ]"#;
        let documents: Vec<CmsProjectDocument> = serde_json::from_str(raw).expect("parses");

        let projects = map_documents(documents);
        let ids: Vec<&str> = projects.iter().map(|project| project.id.as_str()).collect();
        assert_eq!(ids, vec!["doc-1", "doc-2"]);
    }

    #[test]
    fn content_list_response_preserves_gallery_thumbnails() {
        let raw = r#"{
            "result": [{
                "_id": "doc-1",
                "thumbnail": [null, { "_type": "image", "asset": { "_ref": "image-a1-10x10-png" } }]
            }]
        }"#;
        let parsed: ContentListResponse = serde_json::from_str(raw).expect("parses");

        let projects = map_documents(parsed.result);
        let effective = projects[0].effective_thumbnail().expect("effective entry");
        assert_eq!(effective.asset_ref(), Some("image-a1-10x10-png"));
    }

    #[tokio::test]
    async fn expired_cache_entries_are_not_served() {
        let state = test_state();
        let now = Instant::now();

        {
            let mut cache = state.cache.write().await;
            cache.insert(
                PROJECTS_CACHE_KEY.to_string(),
                CacheEntry {
                    created_at: now,
                    expires_at: now,
                    value: CachedValue::List(vec![cached_project("doc-1")]),
                },
            );
        }

        assert!(read_from_cache(&state, PROJECTS_CACHE_KEY).await.is_none());

        let cache = state.cache.read().await;
        assert!(cache.is_empty(), "expired entry should be purged on read");
    }

    #[tokio::test]
    async fn cache_overwrite_at_capacity_does_not_evict_oldest() {
        let state = test_state();
        let now = Instant::now();

        {
            let mut cache = state.cache.write().await;

            for index in 0..DEFAULT_PROJECTS_CACHE_MAX_ENTRIES {
                cache.insert(
                    format!("key-{index}"),
                    CacheEntry {
                        created_at: now + Duration::from_secs(index as u64),
                        expires_at: now + Duration::from_secs(10_000),
                        value: CachedValue::Single(cached_project("doc-1")),
                    },
                );
            }
        }

        write_to_cache(
            &state,
            "key-10".to_string(),
            CachedValue::Single(cached_project("doc-updated")),
        )
        .await;

        let cache = state.cache.read().await;
        assert_eq!(cache.len(), DEFAULT_PROJECTS_CACHE_MAX_ENTRIES);
        assert!(cache.contains_key("key-0"));

        let updated = cache.get("key-10").expect("overwritten entry present");
        match &updated.value {
            CachedValue::Single(project) => assert_eq!(project.id, "doc-updated"),
            CachedValue::List(_) => panic!("overwritten entry should hold a single project"),
        }
    }

    #[tokio::test]
    async fn cache_insert_at_capacity_evicts_oldest_entry() {
        let state = test_state();
        let now = Instant::now();

        {
            let mut cache = state.cache.write().await;

            for index in 0..DEFAULT_PROJECTS_CACHE_MAX_ENTRIES {
                cache.insert(
                    format!("key-{index}"),
                    CacheEntry {
                        created_at: now + Duration::from_secs(index as u64),
                        expires_at: now + Duration::from_secs(10_000),
                        value: CachedValue::Single(cached_project("doc-1")),
                    },
                );
            }
        }

        write_to_cache(
            &state,
            "key-new".to_string(),
            CachedValue::Single(cached_project("doc-new")),
        )
        .await;

        let cache = state.cache.read().await;
        assert_eq!(cache.len(), DEFAULT_PROJECTS_CACHE_MAX_ENTRIES);
        assert!(!cache.contains_key("key-0"), "oldest entry should be evicted");
        assert!(cache.contains_key("key-new"));
    }
}
