//! JSON-over-HTTP endpoint exposing the analyses.
//!
//! - `GET /prompts` describes the available analyses and their arguments.
//! - `POST /messages` runs one analysis for a repository and change request.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use warp::http::{Method, StatusCode};
use warp::hyper::body::Bytes;
use warp::reply::{self, Response};
use warp::{Filter, Rejection, Reply};

use crate::blame::{analyze_change_request, BlameOptions};
use crate::config::AnalyzerConfig;
use crate::history_log::{export_history_log, parse_since, DEFAULT_SINCE};
use crate::provider::{
    self, find_open_change_request, split_full_name, validate_project_path, ProviderClient,
    ProviderError, ProviderKind,
};

/// Largest `/messages` request body accepted, in bytes.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Analysis offered over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisName {
    /// Per-author blame over a change request.
    GitBlame,
    /// History export in code-maat log format.
    GitLog,
}

impl AnalysisName {
    /// Name used in requests.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GitBlame => "git-blame",
            Self::GitLog => "git-log",
        }
    }
}

/// A validated `POST /messages` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Analysis to run.
    pub name: AnalysisName,
    /// Provider hosting the repository.
    pub provider: ProviderKind,
    /// Access token used for this request only.
    pub token: String,
    /// Repository full name.
    pub repository: String,
    /// Change-request number.
    pub change_request: u64,
}

/// Response envelope shared by success and error replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// `success` or `error`.
    pub status: String,
    /// Summary of a successful analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Analysis result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResponse {
    fn success(message: &str, data: Value) -> Self {
        Self {
            status: "success".to_string(),
            message: Some(message.to_string()),
            data: Some(data),
            error: None,
        }
    }

    fn failure(error: String) -> Self {
        Self {
            status: "error".to_string(),
            message: None,
            data: None,
            error: Some(error),
        }
    }
}

/// A request failure carrying the HTTP status to answer with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Response status.
    pub status: StatusCode,
    /// Human-readable message placed in the `error` field.
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn into_response(self) -> Response {
        warn!(status = self.status.as_u16(), error = %self.message, "Request failed");
        reply::with_status(
            reply::json(&AnalysisResponse::failure(self.message)),
            self.status,
        )
        .into_response()
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        let status = match &err {
            ProviderError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
            ProviderError::ChangeRequestNotFound { .. } => StatusCode::NOT_FOUND,
            e if e.is_configuration() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

/// Argument description in the `/prompts` listing.
#[derive(Debug, Clone, Serialize)]
pub struct PromptArgument {
    /// Argument key in the request's `arguments` object.
    pub name: &'static str,
    /// What the argument holds.
    pub description: &'static str,
    /// Whether the request is rejected without it.
    pub required: bool,
}

/// Analysis description in the `/prompts` listing.
#[derive(Debug, Clone, Serialize)]
pub struct Prompt {
    /// Analysis name used in requests.
    pub name: &'static str,
    /// What the analysis returns.
    pub description: &'static str,
    /// Accepted arguments.
    pub arguments: Vec<PromptArgument>,
}

fn request_arguments() -> Vec<PromptArgument> {
    vec![
        PromptArgument {
            name: "provider",
            description: "The Git provider (github or gitlab)",
            required: true,
        },
        PromptArgument {
            name: "token",
            description: "Personal access token for authentication",
            required: true,
        },
        PromptArgument {
            name: "repository",
            description: "Full repository name in the format owner/repo",
            required: true,
        },
        PromptArgument {
            name: "pullRequest",
            description: "Pull or merge request number",
            required: true,
        },
    ]
}

/// Analyses served by `POST /messages`.
pub fn prompts() -> Vec<Prompt> {
    vec![
        Prompt {
            name: AnalysisName::GitBlame.as_str(),
            description: "Analyzes the blame information for files in a pull request, \
                          showing which authors changed how many lines.",
            arguments: request_arguments(),
        },
        Prompt {
            name: AnalysisName::GitLog.as_str(),
            description: "Exports the repository's commit history since 2024-01-01 in \
                          code-maat git2 log format.",
            arguments: request_arguments(),
        },
    ]
}

#[derive(Deserialize)]
struct RawRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

/// Returns the string argument `key`, or a 400 naming what is wrong with it.
fn string_argument<'a>(
    arguments: &'a Map<String, Value>,
    key: &str,
    label: &str,
) -> Result<&'a str, ApiError> {
    match arguments.get(key) {
        None | Some(Value::Null) => Err(ApiError::bad_request(format!("{label} is required"))),
        Some(Value::String(value)) => Ok(value.as_str()),
        Some(_) => Err(ApiError::bad_request(format!("{label} must be a string"))),
    }
}

/// Validates a `POST /messages` request.
///
/// Checks run in order: method, content type, JSON syntax, analysis name,
/// provider, token, repository, change-request number. The first failure
/// determines the answer.
pub fn validate(
    method: &Method,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<AnalysisRequest, ApiError> {
    if method != Method::POST {
        return Err(ApiError::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
        ));
    }

    let media_type = content_type
        .and_then(|value| value.split(';').next())
        .map(str::trim);
    if !media_type.is_some_and(|media| media.eq_ignore_ascii_case("application/json")) {
        return Err(ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Content-Type must be application/json",
        ));
    }

    let raw: RawRequest =
        serde_json::from_slice(body).map_err(|_| ApiError::bad_request("Invalid JSON format"))?;

    let name = match raw.name.as_str() {
        "git-blame" => AnalysisName::GitBlame,
        "git-log" => AnalysisName::GitLog,
        _ => {
            return Err(ApiError::bad_request(
                "Invalid name. Must be one of: 'git-blame', 'git-log'",
            ))
        }
    };

    let provider = string_argument(&raw.arguments, "provider", "Provider")?
        .parse::<ProviderKind>()
        .map_err(|_| {
            ApiError::bad_request("Invalid provider type. Must be one of: github, gitlab")
        })?;

    let token = string_argument(&raw.arguments, "token", "Token")?.trim();
    if token.is_empty() {
        return Err(ApiError::bad_request("Token is required"));
    }

    let repository = string_argument(&raw.arguments, "repository", "Repository")?.trim();
    if repository.is_empty() {
        return Err(ApiError::bad_request("Repository is required"));
    }
    match provider {
        ProviderKind::GitHub => split_full_name(repository).map(|_| ()),
        ProviderKind::GitLab => validate_project_path(repository).map(|_| ()),
    }
    .map_err(ApiError::from)?;

    let change_request = match raw.arguments.get("pullRequest") {
        None | Some(Value::Null) => return Err(ApiError::bad_request("Pull request is required")),
        Some(Value::Number(number)) => number
            .as_u64()
            .filter(|&number| number > 0)
            .ok_or_else(|| ApiError::bad_request("Pull request number must be positive"))?,
        Some(_) => return Err(ApiError::bad_request("Pull request must be a number")),
    };

    Ok(AnalysisRequest {
        name,
        provider,
        token: token.to_string(),
        repository: repository.to_string(),
        change_request,
    })
}

/// Connects with the request's token and runs the analysis.
pub async fn run_analysis(
    request: &AnalysisRequest,
    config: &AnalyzerConfig,
) -> Result<AnalysisResponse, ApiError> {
    let client = provider::connect(
        request.provider,
        &request.token,
        config.api_url(request.provider),
    )
    .await?;
    run_with_client(client.as_ref(), request, config).await
}

/// Runs the analysis against an already connected client.
pub async fn run_with_client(
    client: &dyn ProviderClient,
    request: &AnalysisRequest,
    config: &AnalyzerConfig,
) -> Result<AnalysisResponse, ApiError> {
    match request.name {
        AnalysisName::GitBlame => {
            let options = BlameOptions {
                max_commits_per_file: config.max_history,
            };
            let (_, report) = analyze_change_request(
                client,
                &request.repository,
                request.change_request,
                &options,
            )
            .await?;
            let data: Map<String, Value> = report
                .contributions()
                .iter()
                .map(|contribution| {
                    (
                        contribution.author.clone(),
                        Value::String(contribution.lines.to_string()),
                    )
                })
                .collect();
            Ok(AnalysisResponse::success(
                "Blame analysis completed",
                Value::Object(data),
            ))
        }
        AnalysisName::GitLog => {
            find_open_change_request(client, &request.repository, request.change_request).await?;
            let since = parse_since(DEFAULT_SINCE)
                .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
            let log = export_history_log(client, &request.repository, since).await?;
            Ok(AnalysisResponse::success(
                "Git log analysis completed",
                json!({ "log": log.text, "commits": log.commits }),
            ))
        }
    }
}

async fn handle_messages(
    method: Method,
    content_type: Option<String>,
    body: Bytes,
    config: Arc<AnalyzerConfig>,
) -> Response {
    let request = match validate(&method, content_type.as_deref(), &body) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };
    info!(
        analysis = request.name.as_str(),
        provider = %request.provider,
        repository = %request.repository,
        change_request = request.change_request,
        "Running analysis"
    );

    match run_analysis(&request, &config).await {
        Ok(response) => reply::with_status(reply::json(&response), StatusCode::OK).into_response(),
        Err(e) => e.into_response(),
    }
}

fn handle_prompts(method: Method) -> Response {
    if method != Method::GET {
        return ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response();
    }
    reply::json(&prompts()).into_response()
}

/// Builds the filter serving `/prompts` and `/messages`.
pub fn routes(
    config: Arc<AnalyzerConfig>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let prompts = warp::path!("prompts")
        .and(warp::method())
        .map(handle_prompts);

    let messages = warp::path!("messages")
        .and(warp::method())
        .and(warp::header::optional::<String>("content-type"))
        .and(request_body())
        .and(warp::any().map(move || Arc::clone(&config)))
        .then(handle_messages);

    prompts
        .or(messages)
        .recover(handle_body_rejection)
        .with(warp::log::custom(|request| {
            info!(
                method = %request.method(),
                path = request.path(),
                remote = ?request.remote_addr(),
                status = request.status().as_u16(),
                "Handled request"
            );
        }))
}

/// Buffers POST bodies up to [`MAX_BODY_BYTES`]; other methods carry none.
fn request_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    let bounded = warp::post()
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::bytes());
    let bodiless = warp::method().and_then(|method: Method| async move {
        if method == Method::POST {
            Err(warp::reject())
        } else {
            Ok(Bytes::new())
        }
    });
    bounded.or(bodiless).unify()
}

async fn handle_body_rejection(rejection: Rejection) -> Result<Response, Rejection> {
    let error = if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
    } else if rejection.find::<warp::reject::LengthRequired>().is_some() {
        ApiError::new(StatusCode::LENGTH_REQUIRED, "Content-Length required")
    } else {
        return Err(rejection);
    };
    Ok(error.into_response())
}

/// Binds `port` on all interfaces and serves until the process ends.
pub async fn serve(port: u16, config: Arc<AnalyzerConfig>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let (bound, server) = warp::serve(routes(config))
        .try_bind_ephemeral(addr)
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %bound, "Server listening");
    println!("Registered routes:");
    println!("- GET /prompts");
    println!("- POST /messages");
    server.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_utils::MockProviderClient;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn body(value: &Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    fn blame_request(arguments: Value) -> Vec<u8> {
        body(&json!({ "name": "git-blame", "arguments": arguments }))
    }

    fn valid_arguments() -> Value {
        json!({
            "provider": "github",
            "token": "token",
            "repository": "owner/repo",
            "pullRequest": 1
        })
    }

    fn with_argument(key: &str, value: Value) -> Value {
        let mut arguments = valid_arguments();
        arguments[key] = value;
        arguments
    }

    fn without_argument(key: &str) -> Value {
        let mut arguments = valid_arguments();
        if let Some(map) = arguments.as_object_mut() {
            map.remove(key);
        }
        arguments
    }

    type Case<'a> = (
        &'a str,
        Method,
        Option<&'a str>,
        Vec<u8>,
        Option<(StatusCode, &'a str)>,
    );

    #[test]
    fn validation_table() {
        let cases: Vec<Case> = vec![
            (
                "valid request",
                Method::POST,
                Some("application/json"),
                blame_request(valid_arguments()),
                None,
            ),
            (
                "content type with charset",
                Method::POST,
                Some("application/json; charset=utf-8"),
                blame_request(valid_arguments()),
                None,
            ),
            (
                "invalid method",
                Method::GET,
                Some("application/json"),
                blame_request(valid_arguments()),
                Some((StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")),
            ),
            (
                "invalid content type",
                Method::POST,
                Some("text/plain"),
                blame_request(valid_arguments()),
                Some((StatusCode::UNSUPPORTED_MEDIA_TYPE, "Content-Type must be application/json")),
            ),
            (
                "missing content type",
                Method::POST,
                None,
                blame_request(valid_arguments()),
                Some((StatusCode::UNSUPPORTED_MEDIA_TYPE, "Content-Type must be application/json")),
            ),
            (
                "malformed json",
                Method::POST,
                Some("application/json"),
                b"{not json".to_vec(),
                Some((StatusCode::BAD_REQUEST, "Invalid JSON format")),
            ),
            (
                "invalid name",
                Method::POST,
                Some("application/json"),
                body(&json!({"name": "git-diff", "arguments": valid_arguments()})),
                Some((
                    StatusCode::BAD_REQUEST,
                    "Invalid name. Must be one of: 'git-blame', 'git-log'",
                )),
            ),
            (
                "missing provider",
                Method::POST,
                Some("application/json"),
                blame_request(without_argument("provider")),
                Some((StatusCode::BAD_REQUEST, "Provider is required")),
            ),
            (
                "non-string provider",
                Method::POST,
                Some("application/json"),
                blame_request(with_argument("provider", json!(1))),
                Some((StatusCode::BAD_REQUEST, "Provider must be a string")),
            ),
            (
                "invalid provider",
                Method::POST,
                Some("application/json"),
                blame_request(with_argument("provider", json!("invalid"))),
                Some((
                    StatusCode::BAD_REQUEST,
                    "Invalid provider type. Must be one of: github, gitlab",
                )),
            ),
            (
                "missing token",
                Method::POST,
                Some("application/json"),
                blame_request(without_argument("token")),
                Some((StatusCode::BAD_REQUEST, "Token is required")),
            ),
            (
                "empty token",
                Method::POST,
                Some("application/json"),
                blame_request(with_argument("token", json!(""))),
                Some((StatusCode::BAD_REQUEST, "Token is required")),
            ),
            (
                "missing repository",
                Method::POST,
                Some("application/json"),
                blame_request(without_argument("repository")),
                Some((StatusCode::BAD_REQUEST, "Repository is required")),
            ),
            (
                "repository without owner",
                Method::POST,
                Some("application/json"),
                blame_request(with_argument("repository", json!("repo"))),
                Some((
                    StatusCode::BAD_REQUEST,
                    "Invalid repository name format: repo. Expected format: owner/repo",
                )),
            ),
            (
                "missing pull request",
                Method::POST,
                Some("application/json"),
                blame_request(without_argument("pullRequest")),
                Some((StatusCode::BAD_REQUEST, "Pull request is required")),
            ),
            (
                "string pull request",
                Method::POST,
                Some("application/json"),
                blame_request(with_argument("pullRequest", json!("1"))),
                Some((StatusCode::BAD_REQUEST, "Pull request must be a number")),
            ),
            (
                "invalid pull request number",
                Method::POST,
                Some("application/json"),
                blame_request(with_argument("pullRequest", json!(0))),
                Some((StatusCode::BAD_REQUEST, "Pull request number must be positive")),
            ),
            (
                "negative pull request number",
                Method::POST,
                Some("application/json"),
                blame_request(with_argument("pullRequest", json!(-3))),
                Some((StatusCode::BAD_REQUEST, "Pull request number must be positive")),
            ),
        ];

        for (name, method, content_type, body, expected) in cases {
            let result = validate(&method, content_type, &body);
            match expected {
                None => assert!(result.is_ok(), "{name}: {result:?}"),
                Some((status, message)) => {
                    let err = result.expect_err(name);
                    assert_eq!(err.status, status, "{name}");
                    assert_eq!(err.message, message, "{name}");
                }
            }
        }
    }

    #[test]
    fn gitlab_repository_may_have_nested_groups() {
        let request = validate(
            &Method::POST,
            Some("application/json"),
            &body(&json!({
                "name": "git-log",
                "arguments": {
                    "provider": "GitLab",
                    "token": "t",
                    "repository": "group/sub/project",
                    "pullRequest": 4
                }
            })),
        )
        .unwrap();
        assert_eq!(request.name, AnalysisName::GitLog);
        assert_eq!(request.provider, ProviderKind::GitLab);
        assert_eq!(request.repository, "group/sub/project");
        assert_eq!(request.change_request, 4);
    }

    #[test]
    fn provider_errors_map_to_status_codes() {
        let auth: ApiError = ProviderError::AuthenticationFailed {
            provider: ProviderKind::GitHub,
            message: "HTTP 401".to_string(),
        }
        .into();
        assert_eq!(auth.status, StatusCode::UNAUTHORIZED);

        let missing: ApiError = ProviderError::ChangeRequestNotFound {
            repository: "o/r".to_string(),
            number: 9,
        }
        .into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let upstream: ApiError = ProviderError::RequestFailed {
            provider: ProviderKind::GitLab,
            status: 502,
            body: String::new(),
        }
        .into();
        assert_eq!(upstream.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    fn blame_analysis(number: u64) -> AnalysisRequest {
        AnalysisRequest {
            name: AnalysisName::GitBlame,
            provider: ProviderKind::GitHub,
            token: "t".to_string(),
            repository: "octo/widgets".to_string(),
            change_request: number,
        }
    }

    fn widgets() -> MockProviderClient {
        MockProviderClient::new(ProviderKind::GitHub)
            .with_change_request(7, &["a.go", "b.go"])
            .with_commit("a.go", "c1", "alice", 3)
            .with_commit("a.go", "c2", "alice", 2)
            .with_commit("b.go", "c3", "bob", 4)
    }

    #[tokio::test]
    async fn blame_data_is_stringified_counts() {
        let response = run_with_client(&widgets(), &blame_analysis(7), &AnalyzerConfig::default())
            .await
            .unwrap();
        assert_eq!(response.status, "success");
        assert_eq!(response.data, Some(json!({"alice": "5", "bob": "4"})));
    }

    #[tokio::test]
    async fn unknown_change_request_is_not_found() {
        let client = widgets();
        let calls = client.call_handle();
        let err = run_with_client(&client, &blame_analysis(99), &AnalyzerConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(calls.count("history "), 0);
    }

    #[tokio::test]
    async fn git_log_returns_exported_text() {
        let request = AnalysisRequest {
            name: AnalysisName::GitLog,
            ..blame_analysis(7)
        };
        let response = run_with_client(&widgets(), &request, &AnalyzerConfig::default())
            .await
            .unwrap();
        let data = response.data.unwrap();
        assert_eq!(data["commits"], 3);
        assert!(data["log"].as_str().unwrap().starts_with("--c1--"));
    }

    #[tokio::test]
    async fn prompts_endpoint_lists_both_analyses() {
        let filter = routes(Arc::new(AnalyzerConfig::default()));
        let response = warp::test::request()
            .method("GET")
            .path("/prompts")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let prompts: Value = serde_json::from_slice(response.body()).unwrap();
        let names: Vec<_> = prompts
            .as_array()
            .unwrap()
            .iter()
            .map(|prompt| prompt["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["git-blame", "git-log"]);
        assert_eq!(prompts[0]["arguments"][3]["name"], "pullRequest");
    }

    #[tokio::test]
    async fn prompts_endpoint_rejects_post() {
        let filter = routes(Arc::new(AnalyzerConfig::default()));
        let response = warp::test::request()
            .method("POST")
            .path("/prompts")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn messages_endpoint_reports_validation_errors_as_json() {
        let filter = routes(Arc::new(AnalyzerConfig::default()));
        let response = warp::test::request()
            .method("POST")
            .path("/messages")
            .header("content-type", "text/plain")
            .body("hello")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let body: AnalysisResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.status, "error");
        assert_eq!(
            body.error.as_deref(),
            Some("Content-Type must be application/json")
        );
    }

    #[tokio::test]
    async fn messages_endpoint_rejects_oversized_body() {
        let filter = routes(Arc::new(AnalyzerConfig::default()));
        let response = warp::test::request()
            .method("POST")
            .path("/messages")
            .header("content-type", "application/json")
            .body(vec![b' '; usize::try_from(MAX_BODY_BYTES).unwrap() + 1])
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: AnalysisResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.error.as_deref(), Some("Request body too large"));
    }

    #[tokio::test]
    async fn messages_endpoint_rejects_get_without_body() {
        let filter = routes(Arc::new(AnalyzerConfig::default()));
        let response = warp::test::request()
            .method("GET")
            .path("/messages")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    async fn github_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "alice"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls"))
            .and(query_param("state", "open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "number": 7,
                    "title": "Add widget",
                    "state": "open",
                    "html_url": "https://github.com/octo/widgets/pull/7"
                }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls/7/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"filename": "a.go"}])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/commits"))
            .and(query_param("path", "a.go"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "sha": "c1",
                    "commit": {"author": {"name": "Alice", "email": "a@example.com"}},
                    "author": {"login": "alice"}
                },
                {
                    "sha": "c2",
                    "commit": {"author": {"name": "Bob", "email": "b@example.com"}},
                    "author": null
                }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/commits/c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [{"filename": "a.go", "additions": 3, "deletions": 1}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/commits/c2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [{"filename": "a.go", "additions": 2, "deletions": 0}]
            })))
            .mount(&server)
            .await;
        server
    }

    fn config_for(server: &MockServer) -> Arc<AnalyzerConfig> {
        Arc::new(AnalyzerConfig {
            github_api_url: server.uri(),
            ..AnalyzerConfig::default()
        })
    }

    async fn post_blame(
        filter_config: Arc<AnalyzerConfig>,
        number: u64,
    ) -> warp::http::Response<Bytes> {
        let filter = routes(filter_config);
        warp::test::request()
            .method("POST")
            .path("/messages")
            .header("content-type", "application/json")
            .body(blame_request(json!({
                "provider": "github",
                "token": "token",
                "repository": "octo/widgets",
                "pullRequest": number
            })))
            .reply(&filter)
            .await
    }

    #[tokio::test]
    async fn end_to_end_blame_against_github() {
        let server = github_server().await;
        let response = post_blame(config_for(&server), 7).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: AnalysisResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.status, "success");
        assert_eq!(body.message.as_deref(), Some("Blame analysis completed"));
        assert_eq!(body.data, Some(json!({"alice": "4", "Bob": "2"})));
    }

    #[tokio::test]
    async fn end_to_end_missing_change_request() {
        let server = github_server().await;
        let response = post_blame(config_for(&server), 8).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn end_to_end_rejected_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
            )
            .mount(&server)
            .await;
        let response = post_blame(config_for(&server), 7).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: AnalysisResponse = serde_json::from_slice(response.body()).unwrap();
        assert!(body.error.unwrap().contains("GitHub authentication failed"));
    }
}
