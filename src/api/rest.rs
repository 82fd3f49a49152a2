//! Default [`ApiTransport`] backed by the GitHub REST v3 API.
//!
//! The transport and its pager share one session state (auth mode, last
//! status, pagination links) so continuation fetches see the same identity
//! and callers can observe the most recent status either way.

use backon::{ExponentialBuilder, Retryable};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LINK};
use serde_json::Value;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::pager::RestPager;
use super::{ApiBody, ApiRoute, ApiTransport, AuthMode};
use crate::config::GithubConfig;
use crate::error::TransportError;
use async_trait::async_trait;

/// Transient upstream 5xx answers are retried briefly before surfacing.
static NETWORK_RETRY_POLICY: LazyLock<ExponentialBuilder> = LazyLock::new(|| {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_millis(300))
        .with_max_times(2)
        .with_jitter()
});

/// Pagination URLs from the most recent response's `Link` header.
#[derive(Debug, Clone, Default)]
pub(crate) struct PageLinks {
    pub(crate) next: Option<Url>,
    pub(crate) last: Option<Url>,
    pub(crate) first: Option<Url>,
    pub(crate) prev: Option<Url>,
}

impl PageLinks {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        let mut links = Self::default();
        let Some(raw) = headers.get(LINK).and_then(|value| value.to_str().ok()) else {
            return links;
        };
        for part in raw.split(',') {
            let mut pieces = part.trim().splitn(2, ';');
            let (Some(target), Some(rel)) = (pieces.next(), pieces.next()) else {
                continue;
            };
            let target = target.trim().trim_start_matches('<').trim_end_matches('>');
            let Ok(url) = Url::parse(target) else {
                continue;
            };
            if rel.contains(r#"rel="next""#) {
                links.next = Some(url);
            } else if rel.contains(r#"rel="last""#) {
                links.last = Some(url);
            } else if rel.contains(r#"rel="first""#) {
                links.first = Some(url);
            } else if rel.contains(r#"rel="prev""#) {
                links.prev = Some(url);
            }
        }
        links
    }
}

/// Session state shared between the transport and its pager.
#[derive(Debug, Default)]
pub(crate) struct RestState {
    pub(crate) auth: AuthMode,
    pub(crate) last_status: Option<u16>,
    pub(crate) links: PageLinks,
}

pub struct RestClient {
    http: reqwest::Client,
    base: Url,
    state: Arc<Mutex<RestState>>,
}

impl RestClient {
    pub fn new(base: Url, user_agent: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base,
            state: Arc::new(Mutex::new(RestState::default())),
        })
    }

    pub fn from_config(github: &GithubConfig) -> Result<Self, TransportError> {
        let base = Url::parse(&github.api_base)
            .map_err(|err| TransportError::Message(format!("bad api_base: {err}")))?;
        Self::new(
            base,
            &github.user_agent,
            Duration::from_secs(github.timeout_secs),
        )
    }

    /// A pager sharing this client's session state.
    pub fn pager(&self) -> RestPager {
        RestPager::new(self.http.clone(), self.base.clone(), Arc::clone(&self.state))
    }

    fn lock(&self) -> MutexGuard<'_, RestState> {
        self.state.lock().expect("rest session state poisoned")
    }
}

#[async_trait]
impl ApiTransport for RestClient {
    fn authenticate(&mut self, auth: &AuthMode) {
        self.lock().auth = auth.clone();
    }

    async fn execute(
        &mut self,
        route: &ApiRoute,
        args: &[Value],
    ) -> Result<ApiBody, TransportError> {
        let url = endpoint(&self.base, route, args)?;
        let auth = self.lock().auth.clone();
        let response = send_with_retry(&self.http, url, &auth).await?;
        read_reply(&self.state, response).await
    }

    fn last_status(&self) -> Option<u16> {
        self.lock().last_status
    }
}

/// Resolve a route + argument list onto a REST endpoint.
pub(crate) fn endpoint(
    base: &Url,
    route: &ApiRoute,
    args: &[Value],
) -> Result<Url, TransportError> {
    let arg = |at: usize| -> Result<String, TransportError> {
        match args.get(at) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(TransportError::Message(format!(
                "route {}/{} requires at least {} argument(s)",
                route.namespace,
                route.method,
                at + 1
            ))),
        }
    };

    let join = |path: String| -> Result<Url, TransportError> {
        base.join(&path)
            .map_err(|err| TransportError::Message(format!("bad endpoint path {path:?}: {err}")))
    };

    match (route.namespace.as_str(), route.method.as_str()) {
        ("repo", "show") => join(format!("repos/{}/{}", arg(0)?, arg(1)?)),
        ("repo", "participation") => {
            join(format!("repos/{}/{}/stats/participation", arg(0)?, arg(1)?))
        }
        ("repo", "branches") => join(format!("repos/{}/{}/branches", arg(0)?, arg(1)?)),
        ("repo", "tags") => join(format!("repos/{}/{}/tags", arg(0)?, arg(1)?)),
        ("repo", "releases") => join(format!("repos/{}/{}/releases", arg(0)?, arg(1)?)),
        ("repo", "contributors") => join(format!("repos/{}/{}/contributors", arg(0)?, arg(1)?)),
        ("repo", "commits") => join(format!("repos/{}/{}/commits", arg(0)?, arg(1)?)),
        ("search", "repositories" | "repos") => {
            let mut url = join("search/repositories".to_string())?;
            url.query_pairs_mut().append_pair("q", &arg(0)?);
            Ok(url)
        }
        ("rate_limit", "show") => join("rate_limit".to_string()),
        _ => Err(TransportError::Message(format!(
            "unknown API route {}/{}",
            route.namespace, route.method
        ))),
    }
}

/// GET `url` with the current auth mode, retrying transient server errors.
pub(crate) async fn send_with_retry(
    http: &reqwest::Client,
    url: Url,
    auth: &AuthMode,
) -> Result<reqwest::Response, TransportError> {
    let response = (|| {
        let http = http.clone();
        let url = url.clone();
        let auth = auth.clone();
        async move {
            let mut request = http
                .get(url)
                .header(reqwest::header::ACCEPT, "application/vnd.github+json");
            request = match &auth {
                AuthMode::Token(token) => request.bearer_auth(token),
                AuthMode::ClientSecret {
                    client_id,
                    client_secret,
                } => request.basic_auth(client_id, Some(client_secret)),
                AuthMode::None => request,
            };
            let response = request.send().await?;
            if response.status().is_server_error() {
                let status = response.status();
                let err = response.error_for_status_ref().unwrap_err();
                debug!(%status, url = %response.url(), "GitHub answered a server error (will retry)");
                return Err(err);
            }
            Ok(response)
        }
    })
    .retry(*NETWORK_RETRY_POLICY)
    .await?;
    Ok(response)
}

/// Record status + links, then interpret the payload.
pub(crate) async fn read_reply(
    state: &Arc<Mutex<RestState>>,
    response: reqwest::Response,
) -> Result<ApiBody, TransportError> {
    let status = response.status();
    let headers = response.headers().clone();
    {
        let mut guard = state.lock().expect("rest session state poisoned");
        guard.last_status = Some(status.as_u16());
        guard.links = PageLinks::from_headers(&headers);
    }

    if status == StatusCode::ACCEPTED {
        return Ok(ApiBody::Empty);
    }
    if is_rate_limited(status, &headers) {
        return Err(match header_i64(&headers, "x-ratelimit-reset") {
            Some(reset) => TransportError::RateLimited { reset },
            None => TransportError::Message("API rate limit exceeded".to_string()),
        });
    }
    if !status.is_success() {
        return Err(TransportError::Status(status.as_u16()));
    }

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(ApiBody::Empty);
    }
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => Ok(ApiBody::Json(value)),
        Err(_) => Ok(ApiBody::Text(String::from_utf8_lossy(&bytes).into_owned())),
    }
}

fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    (status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS)
        && header_i64(headers, "x-ratelimit-remaining") == Some(0)
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}
