//! Scope-aware dispatcher: routes API calls through the credential pool,
//! authenticates the transport per credential variant, rotates on rate-limit
//! exhaustion and re-polls 202 answers, both under bounded retry counters.

use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{ApiBody, ApiRoute, ApiTransport, AuthMode, Pager};
use crate::credential::pool::PoolStore;
use crate::credential::{Access, Credential, Scope, Secret};
use crate::error::{DispatchError, RetryKind, TransportError};
use crate::utils::clock::{SharedClock, system_clock};

/// Upper bound on credential rotations per call and on 202 re-polls per
/// invoke. Part of the contract, not a tuning knob.
const RETRY_LIMIT: u32 = 5;
/// Assumed quota window when a rate-limit error names no reset epoch.
const FALLBACK_RESET_SECS: i64 = 600;
/// Pause before re-polling an endpoint that answered 202.
const ACCEPTED_POLL: Duration = Duration::from_secs(1);

/// What a protected round actually invokes.
enum Invocation<'a> {
    Call { route: &'a ApiRoute, args: &'a [Value] },
    Fetch { route: &'a ApiRoute, args: &'a [Value] },
    FetchAll { route: &'a ApiRoute, args: &'a [Value] },
    Next,
    Last,
}

pub struct Dispatcher<T, P> {
    transport: T,
    pager: P,
    pool: Option<PoolStore>,
    custom: Option<Credential>,
    clock: SharedClock,
    last_scope: Scope,
}

impl<T: ApiTransport, P: Pager> Dispatcher<T, P> {
    pub fn new(transport: T, pager: P) -> Self {
        Self {
            transport,
            pager,
            pool: None,
            custom: None,
            clock: system_clock(),
            last_scope: Scope::Core,
        }
    }

    pub fn with_pool(mut self, pool: PoolStore) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn pool(&self) -> Option<&PoolStore> {
        self.pool.as_ref()
    }

    /// Install a single credential; the pool is bypassed while one is set.
    /// An explicit anonymous credential is honored (de-authenticated calls).
    pub fn use_credential(&mut self, credential: Credential) {
        self.custom = Some(credential);
    }

    pub fn clear_credential(&mut self) {
        self.custom = None;
    }

    /// Resolve `path` and run the call under the rate-limit protocol.
    pub async fn call(&mut self, path: &str, args: &[Value]) -> Result<Value, DispatchError> {
        let route = ApiRoute::parse(path)?;
        let scope = route.scope();
        self.last_scope = scope;
        self.run_protected(scope, &Invocation::Call { route: &route, args })
            .await
    }

    /// First page of a paginated listing.
    pub async fn fetch(&mut self, path: &str, args: &[Value]) -> Result<Value, DispatchError> {
        let route = ApiRoute::parse(path)?;
        let scope = route.scope();
        self.last_scope = scope;
        self.run_protected(scope, &Invocation::Fetch { route: &route, args })
            .await
    }

    /// Every page of a paginated listing, concatenated.
    pub async fn fetch_all(&mut self, path: &str, args: &[Value]) -> Result<Value, DispatchError> {
        let route = ApiRoute::parse(path)?;
        let scope = route.scope();
        self.last_scope = scope;
        self.run_protected(scope, &Invocation::FetchAll { route: &route, args })
            .await
    }

    /// Next page of the most recent listing, under the originating scope.
    pub async fn next(&mut self) -> Result<Value, DispatchError> {
        self.run_protected(self.last_scope, &Invocation::Next).await
    }

    /// Last page of the most recent listing, under the originating scope.
    pub async fn last(&mut self) -> Result<Value, DispatchError> {
        self.run_protected(self.last_scope, &Invocation::Last).await
    }

    /// Whether the most recent listing has a further page. Inspects pager
    /// state only; consumes no quota.
    pub fn has_next(&self) -> bool {
        self.pager.has_next()
    }

    async fn run_protected(
        &mut self,
        scope: Scope,
        invocation: &Invocation<'_>,
    ) -> Result<Value, DispatchError> {
        if let Some(custom) = self.custom.clone() {
            let auth = auth_mode(&custom);
            self.transport.authenticate(&auth);
            return self.invoke(invocation).await;
        }
        if self.pool.is_none() {
            return Err(DispatchError::NoCredentials);
        }

        let mut rotations: u32 = 0;
        loop {
            let Some(pool) = self.pool.as_mut() else {
                return Err(DispatchError::NoCredentials);
            };
            let credential = match pool.current(scope) {
                Some(current) => current.clone(),
                None => pool.get_token(scope)?,
            };

            let now = self.clock.epoch();
            if let Access::WaitSeconds(wait) = credential.can_access(scope, now) {
                if rotations >= RETRY_LIMIT {
                    return Err(DispatchError::RetryExhausted {
                        kind: RetryKind::Rotation,
                        attempts: rotations,
                    });
                }
                rotations += 1;
                warn!(
                    identity = %credential.short_identity(),
                    %scope,
                    wait,
                    "scope exhausted; waiting for quota reset"
                );
                sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let auth = auth_mode(&credential);
            self.transport.authenticate(&auth);
            match self.invoke(invocation).await {
                Ok(value) => return Ok(value),
                Err(DispatchError::Transport(err)) => {
                    let now = self.clock.epoch();
                    let Some(reset) = rate_limit_reset(&err, now) else {
                        return Err(DispatchError::Transport(err));
                    };
                    if rotations >= RETRY_LIMIT {
                        return Err(DispatchError::RetryExhausted {
                            kind: RetryKind::Rotation,
                            attempts: rotations,
                        });
                    }
                    rotations += 1;
                    warn!(
                        identity = %credential.short_identity(),
                        %scope,
                        reset,
                        "rate limit exceeded; rotating credential"
                    );
                    let Some(pool) = self.pool.as_mut() else {
                        return Err(DispatchError::NoCredentials);
                    };
                    pool.next_token(scope, reset)?;
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// One invocation with 202 re-polls; authentication has already happened.
    async fn invoke(&mut self, invocation: &Invocation<'_>) -> Result<Value, DispatchError> {
        let mut retries: u32 = 0;
        loop {
            let body = match invocation {
                Invocation::Call { route, args } => self.transport.execute(route, args).await,
                Invocation::Fetch { route, args } => self.pager.fetch(route, args).await,
                Invocation::FetchAll { route, args } => self.pager.fetch_all(route, args).await,
                Invocation::Next => self.pager.fetch_next().await,
                Invocation::Last => self.pager.fetch_last().await,
            }?;

            if self.transport.last_status() == Some(202) {
                if retries >= RETRY_LIMIT {
                    return Err(DispatchError::RetryExhausted {
                        kind: RetryKind::Accepted,
                        attempts: retries,
                    });
                }
                retries += 1;
                debug!(retries, "endpoint answered 202; polling again shortly");
                sleep(ACCEPTED_POLL).await;
                continue;
            }

            return match body {
                ApiBody::Json(value) => Ok(value),
                ApiBody::Empty => Ok(Value::Null),
                ApiBody::Text(text) => Err(DispatchError::UnexpectedResponse(preview(&text))),
            };
        }
    }
}

/// Map a credential variant onto the transport's authentication entrypoint.
fn auth_mode(credential: &Credential) -> AuthMode {
    match credential.secret() {
        Secret::Null => AuthMode::None,
        Secret::Pat { token } => AuthMode::Token(token.clone()),
        Secret::ClientSecret {
            client_id,
            client_secret,
        } => AuthMode::ClientSecret {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
        },
    }
}

/// Reset epoch when `err` is a rate-limit signal. Typed signals carry their
/// own reset; generic errors mentioning "rate limit exceeded" fall back to
/// `now + 600`.
fn rate_limit_reset(err: &TransportError, now: i64) -> Option<i64> {
    match err {
        TransportError::RateLimited { reset } => Some(*reset),
        TransportError::Message(message)
            if message.to_ascii_lowercase().contains("rate limit exceeded") =>
        {
            Some(now + FALLBACK_RESET_SECS)
        }
        _ => None,
    }
}

fn preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 120;
    if text.chars().count() <= PREVIEW_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_reset_prefers_the_typed_signal() {
        let err = TransportError::RateLimited { reset: 1234 };
        assert_eq!(rate_limit_reset(&err, 1000), Some(1234));
    }

    #[test]
    fn rate_limit_reset_matches_generic_messages_case_insensitively() {
        let err = TransportError::Message("API Rate Limit Exceeded for 10.0.0.1".to_string());
        assert_eq!(rate_limit_reset(&err, 1000), Some(1600));
    }

    #[test]
    fn other_errors_are_not_rate_limits() {
        let err = TransportError::Message("boom".to_string());
        assert_eq!(rate_limit_reset(&err, 1000), None);
        let err = TransportError::Status(500);
        assert_eq!(rate_limit_reset(&err, 1000), None);
    }

    #[test]
    fn auth_mode_follows_the_credential_variant() {
        let anon = Credential::anonymous();
        assert_eq!(auth_mode(&anon), AuthMode::None);

        let pat = Credential::pat("t").expect("pat");
        assert_eq!(auth_mode(&pat), AuthMode::Token("t".to_string()));

        let pair = Credential::client_secret("id", "s").expect("client secret");
        assert_eq!(
            auth_mode(&pair),
            AuthMode::ClientSecret {
                client_id: "id".to_string(),
                client_secret: "s".to_string()
            }
        );
    }

    #[test]
    fn preview_truncates_long_payloads() {
        let long = "x".repeat(500);
        let shown = preview(&long);
        assert!(shown.chars().count() <= 121);
        assert!(shown.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }
}
