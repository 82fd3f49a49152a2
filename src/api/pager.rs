//! `Link`-header pager for the REST transport. Shares the client's session
//! state, so continuation fetches reuse the current auth mode and publish
//! their status through the transport.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

use super::rest::{RestState, endpoint, read_reply, send_with_retry};
use super::{ApiBody, ApiRoute, Pager};
use crate::error::TransportError;

pub struct RestPager {
    http: reqwest::Client,
    base: Url,
    state: Arc<Mutex<RestState>>,
}

impl RestPager {
    pub(crate) fn new(http: reqwest::Client, base: Url, state: Arc<Mutex<RestState>>) -> Self {
        Self { http, base, state }
    }

    fn lock(&self) -> MutexGuard<'_, RestState> {
        self.state.lock().expect("rest session state poisoned")
    }

    async fn get(&self, url: Url) -> Result<ApiBody, TransportError> {
        let auth = self.lock().auth.clone();
        let response = send_with_retry(&self.http, url, &auth).await?;
        read_reply(&self.state, response).await
    }
}

#[async_trait]
impl Pager for RestPager {
    async fn fetch(
        &mut self,
        route: &ApiRoute,
        args: &[Value],
    ) -> Result<ApiBody, TransportError> {
        let url = endpoint(&self.base, route, args)?;
        self.get(url).await
    }

    async fn fetch_all(
        &mut self,
        route: &ApiRoute,
        args: &[Value],
    ) -> Result<ApiBody, TransportError> {
        let mut items = Vec::new();
        let mut body = self.fetch(route, args).await?;
        loop {
            match body {
                ApiBody::Json(Value::Array(chunk)) => items.extend(chunk),
                // Non-list endpoints have nothing to concatenate.
                other => return Ok(other),
            }
            let next = self.lock().links.next.clone();
            let Some(next) = next else { break };
            body = self.get(next).await?;
        }
        Ok(ApiBody::Json(Value::Array(items)))
    }

    async fn fetch_next(&mut self) -> Result<ApiBody, TransportError> {
        let next = self.lock().links.next.clone();
        match next {
            Some(url) => self.get(url).await,
            None => Ok(ApiBody::Empty),
        }
    }

    async fn fetch_last(&mut self) -> Result<ApiBody, TransportError> {
        let last = self.lock().links.last.clone();
        match last {
            Some(url) => self.get(url).await,
            None => Ok(ApiBody::Empty),
        }
    }

    fn has_next(&self) -> bool {
        self.lock().links.next.is_some()
    }
}
