pub mod dispatcher;
pub mod pager;
pub mod rest;

use async_trait::async_trait;
use serde_json::Value;

use crate::credential::Scope;
use crate::error::{DispatchError, TransportError};

/// Authentication modes every transport must support. Switching modes drops
/// any previously installed identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Bearer-style personal access token.
    Token(String),
    /// OAuth application id + secret.
    ClientSecret {
        client_id: String,
        client_secret: String,
    },
    /// Explicitly de-authenticated.
    #[default]
    None,
}

/// A dotted API path resolved into transport navigations: the first segment
/// selects a namespace, intermediate segments are sub-navigations, the last
/// is the method invoked with the argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoute {
    pub namespace: String,
    pub trail: Vec<String>,
    pub method: String,
}

impl ApiRoute {
    /// Splits `repo/show`-style paths. At least namespace + method required.
    pub fn parse(path: &str) -> Result<Self, DispatchError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() < 2 {
            return Err(DispatchError::BadApiPath(path.to_string()));
        }
        Ok(Self {
            namespace: segments[0].to_string(),
            trail: segments[1..segments.len() - 1]
                .iter()
                .map(ToString::to_string)
                .collect(),
            method: segments[segments.len() - 1].to_string(),
        })
    }

    /// Rate-limit bucket this route draws from.
    pub fn scope(&self) -> Scope {
        match self.namespace.as_str() {
            "search" => Scope::Search,
            "rate_limit" => Scope::None,
            _ => Scope::Core,
        }
    }
}

/// Decoded response payload handed back by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    /// Plain JSON data: scalar, array or object.
    Json(Value),
    /// A payload that is not plain JSON data. The dispatcher never passes
    /// these through to callers.
    Text(String),
    /// No payload, e.g. 202 while the upstream is still computing.
    Empty,
}

/// The HTTP client collaborator the dispatcher drives.
#[async_trait]
pub trait ApiTransport: Send {
    /// Switch authentication; any prior identity is dropped.
    fn authenticate(&mut self, auth: &AuthMode);

    /// Execute `route` with positional arguments.
    async fn execute(
        &mut self,
        route: &ApiRoute,
        args: &[Value],
    ) -> Result<ApiBody, TransportError>;

    /// Status code of the most recent HTTP response, if any. Pager fetches
    /// publish their status here too.
    fn last_status(&self) -> Option<u16>;
}

/// Stateful pagination collaborator, coupled to its transport's session.
#[async_trait]
pub trait Pager: Send {
    /// First page of a listing.
    async fn fetch(&mut self, route: &ApiRoute, args: &[Value])
    -> Result<ApiBody, TransportError>;

    /// Every page of a listing, concatenated.
    async fn fetch_all(
        &mut self,
        route: &ApiRoute,
        args: &[Value],
    ) -> Result<ApiBody, TransportError>;

    /// The next page, or [`ApiBody::Empty`] when there is none.
    async fn fetch_next(&mut self) -> Result<ApiBody, TransportError>;

    /// The last page, or [`ApiBody::Empty`] when there is none.
    async fn fetch_last(&mut self) -> Result<ApiBody, TransportError>;

    fn has_next(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_namespace_trail_and_method() {
        let route = ApiRoute::parse("repo/show").expect("route");
        assert_eq!(route.namespace, "repo");
        assert!(route.trail.is_empty());
        assert_eq!(route.method, "show");

        let route = ApiRoute::parse("repo/stats/participation").expect("route");
        assert_eq!(route.trail, vec!["stats".to_string()]);
        assert_eq!(route.method, "participation");
    }

    #[test]
    fn short_paths_are_rejected() {
        assert!(matches!(
            ApiRoute::parse("repo"),
            Err(DispatchError::BadApiPath(_))
        ));
        assert!(matches!(
            ApiRoute::parse(""),
            Err(DispatchError::BadApiPath(_))
        ));
        // A stray slash does not make a second segment.
        assert!(matches!(
            ApiRoute::parse("repo/"),
            Err(DispatchError::BadApiPath(_))
        ));
    }

    #[test]
    fn scope_classification_by_namespace() {
        assert_eq!(ApiRoute::parse("search/repositories").expect("route").scope(), Scope::Search);
        assert_eq!(ApiRoute::parse("rate_limit/show").expect("route").scope(), Scope::None);
        assert_eq!(ApiRoute::parse("repo/show").expect("route").scope(), Scope::Core);
        assert_eq!(ApiRoute::parse("user/show").expect("route").scope(), Scope::Core);
    }
}
