mod api;
mod crawler;
mod credential;
mod inspector;
mod score;

pub use api::{DispatchError, RetryKind, TransportError};
pub use crawler::CrawlerError;
pub use credential::{CredentialError, FactoryError, PoolError};
pub use inspector::InspectorError;
pub use score::ScoreError;
