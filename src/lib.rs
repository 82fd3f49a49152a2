pub mod api;
pub mod config;
pub mod crawler;
pub mod credential;
pub mod error;
pub mod inspector;
pub mod scoring;
pub mod utils;

pub use api::dispatcher::Dispatcher;
pub use api::rest::RestClient;
pub use config::Config;
pub use credential::pool::PoolStore;
pub use credential::{Access, Credential, Scope};
pub use error::{DispatchError, InspectorError, PoolError};
pub use inspector::RepoInspector;
