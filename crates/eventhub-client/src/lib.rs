//! Consumer side of the EventHub push channel: a persisted session, a REST
//! client, a reconnecting stream client and the reconciler that folds pushed
//! envelopes into local state.

pub mod api;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod session;
pub mod stream;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use reconcile::{LocalState, Reconcile};
pub use session::{Session, SessionStore};
pub use stream::{Connection, Connector, RetryPolicy, StreamClient, StreamState, WsConnector};
