//! Server selection engine: keeps a cached snapshot of the provider's
//! server directory, filters it by entitlement, picks an endpoint
//! (fastest / by country / by feature / by name / random), and resolves the
//! concrete entry/exit IP pair to hand to the certificate issuer.

pub mod cache;
pub mod fastest;
pub mod filter;
pub mod resolve;
pub mod select;
pub mod servername;
pub mod session;

use chrono::{DateTime, Utc};
use vpn_api::LogicalServer;

pub use cache::{DirectoryCache, DirectoryStore, FileStore};
pub use resolve::Endpoint;
pub use select::{CertIssuer, CertRef, Selection, ServerSelector};
pub use servername::Servername;
pub use session::{ApiSession, Session};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("empty server pool: {0}")]
    EmptyPool(String),

    #[error(transparent)]
    Transport(#[from] vpn_api::Error),

    #[error("cache persistence failed: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("missing env var: {0}")]
    MissingEnv(String),

    #[error("certificate issuance failed: {0}")]
    Issuance(BoxError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// One snapshot of the provider's server directory, as read back from the
/// local cache.
#[derive(Debug, Clone)]
pub struct ServerDirectory {
    pub servers: Vec<LogicalServer>,
    pub fetched_at: DateTime<Utc>,
}
