use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::info;
use vpn_api::LogicalServer;

use crate::cache::{DirectoryCache, DirectoryStore, FileStore};
use crate::servername::Servername;
use crate::session::Session;
use crate::{BoxError, Error, Result, ServerDirectory, fastest, filter, resolve};

/// Opaque reference to an issued connection certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertRef(pub String);

/// External certificate-generation collaborator. The selection engine hands
/// it the chosen endpoint and passes its artifact through untouched.
#[async_trait]
pub trait CertIssuer: Send + Sync {
    async fn issue(
        &self,
        protocol: &str,
        servername: &str,
        entry_ip: &str,
    ) -> std::result::Result<CertRef, BoxError>;
}

/// Outcome of one selection: everything the caller needs to connect.
#[derive(Debug, Clone)]
pub struct Selection {
    pub servername: String,
    pub domain: String,
    pub entry_ip: String,
    pub certificate: CertRef,
}

/// Composes cache, filtering, ranking, and endpoint resolution into the
/// five selection strategies. Stateless across calls apart from the cache.
pub struct ServerSelector<S = FileStore> {
    session: Arc<dyn Session>,
    issuer: Arc<dyn CertIssuer>,
    cache: DirectoryCache<S>,
    rng: Mutex<StdRng>,
}

impl<S: DirectoryStore> ServerSelector<S> {
    pub fn new(
        session: Arc<dyn Session>,
        issuer: Arc<dyn CertIssuer>,
        cache: DirectoryCache<S>,
    ) -> Self {
        Self::with_rng(session, issuer, cache, StdRng::from_os_rng())
    }

    /// Like `new`, with a caller-seeded RNG for reproducible draws.
    pub fn with_rng(
        session: Arc<dyn Session>,
        issuer: Arc<dyn CertIssuer>,
        cache: DirectoryCache<S>,
        rng: StdRng,
    ) -> Self {
        Self {
            session,
            issuer,
            cache,
            rng: Mutex::new(rng),
        }
    }

    /// Connect to the overall fastest server.
    pub async fn fastest(&self, protocol: &str) -> Result<Selection> {
        let (_, usable) = self.prepare(protocol).await?;
        let pool = filter::exclude_features(usable.clone(), &filter::DEFAULT_EXCLUDED);

        let servername = {
            let mut rng = self.rng();
            fastest::pick(&pool, &mut *rng)?.name.clone()
        };

        self.finalize(protocol, &servername, &usable).await
    }

    /// Connect to the fastest server exiting in the given country.
    pub async fn fastest_in_country(&self, protocol: &str, country: &str) -> Result<Selection> {
        let (_, usable) = self.prepare(protocol).await?;
        let pool = filter::exclude_features(usable.clone(), &filter::DEFAULT_EXCLUDED);
        let pool = filter::by_country(pool, country)?;

        let servername = {
            let mut rng = self.rng();
            fastest::pick(&pool, &mut *rng)?.name.clone()
        };

        self.finalize(protocol, &servername, &usable).await
    }

    /// Connect to a specific server by (free-form) name.
    pub async fn by_name(&self, protocol: &str, raw_name: &str) -> Result<Selection> {
        let servername = raw_name.parse::<Servername>()?.to_string();

        let (directory, usable) = self.prepare(protocol).await?;

        if !directory.servers.iter().any(|s| s.name == servername) {
            return Err(Error::NotFound(format!(
                "\"{servername}\" is not an existing server"
            )));
        }
        if !usable.iter().any(|s| s.name == servername) {
            return Err(Error::NotFound(format!(
                "{servername} is either under maintenance or inaccessible with your plan"
            )));
        }

        self.finalize(protocol, &servername, &usable).await
    }

    /// Connect to the fastest server carrying the given feature literal
    /// (`sc`, `tor`, `p2p`, `stream`, `ipv6`).
    pub async fn by_feature(&self, protocol: &str, literal: &str) -> Result<Selection> {
        let feature = filter::feature_from_literal(literal)?;

        let (_, usable) = self.prepare(protocol).await?;
        let pool = filter::by_feature(usable.clone(), feature)?;

        let servername = {
            let mut rng = self.rng();
            fastest::pick(&pool, &mut *rng)?.name.clone()
        };

        self.finalize(protocol, &servername, &usable).await
    }

    /// Connect to a uniformly random usable server.
    pub async fn random(&self, protocol: &str) -> Result<Selection> {
        let (_, usable) = self.prepare(protocol).await?;

        let servername = {
            let mut rng = self.rng();
            usable
                .choose(&mut *rng)
                .ok_or_else(|| Error::EmptyPool("no usable servers".into()))?
                .name
                .clone()
        };

        self.finalize(protocol, &servername, &usable).await
    }

    /// Shared prelude: validate input, refresh the cache, and project the
    /// usable subset for the account's tier.
    async fn prepare(&self, protocol: &str) -> Result<(ServerDirectory, Vec<LogicalServer>)> {
        if protocol.trim().is_empty() {
            return Err(Error::InvalidArgument("protocol is empty".into()));
        }

        self.cache.ensure_fresh(self.session.as_ref(), false).await?;
        let directory = self.cache.snapshot()?;

        let tier = self.session.max_tier().await?;
        let usable = filter::usable_servers(&directory, tier);

        Ok((directory, usable))
    }

    /// Shared postlude: resolve the endpoint and hand it to the issuer.
    async fn finalize(
        &self,
        protocol: &str,
        servername: &str,
        usable: &[LogicalServer],
    ) -> Result<Selection> {
        let endpoint = {
            let mut rng = self.rng();
            resolve::resolve(servername, usable, &mut *rng)?
        };

        info!(
            server = servername,
            domain = %endpoint.domain,
            entry_ip = %endpoint.entry_ip,
            "selected server"
        );

        let certificate = self
            .issuer
            .issue(protocol, servername, &endpoint.entry_ip)
            .await
            .map_err(Error::Issuance)?;

        Ok(Selection {
            servername: servername.to_string(),
            domain: endpoint.domain,
            entry_ip: endpoint.entry_ip,
            certificate,
        })
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
