use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use vpn_api::LogicalsResponse;

use crate::session::Session;
use crate::{Error, Result, ServerDirectory};

/// How long a cached directory stays fresh, in minutes.
const REFRESH_INTERVAL_MIN: i64 = 15;

/// Storage backing a `DirectoryCache`.
pub trait DirectoryStore: Send + Sync {
    /// Load the stored snapshot, or `None` if nothing is stored yet.
    fn load(&self) -> Result<Option<ServerDirectory>>;

    /// Replace the stored snapshot with the raw directory response.
    fn store(&self, directory: &LogicalsResponse) -> Result<()>;
}

/// Directory snapshots persisted as a single JSON file.
///
/// The file holds the raw `/vpn/logicals` body; its mtime is the fetch
/// timestamp.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("cache path is empty".into()));
        }
        if path.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "cache path {} is a directory, file path expected",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    /// Store at the default location: `$TUNBOX_CACHE_DIR/serverlist.json`,
    /// falling back to `~/.cache/tunbox/serverlist.json`.
    pub fn default_path() -> Result<Self> {
        dotenvy::dotenv().ok();

        let dir = match std::env::var("TUNBOX_CACHE_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => {
                let home = std::env::var("HOME").map_err(|_| Error::MissingEnv("HOME".into()))?;
                Path::new(&home).join(".cache").join("tunbox")
            }
        };
        Self::new(dir.join("serverlist.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DirectoryStore for FileStore {
    fn load(&self) -> Result<Option<ServerDirectory>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let parsed: LogicalsResponse = serde_json::from_str(&raw)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let modified = fs::metadata(&self.path)?.modified()?;

        Ok(Some(ServerDirectory {
            servers: parsed.logical_servers,
            fetched_at: DateTime::from(modified),
        }))
    }

    fn store(&self, directory: &LogicalsResponse) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let body = serde_json::to_string(directory)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        // Write-then-rename so a crash mid-write never truncates the cache.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Keeps the local directory snapshot fresh within the staleness window.
pub struct DirectoryCache<S = FileStore> {
    store: S,
    max_age: Duration,
}

impl<S: DirectoryStore> DirectoryCache<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_age: Duration::minutes(REFRESH_INTERVAL_MIN),
        }
    }

    /// Override the staleness window.
    pub fn with_max_age(store: S, max_age: Duration) -> Self {
        Self { store, max_age }
    }

    /// Refetch the directory if the stored snapshot is missing or older
    /// than the staleness window, or when `force` is set.
    pub async fn ensure_fresh(&self, session: &dyn Session, force: bool) -> Result<()> {
        let stale = match self.store.load()? {
            None => true,
            Some(snapshot) => Utc::now() - self.max_age > snapshot.fetched_at,
        };

        if !(stale || force) {
            debug!("server directory cache is fresh");
            return Ok(());
        }

        let directory = session.server_directory().await?;
        self.store.store(&directory)?;
        info!(
            servers = directory.logical_servers.len(),
            "cached server directory"
        );
        Ok(())
    }

    /// The current snapshot. `ensure_fresh` must have succeeded at least
    /// once for this to return anything.
    pub fn snapshot(&self) -> Result<ServerDirectory> {
        self.store.load()?.ok_or_else(|| {
            Error::Persistence(io::Error::new(
                io::ErrorKind::NotFound,
                "server directory cache is missing",
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use vpn_api::{Feature, LogicalServer, PhysicalServer};

    use super::*;

    fn directory_body() -> LogicalsResponse {
        LogicalsResponse {
            logical_servers: vec![LogicalServer {
                name: "PT#1".into(),
                domain: "pt-01.tunbox.net".into(),
                tier: 0,
                status: 1,
                score: 1.5,
                features: Feature::None,
                exit_country: "PT".into(),
                servers: vec![PhysicalServer {
                    entry_ip: "185.90.10.4".into(),
                    exit_ip: "185.90.10.4".into(),
                    status: 1,
                    domain: "pt-01.tunbox.net".into(),
                }],
            }],
        }
    }

    struct MockSession {
        directory: LogicalsResponse,
        fetches: AtomicUsize,
    }

    impl MockSession {
        fn new(directory: LogicalsResponse) -> Self {
            Self {
                directory,
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Session for MockSession {
        async fn server_directory(&self) -> vpn_api::Result<LogicalsResponse> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.directory.clone())
        }

        async fn max_tier(&self) -> vpn_api::Result<u8> {
            Ok(0)
        }
    }

    struct MemoryStore {
        inner: Mutex<Option<(LogicalsResponse, DateTime<Utc>)>>,
    }

    impl MemoryStore {
        fn empty() -> Self {
            Self {
                inner: Mutex::new(None),
            }
        }

        fn aged(directory: LogicalsResponse, fetched_at: DateTime<Utc>) -> Self {
            Self {
                inner: Mutex::new(Some((directory, fetched_at))),
            }
        }
    }

    impl DirectoryStore for MemoryStore {
        fn load(&self) -> Result<Option<ServerDirectory>> {
            Ok(self.inner.lock().unwrap().as_ref().map(|(d, at)| {
                ServerDirectory {
                    servers: d.logical_servers.clone(),
                    fetched_at: *at,
                }
            }))
        }

        fn store(&self, directory: &LogicalsResponse) -> Result<()> {
            *self.inner.lock().unwrap() = Some((directory.clone(), Utc::now()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn first_run_fetches_then_stays_fresh() {
        let session = MockSession::new(directory_body());
        let cache = DirectoryCache::new(MemoryStore::empty());

        cache.ensure_fresh(&session, false).await.unwrap();
        assert_eq!(session.fetch_count(), 1);
        assert_eq!(cache.snapshot().unwrap().servers.len(), 1);

        // Second call right after must not refetch.
        cache.ensure_fresh(&session, false).await.unwrap();
        assert_eq!(session.fetch_count(), 1);
    }

    #[tokio::test]
    async fn stale_snapshot_is_refetched() {
        let session = MockSession::new(directory_body());
        let stale_at = Utc::now() - Duration::minutes(16);
        let cache = DirectoryCache::new(MemoryStore::aged(directory_body(), stale_at));

        cache.ensure_fresh(&session, false).await.unwrap();
        assert_eq!(session.fetch_count(), 1);
    }

    #[tokio::test]
    async fn fresh_snapshot_is_kept_unless_forced() {
        let session = MockSession::new(directory_body());
        let recent = Utc::now() - Duration::minutes(1);
        let cache = DirectoryCache::new(MemoryStore::aged(directory_body(), recent));

        cache.ensure_fresh(&session, false).await.unwrap();
        assert_eq!(session.fetch_count(), 0);

        cache.ensure_fresh(&session, true).await.unwrap();
        assert_eq!(session.fetch_count(), 1);
    }

    #[tokio::test]
    async fn file_store_round_trips_through_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("serverlist.json")).unwrap();

        let session = MockSession::new(directory_body());
        let cache = DirectoryCache::new(store);

        cache.ensure_fresh(&session, false).await.unwrap();
        assert_eq!(session.fetch_count(), 1);

        let snapshot = cache.snapshot().unwrap();
        assert_eq!(snapshot.servers[0].name, "PT#1");

        // mtime is recent, so a follow-up call is a no-op.
        cache.ensure_fresh(&session, false).await.unwrap();
        assert_eq!(session.fetch_count(), 1);
    }

    #[test]
    fn file_store_rejects_empty_path() {
        assert!(matches!(
            FileStore::new(""),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn file_store_rejects_directory_path() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            FileStore::new(dir.path()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let cache = DirectoryCache::new(MemoryStore::empty());
        assert!(matches!(cache.snapshot(), Err(Error::Persistence(_))));
    }

    #[test]
    fn corrupt_cache_file_surfaces_as_persistence_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("serverlist.json");
        fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path).unwrap();
        assert!(matches!(store.load(), Err(Error::Persistence(_))));
    }
}
