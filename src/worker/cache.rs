//! In-process model of the browser Cache API and of the generated worker.
//!
//! The script in `static/service-worker.js` runs in browsers we cannot drive
//! from unit tests, so its two event handlers are mirrored here over a
//! [`CacheStorage`] and a pluggable [`Network`]. Both must stay in sync:
//!
//! | Script                          | Model                           |
//! |---------------------------------|---------------------------------|
//! | `precache()` on `install`       | [`OfflineWorker::install`]      |
//! | `evictStale(cache)`             | eviction half of `install`      |
//! | `cache.addAll(requests)`        | [`Cache::add_all`]              |
//! | `fetch` listener + `fromCache`  | [`OfflineWorker::fetch`]        |

use super::{WorkerConfig, WorkerError};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use url::Url;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: Url,
    pub headers: BTreeMap<String, String>,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Self {
            url,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: Url,
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(url: Url, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url,
            status,
            body: body.into(),
        }
    }

    /// 2xx status.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request could not complete at all (offline, DNS, reset).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("fetch {url} failed: {message}")]
pub struct NetworkError {
    pub url: String,
    pub message: String,
}

/// Where live requests go.
pub trait Network: Sync {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// One named cache: request URL → response, in insertion order.
#[derive(Debug, Default)]
pub struct Cache {
    entries: Mutex<Vec<(Request, Response)>>,
}

impl Cache {
    /// Stored response for `request`.
    ///
    /// With `ignore_search` the query string is ignored on both sides, so
    /// `/app.js?v=2` matches a cached `/app.js`.
    pub fn match_request(&self, request: &Request, ignore_search: bool) -> Option<Response> {
        let wanted = comparable(&request.url, ignore_search);
        lock(&self.entries)
            .iter()
            .find(|(key, _)| comparable(&key.url, ignore_search) == wanted)
            .map(|(_, response)| response.clone())
    }

    /// Store a response, replacing any entry with the same URL.
    pub fn put(&self, request: Request, response: Response) {
        let mut entries = lock(&self.entries);
        entries.retain(|(key, _)| key.url != request.url);
        entries.push((request, response));
    }

    /// Fetch every request and store all responses, or store nothing.
    ///
    /// Fails on the first network error or non-2xx response, like the
    /// browser's `Cache.addAll`.
    pub fn add_all(&self, network: &dyn Network, requests: &[Request]) -> Result<(), WorkerError> {
        let responses = requests
            .par_iter()
            .map(|request| {
                let response = network.fetch(request)?;
                if !response.ok() {
                    return Err(WorkerError::Status {
                        url: request.url.to_string(),
                        status: response.status,
                    });
                }
                Ok((request.clone(), response))
            })
            .collect::<Result<Vec<_>, _>>()?;
        for (request, response) in responses {
            self.put(request, response);
        }
        Ok(())
    }

    pub fn delete(&self, url: &Url) -> bool {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|(key, _)| &key.url != url);
        entries.len() != before
    }

    pub fn keys(&self) -> Vec<Request> {
        lock(&self.entries)
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }
}

fn comparable(url: &Url, ignore_search: bool) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    if ignore_search {
        url.set_query(None);
    }
    url
}

/// All caches of one origin, by name.
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: Mutex<BTreeMap<String, Arc<Cache>>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a cache, creating it when missing.
    pub fn open(&self, name: &str) -> Arc<Cache> {
        Arc::clone(lock(&self.caches).entry(name.to_string()).or_default())
    }

    pub fn has(&self, name: &str) -> bool {
        lock(&self.caches).contains_key(name)
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.caches).keys().cloned().collect()
    }

    pub fn delete(&self, name: &str) -> bool {
        lock(&self.caches).remove(name).is_some()
    }
}

/// What the fetch handler did with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Not intercepted: the browser performs the request itself.
    Passthrough,
    Cached(Response),
    /// Cache miss, answered live and not stored.
    Network(Result<Response, NetworkError>),
}

/// The worker installed at `origin`.
pub struct OfflineWorker<N> {
    config: WorkerConfig,
    origin: Url,
    network: N,
}

impl<N: Network> OfflineWorker<N> {
    pub fn new(config: WorkerConfig, origin: Url, network: N) -> Self {
        Self {
            config,
            origin,
            network,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// One precache request per manifest entry, tagged with `From`.
    pub fn precache_requests(&self) -> Result<Vec<Request>, WorkerError> {
        self.config
            .files
            .iter()
            .map(|file| {
                let url = self.origin.join(file).map_err(|source| WorkerError::Url {
                    url: file.clone(),
                    source,
                })?;
                Ok(Request::get(url).with_header("From", &self.config.from_header))
            })
            .collect()
    }

    /// Populate the versioned cache.
    ///
    /// Eviction of entries outside the manifest and fetching of the manifest
    /// run concurrently. A failed fetch leaves the new entries unstored and is
    /// returned as the error, but eviction still completes. Calling `install`
    /// again retries from scratch.
    pub fn install(&self, storage: &CacheStorage) -> Result<(), WorkerError> {
        let cache = storage.open(&self.config.cache_version);
        let requests = self.precache_requests()?;
        let (evicted, added) = rayon::join(
            || self.evict_stale(&cache),
            || cache.add_all(&self.network, &requests),
        );
        tracing::debug!(
            "Worker install: evicted {}, precached {}",
            evicted,
            requests.len()
        );
        added
    }

    /// Delete entries whose URL path is not in the manifest.
    fn evict_stale(&self, cache: &Cache) -> usize {
        cache
            .keys()
            .into_iter()
            .filter(|key| !self.config.files.iter().any(|file| file == key.url.path()))
            .filter(|key| cache.delete(&key.url))
            .count()
    }

    /// Answer a request the page made.
    pub fn fetch(&self, storage: &CacheStorage, request: &Request) -> FetchOutcome {
        if request.url.origin() != self.origin.origin() {
            return FetchOutcome::Passthrough;
        }
        let cache = storage.open(&self.config.cache_version);
        match cache.match_request(request, true) {
            Some(response) => FetchOutcome::Cached(response),
            None => FetchOutcome::Network(self.network.fetch(request)),
        }
    }
}
