//! Remote resource retrieval and the per-run fetch cache.
//!
//! `Fetcher` is the collaborator seam: the generator only needs "URL in,
//! media type and bytes out". `HttpFetcher` implements it with a blocking
//! reqwest client, and `FetchCache` memoizes results so that each URL costs at
//! most one round trip per run, even when several icon workers ask for it at
//! the same time.

use crate::{Error, GeneratorConfig, Result};
use log::debug;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Body of a fetched resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Valid UTF-8; may itself contain `url(...)` references
    Text(String),
    /// Anything else (images, fonts)
    Binary(Vec<u8>),
}

impl Payload {
    /// Classify raw bytes: UTF-8 decodable bodies become `Text`.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Payload::Text(text),
            Err(e) => Payload::Binary(e.into_bytes()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(bytes) => bytes,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Payload::Text(_))
    }
}

/// A fetched resource: media type as reported by the server plus body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Raw `Content-Type` value (may carry parameters such as `charset`)
    pub content_type: String,
    pub payload: Payload,
}

/// Retrieves a remote resource. Implementations must be shareable across
/// icon workers.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Resource>;
}

/// `Fetcher` over HTTP(S) using reqwest's blocking client
pub struct HttpFetcher {
    client: Client,
    timeout_ms: u64,
}

impl HttpFetcher {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.fetch_timeout_ms))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout_ms: config.fetch_timeout_ms,
        })
    }

    fn transport_error(&self, url: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchError(format!("{}: timed out after {}ms", url, self.timeout_ms))
        } else {
            Error::FetchError(format!("{}: {}", url, err))
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Resource> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| self.transport_error(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::FetchError(format!("{}: HTTP status {}", url, status)));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = resp.bytes().map_err(|e| self.transport_error(url, e))?;

        Ok(Resource {
            content_type,
            payload: Payload::from_bytes(body.to_vec()),
        })
    }
}

type Slot = Arc<Mutex<Option<Arc<Resource>>>>;

/// Memoization table for one pipeline run.
///
/// Entries are write-once. Each URL has its own slot lock, so concurrent
/// lookups of one URL wait for the first fetch instead of issuing their own,
/// while lookups of different URLs proceed independently. Failed fetches are
/// not remembered.
pub struct FetchCache {
    fetcher: Box<dyn Fetcher>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl FetchCache {
    pub fn new<F: Fetcher + 'static>(fetcher: F) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the resource for `url`, fetching it on first use.
    pub fn get(&self, url: &str) -> Result<Arc<Resource>> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(url.to_string()).or_default().clone()
        };

        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(resource) = entry.as_ref() {
            debug!("fetch cache hit: {}", url);
            return Ok(resource.clone());
        }

        debug!("fetching {}", url);
        let resource = Arc::new(self.fetcher.fetch(url)?);
        *entry = Some(resource.clone());
        Ok(resource)
    }

    /// Number of URLs resolved so far
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter(|slot| slot.lock().map(|s| s.is_some()).unwrap_or(true))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory fetcher that counts calls per URL.
    #[derive(Clone, Default)]
    pub(crate) struct StaticFetcher {
        resources: Arc<HashMap<String, Resource>>,
        pub(crate) calls: Arc<Mutex<HashMap<String, usize>>>,
        pub(crate) delay: Option<Duration>,
    }

    impl StaticFetcher {
        pub(crate) fn new(entries: &[(&str, &str, Payload)]) -> Self {
            let resources = entries
                .iter()
                .map(|(url, ct, payload)| {
                    (
                        url.to_string(),
                        Resource {
                            content_type: ct.to_string(),
                            payload: payload.clone(),
                        },
                    )
                })
                .collect();
            Self {
                resources: Arc::new(resources),
                ..Default::default()
            }
        }

        pub(crate) fn calls_for(&self, url: &str) -> usize {
            self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
        }

        pub(crate) fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }
    }

    impl Fetcher for StaticFetcher {
        fn fetch(&self, url: &str) -> Result<Resource> {
            *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            self.resources
                .get(url)
                .cloned()
                .ok_or_else(|| Error::FetchError(format!("{}: HTTP status 404 Not Found", url)))
        }
    }

    #[test]
    fn payload_classification() {
        assert_eq!(Payload::from_bytes(b"a { }".to_vec()), Payload::Text("a { }".into()));
        let png = vec![0x89, b'P', b'N', b'G', 0xff, 0x00];
        assert_eq!(Payload::from_bytes(png.clone()), Payload::Binary(png));
    }

    #[test]
    fn repeated_lookups_fetch_once() {
        let fetcher = StaticFetcher::new(&[("http://x/a.png", "image/png", Payload::Binary(vec![1, 2]))]);
        let cache = FetchCache::new(fetcher.clone());
        assert!(cache.is_empty());

        let first = cache.get("http://x/a.png").unwrap();
        let second = cache.get("http://x/a.png").unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.calls_for("http://x/a.png"), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let fetcher = StaticFetcher::new(&[]);
        let cache = FetchCache::new(fetcher.clone());
        assert!(matches!(cache.get("http://x/missing"), Err(Error::FetchError(_))));
        assert!(cache.get("http://x/missing").is_err());
        assert_eq!(fetcher.calls_for("http://x/missing"), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_lookups_fetch_once() {
        let mut fetcher = StaticFetcher::new(&[("http://x/font.woff", "font/woff", Payload::Binary(vec![0xff; 16]))]);
        fetcher.delay = Some(Duration::from_millis(50));
        let cache = FetchCache::new(fetcher.clone());
        let done = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    cache.get("http://x/font.woff").unwrap();
                    done.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        assert_eq!(done.load(Ordering::SeqCst), 8);
        assert_eq!(fetcher.calls_for("http://x/font.woff"), 1);
    }

    #[test]
    fn http_fetcher_reads_content_type_and_status() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr();

        std::thread::spawn(move || {
            for request in server.incoming_requests().take(2) {
                let response = if request.url() == "/style.css" {
                    let body = b"svg { fill: red; }".to_vec();
                    let len = body.len();
                    tiny_http::Response::new(
                        tiny_http::StatusCode(200),
                        vec!["Content-Type: text/css".parse::<tiny_http::Header>().unwrap()],
                        std::io::Cursor::new(body),
                        Some(len),
                        None,
                    )
                } else {
                    tiny_http::Response::from_string("Not Found").with_status_code(404)
                };
                let _ = request.respond(response);
            }
        });

        let fetcher = HttpFetcher::new(&GeneratorConfig::default()).expect("client");
        let base = format!("http://{}", addr);

        let res = fetcher.fetch(&format!("{}/style.css", base)).expect("fetch css");
        assert_eq!(res.content_type, "text/css");
        assert_eq!(res.payload, Payload::Text("svg { fill: red; }".into()));

        match fetcher.fetch(&format!("{}/nope", base)) {
            Err(Error::FetchError(msg)) => assert!(msg.contains("404"), "{}", msg),
            other => panic!("expected FetchError, got {:?}", other),
        }
    }

    #[test]
    fn slow_server_is_a_fetch_timeout() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr();

        std::thread::spawn(move || {
            if let Ok(request) = server.recv() {
                std::thread::sleep(Duration::from_millis(1500));
                let _ = request.respond(tiny_http::Response::from_string("too late"));
            }
        });

        let config = GeneratorConfig {
            fetch_timeout_ms: 200,
            ..GeneratorConfig::default()
        };
        let fetcher = HttpFetcher::new(&config).expect("client");

        match fetcher.fetch(&format!("http://{}/slow.css", addr)) {
            Err(Error::FetchError(msg)) => assert!(msg.contains("timed out after 200ms"), "{}", msg),
            other => panic!("expected FetchError, got {:?}", other),
        }
    }
}
