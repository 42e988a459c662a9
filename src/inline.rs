//! Recursive inlining of remote `url(...)` references.
//!
//! Every `url(...)` whose argument is an http(s) URL is replaced by a `data:`
//! URL of the fetched resource. Fetched text resources (stylesheets, nested
//! SVG) are inlined themselves before being embedded, so the output never
//! references the network. The output is rebuilt front to back, copying the
//! untouched text between matches, so match offsets stay valid while the
//! replacements change length.

use crate::data_url;
use crate::fetch::{FetchCache, Payload};
use crate::{Error, Result};
use log::debug;
use regex::{Captures, Match, Regex};
use std::sync::OnceLock;
use url::Url;

// A quoted URL runs to its closing quote and may hold spaces, `)` or the
// other quote character; an unquoted one stops at whitespace, quotes or `)`.
fn remote_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\burl\s*\(\s*(?:"(https?://[^"]+)"|'(https?://[^']+)'|(https?://[^)'"\s]+))\s*\)"#)
            .expect("url() pattern is valid")
    })
}

fn url_span<'t>(caps: &Captures<'t>) -> Option<Match<'t>> {
    caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))
}

/// Returns the remote URLs referenced through `url(...)` in `text`, in
/// source order.
pub fn remote_references(text: &str) -> Vec<&str> {
    remote_url_pattern()
        .captures_iter(text)
        .filter_map(|caps| url_span(&caps))
        .map(|m| m.as_str())
        .collect()
}

/// Inliner bound to the fetch cache of the current run
pub struct Inliner<'a> {
    cache: &'a FetchCache,
}

impl<'a> Inliner<'a> {
    pub fn new(cache: &'a FetchCache) -> Self {
        Self { cache }
    }

    /// Replace every remote `url(...)` reference in `text` with a data URL.
    pub fn inline(&self, text: &str) -> Result<String> {
        let mut chain = Vec::new();
        self.inline_within(text, &mut chain)
    }

    // `chain` holds the URLs currently being resolved, outermost first.
    fn inline_within(&self, text: &str, chain: &mut Vec<String>) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut copied_to = 0;

        for caps in remote_url_pattern().captures_iter(text) {
            let Some(m) = url_span(&caps) else { continue };
            let data_url = self.resolve(m.as_str(), chain)?;
            out.push_str(&text[copied_to..m.start()]);
            out.push_str(&data_url);
            copied_to = m.end();
        }

        out.push_str(&text[copied_to..]);
        Ok(out)
    }

    fn resolve(&self, url: &str, chain: &mut Vec<String>) -> Result<String> {
        Url::parse(url).map_err(|e| Error::FetchError(format!("{}: invalid URL: {}", url, e)))?;

        if chain.iter().any(|seen| seen == url) {
            let cycle = chain
                .iter()
                .skip_while(|seen| *seen != url)
                .map(String::as_str)
                .chain(std::iter::once(url))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(Error::FetchError(format!("cyclic resource reference: {}", cycle)));
        }

        let resource = self.cache.get(url)?;
        let encoded = match &resource.payload {
            Payload::Text(text) => {
                debug!("inlining nested references of {}", url);
                chain.push(url.to_string());
                let resolved = self.inline_within(text, chain);
                chain.pop();
                data_url::encode_bytes(&resource.content_type, resolved?.as_bytes())
            }
            Payload::Binary(_) => data_url::encode(&resource.content_type, &resource.payload),
        };

        encoded.map_err(|e| match e {
            Error::EncodeError(msg) => Error::EncodeError(format!("{}: {}", url, msg)),
            other => other,
        })
    }
}
