//! Domain blocklist filter.
//!
//! Correlated pairs whose URL host matches a blocked domain (exact match or
//! subdomain) are dropped before encoding. The active filter is an immutable
//! snapshot swapped atomically on config reload.

use url::Url;

/// An immutable set of blocked domains.
#[derive(Debug, Clone, Default)]
pub struct DomainFilter {
    blocked: Vec<String>,
}

impl DomainFilter {
    /// Build a filter from configured domains. Entries are normalized to
    /// lowercase; empty entries are ignored.
    pub fn new(domains: &[String]) -> Self {
        let blocked = domains
            .iter()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { blocked }
    }

    /// True when `host` is a blocked domain or a subdomain of one.
    pub fn is_blocked(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.blocked
            .iter()
            .any(|blocked| host == *blocked || host.ends_with(&format!(".{}", blocked)))
    }

    /// True when the URL's host is blocked. URLs that do not parse or carry
    /// no host are never blocked.
    pub fn is_blocked_url(&self, url: &str) -> bool {
        if self.blocked.is_empty() {
            return false;
        }
        match Url::parse(url) {
            Ok(parsed) => parsed.host_str().map(|h| self.is_blocked(h)).unwrap_or(false),
            Err(_) => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }
}
