// src/crawl/scope.rs
// =============================================================================
// URL normalization and scope matching.
//
// A discovered link goes through two steps:
// - normalize() cleans it into the URL that actually gets requested:
//   fragments (#section) removed, empty query removed, only http/https
//   survive. The path is left alone, since many servers only answer
//   on /docs/ and relative links on that page resolve against it.
// - canonical_key() turns it into the comparable form used for dedup and
//   page identity: additionally a trailing slash on a non-root path is
//   dropped, so /docs/ and /docs are the same page.
//
// Host case and default ports are already normalized by the url crate.
//
// Scope decides whether a URL belongs to this crawl: same origin as the seed,
// and (when patterns are given) a path matching at least one glob pattern.
// =============================================================================

use crate::error::ConfigError;
use regex::Regex;
use url::{Origin, Url};

// Resolves an href found on `base` into an absolute URL ready to fetch
//
// Returns None for anything we would never crawl: anchors on the same page,
// mailto:/tel:/javascript:/data: links, and hrefs that don't parse.
pub fn resolve(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let joined = base.join(href).ok()?;
    normalize(joined)
}

// Cleans an absolute URL into the form that gets requested
pub fn normalize(mut url: Url) -> Option<Url> {
    if !is_http(&url) {
        return None;
    }

    url.set_fragment(None);

    // An empty query ("/page?") is the same page as "/page"
    if url.query() == Some("") {
        url.set_query(None);
    }

    Some(url)
}

// The single comparable form of a URL: equal logical pages give equal keys
pub fn canonical_key(url: &Url) -> String {
    let path = url.path();
    if path.len() <= 1 || !path.ends_with('/') {
        return url.to_string();
    }

    let mut key = url.clone();
    let trimmed = path.trim_end_matches('/').to_string();
    // "//" collapses to the root rather than an empty path
    if trimmed.is_empty() {
        key.set_path("/");
    } else {
        key.set_path(&trimmed);
    }
    key.to_string()
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// The set of URLs a crawl is allowed to visit and record.
#[derive(Debug, Clone)]
pub struct Scope {
    origin: Origin,
    patterns: Vec<Pattern>,
}

impl Scope {
    pub fn new(seed: &Url, patterns: &[String]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| Pattern::compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            origin: seed.origin(),
            patterns,
        })
    }

    /// Same scheme, host and port as the seed.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        is_http(url) && url.origin() == self.origin
    }

    /// True when no patterns are configured or the path matches one of them.
    pub fn matches_patterns(&self, url: &Url) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(url.path()))
    }

    /// Same-origin and pattern-matching: the URL may be queued.
    pub fn contains(&self, url: &Url) -> bool {
        self.is_same_origin(url) && self.matches_patterns(url)
    }

    /// Convenience for raw strings; a malformed URL is simply out of scope.
    pub fn contains_str(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(normalize)
            .is_some_and(|u| self.contains(&u))
    }
}

/// A glob pattern over URL paths, compiled to an anchored regex.
///
/// `*` stays inside one path segment, `**` crosses segments and `?` is a
/// single non-slash character. A pattern without any glob characters also
/// matches everything below it, so `/docs` covers `/docs/intro`.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern is empty".to_string(),
            });
        }

        let rooted = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };

        let regex_source = glob_to_regex(&rooted);
        let regex = Regex::new(&regex_source).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { regex })
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

fn glob_to_regex(glob: &str) -> String {
    let is_literal = !glob.contains(['*', '?']);
    if is_literal {
        let base = regex::escape(glob.trim_end_matches('/'));
        return format!("^{}(?:/.*)?$", base);
    }

    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let after = i + 2;
                let slash_before = i > 0 && chars[i - 1] == '/';
                let slash_after = chars.get(after) == Some(&'/');
                let at_end = after == chars.len();

                if slash_before && at_end {
                    // "/docs/**" also matches "/docs" itself
                    out.pop();
                    out.push_str("(?:/.*)?");
                    i = after;
                } else if slash_before && slash_after {
                    // "/a/**/b" matches "/a/b" as well as "/a/x/y/b"
                    out.push_str("(?:.*/)?");
                    i = after + 1;
                } else {
                    out.push_str(".*");
                    i = after;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                out.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }

    out.push('$');
    out
}
