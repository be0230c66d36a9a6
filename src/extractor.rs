use anyhow::{Context, Result};
use regex::{Captures, Regex};
use std::collections::BTreeSet;

/// Host prefix matched when none is configured.
pub const DEFAULT_HOST_PREFIX: &str = "https://images.unsplash.com/";

/// URLs found in a source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Number of quoted matches, duplicates included.
    pub raw_matches: usize,
    /// Distinct URLs in sorted order.
    pub urls: BTreeSet<String>,
}

/// Finds single-quoted image URLs that start with a fixed host prefix.
#[derive(Debug, Clone)]
pub struct UrlExtractor {
    pattern: Regex,
}

impl UrlExtractor {
    pub fn new(host_prefix: &str) -> Result<Self> {
        let pattern = Regex::new(&format!("'({}[^']*)'", regex::escape(host_prefix)))
            .with_context(|| format!("Failed to build URL pattern for prefix: {}", host_prefix))?;

        Ok(Self { pattern })
    }

    /// Every match in document order, duplicates included.
    pub fn find_all<'a>(&self, content: &'a str) -> Vec<&'a str> {
        self.pattern
            .captures_iter(content)
            .filter_map(|cap| cap.get(1))
            .map(|m| m.as_str())
            .collect()
    }

    pub fn extract(&self, content: &str) -> Extraction {
        let matches = self.find_all(content);

        Extraction {
            raw_matches: matches.len(),
            urls: matches.into_iter().map(str::to_string).collect(),
        }
    }

    /// Rewrites each quoted match whose URL `resolve` maps, keeping the quotes.
    ///
    /// Only whole matches are touched, so a URL never rewrites part of a longer one.
    pub fn replace_matches<F>(&self, content: &str, mut resolve: F) -> String
    where
        F: FnMut(&str) -> Option<String>,
    {
        self.pattern
            .replace_all(content, |caps: &Captures| match resolve(&caps[1]) {
                Some(replacement) => format!("'{}'", replacement),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}
