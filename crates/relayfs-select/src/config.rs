//! Line-oriented chain configuration.
//!
//! ```text
//! # comment
//! 1.filter=minfreespace
//! 1.remaining=100MB
//! 1.multiplier=1
//! 2.filter=matchdir
//! 2.match=/archive/*
//! 2.assign=node1+100, node2-remove
//! ```
//!
//! Keys are case-insensitive. Filters are numbered from 1; reading stops at
//! the first missing `N.filter`.

use crate::error::{SelectError, SelectResult};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Parsed key/value pairs of one chain file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainConfig {
    source: String,
    props: BTreeMap<String, String>,
}

impl ChainConfig {
    /// Parse chain text. `source` names the origin in error messages.
    pub fn parse(source: &str, text: &str) -> SelectResult<Self> {
        let mut props = BTreeMap::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let sep = line.find(['=', ':']).ok_or_else(|| {
                SelectError::config(
                    format!("{}:{}", source, lineno + 1),
                    format!("expected key=value, got '{}'", line),
                )
            })?;
            let key = line[..sep].trim().to_ascii_lowercase();
            let value = line[sep + 1..].trim().to_string();
            if key.is_empty() {
                return Err(SelectError::config(
                    format!("{}:{}", source, lineno + 1),
                    "empty key",
                ));
            }
            props.insert(key, value);
        }
        Ok(Self {
            source: source.to_string(),
            props,
        })
    }

    /// Load a chain file. A missing file yields an empty chain.
    pub fn load(path: &Path) -> SelectResult<Self> {
        let source = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&source, &text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %source, "chain file missing, using empty chain");
                Ok(Self {
                    source,
                    props: BTreeMap::new(),
                })
            }
            Err(e) => Err(SelectError::Io(e)),
        }
    }

    /// Where this configuration came from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Raw lookup by full key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Filter names in chain order, with their 1-based position.
    pub fn filter_names(&self) -> Vec<(usize, &str)> {
        let mut names = Vec::new();
        let mut i = 1;
        while let Some(name) = self.get(&format!("{}.filter", i)) {
            names.push((i, name));
            i += 1;
        }
        names
    }

    /// Properties of the filter at `position`.
    pub fn filter_props(&self, position: usize) -> FilterProps<'_> {
        FilterProps {
            config: self,
            position,
        }
    }
}

/// View of the `N.*` keys belonging to one filter.
#[derive(Debug, Clone, Copy)]
pub struct FilterProps<'a> {
    config: &'a ChainConfig,
    position: usize,
}

impl<'a> FilterProps<'a> {
    /// 1-based chain position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Fully qualified key, e.g. `3.multiplier`.
    pub fn key(&self, key: &str) -> String {
        format!("{}.{}", self.position, key)
    }

    /// Optional property.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.config.get(&self.key(key))
    }

    /// Required property.
    pub fn require(&self, key: &str) -> SelectResult<&'a str> {
        self.get(key)
            .ok_or_else(|| SelectError::config(self.key(key), "missing required property"))
    }

    /// Build a config error for `key`.
    pub fn error(&self, key: &str, reason: impl Into<String>) -> SelectError {
        SelectError::config(self.key(key), reason)
    }
}
