//! # Server Configuration
//!
//! [`ServerConfig`] is read from a YAML file and then overridden from the
//! environment.
//!
//! ```yaml
//! addr: 0.0.0.0:8080
//! allow_methods: [get, post, put, patch, delete, head, options]
//! static_prefix: /resources
//! static_dir: ./resources
//! stack_size: 0x8000
//! max_body_bytes: 10485760
//! ```
//!
//! Every key is optional. Environment overrides:
//!
//! - `ROUTECTX_ADDR`
//! - `ROUTECTX_ALLOW_METHODS`: comma separated, e.g. `get,post`
//! - `ROUTECTX_STATIC_DIR`
//! - `ROUTECTX_STACK_SIZE`: decimal (`32768`) or hex (`0x8000`)
//! - `ROUTECTX_MAX_BODY_BYTES`
//!
//! The stack size applies to every request coroutine. Handlers with deep
//! call chains or large locals need more; many concurrent requests multiply
//! it.

use crate::router::HttpMethod;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_STACK_SIZE: usize = 0x8000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address
    pub addr: String,
    /// Methods accepted before routing; anything else gets 405
    pub allow_methods: Vec<HttpMethod>,
    /// Path prefix reserved for static resources
    pub static_prefix: String,
    /// Directory served beneath `static_prefix`
    pub static_dir: Option<PathBuf>,
    /// Coroutine stack size in bytes
    #[serde(deserialize_with = "deserialize_stack_size")]
    pub stack_size: usize,
    /// Larger bodies are rejected with 413
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            allow_methods: vec![
                HttpMethod::Get,
                HttpMethod::Post,
                HttpMethod::Put,
                HttpMethod::Patch,
                HttpMethod::Delete,
                HttpMethod::Head,
                HttpMethod::Options,
            ],
            static_prefix: "/resources".to_string(),
            static_dir: None,
            stack_size: DEFAULT_STACK_SIZE,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Read a YAML config file.
    ///
    /// # Errors
    ///
    /// The file cannot be read or is not a valid config document.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: ServerConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        info!(
            path = %path.display(),
            addr = %config.addr,
            allow_methods = ?config.allow_methods,
            static_dir = ?config.static_dir,
            "Config loaded"
        );
        Ok(config)
    }

    /// Apply `ROUTECTX_*` environment overrides.
    ///
    /// Unparsable values are logged and ignored.
    pub fn apply_env(&mut self) {
        if let Ok(addr) = env::var("ROUTECTX_ADDR") {
            self.addr = addr;
        }
        if let Ok(methods) = env::var("ROUTECTX_ALLOW_METHODS") {
            self.allow_methods = parse_method_list(&methods);
        }
        if let Ok(dir) = env::var("ROUTECTX_STATIC_DIR") {
            self.static_dir = Some(PathBuf::from(dir));
        }
        if let Ok(val) = env::var("ROUTECTX_STACK_SIZE") {
            match parse_stack_size(&val) {
                Some(size) => self.stack_size = size,
                None => warn!(value = %val, "Ignoring invalid ROUTECTX_STACK_SIZE"),
            }
        }
        if let Ok(val) = env::var("ROUTECTX_MAX_BODY_BYTES") {
            match val.trim().parse() {
                Ok(limit) => self.max_body_bytes = limit,
                Err(_) => warn!(value = %val, "Ignoring invalid ROUTECTX_MAX_BODY_BYTES"),
            }
        }
    }
}

/// Comma separated method tokens; unknown tokens are skipped.
#[must_use]
pub fn parse_method_list(list: &str) -> Vec<HttpMethod> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(error = %e, "Ignoring unknown method in allow list");
                None
            }
        })
        .collect()
}

/// Decimal or `0x` hexadecimal byte count.
#[must_use]
pub fn parse_stack_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

fn deserialize_stack_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(usize),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => Ok(n),
        Raw::Text(s) => parse_stack_size(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid stack size {s:?}"))),
    }
}
