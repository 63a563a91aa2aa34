//! Stack configuration (`infra.toml`)
//!
//! Every field defaults to the literal the Mira HQ stack ships with, so an
//! empty file, or no file at all, produces the production stack.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::paths;

// ============================================================================
// Schema
// ============================================================================

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    /// Stack name, also the template file stem
    pub stack_name: String,
    /// Template description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub site: SiteConfig,
    pub api: ApiConfig,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack_name: "MiraHqInfrastructure".to_string(),
            description: None,
            site: SiteConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

/// Static front-end: bucket, CDN, DNS and certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Apex domain; also the hosted zone name
    pub domain: String,
    /// Comment on the distribution and the origin access identity
    pub comment: String,
    pub root_object: String,
    /// Page served for 403/404
    pub fallback_path: String,
    pub default_ttl_secs: u64,
    pub error_ttl_secs: u64,
    pub versioned: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            domain: "mira-hq.com".to_string(),
            comment: "mira-hq-frontend".to_string(),
            root_object: "index.html".to_string(),
            fallback_path: "/index.html".to_string(),
            default_ttl_secs: 300,
            error_ttl_secs: 300,
            versioned: true,
        }
    }
}

/// API backend: function, HTTP API and its custom domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// `false` declares the front-end only
    pub enabled: bool,
    pub subdomain: String,
    pub function_name: String,
    pub runtime: String,
    pub handler: String,
    pub code_key: String,
    pub memory_mb: u32,
    pub tracing: bool,
    pub log_retention_days: u32,
    /// "1.0" or "2.0"
    pub payload_format: String,
    pub cors: CorsConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            subdomain: "api".to_string(),
            function_name: "MiraHqBackend".to_string(),
            runtime: "nodejs14.x".to_string(),
            handler: "dist/index.graphqlHandler".to_string(),
            code_key: "lambda.zip".to_string(),
            memory_mb: 128,
            tracing: true,
            log_retention_days: 30,
            payload_format: "1.0".to_string(),
            cors: CorsConfig::default(),
        }
    }
}

/// CORS preflight rules of the HTTP API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub allow_credentials: bool,
    pub allow_headers: Vec<String>,
    pub allow_methods: Vec<String>,
    /// Defaults to `https://<site.domain>` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_origins: Option<Vec<String>>,
    pub expose_headers: Vec<String>,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_credentials: true,
            allow_headers: vec!["*".to_string()],
            allow_methods: vec!["GET".to_string(), "POST".to_string()],
            allow_origins: None,
            expose_headers: Vec::new(),
            max_age_secs: 300,
        }
    }
}

impl CorsConfig {
    /// Origins to allow, falling back to the site itself
    pub fn origins(&self, domain: &str) -> Vec<String> {
        self.allow_origins
            .clone()
            .unwrap_or_else(|| vec![format!("https://{domain}")])
    }
}

// ============================================================================
// Loading
// ============================================================================

impl StackConfig {
    /// Load a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Parse TOML content
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML format in stack config")
    }

    /// Resolve and load the effective config
    ///
    /// Returns the file it came from, or `None` for the built-in defaults.
    pub fn resolve(explicit: Option<&str>) -> Result<(Self, Option<PathBuf>)> {
        match paths::config_file(explicit)? {
            Some(path) => {
                log::debug!("Loading stack config from {}", path.display());
                Ok((Self::load(&path)?, Some(path)))
            }
            None => {
                log::debug!("No stack config found, using built-in defaults");
                Ok((Self::default(), None))
            }
        }
    }

    /// Serialize back to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Fully qualified API host name
    pub fn api_domain(&self) -> String {
        format!("{}.{}", self.api.subdomain, self.site.domain)
    }
}

// ============================================================================
// Tests
// ============================================================================
