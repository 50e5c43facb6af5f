//! # Sliver Configuration
//!
//! Central configuration for renderers and servers.
//! Supports loading from environment variables and programmatic defaults.

use crate::{BlockSelector, HeaderSelector, ParamSelector, Result, SliverError, PART_PARAM};
use http::HeaderName;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

/// Global configuration for Sliver.
///
/// # Example
/// ```rust
/// use sliver_core::SliverConfig;
///
/// // Load from environment
/// let config = SliverConfig::from_env();
///
/// // Or customize
/// let config = SliverConfig::default()
///     .with_part_param("fragment")
///     .with_strict_mode(true);
/// ```
#[derive(Debug, Clone)]
pub struct SliverConfig {
    /// Request parameter naming the block to render on async requests.
    /// Default: "__part__", Env: SLIVER_PART_PARAM=fragment
    pub part_param: String,

    /// Header carrying the block name. When set, replaces the parameter
    /// convention with a header-based one.
    /// Default: None, Env: SLIVER_BLOCK_HEADER=X-PJAX-Block
    pub block_header: Option<String>,

    /// Fail on missing template variables.
    /// Default: false, Env: SLIVER_STRICT=true
    pub strict_mode: bool,

    /// Expose a `request` summary to every template.
    /// Default: true, Env: SLIVER_EXPOSE_REQUEST=false
    pub expose_request: bool,

    /// Directory templates are loaded from.
    /// Default: "templates", Env: SLIVER_TEMPLATE_DIR=views
    pub template_dir: PathBuf,

    /// Port the server listens on.
    /// Default: 3000, Env: SLIVER_PORT=8080
    pub port: u16,
}

impl Default for SliverConfig {
    fn default() -> Self {
        Self {
            part_param: PART_PARAM.to_string(),
            block_header: None,
            strict_mode: false,
            expose_request: true,
            template_dir: PathBuf::from("templates"),
            port: 3000,
        }
    }
}

impl SliverConfig {
    /// Create a new config from environment variables.
    /// Falls back to defaults for missing variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = env::var("SLIVER_PART_PARAM") {
            if !v.is_empty() {
                config.part_param = v;
            }
        }
        if let Ok(v) = env::var("SLIVER_BLOCK_HEADER") {
            if !v.is_empty() {
                config.block_header = Some(v);
            }
        }
        if let Ok(v) = env::var("SLIVER_STRICT") {
            config.strict_mode = v.to_lowercase() == "true" || v == "1";
        }
        if let Ok(v) = env::var("SLIVER_EXPOSE_REQUEST") {
            config.expose_request = v.to_lowercase() != "false" && v != "0";
        }
        if let Ok(v) = env::var("SLIVER_TEMPLATE_DIR") {
            config.template_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("SLIVER_PORT") {
            if let Ok(n) = v.parse() {
                config.port = n;
            }
        }

        config
    }

    /// Builder: Set the block parameter name.
    pub fn with_part_param(mut self, param: impl Into<String>) -> Self {
        self.part_param = param.into();
        self
    }

    /// Builder: Select blocks by header instead of parameter.
    pub fn with_block_header(mut self, header: Option<String>) -> Self {
        self.block_header = header;
        self
    }

    /// Builder: Enable or disable strict mode.
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Builder: Enable or disable the `request` context value.
    pub fn with_expose_request(mut self, enabled: bool) -> Self {
        self.expose_request = enabled;
        self
    }

    /// Builder: Set the template directory.
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = dir.into();
        self
    }

    /// Builder: Set the server port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Check that the selection convention can actually match a request.
    pub fn validate(&self) -> Result<()> {
        if self.part_param.is_empty() {
            return Err(SliverError::ConfigError(
                "part parameter name must not be empty".to_string(),
            ));
        }
        if let Some(header) = &self.block_header {
            HeaderName::from_bytes(header.as_bytes()).map_err(|_| {
                SliverError::ConfigError(format!("invalid block header name '{}'", header))
            })?;
        }
        Ok(())
    }

    /// The block selection convention this config describes.
    pub fn selector(&self) -> Arc<dyn BlockSelector> {
        match &self.block_header {
            Some(header) => Arc::new(HeaderSelector::new(header.as_str())),
            None => Arc::new(ParamSelector::new(self.part_param.as_str())),
        }
    }
}
