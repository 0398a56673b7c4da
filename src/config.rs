//! Container configuration.
//!
//! [`ContainerOptions`] can be built in code, read from `FERROUS_INJECT_*`
//! environment variables, or (with the `json` feature) parsed from JSON.
//! Child scopes inherit the options of their parent.

use std::env;

use crate::error::{DiError, DiResult};

/// Tunables for a container and the scopes created from it.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{ContainerBuilder, ContainerOptions};
///
/// let options = ContainerOptions::new()
///     .max_depth(64)
///     .dispose_on_drop(true);
///
/// let mut builder = ContainerBuilder::new();
/// builder.with_options(options.clone());
/// let container = builder.build().unwrap();
/// assert_eq!(container.options(), &options);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct ContainerOptions {
    /// Maximum depth of the per-thread resolution stack. Each nested request
    /// takes one frame for its contract and a second one when the answering
    /// implementation is a different type (a trait contract, for example).
    pub max_depth: usize,
    /// Analyze type registrations and check eager dependencies in `build()`
    pub validate_on_build: bool,
    /// Resolve singletons marked `eager()` right after `build()`
    pub eager_singletons: bool,
    /// Dispose a scope when its last handle is dropped instead of warning
    pub dispose_on_drop: bool,
}

impl ContainerOptions {
    /// Prefix of the environment variables read by [`from_env`](Self::from_env).
    pub const ENV_PREFIX: &'static str = "FERROUS_INJECT";

    /// Default resolution depth limit.
    pub const DEFAULT_MAX_DEPTH: usize = 1024;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn validate_on_build(mut self, enabled: bool) -> Self {
        self.validate_on_build = enabled;
        self
    }

    pub fn eager_singletons(mut self, enabled: bool) -> Self {
        self.eager_singletons = enabled;
        self
    }

    pub fn dispose_on_drop(mut self, enabled: bool) -> Self {
        self.dispose_on_drop = enabled;
        self
    }

    /// Reads `FERROUS_INJECT_MAX_DEPTH`, `FERROUS_INJECT_VALIDATE_ON_BUILD`,
    /// `FERROUS_INJECT_EAGER_SINGLETONS` and `FERROUS_INJECT_DISPOSE_ON_DROP`,
    /// keeping defaults for unset variables.
    pub fn from_env() -> DiResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DiResult<Self> {
        let mut options = Self::default();
        let read = |name: &str| {
            let key = format!("{}_{}", Self::ENV_PREFIX, name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((key, value)) = read("MAX_DEPTH") {
            options.max_depth = match value.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => depth,
                _ => return Err(DiError::InvalidOption { key, value }),
            };
        }
        if let Some((key, value)) = read("VALIDATE_ON_BUILD") {
            options.validate_on_build = parse_flag(key, value)?;
        }
        if let Some((key, value)) = read("EAGER_SINGLETONS") {
            options.eager_singletons = parse_flag(key, value)?;
        }
        if let Some((key, value)) = read("DISPOSE_ON_DROP") {
            options.dispose_on_drop = parse_flag(key, value)?;
        }

        tracing::debug!(?options, "loaded container options");
        Ok(options)
    }

    /// Parses options from a JSON object; missing fields keep their defaults.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        serde_json::from_str(json).map_err(|err| DiError::InvalidOption {
            key: "json".to_string(),
            value: err.to_string(),
        })
    }
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            validate_on_build: true,
            eager_singletons: true,
            dispose_on_drop: false,
        }
    }
}

fn parse_flag(key: String, value: String) -> DiResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DiError::InvalidOption { key, value }),
    }
}
