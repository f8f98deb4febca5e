//! Resolver configuration.
//!
//! Every key is optional; omitted keys take the defaults below.
//!
//! ```toml
//! ranking_key = "service.ranking"
//! baseline_priority = 0
//! matcher_faults = "isolate"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::attributes::DEFAULT_RANKING_KEY;

/// How a panicking [`crate::CapabilityMatcher`] is handled during a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherFaults {
	/// Log the panic and treat the candidate as not matching.
	#[default]
	Isolate,
	/// Let the panic unwind out of the query, aborting the resolution.
	Propagate,
}

/// Settings shared by every tracker a resolver creates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
	/// Attribute key the candidate priority is read from.
	pub ranking_key: String,
	/// Priority of candidates that declare none (or an unusable one).
	pub baseline_priority: i32,
	pub matcher_faults: MatcherFaults,
}

impl Default for ResolverConfig {
	fn default() -> Self {
		Self {
			ranking_key: DEFAULT_RANKING_KEY.to_owned(),
			baseline_priority: 0,
			matcher_faults: MatcherFaults::default(),
		}
	}
}

impl ResolverConfig {
	/// Parses a configuration from TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(text)?)
	}

	/// Reads and parses a TOML configuration file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&text)
	}
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("invalid resolver configuration: {0}")]
	Parse(#[from] toml::de::Error),
}
