//! Registration metadata attached to candidate implementations.

use rustc_hash::FxHashMap as HashMap;
use serde_json::Value;

/// Attribute key the priority is read from unless configured otherwise.
pub const DEFAULT_RANKING_KEY: &str = "service.ranking";

/// String-keyed registration metadata of one candidate.
///
/// Captured by the host when a candidate is registered and again when it is
/// unregistered, so removal can be matched against the same data even after the
/// registration itself is gone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
	values: HashMap<String, Value>,
}

impl Attributes {
	/// Creates an empty attribute set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates an attribute set carrying only a priority under [`DEFAULT_RANKING_KEY`].
	pub fn ranked(priority: i32) -> Self {
		Self::new().with(DEFAULT_RANKING_KEY, priority)
	}

	/// Adds or replaces one attribute, builder style.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.insert(key, value);
		self
	}

	/// Adds or replaces one attribute, returning the previous value.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		self.values.insert(key.into(), value.into())
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.values.get(key)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.values.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.values.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Reads the priority stored under `key`.
	///
	/// Only integral numbers inside the `i32` range count; a missing key or any
	/// other value yields `baseline`.
	pub fn priority(&self, key: &str, baseline: i32) -> i32 {
		let Some(value) = self.values.get(key) else {
			return baseline;
		};
		match value.as_i64().and_then(|n| i32::try_from(n).ok()) {
			Some(priority) => priority,
			None => {
				tracing::warn!(key, %value, baseline, "ignoring non-integer priority attribute");
				baseline
			}
		}
	}
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
	K: Into<String>,
	V: Into<Value>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
		}
	}
}
