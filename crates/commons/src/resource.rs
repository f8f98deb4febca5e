//! Content context types handlers resolve against.

use handler_resolver::{ContextRequest, Input};
use serde::{Deserialize, Serialize};

/// A node of the content tree, identified by its absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
	path: String,
}

impl Resource {
	pub fn new(path: impl Into<String>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	/// Last path segment, empty for the root.
	pub fn name(&self) -> &str {
		self.path.rsplit('/').next().unwrap_or_default()
	}
}

/// An incoming request, optionally bound to the resource it addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
	pub resource: Option<Resource>,
}

impl Request {
	pub fn new(resource: Resource) -> Self {
		Self {
			resource: Some(resource),
		}
	}

	/// A request not bound to any resource.
	pub fn detached() -> Self {
		Self::default()
	}
}

impl ContextRequest<Resource> for Request {
	fn context(&self) -> Option<&Resource> {
		self.resource.as_ref()
	}
}

impl<'a> From<&'a Request> for Input<'a, Resource> {
	fn from(request: &'a Request) -> Self {
		Input::Request(request)
	}
}
