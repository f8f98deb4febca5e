//! Mapping caller input to the context object candidates are matched against.

use std::any::Any;

/// Request-like wrapper that may carry a context object.
pub trait ContextRequest<C: ?Sized> {
	/// Returns the context object associated with this request, if any.
	fn context(&self) -> Option<&C>;
}

/// The closed set of input shapes a resolution accepts.
pub enum Input<'a, C: ?Sized> {
	/// A context object, used as is.
	Context(&'a C),
	/// A request-like wrapper the context object is derived from.
	Request(&'a dyn ContextRequest<C>),
	/// Any other value; extractors may recognise it or treat it as no context.
	Other(&'a dyn Any),
	/// No context available.
	None,
}

impl<'a, C: ?Sized> Input<'a, C> {
	pub fn request(request: &'a dyn ContextRequest<C>) -> Self {
		Self::Request(request)
	}

	pub fn other(value: &'a dyn Any) -> Self {
		Self::Other(value)
	}
}

impl<C: ?Sized> Clone for Input<'_, C> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<C: ?Sized> Copy for Input<'_, C> {}

impl<C: ?Sized> std::fmt::Debug for Input<'_, C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Context(_) => f.write_str("Input::Context"),
			Self::Request(_) => f.write_str("Input::Request"),
			Self::Other(_) => f.write_str("Input::Other"),
			Self::None => f.write_str("Input::None"),
		}
	}
}

impl<'a, C: ?Sized> From<&'a C> for Input<'a, C> {
	fn from(context: &'a C) -> Self {
		Self::Context(context)
	}
}

impl<'a, C: ?Sized> From<Option<&'a C>> for Input<'a, C> {
	fn from(context: Option<&'a C>) -> Self {
		context.map_or(Self::None, Self::Context)
	}
}

/// Extracts the canonical context object from an [`Input`].
pub trait ContextExtractor<C: ?Sized>: Send + Sync {
	fn extract<'a>(&self, input: Input<'a, C>) -> Option<&'a C>;
}

/// Default extractor.
///
/// | Input | Context |
/// |---|---|
/// | `Context(c)` | `c` |
/// | `Request(r)` | `r.context()` |
/// | `Other(v)` | `v` if it is a `C`, otherwise none |
/// | `None` | none |
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardExtractor;

impl<C: 'static> ContextExtractor<C> for StandardExtractor {
	fn extract<'a>(&self, input: Input<'a, C>) -> Option<&'a C> {
		match input {
			Input::Context(context) => Some(context),
			Input::Request(request) => request.context(),
			Input::Other(value) => value.downcast_ref::<C>(),
			Input::None => None,
		}
	}
}
