//! Context-aware services: several implementations of one service trait, each
//! responsible for part of the content tree.
//!
//! ```ignore
//! trait LinkSpi: ContextAwareService {
//! 	fn build(&self, target: &Resource) -> String;
//! }
//!
//! let spi = resolver.resolve::<dyn LinkSpi>(&resource)?;
//! ```

use std::sync::Arc;

use handler_resolver::{
	CapabilityMatcher, HostRegistry, Input, ResolveError, Resolver, ResolverConfig,
};

use crate::resource::Resource;

/// Service implementation that decides per resource whether it applies.
///
/// Implementors provide [`CapabilityMatcher::matches`]; it is called for every
/// resolution and must stay cheap, typically a path check against a precompiled
/// pattern. The resource is never `None` unless
/// [`CapabilityMatcher::supports_null_context`] returns true.
pub trait ContextAwareService: CapabilityMatcher<Resource> + Send + Sync {}

/// Resolves [`ContextAwareService`] implementations against a resource.
#[derive(Debug)]
pub struct ContextAwareServiceResolver<H> {
	resolver: Resolver<Resource, H>,
}

impl<H: HostRegistry> ContextAwareServiceResolver<H> {
	pub fn new(host: H) -> Self {
		Self::with_config(host, ResolverConfig::default())
	}

	pub fn with_config(host: H, config: ResolverConfig) -> Self {
		tracing::debug!(ranking_key = %config.ranking_key, "context-aware service resolver active");
		Self {
			resolver: Resolver::new(host, config),
		}
	}

	/// Returns the best matching implementation of `T`.
	///
	/// `input` is a [`Resource`], a [`crate::Request`] (its resource is used) or
	/// [`Input::None`] when no context is available.
	pub fn resolve<'a, T>(&self, input: impl Into<Input<'a, Resource>>) -> Result<Option<Arc<T>>, ResolveError>
	where
		T: ?Sized + ContextAwareService + 'static,
	{
		self.resolver.resolve::<T>(input)
	}

	/// Returns all matching implementations of `T`, highest ranking first.
	pub fn resolve_all<'a, T>(&self, input: impl Into<Input<'a, Resource>>) -> Result<Vec<Arc<T>>, ResolveError>
	where
		T: ?Sized + ContextAwareService + 'static,
	{
		self.resolver.resolve_all::<T>(input)
	}

	/// Releases every service tracker; later resolutions find nothing.
	pub fn shutdown(&self) {
		self.resolver.shutdown();
	}
}
