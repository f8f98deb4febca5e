//! Resolution entry point.

use std::fmt;
use std::sync::Arc;

use crate::cache::ResolutionCache;
use crate::config::ResolverConfig;
use crate::context::{ContextExtractor, Input, StandardExtractor};
use crate::error::ResolveError;
use crate::host::HostRegistry;
use crate::matcher::CapabilityMatcher;
use crate::point::ExtensionPoint;

/// Resolves extension points against a context object of type `C`.
///
/// Owns one [`ResolutionCache`]; trackers are created lazily per extension point
/// and live until [`Self::evict`], [`Self::shutdown`] or drop.
pub struct Resolver<C: ?Sized, H, E = StandardExtractor> {
	cache: ResolutionCache<C, H>,
	extractor: E,
}

impl<C, H> Resolver<C, H>
where
	C: 'static,
	H: HostRegistry,
{
	/// Creates a resolver using [`StandardExtractor`].
	pub fn new(host: H, config: ResolverConfig) -> Self {
		Self::with_extractor(host, config, StandardExtractor)
	}
}

impl<C, H, E> Resolver<C, H, E>
where
	C: ?Sized + 'static,
	H: HostRegistry,
	E: ContextExtractor<C>,
{
	pub fn with_extractor(host: H, config: ResolverConfig, extractor: E) -> Self {
		Self {
			cache: ResolutionCache::new(host, config),
			extractor,
		}
	}

	/// Returns the highest ranked `T` matching the context of `input`.
	///
	/// `Ok(None)` if nothing matches or the resolver is shut down.
	///
	/// # Errors
	///
	/// [`ResolveError::Subscribe`] if the tracker for `T` could not be created.
	pub fn resolve<'a, T>(&self, input: impl Into<Input<'a, C>>) -> Result<Option<Arc<T>>, ResolveError>
	where
		T: ?Sized + CapabilityMatcher<C> + Send + Sync + 'static,
	{
		let context = self.extractor.extract(input.into());
		let Some(tracker) = self.cache.get::<T>()? else {
			return Ok(None);
		};
		let found = tracker.query_first(context);
		tracing::trace!(
			point = %tracker.point(),
			has_context = context.is_some(),
			found = found.is_some(),
			"resolve"
		);
		Ok(found)
	}

	/// Returns every `T` matching the context of `input`, best ranked first.
	///
	/// Empty if nothing matches or the resolver is shut down.
	///
	/// # Errors
	///
	/// [`ResolveError::Subscribe`] if the tracker for `T` could not be created.
	pub fn resolve_all<'a, T>(&self, input: impl Into<Input<'a, C>>) -> Result<Vec<Arc<T>>, ResolveError>
	where
		T: ?Sized + CapabilityMatcher<C> + Send + Sync + 'static,
	{
		let context = self.extractor.extract(input.into());
		let Some(tracker) = self.cache.get::<T>()? else {
			return Ok(Vec::new());
		};
		let found = tracker.query(context);
		tracing::trace!(
			point = %tracker.point(),
			has_context = context.is_some(),
			found = found.len(),
			"resolve_all"
		);
		Ok(found)
	}
}

impl<C: ?Sized, H, E> Resolver<C, H, E> {
	/// Drops the tracker of `T`; the next resolution of `T` subscribes afresh.
	pub fn evict<T: ?Sized + 'static>(&self) -> bool {
		self.cache.evict(&ExtensionPoint::of::<T>())
	}

	/// Disposes every tracker. Later resolutions return nothing.
	pub fn shutdown(&self) {
		tracing::info!(trackers = self.cache.len(), "resolver shutting down");
		self.cache.evict_all();
	}

	pub fn is_shut_down(&self) -> bool {
		self.cache.is_closed()
	}

	pub fn cache(&self) -> &ResolutionCache<C, H> {
		&self.cache
	}

	pub fn config(&self) -> &ResolverConfig {
		self.cache.config()
	}

	pub fn host(&self) -> &H {
		self.cache.host()
	}

	pub fn extractor(&self) -> &E {
		&self.extractor
	}
}

impl<C: ?Sized, H, E> fmt::Debug for Resolver<C, H, E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Resolver")
			.field("cache", &self.cache)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests;
