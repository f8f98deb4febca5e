//! Resource-scoped selection of SPI implementations.

use std::sync::Arc;

use handler_resolver::{
	CapabilityMatcher, HostRegistry, Input, ResolveError, Resolver, ResolverConfig,
};

use crate::resource::Resource;

/// SPI implementation restricted to the resources it accepts.
///
/// Same contract as [`crate::ContextAwareService`]: `matches` runs on every
/// resolution and sees `None` only when `supports_null_context` opts in.
pub trait SpiMatcher: CapabilityMatcher<Resource> + Send + Sync {}

/// Picks the single best [`SpiMatcher`] implementation for a resource.
#[derive(Debug)]
pub struct SpiResolver<H> {
	resolver: Resolver<Resource, H>,
}

impl<H: HostRegistry> SpiResolver<H> {
	pub fn new(host: H) -> Self {
		Self::with_config(host, ResolverConfig::default())
	}

	pub fn with_config(host: H, config: ResolverConfig) -> Self {
		tracing::debug!(ranking_key = %config.ranking_key, "spi resolver active");
		Self {
			resolver: Resolver::new(host, config),
		}
	}

	/// Returns the highest ranked implementation of `T` accepting the resource of `input`.
	pub fn resolve<'a, T>(&self, input: impl Into<Input<'a, Resource>>) -> Result<Option<Arc<T>>, ResolveError>
	where
		T: ?Sized + SpiMatcher + 'static,
	{
		self.resolver.resolve::<T>(input)
	}

	pub fn shutdown(&self) {
		self.resolver.shutdown();
	}
}
