#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Handler-facing resolvers built on [`handler_resolver`].
//!
//! Content handlers (link, media, URL) ship several implementations of the same
//! SPI, each responsible for a part of the content tree. The resolvers here pick
//! the implementation that applies to a given [`Resource`]:
//!
//! - [`ContextAwareServiceResolver`] resolves the best match or all matches.
//! - [`SpiResolver`] resolves the best match only.

pub mod caservice;
pub mod resource;
pub mod spisupport;

pub use caservice::{ContextAwareService, ContextAwareServiceResolver};
pub use resource::{Request, Resource};
pub use spisupport::{SpiMatcher, SpiResolver};
