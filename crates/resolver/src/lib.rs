#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Ranked, context-aware resolution of extension point implementations.
//!
//! An extension point is a contract (usually a trait object type such as
//! `dyn LinkSpi`) for which many independently registered implementations may
//! exist at the same time. Every implementation declares a priority through its
//! registration [`Attributes`] and a predicate over an optional context object
//! through [`CapabilityMatcher`]. The [`Resolver`] answers, at call time, which
//! implementation matches best, or which ones match at all in rank order.
//!
//! # Data flow
//!
//! 1. A [`HostRegistry`] announces candidate add/remove events.
//! 2. A [`RankedTracker`] per extension point turns those events into an
//!    immutable [`RankedList`] that is swapped atomically on every change.
//! 3. The [`ResolutionCache`] creates one tracker per extension point on first
//!    use and disposes it on eviction.
//! 4. [`Resolver::resolve`] / [`Resolver::resolve_all`] extract the context
//!    from the caller's [`Input`], load the tracker and filter its snapshot.
//!
//! # Concurrency
//!
//! - Queries are lock-free: one `ArcSwap` load pins a whole list generation.
//! - Host events rebuild the list and publish it with a CAS retry loop.
//! - Tracker construction is single-flight per extension point.

pub mod attributes;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod matcher;
pub mod point;
pub mod resolver;
pub mod tracker;

pub use attributes::{Attributes, DEFAULT_RANKING_KEY};
pub use cache::ResolutionCache;
pub use config::{ConfigError, MatcherFaults, ResolverConfig};
pub use context::{ContextExtractor, ContextRequest, Input, StandardExtractor};
pub use error::{HostError, ResolveError};
pub use host::memory::{MemoryHost, RegistrationId};
pub use host::{CandidateListener, HostRegistry, Subscription};
pub use matcher::CapabilityMatcher;
pub use point::ExtensionPoint;
pub use resolver::Resolver;
pub use tracker::{RankedEntry, RankedList, RankedTracker};
