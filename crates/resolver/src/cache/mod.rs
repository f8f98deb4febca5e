//! Per-extension-point tracker cache.
//!
//! # Invariants
//!
//! - At most one live tracker (and one host subscription) per extension point.
//!   Construction happens under the point's slot lock, so racing first lookups
//!   wait for the leader instead of subscribing twice.
//! - Every tracker the cache creates is disposed exactly once: on [`ResolutionCache::evict`],
//!   on [`ResolutionCache::evict_all`], or when the cache is dropped.
//! - A failed subscription leaves nothing behind; the next lookup tries again.
//!
//! # Slot lifecycle
//!
//! `Empty` → `Ready` on successful construction, `Ready`/`Empty` → `Retired` on
//! eviction. A retired slot is no longer reachable from the map; a lookup still
//! holding it starts over with a fresh slot, which keeps a racing lookup from
//! resurrecting an evicted entry.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap as HashMap;

use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::host::HostRegistry;
use crate::matcher::CapabilityMatcher;
use crate::point::ExtensionPoint;
use crate::tracker::RankedTracker;

/// Type-erased disposal hook of a cached tracker.
trait Dispose: Send + Sync {
	fn dispose(&self);
}

impl<T, C> Dispose for RankedTracker<T, C>
where
	T: ?Sized + Send + Sync,
	C: ?Sized,
{
	fn dispose(&self) {
		RankedTracker::dispose(self);
	}
}

struct CachedTracker {
	/// Holds an `Arc<RankedTracker<T, C>>` for the slot's extension point.
	tracker: Arc<dyn Any + Send + Sync>,
	disposer: Arc<dyn Dispose>,
}

enum SlotState {
	Empty,
	Ready(CachedTracker),
	Retired,
}

struct Slot {
	state: Mutex<SlotState>,
}

impl Slot {
	fn new() -> Self {
		Self {
			state: Mutex::new(SlotState::Empty),
		}
	}

	/// Marks the slot retired and disposes its tracker, if any.
	fn retire(&self) -> bool {
		let previous = std::mem::replace(&mut *self.state.lock(), SlotState::Retired);
		match previous {
			SlotState::Ready(entry) => {
				entry.disposer.dispose();
				true
			}
			SlotState::Empty | SlotState::Retired => false,
		}
	}

	fn is_ready(&self) -> bool {
		matches!(*self.state.lock(), SlotState::Ready(_))
	}
}

/// Maps extension points to their [`RankedTracker`], creating trackers on demand.
pub struct ResolutionCache<C: ?Sized, H> {
	host: H,
	config: Arc<ResolverConfig>,
	slots: RwLock<HashMap<ExtensionPoint, Arc<Slot>>>,
	closed: AtomicBool,
	_context: PhantomData<fn(&C)>,
}

impl<C, H> ResolutionCache<C, H>
where
	C: ?Sized + 'static,
	H: HostRegistry,
{
	pub fn new(host: H, config: ResolverConfig) -> Self {
		Self {
			host,
			config: Arc::new(config),
			slots: RwLock::new(HashMap::default()),
			closed: AtomicBool::new(false),
			_context: PhantomData,
		}
	}

	/// Returns the tracker for `T`, subscribing a new one on first use.
	///
	/// Returns `Ok(None)` once the cache is closed by [`Self::evict_all`].
	///
	/// # Errors
	///
	/// [`ResolveError::Subscribe`] if the host refuses the subscription. Nothing is
	/// cached in that case.
	pub fn get<T>(&self) -> Result<Option<Arc<RankedTracker<T, C>>>, ResolveError>
	where
		T: ?Sized + CapabilityMatcher<C> + Send + Sync + 'static,
	{
		let point = ExtensionPoint::of::<T>();
		loop {
			if self.is_closed() {
				return Ok(None);
			}
			let slot = self.slot(point);
			let mut state = slot.state.lock();
			match &*state {
				SlotState::Ready(entry) => return Ok(Some(downcast::<T, C>(entry, point))),
				SlotState::Retired => continue,
				SlotState::Empty => {}
			}
			// evict_all may have closed the cache while this slot was being looked up.
			if self.is_closed() {
				return Ok(None);
			}

			let tracker = RankedTracker::<T, C>::open(&self.host, Arc::clone(&self.config))
				.map_err(|source| ResolveError::Subscribe { point, source })?;
			*state = SlotState::Ready(CachedTracker {
				tracker: tracker.clone(),
				disposer: tracker.clone(),
			});
			return Ok(Some(tracker));
		}
	}

	fn slot(&self, point: ExtensionPoint) -> Arc<Slot> {
		if let Some(slot) = self.slots.read().get(&point) {
			return Arc::clone(slot);
		}
		Arc::clone(
			self.slots
				.write()
				.entry(point)
				.or_insert_with(|| Arc::new(Slot::new())),
		)
	}
}

impl<C: ?Sized, H> ResolutionCache<C, H> {
	/// Disposes the tracker of `point`; the next lookup creates a fresh one.
	///
	/// Returns true if a tracker was disposed.
	pub fn evict(&self, point: &ExtensionPoint) -> bool {
		let Some(slot) = self.slots.write().remove(point) else {
			return false;
		};
		let disposed = slot.retire();
		if disposed {
			tracing::debug!(%point, "tracker evicted");
		}
		disposed
	}

	/// Closes the cache and disposes every tracker.
	///
	/// Lookups after this return no tracker. Calling it again is a no-op.
	pub fn evict_all(&self) {
		if self.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		let slots = std::mem::take(&mut *self.slots.write());
		let disposed = slots.values().filter(|slot| slot.retire()).count();
		tracing::debug!(disposed, "resolution cache closed");
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// Extension points with a live tracker.
	pub fn points(&self) -> Vec<ExtensionPoint> {
		self.slots
			.read()
			.iter()
			.filter(|(_, slot)| slot.is_ready())
			.map(|(point, _)| *point)
			.collect()
	}

	/// Number of live trackers.
	pub fn len(&self) -> usize {
		self.slots
			.read()
			.values()
			.filter(|slot| slot.is_ready())
			.count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn config(&self) -> &ResolverConfig {
		&self.config
	}

	pub fn host(&self) -> &H {
		&self.host
	}
}

fn downcast<T, C>(entry: &CachedTracker, point: ExtensionPoint) -> Arc<RankedTracker<T, C>>
where
	T: ?Sized + Send + Sync + 'static,
	C: ?Sized + 'static,
{
	match Arc::clone(&entry.tracker).downcast::<RankedTracker<T, C>>() {
		Ok(tracker) => tracker,
		Err(_) => unreachable!("slot for {point} holds a tracker of another type"),
	}
}

impl<C: ?Sized, H> Drop for ResolutionCache<C, H> {
	fn drop(&mut self) {
		self.evict_all();
	}
}

impl<C: ?Sized, H> fmt::Debug for ResolutionCache<C, H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolutionCache")
			.field("points", &self.points())
			.field("closed", &self.is_closed())
			.finish_non_exhaustive()
	}
}
