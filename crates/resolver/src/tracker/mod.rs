//! Ranked candidate tracking for one extension point.
//!
//! # Mental model
//!
//! * The tracker is a [`CandidateListener`] subscribed to the host.
//! * Every add/remove builds a replacement [`RankedList`] and publishes it with CAS;
//!   a failed CAS means a concurrent event won first and the rebuild is retried from
//!   the latest list.
//! * Queries pin one list generation with a single atomic load and never lock.
//! * Disposal swaps the list out for `None`; from then on queries return nothing
//!   and events are ignored.
//!
//! # Rank order
//!
//! Priority descending, then arrival order ascending: among equal priorities the
//! candidate the tracker observed first wins. Arrival is stamped with a per-tracker
//! ordinal when the add event is handled, so the order is stable across queries of
//! the same list.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{self, AtomicU64};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::attributes::Attributes;
use crate::config::{MatcherFaults, ResolverConfig};
use crate::error::HostError;
use crate::host::{CandidateListener, HostRegistry, Subscription};
use crate::matcher::CapabilityMatcher;
use crate::point::ExtensionPoint;

/// One candidate inside a [`RankedList`].
pub struct RankedEntry<T: ?Sized> {
	pub candidate: Arc<T>,
	pub priority: i32,
	/// Arrival stamp, unique per tracker.
	pub ordinal: u64,
	pub attributes: Attributes,
}

impl<T: ?Sized> Clone for RankedEntry<T> {
	fn clone(&self) -> Self {
		Self {
			candidate: Arc::clone(&self.candidate),
			priority: self.priority,
			ordinal: self.ordinal,
			attributes: self.attributes.clone(),
		}
	}
}

impl<T: ?Sized> fmt::Debug for RankedEntry<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RankedEntry")
			.field("priority", &self.priority)
			.field("ordinal", &self.ordinal)
			.field("attributes", &self.attributes)
			.finish_non_exhaustive()
	}
}

/// `Less` means `a` is ranked before `b`.
fn rank_cmp<T: ?Sized>(a: &RankedEntry<T>, b: &RankedEntry<T>) -> Ordering {
	b.priority
		.cmp(&a.priority)
		.then_with(|| a.ordinal.cmp(&b.ordinal))
}

fn same_instance<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
	std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Immutable, rank-ordered candidate list. Never mutated after publication.
pub struct RankedList<T: ?Sized> {
	entries: Vec<RankedEntry<T>>,
}

impl<T: ?Sized> RankedList<T> {
	fn empty() -> Self {
		Self {
			entries: Vec::new(),
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Entries in rank order.
	pub fn entries(&self) -> &[RankedEntry<T>] {
		&self.entries
	}

	/// Returns a copy of this list with `entry` inserted at its rank position.
	fn with(&self, entry: RankedEntry<T>) -> Self {
		let pos = self
			.entries
			.partition_point(|e| rank_cmp(e, &entry) == Ordering::Less);
		let mut entries = Vec::with_capacity(self.entries.len() + 1);
		entries.extend_from_slice(&self.entries[..pos]);
		entries.push(entry);
		entries.extend_from_slice(&self.entries[pos..]);
		Self { entries }
	}

	/// Returns a copy of this list without `candidate`, or `None` if it is absent.
	///
	/// If the same instance is listed more than once, the entry with `priority`
	/// is dropped, falling back to the highest ranked one.
	fn without(&self, candidate: &Arc<T>, priority: i32) -> Option<Self> {
		let mut matching = self
			.entries
			.iter()
			.enumerate()
			.filter(|(_, e)| same_instance(&e.candidate, candidate));
		let first = matching.next()?.0;
		let pos = std::iter::once(first)
			.chain(matching.map(|(i, _)| i))
			.find(|&i| self.entries[i].priority == priority)
			.unwrap_or(first);

		let mut entries = self.entries.clone();
		entries.remove(pos);
		Some(Self { entries })
	}
}

impl<T: ?Sized> fmt::Debug for RankedList<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(&self.entries).finish()
	}
}

/// Live, ranked view of the candidates registered for one extension point.
pub struct RankedTracker<T: ?Sized, C: ?Sized> {
	point: ExtensionPoint,
	config: Arc<ResolverConfig>,
	/// `None` once disposed.
	list: ArcSwapOption<RankedList<T>>,
	next_ordinal: AtomicU64,
	subscription: Mutex<Option<Box<dyn Subscription>>>,
	_context: PhantomData<fn(&C)>,
}

impl<T, C> RankedTracker<T, C>
where
	T: ?Sized + CapabilityMatcher<C> + Send + Sync + 'static,
	C: ?Sized + 'static,
{
	/// Creates a tracker for `T` and subscribes it to `host`.
	///
	/// Candidates already registered are replayed into the tracker before this
	/// returns.
	pub fn open<H: HostRegistry>(host: &H, config: Arc<ResolverConfig>) -> Result<Arc<Self>, HostError> {
		let tracker = Arc::new(Self::detached(config));
		let subscription = host.subscribe::<T>(tracker.clone())?;
		*tracker.subscription.lock() = Some(subscription);
		tracing::debug!(point = %tracker.point, candidates = tracker.len(), "tracker opened");
		Ok(tracker)
	}

	/// Creates an active tracker that is not subscribed to any host.
	///
	/// Events must be fed through its [`CandidateListener`] implementation.
	pub fn detached(config: Arc<ResolverConfig>) -> Self {
		Self {
			point: ExtensionPoint::of::<T>(),
			config,
			list: ArcSwapOption::from_pointee(RankedList::empty()),
			next_ordinal: AtomicU64::new(0),
			subscription: Mutex::new(None),
			_context: PhantomData,
		}
	}
}

impl<T, C> RankedTracker<T, C>
where
	T: ?Sized + CapabilityMatcher<C>,
	C: ?Sized,
{
	/// Returns every candidate accepting `context`, in rank order.
	///
	/// Empty once the tracker is disposed.
	pub fn query(&self, context: Option<&C>) -> Vec<Arc<T>> {
		let Some(list) = self.list.load_full() else {
			return Vec::new();
		};
		list.entries
			.iter()
			.filter(|entry| self.accepts(entry, context))
			.map(|entry| Arc::clone(&entry.candidate))
			.collect()
	}

	/// Returns the highest ranked candidate accepting `context`.
	///
	/// Candidates ranked below the winner are not evaluated.
	pub fn query_first(&self, context: Option<&C>) -> Option<Arc<T>> {
		let list = self.list.load_full()?;
		list.entries
			.iter()
			.find(|entry| self.accepts(entry, context))
			.map(|entry| Arc::clone(&entry.candidate))
	}

	fn accepts(&self, entry: &RankedEntry<T>, context: Option<&C>) -> bool {
		let evaluate = || {
			(context.is_some() || entry.candidate.supports_null_context())
				&& entry.candidate.matches(context)
		};
		match self.config.matcher_faults {
			MatcherFaults::Propagate => evaluate(),
			MatcherFaults::Isolate => match catch_unwind(AssertUnwindSafe(evaluate)) {
				Ok(matched) => matched,
				Err(payload) => {
					tracing::error!(
						point = %self.point,
						priority = entry.priority,
						ordinal = entry.ordinal,
						panic = panic_message(payload.as_ref()),
						"candidate matcher panicked, treating it as no match"
					);
					false
				}
			},
		}
	}
}

impl<T: ?Sized, C: ?Sized> RankedTracker<T, C> {
	pub fn point(&self) -> ExtensionPoint {
		self.point
	}

	/// Pins the current list generation, or `None` once disposed.
	pub fn snapshot(&self) -> Option<Arc<RankedList<T>>> {
		self.list.load_full()
	}

	/// Number of tracked candidates, matching or not.
	pub fn len(&self) -> usize {
		self.snapshot().map_or(0, |list| list.len())
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn is_disposed(&self) -> bool {
		self.list.load().is_none()
	}

	/// Releases the list and cancels the host subscription.
	///
	/// Idempotent. Never blocks a concurrent query; queries racing with disposal
	/// see either the last list or nothing. Cancellation failures are logged.
	pub fn dispose(&self) {
		let released = self.list.swap(None);
		let subscription = self.subscription.lock().take();
		if released.is_none() && subscription.is_none() {
			return;
		}

		if let Some(subscription) = subscription
			&& let Err(err) = subscription.cancel()
		{
			tracing::warn!(point = %self.point, %err, "failed to cancel candidate subscription");
		}
		tracing::debug!(
			point = %self.point,
			candidates = released.map_or(0, |list| list.len()),
			"tracker disposed"
		);
	}

	/// Rebuilds the list with `rebuild` and publishes it.
	///
	/// Returns false if the tracker is disposed or `rebuild` reports no change.
	fn publish(&self, rebuild: impl Fn(&RankedList<T>) -> Option<RankedList<T>>) -> bool {
		loop {
			let current = self.list.load_full();
			let Some(old) = current.as_ref() else {
				return false;
			};
			let Some(next) = rebuild(old) else {
				return false;
			};

			let prev = self.list.compare_and_swap(&current, Some(Arc::new(next)));
			if same_generation(&prev, &current) {
				return true;
			}
			// Lost the race against another event or disposal; retry.
		}
	}
}

fn same_generation<L>(a: &Option<Arc<L>>, b: &Option<Arc<L>>) -> bool {
	match (a, b) {
		(Some(a), Some(b)) => Arc::ptr_eq(a, b),
		(None, None) => true,
		_ => false,
	}
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
	payload
		.downcast_ref::<&'static str>()
		.copied()
		.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
		.unwrap_or("<non-string panic payload>")
}

impl<T, C> CandidateListener<T> for RankedTracker<T, C>
where
	T: ?Sized + Send + Sync,
	C: ?Sized,
{
	fn on_added(&self, candidate: Arc<T>, attributes: &Attributes) {
		let priority = attributes.priority(&self.config.ranking_key, self.config.baseline_priority);
		let ordinal = self.next_ordinal.fetch_add(1, atomic::Ordering::Relaxed);
		let entry = RankedEntry {
			candidate,
			priority,
			ordinal,
			attributes: attributes.clone(),
		};

		if self.publish(|list| Some(list.with(entry.clone()))) {
			tracing::debug!(point = %self.point, priority, ordinal, "candidate added");
		} else {
			tracing::debug!(point = %self.point, priority, "ignoring candidate added to disposed tracker");
		}
	}

	fn on_removed(&self, candidate: &Arc<T>, attributes: &Attributes) {
		let priority = attributes.priority(&self.config.ranking_key, self.config.baseline_priority);
		if self.publish(|list| list.without(candidate, priority)) {
			tracing::debug!(point = %self.point, priority, "candidate removed");
		} else {
			tracing::debug!(point = %self.point, priority, "ignoring removal of untracked candidate");
		}
	}
}

impl<T: ?Sized, C: ?Sized> fmt::Debug for RankedTracker<T, C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RankedTracker")
			.field("point", &self.point)
			.field("candidates", &self.len())
			.field("disposed", &self.is_disposed())
			.finish()
	}
}
