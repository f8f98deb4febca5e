//! In-process host registry.
//!
//! Events are delivered synchronously on the calling thread while the host lock is
//! held. Every listener therefore observes one total order of add/remove events,
//! and a subscription replay can never interleave with a concurrent removal.
//! Listeners must not call back into the host from an event.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

use super::{CandidateListener, HostRegistry, Subscription};
use crate::attributes::Attributes;
use crate::error::HostError;
use crate::point::ExtensionPoint;

/// Identifier of one registration, unique per host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

impl fmt::Display for RegistrationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "registration#{}", self.0)
	}
}

/// Cloneable handle to an in-memory candidate registry.
#[derive(Clone, Default)]
pub struct MemoryHost {
	inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
	state: Mutex<HostState>,
}

#[derive(Default)]
struct HostState {
	shut_down: bool,
	next_id: u64,
	/// Kept in registration order; subscription replay follows it.
	registrations: Vec<Registration>,
	listeners: HashMap<ExtensionPoint, Vec<ListenerSlot>>,
	rejected: HashMap<ExtensionPoint, String>,
}

impl HostState {
	fn next_id(&mut self) -> u64 {
		self.next_id += 1;
		self.next_id
	}

	fn listeners_of(&self, point: &ExtensionPoint) -> &[ListenerSlot] {
		self.listeners
			.get(point)
			.map(Vec::as_slice)
			.unwrap_or_default()
	}
}

struct Registration {
	id: RegistrationId,
	point: ExtensionPoint,
	candidate: Box<dyn HostedCandidate>,
	attributes: Attributes,
}

struct ListenerSlot {
	id: u64,
	/// Holds an `Arc<dyn CandidateListener<T>>` for the slot's extension point.
	listener: Box<dyn Any + Send + Sync>,
}

/// Type-erased candidate that knows how to reach listeners of its own type.
trait HostedCandidate: Send + Sync {
	fn deliver_added(&self, listener: &dyn Any, attributes: &Attributes);
	fn deliver_removed(&self, listener: &dyn Any, attributes: &Attributes);
}

struct Hosted<T: ?Sized>(Arc<T>);

impl<T> HostedCandidate for Hosted<T>
where
	T: ?Sized + Send + Sync + 'static,
{
	fn deliver_added(&self, listener: &dyn Any, attributes: &Attributes) {
		if let Some(listener) = listener.downcast_ref::<Arc<dyn CandidateListener<T>>>() {
			listener.on_added(Arc::clone(&self.0), attributes);
		}
	}

	fn deliver_removed(&self, listener: &dyn Any, attributes: &Attributes) {
		if let Some(listener) = listener.downcast_ref::<Arc<dyn CandidateListener<T>>>() {
			listener.on_removed(&self.0, attributes);
		}
	}
}

impl MemoryHost {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `candidate` under the extension point of `T` and announces it.
	pub fn register<T>(
		&self,
		candidate: Arc<T>,
		attributes: Attributes,
	) -> Result<RegistrationId, HostError>
	where
		T: ?Sized + Send + Sync + 'static,
	{
		let point = ExtensionPoint::of::<T>();
		let mut state = self.inner.state.lock();
		if state.shut_down {
			return Err(HostError::Unavailable);
		}

		let id = RegistrationId(state.next_id());
		let registration = Registration {
			id,
			point,
			candidate: Box::new(Hosted(candidate)),
			attributes,
		};
		for slot in state.listeners_of(&point) {
			registration
				.candidate
				.deliver_added(slot.listener.as_ref(), &registration.attributes);
		}
		state.registrations.push(registration);
		tracing::debug!(%point, %id, "candidate registered");
		Ok(id)
	}

	/// Removes a registration and announces the removal.
	///
	/// Returns `Ok(false)` if `id` is not (or no longer) registered.
	pub fn unregister(&self, id: RegistrationId) -> Result<bool, HostError> {
		let mut state = self.inner.state.lock();
		if state.shut_down {
			return Err(HostError::Unavailable);
		}
		let Some(pos) = state.registrations.iter().position(|r| r.id == id) else {
			return Ok(false);
		};

		let registration = state.registrations.remove(pos);
		for slot in state.listeners_of(&registration.point) {
			registration
				.candidate
				.deliver_removed(slot.listener.as_ref(), &registration.attributes);
		}
		tracing::debug!(point = %registration.point, %id, "candidate unregistered");
		Ok(true)
	}

	/// Makes later subscriptions for `T` fail with [`HostError::Rejected`].
	pub fn reject_subscriptions<T: ?Sized + 'static>(&self, reason: impl Into<String>) {
		self.inner
			.state
			.lock()
			.rejected
			.insert(ExtensionPoint::of::<T>(), reason.into());
	}

	/// Undoes [`Self::reject_subscriptions`].
	pub fn accept_subscriptions<T: ?Sized + 'static>(&self) {
		self.inner
			.state
			.lock()
			.rejected
			.remove(&ExtensionPoint::of::<T>());
	}

	/// Shuts the host down.
	///
	/// Every registration is withdrawn and announced as removed to the listeners
	/// of its extension point, newest first. Listeners are then dropped; every
	/// later register, unregister, subscribe or cancel call fails with
	/// [`HostError::Unavailable`].
	pub fn shut_down(&self) {
		let (registrations, listeners) = {
			let mut state = self.inner.state.lock();
			if state.shut_down {
				return;
			}
			state.shut_down = true;
			for registration in state.registrations.iter().rev() {
				for slot in state.listeners_of(&registration.point) {
					registration
						.candidate
						.deliver_removed(slot.listener.as_ref(), &registration.attributes);
				}
			}
			(
				std::mem::take(&mut state.registrations),
				std::mem::take(&mut state.listeners),
			)
		};
		tracing::debug!(
			registrations = registrations.len(),
			listeners = listeners.values().map(Vec::len).sum::<usize>(),
			"host shut down"
		);
	}

	pub fn is_shut_down(&self) -> bool {
		self.inner.state.lock().shut_down
	}

	/// Returns the number of active subscriptions for `T`.
	pub fn listener_count<T: ?Sized + 'static>(&self) -> usize {
		self.inner
			.state
			.lock()
			.listeners_of(&ExtensionPoint::of::<T>())
			.len()
	}

	/// Returns the number of live registrations for `T`.
	pub fn registration_count<T: ?Sized + 'static>(&self) -> usize {
		let point = ExtensionPoint::of::<T>();
		self.inner
			.state
			.lock()
			.registrations
			.iter()
			.filter(|r| r.point == point)
			.count()
	}
}

impl fmt::Debug for MemoryHost {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("MemoryHost")
			.field("shut_down", &state.shut_down)
			.field("registrations", &state.registrations.len())
			.field("points_observed", &state.listeners.len())
			.finish()
	}
}

impl HostRegistry for MemoryHost {
	fn subscribe<T>(
		&self,
		listener: Arc<dyn CandidateListener<T>>,
	) -> Result<Box<dyn Subscription>, HostError>
	where
		T: ?Sized + Send + Sync + 'static,
	{
		let point = ExtensionPoint::of::<T>();
		let mut state = self.inner.state.lock();
		if state.shut_down {
			return Err(HostError::Unavailable);
		}
		if let Some(reason) = state.rejected.get(&point) {
			return Err(HostError::Rejected {
				point,
				reason: reason.clone(),
			});
		}

		for registration in state.registrations.iter().filter(|r| r.point == point) {
			registration
				.candidate
				.deliver_added(&listener, &registration.attributes);
		}

		let id = state.next_id();
		state.listeners.entry(point).or_default().push(ListenerSlot {
			id,
			listener: Box::new(listener),
		});

		Ok(Box::new(MemorySubscription {
			host: Arc::downgrade(&self.inner),
			point,
			id,
		}))
	}
}

struct MemorySubscription {
	host: Weak<Inner>,
	point: ExtensionPoint,
	id: u64,
}

impl Subscription for MemorySubscription {
	fn cancel(&self) -> Result<(), HostError> {
		let host = self.host.upgrade().ok_or(HostError::Unavailable)?;
		let mut state = host.state.lock();
		if state.shut_down {
			return Err(HostError::Unavailable);
		}
		if let Some(slots) = state.listeners.get_mut(&self.point) {
			slots.retain(|slot| slot.id != self.id);
			if slots.is_empty() {
				state.listeners.remove(&self.point);
			}
		}
		Ok(())
	}
}

