//! Host registry contract.
//!
//! The host owns candidate registrations and announces them to listeners. The
//! engine never assumes a particular component framework: anything that can call
//! [`CandidateListener::on_added`] and [`CandidateListener::on_removed`] can drive
//! it. [`memory::MemoryHost`] is the in-process implementation.

use std::sync::Arc;

use crate::attributes::Attributes;
use crate::error::HostError;

pub mod memory;

/// Observer of candidate events for one extension point.
///
/// Events may arrive on any thread, concurrently with resolutions.
pub trait CandidateListener<T: ?Sized>: Send + Sync {
	fn on_added(&self, candidate: Arc<T>, attributes: &Attributes);

	/// `attributes` are the registration attributes as captured at removal time.
	fn on_removed(&self, candidate: &Arc<T>, attributes: &Attributes);
}

/// Handle of an active listener subscription.
pub trait Subscription: Send + Sync {
	/// Stops event delivery to the listener.
	///
	/// Cancelling twice on a live host is a no-op.
	fn cancel(&self) -> Result<(), HostError>;
}

/// Dynamic registry of candidate implementations, keyed by extension point type.
pub trait HostRegistry: Send + Sync + 'static {
	/// Subscribes `listener` to the extension point of `T`.
	///
	/// Candidates already registered must be delivered to the listener as add
	/// events before this returns.
	fn subscribe<T>(
		&self,
		listener: Arc<dyn CandidateListener<T>>,
	) -> Result<Box<dyn Subscription>, HostError>
	where
		T: ?Sized + Send + Sync + 'static;
}

impl<H: HostRegistry> HostRegistry for Arc<H> {
	fn subscribe<T>(
		&self,
		listener: Arc<dyn CandidateListener<T>>,
	) -> Result<Box<dyn Subscription>, HostError>
	where
		T: ?Sized + Send + Sync + 'static,
	{
		(**self).subscribe(listener)
	}
}
