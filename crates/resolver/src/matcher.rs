/// Predicate every candidate implementation of an extension point exposes.
///
/// Extension point traits extend this trait; the resolver evaluates it on every
/// lookup, so implementations must be cheap (e.g. a precompiled regex over a
/// path) and free of side effects.
pub trait CapabilityMatcher<C: ?Sized> {
	/// Returns true if this implementation handles `context`.
	///
	/// `context` is only `None` when [`Self::supports_null_context`] returns true.
	fn matches(&self, context: Option<&C>) -> bool;

	/// Opts this implementation into evaluation when no context is available.
	fn supports_null_context(&self) -> bool {
		false
	}
}
