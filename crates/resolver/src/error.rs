use crate::point::ExtensionPoint;

/// Failures reported by a [`crate::HostRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
	/// The host is shut down or otherwise unreachable.
	#[error("host registry unavailable")]
	Unavailable,
	/// The host refused the request for this extension point.
	#[error("host registry rejected {point}: {reason}")]
	Rejected { point: ExtensionPoint, reason: String },
}

/// Errors surfaced by [`crate::Resolver::resolve`] and [`crate::Resolver::resolve_all`].
///
/// "No candidate matched" is not an error; it is `Ok(None)` or an empty list.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
	/// Subscribing a new tracker to the host registry failed.
	#[error("failed to track candidates for {point}")]
	Subscribe {
		point: ExtensionPoint,
		#[source]
		source: HostError,
	},
}

impl ResolveError {
	/// Returns the extension point the failure relates to.
	pub fn point(&self) -> ExtensionPoint {
		match self {
			Self::Subscribe { point, .. } => *point,
		}
	}
}
