use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of one extension point.
///
/// Derived from a type token, usually the trait object type implementations are
/// registered under (`dyn LinkSpi`). Equality and hashing use the [`TypeId`] only;
/// the type name is carried for logs and error messages.
#[derive(Clone, Copy)]
pub struct ExtensionPoint {
	id: TypeId,
	name: &'static str,
}

impl ExtensionPoint {
	/// Returns the extension point for type token `T`.
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: type_name::<T>(),
		}
	}

	/// Returns the type name of the token.
	pub const fn name(&self) -> &'static str {
		self.name
	}

	/// Returns the underlying type identity.
	pub const fn type_id(&self) -> TypeId {
		self.id
	}
}

impl PartialEq for ExtensionPoint {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for ExtensionPoint {}

impl Hash for ExtensionPoint {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Debug for ExtensionPoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ExtensionPoint").field(&self.name).finish()
	}
}

impl fmt::Display for ExtensionPoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}
