//! The open/closed lifecycle shared by connections and statements.

use crate::error::{Error, Result};

/// An object that is either *open* or *closed*.
///
/// Implementors decide their default state: a `Database` starts closed
/// unless it is constructed from a path, a `Statement` starts open. Every
/// operation that touches a native handle calls [`Openable::require_open`]
/// first, so using a closed object fails with [`Error::State`] instead of
/// reaching the engine.
pub trait Openable {
    /// Checks whether this object is open.
    fn is_open(&self) -> bool;

    /// Name of the implementing type, used in error messages.
    fn object_name(&self) -> &'static str;

    /// Returns `Ok(())` when open, and a `NotOpen` state error otherwise.
    fn require_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::not_open(self.object_name()))
        }
    }
}
