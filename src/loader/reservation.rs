//! Scoped identifier reservations.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

/// Identifiers handed out but not yet indexed.
#[derive(Debug, Clone, Default)]
pub(crate) struct Reservations(Arc<Mutex<FxHashSet<SmolStr>>>);

impl Reservations {
    pub(crate) fn contains(&self, id: &str) -> bool {
        self.0.lock().contains(id)
    }

    /// Reserve `id`, returning `None` if it is already reserved.
    pub(crate) fn reserve(&self, id: SmolStr) -> Option<UuidReservation> {
        if !self.0.lock().insert(id.clone()) {
            return None;
        }
        Some(UuidReservation {
            id,
            reservations: self.clone(),
        })
    }
}

/// An identifier reserved for an element about to be inserted.
///
/// The reservation is released when the guard is dropped, whether or not the
/// identifier was used. Index the new element before dropping the guard.
#[derive(Debug)]
pub struct UuidReservation {
    id: SmolStr,
    reservations: Reservations,
}

impl UuidReservation {
    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl Deref for UuidReservation {
    type Target = str;

    fn deref(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for UuidReservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl Drop for UuidReservation {
    fn drop(&mut self) {
        self.reservations.0.lock().remove(&self.id);
    }
}

/// Whether a caller-provided identifier is usable at all.
pub(crate) fn is_valid_identifier(id: &str) -> bool {
    !id.is_empty() && !id.contains('#') && !id.chars().any(char::is_whitespace)
}
