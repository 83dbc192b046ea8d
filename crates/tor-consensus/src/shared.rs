//! The current relay table, shared between readers and refreshes.

use std::sync::{Arc, RwLock};

use crate::{Error, Result};

/// A replaceable reference to an [`Arc`].
///
/// Readers take a clone of the `Arc` and keep using it for as long as they
/// like.  Replacing the value never disturbs them; changing it in place
/// copies it first if anybody else still holds the old one.
#[derive(Debug)]
pub(crate) struct SharedMutArc<T> {
    /// Locked reference to the current value.
    ///
    /// The lock is only ever held for the length of a pointer swap, or of
    /// a `mutate` callback.
    inner: RwLock<Option<Arc<T>>>,
}

impl<T> SharedMutArc<T> {
    /// Construct a new empty SharedMutArc.
    pub(crate) fn new() -> Self {
        SharedMutArc {
            inner: RwLock::new(None),
        }
    }

    /// Replace the current value with `new_val`, and return a reference to it.
    pub(crate) fn replace(&self, new_val: T) -> Arc<T> {
        let new_val = Arc::new(new_val);
        let mut w = self
            .inner
            .write()
            .expect("Poisoned lock for current table");
        *w = Some(Arc::clone(&new_val));
        new_val
    }

    /// Return a new reference to the current value, if there is one.
    pub(crate) fn get(&self) -> Option<Arc<T>> {
        let r = self
            .inner
            .read()
            .expect("Poisoned lock for current table");
        r.as_ref().map(Arc::clone)
    }

    /// Apply `func` to the current value, cloning it first if it is shared.
    ///
    /// Gives [`Error::NoConsensus`] if there is no current value.
    pub(crate) fn mutate<F, U>(&self, func: F) -> Result<U>
    where
        F: FnOnce(&mut T) -> Result<U>,
        T: Clone,
    {
        let mut w = self
            .inner
            .write()
            .expect("Poisoned lock for current table");
        match w.as_mut() {
            None => Err(Error::NoConsensus),
            Some(arc) => func(Arc::make_mut(arc)),
        }
    }
}
