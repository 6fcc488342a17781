//! Callback slots.

use crate::error::CallbackResult;

/// What will receive one kind of outcome.
pub(crate) enum Slot<T> {
    /// Nothing registered.
    Unset,
    /// A caller-supplied callback.
    Caller(Box<dyn FnOnce(T) -> CallbackResult>),
    /// Keep the value on the invocation for synchronous retrieval.
    Capture,
}

impl<T> Slot<T> {
    pub(crate) fn caller<F>(f: F) -> Self
    where
        F: FnOnce(T) -> CallbackResult + 'static,
    {
        Self::Caller(Box::new(f))
    }

    pub(crate) fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Take the slot's contents, leaving it unset.
    pub(crate) fn take(&mut self) -> Self {
        std::mem::replace(self, Self::Unset)
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> std::fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => f.write_str("Unset"),
            Self::Caller(_) => f.write_str("Caller"),
            Self::Capture => f.write_str("Capture"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_leaves_unset() {
        let mut slot: Slot<u32> = Slot::caller(|_| Ok(()));
        assert!(slot.is_set());
        let taken = slot.take();
        assert!(matches!(taken, Slot::Caller(_)));
        assert!(!slot.is_set());
    }

    #[test]
    fn capture_counts_as_set() {
        let slot: Slot<u32> = Slot::Capture;
        assert!(slot.is_set());
        assert_eq!(format!("{slot:?}"), "Capture");
    }
}
