//! Scope lifecycle state.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a [`super::BackupScope`].
///
/// Transitions are `Ready → InInit → Init`; `Invalid` is terminal and
/// reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScopeState {
    /// Constructed, not yet initialized.
    Ready = 0,
    /// `init` is running.
    InInit = 1,
    /// Initialized; reads and writes are allowed.
    Init = 2,
    /// Unrecoverable failure; the scope must be discarded.
    Invalid = 3,
}

impl ScopeState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Ready,
            1 => Self::InInit,
            2 => Self::Init,
            _ => Self::Invalid,
        }
    }
}

impl fmt::Display for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "ready",
            Self::InInit => "in-init",
            Self::Init => "init",
            Self::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

/// Atomic cell holding a [`ScopeState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(ScopeState::Ready as u8))
    }

    pub(crate) fn get(&self) -> ScopeState {
        ScopeState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves from `from` to `to`; returns false if the current state differs.
    pub(crate) fn transition(&self, from: ScopeState, to: ScopeState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Marks the scope invalid. Returns the previous state.
    pub(crate) fn invalidate(&self) -> ScopeState {
        ScopeState::from_u8(self.0.swap(ScopeState::Invalid as u8, Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_ready() {
        assert_eq!(StateCell::new().get(), ScopeState::Ready);
    }

    #[test]
    fn transition_requires_expected_state() {
        let cell = StateCell::new();
        assert!(cell.transition(ScopeState::Ready, ScopeState::InInit));
        assert!(!cell.transition(ScopeState::Ready, ScopeState::InInit));
        assert!(cell.transition(ScopeState::InInit, ScopeState::Init));
        assert_eq!(cell.get(), ScopeState::Init);
    }

    #[test]
    fn invalid_is_terminal() {
        let cell = StateCell::new();
        assert_eq!(cell.invalidate(), ScopeState::Ready);
        assert!(!cell.transition(ScopeState::Ready, ScopeState::InInit));
        assert!(!cell.transition(ScopeState::InInit, ScopeState::Init));
        assert_eq!(cell.get(), ScopeState::Invalid);
    }
}
