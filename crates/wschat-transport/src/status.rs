//! Shared connection status cell.

use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};

use wschat_core::ConnectionStatus;

/// Status shared between a handle and the task driving its connection.
#[derive(Debug, Clone)]
pub(crate) struct StatusCell(Arc<AtomicU8>);

impl StatusCell {
    pub(crate) fn new(status: ConnectionStatus) -> Self {
        Self(Arc::new(AtomicU8::new(encode(status))))
    }

    pub(crate) fn get(&self) -> ConnectionStatus {
        decode(self.0.load(Ordering::Acquire))
    }

    /// Move from `connecting` to `open`. Fails if already closed.
    pub(crate) fn open(&self) -> bool {
        self.0
            .compare_exchange(
                encode(ConnectionStatus::Connecting),
                encode(ConnectionStatus::Open),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move to `closed`, returning whether this call did the transition.
    pub(crate) fn close(&self) -> bool {
        self.0.swap(encode(ConnectionStatus::Closed), Ordering::AcqRel)
            != encode(ConnectionStatus::Closed)
    }
}

const fn encode(status: ConnectionStatus) -> u8 {
    match status {
        ConnectionStatus::Connecting => 0,
        ConnectionStatus::Open => 1,
        ConnectionStatus::Closed => 2,
    }
}

const fn decode(value: u8) -> ConnectionStatus {
    match value {
        0 => ConnectionStatus::Connecting,
        1 => ConnectionStatus::Open,
        _ => ConnectionStatus::Closed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_transitions_once() {
        let cell = StatusCell::new(ConnectionStatus::Connecting);
        assert!(cell.open());
        assert_eq!(cell.get(), ConnectionStatus::Open);
        assert!(cell.close());
        assert!(!cell.close());
        assert!(!cell.open());
        assert_eq!(cell.get(), ConnectionStatus::Closed);
    }
}
