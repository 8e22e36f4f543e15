//! Reentrancy guard around every kernel entry point
//!
//! Writes already take `&mut Kernel`, so the borrow checker rules out a
//! write nested inside a read or another write. The gate enforces the same
//! discipline at run time for the paths the compiler cannot see (callbacks
//! holding a shared kernel reference) and makes the current state
//! observable. Guards release on drop, on success and on error alike.

use std::cell::Cell;
use std::rc::Rc;

use crate::core::error::{fatal, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    Idle,
    /// Number of nested readers
    Reading(u32),
    Writing,
}

#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    state: Rc<Cell<GateState>>,
}

impl AccessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        self.state.get()
    }

    pub fn try_enter_for_read(&self, operation: &str) -> Result<ReadGuard, ErrorKind> {
        let next = match self.state.get() {
            GateState::Idle => GateState::Reading(1),
            GateState::Reading(n) => GateState::Reading(n + 1),
            GateState::Writing => {
                return Err(ErrorKind::AccessViolation(format!(
                    "{} entered while a write is in progress",
                    operation
                )))
            }
        };
        self.state.set(next);
        Ok(ReadGuard {
            state: Rc::clone(&self.state),
        })
    }

    pub fn try_enter_for_write(&self, operation: &str) -> Result<WriteGuard, ErrorKind> {
        match self.state.get() {
            GateState::Idle => {
                self.state.set(GateState::Writing);
                Ok(WriteGuard {
                    state: Rc::clone(&self.state),
                })
            }
            state => Err(ErrorKind::AccessViolation(format!(
                "{} entered while the kernel is {:?}",
                operation, state
            ))),
        }
    }

    /// A violation is a defect and ends the run
    pub fn enter_for_read(&self, operation: &'static str) -> ReadGuard {
        match self.try_enter_for_read(operation) {
            Ok(guard) => guard,
            Err(kind) => fatal(operation, kind),
        }
    }

    pub fn enter_for_write(&self, operation: &'static str) -> WriteGuard {
        match self.try_enter_for_write(operation) {
            Ok(guard) => guard,
            Err(kind) => fatal(operation, kind),
        }
    }
}

#[must_use = "the gate is released when the guard drops"]
#[derive(Debug)]
pub struct ReadGuard {
    state: Rc<Cell<GateState>>,
}

impl Drop for ReadGuard {
    fn drop(&mut self) {
        let next = match self.state.get() {
            GateState::Reading(n) if n > 1 => GateState::Reading(n - 1),
            _ => GateState::Idle,
        };
        self.state.set(next);
    }
}

#[must_use = "the gate is released when the guard drops"]
#[derive(Debug)]
pub struct WriteGuard {
    state: Rc<Cell<GateState>>,
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        self.state.set(GateState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_reads_allowed() {
        let gate = AccessGate::new();
        let outer = gate.enter_for_read("outer");
        {
            let _inner = gate.enter_for_read("inner");
            assert_eq!(gate.state(), GateState::Reading(2));
        }
        assert_eq!(gate.state(), GateState::Reading(1));
        drop(outer);
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[test]
    fn test_write_excludes_everything() {
        let gate = AccessGate::new();
        let guard = gate.enter_for_write("set_person_property");
        assert!(matches!(
            gate.try_enter_for_read("get_person_property"),
            Err(ErrorKind::AccessViolation(_))
        ));
        assert!(gate.try_enter_for_write("add_person").is_err());
        drop(guard);
        assert_eq!(gate.state(), GateState::Idle);
        assert!(gate.try_enter_for_write("add_person").is_ok());
    }

    #[test]
    fn test_write_during_read_rejected() {
        let gate = AccessGate::new();
        let _read = gate.enter_for_read("sample");
        let err = gate.try_enter_for_write("remove_person").unwrap_err();
        assert!(err.to_string().contains("remove_person"));
    }

    #[test]
    #[should_panic(expected = "kernel defect")]
    fn test_violation_is_fatal() {
        let gate = AccessGate::new();
        let _write = gate.enter_for_write("outer");
        let _nested = gate.enter_for_write("inner");
    }

    #[test]
    fn test_guard_released_on_early_return() {
        fn failing(gate: &AccessGate) -> Result<(), ErrorKind> {
            let _guard = gate.enter_for_write("failing");
            Err(ErrorKind::CounterOverflow)
        }
        let gate = AccessGate::new();
        assert!(failing(&gate).is_err());
        assert_eq!(gate.state(), GateState::Idle);
    }
}
