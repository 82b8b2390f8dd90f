// Stage manager test module
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::stage_manager::{Operation, OperationResult, Step};

#[cfg(test)]
mod stage_tests;

/// Shared call counter for operation doubles
#[derive(Clone, Default)]
pub(super) struct CallCounter(Rc<Cell<u32>>);

impl CallCounter {
    pub(super) fn count(&self) -> u32 {
        self.0.get()
    }
}

/// Operation double that counts its invocations and can be told to fail
pub(super) struct CountingOperation {
    calls: CallCounter,
    fail: Rc<Cell<bool>>,
}

impl CountingOperation {
    pub(super) fn new(calls: &CallCounter) -> Self {
        Self {
            calls: calls.clone(),
            fail: Rc::new(Cell::new(false)),
        }
    }

    pub(super) fn failing(calls: &CallCounter) -> (Self, Rc<Cell<bool>>) {
        let operation = Self::new(calls);
        operation.fail.set(true);
        let switch = Rc::clone(&operation.fail);
        (operation, switch)
    }
}

impl Operation for CountingOperation {
    fn run(&mut self) -> OperationResult {
        self.calls.0.set(self.calls.0.get() + 1);
        if self.fail.get() {
            Err("operation failed on purpose".into())
        } else {
            Ok(())
        }
    }
}

/// Records the names of steps in the order they ran
#[derive(Clone, Default)]
pub(super) struct ExecutionLog(Rc<RefCell<Vec<String>>>);

impl ExecutionLog {
    pub(super) fn step(&self, name: &str) -> Step {
        let log = self.clone();
        let step_name = name.to_string();
        Step::new(name, move || -> OperationResult {
            log.0.borrow_mut().push(step_name.clone());
            Ok(())
        })
        .expect("valid step name")
    }

    pub(super) fn failing_step(&self, name: &str) -> Step {
        let log = self.clone();
        let step_name = name.to_string();
        Step::new(name, move || -> OperationResult {
            log.0.borrow_mut().push(step_name.clone());
            Err(format!("{} failed", step_name).into())
        })
        .expect("valid step name")
    }

    pub(super) fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}
