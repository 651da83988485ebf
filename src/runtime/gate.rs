//! Step limiting.

/// Decides whether a call may run its body now.
///
/// Queried once per call frame each time the body is entered or resumed.
/// Declining is indistinguishable from a cooperative yield: the call
/// reports "not complete" and nothing has changed.
pub trait StepGate {
    fn allow(&mut self) -> bool;
}

/// Never declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl StepGate for Unlimited {
    fn allow(&mut self) -> bool {
        true
    }
}

/// Allows a fixed number of body entries.
#[derive(Debug, Clone, Copy)]
pub struct StepBudget {
    remaining: usize,
}

impl StepBudget {
    pub fn new(steps: usize) -> Self {
        Self { remaining: steps }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl StepGate for StepBudget {
    fn allow(&mut self) -> bool {
        match self.remaining.checked_sub(1) {
            Some(left) => {
                self.remaining = left;
                true
            }
            None => false,
        }
    }
}

impl<F: FnMut() -> bool> StepGate for F {
    fn allow(&mut self) -> bool {
        self()
    }
}
