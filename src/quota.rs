use std::sync::atomic::{AtomicI64, Ordering};

/// Remaining placement permits shared by every in-flight decision.
///
/// `try_admit` only reads the counter and `release` decrements it once the
/// bind is committed, so concurrent decisions that pass the check before any
/// of them binds can overshoot the ceiling. There is no compare-and-decrement.
#[derive(Debug)]
pub struct AdmissionQuota {
    /// `None` when the gate is disabled.
    remaining: Option<AtomicI64>,
}

impl AdmissionQuota {
    /// A ceiling of `None` or `0` disables the gate.
    pub fn new(ceiling: Option<i64>) -> Self {
        Self {
            remaining: ceiling
                .filter(|ceiling| *ceiling != 0)
                .map(AtomicI64::new),
        }
    }

    pub fn unlimited() -> Self {
        Self { remaining: None }
    }

    pub fn is_limited(&self) -> bool {
        self.remaining.is_some()
    }

    /// Returns false once no permit is left.
    pub fn try_admit(&self) -> bool {
        match &self.remaining {
            None => true,
            Some(remaining) => remaining.load(Ordering::Acquire) > 0,
        }
    }

    /// Consumes one permit. Called once per committed bind.
    pub fn release(&self) {
        if let Some(remaining) = &self.remaining {
            remaining.fetch_sub(1, Ordering::AcqRel);
        }
    }

    pub fn remaining(&self) -> Option<i64> {
        self.remaining
            .as_ref()
            .map(|remaining| remaining.load(Ordering::Acquire))
    }
}
