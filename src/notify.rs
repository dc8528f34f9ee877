//! Deferred reload notifications
//!
//! Executed actions that change host state can arm a service reload. The
//! aggregator collects those requests over one phase execution and coalesces
//! them into at most one pending reload per (target, timing) pair. State is
//! explicit and scoped to the phase run; there is no ambient notification
//! queue.

use crate::action::PlannedAction;
use crate::lifecycle::Phase;

/// Which half of the lifecycle a phase serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Deploy,
    Undeploy,
}

/// When a pending notification fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timing {
    /// Dispatch as soon as recorded
    Immediate,
    /// Dispatch once, at the end of the phase
    Delayed,
}

/// A reload that must be dispatched for a service target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingNotification {
    pub target: String,
    pub timing: Timing,
}

/// Collects reload requests for one phase execution
///
/// `flush` must be called exactly once per phase, after every action in the
/// plan has executed.
#[derive(Debug)]
pub struct NotificationAggregator {
    target: String,
    pending: Vec<PendingNotification>,
}

impl NotificationAggregator {
    /// Aggregator for the platform's service target
    pub fn for_service(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            pending: Vec::new(),
        }
    }

    /// Record the outcome of one executed action
    ///
    /// A no-op execution (`changed == false`) never arms anything, and
    /// neither does a phase without a direction (setup).
    pub fn observe(&mut self, planned: &PlannedAction, changed: bool, phase: Phase) {
        if !changed {
            return;
        }
        let Some(direction) = phase.direction() else {
            return;
        };
        if planned.notify.arms(direction) {
            self.push(PendingNotification {
                target: self.target.clone(),
                timing: Timing::Delayed,
            });
        }
    }

    fn push(&mut self, notification: PendingNotification) {
        if !self.pending.contains(&notification) {
            self.pending.push(notification);
        }
    }

    /// Return the coalesced notifications and clear internal state
    pub fn flush(&mut self) -> Vec<PendingNotification> {
        std::mem::take(&mut self.pending)
    }
}
