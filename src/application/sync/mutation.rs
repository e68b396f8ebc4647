use std::collections::HashMap;
use std::fmt;

use crate::domain::AccountId;

/// The user-facing control that initiated a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    OpenAccount,
    CloseAccount(AccountId),
    RecordTransaction(AccountId),
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::OpenAccount => write!(f, "Opening an account"),
            Control::CloseAccount(id) => write!(f, "Closing account {}", id),
            Control::RecordTransaction(id) => write!(f, "A transaction on account {}", id),
        }
    }
}

/// Lifecycle of one mutation:
/// `Idle -> Submitting -> Succeeded -> Refreshing -> Idle`, or
/// `Idle -> Submitting -> Failed -> Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MutationPhase {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Refreshing,
    Failed,
}

impl MutationPhase {
    pub fn can_advance_to(self, next: MutationPhase) -> bool {
        use MutationPhase::*;
        matches!(
            (self, next),
            (Idle, Submitting)
                | (Submitting, Succeeded)
                | (Submitting, Failed)
                | (Succeeded, Refreshing)
                | (Refreshing, Idle)
                | (Failed, Idle)
        )
    }

    /// The initiating control must stay disabled while this is true.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            MutationPhase::Submitting | MutationPhase::Succeeded | MutationPhase::Refreshing
        )
    }
}

/// Phase and last failure of every control that has submitted something.
#[derive(Debug, Default)]
pub struct MutationTracker {
    phases: HashMap<Control, MutationPhase>,
    last_errors: HashMap<Control, String>,
}

impl MutationTracker {
    pub fn phase(&self, control: Control) -> MutationPhase {
        self.phases.get(&control).copied().unwrap_or_default()
    }

    pub fn last_error(&self, control: Control) -> Option<&str> {
        self.last_errors.get(&control).map(String::as_str)
    }

    /// Move `control` to `next`. Returns false, leaving the phase untouched,
    /// when the transition is not part of the lifecycle.
    pub fn advance(&mut self, control: Control, next: MutationPhase) -> bool {
        let current = self.phase(control);
        if !current.can_advance_to(next) {
            tracing::warn!(%control, ?current, ?next, "ignored invalid mutation transition");
            return false;
        }
        tracing::debug!(%control, from = ?current, to = ?next, "mutation phase");

        if next == MutationPhase::Submitting {
            self.last_errors.remove(&control);
        }
        if next == MutationPhase::Idle {
            self.phases.remove(&control);
        } else {
            self.phases.insert(control, next);
        }
        true
    }

    pub fn fail(&mut self, control: Control, message: String) {
        if self.advance(control, MutationPhase::Failed) {
            self.last_errors.insert(control, message);
            self.advance(control, MutationPhase::Idle);
        }
    }

    /// Forget everything about `control`.
    pub fn clear(&mut self, control: Control) {
        self.phases.remove(&control);
        self.last_errors.remove(&control);
    }
}
