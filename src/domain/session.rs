use serde::Serialize;

use crate::domain::changes::FieldChange;
use crate::domain::value_objects::FieldErrors;

/// Lifecycle of an edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Closed,
    /// Open, working copy equal to the snapshot.
    Clean,
    /// Open, working copy differs from the snapshot.
    Dirty,
    /// A save is in flight.
    Saving,
}

impl SessionState {
    pub fn is_open(self) -> bool {
        !matches!(self, SessionState::Closed)
    }
}

/// What the presentation layer needs to render an edit form.
///
/// Published on a watch channel by the controller so it stays observable
/// while a save is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub dirty: bool,
    pub can_save: bool,
}

impl SessionStatus {
    pub fn for_state(state: SessionState) -> Self {
        Self {
            state,
            dirty: matches!(state, SessionState::Dirty | SessionState::Saving),
            can_save: state == SessionState::Dirty,
        }
    }
}

/// Why a `save()` call did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    NotOpen,
    NotDirty,
}

/// The outcome of one `save()` call.
///
/// Using an enum forces every caller to handle the failed and invalid cases;
/// persistence errors never escape the controller any other way.
#[derive(Debug, Clone)]
pub enum SaveOutcome<E> {
    /// The server accepted the change. The session is closed.
    ///
    /// `external_changes` lists fields the server returned with values that
    /// neither the pre-save entity nor this session's edits had, i.e. changes
    /// made elsewhere that this save raced with.
    Saved {
        entity: E,
        external_changes: Vec<FieldChange>,
    },

    /// Nothing happened: the session is closed or has no change.
    Rejected(Rejection),

    /// The validator refused the working copy. Nothing was sent.
    Invalid(FieldErrors),

    /// The server call failed. The entity view was rolled back and the
    /// working copy is kept for a retry.
    Failed { message: String },

    /// The session was cancelled while the save was in flight.
    Cancelled,
}

impl<E> SaveOutcome<E> {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }

    /// The saved entity, if any.
    pub fn entity(&self) -> Option<&E> {
        match self {
            SaveOutcome::Saved { entity, .. } => Some(entity),
            _ => None,
        }
    }

    /// Field errors of an invalid save (empty otherwise).
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            SaveOutcome::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}
