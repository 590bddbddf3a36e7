use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::changes::{diff_fields, FieldChange};
use crate::domain::entity::{Entity, EntityView};
use crate::domain::error::EditError;
use crate::domain::field_group::FieldGroup;
use crate::domain::fingerprint::fingerprint;
use crate::domain::ports::{EntityRepository, Notifier, Validator};
use crate::domain::session::{Rejection, SaveOutcome, SessionState, SessionStatus};
use crate::domain::value_objects::{FieldErrors, Fingerprint};

// ─────────────────────────────────────────────────────────────────────────────
// EditSessionController
// ─────────────────────────────────────────────────────────────────────────────

/// Owns one "edit a field group" interaction over a shared entity view.
///
/// # Lifecycle
/// `open` captures a snapshot and a working copy of the group. `edit` mutates
/// the working copy and recomputes the dirty flag by comparing fingerprints.
/// `save` validates, applies the working copy to the view, calls the
/// repository and then either adopts the server's entity (closing the
/// session) or rolls the view back (keeping the session open for a retry).
/// `cancel` closes without touching the view.
///
/// One controller per field group. Controllers for different groups may share
/// one [`EntityView`]; their saves race at the server (last writer wins) and
/// are reported through `SaveOutcome::Saved::external_changes`.
pub struct EditSessionController<G: FieldGroup> {
    view: EntityView<G::Entity>,
    repo: Arc<dyn EntityRepository<G::Entity>>,
    notifier: Arc<dyn Notifier>,
    validator: Option<Arc<dyn Validator<G>>>,
    session: Option<Session<G>>,
    status: watch::Sender<SessionStatus>,
}

struct Session<G> {
    snapshot: G,
    snapshot_fp: Fingerprint,
    working: G,
    dirty: bool,
    errors: FieldErrors,
    cancel: CancellationToken,
}

impl<G: FieldGroup> EditSessionController<G> {
    pub fn new(
        view: EntityView<G::Entity>,
        repo: Arc<dyn EntityRepository<G::Entity>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (status, _) = watch::channel(SessionStatus::default());
        Self {
            view,
            repo,
            notifier,
            validator: None,
            session: None,
            status,
        }
    }

    /// Run `validator` over the working copy before every save.
    pub fn with_validator(mut self, validator: impl Validator<G> + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    // ─── Observation ─────────────────────────────────────────────────────────

    /// Subscribe to status changes, including `Saving` while a save runs.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Current status. A session whose cancel handle has fired reports
    /// `Closed` straight away; subscribers see it on the next call that
    /// touches the session.
    pub fn status(&self) -> SessionStatus {
        if self.handle_fired() {
            return SessionStatus::for_state(SessionState::Closed);
        }
        *self.status.borrow()
    }

    pub fn state(&self) -> SessionState {
        self.status().state
    }

    pub fn is_dirty(&self) -> bool {
        !self.handle_fired() && self.session.as_ref().is_some_and(|s| s.dirty)
    }

    /// Save-button enablement: open, dirty and not saving.
    pub fn can_save(&self) -> bool {
        self.status().can_save
    }

    pub fn view(&self) -> &EntityView<G::Entity> {
        &self.view
    }

    pub fn working(&self) -> Option<&G> {
        self.session.as_ref().map(|s| &s.working)
    }

    pub fn snapshot(&self) -> Option<&G> {
        self.session.as_ref().map(|s| &s.snapshot)
    }

    /// Field-level messages from the last rejected save.
    pub fn errors(&self) -> Option<&FieldErrors> {
        self.session.as_ref().map(|s| &s.errors)
    }

    /// Fields of the working copy that differ from the snapshot.
    pub fn changes(&self) -> Vec<FieldChange> {
        self.session
            .as_ref()
            .map(|s| diff_fields(&s.snapshot, &s.working))
            .unwrap_or_default()
    }

    /// Token that closes the open session and aborts a save in flight.
    pub fn cancel_handle(&self) -> Option<CancellationToken> {
        self.session.as_ref().map(|s| s.cancel.clone())
    }

    // ─── Transitions ─────────────────────────────────────────────────────────

    /// Closed → Clean. Captures the group from the current entity view.
    pub fn open(&mut self) -> Result<(), EditError> {
        self.close_if_cancelled();
        if self.session.is_some() {
            return Err(EditError::AlreadyOpen);
        }

        let snapshot = G::extract(&self.view.get());
        let snapshot_fp = fingerprint(&snapshot);
        debug!(group = G::NAME, fingerprint = %snapshot_fp, "edit session opened");

        self.session = Some(Session {
            working: snapshot.clone(),
            snapshot,
            snapshot_fp,
            dirty: false,
            errors: FieldErrors::new(),
            cancel: CancellationToken::new(),
        });
        self.publish(SessionState::Clean);
        Ok(())
    }

    /// Set one top-level field of the working copy.
    ///
    /// `value` must deserialise into the field's type; the working copy is
    /// left unchanged otherwise.
    pub fn edit(&mut self, field: &str, value: Value) -> Result<(), EditError> {
        self.close_if_cancelled();
        let session = self.session.as_mut().ok_or(EditError::NotOpen)?;

        let mut fields = match serde_json::to_value(&session.working) {
            Ok(Value::Object(fields)) => fields,
            _ => {
                return Err(EditError::UnknownField {
                    group: G::NAME,
                    field: field.to_string(),
                })
            }
        };
        if !fields.contains_key(field) {
            return Err(EditError::UnknownField {
                group: G::NAME,
                field: field.to_string(),
            });
        }
        fields.insert(field.to_string(), value);

        let working: G =
            serde_json::from_value(Value::Object(fields)).map_err(|e| EditError::InvalidValue {
                field: field.to_string(),
                reason: e.to_string(),
            })?;

        session.working = working;
        session.errors.remove(field);
        debug!(group = G::NAME, field, "field edited");
        self.refresh_dirty();
        Ok(())
    }

    /// Typed counterpart of [`edit`](Self::edit).
    ///
    /// Clears the field errors of every top-level field the closure changed.
    pub fn edit_with(&mut self, f: impl FnOnce(&mut G)) -> Result<(), EditError> {
        self.close_if_cancelled();
        let session = self.session.as_mut().ok_or(EditError::NotOpen)?;
        let before = session.working.clone();
        f(&mut session.working);
        for change in diff_fields(&before, &session.working) {
            session.errors.remove(&change.field);
        }
        self.refresh_dirty();
        Ok(())
    }

    /// Open/Dirty → Saving → Closed (success) or Open/Dirty (failure).
    ///
    /// Exactly one repository call and one notification for every save that
    /// gets past validation and completes. Rejected and invalid saves never
    /// reach the repository.
    #[instrument(name = "save", skip(self), fields(group = G::NAME), level = "info")]
    pub async fn save(&mut self) -> SaveOutcome<G::Entity> {
        self.close_if_cancelled();
        let Some(session) = self.session.as_mut() else {
            debug!("save ignored: session closed");
            return SaveOutcome::Rejected(Rejection::NotOpen);
        };
        if !session.dirty {
            debug!("save ignored: nothing changed");
            return SaveOutcome::Rejected(Rejection::NotDirty);
        }

        if let Some(validator) = &self.validator {
            let errors = validator.validate(&session.working);
            if !errors.is_empty() {
                debug!(errors = errors.len(), "save blocked by validation");
                session.errors = errors.clone();
                return SaveOutcome::Invalid(errors);
            }
        }
        session.errors = FieldErrors::new();

        let working = session.working.clone();
        let cancel = session.cancel.clone();
        let partial = working.to_partial();

        // Optimistic apply.
        let (id, previous, optimistic) = self.view.update(|entity| {
            let previous = entity.clone();
            working.apply(entity);
            (entity.id().clone(), previous, entity.clone())
        });
        self.publish(SessionState::Saving);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.repo.update(&id, &partial, &cancel) => Some(result),
        };

        match result {
            Some(Ok(entity)) => {
                let external_changes = external_changes(&previous, &optimistic, &entity);
                if !external_changes.is_empty() {
                    warn!(
                        entity.id = %id,
                        fields = ?external_changes.iter().map(|c| c.field.as_str()).collect::<Vec<_>>(),
                        "server returned changes made outside this session"
                    );
                }

                self.view.replace(entity.clone());
                self.session = None;
                self.publish(SessionState::Closed);

                info!(entity.id = %id, "{} saved", G::LABEL);
                self.notifier.notify_success(&success_message(G::LABEL));

                SaveOutcome::Saved {
                    entity,
                    external_changes,
                }
            }
            Some(Err(err)) if !cancel.is_cancelled() => {
                self.rollback(&previous);
                self.publish(SessionState::Dirty);

                error!(entity.id = %id, error = %format!("{err:#}"), "failed to update {}", G::LABEL);
                let message = failure_message(G::LABEL);
                self.notifier.notify_error(&message);

                SaveOutcome::Failed { message }
            }
            _ => {
                self.rollback(&previous);
                self.session = None;
                self.publish(SessionState::Closed);

                info!(entity.id = %id, "save cancelled");
                SaveOutcome::Cancelled
            }
        }
    }

    /// Open → Closed without saving. Also cancels a save in flight that was
    /// started through another handle.
    pub fn cancel(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
            debug!(group = G::NAME, "edit session cancelled");
            self.publish(SessionState::Closed);
        }
    }

    // ─── Private helpers ─────────────────────────────────────────────────────

    fn handle_fired(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.cancel.is_cancelled())
    }

    /// A fired cancel handle closes the session, same as [`cancel`](Self::cancel).
    fn close_if_cancelled(&mut self) {
        if self.handle_fired() {
            self.session = None;
            debug!(group = G::NAME, "edit session closed by its cancel handle");
            self.publish(SessionState::Closed);
        }
    }

    fn refresh_dirty(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.dirty = fingerprint(&session.working) != session.snapshot_fp;
        let state = if session.dirty {
            SessionState::Dirty
        } else {
            SessionState::Clean
        };
        self.publish(state);
    }

    /// Put this group's pre-save values back. Other groups' fields are left as
    /// they are now, so a concurrent save by a sibling controller survives.
    fn rollback(&self, previous: &G::Entity) {
        let original = G::extract(previous);
        self.view.update(|entity| original.apply(entity));
    }

    fn publish(&self, state: SessionState) {
        self.status.send_replace(SessionStatus::for_state(state));
    }
}

/// Fields where the server's answer matches neither what we had before the
/// save nor what we sent.
fn external_changes<E: Entity>(previous: &E, optimistic: &E, server: &E) -> Vec<FieldChange> {
    let before = diff_fields(previous, server);
    diff_fields(optimistic, server)
        .into_iter()
        .filter(|change| !E::VOLATILE_FIELDS.contains(&change.field.as_str()))
        .filter(|change| before.iter().any(|b| b.field == change.field))
        .collect()
}

fn success_message(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => format!("{}{} updated successfully", first.to_uppercase(), chars.as_str()),
        None => "Updated successfully".to_string(),
    }
}

fn failure_message(label: &str) -> String {
    format!("Failed to update {label}")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
