use thiserror::Error;

/// Misuse of an edit session.
///
/// Save failures are not errors: they are reported through
/// [`crate::SaveOutcome`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("no edit session is open")]
    NotOpen,

    #[error("an edit session is already open")]
    AlreadyOpen,

    #[error("unknown field `{field}` in {group}")]
    UnknownField { group: &'static str, field: String },

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },
}
