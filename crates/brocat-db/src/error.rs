use thiserror::Error;

/// A write was refused by a UNIQUE, CHECK, NOT NULL or FOREIGN KEY constraint.
///
/// Returned inside `anyhow::Error`; callers recover it with `downcast_ref`.
#[derive(Debug, Error)]
#[error("Constraint violation: {0}")]
pub struct ConstraintViolation(pub String);

/// Lift SQLite constraint failures into [`ConstraintViolation`], pass the rest through.
pub(crate) fn classify(err: rusqlite::Error) -> anyhow::Error {
    if err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
        let detail = match &err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.clone(),
            other => other.to_string(),
        };
        ConstraintViolation(detail).into()
    } else {
        err.into()
    }
}
