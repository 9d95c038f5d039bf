use brocat_db::Database;
use brocat_db::models::{Brocat, NewBrocat, User};
use tracing::info;

use crate::error::ApiError;
use crate::validation::{TITLE_MAX_CHARS, ValidationError, ValidationKind};

const REFERENCE_MAX_CHARS: usize = 200;

/// Stored file references plus the text fields of an upload.
/// Carries no author: that always comes from the acting user.
#[derive(Debug, Clone, Default)]
pub struct BrocatDraft {
    pub title: Option<String>,
    pub thumbnail: String,
    pub audio: String,
    pub description: Option<String>,
}

/// Persist a brocat authored by `acting_user`.
pub fn create_brocat(db: &Database, draft: BrocatDraft, acting_user: &User) -> Result<Brocat, ApiError> {
    check_draft(&draft)?;

    let new_brocat = NewBrocat::new(
        draft.title,
        draft.thumbnail,
        draft.audio,
        draft.description.filter(|d| !d.is_empty()),
        acting_user,
    );
    let brocat = db.insert_brocat(&new_brocat)?;

    info!("User {} created brocat {}", acting_user.id, brocat.id);
    Ok(brocat)
}

fn check_draft(draft: &BrocatDraft) -> Result<(), ValidationError> {
    let mut errors = ValidationError::default();

    match draft.title.as_deref() {
        None | Some("") => errors.push("title", ValidationKind::MissingField, "The Brocat needs a title!"),
        Some(title) if title.chars().count() > TITLE_MAX_CHARS => {
            errors.push("title", ValidationKind::FormatError, "100 is the maximum characters for a title")
        }
        Some(_) => {}
    }

    for (field, reference) in [("thumbnail", &draft.thumbnail), ("audio", &draft.audio)] {
        if reference.is_empty() {
            errors.push(field, ValidationKind::MissingFile, format!("The {} file is required.", field));
        } else if reference.chars().count() > REFERENCE_MAX_CHARS {
            errors.push(field, ValidationKind::FormatError, "File reference is too long.");
        }
    }

    errors.into_result()
}
