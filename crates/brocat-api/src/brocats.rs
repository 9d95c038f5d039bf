use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, warn};

use brocat_db::models::BrocatWithAuthor;
use brocat_types::models::BrocatView;

use crate::auth::AppState;
use crate::content::{BrocatDraft, create_brocat};
use crate::error::{ApiError, run_blocking};
use crate::middleware::{Claims, acting_user};
use crate::serialize::{brocat_view, brocat_views};
use crate::storage::Storage;
use crate::validation::{UploadForm, UploadedFile, validate_upload};

/// 20 MB upload limit for a thumbnail and an audio clip together
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub async fn list_brocats(State(state): State<AppState>) -> Result<Json<Vec<BrocatView>>, ApiError> {
    let rows = run_blocking(move || Ok(state.db.list_brocats()?)).await?;
    Ok(Json(brocat_views(&rows)))
}

pub async fn get_brocat(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BrocatView>, ApiError> {
    let row = run_blocking(move || state.db.get_brocat(id)?.ok_or(ApiError::NotFound)).await?;
    Ok(Json(brocat_view(&row)))
}

/// POST /brocats: multipart form with `title`, `thumbnail`, `audio` and
/// `description`. The author is the token's user; any other field is ignored.
pub async fn upload_brocat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let db_state = state.clone();
    let author = run_blocking(move || acting_user(&db_state.db, &claims)).await?;

    let form = read_upload_form(&mut multipart).await?;
    let extensions = validate_upload(&form, &state.uploads)?;

    let thumbnail = form.thumbnail.as_ref().map(|f| f.bytes.as_slice()).unwrap_or_default();
    let audio = form.audio.as_ref().map(|f| f.bytes.as_slice()).unwrap_or_default();

    let thumbnail_ref = state.storage.save(&extensions.thumbnail, thumbnail).await?;
    let audio_ref = match state.storage.save(&extensions.audio, audio).await {
        Ok(reference) => reference,
        Err(e) => {
            discard(&state.storage, &[thumbnail_ref.as_str()]).await;
            return Err(e.into());
        }
    };

    let draft = BrocatDraft {
        title: Some(form.title),
        thumbnail: thumbnail_ref.clone(),
        audio: audio_ref.clone(),
        description: Some(form.description),
    };

    let db_state = state.clone();
    let created = run_blocking(move || {
        let brocat = create_brocat(&db_state.db, draft, &author)?;
        Ok(BrocatWithAuthor {
            brocat,
            author: author.username,
        })
    })
    .await;

    let row = match created {
        Ok(row) => row,
        Err(e) => {
            discard(&state.storage, &[thumbnail_ref.as_str(), audio_ref.as_str()]).await;
            return Err(e);
        }
    };

    Ok((StatusCode::CREATED, Json(brocat_view(&row))))
}

async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, ApiError> {
    let bad_request = |e: axum::extract::multipart::MultipartError| ApiError::BadRequest(e.body_text());
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => form.title = field.text().await.map_err(bad_request)?,
            "description" => form.description = field.text().await.map_err(bad_request)?,
            "thumbnail" | "audio" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad_request)?.to_vec();
                let file = Some(UploadedFile { filename, bytes });
                if name == "thumbnail" {
                    form.thumbnail = file;
                } else {
                    form.audio = file;
                }
            }
            other => debug!("Ignoring upload field {:?}", other),
        }
    }

    Ok(form)
}

/// Remove files written for an upload that did not make it into the store.
async fn discard(storage: &Storage, references: &[&str]) {
    for reference in references {
        if let Err(e) = storage.delete(reference).await {
            warn!("Failed to remove orphaned upload {}: {}", reference, e);
        }
    }
}
