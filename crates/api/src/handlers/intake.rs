use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Html;
use intake_core::error::CoreError;
use intake_core::upload::{UploadForm, UploadRejection};

use crate::error::{AppError, AppResult};
use crate::pages;
use crate::pipeline;
use crate::state::AppState;

/// GET /
pub async fn upload_form() -> Html<String> {
    Html(pages::upload_form())
}

/// POST /upload
///
/// Accept the document form, run the intake pipeline and render the
/// results page. A body that is not `multipart/form-data` has no file
/// parts and gets the same error page as a form missing its files.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Html<String>> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Upload body is not multipart");
            return Err(CoreError::from(UploadRejection::NoFilePart).into());
        }
    };
    let form = read_form(&mut multipart).await?;
    let outcome = pipeline::run_intake(&state, form).await?;
    Ok(Html(pages::results_page(&outcome)))
}

/// Collect the multipart parts into an [`UploadForm`].
///
/// Parts with a filename are files; other parts are text fields. Unknown
/// field names are ignored.
async fn read_form(multipart: &mut Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let data = field.bytes().await.map_err(multipart_error)?;
                if !form.insert_file(&name, &filename, data.to_vec()) {
                    tracing::debug!(field = %name, "Ignoring unexpected file part");
                }
            }
            None => {
                let value = field.text().await.map_err(multipart_error)?;
                if !form.insert_text(&name, value) {
                    tracing::debug!(field = %name, "Ignoring unexpected form field");
                }
            }
        }
    }

    Ok(form)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("The uploaded files are too large".to_string())
    } else {
        AppError::BadRequest(err.body_text())
    }
}
