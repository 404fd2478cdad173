use crate::upload::UploadRejection;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Upload(#[from] UploadRejection),

    #[error("Internal error: {0}")]
    Internal(String),
}
