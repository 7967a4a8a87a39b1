//! Admin project photos: multipart upload and removal under
//! `/admin/projects/{id}/photos`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use shared::{
    domain::ProjectId,
    error::FieldError,
    protocol::{PhotoBatch, PhotoDeleteReceipt, PhotoUploadReceipt},
};
use tracing::info;

use crate::{
    error::{ClientError, ClientResult},
    submission::{SubmissionController, SubmissionTransport},
    transport::ApiHttp,
};

pub const PHOTO_FIELD: &str = "photos";
const FALLBACK_MIME: &str = "application/octet-stream";

pub type PhotoUploader = SubmissionController<PhotoUploadTransport>;

fn photos_path(project_id: ProjectId) -> String {
    format!("admin/projects/{project_id}/photos")
}

fn select_project_first() -> FieldError {
    FieldError::new("project_id", "Select a project first")
}

pub struct PhotoUploadTransport {
    http: ApiHttp,
}

impl PhotoUploadTransport {
    pub fn new(http: ApiHttp) -> Self {
        Self { http }
    }
}

fn build_form(batch: PhotoBatch) -> ClientResult<Form> {
    let mut form = Form::new();
    for file in batch.files {
        let mime = file.mime_type.as_deref().unwrap_or(FALLBACK_MIME);
        let part = Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(mime)
            .map_err(|e| ClientError::validation(vec![FieldError::new(PHOTO_FIELD, e.to_string())]))?;
        form = form.part(PHOTO_FIELD, part);
    }
    Ok(form)
}

#[async_trait]
impl SubmissionTransport for PhotoUploadTransport {
    type Payload = PhotoBatch;
    type Receipt = PhotoUploadReceipt;

    fn validate(&self, payload: &PhotoBatch) -> ClientResult<()> {
        let mut errors = Vec::new();
        if payload.project_id.0 <= 0 {
            errors.push(select_project_first());
        }
        if payload.files.is_empty() {
            errors.push(FieldError::new(PHOTO_FIELD, "Choose at least one photo"));
        }
        if payload.files.iter().any(|f| f.bytes.is_empty()) {
            errors.push(FieldError::new(PHOTO_FIELD, "Empty files cannot be uploaded"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ClientError::validation(errors))
        }
    }

    async fn submit(&self, payload: PhotoBatch) -> ClientResult<PhotoUploadReceipt> {
        let project_id = payload.project_id;
        let count = payload.files.len();
        let receipt: PhotoUploadReceipt = self
            .http
            .post_multipart(&photos_path(project_id), build_form(payload)?)
            .await?;
        info!(
            project_id = project_id.0,
            sent = count,
            uploaded = receipt.uploaded_urls.len(),
            total = receipt.total_images,
            "uploaded project photos"
        );
        Ok(receipt)
    }

    fn success_message(&self, receipt: &PhotoUploadReceipt) -> String {
        receipt.message.clone()
    }
}

/// Removes photos that were already uploaded to a project.
#[derive(Clone)]
pub struct ProjectPhotos {
    http: ApiHttp,
}

impl ProjectPhotos {
    pub fn new(http: ApiHttp) -> Self {
        Self { http }
    }

    /// `DELETE /admin/projects/{id}/photos?photo_url=...`
    pub async fn delete(&self, project_id: ProjectId, photo_url: &str) -> ClientResult<PhotoDeleteReceipt> {
        let mut errors = Vec::new();
        if project_id.0 <= 0 {
            errors.push(select_project_first());
        }
        if photo_url.trim().is_empty() {
            errors.push(FieldError::new("photo_url", "Photo URL is required"));
        }
        if !errors.is_empty() {
            return Err(ClientError::validation(errors));
        }

        let receipt: PhotoDeleteReceipt = self
            .http
            .delete_json(&photos_path(project_id), &[("photo_url", photo_url)])
            .await?;
        info!(
            project_id = project_id.0,
            remaining = receipt.remaining_images,
            "deleted project photo"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientSettings;
    use shared::protocol::PhotoFile;

    fn http() -> ApiHttp {
        ApiHttp::new(&ClientSettings::default()).expect("http")
    }

    fn transport() -> PhotoUploadTransport {
        PhotoUploadTransport::new(http())
    }

    fn photo(name: &str, bytes: &[u8]) -> PhotoFile {
        PhotoFile {
            filename: name.into(),
            mime_type: Some("image/jpeg".into()),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn batch_needs_a_project_and_files() {
        let err = transport().validate(&PhotoBatch::default()).expect_err("invalid");
        let fields: Vec<_> = err.field_errors().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["project_id", PHOTO_FIELD]);
    }

    #[test]
    fn empty_file_is_rejected() {
        let batch = PhotoBatch {
            project_id: ProjectId(3),
            files: vec![photo("a.jpg", b"jpeg"), photo("b.jpg", b"")],
        };
        let err = transport().validate(&batch).expect_err("invalid");
        assert_eq!(err.user_message(), "Empty files cannot be uploaded");
    }

    #[test]
    fn valid_batch_passes() {
        let batch = PhotoBatch {
            project_id: ProjectId(3),
            files: vec![photo("a.jpg", b"jpeg")],
        };
        assert!(transport().validate(&batch).is_ok());
        assert!(build_form(batch).is_ok());
    }

    #[tokio::test]
    async fn delete_needs_a_photo_url() {
        let err = ProjectPhotos::new(http())
            .delete(ProjectId(3), "  ")
            .await
            .expect_err("invalid");
        assert_eq!(err.user_message(), "Photo URL is required");
    }
}
