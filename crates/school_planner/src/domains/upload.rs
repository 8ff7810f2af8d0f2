//! Homework submission upload: presign, store, register, associate.

use school_api_client::{
    AssociationType, FileModel, FileModelParams, SchoolApiClient, SignedUrl, UploadUrlRequest,
};

use crate::error::{PlannerError, PlannerResult};

pub const FLAT_NAME_HEADER: &str = "x-amz-meta-flat-name";
pub const THUMBNAIL_HEADER: &str = "x-amz-meta-thumbnail";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Owner when the uploading user should not own the file.
    pub owner: Option<String>,
    /// Parent file object, e.g. a folder.
    pub parent: Option<String>,
    pub submission_id: String,
    pub association: AssociationType,
    /// Users that get read access to the file.
    pub team_members: Vec<String>,
}

impl SubmissionUpload {
    fn validate(&self) -> PlannerResult<()> {
        if self.filename.trim().is_empty() {
            return Err(PlannerError::Validation("filename must not be empty".into()));
        }
        if self.submission_id.trim().is_empty() {
            return Err(PlannerError::Validation(
                "submission id must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// File model parameters derived from the storage headers of the signed URL.
pub fn file_model_params(upload: &SubmissionUpload, signed: &SignedUrl) -> PlannerResult<FileModelParams> {
    let storage_file_name = signed
        .header
        .get(FLAT_NAME_HEADER)
        .cloned()
        .ok_or_else(|| {
            PlannerError::Validation(format!("signed url is missing {FLAT_NAME_HEADER}"))
        })?;
    Ok(FileModelParams {
        name: upload.filename.clone(),
        owner: upload.owner.clone(),
        content_type: upload.content_type.clone(),
        size: upload.bytes.len() as u64,
        storage_file_name,
        thumbnail: signed.header.get(THUMBNAIL_HEADER).cloned(),
        parent: upload.parent.clone(),
    })
}

pub async fn upload_submission_file(
    client: &dyn SchoolApiClient,
    upload: SubmissionUpload,
) -> PlannerResult<FileModel> {
    upload.validate()?;

    let signed = client
        .request_upload_url(&UploadUrlRequest {
            parent: upload.parent.clone(),
            content_type: upload.content_type.clone(),
            filename: upload.filename.clone(),
        })
        .await?;
    let params = file_model_params(&upload, &signed)?;

    client
        .upload_to_signed_url(&signed, &upload.content_type, upload.bytes)
        .await?;
    let file = client.create_file_model(&params).await?;

    client
        .associate_submission_file(
            &upload.submission_id,
            upload.association,
            &file.id,
            &upload.team_members,
        )
        .await?;
    client
        .grant_submission_file_permissions(&upload.submission_id, &file.id, &upload.team_members)
        .await?;

    metrics::counter!("planner_submission_uploads_total", "association" => upload.association.as_path())
        .increment(1);
    tracing::info!(
        submission_id = %upload.submission_id,
        file_id = %file.id,
        size = params.size,
        "submission file uploaded"
    );
    Ok(file)
}
