use crate::models::FileUpload;

/// Form state behind the upload modal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadDialog {
    pub open: bool,
    pub file: Option<FileUpload>,
    pub description: String,
    pub submitting: bool,
    pub error: Option<String>,
}

impl UploadDialog {
    pub fn can_submit(&self) -> bool {
        self.open && self.file.is_some() && !self.submitting
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Pending confirmation for a row's delete action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteDialog {
    pub pending_id: Option<String>,
}
