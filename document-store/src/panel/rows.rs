use crate::models::DocumentRecord;
use crate::store::format_file_size;

const PREVIEWABLE_TEXT: [&str; 3] = ["text/plain", "text/html", "text/csv"];

/// Types the panel can show inline.
pub fn is_previewable(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/pdf"
        || essence.starts_with("image/")
        || PREVIEWABLE_TEXT.contains(&essence.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    View,
    Download,
    Delete,
}

/// One grid line, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
    pub id: String,
    pub file_name: String,
    pub size: String,
    pub mime_type: String,
    pub uploaded_at: String,
    pub description: String,
    pub actions: Vec<RowAction>,
}

impl From<&DocumentRecord> for DocumentRow {
    fn from(record: &DocumentRecord) -> Self {
        let mut actions = Vec::with_capacity(3);
        if is_previewable(&record.mime_type) {
            actions.push(RowAction::View);
        }
        actions.push(RowAction::Download);
        actions.push(RowAction::Delete);

        Self {
            id: record.id.clone(),
            file_name: record.file_name.clone(),
            size: format_file_size(record.file_size_bytes),
            mime_type: record.mime_type.clone(),
            uploaded_at: record.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
            description: record.description.clone().unwrap_or_default(),
            actions,
        }
    }
}
