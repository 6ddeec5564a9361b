use crate::models::DocumentRecord;

/// Transient status of the store's operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationState {
    /// Set while any fetch, upload or delete is in flight.
    pub is_loading: bool,
    pub last_error: Option<String>,
    /// Coarse progress: 0 when an upload starts, 50 once the file is stored,
    /// 100 when the metadata row exists.
    pub upload_progress_percent: u8,
}

/// Everything a subscriber renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub documents: Vec<DocumentRecord>,
    pub state: OperationState,
}

/// What to do with a stored blob whose metadata insert failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsistencyPolicy {
    /// Leave the blob in place; the error reports its path.
    #[default]
    LeaveOrphans,
    /// Try once to delete the blob before reporting the insert failure.
    Compensate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Run fetch, upload and delete one at a time, in call order.
    pub serialize_operations: bool,
    pub consistency: ConsistencyPolicy,
}

impl StoreOptions {
    pub fn serialized() -> Self {
        Self {
            serialize_operations: true,
            ..Default::default()
        }
    }
}
