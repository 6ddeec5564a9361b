use crate::models::DocumentRecord;

/// Filter for listing a scope's documents, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    pub scope_key: String,
    pub owner_id: Option<String>,
}

impl DocumentQuery {
    pub fn new(scope_key: impl Into<String>, owner_id: Option<String>) -> Self {
        Self {
            scope_key: scope_key.into(),
            owner_id,
        }
    }

    /// Query string pairs in the REST gateway's filter syntax.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("select", "*".to_string()),
            ("symbol_root", format!("eq.{}", self.scope_key)),
        ];
        if let Some(owner_id) = &self.owner_id {
            pairs.push(("user_id", format!("eq.{}", owner_id)));
        }
        pairs.push(("order", "uploaded_at.desc".to_string()));
        pairs
    }

    pub fn matches(&self, record: &DocumentRecord) -> bool {
        record.scope_key == self.scope_key
            && self
                .owner_id
                .as_ref()
                .is_none_or(|owner| &record.owner_id == owner)
    }
}
