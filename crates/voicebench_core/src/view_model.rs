use crate::{EntityId, EntityKind, LoadState, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListViewModel {
    pub kind: EntityKind,
    pub load: LoadState,
    pub rows: Vec<RowView>,
    pub validation_error: Option<ValidationError>,
    pub creating: bool,
    pub polling: usize,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: EntityId,
    pub label: String,
    pub status: &'static str,
    pub is_active: bool,
    /// Controls on the row are disabled.
    pub busy: bool,
    pub deleting: bool,
    pub polling: bool,
}
