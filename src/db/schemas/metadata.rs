//! Common metadata for all documents

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Common metadata for all documents
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    /// When the document was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    /// When the document was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}
