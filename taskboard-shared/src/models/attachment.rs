/// Attachment model
///
/// Attachments point at files stored on the external media host; only the
/// public URL is kept by the backend.

use serde::{Deserialize, Serialize};

/// File attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: i64,

    #[serde(rename = "fileURL")]
    pub file_url: String,

    pub file_name: String,

    pub task_id: i64,

    #[serde(alias = "uploadById")]
    pub uploaded_by_id: i64,
}

/// Body of `POST tasks/attachment`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttachment {
    #[serde(rename = "fileURL")]
    pub file_url: String,
    pub task_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}
