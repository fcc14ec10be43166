use serde::{Deserialize, Serialize};

/// One queued outbound e-mail. Delivery is owned by the hosted backend's
/// mailer; this crate only writes `queued` rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailNotificationRow {
    pub id: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}
