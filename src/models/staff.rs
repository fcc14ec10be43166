use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMemberRow {
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub role_title: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub on_duty: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}
