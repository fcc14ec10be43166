use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role attached to a console user. Comparisons are plain string/enum
/// checks used to hide UI affordances; nothing here is a trust boundary —
/// the hosted backend applies its own row-level rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Coordinator,
}

/// Sections of the admin console that can be gated per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Dashboard,
    Bookings,
    Clients,
    Careers,
    Inventory,
    Staff,
    Gallery,
    Notifications,
}

impl Role {
    pub fn can_manage(&self, section: Section) -> bool {
        match self {
            Role::Admin => true,
            Role::Coordinator => matches!(
                section,
                Section::Dashboard | Section::Bookings | Section::Clients | Section::Gallery
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsoleUser {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    #[serde(skip_serializing)]
    password: String,
}

// Mocked directory: exactly two console users until real auth arrives.
static DIRECTORY: Lazy<Vec<ConsoleUser>> = Lazy::new(|| {
    vec![
        ConsoleUser {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            display_name: "Operations Admin".to_string(),
            role: Role::Admin,
            password: "admin2024".to_string(),
        },
        ConsoleUser {
            id: Uuid::new_v4(),
            username: "coordinator".to_string(),
            display_name: "Protocol Coordinator".to_string(),
            role: Role::Coordinator,
            password: "protocol2024".to_string(),
        },
    ]
});

pub fn authenticate(username: &str, password: &str) -> Option<&'static ConsoleUser> {
    DIRECTORY
        .iter()
        .find(|u| u.username == username && u.password == password)
}
