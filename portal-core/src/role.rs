use serde::{Deserialize, Serialize};
use std::fmt;

/// Roles that can hold a gated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Beneficiary,
    Police,
    Collector,
    Central,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Beneficiary,
        Role::Police,
        Role::Collector,
        Role::Central,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Beneficiary => "beneficiary",
            Role::Police => "police",
            Role::Collector => "collector",
            Role::Central => "central",
        }
    }

    /// Key under which this role's session record is persisted.
    pub fn storage_key(&self) -> String {
        format!("auth_{}", self.as_str())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Beneficiary => "Beneficiary",
            Role::Police => "Police Officer",
            Role::Collector => "District Collector",
            Role::Central => "Central/State Officer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
