use serde::{Deserialize, Serialize};

/// Who authored a seeded record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
}

impl Creator {
    pub const SYSTEM_SEED_NAME: &'static str = "System Seed";
    pub const SYSTEM_SEED_EMAIL: &'static str = "seed@system.local";

    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Attribution used for records created by the batch seeder.
    pub fn system_seed() -> Self {
        Self::new(Self::SYSTEM_SEED_NAME, Self::SYSTEM_SEED_EMAIL)
    }
}

impl Default for Creator {
    fn default() -> Self {
        Self::system_seed()
    }
}
