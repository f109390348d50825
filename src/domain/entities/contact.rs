use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub account_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub blocked: bool,
}

impl Contact {
    pub fn new(id: &str, account_id: &str) -> Self {
        Self {
            id: id.to_string(),
            account_id: account_id.to_string(),
            name: None,
            email: None,
            blocked: false,
        }
    }

    pub fn has_email(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.trim().is_empty())
    }
}
