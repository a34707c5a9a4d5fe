use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Group {
    pub id: String,
    pub title: String,
    pub owner_id: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Group {
    pub fn new(title: &str, owner_id: &str) -> Self {
        Group {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            owner_id: owner_id.to_string(),
            member_ids: Vec::new(),
            created_at: Some(Utc::now()),
        }
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|id| id == user_id)
    }
}
