use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::dto::request::CreateUserRequest;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub user_name: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(user_name: &str, email: &str) -> Self {
        User {
            id: Uuid::new_v4().to_string(),
            user_name: user_name.to_string(),
            email: email.to_string(),
            first_name: None,
            last_name: None,
            profile_picture: None,
            created_at: Some(Utc::now()),
        }
    }

    pub fn from_request(request: CreateUserRequest) -> Self {
        User {
            first_name: request.first_name,
            last_name: request.last_name,
            ..User::new(&request.user_name, &request.email)
        }
    }
}
