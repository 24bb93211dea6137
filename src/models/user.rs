use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    // E.164, e.g. +251911234567
    pub phone_number: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub is_admin: bool,
}

fn default_language() -> String {
    "en".to_string()
}

impl User {
    pub fn new(phone_number: &str) -> Self {
        Self {
            id: ObjectId::new(),
            phone_number: phone_number.to_string(),
            language: default_language(),
            is_admin: false,
        }
    }
}

/// The authenticated caller, injected into request extensions by the auth middleware.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub phone_number: String,
    pub is_admin: bool,
}

impl From<User> for CurrentUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            phone_number: u.phone_number,
            is_admin: u.is_admin,
        }
    }
}
