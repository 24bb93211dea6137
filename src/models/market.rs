use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub name: String,
    pub region: String,
}

impl Market {
    pub fn new(name: &str, region: &str) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.to_string(),
            region: region.to_string(),
        }
    }
}
