use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crop {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub name: String,

    #[serde(default = "default_crop_type")]
    pub crop_type: String,
}

fn default_crop_type() -> String {
    "Grain".to_string()
}

impl Crop {
    pub fn new(name: &str) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.to_string(),
            crop_type: default_crop_type(),
        }
    }
}
