use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreInfo {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub store_id: Option<u32>,
    pub name: Option<String>,
    pub domain: Option<String>,
    pub lang: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoreInfo {
    pub fn display_name(&self) -> String {
        match (&self.name, self.store_id) {
            (Some(name), Some(id)) => format!("{} (#{})", name, id),
            (Some(name), None) => name.clone(),
            (None, Some(id)) => format!("Store #{}", id),
            (None, None) => "Unknown store".to_string(),
        }
    }
}
