use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationInfo {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    /// Snake case language code, e.g. `pt_br`
    pub locale: Option<String>,
    #[serde(default)]
    pub permissions: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthenticationInfo {
    /// Locale, if the remote returned a non-empty one
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref().filter(|l| !l.is_empty())
    }

    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .or(self.username.as_deref())
            .or(self.email.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.id)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authentication() {
        let json = r#"{"_id":"5d7a01b2c3","username":"lojista","email":"owner@example.com","locale":"en_us","permissions":{"orders":["GET"]},"store_id":1011}"#;
        let auth: AuthenticationInfo = serde_json::from_str(json).unwrap();

        assert_eq!(auth.id, "5d7a01b2c3");
        assert_eq!(auth.locale(), Some("en_us"));
        assert_eq!(auth.display_name(), "lojista");
        assert!(auth.permissions.contains_key("orders"));
        assert_eq!(auth.extra.get("store_id"), Some(&Value::from(1011)));
    }

    #[test]
    fn test_empty_locale_is_absent() {
        let auth: AuthenticationInfo = serde_json::from_str(r#"{"_id":"a","locale":""}"#).unwrap();
        assert_eq!(auth.locale(), None);
        assert_eq!(auth.display_name(), "a");
    }
}
