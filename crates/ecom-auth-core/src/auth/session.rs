use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::AccessCredentials;

pub const STORE_ID: &str = "store_id";
pub const MY_ID: &str = "my_id";
pub const ACCESS_TOKEN: &str = "access_token";
pub const EXPIRES: &str = "expires";
pub const USERNAME: &str = "username";
pub const LANG: &str = "lang";

/// Keys dropped on logout; store id and language survive
pub(crate) const LOGIN_KEYS: [&str; 3] = [MY_ID, ACCESS_TOKEN, EXPIRES];

/// JavaScript-style truthiness of a JSON value.
/// `null`, `false`, zero and the empty string are falsy; arrays and objects never are.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Authentication session: a free-form string to JSON mapping.
///
/// The remote decides the shape, so the session keeps everything it is given
/// and exposes typed accessors for the keys this crate relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session(Map<String, Value>);

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_store(store_id: u32) -> Self {
        let mut session = Self::new();
        session.insert(STORE_ID, Value::from(store_id));
        session
    }

    /// Build a session from any JSON value; anything but an object yields an
    /// empty session.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Overwrite keys whose incoming value is truthy, ignoring the rest.
    /// Returns the keys that were written.
    pub fn merge_truthy(&mut self, update: Session) -> Vec<String> {
        let mut written = Vec::new();
        for (key, value) in update.0 {
            if is_truthy(&value) {
                written.push(key.clone());
                self.0.insert(key, value);
            }
        }
        written
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub(crate) fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// Store id as a number; whole floats and numeric strings are accepted too
    pub fn store_id(&self) -> Option<u32> {
        match self.0.get(STORE_ID)? {
            Value::Number(n) => match n.as_u64() {
                Some(id) => u32::try_from(id).ok(),
                None => n
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                    .map(|f| f as u32),
            },
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn authentication_id(&self) -> Option<&str> {
        self.non_empty_str(MY_ID)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.non_empty_str(ACCESS_TOKEN)
    }

    pub fn username(&self) -> Option<&str> {
        self.non_empty_str(USERNAME)
    }

    pub fn lang(&self) -> Option<&str> {
        self.non_empty_str(LANG)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.non_empty_str(EXPIRES)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Whether the access token expiry has passed. Missing or unparseable
    /// expiry counts as not expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at().map(|at| Utc::now() > at).unwrap_or(false)
    }

    /// Logged in iff an authentication id is present
    pub fn is_logged_in(&self) -> bool {
        self.authentication_id().is_some()
    }

    pub fn credentials(&self) -> Option<AccessCredentials> {
        Some(AccessCredentials {
            my_id: self.authentication_id()?.to_string(),
            access_token: self.access_token()?.to_string(),
        })
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!("")));

        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(-1)));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn test_merge_overwrites_only_truthy_keys() {
        let mut session = Session::from_value(json!({
            "store_id": 1011,
            "my_id": "abc",
            "access_token": "tok",
            "username": "owner"
        }));

        let written = session.merge_truthy(Session::from_value(json!({
            "my_id": "def",
            "access_token": "",
            "username": null,
            "store_id": 0,
            "lang": "en_us"
        })));

        assert_eq!(written.len(), 2);
        assert!(written.contains(&"my_id".to_string()));
        assert!(written.contains(&"lang".to_string()));
        assert_eq!(session.authentication_id(), Some("def"));
        assert_eq!(session.access_token(), Some("tok"));
        assert_eq!(session.username(), Some("owner"));
        assert_eq!(session.store_id(), Some(1011));
        assert_eq!(session.lang(), Some("en_us"));
    }

    #[test]
    fn test_falsy_update_cannot_clear_fields() {
        let mut session = Session::from_value(json!({"my_id": "abc"}));
        session.merge_truthy(Session::from_value(json!({"my_id": false})));
        assert!(session.is_logged_in());
    }

    #[test]
    fn test_login_predicate() {
        assert!(!Session::new().is_logged_in());
        assert!(!Session::for_store(1011).is_logged_in());
        assert!(!Session::from_value(json!({"my_id": ""})).is_logged_in());
        assert!(!Session::from_value(json!({"my_id": 42})).is_logged_in());
        assert!(Session::from_value(json!({"my_id": "abc"})).is_logged_in());
    }

    #[test]
    fn test_non_object_value_is_empty_session() {
        assert_eq!(Session::from_value(json!("garbage")), Session::new());
        assert_eq!(Session::from_value(json!([1, 2])), Session::new());
    }

    #[test]
    fn test_store_id_accepts_numeric_strings() {
        assert_eq!(Session::from_value(json!({"store_id": "1024"})).store_id(), Some(1024));
        assert_eq!(Session::from_value(json!({"store_id": "x"})).store_id(), None);
        assert_eq!(Session::from_value(json!({"store_id": -5})).store_id(), None);
    }

    #[test]
    fn test_store_id_accepts_whole_floats() {
        assert_eq!(Session::from_value(json!({"store_id": 150.0})).store_id(), Some(150));
        assert_eq!(Session::from_value(json!({"store_id": 150.5})).store_id(), None);
        assert_eq!(Session::from_value(json!({"store_id": -2.0})).store_id(), None);
        assert_eq!(Session::from_value(json!({"store_id": 1e12})).store_id(), None);
    }

    #[test]
    fn test_expiry() {
        let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
        let future = (Utc::now() + Duration::hours(1)).to_rfc3339();

        assert!(Session::from_value(json!({"expires": past})).is_expired());
        assert!(!Session::from_value(json!({"expires": future})).is_expired());
        assert!(!Session::from_value(json!({"expires": "soon"})).is_expired());
        assert!(!Session::new().is_expired());
    }

    #[test]
    fn test_credentials_need_id_and_token() {
        assert!(Session::from_value(json!({"my_id": "abc"})).credentials().is_none());
        let creds = Session::from_value(json!({"my_id": "abc", "access_token": "tok"}))
            .credentials()
            .unwrap();
        assert_eq!(creds.my_id, "abc");
        assert_eq!(creds.access_token, "tok");
    }
}
