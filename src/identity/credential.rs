use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tokens shorter than this are rejected by the local guard without asking the server.
pub const MIN_TOKEN_LEN: usize = 10;

/// Permission class gating dashboard content and API access.
/// Unknown server values are kept verbatim so a new role never breaks parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Employee,
    Renter,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
            Role::Renter => "renter",
            Role::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        let t = s.trim();
        match t.to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "employee" => Role::Employee,
            "renter" => Role::Renter,
            _ => Role::Other(t.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self { Role::from(s.as_str()) }
}

impl From<Role> for String {
    fn from(r: Role) -> Self { r.as_str().to_string() }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// The persisted session record. Serialized field names match the three
/// storage slots (`authToken`, `userRole`, `userInfo`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "authToken")]
    pub token: String,
    #[serde(rename = "userRole", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "userInfo", default)]
    pub profile: Value,
}

impl Credential {
    pub fn new<S: Into<String>>(token: S, role: Option<Role>, profile: Value) -> Self {
        Self { token: token.into(), role, profile }
    }

    /// Cheap local check: non-empty and at least `MIN_TOKEN_LEN` characters.
    pub fn has_plausible_token(&self) -> bool {
        !self.token.trim().is_empty() && self.token.chars().count() >= MIN_TOKEN_LEN
    }

    /// Full replacement record carrying a new role. The profile is replaced
    /// only when one is supplied.
    pub fn with_role(&self, role: Role, profile: Option<Value>) -> Credential {
        Credential {
            token: self.token.clone(),
            role: Some(role),
            profile: profile.unwrap_or_else(|| self.profile.clone()),
        }
    }

    /// Role field of a profile payload, if present and non-empty.
    pub fn role_of(profile: &Value) -> Option<Role> {
        profile
            .get("role")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(Role::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_parsing_keeps_unknown_values() {
        assert_eq!(Role::from("Admin"), Role::Admin);
        assert_eq!(Role::from(" renter "), Role::Renter);
        assert_eq!(Role::from("auditor"), Role::Other("auditor".into()));
        assert_eq!(Role::Other("auditor".into()).to_string(), "auditor");
    }

    #[test]
    fn persisted_layout_uses_slot_names() {
        let c = Credential::new("abc123xyz9", Some(Role::Employee), json!({"role": "employee"}));
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v, json!({"authToken": "abc123xyz9", "userRole": "employee", "userInfo": {"role": "employee"}}));
        let back: Credential = serde_json::from_value(v).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn missing_role_and_profile_default() {
        let c: Credential = serde_json::from_value(json!({"authToken": "abc123xyz9"})).unwrap();
        assert_eq!(c.role, None);
        assert_eq!(c.profile, Value::Null);
    }

    #[test]
    fn token_plausibility() {
        assert!(!Credential::new("ab", None, Value::Null).has_plausible_token());
        assert!(!Credential::new("          ", None, Value::Null).has_plausible_token());
        assert!(Credential::new("abc123xyz9", None, Value::Null).has_plausible_token());
    }

    #[test]
    fn with_role_is_a_full_record() {
        let c = Credential::new("abc123xyz9", Some(Role::Renter), json!({"name": "a"}));
        let kept = c.with_role(Role::Admin, None);
        assert_eq!(kept.token, "abc123xyz9");
        assert_eq!(kept.profile, json!({"name": "a"}));
        let replaced = c.with_role(Role::Admin, Some(json!({"role": "admin"})));
        assert_eq!(replaced.profile, json!({"role": "admin"}));
        assert_eq!(Credential::role_of(&replaced.profile), Some(Role::Admin));
        assert_eq!(Credential::role_of(&json!({"role": ""})), None);
    }
}
