use std::fmt;

use serde::{Deserialize, Serialize};

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EVENT_LOGGER: &str = "eventLogger";

pub const KNOWN_ROLES: &[&str] = &[ROLE_USER, ROLE_ADMIN, ROLE_EVENT_LOGGER];

/// Flat role set; no role implies another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Admin,
    EventLogger,
    Unknown(String),
}

impl Role {
    pub fn parse(s: &str) -> Self {
        match s {
            ROLE_USER => Role::User,
            ROLE_ADMIN => Role::Admin,
            ROLE_EVENT_LOGGER => Role::EventLogger,
            other => Role::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::User => ROLE_USER,
            Role::Admin => ROLE_ADMIN,
            Role::EventLogger => ROLE_EVENT_LOGGER,
            Role::Unknown(other) => other,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Role::Unknown(_))
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_sensitive() {
        assert_eq!(Role::parse("eventLogger"), Role::EventLogger);
        assert_eq!(
            Role::parse("eventlogger"),
            Role::Unknown("eventlogger".to_string())
        );
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&Role::EventLogger).expect("serialize");
        assert_eq!(json, "\"eventLogger\"");
        let back: Role = serde_json::from_str("\"admin\"").expect("deserialize");
        assert_eq!(back, Role::Admin);
    }
}
