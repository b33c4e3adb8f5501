use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::department::DepartmentId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Staff,
    Manager,
    Director,
    Purchasing,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Staff => "STAFF",
            Self::Manager => "MANAGER",
            Self::Director => "DIRECTOR",
            Self::Purchasing => "PURCHASING",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(Self::Admin),
            "STAFF" => Some(Self::Staff),
            "MANAGER" => Some(Self::Manager),
            "DIRECTOR" => Some(Self::Director),
            "PURCHASING" => Some(Self::Purchasing),
            _ => None,
        }
    }

    pub fn is_admin_or_purchasing(&self) -> bool {
        matches!(self, Self::Admin | Self::Purchasing)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub role: UserRole,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub department_id: Option<DepartmentId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewUser {
    pub role: UserRole,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub department_id: Option<DepartmentId>,
}
