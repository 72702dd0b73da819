use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role carried in the session token. Roles this service does not
/// know about land on `Other` so they are refused like any non-member.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String")]
pub enum Role {
    Member,
    Trainer,
    Admin,
    Other,
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "member" => Role::Member,
            "trainer" => Role::Trainer,
            "admin" => Role::Admin,
            _ => Role::Other,
        }
    }
}

/// JWT payload issued by the session service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // member ID
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
    pub role: Role,
}
