use sqlx::FromRow;
use time::OffsetDateTime;

use super::dto::PublicUser;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,                    // auto-assigned user ID
    pub username: String,           // unique login name
    pub email: String,              // unique email
    pub password_hash: String,      // Argon2 PHC string, never exposed
    pub created_at: OffsetDateTime, // creation timestamp
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
        }
    }
}
