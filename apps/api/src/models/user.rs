use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const BIO_MAX_LEN: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    /// Always stored lower-cased and trimmed.
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
    pub name: String,
    pub bio: String,
    pub linkedin_url: String,
    pub skills: Vec<String>,
    pub wallet_address: Option<String>,
    pub profile_image: Option<String>,
    pub is_verified: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile view without the email address.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
    pub bio: String,
    pub linkedin_url: String,
    pub skills: Vec<String>,
    pub wallet_address: Option<String>,
    pub profile_image: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, name: &str, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash,
            name: name.trim().to_string(),
            bio: String::new(),
            linkedin_url: String::new(),
            skills: Vec::new(),
            wallet_address: None,
            profile_image: None,
            is_verified: false,
            role: Role::User,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            name: self.name.clone(),
            bio: self.bio.clone(),
            linkedin_url: self.linkedin_url.clone(),
            skills: self.skills.clone(),
            wallet_address: self.wallet_address.clone(),
            profile_image: self.profile_image.clone(),
            is_verified: self.is_verified,
            created_at: self.created_at,
        }
    }

    /// Appends each incoming skill unless a case-insensitive match already exists.
    /// Returns the number of skills actually added.
    pub fn merge_skills(&mut self, incoming: &[String]) -> usize {
        let before = self.skills.len();
        for skill in incoming {
            let trimmed = skill.trim();
            if trimmed.is_empty() {
                continue;
            }
            let lower = trimmed.to_lowercase();
            let exists = self
                .skills
                .iter()
                .any(|existing| existing.trim().to_lowercase() == lower);
            if !exists {
                self.skills.push(trimmed.to_string());
            }
        }
        self.skills.len() - before
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skills(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_email_is_normalized() {
        let user = User::new("  Ada@Example.COM ", "Ada", String::new());
        assert_eq!(user.email, "ada@example.com");
    }

    #[test]
    fn test_merge_skips_case_insensitive_duplicates() {
        let mut user = User::new("a@b.c", "A", String::new());
        user.skills = skills(&["React", "Node.js"]);
        let added = user.merge_skills(&skills(&["react", " NODE.JS ", "Rust"]));
        assert_eq!(added, 1);
        assert_eq!(user.skills, skills(&["React", "Node.js", "Rust"]));
    }

    #[test]
    fn test_merge_trims_and_ignores_blank() {
        let mut user = User::new("a@b.c", "A", String::new());
        let added = user.merge_skills(&skills(&["  Go  ", "   "]));
        assert_eq!(added, 1);
        assert_eq!(user.skills, skills(&["Go"]));
    }

    #[test]
    fn test_merge_dedupes_within_incoming_batch() {
        let mut user = User::new("a@b.c", "A", String::new());
        user.merge_skills(&skills(&["Python", "python", "PYTHON"]));
        assert_eq!(user.skills, skills(&["Python"]));
    }

    #[test]
    fn test_public_profile_has_no_email() {
        let user = User::new("hidden@example.com", "Hidden", String::new());
        let json = serde_json::to_value(user.public_profile()).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(json["name"], "Hidden");
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User::new("a@b.c", "A", "$argon2id$v=19$secret".to_string());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("secret"));
        assert_eq!(json["email"], "a@b.c");
    }
}
