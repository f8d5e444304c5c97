//! Catalog and account entities as stored.

pub type BookId = u64;
pub type AuthorId = u64;
pub type UserId = u64;

/// Role every authenticated user holds.
pub const ROLE_USER: &str = "ROLE_USER";
/// Role required for catalog mutations.
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

/// A stored book. `author_id` is `None` until an author is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub cover_text: String,
    pub comment: Option<String>,
    pub author_id: Option<AuthorId>,
}

/// Book fields before the store assigns an id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub cover_text: String,
    pub comment: Option<String>,
    pub author_id: Option<AuthorId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: AuthorId,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthor {
    pub first_name: String,
    pub last_name: String,
}

/// An account able to authenticate against the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// PHC-formatted password hash.
    pub password_hash: String,
    roles: Vec<String>,
}

impl User {
    pub fn new(id: UserId, email: String, password_hash: String, roles: Vec<String>) -> Self {
        Self {
            id,
            email,
            password_hash,
            roles,
        }
    }

    /// Granted roles, always including [`ROLE_USER`].
    pub fn roles(&self) -> Vec<String> {
        let mut roles = self.roles.clone();
        if !roles.iter().any(|role| role == ROLE_USER) {
            roles.push(ROLE_USER.to_string());
        }
        roles
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub size: u64,
}

impl Page {
    /// Builds a page, treating 0 as the first page and as a page size of 1.
    pub fn new(number: u64, size: u64) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    /// Number of records skipped before this page.
    pub fn offset(&self) -> u64 {
        (self.number - 1).saturating_mul(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_roles_always_include_role_user() {
        let admin = User::new(1, "a@b.c".into(), "hash".into(), vec![ROLE_ADMIN.into()]);
        assert_eq!(admin.roles(), vec![ROLE_ADMIN.to_string(), ROLE_USER.to_string()]);

        let user = User::new(2, "u@b.c".into(), "hash".into(), vec![ROLE_USER.into()]);
        assert_eq!(user.roles(), vec![ROLE_USER.to_string()]);
    }

    #[test]
    fn page_offset_is_one_based() {
        assert_eq!(Page::new(1, 3).offset(), 0);
        assert_eq!(Page::new(3, 3).offset(), 6);
        assert_eq!(Page::new(0, 0), Page::new(1, 1));
    }
}
