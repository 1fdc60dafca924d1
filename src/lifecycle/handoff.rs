//! Hand-off tokens
//!
//! A token is an opaque, unguessable string bound to one assignment. It has no
//! expiry; it dies when used or when the assignment stops needing coverage.

use uuid::Uuid;

use crate::models::{Assignment, HandoffToken};

/// Fresh random token string
pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Unused token bound to `assignment`
pub fn token_for(assignment: &Assignment) -> HandoffToken {
    HandoffToken::new(generate_token(), assignment.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
