use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdError {
    #[error("Invalid ID: {0}")]
    Invalid(String),
}

/// Generates a new v4 UUID entity id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Validates an entity id: 1-64 characters from `[A-Za-z0-9._-]`.
pub fn validate_id(id: &str) -> Result<(), IdError> {
    if id.is_empty() || id.len() > 64 {
        return Err(IdError::Invalid(format!(
            "id must be 1-64 characters, got {}",
            id.len()
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
    {
        return Err(IdError::Invalid(format!(
            "id contains disallowed characters: {id}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_valid_and_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert!(validate_id(&a).is_ok());
    }

    #[test]
    fn test_validate_id_rejects_empty_and_long() {
        assert!(validate_id("").is_err());
        assert!(validate_id(&"x".repeat(65)).is_err());
        assert!(validate_id(&"x".repeat(64)).is_ok());
    }

    #[test]
    fn test_validate_id_rejects_bad_characters() {
        assert!(validate_id("abc/123").is_err());
        assert!(validate_id("abc 123").is_err());
        assert!(validate_id("abc-1.2_3").is_ok());
    }
}
