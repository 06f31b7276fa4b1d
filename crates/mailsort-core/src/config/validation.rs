//! Configuration validation.

use super::Config;

/// Validation error for the run configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Email address is empty.
    #[error("Email address is required (set MAILSORT_EMAIL)")]
    EmptyEmail,
    /// Email address format is invalid.
    #[error("Invalid email address format")]
    InvalidEmail,
    /// IMAP host is empty.
    #[error("IMAP server is required")]
    EmptyImapHost,
    /// IMAP port is invalid.
    #[error("IMAP port must be 1-65535")]
    InvalidImapPort,
    /// Folder name is empty.
    #[error("Folder name is required")]
    EmptyFolder,
    /// No categories configured.
    #[error("At least one category is required")]
    NoCategories,
    /// A category appears twice.
    #[error("Duplicate category: {0}")]
    DuplicateCategory(String),
    /// A category has uppercase letters; matching is on lowercase words.
    #[error("Category must be lowercase: {0}")]
    NotLowercase(String),
    /// A category cannot be used as a single directory name.
    #[error("Category is not a valid directory name: {0:?}")]
    InvalidCategoryName(String),
}

impl ValidationError {
    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyEmail | Self::InvalidEmail => "email",
            Self::EmptyImapHost => "imap_host",
            Self::InvalidImapPort => "imap_port",
            Self::EmptyFolder => "folder",
            Self::NoCategories
            | Self::DuplicateCategory(_)
            | Self::NotLowercase(_)
            | Self::InvalidCategoryName(_) => "categories",
        }
    }
}

/// Result of validating a configuration.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate a configuration.
///
/// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all errors.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any fields are invalid.
pub fn validate_config(config: &Config) -> ValidationResult {
    let mut errors = Vec::new();

    if config.email.trim().is_empty() {
        errors.push(ValidationError::EmptyEmail);
    } else if !is_valid_email(&config.email) {
        errors.push(ValidationError::InvalidEmail);
    }

    if config.imap_host.trim().is_empty() {
        errors.push(ValidationError::EmptyImapHost);
    }
    if config.imap_port == 0 {
        errors.push(ValidationError::InvalidImapPort);
    }
    if config.folder.trim().is_empty() {
        errors.push(ValidationError::EmptyFolder);
    }

    errors.extend(category_errors(&config.categories));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks a category list: non-empty, lowercase, unique, and each name
/// usable as one path component.
pub(crate) fn category_errors(categories: &[String]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if categories.is_empty() {
        errors.push(ValidationError::NoCategories);
        return errors;
    }

    for (i, name) in categories.iter().enumerate() {
        if !is_valid_dir_name(name) {
            errors.push(ValidationError::InvalidCategoryName(name.clone()));
        } else if name.to_lowercase() != *name {
            errors.push(ValidationError::NotLowercase(name.clone()));
        }
        if categories[..i].contains(name) {
            errors.push(ValidationError::DuplicateCategory(name.clone()));
        }
    }

    errors
}

fn is_valid_dir_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name.trim() == name
        && !name.chars().any(|c| c == '/' || c == '\\' || c.is_control())
}

/// Basic email validation.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.trim().split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|p| !p.is_empty())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            email: "me@example.com".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user@sub.example.com"));
    }

    #[test]
    fn test_invalid_email() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("user"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user@@example.com"));
    }

    #[test]
    fn test_default_config_needs_email() {
        let errors = validate_config(&Config::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::EmptyEmail]);
        assert_eq!(errors[0].field(), "email");
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_category_rules() {
        let mut config = valid();
        config.categories = vec![
            "work".into(),
            "Travel".into(),
            "work".into(),
            "a/b".into(),
            "..".into(),
            String::new(),
        ];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::NotLowercase("Travel".into())));
        assert!(errors.contains(&ValidationError::DuplicateCategory("work".into())));
        assert!(errors.contains(&ValidationError::InvalidCategoryName("a/b".into())));
        assert!(errors.contains(&ValidationError::InvalidCategoryName("..".into())));
        assert!(errors.contains(&ValidationError::InvalidCategoryName(String::new())));
        assert!(errors.iter().all(|e| e.field() == "categories"));
    }

    #[test]
    fn test_empty_categories() {
        let mut config = valid();
        config.categories.clear();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::NoCategories]
        );
    }

    #[test]
    fn test_port_and_folder() {
        let mut config = valid();
        config.imap_port = 0;
        config.folder = "  ".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidImapPort));
        assert!(errors.contains(&ValidationError::EmptyFolder));
    }
}
