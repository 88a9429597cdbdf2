//! Client-facing naming convention.
//!
//! Backend identifiers are snake_case; clients usually expect camelCase. All
//! renaming is decided here so the compiler can bake final names into the
//! extraction template.

use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use serde::{Deserialize, Serialize};

/// Naming convention applied to every identifier shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    /// `created_at` -> `createdAt`
    #[default]
    CamelCase,
    /// `createdAt` -> `created_at`
    SnakeCase,
    /// `created_at` -> `CreatedAt`
    PascalCase,
    /// Identifiers are passed through unchanged.
    Preserve,
}

impl NamingConvention {
    /// Converts a source identifier into its client-facing form.
    ///
    /// ```rust
    /// use sift_types::NamingConvention;
    ///
    /// assert_eq!(NamingConvention::CamelCase.apply("has_more"), "hasMore");
    /// assert_eq!(NamingConvention::SnakeCase.apply("has_more"), "has_more");
    /// ```
    pub fn apply(self, identifier: &str) -> String {
        match self {
            Self::CamelCase => identifier.to_lower_camel_case(),
            Self::SnakeCase => identifier.to_snake_case(),
            Self::PascalCase => identifier.to_upper_camel_case(),
            Self::Preserve => identifier.to_string(),
        }
    }

    /// Client-facing name, honouring an explicit override when present.
    pub fn client_name(self, source_name: &str, override_name: Option<&str>) -> String {
        match override_name {
            Some(explicit) => explicit.to_string(),
            None => self.apply(source_name),
        }
    }

    /// Returns true when `candidate` names `source_name` from a client's point
    /// of view: either the renamed identifier or the raw source identifier.
    pub fn matches(self, candidate: &str, source_name: &str, override_name: Option<&str>) -> bool {
        candidate == source_name || candidate == self.client_name(source_name, override_name)
    }
}

#[cfg(test)]
mod tests {
    use super::NamingConvention;

    #[test]
    fn camel_case_handles_multi_word_identifiers() {
        assert_eq!(NamingConvention::CamelCase.apply("comment_count"), "commentCount");
        assert_eq!(NamingConvention::CamelCase.apply("id"), "id");
        assert_eq!(NamingConvention::PascalCase.apply("rich_text"), "RichText");
    }

    #[test]
    fn override_wins_over_convention() {
        let naming = NamingConvention::CamelCase;
        assert_eq!(naming.client_name("inserted_at", Some("createdOn")), "createdOn");
        assert!(naming.matches("createdOn", "inserted_at", Some("createdOn")));
        assert!(naming.matches("inserted_at", "inserted_at", Some("createdOn")));
        assert!(!naming.matches("insertedAt", "inserted_at", Some("createdOn")));
    }
}
