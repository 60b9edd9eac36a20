use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_COLOUR: &str = "#808080";

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub colour: String,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            colour: DEFAULT_COLOUR.to_string(),
        }
    }

    /// Name of the object-store bucket holding this category's photos.
    pub fn bucket(&self) -> String {
        self.id.to_string()
    }
}

/// Accepts `#` followed by exactly six hex digits.
pub fn is_valid_colour(colour: &str) -> bool {
    match colour.strip_prefix('#') {
        Some(hex) => hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryParams {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNameParams {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateColourParams {
    pub id: Uuid,
    pub colour: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryIdParams {
    pub id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_category_defaults() {
        let category = Category::new("Landscapes");
        assert_eq!(category.colour, DEFAULT_COLOUR);
        assert_eq!(category.bucket(), category.id.to_string());
    }

    #[test]
    fn test_colour_validation() {
        assert!(is_valid_colour("#a1B2c3"));
        assert!(is_valid_colour("#000000"));
        assert!(!is_valid_colour("a1b2c3"));
        assert!(!is_valid_colour("#a1b2c"));
        assert!(!is_valid_colour("#a1b2c3d"));
        assert!(!is_valid_colour("#ggghhh"));
        assert!(!is_valid_colour("red"));
    }
}
