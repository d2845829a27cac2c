use validator::Validate;

use crate::error::{Error, Result};

pub fn validate<T: Validate>(val: &T) -> Result<()> {
    val.validate().map_err(Error::from)
}

/// Trims the value and rejects it when nothing is left.
pub fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

/// Trims each entry and drops the blank ones.
pub fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        assert!(require_text("location", "   ").is_err());
        assert_eq!(require_text("location", " Room 4 ").unwrap(), "Room 4");
    }

    #[test]
    fn tags_are_trimmed() {
        let tags = clean_tags(vec![" rust ".into(), "".into(), "sql".into()]);
        assert_eq!(tags, vec!["rust", "sql"]);
    }
}
