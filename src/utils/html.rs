/// Clean HTML content using the ammonia library.
///
/// Question texts, options and descriptions are rendered as HTML by the exam
/// frontend, so they are sanitized once on write: safe tags (<b>, <p>, <sub>)
/// survive, scripts and event-handler attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input.trim())
}

/// Same as [`clean_html`] for optional fields; blank input becomes `None`.
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(clean_html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scripts() {
        let cleaned = clean_html("What is <b>H2O</b>?<script>alert(1)</script>");
        assert_eq!(cleaned, "What is <b>H2O</b>?");
    }

    #[test]
    fn test_blank_optional_is_none() {
        assert_eq!(clean_optional(Some("   ")), None);
        assert_eq!(clean_optional(None), None);
        assert_eq!(clean_optional(Some(" Algebra ")), Some("Algebra".to_string()));
    }
}
