/// Replaces `<` and `>` with their HTML entities so error text can not smuggle
/// markup into a response body.
pub fn escape_angle_brackets(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::escape_angle_brackets;

    #[test]
    fn escapes_angle_brackets() {
        assert_eq!(
            escape_angle_brackets("author \"<script>alert(1)</script>\" not found"),
            "author \"&lt;script&gt;alert(1)&lt;/script&gt;\" not found"
        );
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(escape_angle_brackets("genre \"Fantasy\" not found"), "genre \"Fantasy\" not found");
    }
}
