use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Upper bound for card titles, in grapheme clusters.
pub const MAX_TITLE_LEN: usize = 120;
/// Upper bound for a single checklist item, in grapheme clusters.
pub const MAX_TASK_LEN: usize = 500;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

/// Cleans a card title: tags stripped, control characters removed,
/// truncated to [`MAX_TITLE_LEN`].
pub fn sanitize_title(raw: &str) -> String {
    sanitize(raw, MAX_TITLE_LEN)
}

/// Cleans a checklist item body: tags stripped, control characters removed,
/// truncated to [`MAX_TASK_LEN`].
pub fn sanitize_task(raw: &str) -> String {
    sanitize(raw, MAX_TASK_LEN)
}

fn sanitize(raw: &str, max_graphemes: usize) -> String {
    let stripped = HTML_TAG.replace_all(raw, "");
    let cleaned: String = stripped.chars().filter(|ch| !ch.is_control()).collect();
    truncate_graphemes(&cleaned, max_graphemes)
}

// Overlong input truncates rather than being rejected; the cut lands on a
// grapheme boundary so no cluster is split mid-sequence.
fn truncate_graphemes(text: &str, max: usize) -> String {
    match text.grapheme_indices(true).nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_html_tags() {
        assert_eq!(sanitize_title("<b>Groceries</b>"), "Groceries");
        assert_eq!(sanitize_task("Buy <script>alert(1)</script>milk"), "Buy alert(1)milk");
    }

    #[test]
    fn removes_control_characters() {
        assert_eq!(sanitize_task("Milk\x07 and\x1b[31m eggs"), "Milk and[31m eggs");
    }

    #[test]
    fn keeps_plain_text_untouched() {
        assert_eq!(sanitize_title("Weekend plans"), "Weekend plans");
    }

    #[test]
    fn truncates_overlong_titles_on_grapheme_boundary() {
        let long = "é".repeat(MAX_TITLE_LEN + 40);
        let cleaned = sanitize_title(&long);
        assert_eq!(cleaned.graphemes(true).count(), MAX_TITLE_LEN);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize_title(""), "");
        assert_eq!(sanitize_title("<br/>"), "");
    }
}
