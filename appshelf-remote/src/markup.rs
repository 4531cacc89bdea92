//! Reduction of store-provided requirement HTML to a small safe subset.
//!
//! Only `<br>`, `<b>` and `<strong>` survive. List items become bullet
//! lines and inline styling is dropped.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static STYLE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\sstyle="[^"]*""#).expect("valid regex"));
static STYLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*style[^>]*>[\s\S]*?<\s*/\s*style\s*>").expect("valid regex")
});
static LI_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*li\s*>").expect("valid regex"));
static LI_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*/\s*li\s*>").expect("valid regex"));
static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)?[^>]*>").expect("valid regex"));

const KEPT_TAGS: &[&str] = &["br", "b", "strong"];

/// Clean one requirements fragment.
pub fn clean_requirements_html(raw: &str) -> String {
    let text = raw.replace('\r', "").replace('\n', "<br>");
    let text = STYLE_ATTR.replace_all(&text, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = LI_OPEN.replace_all(&text, "• ");
    let text = LI_CLOSE.replace_all(&text, "<br>");
    ANY_TAG
        .replace_all(&text, |caps: &Captures<'_>| {
            let name = caps.get(2).map(|m| m.as_str().to_ascii_lowercase());
            match name {
                Some(name) if KEPT_TAGS.contains(&name.as_str()) => caps[0].to_string(),
                _ => String::new(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_basic_formatting() {
        assert_eq!(
            clean_requirements_html("<strong>Minimum:</strong><br><b>OS</b>"),
            "<strong>Minimum:</strong><br><b>OS</b>"
        );
    }

    #[test]
    fn list_items_become_bullets() {
        assert_eq!(
            clean_requirements_html(r#"<ul class="bb_ul"><li>OS: 10</li><LI>RAM</LI></ul>"#),
            "• OS: 10<br>• RAM<br>"
        );
    }

    #[test]
    fn drops_styles_and_other_tags() {
        let raw = "<style>p{color:red}</style><p style=\"x\">Hi <a href=\"u\">there</a></p>";
        assert_eq!(clean_requirements_html(raw), "Hi there");
    }

    #[test]
    fn newlines_become_breaks() {
        assert_eq!(clean_requirements_html("a\r\nb"), "a<br>b");
    }

    #[test]
    fn similarly_named_tags_are_dropped() {
        assert_eq!(clean_requirements_html("<body><br/><bdi>x</bdi>"), "<br/>x");
    }
}
