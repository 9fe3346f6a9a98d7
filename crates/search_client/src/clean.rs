//! HTML to plain, lowercased ASCII text.

use scraper::{Html, Node};

/// Elements whose text never counts as page content.
const SKIPPED: &[&str] = &["script", "style", "noscript", "template"];

/// Visible text of a page: scripts, styles and comments dropped, entities
/// decoded, whitespace collapsed, transliterated to ASCII, lowercased.
pub fn clean_html(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut text = String::with_capacity(html.len() / 4);
    for node in document.tree.root().descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| SKIPPED.contains(&e.name()))
        });
        if !hidden {
            text.push_str(fragment);
            text.push(' ');
        }
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    deunicode::deunicode(&collapsed).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markup_scripts_and_comments() {
        let html = r#"<html><head><title>Flag</title><style>p { color: red }</style></head>
            <body><!-- hidden > comment --><p>The flag of <b>Italy</b>&nbsp;is</p>
            <script>var x = "green";</script><p>Green,   White and Red.</p></body></html>"#;
        assert_eq!(
            clean_html(html),
            "flag the flag of italy is green, white and red."
        );
    }

    #[test]
    fn test_transliterates_and_lowercases() {
        assert_eq!(clean_html("<p>Crème Brûlée in Zürich</p>"), "creme brulee in zurich");
    }

    #[test]
    fn test_empty_page() {
        assert_eq!(clean_html(""), "");
    }
}
