// src/extract/html.rs

//! HTML text extraction via CSS selection.

use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{AppError, Result};

/// Elements whose text content is never part of extracted content.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "iframe",
];

pub struct HtmlOutcome {
    pub text: String,

    /// The selector that produced the text, or "document" after fallback
    pub selector_used: String,
}

/// Extract text from the nodes matching `selector`.
///
/// An empty selection falls back to whole-document text so extraction always
/// makes progress. JSON-LD article metadata is appended when present;
/// malformed metadata blocks are ignored.
pub fn extract(bytes: &[u8], selector: &str) -> Result<HtmlOutcome> {
    let html = String::from_utf8_lossy(bytes);
    let document = Html::parse_document(&html);

    let parsed = Selector::parse(selector)
        .map_err(|e| AppError::selector(selector, format!("{e:?}")))?;

    let mut parts: Vec<String> = document
        .select(&parsed)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();

    let selector_used = if parts.is_empty() {
        parts = vec![element_text(document.root_element())];
        "document".to_string()
    } else {
        selector.to_string()
    };

    if let Some(meta) = json_ld_summary(&document) {
        parts.push(meta);
    }

    Ok(HtmlOutcome {
        text: parts.join("\n"),
        selector_used,
    })
}

/// Text content of an element, skipping script/style/chrome descendants.
fn element_text(element: ElementRef) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        if let Node::Text(text) = node.value() {
            let skipped = node.ancestors().any(|a| match a.value() {
                Node::Element(el) => SKIPPED_ELEMENTS.contains(&el.name()),
                _ => false,
            });
            if !skipped {
                out.push_str(text);
                out.push(' ');
            }
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Headlines of Article-like JSON-LD items, one per line.
fn json_ld_summary(document: &Html) -> Option<String> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;
    let mut lines = Vec::new();

    for script in document.select(&selector) {
        let raw: String = script.text().collect();
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) else {
            continue;
        };
        collect_headlines(&value, &mut lines);
    }

    if lines.is_empty() { None } else { Some(lines.join("\n")) }
}

fn collect_headlines(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            let is_article = map
                .get("@type")
                .and_then(|t| t.as_str())
                .is_some_and(|t| matches!(t, "NewsArticle" | "BlogPosting" | "Article"));
            if is_article {
                if let Some(headline) = map
                    .get("headline")
                    .or_else(|| map.get("name"))
                    .and_then(|h| h.as_str())
                {
                    let headline = headline.trim();
                    if !headline.is_empty() {
                        out.push(headline.to_string());
                    }
                }
            }
            for nested in map.values() {
                collect_headlines(nested, out);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_headlines(item, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_extraction() {
        let html = br#"<html><body>
            <nav>Skip me</nav>
            <main><h1>Permit list</h1><p>Updated rules</p></main>
            <footer>Contact</footer>
        </body></html>"#;
        let outcome = extract(html, "main").unwrap();
        assert_eq!(outcome.selector_used, "main");
        assert!(outcome.text.contains("Permit list"));
        assert!(outcome.text.contains("Updated rules"));
        assert!(!outcome.text.contains("Skip me"));
        assert!(!outcome.text.contains("Contact"));
    }

    #[test]
    fn test_fallback_to_document() {
        let html = b"<html><body><div>Only a div here</div></body></html>";
        let outcome = extract(html, "main, article").unwrap();
        assert_eq!(outcome.selector_used, "document");
        assert!(outcome.text.contains("Only a div here"));
    }

    #[test]
    fn test_script_text_excluded() {
        let html = br#"<html><body><main>
            <script>var hidden = "secret";</script>
            <p>Visible</p>
        </main></body></html>"#;
        let outcome = extract(html, "main").unwrap();
        assert!(outcome.text.contains("Visible"));
        assert!(!outcome.text.contains("secret"));
    }

    #[test]
    fn test_json_ld_headlines_appended() {
        let html = br#"<html><head>
            <script type="application/ld+json">
              {"@type": "NewsArticle", "headline": "New discharge permit issued"}
            </script>
        </head><body><main><p>Body text</p></main></body></html>"#;
        let outcome = extract(html, "main").unwrap();
        assert!(outcome.text.contains("Body text"));
        assert!(outcome.text.contains("New discharge permit issued"));
    }

    #[test]
    fn test_malformed_json_ld_ignored() {
        let html = br#"<html><head>
            <script type="application/ld+json">{not json at all</script>
        </head><body><main><p>Body text</p></main></body></html>"#;
        let outcome = extract(html, "main").unwrap();
        assert!(outcome.text.contains("Body text"));
    }

    #[test]
    fn test_invalid_selector_is_error() {
        assert!(extract(b"<html></html>", "[[nope").is_err());
    }
}
