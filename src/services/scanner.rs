use regex::Regex;
use std::ops::Range;

/// One located form directive in page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    /// Per-directive language override, e.g. the `fr` in `(%contact fr: ...%)`.
    pub lang: Option<String>,
    /// Raw field specification between the colon and the closing marker.
    pub spec: String,
    /// Byte range of the whole directive in the original text.
    pub span: Range<usize>,
}

/// Finds `(%contact <lang>: <fields>%)` directives in page text.
///
/// The body is matched non-greedily across line breaks and tolerates the
/// paragraph wrapping markup editors insert around markers. A directive whose
/// opening marker is immediately preceded by a literal `<code>` token is a
/// code sample, not a live form, and is skipped. That guard covers only the
/// immediately preceding token; it is not nested-markup parsing.
pub struct TagScanner {
    pattern: Regex,
}

impl TagScanner {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(
                r"(?s)\(%\s*contact\s*(\w*)\s*:?(?:\s|</?p>)*(.*?)(?:\s|</?p>)*%\)",
            )
            .expect("Invalid directive regex"),
        }
    }

    /// All live directives, left to right, non-overlapping.
    pub fn scan(&self, page_text: &str) -> Vec<TagMatch> {
        let mut matches = Vec::new();
        for caps in self.pattern.captures_iter(page_text) {
            let whole = caps.get(0).expect("capture 0 always present");
            if page_text[..whole.start()].ends_with("<code>") {
                tracing::debug!("Skipping directive inside code sample at byte {}", whole.start());
                continue;
            }

            let lang = caps
                .get(1)
                .map(|m| m.as_str())
                .filter(|lang| !lang.is_empty())
                .map(str::to_string);
            let spec = caps.get(2).map_or("", |m| m.as_str()).to_string();

            matches.push(TagMatch {
                lang,
                spec,
                span: whole.range(),
            });
        }
        tracing::debug!("Found {} form directive(s)", matches.len());
        matches
    }
}

impl Default for TagScanner {
    fn default() -> Self {
        Self::new()
    }
}
