//! Markdown notes
//!
//! Design notes carry their contracts as fenced code blocks whose info
//! string contains the word `behavior`:
//!
//! ````markdown
//! ```json behavior
//! { "contracts": [ ... ] }
//! ```
//! ````
//!
//! Other code blocks are ignored.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag};

/// Info-string word that marks a listing
pub const LISTING_TAG: &str = "behavior";

/// Contents of every `behavior` listing, in document order
pub fn extract_listings(markdown: &str) -> Vec<String> {
    let mut listings = Vec::new();
    let mut current: Option<String> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) if is_listing(&info) => {
                current = Some(String::new());
            }
            Event::Text(text) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::End(Tag::CodeBlock(_)) => {
                if let Some(buf) = current.take() {
                    listings.push(buf);
                }
            }
            _ => {}
        }
    }

    listings
}

fn is_listing(info: &str) -> bool {
    info.split(|c: char| c.is_whitespace() || c == ',')
        .any(|word| word == LISTING_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_tagged_blocks_only() {
        let note = "# Cell\n\n\
            Some prose.\n\n\
            ```json behavior\n{ \"contracts\": [] }\n```\n\n\
            ```rust\nfn main() {}\n```\n\n\
            ```behavior\n{ \"types\": [] }\n```\n";
        let listings = extract_listings(note);
        assert_eq!(listings, vec!["{ \"contracts\": [] }\n", "{ \"types\": [] }\n"]);
    }

    #[test]
    fn test_info_string_words() {
        assert!(is_listing("json behavior"));
        assert!(is_listing("json,behavior"));
        assert!(!is_listing("behaviors"));
        assert!(!is_listing("json"));
    }

    #[test]
    fn test_indented_blocks_ignored() {
        let note = "Text\n\n    { \"contracts\": [] }\n";
        assert!(extract_listings(note).is_empty());
    }
}
