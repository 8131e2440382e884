//! Locates the preloaded state blob that listing pages embed in a script tag.
//!
//! Pages ship their whole result set as `window.__PRELOADED_STATE__ = {...};`
//! inside `<script id="preloadedData">`. Anything that goes wrong while digging
//! it out is reported as [`PageState::NotFound`], never as an error: a page
//! without state simply contributes nothing.

use scraper::{Html, Selector};
use serde_json::Value;
use std::fmt;

const STATE_SCRIPT_SELECTOR: &str = "script#preloadedData";
const PRELOADED_STATE_MARKER: &str = "window.__PRELOADED_STATE__ = ";

/// Result of looking for embedded state in one page
#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    Found { listings: Vec<Value>, total: usize },
    NotFound(NotFoundReason),
}

impl PageState {
    pub fn listings(&self) -> &[Value] {
        match self {
            PageState::Found { listings, .. } => listings,
            PageState::NotFound(_) => &[],
        }
    }

    pub fn total(&self) -> usize {
        match self {
            PageState::Found { total, .. } => *total,
            PageState::NotFound(_) => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotFoundReason {
    MissingScript,
    MissingMarker,
    UnbalancedJson,
    MalformedJson(String),
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundReason::MissingScript => write!(f, "no <script id=\"preloadedData\"> tag"),
            NotFoundReason::MissingMarker => write!(f, "no {} marker", PRELOADED_STATE_MARKER.trim()),
            NotFoundReason::UnbalancedJson => write!(f, "state object never closes"),
            NotFoundReason::MalformedJson(e) => write!(f, "invalid state JSON: {}", e),
        }
    }
}

/// Extract listings and the reported total from a full HTML document
pub fn extract_page_state(html: &str) -> PageState {
    let Some(script) = state_script_text(html) else {
        return PageState::NotFound(NotFoundReason::MissingScript);
    };
    extract_from_script(&script)
}

fn state_script_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(STATE_SCRIPT_SELECTOR).ok()?;
    let script = document.select(&selector).next()?;
    Some(script.text().collect::<String>())
}

/// Extract state from the body of the state script
pub fn extract_from_script(script: &str) -> PageState {
    let Some(marker) = script.find(PRELOADED_STATE_MARKER) else {
        return PageState::NotFound(NotFoundReason::MissingMarker);
    };
    let after_marker = &script[marker + PRELOADED_STATE_MARKER.len()..];

    let Some(json_text) = balanced_object(after_marker) else {
        return PageState::NotFound(NotFoundReason::UnbalancedJson);
    };

    let data: Value = match serde_json::from_str(json_text) {
        Ok(data) => data,
        Err(e) => return PageState::NotFound(NotFoundReason::MalformedJson(e.to_string())),
    };

    let list_store = &data["listStore"];
    let listings = list_store["listPostings"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    let total = list_store["paging"]["total"]
        .as_u64()
        .or_else(|| list_store["paging"]["total"].as_str()?.trim().parse().ok())
        .unwrap_or(0) as usize;

    PageState::Found { listings, total }
}

/// Slice out the first complete JSON object in `text`.
///
/// Braces inside string literals are ignored, honoring backslash escapes, so
/// `{"title":"Loft { great view }"}` closes at its real end.
pub fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    // Only ASCII bytes are inspected; UTF-8 continuation bytes never collide with them.
    for (offset, &byte) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(script_body: &str) -> String {
        format!(
            r#"<html><head><script>var x = 1;</script></head><body>
            <script id="preloadedData">{}</script></body></html>"#,
            script_body
        )
    }

    #[test]
    fn finds_listings_and_total() {
        let html = page(
            r#"window.__PRELOADED_STATE__ = {"listStore":{"listPostings":[{"postingId":"1"},{"postingId":"2"}],"paging":{"total":45}}};
            window.other = {};"#,
        );
        let state = extract_page_state(&html);
        assert_eq!(state.total(), 45);
        assert_eq!(state.listings().len(), 2);
        assert_eq!(state.listings()[1]["postingId"], "2");
    }

    #[test]
    fn braces_inside_strings_do_not_close_the_object() {
        let text = r#"{"title":"Loft { great view }"} trailing }"#;
        assert_eq!(balanced_object(text), Some(r#"{"title":"Loft { great view }"}"#));

        let text = r#"{"a":"}}}","b":{"c":"{"}} rest"#;
        assert_eq!(balanced_object(text), Some(r#"{"a":"}}}","b":{"c":"{"}}"#));
    }

    #[test]
    fn escaped_quotes_keep_string_state() {
        let text = r#"{"title":"say \"}\" twice","n":1};"#;
        assert_eq!(balanced_object(text), Some(r#"{"title":"say \"}\" twice","n":1}"#));

        let text = r#"{"path":"C:\\"}{"#;
        assert_eq!(balanced_object(text), Some(r#"{"path":"C:\\"}"#));
    }

    #[test]
    fn string_brace_in_full_page() {
        let html = page(
            r#"window.__PRELOADED_STATE__ = {"listStore":{"listPostings":[{"title":"Loft { great view"}],"paging":{"total":1}}};"#,
        );
        let state = extract_page_state(&html);
        assert_eq!(state.total(), 1);
        assert_eq!(state.listings()[0]["title"], "Loft { great view");
    }

    #[test]
    fn missing_script_is_not_found() {
        let state = extract_page_state("<html><body><p>nothing</p></body></html>");
        assert_eq!(state, PageState::NotFound(NotFoundReason::MissingScript));
        assert_eq!(state.total(), 0);
        assert!(state.listings().is_empty());
    }

    #[test]
    fn missing_marker_is_not_found() {
        let state = extract_page_state(&page("window.somethingElse = {};"));
        assert_eq!(state, PageState::NotFound(NotFoundReason::MissingMarker));
    }

    #[test]
    fn unbalanced_object_is_not_found() {
        let state = extract_page_state(&page(r#"window.__PRELOADED_STATE__ = {"listStore":{"#));
        assert_eq!(state, PageState::NotFound(NotFoundReason::UnbalancedJson));
    }

    #[test]
    fn malformed_json_is_not_found() {
        let state = extract_page_state(&page(r#"window.__PRELOADED_STATE__ = {listStore: 1};"#));
        assert!(matches!(
            state,
            PageState::NotFound(NotFoundReason::MalformedJson(_))
        ));
    }

    #[test]
    fn missing_paths_default_to_empty() {
        let state = extract_page_state(&page(r#"window.__PRELOADED_STATE__ = {"other":true};"#));
        assert_eq!(
            state,
            PageState::Found {
                listings: vec![],
                total: 0
            }
        );
    }
}
