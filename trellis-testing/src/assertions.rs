// Assertions for rendered fragments and responses

use trellis_core::markup::{top_level, StartTag};
use trellis_core::HttpResponse;

/// Top-level elements of `markup`, in document order
pub fn root_elements(markup: &str) -> Vec<StartTag> {
    top_level(markup).elements
}

/// Attribute `name` of the element at top-level position `index`
pub fn root_attr(markup: &str, index: usize, name: &str) -> Option<String> {
    root_elements(markup)
        .get(index)
        .and_then(|tag| tag.attr(name).map(str::to_string))
}

/// `id` of every top-level element, in order
pub fn root_ids(markup: &str) -> Vec<Option<String>> {
    root_elements(markup)
        .iter()
        .map(|tag| tag.attr("id").map(str::to_string))
        .collect()
}

/// Assert that a response has a specific status code
pub fn assert_status(response: &HttpResponse, expected: u16) {
    assert_eq!(
        response.status, expected,
        "Expected status {}, got {}",
        expected, response.status
    );
}

/// Assert that a response has a specific header
pub fn assert_header(response: &HttpResponse, key: &str, expected: &str) {
    let actual = response.header(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected header '{}' to be '{}', got {:?}",
        key,
        expected,
        actual
    );
}

/// Assert that a response body contains a string
pub fn assert_body_contains(response: &HttpResponse, expected: &str) {
    let body = response.body_str();
    assert!(
        body.contains(expected),
        "Expected body to contain '{}', but it didn't. Body: {}",
        expected,
        body
    );
}

/// Assert that a response body is JSON equal to `expected`
pub fn assert_json(response: &HttpResponse, expected: &serde_json::Value) {
    let actual: serde_json::Value = match serde_json::from_slice(&response.body) {
        Ok(value) => value,
        Err(e) => panic!("Response body is not JSON: {}", e),
    };
    assert_eq!(&actual, expected, "JSON bodies do not match");
}

/// Assert that the element at top-level position `index` swaps out of band
/// as `<mode>:#<id>`
pub fn assert_oob(markup: &str, index: usize, id: &str, mode: &str) {
    let expected = format!("{}:#{}", mode, id);
    assert_eq!(root_attr(markup, index, "id").as_deref(), Some(id));
    assert_eq!(
        root_attr(markup, index, "hx-swap-oob").as_deref(),
        Some(expected.as_str()),
        "Element {} in {} is not an out-of-band swap of #{}",
        index,
        markup,
        id
    );
}
