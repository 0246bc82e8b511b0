//! Minimal HTML scanning used to compose fragments.
//!
//! This is not a full HTML parser. It finds the top-level elements of a
//! fragment and rewrites attributes on a start tag, which is all fragment
//! wrapping and out-of-band merging need.

use once_cell::sync::Lazy;
use regex::Regex;

static START_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^<([A-Za-z][A-Za-z0-9:_-]*)((?:\s+[^\s"'/>=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>"#,
    )
    .unwrap()
});

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s"'/>=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#).unwrap()
});

static END_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^</\s*([A-Za-z][A-Za-z0-9:_-]*)\s*>").unwrap());

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// A parsed start tag and its byte span in the source markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    pub name: String,
    /// Attribute names with their entity-decoded values
    pub attrs: Vec<(String, Option<String>)>,
    pub self_closing: bool,
    pub start: usize,
    pub end: usize,
    /// Source text of each attribute, parallel to `attrs`
    sources: Vec<String>,
}

impl StartTag {
    /// Attribute value by case-insensitive name; valueless attributes
    /// yield an empty string
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    /// Render this tag with `name` set to `value`, replacing any existing
    /// occurrence of the attribute. Other attributes keep their source text.
    pub fn render_with(&self, name: &str, value: &str) -> String {
        let mut out = format!("<{}", self.name);
        for ((key, _), source) in self.attrs.iter().zip(&self.sources) {
            if key.eq_ignore_ascii_case(name) {
                continue;
            }
            out.push(' ');
            out.push_str(source);
        }
        push_attr(&mut out, name, Some(value));
        out.push_str(if self.self_closing { " />" } else { ">" });
        out
    }
}

/// Result of scanning a fragment's top level
#[derive(Debug, Clone, Default)]
pub struct TopLevel {
    pub elements: Vec<StartTag>,
    /// Non-whitespace text found outside every element
    pub stray_text: bool,
}

impl TopLevel {
    /// The single root element, if the fragment has exactly one and no
    /// surrounding text
    pub fn single_root(&self) -> Option<&StartTag> {
        match (self.elements.as_slice(), self.stray_text) {
            ([root], false) => Some(root),
            _ => None,
        }
    }
}

/// Scan `markup` and collect its top-level elements
pub fn top_level(markup: &str) -> TopLevel {
    let mut result = TopLevel::default();
    let mut open: Vec<String> = Vec::new();
    let mut i = 0;

    while i < markup.len() {
        let rest = &markup[i..];

        if rest.starts_with("<!--") {
            i += rest.find("-->").map(|p| p + 3).unwrap_or(rest.len());
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            i += rest.find('>').map(|p| p + 1).unwrap_or(rest.len());
            continue;
        }
        if let Some(caps) = END_TAG.captures(rest) {
            let name = caps[1].to_ascii_lowercase();
            if let Some(pos) = open.iter().rposition(|n| *n == name) {
                open.truncate(pos);
            }
            i += caps[0].len();
            continue;
        }
        if let Some(caps) = START_TAG.captures(rest) {
            let whole = caps[0].len();
            let name = caps[1].to_string();
            let lower = name.to_ascii_lowercase();
            let self_closing = !caps[3].is_empty();

            if open.is_empty() {
                let (attrs, sources) = parse_attrs(&caps[2]);
                result.elements.push(StartTag {
                    name,
                    attrs,
                    self_closing,
                    start: i,
                    end: i + whole,
                    sources,
                });
            }
            i += whole;

            if self_closing || VOID_ELEMENTS.contains(&lower.as_str()) {
                continue;
            }
            if RAW_TEXT_ELEMENTS.contains(&lower.as_str()) {
                let close = format!("</{}", lower);
                let lowered = markup[i..].to_ascii_lowercase();
                match lowered.find(&close) {
                    Some(p) => {
                        i += p;
                        open.push(lower);
                    }
                    None => i = markup.len(),
                }
                continue;
            }
            open.push(lower);
            continue;
        }

        let ch = rest.chars().next().unwrap_or(' ');
        if open.is_empty() && !ch.is_whitespace() {
            result.stray_text = true;
        }
        i += ch.len_utf8();
    }

    result
}

fn parse_attrs(source: &str) -> (Vec<(String, Option<String>)>, Vec<String>) {
    ATTRIBUTE
        .captures_iter(source)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| unescape_attr(m.as_str()));
            ((caps[1].to_string(), value), caps[0].to_string())
        })
        .unzip()
}

fn push_attr(out: &mut String, name: &str, value: Option<&str>) {
    out.push(' ');
    out.push_str(name);
    if let Some(value) = value {
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
}

/// Escape text for use inside a double-quoted attribute value
pub fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode the character references `escape_attr` produces, plus `&#39;`.
/// Anything else is left as written.
pub fn unescape_attr(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    const ENTITIES: &[(&str, char)] = &[
        ("&amp;", '&'),
        ("&quot;", '"'),
        ("&#x27;", '\''),
        ("&#39;", '\''),
        ("&lt;", '<'),
        ("&gt;", '>'),
    ];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Replace the start tag `tag` in `markup` with a copy that sets `name`
pub fn set_attr(markup: &str, tag: &StartTag, name: &str, value: &str) -> String {
    let mut out = String::with_capacity(markup.len() + name.len() + value.len() + 4);
    out.push_str(&markup[..tag.start]);
    out.push_str(&tag.render_with(name, value));
    out.push_str(&markup[tag.end..]);
    out
}
