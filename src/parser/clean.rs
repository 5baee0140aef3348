use std::sync::LazyLock;

use html_escape::decode_html_entities;
use regex::Regex;

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Remove `<!-- ... -->` artifacts left behind by client-side templating.
pub fn strip_comments(s: &str) -> String {
    COMMENT_RE.replace_all(s, "").into_owned()
}

pub fn collapse_ws(s: &str) -> String {
    WS_RE.replace_all(s, " ").trim().to_string()
}

/// Single decoding pass over named and numeric references. `&nbsp;` comes
/// out as U+00A0, which `collapse_ws` treats as whitespace.
pub fn decode_entities(s: &str) -> String {
    decode_html_entities(s).into_owned()
}

/// Markup fragment → plain field text: comments dropped, tags become spaces,
/// entities decoded, whitespace collapsed.
pub fn field_text(fragment: &str) -> String {
    let no_comments = strip_comments(fragment);
    let no_tags = TAG_RE.replace_all(&no_comments, " ");
    collapse_ws(&decode_entities(&no_tags))
}
