use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

use super::clean::field_text;

// Quoted attribute values may contain `>`.
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<a\s((?:[^>"]|"[^"]*")*)>(.*?)</a>"#).unwrap());
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|\s)href="([^"]*)""#).unwrap());
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|\s)title="([^"]*)""#).unwrap());
static SERIES_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/cricket-series/(\d+)/[^/]+").unwrap());
static MATCH_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/live-cricket-scores/(\d+)/[^/]+").unwrap());
static NAME_DIV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div[^>]*class="[^"]*text-ellipsis[^"]*"[^>]*>(.*?)</div>"#).unwrap()
});
static DATE_DIV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div[^>]*class="[^"]*text-cbTxtSec[^"]*"[^>]*>(.*?)</div>"#).unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Series links on the schedule page; primary text is the series name.
    Series,
    /// Match links on a series page; primary text is the match title.
    Match,
}

impl RecordKind {
    fn path_pattern(self) -> &'static Regex {
        match self {
            RecordKind::Series => &*SERIES_PATH_RE,
            RecordKind::Match => &*MATCH_PATH_RE,
        }
    }

    fn min_len(self) -> usize {
        match self {
            RecordKind::Series => 3,
            RecordKind::Match => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub url: String,
    pub path: String,
    /// Numeric id the source site embeds in the path.
    pub source_id: String,
    pub primary: String,
    pub secondary: Option<String>,
    pub offset: usize,
}

/// Scan every anchor whose resolved path fits `kind`, in document order.
pub fn scan<'a>(
    markup: &'a str,
    kind: RecordKind,
    origin: &'a Url,
) -> impl Iterator<Item = CandidateRecord> + 'a {
    ANCHOR_RE
        .captures_iter(markup)
        .filter_map(move |caps| build(&caps, kind, origin))
}

fn build(caps: &Captures, kind: RecordKind, origin: &Url) -> Option<CandidateRecord> {
    let attrs = caps.get(1)?.as_str();
    let inner = caps.get(2).map_or("", |m| m.as_str());
    let offset = caps.get(0)?.start();

    let href = HREF_RE.captures(attrs)?.get(1)?.as_str();
    let resolved = origin.join(href).ok()?;
    let path = resolved.path().to_string();
    let source_id = kind.path_pattern().captures(&path)?.get(1)?.as_str().to_string();

    let title = TITLE_RE
        .captures(attrs)
        .and_then(|c| c.get(1))
        .map(|m| field_text(m.as_str()))
        .filter(|t| !t.is_empty());
    let text = field_text(inner);

    let (primary, secondary) = match kind {
        RecordKind::Series => {
            let name = first_div(&NAME_DIV_RE, inner)
                .or(title)
                .unwrap_or(text);
            (name, first_div(&DATE_DIV_RE, inner))
        }
        RecordKind::Match => match title {
            Some(t) => {
                let detail = Some(text).filter(|d| !d.is_empty() && *d != t);
                (t, detail)
            }
            None => (text, None),
        },
    };

    if primary.chars().count() < kind.min_len() {
        return None;
    }

    Some(CandidateRecord {
        url: resolved.to_string(),
        path,
        source_id,
        primary,
        secondary,
        offset,
    })
}

fn first_div(re: &Regex, inner: &str) -> Option<String> {
    re.captures(inner)
        .and_then(|c| c.get(1))
        .map(|m| field_text(m.as_str()))
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://www.cricbuzz.com").unwrap()
    }

    #[test]
    fn series_name_and_date_from_inner_divs() {
        let html = r#"<a href="/cricket-series/7572/india-tour-of-australia-2024" title="ignored">
            <div class="text-ellipsis font-bold">India tour of Australia,<!-- --> 2024</div>
            <div class="text-cbTxtSec text-xs">Nov 22<!-- --> - <!-- -->Jan 07</div></a>"#;
        let origin = origin();
        let recs: Vec<_> = scan(html, RecordKind::Series, &origin).collect();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].primary, "India tour of Australia, 2024");
        assert_eq!(recs[0].secondary.as_deref(), Some("Nov 22 - Jan 07"));
        assert_eq!(recs[0].source_id, "7572");
        assert_eq!(
            recs[0].url,
            "https://www.cricbuzz.com/cricket-series/7572/india-tour-of-australia-2024"
        );
        assert_eq!(recs[0].offset, 0);
    }

    #[test]
    fn series_falls_back_to_title_then_text() {
        let html = r#"<a href="/cricket-series/1/a-b" title="Series By Title"></a>
            <a href="/cricket-series/2/c-d">Plain   Text Series</a>"#;
        let origin = origin();
        let recs: Vec<_> = scan(html, RecordKind::Series, &origin).collect();
        assert_eq!(recs[0].primary, "Series By Title");
        assert_eq!(recs[1].primary, "Plain Text Series");
        assert!(recs[1].secondary.is_none());
    }

    #[test]
    fn short_names_are_noise() {
        let html = r#"<a href="/cricket-series/1/a">ab</a><a href="/cricket-series/2/b"> </a>"#;
        let origin = origin();
        assert_eq!(scan(html, RecordKind::Series, &origin).count(), 0);
    }

    #[test]
    fn unrelated_links_ignored() {
        let html = r#"<a href="/cricket-news/1/x">News item</a><a class="x">no href</a>
            <a href="/cricket-series/5/x">Real Series</a>"#;
        let origin = origin();
        let recs: Vec<_> = scan(html, RecordKind::Series, &origin).collect();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].source_id, "5");
    }

    #[test]
    fn match_title_from_attribute() {
        let html = r#"<a href="/live-cricket-scores/91234/ind-vs-aus-1st-test-2024" title="IND vs AUS, 1st Test">
            <span>Perth Stadium</span></a>"#;
        let origin = origin();
        let recs: Vec<_> = scan(html, RecordKind::Match, &origin).collect();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].source_id, "91234");
        assert_eq!(recs[0].primary, "IND vs AUS, 1st Test");
        assert_eq!(recs[0].secondary.as_deref(), Some("Perth Stadium"));
        assert_eq!(recs[0].path, "/live-cricket-scores/91234/ind-vs-aus-1st-test-2024");
    }

    #[test]
    fn match_min_title_length_is_two() {
        let html = r#"<a href="/live-cricket-scores/1/a-b">T1</a><a href="/live-cricket-scores/2/c-d">X</a>"#;
        let origin = origin();
        let recs: Vec<_> = scan(html, RecordKind::Match, &origin).collect();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].primary, "T1");
    }

    #[test]
    fn data_attributes_do_not_shadow_href_or_title() {
        let html = r#"<a data-href="/cricket-series/9/other-cup" href="/cricket-series/5/real-cup"
            data-title="Wrong" title="Real Cup 2024">x</a>"#;
        let origin = origin();
        let recs: Vec<_> = scan(html, RecordKind::Series, &origin).collect();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].source_id, "5");
        assert_eq!(recs[0].primary, "Real Cup 2024");
    }

    #[test]
    fn angle_bracket_inside_quoted_title() {
        let html = r#"<a href="/live-cricket-scores/7/a-vs-b" title="A > B, Final"><span>Lord's</span></a>"#;
        let origin = origin();
        let recs: Vec<_> = scan(html, RecordKind::Match, &origin).collect();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].primary, "A > B, Final");
        assert_eq!(recs[0].secondary.as_deref(), Some("Lord's"));
    }

    #[test]
    fn absolute_hrefs_resolve() {
        let html = r#"<a href="https://www.cricbuzz.com/live-cricket-scores/3/x-y" title="Final">x</a>"#;
        let origin = origin();
        let recs: Vec<_> = scan(html, RecordKind::Match, &origin).collect();
        assert_eq!(recs[0].url, "https://www.cricbuzz.com/live-cricket-scores/3/x-y");
    }
}
