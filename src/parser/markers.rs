use std::sync::LazyLock;

use regex::{CaptureMatches, Regex};

use super::clean::field_text;

static MONTH_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div[^>]*class="[^"]*w-4/12[^"]*font-bold[^"]*"[^>]*>(.*?)</div>"#).unwrap()
});

// Element text shaped like "Sat, Mar 15 2024" or "Mar 15, 2024".
static DAY_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r">\s*((?:[A-Z][a-z]{2,8},?\s+)?[A-Z][a-z]{2,8}\s+\d{1,2},?\s+\d{4})\s*<").unwrap()
});

const MONTH_ABBREVS: &[&str] = &[
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A period label such as ("March", "2024") or ("Mar 15", "2024").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub name: String,
    pub year: String,
}

impl Period {
    pub fn new(name: impl Into<String>, year: impl Into<String>) -> Self {
        Period {
            name: name.into(),
            year: year.into(),
        }
    }

    pub fn current_month() -> Self {
        let now = chrono::Local::now();
        Period::new(now.format("%B").to_string(), now.format("%Y").to_string())
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub period: Period,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// Month section headers on the group listing ("March 2024").
    Month,
    /// Per-item date headers on an event listing ("Sat, Mar 15 2024").
    Day,
}

impl MarkerKind {
    fn pattern(self) -> &'static Regex {
        match self {
            MarkerKind::Month => &*MONTH_HEADER_RE,
            MarkerKind::Day => &*DAY_HEADER_RE,
        }
    }

    fn parse(self, raw: &str) -> Option<Period> {
        let text = field_text(raw);
        match self {
            MarkerKind::Month => parse_month(&text),
            MarkerKind::Day => parse_day(&text),
        }
    }
}

fn parse_month(text: &str) -> Option<Period> {
    let mut parts = text.split_whitespace();
    let name = parts.next()?;
    let year = parts.next()?;
    if !name.chars().all(char::is_alphabetic) || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(Period::new(capitalize(name), year))
}

fn parse_day(text: &str) -> Option<Period> {
    let cleaned = text.replace(',', " ");
    let parts: Vec<&str> = cleaned.split_whitespace().collect();
    // Optional leading weekday.
    let parts = match parts.len() {
        4 => &parts[1..],
        3 => &parts[..],
        _ => return None,
    };
    let month = MONTH_ABBREVS
        .iter()
        .find(|abbr| parts[0].starts_with(**abbr))?;
    let day: u32 = parts[1].parse().ok()?;
    if !(1..=31).contains(&day) || parts[2].len() != 4 {
        return None;
    }
    Some(Period::new(format!("{} {}", month, day), parts[2]))
}

fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Single forward pass over one document; malformed headers are skipped.
pub struct MarkerScanner<'h> {
    kind: MarkerKind,
    matches: CaptureMatches<'static, 'h>,
}

impl Iterator for MarkerScanner<'_> {
    type Item = Marker;

    fn next(&mut self) -> Option<Marker> {
        for caps in self.matches.by_ref() {
            let Some(inner) = caps.get(1) else { continue };
            if let Some(period) = self.kind.parse(inner.as_str()) {
                return Some(Marker {
                    period,
                    offset: caps.get(0).map_or(inner.start(), |m| m.start()),
                });
            }
        }
        None
    }
}

pub fn scan(markup: &str, kind: MarkerKind) -> MarkerScanner<'_> {
    MarkerScanner {
        kind,
        matches: kind.pattern().captures_iter(markup),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONTH_DIV: &str = r#"<div class="w-4/12 text-lg font-bold">"#;

    #[test]
    fn month_headers_in_document_order() {
        let html = format!(
            "<p>x</p>{MONTH_DIV}MARCH 2024</div><a>...</a>{MONTH_DIV}April<!-- --> 2024</div>"
        );
        let markers: Vec<_> = scan(&html, MarkerKind::Month).collect();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].period, Period::new("March", "2024"));
        assert_eq!(markers[1].period, Period::new("April", "2024"));
        assert_eq!(markers[0].offset, 8);
        assert!(markers[0].offset < markers[1].offset);
    }

    #[test]
    fn malformed_month_headers_skipped() {
        let html = format!(
            "{MONTH_DIV}Upcoming</div>{MONTH_DIV}May twenty</div>{MONTH_DIV}June 2025</div>"
        );
        let markers: Vec<_> = scan(&html, MarkerKind::Month).collect();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].period.label(), "June 2025");
    }

    #[test]
    fn no_headers_is_empty() {
        assert_eq!(scan("<div>nothing here</div>", MarkerKind::Month).count(), 0);
    }

    #[test]
    fn day_headers_with_and_without_weekday() {
        let html = "<div class=\"d\">Sat, Mar 15 2024</div><a></a><span>Mar 18, 2024</span>";
        let markers: Vec<_> = scan(html, MarkerKind::Day).collect();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].period, Period::new("Mar 15", "2024"));
        assert_eq!(markers[1].period, Period::new("Mar 18", "2024"));
    }

    #[test]
    fn day_header_rejects_non_month() {
        let html = "<div>Test 15 2024</div><div>Mar 45, 2024</div>";
        assert_eq!(scan(html, MarkerKind::Day).count(), 0);
    }

    #[test]
    fn current_month_has_numeric_year() {
        let p = Period::current_month();
        assert_eq!(p.year.len(), 4);
        assert!(p.name.chars().next().unwrap().is_uppercase());
    }
}
