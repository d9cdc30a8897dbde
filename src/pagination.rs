//! Cursor pagination as advertised by Sentry's `Link` response header.
//!
//! Sentry always emits a `previous` and a `next` relation and signals whether the target
//! page has data through a `results` attribute:
//!
//! ```text
//! <https://sentry.io/api/0/organizations/acme/issues/?&cursor=0:0:1>; rel="previous"; results="false"; cursor="0:0:1",
//! <https://sentry.io/api/0/organizations/acme/issues/?&cursor=0:100:0>; rel="next"; results="true"; cursor="0:100:0"
//! ```

use reqwest::Url;

/// One `<url>; key=value; ...` element of a `Link` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSegment {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl LinkSegment {
    /// Parameter lookup. Names are case-insensitive.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// `rel` may carry several space-separated relation types.
    pub fn has_rel(&self, rel: &str) -> bool {
        self.param("rel")
            .map(|value| value.split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case(rel)))
            .unwrap_or(false)
    }

    /// Percent-decoded value of a query parameter in the target URL.
    /// A target that is not an absolute URL has no parameters.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let url = Url::parse(&self.url).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }
}

/// Parses a `Link` header into its segments. Malformed segments are skipped.
pub fn parse_link_header(header: &str) -> Vec<LinkSegment> {
    let mut parser = Parser {
        input: header.as_bytes(),
        pos: 0,
    };
    let mut segments = Vec::new();
    while !parser.at_end() {
        match parser.segment() {
            Some(segment) => segments.push(segment),
            None => parser.recover(),
        }
    }
    segments
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn at_end(&mut self) -> bool {
        self.skip_while(|b| b.is_ascii_whitespace() || b == b',');
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        self.skip_while(pred);
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn segment(&mut self) -> Option<LinkSegment> {
        if self.peek() != Some(b'<') {
            return None;
        }
        self.pos += 1;
        let url = self.take_while(|b| b != b'>');
        if self.peek() != Some(b'>') {
            return None;
        }
        self.pos += 1;
        let mut params = Vec::new();
        loop {
            self.skip_while(|b| b.is_ascii_whitespace());
            match self.peek() {
                None | Some(b',') => break,
                Some(b';') => self.pos += 1,
                Some(_) => return None,
            }
            self.skip_while(|b| b.is_ascii_whitespace());
            let key = self.take_while(|b| !matches!(b, b'=' | b';' | b',') && !b.is_ascii_whitespace());
            if key.is_empty() {
                return None;
            }
            self.skip_while(|b| b.is_ascii_whitespace());
            let value = if self.peek() == Some(b'=') {
                self.pos += 1;
                self.skip_while(|b| b.is_ascii_whitespace());
                self.value()?
            } else {
                String::new()
            };
            params.push((key, value));
        }
        Some(LinkSegment { url, params })
    }

    fn value(&mut self) -> Option<String> {
        if self.peek() != Some(b'"') {
            return Some(self.take_while(|b| !matches!(b, b';' | b',') && !b.is_ascii_whitespace()));
        }
        self.pos += 1;
        let mut bytes = Vec::new();
        loop {
            match self.peek()? {
                b'"' => {
                    self.pos += 1;
                    return Some(String::from_utf8_lossy(&bytes).into_owned());
                }
                b'\\' => {
                    self.pos += 1;
                    bytes.push(self.peek()?);
                    self.pos += 1;
                }
                b => {
                    bytes.push(b);
                    self.pos += 1;
                }
            }
        }
    }

    /// Skips to the next top-level comma, honouring quoted strings and `<...>` targets.
    fn recover(&mut self) {
        let mut in_quotes = false;
        let mut in_url = false;
        while let Some(b) = self.peek() {
            match b {
                b'"' if !in_url => in_quotes = !in_quotes,
                b'<' if !in_quotes => in_url = true,
                b'>' if !in_quotes => in_url = false,
                b',' if !in_quotes && !in_url => return,
                _ => {}
            }
            self.pos += 1;
        }
    }
}

/// Whether a next page exists and where it starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    pub has_more: bool,
    pub cursor: Option<String>,
}

impl Pagination {
    /// Only a `next` relation explicitly marked `results="true"` counts as more data.
    pub fn from_link_header(header: Option<&str>) -> Self {
        let Some(header) = header else {
            return Self::default();
        };
        let segments = parse_link_header(header);
        let Some(next) = segments.iter().find(|s| s.has_rel("next")) else {
            return Self::default();
        };
        if next.param("results") != Some("true") {
            return Self::default();
        }
        Self {
            has_more: true,
            cursor: next.query_param("cursor"),
        }
    }
}
