//! Just enough HTML scanning to find an element by its `id`.
//!
//! The page is never re-serialized: callers get byte ranges into the
//! original text, so everything outside the located element stays exactly
//! as it was.

use std::ops::Range;

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is text, never markup.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag<'a> {
    name: &'a str,
    closing: bool,
    self_closing: bool,
    id: Option<&'a str>,
    /// Byte offset just past the closing `>`.
    end: usize,
}

impl Tag<'_> {
    fn is_void(&self) -> bool {
        self.self_closing || VOID_ELEMENTS.iter().any(|v| self.name.eq_ignore_ascii_case(v))
    }
}

/// Start and end tags in document order, skipping comments, doctypes and
/// the bodies of raw-text elements.
struct Tags<'a> {
    html: &'a str,
    pos: usize,
}

impl<'a> Tags<'a> {
    fn new(html: &'a str) -> Self {
        Self { html, pos: 0 }
    }
}

impl<'a> Iterator for Tags<'a> {
    type Item = (usize, Tag<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let html = self.html;
        loop {
            let start = self.pos + html.get(self.pos..)?.find('<')?;
            let rest = &html[start..];

            if rest.starts_with("<!--") {
                self.pos = rest.find("-->").map_or(html.len(), |e| start + e + 3);
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.pos = rest.find('>').map_or(html.len(), |e| start + e + 1);
                continue;
            }

            let Some(tag) = parse_tag(html, start) else {
                self.pos = start + 1;
                continue;
            };
            self.pos = tag.end;
            if !tag.closing && RAW_TEXT_ELEMENTS.iter().any(|r| tag.name.eq_ignore_ascii_case(r)) {
                let close = format!("</{}", tag.name.to_ascii_lowercase());
                self.pos = html[tag.end..]
                    .to_ascii_lowercase()
                    .find(&close)
                    .map_or(html.len(), |e| tag.end + e);
            }
            return Some((start, tag));
        }
    }
}

fn parse_tag(html: &str, start: usize) -> Option<Tag<'_>> {
    let bytes = html.as_bytes();
    let len = bytes.len();
    let mut i = start + 1;

    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }
    let name_start = i;
    while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-' || bytes[i] == b':') {
        i += 1;
    }
    if i == name_start {
        return None;
    }
    let name = &html[name_start..i];

    let mut id = None;
    loop {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match *bytes.get(i)? {
            b'>' => {
                return Some(Tag { name, closing, self_closing: false, id, end: i + 1 });
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                return Some(Tag { name, closing, self_closing: true, id, end: i + 2 });
            }
            b'/' => {
                i += 1;
                continue;
            }
            _ => {}
        }

        let attr_start = i;
        while i < len && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'>' | b'/') {
            i += 1;
        }
        let attr = &html[attr_start..i];
        if attr.is_empty() {
            i += 1;
            continue;
        }

        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = None;
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let quote = *bytes.get(i)?;
            if quote == b'"' || quote == b'\'' {
                let value_start = i + 1;
                let close = html[value_start..].find(quote as char)?;
                value = Some(&html[value_start..value_start + close]);
                i = value_start + close + 1;
            } else {
                let value_start = i;
                while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                value = Some(&html[value_start..i]);
            }
        }
        if id.is_none() && attr.eq_ignore_ascii_case("id") {
            id = value;
        }
    }
}

/// Byte range of the content of the first element with `id="{id}"`.
///
/// `None` when no such element exists, when it is a void element, or when
/// its end tag is missing.
pub fn inner_html_span(html: &str, id: &str) -> Option<Range<usize>> {
    let mut tags = Tags::new(html);
    while let Some((_, tag)) = tags.next() {
        if tag.closing || tag.id != Some(id) {
            continue;
        }
        if tag.is_void() {
            return None;
        }

        let inner_start = tag.end;
        let mut depth = 1usize;
        for (at, inner) in tags.by_ref() {
            if !inner.name.eq_ignore_ascii_case(tag.name) || inner.self_closing {
                continue;
            }
            if inner.closing {
                depth -= 1;
                if depth == 0 {
                    return Some(inner_start..at);
                }
            } else {
                depth += 1;
            }
        }
        return None;
    }
    None
}
