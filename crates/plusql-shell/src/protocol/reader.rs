//! Markup token reading.
//!
//! SQL*Plus in `-M "HTML ON"` mode writes loosely formed HTML. This reader
//! splits it into start tags, end tags and text runs. It never fails: a tag
//! left open at the end of the input is dropped, and anything it cannot
//! recognize as a tag is treated as text.

use std::borrow::Cow;

/// A single markup token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// `<name attr="value">`, name and attribute names lowercased
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    /// `</name>`, name lowercased
    End { name: String },
    /// Text between tags with character references decoded
    Text(Cow<'a, str>),
}

/// A reader over a markup document.
#[derive(Debug)]
pub struct MarkupReader<'a> {
    data: &'a str,
    pos: usize,
    /// Closing tag that ends the current raw-text element (`style`, `script`)
    raw_text_until: Option<&'static str>,
}

impl<'a> MarkupReader<'a> {
    /// Create a new reader over a markup string.
    pub fn new(data: &'a str) -> Self {
        Self {
            data,
            pos: 0,
            raw_text_until: None,
        }
    }

    /// Check if we've reached the end of the data.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn rest(&self) -> &'a str {
        &self.data[self.pos..]
    }

    /// Read the next token, or `None` at the end of the input.
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        loop {
            if self.is_empty() {
                return None;
            }

            if let Some(closing) = self.raw_text_until.take() {
                if let Some(token) = self.read_raw_text(closing) {
                    return Some(token);
                }
                continue;
            }

            let rest = self.rest();
            if !starts_markup(rest) {
                return Some(self.read_text());
            }

            if rest.starts_with("<!--") {
                // Unterminated comment swallows the rest of the input
                self.pos = rest
                    .find("-->")
                    .map_or(self.data.len(), |end| self.pos + end + 3);
                continue;
            }

            if rest.starts_with("<!") || rest.starts_with("<?") {
                let end = rest.find('>')?;
                self.pos += end + 1;
                continue;
            }

            if rest.starts_with("</") {
                let end = rest.find('>')?;
                let name = tag_name(&rest[2..end]);
                self.pos += end + 1;
                if name.is_empty() {
                    continue;
                }
                return Some(Token::End { name });
            }

            return self.read_start_tag();
        }
    }

    /// Read text up to the next markup construct.
    fn read_text(&mut self) -> Token<'a> {
        let rest = self.rest();
        let mut end = rest.len();
        for (i, _) in rest.match_indices('<').skip_while(|&(i, _)| i == 0) {
            if starts_markup(&rest[i..]) {
                end = i;
                break;
            }
        }
        self.pos += end;
        Token::Text(decode_entities(&rest[..end]))
    }

    /// Read the body of a raw-text element, then its closing tag.
    fn read_raw_text(&mut self, closing: &'static str) -> Option<Token<'a>> {
        let rest = self.rest();
        let lower = rest.to_ascii_lowercase();
        let end = lower.find(closing).unwrap_or(rest.len());
        self.pos += end;
        if end == 0 {
            None
        } else {
            Some(Token::Text(Cow::Borrowed(&rest[..end])))
        }
    }

    /// Read `<name attr=value ...>`. Returns `None` if the tag never closes.
    fn read_start_tag(&mut self) -> Option<Token<'a>> {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        let mut i = 1;

        let name_start = i;
        while i < bytes.len() && !is_tag_delimiter(bytes[i]) {
            i += 1;
        }
        let name = rest[name_start..i].to_ascii_lowercase();

        let mut attrs = Vec::new();
        let mut self_closing = false;
        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i)? {
                b'>' => {
                    i += 1;
                    break;
                }
                b'/' => {
                    i += 1;
                    self_closing = bytes.get(i) == Some(&b'>');
                    continue;
                }
                _ => {}
            }

            let attr_start = i;
            while i < bytes.len() && !is_tag_delimiter(bytes[i]) && bytes[i] != b'=' {
                i += 1;
            }
            let attr_name = rest[attr_start..i].to_ascii_lowercase();

            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let value = if bytes.get(i) == Some(&b'=') {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                match bytes.get(i)? {
                    quote @ (b'"' | b'\'') => {
                        let close = rest[i + 1..].find(char::from(*quote))?;
                        let raw = &rest[i + 1..i + 1 + close];
                        i += close + 2;
                        decode_entities(raw).into_owned()
                    }
                    _ => {
                        let value_start = i;
                        while i < bytes.len()
                            && !bytes[i].is_ascii_whitespace()
                            && bytes[i] != b'>'
                        {
                            i += 1;
                        }
                        decode_entities(&rest[value_start..i]).into_owned()
                    }
                }
            } else {
                String::new()
            };

            if !attr_name.is_empty() {
                attrs.push((attr_name, value));
            }
        }

        self.pos += i;
        if !self_closing {
            self.raw_text_until = match name.as_str() {
                "style" => Some("</style"),
                "script" => Some("</script"),
                _ => None,
            };
        }
        Some(Token::Start {
            name,
            attrs,
            self_closing,
        })
    }
}

impl<'a> Iterator for MarkupReader<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Does the input start a tag, end tag, comment, declaration or PI?
fn starts_markup(s: &str) -> bool {
    let mut chars = s.chars();
    if chars.next() != Some('<') {
        return false;
    }
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '!' || c == '?' => true,
        Some('/') => chars.next().is_some_and(|c| c.is_ascii_alphabetic()),
        _ => false,
    }
}

fn is_tag_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'>' || b == b'/'
}

fn tag_name(inner: &str) -> String {
    inner
        .split(|c: char| c.is_ascii_whitespace() || c == '/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Decode HTML character references.
///
/// Handles the named references the shell emits plus numeric references.
/// Unknown or malformed references are kept verbatim.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest[1..]
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_reference(&rest[1..=semi]).map(|c| (c, semi + 2)));

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_reference(reference: &str) -> Option<char> {
    if let Some(numeric) = reference.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse().ok()?,
        };
        return char::from_u32(code);
    }
    match reference {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}
