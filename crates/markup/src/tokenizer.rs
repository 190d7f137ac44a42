//! Tokenizer for XML-ish view and template sources.
//!
//! Supported name characters (ASCII only): `[A-Za-z0-9:_.-]`. Names keep their case.
//!
//! Known limitations (intentional):
//! - No DTD support; `<!DOCTYPE ...>` and `<?...?>` processing instructions are skipped.
//! - `<![CDATA[...]]>` sections become plain text tokens.
//! - Every attribute needs a quoted value.
use crate::ParseError;
use crate::entities::decode_entities;
use crate::error::ParseErrorCode;
use memchr::memchr;

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";
const CDATA_START: &str = "<![CDATA[";
const CDATA_END: &str = "]]>";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    StartTag {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
        position: usize,
    },
    EndTag {
        name: String,
        position: usize,
    },
    Text(String),
    Comment(String),
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b':' | b'.')
}

fn scan_name(bytes: &[u8], start: usize) -> usize {
    let mut j = start;
    while j < bytes.len() && is_name_char(bytes[j]) {
        j += 1;
    }
    j
}

fn skip_whitespace(bytes: &[u8], mut k: usize) -> usize {
    while k < bytes.len() && bytes[k].is_ascii_whitespace() {
        k += 1;
    }
    k
}

fn error(code: ParseErrorCode, position: usize) -> ParseError {
    ParseError { code, position }
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut out = Vec::new();
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = 0;
    // Slices are only cut at ASCII structural bytes, so every endpoint is a char boundary.
    while i < len {
        if bytes[i] != b'<' {
            let start = i;
            i = memchr(b'<', &bytes[i..]).map_or(len, |rel| i + rel);
            let text = decode_entities(&input[start..i]);
            if !text.is_empty() {
                out.push(Token::Text(text));
            }
            continue;
        }

        let rest = &input[i..];
        if rest.starts_with(COMMENT_START) {
            let body_start = i + COMMENT_START.len();
            let Some(end) = input[body_start..].find(COMMENT_END) else {
                return Err(error(ParseErrorCode::UnterminatedComment, i));
            };
            out.push(Token::Comment(
                input[body_start..body_start + end].to_string(),
            ));
            i = body_start + end + COMMENT_END.len();
            continue;
        }
        if rest.starts_with(CDATA_START) {
            let body_start = i + CDATA_START.len();
            let Some(end) = input[body_start..].find(CDATA_END) else {
                return Err(error(ParseErrorCode::UnterminatedTag, i));
            };
            let text = &input[body_start..body_start + end];
            if !text.is_empty() {
                out.push(Token::Text(text.to_string()));
            }
            i = body_start + end + CDATA_END.len();
            continue;
        }
        if rest.starts_with("<?") || rest.starts_with("<!") {
            let Some(end) = memchr(b'>', &bytes[i..]) else {
                return Err(error(ParseErrorCode::UnterminatedTag, i));
            };
            i += end + 1;
            continue;
        }

        if bytes.get(i + 1) == Some(&b'/') {
            let start = i + 2;
            let j = scan_name(bytes, start);
            if j == start {
                return Err(error(ParseErrorCode::InvalidTagName, i));
            }
            let k = skip_whitespace(bytes, j);
            if bytes.get(k) != Some(&b'>') {
                return Err(error(ParseErrorCode::UnterminatedTag, i));
            }
            out.push(Token::EndTag {
                name: input[start..j].to_string(),
                position: i,
            });
            i = k + 1;
            continue;
        }

        let position = i;
        let start = i + 1;
        let j = scan_name(bytes, start);
        if j == start {
            return Err(error(ParseErrorCode::InvalidTagName, i));
        }
        let name = input[start..j].to_string();
        let mut attributes = Vec::new();
        let mut self_closing = false;
        let mut k = j;
        loop {
            k = skip_whitespace(bytes, k);
            if k >= len {
                return Err(error(ParseErrorCode::UnterminatedTag, position));
            }
            if bytes[k] == b'>' {
                k += 1;
                break;
            }
            if bytes[k] == b'/' {
                if bytes.get(k + 1) == Some(&b'>') {
                    self_closing = true;
                    k += 2;
                    break;
                }
                return Err(error(ParseErrorCode::UnterminatedTag, k));
            }
            let name_start = k;
            k = scan_name(bytes, k);
            if k == name_start {
                return Err(error(ParseErrorCode::InvalidTagName, k));
            }
            let attribute_name = input[name_start..k].to_string();
            k = skip_whitespace(bytes, k);
            if bytes.get(k) != Some(&b'=') {
                return Err(error(ParseErrorCode::MissingAttributeValue, name_start));
            }
            k = skip_whitespace(bytes, k + 1);
            let quote = match bytes.get(k) {
                Some(q @ (b'"' | b'\'')) => *q,
                _ => return Err(error(ParseErrorCode::MissingAttributeValue, name_start)),
            };
            let value_start = k + 1;
            let Some(rel) = memchr(quote, &bytes[value_start..]) else {
                return Err(error(ParseErrorCode::UnterminatedTag, position));
            };
            let value = decode_entities(&input[value_start..value_start + rel]);
            attributes.push((attribute_name, value));
            k = value_start + rel + 1;
        }

        out.push(Token::StartTag {
            name,
            attributes,
            self_closing,
            position,
        });
        i = k;
    }
    Ok(out)
}
