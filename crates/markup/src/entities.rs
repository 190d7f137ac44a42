/// Decode the XML predefined entities and numeric character references.
///
/// Contract:
/// - Named entities decoded: `&amp;`, `&lt;`, `&gt;`, `&quot;`, `&apos;`, `&nbsp;`.
/// - Numeric references decoded only when well-formed and semicolon-terminated:
///   `&#123;` (decimal) and `&#x1F4A9;` (hex).
/// - Only valid Unicode scalar values decode; anything else passes through unchanged.
pub(crate) fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    let mut copy_start = 0;

    const MAX_HEX_DIGITS: usize = 6; // 0x10FFFF
    const MAX_DEC_DIGITS: usize = 7; // 1114111
    const NAMED: [(&[u8], char); 6] = [
        (b"&amp;", '&'),
        (b"&lt;", '<'),
        (b"&gt;", '>'),
        (b"&quot;", '"'),
        (b"&apos;", '\''),
        (b"&nbsp;", '\u{00A0}'),
    ];

    fn scan_numeric(bytes: &[u8], start: usize, max_digits: usize, is_hex: bool) -> Option<usize> {
        let mut j = start;
        while j < bytes.len() && j - start <= max_digits {
            let b = bytes[j];
            if b == b';' {
                return (j > start).then_some(j);
            }
            let ok = if is_hex {
                b.is_ascii_hexdigit()
            } else {
                b.is_ascii_digit()
            };
            if !ok {
                return None;
            }
            j += 1;
        }
        None
    }

    'scan: while i < bytes.len() {
        if bytes[i] != b'&' {
            i += 1;
            continue;
        }
        for (pattern, ch) in NAMED {
            if bytes[i..].starts_with(pattern) {
                out.push_str(&s[copy_start..i]);
                out.push(ch);
                i += pattern.len();
                copy_start = i;
                continue 'scan;
            }
        }
        if bytes[i..].starts_with(b"&#") {
            let is_hex = matches!(bytes.get(i + 2), Some(b'x') | Some(b'X'));
            let digits_start = if is_hex { i + 3 } else { i + 2 };
            let max = if is_hex { MAX_HEX_DIGITS } else { MAX_DEC_DIGITS };
            if let Some(end) = scan_numeric(bytes, digits_start, max, is_hex) {
                let radix = if is_hex { 16 } else { 10 };
                if let Some(ch) = u32::from_str_radix(&s[digits_start..end], radix)
                    .ok()
                    .and_then(char::from_u32)
                {
                    out.push_str(&s[copy_start..i]);
                    out.push(ch);
                    i = end + 1;
                    copy_start = i;
                    continue;
                }
            }
        }
        i += 1;
    }
    out.push_str(&s[copy_start..]);
    out
}

pub(crate) fn escape_text(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

/// Escape an attribute value. Spans between `{{` and `}}` are copied verbatim so that
/// interpolation expressions reach the template engine untouched.
pub(crate) fn escape_attr(s: &str, out: &mut String) {
    let mut rest = s;
    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open..].find("}}") else {
            break;
        };
        escape_attr_plain(&rest[..open], out);
        let end = open + close + 2;
        out.push_str(&rest[open..end]);
        rest = &rest[end..];
    }
    escape_attr_plain(rest, out);
}

fn escape_attr_plain(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
