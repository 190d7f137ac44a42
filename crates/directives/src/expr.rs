//! Expression text helpers and the literal parser behind `t-att`.

use crate::error::CompileError;

/// Trim an expression and give every comma outside string literals exactly one trailing space.
pub fn normalize(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len() + 8);
    let mut chars = expr.trim().chars().peekable();
    let mut quote: Option<char> = None;
    while let Some(c) = chars.next() {
        out.push(c);
        match quote {
            Some(q) => {
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                ',' => {
                    while chars.next_if(|c| c.is_whitespace()).is_some() {}
                    if chars.peek().is_some() {
                        out.push(' ');
                    }
                }
                _ => {}
            },
        }
    }
    out
}

/// Rewrite `#{expr}` spans of a format string into `{{ expr }}`.
pub fn format_string(format: &str) -> String {
    let mut out = String::with_capacity(format.len());
    let mut rest = format;
    while let Some(start) = rest.find("#{") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str("{{ ");
        out.push_str(&normalize(&rest[start + 2..start + 2 + len]));
        out.push_str(" }}");
        rest = &rest[start + 2 + len + 1..];
    }
    out.push_str(rest);
    out
}

/// Literal values accepted by `t-att`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    Str(String),
    /// Numbers keep their source text.
    Number(String),
    Bool(bool),
    None,
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Map(Vec<(Literal, Literal)>),
}

impl Literal {
    pub fn parse(source: &str) -> Result<Self, &'static str> {
        let mut parser = LiteralParser {
            bytes: source.as_bytes(),
            source,
            pos: 0,
        };
        let value = parser.value()?;
        parser.skip_ws();
        if parser.pos != parser.bytes.len() {
            return Err("trailing characters after literal");
        }
        Ok(value)
    }
}

struct LiteralParser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl LiteralParser<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        self.skip_ws();
        if self.bytes.get(self.pos) == Some(&byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Result<Literal, &'static str> {
        self.skip_ws();
        match self.bytes.get(self.pos) {
            None => Err("unexpected end of literal"),
            Some(b'\'' | b'"') => self.string().map(Literal::Str),
            Some(b'[') => {
                self.pos += 1;
                self.sequence(b']').map(Literal::List)
            }
            Some(b'(') => {
                self.pos += 1;
                self.sequence(b')').map(Literal::Tuple)
            }
            Some(b'{') => {
                self.pos += 1;
                self.map()
            }
            Some(c) if c.is_ascii_digit() || *c == b'-' || *c == b'+' || *c == b'.' => {
                self.number()
            }
            Some(_) => self.keyword(),
        }
    }

    fn string(&mut self) -> Result<String, &'static str> {
        let quote = self.bytes[self.pos];
        self.pos += 1;
        let mut out = String::new();
        let mut chunk_start = self.pos;
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            if c == quote {
                out.push_str(&self.source[chunk_start..self.pos]);
                self.pos += 1;
                return Ok(out);
            }
            if c == b'\\'
                && let Some(escaped) = self.bytes.get(self.pos + 1).filter(|b| b.is_ascii())
            {
                out.push_str(&self.source[chunk_start..self.pos]);
                out.push(match escaped {
                    b'n' => '\n',
                    b't' => '\t',
                    other => char::from(*other),
                });
                self.pos += 2;
                chunk_start = self.pos;
                continue;
            }
            self.pos += 1;
        }
        Err("unterminated string")
    }

    fn number(&mut self) -> Result<Literal, &'static str> {
        let start = self.pos;
        if matches!(self.bytes[self.pos], b'-' | b'+') {
            self.pos += 1;
        }
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_digit()
                || matches!(self.bytes[self.pos], b'.' | b'e' | b'E' | b'_'))
        {
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];
        if text.parse::<f64>().is_err() && text.replace('_', "").parse::<f64>().is_err() {
            return Err("invalid number");
        }
        Ok(Literal::Number(text.to_string()))
    }

    fn keyword(&mut self) -> Result<Literal, &'static str> {
        let start = self.pos;
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_alphanumeric() || self.bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
        match &self.source[start..self.pos] {
            "True" | "true" => Ok(Literal::Bool(true)),
            "False" | "false" => Ok(Literal::Bool(false)),
            "None" | "null" => Ok(Literal::None),
            _ => Err("not a literal"),
        }
    }

    fn sequence(&mut self, close: u8) -> Result<Vec<Literal>, &'static str> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.value()?);
            if self.eat(b',') {
                continue;
            }
            if self.eat(close) {
                return Ok(items);
            }
            return Err("expected `,` or closing bracket");
        }
    }

    fn map(&mut self) -> Result<Literal, &'static str> {
        let mut entries = Vec::new();
        loop {
            if self.eat(b'}') {
                return Ok(Literal::Map(entries));
            }
            let key = self.value()?;
            if !self.eat(b':') {
                return Err("expected `:` in object");
            }
            let value = self.value()?;
            entries.push((key, value));
            if self.eat(b',') {
                continue;
            }
            if self.eat(b'}') {
                return Ok(Literal::Map(entries));
            }
            return Err("expected `,` or `}`");
        }
    }
}

/// Expand a `t-att` literal into `(name, value)` pairs.
///
/// `False` and `None` values drop the attribute; `True` writes the attribute name as value.
pub fn expand_attributes(spec: &str) -> Result<Vec<(String, String)>, CompileError> {
    let bad = |reason| CompileError::BadAttributeSpec {
        spec: spec.to_string(),
        reason,
    };
    let pairs: Vec<(Literal, Literal)> = match Literal::parse(spec).map_err(bad)? {
        Literal::Map(entries) => entries,
        Literal::Tuple(items) => {
            if items.len() != 2 {
                return Err(bad("tuple must have exactly two elements"));
            }
            let mut items = items.into_iter();
            match (items.next(), items.next()) {
                (Some(k), Some(v)) => vec![(k, v)],
                _ => return Err(bad("tuple must have exactly two elements")),
            }
        }
        Literal::List(items) => {
            if items.len() % 2 != 0 {
                return Err(bad("pair list has odd length"));
            }
            let mut pairs = Vec::with_capacity(items.len() / 2);
            let mut items = items.into_iter();
            while let (Some(k), Some(v)) = (items.next(), items.next()) {
                pairs.push((k, v));
            }
            pairs
        }
        _ => return Err(bad("expected an object, tuple or pair list")),
    };

    let mut out = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        let Literal::Str(name) = key else {
            return Err(bad("attribute names must be strings"));
        };
        let value = match value {
            Literal::Str(s) | Literal::Number(s) => s,
            Literal::Bool(true) => name.clone(),
            Literal::Bool(false) | Literal::None => continue,
            Literal::List(_) | Literal::Tuple(_) | Literal::Map(_) => {
                return Err(bad("attribute values must be scalars"));
            }
        };
        out.push((name, value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_spaces_commas_outside_strings() {
        assert_eq!(normalize(" [1,2,3] "), "[1, 2, 3]");
        assert_eq!(normalize("f(a,   b)"), "f(a, b)");
        assert_eq!(normalize("'a,b' + x"), "'a,b' + x");
        assert_eq!(normalize(r#""it\"s,"+y"#), r#""it\"s,"+y"#);
        assert_eq!(normalize("(1,)"), "(1, )");
    }

    #[test]
    fn format_string_rewrites_hash_spans() {
        assert_eq!(format_string("btn btn-#{kind}"), "btn btn-{{ kind }}");
        assert_eq!(format_string("a-{{ b }}"), "a-{{ b }}");
        assert_eq!(format_string("open #{x"), "open #{x");
    }

    #[test]
    fn expand_three_literal_forms() {
        assert_eq!(
            expand_attributes(r#"{"data-id": 42, 'title': "Hi"}"#).expect("map"),
            vec![
                ("data-id".to_string(), "42".to_string()),
                ("title".to_string(), "Hi".to_string())
            ]
        );
        assert_eq!(
            expand_attributes("('class', 'big')").expect("tuple"),
            vec![("class".to_string(), "big".to_string())]
        );
        assert_eq!(
            expand_attributes("['a', 'x', 'hidden', True, 'gone', None]").expect("list"),
            vec![
                ("a".to_string(), "x".to_string()),
                ("hidden".to_string(), "hidden".to_string())
            ]
        );
    }

    #[test]
    fn malformed_literals_are_rejected() {
        for spec in [
            "['a', 'b', 'c']",
            "('a', 'b', 'c')",
            "{1: 'x'}",
            "record.attrs",
            "{'a': 'b'",
            "{'a': ['b']}",
        ] {
            assert!(
                matches!(
                    expand_attributes(spec),
                    Err(CompileError::BadAttributeSpec { .. })
                ),
                "{spec} should be rejected"
            );
        }
    }
}
