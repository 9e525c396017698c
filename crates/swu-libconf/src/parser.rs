//! libconfig text parser.
//!
//! Supports settings (`name = value;` or `name : value;`), groups, lists,
//! arrays, strings with escapes and adjacent-literal concatenation,
//! decimal and hex integers with an optional `L`/`LL` suffix, floats,
//! booleans and `#`, `//` and `/* */` comments. `@include` is not
//! supported.

use thiserror::Error;

use crate::node::{Group, Node, Scalar, Sequence, SequenceKind};

/// Parse failure with a 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Parse a whole document into its top-level group.
pub fn parse(text: &str) -> Result<Group, ParseError> {
    let mut parser = Parser {
        src: text.as_bytes(),
        pos: 0,
    };
    parser.parse_settings(None)
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> ParseError {
        let consumed = &self.src[..self.pos.min(self.src.len())];
        let line = consumed.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = consumed
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |p| p + 1);
        ParseError {
            line,
            column: self.pos - line_start + 1,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'#') => self.skip_line(),
                Some(b'/') if self.peek_at(1) == Some(b'/') => self.skip_line(),
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        match self.peek() {
                            None => {
                                self.pos = start;
                                return Err(self.error("unterminated comment"));
                            }
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.pos += 2;
                                break;
                            }
                            Some(_) => self.pos += 1,
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'\n' {
                break;
            }
        }
    }

    /// Parse settings until `close` (or end of input for the top level).
    fn parse_settings(&mut self, close: Option<u8>) -> Result<Group, ParseError> {
        let mut group = Group::new();
        loop {
            self.skip_trivia()?;
            match (self.peek(), close) {
                (None, None) => break,
                (None, Some(c)) => {
                    return Err(self.error(format!("expected '{}' before end of input", c as char)))
                }
                (Some(b), Some(c)) if b == c => {
                    self.pos += 1;
                    break;
                }
                _ => {}
            }

            let name_pos = self.pos;
            let name = self.parse_name()?;
            self.skip_trivia()?;
            match self.peek() {
                Some(b'=') | Some(b':') => self.pos += 1,
                _ => return Err(self.error(format!("expected '=' or ':' after '{}'", name))),
            }
            self.skip_trivia()?;
            let value = self.parse_value()?;
            self.skip_trivia()?;
            if matches!(self.peek(), Some(b';') | Some(b',')) {
                self.pos += 1;
            }

            if group.contains_key(&name) {
                self.pos = name_pos;
                return Err(self.error(format!("duplicate setting '{}'", name)));
            }
            group.push(name, value);
        }
        Ok(group)
    }

    fn parse_name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() || b == b'*' => self.pos += 1,
            _ => return Err(self.error("expected setting name")),
        }
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'*') {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(String::from_utf8_lossy(&self.src[start..self.pos]).into_owned())
    }

    fn parse_value(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            Some(b'{') => {
                self.pos += 1;
                Ok(Node::Mapping(self.parse_settings(Some(b'}'))?))
            }
            Some(b'(') => {
                self.pos += 1;
                Ok(Node::Sequence(self.parse_sequence(b')', SequenceKind::List)?))
            }
            Some(b'[') => {
                self.pos += 1;
                Ok(Node::Sequence(self.parse_sequence(b']', SequenceKind::Array)?))
            }
            Some(b'"') => Ok(Node::Scalar(Scalar::Str(self.parse_strings()?))),
            Some(_) => Ok(Node::Scalar(self.parse_literal()?)),
            None => Err(self.error("expected value before end of input")),
        }
    }

    fn parse_sequence(&mut self, close: u8, kind: SequenceKind) -> Result<Sequence, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(close) {
                self.pos += 1;
                break;
            }
            let item_pos = self.pos;
            let item = self.parse_value()?;
            if kind == SequenceKind::Array && !matches!(item, Node::Scalar(_)) {
                self.pos = item_pos;
                return Err(self.error("arrays may only contain scalar values"));
            }
            items.push(item);

            self.skip_trivia()?;
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b) if b == close => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    return Err(self.error(format!("expected ',' or '{}'", close as char)));
                }
            }
        }
        Ok(Sequence { kind, items })
    }

    /// One or more adjacent string literals, concatenated.
    fn parse_strings(&mut self) -> Result<String, ParseError> {
        let mut out = Vec::new();
        loop {
            self.parse_string_into(&mut out)?;
            let after = self.pos;
            self.skip_trivia()?;
            if self.peek() != Some(b'"') {
                self.pos = after;
                break;
            }
        }
        String::from_utf8(out).map_err(|_| self.error("string is not valid UTF-8"))
    }

    fn parse_string_into(&mut self, out: &mut Vec<u8>) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 1; // opening quote
        loop {
            let Some(b) = self.peek() else {
                self.pos = start;
                return Err(self.error("unterminated string"));
            };
            self.pos += 1;
            match b {
                b'"' => return Ok(()),
                b'\\' => {
                    let Some(esc) = self.peek() else {
                        self.pos = start;
                        return Err(self.error("unterminated string"));
                    };
                    self.pos += 1;
                    match esc {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'f' => out.push(0x0C),
                        b'\\' => out.push(b'\\'),
                        b'"' => out.push(b'"'),
                        b'x' => {
                            let digits = self
                                .src
                                .get(self.pos..self.pos + 2)
                                .and_then(|d| std::str::from_utf8(d).ok())
                                .and_then(|d| u8::from_str_radix(d, 16).ok());
                            match digits {
                                Some(v) => {
                                    out.push(v);
                                    self.pos += 2;
                                }
                                None => return Err(self.error("invalid \\x escape")),
                            }
                        }
                        other => {
                            out.push(b'\\');
                            out.push(other);
                        }
                    }
                }
                _ => out.push(b),
            }
        }
    }

    /// Booleans, integers and floats.
    fn parse_literal(&mut self) -> Result<Scalar, ParseError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'+' | b'-' | b'_') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let token = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        let scalar = parse_literal_token(&token);
        if scalar.is_none() {
            self.pos = start;
        }
        scalar.ok_or_else(|| self.error(format!("invalid value '{}'", token)))
    }
}

fn parse_literal_token(token: &str) -> Option<Scalar> {
    if token.eq_ignore_ascii_case("true") {
        return Some(Scalar::Bool(true));
    }
    if token.eq_ignore_ascii_case("false") {
        return Some(Scalar::Bool(false));
    }

    let trimmed = token
        .strip_suffix("LL")
        .or_else(|| token.strip_suffix('L'))
        .unwrap_or(token);
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        let value = i64::from_str_radix(hex, 16)
            .ok()
            .or_else(|| u64::from_str_radix(hex, 16).ok().map(|v| v as i64))?;
        // libconfig wraps out-of-range hex literals
        return Some(Scalar::Int(if negative { value.wrapping_neg() } else { value }));
    }

    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed.parse::<i64>().ok().map(Scalar::Int);
    }

    if token.contains(['.', 'e', 'E']) {
        return token.parse::<f64>().ok().map(Scalar::Float);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SW_DESCRIPTION: &str = r#"
software =
{
    version = "0.1.0";
    description = "Firmware update"
                  " for board";

    hardware-compatibility: [ "1.0", "1.2" ];

    /* stable set */
    stable = {
        images: (
            {
                filename = "rootfs.ext4";
                device = "/dev/mmcblk0p2";
                compressed = "zlib";
                encrypted = true;
                offset = 0x100;
                size = 4294967296L;
                ratio = 1.5;
            },
            {
                filename = "uImage"; // kernel
                volume = "kernel"
            }
        );
    };
};
"#;

    #[test]
    fn test_parse_sw_description() {
        let root = parse(SW_DESCRIPTION).unwrap();
        let software = root.get("software").unwrap().as_group().unwrap();
        assert_eq!(software.get_str("version"), Some("0.1.0"));
        assert_eq!(
            software.get_str("description"),
            Some("Firmware update for board")
        );

        let hw = software
            .get("hardware-compatibility")
            .unwrap()
            .as_sequence()
            .unwrap();
        assert_eq!(hw.kind, SequenceKind::Array);
        assert_eq!(hw.items.len(), 2);

        let images = software
            .get("stable")
            .and_then(Node::as_group)
            .and_then(|g| g.get("images"))
            .and_then(Node::as_sequence)
            .unwrap();
        assert_eq!(images.kind, SequenceKind::List);
        let first = images.items[0].as_group().unwrap();
        assert_eq!(first.get_str("filename"), Some("rootfs.ext4"));
        assert_eq!(first.get_bool("encrypted"), Some(true));
        assert_eq!(first.get("offset"), Some(&Node::Scalar(Scalar::Int(0x100))));
        assert_eq!(
            first.get("size"),
            Some(&Node::Scalar(Scalar::Int(4_294_967_296)))
        );
        assert_eq!(first.get("ratio"), Some(&Node::Scalar(Scalar::Float(1.5))));
        let second = images.items[1].as_group().unwrap();
        assert_eq!(second.get_str("volume"), Some("kernel"));
    }

    #[test]
    fn test_string_escapes() {
        let root = parse(r#"s = "a\tb\nc\\d\"e\x41";"#).unwrap();
        assert_eq!(root.get_str("s"), Some("a\tb\nc\\d\"eA"));
    }

    #[test]
    fn test_literal_newline_in_string() {
        let root = parse("script = \"line1\n\tline2\";").unwrap();
        assert_eq!(root.get_str("script"), Some("line1\n\tline2"));
    }

    #[test]
    fn test_duplicate_setting_rejected() {
        let err = parse("a = 1;\na = 2;").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("duplicate"));
    }

    #[test]
    fn test_unterminated_group() {
        let err = parse("software = { version = \"1\";").unwrap_err();
        assert!(err.message.contains("'}'"));
    }

    #[test]
    fn test_invalid_literal_position() {
        let err = parse("a = 1;\nb = @oops;").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 5);
    }

    #[test]
    fn test_array_rejects_groups() {
        assert!(parse("a = [ { b = 1; } ];").is_err());
    }

    #[test]
    fn test_empty_containers_and_trailing_comma() {
        let root = parse("a = (); b = {}; c = ( 1, 2, );").unwrap();
        assert!(root.get("a").unwrap().as_sequence().unwrap().items.is_empty());
        assert!(root.get("b").unwrap().as_group().unwrap().is_empty());
        assert_eq!(root.get("c").unwrap().as_sequence().unwrap().items.len(), 2);
    }

    #[test]
    fn test_booleans_case_insensitive() {
        let root = parse("a = TRUE; b = False;").unwrap();
        assert_eq!(root.get_bool("a"), Some(true));
        assert_eq!(root.get_bool("b"), Some(false));
    }

    #[test]
    fn test_hex_literals_wrap() {
        let root = parse("a = -0x8000000000000000; b = 0xFFFFFFFFFFFFFFFF; c = -0x10;").unwrap();
        assert_eq!(root.get("a"), Some(&Node::Scalar(Scalar::Int(i64::MIN))));
        assert_eq!(root.get("b"), Some(&Node::Scalar(Scalar::Int(-1))));
        assert_eq!(root.get("c"), Some(&Node::Scalar(Scalar::Int(-16))));
    }
}
