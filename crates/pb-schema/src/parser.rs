//! Hand-written recursive descent parser for `.proto` files.
//!
//! Covers proto2, proto3 and editions syntax as far as the namespace tree
//! needs it: packages, imports, options, messages (fields, maps, oneofs,
//! nested types, reserved and extension ranges), enums and services.
//! Top-level `extend` blocks are parsed and dropped. `group` fields are
//! rejected with [`ParseError::Unsupported`].

use crate::ast::{
    Declaration, EnumDecl, EnumValueDecl, FieldDecl, FieldRule, Import, MAX_FIELD_NUMBER,
    MessageDecl, MethodDecl, OneofDecl, OptionValue, Options, ProtoFile, Reserved, ServiceDecl,
};
use crate::error::ParseError;
use crate::lexer::{Spanned, Token, tokenize};

/// Parses a complete definition file.
///
/// # Errors
///
/// Returns the first [`ParseError`] encountered; no partial result is
/// produced.
///
/// # Examples
///
/// ```
/// use pb_schema::{parse, Declaration};
///
/// let file = parse(r#"
///     syntax = "proto3";
///     package app.User;
///     message Profile { string name = 1; }
/// "#)?;
///
/// assert_eq!(file.package.as_deref(), Some("app.User"));
/// assert!(matches!(&file.declarations[0], Declaration::Message(m) if m.name == "Profile"));
/// # Ok::<(), pb_schema::ParseError>(())
/// ```
pub fn parse(source: &str) -> Result<ProtoFile, ParseError> {
    let tokens = tokenize(source)?;
    Parser::new(&tokens).file()
}

/// Cursor over the token list.
struct Parser<'t> {
    tokens: &'t [Spanned],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Spanned]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_nth(&self, n: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + n).map(|s| &s.token)
    }

    fn peek_is(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s == keyword)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |s| s.line)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(spanned) => ParseError::Unexpected {
                found: spanned.token.describe(),
                expected: expected.to_owned(),
                line: spanned.line,
                column: spanned.column,
            },
            None => ParseError::UnexpectedEof {
                expected: expected.to_owned(),
            },
        }
    }

    fn out_of_range(&self, reason: impl Into<String>) -> ParseError {
        let (line, column) = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .map_or((1, 1), |s| (s.line, s.column));
        ParseError::OutOfRange {
            reason: reason.into(),
            line,
            column,
        }
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek_is(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(&token.describe()))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{keyword}'")))
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Ident(s)) => {
                self.pos += 1;
                Ok(s.clone())
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn string(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Str(s)) => {
                self.pos += 1;
                // adjacent literals concatenate
                let mut out = s.clone();
                while let Some(Token::Str(next)) = self.peek() {
                    self.pos += 1;
                    out.push_str(next);
                }
                Ok(out)
            }
            _ => Err(self.unexpected("string")),
        }
    }

    /// `ident { "." ident }`
    fn full_ident(&mut self) -> Result<String, ParseError> {
        let mut name = self.ident()?;
        while self.peek_is(&Token::Dot) {
            self.pos += 1;
            name.push('.');
            name.push_str(&self.ident()?);
        }
        Ok(name)
    }

    /// Type reference, optionally fully qualified with a leading dot.
    fn type_ref(&mut self) -> Result<String, ParseError> {
        if self.eat(&Token::Dot) {
            Ok(format!(".{}", self.full_ident()?))
        } else {
            self.full_ident()
        }
    }

    fn int(&mut self) -> Result<u64, ParseError> {
        match self.peek() {
            Some(Token::Int(i)) => {
                self.pos += 1;
                Ok(*i)
            }
            _ => Err(self.unexpected("integer")),
        }
    }

    fn signed_int(&mut self) -> Result<i64, ParseError> {
        let negative = if self.eat(&Token::Minus) {
            true
        } else {
            self.eat(&Token::Plus);
            false
        };
        let magnitude = self.int()?;
        let value = i64::try_from(magnitude)
            .map_err(|_| self.out_of_range(format!("{magnitude} does not fit in i64")))?;
        Ok(if negative { -value } else { value })
    }

    fn field_number(&mut self) -> Result<u32, ParseError> {
        let number = self.int()?;
        match u32::try_from(number) {
            Ok(n) if (1..=MAX_FIELD_NUMBER).contains(&i64::from(n)) => Ok(n),
            _ => Err(self.out_of_range(format!(
                "field number {number} is outside 1..={MAX_FIELD_NUMBER}"
            ))),
        }
    }

    fn file(&mut self) -> Result<ProtoFile, ParseError> {
        let mut file = ProtoFile::default();
        while let Some(token) = self.peek() {
            let Token::Ident(keyword) = token else {
                if self.eat(&Token::Semi) {
                    continue;
                }
                return Err(self.unexpected("top-level statement"));
            };
            match keyword.as_str() {
                "syntax" | "edition" => {
                    let line = self.line();
                    let is_syntax = keyword == "syntax";
                    self.pos += 1;
                    self.expect(&Token::Eq)?;
                    let value = self.string()?;
                    self.expect(&Token::Semi)?;
                    let slot = if is_syntax {
                        &mut file.syntax
                    } else {
                        &mut file.edition
                    };
                    if slot.replace(value).is_some() {
                        return Err(ParseError::DuplicateStatement {
                            statement: if is_syntax { "syntax" } else { "edition" },
                            line,
                        });
                    }
                }
                "package" => {
                    let line = self.line();
                    self.pos += 1;
                    let package = self.full_ident()?;
                    self.expect(&Token::Semi)?;
                    if file.package.replace(package).is_some() {
                        return Err(ParseError::DuplicateStatement {
                            statement: "package",
                            line,
                        });
                    }
                }
                "import" => {
                    self.pos += 1;
                    let public = self.eat_keyword("public");
                    let weak = !public && self.eat_keyword("weak");
                    let path = self.string()?;
                    self.expect(&Token::Semi)?;
                    file.imports.push(Import { path, public, weak });
                }
                "option" => self.option_statement(&mut file.options)?,
                "message" => file.declarations.push(Declaration::Message(self.message()?)),
                "enum" => file.declarations.push(Declaration::Enum(self.enumeration()?)),
                "service" => file.declarations.push(Declaration::Service(self.service()?)),
                "extend" => self.skip_extend()?,
                _ => return Err(self.unexpected("top-level statement")),
            }
        }
        Ok(file)
    }

    /// `option name = constant ;`
    fn option_statement(&mut self, options: &mut Options) -> Result<(), ParseError> {
        self.expect_keyword("option")?;
        let name = self.option_name()?;
        self.expect(&Token::Eq)?;
        let value = self.constant()?;
        self.expect(&Token::Semi)?;
        options.insert(name, value);
        Ok(())
    }

    /// `( ident | "(" ["."] fullIdent ")" ) { "." ident }`
    fn option_name(&mut self) -> Result<String, ParseError> {
        let mut name = if self.eat(&Token::LParen) {
            let inner = self.type_ref()?;
            self.expect(&Token::RParen)?;
            format!("({inner})")
        } else {
            self.ident()?
        };
        while self.eat(&Token::Dot) {
            name.push('.');
            if self.eat(&Token::LParen) {
                let inner = self.type_ref()?;
                self.expect(&Token::RParen)?;
                name.push_str(&format!("({inner})"));
            } else {
                name.push_str(&self.ident()?);
            }
        }
        Ok(name)
    }

    fn constant(&mut self) -> Result<OptionValue, ParseError> {
        match self.peek() {
            Some(Token::Str(_)) => self.string().map(OptionValue::Str),
            Some(Token::LBrace) => self.aggregate().map(OptionValue::Aggregate),
            Some(Token::Minus | Token::Plus) => {
                let negative = self.peek_is(&Token::Minus);
                self.pos += 1;
                self.number(negative)
            }
            Some(Token::Int(_) | Token::Float(_)) => self.number(false),
            Some(Token::Ident(s)) => match s.as_str() {
                "true" => {
                    self.pos += 1;
                    Ok(OptionValue::Bool(true))
                }
                "false" => {
                    self.pos += 1;
                    Ok(OptionValue::Bool(false))
                }
                "inf" => {
                    self.pos += 1;
                    Ok(OptionValue::Float(f64::INFINITY))
                }
                "nan" => {
                    self.pos += 1;
                    Ok(OptionValue::Float(f64::NAN))
                }
                _ => self.type_ref().map(OptionValue::Ident),
            },
            Some(Token::Dot) => self.type_ref().map(OptionValue::Ident),
            _ => Err(self.unexpected("constant")),
        }
    }

    fn number(&mut self, negative: bool) -> Result<OptionValue, ParseError> {
        match self.peek() {
            Some(Token::Int(i)) => {
                let i = *i;
                self.pos += 1;
                match (i64::try_from(i), negative) {
                    (Ok(v), false) => Ok(OptionValue::Int(v)),
                    (Ok(v), true) => Ok(OptionValue::Int(-v)),
                    (Err(_), false) => Ok(OptionValue::UInt(i)),
                    (Err(_), true) if i == i64::MIN.unsigned_abs() => Ok(OptionValue::Int(i64::MIN)),
                    (Err(_), true) => Err(self.out_of_range(format!("-{i} does not fit in i64"))),
                }
            }
            Some(Token::Float(f)) => {
                let f = *f;
                self.pos += 1;
                Ok(OptionValue::Float(if negative { -f } else { f }))
            }
            Some(Token::Ident(s)) if s == "inf" || s == "nan" => {
                let f = if s == "inf" { f64::INFINITY } else { f64::NAN };
                self.pos += 1;
                Ok(OptionValue::Float(if negative { -f } else { f }))
            }
            _ => Err(self.unexpected("number")),
        }
    }

    /// A `{ ... }` message literal, returned as space-joined token text.
    fn aggregate(&mut self) -> Result<String, ParseError> {
        self.expect(&Token::LBrace)?;
        let mut depth = 1usize;
        let mut parts = vec!["{".to_owned()];
        while depth > 0 {
            let Some(token) = self.advance() else {
                return Err(self.unexpected("'}'"));
            };
            match token {
                Token::LBrace => depth += 1,
                Token::RBrace => depth -= 1,
                _ => {}
            }
            parts.push(token.text());
        }
        Ok(parts.join(" "))
    }

    /// `[ name = constant { , name = constant } ]`
    fn inline_options(&mut self) -> Result<Options, ParseError> {
        let mut options = Options::new();
        if !self.eat(&Token::LBracket) {
            return Ok(options);
        }
        loop {
            let name = self.option_name()?;
            self.expect(&Token::Eq)?;
            let value = self.constant()?;
            options.insert(name, value);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBracket)?;
        Ok(options)
    }

    fn message(&mut self) -> Result<MessageDecl, ParseError> {
        self.expect_keyword("message")?;
        let mut message = MessageDecl::new(self.ident()?);
        self.expect(&Token::LBrace)?;
        while !self.eat(&Token::RBrace) {
            self.message_item(&mut message)?;
        }
        Ok(message)
    }

    fn message_item(&mut self, message: &mut MessageDecl) -> Result<(), ParseError> {
        let keyword = match self.peek() {
            Some(Token::Semi) => {
                self.pos += 1;
                return Ok(());
            }
            Some(Token::Ident(s)) => s.as_str(),
            _ => return Err(self.unexpected("message element")),
        };
        // A keyword followed by '=' or '.' is a field type, not a statement.
        let is_statement = !matches!(self.peek_nth(1), Some(Token::Dot));
        match keyword {
            "option" if is_statement => self.option_statement(&mut message.options),
            "message" if self.peek_nth(2) == Some(&Token::LBrace) => {
                let nested = self.message()?;
                message.nested.push(Declaration::Message(nested));
                Ok(())
            }
            "enum" if self.peek_nth(2) == Some(&Token::LBrace) => {
                let nested = self.enumeration()?;
                message.nested.push(Declaration::Enum(nested));
                Ok(())
            }
            "oneof" if self.peek_nth(2) == Some(&Token::LBrace) => self.oneof(message),
            "extend" if is_statement => self.skip_extend(),
            "extensions" if is_statement => {
                self.pos += 1;
                let ranges = self.ranges()?;
                let _ = self.inline_options()?;
                self.expect(&Token::Semi)?;
                message.extensions.extend(ranges);
                Ok(())
            }
            "reserved" if is_statement => {
                self.pos += 1;
                let reserved = self.reserved()?;
                message.reserved.extend(reserved);
                Ok(())
            }
            "map" if self.peek_nth(1) == Some(&Token::LAngle) => {
                let field = self.map_field()?;
                message.fields.push(field);
                Ok(())
            }
            "group" => Err(self.unsupported("group")),
            _ => {
                let field = self.field(true)?;
                message.fields.push(field);
                Ok(())
            }
        }
    }

    fn unsupported(&self, construct: &str) -> ParseError {
        let (line, column) = self
            .tokens
            .get(self.pos)
            .map_or((1, 1), |s| (s.line, s.column));
        ParseError::Unsupported {
            construct: construct.to_owned(),
            line,
            column,
        }
    }

    /// `[label] type name = number [options] ;`
    fn field(&mut self, allow_label: bool) -> Result<FieldDecl, ParseError> {
        let mut rule = None;
        if allow_label {
            // the label keyword is followed by a type, never by '='
            let next_is_type = !matches!(self.peek_nth(1), Some(Token::Eq) | None);
            if next_is_type {
                if self.eat_keyword("optional") {
                    rule = Some(FieldRule::Optional);
                } else if self.eat_keyword("required") {
                    rule = Some(FieldRule::Required);
                } else if self.eat_keyword("repeated") {
                    rule = Some(FieldRule::Repeated);
                }
            }
        }
        if self.peek_keyword("group") {
            return Err(self.unsupported("group"));
        }
        let type_name = self.type_ref()?;
        let name = self.ident()?;
        self.expect(&Token::Eq)?;
        let number = self.field_number()?;
        let options = self.inline_options()?;
        self.expect(&Token::Semi)?;
        Ok(FieldDecl {
            name,
            number,
            type_name,
            key_type: None,
            rule,
            options,
        })
    }

    /// `map < keyType , type > name = number [options] ;`
    fn map_field(&mut self) -> Result<FieldDecl, ParseError> {
        self.expect_keyword("map")?;
        self.expect(&Token::LAngle)?;
        let key_type = self.ident()?;
        self.expect(&Token::Comma)?;
        let type_name = self.type_ref()?;
        self.expect(&Token::RAngle)?;
        let name = self.ident()?;
        self.expect(&Token::Eq)?;
        let number = self.field_number()?;
        let options = self.inline_options()?;
        self.expect(&Token::Semi)?;
        Ok(FieldDecl {
            name,
            number,
            type_name,
            key_type: Some(key_type),
            rule: None,
            options,
        })
    }

    fn oneof(&mut self, message: &mut MessageDecl) -> Result<(), ParseError> {
        self.expect_keyword("oneof")?;
        let mut oneof = OneofDecl {
            name: self.ident()?,
            fields: Vec::new(),
            options: Options::new(),
        };
        self.expect(&Token::LBrace)?;
        while !self.eat(&Token::RBrace) {
            if self.eat(&Token::Semi) {
                continue;
            }
            if self.peek_keyword("option") && self.peek_nth(1) != Some(&Token::Dot) {
                self.option_statement(&mut oneof.options)?;
                continue;
            }
            let field = if self.peek_keyword("map") && self.peek_nth(1) == Some(&Token::LAngle) {
                self.map_field()?
            } else {
                self.field(false)?
            };
            oneof.fields.push(field.name.clone());
            message.fields.push(field);
        }
        message.oneofs.push(oneof);
        Ok(())
    }

    /// `range { , range }` where `range = int [ to ( int | max ) ]`
    fn ranges(&mut self) -> Result<Vec<(i64, i64)>, ParseError> {
        let mut ranges = Vec::new();
        loop {
            let start = self.signed_int()?;
            let end = if self.eat_keyword("to") {
                if self.eat_keyword("max") {
                    MAX_FIELD_NUMBER
                } else {
                    self.signed_int()?
                }
            } else {
                start
            };
            ranges.push((start, end));
            if !self.eat(&Token::Comma) {
                return Ok(ranges);
            }
        }
    }

    /// `reserved ( ranges | names ) ;` (keyword already consumed)
    fn reserved(&mut self) -> Result<Vec<Reserved>, ParseError> {
        let reserved = match self.peek() {
            Some(Token::Str(_) | Token::Ident(_)) => {
                let mut names = Vec::new();
                loop {
                    let name = match self.peek() {
                        Some(Token::Str(_)) => self.string()?,
                        _ => self.ident()?,
                    };
                    names.push(Reserved::Name(name));
                    if !self.eat(&Token::Comma) {
                        break names;
                    }
                }
            }
            _ => self
                .ranges()?
                .into_iter()
                .map(|(start, end)| Reserved::Range(start, end))
                .collect(),
        };
        self.expect(&Token::Semi)?;
        Ok(reserved)
    }

    fn enumeration(&mut self) -> Result<EnumDecl, ParseError> {
        self.expect_keyword("enum")?;
        let mut decl = EnumDecl::new(self.ident()?);
        self.expect(&Token::LBrace)?;
        while !self.eat(&Token::RBrace) {
            if self.eat(&Token::Semi) {
                continue;
            }
            let next_is_eq = self.peek_nth(1) == Some(&Token::Eq);
            if self.peek_keyword("option") && !next_is_eq {
                self.option_statement(&mut decl.options)?;
            } else if self.peek_keyword("reserved") && !next_is_eq {
                self.pos += 1;
                let reserved = self.reserved()?;
                decl.reserved.extend(reserved);
            } else {
                let name = self.ident()?;
                self.expect(&Token::Eq)?;
                let number = self.signed_int()?;
                let number = i32::try_from(number)
                    .map_err(|_| self.out_of_range(format!("enum value {number} does not fit in i32")))?;
                let options = self.inline_options()?;
                self.expect(&Token::Semi)?;
                decl.values.push(EnumValueDecl {
                    name,
                    number,
                    options,
                });
            }
        }
        Ok(decl)
    }

    fn service(&mut self) -> Result<ServiceDecl, ParseError> {
        self.expect_keyword("service")?;
        let mut service = ServiceDecl {
            name: self.ident()?,
            ..ServiceDecl::default()
        };
        self.expect(&Token::LBrace)?;
        while !self.eat(&Token::RBrace) {
            if self.eat(&Token::Semi) {
                continue;
            }
            if self.peek_keyword("option") {
                self.option_statement(&mut service.options)?;
            } else if self.peek_keyword("rpc") {
                let method = self.method()?;
                service.methods.push(method);
            } else {
                return Err(self.unexpected("'rpc' or 'option'"));
            }
        }
        Ok(service)
    }

    fn method(&mut self) -> Result<MethodDecl, ParseError> {
        self.expect_keyword("rpc")?;
        let name = self.ident()?;
        let (request_stream, request_type) = self.method_type()?;
        self.expect_keyword("returns")?;
        let (response_stream, response_type) = self.method_type()?;
        let mut options = Options::new();
        if self.eat(&Token::LBrace) {
            while !self.eat(&Token::RBrace) {
                if self.eat(&Token::Semi) {
                    continue;
                }
                self.option_statement(&mut options)?;
            }
        } else {
            self.expect(&Token::Semi)?;
        }
        Ok(MethodDecl {
            name,
            request_type,
            request_stream,
            response_type,
            response_stream,
            options,
        })
    }

    /// `( [stream] type )`
    fn method_type(&mut self) -> Result<(bool, String), ParseError> {
        self.expect(&Token::LParen)?;
        let stream = self.peek_keyword("stream")
            && !matches!(self.peek_nth(1), Some(Token::RParen | Token::Dot))
            && self.eat_keyword("stream");
        let type_name = self.type_ref()?;
        self.expect(&Token::RParen)?;
        Ok((stream, type_name))
    }

    /// `extend Type { ... }` is accepted and discarded.
    fn skip_extend(&mut self) -> Result<(), ParseError> {
        self.expect_keyword("extend")?;
        let _ = self.type_ref()?;
        self.expect(&Token::LBrace)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.advance() {
                Some(Token::LBrace) => depth += 1,
                Some(Token::RBrace) => depth -= 1,
                Some(_) => {}
                None => return Err(self.unexpected("'}'")),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(decl: &Declaration) -> &MessageDecl {
        match decl {
            Declaration::Message(m) => m,
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_header() {
        let file = parse(
            r#"
            syntax = "proto3";
            package app.User;
            import public "common.proto";
            import "other.proto";
            option java_package = "com.example";
            option optimize_for = SPEED;
            "#,
        )
        .unwrap();

        assert_eq!(file.syntax.as_deref(), Some("proto3"));
        assert_eq!(file.package.as_deref(), Some("app.User"));
        assert_eq!(file.imports.len(), 2);
        assert!(file.imports[0].public);
        assert!(!file.imports[1].public);
        assert_eq!(
            file.options.get("java_package"),
            Some(&OptionValue::Str("com.example".to_owned()))
        );
        assert_eq!(
            file.options.get("optimize_for"),
            Some(&OptionValue::Ident("SPEED".to_owned()))
        );
    }

    #[test]
    fn test_parse_message_fields() {
        let file = parse(
            r#"
            message Profile {
                string name = 1;
                repeated int32 scores = 2 [packed = true];
                optional .app.Address address = 3;
                map<string, int64> counters = 4;
                reserved 8, 10 to 12;
                reserved "legacy";
                option deprecated = true;
            }
            "#,
        )
        .unwrap();

        let profile = message(&file.declarations[0]);
        assert_eq!(profile.fields.len(), 4);
        assert_eq!(profile.fields[0].type_name, "string");
        assert_eq!(profile.fields[1].rule, Some(FieldRule::Repeated));
        assert_eq!(
            profile.fields[1].options.get("packed"),
            Some(&OptionValue::Bool(true))
        );
        assert_eq!(profile.fields[2].type_name, ".app.Address");
        assert_eq!(profile.fields[2].rule, Some(FieldRule::Optional));
        assert_eq!(profile.fields[3].key_type.as_deref(), Some("string"));
        assert_eq!(
            profile.reserved,
            vec![
                Reserved::Range(8, 8),
                Reserved::Range(10, 12),
                Reserved::Name("legacy".to_owned()),
            ]
        );
        assert_eq!(
            profile.options.get("deprecated"),
            Some(&OptionValue::Bool(true))
        );
    }

    #[test]
    fn test_parse_nested_and_oneof() {
        let file = parse(
            r"
            message Order {
                message Line { int32 qty = 1; }
                enum State { NEW = 0; DONE = 1; }
                oneof payment {
                    string card = 2;
                    string iban = 3;
                }
                extensions 100 to max;
            }
            ",
        )
        .unwrap();

        let order = message(&file.declarations[0]);
        assert_eq!(order.nested.len(), 2);
        assert_eq!(order.nested[0].name(), "Line");
        assert_eq!(order.nested[1].name(), "State");
        assert_eq!(order.oneofs[0].name, "payment");
        assert_eq!(order.oneofs[0].fields, vec!["card", "iban"]);
        assert_eq!(order.fields.len(), 2);
        assert_eq!(order.extensions, vec![(100, MAX_FIELD_NUMBER)]);
    }

    #[test]
    fn test_parse_enum_and_service() {
        let file = parse(
            r"
            enum Status {
                option allow_alias = true;
                UNKNOWN = 0;
                ACTIVE = 1;
                RUNNING = 1 [deprecated = true];
                NEGATIVE = -2;
            }
            service Users {
                rpc Get (GetRequest) returns (User);
                rpc Watch (stream Filter) returns (stream User) {
                    option idempotency_level = NO_SIDE_EFFECTS;
                }
            }
            ",
        )
        .unwrap();

        let Declaration::Enum(status) = &file.declarations[0] else {
            panic!("expected enum");
        };
        assert_eq!(status.values.len(), 4);
        assert_eq!(status.values[3].number, -2);
        assert_eq!(
            status.options.get("allow_alias"),
            Some(&OptionValue::Bool(true))
        );

        let Declaration::Service(users) = &file.declarations[1] else {
            panic!("expected service");
        };
        assert_eq!(users.methods.len(), 2);
        assert!(!users.methods[0].request_stream);
        assert!(users.methods[1].request_stream);
        assert!(users.methods[1].response_stream);
        assert_eq!(users.methods[1].request_type, "Filter");
        assert_eq!(users.methods[1].options.len(), 1);
    }

    #[test]
    fn test_keywords_as_identifiers() {
        let file = parse(
            r"
            message message {
                string option = 1;
                int32 message = 2;
                enum.Kind kind = 3;
            }
            ",
        )
        .unwrap();
        let decl = message(&file.declarations[0]);
        assert_eq!(decl.name, "message");
        assert_eq!(decl.fields[0].name, "option");
        assert_eq!(decl.fields[1].name, "message");
        assert_eq!(decl.fields[2].type_name, "enum.Kind");
    }

    #[test]
    fn test_extend_is_skipped() {
        let file = parse(
            r"
            extend google.protobuf.FieldOptions { string tag = 5000; }
            message A {}
            ",
        )
        .unwrap();
        assert_eq!(file.declarations.len(), 1);
    }

    #[test]
    fn test_aggregate_option() {
        let file = parse(r#"option (my.opt) = { name: "x" count: 2 };"#).unwrap();
        assert_eq!(
            file.options.get("(my.opt)"),
            Some(&OptionValue::Aggregate(r#"{ name : "x" count : 2 }"#.to_owned()))
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse("message {"),
            Err(ParseError::Unexpected { .. })
        ));
        assert!(matches!(
            parse("message A { string a = 1"),
            Err(ParseError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            parse("message A { string a = 0; }"),
            Err(ParseError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse("message A { optional group G = 1 {} }"),
            Err(ParseError::Unsupported { .. })
        ));
        assert!(matches!(
            parse("package a; package b;"),
            Err(ParseError::DuplicateStatement {
                statement: "package",
                line: 1
            })
        ));
        assert!(matches!(parse("garbage"), Err(ParseError::Unexpected { .. })));
    }
}
