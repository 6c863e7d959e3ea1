//! Lexical analysis for `.proto` definition files.
//!
//! Tokenization is done with logos. Comments and whitespace are skipped.
//! Keywords are not separate tokens: protobuf lets most keywords double as
//! identifiers (`message message = 1;` is legal), so the parser decides by
//! context.

use logos::{FilterResult, Logos};

use crate::error::ParseError;

/// A `.proto` token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    /// Identifier or keyword.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),

    /// Unsigned integer literal (decimal, hex, or octal). Signs are parsed
    /// as separate tokens.
    #[regex(r"[1-9][0-9]*", |lex| lex.slice().parse::<u64>().ok())]
    #[regex(r"0[0-7]*", |lex| u64::from_str_radix(lex.slice(), 8).ok())]
    #[regex(r"0[xX][0-9A-Fa-f]+", |lex| u64::from_str_radix(&lex.slice()[2..], 16).ok())]
    Int(u64),

    /// Floating point literal.
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    /// String literal with escapes resolved.
    #[regex(r#""([^"\\\n]|\\.)*""#, unquote)]
    #[regex(r"'([^'\\\n]|\\.)*'", unquote)]
    Str(String),

    /// Block comment. Skipped by its callback, never emitted.
    #[token("/*", block_comment)]
    BlockComment,

    /// `{`
    #[token("{")]
    LBrace,
    /// `}`
    #[token("}")]
    RBrace,
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `[`
    #[token("[")]
    LBracket,
    /// `]`
    #[token("]")]
    RBracket,
    /// `<`
    #[token("<")]
    LAngle,
    /// `>`
    #[token(">")]
    RAngle,
    /// `;`
    #[token(";")]
    Semi,
    /// `,`
    #[token(",")]
    Comma,
    /// `=`
    #[token("=")]
    Eq,
    /// `.`
    #[token(".")]
    Dot,
    /// `:`
    #[token(":")]
    Colon,
    /// `-`
    #[token("-")]
    Minus,
    /// `+`
    #[token("+")]
    Plus,
}

impl Token {
    /// Short human-readable description for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Ident(s) => format!("identifier '{s}'"),
            Self::Int(i) => format!("integer {i}"),
            Self::Float(f) => format!("float {f}"),
            Self::Str(s) => format!("string \"{s}\""),
            Self::BlockComment => "comment".to_owned(),
            Self::LBrace => "'{'".to_owned(),
            Self::RBrace => "'}'".to_owned(),
            Self::LParen => "'('".to_owned(),
            Self::RParen => "')'".to_owned(),
            Self::LBracket => "'['".to_owned(),
            Self::RBracket => "']'".to_owned(),
            Self::LAngle => "'<'".to_owned(),
            Self::RAngle => "'>'".to_owned(),
            Self::Semi => "';'".to_owned(),
            Self::Comma => "','".to_owned(),
            Self::Eq => "'='".to_owned(),
            Self::Dot => "'.'".to_owned(),
            Self::Colon => "':'".to_owned(),
            Self::Minus => "'-'".to_owned(),
            Self::Plus => "'+'".to_owned(),
        }
    }

    /// Source-like spelling, used when aggregate option values are kept as text.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Ident(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Str(s) => format!("{s:?}"),
            Self::BlockComment => String::new(),
            Self::LBrace => "{".to_owned(),
            Self::RBrace => "}".to_owned(),
            Self::LParen => "(".to_owned(),
            Self::RParen => ")".to_owned(),
            Self::LBracket => "[".to_owned(),
            Self::RBracket => "]".to_owned(),
            Self::LAngle => "<".to_owned(),
            Self::RAngle => ">".to_owned(),
            Self::Semi => ";".to_owned(),
            Self::Comma => ",".to_owned(),
            Self::Eq => "=".to_owned(),
            Self::Dot => ".".to_owned(),
            Self::Colon => ":".to_owned(),
            Self::Minus => "-".to_owned(),
            Self::Plus => "+".to_owned(),
        }
    }
}

/// A token with its 1-based source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    /// The token.
    pub token: Token,
    /// Line of the first character.
    pub line: usize,
    /// Column of the first character.
    pub column: usize,
}

/// Tokenizes a whole source file.
///
/// # Errors
///
/// Returns [`ParseError::InvalidToken`] at the first unrecognized character
/// sequence (including integers too large for `u64`).
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ParseError> {
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect();
    let position = |offset: usize| {
        let line = line_starts.partition_point(|&start| start <= offset);
        let column = offset - line_starts[line - 1] + 1;
        (line, column)
    };

    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        let (line, column) = position(lexer.span().start);
        match result {
            Ok(token) => tokens.push(Spanned {
                token,
                line,
                column,
            }),
            Err(()) => return Err(ParseError::InvalidToken { line, column }),
        }
    }
    Ok(tokens)
}

/// Skips to the end of a `/* ... */` comment. An unterminated comment is an
/// error at its opening `/*`.
fn block_comment(lex: &mut logos::Lexer<Token>) -> FilterResult<(), ()> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => {
            lex.bump(lex.remainder().len());
            FilterResult::Error(())
        }
    }
}

/// Strips quotes and resolves escape sequences.
fn unquote(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '0' => out.push('\0'),
            other => out.push(other),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_skips_comments() {
        let toks = tokens("// line\nmessage /* block\n * more */ Foo {}");
        assert_eq!(
            toks,
            vec![
                Token::Ident("message".to_owned()),
                Token::Ident("Foo".to_owned()),
                Token::LBrace,
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn test_skips_block_comment_styles() {
        let expected = vec![
            Token::Ident("message".to_owned()),
            Token::Ident("A".to_owned()),
            Token::LBrace,
            Token::RBrace,
        ];
        for source in [
            "/* plain */ message A {}",
            "/** doc */ message A {}",
            "/*\n * line one\n * line two\n */ message A {}",
            "/* a * b */ message A {}",
            "/* trailing stars **/ message A {}",
            "/**/ message A {}",
        ] {
            assert_eq!(tokens(source), expected, "{source:?}");
        }
    }

    #[test]
    fn test_block_comment_positions_and_unterminated() {
        let spanned = tokenize("/*\n * doc\n */\nmessage A {}").unwrap();
        assert_eq!((spanned[0].line, spanned[0].column), (4, 1));

        assert_eq!(
            tokenize("message A {} /* open"),
            Err(ParseError::InvalidToken { line: 1, column: 14 })
        );
    }

    #[test]
    fn test_integer_bases() {
        assert_eq!(tokens("42 0x1F 017 0"), vec![
            Token::Int(42),
            Token::Int(31),
            Token::Int(15),
            Token::Int(0),
        ]);
    }

    #[test]
    fn test_floats_and_signs() {
        assert_eq!(tokens("-1.5 .25 2e3"), vec![
            Token::Minus,
            Token::Float(1.5),
            Token::Float(0.25),
            Token::Float(2000.0),
        ]);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(tokens(r#""a\"b" 'c\n'"#), vec![
            Token::Str("a\"b".to_owned()),
            Token::Str("c\n".to_owned()),
        ]);
    }

    #[test]
    fn test_positions() {
        let spanned = tokenize("syntax = \"proto3\";\n  package app;").unwrap();
        let package = &spanned[4];
        assert_eq!(package.token, Token::Ident("package".to_owned()));
        assert_eq!((package.line, package.column), (2, 3));
    }

    #[test]
    fn test_invalid_token() {
        assert_eq!(
            tokenize("message Foo { @ }"),
            Err(ParseError::InvalidToken { line: 1, column: 15 })
        );
    }
}
