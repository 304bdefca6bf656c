//! Token stream for Java source. Lossless: the concatenated token texts
//! always equal the input.

use lathe_api::SyntaxKind;
use logos::Logos;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub offset: u32,
}

impl<'a> Lexeme<'a> {
    pub fn end(&self) -> u32 {
        self.offset + self.text.len() as u32
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == SyntaxKind::Keyword && self.text == keyword
    }

    pub fn is_ident(&self, ident: &str) -> bool {
        self.kind == SyntaxKind::Ident && self.text == ident
    }

    pub fn is_op(&self, op: &str) -> bool {
        self.kind == SyntaxKind::Op && self.text == op
    }
}

fn block_comment(lex: &mut logos::Lexer<RawToken>) {
    let rest = lex.remainder();
    match rest.find("*/") {
        Some(end) => lex.bump(end + 2),
        None => lex.bump(rest.len()),
    }
}

fn text_block(lex: &mut logos::Lexer<RawToken>) {
    let rest = lex.remainder().as_bytes();
    let mut i = 0;
    while i < rest.len() {
        if rest[i] == b'\\' {
            i += 2;
            continue;
        }
        if rest[i..].starts_with(b"\"\"\"") {
            lex.bump(i + 3);
            return;
        }
        i += 1;
    }
    lex.bump(rest.len());
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum RawToken {
    #[regex(r"[ \t\r\n\x0C]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    #[regex(r"[a-zA-Z_$\x{80}-\x{10FFFF}][a-zA-Z0-9_$\x{80}-\x{10FFFF}]*")]
    Word,

    #[regex(r"0[xX][0-9a-fA-F_]+[lL]?")]
    #[regex(r"0[bB][01_]+[lL]?")]
    #[regex(r"[0-9][0-9_]*[lL]?")]
    Int,

    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?[fFdD]?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?[fFdD]?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+[fFdD]?")]
    #[regex(r"[0-9][0-9_]*[fFdD]")]
    Float,

    #[regex(r"'([^'\\\n]|\\[^\n])*'?")]
    Char,

    #[regex(r#""([^"\\\n]|\\[^\n])*"?"#)]
    Str,

    #[token("\"\"\"", text_block)]
    TextBlock,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("@")]
    At,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("::")]
    ColonColon,
    #[token("->")]
    Arrow,
    #[token("&")]
    Amp,
    #[token("*")]
    Star,

    // `>` never glues: `>>` inside type arguments must close two lists.
    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("&&")]
    #[token("||")]
    #[token("++")]
    #[token("--")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("<<")]
    #[token("<<=")]
    #[token(">>=")]
    #[token(">>>=")]
    #[token("+")]
    #[token("-")]
    #[token("/")]
    #[token("%")]
    #[token("^")]
    #[token("|")]
    #[token("!")]
    #[token("~")]
    Op,
}

impl RawToken {
    fn kind(self, text: &str) -> SyntaxKind {
        match self {
            RawToken::Whitespace => SyntaxKind::Whitespace,
            RawToken::LineComment => SyntaxKind::LineComment,
            RawToken::BlockComment => SyntaxKind::BlockComment,
            RawToken::Word if is_reserved(text) => SyntaxKind::Keyword,
            RawToken::Word => SyntaxKind::Ident,
            RawToken::Int => SyntaxKind::IntLiteral,
            RawToken::Float => SyntaxKind::FloatLiteral,
            RawToken::Char => SyntaxKind::CharLiteral,
            RawToken::Str => SyntaxKind::StringLiteral,
            RawToken::TextBlock => SyntaxKind::TextBlock,
            RawToken::LBrace => SyntaxKind::LBrace,
            RawToken::RBrace => SyntaxKind::RBrace,
            RawToken::LParen => SyntaxKind::LParen,
            RawToken::RParen => SyntaxKind::RParen,
            RawToken::LBracket => SyntaxKind::LBracket,
            RawToken::RBracket => SyntaxKind::RBracket,
            RawToken::Semi => SyntaxKind::Semi,
            RawToken::Comma => SyntaxKind::Comma,
            RawToken::Dot => SyntaxKind::Dot,
            RawToken::Ellipsis => SyntaxKind::Ellipsis,
            RawToken::At => SyntaxKind::At,
            RawToken::Eq => SyntaxKind::Eq,
            RawToken::Lt => SyntaxKind::Lt,
            RawToken::Gt => SyntaxKind::Gt,
            RawToken::Question => SyntaxKind::Question,
            RawToken::Colon => SyntaxKind::Colon,
            RawToken::ColonColon => SyntaxKind::ColonColon,
            RawToken::Arrow => SyntaxKind::Arrow,
            RawToken::Amp => SyntaxKind::Amp,
            RawToken::Star => SyntaxKind::Star,
            RawToken::Op => SyntaxKind::Op,
        }
    }
}

const RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "null", "package", "private", "protected", "public", "return", "short",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "true", "try", "void", "volatile", "while",
];

pub fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

pub fn is_primitive(word: &str) -> bool {
    matches!(
        word,
        "boolean" | "byte" | "char" | "short" | "int" | "long" | "float" | "double" | "void"
    )
}

/// Splits `text` into tokens. Characters no rule accepts become `Error`
/// tokens so nothing is lost.
pub fn lex(text: &str) -> Vec<Lexeme<'_>> {
    let mut out = Vec::with_capacity(text.len() / 4 + 1);
    let mut lexer = RawToken::lexer(text);
    let mut last = 0usize;
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        if span.start > last {
            out.push(Lexeme {
                kind: SyntaxKind::Error,
                text: &text[last..span.start],
                offset: last as u32,
            });
        }
        let slice = &text[span.clone()];
        let kind = match result {
            Ok(raw) => raw.kind(slice),
            Err(()) => SyntaxKind::Error,
        };
        out.push(Lexeme {
            kind,
            text: slice,
            offset: span.start as u32,
        });
        last = span.end;
    }
    if last < text.len() {
        out.push(Lexeme {
            kind: SyntaxKind::Error,
            text: &text[last..],
            offset: last as u32,
        });
    }
    out
}

/// Tokens without trivia.
pub fn significant(text: &str) -> Vec<Lexeme<'_>> {
    lex(text)
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .collect()
}
