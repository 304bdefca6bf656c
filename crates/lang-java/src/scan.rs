//! Lookahead helpers over significant tokens, shared by the parser and the
//! fast skeleton scanner so both carve declarations the same way.

use crate::lexer::{Lexeme, is_primitive};
use lathe_api::{ClassFlavor, SyntaxKind};

/// For every opening bracket, the index of its closer; `len` when unclosed.
/// Each bracket type is matched on its own stack.
pub fn match_groups(tokens: &[Lexeme<'_>]) -> Vec<u32> {
    let len = tokens.len() as u32;
    let mut matches = vec![len; tokens.len()];
    let mut braces = Vec::new();
    let mut parens = Vec::new();
    let mut brackets = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            SyntaxKind::LBrace => braces.push(i),
            SyntaxKind::LParen => parens.push(i),
            SyntaxKind::LBracket => brackets.push(i),
            SyntaxKind::RBrace => {
                if let Some(open) = braces.pop() {
                    matches[open] = i as u32;
                }
            }
            SyntaxKind::RParen => {
                if let Some(open) = parens.pop() {
                    matches[open] = i as u32;
                }
            }
            SyntaxKind::RBracket => {
                if let Some(open) = brackets.pop() {
                    matches[open] = i as u32;
                }
            }
            _ => {}
        }
    }
    matches
}

pub struct Groups<'t, 'a> {
    pub tokens: &'t [Lexeme<'a>],
    matches: Vec<u32>,
}

impl<'t, 'a> Groups<'t, 'a> {
    pub fn new(tokens: &'t [Lexeme<'a>]) -> Self {
        Self {
            matches: match_groups(tokens),
            tokens,
        }
    }

    pub fn kind(&self, i: usize) -> Option<SyntaxKind> {
        self.tokens.get(i).map(|t| t.kind)
    }

    pub fn is(&self, i: usize, kind: SyntaxKind) -> bool {
        self.kind(i) == Some(kind)
    }

    pub fn is_keyword(&self, i: usize, keyword: &str) -> bool {
        self.tokens.get(i).is_some_and(|t| t.is_keyword(keyword))
    }

    /// Index just past the group opened at `open`.
    pub fn group_end(&self, open: usize) -> usize {
        match self.matches.get(open) {
            Some(&close) if (close as usize) < self.tokens.len() => close as usize + 1,
            _ => self.tokens.len(),
        }
    }

    /// `<...>` starting at `start` when it reads as type parameters or
    /// arguments. `None` as soon as a token appears that no type could hold.
    pub fn angle_end(&self, start: usize) -> Option<usize> {
        if !self.is(start, SyntaxKind::Lt) {
            return None;
        }
        let mut depth = 0usize;
        let mut i = start;
        while i < self.tokens.len() {
            let token = &self.tokens[i];
            match token.kind {
                SyntaxKind::Lt => depth += 1,
                SyntaxKind::Gt => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                SyntaxKind::At => {
                    i = self.annotation_end(i)?;
                    continue;
                }
                SyntaxKind::Ident
                | SyntaxKind::Dot
                | SyntaxKind::Comma
                | SyntaxKind::Question
                | SyntaxKind::Amp
                | SyntaxKind::LBracket
                | SyntaxKind::RBracket => {}
                SyntaxKind::Keyword
                    if is_primitive(token.text)
                        || token.text == "extends"
                        || token.text == "super" => {}
                _ => return None,
            }
            i += 1;
        }
        None
    }

    /// `@Name(.Name)*` with an optional argument group. `@interface` is not
    /// an annotation.
    pub fn annotation_end(&self, start: usize) -> Option<usize> {
        if !self.is(start, SyntaxKind::At) || !self.is(start + 1, SyntaxKind::Ident) {
            return None;
        }
        let mut i = start + 2;
        while self.is(i, SyntaxKind::Dot) && self.is(i + 1, SyntaxKind::Ident) {
            i += 2;
        }
        if self.is(i, SyntaxKind::LParen) {
            i = self.group_end(i);
        }
        Some(i)
    }

    /// A type: annotations, a primitive or dotted name with type arguments,
    /// then array dimensions.
    pub fn type_end(&self, start: usize) -> Option<usize> {
        let mut i = start;
        while let Some(end) = self.annotation_end(i) {
            i = end;
        }
        let token = self.tokens.get(i)?;
        match token.kind {
            SyntaxKind::Keyword if is_primitive(token.text) => i += 1,
            SyntaxKind::Ident => {
                i += 1;
                loop {
                    if let Some(end) = self.angle_end(i) {
                        i = end;
                    }
                    if !self.is(i, SyntaxKind::Dot) {
                        break;
                    }
                    let mut j = i + 1;
                    while let Some(end) = self.annotation_end(j) {
                        j = end;
                    }
                    if !self.is(j, SyntaxKind::Ident) {
                        break;
                    }
                    i = j + 1;
                }
            }
            _ => return None,
        }
        while self.is(i, SyntaxKind::LBracket) && self.is(i + 1, SyntaxKind::RBracket) {
            i += 2;
        }
        Some(i)
    }

    pub fn is_modifier(&self, i: usize) -> bool {
        let Some(token) = self.tokens.get(i) else {
            return false;
        };
        match token.kind {
            SyntaxKind::Keyword => MODIFIERS.contains(&token.text),
            SyntaxKind::Ident => {
                token.text == "sealed"
                    && self
                        .tokens
                        .get(i + 1)
                        .is_some_and(|next| next.kind == SyntaxKind::Keyword)
            }
            _ => false,
        }
    }

    /// Declaration keyword at `i` and how many tokens it spans.
    pub fn class_keyword(&self, i: usize) -> Option<(ClassFlavor, usize)> {
        let token = self.tokens.get(i)?;
        if token.kind == SyntaxKind::Keyword {
            return match token.text {
                "class" => Some((ClassFlavor::Class, 1)),
                "interface" => Some((ClassFlavor::Interface, 1)),
                "enum" => Some((ClassFlavor::Enum, 1)),
                _ => None,
            };
        }
        if token.kind == SyntaxKind::At && self.is_keyword(i + 1, "interface") {
            return Some((ClassFlavor::Annotation, 2));
        }
        None
    }

    /// End of an initializer or element value: the next `,` `;` or `}` at
    /// the same nesting, skipping bracketed groups and type arguments.
    pub fn value_end(&self, start: usize) -> usize {
        let mut i = start;
        while let Some(kind) = self.kind(i) {
            match kind {
                SyntaxKind::Comma | SyntaxKind::Semi | SyntaxKind::RBrace => break,
                SyntaxKind::RParen | SyntaxKind::RBracket => break,
                SyntaxKind::LBrace | SyntaxKind::LParen | SyntaxKind::LBracket => {
                    i = self.group_end(i);
                }
                SyntaxKind::Lt => i = self.angle_end(i).unwrap_or(i + 1),
                _ => i += 1,
            }
        }
        i
    }
}

pub const MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "native",
    "synchronized",
    "transient",
    "volatile",
    "strictfp",
    "default",
];

/// Canonical text of a token run: one space between adjacent words, after
/// commas, between `?` and a bound, and around `&`. Nothing else.
pub fn render_tokens<'a, I>(tokens: I) -> String
where
    I: IntoIterator<Item = (SyntaxKind, &'a str)>,
{
    let mut out = String::new();
    let mut prev: Option<SyntaxKind> = None;
    for (kind, text) in tokens {
        if kind.is_trivia() {
            continue;
        }
        if let Some(p) = prev {
            if needs_space(p, kind) {
                out.push(' ');
            }
        }
        out.push_str(text);
        prev = Some(kind);
    }
    out
}

fn needs_space(prev: SyntaxKind, cur: SyntaxKind) -> bool {
    (prev.is_word() && cur.is_word())
        || prev == SyntaxKind::Comma
        || (prev == SyntaxKind::Question && cur.is_word())
        || prev == SyntaxKind::Amp
        || cur == SyntaxKind::Amp
}

pub fn render_lexemes(tokens: &[Lexeme<'_>]) -> String {
    render_tokens(tokens.iter().map(|t| (t.kind, t.text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::significant;
    use rstest::rstest;

    #[rstest]
    #[case("Map<String,List<Integer>> m", 9)]
    #[case("int[][] a", 5)]
    #[case("@NonNull String s", 3)]
    #[case("Outer<T>.Inner<U> x", 9)]
    #[case("java.util.List<? extends Number> x", 10)]
    fn test_type_end(#[case] text: &str, #[case] expected: usize) {
        let tokens = significant(text);
        let groups = Groups::new(&tokens);
        assert_eq!(groups.type_end(0), Some(expected));
        assert!(groups.is(expected, SyntaxKind::Ident));
    }

    #[test]
    fn test_comparison_is_not_type_arguments() {
        let tokens = significant("a < b ; c > d");
        let groups = Groups::new(&tokens);
        assert_eq!(groups.angle_end(1), None);
        assert_eq!(groups.type_end(0), Some(1));
    }

    #[test]
    fn test_value_end_skips_generic_commas() {
        let tokens = significant("new HashMap<String, Integer>(), y;");
        let groups = Groups::new(&tokens);
        let end = groups.value_end(0);
        assert!(groups.is(end, SyntaxKind::Comma));
        assert_eq!(end, 9);
    }

    #[rstest]
    #[case("Map < K , V >", "Map<K, V>")]
    #[case("List<? extends T>", "List<? extends T>")]
    #[case("T extends A&B", "T extends A & B")]
    #[case("@ Foo ( x = 1 )", "@Foo(x=1)")]
    #[case("- 5", "-5")]
    fn test_render_normalizes_spacing(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(render_lexemes(&significant(text)), expected);
    }

    #[test]
    fn test_unclosed_group_runs_to_end() {
        let tokens = significant("{ a { b }");
        let groups = Groups::new(&tokens);
        assert_eq!(groups.group_end(0), tokens.len());
        assert_eq!(groups.group_end(2), 5);
    }
}
