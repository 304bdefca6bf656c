//! Whether edited text can stand in for a node without touching its
//! surroundings.

use crate::lexer::lex;
use lathe_api::SyntaxKind;

/// Brace-delimited units qualify when the text starts with `{`, ends with
/// the `}` that closes it, and nothing escapes in between. A compilation
/// unit always qualifies.
pub fn can_reparse(kind: SyntaxKind, text: &str) -> bool {
    match kind {
        SyntaxKind::CompilationUnit => true,
        SyntaxKind::CodeBlock
        | SyntaxKind::AnonymousBody
        | SyntaxKind::SwitchBody
        | SyntaxKind::ClassBody
        | SyntaxKind::EnumBody => is_closed_brace_group(text),
        _ => false,
    }
}

fn is_closed_brace_group(text: &str) -> bool {
    let tokens = lex(text);
    let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
        return false;
    };
    if first.kind != SyntaxKind::LBrace || last.kind != SyntaxKind::RBrace {
        return false;
    }
    let mut depth = 0usize;
    let count = tokens.len();
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            SyntaxKind::LBrace => depth += 1,
            SyntaxKind::RBrace => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
                if depth == 0 && i + 1 != count {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("{ a(); }", true)]
    #[case("{ a(); } ", false)]
    #[case(" { a(); }", false)]
    #[case("{ a(); } { b(); }", false)]
    #[case("{ a(); ", false)]
    #[case("{ s = \"}\"; }", true)]
    #[case("{ /* } */ }", true)]
    #[case("{ x(); }}", false)]
    fn test_code_block(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(can_reparse(SyntaxKind::CodeBlock, text), expected);
    }

    #[test]
    fn test_kind_gating() {
        assert!(can_reparse(SyntaxKind::CompilationUnit, "class {"));
        assert!(!can_reparse(SyntaxKind::MethodDecl, "{}"));
    }
}
