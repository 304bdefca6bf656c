//! Recursive-descent parser producing lossless green trees.
//!
//! Method, initializer and lambda bodies, anonymous class bodies and switch
//! bodies are emitted as deferred nodes holding their raw text; they are
//! parsed on first visit through [`parse_span`].

mod decls;
mod exprs;
mod stmts;

use crate::lexer::{Lexeme, lex};
use crate::scan::Groups;
use lathe_api::{Checkpoint, GreenNode, NodeIds, SyntaxKind, TreeBuilder};
use std::sync::Arc;

/// Bound on statement and expression recursion. Deeper input is kept as flat
/// error nodes.
pub const MAX_NESTING: u32 = 64;

/// Bound on class declarations nested inside one parsed span.
pub const MAX_CLASS_NESTING: u32 = 48;

pub fn parse_file(text: &str, ids: &NodeIds) -> Arc<GreenNode> {
    let mut builder = TreeBuilder::new(ids.clone());
    run(text, &mut builder, |p| p.compilation_unit());
    builder.finish_root(SyntaxKind::CompilationUnit)
}

/// Parses `text` as the contents of a node of `kind`, pushing the children
/// into `builder`.
pub fn parse_span(text: &str, kind: SyntaxKind, builder: &mut TreeBuilder) {
    run(text, builder, |p| match kind {
        SyntaxKind::CodeBlock => p.block_contents(),
        SyntaxKind::SwitchBody => p.switch_body_contents(),
        SyntaxKind::AnonymousBody | SyntaxKind::ClassBody => p.class_body_contents(false),
        SyntaxKind::EnumBody => p.class_body_contents(true),
        SyntaxKind::CompilationUnit => p.compilation_unit_items(),
        _ => {}
    });
}

fn run<F>(text: &str, builder: &mut TreeBuilder, body: F)
where
    F: FnOnce(&mut Parser<'_>),
{
    let all = lex(text);
    let mut sig = Vec::with_capacity(all.len());
    let mut sig_at = Vec::with_capacity(all.len());
    for (i, token) in all.iter().enumerate() {
        if !token.kind.is_trivia() {
            sig.push(*token);
            sig_at.push(i);
        }
    }
    let groups = Groups::new(&sig);
    let mut parser = Parser {
        text,
        all: &all,
        groups: &groups,
        sig_at: &sig_at,
        pos: 0,
        emitted: 0,
        builder,
        depth: 0,
        class_depth: 0,
        no_lambda: false,
    };
    body(&mut parser);
    parser.finish_remaining();
}

pub(crate) struct Parser<'p> {
    text: &'p str,
    all: &'p [Lexeme<'p>],
    groups: &'p Groups<'p, 'p>,
    sig_at: &'p [usize],
    pos: usize,
    emitted: usize,
    builder: &'p mut TreeBuilder,
    depth: u32,
    class_depth: u32,
    no_lambda: bool,
}

impl<'p> Parser<'p> {
    fn nth(&self, n: usize) -> Option<&Lexeme<'p>> {
        self.groups.tokens.get(self.pos + n)
    }

    fn current(&self) -> Option<&Lexeme<'p>> {
        self.nth(0)
    }

    fn kind(&self) -> Option<SyntaxKind> {
        self.current().map(|t| t.kind)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.groups.tokens.len()
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        self.nth_at(0, kind)
    }

    fn nth_at(&self, n: usize, kind: SyntaxKind) -> bool {
        self.groups.is(self.pos + n, kind)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.nth_keyword(0, keyword)
    }

    fn nth_keyword(&self, n: usize, keyword: &str) -> bool {
        self.groups.is_keyword(self.pos + n, keyword)
    }

    fn at_op(&self, op: &str) -> bool {
        self.current().is_some_and(|t| t.is_op(op))
    }

    fn flush_trivia(&mut self) {
        let stop = self.sig_at.get(self.pos).copied().unwrap_or(self.all.len());
        while self.emitted < stop {
            let token = self.all[self.emitted];
            self.builder.token(token.kind, token.text);
            self.emitted += 1;
        }
    }

    fn bump(&mut self) {
        if self.at_end() {
            return;
        }
        self.flush_trivia();
        let token = self.groups.tokens[self.pos];
        self.builder.token(token.kind, token.text);
        self.emitted += 1;
        self.pos += 1;
    }

    fn bump_to(&mut self, end: usize) {
        while self.pos < end && !self.at_end() {
            self.bump();
        }
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn start(&mut self, kind: SyntaxKind) {
        self.flush_trivia();
        self.builder.start_node(kind);
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.flush_trivia();
        self.builder.checkpoint()
    }

    fn start_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, kind);
    }

    fn finish(&mut self) {
        self.builder.finish_node();
    }

    /// Emits the brace group at the cursor as an unparsed node.
    fn deferred(&mut self, kind: SyntaxKind) {
        if !self.at(SyntaxKind::LBrace) {
            return;
        }
        let end = self.groups.group_end(self.pos);
        self.flush_trivia();
        let first = self.groups.tokens[self.pos];
        let last = self.groups.tokens[end - 1];
        self.builder
            .deferred(kind, &self.text[first.offset as usize..last.end() as usize]);
        self.emitted = self.sig_at[end - 1] + 1;
        self.pos = end;
    }

    fn enter(&mut self) -> bool {
        if self.depth >= MAX_NESTING {
            return false;
        }
        self.depth += 1;
        true
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// One stray token, or a whole bracketed group, as an error node.
    fn error_one(&mut self) {
        let Some(kind) = self.kind() else {
            return;
        };
        self.start(SyntaxKind::ErrorNode);
        match kind {
            SyntaxKind::LBrace | SyntaxKind::LParen | SyntaxKind::LBracket => {
                let end = self.groups.group_end(self.pos);
                self.bump_to(end);
            }
            _ => self.bump(),
        }
        self.finish();
    }

    /// Flat error node over everything up to the next separator or closer at
    /// this nesting level. Used where the nesting bound is hit.
    fn skip_nested(&mut self, through_semi: bool) {
        let stops = |kind: SyntaxKind| {
            matches!(
                kind,
                SyntaxKind::RBrace
                    | SyntaxKind::RParen
                    | SyntaxKind::RBracket
                    | SyntaxKind::Comma
                    | SyntaxKind::Semi
            )
        };
        if self.kind().is_none_or(stops) {
            return;
        }
        self.start(SyntaxKind::ErrorNode);
        while let Some(kind) = self.kind() {
            match kind {
                SyntaxKind::LBrace | SyntaxKind::LParen | SyntaxKind::LBracket => {
                    let end = self.groups.group_end(self.pos);
                    self.bump_to(end);
                }
                SyntaxKind::Semi => {
                    if through_semi {
                        self.bump();
                    }
                    break;
                }
                k if stops(k) => break,
                _ => self.bump(),
            }
        }
        self.finish();
    }

    /// Wraps leftover tokens after a span's closing brace and flushes trailing
    /// trivia.
    fn finish_remaining(&mut self) {
        if !self.at_end() {
            self.start(SyntaxKind::ErrorNode);
            while !self.at_end() {
                self.bump();
            }
            self.finish();
        }
        self.flush_trivia();
    }
}
