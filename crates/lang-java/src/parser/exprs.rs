use super::Parser;
use crate::lexer::is_primitive;
use lathe_api::SyntaxKind;

const ASSIGN_OPS: &[&str] = &[
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=", ">>>=",
];

impl<'p> Parser<'p> {
    pub(super) fn expr(&mut self) {
        if !self.enter() {
            self.skip_nested(false);
            return;
        }
        self.assignment();
        self.leave();
    }

    fn at_assign_op(&self) -> bool {
        match self.current() {
            Some(t) if t.kind == SyntaxKind::Eq => true,
            Some(t) if t.kind == SyntaxKind::Op => ASSIGN_OPS.contains(&t.text),
            _ => false,
        }
    }

    /// Assignments are right-associative; the chain is kept in one node.
    fn assignment(&mut self) {
        if self.at_lambda() {
            self.lambda();
            return;
        }
        let cp = self.checkpoint();
        self.conditional();
        if !self.at_assign_op() {
            return;
        }
        self.start_at(cp, SyntaxKind::AssignExpr);
        while self.at_assign_op() {
            self.bump();
            if self.at_lambda() {
                self.lambda();
                break;
            }
            if self.at(SyntaxKind::LBrace) {
                self.array_init();
                break;
            }
            self.conditional();
        }
        self.finish();
    }

    fn conditional(&mut self) {
        let cp = self.checkpoint();
        self.binary(0);
        if !self.at(SyntaxKind::Question) {
            return;
        }
        self.start_at(cp, SyntaxKind::ConditionalExpr);
        while self.eat(SyntaxKind::Question) {
            self.expr();
            self.eat(SyntaxKind::Colon);
            if self.at_lambda() {
                self.lambda();
                break;
            }
            self.binary(0);
        }
        self.finish();
    }

    /// Binary operator at the cursor: precedence and token count. Shift
    /// operators arrive as adjacent `<` or `>` tokens.
    fn binary_op(&self) -> Option<(u8, usize)> {
        let token = self.current()?;
        match token.kind {
            SyntaxKind::Lt => Some((7, 1)),
            SyntaxKind::Gt => {
                let glued = |n: usize| {
                    match (self.nth(n - 1), self.nth(n)) {
                        (Some(prev), Some(next)) => {
                            next.kind == SyntaxKind::Gt && next.offset == prev.end()
                        }
                        _ => false,
                    }
                };
                if glued(1) {
                    if glued(2) { Some((8, 3)) } else { Some((8, 2)) }
                } else {
                    Some((7, 1))
                }
            }
            SyntaxKind::Amp => Some((5, 1)),
            SyntaxKind::Star => Some((10, 1)),
            SyntaxKind::Keyword if token.text == "instanceof" => Some((7, 1)),
            SyntaxKind::Op => {
                let prec = match token.text {
                    "||" => 1,
                    "&&" => 2,
                    "|" => 3,
                    "^" => 4,
                    "==" | "!=" => 6,
                    "<=" | ">=" => 7,
                    "<<" => 8,
                    "+" | "-" => 9,
                    "/" | "%" => 10,
                    _ => return None,
                };
                Some((prec, 1))
            }
            _ => None,
        }
    }

    /// Precedence climbing. Operands joined by operators of one level land in
    /// a single flat node, so long chains stay shallow.
    fn binary(&mut self, min_prec: u8) {
        let cp = self.checkpoint();
        self.unary();
        let mut open: Option<u8> = None;
        while let Some((prec, len)) = self.binary_op() {
            if prec < min_prec {
                break;
            }
            match open {
                Some(current) if current == prec => {}
                Some(_) => {
                    self.finish();
                    self.start_at(cp, SyntaxKind::BinaryExpr);
                    open = Some(prec);
                }
                None => {
                    self.start_at(cp, SyntaxKind::BinaryExpr);
                    open = Some(prec);
                }
            }
            if self.at_keyword("instanceof") {
                self.bump();
                if self.at_keyword("final") {
                    self.bump();
                }
                self.type_ref();
                self.eat(SyntaxKind::Ident);
                continue;
            }
            let end = self.pos + len;
            self.bump_to(end);
            self.binary(prec + 1);
        }
        if open.is_some() {
            self.finish();
        }
    }

    fn at_prefix_op(&self) -> bool {
        self.current().is_some_and(|t| {
            t.kind == SyntaxKind::Op && matches!(t.text, "+" | "-" | "!" | "~" | "++" | "--")
        })
    }

    fn unary(&mut self) {
        if self.at_prefix_op() {
            self.start(SyntaxKind::UnaryExpr);
            while self.at_prefix_op() {
                self.bump();
            }
            if self.at(SyntaxKind::LParen) && self.at_cast() {
                self.cast();
            } else {
                self.postfix();
            }
            self.finish();
            return;
        }
        if self.at(SyntaxKind::LParen) && self.at_cast() {
            self.cast();
            return;
        }
        self.postfix();
    }

    /// `(Type) operand`, decided by what follows the closing parenthesis.
    fn at_cast(&self) -> bool {
        let mut end = match self.groups.type_end(self.pos + 1) {
            Some(end) => end,
            None => return false,
        };
        while self.groups.is(end, SyntaxKind::Amp) {
            match self.groups.type_end(end + 1) {
                Some(next) => end = next,
                None => return false,
            }
        }
        if !self.groups.is(end, SyntaxKind::RParen) {
            return false;
        }
        let single_primitive = end == self.pos + 2
            && self
                .nth(1)
                .is_some_and(|t| t.kind == SyntaxKind::Keyword && is_primitive(t.text));
        if single_primitive {
            return true;
        }
        match self.groups.tokens.get(end + 1) {
            None => false,
            Some(next) => match next.kind {
                SyntaxKind::Ident | SyntaxKind::LParen => true,
                k if k.is_literal() => true,
                SyntaxKind::Keyword => matches!(
                    next.text,
                    "this" | "super" | "new" | "true" | "false" | "null" | "switch"
                ) || is_primitive(next.text),
                SyntaxKind::Op => matches!(next.text, "!" | "~"),
                _ => false,
            },
        }
    }

    fn cast(&mut self) {
        if !self.enter() {
            self.skip_nested(false);
            return;
        }
        self.start(SyntaxKind::CastExpr);
        self.bump();
        self.type_ref();
        while self.eat(SyntaxKind::Amp) {
            self.type_ref();
        }
        self.eat(SyntaxKind::RParen);
        if self.at_lambda() {
            self.lambda();
        } else {
            self.unary();
        }
        self.finish();
        self.leave();
    }

    fn postfix(&mut self) {
        let cp = self.checkpoint();
        self.primary();
        loop {
            match self.kind() {
                Some(SyntaxKind::Dot) => {
                    self.postfix_dot(cp);
                }
                Some(SyntaxKind::LBracket) => {
                    self.start_at(cp, SyntaxKind::ArrayAccess);
                    self.bump();
                    self.expr();
                    self.eat(SyntaxKind::RBracket);
                    self.finish();
                }
                Some(SyntaxKind::ColonColon) => {
                    self.start_at(cp, SyntaxKind::MethodRef);
                    self.bump();
                    if self.at(SyntaxKind::Lt) {
                        if let Some(end) = self.groups.angle_end(self.pos) {
                            self.bump_to(end);
                        }
                    }
                    if self.at(SyntaxKind::Ident) || self.at_keyword("new") {
                        self.bump();
                    }
                    self.finish();
                }
                Some(SyntaxKind::Op) if self.at_op("++") || self.at_op("--") => {
                    self.start_at(cp, SyntaxKind::PostfixExpr);
                    self.bump();
                    self.finish();
                }
                _ => break,
            }
        }
    }

    fn postfix_dot(&mut self, cp: lathe_api::Checkpoint) {
        if self.nth_at(1, SyntaxKind::Ident) {
            if self.nth_at(2, SyntaxKind::LParen) {
                self.start_at(cp, SyntaxKind::MethodCall);
                self.bump();
                self.bump();
                self.arg_list();
            } else {
                self.start_at(cp, SyntaxKind::FieldAccess);
                self.bump();
                self.bump();
            }
        } else if self.nth_at(1, SyntaxKind::Lt) {
            self.start_at(cp, SyntaxKind::MethodCall);
            self.bump();
            match self.groups.angle_end(self.pos) {
                Some(end) => self.bump_to(end),
                None => self.bump(),
            }
            self.eat(SyntaxKind::Ident);
            if self.at(SyntaxKind::LParen) {
                self.arg_list();
            }
        } else if self.nth_keyword(1, "new") {
            self.start_at(cp, SyntaxKind::NewExpr);
            self.bump();
            self.creator();
        } else if self.nth_keyword(1, "this")
            || self.nth_keyword(1, "class")
            || self.nth_keyword(1, "super")
        {
            self.start_at(cp, SyntaxKind::FieldAccess);
            self.bump();
            self.bump();
        } else {
            self.start_at(cp, SyntaxKind::FieldAccess);
            self.bump();
        }
        self.finish();
    }

    fn primary(&mut self) {
        let Some(token) = self.current().copied() else {
            return;
        };
        match token.kind {
            k if k.is_literal() => self.literal(),
            SyntaxKind::Keyword => match token.text {
                "true" | "false" | "null" => self.literal(),
                "this" | "super" => {
                    if self.nth_at(1, SyntaxKind::LParen) {
                        self.start(SyntaxKind::MethodCall);
                        self.bump();
                        self.arg_list();
                        self.finish();
                    } else {
                        self.start(SyntaxKind::NameRef);
                        self.bump();
                        self.finish();
                    }
                }
                "new" => {
                    self.start(SyntaxKind::NewExpr);
                    self.creator();
                    self.finish();
                }
                "switch" => {
                    self.start(SyntaxKind::SwitchExpr);
                    self.bump();
                    if self.eat(SyntaxKind::LParen) {
                        self.expr();
                        self.eat(SyntaxKind::RParen);
                    }
                    self.deferred(SyntaxKind::SwitchBody);
                    self.finish();
                }
                text if is_primitive(text) => {
                    self.type_ref();
                }
                _ => {}
            },
            SyntaxKind::Ident => {
                if self.nth_at(1, SyntaxKind::LParen) {
                    self.start(SyntaxKind::MethodCall);
                    self.bump();
                    self.arg_list();
                    self.finish();
                } else if self.nth_at(1, SyntaxKind::Lt) && self.generic_type_follows() {
                    self.type_ref();
                } else {
                    self.start(SyntaxKind::NameRef);
                    self.bump();
                    self.finish();
                }
            }
            SyntaxKind::LParen => {
                self.start(SyntaxKind::ParenExpr);
                self.bump();
                self.expr();
                self.eat(SyntaxKind::RParen);
                self.finish();
            }
            SyntaxKind::LBrace => self.array_init(),
            SyntaxKind::At => {
                if let Some(end) = self.groups.annotation_end(self.pos) {
                    self.start(SyntaxKind::Annotation);
                    self.bump_to(end);
                    self.finish();
                }
            }
            _ => {}
        }
    }

    /// `List<String>::new` and similar: type arguments directly followed by
    /// a method reference.
    fn generic_type_follows(&self) -> bool {
        self.groups
            .type_end(self.pos)
            .is_some_and(|end| self.groups.is(end, SyntaxKind::ColonColon))
    }

    fn literal(&mut self) {
        self.start(SyntaxKind::Literal);
        self.bump();
        self.finish();
    }

    /// After `new`: type, then arguments with an optional anonymous body, or
    /// dimensions with an optional initializer.
    fn creator(&mut self) {
        self.bump();
        if self.at(SyntaxKind::Lt) {
            match self.groups.angle_end(self.pos) {
                Some(end) => self.bump_to(end),
                None => self.bump(),
            }
        }
        self.creator_type();
        if self.at(SyntaxKind::LParen) {
            self.arg_list();
            if self.at(SyntaxKind::LBrace) {
                self.deferred(SyntaxKind::AnonymousBody);
            }
        } else {
            while self.at(SyntaxKind::LBracket) {
                self.bump();
                if !self.at(SyntaxKind::RBracket) {
                    self.expr();
                }
                self.eat(SyntaxKind::RBracket);
            }
            if self.at(SyntaxKind::LBrace) {
                self.array_init();
            }
        }
    }

    /// Like a type reference, but dimensions with sizes stay outside.
    fn creator_type(&mut self) {
        let Some(mut end) = self.groups.type_end(self.pos) else {
            return;
        };
        while end > self.pos + 1
            && self.groups.is(end - 1, SyntaxKind::RBracket)
            && self.groups.is(end - 2, SyntaxKind::LBracket)
        {
            end -= 2;
        }
        self.start(SyntaxKind::TypeRef);
        self.bump_to(end);
        self.finish();
    }

    pub(super) fn arg_list(&mut self) {
        self.start(SyntaxKind::ArgList);
        self.bump();
        while !self.at(SyntaxKind::RParen) && !self.at_end() {
            let before = self.pos;
            self.expr();
            if self.eat(SyntaxKind::Comma) {
                continue;
            }
            if self.pos == before || !self.at(SyntaxKind::RParen) {
                self.skip_to_close(SyntaxKind::RParen);
                break;
            }
        }
        self.eat(SyntaxKind::RParen);
        self.finish();
    }

    pub(super) fn array_init(&mut self) {
        if !self.enter() {
            self.skip_nested(false);
            return;
        }
        self.start(SyntaxKind::ArrayInit);
        self.bump();
        while !self.at(SyntaxKind::RBrace) && !self.at_end() {
            let before = self.pos;
            self.var_init();
            if self.eat(SyntaxKind::Comma) {
                continue;
            }
            if self.pos == before || !self.at(SyntaxKind::RBrace) {
                self.skip_to_close(SyntaxKind::RBrace);
                break;
            }
        }
        self.eat(SyntaxKind::RBrace);
        self.finish();
        self.leave();
    }

    /// Error node over everything before the closer of the enclosing group.
    fn skip_to_close(&mut self, close: SyntaxKind) {
        if self.at(close) || self.at_end() {
            return;
        }
        self.start(SyntaxKind::ErrorNode);
        while !self.at(close) && !self.at_end() {
            if matches!(
                self.kind(),
                Some(SyntaxKind::LBrace | SyntaxKind::LParen | SyntaxKind::LBracket)
            ) {
                let end = self.groups.group_end(self.pos);
                self.bump_to(end);
            } else if self.at(SyntaxKind::RBrace) || self.at(SyntaxKind::Semi) {
                break;
            } else {
                self.bump();
            }
        }
        self.finish();
    }

    fn at_lambda(&self) -> bool {
        if self.no_lambda {
            return false;
        }
        match self.kind() {
            Some(SyntaxKind::Ident) => self.nth_at(1, SyntaxKind::Arrow),
            Some(SyntaxKind::LParen) => {
                let end = self.groups.group_end(self.pos);
                self.groups.is(end, SyntaxKind::Arrow)
            }
            _ => false,
        }
    }

    fn lambda(&mut self) {
        self.start(SyntaxKind::LambdaExpr);
        if self.at(SyntaxKind::Ident) {
            self.bump();
        } else {
            self.start(SyntaxKind::LambdaParams);
            self.bump();
            while !self.at(SyntaxKind::RParen) && !self.at_end() {
                let inferred = self.at(SyntaxKind::Ident)
                    && (self.nth_at(1, SyntaxKind::Comma) || self.nth_at(1, SyntaxKind::RParen));
                if inferred {
                    self.bump();
                } else if !self.param() {
                    self.skip_to_close(SyntaxKind::RParen);
                    break;
                }
                if !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
            self.skip_to_close(SyntaxKind::RParen);
            self.eat(SyntaxKind::RParen);
            self.finish();
        }
        self.eat(SyntaxKind::Arrow);
        if self.at(SyntaxKind::LBrace) {
            self.deferred(SyntaxKind::CodeBlock);
        } else {
            let saved = self.no_lambda;
            self.no_lambda = false;
            self.expr();
            self.no_lambda = saved;
        }
        self.finish();
    }
}
