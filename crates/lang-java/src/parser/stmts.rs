use super::Parser;
use lathe_api::SyntaxKind;

impl<'p> Parser<'p> {
    /// `{ statements }` without the wrapping node.
    pub(super) fn block_contents(&mut self) {
        if !self.eat(SyntaxKind::LBrace) {
            return;
        }
        self.statements_until_brace();
        self.eat(SyntaxKind::RBrace);
    }

    fn statements_until_brace(&mut self) {
        while !self.at_end() && !self.at(SyntaxKind::RBrace) {
            let before = self.pos;
            self.statement();
            if self.pos == before {
                self.error_one();
            }
        }
    }

    pub(super) fn switch_body_contents(&mut self) {
        if !self.eat(SyntaxKind::LBrace) {
            return;
        }
        while !self.at_end() && !self.at(SyntaxKind::RBrace) {
            let before = self.pos;
            if self.at_switch_label() {
                self.switch_label();
            } else {
                self.statement();
            }
            if self.pos == before {
                self.error_one();
            }
        }
        self.eat(SyntaxKind::RBrace);
    }

    fn at_switch_label(&self) -> bool {
        self.at_keyword("case")
            || (self.at_keyword("default")
                && (self.nth_at(1, SyntaxKind::Colon) || self.nth_at(1, SyntaxKind::Arrow)))
    }

    fn switch_label(&mut self) {
        self.start(SyntaxKind::SwitchLabel);
        let is_case = self.at_keyword("case");
        self.bump();
        if is_case {
            let saved = self.no_lambda;
            self.no_lambda = true;
            loop {
                self.expr();
                if !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
            self.no_lambda = saved;
        }
        if self.eat(SyntaxKind::Arrow) {
            if self.at(SyntaxKind::LBrace) {
                self.deferred(SyntaxKind::CodeBlock);
            } else if self.at_keyword("throw") {
                self.statement();
            } else {
                self.start(SyntaxKind::ExprStmt);
                self.expr();
                self.eat(SyntaxKind::Semi);
                self.finish();
            }
        } else {
            self.eat(SyntaxKind::Colon);
        }
        self.finish();
    }

    pub(super) fn statement(&mut self) {
        if !self.enter() {
            self.skip_nested(true);
            return;
        }
        self.statement_inner();
        self.leave();
    }

    fn statement_inner(&mut self) {
        let Some(token) = self.current().copied() else {
            return;
        };
        match token.kind {
            SyntaxKind::LBrace => self.deferred(SyntaxKind::CodeBlock),
            SyntaxKind::Semi => self.simple(SyntaxKind::EmptyStmt),
            SyntaxKind::Keyword => match token.text {
                "if" => {
                    self.start(SyntaxKind::IfStmt);
                    self.bump();
                    self.paren_condition();
                    self.statement();
                    if self.eat_keyword("else") {
                        self.statement();
                    }
                    self.finish();
                }
                "while" => {
                    self.start(SyntaxKind::WhileStmt);
                    self.bump();
                    self.paren_condition();
                    self.statement();
                    self.finish();
                }
                "do" => {
                    self.start(SyntaxKind::DoStmt);
                    self.bump();
                    self.statement();
                    if self.eat_keyword("while") {
                        self.paren_condition();
                    }
                    self.eat(SyntaxKind::Semi);
                    self.finish();
                }
                "for" => self.for_stmt(),
                "try" => self.try_stmt(),
                "switch" => {
                    self.start(SyntaxKind::SwitchStmt);
                    self.bump();
                    self.paren_condition();
                    self.deferred(SyntaxKind::SwitchBody);
                    self.finish();
                }
                "return" => self.keyword_then_optional_expr(SyntaxKind::ReturnStmt),
                "throw" => self.keyword_then_optional_expr(SyntaxKind::ThrowStmt),
                "break" | "continue" => {
                    let kind = if token.text == "break" {
                        SyntaxKind::BreakStmt
                    } else {
                        SyntaxKind::ContinueStmt
                    };
                    self.start(kind);
                    self.bump();
                    self.eat(SyntaxKind::Ident);
                    self.eat(SyntaxKind::Semi);
                    self.finish();
                }
                "synchronized" if self.nth_at(1, SyntaxKind::LParen) => {
                    self.start(SyntaxKind::SynchronizedStmt);
                    self.bump();
                    self.paren_condition();
                    self.deferred(SyntaxKind::CodeBlock);
                    self.finish();
                }
                "assert" => {
                    self.start(SyntaxKind::AssertStmt);
                    self.bump();
                    self.expr();
                    if self.eat(SyntaxKind::Colon) {
                        self.expr();
                    }
                    self.eat(SyntaxKind::Semi);
                    self.finish();
                }
                _ => self.declaration_or_expression(),
            },
            SyntaxKind::Ident if token.text == "yield" && self.at_yield_statement() => {
                self.keyword_then_optional_expr(SyntaxKind::YieldStmt);
            }
            SyntaxKind::Ident if self.nth_at(1, SyntaxKind::Colon) => {
                self.start(SyntaxKind::LabeledStmt);
                self.bump();
                self.bump();
                self.statement();
                self.finish();
            }
            _ => self.declaration_or_expression(),
        }
    }

    fn simple(&mut self, kind: SyntaxKind) {
        self.start(kind);
        self.bump();
        self.finish();
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn at_yield_statement(&self) -> bool {
        match self.nth(1) {
            None => false,
            Some(next) => match next.kind {
                SyntaxKind::Eq
                | SyntaxKind::Dot
                | SyntaxKind::LBracket
                | SyntaxKind::Semi
                | SyntaxKind::Colon
                | SyntaxKind::ColonColon
                | SyntaxKind::Arrow => false,
                SyntaxKind::Op => !next.text.ends_with('=') && next.text != "++" && next.text != "--",
                _ => true,
            },
        }
    }

    fn keyword_then_optional_expr(&mut self, kind: SyntaxKind) {
        self.start(kind);
        self.bump();
        if !self.at(SyntaxKind::Semi) && !self.at(SyntaxKind::RBrace) {
            self.expr();
        }
        self.eat(SyntaxKind::Semi);
        self.finish();
    }

    fn paren_condition(&mut self) {
        if self.eat(SyntaxKind::LParen) {
            self.expr();
            self.eat(SyntaxKind::RParen);
        } else {
            self.expr();
        }
    }

    /// Local class, local variable or expression statement.
    fn declaration_or_expression(&mut self) {
        let mut i = self.pos;
        loop {
            if let Some(end) = self.groups.annotation_end(i) {
                i = end;
            } else if self.groups.is_modifier(i) {
                i += 1;
            } else {
                break;
            }
        }
        let has_prefix = i > self.pos;
        if let Some((flavor, len)) = self.groups.class_keyword(i) {
            let cp = self.checkpoint();
            self.modifiers();
            self.class_decl(cp, flavor, len);
            return;
        }
        if has_prefix || self.at_local_var_decl(i) {
            self.start(SyntaxKind::LocalVarDecl);
            self.modifiers();
            self.local_var_rest();
            self.eat(SyntaxKind::Semi);
            self.finish();
            return;
        }
        self.start(SyntaxKind::ExprStmt);
        self.expr();
        self.eat(SyntaxKind::Semi);
        self.finish();
    }

    fn at_local_var_decl(&self, start: usize) -> bool {
        match self.groups.type_end(start) {
            Some(end) => {
                self.groups.is(end, SyntaxKind::Ident)
                    && matches!(
                        self.groups.kind(end + 1),
                        Some(
                            SyntaxKind::Eq
                                | SyntaxKind::Semi
                                | SyntaxKind::Comma
                                | SyntaxKind::Colon
                                | SyntaxKind::LBracket
                        )
                    )
            }
            None => false,
        }
    }

    fn local_var_rest(&mut self) {
        self.type_ref();
        loop {
            self.var_declarator();
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
    }

    fn for_stmt(&mut self) {
        self.start(SyntaxKind::ForStmt);
        self.bump();
        if self.eat(SyntaxKind::LParen) {
            if !self.at(SyntaxKind::Semi) {
                let mut i = self.pos;
                while let Some(end) = self.groups.annotation_end(i) {
                    i = end;
                }
                while self.groups.is_modifier(i) {
                    i += 1;
                }
                if i > self.pos || self.at_local_var_decl(i) {
                    self.start(SyntaxKind::LocalVarDecl);
                    self.modifiers();
                    self.local_var_rest();
                    self.finish();
                } else {
                    self.expr_list();
                }
            }
            if self.eat(SyntaxKind::Colon) {
                self.expr();
            } else {
                self.eat(SyntaxKind::Semi);
                if !self.at(SyntaxKind::Semi) {
                    self.expr();
                }
                self.eat(SyntaxKind::Semi);
                if !self.at(SyntaxKind::RParen) {
                    self.expr_list();
                }
            }
            self.eat(SyntaxKind::RParen);
        }
        self.statement();
        self.finish();
    }

    fn expr_list(&mut self) {
        loop {
            self.expr();
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
    }

    fn try_stmt(&mut self) {
        self.start(SyntaxKind::TryStmt);
        self.bump();
        if self.at(SyntaxKind::LParen) {
            self.start(SyntaxKind::ResourceList);
            self.bump();
            while !self.at(SyntaxKind::RParen) && !self.at_end() {
                let before = self.pos;
                let mut i = self.pos;
                while self.groups.is_modifier(i) || self.groups.annotation_end(i).is_some() {
                    i = self.groups.annotation_end(i).unwrap_or(i + 1);
                }
                if i > self.pos || self.at_local_var_decl(i) {
                    self.start(SyntaxKind::LocalVarDecl);
                    self.modifiers();
                    self.local_var_rest();
                    self.finish();
                } else {
                    self.expr();
                }
                if !self.eat(SyntaxKind::Semi) || self.pos == before {
                    break;
                }
            }
            self.eat(SyntaxKind::RParen);
            self.finish();
        }
        self.deferred(SyntaxKind::CodeBlock);
        while self.at_keyword("catch") {
            self.start(SyntaxKind::CatchClause);
            self.bump();
            if self.eat(SyntaxKind::LParen) {
                self.param();
                self.eat(SyntaxKind::RParen);
            }
            self.deferred(SyntaxKind::CodeBlock);
            self.finish();
        }
        if self.at_keyword("finally") {
            self.start(SyntaxKind::FinallyClause);
            self.bump();
            self.deferred(SyntaxKind::CodeBlock);
            self.finish();
        }
        self.finish();
    }
}
