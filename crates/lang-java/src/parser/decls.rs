use super::{MAX_CLASS_NESTING, Parser};
use lathe_api::{ClassFlavor, SyntaxKind};

impl<'p> Parser<'p> {
    pub(super) fn compilation_unit(&mut self) {
        // Opened before any trivia so the unit owns leading comments.
        self.builder.start_node(SyntaxKind::CompilationUnit);
        self.compilation_unit_items();
        self.flush_trivia();
        self.finish();
    }

    pub(super) fn compilation_unit_items(&mut self) {
        while !self.at_end() {
            if self.eat(SyntaxKind::Semi) {
                continue;
            }
            if self.at_keyword("import") {
                self.import_decl();
                continue;
            }
            let cp = self.checkpoint();
            let has_modifiers = self.modifiers();
            if self.at_keyword("package") {
                self.start_at(cp, SyntaxKind::PackageDecl);
                self.qualified_name_then_semi();
                self.finish();
                continue;
            }
            if let Some((flavor, len)) = self.groups.class_keyword(self.pos) {
                self.class_decl(cp, flavor, len);
                continue;
            }
            if has_modifiers {
                self.start_at(cp, SyntaxKind::ErrorNode);
                self.finish();
            } else {
                self.error_one();
            }
        }
    }

    fn import_decl(&mut self) {
        self.start(SyntaxKind::ImportDecl);
        self.bump();
        if self.at_keyword("static") {
            self.bump();
        }
        while matches!(
            self.kind(),
            Some(SyntaxKind::Ident | SyntaxKind::Dot | SyntaxKind::Star)
        ) {
            self.bump();
        }
        self.eat(SyntaxKind::Semi);
        self.finish();
    }

    fn qualified_name_then_semi(&mut self) {
        self.bump();
        while matches!(self.kind(), Some(SyntaxKind::Ident | SyntaxKind::Dot)) {
            self.bump();
        }
        self.eat(SyntaxKind::Semi);
    }

    /// Annotations and modifier keywords, wrapped in one list node when any
    /// are present.
    pub(super) fn modifiers(&mut self) -> bool {
        let mut started = false;
        loop {
            if let Some(end) = self.groups.annotation_end(self.pos) {
                if !started {
                    self.start(SyntaxKind::ModifierList);
                    started = true;
                }
                self.start(SyntaxKind::Annotation);
                self.bump_to(end);
                self.finish();
                continue;
            }
            if self.groups.is_modifier(self.pos) {
                if !started {
                    self.start(SyntaxKind::ModifierList);
                    started = true;
                }
                self.bump();
                continue;
            }
            break;
        }
        if started {
            self.finish();
        }
        started
    }

    pub(super) fn class_decl(
        &mut self,
        cp: lathe_api::Checkpoint,
        flavor: ClassFlavor,
        keyword_len: usize,
    ) {
        self.start_at(cp, SyntaxKind::ClassDecl);
        let end = self.pos + keyword_len;
        self.bump_to(end);
        self.eat(SyntaxKind::Ident);
        if self.at(SyntaxKind::Lt) {
            self.type_params();
        }
        if self.at_keyword("extends") {
            self.type_clause(SyntaxKind::ExtendsClause);
        }
        if self.at_keyword("implements") {
            self.type_clause(SyntaxKind::ImplementsClause);
        }
        if self.current().is_some_and(|t| t.is_ident("permits")) {
            self.type_clause(SyntaxKind::PermitsClause);
        }
        if self.at(SyntaxKind::LBrace) {
            self.class_body(flavor == ClassFlavor::Enum);
        }
        self.finish();
    }

    pub(super) fn type_params(&mut self) {
        match self.groups.angle_end(self.pos) {
            Some(end) => {
                self.start(SyntaxKind::TypeParamList);
                self.bump_to(end);
                self.finish();
            }
            None => self.error_one(),
        }
    }

    fn type_clause(&mut self, kind: SyntaxKind) {
        self.start(kind);
        self.bump();
        self.type_list();
        self.finish();
    }

    fn type_list(&mut self) {
        while self.type_ref() {
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
    }

    pub(super) fn type_ref(&mut self) -> bool {
        match self.groups.type_end(self.pos) {
            Some(end) => {
                self.start(SyntaxKind::TypeRef);
                self.bump_to(end);
                self.finish();
                true
            }
            None => false,
        }
    }

    pub(super) fn class_body(&mut self, is_enum: bool) {
        if self.class_depth >= MAX_CLASS_NESTING {
            self.error_one();
            return;
        }
        self.class_depth += 1;
        self.start(if is_enum {
            SyntaxKind::EnumBody
        } else {
            SyntaxKind::ClassBody
        });
        self.class_body_contents(is_enum);
        self.finish();
        self.class_depth -= 1;
    }

    /// `{ members }` without the wrapping node.
    pub(super) fn class_body_contents(&mut self, is_enum: bool) {
        if !self.eat(SyntaxKind::LBrace) {
            return;
        }
        if is_enum {
            self.enum_constants();
        }
        while !self.at_end() && !self.at(SyntaxKind::RBrace) {
            self.member();
        }
        self.eat(SyntaxKind::RBrace);
    }

    fn enum_constants(&mut self) {
        loop {
            if self.eat(SyntaxKind::Semi) || self.at(SyntaxKind::RBrace) || self.at_end() {
                return;
            }
            let cp = self.checkpoint();
            let has_modifiers = self.modifiers();
            if !self.at(SyntaxKind::Ident) {
                if has_modifiers {
                    self.start_at(cp, SyntaxKind::ErrorNode);
                    self.finish();
                }
                return;
            }
            self.start_at(cp, SyntaxKind::EnumConstant);
            self.bump();
            if self.at(SyntaxKind::LParen) {
                self.arg_list();
            }
            if self.at(SyntaxKind::LBrace) {
                self.deferred(SyntaxKind::AnonymousBody);
            }
            self.finish();
            if !self.eat(SyntaxKind::Comma) {
                self.eat(SyntaxKind::Semi);
                return;
            }
        }
    }

    fn member(&mut self) {
        if self.eat(SyntaxKind::Semi) {
            return;
        }
        if self.at(SyntaxKind::LBrace) {
            self.start(SyntaxKind::Initializer);
            self.deferred(SyntaxKind::CodeBlock);
            self.finish();
            return;
        }
        if self.at_keyword("static") && self.nth_at(1, SyntaxKind::LBrace) {
            self.start(SyntaxKind::Initializer);
            self.start(SyntaxKind::ModifierList);
            self.bump();
            self.finish();
            self.deferred(SyntaxKind::CodeBlock);
            self.finish();
            return;
        }

        let cp = self.checkpoint();
        let has_modifiers = self.modifiers();
        if let Some((flavor, len)) = self.groups.class_keyword(self.pos) {
            self.class_decl(cp, flavor, len);
            return;
        }
        let has_type_params = self.at(SyntaxKind::Lt);
        if has_type_params {
            self.type_params();
        }

        if self.at(SyntaxKind::Ident) && self.nth_at(1, SyntaxKind::LParen) {
            self.start_at(cp, SyntaxKind::ConstructorDecl);
            self.bump();
            self.method_rest();
            self.finish();
            return;
        }

        if let Some(end) = self.groups.type_end(self.pos) {
            if self.groups.is(end, SyntaxKind::Ident) {
                if self.groups.is(end + 1, SyntaxKind::LParen) {
                    self.start_at(cp, SyntaxKind::MethodDecl);
                    self.type_ref();
                    self.bump();
                    self.method_rest();
                    self.finish();
                } else {
                    self.start_at(cp, SyntaxKind::FieldDecl);
                    self.type_ref();
                    loop {
                        self.var_declarator();
                        if !self.eat(SyntaxKind::Comma) {
                            break;
                        }
                    }
                    self.eat(SyntaxKind::Semi);
                    self.finish();
                }
                return;
            }
        }

        if has_modifiers || has_type_params {
            self.start_at(cp, SyntaxKind::ErrorNode);
            if !self.at(SyntaxKind::RBrace) {
                self.error_one();
            }
            self.finish();
        } else {
            self.error_one();
        }
    }

    /// Parameters, dimensions, throws, default value and body.
    fn method_rest(&mut self) {
        self.param_list();
        while self.at(SyntaxKind::LBracket) && self.nth_at(1, SyntaxKind::RBracket) {
            self.bump();
            self.bump();
        }
        if self.at_keyword("throws") {
            self.start(SyntaxKind::ThrowsClause);
            self.bump();
            self.type_list();
            self.finish();
        }
        if self.at_keyword("default") {
            self.start(SyntaxKind::DefaultValue);
            self.bump();
            self.element_value();
            self.finish();
        }
        if self.at(SyntaxKind::LBrace) {
            self.deferred(SyntaxKind::CodeBlock);
        } else {
            self.eat(SyntaxKind::Semi);
        }
    }

    fn param_list(&mut self) {
        self.start(SyntaxKind::ParamList);
        self.bump();
        while !self.at(SyntaxKind::RParen) && !self.at_end() {
            if !self.param() {
                break;
            }
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        if !self.at(SyntaxKind::RParen) && !self.at_end() {
            self.start(SyntaxKind::ErrorNode);
            while !self.at_end()
                && !matches!(
                    self.kind(),
                    Some(SyntaxKind::RParen | SyntaxKind::LBrace | SyntaxKind::Semi)
                )
            {
                self.bump();
            }
            self.finish();
        }
        self.eat(SyntaxKind::RParen);
        self.finish();
    }

    /// Formal parameter; also used for catch clauses and explicit lambda
    /// parameters. `false` when nothing parameter-like is at the cursor.
    pub(super) fn param(&mut self) -> bool {
        let has_type = {
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
            self.groups.type_end(i).is_some()
        };
        if !has_type {
            return false;
        }
        let cp = self.checkpoint();
        self.modifiers();
        self.start_at(cp, SyntaxKind::Param);
        self.type_ref();
        while self.at_op("|") {
            self.bump();
            self.type_ref();
        }
        self.eat(SyntaxKind::Ellipsis);
        self.eat(SyntaxKind::Ident);
        while self.at(SyntaxKind::LBracket) && self.nth_at(1, SyntaxKind::RBracket) {
            self.bump();
            self.bump();
        }
        self.finish();
        true
    }

    pub(super) fn var_declarator(&mut self) {
        self.start(SyntaxKind::VarDeclarator);
        self.eat(SyntaxKind::Ident);
        while self.at(SyntaxKind::LBracket) && self.nth_at(1, SyntaxKind::RBracket) {
            self.bump();
            self.bump();
        }
        if self.eat(SyntaxKind::Eq) {
            self.var_init();
        }
        self.finish();
    }

    pub(super) fn var_init(&mut self) {
        if self.at(SyntaxKind::LBrace) {
            self.array_init();
        } else {
            self.expr();
        }
    }

    fn element_value(&mut self) {
        if let Some(end) = self.groups.annotation_end(self.pos) {
            self.start(SyntaxKind::Annotation);
            self.bump_to(end);
            self.finish();
        } else {
            self.var_init();
        }
    }
}
