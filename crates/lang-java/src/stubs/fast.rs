//! Skeleton straight from tokens. Bodies are skipped as balanced groups, so
//! the scan is linear and never recurses on input nesting.

use super::{
    ClassHeader, MethodHeader, class_stub, enum_constant_stub, field_stub, file_stub,
    import_name, import_stub, is_constant_shape, method_stub, param_stub,
};
use crate::lexer::significant;
use crate::parser::MAX_CLASS_NESTING;
use crate::scan::{Groups, render_lexemes};
use lathe_api::{ClassFlavor, StubNode, SyntaxKind};

pub fn build_skeleton(text: &str) -> StubNode {
    let tokens = significant(text);
    let groups = Groups::new(&tokens);
    let mut scanner = Scanner {
        g: &groups,
        pos: 0,
        frames: Vec::new(),
        top: Vec::new(),
        package: None,
    };
    scanner.run();
    let mut file = file_stub(scanner.package.as_deref());
    file.children = scanner.top;
    file
}

struct Scanner<'g, 'a> {
    g: &'g Groups<'g, 'a>,
    pos: usize,
    /// Open class bodies, innermost last.
    frames: Vec<StubNode>,
    top: Vec<StubNode>,
    package: Option<String>,
}

#[derive(Default)]
struct Prefix {
    modifiers: Vec<String>,
    annotations: Vec<String>,
}

impl<'g, 'a> Scanner<'g, 'a> {
    fn at(&self, kind: SyntaxKind) -> bool {
        self.g.is(self.pos, kind)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.g.is_keyword(self.pos, keyword)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.g.tokens.len()
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn text(&self, start: usize, end: usize) -> String {
        render_lexemes(&self.g.tokens[start..end])
    }

    fn skip_one(&mut self) {
        match self.g.kind(self.pos) {
            Some(SyntaxKind::LBrace | SyntaxKind::LParen | SyntaxKind::LBracket) => {
                self.pos = self.g.group_end(self.pos);
            }
            Some(_) => self.pos += 1,
            None => {}
        }
    }

    fn attach(&mut self, stub: StubNode) {
        match self.frames.last_mut() {
            Some(parent) => parent.push(stub),
            None => self.top.push(stub),
        }
    }

    fn run(&mut self) {
        while !self.at_end() {
            if self.frames.is_empty() {
                self.top_level();
            } else if self.eat(SyntaxKind::RBrace) {
                if let Some(done) = self.frames.pop() {
                    self.attach(done);
                }
            } else {
                self.member();
            }
        }
        while let Some(open) = self.frames.pop() {
            self.attach(open);
        }
    }

    fn top_level(&mut self) {
        if self.eat(SyntaxKind::Semi) {
            return;
        }
        if self.at_keyword("import") {
            self.import();
            return;
        }
        let start = self.pos;
        let prefix = self.prefix();
        if self.at_keyword("package") {
            self.pos += 1;
            let name_start = self.pos;
            while matches!(self.g.kind(self.pos), Some(SyntaxKind::Ident | SyntaxKind::Dot)) {
                self.pos += 1;
            }
            if self.package.is_none() {
                self.package = Some(self.text(name_start, self.pos));
            }
            self.eat(SyntaxKind::Semi);
            return;
        }
        if let Some((flavor, len)) = self.g.class_keyword(self.pos) {
            self.open_class(prefix, flavor, len);
            return;
        }
        if self.pos == start {
            self.skip_one();
        }
    }

    fn import(&mut self) {
        self.pos += 1;
        let is_static = self.at_keyword("static");
        if is_static {
            self.pos += 1;
        }
        let start = self.pos;
        while matches!(
            self.g.kind(self.pos),
            Some(SyntaxKind::Ident | SyntaxKind::Dot | SyntaxKind::Star)
        ) {
            self.pos += 1;
        }
        let (name, on_demand) =
            import_name(self.g.tokens[start..self.pos].iter().map(|t| (t.kind, t.text)));
        self.eat(SyntaxKind::Semi);
        self.attach(import_stub(&name, is_static, on_demand));
    }

    fn prefix(&mut self) -> Prefix {
        let mut prefix = Prefix::default();
        loop {
            if let Some(end) = self.g.annotation_end(self.pos) {
                prefix.annotations.push(self.text(self.pos, end));
                self.pos = end;
            } else if self.g.is_modifier(self.pos) {
                prefix.modifiers.push(self.g.tokens[self.pos].text.to_string());
                self.pos += 1;
            } else {
                return prefix;
            }
        }
    }

    fn type_list(&mut self) -> Vec<String> {
        let mut types = Vec::new();
        while let Some(end) = self.g.type_end(self.pos) {
            types.push(self.text(self.pos, end));
            self.pos = end;
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        types
    }

    fn type_params(&mut self) -> Option<String> {
        match self.g.angle_end(self.pos) {
            Some(end) => {
                let text = self.text(self.pos, end);
                self.pos = end;
                Some(text)
            }
            None => {
                self.pos += 1;
                None
            }
        }
    }

    fn open_class(&mut self, prefix: Prefix, flavor: ClassFlavor, keyword_len: usize) {
        self.pos += keyword_len;
        let mut header = ClassHeader {
            flavor: Some(flavor),
            modifiers: prefix.modifiers,
            annotations: prefix.annotations,
            ..Default::default()
        };
        if self.at(SyntaxKind::Ident) {
            header.name = self.g.tokens[self.pos].text.to_string();
            self.pos += 1;
        }
        if self.at(SyntaxKind::Lt) {
            header.type_params = self.type_params();
        }
        if self.at_keyword("extends") {
            self.pos += 1;
            header.extends = self.type_list();
        }
        if self.at_keyword("implements") {
            self.pos += 1;
            header.implements = self.type_list();
        }
        if self
            .g
            .tokens
            .get(self.pos)
            .is_some_and(|t| t.is_ident("permits"))
        {
            self.pos += 1;
            self.type_list();
        }
        let stub = class_stub(header);
        if !self.at(SyntaxKind::LBrace) {
            self.attach(stub);
            return;
        }
        if self.frames.len() as u32 >= MAX_CLASS_NESTING {
            self.skip_one();
            self.attach(stub);
            return;
        }
        self.pos += 1;
        self.frames.push(stub);
        if flavor == ClassFlavor::Enum {
            self.enum_constants();
        }
    }

    fn enum_constants(&mut self) {
        loop {
            if self.eat(SyntaxKind::Semi) || self.at(SyntaxKind::RBrace) || self.at_end() {
                return;
            }
            self.prefix();
            if !self.at(SyntaxKind::Ident) {
                return;
            }
            let name = self.g.tokens[self.pos].text;
            self.pos += 1;
            if self.at(SyntaxKind::LParen) {
                self.skip_one();
            }
            if self.at(SyntaxKind::LBrace) {
                self.skip_one();
            }
            self.attach(enum_constant_stub(name));
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
            self.skip_one();
            return;
        }
        if self.at_keyword("static") && self.g.is(self.pos + 1, SyntaxKind::LBrace) {
            self.pos += 1;
            self.skip_one();
            return;
        }

        let start = self.pos;
        let prefix = self.prefix();
        if let Some((flavor, len)) = self.g.class_keyword(self.pos) {
            self.open_class(prefix, flavor, len);
            return;
        }
        let type_params = if self.at(SyntaxKind::Lt) {
            self.type_params()
        } else {
            None
        };

        if self.at(SyntaxKind::Ident) && self.g.is(self.pos + 1, SyntaxKind::LParen) {
            let header = MethodHeader {
                name: self.g.tokens[self.pos].text.to_string(),
                modifiers: prefix.modifiers,
                annotations: prefix.annotations,
                type_params,
                ..Default::default()
            };
            self.pos += 1;
            self.method_rest(header);
            return;
        }

        if let Some(end) = self.g.type_end(self.pos) {
            if self.g.is(end, SyntaxKind::Ident) {
                let type_name = self.text(self.pos, end);
                self.pos = end;
                if self.g.is(end + 1, SyntaxKind::LParen) {
                    let header = MethodHeader {
                        name: self.g.tokens[end].text.to_string(),
                        modifiers: prefix.modifiers,
                        annotations: prefix.annotations,
                        type_params,
                        returns: Some(type_name),
                        ..Default::default()
                    };
                    self.pos += 1;
                    self.method_rest(header);
                } else {
                    loop {
                        self.declarator(&type_name, &prefix);
                        if !self.eat(SyntaxKind::Comma) {
                            break;
                        }
                    }
                    self.eat(SyntaxKind::Semi);
                }
                return;
            }
        }

        if self.pos > start {
            if !self.at(SyntaxKind::RBrace) {
                self.skip_one();
            }
        } else {
            self.skip_one();
        }
    }

    fn dims(&mut self) -> usize {
        let mut count = 0;
        while self.at(SyntaxKind::LBracket) && self.g.is(self.pos + 1, SyntaxKind::RBracket) {
            self.pos += 2;
            count += 1;
        }
        count
    }

    fn declarator(&mut self, base_type: &str, prefix: &Prefix) {
        let mut name = "";
        if self.at(SyntaxKind::Ident) {
            name = self.g.tokens[self.pos].text;
            self.pos += 1;
        }
        let type_name = format!("{base_type}{}", "[]".repeat(self.dims()));
        let mut constant = None;
        if self.eat(SyntaxKind::Eq) {
            let start = self.pos;
            let end = self.g.value_end(start);
            let init = &self.g.tokens[start..end];
            if is_constant_shape(init.iter().map(|t| (t.kind, t.text))) {
                constant = Some(render_lexemes(init));
            }
            self.pos = end;
        }
        let field = field_stub(
            name,
            &type_name,
            prefix.modifiers.clone(),
            prefix.annotations.clone(),
            constant,
        );
        self.attach(field);
    }

    fn method_rest(&mut self, mut header: MethodHeader) {
        let mut params = Vec::new();
        self.pos += 1;
        while !self.at(SyntaxKind::RParen) && !self.at_end() {
            match self.param() {
                Some(param) => params.push(param),
                None => break,
            }
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        while !self.at_end()
            && !matches!(
                self.g.kind(self.pos),
                Some(SyntaxKind::RParen | SyntaxKind::LBrace | SyntaxKind::Semi)
            )
        {
            self.pos += 1;
        }
        self.eat(SyntaxKind::RParen);
        self.dims();
        if self.at_keyword("throws") {
            self.pos += 1;
            header.throws = self.type_list();
        }
        if self.at_keyword("default") {
            self.pos += 1;
            let start = self.pos;
            let end = match self.g.annotation_end(start) {
                Some(end) => end,
                None => self.g.value_end(start),
            };
            header.default = Some(self.text(start, end));
            self.pos = end;
        }
        if self.at(SyntaxKind::LBrace) {
            self.skip_one();
        } else {
            self.eat(SyntaxKind::Semi);
        }
        let mut method = method_stub(header);
        method.children = params;
        self.attach(method);
    }

    fn param(&mut self) -> Option<StubNode> {
        let mut i = self.pos;
        loop {
            if let Some(end) = self.g.annotation_end(i) {
                i = end;
            } else if self.g.is_modifier(i) {
                i += 1;
            } else {
                break;
            }
        }
        self.g.type_end(i)?;
        let prefix = self.prefix();
        let end = self.g.type_end(self.pos)?;
        let mut type_name = self.text(self.pos, end);
        self.pos = end;
        while self.g.tokens.get(self.pos).is_some_and(|t| t.is_op("|")) {
            self.pos += 1;
            if let Some(end) = self.g.type_end(self.pos) {
                self.pos = end;
            }
        }
        if self.eat(SyntaxKind::Ellipsis) {
            type_name.push_str("...");
        }
        let mut name = "";
        if self.at(SyntaxKind::Ident) {
            name = self.g.tokens[self.pos].text;
            self.pos += 1;
        }
        for _ in 0..self.dims() {
            type_name.push_str("[]");
        }
        Some(param_stub(name, &type_name, prefix.modifiers, prefix.annotations))
    }
}
