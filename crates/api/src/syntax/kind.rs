use crate::models::StubKind;
use serde::{Deserialize, Serialize};

/// Every token and node kind of the tree. Closed on purpose: adding a kind
/// forces every exhaustive match to be revisited.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyntaxKind {
    // Trivia
    Whitespace,
    LineComment,
    BlockComment,

    // Words
    Ident,
    Keyword,
    IntLiteral,
    FloatLiteral,
    CharLiteral,
    StringLiteral,
    TextBlock,

    // Punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Ellipsis,
    At,
    Eq,
    Lt,
    Gt,
    Question,
    Colon,
    ColonColon,
    Arrow,
    Amp,
    Star,
    /// Any other operator; the token text tells which.
    Op,
    /// Characters the lexer could not classify.
    Error,

    // Declarations
    CompilationUnit,
    PackageDecl,
    ImportDecl,
    ModifierList,
    Annotation,
    ClassDecl,
    TypeParamList,
    ExtendsClause,
    ImplementsClause,
    PermitsClause,
    ClassBody,
    EnumBody,
    EnumConstant,
    Initializer,
    FieldDecl,
    VarDeclarator,
    MethodDecl,
    ConstructorDecl,
    ParamList,
    Param,
    ThrowsClause,
    DefaultValue,
    TypeRef,

    // Deferred bodies
    CodeBlock,
    AnonymousBody,
    SwitchBody,

    // Statements
    SwitchLabel,
    LocalVarDecl,
    ExprStmt,
    IfStmt,
    WhileStmt,
    DoStmt,
    ForStmt,
    TryStmt,
    ResourceList,
    CatchClause,
    FinallyClause,
    SwitchStmt,
    ReturnStmt,
    ThrowStmt,
    BreakStmt,
    ContinueStmt,
    YieldStmt,
    SynchronizedStmt,
    AssertStmt,
    LabeledStmt,
    EmptyStmt,

    // Expressions
    Literal,
    NameRef,
    FieldAccess,
    MethodCall,
    ArgList,
    NewExpr,
    ArrayAccess,
    ArrayInit,
    ParenExpr,
    UnaryExpr,
    PostfixExpr,
    /// A run of operands joined by operators of one precedence level.
    BinaryExpr,
    AssignExpr,
    ConditionalExpr,
    CastExpr,
    LambdaExpr,
    LambdaParams,
    MethodRef,
    SwitchExpr,

    /// Tokens the parser could not place.
    ErrorNode,
}

impl SyntaxKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            SyntaxKind::Whitespace | SyntaxKind::LineComment | SyntaxKind::BlockComment
        )
    }

    pub fn is_token(self) -> bool {
        self <= SyntaxKind::Error
    }

    pub fn is_node(self) -> bool {
        !self.is_token()
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            SyntaxKind::IntLiteral
                | SyntaxKind::FloatLiteral
                | SyntaxKind::CharLiteral
                | SyntaxKind::StringLiteral
                | SyntaxKind::TextBlock
        )
    }

    /// Identifiers, keywords and literals.
    pub fn is_word(self) -> bool {
        matches!(self, SyntaxKind::Ident | SyntaxKind::Keyword) || self.is_literal()
    }

    pub fn is_punct(self) -> bool {
        self.is_token() && !self.is_trivia() && !self.is_word() && self != SyntaxKind::Error
    }

    /// Nodes built unparsed and expanded on first visit.
    pub fn is_deferred(self) -> bool {
        matches!(
            self,
            SyntaxKind::CodeBlock | SyntaxKind::AnonymousBody | SyntaxKind::SwitchBody
        )
    }

    /// Nodes an edit can be re-parsed within.
    pub fn is_reparse_unit(self) -> bool {
        self.is_deferred()
            || matches!(
                self,
                SyntaxKind::ClassBody | SyntaxKind::EnumBody | SyntaxKind::CompilationUnit
            )
    }

    /// Nodes whose children may hold declarations.
    pub fn is_decl_container(self) -> bool {
        matches!(
            self,
            SyntaxKind::CompilationUnit
                | SyntaxKind::ClassDecl
                | SyntaxKind::ClassBody
                | SyntaxKind::EnumBody
                | SyntaxKind::FieldDecl
                | SyntaxKind::MethodDecl
                | SyntaxKind::ConstructorDecl
                | SyntaxKind::ParamList
        )
    }

    /// The stub a declaration node produces. Only meaningful for nodes reached
    /// through declaration containers.
    pub fn stub_kind(self) -> Option<StubKind> {
        match self {
            SyntaxKind::CompilationUnit => Some(StubKind::File),
            SyntaxKind::ImportDecl => Some(StubKind::Import),
            SyntaxKind::ClassDecl => Some(StubKind::Class),
            SyntaxKind::VarDeclarator => Some(StubKind::Field),
            SyntaxKind::MethodDecl => Some(StubKind::Method),
            SyntaxKind::ConstructorDecl => Some(StubKind::Constructor),
            SyntaxKind::Param => Some(StubKind::Parameter),
            SyntaxKind::EnumConstant => Some(StubKind::EnumConstant),
            _ => None,
        }
    }
}
