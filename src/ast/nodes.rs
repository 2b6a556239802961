use super::{ConstValue, FieldRef, MethodRef, Span, TypeRef};
use std::fmt;

/// Identifier of a statement within one method body, assigned by the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StmtId(pub u32);

/// Identifier of a local variable or parameter within one method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

/// Identifier of a lambda expression within one class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LambdaId(pub u32);

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Validation facts attached to a reachable statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementInfo {
    /// Resolved target of break/continue/goto/goto-case
    pub target: Option<StmtId>,
    pub is_end_point_reachable: bool,
    /// Some jump statement resolves to this statement
    pub is_targeted: bool,
    /// Number of `yield value` statements nested in this statement
    pub yield_count: u32,
}

/// A statement node. `info == None` marks the statement unreachable.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: StmtId,
    pub kind: StmtKind,
    pub span: Span,
    pub info: Option<StatementInfo>,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Block),
    If(IfStmt),
    While(WhileStmt),
    Do(DoStmt),
    For(ForStmt),
    Foreach(ForeachStmt),
    Switch(SwitchStmt),
    Try(TryStmt),
    Using(UsingStmt),
    Synchronized(SynchronizedStmt),
    Labeled(LabeledStmt),
    Goto(GotoStmt),
    GotoCase(GotoCaseStmt),
    Break(BreakStmt),
    Continue(ContinueStmt),
    Return(ReturnStmt),
    Throw(ThrowStmt),
    Yield(YieldStmt),
    Expression(Expr),
    Empty,
    LocalDecl(LocalDeclStmt),
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub struct DoStmt {
    pub body: Box<Stmt>,
    pub condition: Expr,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Vec<Stmt>,
    pub condition: Option<Expr>,
    pub update: Vec<Expr>,
    pub body: Box<Stmt>,
}

/// How a foreach obtains its elements
#[derive(Debug, Clone)]
pub enum ForeachSource {
    /// Index/length walk over an array
    Array,
    /// `iterator()` / `hasNext()` / `next()` protocol, with an optional
    /// disposal method when the iterator implements a disposal contract
    Iterable {
        iterator: MethodRef,
        has_next: MethodRef,
        next: MethodRef,
        dispose: Option<MethodRef>,
    },
}

#[derive(Debug, Clone)]
pub struct ForeachStmt {
    pub variable: LocalDecl,
    pub iterable: Expr,
    pub source: ForeachSource,
    pub body: Box<Stmt>,
}

/// Selector category, fixed by the validator
#[derive(Debug, Clone)]
pub enum SwitchKind {
    Integral,
    /// Enum selector; case labels carry the constants' ordinals
    Enum { ordinal: MethodRef },
    String,
}

#[derive(Debug, Clone)]
pub enum CaseLabel {
    Case(Expr),
    Default,
}

#[derive(Debug, Clone)]
pub struct SwitchSection {
    pub labels: Vec<CaseLabel>,
    pub statements: Vec<Stmt>,
}

impl SwitchSection {
    pub fn is_default(&self) -> bool {
        self.labels.iter().any(|l| matches!(l, CaseLabel::Default))
    }
}

#[derive(Debug, Clone)]
pub struct SwitchStmt {
    pub selector: Expr,
    pub kind: SwitchKind,
    pub sections: Vec<SwitchSection>,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    /// `None` catches everything
    pub exception_type: Option<TypeRef>,
    pub variable: Option<LocalDecl>,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub struct TryStmt {
    pub block: Box<Stmt>,
    pub catches: Vec<CatchClause>,
    pub finally: Option<Box<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct UsingResource {
    pub variable: Option<LocalDecl>,
    pub init: Expr,
    pub dispose: MethodRef,
}

#[derive(Debug, Clone)]
pub struct UsingStmt {
    pub resources: Vec<UsingResource>,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub struct SynchronizedStmt {
    pub lock: Expr,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub struct LabeledStmt {
    pub label: String,
    pub statement: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub struct GotoStmt {
    pub label: String,
}

/// `goto case <constant>` or, with `case == None`, `goto default`
#[derive(Debug, Clone)]
pub struct GotoCaseStmt {
    pub case: Option<Expr>,
}

#[derive(Debug, Clone, Default)]
pub struct BreakStmt {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ContinueStmt {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
}

/// `throw expr`, or a bare `throw` that rethrows the current catch variable
#[derive(Debug, Clone, Default)]
pub struct ThrowStmt {
    pub exception: Option<Expr>,
}

/// `yield value`, or `yield break` when `value` is `None`
#[derive(Debug, Clone, Default)]
pub struct YieldStmt {
    pub value: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct LocalDeclStmt {
    pub declarators: Vec<(LocalDecl, Option<Expr>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    pub id: LocalId,
    pub name: String,
    pub ty: TypeRef,
}

impl LocalDecl {
    pub fn new(id: u32, name: &str, ty: TypeRef) -> Self {
        Self { id: LocalId(id), name: name.to_string(), ty }
    }
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            id: StmtId::default(),
            kind,
            span: Span::synthetic(),
            info: None,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_reachable(&self) -> bool {
        self.info.is_some()
    }

    /// End point reachability; unreachable statements have none
    pub fn completes_normally(&self) -> bool {
        self.info.as_ref().map_or(false, |i| i.is_end_point_reachable)
    }

    pub fn target(&self) -> Option<StmtId> {
        self.info.as_ref().and_then(|i| i.target)
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            StmtKind::Block(_) => "block",
            StmtKind::If(_) => "if",
            StmtKind::While(_) => "while",
            StmtKind::Do(_) => "do",
            StmtKind::For(_) => "for",
            StmtKind::Foreach(_) => "foreach",
            StmtKind::Switch(_) => "switch",
            StmtKind::Try(_) => "try",
            StmtKind::Using(_) => "using",
            StmtKind::Synchronized(_) => "synchronized",
            StmtKind::Labeled(_) => "labeled statement",
            StmtKind::Goto(_) => "goto",
            StmtKind::GotoCase(_) => "goto case",
            StmtKind::Break(_) => "break",
            StmtKind::Continue(_) => "continue",
            StmtKind::Return(_) => "return",
            StmtKind::Throw(_) => "throw",
            StmtKind::Yield(_) => "yield",
            StmtKind::Expression(_) => "expression statement",
            StmtKind::Empty => "empty statement",
            StmtKind::LocalDecl(_) => "local declaration",
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::While(_) | StmtKind::Do(_) | StmtKind::For(_) | StmtKind::Foreach(_)
        )
    }

    /// Directly nested statements, in source order
    pub fn children(&self) -> Vec<&Stmt> {
        match &self.kind {
            StmtKind::Block(b) => b.statements.iter().collect(),
            StmtKind::If(s) => std::iter::once(&*s.then_branch).chain(s.else_branch.as_deref()).collect(),
            StmtKind::While(s) => vec![&*s.body],
            StmtKind::Do(s) => vec![&*s.body],
            StmtKind::For(s) => s.init.iter().chain(std::iter::once(&*s.body)).collect(),
            StmtKind::Foreach(s) => vec![&*s.body],
            StmtKind::Switch(s) => s.sections.iter().flat_map(|sec| sec.statements.iter()).collect(),
            StmtKind::Try(s) => std::iter::once(&*s.block)
                .chain(s.catches.iter().map(|c| &*c.body))
                .chain(s.finally.as_deref())
                .collect(),
            StmtKind::Using(s) => vec![&*s.body],
            StmtKind::Synchronized(s) => vec![&*s.body],
            StmtKind::Labeled(s) => vec![&*s.statement],
            _ => Vec::new(),
        }
    }

    /// Expressions this statement evaluates itself, in source order
    pub fn expressions(&self) -> Vec<&Expr> {
        match &self.kind {
            StmtKind::If(s) => vec![&s.condition],
            StmtKind::While(s) => vec![&s.condition],
            StmtKind::Do(s) => vec![&s.condition],
            StmtKind::For(s) => s.condition.iter().chain(s.update.iter()).collect(),
            StmtKind::Foreach(s) => vec![&s.iterable],
            StmtKind::Switch(s) => std::iter::once(&s.selector)
                .chain(s.sections.iter().flat_map(|sec| {
                    sec.labels.iter().filter_map(|l| match l {
                        CaseLabel::Case(e) => Some(e),
                        CaseLabel::Default => None,
                    })
                }))
                .collect(),
            StmtKind::Using(s) => s.resources.iter().map(|r| &r.init).collect(),
            StmtKind::Synchronized(s) => vec![&s.lock],
            StmtKind::GotoCase(s) => s.case.iter().collect(),
            StmtKind::Return(s) => s.value.iter().collect(),
            StmtKind::Throw(s) => s.exception.iter().collect(),
            StmtKind::Yield(s) => s.value.iter().collect(),
            StmtKind::Expression(e) => vec![e],
            StmtKind::LocalDecl(s) => s.declarators.iter().filter_map(|(_, init)| init.as_ref()).collect(),
            _ => Vec::new(),
        }
    }

    // Builders used by tooling and tests; ids and info are filled by
    // `info::annotate_method`.

    pub fn block(statements: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Block(Block { statements }))
    }

    pub fn if_(condition: Expr, then_branch: Stmt, else_branch: Option<Stmt>) -> Self {
        Self::new(StmtKind::If(IfStmt {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        }))
    }

    pub fn while_(condition: Expr, body: Stmt) -> Self {
        Self::new(StmtKind::While(WhileStmt { condition, body: Box::new(body) }))
    }

    pub fn do_(body: Stmt, condition: Expr) -> Self {
        Self::new(StmtKind::Do(DoStmt { body: Box::new(body), condition }))
    }

    pub fn for_(init: Vec<Stmt>, condition: Option<Expr>, update: Vec<Expr>, body: Stmt) -> Self {
        Self::new(StmtKind::For(ForStmt { init, condition, update, body: Box::new(body) }))
    }

    pub fn foreach(variable: LocalDecl, iterable: Expr, source: ForeachSource, body: Stmt) -> Self {
        Self::new(StmtKind::Foreach(ForeachStmt { variable, iterable, source, body: Box::new(body) }))
    }

    pub fn switch(selector: Expr, kind: SwitchKind, sections: Vec<SwitchSection>) -> Self {
        Self::new(StmtKind::Switch(SwitchStmt { selector, kind, sections }))
    }

    pub fn try_(block: Stmt, catches: Vec<CatchClause>, finally: Option<Stmt>) -> Self {
        Self::new(StmtKind::Try(TryStmt {
            block: Box::new(block),
            catches,
            finally: finally.map(Box::new),
        }))
    }

    pub fn using(resources: Vec<UsingResource>, body: Stmt) -> Self {
        Self::new(StmtKind::Using(UsingStmt { resources, body: Box::new(body) }))
    }

    pub fn synchronized(lock: Expr, body: Stmt) -> Self {
        Self::new(StmtKind::Synchronized(SynchronizedStmt { lock, body: Box::new(body) }))
    }

    pub fn labeled(label: &str, statement: Stmt) -> Self {
        Self::new(StmtKind::Labeled(LabeledStmt { label: label.to_string(), statement: Box::new(statement) }))
    }

    pub fn goto(label: &str) -> Self {
        Self::new(StmtKind::Goto(GotoStmt { label: label.to_string() }))
    }

    pub fn goto_case(case: Option<Expr>) -> Self {
        Self::new(StmtKind::GotoCase(GotoCaseStmt { case }))
    }

    pub fn break_(label: Option<&str>) -> Self {
        Self::new(StmtKind::Break(BreakStmt { label: label.map(str::to_string) }))
    }

    pub fn continue_(label: Option<&str>) -> Self {
        Self::new(StmtKind::Continue(ContinueStmt { label: label.map(str::to_string) }))
    }

    pub fn return_(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Return(ReturnStmt { value }))
    }

    pub fn throw(exception: Option<Expr>) -> Self {
        Self::new(StmtKind::Throw(ThrowStmt { exception }))
    }

    pub fn yield_(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Yield(YieldStmt { value }))
    }

    pub fn expr(expr: Expr) -> Self {
        Self::new(StmtKind::Expression(expr))
    }

    pub fn empty() -> Self {
        Self::new(StmtKind::Empty)
    }

    pub fn local(decl: LocalDecl, init: Option<Expr>) -> Self {
        Self::new(StmtKind::LocalDecl(LocalDeclStmt { declarators: vec![(decl, init)] }))
    }
}

impl SwitchSection {
    pub fn cases(values: Vec<Expr>, statements: Vec<Stmt>) -> Self {
        Self {
            labels: values.into_iter().map(CaseLabel::Case).collect(),
            statements,
        }
    }

    pub fn default(statements: Vec<Stmt>) -> Self {
        Self { labels: vec![CaseLabel::Default], statements }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    BitNot,
}

/// Representation change applied to an expression's value after it is pushed
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    Box(MethodRef),
    Unbox(MethodRef),
    Cast(TypeRef),
}

/// Validation facts attached to every expression
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionInfo {
    pub ty: TypeRef,
    pub constant: Option<ConstValue>,
    pub conversion: Option<Conversion>,
}

impl ExpressionInfo {
    pub fn of(ty: TypeRef) -> Self {
        Self { ty, constant: None, conversion: None }
    }
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub info: ExpressionInfo,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(ConstValue),
    Local(LocalId),
    This,
    Assign { target: LocalId, value: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Call { receiver: Option<Box<Expr>>, method: MethodRef, args: Vec<Expr> },
    Field { receiver: Option<Box<Expr>>, field: FieldRef },
    New { ctor: MethodRef, args: Vec<Expr> },
    Lambda(Box<LambdaExpr>),
}

#[derive(Debug, Clone)]
pub struct LambdaExpr {
    pub id: LambdaId,
    pub parameters: Vec<LocalDecl>,
    pub return_type: TypeRef,
    pub body: Box<Stmt>,
    /// Functional interface method the lambda implements
    pub interface: MethodRef,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: TypeRef) -> Self {
        Self { kind, info: ExpressionInfo::of(ty), span: Span::synthetic() }
    }

    pub fn constant(&self) -> Option<&ConstValue> {
        self.info.constant.as_ref()
    }

    /// Compile-time boolean value of a condition
    pub fn constant_bool(&self) -> Option<bool> {
        self.info.constant.as_ref().and_then(ConstValue::as_bool)
    }

    pub fn ty(&self) -> &TypeRef {
        &self.info.ty
    }

    pub fn literal(value: ConstValue) -> Self {
        let ty = match &value {
            ConstValue::Boolean(_) => TypeRef::boolean(),
            ConstValue::Char(_) => TypeRef::Primitive(super::PrimitiveType::Char),
            ConstValue::Byte(_) => TypeRef::Primitive(super::PrimitiveType::Byte),
            ConstValue::Short(_) => TypeRef::Primitive(super::PrimitiveType::Short),
            ConstValue::Int(_) => TypeRef::int(),
            ConstValue::Long(_) => TypeRef::long(),
            ConstValue::Float(_) => TypeRef::Primitive(super::PrimitiveType::Float),
            ConstValue::Double(_) => TypeRef::Primitive(super::PrimitiveType::Double),
            ConstValue::String(_) => TypeRef::string(),
            ConstValue::Null => TypeRef::object(),
        };
        let mut e = Self::new(ExprKind::Literal(value.clone()), ty);
        e.info.constant = Some(value);
        e
    }

    pub fn int(v: i32) -> Self {
        Self::literal(ConstValue::Int(v))
    }

    pub fn bool(v: bool) -> Self {
        Self::literal(ConstValue::Boolean(v))
    }

    pub fn string(s: &str) -> Self {
        Self::literal(ConstValue::String(s.to_string()))
    }

    pub fn local(decl: &LocalDecl) -> Self {
        Self::new(ExprKind::Local(decl.id), decl.ty.clone())
    }

    pub fn this(class: &str) -> Self {
        Self::new(ExprKind::This, TypeRef::class(class))
    }

    pub fn assign(decl: &LocalDecl, value: Expr) -> Self {
        Self::new(ExprKind::Assign { target: decl.id, value: Box::new(value) }, decl.ty.clone())
    }

    pub fn unary(op: UnaryOp, operand: Expr, ty: TypeRef) -> Self {
        Self::new(ExprKind::Unary { op, operand: Box::new(operand) }, ty)
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, ty: TypeRef) -> Self {
        Self::new(ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, ty)
    }

    pub fn call(receiver: Option<Expr>, method: MethodRef, args: Vec<Expr>) -> Self {
        let ty = method.ret.clone();
        Self::new(ExprKind::Call { receiver: receiver.map(Box::new), method, args }, ty)
    }

    pub fn field(receiver: Option<Expr>, field: FieldRef) -> Self {
        let ty = field.ty.clone();
        Self::new(ExprKind::Field { receiver: receiver.map(Box::new), field }, ty)
    }

    pub fn new_object(ctor: MethodRef, args: Vec<Expr>) -> Self {
        let ty = TypeRef::class(&ctor.owner);
        Self::new(ExprKind::New { ctor, args }, ty)
    }

    pub fn lambda(lambda: LambdaExpr) -> Self {
        let ty = TypeRef::class(&lambda.interface.owner);
        Self::new(ExprKind::Lambda(Box::new(lambda)), ty)
    }

    /// Direct subexpressions; lambda bodies are not entered
    pub fn operands(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Assign { value, .. } => vec![&**value],
            ExprKind::Unary { operand, .. } => vec![&**operand],
            ExprKind::Binary { lhs, rhs, .. } => vec![&**lhs, &**rhs],
            ExprKind::Call { receiver, args, .. } => receiver.as_deref().into_iter().chain(args.iter()).collect(),
            ExprKind::Field { receiver, .. } => receiver.as_deref().into_iter().collect(),
            ExprKind::New { args, .. } => args.iter().collect(),
            ExprKind::Literal(_) | ExprKind::Local(_) | ExprKind::This | ExprKind::Lambda(_) => Vec::new(),
        }
    }

    /// Attach a folded constant, as the validator does for constant expressions
    pub fn with_constant(mut self, value: ConstValue) -> Self {
        self.info.constant = Some(value);
        self
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Static,
    Final,
    Abstract,
    Native,
    Synchronized,
}

/// Erased signature of a method overridden by a declared method
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    pub owner: String,
    pub name: String,
    pub params: Vec<TypeRef>,
    pub ret: TypeRef,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub parameters: Vec<LocalDecl>,
    pub return_type: TypeRef,
    pub body: Option<Stmt>,
    pub is_varargs: bool,
    /// Methods this one overrides, as declared in their owners
    pub overrides: Vec<MethodSignature>,
    /// Element type when the body contains `yield`
    pub iterator_element: Option<TypeRef>,
    pub span: Span,
}

impl MethodDecl {
    pub fn new(name: &str, parameters: Vec<LocalDecl>, return_type: TypeRef, body: Option<Stmt>) -> Self {
        Self {
            name: name.to_string(),
            modifiers: vec![Modifier::Public],
            parameters,
            return_type,
            body,
            is_varargs: false,
            overrides: Vec::new(),
            iterator_element: None,
            span: Span::synthetic(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&Modifier::Static)
    }

    pub fn with_modifiers(mut self, modifiers: Vec<Modifier>) -> Self {
        self.modifiers = modifiers;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub super_name: String,
    pub interfaces: Vec<String>,
    pub modifiers: Vec<Modifier>,
    pub methods: Vec<MethodDecl>,
    pub span: Span,
}

impl ClassDecl {
    pub fn new(name: &str, methods: Vec<MethodDecl>) -> Self {
        Self {
            name: name.to_string(),
            super_name: super::OBJECT.to_string(),
            interfaces: Vec::new(),
            modifiers: vec![Modifier::Public],
            methods,
            span: Span::synthetic(),
        }
    }
}
