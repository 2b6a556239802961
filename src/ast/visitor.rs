use super::*;

/// Read-only traversal over statements and expressions.
///
/// Every method has a default that walks the children, so analyses override
/// only the nodes they care about and call the matching `walk_*` function to
/// keep descending.
pub trait Visitor {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_lambda(&mut self, lambda: &LambdaExpr) {
        walk_lambda(self, lambda);
    }

    /// Called for every local introduced by a declaration, foreach, catch or using
    fn visit_local_decl(&mut self, _decl: &LocalDecl) {}
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Block(block) => {
            for s in &block.statements {
                v.visit_stmt(s);
            }
        }
        StmtKind::If(s) => {
            v.visit_expr(&s.condition);
            v.visit_stmt(&s.then_branch);
            if let Some(e) = &s.else_branch {
                v.visit_stmt(e);
            }
        }
        StmtKind::While(s) => {
            v.visit_expr(&s.condition);
            v.visit_stmt(&s.body);
        }
        StmtKind::Do(s) => {
            v.visit_stmt(&s.body);
            v.visit_expr(&s.condition);
        }
        StmtKind::For(s) => {
            for i in &s.init {
                v.visit_stmt(i);
            }
            if let Some(c) = &s.condition {
                v.visit_expr(c);
            }
            v.visit_stmt(&s.body);
            for u in &s.update {
                v.visit_expr(u);
            }
        }
        StmtKind::Foreach(s) => {
            v.visit_expr(&s.iterable);
            v.visit_local_decl(&s.variable);
            v.visit_stmt(&s.body);
        }
        StmtKind::Switch(s) => {
            v.visit_expr(&s.selector);
            for section in &s.sections {
                for label in &section.labels {
                    if let CaseLabel::Case(e) = label {
                        v.visit_expr(e);
                    }
                }
                for st in &section.statements {
                    v.visit_stmt(st);
                }
            }
        }
        StmtKind::Try(s) => {
            v.visit_stmt(&s.block);
            for c in &s.catches {
                if let Some(var) = &c.variable {
                    v.visit_local_decl(var);
                }
                v.visit_stmt(&c.body);
            }
            if let Some(f) = &s.finally {
                v.visit_stmt(f);
            }
        }
        StmtKind::Using(s) => {
            for r in &s.resources {
                v.visit_expr(&r.init);
                if let Some(var) = &r.variable {
                    v.visit_local_decl(var);
                }
            }
            v.visit_stmt(&s.body);
        }
        StmtKind::Synchronized(s) => {
            v.visit_expr(&s.lock);
            v.visit_stmt(&s.body);
        }
        StmtKind::Labeled(s) => v.visit_stmt(&s.statement),
        StmtKind::GotoCase(s) => {
            if let Some(e) = &s.case {
                v.visit_expr(e);
            }
        }
        StmtKind::Return(s) => {
            if let Some(e) = &s.value {
                v.visit_expr(e);
            }
        }
        StmtKind::Throw(s) => {
            if let Some(e) = &s.exception {
                v.visit_expr(e);
            }
        }
        StmtKind::Yield(s) => {
            if let Some(e) = &s.value {
                v.visit_expr(e);
            }
        }
        StmtKind::Expression(e) => v.visit_expr(e),
        StmtKind::LocalDecl(s) => {
            for (decl, init) in &s.declarators {
                v.visit_local_decl(decl);
                if let Some(e) = init {
                    v.visit_expr(e);
                }
            }
        }
        StmtKind::Goto(_) | StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Empty => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Local(_) | ExprKind::This => {}
        ExprKind::Assign { value, .. } => v.visit_expr(value),
        ExprKind::Unary { operand, .. } => v.visit_expr(operand),
        ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        ExprKind::Call { receiver, args, .. } => {
            if let Some(r) = receiver {
                v.visit_expr(r);
            }
            for a in args {
                v.visit_expr(a);
            }
        }
        ExprKind::Field { receiver, .. } => {
            if let Some(r) = receiver {
                v.visit_expr(r);
            }
        }
        ExprKind::New { args, .. } => {
            for a in args {
                v.visit_expr(a);
            }
        }
        ExprKind::Lambda(lambda) => v.visit_lambda(lambda),
    }
}

pub fn walk_lambda<V: Visitor + ?Sized>(v: &mut V, lambda: &LambdaExpr) {
    for p in &lambda.parameters {
        v.visit_local_decl(p);
    }
    v.visit_stmt(&lambda.body);
}

/// Ids of `stmt` and every statement nested in it, lambda bodies excluded
pub fn collect_stmt_ids(stmt: &Stmt) -> Vec<StmtId> {
    struct Ids(Vec<StmtId>);
    impl Visitor for Ids {
        fn visit_stmt(&mut self, stmt: &Stmt) {
            self.0.push(stmt.id);
            walk_stmt(self, stmt);
        }
        fn visit_lambda(&mut self, _lambda: &LambdaExpr) {}
    }
    let mut ids = Ids(Vec::new());
    ids.visit_stmt(stmt);
    ids.0
}

/// True when any expression under `stmt` (lambdas included) refers to `this`
pub fn uses_this(stmt: &Stmt) -> bool {
    struct ThisFinder(bool);
    impl Visitor for ThisFinder {
        fn visit_expr(&mut self, expr: &Expr) {
            if matches!(expr.kind, ExprKind::This) {
                self.0 = true;
            }
            walk_expr(self, expr);
        }
    }
    let mut finder = ThisFinder(false);
    finder.visit_stmt(stmt);
    finder.0
}
