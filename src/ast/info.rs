//! Fills [`StatementInfo`] on a well-formed tree the way the validator does:
//! statement ids, folded constants, jump targets, reachability and yield
//! counts.
//!
//! The generator itself only reads these facts. This pass exists so that
//! tooling and tests can build trees by hand without a full front end.

use super::*;
use crate::codegen::const_fold;
use std::collections::{HashMap, HashSet};

/// Annotate a method body in place
pub fn annotate_method(method: &mut MethodDecl) {
    if let Some(body) = method.body.as_mut() {
        annotate_body(body);
    }
}

/// Annotate a free-standing body (method or lambda) in place
pub fn annotate_body(body: &mut Stmt) {
    let mut next = 1;
    assign_ids(body, &mut next);
    annotate_tree(body);
}

fn annotate_tree(body: &mut Stmt) {
    fold_stmt(body);
    let mut resolver = Resolver::default();
    resolver.collect_labels(body);
    resolver.visit_stmt(body);
    resolver.reach(body, true);

    let mut lambdas = Vec::new();
    collect_lambdas_split(body, &mut lambdas);
    for lambda in lambdas {
        annotate_tree(&mut lambda.body);
    }
}

fn assign_ids(stmt: &mut Stmt, next: &mut u32) {
    stmt.id = StmtId(*next);
    *next += 1;
    for e in exprs_mut(stmt) {
        let mut lambdas = Vec::new();
        collect_lambdas(e, &mut lambdas);
        for l in lambdas {
            assign_ids(&mut l.body, next);
        }
    }
    for child in children_mut(stmt) {
        assign_ids(child, next);
    }
}

/// Direct child statements
fn children_mut(stmt: &mut Stmt) -> Vec<&mut Stmt> {
    match &mut stmt.kind {
        StmtKind::Block(b) => b.statements.iter_mut().collect(),
        StmtKind::If(s) => {
            let mut v = vec![&mut *s.then_branch];
            if let Some(e) = s.else_branch.as_deref_mut() {
                v.push(e);
            }
            v
        }
        StmtKind::While(s) => vec![&mut *s.body],
        StmtKind::Do(s) => vec![&mut *s.body],
        StmtKind::For(s) => {
            let mut v: Vec<&mut Stmt> = s.init.iter_mut().collect();
            v.push(&mut *s.body);
            v
        }
        StmtKind::Foreach(s) => vec![&mut *s.body],
        StmtKind::Switch(s) => s.sections.iter_mut().flat_map(|sec| sec.statements.iter_mut()).collect(),
        StmtKind::Try(s) => {
            let mut v = vec![&mut *s.block];
            v.extend(s.catches.iter_mut().map(|c| &mut *c.body));
            if let Some(f) = s.finally.as_deref_mut() {
                v.push(f);
            }
            v
        }
        StmtKind::Using(s) => vec![&mut *s.body],
        StmtKind::Synchronized(s) => vec![&mut *s.body],
        StmtKind::Labeled(s) => vec![&mut *s.statement],
        _ => Vec::new(),
    }
}

fn fold_stmt(stmt: &mut Stmt) {
    for e in exprs_mut(stmt) {
        fold_expr(e);
    }
    for child in children_mut(stmt) {
        fold_stmt(child);
    }
}

/// Attach a value to every operator expression whose operands are all
/// constant, innermost first. Lambda bodies are folded with their own tree.
fn fold_expr(expr: &mut Expr) {
    let folded = match &mut expr.kind {
        ExprKind::Unary { op, operand } => {
            fold_expr(operand);
            operand.constant().and_then(|v| const_fold::fold_unary(*op, v))
        }
        ExprKind::Binary { op, lhs, rhs } => {
            fold_expr(lhs);
            fold_expr(rhs);
            match (lhs.constant(), rhs.constant()) {
                (Some(l), Some(r)) => const_fold::fold_binary(*op, l, r),
                _ => None,
            }
        }
        ExprKind::Assign { value, .. } => {
            fold_expr(value);
            None
        }
        ExprKind::Call { receiver, args, .. } => {
            receiver.iter_mut().for_each(|r| fold_expr(r));
            args.iter_mut().for_each(fold_expr);
            None
        }
        ExprKind::Field { receiver, .. } => {
            receiver.iter_mut().for_each(|r| fold_expr(r));
            None
        }
        ExprKind::New { args, .. } => {
            args.iter_mut().for_each(fold_expr);
            None
        }
        ExprKind::Literal(_) | ExprKind::Local(_) | ExprKind::This | ExprKind::Lambda(_) => None,
    };
    if expr.info.constant.is_none() {
        expr.info.constant = folded;
    }
}

/// Expressions owned directly by a statement
fn exprs_mut(stmt: &mut Stmt) -> Vec<&mut Expr> {
    match &mut stmt.kind {
        StmtKind::If(s) => vec![&mut s.condition],
        StmtKind::While(s) => vec![&mut s.condition],
        StmtKind::Do(s) => vec![&mut s.condition],
        StmtKind::For(s) => {
            let ForStmt { condition, update, .. } = s;
            let mut v: Vec<&mut Expr> = condition.iter_mut().collect();
            v.extend(update.iter_mut());
            v
        }
        StmtKind::Foreach(s) => vec![&mut s.iterable],
        StmtKind::Switch(s) => {
            let SwitchStmt { selector, sections, .. } = s;
            let mut v = vec![selector];
            for sec in sections.iter_mut() {
                for label in sec.labels.iter_mut() {
                    if let CaseLabel::Case(e) = label {
                        v.push(e);
                    }
                }
            }
            v
        }
        StmtKind::Using(s) => s.resources.iter_mut().map(|r| &mut r.init).collect(),
        StmtKind::Synchronized(s) => vec![&mut s.lock],
        StmtKind::GotoCase(s) => s.case.iter_mut().collect(),
        StmtKind::Return(s) => s.value.iter_mut().collect(),
        StmtKind::Throw(s) => s.exception.iter_mut().collect(),
        StmtKind::Yield(s) => s.value.iter_mut().collect(),
        StmtKind::Expression(e) => vec![e],
        StmtKind::LocalDecl(s) => s.declarators.iter_mut().filter_map(|(_, init)| init.as_mut()).collect(),
        _ => Vec::new(),
    }
}

fn collect_lambdas<'a>(e: &'a mut Expr, out: &mut Vec<&'a mut LambdaExpr>) {
    match &mut e.kind {
        ExprKind::Literal(_) | ExprKind::Local(_) | ExprKind::This => {}
        ExprKind::Assign { value, .. } => collect_lambdas(value, out),
        ExprKind::Unary { operand, .. } => collect_lambdas(operand, out),
        ExprKind::Binary { lhs, rhs, .. } => {
            collect_lambdas(lhs, out);
            collect_lambdas(rhs, out);
        }
        ExprKind::Call { receiver, args, .. } => {
            if let Some(r) = receiver.as_deref_mut() {
                collect_lambdas(r, out);
            }
            for a in args.iter_mut() {
                collect_lambdas(a, out);
            }
        }
        ExprKind::Field { receiver, .. } => {
            if let Some(r) = receiver.as_deref_mut() {
                collect_lambdas(r, out);
            }
        }
        ExprKind::New { args, .. } => {
            for a in args.iter_mut() {
                collect_lambdas(a, out);
            }
        }
        ExprKind::Lambda(l) => out.push(&mut **l),
    }
}

/// Lambdas directly owned by the statement tree, not those nested in other lambdas
fn collect_lambdas_split<'a>(stmt: &'a mut Stmt, out: &mut Vec<&'a mut LambdaExpr>) {
    match &mut stmt.kind {
        StmtKind::Block(b) => {
            for s in b.statements.iter_mut() {
                collect_lambdas_split(s, out);
            }
        }
        StmtKind::If(s) => {
            collect_lambdas(&mut s.condition, out);
            collect_lambdas_split(&mut s.then_branch, out);
            if let Some(e) = s.else_branch.as_deref_mut() {
                collect_lambdas_split(e, out);
            }
        }
        StmtKind::While(s) => {
            collect_lambdas(&mut s.condition, out);
            collect_lambdas_split(&mut s.body, out);
        }
        StmtKind::Do(s) => {
            collect_lambdas_split(&mut s.body, out);
            collect_lambdas(&mut s.condition, out);
        }
        StmtKind::For(s) => {
            for i in s.init.iter_mut() {
                collect_lambdas_split(i, out);
            }
            if let Some(c) = s.condition.as_mut() {
                collect_lambdas(c, out);
            }
            for u in s.update.iter_mut() {
                collect_lambdas(u, out);
            }
            collect_lambdas_split(&mut s.body, out);
        }
        StmtKind::Foreach(s) => {
            collect_lambdas(&mut s.iterable, out);
            collect_lambdas_split(&mut s.body, out);
        }
        StmtKind::Switch(s) => {
            collect_lambdas(&mut s.selector, out);
            for sec in s.sections.iter_mut() {
                for st in sec.statements.iter_mut() {
                    collect_lambdas_split(st, out);
                }
            }
        }
        StmtKind::Try(s) => {
            collect_lambdas_split(&mut s.block, out);
            for c in s.catches.iter_mut() {
                collect_lambdas_split(&mut c.body, out);
            }
            if let Some(f) = s.finally.as_deref_mut() {
                collect_lambdas_split(f, out);
            }
        }
        StmtKind::Using(s) => {
            for r in s.resources.iter_mut() {
                collect_lambdas(&mut r.init, out);
            }
            collect_lambdas_split(&mut s.body, out);
        }
        StmtKind::Synchronized(s) => {
            collect_lambdas(&mut s.lock, out);
            collect_lambdas_split(&mut s.body, out);
        }
        StmtKind::Labeled(s) => collect_lambdas_split(&mut s.statement, out),
        StmtKind::Return(ReturnStmt { value: Some(e) })
        | StmtKind::Throw(ThrowStmt { exception: Some(e) })
        | StmtKind::Yield(YieldStmt { value: Some(e) })
        | StmtKind::Expression(e) => collect_lambdas(e, out),
        StmtKind::LocalDecl(s) => {
            for (_, init) in s.declarators.iter_mut() {
                if let Some(e) = init.as_mut() {
                    collect_lambdas(e, out);
                }
            }
        }
        _ => {}
    }
}

#[derive(Debug, Clone)]
enum Enclosing {
    Loop(StmtId),
    Switch(StmtId),
    Labeled { name: String, id: StmtId, inner: StmtId },
}

#[derive(Default)]
struct Resolver {
    labels: HashMap<String, StmtId>,
    targets: HashMap<StmtId, StmtId>,
    targeted: HashSet<StmtId>,
    break_targets: HashSet<StmtId>,
    continue_targets: HashSet<StmtId>,
    goto_targets: HashSet<StmtId>,
    enclosing: Vec<Enclosing>,
}

impl Resolver {
    fn collect_labels(&mut self, body: &Stmt) {
        struct Labels<'a>(&'a mut HashMap<String, StmtId>);
        impl Visitor for Labels<'_> {
            fn visit_stmt(&mut self, stmt: &Stmt) {
                if let StmtKind::Labeled(l) = &stmt.kind {
                    self.0.insert(l.label.clone(), stmt.id);
                }
                walk_stmt(self, stmt);
            }
            fn visit_lambda(&mut self, _lambda: &LambdaExpr) {}
        }
        Labels(&mut self.labels).visit_stmt(body);
    }

    fn bind(&mut self, from: StmtId, to: Option<StmtId>) -> Option<StmtId> {
        if let Some(to) = to {
            self.targets.insert(from, to);
            self.targeted.insert(to);
        }
        to
    }

    fn find_labeled(&self, name: &str) -> Option<(StmtId, StmtId)> {
        self.enclosing.iter().rev().find_map(|e| match e {
            Enclosing::Labeled { name: n, id, inner } if n == name => Some((*id, *inner)),
            _ => None,
        })
    }

    /// Reachability pass; returns whether the end point of `stmt` is reachable
    fn reach(&self, stmt: &mut Stmt, reachable: bool) -> bool {
        let id = stmt.id;
        let reachable = reachable || self.goto_targets.contains(&id);
        if !reachable {
            let revived = if let StmtKind::Block(b) = &mut stmt.kind {
                let mut r = false;
                for s in b.statements.iter_mut() {
                    r = self.reach(s, r);
                }
                r
            } else {
                for child in children_mut(stmt) {
                    self.reach(child, false);
                }
                false
            };
            stmt.info = None;
            return revived;
        }

        let end = match &mut stmt.kind {
            StmtKind::Block(b) => {
                let mut r = true;
                for s in b.statements.iter_mut() {
                    r = self.reach(s, r);
                }
                r
            }
            StmtKind::If(s) => {
                let c = s.condition.constant_bool();
                let t = self.reach(&mut s.then_branch, c != Some(false));
                let e = match s.else_branch.as_deref_mut() {
                    Some(e) => self.reach(e, c != Some(true)),
                    None => c != Some(true),
                };
                t || e
            }
            StmtKind::While(s) => {
                let c = s.condition.constant_bool();
                self.reach(&mut s.body, c != Some(false));
                c != Some(true) || self.break_targets.contains(&id)
            }
            StmtKind::Do(s) => {
                let c = s.condition.constant_bool();
                let body_end = self.reach(&mut s.body, true);
                let cond_reachable = body_end || self.continue_targets.contains(&id);
                (cond_reachable && c != Some(true)) || self.break_targets.contains(&id)
            }
            StmtKind::For(s) => {
                let mut r = true;
                for i in s.init.iter_mut() {
                    r = self.reach(i, r);
                }
                let c = s.condition.as_ref().and_then(|c| c.constant_bool());
                let infinite = s.condition.is_none() || c == Some(true);
                self.reach(&mut s.body, r && c != Some(false));
                (r && !infinite) || self.break_targets.contains(&id)
            }
            StmtKind::Foreach(s) => {
                self.reach(&mut s.body, true);
                true
            }
            StmtKind::Switch(s) => {
                let has_default = s.sections.iter().any(|sec| sec.is_default());
                let mut last = true;
                for sec in s.sections.iter_mut() {
                    let mut r = true;
                    for st in sec.statements.iter_mut() {
                        r = self.reach(st, r);
                    }
                    last = r;
                }
                !has_default || last || self.break_targets.contains(&id)
            }
            StmtKind::Try(s) => {
                let mut any = self.reach(&mut s.block, true);
                for c in s.catches.iter_mut() {
                    any |= self.reach(&mut c.body, true);
                }
                match s.finally.as_deref_mut() {
                    Some(f) => {
                        let fin = self.reach(f, true);
                        any && fin
                    }
                    None => any,
                }
            }
            StmtKind::Using(s) => self.reach(&mut s.body, true),
            StmtKind::Synchronized(s) => self.reach(&mut s.body, true),
            StmtKind::Labeled(s) => {
                let inner = self.reach(&mut s.statement, true);
                inner || self.break_targets.contains(&id)
            }
            StmtKind::Goto(_)
            | StmtKind::GotoCase(_)
            | StmtKind::Break(_)
            | StmtKind::Continue(_)
            | StmtKind::Return(_)
            | StmtKind::Throw(_) => false,
            StmtKind::Yield(s) => s.value.is_some(),
            StmtKind::Expression(_) | StmtKind::Empty | StmtKind::LocalDecl(_) => true,
        };

        stmt.info = Some(StatementInfo {
            target: self.targets.get(&id).copied(),
            is_end_point_reachable: end,
            is_targeted: self.targeted.contains(&id),
            yield_count: count_yields(stmt),
        });
        end
    }
}

impl Visitor for Resolver {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        let id = stmt.id;
        match &stmt.kind {
            StmtKind::While(_) | StmtKind::Do(_) | StmtKind::For(_) | StmtKind::Foreach(_) => {
                self.enclosing.push(Enclosing::Loop(id));
                walk_stmt(self, stmt);
                self.enclosing.pop();
            }
            StmtKind::Switch(_) => {
                self.enclosing.push(Enclosing::Switch(id));
                walk_stmt(self, stmt);
                self.enclosing.pop();
            }
            StmtKind::Labeled(l) => {
                self.enclosing.push(Enclosing::Labeled {
                    name: l.label.clone(),
                    id,
                    inner: l.statement.id,
                });
                walk_stmt(self, stmt);
                self.enclosing.pop();
            }
            StmtKind::Break(b) => {
                let target = match &b.label {
                    Some(name) => self.find_labeled(name).map(|(id, _)| id),
                    None => self.enclosing.iter().rev().find_map(|e| match e {
                        Enclosing::Loop(t) | Enclosing::Switch(t) => Some(*t),
                        _ => None,
                    }),
                };
                if let Some(t) = self.bind(id, target) {
                    self.break_targets.insert(t);
                }
            }
            StmtKind::Continue(c) => {
                let target = match &c.label {
                    Some(name) => self.find_labeled(name).map(|(_, inner)| inner),
                    None => self.enclosing.iter().rev().find_map(|e| match e {
                        Enclosing::Loop(t) => Some(*t),
                        _ => None,
                    }),
                };
                if let Some(t) = self.bind(id, target) {
                    self.continue_targets.insert(t);
                }
            }
            StmtKind::Goto(g) => {
                let target = self.labels.get(&g.label).copied();
                if let Some(t) = self.bind(id, target) {
                    self.goto_targets.insert(t);
                }
            }
            StmtKind::GotoCase(_) => {
                let target = self.enclosing.iter().rev().find_map(|e| match e {
                    Enclosing::Switch(t) => Some(*t),
                    _ => None,
                });
                self.bind(id, target);
                walk_stmt(self, stmt);
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_lambda(&mut self, _lambda: &LambdaExpr) {}
}

/// Number of `yield value` statements under `stmt`, lambda bodies excluded
pub fn count_yields(stmt: &Stmt) -> u32 {
    struct Yields(u32);
    impl Visitor for Yields {
        fn visit_stmt(&mut self, stmt: &Stmt) {
            if let StmtKind::Yield(YieldStmt { value: Some(_) }) = &stmt.kind {
                self.0 += 1;
            }
            walk_stmt(self, stmt);
        }
        fn visit_lambda(&mut self, _lambda: &LambdaExpr) {}
    }
    let mut y = Yields(0);
    y.visit_stmt(stmt);
    y.0
}
