//! Exception regions and the cleanup walk.
//!
//! A finally body is emitted once as the catch-all handler and again inline
//! at every exit that leaves its try: the normal exits of the try block and
//! catches, and every early exit (`break`, `continue`, `goto`, `return`,
//! `yield break`) found by [`Gen::gen_exit_cleanup`]. `using` and
//! `synchronized` get the same treatment for dispose and monitor exit.
//! Inline cleanup is cut out of the protected range it leaves.

use crate::ast::*;
use crate::codegen::gen::Gen;
use crate::codegen::method_context::{Frame, FrameKind, MethodGenerationContext};
use crate::codegen::opcodes::Opcode;
use crate::consts;
use crate::error::Result;

impl<'g> Gen<'g> {
    /// Emit one copy of a finally body with its own labels
    pub(crate) fn gen_finally_inline<'a>(&mut self, cx: &mut MethodGenerationContext<'a>, finally: &'a Stmt) -> Result<()> {
        cx.push_label_layer(finally);
        cx.enter_finally();
        let result = self.gen_stat(cx, finally);
        cx.exit_finally();
        cx.pop_label_layer();
        result
    }

    /// Catch-all handler body: save the exception, run `cleanup`, rethrow
    pub(crate) fn gen_rethrow_after<'a, F>(&mut self, cx: &mut MethodGenerationContext<'a>, cleanup: F) -> Result<()>
    where
        F: FnOnce(&mut Self, &mut MethodGenerationContext<'a>) -> Result<()>,
    {
        cx.enter_scope();
        let exc = cx.new_temp(&TypeRef::class(consts::THROWABLE));
        cx.code.emit_store(ValueKind::Reference, exc);
        cleanup(self, cx)?;
        cx.code.emit_load(ValueKind::Reference, exc);
        cx.code.emitop(Opcode::Athrow);
        cx.exit_scope()
    }

    /// `resource.dispose()` unless the resource is null
    pub(crate) fn emit_dispose(cx: &mut MethodGenerationContext<'_>, slot: u16, dispose: &MethodRef) -> Result<()> {
        let skip = cx.new_label();
        cx.code.emit_load(ValueKind::Reference, slot);
        cx.code.emit_jump(Opcode::Ifnull, skip);
        cx.code.emit_load(ValueKind::Reference, slot);
        cx.code.emit_invoke(dispose);
        cx.code.mark(skip)
    }

    fn gen_frame_cleanup<'a>(&mut self, cx: &mut MethodGenerationContext<'a>, frame: &Frame<'a>) -> Result<()> {
        match frame.kind {
            FrameKind::TryFinally { finally, .. } => self.gen_finally_inline(cx, finally),
            FrameKind::Synchronized { lock_slot, .. } => {
                cx.code.emit_load(ValueKind::Reference, lock_slot);
                cx.code.emitop(Opcode::Monitorexit);
                Ok(())
            }
            FrameKind::Using { slot, dispose, .. } => Self::emit_dispose(cx, slot, dispose),
            FrameKind::Dispose { slot, dispose, .. } => {
                cx.code.emit_load(ValueKind::Reference, slot);
                cx.code.emit_invoke(dispose);
                Ok(())
            }
            FrameKind::Loop | FrameKind::Switch | FrameKind::Labeled => Ok(()),
        }
    }

    /// Emit the cleanup of every frame an exit to `target` leaves, innermost
    /// first. `None` leaves the method. Each frame's cleanup runs with that
    /// frame and everything inside it detached. Returns the regions that were
    /// suspended; the caller resumes them after emitting its jump.
    pub(crate) fn gen_exit_cleanup<'a>(
        &mut self,
        cx: &mut MethodGenerationContext<'a>,
        target: Option<StmtId>,
    ) -> Result<Vec<usize>> {
        let stop = target.map(|t| cx.ancestors_inclusive(t));
        let frames: Vec<Frame<'a>> = cx.frames().to_vec();
        let mut passed = Vec::new();
        for (depth, frame) in frames.iter().enumerate().rev() {
            if stop.as_ref().map_or(false, |s| s.contains(&frame.stmt)) {
                break;
            }
            let Some(region) = frame.region() else { continue };
            cx.suspend_region(region)?;
            passed.push(region);

            let detached = cx.take_frames_from(depth);
            let result = self.gen_frame_cleanup(cx, frame);
            cx.restore_frames(detached);
            result?;
        }
        Ok(passed)
    }

    pub(crate) fn resume_regions(cx: &mut MethodGenerationContext<'_>, passed: &[usize]) -> Result<()> {
        for &region in passed {
            cx.resume_region(region)?;
        }
        Ok(())
    }

    pub(crate) fn gen_try<'a>(&mut self, cx: &mut MethodGenerationContext<'a>, stmt: &'a Stmt, s: &'a TryStmt) -> Result<()> {
        let finally = s.finally.as_deref();
        let end = cx.new_label();

        let try_region = cx.open_region()?;
        if let Some(f) = finally {
            cx.push_frame(stmt.id, FrameKind::TryFinally { finally: f, region: try_region });
        }
        self.gen_stat(cx, &s.block)?;
        if finally.is_some() {
            cx.pop_frame();
        }
        let try_segments = cx.close_region(try_region)?;
        if s.block.completes_normally() {
            if let Some(f) = finally {
                self.gen_finally_inline(cx, f)?;
            }
            cx.code.emit_goto(end);
        }

        // Everything the finally handler protects
        let mut guarded = try_segments.clone();

        for catch in &s.catches {
            let handler = cx.code.entry_point()?;
            for &(start, stop) in &try_segments {
                cx.code.add_region(start, stop, handler, catch.exception_type.as_ref());
            }

            let catch_region = match finally {
                Some(f) => {
                    let region = cx.open_region()?;
                    cx.push_frame(stmt.id, FrameKind::TryFinally { finally: f, region });
                    Some(region)
                }
                None => None,
            };

            cx.enter_scope();
            let slot = match &catch.variable {
                Some(var) => Self::store_into_slot(cx, var, catch.body.span)?,
                None => {
                    let ty = catch.exception_type.clone().unwrap_or_else(|| TypeRef::class(consts::THROWABLE));
                    let tmp = cx.new_temp(&ty);
                    cx.code.emit_store(ValueKind::Reference, tmp);
                    tmp
                }
            };
            cx.push_catch_var(slot);
            self.gen_stat(cx, &catch.body)?;
            cx.pop_catch_var();
            cx.exit_scope()?;

            if let Some(region) = catch_region {
                cx.pop_frame();
                guarded.extend(cx.close_region(region)?);
            }
            if catch.body.completes_normally() {
                if let Some(f) = finally {
                    self.gen_finally_inline(cx, f)?;
                }
                cx.code.emit_goto(end);
            }
        }

        if let Some(f) = finally {
            let handler = cx.code.entry_point()?;
            for (start, stop) in guarded {
                cx.code.add_region(start, stop, handler, None);
            }
            self.gen_rethrow_after(cx, |gen, cx| gen.gen_finally_inline(cx, f))?;
        }
        cx.code.mark(end)
    }

    pub(crate) fn gen_synchronized<'a>(
        &mut self,
        cx: &mut MethodGenerationContext<'a>,
        stmt: &'a Stmt,
        s: &'a SynchronizedStmt,
    ) -> Result<()> {
        cx.enter_scope();
        self.gen_expr(cx, &s.lock)?;
        cx.code.emitop(Opcode::Dup);
        let lock_slot = cx.new_temp(&TypeRef::object());
        cx.code.emit_store(ValueKind::Reference, lock_slot);
        cx.code.emitop(Opcode::Monitorenter);

        let region = cx.open_region()?;
        cx.push_frame(stmt.id, FrameKind::Synchronized { lock_slot, region });
        self.gen_stat(cx, &s.body)?;
        cx.pop_frame();
        let segments = cx.close_region(region)?;

        let end = cx.new_label();
        if s.body.completes_normally() {
            cx.code.emit_load(ValueKind::Reference, lock_slot);
            cx.code.emitop(Opcode::Monitorexit);
            cx.code.emit_goto(end);
        }
        let handler = cx.code.entry_point()?;
        for (start, stop) in segments {
            cx.code.add_region(start, stop, handler, None);
        }
        self.gen_rethrow_after(cx, |_, cx| {
            cx.code.emit_load(ValueKind::Reference, lock_slot);
            cx.code.emitop(Opcode::Monitorexit);
            Ok(())
        })?;
        cx.code.mark(end)?;
        cx.exit_scope()
    }

    /// Resources are acquired left to right; each one wraps the rest of the
    /// statement in its own region, so disposal runs right to left.
    pub(crate) fn gen_using<'a>(
        &mut self,
        cx: &mut MethodGenerationContext<'a>,
        stmt: &'a Stmt,
        s: &'a UsingStmt,
        index: usize,
    ) -> Result<()> {
        let Some(resource) = s.resources.get(index) else {
            return self.gen_stat(cx, &s.body);
        };
        let spans_yield = stmt.info.as_ref().map_or(false, |i| i.yield_count > 0);

        self.gen_expr(cx, &resource.init)?;
        let slot = match (&resource.variable, spans_yield) {
            (Some(var), false) => Self::store_into_slot(cx, var, stmt.span)?,
            (Some(var), true) => {
                cx.code.emitop(Opcode::Dup);
                let tmp = cx.new_spill_temp(&var.ty, true);
                cx.code.emit_store(ValueKind::Reference, tmp);
                cx.declare_local(var);
                cx.emit_store_local(var.id, &var.ty, stmt.span)?;
                tmp
            }
            (None, _) => {
                let tmp = cx.new_spill_temp(resource.init.ty(), spans_yield);
                cx.code.emit_store(ValueKind::Reference, tmp);
                tmp
            }
        };

        let region = cx.open_region()?;
        cx.push_frame(stmt.id, FrameKind::Using { slot, dispose: &resource.dispose, region });
        self.gen_using(cx, stmt, s, index + 1)?;
        cx.pop_frame();
        let segments = cx.close_region(region)?;

        let end = cx.new_label();
        if s.body.completes_normally() {
            Self::emit_dispose(cx, slot, &resource.dispose)?;
            cx.code.emit_goto(end);
        }
        let handler = cx.code.entry_point()?;
        for (start, stop) in segments {
            cx.code.add_region(start, stop, handler, None);
        }
        let dispose = &resource.dispose;
        self.gen_rethrow_after(cx, |_, cx| Self::emit_dispose(cx, slot, dispose))?;
        cx.code.mark(end)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::codegen::code::{Instruction, MethodBody};
    use crate::codegen::expr::StackExprGen;
    use crate::codegen::gen::{ClassContext, Gen};
    use crate::codegen::method_context::MethodGenerationContext;
    use crate::codegen::opcodes::Opcode;
    use crate::config::Config;

    fn marker(name: &str) -> Stmt {
        let m = MethodRef::new("Foo", name, vec![], TypeRef::void(), InvokeKind::Static);
        Stmt::expr(Expr::call(None, m, vec![]))
    }

    fn calls_to(body: &MethodBody, name: &str) -> usize {
        body.count(|i| matches!(i, Instruction::Invoke(m) if m.name == name))
    }

    fn lower(body: Stmt) -> MethodBody {
        let mut body = body;
        info::annotate_body(&mut body);
        let mut exprs = StackExprGen::new();
        let mut class = ClassContext::new("Foo", Config::default());
        let mut gen = Gen::new(&mut exprs, &mut class);
        let mut cx = MethodGenerationContext::new("Foo", "run", true, TypeRef::void(), false);
        gen.gen_method_body(&mut cx, &body).unwrap();
        cx.code.finish().unwrap()
    }

    #[test]
    fn test_try_catch_registers_typed_region() {
        let e = LocalDecl::new(1, "e", TypeRef::class("java/io/IOException"));
        let body = Stmt::block(vec![Stmt::try_(
            Stmt::block(vec![marker("work")]),
            vec![CatchClause {
                exception_type: Some(TypeRef::class("java/io/IOException")),
                variable: Some(e),
                body: Box::new(Stmt::block(vec![marker("recover")])),
            }],
            None,
        )]);
        let code = lower(body);
        assert_eq!(code.exception_table.len(), 1);
        let entry = &code.exception_table[0];
        assert_eq!(entry.catch_type.as_deref(), Some("java/io/IOException"));
        assert_eq!((entry.start_pc, entry.end_pc), (0, 1));
        assert_eq!(code.instructions[entry.handler_pc], Instruction::Store { kind: ValueKind::Reference, slot: 0 });
    }

    #[test]
    fn test_finally_runs_on_every_exit() {
        // while (c) { try { if (c) break; if (c) continue; if (c) return; } finally { fin(); } }
        let c = LocalDecl::new(1, "c", TypeRef::boolean());
        let guarded = |s: Stmt| Stmt::if_(Expr::local(&c), s, None);
        let body = Stmt::block(vec![
            Stmt::local(c.clone(), None),
            Stmt::while_(
                Expr::local(&c),
                Stmt::block(vec![Stmt::try_(
                    Stmt::block(vec![
                        guarded(Stmt::break_(None)),
                        guarded(Stmt::continue_(None)),
                        guarded(Stmt::return_(None)),
                    ]),
                    vec![],
                    Some(Stmt::block(vec![marker("fin")])),
                )]),
            ),
        ]);
        let code = lower(body);
        // three early exits, the normal exit and the handler
        assert_eq!(calls_to(&code, "fin"), 5);
        // the inline copies are cut out of the protected range; the segment
        // after the return is empty and dropped
        assert_eq!(code.exception_table.len(), 3);
        for entry in &code.exception_table {
            for pc in entry.start_pc..entry.end_pc {
                assert!(!matches!(&code.instructions[pc], Instruction::Invoke(m) if m.name == "fin"));
            }
        }
    }

    #[test]
    fn test_finally_with_loop_gets_fresh_labels() {
        let c = LocalDecl::new(1, "c", TypeRef::boolean());
        let body = Stmt::block(vec![
            Stmt::local(c.clone(), None),
            Stmt::try_(
                Stmt::block(vec![Stmt::if_(Expr::local(&c), Stmt::return_(None), None)]),
                vec![],
                Some(Stmt::block(vec![Stmt::while_(
                    Expr::local(&c),
                    Stmt::block(vec![Stmt::break_(None)]),
                )])),
            ),
        ]);
        // three copies of a loop that marks begin/continue/end; a shared
        // label would fail with LabelMarkedTwice
        let code = lower(body);
        assert_eq!(code.count(|i| matches!(i, Instruction::Jump { op: Opcode::Ifne, .. })), 3);
    }

    #[test]
    fn test_synchronized_exits_monitor_on_both_paths() {
        let lock = LocalDecl::new(1, "lock", TypeRef::object());
        let body = Stmt::block(vec![
            Stmt::local(lock.clone(), None),
            Stmt::synchronized(Expr::local(&lock), Stmt::block(vec![marker("work")])),
        ]);
        let code = lower(body);
        assert_eq!(code.count(|i| *i == Instruction::Op(Opcode::Monitorenter)), 1);
        assert_eq!(code.count(|i| *i == Instruction::Op(Opcode::Monitorexit)), 2);
        assert_eq!(code.exception_table.len(), 1);
        assert_eq!(code.exception_table[0].catch_type, None);
    }

    #[test]
    fn test_using_disposes_in_reverse_order() {
        let res = |id: u32, name: &str| {
            let decl = LocalDecl::new(id, name, TypeRef::class("Res"));
            UsingResource {
                variable: Some(decl),
                init: Expr::new_object(MethodRef::new("Res", "<init>", vec![], TypeRef::void(), InvokeKind::Special), vec![]),
                dispose: MethodRef::new("Res", "close", vec![], TypeRef::void(), InvokeKind::Virtual),
            }
        };
        let body = Stmt::block(vec![Stmt::using(vec![res(1, "a"), res(2, "b")], Stmt::block(vec![marker("work")]))]);
        let code = lower(body);
        // b is disposed (normal path, then handler) before a
        let loads: Vec<u16> = code
            .instructions
            .iter()
            .enumerate()
            .filter(|(pc, _)| matches!(&code.instructions.get(pc + 1), Some(Instruction::Invoke(m)) if m.name == "close"))
            .filter_map(|(_, i)| match i {
                Instruction::Load { slot, .. } => Some(*slot),
                _ => None,
            })
            .collect();
        assert_eq!(loads, vec![1, 1, 0, 0]);
        assert_eq!(calls_to(&code, "close"), 4);
        assert_eq!(code.exception_table.len(), 2);
    }
}
