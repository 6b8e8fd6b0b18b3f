//! The analyzer proper: definite assignment, reachability, switch
//! fall-through, and try-with-resources checking over a single body.
//!
//! One syntax-directed walk threads a [`FlowInfo`] through the body in
//! execution order. Conditions produce a state pair split on their boolean
//! outcome, loops re-run their interior without reporting until the
//! unassigned and null facts stop changing and only then run a reporting
//! pass, and a `finally` block rewrites the pending jumps that cross it.

use vesta_hir::body::{
    BinaryOp, Body, CaseLabel, CatchClause, ExprId, ExprKind, LocalId, LocalKind, ResourceDecl,
    StmtId, StmtKind, SwitchArm, UnaryOp,
};
use vesta_hir::types::ExceptionModel;
use vesta_types::{Diagnostic, Span};

use crate::bits::BitSet;
use crate::context::{accumulate, FlowContext, Frame, JumpKind, PendingJump};
use crate::diagnostics::{diagnostic, FlowConfig, FlowDiagnosticKind};
use crate::info::{join_nulls, Cond, FlowInfo, NullState, Reach};
use crate::resources::{unhandled_close_exceptions, CloseObligation};

/// Everything the analysis learned about one body.
#[derive(Debug)]
pub struct FlowAnalysisResult {
    /// Whether execution can fall off the end of the body. A fall-through
    /// provably cut off, even when only by constant conditions, does not
    /// complete normally, so no synthetic default return is owed for it.
    pub completes_normally: bool,
    /// Dataflow state merged over every exit path, fall-through and return.
    pub exit: FlowInfo,
    pub diagnostics: Vec<Diagnostic>,
    /// Close work owed by each try-with-resources statement.
    pub obligations: Vec<CloseObligation>,
}

#[must_use]
pub fn analyze(body: &Body, model: &ExceptionModel, config: FlowConfig) -> FlowAnalysisResult {
    tracing::debug!(locals = body.locals().len(), "flow analysis start");
    let mut analyzer = FlowAnalyzer {
        body,
        model,
        config,
        context: FlowContext::new(),
        diagnostics: Vec::new(),
        obligations: Vec::new(),
        report: true,
        dead_reported: false,
        unreachable_reported: false,
    };

    let fall_through = analyzer.analyze_stmt(body.root(), FlowInfo::initial(body));
    let completes_normally = fall_through.reach() == Reach::Reachable;
    let mut exit = fall_through;
    for returned in analyzer.context.drain_returns() {
        exit = exit.merged_with(&returned);
    }

    tracing::trace!(
        completes_normally,
        diagnostics = analyzer.diagnostics.len(),
        "flow analysis finished"
    );
    FlowAnalysisResult {
        completes_normally,
        exit,
        diagnostics: analyzer.diagnostics,
        obligations: analyzer.obligations,
    }
}

/// The loop constructs share one fixpoint driver; this names what a single
/// abstract iteration has to execute.
#[derive(Debug, Clone, Copy)]
enum LoopShape {
    While { condition: ExprId, body: StmtId },
    DoWhile { body: StmtId, condition: ExprId },
    For { condition: Option<ExprId>, update: Option<StmtId>, body: StmtId },
    ForEach { local: LocalId, body: StmtId },
}

struct FlowAnalyzer<'a> {
    body: &'a Body,
    model: &'a ExceptionModel,
    config: FlowConfig,
    context: FlowContext,
    diagnostics: Vec<Diagnostic>,
    obligations: Vec<CloseObligation>,
    /// Cleared during speculative loop passes so only the final pass emits.
    report: bool,
    dead_reported: bool,
    unreachable_reported: bool,
}

impl<'a> FlowAnalyzer<'a> {
    fn emit(&mut self, kind: FlowDiagnosticKind, span: Span, message: String) {
        if !self.report {
            return;
        }
        if let Some(diag) = diagnostic(&self.config, kind, span, message) {
            self.diagnostics.push(diag);
        }
    }

    /// Report the first statement of a dead or unreachable region and
    /// suppress the rest. Re-entering reachable code re-arms both reports.
    fn note_region(&mut self, stmt: StmtId, info: &FlowInfo) {
        match info.reach() {
            Reach::Reachable => {
                self.dead_reported = false;
                self.unreachable_reported = false;
            }
            Reach::Dead => {
                if !self.dead_reported {
                    self.dead_reported = true;
                    let span = self.body.stmt(stmt).span;
                    self.emit(
                        FlowDiagnosticKind::DeadCode,
                        span,
                        "dead code behind a constant condition".to_string(),
                    );
                }
            }
            Reach::Unreachable => {
                if !self.unreachable_reported {
                    self.unreachable_reported = true;
                    let span = self.body.stmt(stmt).span;
                    self.emit(
                        FlowDiagnosticKind::UnreachableCode,
                        span,
                        "unreachable code".to_string(),
                    );
                }
            }
        }
    }

    // === Statements ===

    fn analyze_stmt(&mut self, stmt: StmtId, mut info: FlowInfo) -> FlowInfo {
        self.note_region(stmt, &info);
        let node = self.body.stmt(stmt);
        match &node.kind {
            StmtKind::Block(stmts) => stmts
                .iter()
                .fold(info, |state, &child| self.analyze_stmt(child, state)),
            StmtKind::Let { local, initializer } => {
                info.mark_unassigned(*local);
                self.context.declare_in_try_frames(local.index());
                match initializer {
                    Some(init) => {
                        let (mut after, value) = self.analyze_expr(*init, info);
                        self.assign(&mut after, *local, value);
                        after
                    }
                    None => info,
                }
            }
            StmtKind::Assign { target, value } => {
                let (mut after, state) = self.analyze_expr(*value, info);
                self.check_write(*target, node.span, &after);
                self.assign(&mut after, *target, state);
                after
            }
            StmtKind::CompoundAssign { target, value, .. } => {
                self.check_local_read(*target, node.span, &mut info);
                let (mut after, _) = self.analyze_expr(*value, info);
                self.check_write(*target, node.span, &after);
                self.assign(&mut after, *target, NullState::NonNull);
                after
            }
            StmtKind::Expr(expr) => self.analyze_expr(*expr, info).0,
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.analyze_if(*condition, *then_branch, *else_branch, info),
            StmtKind::While { condition, body } => self.run_loop(
                LoopShape::While {
                    condition: *condition,
                    body: *body,
                },
                None,
                node.span,
                info,
            ),
            StmtKind::DoWhile { body, condition } => self.run_loop(
                LoopShape::DoWhile {
                    body: *body,
                    condition: *condition,
                },
                None,
                node.span,
                info,
            ),
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => self.analyze_for(*init, *condition, *update, *body, None, node.span, info),
            StmtKind::ForEach {
                local,
                iterable,
                body,
            } => self.analyze_for_each(*local, *iterable, *body, None, node.span, info),
            StmtKind::Switch { selector, arms } => self.analyze_switch_stmt(*selector, arms, info),
            StmtKind::Labeled { label, body } => {
                self.analyze_labeled(label, *body, node.span, info)
            }
            StmtKind::Break { label } => {
                let target = self.context.resolve_break(label.as_deref());
                self.context.queue(PendingJump {
                    target,
                    kind: JumpKind::Break,
                    info: info.clone(),
                });
                info.mark_unreachable();
                info
            }
            StmtKind::Continue { label } => {
                let target = self.context.resolve_continue(label.as_deref());
                self.context.queue(PendingJump {
                    target,
                    kind: JumpKind::Continue,
                    info: info.clone(),
                });
                info.mark_unreachable();
                info
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    info = self.analyze_expr(*value, info).0;
                }
                self.context.queue(PendingJump {
                    target: None,
                    kind: JumpKind::Return,
                    info: info.clone(),
                });
                info.mark_unreachable();
                info
            }
            StmtKind::Throw(expr) => {
                let (mut after, _) = self.analyze_expr(*expr, info);
                after.mark_unreachable();
                after
            }
            StmtKind::Yield(expr) => {
                let cond = self.analyze_cond(*expr, info);
                self.context
                    .record_yield(cond.when_true.clone(), cond.when_false.clone());
                let mut after = cond.unconditional();
                after.mark_unreachable();
                after
            }
            StmtKind::Try {
                resources,
                body,
                catches,
                finally,
            } => self.analyze_try(node.span, resources, *body, catches, *finally, info),
            StmtKind::Nop => info,
        }
    }

    fn analyze_if(
        &mut self,
        condition: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
        info: FlowInfo,
    ) -> FlowInfo {
        let entry_reach = info.reach();
        let cond = self.analyze_cond(condition, info);
        let mut then_entry = cond.when_true;
        let mut else_entry = cond.when_false;
        if entry_reach > Reach::Unreachable {
            then_entry.soften_to_dead();
            else_entry.soften_to_dead();
        }
        let then_exit = self.analyze_stmt(then_branch, then_entry);
        let else_exit = match else_branch {
            Some(else_branch) => self.analyze_stmt(else_branch, else_entry),
            None => else_entry,
        };
        then_exit.merged_with(&else_exit)
    }

    fn analyze_labeled(
        &mut self,
        label: &str,
        body: StmtId,
        span: Span,
        info: FlowInfo,
    ) -> FlowInfo {
        // A label on a loop becomes the loop's own frame so that labeled
        // continue resolves to it.
        match &self.body.stmt(body).kind {
            StmtKind::While {
                condition,
                body: loop_body,
            } => self.run_loop(
                LoopShape::While {
                    condition: *condition,
                    body: *loop_body,
                },
                Some(label.to_owned()),
                span,
                info,
            ),
            StmtKind::DoWhile {
                body: loop_body,
                condition,
            } => self.run_loop(
                LoopShape::DoWhile {
                    body: *loop_body,
                    condition: *condition,
                },
                Some(label.to_owned()),
                span,
                info,
            ),
            StmtKind::For {
                init,
                condition,
                update,
                body: loop_body,
            } => self.analyze_for(
                *init,
                *condition,
                *update,
                *loop_body,
                Some(label.to_owned()),
                span,
                info,
            ),
            StmtKind::ForEach {
                local,
                iterable,
                body: loop_body,
            } => self.analyze_for_each(
                *local,
                *iterable,
                *loop_body,
                Some(label.to_owned()),
                span,
                info,
            ),
            _ => {
                let depth = self.context.push_label(label.to_owned());
                let mut after = self.analyze_stmt(body, info);
                for state in self.context.drain_jumps(depth, JumpKind::Break) {
                    after = after.merged_with(&state);
                }
                if let Some(Frame::Label { used: false, name }) = self.context.pop_frame() {
                    self.emit(
                        FlowDiagnosticKind::UnreferencedLabel,
                        span,
                        format!("label `{name}` is never referenced"),
                    );
                }
                after
            }
        }
    }

    // === Loops ===

    fn analyze_for(
        &mut self,
        init: Option<StmtId>,
        condition: Option<ExprId>,
        update: Option<StmtId>,
        body: StmtId,
        label: Option<String>,
        span: Span,
        mut info: FlowInfo,
    ) -> FlowInfo {
        if let Some(init) = init {
            info = self.analyze_stmt(init, info);
        }
        self.run_loop(
            LoopShape::For {
                condition,
                update,
                body,
            },
            label,
            span,
            info,
        )
    }

    fn analyze_for_each(
        &mut self,
        local: LocalId,
        iterable: ExprId,
        body: StmtId,
        label: Option<String>,
        span: Span,
        info: FlowInfo,
    ) -> FlowInfo {
        let (mut entry, _) = self.analyze_expr(iterable, info);
        entry.mark_unassigned(local);
        self.context.declare_in_try_frames(local.index());
        self.run_loop(LoopShape::ForEach { local, body }, label, span, entry)
    }

    fn run_loop(
        &mut self,
        shape: LoopShape,
        label: Option<String>,
        span: Span,
        entry: FlowInfo,
    ) -> FlowInfo {
        let depth = self.context.push_loop(label);
        let head = self.stabilize_loop(shape, depth, &entry);
        let (_back, mut after) = self.loop_pass(shape, depth, &head);
        for state in self.context.drain_jumps(depth, JumpKind::Break) {
            after = after.merged_with(&state);
        }
        self.pop_loop(span);
        after
    }

    /// Iterate the loop without reporting until the head state stops
    /// changing. Assigned-at-entry facts are pinned: what is definitely
    /// assigned before the first iteration is definitely assigned before
    /// every one, while the unassigned and null facts ride the back edge.
    fn stabilize_loop(&mut self, shape: LoopShape, depth: usize, entry: &FlowInfo) -> FlowInfo {
        let limit = 2 * self.body.locals().len() + 4;
        let saved_report = self.report;
        self.report = false;
        let mut head = entry.clone();
        let mut passes = 0usize;
        loop {
            passes += 1;
            let pass_mark = self.context.pending_len();
            let dead_flag = self.dead_reported;
            let unreachable_flag = self.unreachable_reported;

            let (back, _) = self.loop_pass(shape, depth, &head);

            self.context.truncate_pending(pass_mark);
            self.dead_reported = dead_flag;
            self.unreachable_reported = unreachable_flag;

            let mut next = entry.clone().merged_with(&back);
            next.inits = entry.inits.clone();
            next.reach = entry.reach;

            let converged = next.uninits == head.uninits && next.nulls == head.nulls;
            head = next;
            if converged || passes >= limit {
                break;
            }
        }
        self.report = saved_report;
        tracing::trace!(passes, "loop dataflow stabilized");
        head
    }

    /// One abstract execution of the loop from its head state. Returns the
    /// state flowing into the back edge and the state at the normal exit
    /// point, before any breaks are merged in.
    fn loop_pass(&mut self, shape: LoopShape, depth: usize, head: &FlowInfo) -> (FlowInfo, FlowInfo) {
        match shape {
            LoopShape::While { condition, body } => {
                let cond = self.analyze_cond(condition, head.clone());
                let exit = self.analyze_stmt(body, cond.when_true);
                let back = self.merge_continues(exit, depth);
                (back, cond.when_false)
            }
            LoopShape::DoWhile { body, condition } => {
                let exit = self.analyze_stmt(body, head.clone());
                let before_cond = self.merge_continues(exit, depth);
                let cond = self.analyze_cond(condition, before_cond);
                (cond.when_true, cond.when_false)
            }
            LoopShape::For {
                condition,
                update,
                body,
            } => {
                let cond = self.for_condition(condition, head.clone());
                let exit = self.analyze_stmt(body, cond.when_true);
                let before_update = self.merge_continues(exit, depth);
                let back = match update {
                    Some(update) => self.analyze_update(update, before_update),
                    None => before_update,
                };
                (back, cond.when_false)
            }
            LoopShape::ForEach { local, body } => {
                let mut body_entry = head.clone();
                self.assign(&mut body_entry, local, NullState::Unknown);
                let exit = self.analyze_stmt(body, body_entry);
                let back = self.merge_continues(exit, depth);
                (back, head.clone())
            }
        }
    }

    fn for_condition(&mut self, condition: Option<ExprId>, info: FlowInfo) -> Cond {
        match condition {
            Some(condition) => self.analyze_cond(condition, info),
            None => {
                let when_false = info.unreachable_like();
                Cond {
                    when_true: info,
                    when_false,
                }
            }
        }
    }

    /// The update step is not an unreachable-code site, even when the body
    /// never completes an iteration.
    fn analyze_update(&mut self, update: StmtId, info: FlowInfo) -> FlowInfo {
        let dead_flag = self.dead_reported;
        let unreachable_flag = self.unreachable_reported;
        self.dead_reported = true;
        self.unreachable_reported = true;
        let out = self.analyze_stmt(update, info);
        self.dead_reported = dead_flag;
        self.unreachable_reported = unreachable_flag;
        out
    }

    fn merge_continues(&mut self, mut info: FlowInfo, depth: usize) -> FlowInfo {
        for state in self.context.drain_jumps(depth, JumpKind::Continue) {
            info = info.merged_with(&state);
        }
        info
    }

    fn pop_loop(&mut self, span: Span) {
        if let Some(Frame::Loop {
            label: Some(name),
            label_used: false,
        }) = self.context.pop_frame()
        {
            self.emit(
                FlowDiagnosticKind::UnreferencedLabel,
                span,
                format!("label `{name}` is never referenced"),
            );
        }
    }

    // === Switches ===

    fn analyze_switch_stmt(
        &mut self,
        selector: ExprId,
        arms: &[SwitchArm],
        info: FlowInfo,
    ) -> FlowInfo {
        let (selector_out, _) = self.analyze_expr(selector, info);
        let depth = self.context.push_switch();
        let has_default = arms.iter().any(SwitchArm::is_default);

        let mut arrow_exits: Vec<FlowInfo> = Vec::new();
        let mut previous: Option<(&SwitchArm, FlowInfo)> = None;
        for arm in arms {
            self.walk_case_labels(arm, &selector_out);
            if arm.arrow {
                let exit = arm
                    .body
                    .iter()
                    .fold(selector_out.clone(), |state, &child| {
                        self.analyze_stmt(child, state)
                    });
                arrow_exits.push(exit);
                previous = None;
            } else {
                if let Some((prev_arm, prev_exit)) = &previous {
                    if prev_exit.reach() == Reach::Reachable
                        && !prev_arm.body.is_empty()
                        && !prev_arm.documented_fallthrough
                    {
                        self.emit(
                            FlowDiagnosticKind::FallthroughCase,
                            arm.span,
                            "possible fall-through into this case group".to_string(),
                        );
                    }
                }
                let entry = match &previous {
                    Some((_, prev_exit)) => selector_out.clone().merged_with(prev_exit),
                    None => selector_out.clone(),
                };
                let exit = arm
                    .body
                    .iter()
                    .fold(entry, |state, &child| self.analyze_stmt(child, state));
                previous = Some((arm, exit));
            }
        }

        let mut after: Option<FlowInfo> = None;
        if let Some((_, last_exit)) = previous {
            accumulate(&mut after, last_exit);
        }
        if !has_default {
            accumulate(&mut after, selector_out.clone());
        }
        for exit in arrow_exits {
            accumulate(&mut after, exit);
        }
        for state in self.context.drain_jumps(depth, JumpKind::Break) {
            accumulate(&mut after, state);
        }
        self.context.pop_frame();
        match after {
            Some(after) => after,
            None => selector_out,
        }
    }

    /// Switch in expression position. Arms do not fall through; each one must
    /// end in a yield or complete abruptly. The result state pair is the
    /// accumulation of the yields, so a yielded null test keeps its split.
    fn analyze_switch_expr(&mut self, selector: ExprId, arms: &[SwitchArm], info: FlowInfo) -> Cond {
        let (selector_out, _) = self.analyze_expr(selector, info);
        self.context.push_switch_expr();
        for arm in arms {
            self.walk_case_labels(arm, &selector_out);
            let exit = arm
                .body
                .iter()
                .fold(selector_out.clone(), |state, &child| {
                    self.analyze_stmt(child, state)
                });
            if exit.reach() == Reach::Reachable {
                self.emit(
                    FlowDiagnosticKind::SwitchArmCompletesNormally,
                    arm.span,
                    "switch expression arm completes without yielding a value".to_string(),
                );
            }
        }
        match self.context.pop_frame() {
            Some(Frame::SwitchExpr {
                yields_true,
                yields_false,
            }) => {
                let when_true = yields_true.unwrap_or_else(|| selector_out.unreachable_like());
                let when_false = yields_false.unwrap_or_else(|| selector_out.unreachable_like());
                Cond {
                    when_true,
                    when_false,
                }
            }
            _ => Cond::split(selector_out),
        }
    }

    /// Case labels are constant expressions; walking them catches reads of
    /// locals used before assignment without letting them perturb the state.
    fn walk_case_labels(&mut self, arm: &SwitchArm, selector_out: &FlowInfo) {
        for label in &arm.labels {
            if let CaseLabel::Case(expr) = label {
                let _ = self.analyze_expr(*expr, selector_out.clone());
            }
        }
    }

    // === Try statements ===

    fn analyze_try(
        &mut self,
        span: Span,
        resources: &[ResourceDecl],
        body: StmtId,
        catches: &[CatchClause],
        finally: Option<StmtId>,
        info: FlowInfo,
    ) -> FlowInfo {
        let locals = self.body.locals().len();
        let entry_reach = info.reach();
        let entry_inits = info.inits.clone();
        let jump_mark = self.context.pending_len();

        let catch_types: Vec<String> = catches
            .iter()
            .flat_map(|catch| catch.types.iter().cloned())
            .collect();
        let depth = self
            .context
            .push_try(info.uninits.clone(), catch_types);

        let mut inner = info;
        for resource in resources {
            inner.mark_unassigned(resource.local);
            self.context.declare_in_try_frames(resource.local.index());
            self.check_close_contract(resource);
            let (mut after, state) = self.analyze_expr(resource.initializer, inner);
            self.assign(&mut after, resource.local, state);
            inner = after;
        }
        if !resources.is_empty() && self.report {
            tracing::trace!(resources = resources.len(), "recorded close obligation");
            self.obligations.push(CloseObligation {
                try_span: span,
                resources: resources.iter().rev().map(|r| r.local).collect(),
            });
        }

        let body_exit = self.analyze_stmt(body, inner);

        // Freeze the throw-point facts before any catch body runs, so a
        // sibling catch never sees another's assignments.
        let uninits_for_catches = self
            .context
            .try_catch_uninits(depth)
            .unwrap_or_else(|| BitSet::new(locals));
        self.context.deactivate_try_handlers(depth);

        let mut normal_exit = body_exit;
        for catch in catches {
            let mut catch_entry = FlowInfo {
                inits: entry_inits.clone(),
                uninits: uninits_for_catches.clone(),
                nulls: vec![NullState::Unknown; locals],
                reach: entry_reach,
            };
            catch_entry.mark_unassigned(catch.param);
            self.context.declare_in_try_frames(catch.param.index());
            self.assign(&mut catch_entry, catch.param, NullState::NonNull);
            let catch_exit = self.analyze_stmt(catch.body, catch_entry);
            normal_exit = normal_exit.merged_with(&catch_exit);
        }

        // Catch bodies kept accumulating into the frame, so the popped set
        // also covers assignments inside them.
        let finally_uninits = match self.context.pop_frame() {
            Some(Frame::Try { catch_uninits, .. }) => catch_uninits,
            _ => uninits_for_catches,
        };

        match finally {
            None => normal_exit,
            Some(finally) => {
                let finally_mark = self.context.pending_len();
                let finally_entry = FlowInfo {
                    inits: entry_inits,
                    uninits: finally_uninits,
                    nulls: vec![NullState::Unknown; locals],
                    reach: entry_reach,
                };
                let finally_exit = self.analyze_stmt(finally, finally_entry);
                if finally_exit.reach() != Reach::Unreachable {
                    // Every jump that crossed the finally picks up its
                    // assignments on the way out.
                    let crossed = finally_mark - jump_mark;
                    for jump in self
                        .context
                        .pending_from_mut(jump_mark)
                        .iter_mut()
                        .take(crossed)
                    {
                        jump.info.inits.union_with(&finally_exit.inits);
                        jump.info.uninits.intersect_with(&finally_exit.uninits);
                        join_nulls(&mut jump.info.nulls, &finally_exit.nulls);
                    }
                    let mut after = normal_exit;
                    after.inits.union_with(&finally_exit.inits);
                    after.uninits.intersect_with(&finally_exit.uninits);
                    join_nulls(&mut after.nulls, &finally_exit.nulls);
                    after
                } else {
                    // An abruptly completing finally swallows the jumps and
                    // the normal exit alike.
                    self.context.discard_pending_range(jump_mark, finally_mark);
                    finally_exit
                }
            }
        }
    }

    /// A resource type must publish a close() contract, and everything that
    /// contract throws must be caught by an enclosing handler or declared by
    /// the method. The statement's own catch clauses count: the automatic
    /// close runs inside them.
    fn check_close_contract(&mut self, resource: &ResourceDecl) {
        let local = self.body.local(resource.local);
        let name = &local.name;
        match &local.ty.close {
            None => {
                let ty = &local.ty.name;
                self.emit(
                    FlowDiagnosticKind::AutoCloseableContractViolation,
                    resource.span,
                    format!("type `{ty}` of resource `{name}` does not define a close() contract"),
                );
            }
            Some(contract) => {
                let unhandled = {
                    let handlers: Vec<&str> = self
                        .context
                        .handler_types()
                        .chain(self.body.declared_throws().iter().map(String::as_str))
                        .collect();
                    unhandled_close_exceptions(contract, &handlers, self.model)
                };
                for exc in unhandled {
                    self.emit(
                        FlowDiagnosticKind::AutoCloseableContractViolation,
                        resource.span,
                        format!(
                            "unhandled exception type `{exc}` thrown by automatic close() \
                             invocation on `{name}`"
                        ),
                    );
                }
            }
        }
    }

    // === Conditions and expressions ===

    /// Analyze an expression for its boolean outcome, producing the state on
    /// each branch. Constant conditions put the whole state on the known
    /// side and a vacuous state on the other, without scanning the operands:
    /// a constant expression cannot contain assignments.
    fn analyze_cond(&mut self, expr: ExprId, info: FlowInfo) -> Cond {
        if let Some(value) = self.body.const_bool(expr) {
            let dead = info.unreachable_like();
            return if value {
                Cond {
                    when_true: info,
                    when_false: dead,
                }
            } else {
                Cond {
                    when_true: dead,
                    when_false: info,
                }
            };
        }
        match &self.body.expr(expr).kind {
            ExprKind::Unary {
                op: UnaryOp::Not,
                expr: operand,
            } => {
                let inner = self.analyze_cond(*operand, info);
                Cond {
                    when_true: inner.when_false,
                    when_false: inner.when_true,
                }
            }
            ExprKind::Binary {
                op: BinaryOp::AndAnd,
                lhs,
                rhs,
            } => {
                let first = self.analyze_cond(*lhs, info);
                let second = self.analyze_cond(*rhs, first.when_true);
                Cond {
                    when_true: second.when_true,
                    when_false: first.when_false.merged_with(&second.when_false),
                }
            }
            ExprKind::Binary {
                op: BinaryOp::OrOr,
                lhs,
                rhs,
            } => {
                let first = self.analyze_cond(*lhs, info);
                let second = self.analyze_cond(*rhs, first.when_false);
                Cond {
                    when_true: first.when_true.merged_with(&second.when_true),
                    when_false: second.when_false,
                }
            }
            ExprKind::Binary { op, lhs, rhs }
                if matches!(op, BinaryOp::EqEq | BinaryOp::NotEq) =>
            {
                let (after, _) = self.analyze_expr(*lhs, info);
                let (after, _) = self.analyze_expr(*rhs, after);
                match self.null_test(expr) {
                    Some((local, on_true)) => {
                        let current = after.null_state(local);
                        let on_false = match on_true {
                            NullState::Null => NullState::NonNull,
                            _ => NullState::Null,
                        };
                        let mut when_true = after.clone();
                        let mut when_false = after;
                        Self::narrow(&mut when_true, local, on_true, current);
                        Self::narrow(&mut when_false, local, on_false, current);
                        Cond {
                            when_true,
                            when_false,
                        }
                    }
                    None => Cond::split(after),
                }
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                let outer = self.analyze_cond(*condition, info);
                let on_true = self.analyze_cond(*then_expr, outer.when_true);
                let on_false = self.analyze_cond(*else_expr, outer.when_false);
                Cond {
                    when_true: on_true.when_true.merged_with(&on_false.when_true),
                    when_false: on_true.when_false.merged_with(&on_false.when_false),
                }
            }
            ExprKind::Switch { selector, arms } => self.analyze_switch_expr(*selector, arms, info),
            _ => {
                let (after, _) = self.analyze_expr(expr, info);
                Cond::split(after)
            }
        }
    }

    /// Recognize `x == null`, `null == x`, `x != null`, `null != x`.
    /// Returns the tested local and its null state on the true outcome.
    fn null_test(&self, expr: ExprId) -> Option<(LocalId, NullState)> {
        match &self.body.expr(expr).kind {
            ExprKind::Binary { op, lhs, rhs }
                if matches!(op, BinaryOp::EqEq | BinaryOp::NotEq) =>
            {
                let local = match (&self.body.expr(*lhs).kind, &self.body.expr(*rhs).kind) {
                    (ExprKind::Local(local), ExprKind::Null) => *local,
                    (ExprKind::Null, ExprKind::Local(local)) => *local,
                    _ => return None,
                };
                let on_true = if matches!(op, BinaryOp::EqEq) {
                    NullState::Null
                } else {
                    NullState::NonNull
                };
                Some((local, on_true))
            }
            _ => None,
        }
    }

    /// Apply one branch's null assumption. A branch contradicting what is
    /// already known cannot be taken and becomes dead; the assumption still
    /// holds inside it.
    fn narrow(side: &mut FlowInfo, local: LocalId, demanded: NullState, current: NullState) {
        if current != NullState::Unknown && current != demanded {
            side.mark_dead();
        }
        side.set_null_state(local, demanded);
    }

    fn analyze_expr(&mut self, expr: ExprId, mut info: FlowInfo) -> (FlowInfo, NullState) {
        let node = self.body.expr(expr);
        match &node.kind {
            ExprKind::Local(local) => {
                self.check_local_read(*local, node.span, &mut info);
                let state = info.null_state(*local);
                (info, state)
            }
            ExprKind::Null => (info, NullState::Null),
            ExprKind::Bool(_) | ExprKind::Int(_) | ExprKind::String(_) => {
                (info, NullState::NonNull)
            }
            ExprKind::Unary { expr: operand, .. } => {
                let (after, _) = self.analyze_expr(*operand, info);
                (after, NullState::NonNull)
            }
            ExprKind::Binary { op, .. } if matches!(op, BinaryOp::AndAnd | BinaryOp::OrOr) => {
                let after = self.analyze_cond(expr, info).unconditional();
                (after, NullState::NonNull)
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                let (after, _) = self.analyze_expr(*lhs, info);
                let (after, _) = self.analyze_expr(*rhs, after);
                (after, NullState::NonNull)
            }
            ExprKind::Assign { target, value } => {
                let (mut after, state) = self.analyze_expr(*value, info);
                self.check_write(*target, node.span, &after);
                self.assign(&mut after, *target, state);
                (after, state)
            }
            ExprKind::Conditional { .. } | ExprKind::Switch { .. } => {
                let after = self.analyze_cond(expr, info).unconditional();
                let state = self.value_null_state(expr, &after);
                (after, state)
            }
            ExprKind::FieldAccess { receiver, .. } => {
                let (after, state) = self.analyze_expr(*receiver, info);
                self.check_deref(*receiver, state, node.span, &after);
                (after, NullState::Unknown)
            }
            ExprKind::Call { receiver, args, .. } => {
                let (mut after, state) = self.analyze_expr(*receiver, info);
                for &arg in args {
                    after = self.analyze_expr(arg, after).0;
                }
                // The receiver value is captured before the arguments run,
                // so its null state at dereference time is the one observed
                // above.
                self.check_deref(*receiver, state, node.span, &after);
                (after, NullState::Unknown)
            }
            ExprKind::New { args, .. } => {
                let mut after = info;
                for &arg in args {
                    after = self.analyze_expr(arg, after).0;
                }
                (after, NullState::NonNull)
            }
            ExprKind::Invalid => (info, NullState::Unknown),
        }
    }

    /// Null state of an expression's value, judged structurally against the
    /// state after its evaluation.
    fn value_null_state(&self, expr: ExprId, info: &FlowInfo) -> NullState {
        match &self.body.expr(expr).kind {
            ExprKind::Null => NullState::Null,
            ExprKind::Local(local) => info.null_state(*local),
            ExprKind::Assign { value, .. } => self.value_null_state(*value, info),
            ExprKind::Conditional {
                then_expr,
                else_expr,
                ..
            } => self
                .value_null_state(*then_expr, info)
                .join(self.value_null_state(*else_expr, info)),
            ExprKind::Bool(_)
            | ExprKind::Int(_)
            | ExprKind::String(_)
            | ExprKind::New { .. }
            | ExprKind::Unary { .. }
            | ExprKind::Binary { .. } => NullState::NonNull,
            ExprKind::FieldAccess { .. }
            | ExprKind::Call { .. }
            | ExprKind::Switch { .. }
            | ExprKind::Invalid => NullState::Unknown,
        }
    }

    fn check_local_read(&mut self, local: LocalId, span: Span, info: &mut FlowInfo) {
        if info.is_assigned(local) {
            return;
        }
        let name = &self.body.local(local).name;
        self.emit(
            FlowDiagnosticKind::UninitializedLocal,
            span,
            format!("variable `{name}` may not have been initialized"),
        );
        // Recovery: report each variable once, not at every later read.
        info.inits.insert(local.index());
    }

    fn check_write(&mut self, target: LocalId, span: Span, info: &FlowInfo) {
        let local = self.body.local(target);
        if !local.reassignment_barred() {
            return;
        }
        let name = &local.name;
        if matches!(local.kind, LocalKind::Resource) {
            self.emit(
                FlowDiagnosticKind::FinalReassignment,
                span,
                format!("resource `{name}` of a try-with-resources statement may not be assigned"),
            );
            return;
        }
        if info.is_definitely_unassigned(target) {
            return;
        }
        let message = if info.is_assigned(target) {
            format!("final variable `{name}` has already been assigned")
        } else {
            format!("final variable `{name}` may already have been assigned")
        };
        self.emit(FlowDiagnosticKind::FinalReassignment, span, message);
    }

    fn assign(&mut self, info: &mut FlowInfo, local: LocalId, value: NullState) {
        // Vacuous states report everything assigned, which keeps impossible
        // paths from disturbing the enclosing try frames.
        if !info.is_assigned(local) {
            self.context.clear_in_try_frames(local.index());
        }
        info.mark_assigned(local);
        info.set_null_state(local, value);
    }

    fn check_deref(&mut self, receiver: ExprId, state: NullState, span: Span, info: &FlowInfo) {
        if state != NullState::Null || info.reach() == Reach::Unreachable {
            return;
        }
        let message = match &self.body.expr(receiver).kind {
            ExprKind::Local(local) => {
                let name = &self.body.local(*local).name;
                format!("variable `{name}` can only be null here")
            }
            _ => "expression can only be null here".to_string(),
        };
        self.emit(FlowDiagnosticKind::NullDereference, span, message);
    }
}

// === Tests ===
