//! Reachability classification, switch behavior, and label bookkeeping.

use vesta_flow::{analyze, FlowAnalysisResult, FlowConfig, SeveritySetting};
use vesta_hir::body::{
    BinaryOp, Body, BodyBuilder, CaseLabel, ExprKind, LocalId, LocalKind, StmtId, StmtKind,
    SwitchArm,
};
use vesta_hir::types::ExceptionModel;
use vesta_types::{Diagnostic, Severity, Span};

fn run(body: &Body) -> FlowAnalysisResult {
    analyze(body, &ExceptionModel::new(), FlowConfig::default())
}

fn count(diags: &[Diagnostic], code: &str) -> usize {
    diags.iter().filter(|d| d.code == code).count()
}

/// `sink.<name>()` as a statement.
fn call_stmt(b: &mut BodyBuilder, sink: LocalId, name: &str) -> StmtId {
    let receiver = b.expr(ExprKind::Local(sink));
    let call = b.expr(ExprKind::Call {
        receiver,
        name: name.into(),
        args: vec![],
    });
    b.stmt(StmtKind::Expr(call))
}

#[test]
fn code_after_break_in_a_loop_is_unreachable() {
    // while (c) { break; sink.touch(); }
    let mut b = BodyBuilder::new();
    let c = b.local("c", LocalKind::Param);
    let sink = b.local("sink", LocalKind::Param);

    let cond = b.expr(ExprKind::Local(c));
    let break_stmt = b.stmt(StmtKind::Break { label: None });
    let tail = call_stmt(&mut b, sink, "touch");
    let loop_body = b.stmt(StmtKind::Block(vec![break_stmt, tail]));
    let while_stmt = b.stmt(StmtKind::While {
        condition: cond,
        body: loop_body,
    });
    let root = b.stmt(StmtKind::Block(vec![while_stmt]));
    let body = b.finish(root);

    let result = run(&body);
    assert_eq!(count(&result.diagnostics, "FLOW_UNREACHABLE"), 1);
    assert!(result.completes_normally);
}

#[test]
fn constant_true_condition_keeps_else_dead() {
    // if (true) { sink.a(); } else { sink.b(); }
    let mut b = BodyBuilder::new();
    let sink = b.local("sink", LocalKind::Param);

    let cond = b.expr(ExprKind::Bool(true));
    let then_call = call_stmt(&mut b, sink, "a");
    let then_block = b.stmt(StmtKind::Block(vec![then_call]));
    let else_call = call_stmt(&mut b, sink, "b");
    let else_block = b.stmt(StmtKind::Block(vec![else_call]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: cond,
        then_branch: then_block,
        else_branch: Some(else_block),
    });
    let root = b.stmt(StmtKind::Block(vec![if_stmt]));
    let body = b.finish(root);

    let result = run(&body);
    assert_eq!(count(&result.diagnostics, "FLOW_DEAD"), 1);
    assert_eq!(count(&result.diagnostics, "FLOW_UNREACHABLE"), 0);
    assert!(result.completes_normally);
}

#[test]
fn constant_true_throw_revokes_normal_completion() {
    // if (true) throw new NullPointerException();
    // The fall-through is provably cut off, so no synthetic default return
    // is owed, and a constant condition never draws the dead-code warning
    // on its own.
    let mut b = BodyBuilder::new();

    let cond = b.expr(ExprKind::Bool(true));
    let npe = b.expr(ExprKind::New {
        ty: "java.lang.NullPointerException".into(),
        args: vec![],
    });
    let throw_stmt = b.stmt(StmtKind::Throw(npe));
    let then_block = b.stmt(StmtKind::Block(vec![throw_stmt]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: cond,
        then_branch: then_block,
        else_branch: None,
    });
    let root = b.stmt(StmtKind::Block(vec![if_stmt]));
    let body = b.finish(root);

    let result = run(&body);
    assert!(!result.completes_normally);
    assert_eq!(count(&result.diagnostics, "FLOW_DEAD"), 0);
    assert_eq!(count(&result.diagnostics, "FLOW_UNREACHABLE"), 0);
}

#[test]
fn dead_region_is_reported_once() {
    // if (false) { sink.a(); sink.b(); }
    let mut b = BodyBuilder::new();
    let sink = b.local("sink", LocalKind::Param);

    let cond = b.expr(ExprKind::Bool(false));
    let first = call_stmt(&mut b, sink, "a");
    let second = call_stmt(&mut b, sink, "b");
    let then_block = b.stmt(StmtKind::Block(vec![first, second]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: cond,
        then_branch: then_block,
        else_branch: None,
    });
    let root = b.stmt(StmtKind::Block(vec![if_stmt]));
    let body = b.finish(root);

    let result = run(&body);
    assert_eq!(count(&result.diagnostics, "FLOW_DEAD"), 1);
}

#[test]
fn return_in_one_branch_keeps_the_join_alive() {
    // if (c) { return; }
    // sink.touch();
    let mut b = BodyBuilder::new();
    let c = b.local("c", LocalKind::Param);
    let sink = b.local("sink", LocalKind::Param);

    let cond = b.expr(ExprKind::Local(c));
    let ret = b.stmt(StmtKind::Return(None));
    let then_block = b.stmt(StmtKind::Block(vec![ret]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: cond,
        then_branch: then_block,
        else_branch: None,
    });
    let tail = call_stmt(&mut b, sink, "touch");
    let root = b.stmt(StmtKind::Block(vec![if_stmt, tail]));
    let body = b.finish(root);

    let result = run(&body);
    assert_eq!(count(&result.diagnostics, "FLOW_UNREACHABLE"), 0);
    assert!(result.completes_normally);
}

#[test]
fn do_while_true_never_exits() {
    // do { sink.touch(); } while (true);
    // sink.ping();
    let mut b = BodyBuilder::new();
    let sink = b.local("sink", LocalKind::Param);

    let inner = call_stmt(&mut b, sink, "touch");
    let loop_body = b.stmt(StmtKind::Block(vec![inner]));
    let cond = b.expr(ExprKind::Bool(true));
    let do_stmt = b.stmt(StmtKind::DoWhile {
        body: loop_body,
        condition: cond,
    });
    let tail = call_stmt(&mut b, sink, "ping");
    let root = b.stmt(StmtKind::Block(vec![do_stmt, tail]));
    let body = b.finish(root);

    let result = run(&body);
    assert_eq!(count(&result.diagnostics, "FLOW_UNREACHABLE"), 1);
    assert!(!result.completes_normally);
}

#[test]
fn break_makes_while_true_complete() {
    // while (true) { if (c) { break; } }
    // sink.touch();
    let mut b = BodyBuilder::new();
    let c = b.local("c", LocalKind::Param);
    let sink = b.local("sink", LocalKind::Param);

    let loop_cond = b.expr(ExprKind::Bool(true));
    let if_cond = b.expr(ExprKind::Local(c));
    let break_stmt = b.stmt(StmtKind::Break { label: None });
    let then_block = b.stmt(StmtKind::Block(vec![break_stmt]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: if_cond,
        then_branch: then_block,
        else_branch: None,
    });
    let loop_body = b.stmt(StmtKind::Block(vec![if_stmt]));
    let while_stmt = b.stmt(StmtKind::While {
        condition: loop_cond,
        body: loop_body,
    });
    let tail = call_stmt(&mut b, sink, "touch");
    let root = b.stmt(StmtKind::Block(vec![while_stmt, tail]));
    let body = b.finish(root);

    let result = run(&body);
    assert_eq!(count(&result.diagnostics, "FLOW_UNREACHABLE"), 0);
    assert!(result.completes_normally);
}

#[test]
fn unreachable_region_swallows_constant_branches() {
    // return;
    // if (false) { sink.touch(); } // unreachable, not dead
    let mut b = BodyBuilder::new();
    let sink = b.local("sink", LocalKind::Param);

    let ret = b.stmt(StmtKind::Return(None));
    let cond = b.expr(ExprKind::Bool(false));
    let inner = call_stmt(&mut b, sink, "touch");
    let then_block = b.stmt(StmtKind::Block(vec![inner]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: cond,
        then_branch: then_block,
        else_branch: None,
    });
    let root = b.stmt(StmtKind::Block(vec![ret, if_stmt]));
    let body = b.finish(root);

    let result = run(&body);
    assert_eq!(count(&result.diagnostics, "FLOW_UNREACHABLE"), 1);
    assert_eq!(count(&result.diagnostics, "FLOW_DEAD"), 0);
}

#[test]
fn arrow_arms_do_not_fall_through() {
    // switch (k) { case 1 -> sink.a(); case 2 -> sink.b(); }
    let mut b = BodyBuilder::new();
    let k = b.local("k", LocalKind::Param);
    let sink = b.local("sink", LocalKind::Param);

    let selector = b.expr(ExprKind::Local(k));
    let one = b.expr(ExprKind::Int(1));
    let two = b.expr(ExprKind::Int(2));
    let first = call_stmt(&mut b, sink, "a");
    let second = call_stmt(&mut b, sink, "b");
    let arms = vec![
        SwitchArm {
            labels: vec![CaseLabel::Case(one)],
            body: vec![first],
            arrow: true,
            documented_fallthrough: false,
            span: Span::new(0, 0),
        },
        SwitchArm {
            labels: vec![CaseLabel::Case(two)],
            body: vec![second],
            arrow: true,
            documented_fallthrough: false,
            span: Span::new(0, 0),
        },
    ];
    let switch_stmt = b.stmt(StmtKind::Switch { selector, arms });
    let root = b.stmt(StmtKind::Block(vec![switch_stmt]));
    let body = b.finish(root);

    let result = run(&body);
    assert_eq!(count(&result.diagnostics, "FLOW_FALLTHROUGH"), 0);
}

#[test]
fn documented_fallthrough_is_allowed() {
    // switch (k) {
    //     case 1:
    //         sink.a();
    //         // fall through
    //     case 2:
    //         sink.b();
    // }
    let mut b = BodyBuilder::new();
    let k = b.local("k", LocalKind::Param);
    let sink = b.local("sink", LocalKind::Param);

    let selector = b.expr(ExprKind::Local(k));
    let one = b.expr(ExprKind::Int(1));
    let two = b.expr(ExprKind::Int(2));
    let first = call_stmt(&mut b, sink, "a");
    let second = call_stmt(&mut b, sink, "b");
    let arms = vec![
        SwitchArm {
            labels: vec![CaseLabel::Case(one)],
            body: vec![first],
            arrow: false,
            documented_fallthrough: true,
            span: Span::new(0, 0),
        },
        SwitchArm {
            labels: vec![CaseLabel::Case(two)],
            body: vec![second],
            arrow: false,
            documented_fallthrough: false,
            span: Span::new(0, 0),
        },
    ];
    let switch_stmt = b.stmt(StmtKind::Switch { selector, arms });
    let root = b.stmt(StmtKind::Block(vec![switch_stmt]));
    let body = b.finish(root);

    let result = run(&body);
    assert_eq!(count(&result.diagnostics, "FLOW_FALLTHROUGH"), 0);
}

#[test]
fn stacked_labels_are_not_fallthrough() {
    // switch (k) { case 1: case 2: sink.a(); break; }
    let mut b = BodyBuilder::new();
    let k = b.local("k", LocalKind::Param);
    let sink = b.local("sink", LocalKind::Param);

    let selector = b.expr(ExprKind::Local(k));
    let one = b.expr(ExprKind::Int(1));
    let two = b.expr(ExprKind::Int(2));
    let work = call_stmt(&mut b, sink, "a");
    let break_stmt = b.stmt(StmtKind::Break { label: None });
    let arms = vec![
        SwitchArm {
            labels: vec![CaseLabel::Case(one)],
            body: vec![],
            arrow: false,
            documented_fallthrough: false,
            span: Span::new(0, 0),
        },
        SwitchArm {
            labels: vec![CaseLabel::Case(two)],
            body: vec![work, break_stmt],
            arrow: false,
            documented_fallthrough: false,
            span: Span::new(0, 0),
        },
    ];
    let switch_stmt = b.stmt(StmtKind::Switch { selector, arms });
    let root = b.stmt(StmtKind::Block(vec![switch_stmt]));
    let body = b.finish(root);

    let result = run(&body);
    assert_eq!(count(&result.diagnostics, "FLOW_FALLTHROUGH"), 0);
}

#[test]
fn labeled_block_break_skips_the_tail() {
    // outer: { if (c) { break outer; } sink.touch(); }
    // sink.ping();
    let mut b = BodyBuilder::new();
    let c = b.local("c", LocalKind::Param);
    let sink = b.local("sink", LocalKind::Param);

    let cond = b.expr(ExprKind::Local(c));
    let break_stmt = b.stmt(StmtKind::Break {
        label: Some("outer".into()),
    });
    let then_block = b.stmt(StmtKind::Block(vec![break_stmt]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: cond,
        then_branch: then_block,
        else_branch: None,
    });
    let inner_tail = call_stmt(&mut b, sink, "touch");
    let labeled_body = b.stmt(StmtKind::Block(vec![if_stmt, inner_tail]));
    let labeled = b.stmt(StmtKind::Labeled {
        label: "outer".into(),
        body: labeled_body,
    });
    let outer_tail = call_stmt(&mut b, sink, "ping");
    let root = b.stmt(StmtKind::Block(vec![labeled, outer_tail]));
    let body = b.finish(root);

    let result = run(&body);
    assert_eq!(count(&result.diagnostics, "FLOW_UNREACHABLE"), 0);
    assert_eq!(count(&result.diagnostics, "FLOW_UNUSED_LABEL"), 0);
    assert!(result.completes_normally);
}

#[test]
fn continue_keeps_the_rest_of_the_loop_alive() {
    // while (c) { if (d) { continue; } sink.touch(); }
    let mut b = BodyBuilder::new();
    let c = b.local("c", LocalKind::Param);
    let d = b.local("d", LocalKind::Param);
    let sink = b.local("sink", LocalKind::Param);

    let loop_cond = b.expr(ExprKind::Local(c));
    let if_cond = b.expr(ExprKind::Local(d));
    let continue_stmt = b.stmt(StmtKind::Continue { label: None });
    let then_block = b.stmt(StmtKind::Block(vec![continue_stmt]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: if_cond,
        then_branch: then_block,
        else_branch: None,
    });
    let rest = call_stmt(&mut b, sink, "touch");
    let loop_body = b.stmt(StmtKind::Block(vec![if_stmt, rest]));
    let while_stmt = b.stmt(StmtKind::While {
        condition: loop_cond,
        body: loop_body,
    });
    let root = b.stmt(StmtKind::Block(vec![while_stmt]));
    let body = b.finish(root);

    let result = run(&body);
    assert_eq!(count(&result.diagnostics, "FLOW_UNREACHABLE"), 0);
}

#[test]
fn switch_expression_merges_yield_states() {
    // if (switch (k) {
    //     case 1 -> { yield x != null; }
    //     default -> { yield false; }
    // }) {
    //     x.foo(); // the true outcome implies x != null
    // }
    let mut b = BodyBuilder::new();
    let k = b.local("k", LocalKind::Param);
    let x = b.local("x", LocalKind::Param);

    let selector = b.expr(ExprKind::Local(k));
    let one = b.expr(ExprKind::Int(1));

    let x_test = b.expr(ExprKind::Local(x));
    let null = b.expr(ExprKind::Null);
    let test = b.expr(ExprKind::Binary {
        op: BinaryOp::NotEq,
        lhs: x_test,
        rhs: null,
    });
    let yield_test = b.stmt(StmtKind::Yield(test));
    let false_lit = b.expr(ExprKind::Bool(false));
    let yield_false = b.stmt(StmtKind::Yield(false_lit));

    let arms = vec![
        SwitchArm {
            labels: vec![CaseLabel::Case(one)],
            body: vec![yield_test],
            arrow: true,
            documented_fallthrough: false,
            span: Span::new(0, 0),
        },
        SwitchArm {
            labels: vec![CaseLabel::Default],
            body: vec![yield_false],
            arrow: true,
            documented_fallthrough: false,
            span: Span::new(0, 0),
        },
    ];
    let condition = b.expr(ExprKind::Switch { selector, arms });

    let x_use = b.expr(ExprKind::Local(x));
    let call = b.expr(ExprKind::Call {
        receiver: x_use,
        name: "foo".into(),
        args: vec![],
    });
    let then_stmt = b.stmt(StmtKind::Expr(call));
    let then_block = b.stmt(StmtKind::Block(vec![then_stmt]));
    let if_stmt = b.stmt(StmtKind::If {
        condition,
        then_branch: then_block,
        else_branch: None,
    });
    let root = b.stmt(StmtKind::Block(vec![if_stmt]));
    let body = b.finish(root);

    let result = run(&body);
    assert_eq!(count(&result.diagnostics, "FLOW_NULL_DEREF"), 0);
    assert_eq!(count(&result.diagnostics, "FLOW_SWITCH_ARM"), 0);
}

#[test]
fn unused_label_on_a_plain_block_warns() {
    // tail: { sink.touch(); }
    let mut b = BodyBuilder::new();
    let sink = b.local("sink", LocalKind::Param);

    let inner = call_stmt(&mut b, sink, "touch");
    let labeled_body = b.stmt(StmtKind::Block(vec![inner]));
    let labeled = b.stmt(StmtKind::Labeled {
        label: "tail".into(),
        body: labeled_body,
    });
    let root = b.stmt(StmtKind::Block(vec![labeled]));
    let body = b.finish(root);

    let result = run(&body);
    assert_eq!(count(&result.diagnostics, "FLOW_UNUSED_LABEL"), 1);
}

#[test]
fn severity_overrides_apply() {
    // return;
    // sink.touch();
    let mut b = BodyBuilder::new();
    let sink = b.local("sink", LocalKind::Param);

    let ret = b.stmt(StmtKind::Return(None));
    let tail = call_stmt(&mut b, sink, "touch");
    let root = b.stmt(StmtKind::Block(vec![ret, tail]));
    let body = b.finish(root);

    let mut config = FlowConfig::default();
    config.unreachable_code = SeveritySetting::Ignore;
    let silenced = analyze(&body, &ExceptionModel::new(), config);
    assert_eq!(count(&silenced.diagnostics, "FLOW_UNREACHABLE"), 0);

    let mut config = FlowConfig::default();
    config.unreachable_code = SeveritySetting::Warning;
    let downgraded = analyze(&body, &ExceptionModel::new(), config);
    let diag = downgraded
        .diagnostics
        .iter()
        .find(|d| d.code == "FLOW_UNREACHABLE")
        .expect("diagnostic should survive the downgrade");
    assert_eq!(diag.severity, Severity::Warning);
}
