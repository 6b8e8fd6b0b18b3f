//! Method-body IR consumed by the flow engine.
//!
//! A [`Body`] is one method or initializer body after parsing and resolution:
//! statements, expressions, and locals live in arenas addressed by dense u32
//! ids, so the analyzer can key per-variable dataflow bits by slot index.
//! [`BodyBuilder`] is the construction surface used by the front-end lowering
//! and by tests.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use vesta_types::Span;

use crate::types::{Const, TypeRef};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ExprId(u32);

impl ExprId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        ExprId(raw)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StmtId(u32);

impl StmtId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        StmtId(raw)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StmtId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LocalId(u32);

impl LocalId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        LocalId(raw)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalId({})", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arena<T> {
    data: Vec<T>,
}

impl<T> Arena<T> {
    pub fn alloc(&mut self, value: T) -> u32 {
        let idx = self.data.len() as u32;
        self.data.push(value);
        idx
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.data.iter().enumerate().map(|(i, v)| (i as u32, v))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena { data: Vec::new() }
    }
}

impl<T> std::ops::Index<ExprId> for Arena<T> {
    type Output = T;

    fn index(&self, index: ExprId) -> &Self::Output {
        &self.data[index.index()]
    }
}

impl<T> std::ops::Index<StmtId> for Arena<T> {
    type Output = T;

    fn index(&self, index: StmtId) -> &Self::Output {
        &self.data[index.index()]
    }
}

impl<T> std::ops::Index<LocalId> for Arena<T> {
    type Output = T;

    fn index(&self, index: LocalId) -> &Self::Output {
        &self.data[index.index()]
    }
}

/// How a local variable was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalKind {
    /// Method parameter; definitely assigned at entry.
    Param,
    /// Ordinary local declaration.
    Local,
    /// Declared in a try-with-resources header. Implicitly final.
    Resource,
    /// Catch-clause parameter; definitely assigned at clause entry.
    Catch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    pub name: String,
    pub ty: TypeRef,
    pub kind: LocalKind,
    pub is_final: bool,
    pub span: Span,
}

impl Local {
    /// Resources are implicitly final whether or not the source says so.
    #[must_use]
    pub fn reassignment_barred(&self) -> bool {
        self.is_final || matches!(self.kind, LocalKind::Resource)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    Let {
        local: LocalId,
        initializer: Option<ExprId>,
    },
    Assign {
        target: LocalId,
        value: ExprId,
    },
    /// `target op= value`; reads the target before writing it.
    CompoundAssign {
        op: BinaryOp,
        target: LocalId,
        value: ExprId,
    },
    Expr(ExprId),
    If {
        condition: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While {
        condition: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        condition: ExprId,
    },
    For {
        init: Option<StmtId>,
        condition: Option<ExprId>,
        update: Option<StmtId>,
        body: StmtId,
    },
    ForEach {
        local: LocalId,
        iterable: ExprId,
        body: StmtId,
    },
    Switch {
        selector: ExprId,
        arms: Vec<SwitchArm>,
    },
    Labeled {
        label: String,
        body: StmtId,
    },
    Break {
        label: Option<String>,
    },
    Continue {
        label: Option<String>,
    },
    Return(Option<ExprId>),
    Throw(ExprId),
    /// Produces the value of the innermost enclosing switch expression.
    Yield(ExprId),
    Try {
        resources: Vec<ResourceDecl>,
        body: StmtId,
        catches: Vec<CatchClause>,
        finally: Option<StmtId>,
    },
    Nop,
}

/// One resource declared in a try-with-resources header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDecl {
    pub local: LocalId,
    pub initializer: ExprId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchClause {
    pub param: LocalId,
    /// Caught exception types; more than one entry for a multi-catch.
    pub types: Vec<String>,
    pub body: StmtId,
    pub span: Span,
}

/// One switch-labeled group: its labels, its statements, and how it was
/// written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchArm {
    pub labels: Vec<CaseLabel>,
    pub body: Vec<StmtId>,
    /// `case X ->` form; never falls through. Lowering wraps an arrow
    /// expression body as a single `Yield` statement.
    pub arrow: bool,
    /// The group ends in a recognized fall-through escape comment, resolved
    /// upstream from trivia. Suppresses the fall-through warning only.
    pub documented_fallthrough: bool,
    pub span: Span,
}

impl SwitchArm {
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.labels.iter().any(|l| matches!(l, CaseLabel::Default))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseLabel {
    Case(ExprId),
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Local(LocalId),
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    Unary {
        op: UnaryOp,
        expr: ExprId,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// Assignment used as an expression, e.g. `(x = read()) != -1`.
    Assign {
        target: LocalId,
        value: ExprId,
    },
    Conditional {
        condition: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    FieldAccess {
        receiver: ExprId,
        name: String,
    },
    Call {
        receiver: ExprId,
        name: String,
        args: Vec<ExprId>,
    },
    New {
        ty: String,
        args: Vec<ExprId>,
    },
    /// Switch expression; every arm must yield or throw.
    Switch {
        selector: ExprId,
        arms: Vec<SwitchArm>,
    },
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    root: StmtId,
    stmts: Arena<Stmt>,
    exprs: Arena<Expr>,
    locals: Arena<Local>,
    declared_throws: Vec<String>,
    const_values: HashMap<ExprId, Const>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Body {
    #[must_use]
    pub fn root(&self) -> StmtId {
        self.root
    }

    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }

    #[must_use]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    #[must_use]
    pub fn local(&self, id: LocalId) -> &Local {
        &self.locals[id]
    }

    #[must_use]
    pub fn locals(&self) -> &[Local] {
        self.locals.as_slice()
    }

    /// Checked exception types the enclosing method declares, in throws-clause
    /// order.
    #[must_use]
    pub fn declared_throws(&self) -> &[String] {
        &self.declared_throws
    }

    /// Compile-time-constant boolean value of an expression, if it has one.
    ///
    /// Covers boolean/int literals, `!`, `&&`/`||`, `==`/`!=`, and whatever
    /// upstream folding recorded in the side table. Both operands of a binary
    /// operator must be constant for the result to be constant (JLS 15.29).
    #[must_use]
    pub fn const_bool(&self, expr: ExprId) -> Option<bool> {
        if let Some(Const::Bool(b)) = self.const_values.get(&expr) {
            return Some(*b);
        }
        match &self.expr(expr).kind {
            ExprKind::Bool(b) => Some(*b),
            ExprKind::Unary {
                op: UnaryOp::Not,
                expr,
            } => self.const_bool(*expr).map(|b| !b),
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinaryOp::AndAnd => Some(self.const_bool(*lhs)? && self.const_bool(*rhs)?),
                BinaryOp::OrOr => Some(self.const_bool(*lhs)? || self.const_bool(*rhs)?),
                BinaryOp::EqEq | BinaryOp::NotEq => {
                    let eq = match (self.const_int(*lhs), self.const_int(*rhs)) {
                        (Some(l), Some(r)) => l == r,
                        _ => {
                            let (l, r) = (self.const_bool(*lhs)?, self.const_bool(*rhs)?);
                            l == r
                        }
                    };
                    Some(if matches!(op, BinaryOp::EqEq) { eq } else { !eq })
                }
                BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                    let (l, r) = (self.const_int(*lhs)?, self.const_int(*rhs)?);
                    Some(match op {
                        BinaryOp::Lt => l < r,
                        BinaryOp::Le => l <= r,
                        BinaryOp::Gt => l > r,
                        _ => l >= r,
                    })
                }
                _ => None,
            },
            _ => None,
        }
    }

    #[must_use]
    pub fn const_int(&self, expr: ExprId) -> Option<i64> {
        if let Some(Const::Int(i)) = self.const_values.get(&expr) {
            return Some(*i);
        }
        match &self.expr(expr).kind {
            ExprKind::Int(i) => Some(*i),
            ExprKind::Unary {
                op: UnaryOp::Neg,
                expr,
            } => self.const_int(*expr).map(i64::wrapping_neg),
            ExprKind::Binary { op, lhs, rhs } => {
                let (l, r) = (self.const_int(*lhs)?, self.const_int(*rhs)?);
                match op {
                    BinaryOp::Add => Some(l.wrapping_add(r)),
                    BinaryOp::Sub => Some(l.wrapping_sub(r)),
                    BinaryOp::Mul => Some(l.wrapping_mul(r)),
                    BinaryOp::Div if r != 0 => Some(l.wrapping_div(r)),
                    BinaryOp::Rem if r != 0 => Some(l.wrapping_rem(r)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Builds a [`Body`] one node at a time.
///
/// Spans are synthesized as consecutive unit ranges in allocation order, so
/// every node gets a distinct location without the caller spelling one out.
#[derive(Debug, Default)]
pub struct BodyBuilder {
    stmts: Arena<Stmt>,
    exprs: Arena<Expr>,
    locals: Arena<Local>,
    declared_throws: Vec<String>,
    const_values: HashMap<ExprId, Const>,
    cursor: usize,
}

impl BodyBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_span(&mut self) -> Span {
        let span = Span::new(self.cursor, self.cursor + 1);
        self.cursor += 1;
        span
    }

    /// Declare an `int`-typed, non-final local.
    pub fn local(&mut self, name: &str, kind: LocalKind) -> LocalId {
        let ty = TypeRef::named("int");
        self.typed_local(name, kind, ty)
    }

    pub fn typed_local(&mut self, name: &str, kind: LocalKind, ty: TypeRef) -> LocalId {
        let span = self.next_span();
        LocalId::from_raw(self.locals.alloc(Local {
            name: name.to_string(),
            ty,
            kind,
            is_final: false,
            span,
        }))
    }

    /// Declare a final `int`-typed local (a blank final until assigned).
    pub fn final_local(&mut self, name: &str) -> LocalId {
        let span = self.next_span();
        LocalId::from_raw(self.locals.alloc(Local {
            name: name.to_string(),
            ty: TypeRef::named("int"),
            kind: LocalKind::Local,
            is_final: true,
            span,
        }))
    }

    pub fn expr(&mut self, kind: ExprKind) -> ExprId {
        let span = self.next_span();
        ExprId::from_raw(self.exprs.alloc(Expr { kind, span }))
    }

    pub fn stmt(&mut self, kind: StmtKind) -> StmtId {
        let span = self.next_span();
        StmtId::from_raw(self.stmts.alloc(Stmt { kind, span }))
    }

    /// Record an upstream-folded constant value for an expression.
    pub fn constant(&mut self, expr: ExprId, value: Const) {
        self.const_values.insert(expr, value);
    }

    /// Add a checked exception type to the enclosing method's throws clause.
    pub fn throws(&mut self, ty: impl Into<String>) {
        self.declared_throws.push(ty.into());
    }

    #[must_use]
    pub fn finish(self, root: StmtId) -> Body {
        Body {
            root,
            stmts: self.stmts,
            exprs: self.exprs,
            locals: self.locals,
            declared_throws: self.declared_throws,
            const_values: self.const_values,
        }
    }
}
