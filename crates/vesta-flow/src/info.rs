//! Per-program-point dataflow values.
//!
//! A [`FlowInfo`] carries, per local slot, a definitely-assigned bit and a
//! definitely-unassigned bit, a tracked null state, and a reachability mode.
//! The four assignment predicates the analysis needs come from the two
//! physical sets: potentially assigned is the complement of definitely
//! unassigned, and vice versa, which is what keeps "may already have been
//! assigned" expressible.
//!
//! States on paths that cannot be taken hold the vacuous all-bits-set value,
//! so the AND-join over incoming paths is simultaneously the live-path-only
//! join: an impossible path constrains nothing.

use vesta_hir::body::{Body, LocalId, LocalKind};

use crate::bits::BitSet;

/// What the analysis knows about a local's null-ness at a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullState {
    Null,
    NonNull,
    Unknown,
}

impl NullState {
    #[must_use]
    pub(crate) fn join(self, other: Self) -> Self {
        if self == other {
            self
        } else {
            Self::Unknown
        }
    }
}

/// Reachability mode of a program point.
///
/// `Dead` is the constant-condition middle ground: the point cannot execute,
/// but per the language rules it still counts as reachable, so it draws a
/// warning rather than the hard unreachable-code error. Ordering matters:
/// merging takes the most reachable input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Reach {
    /// After an unconditional abrupt completion. Hard error to put code here.
    Unreachable,
    /// Guarded by a condition known false at compile time. Warning.
    Dead,
    Reachable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowInfo {
    pub(crate) inits: BitSet,
    pub(crate) uninits: BitSet,
    pub(crate) nulls: Vec<NullState>,
    pub(crate) reach: Reach,
}

impl FlowInfo {
    /// State at method entry: parameters definitely assigned, every other
    /// local definitely unassigned, nothing known about null-ness.
    #[must_use]
    pub fn initial(body: &Body) -> Self {
        let n = body.locals().len();
        let mut inits = BitSet::new(n);
        let mut uninits = BitSet::new(n);
        for (idx, local) in body.locals().iter().enumerate() {
            if matches!(local.kind, LocalKind::Param) {
                inits.insert(idx);
            } else {
                uninits.insert(idx);
            }
        }
        FlowInfo {
            inits,
            uninits,
            nulls: vec![NullState::Unknown; n],
            reach: Reach::Reachable,
        }
    }

    #[must_use]
    pub fn is_assigned(&self, local: LocalId) -> bool {
        self.inits.contains(local.index())
    }

    #[must_use]
    pub fn is_definitely_unassigned(&self, local: LocalId) -> bool {
        self.uninits.contains(local.index())
    }

    /// Assigned on at least one path reaching this point.
    #[must_use]
    pub fn is_potentially_assigned(&self, local: LocalId) -> bool {
        !self.uninits.contains(local.index())
    }

    #[must_use]
    pub fn reach(&self) -> Reach {
        self.reach
    }

    pub(crate) fn mark_assigned(&mut self, local: LocalId) {
        self.inits.insert(local.index());
        self.uninits.remove(local.index());
    }

    /// Re-establish "definitely unassigned", as at a declaration site.
    pub(crate) fn mark_unassigned(&mut self, local: LocalId) {
        self.uninits.insert(local.index());
        self.inits.remove(local.index());
        if let Some(slot) = self.nulls.get_mut(local.index()) {
            *slot = NullState::Unknown;
        }
    }

    pub(crate) fn null_state(&self, local: LocalId) -> NullState {
        self.nulls
            .get(local.index())
            .copied()
            .unwrap_or(NullState::Unknown)
    }

    pub(crate) fn set_null_state(&mut self, local: LocalId, state: NullState) {
        if let Some(slot) = self.nulls.get_mut(local.index()) {
            *slot = state;
        }
    }

    /// Both bit sets go to all-ones: the state of a path that cannot be
    /// taken, which the AND-join ignores.
    fn vacuate(&mut self) {
        self.inits.fill();
        self.uninits.fill();
    }

    /// Enter the state after an unconditional abrupt completion.
    pub(crate) fn mark_unreachable(&mut self) {
        self.vacuate();
        self.reach = Reach::Unreachable;
    }

    /// Downgrade an impossible branch to dead. Only the if statement does
    /// this: its branches stay analyzable when a constant condition rules
    /// them out, where a loop body would be an outright error.
    pub(crate) fn soften_to_dead(&mut self) {
        if self.reach == Reach::Unreachable {
            self.reach = Reach::Dead;
        }
    }

    /// Mark dead by non-constant reasoning (null analysis). Bits stay real:
    /// assignment diagnostics inside such a region are still wanted.
    pub(crate) fn mark_dead(&mut self) {
        self.reach = self.reach.min(Reach::Dead);
    }

    /// A vacuous state at the same universe, used for paths no yield or
    /// branch ever produced.
    #[must_use]
    pub(crate) fn unreachable_like(&self) -> Self {
        let mut out = self.clone();
        out.mark_unreachable();
        out
    }

    /// Convergence join. Definitely assigned iff assigned on both inputs,
    /// potentially assigned iff assigned on at least one; the result is as
    /// reachable as the most reachable input. Null facts follow the more
    /// reachable side; between equally reachable sides they join pointwise,
    /// so facts proven only on an impossible path do not leak out.
    #[must_use]
    pub(crate) fn merged_with(mut self, other: &FlowInfo) -> FlowInfo {
        self.inits.intersect_with(&other.inits);
        self.uninits.intersect_with(&other.uninits);
        if self.reach < other.reach {
            self.nulls.clone_from(&other.nulls);
        } else if self.reach == other.reach {
            join_nulls(&mut self.nulls, &other.nulls);
        }
        self.reach = self.reach.max(other.reach);
        self
    }
}

/// Pointwise join of two null-fact vectors.
pub(crate) fn join_nulls(slots: &mut [NullState], other: &[NullState]) {
    for (slot, theirs) in slots.iter_mut().zip(other.iter()) {
        *slot = slot.join(*theirs);
    }
}

/// A dataflow value split on a boolean condition's outcome.
#[derive(Debug, Clone)]
pub(crate) struct Cond {
    pub(crate) when_true: FlowInfo,
    pub(crate) when_false: FlowInfo,
}

impl Cond {
    /// Split for a condition that tells the two outcomes nothing different.
    pub(crate) fn split(info: FlowInfo) -> Self {
        Cond {
            when_true: info.clone(),
            when_false: info,
        }
    }

    /// Collapse back to the unconditional state after the expression.
    #[must_use]
    pub(crate) fn unconditional(self) -> FlowInfo {
        self.when_true.merged_with(&self.when_false)
    }
}
