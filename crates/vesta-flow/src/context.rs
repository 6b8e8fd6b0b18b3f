//! Frame stack for enclosing constructs and the pending-jump queue.
//!
//! Every loop, switch, labeled statement, try, and switch expression pushes a
//! frame while its interior is analyzed. `break`/`continue`/`return` resolve
//! to a frame depth when first seen and park their dataflow state in the
//! pending queue; the construct that owns the target depth drains them, and
//! any `finally` block the jump crosses rewrites them on the way out.

use crate::bits::BitSet;
use crate::info::FlowInfo;

#[derive(Debug)]
pub(crate) enum Frame {
    /// Target of `break`/`continue`; carries the label when the loop is the
    /// body of a labeled statement.
    Loop {
        label: Option<String>,
        label_used: bool,
    },
    /// Switch statement: target of unlabeled `break` only.
    Switch,
    /// Labeled non-loop statement: target of labeled `break` only.
    Label { name: String, used: bool },
    /// Try statement. `catch_uninits` accumulates which locals stayed
    /// definitely unassigned at every point the body could throw; catch and
    /// finally entries are built from it. `catch_types` feed the
    /// close-contract handler search of nested resource declarations, but
    /// only while the body is being analyzed: an exception raised inside a
    /// catch clause propagates past its own try.
    Try {
        catch_uninits: BitSet,
        catch_types: Vec<String>,
        handlers_active: bool,
    },
    /// Switch expression: accumulates the split states of its `yield`s.
    SwitchExpr {
        yields_true: Option<FlowInfo>,
        yields_false: Option<FlowInfo>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JumpKind {
    Break,
    Continue,
    Return,
}

#[derive(Debug)]
pub(crate) struct PendingJump {
    /// Frame depth of the target construct; `None` is the method exit.
    pub(crate) target: Option<usize>,
    pub(crate) kind: JumpKind,
    pub(crate) info: FlowInfo,
}

#[derive(Debug, Default)]
pub(crate) struct FlowContext {
    frames: Vec<Frame>,
    pending: Vec<PendingJump>,
}

impl FlowContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, frame: Frame) -> usize {
        self.frames.push(frame);
        self.frames.len() - 1
    }

    pub(crate) fn push_loop(&mut self, label: Option<String>) -> usize {
        self.push(Frame::Loop {
            label,
            label_used: false,
        })
    }

    pub(crate) fn push_switch(&mut self) -> usize {
        self.push(Frame::Switch)
    }

    pub(crate) fn push_label(&mut self, name: String) -> usize {
        self.push(Frame::Label { name, used: false })
    }

    pub(crate) fn push_try(&mut self, catch_uninits: BitSet, catch_types: Vec<String>) -> usize {
        self.push(Frame::Try {
            catch_uninits,
            catch_types,
            handlers_active: true,
        })
    }

    pub(crate) fn push_switch_expr(&mut self) -> usize {
        self.push(Frame::SwitchExpr {
            yields_true: None,
            yields_false: None,
        })
    }

    pub(crate) fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// Innermost frame a `break` with this label lands on, marking labels as
    /// referenced. Unlabeled breaks target loops and switch statements;
    /// labeled breaks target the matching labeled loop or labeled statement.
    /// A switch expression cuts the search short: no jump may leave one.
    pub(crate) fn resolve_break(&mut self, label: Option<&str>) -> Option<usize> {
        for (idx, frame) in self.frames.iter_mut().enumerate().rev() {
            match (label, frame) {
                (_, Frame::SwitchExpr { .. }) => return None,
                (None, Frame::Loop { .. } | Frame::Switch) => return Some(idx),
                (
                    Some(name),
                    Frame::Loop {
                        label: Some(frame_label),
                        label_used,
                    },
                ) if frame_label.as_str() == name => {
                    *label_used = true;
                    return Some(idx);
                }
                (
                    Some(name),
                    Frame::Label {
                        name: frame_name,
                        used,
                    },
                ) if frame_name.as_str() == name => {
                    *used = true;
                    return Some(idx);
                }
                _ => {}
            }
        }
        None
    }

    /// Innermost loop a `continue` with this label targets.
    pub(crate) fn resolve_continue(&mut self, label: Option<&str>) -> Option<usize> {
        for (idx, frame) in self.frames.iter_mut().enumerate().rev() {
            match frame {
                Frame::SwitchExpr { .. } => return None,
                Frame::Loop {
                    label: frame_label,
                    label_used,
                } => match label {
                    None => return Some(idx),
                    Some(name) if frame_label.as_deref() == Some(name) => {
                        *label_used = true;
                        return Some(idx);
                    }
                    Some(_) => {}
                },
                _ => {}
            }
        }
        None
    }

    /// A local was declared: it is definitely unassigned at any throw point
    /// that follows inside every enclosing try.
    pub(crate) fn declare_in_try_frames(&mut self, slot: usize) {
        for frame in &mut self.frames {
            if let Frame::Try { catch_uninits, .. } = frame {
                catch_uninits.insert(slot);
            }
        }
    }

    /// A local was assigned on a live path: it is no longer definitely
    /// unassigned at later throw points of any enclosing try.
    pub(crate) fn clear_in_try_frames(&mut self, slot: usize) {
        for frame in &mut self.frames {
            if let Frame::Try { catch_uninits, .. } = frame {
                catch_uninits.remove(slot);
            }
        }
    }

    /// Catch-clause types of every enclosing try whose handlers are still in
    /// force, innermost first.
    pub(crate) fn handler_types(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().rev().flat_map(|frame| {
            let types: &[String] = match frame {
                Frame::Try {
                    catch_types,
                    handlers_active: true,
                    ..
                } => catch_types,
                _ => &[],
            };
            types.iter().map(String::as_str)
        })
    }

    /// The try body is done: its own catch clauses no longer cover the code
    /// that follows (the catch bodies themselves).
    pub(crate) fn deactivate_try_handlers(&mut self, depth: usize) {
        if let Some(Frame::Try {
            handlers_active, ..
        }) = self.frames.get_mut(depth)
        {
            *handlers_active = false;
        }
    }

    /// Snapshot of a try frame's accumulated catch-entry unassigned set.
    pub(crate) fn try_catch_uninits(&self, depth: usize) -> Option<BitSet> {
        match self.frames.get(depth) {
            Some(Frame::Try { catch_uninits, .. }) => Some(catch_uninits.clone()),
            _ => None,
        }
    }

    /// Record a `yield`'s split state into the innermost switch expression.
    /// Returns false when there is none to receive it.
    pub(crate) fn record_yield(&mut self, when_true: FlowInfo, when_false: FlowInfo) -> bool {
        for frame in self.frames.iter_mut().rev() {
            if let Frame::SwitchExpr {
                yields_true,
                yields_false,
            } = frame
            {
                accumulate(yields_true, when_true);
                accumulate(yields_false, when_false);
                return true;
            }
        }
        false
    }

    pub(crate) fn queue(&mut self, jump: PendingJump) {
        self.pending.push(jump);
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop jumps queued after `len`. Used to rewind speculative loop passes.
    pub(crate) fn truncate_pending(&mut self, len: usize) {
        self.pending.truncate(len);
    }

    /// Drop a contiguous run of jumps, keeping later ones. Used when an
    /// abruptly-completing finally swallows the jumps that crossed it.
    pub(crate) fn discard_pending_range(&mut self, from: usize, to: usize) {
        self.pending.drain(from..to);
    }

    /// Jumps queued at or after `from`, for finally-exit rewriting.
    pub(crate) fn pending_from_mut(&mut self, from: usize) -> &mut [PendingJump] {
        &mut self.pending[from..]
    }

    /// Remove and return the states of all jumps of `kind` targeting the
    /// frame at `depth`, in queue order.
    pub(crate) fn drain_jumps(&mut self, depth: usize, kind: JumpKind) -> Vec<FlowInfo> {
        let mut drained = Vec::new();
        let mut idx = 0;
        while idx < self.pending.len() {
            if self.pending[idx].target == Some(depth) && self.pending[idx].kind == kind {
                drained.push(self.pending.remove(idx).info);
            } else {
                idx += 1;
            }
        }
        drained
    }

    /// Remove and return the states of all method-exit jumps.
    pub(crate) fn drain_returns(&mut self) -> Vec<FlowInfo> {
        let mut drained = Vec::new();
        let mut idx = 0;
        while idx < self.pending.len() {
            if self.pending[idx].target.is_none() {
                drained.push(self.pending.remove(idx).info);
            } else {
                idx += 1;
            }
        }
        drained
    }
}

pub(crate) fn accumulate(acc: &mut Option<FlowInfo>, info: FlowInfo) {
    *acc = Some(match acc.take() {
        Some(prev) => prev.merged_with(&info),
        None => info,
    });
}
