use serde::{Deserialize, Serialize};
use vesta_types::{Diagnostic, Span};

/// Findings the flow analyzer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDiagnosticKind {
    /// A local is read on some path where it was never assigned.
    UninitializedLocal,
    /// A final local or try-with-resources variable is written twice.
    FinalReassignment,
    /// No execution path reaches the statement.
    UnreachableCode,
    /// The statement is only cut off by a compile-time constant condition.
    DeadCode,
    /// A reachable switch case group runs on into the next one.
    FallthroughCase,
    /// A switch expression arm finishes without yielding a value.
    SwitchArmCompletesNormally,
    /// A statement label no break or continue ever names.
    UnreferencedLabel,
    /// A resource type with no close() contract, or a close() that throws
    /// something nothing handles.
    AutoCloseableContractViolation,
    /// A dereference of a value that can only be null at that point.
    NullDereference,
}

impl FlowDiagnosticKind {
    /// Stable code carried on emitted diagnostics.
    pub fn code(self) -> &'static str {
        match self {
            FlowDiagnosticKind::UninitializedLocal => "FLOW_UNASSIGNED",
            FlowDiagnosticKind::FinalReassignment => "FLOW_FINAL_REASSIGN",
            FlowDiagnosticKind::UnreachableCode => "FLOW_UNREACHABLE",
            FlowDiagnosticKind::DeadCode => "FLOW_DEAD",
            FlowDiagnosticKind::FallthroughCase => "FLOW_FALLTHROUGH",
            FlowDiagnosticKind::SwitchArmCompletesNormally => "FLOW_SWITCH_ARM",
            FlowDiagnosticKind::UnreferencedLabel => "FLOW_UNUSED_LABEL",
            FlowDiagnosticKind::AutoCloseableContractViolation => "FLOW_CLOSE_CONTRACT",
            FlowDiagnosticKind::NullDereference => "FLOW_NULL_DEREF",
        }
    }
}

/// Severity for one finding. `Ignore` drops the diagnostic entirely without
/// changing what the analyzer computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeveritySetting {
    Ignore,
    Warning,
    Error,
}

/// Severity policy, one knob per finding. Deserializes from partial input;
/// absent fields keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub uninitialized_local: SeveritySetting,
    pub final_reassignment: SeveritySetting,
    pub unreachable_code: SeveritySetting,
    pub dead_code: SeveritySetting,
    pub fallthrough_case: SeveritySetting,
    pub switch_arm_completes: SeveritySetting,
    pub unreferenced_label: SeveritySetting,
    pub auto_closeable_contract: SeveritySetting,
    pub null_dereference: SeveritySetting,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            uninitialized_local: SeveritySetting::Error,
            final_reassignment: SeveritySetting::Error,
            unreachable_code: SeveritySetting::Error,
            dead_code: SeveritySetting::Warning,
            fallthrough_case: SeveritySetting::Warning,
            switch_arm_completes: SeveritySetting::Error,
            unreferenced_label: SeveritySetting::Warning,
            auto_closeable_contract: SeveritySetting::Error,
            null_dereference: SeveritySetting::Warning,
        }
    }
}

impl FlowConfig {
    pub fn severity(&self, kind: FlowDiagnosticKind) -> SeveritySetting {
        match kind {
            FlowDiagnosticKind::UninitializedLocal => self.uninitialized_local,
            FlowDiagnosticKind::FinalReassignment => self.final_reassignment,
            FlowDiagnosticKind::UnreachableCode => self.unreachable_code,
            FlowDiagnosticKind::DeadCode => self.dead_code,
            FlowDiagnosticKind::FallthroughCase => self.fallthrough_case,
            FlowDiagnosticKind::SwitchArmCompletesNormally => self.switch_arm_completes,
            FlowDiagnosticKind::UnreferencedLabel => self.unreferenced_label,
            FlowDiagnosticKind::AutoCloseableContractViolation => self.auto_closeable_contract,
            FlowDiagnosticKind::NullDereference => self.null_dereference,
        }
    }
}

pub(crate) fn diagnostic(
    config: &FlowConfig,
    kind: FlowDiagnosticKind,
    span: Span,
    message: String,
) -> Option<Diagnostic> {
    match config.severity(kind) {
        SeveritySetting::Ignore => None,
        SeveritySetting::Warning => Some(Diagnostic::warning(kind.code(), message, Some(span))),
        SeveritySetting::Error => Some(Diagnostic::error(kind.code(), message, Some(span))),
    }
}
