use crate::ir::{DecodedClass, InstructionKind, MethodBody};

/// Run-level totals gathered while decoding. Counters only ever grow.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct MetricsAccumulator {
    pub(crate) assignments: u64,
    pub(crate) branches: u64,
    pub(crate) conditions: u64,
    pub(crate) field_count: u64,
    pub(crate) class_count: u64,
    pub(crate) method_count: u64,
}

impl MetricsAccumulator {
    /// Fold one decoded class into the totals: its fields, its methods
    /// (constructors included) and every method body's A/B/C contributions.
    pub(crate) fn record_class(&mut self, class: &DecodedClass) {
        self.class_count += 1;
        self.field_count += class.field_count as u64;
        self.method_count += class.methods.len() as u64;
        for method in &class.methods {
            scan_method(method, self);
        }
    }
}

/// Classify every instruction of one method into the assignment, branch and
/// condition counters.
///
/// Unconditional jumps count as conditions, and only lookup switches add per-key
/// conditions; table switches add nothing.
pub(crate) fn scan_method(method: &MethodBody, metrics: &mut MetricsAccumulator) {
    metrics.conditions += method.exception_handler_count as u64;
    for instruction in &method.instructions {
        match &instruction.kind {
            InstructionKind::LocalStore { .. } => metrics.assignments += 1,
            InstructionKind::Invoke(_) | InstructionKind::Allocate(_) => metrics.branches += 1,
            InstructionKind::Jump => metrics.conditions += 1,
            InstructionKind::LookupSwitch { keys } => metrics.conditions += keys.len() as u64,
            InstructionKind::TableSwitch { .. } | InstructionKind::Other => {}
        }
    }
}
