use std::collections::BTreeSet;

use crate::classpath::ClassTable;
use crate::ir::{ClassDescriptor, MethodSignature};

/// Lexical override matches found through superclasses and through interfaces.
///
/// The two counters are independent: a method matched on both paths counts twice.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct OverrideTally {
    pub(crate) superclass: u64,
    pub(crate) interface: u64,
}

impl OverrideTally {
    pub(crate) fn total(&self) -> u64 {
        self.superclass + self.interface
    }
}

/// Count override matches for every class in the table except the root.
pub(crate) fn count_overrides(table: &ClassTable) -> OverrideTally {
    let mut tally = OverrideTally::default();
    for descriptor in table.non_root() {
        tally.superclass += superclass_matches(table, descriptor);
        tally.interface += interface_matches(table, descriptor);
    }
    tally
}

/// One match per (declared method, ancestor declaring the same signature) pair.
fn superclass_matches(table: &ClassTable, descriptor: &ClassDescriptor) -> u64 {
    let ancestors = superclass_chain(table, descriptor);
    descriptor
        .declared_methods
        .iter()
        .map(|signature| {
            ancestors
                .iter()
                .filter(|ancestor| ancestor.declares(signature))
                .count() as u64
        })
        .sum()
}

/// One match per declared method found anywhere in the interface closure.
fn interface_matches(table: &ClassTable, descriptor: &ClassDescriptor) -> u64 {
    let inherited = interface_signatures(table, descriptor);
    descriptor
        .declared_methods
        .iter()
        .filter(|signature| inherited.contains(signature))
        .count() as u64
}

/// Resolved ancestors, nearest first, following `super_name` until it is
/// absent, unresolved, or already on the chain.
pub(crate) fn superclass_chain<'a>(
    table: &'a ClassTable,
    descriptor: &ClassDescriptor,
) -> Vec<&'a ClassDescriptor> {
    let mut chain = Vec::new();
    let mut seen = BTreeSet::new();
    seen.insert(descriptor.qualified_name.as_str());
    let mut next = descriptor.super_name.as_deref();
    while let Some(name) = next {
        let Some(ancestor) = table.get(name) else {
            break;
        };
        if !seen.insert(ancestor.qualified_name.as_str()) {
            break;
        }
        chain.push(ancestor);
        next = ancestor.super_name.as_deref();
    }
    chain
}

/// Every signature declared by the class's interfaces and, transitively, by
/// their super-interfaces. Built fresh per call.
pub(crate) fn interface_signatures<'a>(
    table: &'a ClassTable,
    descriptor: &ClassDescriptor,
) -> BTreeSet<&'a MethodSignature> {
    let mut signatures = BTreeSet::new();
    let mut visited = BTreeSet::new();
    let mut pending: Vec<&str> = descriptor.interfaces.iter().map(String::as_str).collect();
    while let Some(name) = pending.pop() {
        let Some(interface) = table.get(name) else {
            continue;
        };
        if !visited.insert(interface.qualified_name.as_str()) {
            continue;
        }
        signatures.extend(interface.declared_methods.iter());
        pending.extend(interface.interfaces.iter().map(String::as_str));
    }
    signatures
}
