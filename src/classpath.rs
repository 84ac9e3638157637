use std::collections::{BTreeMap, BTreeSet};

use crate::ir::{ClassDescriptor, ROOT_CLASS_NAME};

/// Decoded class descriptors keyed by internal name, seeded with the root type.
///
/// One descriptor per name: inserting a name that is already present replaces
/// the earlier descriptor.
#[derive(Clone, Debug)]
pub(crate) struct ClassTable {
    classes: BTreeMap<String, ClassDescriptor>,
}

impl ClassTable {
    pub(crate) fn new() -> Self {
        let root = ClassDescriptor::root();
        let mut classes = BTreeMap::new();
        classes.insert(root.qualified_name.clone(), root);
        Self { classes }
    }

    /// Insert a descriptor, returning the one it replaced.
    pub(crate) fn insert(&mut self, descriptor: ClassDescriptor) -> Option<ClassDescriptor> {
        self.classes
            .insert(descriptor.qualified_name.clone(), descriptor)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub(crate) fn root_name(&self) -> &'static str {
        ROOT_CLASS_NAME
    }

    pub(crate) fn is_root(&self, descriptor: &ClassDescriptor) -> bool {
        descriptor.qualified_name == ROOT_CLASS_NAME
    }

    /// All descriptors in name order, root included.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.values()
    }

    /// Descriptors other than the root, in name order.
    pub(crate) fn non_root(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.iter().filter(|descriptor| !self.is_root(descriptor))
    }

    pub(crate) fn len(&self) -> usize {
        self.classes.len()
    }

    /// Superclass and interface names referenced by some descriptor but absent
    /// from the table.
    pub(crate) fn unresolved_parents(&self) -> BTreeSet<&str> {
        let mut missing = BTreeSet::new();
        for descriptor in self.iter() {
            let parents = descriptor
                .super_name
                .iter()
                .chain(descriptor.interfaces.iter());
            for parent in parents {
                if !self.contains(parent) {
                    missing.insert(parent.as_str());
                }
            }
        }
        missing
    }
}
