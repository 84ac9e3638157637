use std::str::FromStr;

use jdescriptor::MethodDescriptor;

/// Extract the parameter part of a JVM method descriptor, parentheses included.
///
/// `(ILjava/lang/String;)V` yields `(ILjava/lang/String;)`. Returns `None` when the
/// descriptor does not parse as a method descriptor.
pub(crate) fn parameter_descriptor(descriptor: &str) -> Option<String> {
    MethodDescriptor::from_str(descriptor).ok()?;
    let start = descriptor.find('(')?;
    let end = descriptor.find(')')?;
    Some(descriptor[start..=end].to_string())
}
