use std::collections::BTreeSet;
use std::fmt;

/// Internal name of the universal base type.
pub(crate) const ROOT_CLASS_NAME: &str = "java/lang/Object";

/// Methods every class inherits from the root, as `name + parameter descriptor`.
const ROOT_METHODS: [(&str, &str); 5] = [
    ("hashCode", "()"),
    ("equals", "(Ljava/lang/Object;)"),
    ("clone", "()"),
    ("toString", "()"),
    ("finalize", "()"),
];

/// Lexical method key: the method name followed by its parameter descriptor.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) struct MethodSignature {
    pub(crate) name: String,
    pub(crate) parameter_descriptor: String,
}

impl MethodSignature {
    pub(crate) fn new(name: impl Into<String>, parameter_descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameter_descriptor: parameter_descriptor.into(),
        }
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.parameter_descriptor)
    }
}

/// Names and signatures of one type, as needed by the hierarchy and override passes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ClassDescriptor {
    pub(crate) qualified_name: String,
    pub(crate) super_name: Option<String>,
    pub(crate) interfaces: BTreeSet<String>,
    pub(crate) declared_methods: Vec<MethodSignature>,
}

impl ClassDescriptor {
    /// The synthetic `java/lang/Object` descriptor every hierarchy hangs from.
    pub(crate) fn root() -> Self {
        Self {
            qualified_name: ROOT_CLASS_NAME.to_string(),
            super_name: None,
            interfaces: BTreeSet::new(),
            declared_methods: ROOT_METHODS
                .iter()
                .map(|(name, params)| MethodSignature::new(*name, *params))
                .collect(),
        }
    }

    pub(crate) fn declares(&self, signature: &MethodSignature) -> bool {
        self.declared_methods.contains(signature)
    }
}

/// Output of decoding a single class file.
#[derive(Clone, Debug)]
pub(crate) struct DecodedClass {
    pub(crate) descriptor: ClassDescriptor,
    pub(crate) field_count: usize,
    pub(crate) methods: Vec<MethodBody>,
}

/// A declared method with its decoded bytecode. Constructors are included here.
#[derive(Clone, Debug)]
pub(crate) struct MethodBody {
    pub(crate) name: String,
    pub(crate) descriptor: String,
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) exception_handler_count: usize,
}

/// Bytecode instruction captured for analysis.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Instruction {
    #[allow(dead_code)]
    pub(crate) offset: u32,
    #[allow(dead_code)]
    pub(crate) opcode: u8,
    pub(crate) kind: InstructionKind,
}

/// Instruction kinds the complexity scanner distinguishes.
#[allow(dead_code)]
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum InstructionKind {
    LocalStore { index: u16 },
    Invoke(CallKind),
    Allocate(AllocationKind),
    Jump,
    TableSwitch { low: i32, high: i32 },
    LookupSwitch { keys: Vec<i32> },
    Other,
}

/// Invocation opcode classification.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub(crate) enum CallKind {
    Virtual,
    Interface,
    Special,
    Static,
}

/// Object and array creation opcodes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum AllocationKind {
    Object,
    PrimitiveArray,
    ReferenceArray,
    MultiArray,
}
