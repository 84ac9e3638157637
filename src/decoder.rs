use std::collections::BTreeSet;

use jclassfile::attributes::Attribute;
use jclassfile::class_file;
use jclassfile::constant_pool::ConstantPool;
use thiserror::Error;
use tracing::debug;

use crate::bytecode::decode_instructions;
use crate::descriptor::parameter_descriptor;
use crate::ir::{ClassDescriptor, DecodedClass, MethodBody, MethodSignature};

const CLASS_MAGIC: u32 = 0xCAFEBABE;
const CONSTRUCTOR_NAME: &str = "<init>";

/// Reasons a class file cannot be decoded.
#[derive(Debug, Error)]
pub(crate) enum DecodeError {
    #[error("class file truncated at byte {offset}")]
    Truncated { offset: usize },
    #[error("invalid class file magic 0x{0:08x}")]
    InvalidMagic(u32),
    #[error("constant pool entry #{index} is not a valid {expected} entry")]
    ConstantPool { index: u16, expected: &'static str },
    #[error("unsupported constant pool tag {0}")]
    UnsupportedConstant(u8),
    #[error("invalid method descriptor {0:?}")]
    Descriptor(String),
    #[error("invalid bytecode at offset {offset}: {reason}")]
    Bytecode { offset: usize, reason: String },
    #[error("malformed class file: {0}")]
    ClassFile(String),
}

/// Decode one class file into its descriptor and method bodies.
pub(crate) fn decode_class(data: &[u8]) -> Result<DecodedClass, DecodeError> {
    let magic = data
        .get(0..4)
        .map(|bytes| u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .ok_or(DecodeError::Truncated { offset: data.len() })?;
    if magic != CLASS_MAGIC {
        return Err(DecodeError::InvalidMagic(magic));
    }

    let class_file = match class_file::parse(data) {
        Ok(parsed) => parsed,
        Err(err) => {
            let message = format!("{err}");
            if message.contains("unmatched attribute") {
                debug!(reason = %message, "falling back to raw class reader");
                return decode_raw(data);
            }
            return Err(DecodeError::ClassFile(message));
        }
    };
    let constant_pool = class_file.constant_pool();
    let qualified_name = resolve_class_name(constant_pool, class_file.this_class())?;
    let super_name = if class_file.super_class() == 0 {
        None
    } else {
        Some(resolve_class_name(constant_pool, class_file.super_class())?)
    };
    let mut interfaces = BTreeSet::new();
    for interface in class_file.interfaces() {
        interfaces.insert(resolve_class_name(constant_pool, *interface)?);
    }

    let mut methods = Vec::new();
    for method in class_file.methods() {
        let name = resolve_utf8(constant_pool, method.name_index())?;
        let descriptor = resolve_utf8(constant_pool, method.descriptor_index())?;
        let code = method
            .attributes()
            .iter()
            .find_map(|attribute| match attribute {
                Attribute::Code {
                    code,
                    exception_table,
                    ..
                } => Some((code, exception_table.len())),
                _ => None,
            });
        let (instructions, exception_handler_count) = match code {
            Some((code, handlers)) => (decode_instructions(code)?, handlers),
            None => (Vec::new(), 0),
        };
        methods.push(MethodBody {
            name,
            descriptor,
            instructions,
            exception_handler_count,
        });
    }

    assemble(
        qualified_name,
        super_name,
        interfaces,
        class_file.fields().len(),
        methods,
    )
}

fn assemble(
    qualified_name: String,
    super_name: Option<String>,
    interfaces: BTreeSet<String>,
    field_count: usize,
    methods: Vec<MethodBody>,
) -> Result<DecodedClass, DecodeError> {
    let mut declared_methods = Vec::new();
    for method in &methods {
        let parameters = parameter_descriptor(&method.descriptor)
            .ok_or_else(|| DecodeError::Descriptor(method.descriptor.clone()))?;
        if method.name != CONSTRUCTOR_NAME {
            declared_methods.push(MethodSignature::new(method.name.clone(), parameters));
        }
    }
    Ok(DecodedClass {
        descriptor: ClassDescriptor {
            qualified_name,
            super_name,
            interfaces,
            declared_methods,
        },
        field_count,
        methods,
    })
}

fn resolve_class_name(
    constant_pool: &[ConstantPool],
    class_index: u16,
) -> Result<String, DecodeError> {
    match constant_pool.get(class_index as usize) {
        Some(ConstantPool::Class { name_index }) => resolve_utf8(constant_pool, *name_index),
        _ => Err(DecodeError::ConstantPool {
            index: class_index,
            expected: "class",
        }),
    }
}

fn resolve_utf8(constant_pool: &[ConstantPool], index: u16) -> Result<String, DecodeError> {
    match constant_pool.get(index as usize) {
        Some(ConstantPool::Utf8 { value }) => Ok(value.clone()),
        _ => Err(DecodeError::ConstantPool {
            index,
            expected: "utf8",
        }),
    }
}

/// Decode by walking the class file tables directly, for files whose attributes
/// `jclassfile` refuses.
pub(crate) fn decode_raw(data: &[u8]) -> Result<DecodedClass, DecodeError> {
    let mut reader = RawReader::new(data);
    let magic = reader.u32()?;
    if magic != CLASS_MAGIC {
        return Err(DecodeError::InvalidMagic(magic));
    }
    let _minor = reader.u16()?;
    let _major = reader.u16()?;
    let constant_pool = read_constant_pool(&mut reader)?;
    let _access_flags = reader.u16()?;
    let this_class = reader.u16()?;
    let super_class = reader.u16()?;

    let qualified_name = raw_class_name(&constant_pool, this_class)?;
    let super_name = if super_class == 0 {
        None
    } else {
        Some(raw_class_name(&constant_pool, super_class)?)
    };

    let interface_count = reader.u16()?;
    let mut interfaces = BTreeSet::new();
    for _ in 0..interface_count {
        let index = reader.u16()?;
        interfaces.insert(raw_class_name(&constant_pool, index)?);
    }

    let field_count = reader.u16()? as usize;
    for _ in 0..field_count {
        reader.skip(6)?;
        skip_attributes(&mut reader)?;
    }

    let method_count = reader.u16()?;
    let mut methods = Vec::with_capacity(method_count as usize);
    for _ in 0..method_count {
        let _access_flags = reader.u16()?;
        let name = raw_utf8(&constant_pool, reader.u16()?)?;
        let descriptor = raw_utf8(&constant_pool, reader.u16()?)?;
        let mut instructions = Vec::new();
        let mut exception_handler_count = 0;
        let attribute_count = reader.u16()?;
        for _ in 0..attribute_count {
            let attribute_name = raw_utf8(&constant_pool, reader.u16()?)?;
            let length = reader.u32()? as usize;
            let body = reader.bytes(length)?;
            if attribute_name == "Code" {
                let mut code_reader = RawReader::new(body);
                let _max_stack = code_reader.u16()?;
                let _max_locals = code_reader.u16()?;
                let code_length = code_reader.u32()? as usize;
                let code = code_reader.bytes(code_length)?;
                instructions = decode_instructions(code)?;
                exception_handler_count = code_reader.u16()? as usize;
                code_reader.skip(exception_handler_count * 8)?;
            }
        }
        methods.push(MethodBody {
            name,
            descriptor,
            instructions,
            exception_handler_count,
        });
    }
    skip_attributes(&mut reader)?;

    assemble(qualified_name, super_name, interfaces, field_count, methods)
}

/// Constant pool entries the raw reader needs to resolve names.
#[derive(Clone, Debug)]
enum RawConstant {
    Utf8(String),
    Class { name_index: u16 },
    Other,
}

fn read_constant_pool(reader: &mut RawReader<'_>) -> Result<Vec<RawConstant>, DecodeError> {
    let count = reader.u16()?;
    let mut entries = Vec::with_capacity(count as usize);
    entries.push(RawConstant::Other);
    while entries.len() < count as usize {
        let tag = reader.u8()?;
        match tag {
            1 => {
                let len = reader.u16()? as usize;
                let bytes = reader.bytes(len)?;
                entries.push(RawConstant::Utf8(String::from_utf8_lossy(bytes).to_string()));
            }
            7 => {
                let name_index = reader.u16()?;
                entries.push(RawConstant::Class { name_index });
            }
            3 | 4 | 9 | 10 | 11 | 12 | 17 | 18 => {
                reader.skip(4)?;
                entries.push(RawConstant::Other);
            }
            5 | 6 => {
                // long and double occupy two slots
                reader.skip(8)?;
                entries.push(RawConstant::Other);
                entries.push(RawConstant::Other);
            }
            8 | 16 | 19 | 20 => {
                reader.skip(2)?;
                entries.push(RawConstant::Other);
            }
            15 => {
                reader.skip(3)?;
                entries.push(RawConstant::Other);
            }
            _ => return Err(DecodeError::UnsupportedConstant(tag)),
        }
    }
    Ok(entries)
}

fn raw_class_name(entries: &[RawConstant], index: u16) -> Result<String, DecodeError> {
    match entries.get(index as usize) {
        Some(RawConstant::Class { name_index }) => raw_utf8(entries, *name_index),
        _ => Err(DecodeError::ConstantPool {
            index,
            expected: "class",
        }),
    }
}

fn raw_utf8(entries: &[RawConstant], index: u16) -> Result<String, DecodeError> {
    match entries.get(index as usize) {
        Some(RawConstant::Utf8(value)) => Ok(value.clone()),
        _ => Err(DecodeError::ConstantPool {
            index,
            expected: "utf8",
        }),
    }
}

fn skip_attributes(reader: &mut RawReader<'_>) -> Result<(), DecodeError> {
    let count = reader.u16()?;
    for _ in 0..count {
        reader.skip(2)?;
        let length = reader.u32()? as usize;
        reader.skip(length)?;
    }
    Ok(())
}

/// Big-endian cursor over class file bytes.
struct RawReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> RawReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let start = self.offset;
        let slice = start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
            .ok_or(DecodeError::Truncated { offset: start })?;
        self.offset = start + len;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.bytes(len)?;
        Ok(())
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
