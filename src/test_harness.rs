use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use zip::write::SimpleFileOptions;

use crate::opcodes;

const ACC_PUBLIC_SUPER: u16 = 0x0021;
const ACC_PUBLIC_ABSTRACT_INTERFACE: u16 = 0x0601;
const ACC_PUBLIC: u16 = 0x0001;
const ACC_PUBLIC_ABSTRACT: u16 = 0x0401;

/// Minimal class file writer for tests.
pub(crate) struct ClassFileBuilder {
    cp: Vec<CpEntry>,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<(u16, u16)>,
    methods: Vec<MethodSpec>,
    code_index: u16,
}

impl ClassFileBuilder {
    pub(crate) fn new(class_name: &str, super_name: Option<&str>) -> Self {
        let mut builder = Self {
            cp: Vec::new(),
            access_flags: ACC_PUBLIC_SUPER,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            code_index: 0,
        };
        builder.code_index = builder.add_utf8("Code");
        builder.this_class = builder.add_class(class_name);
        if let Some(super_name) = super_name {
            builder.super_class = builder.add_class(super_name);
        }
        builder
    }

    /// Interface type: abstract, extends `java/lang/Object`.
    pub(crate) fn interface(class_name: &str) -> Self {
        let mut builder = Self::new(class_name, Some("java/lang/Object"));
        builder.access_flags = ACC_PUBLIC_ABSTRACT_INTERFACE;
        builder
    }

    pub(crate) fn add_utf8(&mut self, value: &str) -> u16 {
        self.cp.push(CpEntry::Utf8(value.to_string()));
        self.cp.len() as u16
    }

    pub(crate) fn add_class(&mut self, name: &str) -> u16 {
        let name_index = self.add_utf8(name);
        self.cp.push(CpEntry::Class(name_index));
        self.cp.len() as u16
    }

    fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.add_utf8(name);
        let descriptor_index = self.add_utf8(descriptor);
        self.cp
            .push(CpEntry::NameAndType(name_index, descriptor_index));
        self.cp.len() as u16
    }

    pub(crate) fn add_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.add_class(class);
        let name_and_type = self.add_name_and_type(name, descriptor);
        self.cp
            .push(CpEntry::MethodRef(class_index, name_and_type));
        self.cp.len() as u16
    }

    pub(crate) fn add_interface(&mut self, name: &str) {
        let index = self.add_class(name);
        self.interfaces.push(index);
    }

    pub(crate) fn add_field(&mut self, name: &str, descriptor: &str) {
        let name_index = self.add_utf8(name);
        let descriptor_index = self.add_utf8(descriptor);
        self.fields.push((name_index, descriptor_index));
    }

    pub(crate) fn add_method(&mut self, name: &str, descriptor: &str, code: Vec<u8>) {
        self.add_method_with_handlers(name, descriptor, code, &[]);
    }

    /// Add a method whose exception table holds `(start, end, handler, catch_type)` rows.
    pub(crate) fn add_method_with_handlers(
        &mut self,
        name: &str,
        descriptor: &str,
        code: Vec<u8>,
        handlers: &[(u16, u16, u16, u16)],
    ) {
        let name_index = self.add_utf8(name);
        let descriptor_index = self.add_utf8(descriptor);
        self.methods.push(MethodSpec {
            access_flags: ACC_PUBLIC,
            name_index,
            descriptor_index,
            code: Some(code),
            handlers: handlers.to_vec(),
        });
    }

    pub(crate) fn add_abstract_method(&mut self, name: &str, descriptor: &str) {
        let name_index = self.add_utf8(name);
        let descriptor_index = self.add_utf8(descriptor);
        self.methods.push(MethodSpec {
            access_flags: ACC_PUBLIC_ABSTRACT,
            name_index,
            descriptor_index,
            code: None,
            handlers: Vec::new(),
        });
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_u32(&mut bytes, 0xCAFEBABE);
        write_u16(&mut bytes, 0);
        write_u16(&mut bytes, 52);
        write_u16(&mut bytes, (self.cp.len() + 1) as u16);
        for entry in &self.cp {
            entry.write(&mut bytes);
        }
        write_u16(&mut bytes, self.access_flags);
        write_u16(&mut bytes, self.this_class);
        write_u16(&mut bytes, self.super_class);
        write_u16(&mut bytes, self.interfaces.len() as u16);
        for interface in &self.interfaces {
            write_u16(&mut bytes, *interface);
        }
        write_u16(&mut bytes, self.fields.len() as u16);
        for (name_index, descriptor_index) in &self.fields {
            write_u16(&mut bytes, ACC_PUBLIC);
            write_u16(&mut bytes, *name_index);
            write_u16(&mut bytes, *descriptor_index);
            write_u16(&mut bytes, 0);
        }
        write_u16(&mut bytes, self.methods.len() as u16);
        for method in &self.methods {
            write_u16(&mut bytes, method.access_flags);
            write_u16(&mut bytes, method.name_index);
            write_u16(&mut bytes, method.descriptor_index);
            let Some(code) = &method.code else {
                write_u16(&mut bytes, 0);
                continue;
            };
            write_u16(&mut bytes, 1);
            write_u16(&mut bytes, self.code_index);
            let attr_len = 12 + code.len() as u32 + 8 * method.handlers.len() as u32;
            write_u32(&mut bytes, attr_len);
            write_u16(&mut bytes, 4);
            write_u16(&mut bytes, 4);
            write_u32(&mut bytes, code.len() as u32);
            bytes.extend_from_slice(code);
            write_u16(&mut bytes, method.handlers.len() as u16);
            for (start, end, handler, catch_type) in &method.handlers {
                write_u16(&mut bytes, *start);
                write_u16(&mut bytes, *end);
                write_u16(&mut bytes, *handler);
                write_u16(&mut bytes, *catch_type);
            }
            write_u16(&mut bytes, 0);
        }
        write_u16(&mut bytes, 0);
        bytes
    }
}

/// Method definition for generated class files.
struct MethodSpec {
    access_flags: u16,
    name_index: u16,
    descriptor_index: u16,
    code: Option<Vec<u8>>,
    handlers: Vec<(u16, u16, u16, u16)>,
}

/// Constant pool entries needed by test class files.
enum CpEntry {
    Utf8(String),
    Class(u16),
    NameAndType(u16, u16),
    MethodRef(u16, u16),
}

impl CpEntry {
    fn write(&self, bytes: &mut Vec<u8>) {
        match self {
            CpEntry::Utf8(value) => {
                bytes.push(1);
                write_u16(bytes, value.len() as u16);
                bytes.extend_from_slice(value.as_bytes());
            }
            CpEntry::Class(name_index) => {
                bytes.push(7);
                write_u16(bytes, *name_index);
            }
            CpEntry::NameAndType(name_index, descriptor_index) => {
                bytes.push(12);
                write_u16(bytes, *name_index);
                write_u16(bytes, *descriptor_index);
            }
            CpEntry::MethodRef(class_index, name_and_type) => {
                bytes.push(10);
                write_u16(bytes, *class_index);
                write_u16(bytes, *name_and_type);
            }
        }
    }
}

fn write_u16(bytes: &mut Vec<u8>, value: u16) {
    bytes.extend_from_slice(&value.to_be_bytes());
}

fn write_u32(bytes: &mut Vec<u8>, value: u32) {
    bytes.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn high(value: u16) -> u8 {
    (value >> 8) as u8
}

pub(crate) fn low(value: u16) -> u8 {
    (value & 0xff) as u8
}

/// Class with a default constructor and one `void name()` method per entry.
pub(crate) fn simple_class(name: &str, super_name: &str, methods: &[&str]) -> Vec<u8> {
    let mut builder = ClassFileBuilder::new(name, Some(super_name));
    let super_init = builder.add_method_ref(super_name, "<init>", "()V");
    builder.add_method(
        "<init>",
        "()V",
        vec![
            opcodes::ALOAD_0,
            opcodes::INVOKESPECIAL,
            high(super_init),
            low(super_init),
            opcodes::RETURN,
        ],
    );
    for method in methods {
        builder.add_method(method, "()V", vec![opcodes::RETURN]);
    }
    builder.finish()
}

/// Write a zip archive holding the given `(entry name, bytes)` pairs in order.
pub(crate) fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = zip::ZipWriter::new(file);
    for (name, data) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .with_context(|| format!("start entry {name}"))?;
        writer
            .write_all(data)
            .with_context(|| format!("write entry {name}"))?;
    }
    writer.finish().context("finish jar")?;
    Ok(())
}
