//! JVM opcode constants used by the bytecode reader.

pub(crate) const BIPUSH: u8 = 0x10;
pub(crate) const SIPUSH: u8 = 0x11;
pub(crate) const LDC: u8 = 0x12;
pub(crate) const LDC_W: u8 = 0x13;
pub(crate) const LDC2_W: u8 = 0x14;

pub(crate) const ISTORE: u8 = 0x36;
pub(crate) const ASTORE: u8 = 0x3a;
pub(crate) const ISTORE_0: u8 = 0x3b;
pub(crate) const ASTORE_3: u8 = 0x4e;

pub(crate) const IINC: u8 = 0x84;

pub(crate) const IFEQ: u8 = 0x99;
pub(crate) const IF_ACMPNE: u8 = 0xa6;
pub(crate) const GOTO: u8 = 0xa7;
pub(crate) const JSR: u8 = 0xa8;
pub(crate) const RET: u8 = 0xa9;
pub(crate) const TABLESWITCH: u8 = 0xaa;
pub(crate) const LOOKUPSWITCH: u8 = 0xab;

pub(crate) const INVOKEVIRTUAL: u8 = 0xb6;
pub(crate) const INVOKESPECIAL: u8 = 0xb7;
pub(crate) const INVOKESTATIC: u8 = 0xb8;
pub(crate) const INVOKEINTERFACE: u8 = 0xb9;
pub(crate) const INVOKEDYNAMIC: u8 = 0xba;
pub(crate) const NEW: u8 = 0xbb;
pub(crate) const NEWARRAY: u8 = 0xbc;
pub(crate) const ANEWARRAY: u8 = 0xbd;

pub(crate) const WIDE: u8 = 0xc4;
pub(crate) const MULTIANEWARRAY: u8 = 0xc5;
pub(crate) const IFNULL: u8 = 0xc6;
pub(crate) const IFNONNULL: u8 = 0xc7;
pub(crate) const GOTO_W: u8 = 0xc8;
pub(crate) const JSR_W: u8 = 0xc9;

#[cfg(test)]
pub(crate) const ILOAD: u8 = 0x15;
#[cfg(test)]
pub(crate) const LSTORE: u8 = 0x37;
#[cfg(test)]
pub(crate) const ICONST_0: u8 = 0x03;
#[cfg(test)]
pub(crate) const ALOAD_0: u8 = 0x2a;
#[cfg(test)]
pub(crate) const ISTORE_1: u8 = 0x3c;
#[cfg(test)]
pub(crate) const ASTORE_1: u8 = 0x4c;
#[cfg(test)]
pub(crate) const RETURN: u8 = 0xb1;
#[cfg(test)]
pub(crate) const IRETURN: u8 = 0xac;
#[cfg(test)]
pub(crate) const POP: u8 = 0x57;
