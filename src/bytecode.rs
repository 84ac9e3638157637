use crate::decoder::DecodeError;
use crate::ir::{AllocationKind, CallKind, Instruction, InstructionKind};
use crate::opcodes;

/// Pull-based reader over a method's code array.
///
/// Yields one typed instruction per opcode. After the first error the reader is
/// exhausted.
pub(crate) struct BytecodeReader<'a> {
    code: &'a [u8],
    offset: usize,
}

impl<'a> BytecodeReader<'a> {
    pub(crate) fn new(code: &'a [u8]) -> Self {
        Self { code, offset: 0 }
    }
}

impl Iterator for BytecodeReader<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.code.len() {
            return None;
        }
        match decode_instruction(self.code, self.offset) {
            Ok((instruction, length)) => {
                self.offset += length;
                Some(Ok(instruction))
            }
            Err(err) => {
                self.offset = self.code.len();
                Some(Err(err))
            }
        }
    }
}

/// Decode a whole code array.
pub(crate) fn decode_instructions(code: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    BytecodeReader::new(code).collect()
}

fn decode_instruction(code: &[u8], offset: usize) -> Result<(Instruction, usize), DecodeError> {
    let opcode = code[offset];
    let length = opcode_length(code, offset)?;
    if offset + length > code.len() {
        return Err(bytecode_error(offset, "instruction runs past end of code"));
    }
    let kind = match opcode {
        opcodes::ISTORE..=opcodes::ASTORE => InstructionKind::LocalStore {
            index: code[offset + 1] as u16,
        },
        opcodes::ISTORE_0..=opcodes::ASTORE_3 => InstructionKind::LocalStore {
            index: ((opcode - opcodes::ISTORE_0) % 4) as u16,
        },
        opcodes::INVOKEVIRTUAL => InstructionKind::Invoke(CallKind::Virtual),
        opcodes::INVOKESPECIAL => InstructionKind::Invoke(CallKind::Special),
        opcodes::INVOKESTATIC => InstructionKind::Invoke(CallKind::Static),
        opcodes::INVOKEINTERFACE => InstructionKind::Invoke(CallKind::Interface),
        opcodes::NEW => InstructionKind::Allocate(AllocationKind::Object),
        opcodes::NEWARRAY => InstructionKind::Allocate(AllocationKind::PrimitiveArray),
        opcodes::ANEWARRAY => InstructionKind::Allocate(AllocationKind::ReferenceArray),
        opcodes::MULTIANEWARRAY => InstructionKind::Allocate(AllocationKind::MultiArray),
        opcodes::IFEQ..=opcodes::IF_ACMPNE
        | opcodes::GOTO
        | opcodes::JSR
        | opcodes::IFNULL
        | opcodes::IFNONNULL
        | opcodes::GOTO_W
        | opcodes::JSR_W => InstructionKind::Jump,
        opcodes::TABLESWITCH => {
            let base = offset + 1 + padding(offset);
            InstructionKind::TableSwitch {
                low: read_i32(code, base + 4)?,
                high: read_i32(code, base + 8)?,
            }
        }
        opcodes::LOOKUPSWITCH => {
            let base = offset + 1 + padding(offset);
            let npairs = read_i32(code, base + 4)? as usize;
            let keys = (0..npairs)
                .map(|pair| read_i32(code, base + 8 + pair * 8))
                .collect::<Result<Vec<_>, _>>()?;
            InstructionKind::LookupSwitch { keys }
        }
        opcodes::WIDE => match code[offset + 1] {
            opcodes::ISTORE..=opcodes::ASTORE => InstructionKind::LocalStore {
                index: read_u16(code, offset + 2)?,
            },
            _ => InstructionKind::Other,
        },
        _ => InstructionKind::Other,
    };
    let instruction = Instruction {
        offset: offset as u32,
        opcode,
        kind,
    };
    Ok((instruction, length))
}

pub(crate) fn opcode_length(code: &[u8], offset: usize) -> Result<usize, DecodeError> {
    let opcode = code[offset];
    let length = match opcode {
        0x00..=0x0f => 1,
        opcodes::BIPUSH => 2,
        opcodes::SIPUSH => 3,
        opcodes::LDC => 2,
        opcodes::LDC_W | opcodes::LDC2_W => 3,
        0x15..=0x19 => 2,
        0x1a..=0x35 => 1,
        opcodes::ISTORE..=opcodes::ASTORE => 2,
        opcodes::ISTORE_0..=opcodes::ASTORE_3 => 1,
        0x4f..=0x83 => 1,
        opcodes::IINC => 3,
        0x85..=0x98 => 1,
        opcodes::IFEQ..=opcodes::IF_ACMPNE => 3,
        opcodes::GOTO | opcodes::JSR => 3,
        opcodes::RET => 2,
        opcodes::TABLESWITCH => tableswitch_length(code, offset)?,
        opcodes::LOOKUPSWITCH => lookupswitch_length(code, offset)?,
        0xac..=0xb1 => 1,
        0xb2..=0xb5 => 3,
        opcodes::INVOKEVIRTUAL | opcodes::INVOKESPECIAL | opcodes::INVOKESTATIC => 3,
        opcodes::INVOKEINTERFACE | opcodes::INVOKEDYNAMIC => 5,
        opcodes::NEW => 3,
        opcodes::NEWARRAY => 2,
        opcodes::ANEWARRAY => 3,
        0xbe | 0xbf => 1,
        0xc0 | 0xc1 => 3,
        0xc2 | 0xc3 => 1,
        opcodes::WIDE => wide_length(code, offset)?,
        opcodes::MULTIANEWARRAY => 4,
        opcodes::IFNULL | opcodes::IFNONNULL => 3,
        opcodes::GOTO_W | opcodes::JSR_W => 5,
        0xca => 1,
        0xfe | 0xff => 1,
        _ => {
            return Err(bytecode_error(
                offset,
                format!("unsupported opcode 0x{opcode:02x}"),
            ));
        }
    };
    Ok(length)
}

fn tableswitch_length(code: &[u8], offset: usize) -> Result<usize, DecodeError> {
    let padding = padding(offset);
    let base = offset + 1 + padding;
    let low = read_i32(code, base + 4)?;
    let high = read_i32(code, base + 8)?;
    let count = high
        .checked_sub(low)
        .and_then(|v| v.checked_add(1))
        .filter(|count| *count >= 0)
        .ok_or_else(|| bytecode_error(offset, "invalid tableswitch range"))?;
    Ok(1 + padding + 12 + (count as usize) * 4)
}

fn lookupswitch_length(code: &[u8], offset: usize) -> Result<usize, DecodeError> {
    let padding = padding(offset);
    let base = offset + 1 + padding;
    let npairs = read_i32(code, base + 4)?;
    if npairs < 0 {
        return Err(bytecode_error(offset, "invalid lookupswitch pairs"));
    }
    Ok(1 + padding + 8 + (npairs as usize) * 8)
}

fn wide_length(code: &[u8], offset: usize) -> Result<usize, DecodeError> {
    let opcode = code
        .get(offset + 1)
        .copied()
        .ok_or_else(|| bytecode_error(offset, "missing wide opcode"))?;
    if opcode == opcodes::IINC { Ok(6) } else { Ok(4) }
}

/// Switch operands are aligned to four bytes from the start of the code array.
pub(crate) fn padding(offset: usize) -> usize {
    (4 - ((offset + 1) % 4)) % 4
}

fn read_u16(code: &[u8], offset: usize) -> Result<u16, DecodeError> {
    let slice = code
        .get(offset..offset + 2)
        .ok_or_else(|| bytecode_error(offset, "u16 operand out of bounds"))?;
    Ok(u16::from_be_bytes([slice[0], slice[1]]))
}

fn read_i32(code: &[u8], offset: usize) -> Result<i32, DecodeError> {
    let slice = code
        .get(offset..offset + 4)
        .ok_or_else(|| bytecode_error(offset, "i32 operand out of bounds"))?;
    Ok(i32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn bytecode_error(offset: usize, reason: impl Into<String>) -> DecodeError {
    DecodeError::Bytecode {
        offset,
        reason: reason.into(),
    }
}
