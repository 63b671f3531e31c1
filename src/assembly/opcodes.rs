//! CIL opcode values and their decoding metadata.
//!
//! One-byte opcodes occupy `0x00..=0xE0`; two-byte opcodes carry the `0xFE` prefix in the
//! high byte of the packed value. The descriptor tables associate every opcode with its
//! mnemonic, the operand shape it expects, its control-flow class and its fixed stack
//! effect. Reserved encodings carry an empty mnemonic and are rejected by
//! [`OpCode::from_raw`].

use crate::assembly::instruction::{FlowType, StackBehavior};

/// The operand shape an opcode expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand
    None,
    /// 32-bit integer literal
    I4,
    /// 64-bit integer literal
    I8,
    /// 32-bit float literal
    R4,
    /// 64-bit float literal
    R8,
    /// String literal
    String,
    /// A type reference
    Type,
    /// A member reference
    Member,
    /// A type or member reference (`ldtoken`, `calli` signatures)
    Token,
    /// A local variable slot
    Local,
    /// A method argument index
    Argument,
    /// A branch target
    Target,
    /// A branch target list
    Switch,
}

/// Sentinel for stack effects that depend on an operand signature (calls, `ret`).
pub(crate) const VAR: u8 = 0xFF;

pub(crate) struct OpCodeDesc {
    pub mnemonic: &'static str,
    pub operand: OperandKind,
    pub flow: FlowType,
    pub pops: u8,
    pub pushes: u8,
}

const fn op(
    mnemonic: &'static str,
    operand: OperandKind,
    flow: FlowType,
    pops: u8,
    pushes: u8,
) -> OpCodeDesc {
    OpCodeDesc {
        mnemonic,
        operand,
        flow,
        pops,
        pushes,
    }
}

const RESERVED: OpCodeDesc = op("", OperandKind::None, FlowType::Sequential, 0, 0);

/// A CIL opcode.
///
/// The packed value is the raw byte for one-byte opcodes and `0xFE00 | byte` for
/// `0xFE`-prefixed opcodes. Use the constants in this module to name opcodes; arbitrary
/// values go through [`OpCode::from_raw`], which rejects reserved encodings.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpCode(u16);

impl OpCode {
    /// Validate a packed opcode value, returning `None` for unknown or reserved encodings
    #[must_use]
    pub fn from_raw(value: u16) -> Option<OpCode> {
        let desc = match (value >> 8) as u8 {
            0x00 => INSTRUCTIONS.get((value & 0xFF) as usize),
            0xFE => INSTRUCTIONS_FE.get((value & 0xFF) as usize),
            _ => None,
        }?;
        if desc.mnemonic.is_empty() {
            return None;
        }
        Some(OpCode(value))
    }

    /// The packed opcode value
    #[must_use]
    pub fn value(self) -> u16 {
        self.0
    }

    /// Whether this is a `0xFE`-prefixed opcode
    #[must_use]
    pub fn is_prefixed(self) -> bool {
        self.0 >> 8 == 0xFE
    }

    pub(crate) fn desc(self) -> &'static OpCodeDesc {
        let table = if self.is_prefixed() {
            &INSTRUCTIONS_FE[..]
        } else {
            &INSTRUCTIONS[..]
        };
        &table[(self.0 & 0xFF) as usize]
    }

    /// Human-readable instruction mnemonic (e.g. "add", "ldloc.s", "ret")
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        self.desc().mnemonic
    }

    /// The operand shape this opcode expects
    #[must_use]
    pub fn operand_kind(self) -> OperandKind {
        self.desc().operand
    }

    /// How this opcode affects control flow
    #[must_use]
    pub fn flow_type(self) -> FlowType {
        self.desc().flow
    }

    /// The fixed stack effect, or `None` when it depends on an operand signature
    #[must_use]
    pub fn stack_behavior(self) -> Option<StackBehavior> {
        let desc = self.desc();
        if desc.pops == VAR || desc.pushes == VAR {
            return None;
        }
        #[allow(clippy::cast_possible_wrap)]
        let net_effect = desc.pushes as i8 - desc.pops as i8;
        Some(StackBehavior {
            pops: desc.pops,
            pushes: desc.pushes,
            net_effect,
        })
    }

    /// Whether this opcode is a prefix modifying the following instruction
    #[must_use]
    pub fn is_prefix(self) -> bool {
        matches!(
            self.mnemonic(),
            "tail." | "volatile." | "unaligned." | "constrained." | "readonly."
        )
    }
}

impl std::fmt::Debug for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpCode({}, 0x{:04X})", self.mnemonic(), self.0)
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

// ── One-byte opcodes ───────────────────────────────────────────────────────

/// `nop`
pub const NOP: OpCode = OpCode(0x00);
/// `break`
pub const BREAK: OpCode = OpCode(0x01);
/// `ldarg.0`
pub const LDARG_0: OpCode = OpCode(0x02);
/// `ldarg.1`
pub const LDARG_1: OpCode = OpCode(0x03);
/// `ldarg.2`
pub const LDARG_2: OpCode = OpCode(0x04);
/// `ldarg.3`
pub const LDARG_3: OpCode = OpCode(0x05);
/// `ldloc.0`
pub const LDLOC_0: OpCode = OpCode(0x06);
/// `ldloc.1`
pub const LDLOC_1: OpCode = OpCode(0x07);
/// `ldloc.2`
pub const LDLOC_2: OpCode = OpCode(0x08);
/// `ldloc.3`
pub const LDLOC_3: OpCode = OpCode(0x09);
/// `stloc.0`
pub const STLOC_0: OpCode = OpCode(0x0A);
/// `stloc.1`
pub const STLOC_1: OpCode = OpCode(0x0B);
/// `stloc.2`
pub const STLOC_2: OpCode = OpCode(0x0C);
/// `stloc.3`
pub const STLOC_3: OpCode = OpCode(0x0D);
/// `ldarg.s`
pub const LDARG_S: OpCode = OpCode(0x0E);
/// `ldarga.s`
pub const LDARGA_S: OpCode = OpCode(0x0F);
/// `starg.s`
pub const STARG_S: OpCode = OpCode(0x10);
/// `ldloc.s`
pub const LDLOC_S: OpCode = OpCode(0x11);
/// `ldloca.s`
pub const LDLOCA_S: OpCode = OpCode(0x12);
/// `stloc.s`
pub const STLOC_S: OpCode = OpCode(0x13);
/// `ldnull`
pub const LDNULL: OpCode = OpCode(0x14);
/// `ldc.i4.m1`
pub const LDC_I4_M1: OpCode = OpCode(0x15);
/// `ldc.i4.0`
pub const LDC_I4_0: OpCode = OpCode(0x16);
/// `ldc.i4.1`
pub const LDC_I4_1: OpCode = OpCode(0x17);
/// `ldc.i4.2`
pub const LDC_I4_2: OpCode = OpCode(0x18);
/// `ldc.i4.3`
pub const LDC_I4_3: OpCode = OpCode(0x19);
/// `ldc.i4.4`
pub const LDC_I4_4: OpCode = OpCode(0x1A);
/// `ldc.i4.5`
pub const LDC_I4_5: OpCode = OpCode(0x1B);
/// `ldc.i4.6`
pub const LDC_I4_6: OpCode = OpCode(0x1C);
/// `ldc.i4.7`
pub const LDC_I4_7: OpCode = OpCode(0x1D);
/// `ldc.i4.8`
pub const LDC_I4_8: OpCode = OpCode(0x1E);
/// `ldc.i4.s`
pub const LDC_I4_S: OpCode = OpCode(0x1F);
/// `ldc.i4`
pub const LDC_I4: OpCode = OpCode(0x20);
/// `ldc.i8`
pub const LDC_I8: OpCode = OpCode(0x21);
/// `ldc.r4`
pub const LDC_R4: OpCode = OpCode(0x22);
/// `ldc.r8`
pub const LDC_R8: OpCode = OpCode(0x23);
/// `dup`
pub const DUP: OpCode = OpCode(0x25);
/// `pop`
pub const POP: OpCode = OpCode(0x26);
/// `jmp`
pub const JMP: OpCode = OpCode(0x27);
/// `call`
pub const CALL: OpCode = OpCode(0x28);
/// `calli`
pub const CALLI: OpCode = OpCode(0x29);
/// `ret`
pub const RET: OpCode = OpCode(0x2A);
/// `br.s`
pub const BR_S: OpCode = OpCode(0x2B);
/// `brfalse.s`
pub const BRFALSE_S: OpCode = OpCode(0x2C);
/// `brtrue.s`
pub const BRTRUE_S: OpCode = OpCode(0x2D);
/// `beq.s`
pub const BEQ_S: OpCode = OpCode(0x2E);
/// `bge.s`
pub const BGE_S: OpCode = OpCode(0x2F);
/// `bgt.s`
pub const BGT_S: OpCode = OpCode(0x30);
/// `ble.s`
pub const BLE_S: OpCode = OpCode(0x31);
/// `blt.s`
pub const BLT_S: OpCode = OpCode(0x32);
/// `bne.un.s`
pub const BNE_UN_S: OpCode = OpCode(0x33);
/// `bge.un.s`
pub const BGE_UN_S: OpCode = OpCode(0x34);
/// `bgt.un.s`
pub const BGT_UN_S: OpCode = OpCode(0x35);
/// `ble.un.s`
pub const BLE_UN_S: OpCode = OpCode(0x36);
/// `blt.un.s`
pub const BLT_UN_S: OpCode = OpCode(0x37);
/// `br`
pub const BR: OpCode = OpCode(0x38);
/// `brfalse`
pub const BRFALSE: OpCode = OpCode(0x39);
/// `brtrue`
pub const BRTRUE: OpCode = OpCode(0x3A);
/// `beq`
pub const BEQ: OpCode = OpCode(0x3B);
/// `bge`
pub const BGE: OpCode = OpCode(0x3C);
/// `bgt`
pub const BGT: OpCode = OpCode(0x3D);
/// `ble`
pub const BLE: OpCode = OpCode(0x3E);
/// `blt`
pub const BLT: OpCode = OpCode(0x3F);
/// `bne.un`
pub const BNE_UN: OpCode = OpCode(0x40);
/// `bge.un`
pub const BGE_UN: OpCode = OpCode(0x41);
/// `bgt.un`
pub const BGT_UN: OpCode = OpCode(0x42);
/// `ble.un`
pub const BLE_UN: OpCode = OpCode(0x43);
/// `blt.un`
pub const BLT_UN: OpCode = OpCode(0x44);
/// `switch`
pub const SWITCH: OpCode = OpCode(0x45);
/// `ldind.i1`
pub const LDIND_I1: OpCode = OpCode(0x46);
/// `ldind.u1`
pub const LDIND_U1: OpCode = OpCode(0x47);
/// `ldind.i2`
pub const LDIND_I2: OpCode = OpCode(0x48);
/// `ldind.u2`
pub const LDIND_U2: OpCode = OpCode(0x49);
/// `ldind.i4`
pub const LDIND_I4: OpCode = OpCode(0x4A);
/// `ldind.u4`
pub const LDIND_U4: OpCode = OpCode(0x4B);
/// `ldind.i8`
pub const LDIND_I8: OpCode = OpCode(0x4C);
/// `ldind.i`
pub const LDIND_I: OpCode = OpCode(0x4D);
/// `ldind.r4`
pub const LDIND_R4: OpCode = OpCode(0x4E);
/// `ldind.r8`
pub const LDIND_R8: OpCode = OpCode(0x4F);
/// `ldind.ref`
pub const LDIND_REF: OpCode = OpCode(0x50);
/// `stind.ref`
pub const STIND_REF: OpCode = OpCode(0x51);
/// `stind.i1`
pub const STIND_I1: OpCode = OpCode(0x52);
/// `stind.i2`
pub const STIND_I2: OpCode = OpCode(0x53);
/// `stind.i4`
pub const STIND_I4: OpCode = OpCode(0x54);
/// `stind.i8`
pub const STIND_I8: OpCode = OpCode(0x55);
/// `stind.r4`
pub const STIND_R4: OpCode = OpCode(0x56);
/// `stind.r8`
pub const STIND_R8: OpCode = OpCode(0x57);
/// `add`
pub const ADD: OpCode = OpCode(0x58);
/// `sub`
pub const SUB: OpCode = OpCode(0x59);
/// `mul`
pub const MUL: OpCode = OpCode(0x5A);
/// `div`
pub const DIV: OpCode = OpCode(0x5B);
/// `div.un`
pub const DIV_UN: OpCode = OpCode(0x5C);
/// `rem`
pub const REM: OpCode = OpCode(0x5D);
/// `rem.un`
pub const REM_UN: OpCode = OpCode(0x5E);
/// `and`
pub const AND: OpCode = OpCode(0x5F);
/// `or`
pub const OR: OpCode = OpCode(0x60);
/// `xor`
pub const XOR: OpCode = OpCode(0x61);
/// `shl`
pub const SHL: OpCode = OpCode(0x62);
/// `shr`
pub const SHR: OpCode = OpCode(0x63);
/// `shr.un`
pub const SHR_UN: OpCode = OpCode(0x64);
/// `neg`
pub const NEG: OpCode = OpCode(0x65);
/// `not`
pub const NOT: OpCode = OpCode(0x66);
/// `conv.i1`
pub const CONV_I1: OpCode = OpCode(0x67);
/// `conv.i2`
pub const CONV_I2: OpCode = OpCode(0x68);
/// `conv.i4`
pub const CONV_I4: OpCode = OpCode(0x69);
/// `conv.i8`
pub const CONV_I8: OpCode = OpCode(0x6A);
/// `conv.r4`
pub const CONV_R4: OpCode = OpCode(0x6B);
/// `conv.r8`
pub const CONV_R8: OpCode = OpCode(0x6C);
/// `conv.u4`
pub const CONV_U4: OpCode = OpCode(0x6D);
/// `conv.u8`
pub const CONV_U8: OpCode = OpCode(0x6E);
/// `callvirt`
pub const CALLVIRT: OpCode = OpCode(0x6F);
/// `cpobj`
pub const CPOBJ: OpCode = OpCode(0x70);
/// `ldobj`
pub const LDOBJ: OpCode = OpCode(0x71);
/// `ldstr`
pub const LDSTR: OpCode = OpCode(0x72);
/// `newobj`
pub const NEWOBJ: OpCode = OpCode(0x73);
/// `castclass`
pub const CASTCLASS: OpCode = OpCode(0x74);
/// `isinst`
pub const ISINST: OpCode = OpCode(0x75);
/// `conv.r.un`
pub const CONV_R_UN: OpCode = OpCode(0x76);
/// `unbox`
pub const UNBOX: OpCode = OpCode(0x79);
/// `throw`
pub const THROW: OpCode = OpCode(0x7A);
/// `ldfld`
pub const LDFLD: OpCode = OpCode(0x7B);
/// `ldflda`
pub const LDFLDA: OpCode = OpCode(0x7C);
/// `stfld`
pub const STFLD: OpCode = OpCode(0x7D);
/// `ldsfld`
pub const LDSFLD: OpCode = OpCode(0x7E);
/// `ldsflda`
pub const LDSFLDA: OpCode = OpCode(0x7F);
/// `stsfld`
pub const STSFLD: OpCode = OpCode(0x80);
/// `stobj`
pub const STOBJ: OpCode = OpCode(0x81);
/// `conv.ovf.i1.un`
pub const CONV_OVF_I1_UN: OpCode = OpCode(0x82);
/// `conv.ovf.i2.un`
pub const CONV_OVF_I2_UN: OpCode = OpCode(0x83);
/// `conv.ovf.i4.un`
pub const CONV_OVF_I4_UN: OpCode = OpCode(0x84);
/// `conv.ovf.i8.un`
pub const CONV_OVF_I8_UN: OpCode = OpCode(0x85);
/// `conv.ovf.u1.un`
pub const CONV_OVF_U1_UN: OpCode = OpCode(0x86);
/// `conv.ovf.u2.un`
pub const CONV_OVF_U2_UN: OpCode = OpCode(0x87);
/// `conv.ovf.u4.un`
pub const CONV_OVF_U4_UN: OpCode = OpCode(0x88);
/// `conv.ovf.u8.un`
pub const CONV_OVF_U8_UN: OpCode = OpCode(0x89);
/// `conv.ovf.i.un`
pub const CONV_OVF_I_UN: OpCode = OpCode(0x8A);
/// `conv.ovf.u.un`
pub const CONV_OVF_U_UN: OpCode = OpCode(0x8B);
/// `box`
pub const BOX: OpCode = OpCode(0x8C);
/// `newarr`
pub const NEWARR: OpCode = OpCode(0x8D);
/// `ldlen`
pub const LDLEN: OpCode = OpCode(0x8E);
/// `ldelema`
pub const LDELEMA: OpCode = OpCode(0x8F);
/// `ldelem.i1`
pub const LDELEM_I1: OpCode = OpCode(0x90);
/// `ldelem.u1`
pub const LDELEM_U1: OpCode = OpCode(0x91);
/// `ldelem.i2`
pub const LDELEM_I2: OpCode = OpCode(0x92);
/// `ldelem.u2`
pub const LDELEM_U2: OpCode = OpCode(0x93);
/// `ldelem.i4`
pub const LDELEM_I4: OpCode = OpCode(0x94);
/// `ldelem.u4`
pub const LDELEM_U4: OpCode = OpCode(0x95);
/// `ldelem.i8`
pub const LDELEM_I8: OpCode = OpCode(0x96);
/// `ldelem.i`
pub const LDELEM_I: OpCode = OpCode(0x97);
/// `ldelem.r4`
pub const LDELEM_R4: OpCode = OpCode(0x98);
/// `ldelem.r8`
pub const LDELEM_R8: OpCode = OpCode(0x99);
/// `ldelem.ref`
pub const LDELEM_REF: OpCode = OpCode(0x9A);
/// `stelem.i`
pub const STELEM_I: OpCode = OpCode(0x9B);
/// `stelem.i1`
pub const STELEM_I1: OpCode = OpCode(0x9C);
/// `stelem.i2`
pub const STELEM_I2: OpCode = OpCode(0x9D);
/// `stelem.i4`
pub const STELEM_I4: OpCode = OpCode(0x9E);
/// `stelem.i8`
pub const STELEM_I8: OpCode = OpCode(0x9F);
/// `stelem.r4`
pub const STELEM_R4: OpCode = OpCode(0xA0);
/// `stelem.r8`
pub const STELEM_R8: OpCode = OpCode(0xA1);
/// `stelem.ref`
pub const STELEM_REF: OpCode = OpCode(0xA2);
/// `ldelem`
pub const LDELEM: OpCode = OpCode(0xA3);
/// `stelem`
pub const STELEM: OpCode = OpCode(0xA4);
/// `unbox.any`
pub const UNBOX_ANY: OpCode = OpCode(0xA5);
/// `conv.ovf.i1`
pub const CONV_OVF_I1: OpCode = OpCode(0xB3);
/// `conv.ovf.u1`
pub const CONV_OVF_U1: OpCode = OpCode(0xB4);
/// `conv.ovf.i2`
pub const CONV_OVF_I2: OpCode = OpCode(0xB5);
/// `conv.ovf.u2`
pub const CONV_OVF_U2: OpCode = OpCode(0xB6);
/// `conv.ovf.i4`
pub const CONV_OVF_I4: OpCode = OpCode(0xB7);
/// `conv.ovf.u4`
pub const CONV_OVF_U4: OpCode = OpCode(0xB8);
/// `conv.ovf.i8`
pub const CONV_OVF_I8: OpCode = OpCode(0xB9);
/// `conv.ovf.u8`
pub const CONV_OVF_U8: OpCode = OpCode(0xBA);
/// `refanyval`
pub const REFANYVAL: OpCode = OpCode(0xC2);
/// `ckfinite`
pub const CKFINITE: OpCode = OpCode(0xC3);
/// `mkrefany`
pub const MKREFANY: OpCode = OpCode(0xC6);
/// `ldtoken`
pub const LDTOKEN: OpCode = OpCode(0xD0);
/// `conv.u2`
pub const CONV_U2: OpCode = OpCode(0xD1);
/// `conv.u1`
pub const CONV_U1: OpCode = OpCode(0xD2);
/// `conv.i`
pub const CONV_I: OpCode = OpCode(0xD3);
/// `conv.ovf.i`
pub const CONV_OVF_I: OpCode = OpCode(0xD4);
/// `conv.ovf.u`
pub const CONV_OVF_U: OpCode = OpCode(0xD5);
/// `add.ovf`
pub const ADD_OVF: OpCode = OpCode(0xD6);
/// `add.ovf.un`
pub const ADD_OVF_UN: OpCode = OpCode(0xD7);
/// `mul.ovf`
pub const MUL_OVF: OpCode = OpCode(0xD8);
/// `mul.ovf.un`
pub const MUL_OVF_UN: OpCode = OpCode(0xD9);
/// `sub.ovf`
pub const SUB_OVF: OpCode = OpCode(0xDA);
/// `sub.ovf.un`
pub const SUB_OVF_UN: OpCode = OpCode(0xDB);
/// `endfinally`
pub const ENDFINALLY: OpCode = OpCode(0xDC);
/// `leave`
pub const LEAVE: OpCode = OpCode(0xDD);
/// `leave.s`
pub const LEAVE_S: OpCode = OpCode(0xDE);
/// `stind.i`
pub const STIND_I: OpCode = OpCode(0xDF);
/// `conv.u`
pub const CONV_U: OpCode = OpCode(0xE0);

// ── Two-byte opcodes (0xFE prefix) ─────────────────────────────────────────

/// `arglist`
pub const ARGLIST: OpCode = OpCode(0xFE00);
/// `ceq`
pub const CEQ: OpCode = OpCode(0xFE01);
/// `cgt`
pub const CGT: OpCode = OpCode(0xFE02);
/// `cgt.un`
pub const CGT_UN: OpCode = OpCode(0xFE03);
/// `clt`
pub const CLT: OpCode = OpCode(0xFE04);
/// `clt.un`
pub const CLT_UN: OpCode = OpCode(0xFE05);
/// `ldftn`
pub const LDFTN: OpCode = OpCode(0xFE06);
/// `ldvirtftn`
pub const LDVIRTFTN: OpCode = OpCode(0xFE07);
/// `ldarg`
pub const LDARG: OpCode = OpCode(0xFE09);
/// `ldarga`
pub const LDARGA: OpCode = OpCode(0xFE0A);
/// `starg`
pub const STARG: OpCode = OpCode(0xFE0B);
/// `ldloc`
pub const LDLOC: OpCode = OpCode(0xFE0C);
/// `ldloca`
pub const LDLOCA: OpCode = OpCode(0xFE0D);
/// `stloc`
pub const STLOC: OpCode = OpCode(0xFE0E);
/// `localloc`
pub const LOCALLOC: OpCode = OpCode(0xFE0F);
/// `endfilter`
pub const ENDFILTER: OpCode = OpCode(0xFE11);
/// `unaligned.`
pub const UNALIGNED: OpCode = OpCode(0xFE12);
/// `volatile.`
pub const VOLATILE: OpCode = OpCode(0xFE13);
/// `tail.`
pub const TAIL: OpCode = OpCode(0xFE14);
/// `initobj`
pub const INITOBJ: OpCode = OpCode(0xFE15);
/// `constrained.`
pub const CONSTRAINED: OpCode = OpCode(0xFE16);
/// `cpblk`
pub const CPBLK: OpCode = OpCode(0xFE17);
/// `initblk`
pub const INITBLK: OpCode = OpCode(0xFE18);
/// `rethrow`
pub const RETHROW: OpCode = OpCode(0xFE1A);
/// `sizeof`
pub const SIZEOF: OpCode = OpCode(0xFE1C);
/// `refanytype`
pub const REFANYTYPE: OpCode = OpCode(0xFE1D);
/// `readonly.`
pub const READONLY: OpCode = OpCode(0xFE1E);

#[rustfmt::skip]
pub(crate) static INSTRUCTIONS: [OpCodeDesc; 0xE1] = {
    use FlowType as F;
    use OperandKind as K;
    [
        /* 0x00 */ op("nop", K::None, F::Sequential, 0, 0),
        /* 0x01 */ op("break", K::None, F::Sequential, 0, 0),
        /* 0x02 */ op("ldarg.0", K::None, F::Sequential, 0, 1),
        /* 0x03 */ op("ldarg.1", K::None, F::Sequential, 0, 1),
        /* 0x04 */ op("ldarg.2", K::None, F::Sequential, 0, 1),
        /* 0x05 */ op("ldarg.3", K::None, F::Sequential, 0, 1),
        /* 0x06 */ op("ldloc.0", K::None, F::Sequential, 0, 1),
        /* 0x07 */ op("ldloc.1", K::None, F::Sequential, 0, 1),
        /* 0x08 */ op("ldloc.2", K::None, F::Sequential, 0, 1),
        /* 0x09 */ op("ldloc.3", K::None, F::Sequential, 0, 1),
        /* 0x0A */ op("stloc.0", K::None, F::Sequential, 1, 0),
        /* 0x0B */ op("stloc.1", K::None, F::Sequential, 1, 0),
        /* 0x0C */ op("stloc.2", K::None, F::Sequential, 1, 0),
        /* 0x0D */ op("stloc.3", K::None, F::Sequential, 1, 0),
        /* 0x0E */ op("ldarg.s", K::Argument, F::Sequential, 0, 1),
        /* 0x0F */ op("ldarga.s", K::Argument, F::Sequential, 0, 1),
        /* 0x10 */ op("starg.s", K::Argument, F::Sequential, 1, 0),
        /* 0x11 */ op("ldloc.s", K::Local, F::Sequential, 0, 1),
        /* 0x12 */ op("ldloca.s", K::Local, F::Sequential, 0, 1),
        /* 0x13 */ op("stloc.s", K::Local, F::Sequential, 1, 0),
        /* 0x14 */ op("ldnull", K::None, F::Sequential, 0, 1),
        /* 0x15 */ op("ldc.i4.m1", K::None, F::Sequential, 0, 1),
        /* 0x16 */ op("ldc.i4.0", K::None, F::Sequential, 0, 1),
        /* 0x17 */ op("ldc.i4.1", K::None, F::Sequential, 0, 1),
        /* 0x18 */ op("ldc.i4.2", K::None, F::Sequential, 0, 1),
        /* 0x19 */ op("ldc.i4.3", K::None, F::Sequential, 0, 1),
        /* 0x1A */ op("ldc.i4.4", K::None, F::Sequential, 0, 1),
        /* 0x1B */ op("ldc.i4.5", K::None, F::Sequential, 0, 1),
        /* 0x1C */ op("ldc.i4.6", K::None, F::Sequential, 0, 1),
        /* 0x1D */ op("ldc.i4.7", K::None, F::Sequential, 0, 1),
        /* 0x1E */ op("ldc.i4.8", K::None, F::Sequential, 0, 1),
        /* 0x1F */ op("ldc.i4.s", K::I4, F::Sequential, 0, 1),
        /* 0x20 */ op("ldc.i4", K::I4, F::Sequential, 0, 1),
        /* 0x21 */ op("ldc.i8", K::I8, F::Sequential, 0, 1),
        /* 0x22 */ op("ldc.r4", K::R4, F::Sequential, 0, 1),
        /* 0x23 */ op("ldc.r8", K::R8, F::Sequential, 0, 1),
        /* 0x24 */ RESERVED,
        /* 0x25 */ op("dup", K::None, F::Sequential, 1, 2),
        /* 0x26 */ op("pop", K::None, F::Sequential, 1, 0),
        /* 0x27 */ op("jmp", K::Member, F::Call, 0, 0),
        /* 0x28 */ op("call", K::Member, F::Call, VAR, VAR),
        /* 0x29 */ op("calli", K::Token, F::Call, VAR, VAR),
        /* 0x2A */ op("ret", K::None, F::Return, VAR, 0),
        /* 0x2B */ op("br.s", K::Target, F::UnconditionalBranch, 0, 0),
        /* 0x2C */ op("brfalse.s", K::Target, F::ConditionalBranch, 1, 0),
        /* 0x2D */ op("brtrue.s", K::Target, F::ConditionalBranch, 1, 0),
        /* 0x2E */ op("beq.s", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x2F */ op("bge.s", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x30 */ op("bgt.s", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x31 */ op("ble.s", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x32 */ op("blt.s", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x33 */ op("bne.un.s", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x34 */ op("bge.un.s", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x35 */ op("bgt.un.s", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x36 */ op("ble.un.s", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x37 */ op("blt.un.s", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x38 */ op("br", K::Target, F::UnconditionalBranch, 0, 0),
        /* 0x39 */ op("brfalse", K::Target, F::ConditionalBranch, 1, 0),
        /* 0x3A */ op("brtrue", K::Target, F::ConditionalBranch, 1, 0),
        /* 0x3B */ op("beq", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x3C */ op("bge", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x3D */ op("bgt", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x3E */ op("ble", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x3F */ op("blt", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x40 */ op("bne.un", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x41 */ op("bge.un", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x42 */ op("bgt.un", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x43 */ op("ble.un", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x44 */ op("blt.un", K::Target, F::ConditionalBranch, 2, 0),
        /* 0x45 */ op("switch", K::Switch, F::Switch, 1, 0),
        /* 0x46 */ op("ldind.i1", K::None, F::Sequential, 1, 1),
        /* 0x47 */ op("ldind.u1", K::None, F::Sequential, 1, 1),
        /* 0x48 */ op("ldind.i2", K::None, F::Sequential, 1, 1),
        /* 0x49 */ op("ldind.u2", K::None, F::Sequential, 1, 1),
        /* 0x4A */ op("ldind.i4", K::None, F::Sequential, 1, 1),
        /* 0x4B */ op("ldind.u4", K::None, F::Sequential, 1, 1),
        /* 0x4C */ op("ldind.i8", K::None, F::Sequential, 1, 1),
        /* 0x4D */ op("ldind.i", K::None, F::Sequential, 1, 1),
        /* 0x4E */ op("ldind.r4", K::None, F::Sequential, 1, 1),
        /* 0x4F */ op("ldind.r8", K::None, F::Sequential, 1, 1),
        /* 0x50 */ op("ldind.ref", K::None, F::Sequential, 1, 1),
        /* 0x51 */ op("stind.ref", K::None, F::Sequential, 2, 0),
        /* 0x52 */ op("stind.i1", K::None, F::Sequential, 2, 0),
        /* 0x53 */ op("stind.i2", K::None, F::Sequential, 2, 0),
        /* 0x54 */ op("stind.i4", K::None, F::Sequential, 2, 0),
        /* 0x55 */ op("stind.i8", K::None, F::Sequential, 2, 0),
        /* 0x56 */ op("stind.r4", K::None, F::Sequential, 2, 0),
        /* 0x57 */ op("stind.r8", K::None, F::Sequential, 2, 0),
        /* 0x58 */ op("add", K::None, F::Sequential, 2, 1),
        /* 0x59 */ op("sub", K::None, F::Sequential, 2, 1),
        /* 0x5A */ op("mul", K::None, F::Sequential, 2, 1),
        /* 0x5B */ op("div", K::None, F::Sequential, 2, 1),
        /* 0x5C */ op("div.un", K::None, F::Sequential, 2, 1),
        /* 0x5D */ op("rem", K::None, F::Sequential, 2, 1),
        /* 0x5E */ op("rem.un", K::None, F::Sequential, 2, 1),
        /* 0x5F */ op("and", K::None, F::Sequential, 2, 1),
        /* 0x60 */ op("or", K::None, F::Sequential, 2, 1),
        /* 0x61 */ op("xor", K::None, F::Sequential, 2, 1),
        /* 0x62 */ op("shl", K::None, F::Sequential, 2, 1),
        /* 0x63 */ op("shr", K::None, F::Sequential, 2, 1),
        /* 0x64 */ op("shr.un", K::None, F::Sequential, 2, 1),
        /* 0x65 */ op("neg", K::None, F::Sequential, 1, 1),
        /* 0x66 */ op("not", K::None, F::Sequential, 1, 1),
        /* 0x67 */ op("conv.i1", K::None, F::Sequential, 1, 1),
        /* 0x68 */ op("conv.i2", K::None, F::Sequential, 1, 1),
        /* 0x69 */ op("conv.i4", K::None, F::Sequential, 1, 1),
        /* 0x6A */ op("conv.i8", K::None, F::Sequential, 1, 1),
        /* 0x6B */ op("conv.r4", K::None, F::Sequential, 1, 1),
        /* 0x6C */ op("conv.r8", K::None, F::Sequential, 1, 1),
        /* 0x6D */ op("conv.u4", K::None, F::Sequential, 1, 1),
        /* 0x6E */ op("conv.u8", K::None, F::Sequential, 1, 1),
        /* 0x6F */ op("callvirt", K::Member, F::Call, VAR, VAR),
        /* 0x70 */ op("cpobj", K::Type, F::Sequential, 2, 0),
        /* 0x71 */ op("ldobj", K::Type, F::Sequential, 1, 1),
        /* 0x72 */ op("ldstr", K::String, F::Sequential, 0, 1),
        /* 0x73 */ op("newobj", K::Member, F::Call, VAR, 1),
        /* 0x74 */ op("castclass", K::Type, F::Sequential, 1, 1),
        /* 0x75 */ op("isinst", K::Type, F::Sequential, 1, 1),
        /* 0x76 */ op("conv.r.un", K::None, F::Sequential, 1, 1),
        /* 0x77 */ RESERVED,
        /* 0x78 */ RESERVED,
        /* 0x79 */ op("unbox", K::Type, F::Sequential, 1, 1),
        /* 0x7A */ op("throw", K::None, F::Throw, 1, 0),
        /* 0x7B */ op("ldfld", K::Member, F::Sequential, 1, 1),
        /* 0x7C */ op("ldflda", K::Member, F::Sequential, 1, 1),
        /* 0x7D */ op("stfld", K::Member, F::Sequential, 2, 0),
        /* 0x7E */ op("ldsfld", K::Member, F::Sequential, 0, 1),
        /* 0x7F */ op("ldsflda", K::Member, F::Sequential, 0, 1),
        /* 0x80 */ op("stsfld", K::Member, F::Sequential, 1, 0),
        /* 0x81 */ op("stobj", K::Type, F::Sequential, 2, 0),
        /* 0x82 */ op("conv.ovf.i1.un", K::None, F::Sequential, 1, 1),
        /* 0x83 */ op("conv.ovf.i2.un", K::None, F::Sequential, 1, 1),
        /* 0x84 */ op("conv.ovf.i4.un", K::None, F::Sequential, 1, 1),
        /* 0x85 */ op("conv.ovf.i8.un", K::None, F::Sequential, 1, 1),
        /* 0x86 */ op("conv.ovf.u1.un", K::None, F::Sequential, 1, 1),
        /* 0x87 */ op("conv.ovf.u2.un", K::None, F::Sequential, 1, 1),
        /* 0x88 */ op("conv.ovf.u4.un", K::None, F::Sequential, 1, 1),
        /* 0x89 */ op("conv.ovf.u8.un", K::None, F::Sequential, 1, 1),
        /* 0x8A */ op("conv.ovf.i.un", K::None, F::Sequential, 1, 1),
        /* 0x8B */ op("conv.ovf.u.un", K::None, F::Sequential, 1, 1),
        /* 0x8C */ op("box", K::Type, F::Sequential, 1, 1),
        /* 0x8D */ op("newarr", K::Type, F::Sequential, 1, 1),
        /* 0x8E */ op("ldlen", K::None, F::Sequential, 1, 1),
        /* 0x8F */ op("ldelema", K::Type, F::Sequential, 2, 1),
        /* 0x90 */ op("ldelem.i1", K::None, F::Sequential, 2, 1),
        /* 0x91 */ op("ldelem.u1", K::None, F::Sequential, 2, 1),
        /* 0x92 */ op("ldelem.i2", K::None, F::Sequential, 2, 1),
        /* 0x93 */ op("ldelem.u2", K::None, F::Sequential, 2, 1),
        /* 0x94 */ op("ldelem.i4", K::None, F::Sequential, 2, 1),
        /* 0x95 */ op("ldelem.u4", K::None, F::Sequential, 2, 1),
        /* 0x96 */ op("ldelem.i8", K::None, F::Sequential, 2, 1),
        /* 0x97 */ op("ldelem.i", K::None, F::Sequential, 2, 1),
        /* 0x98 */ op("ldelem.r4", K::None, F::Sequential, 2, 1),
        /* 0x99 */ op("ldelem.r8", K::None, F::Sequential, 2, 1),
        /* 0x9A */ op("ldelem.ref", K::None, F::Sequential, 2, 1),
        /* 0x9B */ op("stelem.i", K::None, F::Sequential, 3, 0),
        /* 0x9C */ op("stelem.i1", K::None, F::Sequential, 3, 0),
        /* 0x9D */ op("stelem.i2", K::None, F::Sequential, 3, 0),
        /* 0x9E */ op("stelem.i4", K::None, F::Sequential, 3, 0),
        /* 0x9F */ op("stelem.i8", K::None, F::Sequential, 3, 0),
        /* 0xA0 */ op("stelem.r4", K::None, F::Sequential, 3, 0),
        /* 0xA1 */ op("stelem.r8", K::None, F::Sequential, 3, 0),
        /* 0xA2 */ op("stelem.ref", K::None, F::Sequential, 3, 0),
        /* 0xA3 */ op("ldelem", K::Type, F::Sequential, 2, 1),
        /* 0xA4 */ op("stelem", K::Type, F::Sequential, 3, 0),
        /* 0xA5 */ op("unbox.any", K::Type, F::Sequential, 1, 1),
        /* 0xA6 */ RESERVED,
        /* 0xA7 */ RESERVED,
        /* 0xA8 */ RESERVED,
        /* 0xA9 */ RESERVED,
        /* 0xAA */ RESERVED,
        /* 0xAB */ RESERVED,
        /* 0xAC */ RESERVED,
        /* 0xAD */ RESERVED,
        /* 0xAE */ RESERVED,
        /* 0xAF */ RESERVED,
        /* 0xB0 */ RESERVED,
        /* 0xB1 */ RESERVED,
        /* 0xB2 */ RESERVED,
        /* 0xB3 */ op("conv.ovf.i1", K::None, F::Sequential, 1, 1),
        /* 0xB4 */ op("conv.ovf.u1", K::None, F::Sequential, 1, 1),
        /* 0xB5 */ op("conv.ovf.i2", K::None, F::Sequential, 1, 1),
        /* 0xB6 */ op("conv.ovf.u2", K::None, F::Sequential, 1, 1),
        /* 0xB7 */ op("conv.ovf.i4", K::None, F::Sequential, 1, 1),
        /* 0xB8 */ op("conv.ovf.u4", K::None, F::Sequential, 1, 1),
        /* 0xB9 */ op("conv.ovf.i8", K::None, F::Sequential, 1, 1),
        /* 0xBA */ op("conv.ovf.u8", K::None, F::Sequential, 1, 1),
        /* 0xBB */ RESERVED,
        /* 0xBC */ RESERVED,
        /* 0xBD */ RESERVED,
        /* 0xBE */ RESERVED,
        /* 0xBF */ RESERVED,
        /* 0xC0 */ RESERVED,
        /* 0xC1 */ RESERVED,
        /* 0xC2 */ op("refanyval", K::Type, F::Sequential, 1, 1),
        /* 0xC3 */ op("ckfinite", K::None, F::Sequential, 1, 1),
        /* 0xC4 */ RESERVED,
        /* 0xC5 */ RESERVED,
        /* 0xC6 */ op("mkrefany", K::Type, F::Sequential, 1, 1),
        /* 0xC7 */ RESERVED,
        /* 0xC8 */ RESERVED,
        /* 0xC9 */ RESERVED,
        /* 0xCA */ RESERVED,
        /* 0xCB */ RESERVED,
        /* 0xCC */ RESERVED,
        /* 0xCD */ RESERVED,
        /* 0xCE */ RESERVED,
        /* 0xCF */ RESERVED,
        /* 0xD0 */ op("ldtoken", K::Token, F::Sequential, 0, 1),
        /* 0xD1 */ op("conv.u2", K::None, F::Sequential, 1, 1),
        /* 0xD2 */ op("conv.u1", K::None, F::Sequential, 1, 1),
        /* 0xD3 */ op("conv.i", K::None, F::Sequential, 1, 1),
        /* 0xD4 */ op("conv.ovf.i", K::None, F::Sequential, 1, 1),
        /* 0xD5 */ op("conv.ovf.u", K::None, F::Sequential, 1, 1),
        /* 0xD6 */ op("add.ovf", K::None, F::Sequential, 2, 1),
        /* 0xD7 */ op("add.ovf.un", K::None, F::Sequential, 2, 1),
        /* 0xD8 */ op("mul.ovf", K::None, F::Sequential, 2, 1),
        /* 0xD9 */ op("mul.ovf.un", K::None, F::Sequential, 2, 1),
        /* 0xDA */ op("sub.ovf", K::None, F::Sequential, 2, 1),
        /* 0xDB */ op("sub.ovf.un", K::None, F::Sequential, 2, 1),
        /* 0xDC */ op("endfinally", K::None, F::EndFinally, 0, 0),
        /* 0xDD */ op("leave", K::Target, F::Leave, 0, 0),
        /* 0xDE */ op("leave.s", K::Target, F::Leave, 0, 0),
        /* 0xDF */ op("stind.i", K::None, F::Sequential, 2, 0),
        /* 0xE0 */ op("conv.u", K::None, F::Sequential, 1, 1),
    ]
};

#[rustfmt::skip]
pub(crate) static INSTRUCTIONS_FE: [OpCodeDesc; 0x1F] = {
    use FlowType as F;
    use OperandKind as K;
    [
        /* 0x00 */ op("arglist", K::None, F::Sequential, 0, 1),
        /* 0x01 */ op("ceq", K::None, F::Sequential, 2, 1),
        /* 0x02 */ op("cgt", K::None, F::Sequential, 2, 1),
        /* 0x03 */ op("cgt.un", K::None, F::Sequential, 2, 1),
        /* 0x04 */ op("clt", K::None, F::Sequential, 2, 1),
        /* 0x05 */ op("clt.un", K::None, F::Sequential, 2, 1),
        /* 0x06 */ op("ldftn", K::Member, F::Sequential, 0, 1),
        /* 0x07 */ op("ldvirtftn", K::Member, F::Sequential, 1, 1),
        /* 0x08 */ RESERVED,
        /* 0x09 */ op("ldarg", K::Argument, F::Sequential, 0, 1),
        /* 0x0A */ op("ldarga", K::Argument, F::Sequential, 0, 1),
        /* 0x0B */ op("starg", K::Argument, F::Sequential, 1, 0),
        /* 0x0C */ op("ldloc", K::Local, F::Sequential, 0, 1),
        /* 0x0D */ op("ldloca", K::Local, F::Sequential, 0, 1),
        /* 0x0E */ op("stloc", K::Local, F::Sequential, 1, 0),
        /* 0x0F */ op("localloc", K::None, F::Sequential, 1, 1),
        /* 0x10 */ RESERVED,
        /* 0x11 */ op("endfilter", K::None, F::EndFinally, 1, 0),
        /* 0x12 */ op("unaligned.", K::I4, F::Sequential, 0, 0),
        /* 0x13 */ op("volatile.", K::None, F::Sequential, 0, 0),
        /* 0x14 */ op("tail.", K::None, F::Sequential, 0, 0),
        /* 0x15 */ op("initobj", K::Type, F::Sequential, 1, 0),
        /* 0x16 */ op("constrained.", K::Type, F::Sequential, 0, 0),
        /* 0x17 */ op("cpblk", K::None, F::Sequential, 3, 0),
        /* 0x18 */ op("initblk", K::None, F::Sequential, 3, 0),
        /* 0x19 */ RESERVED,
        /* 0x1A */ op("rethrow", K::None, F::Throw, 0, 0),
        /* 0x1B */ RESERVED,
        /* 0x1C */ op("sizeof", K::Type, F::Sequential, 0, 1),
        /* 0x1D */ op("refanytype", K::None, F::Sequential, 1, 1),
        /* 0x1E */ op("readonly.", K::None, F::Sequential, 0, 0),
    ]
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::instruction::FlowType;

    #[test]
    fn test_from_raw_rejects_reserved() {
        assert!(OpCode::from_raw(0x24).is_none());
        assert!(OpCode::from_raw(0xFE08).is_none());
        assert!(OpCode::from_raw(0x1234).is_none());
        assert_eq!(OpCode::from_raw(0x2A), Some(RET));
        assert_eq!(OpCode::from_raw(0xFE01), Some(CEQ));
    }

    #[test]
    fn test_descriptor_lookup() {
        assert_eq!(RET.mnemonic(), "ret");
        assert_eq!(RET.flow_type(), FlowType::Return);
        assert_eq!(BR_S.mnemonic(), "br.s");
        assert_eq!(BR_S.operand_kind(), OperandKind::Target);
        assert_eq!(CEQ.mnemonic(), "ceq");
        assert!(CEQ.is_prefixed());
        assert!(!RET.is_prefixed());
    }

    #[test]
    fn test_stack_behavior_fixed_vs_variable() {
        let add = ADD.stack_behavior().unwrap();
        assert_eq!(add.pops, 2);
        assert_eq!(add.pushes, 1);
        assert_eq!(add.net_effect, -1);

        // Effect of calls and returns depends on the signature
        assert!(CALL.stack_behavior().is_none());
        assert!(NEWOBJ.stack_behavior().is_none());
        assert!(RET.stack_behavior().is_none());
    }

    #[test]
    fn test_prefix_detection() {
        assert!(VOLATILE.is_prefix());
        assert!(CONSTRAINED.is_prefix());
        assert!(!LDC_I4_S.is_prefix());
        assert!(!NOP.is_prefix());
    }

    #[test]
    fn test_table_positions_match_encoding() {
        // Spot checks that the table layout matches the ECMA encoding
        assert_eq!(SWITCH.value(), 0x45);
        assert_eq!(SWITCH.mnemonic(), "switch");
        assert_eq!(LEAVE_S.mnemonic(), "leave.s");
        assert_eq!(ENDFINALLY.flow_type(), FlowType::EndFinally);
        assert_eq!(LDSTR.operand_kind(), OperandKind::String);
        assert_eq!(STLOC.value(), 0xFE0E);
    }
}
