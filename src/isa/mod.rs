//! RISC-V ISA 抽象与解码
//!
//! - `RvInstr`: 指令的语义表示，每个助记符一个变体
//! - `RType` / `IType` / `SType` / `UType`: 四种格式的字段视图
//! - `InstrDef`: mask/match 规则，同时用于解码和冲突检测
//! - `InstrDecoder` / `DecoderRegistry`: 解码器及其注册表

mod decoder;
mod fields;
mod format;
mod instr;
mod instr_def;
mod rv32i;

pub use decoder::{DecoderRegistry, InstrDecoder};
pub use fields::*;
pub use format::{IType, InstrFormat, RType, SType, UType};
pub use instr::{DecodedInstr, RvInstr};
pub use instr_def::{find_conflicts, ConflictInfo, InstrDef, TableDrivenDecoder};
pub use rv32i::{RV32I_DECODER, RV32I_INSTRS, RV32I_OPCODES};

/// 便捷函数：直接用 RV32I 子集表解码指令
pub fn decode(raw: u32) -> DecodedInstr {
    RV32I_DECODER
        .decode(raw)
        .unwrap_or_else(|| DecodedInstr::illegal(raw))
}
