//! 指令定义结构
//!
//! 统一的指令定义，同时用于解码和冲突检测

use std::fmt;

use super::decoder::InstrDecoder;
use super::format::InstrFormat;
use super::instr::{DecodedInstr, RvInstr};

/// 指令定义
///
/// 一处定义，两处使用：
/// - 解码：通过 mask/match 匹配后调用 decode 函数
/// - 冲突检测：通过 mask/match 判断两条指令是否可能冲突
#[derive(Clone)]
pub struct InstrDef {
    /// 指令名称（用于调试和冲突报告）
    pub name: &'static str,
    /// 指令格式
    pub format: InstrFormat,
    /// 匹配掩码：哪些位需要检查
    pub mask: u32,
    /// 匹配值：这些位应该是什么
    pub match_val: u32,
    /// 解码函数：按格式提取字段并构造 RvInstr
    pub decode: fn(u32) -> RvInstr,
}

impl InstrDef {
    pub const fn new(
        name: &'static str,
        format: InstrFormat,
        mask: u32,
        match_val: u32,
        decode: fn(u32) -> RvInstr,
    ) -> Self {
        Self {
            name,
            format,
            mask,
            match_val,
            decode,
        }
    }

    /// 检查指令是否匹配此定义
    #[inline]
    pub fn matches(&self, raw: u32) -> bool {
        (raw & self.mask) == self.match_val
    }

    /// 解码指令，调用方需先确认 `matches`
    #[inline]
    pub fn decode_instr(&self, raw: u32) -> DecodedInstr {
        DecodedInstr {
            raw,
            instr: (self.decode)(raw),
        }
    }

    /// 检查两个指令定义是否冲突
    ///
    /// 两个定义冲突当且仅当存在某个指令字同时匹配两者
    pub fn conflicts_with(&self, other: &InstrDef) -> bool {
        let common_mask = self.mask & other.mask;
        (self.match_val & common_mask) == (other.match_val & common_mask)
    }
}

impl fmt::Debug for InstrDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrDef")
            .field("name", &self.name)
            .field("format", &self.format)
            .field("mask", &format_args!("0x{:08X}", self.mask))
            .field("match_val", &format_args!("0x{:08X}", self.match_val))
            .finish()
    }
}

/// 冲突信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictInfo {
    pub first: &'static str,
    pub second: &'static str,
    /// 同时匹配两者的示例指令编码
    pub example_raw: u32,
}

impl fmt::Display for ConflictInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} 与 {} 冲突 (示例: 0x{:08X})",
            self.first, self.second, self.example_raw
        )
    }
}

/// 两两检查一组定义，返回所有冲突对
pub fn find_conflicts<'a, I>(defs: I) -> Vec<ConflictInfo>
where
    I: IntoIterator<Item = &'a InstrDef>,
{
    let defs: Vec<&InstrDef> = defs.into_iter().collect();
    let mut conflicts = Vec::new();

    for (i, a) in defs.iter().enumerate() {
        for b in defs.iter().skip(i + 1) {
            if a.conflicts_with(b) {
                conflicts.push(ConflictInfo {
                    first: a.name,
                    second: b.name,
                    example_raw: (a.match_val & a.mask) | (b.match_val & b.mask),
                });
            }
        }
    }

    conflicts
}

// ========== 类型掩码常量 ==========

/// R-type 指令的 mask（检查 opcode + funct3 + funct7）
pub const R_TYPE_MASK: u32 = 0xFE00707F;

/// I-type / S-type 指令的 mask（检查 opcode + funct3）
pub const FUNCT3_MASK: u32 = 0x707F;

/// U-type 指令的 mask（只检查 opcode）
pub const U_TYPE_MASK: u32 = 0x7F;

/// RV32 shift-imm 指令的 mask：imm[11:5] 与 funct7 同位，shamt[5] 必须为 0
pub const SHIFT_IMM_MASK: u32 = 0xFE00707F;

// ========== 辅助函数：构造 match 值 ==========

/// 构造带 funct7 的 match 值（R-type 与 shift-imm 共用）
#[inline]
pub const fn r_match(funct7: u32, funct3: u32, opcode: u8) -> u32 {
    (funct7 << 25) | (funct3 << 12) | opcode as u32
}

/// 构造 opcode + funct3 的 match 值
#[inline]
pub const fn i_match(funct3: u32, opcode: u8) -> u32 {
    (funct3 << 12) | opcode as u32
}

// ========== 表驱动解码器 ==========

/// 表驱动解码器
///
/// 按表顺序逐条匹配，首个命中即返回。
#[derive(Clone, Copy)]
pub struct TableDrivenDecoder {
    name: &'static str,
    instrs: &'static [InstrDef],
    opcodes: &'static [u8],
}

impl TableDrivenDecoder {
    pub const fn new(
        name: &'static str,
        instrs: &'static [InstrDef],
        opcodes: &'static [u8],
    ) -> Self {
        Self { name, instrs, opcodes }
    }
}

impl InstrDecoder for TableDrivenDecoder {
    fn name(&self) -> &str {
        self.name
    }

    fn decode(&self, raw: u32) -> Option<DecodedInstr> {
        self.instrs
            .iter()
            .find(|def| def.matches(raw))
            .map(|def| def.decode_instr(raw))
    }

    fn instrs(&self) -> &[InstrDef] {
        self.instrs
    }

    fn handled_opcodes(&self) -> &[u8] {
        self.opcodes
    }
}
