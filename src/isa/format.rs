//! 四种指令格式（R / I / S / U）的字段视图
//!
//! 每种格式一个结构体，`From<u32>` 负责按该格式切分指令字，
//! 立即数在这里完成符号扩展。

use std::fmt;

use super::fields;

/// 指令格式标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrFormat {
    R,
    I,
    S,
    U,
}

impl fmt::Display for InstrFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrFormat::R => "R",
            InstrFormat::I => "I",
            InstrFormat::S => "S",
            InstrFormat::U => "U",
        };
        write!(f, "{}-type", name)
    }
}

/// R-type：寄存器-寄存器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RType {
    pub opcode: u8,
    pub rd: u8,
    pub funct3: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub funct7: u8,
}

/// I-type：寄存器-立即数 / load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IType {
    pub opcode: u8,
    pub rd: u8,
    pub funct3: u8,
    pub rs1: u8,
    /// 12 位立即数，已符号扩展
    pub imm: i32,
}

/// S-type：store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SType {
    pub opcode: u8,
    pub funct3: u8,
    pub rs1: u8,
    pub rs2: u8,
    /// 由 imm[11:5] 与 imm[4:0] 拼接后符号扩展
    pub imm: i32,
}

/// U-type：高位立即数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UType {
    pub opcode: u8,
    pub rd: u8,
    /// 指令字 [31:12]，有符号 20 位
    pub imm: i32,
}

impl From<u32> for RType {
    fn from(raw: u32) -> Self {
        RType {
            opcode: fields::opcode(raw),
            rd: fields::rd(raw),
            funct3: fields::funct3(raw),
            rs1: fields::rs1(raw),
            rs2: fields::rs2(raw),
            funct7: fields::funct7(raw),
        }
    }
}

impl From<u32> for IType {
    fn from(raw: u32) -> Self {
        IType {
            opcode: fields::opcode(raw),
            rd: fields::rd(raw),
            funct3: fields::funct3(raw),
            rs1: fields::rs1(raw),
            imm: fields::imm_i(raw),
        }
    }
}

impl From<u32> for SType {
    fn from(raw: u32) -> Self {
        SType {
            opcode: fields::opcode(raw),
            funct3: fields::funct3(raw),
            rs1: fields::rs1(raw),
            rs2: fields::rs2(raw),
            imm: fields::imm_s(raw),
        }
    }
}

impl From<u32> for UType {
    fn from(raw: u32) -> Self {
        UType {
            opcode: fields::opcode(raw),
            rd: fields::rd(raw),
            imm: fields::imm_u(raw),
        }
    }
}

impl UType {
    /// 立即数放回 [31:12]，低 12 位为 0
    pub fn upper(&self) -> u32 {
        (self.imm as u32) << 12
    }
}
