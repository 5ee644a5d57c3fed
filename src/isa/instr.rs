//! 定义指令的语义表达式，用于解码和执行阶段

use std::fmt;

use super::format::{IType, InstrFormat, RType, SType, UType};

/// 已支持的 RV32I 子集指令
///
/// 每个变体对应一个助记符，携带该助记符所属格式的字段。
/// 解码阶段一次性完成字段提取与符号扩展，执行阶段只做语义。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RvInstr {
    // ========== R-type 算术/逻辑指令 ==========
    /// ADD: rd = rs1 + rs2
    Add(RType),
    /// SUB: rd = rs1 - rs2
    Sub(RType),
    /// SLL: rd = rs1 << rs2[4:0]
    Sll(RType),
    /// SLT: rd = (rs1 < rs2) ? 1 : 0 (有符号比较)
    Slt(RType),
    /// SLTU: rd = (rs1 < rs2) ? 1 : 0 (无符号比较)
    Sltu(RType),
    /// XOR: rd = rs1 ^ rs2
    Xor(RType),
    /// SRL: rd = rs1 >> rs2[4:0] (逻辑右移)
    Srl(RType),
    /// SRA: rd = rs1 >> rs2[4:0] (算术右移)
    Sra(RType),
    /// OR: rd = rs1 | rs2
    Or(RType),
    /// AND: rd = rs1 & rs2
    And(RType),

    // ========== I-type 立即数算术/逻辑指令 ==========
    /// ADDI: rd = rs1 + imm
    Addi(IType),
    /// SLTI: rd = (rs1 < imm) ? 1 : 0 (有符号比较)
    Slti(IType),
    /// SLTIU: rd = (rs1 < imm) ? 1 : 0 (无符号比较)
    Sltiu(IType),
    /// XORI: rd = rs1 ^ imm
    Xori(IType),
    /// ORI: rd = rs1 | imm
    Ori(IType),
    /// ANDI: rd = rs1 & imm
    Andi(IType),
    /// SLLI: rd = rs1 << imm[4:0]
    Slli(IType),
    /// SRLI: rd = rs1 >> imm[4:0] (逻辑右移)
    Srli(IType),
    /// SRAI: rd = rs1 >> imm[4:0] (算术右移)
    Srai(IType),

    // ========== Load 指令 ==========
    /// LB: rd = sign_extend(mem8[rs1 + imm])
    Lb(IType),
    /// LH: rd = sign_extend(mem16[rs1 + imm])
    Lh(IType),
    /// LW: rd = mem32[rs1 + imm]
    Lw(IType),
    /// LBU: rd = zero_extend(mem8[rs1 + imm])
    Lbu(IType),
    /// LHU: rd = zero_extend(mem16[rs1 + imm])
    Lhu(IType),

    // ========== Store 指令 ==========
    /// SB: mem8[rs1 + imm] = rs2[7:0]
    Sb(SType),
    /// SH: mem16[rs1 + imm] = rs2[15:0]
    Sh(SType),
    /// SW: mem32[rs1 + imm] = rs2
    Sw(SType),

    // ========== U-type 指令 ==========
    /// LUI: rd = imm << 12
    Lui(UType),
    /// AUIPC: rd = pc + (imm << 12)
    Auipc(UType),

    /// 非法指令
    Illegal { raw: u32 },
}

impl RvInstr {
    /// 助记符（大写），非法指令返回 "ILLEGAL"
    pub fn name(&self) -> &'static str {
        match self {
            RvInstr::Add(_) => "ADD",
            RvInstr::Sub(_) => "SUB",
            RvInstr::Sll(_) => "SLL",
            RvInstr::Slt(_) => "SLT",
            RvInstr::Sltu(_) => "SLTU",
            RvInstr::Xor(_) => "XOR",
            RvInstr::Srl(_) => "SRL",
            RvInstr::Sra(_) => "SRA",
            RvInstr::Or(_) => "OR",
            RvInstr::And(_) => "AND",
            RvInstr::Addi(_) => "ADDI",
            RvInstr::Slti(_) => "SLTI",
            RvInstr::Sltiu(_) => "SLTIU",
            RvInstr::Xori(_) => "XORI",
            RvInstr::Ori(_) => "ORI",
            RvInstr::Andi(_) => "ANDI",
            RvInstr::Slli(_) => "SLLI",
            RvInstr::Srli(_) => "SRLI",
            RvInstr::Srai(_) => "SRAI",
            RvInstr::Lb(_) => "LB",
            RvInstr::Lh(_) => "LH",
            RvInstr::Lw(_) => "LW",
            RvInstr::Lbu(_) => "LBU",
            RvInstr::Lhu(_) => "LHU",
            RvInstr::Sb(_) => "SB",
            RvInstr::Sh(_) => "SH",
            RvInstr::Sw(_) => "SW",
            RvInstr::Lui(_) => "LUI",
            RvInstr::Auipc(_) => "AUIPC",
            RvInstr::Illegal { .. } => "ILLEGAL",
        }
    }

    /// 指令格式，非法指令没有格式
    pub fn format(&self) -> Option<InstrFormat> {
        match self {
            RvInstr::Add(_)
            | RvInstr::Sub(_)
            | RvInstr::Sll(_)
            | RvInstr::Slt(_)
            | RvInstr::Sltu(_)
            | RvInstr::Xor(_)
            | RvInstr::Srl(_)
            | RvInstr::Sra(_)
            | RvInstr::Or(_)
            | RvInstr::And(_) => Some(InstrFormat::R),
            RvInstr::Addi(_)
            | RvInstr::Slti(_)
            | RvInstr::Sltiu(_)
            | RvInstr::Xori(_)
            | RvInstr::Ori(_)
            | RvInstr::Andi(_)
            | RvInstr::Slli(_)
            | RvInstr::Srli(_)
            | RvInstr::Srai(_)
            | RvInstr::Lb(_)
            | RvInstr::Lh(_)
            | RvInstr::Lw(_)
            | RvInstr::Lbu(_)
            | RvInstr::Lhu(_) => Some(InstrFormat::I),
            RvInstr::Sb(_) | RvInstr::Sh(_) | RvInstr::Sw(_) => Some(InstrFormat::S),
            RvInstr::Lui(_) | RvInstr::Auipc(_) => Some(InstrFormat::U),
            RvInstr::Illegal { .. } => None,
        }
    }

    pub fn is_illegal(&self) -> bool {
        matches!(self, RvInstr::Illegal { .. })
    }
}

impl fmt::Display for RvInstr {
    /// 类汇编形式，便于 trace 日志阅读
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name().to_ascii_lowercase();
        match self {
            RvInstr::Add(r)
            | RvInstr::Sub(r)
            | RvInstr::Sll(r)
            | RvInstr::Slt(r)
            | RvInstr::Sltu(r)
            | RvInstr::Xor(r)
            | RvInstr::Srl(r)
            | RvInstr::Sra(r)
            | RvInstr::Or(r)
            | RvInstr::And(r) => write!(f, "{} x{}, x{}, x{}", name, r.rd, r.rs1, r.rs2),
            RvInstr::Lb(i) | RvInstr::Lh(i) | RvInstr::Lw(i) | RvInstr::Lbu(i) | RvInstr::Lhu(i) => {
                write!(f, "{} x{}, {}(x{})", name, i.rd, i.imm, i.rs1)
            }
            RvInstr::Slli(i) | RvInstr::Srli(i) | RvInstr::Srai(i) => {
                write!(f, "{} x{}, x{}, {}", name, i.rd, i.rs1, i.imm & 0x1F)
            }
            RvInstr::Addi(i)
            | RvInstr::Slti(i)
            | RvInstr::Sltiu(i)
            | RvInstr::Xori(i)
            | RvInstr::Ori(i)
            | RvInstr::Andi(i) => write!(f, "{} x{}, x{}, {}", name, i.rd, i.rs1, i.imm),
            RvInstr::Sb(s) | RvInstr::Sh(s) | RvInstr::Sw(s) => {
                write!(f, "{} x{}, {}(x{})", name, s.rs2, s.imm, s.rs1)
            }
            RvInstr::Lui(u) | RvInstr::Auipc(u) => {
                write!(f, "{} x{}, 0x{:05x}", name, u.rd, (u.imm as u32) & 0xF_FFFF)
            }
            RvInstr::Illegal { raw } => write!(f, "illegal 0x{:08x}", raw),
        }
    }
}

/// 已解码的指令
///
/// 包含原始编码与解码后的语义信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstr {
    /// 原始 32-bit 指令编码
    pub raw: u32,
    /// 解码后的语义表示
    pub instr: RvInstr,
}

impl DecodedInstr {
    pub fn illegal(raw: u32) -> Self {
        DecodedInstr {
            raw,
            instr: RvInstr::Illegal { raw },
        }
    }
}

impl fmt::Display for DecodedInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.instr, f)
    }
}
