//! RV32I 整数子集解码表
//!
//! 覆盖 U-type、load、store、立即数运算与寄存器运算，
//! 不含分支、跳转、FENCE 与系统指令。

use crate::isa::fields::*;
use crate::isa::format::{IType, InstrFormat, RType, SType, UType};
use crate::isa::instr::RvInstr;
use crate::isa::instr_def::{
    i_match, r_match, InstrDef, TableDrivenDecoder, FUNCT3_MASK, R_TYPE_MASK, SHIFT_IMM_MASK,
    U_TYPE_MASK,
};

use InstrFormat::{I, R, S, U};

/// RV32I 子集指令定义表
pub static RV32I_INSTRS: &[InstrDef] = &[
    // ========== U-type ==========
    InstrDef::new("LUI", U, U_TYPE_MASK, OP_LUI as u32, |raw| RvInstr::Lui(UType::from(raw))),
    InstrDef::new("AUIPC", U, U_TYPE_MASK, OP_AUIPC as u32, |raw| {
        RvInstr::Auipc(UType::from(raw))
    }),

    // ========== Load ==========
    InstrDef::new("LB", I, FUNCT3_MASK, i_match(0b000, OP_LOAD), |raw| RvInstr::Lb(IType::from(raw))),
    InstrDef::new("LH", I, FUNCT3_MASK, i_match(0b001, OP_LOAD), |raw| RvInstr::Lh(IType::from(raw))),
    InstrDef::new("LW", I, FUNCT3_MASK, i_match(0b010, OP_LOAD), |raw| RvInstr::Lw(IType::from(raw))),
    InstrDef::new("LBU", I, FUNCT3_MASK, i_match(0b100, OP_LOAD), |raw| RvInstr::Lbu(IType::from(raw))),
    InstrDef::new("LHU", I, FUNCT3_MASK, i_match(0b101, OP_LOAD), |raw| RvInstr::Lhu(IType::from(raw))),

    // ========== Store ==========
    InstrDef::new("SB", S, FUNCT3_MASK, i_match(0b000, OP_STORE), |raw| RvInstr::Sb(SType::from(raw))),
    InstrDef::new("SH", S, FUNCT3_MASK, i_match(0b001, OP_STORE), |raw| RvInstr::Sh(SType::from(raw))),
    InstrDef::new("SW", S, FUNCT3_MASK, i_match(0b010, OP_STORE), |raw| RvInstr::Sw(SType::from(raw))),

    // ========== I-type ALU ==========
    InstrDef::new("ADDI", I, FUNCT3_MASK, i_match(0b000, OP_IMM), |raw| RvInstr::Addi(IType::from(raw))),
    InstrDef::new("SLTI", I, FUNCT3_MASK, i_match(0b010, OP_IMM), |raw| RvInstr::Slti(IType::from(raw))),
    InstrDef::new("SLTIU", I, FUNCT3_MASK, i_match(0b011, OP_IMM), |raw| {
        RvInstr::Sltiu(IType::from(raw))
    }),
    InstrDef::new("XORI", I, FUNCT3_MASK, i_match(0b100, OP_IMM), |raw| RvInstr::Xori(IType::from(raw))),
    InstrDef::new("ORI", I, FUNCT3_MASK, i_match(0b110, OP_IMM), |raw| RvInstr::Ori(IType::from(raw))),
    InstrDef::new("ANDI", I, FUNCT3_MASK, i_match(0b111, OP_IMM), |raw| RvInstr::Andi(IType::from(raw))),

    // ========== Shift immediate ==========
    InstrDef::new("SLLI", I, SHIFT_IMM_MASK, r_match(0b0000000, 0b001, OP_IMM), |raw| {
        RvInstr::Slli(IType::from(raw))
    }),
    InstrDef::new("SRLI", I, SHIFT_IMM_MASK, r_match(0b0000000, 0b101, OP_IMM), |raw| {
        RvInstr::Srli(IType::from(raw))
    }),
    InstrDef::new("SRAI", I, SHIFT_IMM_MASK, r_match(0b0100000, 0b101, OP_IMM), |raw| {
        RvInstr::Srai(IType::from(raw))
    }),

    // ========== R-type ==========
    InstrDef::new("ADD", R, R_TYPE_MASK, r_match(0b0000000, 0b000, OP_REG), |raw| RvInstr::Add(RType::from(raw))),
    InstrDef::new("SUB", R, R_TYPE_MASK, r_match(0b0100000, 0b000, OP_REG), |raw| RvInstr::Sub(RType::from(raw))),
    InstrDef::new("SLL", R, R_TYPE_MASK, r_match(0b0000000, 0b001, OP_REG), |raw| RvInstr::Sll(RType::from(raw))),
    InstrDef::new("SLT", R, R_TYPE_MASK, r_match(0b0000000, 0b010, OP_REG), |raw| RvInstr::Slt(RType::from(raw))),
    InstrDef::new("SLTU", R, R_TYPE_MASK, r_match(0b0000000, 0b011, OP_REG), |raw| RvInstr::Sltu(RType::from(raw))),
    InstrDef::new("XOR", R, R_TYPE_MASK, r_match(0b0000000, 0b100, OP_REG), |raw| RvInstr::Xor(RType::from(raw))),
    InstrDef::new("SRL", R, R_TYPE_MASK, r_match(0b0000000, 0b101, OP_REG), |raw| RvInstr::Srl(RType::from(raw))),
    InstrDef::new("SRA", R, R_TYPE_MASK, r_match(0b0100000, 0b101, OP_REG), |raw| RvInstr::Sra(RType::from(raw))),
    InstrDef::new("OR", R, R_TYPE_MASK, r_match(0b0000000, 0b110, OP_REG), |raw| RvInstr::Or(RType::from(raw))),
    InstrDef::new("AND", R, R_TYPE_MASK, r_match(0b0000000, 0b111, OP_REG), |raw| RvInstr::And(RType::from(raw))),
];

/// RV32I 子集的 opcode 列表
pub static RV32I_OPCODES: [u8; 6] = [OP_LUI, OP_AUIPC, OP_LOAD, OP_STORE, OP_IMM, OP_REG];

/// RV32I 解码器实例
pub static RV32I_DECODER: TableDrivenDecoder =
    TableDrivenDecoder::new("RV32I", RV32I_INSTRS, &RV32I_OPCODES);
