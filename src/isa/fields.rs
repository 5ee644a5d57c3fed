//! 指令字段提取辅助函数
//!
//! 全部通过掩码 + 移位从 32-bit 指令字中取字段，不依赖任何内存布局。

/// 提取 opcode 字段 [6:0]
#[inline]
pub fn opcode(raw: u32) -> u8 {
    (raw & 0x7F) as u8
}

/// 提取 rd 字段 [11:7]
#[inline]
pub fn rd(raw: u32) -> u8 {
    ((raw >> 7) & 0x1F) as u8
}

/// 提取 funct3 字段 [14:12]
#[inline]
pub fn funct3(raw: u32) -> u8 {
    ((raw >> 12) & 0x7) as u8
}

/// 提取 rs1 字段 [19:15]
#[inline]
pub fn rs1(raw: u32) -> u8 {
    ((raw >> 15) & 0x1F) as u8
}

/// 提取 rs2 字段 [24:20]
#[inline]
pub fn rs2(raw: u32) -> u8 {
    ((raw >> 20) & 0x1F) as u8
}

/// 提取 funct7 字段 [31:25]
#[inline]
pub fn funct7(raw: u32) -> u8 {
    ((raw >> 25) & 0x7F) as u8
}

/// 提取 I-type 立即数并符号扩展
/// imm[11:0] = raw[31:20]
#[inline]
pub fn imm_i(raw: u32) -> i32 {
    (raw as i32) >> 20
}

/// 提取 S-type 立即数并符号扩展
/// imm[11:5] = raw[31:25], imm[4:0] = raw[11:7]
#[inline]
pub fn imm_s(raw: u32) -> i32 {
    let imm_11_5 = (raw >> 25) & 0x7F;
    let imm_4_0 = (raw >> 7) & 0x1F;
    let imm = (imm_11_5 << 5) | imm_4_0;
    ((imm as i32) << 20) >> 20
}

/// 提取 U-type 立即数：raw[31:12] 作为有符号 20 位数
///
/// 返回值未左移，执行阶段再放回 [31:12]。
#[inline]
pub fn imm_u(raw: u32) -> i32 {
    (raw as i32) >> 12
}

/// 移位量只取低 5 位（RV32）
#[inline]
pub fn shamt(value: u32) -> u32 {
    value & 0x1F
}

// ========== Opcode 常量 ==========
pub const OP_LUI: u8 = 0b0110111;
pub const OP_AUIPC: u8 = 0b0010111;
pub const OP_LOAD: u8 = 0b0000011;
pub const OP_STORE: u8 = 0b0100011;
pub const OP_IMM: u8 = 0b0010011;
pub const OP_REG: u8 = 0b0110011;
