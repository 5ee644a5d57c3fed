//! 整数 ALU 运算
//!
//! 纯函数，不接触寄存器或内存。立即数形式由调用方先把
//! 符号扩展后的立即数转成 u32 再传入。

use crate::isa::shamt;

#[inline]
pub fn add(a: u32, b: u32) -> u32 {
    a.wrapping_add(b)
}

#[inline]
pub fn sub(a: u32, b: u32) -> u32 {
    a.wrapping_sub(b)
}

/// 有符号比较
#[inline]
pub fn slt(a: u32, b: u32) -> u32 {
    ((a as i32) < (b as i32)) as u32
}

/// 无符号比较
#[inline]
pub fn sltu(a: u32, b: u32) -> u32 {
    (a < b) as u32
}

#[inline]
pub fn and(a: u32, b: u32) -> u32 {
    a & b
}

#[inline]
pub fn or(a: u32, b: u32) -> u32 {
    a | b
}

#[inline]
pub fn xor(a: u32, b: u32) -> u32 {
    a ^ b
}

#[inline]
pub fn sll(a: u32, b: u32) -> u32 {
    a << shamt(b)
}

/// 逻辑右移，高位补 0
#[inline]
pub fn srl(a: u32, b: u32) -> u32 {
    a >> shamt(b)
}

/// 算术右移，高位复制符号位
#[inline]
pub fn sra(a: u32, b: u32) -> u32 {
    ((a as i32) >> shamt(b)) as u32
}
