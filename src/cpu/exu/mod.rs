//! 执行单元
//!
//! `alu` 是纯运算，`rv32i` 负责把一条已解码指令作用到寄存器与内存上。
//! 执行结果显式给出下一条 PC，不在执行单元内部修改 PC。

pub mod alu;
pub mod rv32i;

use crate::memory::MemError;

use super::AccessOp;

/// 一条指令成功退休后的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retired {
    /// 下一条指令地址
    pub next_pc: u32,
    /// 若为 store，给出有效地址，供 MMIO 检查
    pub store_addr: Option<u32>,
}

/// 执行失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecFault {
    Illegal { raw: u32 },
    Access { op: AccessOp, fault: MemError },
}
