//! rvlite: RV32I 整数子集解释器
//!
//! 加载一个程序映像，逐条取指、解码、执行，直到执行完停机地址处的指令
//! 或遇到无法继续的错误。写到设备地址的字节直接送往输出流。
//!
//! # 模块结构
//!
//! - `isa`: RISC-V ISA 抽象与解码
//! - `cpu`: CPU 核心与执行引擎
//! - `memory`: 内存抽象层
//! - `mmio`: 内存映射的字符输出设备
//! - `sim_env`: 仿真环境（配置、映像加载、运行与错误）

pub mod cpu;
pub mod isa;
pub mod memory;
pub mod mmio;
pub mod sim_env;
