//! CPU 核心与执行引擎
//!
//! 本模块定义了单线程 RV32I 子集 CPU 核心 `CpuCore`，
//! 包含寄存器文件、程序计数器以及取指-执行循环。

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::isa::DecoderRegistry;
use crate::memory::{MemError, Memory};
use crate::mmio::StoreHook;

mod exu;
mod regfile;

use exu::ExecFault;
pub use exu::Retired;
pub use exu::alu;
pub use regfile::RegFile;

/// 访存类别，用于区分访问错误发生在哪一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOp {
    Fetch,
    Load,
    Store,
}

impl fmt::Display for AccessOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessOp::Fetch => "fetch",
            AccessOp::Load => "load",
            AccessOp::Store => "store",
        };
        f.write_str(s)
    }
}

/// CPU 执行状态
///
/// 除 `Running` 外都是终止状态，进入后 `step` 不再改变任何架构状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    /// 正常运行中
    Running,
    /// 执行到停机地址
    Halted,
    /// 遇到无法解码的指令，`pc` 为该指令地址
    IllegalInstruction { pc: u32, raw: u32 },
    /// 取指或访存越界
    AccessFault { pc: u32, op: AccessOp, fault: MemError },
    /// 输出设备写失败，`addr` 为触发输出的 store 地址
    DeviceFault { pc: u32, addr: u32 },
}

impl CpuState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CpuState::Running)
    }
}

/// 单线程 CPU 核心
///
/// 包含 RV32I 的最小状态：
/// - 32 个 32-bit 通用寄存器 x0..x31（x0 恒为 0）
/// - 32-bit 程序计数器
///
/// 设计约定：
/// - x0 永远为 0，写入时丢弃
/// - 下一条 PC 由执行单元给出，`step` 统一提交
/// - 核心状态不依赖全局变量，多个实例可以并存
pub struct CpuCore {
    /// 整数寄存器文件
    regs: RegFile,
    /// 程序计数器
    pc: u32,
    /// 当前 CPU 状态
    state: CpuState,
    /// 指令解码器（只读共享）
    decoder: Arc<DecoderRegistry>,
    /// 执行完该地址处的指令后停机
    halt_addr: Option<u32>,
    /// 最近一次设备写失败的原因
    device_error: Option<io::Error>,
}

impl CpuCore {
    /// 创建一个新的 CPU 核心
    ///
    /// # 参数
    ///
    /// * `entry_pc` - 初始程序计数器值
    ///
    /// # 示例
    ///
    /// ```
    /// use rvlite::cpu::CpuCore;
    ///
    /// let cpu = CpuCore::new(0x1000);
    /// assert_eq!(cpu.pc(), 0x1000);
    /// ```
    pub fn new(entry_pc: u32) -> Self {
        Self::with_decoder(entry_pc, Arc::new(DecoderRegistry::with_rv32i()))
    }

    /// 使用外部提供的解码器创建 CPU 核心
    pub fn with_decoder(entry_pc: u32, decoder: Arc<DecoderRegistry>) -> Self {
        CpuCore {
            regs: RegFile::new(),
            pc: entry_pc,
            state: CpuState::Running,
            decoder,
            halt_addr: None,
            device_error: None,
        }
    }

    /// 设置停机地址
    pub fn with_halt_addr(mut self, addr: Option<u32>) -> Self {
        self.halt_addr = addr;
        self
    }

    pub fn halt_addr(&self) -> Option<u32> {
        self.halt_addr
    }

    /// 获取当前程序计数器值
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// 设置程序计数器
    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    /// 获取当前 CPU 状态
    pub fn state(&self) -> CpuState {
        self.state
    }

    /// 读取 x0 总是返回 0
    pub fn read_reg(&self, reg: u8) -> u32 {
        self.regs.read(reg)
    }

    /// 写入 x0 会被丢弃
    pub fn write_reg(&mut self, reg: u8, value: u32) {
        self.regs.write(reg, value)
    }

    /// 获取所有寄存器的快照
    pub fn regs(&self) -> &[u32; 32] {
        self.regs.snapshot()
    }

    pub fn decoder(&self) -> &Arc<DecoderRegistry> {
        &self.decoder
    }

    /// 取走设备写失败的原因
    pub fn take_device_error(&mut self) -> Option<io::Error> {
        self.device_error.take()
    }

    /// 复位到初始状态：寄存器清零，PC 置为 `entry_pc`
    pub fn reset(&mut self, entry_pc: u32) {
        self.regs.clear();
        self.pc = entry_pc;
        self.state = CpuState::Running;
        self.device_error = None;
    }

    /// 执行单步指令
    ///
    /// # 流程
    ///
    /// 1. 从 PC 处取指（越界即 fetch fault）
    /// 2. 解码，非法指令直接终止，不修改任何状态
    /// 3. 执行，得到下一条 PC 与可能的 store 地址
    /// 4. 若为 store，通知 `hook`
    /// 5. 刚退休的指令位于停机地址则停机，PC 保持不动；否则提交下一条 PC
    pub fn step(&mut self, mem: &mut dyn Memory, hook: &mut dyn StoreHook) -> CpuState {
        if self.state.is_terminal() {
            return self.state;
        }

        let pc = self.pc;

        // 取指
        let raw = match mem.load32(pc) {
            Ok(raw) => raw,
            Err(fault) => {
                return self.stop(CpuState::AccessFault { pc, op: AccessOp::Fetch, fault });
            }
        };
        let decoded = self.decoder.decode(raw);

        let retired = match exu::rv32i::execute(self, mem, decoded.instr, pc) {
            Ok(retired) => retired,
            Err(ExecFault::Illegal { raw }) => {
                return self.stop(CpuState::IllegalInstruction { pc, raw });
            }
            Err(ExecFault::Access { op, fault }) => {
                return self.stop(CpuState::AccessFault { pc, op, fault });
            }
        };
        log::trace!("0x{:08x}: {:08x}  {}", pc, raw, decoded);

        if let Some(addr) = retired.store_addr {
            if let Err(e) = hook.on_store(addr, &*mem) {
                log::error!("device write for store to 0x{:08x} failed: {}", addr, e);
                self.device_error = Some(e);
                return self.stop(CpuState::DeviceFault { pc, addr });
            }
        }

        if self.halt_addr == Some(pc) {
            return self.stop(CpuState::Halted);
        }

        self.pc = retired.next_pc;
        self.state
    }

    /// 运行多条指令
    ///
    /// # 返回
    ///
    /// 退休的指令数量和最终 CPU 状态
    ///
    /// # 停止条件
    ///
    /// - 达到最大指令数
    /// - 进入任一终止状态
    pub fn run(
        &mut self,
        mem: &mut dyn Memory,
        hook: &mut dyn StoreHook,
        max_instructions: u64,
    ) -> (u64, CpuState) {
        let mut retired = 0;
        for _ in 0..max_instructions {
            if self.state.is_terminal() {
                break;
            }
            let state = self.step(mem, hook);
            if matches!(state, CpuState::Running | CpuState::Halted) {
                retired += 1;
            }
        }
        (retired, self.state)
    }

    /// 一直运行到终止状态
    pub fn run_until_halt(&mut self, mem: &mut dyn Memory, hook: &mut dyn StoreHook) -> (u64, CpuState) {
        let mut retired = 0;
        while !self.state.is_terminal() {
            let state = self.step(mem, hook);
            if matches!(state, CpuState::Running | CpuState::Halted) {
                retired += 1;
            }
        }
        (retired, self.state)
    }

    fn stop(&mut self, state: CpuState) -> CpuState {
        log::debug!("cpu stopped at pc=0x{:08x}: {:?}", self.pc, state);
        self.state = state;
        state
    }
}

impl Default for CpuCore {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for CpuCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuCore")
            .field("pc", &format_args!("0x{:08x}", self.pc))
            .field("state", &self.state)
            .field("halt_addr", &self.halt_addr)
            .finish()
    }
}

/// 寄存器转储，每行 4 个
impl fmt::Display for CpuCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PC: 0x{:08x}  State: {:?}", self.pc, self.state)?;
        writeln!(f, "─── Integer Registers (x0-x31) ───────────────────────────────────")?;
        for (i, value) in self.regs().iter().enumerate() {
            if i % 4 == 0 {
                write!(f, "  ")?;
            }
            write!(f, "x{:02}: 0x{:08x}  ", i, value)?;
            if i % 4 == 3 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
