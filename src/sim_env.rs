//! 仿真环境初始化模块
//!
//! 本模块负责：
//! - 仿真配置（`SimConfig`）与错误类型（`SimError`）
//! - 识别并加载程序映像（原始二进制或 RV32 ELF）
//! - 初始化 CPU、内存与输出设备
//! - 运行到终止状态并把终止状态转换为结果
//!
//! # 示例
//!
//! ```no_run
//! use rvlite::sim_env::{SimConfig, SimEnv};
//!
//! let config = SimConfig::default().with_image_path("program.bin");
//!
//! let mut env = SimEnv::from_config(config).expect("Failed to create sim env");
//! env.run_to_completion().expect("program failed");
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use elf::abi::{EM_RISCV, PF_W, PF_X, PT_LOAD};
use elf::endian::AnyEndian;
use elf::ElfBytes;
use thiserror::Error;

use crate::cpu::{AccessOp, CpuCore, CpuState};
use crate::memory::{FlatMemory, MemError, DEFAULT_MEMORY_SIZE};
use crate::mmio::{ConsoleShim, DEFAULT_UART_ADDR};

/// 原始映像的默认加载地址，也是默认入口
pub const DEFAULT_LOAD_ADDR: u32 = 0x1000;

/// 默认停机地址：执行完该地址处的指令后停机
pub const DEFAULT_HALT_ADDR: u32 = 0x1048;

const ELF_MAGIC: &[u8; 4] = b"\x7FELF";

/// 仿真错误
#[derive(Debug, Error)]
pub enum SimError {
    #[error("cannot read image {}: {source}", .path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("image is empty")]
    EmptyImage,

    #[error(
        "image of {len} bytes does not fit at 0x{load_addr:08x} in 0x{mem_size:x} bytes of memory"
    )]
    ImageTooLarge { len: usize, load_addr: u32, mem_size: usize },

    #[error("ELF parse error: {0}")]
    ElfParse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("memory error: {0}")]
    Memory(#[from] MemError),

    #[error("illegal instruction 0x{raw:08x} at pc=0x{pc:08x}")]
    IllegalInstruction { pc: u32, raw: u32 },

    #[error("{op} access fault at pc=0x{pc:08x}: {fault}")]
    AccessFault {
        pc: u32,
        op: AccessOp,
        #[source]
        fault: MemError,
    },

    #[error("output device failed at pc=0x{pc:08x}: {source}")]
    DeviceFault {
        pc: u32,
        #[source]
        source: io::Error,
    },
}

impl SimError {
    /// 进程退出码
    ///
    /// 1 加载/配置错误，3 非法指令，4 访存越界，5 输出设备失败。
    /// 2 留给命令行用法错误。
    pub fn exit_code(&self) -> u8 {
        match self {
            SimError::ImageRead { .. }
            | SimError::EmptyImage
            | SimError::ImageTooLarge { .. }
            | SimError::ElfParse(_)
            | SimError::Config(_)
            | SimError::Memory(_) => 1,
            SimError::IllegalInstruction { .. } => 3,
            SimError::AccessFault { .. } => 4,
            SimError::DeviceFault { .. } => 5,
        }
    }
}

/// 映像格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// 以 `\x7FELF` 开头视为 ELF，否则为原始二进制
    #[default]
    Auto,
    Raw,
    Elf,
}

impl ImageFormat {
    fn resolve(self, bytes: &[u8]) -> ImageFormat {
        match self {
            ImageFormat::Auto if bytes.starts_with(ELF_MAGIC) => ImageFormat::Elf,
            ImageFormat::Auto => ImageFormat::Raw,
            other => other,
        }
    }
}

/// 仿真配置
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// 映像文件路径
    pub image_path: Option<PathBuf>,
    /// 映像格式
    pub format: ImageFormat,
    /// 原始映像加载地址
    pub load_addr: u32,
    /// 入口点 PC（覆盖映像自带的入口）
    pub entry_pc: Option<u32>,
    /// 内存大小（字节），基地址固定为 0
    pub mem_size: usize,
    /// 停机地址，`None` 表示不设停机地址
    pub halt_addr: Option<u32>,
    /// 字符输出设备地址
    pub uart_addr: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            image_path: None,
            format: ImageFormat::Auto,
            load_addr: DEFAULT_LOAD_ADDR,
            entry_pc: None,
            mem_size: DEFAULT_MEMORY_SIZE,
            halt_addr: Some(DEFAULT_HALT_ADDR),
            uart_addr: DEFAULT_UART_ADDR,
        }
    }
}

impl SimConfig {
    /// 创建新配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置映像文件路径
    pub fn with_image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// 设置原始映像加载地址
    pub fn with_load_addr(mut self, addr: u32) -> Self {
        self.load_addr = addr;
        self
    }

    /// 设置入口 PC
    pub fn with_entry_pc(mut self, pc: u32) -> Self {
        self.entry_pc = Some(pc);
        self
    }

    /// 设置内存大小
    pub fn with_mem_size(mut self, size: usize) -> Self {
        self.mem_size = size;
        self
    }

    pub fn with_halt_addr(mut self, addr: Option<u32>) -> Self {
        self.halt_addr = addr;
        self
    }

    pub fn with_uart_addr(mut self, addr: u32) -> Self {
        self.uart_addr = addr;
        self
    }

    /// 检查配置是否自洽
    pub fn validate(&self) -> Result<(), SimError> {
        if self.mem_size == 0 {
            return Err(SimError::Config("memory size must be non-zero".into()));
        }
        if self.mem_size as u64 > 1u64 << 32 {
            return Err(SimError::Config(format!(
                "memory size 0x{:x} exceeds 32-bit address space",
                self.mem_size
            )));
        }
        if self.uart_addr as usize >= self.mem_size {
            log::warn!(
                "uart address 0x{:08x} is outside memory; stores to it will fault",
                self.uart_addr
            );
        }
        Ok(())
    }
}

/// ELF 程序段信息
#[derive(Debug, Clone)]
pub struct ElfSegment {
    /// 虚拟地址
    pub vaddr: u32,
    /// 文件中的大小
    pub file_size: usize,
    /// 内存中的大小
    pub mem_size: usize,
    /// 段数据
    pub data: Vec<u8>,
    /// 是否可执行
    pub executable: bool,
    /// 是否可写
    pub writable: bool,
}

/// ELF 文件解析结果
#[derive(Debug, Clone)]
pub struct ElfInfo {
    /// 入口点地址
    pub entry: u32,
    /// PT_LOAD 段
    pub segments: Vec<ElfSegment>,
}

impl ElfInfo {
    /// 从字节数组解析 ELF
    ///
    /// 只接受 32 位小端 RISC-V 映像。
    pub fn parse_bytes(data: &[u8]) -> Result<Self, SimError> {
        let elf_file = ElfBytes::<AnyEndian>::minimal_parse(data)
            .map_err(|e| SimError::ElfParse(format!("failed to parse ELF: {}", e)))?;

        let header = &elf_file.ehdr;

        if header.e_machine != EM_RISCV {
            return Err(SimError::ElfParse(format!(
                "not a RISC-V ELF (machine type: 0x{:x}, expected 0x{:x})",
                header.e_machine, EM_RISCV
            )));
        }
        if header.class != elf::file::Class::ELF32 {
            return Err(SimError::ElfParse("only 32-bit ELF is supported".into()));
        }
        if header.endianness != AnyEndian::Little {
            return Err(SimError::ElfParse("only little-endian ELF is supported".into()));
        }

        let entry = header.e_entry as u32;
        let mut segments = Vec::new();

        if let Some(phdrs) = elf_file.segments() {
            for phdr in phdrs.iter().filter(|p| p.p_type == PT_LOAD) {
                let file_size = phdr.p_filesz as usize;
                let mem_size = phdr.p_memsz as usize;
                if file_size > mem_size {
                    return Err(SimError::ElfParse(format!(
                        "segment at 0x{:08x} has filesz 0x{:x} > memsz 0x{:x}",
                        phdr.p_vaddr, file_size, mem_size
                    )));
                }

                let data = elf_file
                    .segment_data(&phdr)
                    .map_err(|e| SimError::ElfParse(format!("failed to read segment data: {}", e)))?
                    .to_vec();

                segments.push(ElfSegment {
                    vaddr: phdr.p_vaddr as u32,
                    file_size,
                    mem_size,
                    data,
                    executable: (phdr.p_flags & PF_X) != 0,
                    writable: (phdr.p_flags & PF_W) != 0,
                });
            }
        }

        if segments.is_empty() {
            return Err(SimError::ElfParse("no loadable segments".into()));
        }

        Ok(ElfInfo { entry, segments })
    }

    /// 获取程序使用的最小和最大地址
    pub fn address_range(&self) -> Option<(u32, u64)> {
        let min_addr = self.segments.iter().map(|s| s.vaddr).min()?;
        let max_addr = self
            .segments
            .iter()
            .map(|s| s.vaddr as u64 + s.mem_size as u64)
            .max()?;
        Some((min_addr, max_addr))
    }
}

fn load_segments_into_memory(memory: &mut FlatMemory, segments: &[ElfSegment]) -> Result<(), SimError> {
    for seg in segments {
        if seg.mem_size == 0 {
            continue;
        }

        memory.write_bytes(seg.vaddr, &seg.data)?;

        // bss 部分清零
        if seg.mem_size > seg.file_size {
            let bss_start = seg.vaddr.wrapping_add(seg.file_size as u32);
            memory.fill(bss_start, seg.mem_size - seg.file_size, 0)?;
        }
    }
    Ok(())
}

/// 已加载的映像，复位时重新写入内存
#[derive(Debug, Clone)]
enum LoadedImage {
    Raw(Vec<u8>),
    Elf(ElfInfo),
}

/// 仿真环境
///
/// 封装了 CPU、内存、输出设备和仿真配置，提供统一的仿真接口。
/// `W` 是设备输出的去向，命令行下为标准输出。
pub struct SimEnv<W: Write = io::Stdout> {
    /// CPU 核心
    pub cpu: CpuCore,
    /// 主内存
    pub memory: FlatMemory,
    /// 字符输出设备
    pub console: ConsoleShim<W>,
    /// 配置
    pub config: SimConfig,
    /// 已退休的指令数
    pub instructions_executed: u64,
    image: Option<LoadedImage>,
    entry_pc: u32,
}

impl SimEnv<io::Stdout> {
    /// 从配置创建仿真环境，设备输出到标准输出
    pub fn from_config(config: SimConfig) -> Result<Self, SimError> {
        Self::with_output(config, io::stdout())
    }
}

impl<W: Write> SimEnv<W> {
    /// 从配置创建仿真环境，设备输出写入 `out`
    ///
    /// 配置了 `image_path` 时立即读取并加载映像。
    pub fn with_output(config: SimConfig, out: W) -> Result<Self, SimError> {
        config.validate()?;
        log::debug!("sim config: {:?}", config);

        let entry_pc = config.entry_pc.unwrap_or(config.load_addr);
        let cpu = CpuCore::new(entry_pc).with_halt_addr(config.halt_addr);

        let mut env = SimEnv {
            cpu,
            memory: FlatMemory::new(config.mem_size, 0),
            console: ConsoleShim::new(config.uart_addr, out),
            config,
            instructions_executed: 0,
            image: None,
            entry_pc,
        };

        if let Some(path) = env.config.image_path.clone() {
            env.load_file(path)?;
        }

        Ok(env)
    }

    /// 读取并加载映像文件
    pub fn load_file(&mut self, path: impl Into<PathBuf>) -> Result<(), SimError> {
        let path = path.into();
        let bytes = fs::read(&path).map_err(|source| SimError::ImageRead { path: path.clone(), source })?;
        log::info!("read image {} ({} bytes)", path.display(), bytes.len());
        self.load_bytes(&bytes)
    }

    /// 按配置的格式加载映像字节
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), SimError> {
        match self.config.format.resolve(bytes) {
            ImageFormat::Elf => self.load_elf(bytes),
            _ => self.load_raw(bytes),
        }
    }

    /// 把原始二进制原样写到加载地址
    pub fn load_raw(&mut self, bytes: &[u8]) -> Result<(), SimError> {
        if bytes.is_empty() {
            return Err(SimError::EmptyImage);
        }
        let load_addr = self.config.load_addr;
        if load_addr as u64 + bytes.len() as u64 > self.memory.size() as u64 {
            return Err(SimError::ImageTooLarge {
                len: bytes.len(),
                load_addr,
                mem_size: self.memory.size(),
            });
        }

        let image = LoadedImage::Raw(bytes.to_vec());
        self.install(&image)?;
        log::info!("loaded raw image: {} bytes at 0x{:08x}", bytes.len(), load_addr);
        self.image = Some(image);
        self.set_entry(load_addr);
        Ok(())
    }

    /// 把 ELF 的 PT_LOAD 段写到各自的虚拟地址
    pub fn load_elf(&mut self, bytes: &[u8]) -> Result<(), SimError> {
        if bytes.is_empty() {
            return Err(SimError::EmptyImage);
        }
        let elf = ElfInfo::parse_bytes(bytes)?;
        for (i, seg) in elf.segments.iter().enumerate() {
            log::debug!(
                "segment {}: vaddr=0x{:08x}, filesz=0x{:x}, memsz=0x{:x}, flags={}{}",
                i,
                seg.vaddr,
                seg.file_size,
                seg.mem_size,
                if seg.executable { "X" } else { "-" },
                if seg.writable { "W" } else { "R" },
            );
        }

        let entry = elf.entry;
        let segment_count = elf.segments.len();
        let image = LoadedImage::Elf(elf);
        self.install(&image)?;
        log::info!("loaded ELF image: entry=0x{:08x}, {} segments", entry, segment_count);
        self.image = Some(image);
        self.set_entry(entry);
        Ok(())
    }

    fn install(&mut self, image: &LoadedImage) -> Result<(), SimError> {
        match image {
            LoadedImage::Raw(bytes) => self.memory.write_bytes(self.config.load_addr, bytes)?,
            LoadedImage::Elf(elf) => load_segments_into_memory(&mut self.memory, &elf.segments)?,
        }
        Ok(())
    }

    /// 映像自带入口，配置中的入口优先
    fn set_entry(&mut self, image_entry: u32) {
        self.entry_pc = self.config.entry_pc.unwrap_or(image_entry);
        self.cpu.reset(self.entry_pc);
        self.instructions_executed = 0;
    }

    pub fn entry_pc(&self) -> u32 {
        self.entry_pc
    }

    /// 执行单步
    pub fn step(&mut self) -> CpuState {
        let (_, state) = self.run(1);
        state
    }

    /// 运行指定数量的指令
    pub fn run(&mut self, max_instructions: u64) -> (u64, CpuState) {
        let (executed, state) = self.cpu.run(&mut self.memory, &mut self.console, max_instructions);
        self.instructions_executed += executed;
        (executed, state)
    }

    /// 一直运行到终止状态
    pub fn run_until_halt(&mut self) -> (u64, CpuState) {
        let (executed, state) = self.cpu.run_until_halt(&mut self.memory, &mut self.console);
        self.instructions_executed += executed;
        (executed, state)
    }

    /// 运行到终止状态，并把终止状态转换为结果
    ///
    /// 正常停机返回退休的指令总数。
    pub fn run_to_completion(&mut self) -> Result<u64, SimError> {
        self.run_until_halt();
        self.check_state()?;
        log::info!(
            "halted at pc=0x{:08x} after {} instructions",
            self.cpu.pc(),
            self.instructions_executed
        );
        Ok(self.instructions_executed)
    }

    /// 把 CPU 的终止状态转换为错误
    pub fn check_state(&mut self) -> Result<(), SimError> {
        match self.cpu.state() {
            CpuState::Running | CpuState::Halted => Ok(()),
            CpuState::IllegalInstruction { pc, raw } => Err(SimError::IllegalInstruction { pc, raw }),
            CpuState::AccessFault { pc, op, fault } => Err(SimError::AccessFault { pc, op, fault }),
            CpuState::DeviceFault { pc, .. } => {
                let source = self
                    .cpu
                    .take_device_error()
                    .unwrap_or_else(|| io::Error::other("output device failed"));
                Err(SimError::DeviceFault { pc, source })
            }
        }
    }

    /// 设备已写出的内容
    pub fn output(&self) -> &W {
        self.console.output()
    }

    /// 重置仿真环境
    ///
    /// 内存清零后重新写入已加载的映像，CPU 回到入口。设备输出不会被撤回。
    pub fn reset(&mut self) -> Result<(), SimError> {
        self.memory = FlatMemory::new(self.config.mem_size, 0);
        if let Some(image) = self.image.take() {
            let result = self.install(&image);
            self.image = Some(image);
            result?;
        }
        self.cpu.reset(self.entry_pc);
        self.instructions_executed = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    const NOP: u32 = 0x00000013; // addi x0, x0, 0

    fn words_to_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// 在前几条指令后补 NOP，使最后一条落在默认停机地址
    fn program_until_halt(prefix: &[u32]) -> Vec<u8> {
        let count = ((DEFAULT_HALT_ADDR - DEFAULT_LOAD_ADDR) / 4 + 1) as usize;
        let mut words = prefix.to_vec();
        words.resize(count, NOP);
        words_to_bytes(&words)
    }

    fn test_env() -> SimEnv<Vec<u8>> {
        let config = SimConfig::new().with_mem_size(0x10000);
        SimEnv::with_output(config, Vec::new()).expect("Failed to create sim env")
    }

    /// 手工构造一个最小的 ELF32 RISC-V 可执行文件，只含一个 PT_LOAD 段
    fn minimal_elf(entry: u32, vaddr: u32, code: &[u8], memsz: u32) -> Vec<u8> {
        let mut out = Vec::new();
        // e_ident
        out.extend_from_slice(b"\x7FELF");
        out.extend_from_slice(&[1, 1, 1, 0]); // ELFCLASS32, LE, EV_CURRENT, SYSV
        out.extend_from_slice(&[0; 8]);
        out.extend_from_slice(&2u16.to_le_bytes()); // ET_EXEC
        out.extend_from_slice(&EM_RISCV.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes()); // e_version
        out.extend_from_slice(&entry.to_le_bytes());
        out.extend_from_slice(&52u32.to_le_bytes()); // e_phoff
        out.extend_from_slice(&0u32.to_le_bytes()); // e_shoff
        out.extend_from_slice(&0u32.to_le_bytes()); // e_flags
        out.extend_from_slice(&52u16.to_le_bytes()); // e_ehsize
        out.extend_from_slice(&32u16.to_le_bytes()); // e_phentsize
        out.extend_from_slice(&1u16.to_le_bytes()); // e_phnum
        out.extend_from_slice(&40u16.to_le_bytes()); // e_shentsize
        out.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
        out.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx
        assert_eq!(out.len(), 52);

        // program header
        out.extend_from_slice(&PT_LOAD.to_le_bytes());
        out.extend_from_slice(&84u32.to_le_bytes()); // p_offset
        out.extend_from_slice(&vaddr.to_le_bytes()); // p_vaddr
        out.extend_from_slice(&vaddr.to_le_bytes()); // p_paddr
        out.extend_from_slice(&(code.len() as u32).to_le_bytes()); // p_filesz
        out.extend_from_slice(&memsz.to_le_bytes()); // p_memsz
        out.extend_from_slice(&(PF_X | 0x4).to_le_bytes()); // R+X
        out.extend_from_slice(&4u32.to_le_bytes()); // p_align
        assert_eq!(out.len(), 84);

        out.extend_from_slice(code);
        out
    }

    #[test]
    fn test_sim_config_builder() {
        let config = SimConfig::new()
            .with_mem_size(128 * 1024)
            .with_load_addr(0x2000)
            .with_entry_pc(0x2004)
            .with_halt_addr(None)
            .with_uart_addr(0x300)
            .with_format(ImageFormat::Raw);

        assert_eq!(config.mem_size, 128 * 1024);
        assert_eq!(config.load_addr, 0x2000);
        assert_eq!(config.entry_pc, Some(0x2004));
        assert_eq!(config.halt_addr, None);
        assert_eq!(config.uart_addr, 0x300);
        assert_eq!(config.format, ImageFormat::Raw);
    }

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.load_addr, 0x1000);
        assert_eq!(config.halt_addr, Some(0x1048));
        assert_eq!(config.uart_addr, 0x200);
        assert_eq!(config.mem_size, 0x1000_0000);
        assert_eq!(config.format, ImageFormat::Auto);
    }

    #[test]
    fn test_invalid_config() {
        let err = SimEnv::with_output(SimConfig::new().with_mem_size(0), Vec::new()).err().unwrap();
        assert!(matches!(err, SimError::Config(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_sim_env_basic() {
        let mut env = test_env();

        // addi x1, x0, 42
        env.memory.store32(0x1000, 0x02A00093).unwrap();

        let state = env.step();
        assert_eq!(state, CpuState::Running);
        assert_eq!(env.cpu.read_reg(1), 42);
        assert_eq!(env.instructions_executed, 1);
    }

    #[test]
    fn test_scenario_add_immediates() {
        let mut env = test_env();
        env.load_raw(&program_until_halt(&[
            0x00500093, // addi x1, x0, 5
            0x00308113, // addi x2, x1, 3
        ]))
        .unwrap();

        let executed = env.run_to_completion().unwrap();

        assert_eq!(executed, 19);
        assert_eq!(env.cpu.read_reg(1), 5);
        assert_eq!(env.cpu.read_reg(2), 8);
        assert_eq!(env.cpu.state(), CpuState::Halted);
        assert_eq!(env.cpu.pc(), DEFAULT_HALT_ADDR);
        assert!(env.output().is_empty());
    }

    #[test]
    fn test_scenario_illegal_first_word() {
        let mut env = test_env();
        env.load_raw(&program_until_halt(&[0xFFFF_FFFF])).unwrap();

        let err = env.run_to_completion().unwrap_err();

        assert!(matches!(
            err,
            SimError::IllegalInstruction { pc: 0x1000, raw: 0xFFFF_FFFF }
        ));
        assert_eq!(err.exit_code(), 3);
        assert!(env.cpu.regs().iter().all(|&r| r == 0));
        assert_eq!(env.instructions_executed, 0);
    }

    #[test]
    fn test_scenario_uart_output() {
        let mut env = test_env();
        env.load_raw(&program_until_halt(&[
            0x04100113, // addi x2, x0, 0x41
            0x20200023, // sb x2, 0x200(x0)
        ]))
        .unwrap();

        env.run_to_completion().unwrap();

        assert_eq!(env.output(), b"A");
    }

    #[test]
    fn test_access_fault_exit_code() {
        let mut env = test_env();
        env.load_raw(&program_until_halt(&[
            0x000100B7, // lui x1, 0x10 (x1 = 0x10000，恰好越界)
            0x0000A103, // lw x2, 0(x1)
        ]))
        .unwrap();

        let err = env.run_to_completion().unwrap_err();

        assert!(matches!(
            err,
            SimError::AccessFault { pc: 0x1004, op: AccessOp::Load, .. }
        ));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_device_fault_exit_code() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let config = SimConfig::new().with_mem_size(0x10000);
        let mut env = SimEnv::with_output(config, Closed).unwrap();
        env.load_raw(&program_until_halt(&[0x04100113, 0x20200023])).unwrap();

        let err = env.run_to_completion().unwrap_err();

        match &err {
            SimError::DeviceFault { pc, source } => {
                assert_eq!(*pc, 0x1004);
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_empty_image() {
        let mut env = test_env();
        let err = env.load_bytes(&[]).unwrap_err();
        assert!(matches!(err, SimError::EmptyImage));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_image_too_large() {
        let mut env = test_env();
        let image = vec![0u8; 0x10000 - 0x1000 + 1];
        let err = env.load_raw(&image).unwrap_err();
        assert!(matches!(err, SimError::ImageTooLarge { len: 0xF001, load_addr: 0x1000, mem_size: 0x10000 }));

        // 恰好填满是允许的
        env.load_raw(&image[1..]).unwrap();
    }

    #[test]
    fn test_missing_image_file() {
        let config = SimConfig::new()
            .with_mem_size(0x10000)
            .with_image_path("/nonexistent/rvlite-image.bin");
        let err = SimEnv::with_output(config, Vec::new()).err().unwrap();
        assert!(matches!(err, SimError::ImageRead { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("rvlite-sim-env-{}.bin", std::process::id()));
        fs::write(&path, program_until_halt(&[0x00500093])).unwrap();

        let config = SimConfig::new().with_mem_size(0x10000).with_image_path(&path);
        let mut env = SimEnv::with_output(config, Vec::new()).unwrap();
        let result = env.run_to_completion();
        let _ = fs::remove_file(&path);

        assert_eq!(result.unwrap(), 19);
        assert_eq!(env.cpu.read_reg(1), 5);
    }

    #[test]
    fn test_elf_image() {
        // addi x1, x0, 7; addi x2, x0, 0x42; sb x2, 0x200(x0)
        let code = words_to_bytes(&[0x00700093, 0x04200113, 0x20200023]);
        let elf = minimal_elf(0x2000, 0x2000, &code, 0x20);

        let config = SimConfig::new().with_mem_size(0x10000).with_halt_addr(Some(0x2008));
        let mut env = SimEnv::with_output(config, Vec::new()).unwrap();
        env.load_bytes(&elf).unwrap();

        let info = ElfInfo::parse_bytes(&elf).unwrap();
        assert_eq!(info.address_range(), Some((0x2000, 0x2020)));
        assert!(info.segments[0].executable && !info.segments[0].writable);
        assert_eq!(env.entry_pc(), 0x2000);
        assert_eq!(env.memory.load32(0x2000).unwrap(), 0x00700093);
        // bss 清零
        assert_eq!(env.memory.load32(0x201C).unwrap(), 0);

        assert_eq!(env.run_to_completion().unwrap(), 3);
        assert_eq!(env.cpu.read_reg(1), 7);
        assert_eq!(env.output(), b"B");
    }

    #[test]
    fn test_elf_parse_rejects_wrong_machine() {
        let mut elf = minimal_elf(0x2000, 0x2000, &[0x13, 0, 0, 0], 4);
        elf[18..20].copy_from_slice(&0x3Eu16.to_le_bytes()); // x86-64
        let err = ElfInfo::parse_bytes(&elf).unwrap_err();
        assert!(matches!(err, SimError::ElfParse(_)));
    }

    #[test]
    fn test_forced_raw_format_ignores_elf_magic() {
        let config = SimConfig::new().with_mem_size(0x10000).with_format(ImageFormat::Raw);
        let mut env = SimEnv::with_output(config, Vec::new()).unwrap();
        let elf = minimal_elf(0x2000, 0x2000, &[0x13, 0, 0, 0], 4);
        env.load_bytes(&elf).unwrap();

        assert_eq!(env.entry_pc(), 0x1000);
        assert_eq!(env.memory.read_bytes(0x1000, 4).unwrap(), b"\x7FELF".to_vec());
    }

    #[test]
    fn test_entry_override() {
        let config = SimConfig::new().with_mem_size(0x10000).with_entry_pc(0x1004);
        let mut env = SimEnv::with_output(config, Vec::new()).unwrap();
        env.load_raw(&program_until_halt(&[0xFFFF_FFFF, 0x00500093])).unwrap();

        assert_eq!(env.cpu.pc(), 0x1004);
        assert_eq!(env.run_to_completion().unwrap(), 18);
    }

    #[test]
    fn test_deterministic_across_instances_and_reset() {
        let image = program_until_halt(&[
            0x00500093, // addi x1, x0, 5
            0x00308113, // addi x2, x1, 3
            0x04100193, // addi x3, x0, 0x41
            0x20300023, // sb x3, 0x200(x0)
        ]);

        let mut first = test_env();
        first.load_raw(&image).unwrap();
        first.run_to_completion().unwrap();

        let mut second = test_env();
        second.load_raw(&image).unwrap();
        second.run_to_completion().unwrap();

        assert_eq!(first.cpu.regs(), second.cpu.regs());
        assert_eq!(first.output(), second.output());

        // 复位后重新运行得到相同结果；程序写坏的内存也会恢复
        let regs = *first.cpu.regs();
        first.memory.store32(0x1000, 0xFFFF_FFFF).unwrap();
        first.reset().unwrap();
        assert_eq!(first.cpu.pc(), 0x1000);
        assert_eq!(first.instructions_executed, 0);
        first.run_to_completion().unwrap();
        assert_eq!(*first.cpu.regs(), regs);
        assert_eq!(first.output(), b"AA");
    }
}
