//! 内存抽象层
//!
//! 本模块定义了内存访问的统一接口 `Memory` trait，
//! 以及覆盖整个物理地址空间的线性内存实现 `FlatMemory`。
//!
//! 所有访问都做越界检查，越界时返回 `MemError`，不会静默读写。
//! 不要求对齐：非对齐的半字/字访问是合法的。

use thiserror::Error;

/// 默认内存大小：256 MiB
pub const DEFAULT_MEMORY_SIZE: usize = 0x1000_0000;

/// 访存粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessSize {
    Byte,
    Half,
    Word,
}

impl AccessSize {
    pub fn bytes(self) -> usize {
        match self {
            AccessSize::Byte => 1,
            AccessSize::Half => 2,
            AccessSize::Word => 4,
        }
    }
}

/// 内存访问错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemError {
    /// 地址越界（未映射到当前内存区域）
    #[error(
        "out-of-range {access:?} access at 0x{addr:08x} (region=0x{base:08x}..0x{end:08x})",
        end = region_end(.base, .size)
    )]
    OutOfRange { addr: u32, access: AccessSize, base: u32, size: usize },
}

pub type MemResult<T> = Result<T, MemError>;

fn region_end(base: &u32, size: &usize) -> u64 {
    *base as u64 + *size as u64
}

/// 内存访问的统一接口
///
/// 多字节访问一律小端序。
pub trait Memory {
    /// 从指定地址读取 8 位数据
    fn load8(&self, addr: u32) -> MemResult<u8>;

    /// 从指定地址读取 16 位数据
    fn load16(&self, addr: u32) -> MemResult<u16>;

    /// 从指定地址读取 32 位数据
    fn load32(&self, addr: u32) -> MemResult<u32>;

    /// 向指定地址写入 8 位数据
    fn store8(&mut self, addr: u32, value: u8) -> MemResult<()>;

    /// 向指定地址写入 16 位数据
    fn store16(&mut self, addr: u32, value: u16) -> MemResult<()>;

    /// 向指定地址写入 32 位数据
    fn store32(&mut self, addr: u32, value: u32) -> MemResult<()>;
}

/// 简单线性内存实现
///
/// 使用 `Vec<u8>` 存储整个地址空间，分配时全部清零。
/// 支持可选的基地址偏移，用于模拟内存映射。
pub struct FlatMemory {
    /// 内存数据存储
    data: Vec<u8>,
    /// 内存映射起始地址
    base_addr: u32,
}

impl FlatMemory {
    /// 创建一个指定大小的内存区域
    ///
    /// # 参数
    ///
    /// * `size` - 内存大小（字节数）
    /// * `base_addr` - 内存映射的起始地址
    ///
    /// # 示例
    ///
    /// ```
    /// use rvlite::memory::FlatMemory;
    ///
    /// // 创建 64KB 的内存，起始地址为 0
    /// let mem = FlatMemory::new(64 * 1024, 0);
    /// assert_eq!(mem.size(), 64 * 1024);
    /// ```
    pub fn new(size: usize, base_addr: u32) -> Self {
        FlatMemory {
            data: vec![0; size],
            base_addr,
        }
    }

    /// 获取内存的基地址
    pub fn base_addr(&self) -> u32 {
        self.base_addr
    }

    /// 获取内存的大小
    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn bounds_check(&self, addr: u32, len: usize, access: AccessSize) -> MemResult<usize> {
        let out_of_range = MemError::OutOfRange {
            addr,
            access,
            base: self.base_addr,
            size: self.data.len(),
        };

        let relative = addr.checked_sub(self.base_addr).ok_or(out_of_range)? as usize;
        let end = relative.checked_add(len).ok_or(out_of_range)?;
        if end > self.data.len() {
            return Err(out_of_range);
        }

        Ok(relative)
    }

    fn index(&self, addr: u32, access: AccessSize) -> MemResult<usize> {
        self.bounds_check(addr, access.bytes(), access)
    }

    /// 批量写入数据到内存
    ///
    /// 整段必须落在内存内，否则不写入任何字节并返回错误。
    pub fn write_bytes(&mut self, addr: u32, data: &[u8]) -> MemResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let start = self.bounds_check(addr, data.len(), AccessSize::Byte)?;
        let end = start + data.len();
        self.data[start..end].copy_from_slice(data);
        Ok(())
    }

    /// 批量读取数据，返回副本
    pub fn read_bytes(&self, addr: u32, len: usize) -> MemResult<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let start = self.bounds_check(addr, len, AccessSize::Byte)?;
        let end = start + len;
        Ok(self.data[start..end].to_vec())
    }

    /// 将指定范围填充为固定字节
    pub fn fill(&mut self, addr: u32, len: usize, value: u8) -> MemResult<()> {
        if len == 0 {
            return Ok(());
        }
        let start = self.bounds_check(addr, len, AccessSize::Byte)?;
        let end = start + len;
        self.data[start..end].fill(value);
        Ok(())
    }
}

impl Memory for FlatMemory {
    fn load8(&self, addr: u32) -> MemResult<u8> {
        let idx = self.index(addr, AccessSize::Byte)?;
        Ok(self.data[idx])
    }

    fn load16(&self, addr: u32) -> MemResult<u16> {
        let idx = self.index(addr, AccessSize::Half)?;
        Ok(u16::from_le_bytes([self.data[idx], self.data[idx + 1]]))
    }

    fn load32(&self, addr: u32) -> MemResult<u32> {
        let idx = self.index(addr, AccessSize::Word)?;
        Ok(u32::from_le_bytes([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]))
    }

    fn store8(&mut self, addr: u32, value: u8) -> MemResult<()> {
        let idx = self.index(addr, AccessSize::Byte)?;
        self.data[idx] = value;
        Ok(())
    }

    fn store16(&mut self, addr: u32, value: u16) -> MemResult<()> {
        let idx = self.index(addr, AccessSize::Half)?;
        self.data[idx..idx + 2].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn store32(&mut self, addr: u32, value: u32) -> MemResult<()> {
        let idx = self.index(addr, AccessSize::Word)?;
        self.data[idx..idx + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}
