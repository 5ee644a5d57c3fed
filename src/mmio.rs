//! 内存映射 I/O
//!
//! store 完成后由 CPU 调用 `StoreHook`。`ConsoleShim` 把写到设备地址的字节
//! 直接送到输出流（写穿，不缓冲），每次命中的 store 恰好输出一个字节。

use std::io::{self, Write};

use crate::memory::Memory;

/// 默认的字符设备地址
pub const DEFAULT_UART_ADDR: u32 = 0x200;

/// store 完成后的回调
pub trait StoreHook {
    /// `addr` 是刚完成的 store 的有效地址，`mem` 已包含写入后的值
    fn on_store(&mut self, addr: u32, mem: &dyn Memory) -> io::Result<()>;
}

/// 不挂任何设备
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDevice;

impl StoreHook for NoDevice {
    fn on_store(&mut self, _addr: u32, _mem: &dyn Memory) -> io::Result<()> {
        Ok(())
    }
}

/// 单字节输出设备
///
/// 只关心有效地址恰好等于 `addr` 的 store；多字节 store 输出其低字节，
/// 也就是写入后位于 `addr` 处的那个字节。
pub struct ConsoleShim<W: Write> {
    addr: u32,
    out: W,
    emitted: u64,
}

impl<W: Write> ConsoleShim<W> {
    pub fn new(addr: u32, out: W) -> Self {
        Self { addr, out, emitted: 0 }
    }

    pub fn addr(&self) -> u32 {
        self.addr
    }

    /// 已输出的字节数
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }
}

impl<W: Write> StoreHook for ConsoleShim<W> {
    fn on_store(&mut self, addr: u32, mem: &dyn Memory) -> io::Result<()> {
        if addr != self.addr {
            return Ok(());
        }

        let byte = mem.load8(addr).map_err(io::Error::other)?;
        self.out.write_all(&[byte])?;
        self.out.flush()?;
        self.emitted += 1;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FlatMemory;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_one_byte_per_device_store() {
        let mut mem = FlatMemory::new(0x400, 0);
        let mut shim = ConsoleShim::new(0x200, Vec::new());

        mem.store8(0x200, b'h').unwrap();
        shim.on_store(0x200, &mem).unwrap();
        mem.store8(0x200, b'i').unwrap();
        shim.on_store(0x200, &mem).unwrap();

        assert_eq!(shim.output(), b"hi");
        assert_eq!(shim.emitted(), 2);
    }

    #[test]
    fn test_word_store_emits_low_byte() {
        let mut mem = FlatMemory::new(0x400, 0);
        let mut shim = ConsoleShim::new(0x200, Vec::new());

        mem.store32(0x200, 0x4443_4241).unwrap();
        shim.on_store(0x200, &mem).unwrap();

        assert_eq!(shim.output(), b"A");
    }

    #[test]
    fn test_other_addresses_are_ignored() {
        let mut mem = FlatMemory::new(0x400, 0);
        let mut shim = ConsoleShim::new(0x200, Vec::new());

        // 覆盖设备地址但起始地址不同
        mem.store32(0x1FF, 0x4141_4141).unwrap();
        shim.on_store(0x1FF, &mem).unwrap();
        shim.on_store(0x201, &mem).unwrap();

        assert!(shim.output().is_empty());
    }

    #[test]
    fn test_no_re_emission_without_store() {
        let mut mem = FlatMemory::new(0x400, 0);
        let mut shim = ConsoleShim::new(0x200, Vec::new());

        mem.store8(0x200, b'x').unwrap();
        shim.on_store(0x200, &mem).unwrap();
        // 后续非设备 store 不会重复输出
        mem.store8(0x300, b'y').unwrap();
        shim.on_store(0x300, &mem).unwrap();

        assert_eq!(shim.into_output(), b"x".to_vec());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut mem = FlatMemory::new(0x400, 0);
        let mut shim = ConsoleShim::new(0x200, BrokenPipe);

        mem.store8(0x200, b'x').unwrap();
        let err = shim.on_store(0x200, &mem).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(shim.emitted(), 0);
    }
}
