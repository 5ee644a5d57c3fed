//! 整数寄存器文件

/// 通用寄存器文件 x0..x31
///
/// x0 恒为 0：读返回 0，写入被丢弃。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegFile {
    regs: [u32; 32],
}

impl RegFile {
    pub fn new() -> Self {
        Self { regs: [0; 32] }
    }

    #[inline]
    pub fn read(&self, reg: u8) -> u32 {
        if reg == 0 {
            0
        } else {
            self.regs[(reg & 0x1F) as usize]
        }
    }

    #[inline]
    pub fn write(&mut self, reg: u8, value: u32) {
        if reg == 0 {
            return;
        }
        self.regs[(reg & 0x1F) as usize] = value;
    }

    pub fn snapshot(&self) -> &[u32; 32] {
        &self.regs
    }

    /// 全部清零
    pub fn clear(&mut self) {
        self.regs = [0; 32];
    }
}

impl Default for RegFile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x0_discards_writes() {
        let mut rf = RegFile::new();
        rf.write(0, 0xDEAD_BEEF);
        assert_eq!(rf.read(0), 0);
        assert_eq!(rf.snapshot()[0], 0);
    }

    #[test]
    fn test_read_write() {
        let mut rf = RegFile::new();
        for i in 1..32u8 {
            rf.write(i, i as u32 * 3);
        }
        for i in 1..32u8 {
            assert_eq!(rf.read(i), i as u32 * 3);
        }
        rf.clear();
        assert!(rf.snapshot().iter().all(|&r| r == 0));
    }
}
