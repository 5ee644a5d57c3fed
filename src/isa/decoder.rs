//! 解码器框架
//!
//! `InstrDecoder` 描述一组指令规则，`DecoderRegistry` 按 opcode 分桶调度，
//! 并在注册时拒绝与已有规则冲突的解码器，保证任意指令字至多匹配一条规则。

use std::fmt;
use std::sync::Arc;

use super::instr::DecodedInstr;
use super::instr_def::{find_conflicts, ConflictInfo, InstrDef};

/// 指令解码器 trait
pub trait InstrDecoder: Send + Sync {
    /// 解码器名称
    fn name(&self) -> &str;

    /// 尝试解码指令，无法识别时返回 `None`
    fn decode(&self, raw: u32) -> Option<DecodedInstr>;

    /// 此解码器的全部规则（用于冲突检测）
    fn instrs(&self) -> &[InstrDef];

    /// 此解码器处理的 opcode 列表
    fn handled_opcodes(&self) -> &[u8];
}

/// 解码器注册表
pub struct DecoderRegistry {
    /// 注册的解码器列表（按注册顺序）
    decoders: Vec<Arc<dyn InstrDecoder>>,
    /// 按 opcode 分桶的解码器索引
    opcode_map: [Vec<usize>; 128],
}

impl DecoderRegistry {
    /// 创建空的解码器注册表
    pub fn new() -> Self {
        Self {
            decoders: Vec::new(),
            opcode_map: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// 创建包含 RV32I 子集解码器的注册表
    pub fn with_rv32i() -> Self {
        let mut registry = Self::new();
        if let Err(conflicts) = registry.register(Arc::new(super::rv32i::RV32I_DECODER)) {
            // 空注册表上不可能冲突，单表内部冲突由测试保证
            unreachable!("RV32I table conflicts: {:?}", conflicts);
        }
        registry
    }

    /// 注册一个解码器
    ///
    /// 规则自身或与已注册规则存在重叠时返回全部冲突，注册表保持不变。
    pub fn register(&mut self, decoder: Arc<dyn InstrDecoder>) -> Result<(), Vec<ConflictInfo>> {
        let existing = self.decoders.iter().flat_map(|d| d.instrs().iter());
        let conflicts = find_conflicts(existing.chain(decoder.instrs().iter()));
        if !conflicts.is_empty() {
            return Err(conflicts);
        }

        let idx = self.decoders.len();
        for &op in decoder.handled_opcodes() {
            self.opcode_map[(op & 0x7F) as usize].push(idx);
        }
        log::debug!(
            "registered decoder {} ({} rules)",
            decoder.name(),
            decoder.instrs().len()
        );
        self.decoders.push(decoder);

        Ok(())
    }

    /// 解码指令
    ///
    /// 只询问声明了该 opcode 的解码器，未命中时得到 `Illegal`
    pub fn decode(&self, raw: u32) -> DecodedInstr {
        let opcode = (raw & 0x7F) as usize;

        self.opcode_map[opcode]
            .iter()
            .find_map(|&idx| self.decoders[idx].decode(raw))
            .unwrap_or_else(|| DecodedInstr::illegal(raw))
    }

    /// 所有已注册的规则
    pub fn instrs(&self) -> impl Iterator<Item = &InstrDef> {
        self.decoders.iter().flat_map(|d| d.instrs().iter())
    }

    /// 获取已注册的解码器数量
    pub fn decoder_count(&self) -> usize {
        self.decoders.len()
    }

    /// 列出所有已注册的解码器名称
    pub fn decoder_names(&self) -> Vec<&str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_rv32i()
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("decoders", &self.decoder_names())
            .finish()
    }
}
