use super::super::{AccessOp, CpuCore};
use super::alu;
use super::{ExecFault, Retired};
use crate::isa::{IType, RType, RvInstr, SType};
use crate::memory::{MemError, Memory};

/// 执行一条 RV32I 子集指令
///
/// 访存失败时寄存器不会被写入；store 失败时内存也保持不变。
pub fn execute(
    cpu: &mut CpuCore,
    mem: &mut dyn Memory,
    instr: RvInstr,
    current_pc: u32,
) -> Result<Retired, ExecFault> {
    let next_pc = current_pc.wrapping_add(4);
    let mut store_addr = None;

    match instr {
        // ========== R-type 算术/逻辑指令 ==========
        RvInstr::Add(r) => reg_op(cpu, r, alu::add),
        RvInstr::Sub(r) => reg_op(cpu, r, alu::sub),
        RvInstr::Sll(r) => reg_op(cpu, r, alu::sll),
        RvInstr::Slt(r) => reg_op(cpu, r, alu::slt),
        RvInstr::Sltu(r) => reg_op(cpu, r, alu::sltu),
        RvInstr::Xor(r) => reg_op(cpu, r, alu::xor),
        RvInstr::Srl(r) => reg_op(cpu, r, alu::srl),
        RvInstr::Sra(r) => reg_op(cpu, r, alu::sra),
        RvInstr::Or(r) => reg_op(cpu, r, alu::or),
        RvInstr::And(r) => reg_op(cpu, r, alu::and),

        // ========== I-type 立即数算术/逻辑指令 ==========
        RvInstr::Addi(i) => imm_op(cpu, i, alu::add),
        RvInstr::Slti(i) => imm_op(cpu, i, alu::slt),
        // 立即数先符号扩展，再按无符号比较
        RvInstr::Sltiu(i) => imm_op(cpu, i, alu::sltu),
        RvInstr::Xori(i) => imm_op(cpu, i, alu::xor),
        RvInstr::Ori(i) => imm_op(cpu, i, alu::or),
        RvInstr::Andi(i) => imm_op(cpu, i, alu::and),
        // 移位量取 imm 低 5 位，由 alu 完成
        RvInstr::Slli(i) => imm_op(cpu, i, alu::sll),
        RvInstr::Srli(i) => imm_op(cpu, i, alu::srl),
        RvInstr::Srai(i) => imm_op(cpu, i, alu::sra),

        // ========== Load 指令 ==========
        RvInstr::Lb(i) => {
            let value = mem.load8(effective_addr(cpu, i.rs1, i.imm)).map_err(load_fault)?;
            cpu.write_reg(i.rd, value as i8 as i32 as u32);
        }
        RvInstr::Lh(i) => {
            let value = mem.load16(effective_addr(cpu, i.rs1, i.imm)).map_err(load_fault)?;
            cpu.write_reg(i.rd, value as i16 as i32 as u32);
        }
        RvInstr::Lw(i) => {
            let value = mem.load32(effective_addr(cpu, i.rs1, i.imm)).map_err(load_fault)?;
            cpu.write_reg(i.rd, value);
        }
        RvInstr::Lbu(i) => {
            let value = mem.load8(effective_addr(cpu, i.rs1, i.imm)).map_err(load_fault)?;
            cpu.write_reg(i.rd, value as u32);
        }
        RvInstr::Lhu(i) => {
            let value = mem.load16(effective_addr(cpu, i.rs1, i.imm)).map_err(load_fault)?;
            cpu.write_reg(i.rd, value as u32);
        }

        // ========== Store 指令 ==========
        RvInstr::Sb(s) => {
            let addr = store_target(cpu, s);
            mem.store8(addr, cpu.read_reg(s.rs2) as u8).map_err(store_fault)?;
            store_addr = Some(addr);
        }
        RvInstr::Sh(s) => {
            let addr = store_target(cpu, s);
            mem.store16(addr, cpu.read_reg(s.rs2) as u16).map_err(store_fault)?;
            store_addr = Some(addr);
        }
        RvInstr::Sw(s) => {
            let addr = store_target(cpu, s);
            mem.store32(addr, cpu.read_reg(s.rs2)).map_err(store_fault)?;
            store_addr = Some(addr);
        }

        // ========== U-type 指令 ==========
        RvInstr::Lui(u) => cpu.write_reg(u.rd, u.upper()),
        RvInstr::Auipc(u) => cpu.write_reg(u.rd, current_pc.wrapping_add(u.upper())),

        RvInstr::Illegal { raw } => return Err(ExecFault::Illegal { raw }),
    }

    Ok(Retired { next_pc, store_addr })
}

#[inline]
fn reg_op(cpu: &mut CpuCore, r: RType, op: fn(u32, u32) -> u32) {
    let result = op(cpu.read_reg(r.rs1), cpu.read_reg(r.rs2));
    cpu.write_reg(r.rd, result);
}

#[inline]
fn imm_op(cpu: &mut CpuCore, i: IType, op: fn(u32, u32) -> u32) {
    let result = op(cpu.read_reg(i.rs1), i.imm as u32);
    cpu.write_reg(i.rd, result);
}

#[inline]
fn effective_addr(cpu: &CpuCore, rs1: u8, imm: i32) -> u32 {
    cpu.read_reg(rs1).wrapping_add(imm as u32)
}

#[inline]
fn store_target(cpu: &CpuCore, s: SType) -> u32 {
    effective_addr(cpu, s.rs1, s.imm)
}

fn load_fault(fault: MemError) -> ExecFault {
    ExecFault::Access { op: AccessOp::Load, fault }
}

fn store_fault(fault: MemError) -> ExecFault {
    ExecFault::Access { op: AccessOp::Store, fault }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::decode;
    use crate::memory::FlatMemory;

    fn exec(cpu: &mut CpuCore, mem: &mut FlatMemory, raw: u32, pc: u32) -> Result<Retired, ExecFault> {
        execute(cpu, mem, decode(raw).instr, pc)
    }

    #[test]
    fn test_next_pc_is_sequential() {
        let mut cpu = CpuCore::new(0);
        let mut mem = FlatMemory::new(64, 0);
        let retired = exec(&mut cpu, &mut mem, 0x02A00093, 0x100).unwrap(); // addi x1, x0, 42
        assert_eq!(retired, Retired { next_pc: 0x104, store_addr: None });
        assert_eq!(cpu.read_reg(1), 42);
    }

    #[test]
    fn test_auipc_uses_fetch_pc() {
        let mut cpu = CpuCore::new(0);
        let mut mem = FlatMemory::new(64, 0);
        exec(&mut cpu, &mut mem, 0x00001097, 0x1000).unwrap(); // auipc x1, 0x1
        assert_eq!(cpu.read_reg(1), 0x2000);
    }

    #[test]
    fn test_sltiu_compares_sign_extended_immediate() {
        let mut cpu = CpuCore::new(0);
        let mut mem = FlatMemory::new(64, 0);
        cpu.write_reg(1, 5);
        exec(&mut cpu, &mut mem, 0xFFF0B113, 0).unwrap(); // sltiu x2, x1, -1
        assert_eq!(cpu.read_reg(2), 1);
    }

    #[test]
    fn test_store_reports_effective_address() {
        let mut cpu = CpuCore::new(0);
        let mut mem = FlatMemory::new(64, 0);
        cpu.write_reg(2, 0x10);
        cpu.write_reg(1, 0xAABB_CCDD);
        let retired = exec(&mut cpu, &mut mem, 0xFE110FA3, 0).unwrap(); // sb x1, -1(x2)
        assert_eq!(retired.store_addr, Some(0x0F));
        assert_eq!(mem.load8(0x0F).unwrap(), 0xDD);
    }

    #[test]
    fn test_load_fault_leaves_rd_untouched() {
        let mut cpu = CpuCore::new(0);
        let mut mem = FlatMemory::new(64, 0);
        cpu.write_reg(1, 7);
        cpu.write_reg(2, 62);
        let err = exec(&mut cpu, &mut mem, 0x00012083, 0).unwrap_err(); // lw x1, 0(x2)
        assert!(matches!(err, ExecFault::Access { op: AccessOp::Load, .. }));
        assert_eq!(cpu.read_reg(1), 7);
    }

    #[test]
    fn test_illegal_is_reported() {
        let mut cpu = CpuCore::new(0);
        let mut mem = FlatMemory::new(64, 0);
        assert_eq!(
            exec(&mut cpu, &mut mem, 0xFFFF_FFFF, 0),
            Err(ExecFault::Illegal { raw: 0xFFFF_FFFF })
        );
    }
}
