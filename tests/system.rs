mod common;

use common::{context, load, memory, steps, CODE, SD, STACK};
use pretty_assertions::assert_eq;
use vm68k::{AddressSpace, Ccr, ExecUnit, Fault, LongWordSize, WordSize};

#[test]
fn move_to_sr_is_privileged() {
    let mut mem = memory();
    // MOVE #0,SR
    load(&mut mem, &[0x46FC, 0x0000]);
    let unit = ExecUnit::mc68000();
    let mut ctx = context(&mut mem);
    ctx.set_supervisor_state(false);

    let fault = unit.step(&mut ctx).unwrap_err();
    assert_eq!(fault, Fault::PrivilegeViolation { opcode: 0x46FC, pc: CODE });
    assert_eq!(fault.exit_status(), 128 + 8);
    assert_eq!(ctx.regs.pc, CODE);
}

#[test]
fn clearing_s_bit_swaps_stacks() {
    let mut mem = memory();
    // ANDI #$DFFF,SR
    load(&mut mem, &[0x027C, 0xDFFF]);
    let unit = ExecUnit::mc68000();
    let mut ctx = context(&mut mem);
    ctx.regs.set_usp(0x6000);

    steps(&unit, &mut ctx, 1);
    assert!(!ctx.supervisor_state());
    assert_eq!(ctx.regs.a[7], 0x6000);
    assert_eq!(ctx.regs.ssp(), STACK);
    assert_eq!(ctx.regs.pc, CODE + 4);
}

#[test]
fn ccr_logic_leaves_system_byte() {
    let mut mem = memory();
    // ORI #$11,CCR ; EORI #$01,CCR
    load(&mut mem, &[0x003C, 0x0011, 0x0A3C, 0x0001]);
    let unit = ExecUnit::mc68000();
    let mut ctx = context(&mut mem);
    ctx.regs.cc.set_ccr(Ccr::empty());

    steps(&unit, &mut ctx, 2);
    assert_eq!(ctx.regs.cc.ccr(), Ccr::X);
    assert_eq!(ctx.sr(), 0x2710);
}

#[test]
fn rte_restores_user_state() {
    let mut mem = memory();
    // RTE
    load(&mut mem, &[0x4E73]);
    let unit = ExecUnit::mc68000();
    let mut ctx = context(&mut mem);
    ctx.regs.set_usp(0x6000);
    ctx.push::<LongWordSize>(0x2000).unwrap();
    ctx.push::<WordSize>(0x0004).unwrap();

    steps(&unit, &mut ctx, 1);
    assert_eq!(ctx.regs.pc, 0x2000);
    assert!(!ctx.supervisor_state());
    assert!(ctx.regs.cc.eq());
    assert_eq!(ctx.regs.a[7], 0x6000);
    assert_eq!(ctx.regs.ssp(), STACK);
}

#[test]
fn move_usp_both_ways() {
    let mut mem = memory();
    // MOVE A0,USP ; MOVE USP,A1
    load(&mut mem, &[0x4E60, 0x4E69]);
    let unit = ExecUnit::mc68000();
    let mut ctx = context(&mut mem);
    ctx.regs.a[0] = 0x5000;

    steps(&unit, &mut ctx, 2);
    assert_eq!(ctx.regs.usp(), 0x5000);
    assert_eq!(ctx.regs.a[1], 0x5000);
    assert_eq!(ctx.regs.a[7], STACK);
}

#[test]
fn movem_save_and_restore() {
    let mut mem = memory();
    // MOVEM.L D0-D1/A0,-(A7) ; MOVEM.L (A7)+,D2-D3/A1
    load(&mut mem, &[0x48E7, 0xC080, 0x4CDF, 0x020C]);
    let unit = ExecUnit::mc68000();
    let mut ctx = context(&mut mem);
    ctx.regs.d[0] = 0x1111_1111;
    ctx.regs.d[1] = 0x2222_2222;
    ctx.regs.a[0] = 0x3333_3333;

    steps(&unit, &mut ctx, 1);
    assert_eq!(ctx.regs.a[7], STACK - 12);
    assert_eq!(ctx.mem.get_long(SD, STACK - 12).unwrap(), 0x1111_1111);
    assert_eq!(ctx.mem.get_long(SD, STACK - 8).unwrap(), 0x2222_2222);
    assert_eq!(ctx.mem.get_long(SD, STACK - 4).unwrap(), 0x3333_3333);

    steps(&unit, &mut ctx, 1);
    assert_eq!(ctx.regs.a[7], STACK);
    assert_eq!(
        (ctx.regs.d[2], ctx.regs.d[3], ctx.regs.a[1]),
        (0x1111_1111, 0x2222_2222, 0x3333_3333)
    );
    assert_eq!(ctx.regs.pc, CODE + 8);
}

#[test]
fn movem_word_load_sign_extends() {
    let mut mem = memory();
    mem.put_word(SD, 0x3000, 0x8000).unwrap();
    mem.put_word(SD, 0x3002, 0x7FFF).unwrap();
    // MOVEM.W (A0),D0/A2
    load(&mut mem, &[0x4C90, 0x0401]);
    let unit = ExecUnit::mc68000();
    let mut ctx = context(&mut mem);
    ctx.regs.a[0] = 0x3000;

    steps(&unit, &mut ctx, 1);
    assert_eq!(ctx.regs.d[0], 0xFFFF_8000);
    assert_eq!(ctx.regs.a[2], 0x0000_7FFF);
    assert_eq!(ctx.regs.a[0], 0x3000);
}

#[test]
fn link_and_unlink() {
    let mut mem = memory();
    // LINK A6,#-8 ; UNLK A6
    load(&mut mem, &[0x4E56, 0xFFF8, 0x4E5E]);
    let unit = ExecUnit::mc68000();
    let mut ctx = context(&mut mem);
    ctx.regs.a[6] = 0xCAFE;

    steps(&unit, &mut ctx, 1);
    assert_eq!(ctx.regs.a[6], STACK - 4);
    assert_eq!(ctx.regs.a[7], STACK - 12);
    assert_eq!(ctx.mem.get_long(SD, STACK - 4).unwrap(), 0xCAFE);

    steps(&unit, &mut ctx, 1);
    assert_eq!(ctx.regs.a[6], 0xCAFE);
    assert_eq!(ctx.regs.a[7], STACK);
}

#[test]
fn interrupt_above_mask_is_taken() {
    let mut mem = memory();
    mem.put_long(SD, 27 * 4, 0x3000).unwrap();
    // NOP at the handler
    mem.put_word(SD, 0x3000, 0x4E71).unwrap();
    load(&mut mem, &[0x4E71]);
    let unit = ExecUnit::mc68000();
    let mut ctx = context(&mut mem);
    ctx.set_sr(0x2200);

    ctx.interrupt(2, 26);
    steps(&unit, &mut ctx, 1);
    // level 2 is masked
    assert_eq!(ctx.regs.pc, CODE + 2);
    assert!(ctx.interrupt_pending());

    ctx.interrupt(3, 27);
    steps(&unit, &mut ctx, 1);
    assert_eq!(ctx.regs.pc, 0x3002);
    assert_eq!(ctx.regs.interrupt_mask(), 3);
    assert_eq!(ctx.mem.get_word(SD, STACK - 6).unwrap(), 0x2200);
    assert_eq!(ctx.mem.get_long(SD, STACK - 4).unwrap(), CODE + 2);
    assert!(ctx.interrupt_pending());
}

#[test]
fn link_on_the_stack_pointer() {
    let mut mem = memory();
    // LINK A7,#-4
    load(&mut mem, &[0x4E57, 0xFFFC]);
    let unit = ExecUnit::mc68000();
    let mut ctx = context(&mut mem);

    steps(&unit, &mut ctx, 1);
    assert_eq!(ctx.mem.get_long(SD, STACK - 4).unwrap(), STACK - 4);
    assert_eq!(ctx.regs.a[7], STACK - 8);
    assert_eq!(ctx.regs.pc, CODE + 4);
}
