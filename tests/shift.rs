mod common;

use common::{context, load, memory, steps, SD};
use pretty_assertions::assert_eq;
use vm68k::{AddressSpace, Ccr, Context, ExecUnit, MemoryMap, Registers};

fn run(mem: &mut MemoryMap, op: u16, setup: impl FnOnce(&mut Context<'_>)) -> Registers {
    load(mem, &[op]);
    let unit = ExecUnit::mc68000();
    let mut ctx = context(mem);
    setup(&mut ctx);
    steps(&unit, &mut ctx, 1);
    ctx.regs
}

#[test]
fn logical_shift_left_word() {
    let mut mem = memory();
    // LSL.W #1,D0
    let regs = run(&mut mem, 0xE348, |ctx| ctx.regs.d[0] = 0x1234_8001);
    assert_eq!(regs.d[0], 0x1234_0002);
    assert!(regs.cc.cs() && regs.cc.x());
    assert!(!regs.cc.vs());
}

#[test]
fn arithmetic_shift_right_keeps_sign() {
    let mut mem = memory();
    // ASR.B #2,D0
    let regs = run(&mut mem, 0xE400, |ctx| ctx.regs.d[0] = 0x82);
    assert_eq!(regs.d[0], 0xE0);
    assert!(regs.cc.mi());
    assert!(regs.cc.cs() && regs.cc.x());
}

#[test]
fn arithmetic_shift_left_overflow() {
    let mut mem = memory();
    // ASL.B #1,D0
    let regs = run(&mut mem, 0xE300, |ctx| ctx.regs.d[0] = 0x40);
    assert_eq!(regs.d[0], 0x80);
    assert!(regs.cc.vs());
    assert!(!regs.cc.cs());
}

#[test]
fn rotate_leaves_extend_alone() {
    let mut mem = memory();
    // ROL.W #4,D0
    let regs = run(&mut mem, 0xE958, |ctx| {
        ctx.regs.cc.set_ccr(Ccr::empty());
        ctx.regs.d[0] = 0x1234;
    });
    assert_eq!(regs.d[0], 0x2341);
    assert!(regs.cc.cs());
    assert!(!regs.cc.x());
}

#[test]
fn rotate_through_extend() {
    let mut mem = memory();
    // ROXR.B #1,D0
    let regs = run(&mut mem, 0xE210, |ctx| {
        ctx.regs.cc.set_ccr(Ccr::X);
        ctx.regs.d[0] = 0x01;
    });
    assert_eq!(regs.d[0], 0x80);
    assert!(regs.cc.x() && regs.cc.cs() && regs.cc.mi());
}

#[test]
fn register_count_of_zero_only_sets_n_and_z() {
    let mut mem = memory();
    // LSR.L D1,D0
    let regs = run(&mut mem, 0xE2A8, |ctx| {
        ctx.regs.cc.set_ccr(Ccr::X | Ccr::C);
        ctx.regs.d[0] = 0x8000_0000;
        ctx.regs.d[1] = 64;
    });
    assert_eq!(regs.d[0], 0x8000_0000);
    assert!(regs.cc.mi());
    assert!(!regs.cc.cs());
    assert!(regs.cc.x());
}

#[test]
fn memory_shift_is_one_word_bit() {
    let mut mem = memory();
    mem.put_word(SD, 0x3000, 0xC000).unwrap();
    // ASL.W (A0)
    load(&mut mem, &[0xE1D0]);
    let unit = ExecUnit::mc68000();
    let mut ctx = context(&mut mem);
    ctx.regs.a[0] = 0x3000;

    steps(&unit, &mut ctx, 1);
    assert_eq!(ctx.mem.get_word(SD, 0x3000).unwrap(), 0x8000);
    assert!(ctx.regs.cc.cs());
    assert!(!ctx.regs.cc.vs());
}

#[test]
fn rotate_right_byte() {
    let mut mem = memory();
    // ROR.B #1,D0
    let regs = run(&mut mem, 0xE218, |ctx| {
        ctx.regs.cc.set_ccr(Ccr::X);
        ctx.regs.d[0] = 0xFFFF_FF01;
    });
    assert_eq!(regs.d[0], 0xFFFF_FF80);
    assert!(regs.cc.cs() && regs.cc.mi());
    assert!(regs.cc.x());
}

#[test]
fn rotate_left_long_by_register() {
    let mut mem = memory();
    // ROL.L D1,D0
    let regs = run(&mut mem, 0xE3B8, |ctx| {
        ctx.regs.d[0] = 0x8000_0001;
        ctx.regs.d[1] = 4;
    });
    assert_eq!(regs.d[0], 0x0000_0018);
    assert!(!regs.cc.cs());
    assert!(regs.cc.pl() && regs.cc.ne());
}

#[test]
fn rotate_left_through_extend() {
    let mut mem = memory();
    // ROXL.W #1,D0
    let regs = run(&mut mem, 0xE350, |ctx| {
        ctx.regs.cc.set_ccr(Ccr::empty());
        ctx.regs.d[0] = 0x8000;
    });
    assert_eq!(regs.d[0], 0);
    assert!(regs.cc.eq());
    assert!(regs.cc.x() && regs.cc.cs());
}

#[test]
fn rotate_right_memory_word() {
    let mut mem = memory();
    mem.put_word(SD, 0x3000, 0x0001).unwrap();
    // ROR.W (A0)
    load(&mut mem, &[0xE6D0]);
    let unit = ExecUnit::mc68000();
    let mut ctx = context(&mut mem);
    ctx.regs.a[0] = 0x3000;

    steps(&unit, &mut ctx, 1);
    assert_eq!(ctx.mem.get_word(SD, 0x3000).unwrap(), 0x8000);
    assert!(ctx.regs.cc.cs() && ctx.regs.cc.mi());
}
