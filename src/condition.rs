use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::size::OperandSize;

bitflags! {
    /// Materialised condition code register (low byte of SR).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Ccr: u8 {
        const C = 1 << 0;
        const V = 1 << 1;
        const Z = 1 << 2;
        const N = 1 << 3;
        const X = 1 << 4;
    }
}

/// Evaluator strategy for a deferred flag computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Kind {
    /// Flags depend on the result alone; V and C clear.
    Generic,
    /// `[result, destination, source]` of an addition.
    Add,
    /// `[result, destination, source]` of `destination - source`.
    Sub,
    /// `[result, original, count]`; the shift kinds need the operand width.
    Asl,
    Asr,
    Lsl,
    Lsr,
    /// `[result]`; carry is the bit rotated in last.
    Rol,
    Ror,
    /// `[ccr bits]`.
    Explicit,
}

/// Raw operands captured at the time flags were set. Values are sign-extended
/// from the operand width so the evaluators are width independent, except the
/// shift kinds which need `bits` to locate the carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Evaluation {
    kind: Kind,
    values: [i32; 3],
    bits: u32,
}

impl Evaluation {
    const fn new(kind: Kind, values: [i32; 3], bits: u32) -> Self {
        Self { kind, values, bits }
    }

    fn mask(&self) -> u32 {
        u32::MAX >> (32 - self.bits)
    }

    fn mi(&self) -> bool {
        match self.kind {
            Kind::Explicit => self.values[0] & Ccr::N.bits() as i32 != 0,
            _ => self.values[0] < 0,
        }
    }

    fn eq(&self) -> bool {
        match self.kind {
            Kind::Explicit => self.values[0] & Ccr::Z.bits() as i32 != 0,
            _ => self.values[0] == 0,
        }
    }

    fn vs(&self) -> bool {
        let [r, d, s] = self.values;
        match self.kind {
            Kind::Add => (s ^ r) & (d ^ r) < 0,
            Kind::Sub => (s ^ d) & (r ^ d) < 0,
            Kind::Asl => {
                let count = s as u32;
                if count >= self.bits {
                    d != 0
                } else {
                    // every bit shifted through the sign position must match it
                    let top = d >> (self.bits - 1 - count);
                    top != 0 && top != -1
                }
            }
            Kind::Explicit => r & Ccr::V.bits() as i32 != 0,
            _ => false,
        }
    }

    fn cs(&self) -> bool {
        let [r, d, s] = self.values;
        match self.kind {
            Kind::Generic => false,
            Kind::Add => (s & d) | (!r & d) | (s & !r) < 0,
            Kind::Sub => (s & !d) | (r & !d) | (s & r) < 0,
            Kind::Asl | Kind::Lsl => {
                let count = s as u32;
                count <= self.bits && (d as u32 & self.mask()) >> (self.bits - count) & 1 != 0
            }
            Kind::Asr => {
                let count = s as u32;
                if count > self.bits {
                    d < 0
                } else {
                    (d >> (count - 1)) & 1 != 0
                }
            }
            Kind::Lsr => {
                let count = s as u32;
                count <= self.bits && (d as u32 & self.mask()) >> (count - 1) & 1 != 0
            }
            Kind::Rol => r & 1 != 0,
            Kind::Ror => r < 0,
            Kind::Explicit => r & Ccr::C.bits() as i32 != 0,
        }
    }

    fn lt(&self) -> bool {
        self.mi() != self.vs()
    }

    /// X flag when this evaluation is the extend evaluation.
    fn extend(&self) -> bool {
        match self.kind {
            Kind::Explicit => self.values[0] & Ccr::X.bits() as i32 != 0,
            _ => self.cs(),
        }
    }
}

/// Deferred condition codes. N/Z/V/C and X are tracked by two independent
/// evaluations because many instructions set the former but preserve X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCodes {
    cc: Evaluation,
    x: Evaluation,
}

impl Default for ConditionCodes {
    fn default() -> Self {
        let cleared = Evaluation::new(Kind::Explicit, [0; 3], 32);
        Self {
            cc: cleared,
            x: cleared,
        }
    }
}

impl ConditionCodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// N and Z from `result`, V and C cleared. X untouched.
    pub fn set_cc(&mut self, result: i32) {
        self.cc = Evaluation::new(Kind::Generic, [result, 0, 0], 32);
    }

    pub fn set_cc_as_add(&mut self, result: i32, dest: i32, src: i32) {
        self.cc = Evaluation::new(Kind::Add, [result, dest, src], 32);
        self.x = self.cc;
    }

    pub fn set_cc_sub(&mut self, result: i32, dest: i32, src: i32) {
        self.cc = Evaluation::new(Kind::Sub, [result, dest, src], 32);
        self.x = self.cc;
    }

    /// Like `set_cc_sub` but X untouched.
    pub fn set_cc_cmp(&mut self, result: i32, dest: i32, src: i32) {
        self.cc = Evaluation::new(Kind::Sub, [result, dest, src], 32);
    }

    pub fn set_cc_asl<S: OperandSize>(&mut self, result: i32, original: i32, count: u32) {
        self.set_shift(Kind::Asl, S::BITS, result, original, count);
    }

    pub fn set_cc_asr<S: OperandSize>(&mut self, result: i32, original: i32, count: u32) {
        self.set_shift(Kind::Asr, S::BITS, result, original, count);
    }

    pub fn set_cc_lsl<S: OperandSize>(&mut self, result: i32, original: i32, count: u32) {
        self.set_shift(Kind::Lsl, S::BITS, result, original, count);
    }

    pub fn set_cc_lsr<S: OperandSize>(&mut self, result: i32, original: i32, count: u32) {
        self.set_shift(Kind::Lsr, S::BITS, result, original, count);
    }

    /// Rotate without extend; X untouched. `count` must be non-zero.
    pub fn set_cc_rol(&mut self, result: i32) {
        self.cc = Evaluation::new(Kind::Rol, [result, 0, 0], 32);
    }

    pub fn set_cc_ror(&mut self, result: i32) {
        self.cc = Evaluation::new(Kind::Ror, [result, 0, 0], 32);
    }

    /// A shift with a zero count only sets N and Z; callers use `set_cc`.
    fn set_shift(&mut self, kind: Kind, bits: u32, result: i32, original: i32, count: u32) {
        debug_assert!(count != 0);
        self.cc = Evaluation::new(kind, [result, original, count as i32], bits);
        self.x = self.cc;
    }

    /// Sets N, Z, V and C explicitly, X untouched.
    pub fn set_flags(&mut self, n: bool, z: bool, v: bool, c: bool) {
        let mut ccr = Ccr::empty();
        ccr.set(Ccr::N, n);
        ccr.set(Ccr::Z, z);
        ccr.set(Ccr::V, v);
        ccr.set(Ccr::C, c);
        self.cc = Evaluation::new(Kind::Explicit, [ccr.bits() as i32, 0, 0], 32);
    }

    /// Replaces the Z flag only.
    pub fn set_z(&mut self, z: bool) {
        let mut ccr = self.ccr();
        ccr.set(Ccr::Z, z);
        self.cc = Evaluation::new(Kind::Explicit, [ccr.bits() as i32, 0, 0], 32);
    }

    /// Materialises all five flags.
    pub fn ccr(&self) -> Ccr {
        let mut ccr = Ccr::empty();
        ccr.set(Ccr::X, self.x());
        ccr.set(Ccr::N, self.mi());
        ccr.set(Ccr::Z, self.eq());
        ccr.set(Ccr::V, self.vs());
        ccr.set(Ccr::C, self.cs());
        ccr
    }

    /// Replaces all five flags.
    pub fn set_ccr(&mut self, ccr: Ccr) {
        self.cc = Evaluation::new(Kind::Explicit, [ccr.bits() as i32, 0, 0], 32);
        self.x = self.cc;
    }

    pub fn eq(&self) -> bool {
        self.cc.eq()
    }

    pub fn ne(&self) -> bool {
        !self.eq()
    }

    pub fn mi(&self) -> bool {
        self.cc.mi()
    }

    pub fn pl(&self) -> bool {
        !self.mi()
    }

    pub fn vs(&self) -> bool {
        self.cc.vs()
    }

    pub fn vc(&self) -> bool {
        !self.vs()
    }

    pub fn cs(&self) -> bool {
        self.cc.cs()
    }

    pub fn cc(&self) -> bool {
        !self.cs()
    }

    pub fn lt(&self) -> bool {
        self.cc.lt()
    }

    pub fn ge(&self) -> bool {
        !self.lt()
    }

    pub fn le(&self) -> bool {
        self.eq() || self.lt()
    }

    pub fn gt(&self) -> bool {
        !self.le()
    }

    pub fn ls(&self) -> bool {
        self.cs() || self.eq()
    }

    pub fn hi(&self) -> bool {
        !self.ls()
    }

    pub fn x(&self) -> bool {
        self.x.extend()
    }
}

/// The sixteen conditions encoded in bits 8..11 of `Bcc`, `DBcc` and `Scc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    T,
    F,
    Hi,
    Ls,
    Cc,
    Cs,
    Ne,
    Eq,
    Vc,
    Vs,
    Pl,
    Mi,
    Ge,
    Lt,
    Gt,
    Le,
}

impl Condition {
    pub fn from_opcode(opcode: u16) -> Self {
        const ALL: [Condition; 16] = [
            Condition::T,
            Condition::F,
            Condition::Hi,
            Condition::Ls,
            Condition::Cc,
            Condition::Cs,
            Condition::Ne,
            Condition::Eq,
            Condition::Vc,
            Condition::Vs,
            Condition::Pl,
            Condition::Mi,
            Condition::Ge,
            Condition::Lt,
            Condition::Gt,
            Condition::Le,
        ];
        ALL[(opcode >> 8 & 0xF) as usize]
    }

    pub fn test(self, cc: &ConditionCodes) -> bool {
        match self {
            Self::T => true,
            Self::F => false,
            Self::Hi => cc.hi(),
            Self::Ls => cc.ls(),
            Self::Cc => cc.cc(),
            Self::Cs => cc.cs(),
            Self::Ne => cc.ne(),
            Self::Eq => cc.eq(),
            Self::Vc => cc.vc(),
            Self::Vs => cc.vs(),
            Self::Pl => cc.pl(),
            Self::Mi => cc.mi(),
            Self::Ge => cc.ge(),
            Self::Lt => cc.lt(),
            Self::Gt => cc.gt(),
            Self::Le => cc.le(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::size::{ByteSize, LongWordSize, WordSize};
    use pretty_assertions::assert_eq;

    fn w(v: u32) -> i32 {
        WordSize::svalue(v)
    }

    #[test]
    fn add_word_overflow_into_negative() {
        let mut cc = ConditionCodes::new();
        cc.set_cc_as_add(w(0x8000), w(0x7FFF), w(1));
        assert!(cc.mi());
        assert!(cc.vs());
        assert!(!cc.cs());
        assert!(!cc.eq());
        // the true sum is positive, so the signed comparison is not "less than"
        assert!(!cc.lt());
        assert!(cc.gt());
    }

    #[test]
    fn add_carry_out() {
        let mut cc = ConditionCodes::new();
        cc.set_cc_as_add(w(0), w(0xFFFF), w(1));
        assert!(cc.cs());
        assert!(cc.x());
        assert!(cc.eq());
        assert!(!cc.vs());
    }

    #[test]
    fn sub_and_cmp_equal_operands() {
        let mut cc = ConditionCodes::new();
        cc.set_cc_sub(0, w(0x1234), w(0x1234));
        assert!(cc.eq() && !cc.cs() && !cc.x());
        cc.set_ccr(Ccr::X);
        cc.set_cc_cmp(0, w(0x1234), w(0x1234));
        assert!(cc.eq());
        assert!(!cc.cs());
        assert!(cc.x(), "compare leaves X alone");
    }

    #[test]
    fn sub_borrow_and_unsigned_conditions() {
        let mut cc = ConditionCodes::new();
        // 1 - 2
        cc.set_cc_sub(w(0xFFFF), w(1), w(2));
        assert!(cc.cs());
        assert!(cc.mi());
        assert!(cc.lt());
        assert!(cc.ls());
        assert!(!cc.hi());
        // 0x8000 - 1 overflows to positive
        cc.set_cc_sub(w(0x7FFF), w(0x8000), w(1));
        assert!(cc.vs());
        assert!(!cc.cs());
        assert!(cc.lt());
    }

    #[test]
    fn generic_preserves_x() {
        let mut cc = ConditionCodes::new();
        cc.set_cc_as_add(0, -1, 1);
        assert!(cc.x());
        cc.set_cc(-5);
        assert!(cc.x());
        assert!(cc.mi());
        assert!(!cc.cs());
        assert!(!cc.vs());
    }

    #[test]
    fn shift_carries() {
        let mut cc = ConditionCodes::new();
        // LSR.B #1 of 0x81
        cc.set_cc_lsr::<ByteSize>(0x40, ByteSize::svalue(0x81), 1);
        assert!(cc.cs() && cc.x());
        // LSL.B #1 of 0x81
        cc.set_cc_lsl::<ByteSize>(ByteSize::svalue(0x02), ByteSize::svalue(0x81), 1);
        assert!(cc.cs());
        // LSR.B #9 shifts everything out
        cc.set_cc_lsr::<ByteSize>(0, ByteSize::svalue(0xFF), 9);
        assert!(!cc.cs());
        // ASR.B #9 leaves the sign in the carry
        cc.set_cc_asr::<ByteSize>(-1, ByteSize::svalue(0x80), 9);
        assert!(cc.cs());
        // ASR.L #4 of 0x18
        cc.set_cc_asr::<LongWordSize>(1, 0x18, 4);
        assert!(cc.cs());
    }

    #[test]
    fn asl_overflow_tracks_sign_changes() {
        let mut cc = ConditionCodes::new();
        // 0x40 << 1 = 0x80 changes the sign
        cc.set_cc_asl::<ByteSize>(ByteSize::svalue(0x80), 0x40, 1);
        assert!(cc.vs());
        // 0xC0 << 1 = 0x80 keeps it
        cc.set_cc_asl::<ByteSize>(ByteSize::svalue(0x80), ByteSize::svalue(0xC0), 1);
        assert!(!cc.vs());
        assert!(cc.cs());
    }

    #[test]
    fn ccr_round_trip() {
        let mut cc = ConditionCodes::new();
        for bits in 0..0x20u8 {
            let ccr = Ccr::from_bits_truncate(bits);
            cc.set_ccr(ccr);
            assert_eq!(cc.ccr(), ccr);
        }
    }

    #[test]
    fn set_z_keeps_other_flags() {
        let mut cc = ConditionCodes::new();
        cc.set_cc_sub(w(0xFFFF), 1, 2);
        cc.set_z(true);
        assert_eq!(cc.ccr(), Ccr::X | Ccr::N | Ccr::Z | Ccr::C);
    }

    #[test]
    fn conditions_decode_from_opcode() {
        let mut cc = ConditionCodes::new();
        cc.set_cc(0);
        assert!(Condition::from_opcode(0x6700).test(&cc));
        assert!(!Condition::from_opcode(0x6600).test(&cc));
        assert_eq!(Condition::from_opcode(0x51C8), Condition::F);
    }
}
