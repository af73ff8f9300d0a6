use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not};

use rand::Rng;

/// Packed bit-vector holding the simulation values of one signal
///
/// The table grows one bit at a time as patterns are added; storage is in
/// 64-bit blocks and the unused bits of the last block are kept at zero, so
/// that equality and hashing work on the raw words.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub struct TruthTable {
    blocks: Vec<u64>,
    nb_bits: usize,
}

fn nb_blocks_for(nb_bits: usize) -> usize {
    nb_bits.div_ceil(64)
}

impl TruthTable {
    /// Create an all-zero table
    pub fn zeros(nb_bits: usize) -> TruthTable {
        TruthTable {
            blocks: vec![0u64; nb_blocks_for(nb_bits)],
            nb_bits,
        }
    }

    /// Create an all-one table
    pub fn ones(nb_bits: usize) -> TruthTable {
        let mut t = TruthTable {
            blocks: vec![!0u64; nb_blocks_for(nb_bits)],
            nb_bits,
        };
        t.mask_tail();
        t
    }

    /// Create a random table
    pub fn random<R: Rng>(nb_bits: usize, rng: &mut R) -> TruthTable {
        let mut t = TruthTable {
            blocks: (0..nb_blocks_for(nb_bits)).map(|_| rng.gen()).collect(),
            nb_bits,
        };
        t.mask_tail();
        t
    }

    /// Create the projection of the i-th variable over all 2^nb_vars points
    ///
    /// Bit p of the result is bit i of the binary encoding of p; this is the
    /// input pattern of an exhaustive simulation.
    pub fn nth_var(nb_vars: usize, i: usize) -> TruthTable {
        assert!(i < nb_vars);
        let nb_bits = 1usize << nb_vars;
        let mut t = TruthTable::zeros(nb_bits);
        if i < 6 {
            const PATTERNS: [u64; 6] = [
                0xAAAA_AAAA_AAAA_AAAA,
                0xCCCC_CCCC_CCCC_CCCC,
                0xF0F0_F0F0_F0F0_F0F0,
                0xFF00_FF00_FF00_FF00,
                0xFFFF_0000_FFFF_0000,
                0xFFFF_FFFF_0000_0000,
            ];
            for b in t.blocks.iter_mut() {
                *b = PATTERNS[i];
            }
        } else {
            let period = 1usize << (i - 6);
            for (k, b) in t.blocks.iter_mut().enumerate() {
                if (k / period) % 2 == 1 {
                    *b = !0u64;
                }
            }
        }
        t.mask_tail();
        t
    }

    /// Return the number of bits
    pub fn nb_bits(&self) -> usize {
        self.nb_bits
    }

    /// Return the number of 64-bit blocks
    pub fn nb_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Get one bit
    pub fn bit(&self, i: usize) -> bool {
        assert!(i < self.nb_bits);
        (self.blocks[i / 64] >> (i % 64)) & 1 != 0
    }

    /// Set one bit
    pub fn set_bit(&mut self, i: usize, value: bool) {
        assert!(i < self.nb_bits);
        if value {
            self.blocks[i / 64] |= 1u64 << (i % 64);
        } else {
            self.blocks[i / 64] &= !(1u64 << (i % 64));
        }
    }

    /// Append one bit
    pub fn push_bit(&mut self, value: bool) {
        if self.nb_bits % 64 == 0 {
            self.blocks.push(0);
        }
        self.nb_bits += 1;
        if value {
            self.set_bit(self.nb_bits - 1, true);
        }
    }

    /// Count the bits set to one
    pub fn count_ones(&self) -> usize {
        self.blocks.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Count the bits set to zero
    pub fn count_zeros(&self) -> usize {
        self.nb_bits - self.count_ones()
    }

    /// Returns whether all bits are zero
    pub fn is_zero(&self) -> bool {
        self.blocks.iter().all(|b| *b == 0)
    }

    /// Returns whether the two tables have a common set bit
    ///
    /// Equivalent to `!(a & b).is_zero()` without building the intersection.
    pub fn intersects(&self, other: &TruthTable) -> bool {
        debug_assert_eq!(self.nb_bits, other.nb_bits);
        self.blocks
            .iter()
            .zip(other.blocks.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Returns whether the complement of this table intersects the other
    ///
    /// Equivalent to `!(!a & b).is_zero()`; the other table's tail invariant
    /// keeps the unused bits out of the comparison.
    pub fn inv_intersects(&self, other: &TruthTable) -> bool {
        debug_assert_eq!(self.nb_bits, other.nb_bits);
        self.blocks
            .iter()
            .zip(other.blocks.iter())
            .any(|(a, b)| !a & b != 0)
    }

    /// Write the table as a hexadecimal string, highest nibble first
    pub fn to_hex(&self) -> String {
        let nb_nibbles = self.nb_bits.div_ceil(4);
        let mut s = String::with_capacity(nb_nibbles);
        for j in (0..nb_nibbles).rev() {
            let block = self.blocks[j / 16];
            let nibble = (block >> (4 * (j % 16))) & 0xF;
            s.push(char::from_digit(nibble as u32, 16).unwrap());
        }
        s
    }

    /// Parse a table from a hexadecimal string, highest nibble first
    pub fn from_hex(s: &str) -> Option<TruthTable> {
        let mut t = TruthTable::zeros(4 * s.len());
        for (k, c) in s.chars().rev().enumerate() {
            let nibble = c.to_digit(16)? as u64;
            t.blocks[k / 16] |= nibble << (4 * (k % 16));
        }
        Some(t)
    }

    /// Shrink the table to the given number of bits
    pub fn truncate(&mut self, nb_bits: usize) {
        assert!(nb_bits <= self.nb_bits);
        self.nb_bits = nb_bits;
        self.blocks.truncate(nb_blocks_for(nb_bits));
        self.mask_tail();
    }

    fn mask_tail(&mut self) {
        let rem = self.nb_bits % 64;
        if rem != 0 {
            if let Some(last) = self.blocks.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }
}

macro_rules! impl_binop {
    ($trait:ident, $fn:ident, $assign_trait:ident, $assign_fn:ident, $op:tt) => {
        impl $assign_trait<&TruthTable> for TruthTable {
            fn $assign_fn(&mut self, rhs: &TruthTable) {
                debug_assert_eq!(self.nb_bits, rhs.nb_bits);
                for (a, b) in self.blocks.iter_mut().zip(rhs.blocks.iter()) {
                    *a $op b;
                }
            }
        }

        impl $trait for &TruthTable {
            type Output = TruthTable;
            fn $fn(self, rhs: &TruthTable) -> TruthTable {
                let mut ret = self.clone();
                $assign_trait::$assign_fn(&mut ret, rhs);
                ret
            }
        }
    };
}

impl_binop!(BitAnd, bitand, BitAndAssign, bitand_assign, &=);
impl_binop!(BitOr, bitor, BitOrAssign, bitor_assign, |=);
impl_binop!(BitXor, bitxor, BitXorAssign, bitxor_assign, ^=);

impl Not for &TruthTable {
    type Output = TruthTable;
    fn not(self) -> TruthTable {
        let mut ret = TruthTable {
            blocks: self.blocks.iter().map(|b| !b).collect(),
            nb_bits: self.nb_bits,
        };
        ret.mask_tail();
        ret
    }
}

impl fmt::Display for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_push_and_get() {
        let mut t = TruthTable::zeros(0);
        for i in 0..130 {
            t.push_bit(i % 3 == 0);
        }
        assert_eq!(t.nb_bits(), 130);
        assert_eq!(t.nb_blocks(), 3);
        for i in 0..130 {
            assert_eq!(t.bit(i), i % 3 == 0);
        }
        assert_eq!(t.count_ones(), 44);
        assert_eq!(t.count_zeros(), 86);
    }

    #[test]
    fn test_ops() {
        let mut rng = SmallRng::seed_from_u64(1);
        let a = TruthTable::random(100, &mut rng);
        let b = TruthTable::random(100, &mut rng);
        let and = &a & &b;
        let or = &a | &b;
        let xor = &a ^ &b;
        let na = !&a;
        for i in 0..100 {
            assert_eq!(and.bit(i), a.bit(i) & b.bit(i));
            assert_eq!(or.bit(i), a.bit(i) | b.bit(i));
            assert_eq!(xor.bit(i), a.bit(i) ^ b.bit(i));
            assert_eq!(na.bit(i), !a.bit(i));
        }
        assert_eq!(&(!&a) & &a, TruthTable::zeros(100));
        assert_eq!(&(!&a) | &a, TruthTable::ones(100));
        assert!(a.intersects(&or));
        assert!(!a.intersects(&TruthTable::zeros(100)));
    }

    #[test]
    fn test_tail_masked() {
        let ones = TruthTable::ones(70);
        assert_eq!(ones.count_ones(), 70);
        let n = !&TruthTable::zeros(70);
        assert_eq!(n, ones);
    }

    #[test]
    fn test_nth_var() {
        for nb_vars in 1..9 {
            for v in 0..nb_vars {
                let t = TruthTable::nth_var(nb_vars, v);
                assert_eq!(t.nb_bits(), 1 << nb_vars);
                for p in 0..(1usize << nb_vars) {
                    assert_eq!(t.bit(p), (p >> v) & 1 != 0);
                }
            }
        }
    }

    #[test]
    fn test_hex_round_trip() {
        let mut rng = SmallRng::seed_from_u64(7);
        for nb_bits in [4, 8, 64, 68, 128, 1024] {
            let t = TruthTable::random(nb_bits, &mut rng);
            let s = t.to_hex();
            assert_eq!(s.len(), nb_bits / 4);
            assert_eq!(TruthTable::from_hex(&s), Some(t));
        }
    }

    #[test]
    fn test_truncate() {
        let ones = TruthTable::ones(128);
        let mut t = ones.clone();
        t.truncate(70);
        assert_eq!(t, TruthTable::ones(70));
    }
}
