//! Word arithmetic with two's-complement signed variants

use opmeter_core::Word;

#[inline]
pub(crate) fn is_negative(x: Word) -> bool {
    x.bit(255)
}

#[inline]
fn abs(x: Word) -> Word {
    if is_negative(x) { x.wrapping_neg() } else { x }
}

/// Fits-in-u64 view of a word
#[inline]
pub(crate) fn as_u64(x: &Word) -> Option<u64> {
    if x.bit_len() <= 64 {
        Some(x.as_limbs()[0])
    } else {
        None
    }
}

/// Saturating usize view, for offsets where anything huge reads as "past the end"
#[inline]
pub(crate) fn as_usize_saturating(x: &Word) -> usize {
    as_u64(x)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(usize::MAX)
}

#[inline]
pub(crate) fn bool_word(b: bool) -> Word {
    if b { Word::from(1u64) } else { Word::ZERO }
}

pub(crate) fn div(a: Word, b: Word) -> Word {
    a.checked_div(b).unwrap_or_default()
}

pub(crate) fn rem(a: Word, b: Word) -> Word {
    a.checked_rem(b).unwrap_or_default()
}

pub(crate) fn sdiv(a: Word, b: Word) -> Word {
    if b.is_zero() {
        return Word::ZERO;
    }
    let q = div(abs(a), abs(b));
    if is_negative(a) != is_negative(b) {
        q.wrapping_neg()
    } else {
        q
    }
}

pub(crate) fn smod(a: Word, b: Word) -> Word {
    if b.is_zero() {
        return Word::ZERO;
    }
    let r = rem(abs(a), abs(b));
    if is_negative(a) { r.wrapping_neg() } else { r }
}

pub(crate) fn slt(a: Word, b: Word) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

pub(crate) fn signextend(byte_index: Word, x: Word) -> Word {
    match as_u64(&byte_index) {
        Some(b) if b < 31 => {
            let bit = (b as usize) * 8 + 7;
            let mask = (Word::from(1u64) << (bit + 1)).wrapping_sub(Word::from(1u64));
            if x.bit(bit) { x | !mask } else { x & mask }
        }
        _ => x,
    }
}

pub(crate) fn byte(index: Word, x: Word) -> Word {
    match as_u64(&index) {
        Some(i) if i < 32 => Word::from(x.to_be_bytes::<32>()[i as usize] as u64),
        _ => Word::ZERO,
    }
}

pub(crate) fn shl(shift: Word, x: Word) -> Word {
    match as_u64(&shift) {
        Some(s) if s < 256 => x << (s as usize),
        _ => Word::ZERO,
    }
}

pub(crate) fn shr(shift: Word, x: Word) -> Word {
    match as_u64(&shift) {
        Some(s) if s < 256 => x >> (s as usize),
        _ => Word::ZERO,
    }
}

pub(crate) fn sar(shift: Word, x: Word) -> Word {
    let negative = is_negative(x);
    match as_u64(&shift) {
        Some(s) if s < 256 => {
            let s = s as usize;
            let shifted = x >> s;
            if negative && s > 0 {
                shifted | !(Word::MAX >> s)
            } else {
                shifted
            }
        }
        _ => {
            if negative {
                Word::MAX
            } else {
                Word::ZERO
            }
        }
    }
}

/// Number of significant bytes, as priced by `EXP`
pub(crate) fn byte_len(x: &Word) -> u64 {
    (x.bit_len() as u64).div_ceil(8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(v: u64) -> Word {
        Word::from(v)
    }

    fn neg(v: u64) -> Word {
        w(v).wrapping_neg()
    }

    #[test]
    fn test_unsigned_division_by_zero() {
        assert_eq!(div(w(10), w(0)), Word::ZERO);
        assert_eq!(rem(w(10), w(0)), Word::ZERO);
        assert_eq!(div(w(10), w(3)), w(3));
        assert_eq!(rem(w(10), w(3)), w(1));
    }

    #[test]
    fn test_signed_division() {
        assert_eq!(sdiv(neg(10), w(3)), neg(3));
        assert_eq!(sdiv(neg(10), neg(3)), w(3));
        assert_eq!(sdiv(w(10), w(0)), Word::ZERO);
        // MIN / -1 overflows back to MIN
        let min = Word::from(1u64) << 255;
        assert_eq!(sdiv(min, neg(1)), min);
    }

    #[test]
    fn test_signed_modulo_follows_dividend() {
        assert_eq!(smod(neg(10), w(3)), neg(1));
        assert_eq!(smod(w(10), neg(3)), w(1));
        assert_eq!(smod(w(10), w(0)), Word::ZERO);
    }

    #[test]
    fn test_signed_compare() {
        assert!(slt(neg(1), w(0)));
        assert!(!slt(w(0), neg(1)));
        assert!(slt(neg(5), neg(1)));
        assert!(slt(w(1), w(5)));
    }

    #[test]
    fn test_signextend() {
        assert_eq!(signextend(w(0), w(0xff)), Word::MAX);
        assert_eq!(signextend(w(0), w(0x7f)), w(0x7f));
        assert_eq!(signextend(w(1), w(0x1_80ff)), neg(0x7f01));
        assert_eq!(signextend(w(31), w(0xff)), w(0xff));
    }

    #[test]
    fn test_byte() {
        assert_eq!(byte(w(31), w(0xabcd)), w(0xcd));
        assert_eq!(byte(w(30), w(0xabcd)), w(0xab));
        assert_eq!(byte(w(32), w(0xabcd)), Word::ZERO);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(shl(w(4), w(1)), w(16));
        assert_eq!(shr(w(4), w(16)), w(1));
        assert_eq!(shl(w(256), w(1)), Word::ZERO);
        assert_eq!(sar(w(4), neg(16)), neg(1));
        assert_eq!(sar(w(300), neg(16)), Word::MAX);
        assert_eq!(sar(w(300), w(16)), Word::ZERO);
        assert_eq!(sar(w(0), neg(16)), neg(16));
    }

    #[test]
    fn test_byte_len() {
        assert_eq!(byte_len(&Word::ZERO), 0);
        assert_eq!(byte_len(&w(0xff)), 1);
        assert_eq!(byte_len(&w(0x100)), 2);
        assert_eq!(byte_len(&Word::MAX), 32);
    }
}
