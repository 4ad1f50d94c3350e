//! SQLite variable-length integers (1–9 bytes, big-endian 7-bit groups; the
//! ninth byte carries a full 8 bits).

/// Largest encoded varint length.
pub const MAX_VARINT_LEN: usize = 9;

/// Decode a varint from the start of `buf`, returning `(value, bytes_read)`.
///
/// Returns `None` when `buf` ends before the varint does.
#[must_use]
pub fn get_varint(buf: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in buf.iter().take(MAX_VARINT_LEN - 1).enumerate() {
        value = (value << 7) | u64::from(byte & 0x7f);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    let last = *buf.get(MAX_VARINT_LEN - 1)?;
    Some(((value << 8) | u64::from(last), MAX_VARINT_LEN))
}

/// Append the varint encoding of `value` to `out`, returning its length.
pub fn put_varint(out: &mut Vec<u8>, value: u64) -> usize {
    if value & (0xff00_0000_u64 << 32) != 0 {
        let mut buf = [0_u8; MAX_VARINT_LEN];
        let mut v = value;
        buf[8] = v as u8;
        v >>= 8;
        for slot in buf[..8].iter_mut().rev() {
            *slot = ((v & 0x7f) as u8) | 0x80;
            v >>= 7;
        }
        out.extend_from_slice(&buf);
        return MAX_VARINT_LEN;
    }

    let mut buf = [0_u8; MAX_VARINT_LEN];
    let mut n = 0;
    let mut v = value;
    loop {
        buf[n] = ((v & 0x7f) as u8) | 0x80;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    buf[0] &= 0x7f;
    out.extend(buf[..n].iter().rev());
    n
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_single_byte_values() {
        let mut out = Vec::new();
        assert_eq!(put_varint(&mut out, 0), 1);
        assert_eq!(put_varint(&mut out, 0x7f), 1);
        assert_eq!(out, vec![0x00, 0x7f]);
    }

    #[test]
    fn test_two_byte_boundary() {
        let mut out = Vec::new();
        put_varint(&mut out, 0x80);
        assert_eq!(out, vec![0x81, 0x00]);
        assert_eq!(get_varint(&out), Some((0x80, 2)));
    }

    #[test]
    fn test_nine_byte_encoding_keeps_low_byte_whole() {
        let mut out = Vec::new();
        assert_eq!(put_varint(&mut out, u64::MAX), MAX_VARINT_LEN);
        assert_eq!(out[8], 0xff);
        assert_eq!(get_varint(&out), Some((u64::MAX, MAX_VARINT_LEN)));
    }

    #[test]
    fn test_truncated_varint() {
        assert_eq!(get_varint(&[]), None);
        assert_eq!(get_varint(&[0x81]), None);
        assert_eq!(get_varint(&[0xff; 8]), None);
    }

    proptest! {
        #[test]
        fn prop_varint_decodes_what_it_encodes(value in any::<u64>()) {
            let mut out = Vec::new();
            let len = put_varint(&mut out, value);
            prop_assert_eq!(len, out.len());
            prop_assert_eq!(get_varint(&out), Some((value, len)));
        }
    }
}
