//! 2-bit packing of DNA subsequences. Symbol `i` of the string occupies
//! bits `2i..2i+2` of the key, so the first base is the least significant.

use crate::error::{Error, Result};

/// Longest subsequence whose key stays clear of the sign bit
pub const MAX_LENGTH: usize = 31;

const SYMBOLS: [u8; 4] = *b"ACGT";

/// 2-bit value of a base, either case
pub fn symbol_value(symbol: u8) -> Option<i64>
{
    match symbol.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}

pub fn encode<S: AsRef<[u8]>>(sequence: S) -> Result<i64>
{
    let sequence = sequence.as_ref();
    if sequence.len() > MAX_LENGTH {
        return Err(Error::invalid_input(format!(
            "subsequence of length {} is longer than {MAX_LENGTH}",
            sequence.len()
        )));
    }

    sequence
        .iter()
        .enumerate()
        .try_fold(0_i64, |key, (i, &symbol)| match symbol_value(symbol) {
            Some(value) => Ok(key | value << (2 * i)),
            None => Err(Error::invalid_input(format!(
                "'{}' at position {i} is not one of A, C, G, T",
                symbol.escape_ascii()
            ))),
        })
}

/// Inverse of [`encode`], always upper case
pub fn decode(mut key: i64, length: usize) -> String
{
    let mut sequence = String::with_capacity(length);
    for _ in 0..length {
        sequence.push(SYMBOLS[(key & 3) as usize] as char);
        key >>= 2;
    }
    sequence
}

#[cfg(test)]
mod tests
{
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    #[test]
    fn known_keys()
    {
        assert_eq!(encode("A").unwrap(), 0);
        assert_eq!(encode("T").unwrap(), 3);
        assert_eq!(encode("CA").unwrap(), 1);
        assert_eq!(encode("AC").unwrap(), 4);
        assert_eq!(encode("ACGT").unwrap(), 0b11_10_01_00);
        assert_eq!(decode(encode("ACGT").unwrap(), 4), "ACGT");
        assert_eq!(encode("acgt").unwrap(), encode("ACGT").unwrap());
    }

    #[test]
    fn round_trips_every_length()
    {
        let mut rng = StdRng::seed_from_u64(31);
        for length in 1..=MAX_LENGTH {
            for _ in 0..20 {
                let sequence: String = (0..length)
                    .map(|_| SYMBOLS[rng.gen_range(0..4)] as char)
                    .collect();
                let key = encode(&sequence).unwrap();
                assert!(key >= 0);
                assert_eq!(decode(key, length), sequence);
            }
        }

        let longest = "T".repeat(MAX_LENGTH);
        assert_eq!(encode(&longest).unwrap(), i64::MAX >> 1);
    }

    #[test]
    fn rejects_bad_input()
    {
        let too_long = "A".repeat(MAX_LENGTH + 1);
        assert!(matches!(encode(too_long), Err(Error::InvalidInput(_))));
        assert!(matches!(encode("ACNT"), Err(Error::InvalidInput(_))));
        assert!(matches!(encode("AC T"), Err(Error::InvalidInput(_))));
    }
}
