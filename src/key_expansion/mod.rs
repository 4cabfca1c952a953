//! AES-128 key schedule, in both directions.
//!
//! The forward expansion feeds the block cipher; the inverse walks the
//! schedule back from a recovered 10th-round subkey to the master key, which
//! is the last step of the analysis pipeline.

use crate::tables::{RCON, SBOX};
use crate::utils::State;

/// Expands a 128-bit key into the 11-round schedule.
///
/// Nk = 4 for a 128-bit key; 10 rounds of 16 bytes plus the original key
/// give 176 bytes.
pub fn key_expansion(key: &State, expanded_key: &mut [u8; 176]) {
    expanded_key[0..16].copy_from_slice(key);

    let mut i = 16;
    let mut temp = [0u8; 4];

    while i < 176 {
        temp.copy_from_slice(&expanded_key[i - 4..i]);

        if i % 16 == 0 {
            // Rotate left
            temp.rotate_left(1);
            // Substitute bytes using S-box
            for j in 0..4 {
                temp[j] = SBOX[temp[j] as usize];
            }
            // XOR with round constant
            temp[0] ^= RCON[i / 16];
        }

        for j in 0..4 {
            expanded_key[i] = expanded_key[i - 16] ^ temp[j];
            i += 1;
        }
    }
}

/// Returns round key `r` (0 = whitening key, 10 = last round) of an expanded
/// schedule.
pub fn round_key(expanded_key: &[u8; 176], r: usize) -> State {
    let mut rk = [0u8; 16];
    rk.copy_from_slice(&expanded_key[16 * r..16 * r + 16]);
    rk
}

/// Reconstructs the master key from the 10th-round subkey.
///
/// The subkey is packed into four big-endian column words and the schedule
/// recursion is run back down to round 0: each previous word is the XOR of
/// two adjacent current words, except the first, which undoes the g-function
/// of its round.
pub fn reconstruct(k: &State) -> State {
    let mut sk = [0u32; 44];

    for i in 0..4 {
        for j in 0..4 {
            sk[i] ^= (k[4 * i + j] as u32) << (24 - 8 * j);
        }
    }

    for i in 0..10 {
        sk[4 * (i + 1)] = sk[4 * i] ^ ks_core(sk[4 * i + 2] ^ sk[4 * i + 3], 10 - i);
        sk[4 * (i + 1) + 1] = sk[4 * i] ^ sk[4 * i + 1];
        sk[4 * (i + 1) + 2] = sk[4 * i + 1] ^ sk[4 * i + 2];
        sk[4 * (i + 1) + 3] = sk[4 * i + 2] ^ sk[4 * i + 3];
    }

    let mut mk = [0u8; 16];
    for i in 0..4 {
        for j in 0..4 {
            mk[4 * i + j] = (sk[40 + i] >> (24 - 8 * j)) as u8;
        }
    }
    mk
}

/// g-function of the schedule: RotWord, SubWord, then the round constant on
/// the top byte.
fn ks_core(t: u32, r: usize) -> u32 {
    let b = t.rotate_left(8);
    let mut c = (RCON[r] as u32) << 24;
    for i in 0..4 {
        c ^= (SBOX[((b >> (24 - 8 * i)) & 0xff) as usize] as u32) << (24 - 8 * i);
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{hex_to_u8_array, u8_array_to_hex};
    use rand::Rng;

    #[test]
    fn fips_197_round_keys() {
        let key = hex_to_u8_array("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let mut ek = [0u8; 176];
        key_expansion(&key, &mut ek);

        assert_eq!(round_key(&ek, 0), key);
        assert_eq!(
            u8_array_to_hex(&round_key(&ek, 1)),
            "a0fafe1788542cb123a339392a6c7605"
        );
        assert_eq!(
            u8_array_to_hex(&round_key(&ek, 10)),
            "d014f9a8c9ee2589e13f0cc8b6630ca6"
        );
    }

    #[test]
    fn reconstruct_fips_197_subkey() {
        let k10 = hex_to_u8_array("d014f9a8c9ee2589e13f0cc8b6630ca6").unwrap();
        assert_eq!(
            u8_array_to_hex(&reconstruct(&k10)),
            "2b7e151628aed2a6abf7158809cf4f3c"
        );
    }

    #[test]
    fn reconstruct_inverts_expansion() {
        let mut rng = rand::thread_rng();
        for _ in 0..32 {
            let key: State = rng.gen();
            let mut ek = [0u8; 176];
            key_expansion(&key, &mut ek);
            assert_eq!(reconstruct(&round_key(&ek, 10)), key);
        }
    }
}
