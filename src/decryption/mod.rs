//! Inverse AES-128 transformations and block decryption.
//!
//! Only the self-test round trip needs these, but they come almost for free:
//! the inverse MixColumns coefficients `0e 0b 0d 09` are the same
//! multiplication tables the differential analysis reads all day.

use crate::encryption::add_round_key;
use crate::key_expansion::key_expansion;
use crate::tables::{GM_09, GM_0B, GM_0D, GM_0E, INV_SBOX};
use crate::utils::State;

/// Substitutes every state byte through the inverse S-box.
pub fn inv_sub_bytes(state: &mut State) {
    for s in state.iter_mut() {
        *s = INV_SBOX[*s as usize];
    }
}

/// Rotates row r of the state matrix right by r positions, undoing
/// [`shift_rows`](crate::encryption::shift_rows).
pub fn inv_shift_rows(state: &mut State) {
    let t = *state;
    *state = [
        t[0], t[13], t[10], t[7],
        t[4], t[1], t[14], t[11],
        t[8], t[5], t[2], t[15],
        t[12], t[9], t[6], t[3],
    ];
}

/// Multiplies each state column by the inverse MixColumns matrix
///
/// ```text
/// | 0e 0b 0d 09 |
/// | 09 0e 0b 0d |
/// | 0d 09 0e 0b |
/// | 0b 0d 09 0e |
/// ```
///
/// driven by the precomputed tables.
pub fn inv_mix_columns(state: &mut State) {
    for col in 0..4 {
        let o = 4 * col;
        let (a0, a1, a2, a3) = (
            state[o] as usize,
            state[o + 1] as usize,
            state[o + 2] as usize,
            state[o + 3] as usize,
        );
        state[o] = GM_0E[a0] ^ GM_0B[a1] ^ GM_0D[a2] ^ GM_09[a3];
        state[o + 1] = GM_09[a0] ^ GM_0E[a1] ^ GM_0B[a2] ^ GM_0D[a3];
        state[o + 2] = GM_0D[a0] ^ GM_09[a1] ^ GM_0E[a2] ^ GM_0B[a3];
        state[o + 3] = GM_0B[a0] ^ GM_0D[a1] ^ GM_09[a2] ^ GM_0E[a3];
    }
}

/// Decrypts one block under a 128-bit key, running the inverse rounds in
/// reverse key order.
pub fn decrypt_block(key: &State, input: &State) -> State {
    let mut expanded_key = [0u8; 176];
    key_expansion(key, &mut expanded_key);

    let mut state = *input;
    add_round_key(&mut state, &expanded_key[160..176]);

    for round in (1..10).rev() {
        inv_shift_rows(&mut state);
        inv_sub_bytes(&mut state);
        add_round_key(&mut state, &expanded_key[round * 16..(round + 1) * 16]);
        inv_mix_columns(&mut state);
    }

    inv_shift_rows(&mut state);
    inv_sub_bytes(&mut state);
    add_round_key(&mut state, &expanded_key[0..16]);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::{encrypt_block, mix_columns, shift_rows};
    use rand::Rng;

    #[test]
    fn fips_197_vector() {
        let key: State = [
            0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6,
            0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c,
        ];
        let cipher: State = [
            0x39, 0x25, 0x84, 0x1d, 0x02, 0xdc, 0x09, 0xfb,
            0xdc, 0x11, 0x85, 0x97, 0x19, 0x6a, 0x0b, 0x32,
        ];
        let plain: State = [
            0x32, 0x43, 0xf6, 0xa8, 0x88, 0x5a, 0x30, 0x8d,
            0x31, 0x31, 0x98, 0xa2, 0xe0, 0x37, 0x07, 0x34,
        ];
        assert_eq!(decrypt_block(&key, &cipher), plain);
    }

    #[test]
    fn inverse_steps_undo_forward_steps() {
        let mut rng = rand::thread_rng();
        for _ in 0..32 {
            let original: State = rng.gen();

            let mut state = original;
            shift_rows(&mut state);
            inv_shift_rows(&mut state);
            assert_eq!(state, original);

            mix_columns(&mut state);
            inv_mix_columns(&mut state);
            assert_eq!(state, original);
        }
    }

    #[test]
    fn decrypt_round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..16 {
            let key: State = rng.gen();
            let plain: State = rng.gen();
            assert_eq!(decrypt_block(&key, &encrypt_block(&key, &plain)), plain);
        }
    }
}
