//! Forward AES-128 transformations and block encryption.
//!
//! This is a plain software cipher; it only has to verify key candidates
//! during brute force, so table lookups are plenty fast and carry no
//! side-channel obligations. [`self_test`] pins it to the FIPS-197 vector
//! and to the RustCrypto [`Aes128`] cipher as an independent reference.

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::decryption::decrypt_block;
use crate::key_expansion::key_expansion;
use crate::tables::SBOX;
use crate::utils::State;

/// XORs a round key into the state (the AddRoundKey step).
pub fn add_round_key(state: &mut State, round_key: &[u8]) {
    for (s, k) in state.iter_mut().zip(round_key) {
        *s ^= k;
    }
}

/// Substitutes every state byte through the S-box (the SubBytes step).
pub fn sub_bytes(state: &mut State) {
    for s in state.iter_mut() {
        *s = SBOX[*s as usize];
    }
}

/// Rotates row r of the state matrix left by r positions (the ShiftRows
/// step), written out flat over the column-major byte order.
pub fn shift_rows(state: &mut State) {
    let t = *state;
    *state = [
        t[0], t[5], t[10], t[15],
        t[4], t[9], t[14], t[3],
        t[8], t[13], t[2], t[7],
        t[12], t[1], t[6], t[11],
    ];
}

/// Multiplies two elements of GF(2^8), reducing by the AES polynomial
/// x^8 + x^4 + x^3 + x + 1.
pub fn gal_mul(a: u8, b: u8) -> u8 {
    const IRREDUCIBLE_POLY: u8 = 0x1b;

    let mut result = 0u8;
    let mut a = a;
    let mut b = b;

    while b != 0 {
        if (b & 1) != 0 {
            result ^= a;
        }
        let high_bit_set = (a & 0x80) != 0;
        a <<= 1;
        if high_bit_set {
            a ^= IRREDUCIBLE_POLY;
        }
        b >>= 1;
    }
    result
}

/// Multiplies each state column by the fixed MixColumns matrix
///
/// ```text
/// |  2  3  1  1 |
/// |  1  2  3  1 |
/// |  1  1  2  3 |
/// |  3  1  1  2 |
/// ```
pub fn mix_columns(state: &mut State) {
    for col in 0..4 {
        let o = 4 * col;
        let (a0, a1, a2, a3) = (state[o], state[o + 1], state[o + 2], state[o + 3]);
        state[o] = gal_mul(a0, 2) ^ gal_mul(a1, 3) ^ a2 ^ a3;
        state[o + 1] = a0 ^ gal_mul(a1, 2) ^ gal_mul(a2, 3) ^ a3;
        state[o + 2] = a0 ^ a1 ^ gal_mul(a2, 2) ^ gal_mul(a3, 3);
        state[o + 3] = gal_mul(a0, 3) ^ a1 ^ a2 ^ gal_mul(a3, 2);
    }
}

/// Encrypts one block under a 128-bit key: the initial round key addition,
/// nine full rounds, and a final round without MixColumns.
pub fn encrypt_block(key: &State, input: &State) -> State {
    let mut expanded_key = [0u8; 176];
    key_expansion(key, &mut expanded_key);

    let mut state = *input;
    add_round_key(&mut state, &expanded_key[0..16]);

    for round in 1..10 {
        sub_bytes(&mut state);
        shift_rows(&mut state);
        mix_columns(&mut state);
        add_round_key(&mut state, &expanded_key[round * 16..(round + 1) * 16]);
    }

    sub_bytes(&mut state);
    shift_rows(&mut state);
    add_round_key(&mut state, &expanded_key[160..176]);
    state
}

/// Known-answer check run once at startup.
///
/// Encrypts and decrypts the FIPS-197 example vector, and cross-checks the
/// ciphertext against the RustCrypto AES implementation.
pub fn self_test() -> bool {
    let plain: State = [
        0x32, 0x43, 0xf6, 0xa8, 0x88, 0x5a, 0x30, 0x8d,
        0x31, 0x31, 0x98, 0xa2, 0xe0, 0x37, 0x07, 0x34,
    ];
    let key: State = [
        0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6,
        0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c,
    ];
    let cipher: State = [
        0x39, 0x25, 0x84, 0x1d, 0x02, 0xdc, 0x09, 0xfb,
        0xdc, 0x11, 0x85, 0x97, 0x19, 0x6a, 0x0b, 0x32,
    ];

    if encrypt_block(&key, &plain) != cipher {
        return false;
    }
    if decrypt_block(&key, &cipher) != plain {
        return false;
    }

    let mut reference_state = plain;
    let reference = Aes128::new((&key).into());
    reference.encrypt_block((&mut reference_state).into());
    reference_state == cipher
}

/// Test support: encrypts a block but XORs `delta` into state byte
/// `location` at the entry of round 8, the window the fault analysis
/// assumes.
#[cfg(test)]
pub(crate) fn encrypt_block_with_fault(
    key: &State,
    input: &State,
    location: usize,
    delta: u8,
) -> State {
    let mut expanded_key = [0u8; 176];
    key_expansion(key, &mut expanded_key);

    let mut state = *input;
    add_round_key(&mut state, &expanded_key[0..16]);

    for round in 1..10 {
        if round == 8 {
            state[location] ^= delta;
        }
        sub_bytes(&mut state);
        shift_rows(&mut state);
        mix_columns(&mut state);
        add_round_key(&mut state, &expanded_key[round * 16..(round + 1) * 16]);
    }

    sub_bytes(&mut state);
    shift_rows(&mut state);
    add_round_key(&mut state, &expanded_key[160..176]);
    state
}
