//! The differential fault analysis pipeline.
//!
//! One run of [`analyse`] processes a single (correct, faulty) ciphertext
//! pair under one fault-location hypothesis: build per-byte differential
//! tables, intersect them column-wise (the standard filter), combine the
//! survivors into per-column key tuples, and sweep the cartesian product of
//! the four columns through the improved filter, which checks that all four
//! inverse-round fault equations agree on a single nonzero fault byte.
//! Surviving 10th-round subkeys are walked back through the key schedule to
//! master keys.
//!
//! Only the improved filter is parallel; the tuple vectors of the first
//! column are striped round-robin over the workers and the per-shard results
//! are concatenated in shard order, so the output is identical for any
//! worker count.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::key_expansion::reconstruct;
use crate::log;
use crate::tables::{GM_01, GM_09, GM_0B, GM_0D, GM_0E, GM_8D, GM_F6, INV_SBOX, SBOX};
use crate::utils::State;

/// Four key-byte candidates sharing one column of the last round.
pub type KeyTuple = [u8; 4];

/// Vector of key candidate tuples.
pub type VKeyTuple = Vec<KeyTuple>;

/// Per-position multimap from differential signature to candidate key byte.
/// The ordered map plus the ascending insertion order of the candidate lists
/// make the downstream tuple enumeration deterministic.
pub type DiffStat = [BTreeMap<u8, Vec<u8>>; 16];

/// Related bytes (column-wise): the four ciphertext positions that unwind
/// through ShiftRows into one pre-ShiftRows column.
pub static RB: [[usize; 4]; 4] = [
    [0x0, 0x7, 0xa, 0xd],
    [0x1, 0x4, 0xb, 0xe],
    [0x2, 0x5, 0x8, 0xf],
    [0x3, 0x6, 0x9, 0xc],
];

/// Maps a fault location to the column group that selects the delta tables.
/// Locations are enumerated column-wise, like state bytes.
pub static MAP_FAULT: [usize; 16] = [
    0x0, 0x1, 0x2, 0x3, 0x3, 0x0, 0x1, 0x2, 0x2, 0x3, 0x0, 0x1, 0x1, 0x2, 0x3, 0x0,
];

/// Inverses of the per-position fault deltas for the standard filter, one
/// row per column group.
static IDELTAS1: [[&[u8; 256]; 16]; 4] = [
    [
        &GM_8D, &GM_01, &GM_8D, &GM_01, &GM_01, &GM_F6, &GM_01, &GM_F6,
        &GM_01, &GM_8D, &GM_01, &GM_8D, &GM_F6, &GM_01, &GM_F6, &GM_01,
    ],
    [
        &GM_01, &GM_F6, &GM_01, &GM_F6, &GM_01, &GM_8D, &GM_01, &GM_8D,
        &GM_F6, &GM_01, &GM_F6, &GM_01, &GM_8D, &GM_01, &GM_8D, &GM_01,
    ],
    [
        &GM_01, &GM_8D, &GM_01, &GM_8D, &GM_F6, &GM_01, &GM_F6, &GM_01,
        &GM_8D, &GM_01, &GM_8D, &GM_01, &GM_01, &GM_F6, &GM_01, &GM_F6,
    ],
    [
        &GM_F6, &GM_01, &GM_F6, &GM_01, &GM_8D, &GM_01, &GM_8D, &GM_01,
        &GM_01, &GM_F6, &GM_01, &GM_F6, &GM_01, &GM_8D, &GM_01, &GM_8D,
    ],
];

/// Inverses of the fault deltas applied to the four improved-filter
/// equation residues, one row per `l mod 4`.
static IDELTAS2: [[&[u8; 256]; 4]; 4] = [
    [&GM_8D, &GM_01, &GM_01, &GM_F6],
    [&GM_F6, &GM_8D, &GM_01, &GM_01],
    [&GM_01, &GM_F6, &GM_8D, &GM_01],
    [&GM_01, &GM_01, &GM_F6, &GM_8D],
];

/// Position permutation for c, d and the 10th-round key in the improved
/// fault equations, in blocks of four per equation.
static INDICES_X: [[usize; 16]; 4] = [
    [0x0, 0xd, 0xa, 0x7, 0xc, 0x9, 0x6, 0x3, 0x8, 0x5, 0x2, 0xf, 0x4, 0x1, 0xe, 0xb],
    [0xc, 0x9, 0x6, 0x3, 0x8, 0x5, 0x2, 0xf, 0x4, 0x1, 0xe, 0xb, 0x0, 0xd, 0xa, 0x7],
    [0x8, 0x5, 0x2, 0xf, 0x4, 0x1, 0xe, 0xb, 0x0, 0xd, 0xa, 0x7, 0xc, 0x9, 0x6, 0x3],
    [0x4, 0x1, 0xe, 0xb, 0x0, 0xd, 0xa, 0x7, 0xc, 0x9, 0x6, 0x3, 0x8, 0x5, 0x2, 0xf],
];

/// The matching permutation for the 9th-round key.
static INDICES_Y: [[usize; 16]; 4] = [
    [0x0, 0x1, 0x2, 0x3, 0xc, 0xd, 0xe, 0xf, 0x8, 0x9, 0xa, 0xb, 0x4, 0x5, 0x6, 0x7],
    [0xc, 0xd, 0xe, 0xf, 0x8, 0x9, 0xa, 0xb, 0x4, 0x5, 0x6, 0x7, 0x0, 0x1, 0x2, 0x3],
    [0x8, 0x9, 0xa, 0xb, 0x4, 0x5, 0x6, 0x7, 0x0, 0x1, 0x2, 0x3, 0xc, 0xd, 0xe, 0xf],
    [0x4, 0x5, 0x6, 0x7, 0x0, 0x1, 0x2, 0x3, 0xc, 0xd, 0xe, 0xf, 0x8, 0x9, 0xa, 0xb],
];

/// The single-byte differential equation: the signature a key hypothesis `k`
/// produces at one state position.
#[inline(always)]
fn eq(c: u8, d: u8, k: u8, gm: &[u8; 256]) -> u8 {
    gm[(INV_SBOX[(c ^ k) as usize] ^ INV_SBOX[(d ^ k) as usize]) as usize]
}

/// Runs the full analysis for one ciphertext pair and one fault location,
/// returning every master key consistent with the pair.
pub fn analyse(c: &State, d: &State, l: usize, cores: usize) -> Vec<State> {
    log!("Applying standard filter ...");
    let cmb = combine(&standard_filter(differentials(c, d, l)));
    let n = cmb[0].len() * cmb[1].len() * cmb[2].len() * cmb[3].len();
    log!("Size of keyspace: {} = 2^{:.2}", n, (n as f64).log2());

    log!("Applying improved filter ...");
    let sliced_cmb = preproc(&cmb, cores);

    let results: Vec<Vec<State>> = sliced_cmb
        .par_iter()
        .map(|slice| improved_filter(c, d, slice, l))
        .collect();

    let keys = postproc(&results);
    log!(
        "Size of keyspace: {} = 2^{:.2}",
        keys.len(),
        (keys.len() as f64).log2()
    );
    keys
}

/// Builds the 16 differential multimaps for a ciphertext pair: every key
/// hypothesis is inserted under its signature, with no filtering yet.
pub fn differentials(c: &State, d: &State, l: usize) -> DiffStat {
    let gm = &IDELTAS1[MAP_FAULT[l]];

    let mut x: DiffStat = std::array::from_fn(|_| BTreeMap::new());
    for k in 0..=255u8 {
        for i in 0..16 {
            x[i].entry(eq(c[i], d[i], k, gm[i])).or_default().push(k);
        }
    }
    x
}

/// Keeps only the entries whose signature shows up at all four related
/// positions of a column. Columns are independent of each other.
pub fn standard_filter(mut x: DiffStat) -> DiffStat {
    for col in 0..4 {
        let mut valid: BTreeSet<u8> = x[RB[col][0]].keys().copied().collect();
        for j in 1..4 {
            let sigs: BTreeSet<u8> = x[RB[col][j]].keys().copied().collect();
            valid = valid.intersection(&sigs).copied().collect();
        }
        for j in 0..4 {
            x[RB[col][j]].retain(|sig, _| valid.contains(sig));
        }
    }
    x
}

/// Computes the cartesian product of all remaining key candidates of related
/// positions, per column and per signature.
pub fn combine(x: &DiffStat) -> [VKeyTuple; 4] {
    std::array::from_fn(|col| {
        let p0 = &x[RB[col][0]];
        let p1 = &x[RB[col][1]];
        let p2 = &x[RB[col][2]];
        let p3 = &x[RB[col][3]];

        let mut v = VKeyTuple::new();
        for (sig, k0s) in p0 {
            let (Some(k1s), Some(k2s), Some(k3s)) = (p1.get(sig), p2.get(sig), p3.get(sig))
            else {
                continue;
            };
            for &k0 in k0s {
                for &k1 in k1s {
                    for &k2 in k2s {
                        for &k3 in k3s {
                            v.push([k0, k1, k2, k3]);
                        }
                    }
                }
            }
        }
        v
    })
}

/// Stripes the first column's tuples round-robin over `cores` shards; the
/// other three columns are carried whole into every shard.
pub fn preproc(cmb: &[VKeyTuple; 4], cores: usize) -> Vec<[VKeyTuple; 4]> {
    let mut slices: Vec<VKeyTuple> = vec![VKeyTuple::new(); cores];
    for (i, t) in cmb[0].iter().enumerate() {
        slices[i % cores].push(*t);
    }

    slices
        .into_iter()
        .map(|s| [s, cmb[1].clone(), cmb[2].clone(), cmb[3].clone()])
        .collect()
}

/// One inverse round-10/9 column of the fault equations: peel AddRoundKey
/// and SubBytes of the last round, the 9th round key, and one InvMixColumns
/// row, then the inverse S-box of round 9.
#[inline(always)]
fn inv_column(
    t: &State,
    k: &State,
    h: &State,
    x: &[usize; 16],
    y: &[usize; 16],
    o: usize,
    g: &[&[u8; 256]; 4],
) -> u8 {
    INV_SBOX[(g[0][(INV_SBOX[(t[x[o]] ^ k[x[o]]) as usize] ^ h[y[o]]) as usize]
        ^ g[1][(INV_SBOX[(t[x[o + 1]] ^ k[x[o + 1]]) as usize] ^ h[y[o + 1]]) as usize]
        ^ g[2][(INV_SBOX[(t[x[o + 2]] ^ k[x[o + 2]]) as usize] ^ h[y[o + 2]]) as usize]
        ^ g[3][(INV_SBOX[(t[x[o + 3]] ^ k[x[o + 3]]) as usize] ^ h[y[o + 3]]) as usize])
        as usize]
}

/// Sweeps every 4-column tuple combination of one shard and keeps the
/// 10th-round keys whose four fault-equation residues agree on a single
/// nonzero fault byte.
pub fn improved_filter(c: &State, d: &State, v: &[VKeyTuple; 4], l: usize) -> Vec<State> {
    let gm = &IDELTAS2[l % 4];
    let x = &INDICES_X[MAP_FAULT[l]];
    let y = &INDICES_Y[MAP_FAULT[l]];

    // InvMixColumns coefficient rows, rotating one position per equation
    let rows: [[&[u8; 256]; 4]; 4] = [
        [&GM_0E, &GM_0B, &GM_0D, &GM_09],
        [&GM_09, &GM_0E, &GM_0B, &GM_0D],
        [&GM_0D, &GM_09, &GM_0E, &GM_0B],
        [&GM_0B, &GM_0D, &GM_09, &GM_0E],
    ];

    let mut candidates = Vec::new();

    for t0 in &v[0] {
        for t1 in &v[1] {
            for t2 in &v[2] {
                for t3 in &v[3] {
                    // 10th-round key; tuple bytes land on the diagonals the
                    // column grouping prescribes
                    let k: State = [
                        t0[0], t1[0], t2[0], t3[0],
                        t1[1], t2[1], t3[1], t0[1],
                        t2[2], t3[2], t0[2], t1[2],
                        t3[3], t0[3], t1[3], t2[3],
                    ];

                    // 9th-round key, one inverse schedule step
                    let mut h: State = [0; 16];
                    h[0x0] = k[0x0] ^ SBOX[(k[0x9] ^ k[0xd]) as usize] ^ 0x36;
                    h[0x1] = k[0x1] ^ SBOX[(k[0xa] ^ k[0xe]) as usize];
                    h[0x2] = k[0x2] ^ SBOX[(k[0xb] ^ k[0xf]) as usize];
                    h[0x3] = k[0x3] ^ SBOX[(k[0x8] ^ k[0xc]) as usize];
                    for i in 4..16 {
                        h[i] = k[i - 4] ^ k[i];
                    }

                    let f0 = gm[0]
                        [(inv_column(c, &k, &h, x, y, 0, &rows[0]) ^ inv_column(d, &k, &h, x, y, 0, &rows[0])) as usize];
                    let f1 = gm[1]
                        [(inv_column(c, &k, &h, x, y, 4, &rows[1]) ^ inv_column(d, &k, &h, x, y, 4, &rows[1])) as usize];
                    let f2 = gm[2]
                        [(inv_column(c, &k, &h, x, y, 8, &rows[2]) ^ inv_column(d, &k, &h, x, y, 8, &rows[2])) as usize];
                    let f3 = gm[3]
                        [(inv_column(c, &k, &h, x, y, 12, &rows[3]) ^ inv_column(d, &k, &h, x, y, 12, &rows[3])) as usize];

                    // all four equations must agree on one nonzero fault byte
                    if f0 == f1 && f1 == f2 && f2 == f3 && f0 != 0 {
                        candidates.push(k);
                    }
                }
            }
        }
    }
    candidates
}

/// Concatenates the per-shard survivors in shard order and walks each
/// 10th-round subkey back to its master key.
pub fn postproc(results: &[Vec<State>]) -> Vec<State> {
    results
        .iter()
        .flat_map(|shard| shard.iter().map(reconstruct))
        .collect()
}
