/*!
 * # Differential Fault Analysis of AES-128
 *
 * ## Overview
 * This crate recovers the 128-bit master key of AES-128 from a single pair
 * of correct and faulty ciphertexts, following the Piret-Quisquater attack:
 * a one-byte fault injected into the state between the inputs of the 8th
 * and 9th MixColumns leaves enough differential structure in the ciphertext
 * pair to pin the 10th-round subkey down to a small candidate set.
 *
 * ## Features
 * - Per-byte differential tables and a column-wise standard filter
 * - A combinatorial improved filter checking four inverse-round fault
 *   equations over every candidate subkey, parallelized with rayon
 * - Key-schedule inversion from the recovered 10th-round subkey
 * - An optional brute-force pass that picks the unique true key with a
 *   known plaintext/ciphertext pair
 * - Command-line interface over flat text files of hex-encoded pairs
 *
 * ## Dependencies
 * - `rayon` for distributing the improved filter over worker threads
 * - `aes` for a known-good reference cipher in the self-test
 * - `clap` for command-line argument parsing
 * - `chrono` for timestamped progress output
 * - `rand` for random inputs in tests
 *
 * ## Usage
 * ```text
 * dfa <cores> <location> <bf|nobf> <file>
 * ```
 * analyses every ciphertext pair in `file`, writing the candidate master
 * keys of pair `i` to `res/<i>.csv`. A `location` of -1 tries all sixteen
 * byte positions.
 *
 * ## Testing
 * The cheap tests run with a plain `cargo test`. The full-keyspace
 * scenarios sweep about 2^32 subkey candidates and are ignored by default:
 * ```text
 * cargo test --release -- --ignored
 * ```
 */

pub mod analysis;
pub mod decryption;
pub mod encryption;
pub mod error;
pub mod io;
pub mod key_expansion;
pub mod tables;
pub mod utils;
