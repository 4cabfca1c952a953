//! Flat-file input and output of the analyzer.
//!
//! Input is one record per line, two or three 32-character hex fields:
//! correct ciphertext, faulty ciphertext, and (for brute force) the
//! plaintext. Candidates for record `i` go to `res/<i>.csv`; in brute-force
//! mode that file starts with the plaintext and the correct ciphertext so
//! the brute-force pass can re-read everything it needs from one place.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::encryption::encrypt_block;
use crate::error::{Error, Result};
use crate::utils::{hex_to_u8_array, u8_array_to_hex, State};

/// One input line: a ciphertext pair and, under brute force, the plaintext.
#[derive(Debug, Clone)]
pub struct Record {
    pub c: State,
    pub d: State,
    pub p: Option<State>,
}

/// Reads every record of an input file. With `bf` set, a line without a
/// plaintext field is an error.
pub fn read_pairs(path: &Path, bf: bool) -> Result<Vec<Record>> {
    let file = File::open(path)?;
    let mut records = Vec::new();

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let lineno = idx + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (c, d, p) = match fields.as_slice() {
            [c, d] => (c, d, None),
            [c, d, p] => (c, d, Some(*p)),
            _ => return Err(Error::MalformedRecord(lineno)),
        };
        if bf && p.is_none() {
            return Err(Error::MissingPlaintext(lineno));
        }
        records.push(Record {
            c: hex_to_u8_array(c)?,
            d: hex_to_u8_array(d)?,
            p: p.map(hex_to_u8_array).transpose()?,
        });
    }
    Ok(records)
}

/// Creates (or truncates) a result file. In brute-force mode the plaintext
/// and correct ciphertext go in first, one line each.
pub fn create_output(path: &Path, header: Option<(&State, &State)>) -> Result<()> {
    let mut file = File::create(path)?;
    if let Some((plaintext, ciphertext)) = header {
        writeln!(file, "{}", u8_array_to_hex(plaintext))?;
        writeln!(file, "{}", u8_array_to_hex(ciphertext))?;
    }
    Ok(())
}

/// Appends one master-key line per candidate to a result file.
pub fn append_candidates(path: &Path, keys: &[State]) -> Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    for key in keys {
        writeln!(file, "{}", u8_array_to_hex(key))?;
    }
    Ok(())
}

/// Re-reads a result file written in brute-force mode and returns the first
/// candidate that encrypts the plaintext to the expected ciphertext, or
/// `None` when the list is exhausted.
pub fn brute_force(path: &Path) -> Result<Option<State>> {
    let file = File::open(path)?;
    let mut lines = BufReader::new(file).lines();

    let (Some(plain_line), Some(cipher_line)) = (lines.next(), lines.next()) else {
        return Ok(None);
    };
    let plaintext = hex_to_u8_array(plain_line?.trim())?;
    let expected = hex_to_u8_array(cipher_line?.trim())?;

    for line in lines {
        let key = hex_to_u8_array(line?.trim())?;
        if encrypt_block(&key, &plaintext) == expected {
            return Ok(Some(key));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::path::PathBuf;

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dfa-aes128-{}-{name}", std::process::id()))
    }

    #[test]
    fn reads_two_and_three_field_records() {
        let path = scratch_file("read.txt");
        std::fs::write(
            &path,
            "3925841d02dc09fbdc118597196a0b32 4d304e74f7815e0321bc76bbd715e629\n\
             3925841d02dc09fbdc118597196a0b32 4d304e74f7815e0321bc76bbd715e629 3243f6a8885a308d313198a2e0370734\n",
        )
        .unwrap();

        let records = read_pairs(&path, false).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].c[0], 0x39);
        assert_eq!(records[0].d[0], 0x4d);
        assert!(records[0].p.is_none());
        assert_eq!(records[1].p.unwrap()[0], 0x32);

        // brute force demands the third field
        assert!(read_pairs(&path, true).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rejects_malformed_lines() {
        let path = scratch_file("malformed.txt");
        std::fs::write(&path, "deadbeef\n").unwrap();
        assert!(read_pairs(&path, false).is_err());

        std::fs::write(&path, "xy25841d02dc09fbdc118597196a0b32 4d304e74f7815e0321bc76bbd715e629\n")
            .unwrap();
        assert!(read_pairs(&path, false).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_input_file_is_an_error() {
        assert!(read_pairs(Path::new("no-such-input-file"), false).is_err());
    }

    #[test]
    fn output_layout_round_trips() {
        let mut rng = rand::thread_rng();
        let path = scratch_file("out.csv");
        let p: State = rng.gen();
        let c: State = rng.gen();
        let keys: Vec<State> = (0..4).map(|_| rng.gen()).collect();

        create_output(&path, Some((&p, &c))).unwrap();
        append_candidates(&path, &keys[..2]).unwrap();
        append_candidates(&path, &keys[2..]).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], u8_array_to_hex(&p));
        assert_eq!(lines[1], u8_array_to_hex(&c));
        for (line, key) in lines[2..].iter().zip(&keys) {
            assert_eq!(*line, u8_array_to_hex(key));
        }
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn brute_force_finds_the_planted_key() {
        let mut rng = rand::thread_rng();
        let path = scratch_file("bf.csv");
        let key: State = rng.gen();
        let plain: State = rng.gen();
        let cipher = encrypt_block(&key, &plain);

        let mut candidates: Vec<State> = (0..16).map(|_| rng.gen()).collect();
        candidates.insert(11, key);

        create_output(&path, Some((&plain, &cipher))).unwrap();
        append_candidates(&path, &candidates).unwrap();

        assert_eq!(brute_force(&path).unwrap(), Some(key));
        std::fs::remove_file(&path).unwrap();
    }

    /// Whole-tool scenario: analyse a genuinely faulted pair, write the
    /// result file, and let brute force single out the planted key. Sweeps
    /// the full keyspace, so run it as `cargo test --release -- --ignored`.
    #[test]
    #[ignore]
    fn brute_force_disambiguates_pipeline_output() {
        use crate::analysis::analyse;
        use crate::encryption::encrypt_block_with_fault;

        let mut rng = rand::thread_rng();
        let key: State = rng.gen();
        let plain: State = rng.gen();
        let c = encrypt_block(&key, &plain);
        let d = encrypt_block_with_fault(&key, &plain, 5, rng.gen_range(1..=255));

        let keys = analyse(&c, &d, 5, 4);
        assert!(keys.contains(&key));

        let path = scratch_file("e2e.csv");
        create_output(&path, Some((&plain, &c))).unwrap();
        append_candidates(&path, &keys).unwrap();

        assert_eq!(brute_force(&path).unwrap(), Some(key));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn brute_force_exhaustion_is_not_an_error() {
        let mut rng = rand::thread_rng();
        let path = scratch_file("bf-none.csv");
        let plain: State = rng.gen();
        let cipher: State = rng.gen();
        let decoys: Vec<State> = (0..8).map(|_| rng.gen()).collect();

        create_output(&path, Some((&plain, &cipher))).unwrap();
        append_candidates(&path, &decoys).unwrap();

        assert_eq!(brute_force(&path).unwrap(), None);
        std::fs::remove_file(&path).unwrap();
    }
}
