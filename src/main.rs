use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};

use dfa_aes128::analysis::analyse;
use dfa_aes128::encryption;
use dfa_aes128::error::{Error, Result};
use dfa_aes128::io::{append_candidates, brute_force, create_output, read_pairs};
use dfa_aes128::log;
use dfa_aes128::utils::u8_array_to_hex;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// Recovers AES-128 master keys from pairs of correct and faulty
/// ciphertexts produced by a one-byte fault between the 8th and 9th
/// MixColumns.
struct Args {
    /// Number of worker threads, at least 1.
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    cores: u32,

    /// Byte position of the fault in {0, ..., 15}, or -1 when unknown to
    /// try every position.
    #[arg(value_parser = clap::value_parser!(i32).range(-1..=15), allow_negative_numbers = true)]
    location: i32,

    /// Whether to brute-force the remaining candidates against a known
    /// plaintext.
    #[arg(value_enum)]
    mode: Mode,

    /// Input file with one `correct faulty [plaintext]` hex record per
    /// line.
    file: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Mode {
    /// Brute-force the candidate list; every record needs a plaintext
    /// field.
    Bf,
    /// Write the candidate list only.
    Nobf,
}

/// The fault locations to try, as a half-open range.
fn location_range(location: i32) -> (usize, usize) {
    if location == -1 {
        (0, 16)
    } else {
        (location as usize, location as usize + 1)
    }
}

fn run(args: &Args) -> Result<()> {
    if !encryption::self_test() {
        return Err(Error::SelfTest);
    }

    // Size the worker pool once for the whole process
    rayon::ThreadPoolBuilder::new()
        .num_threads(args.cores as usize)
        .build_global()
        .map_err(|e| Error::Resource(e.to_string()))?;

    let bf = args.mode == Mode::Bf;
    let records = read_pairs(&args.file, bf)?;
    let (from, to) = location_range(args.location);

    fs::create_dir_all("res")?;

    for (i, record) in records.iter().enumerate() {
        log!("({i}) Analysing ciphertext pair:");
        log!(
            "{} {}",
            u8_array_to_hex(&record.c),
            u8_array_to_hex(&record.d)
        );
        log!("Number of core(s): {}", args.cores);

        let path = PathBuf::from(format!("res/{i}.csv"));
        let header = match &record.p {
            Some(p) if bf => Some((p, &record.c)),
            _ => None,
        };
        create_output(&path, header)?;

        let mut count = 0usize;
        for l in from..to {
            log!("----------------------------------------------------");
            log!("Fault location: {l}");
            let keys = analyse(&record.c, &record.d, l, args.cores as usize);
            count += keys.len();
            append_candidates(&path, &keys)?;
        }

        if bf {
            match brute_force(&path)? {
                Some(key) => {
                    log!("THE ONE KEY FOUND !!!");
                    log!("{}", u8_array_to_hex(&key));
                }
                None => log!("No candidate matches the known plaintext."),
            }
        }

        log!("{count} master keys written to {}", path.display());
    }
    Ok(())
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            process::exit(-1);
        }
    };

    if let Err(e) = run(&args) {
        log!("ERROR: {e}");
        process::exit(1);
    }
}
