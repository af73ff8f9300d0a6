//! Read and write simulation patterns
//!
//! The file format is one line per primary input, each line the simulation
//! values of that input as a hexadecimal string. All lines have the same
//! length.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::sim::TruthTable;

/// Write a pattern pool to a file, one hex line per input
pub fn write_pattern_file(path: &Path, patterns: &[TruthTable]) -> io::Result<()> {
    let f = File::create(path)?;
    let mut out = BufWriter::new(f);
    for t in patterns {
        writeln!(out, "{}", t.to_hex())?;
    }
    out.flush()
}

/// Read a pattern pool from a file, one hex line per input
///
/// Fails if the lines do not parse as hexadecimal or have different lengths.
pub fn read_pattern_file(path: &Path) -> io::Result<Vec<TruthTable>> {
    let f = File::open(path)?;
    let mut patterns = Vec::new();
    for line in BufReader::new(f).lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let t = TruthTable::from_hex(&line).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "invalid hex pattern line")
        })?;
        if let Some(first) = patterns.first() {
            if first.nb_bits() != t.nb_bits() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "pattern lines have different lengths",
                ));
            }
        }
        patterns.push(t);
    }
    Ok(patterns)
}
