// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! ASCII target files.
//!
//! The exchange format for interpolation targets: whitespace-separated
//! tokens, with a `ndim npoints nvar` header followed by one record per
//! point holding `ndim` coordinates and `nvar` scalar variables. Values are
//! written in scientific notation with eight fractional digits in 15-column
//! fields, wide enough that a write/read cycle reproduces the data.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::{FromStr, SplitWhitespace};

use thiserror::Error;

/// Most dimensions a target file may declare.
pub const MAX_TARGET_DIMENSION: usize = 3;

/// Failure while reading or writing a target file.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The file could not be opened, read, or written.
    #[error("target file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The file ended before the header or body was complete.
    #[error("target file is truncated")]
    Truncated,
    /// A token could not be parsed as a number.
    #[error("unparsable token {token:?} in target file")]
    Parse {
        /// The offending token.
        token: String,
    },
    /// The declared dimension count is out of range.
    #[error("unsupported dimension count {0} in target file")]
    UnsupportedDimension(usize),
}

/// In-memory contents of a target file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetFile {
    /// Spatial dimension of the points, at most [`MAX_TARGET_DIMENSION`].
    pub ndim: usize,
    /// Number of points.
    pub npoints: usize,
    /// Number of scalar variables per point.
    pub nvar: usize,
    /// Interleaved coordinates, `npoints * ndim` values.
    pub coordinates: Vec<f64>,
    /// Interleaved variables, `npoints * nvar` values.
    pub variables: Vec<f64>,
}

fn next_token<T: FromStr>(tokens: &mut SplitWhitespace<'_>) -> Result<T, TargetError> {
    let token = tokens.next().ok_or(TargetError::Truncated)?;
    token.parse().map_err(|_| TargetError::Parse {
        token: token.to_owned(),
    })
}

/// Read a target file from `path`.
pub fn read_target_file(path: impl AsRef<Path>) -> Result<TargetFile, TargetError> {
    let text = fs::read_to_string(path)?;
    let mut tokens = text.split_whitespace();

    let ndim: usize = next_token(&mut tokens)?;
    if ndim > MAX_TARGET_DIMENSION {
        return Err(TargetError::UnsupportedDimension(ndim));
    }
    let npoints: usize = next_token(&mut tokens)?;
    let nvar: usize = next_token(&mut tokens)?;

    let mut coordinates = Vec::with_capacity(npoints * ndim);
    let mut variables = Vec::with_capacity(npoints * nvar);
    for _ in 0..npoints {
        for _ in 0..ndim {
            coordinates.push(next_token(&mut tokens)?);
        }
        for _ in 0..nvar {
            variables.push(next_token(&mut tokens)?);
        }
    }

    Ok(TargetFile {
        ndim,
        npoints,
        nvar,
        coordinates,
        variables,
    })
}

/// Write a target file to `path`, replacing any existing file.
///
/// The target's array lengths must match its declared shape.
pub fn write_target_file(path: impl AsRef<Path>, target: &TargetFile) -> Result<(), TargetError> {
    assert_eq!(
        target.coordinates.len(),
        target.npoints * target.ndim,
        "coordinate array does not match the declared shape"
    );
    assert_eq!(
        target.variables.len(),
        target.npoints * target.nvar,
        "variable array does not match the declared shape"
    );

    let file = fs::File::create(path)?;
    let mut out = BufWriter::new(file);

    writeln!(
        out,
        "{:>10}{:>10}{:>10}",
        target.ndim, target.npoints, target.nvar
    )?;
    for i in 0..target.npoints {
        for j in 0..target.ndim {
            write!(out, "{:>15.8e}", target.coordinates[i * target.ndim + j])?;
        }
        for j in 0..target.nvar {
            write!(out, "{:>15.8e}", target.variables[i * target.nvar + j])?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("parcel_targets_{}_{}", std::process::id(), name));
        path
    }

    #[test]
    fn write_then_read_round_trips() {
        let target = TargetFile {
            ndim: 3,
            npoints: 2,
            nvar: 2,
            coordinates: vec![0.125, -4.5, 100.0, 1.0e-7, 3.25, -0.000244140625],
            variables: vec![1.5, 2.5, -3.5, 4.5],
        };
        let path = scratch_path("round_trip");
        write_target_file(&path, &target).unwrap();
        let read_back = read_target_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(read_back, target);
    }

    #[test]
    fn reader_accepts_free_form_whitespace() {
        let path = scratch_path("free_form");
        std::fs::write(&path, "1 2 0\n  0.5\n\t1.5\n").unwrap();
        let target = read_target_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(target.ndim, 1);
        assert_eq!(target.coordinates, [0.5, 1.5]);
        assert!(target.variables.is_empty());
    }

    #[test]
    fn reader_rejects_high_dimensions() {
        let path = scratch_path("high_dim");
        std::fs::write(&path, "4 1 0\n0 0 0 0\n").unwrap();
        let err = read_target_file(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, TargetError::UnsupportedDimension(4)));
    }

    #[test]
    fn reader_reports_truncated_bodies() {
        let path = scratch_path("truncated");
        std::fs::write(&path, "2 2 0\n0.0 1.0\n2.0\n").unwrap();
        let err = read_target_file(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, TargetError::Truncated));
    }

    #[test]
    fn reader_reports_bad_tokens() {
        let path = scratch_path("bad_token");
        std::fs::write(&path, "1 1 0\nbogus\n").unwrap();
        let err = read_target_file(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, TargetError::Parse { .. }));
    }
}
