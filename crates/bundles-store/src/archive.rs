//! Per-pair JSON archives of raw ensemble arrays.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bundles_core::ensemble::RunResult;
use bundles_core::pair::PairKey;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::StoreError;
use crate::layout::OutputLayout;

/// Write `value` as JSON to `path`, pretty-printed when `pretty` is set.
pub(crate) fn write_json<T: Serialize>(
    path: &Path,
    value: &T,
    pretty: bool,
) -> Result<(), StoreError> {
    let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let written = if pretty {
        serde_json::to_writer_pretty(&mut writer, value)
    } else {
        serde_json::to_writer(&mut writer, value)
    };
    written.map_err(|e| StoreError::json(path, e))?;
    writer.flush().map_err(|e| StoreError::io(path, e))
}

/// Read a JSON document from `path`.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| StoreError::json(path, e))
}

/// Write one pair's arrays to `W<W>_N<N>/timeseries.json`.
///
/// # Errors
///
/// Returns [`StoreError::Io`] or [`StoreError::Json`] if the directory or
/// file cannot be written.
pub fn write_run(layout: &OutputLayout, run: &RunResult) -> Result<PathBuf, StoreError> {
    let dir = layout.pair_dir(&run.key);
    fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
    let path = layout.archive_path(&run.key);
    write_json(&path, run, false)?;
    debug!(path = %path.display(), members = run.n_members(), "Archive written");
    Ok(path)
}

/// Read one pair's arrays.
///
/// # Errors
///
/// Returns [`StoreError::MissingPair`] if the pair has no archive, or
/// [`StoreError::Io`] / [`StoreError::Json`] if it cannot be read.
pub fn read_run(layout: &OutputLayout, key: &PairKey) -> Result<RunResult, StoreError> {
    let path = layout.archive_path(key);
    if !path.is_file() {
        return Err(StoreError::MissingPair {
            pair: key.dir_name(),
            root: layout.root().to_path_buf(),
        });
    }
    read_json(&path)
}
