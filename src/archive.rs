use ndarray::{Array1, Array4};
use serde::{Deserialize, Serialize};
use serde_pickle::{DeOptions, HashableValue, SerOptions, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Reads a whole pickle archive and returns its top-level dict.
///
/// All-or-nothing: a missing file, a truncated stream, or a non-dict top
/// level all fail here and propagate to the caller.
pub fn unpickle(path: &Path) -> Result<BTreeMap<HashableValue, Value>, Box<dyn Error>> {
    let file = File::open(path)
        .map_err(|e| format!("cannot open archive {}: {}", path.display(), e))?;
    let value = serde_pickle::value_from_reader(BufReader::new(file), DeOptions::new())?;
    match value {
        Value::Dict(dict) => Ok(dict),
        other => Err(format!(
            "expected a dict at the top level of {}, got {:?}",
            path.display(),
            other
        )
        .into()),
    }
}

/// Looks up a byte-string key in an unpickled dict.
pub fn dict_get<'a>(
    dict: &'a BTreeMap<HashableValue, Value>,
    key: &[u8],
) -> Result<&'a Value, Box<dyn Error>> {
    dict.get(&HashableValue::Bytes(key.to_vec()))
        .ok_or_else(|| format!("archive is missing key {:?}", String::from_utf8_lossy(key)).into())
}

/// The five-field output of the pipeline. Pickled as a mapping with these
/// string keys, matching the archive consumed downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedBundle {
    pub train_dataset: Array4<f32>,
    pub train_labels: Array1<i64>,
    pub test_dataset: Array4<f32>,
    pub test_labels: Array1<i64>,
    pub label_names: Vec<String>,
}

/// Writes the bundle to `path` in one call, highest protocol.
///
/// Failure here is logged with the destination path and then propagated;
/// this is the only handled failure in the pipeline.
pub fn save_bundle(path: &Path, bundle: &ProcessedBundle) -> Result<(), Box<dyn Error>> {
    let write = || -> Result<(), Box<dyn Error>> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_pickle::to_writer(&mut writer, bundle, SerOptions::new())?;
        writer.flush()?;
        Ok(())
    };
    match write() {
        Ok(()) => {
            println!("Done");
            Ok(())
        }
        Err(e) => {
            eprintln!("Unable to save data to {}: {}", path.display(), e);
            Err(e)
        }
    }
}

/// Reads back a bundle written by [`save_bundle`].
pub fn load_bundle(path: &Path) -> Result<ProcessedBundle, Box<dyn Error>> {
    let file = File::open(path)
        .map_err(|e| format!("cannot open bundle {}: {}", path.display(), e))?;
    let bundle = serde_pickle::from_reader(BufReader::new(file), DeOptions::new())?;
    Ok(bundle)
}
