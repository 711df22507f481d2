//! CIFAR-100 pickle batches.
//!
//! A batch archive is a dict with byte-string keys: `b"data"` holds one row
//! per image (3072 channel-major pixels, either a bytes buffer or a list of
//! ints) and `b"fine_labels"` one int per image. The meta archive holds
//! `b"fine_label_names"`, the class names indexed by fine label.
use crate::archive::{dict_get, unpickle};
use ndarray::{Array1, Array2};
use serde_pickle::Value;
use std::error::Error;
use std::path::Path;

pub const IMAGE_SIDE: usize = 32;
pub const CHANNELS: usize = 3;
pub const ROW_WIDTH: usize = IMAGE_SIDE * IMAGE_SIDE * CHANNELS;
pub const NUM_CLASSES: usize = 100;

pub struct Batch {
    /// Flat pixel rows, `[N, 3072]`, intensities promoted to f32.
    pub data: Array2<f32>,
    /// Fine labels, `[N]`, aligned with `data`.
    pub fine_labels: Array1<i64>,
}

pub fn load_batch(path: &Path) -> Result<Batch, Box<dyn Error>> {
    let dict = unpickle(path)?;

    let rows = match dict_get(&dict, b"data")? {
        Value::List(rows) => rows,
        other => return Err(format!("data must be a list of rows, got {:?}", other).into()),
    };
    let mut data = Vec::with_capacity(rows.len() * ROW_WIDTH);
    for row in rows {
        let before = data.len();
        match row {
            Value::Bytes(bytes) => data.extend(bytes.iter().map(|&b| b as f32)),
            Value::List(pixels) => {
                for pixel in pixels {
                    data.push(pixel_value(pixel)?);
                }
            }
            other => return Err(format!("unsupported pixel row: {:?}", other).into()),
        }
        if data.len() - before != ROW_WIDTH {
            return Err(format!(
                "pixel row has {} values, expected {}",
                data.len() - before,
                ROW_WIDTH
            )
            .into());
        }
    }
    let data = Array2::from_shape_vec((rows.len(), ROW_WIDTH), data)?;

    let fine_labels = match dict_get(&dict, b"fine_labels")? {
        Value::List(labels) => labels
            .iter()
            .map(|v| match v {
                Value::I64(l) => Ok(*l),
                other => Err(format!("label must be an int, got {:?}", other).into()),
            })
            .collect::<Result<Vec<i64>, Box<dyn Error>>>()?,
        other => return Err(format!("fine_labels must be a list, got {:?}", other).into()),
    };
    if fine_labels.len() != data.nrows() {
        return Err(format!(
            "{} images but {} labels in {}",
            data.nrows(),
            fine_labels.len(),
            path.display()
        )
        .into());
    }

    Ok(Batch {
        data,
        fine_labels: Array1::from_vec(fine_labels),
    })
}

pub fn load_label_names(path: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let dict = unpickle(path)?;
    match dict_get(&dict, b"fine_label_names")? {
        Value::List(names) => names
            .iter()
            .map(|v| match v {
                Value::Bytes(bytes) => Ok(String::from_utf8(bytes.clone())?),
                Value::String(s) => Ok(s.clone()),
                other => Err(format!("label name must be a string, got {:?}", other).into()),
            })
            .collect(),
        other => Err(format!("fine_label_names must be a list, got {:?}", other).into()),
    }
}

fn pixel_value(value: &Value) -> Result<f32, Box<dyn Error>> {
    match value {
        Value::I64(v) => Ok(*v as f32),
        Value::F64(v) => Ok(*v as f32),
        other => Err(format!("unsupported pixel value: {:?}", other).into()),
    }
}
