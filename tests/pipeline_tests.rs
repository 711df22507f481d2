use cifar_prep::archive::load_bundle;
use cifar_prep::data::cifar::{load_batch, load_label_names};
use cifar_prep::pipeline::{run, PipelineConfig};
use cifar_prep::vis::save_sample_grid;
use ndarray::{Array1, Array4, Axis};
use serde_pickle::{HashableValue, SerOptions, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// Writes a CIFAR-style batch pickle: one 3072-byte row per image, every
/// pixel of image i set to `fills[i]`, plus the fine labels.
fn write_batch(path: &Path, fills: &[u8], labels: &[i64]) {
    let mut dict = BTreeMap::new();
    dict.insert(
        HashableValue::Bytes(b"data".to_vec()),
        Value::List(fills.iter().map(|&v| Value::Bytes(vec![v; 3072])).collect()),
    );
    dict.insert(
        HashableValue::Bytes(b"fine_labels".to_vec()),
        Value::List(labels.iter().map(|&l| Value::I64(l)).collect()),
    );
    let mut file = File::create(path).unwrap();
    serde_pickle::value_to_writer(&mut file, &Value::Dict(dict), SerOptions::new()).unwrap();
}

fn write_meta(path: &Path, names: &[&str]) {
    let mut dict = BTreeMap::new();
    dict.insert(
        HashableValue::Bytes(b"fine_label_names".to_vec()),
        Value::List(
            names
                .iter()
                .map(|n| Value::Bytes(n.as_bytes().to_vec()))
                .collect(),
        ),
    );
    let mut file = File::create(path).unwrap();
    serde_pickle::value_to_writer(&mut file, &Value::Dict(dict), SerOptions::new()).unwrap();
}

#[test]
fn batch_loading_extracts_pixels_and_labels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train");
    write_batch(&path, &[10, 20], &[3, 7]);

    let batch = load_batch(&path).unwrap();
    assert_eq!(batch.data.dim(), (2, 3072));
    assert_eq!(batch.data[[0, 0]], 10.0);
    assert_eq!(batch.data[[1, 3071]], 20.0);
    assert_eq!(batch.fine_labels.to_vec(), vec![3, 7]);
}

#[test]
fn batch_loading_rejects_label_count_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train");
    write_batch(&path, &[10, 20], &[3]);

    assert!(load_batch(&path).is_err());
}

#[test]
fn meta_loading_extracts_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meta");
    write_meta(&path, &["apple", "bear"]);

    let names = load_label_names(&path).unwrap();
    assert_eq!(names, vec!["apple".to_string(), "bear".to_string()]);
}

#[test]
fn sample_grid_writes_a_png() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.png");

    let images = Array4::<f32>::from_elem((4, 32, 32, 3), 128.0);
    let labels = Array1::from_vec(vec![0i64, 1, 2, 3]);
    let names: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();

    save_sample_grid(&images, &labels, &names, &path, true).unwrap();

    let (w, h) = image::image_dimensions(&path).unwrap();
    assert_eq!((w, h), (128, 64));
}

#[test]
fn sample_grid_fails_without_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("grid.png");

    let images = Array4::<f32>::zeros((4, 32, 32, 3));
    let labels = Array1::from_vec(vec![0i64, 1, 2, 3]);
    let names = vec!["a".to_string()];

    assert!(save_sample_grid(&images, &labels, &names, &path, true).is_err());
}

#[test]
fn pipeline_end_to_end() {
    let dir = tempfile::tempdir().unwrap();

    // Image i is a flat field of value i*10, labeled i, so the image/label
    // pairing survives shuffling and sharpening (flat fields pass through
    // the kernel unchanged) and stays checkable.
    write_batch(
        &dir.path().join("train"),
        &[0, 10, 20, 30],
        &[0, 1, 2, 3],
    );
    write_batch(&dir.path().join("test"), &[10, 30], &[1, 3]);
    write_meta(&dir.path().join("meta"), &["apple", "bear", "cat", "dog"]);

    let config = PipelineConfig {
        train_path: dir.path().join("train"),
        test_path: dir.path().join("test"),
        meta_path: dir.path().join("meta"),
        output_path: dir.path().join("processed.pickle"),
        sample_grid_path: dir.path().join("plt.png"),
        shuffle_seed: Some(42),
        caption_by_grid_position: true,
    };
    run(&config).unwrap();

    let bundle = load_bundle(&config.output_path).unwrap();
    assert_eq!(bundle.train_dataset.dim(), (4, 32, 32, 3));
    assert_eq!(bundle.test_dataset.dim(), (2, 32, 32, 3));
    assert_eq!(bundle.label_names.len(), 4);

    // The train labels are a permutation of the originals.
    let mut sorted = bundle.train_labels.to_vec();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2, 3]);

    // Every image still maps to the class it was labeled with before the
    // shuffle: label i <-> flat value i*10.
    for k in 0..4 {
        let label = bundle.train_labels[k];
        let tile = bundle.train_dataset.index_axis(Axis(0), k);
        assert!(tile.iter().all(|&v| v == (label * 10) as f32));
    }

    // The test split is untouched apart from sharpening.
    assert_eq!(bundle.test_labels.to_vec(), vec![1, 3]);
    assert!(bundle
        .test_dataset
        .index_axis(Axis(0), 0)
        .iter()
        .all(|&v| v == 10.0));

    // The sample grid was rendered as a side effect.
    assert!(config.sample_grid_path.exists());
}
