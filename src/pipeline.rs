use crate::archive::{save_bundle, ProcessedBundle};
use crate::data::cifar::{load_batch, load_label_names};
use crate::transform::{reshape_images, sharpen, shuffle_in_unison};
use crate::vis::save_sample_grid;
use std::error::Error;
use std::path::PathBuf;

/// Paths and knobs for one pipeline run. `Default` matches the historical
/// fixed relative paths; there is no other configuration surface.
pub struct PipelineConfig {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub meta_path: PathBuf,
    pub output_path: PathBuf,
    pub sample_grid_path: PathBuf,
    /// `None` shuffles differently every run.
    pub shuffle_seed: Option<u64>,
    /// Caption sample tiles by grid position (historical) rather than by
    /// sampled index.
    pub caption_by_grid_position: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            train_path: PathBuf::from("./cifar-100-python/train"),
            test_path: PathBuf::from("./cifar-100-python/test"),
            meta_path: PathBuf::from("./cifar-100-python/meta"),
            output_path: PathBuf::from("CIFAR_100_processed.pickle"),
            sample_grid_path: PathBuf::from("./output_images/plt.png"),
            shuffle_seed: None,
            caption_by_grid_position: true,
        }
    }
}

/// Runs the whole pipeline: load, reshape, shuffle the train split, render a
/// sample grid, sharpen both splits in place, render the grid again, and
/// pickle the five-field bundle to `config.output_path`.
pub fn run(config: &PipelineConfig) -> Result<(), Box<dyn Error>> {
    println!("Loading Data..");
    let train = load_batch(&config.train_path)?;
    let test = load_batch(&config.test_path)?;
    let label_names = load_label_names(&config.meta_path)?;

    println!("Shuffling Data..");
    let train_data = reshape_images(train.data)?;
    let mut test_data = reshape_images(test.data)?;
    let (mut train_data, train_labels) =
        shuffle_in_unison(train_data, train.fine_labels, config.shuffle_seed);
    let test_labels = test.fine_labels;

    println!("Sharpening Data..");
    save_sample_grid(
        &train_data,
        &train_labels,
        &label_names,
        &config.sample_grid_path,
        config.caption_by_grid_position,
    )?;

    sharpen(&mut train_data);
    sharpen(&mut test_data);

    save_sample_grid(
        &train_data,
        &train_labels,
        &label_names,
        &config.sample_grid_path,
        config.caption_by_grid_position,
    )?;

    println!("Pickling Normalized Data..");
    let bundle = ProcessedBundle {
        train_dataset: train_data,
        train_labels,
        test_dataset: test_data,
        test_labels,
        label_names,
    };
    save_bundle(&config.output_path, &bundle)
}
