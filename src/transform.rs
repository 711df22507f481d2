//! Array transforms over the image tensor: reshape, joint shuffle,
//! unsharp-mask sharpen, validation-set extraction.
use crate::data::cifar::{CHANNELS, IMAGE_SIDE};
use ndarray::{Array1, Array2, Array3, Array4, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::error::Error;

/// Converts flat `[N, 3072]` rows (channel-major) into `[N, 32, 32, 3]`.
///
/// The flat buffer is reinterpreted as `[N, 3, 32, 32]` and the channel axis
/// moved last. Returns an owned standard-layout array.
pub fn reshape_images(flat: Array2<f32>) -> Result<Array4<f32>, Box<dyn Error>> {
    let n = flat.nrows();
    let chw = flat.into_shape((n, CHANNELS, IMAGE_SIDE, IMAGE_SIDE))?;
    Ok(chw.permuted_axes([0, 2, 3, 1]).as_standard_layout().to_owned())
}

/// Shuffles images and labels with one shared permutation along axis 0.
///
/// `seed` of `None` draws a fresh permutation from entropy each call; `Some`
/// makes the shuffle reproducible.
pub fn shuffle_in_unison(
    images: Array4<f32>,
    labels: Array1<i64>,
    seed: Option<u64>,
) -> (Array4<f32>, Array1<i64>) {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let mut permutation: Vec<usize> = (0..images.len_of(Axis(0))).collect();
    permutation.shuffle(&mut rng);

    let shuffled_images = images.select(Axis(0), &permutation);
    let shuffled_labels = labels.select(Axis(0), &permutation);
    (shuffled_images, shuffled_labels)
}

// Unsharp mask: a binomial blur with a heavy negative center, scaled so the
// taps sum to a DC gain of +1.
const SHARPEN_TAPS: [[f32; 5]; 5] = [
    [1.0, 4.0, 6.0, 4.0, 1.0],
    [4.0, 16.0, 24.0, 16.0, 4.0],
    [6.0, 24.0, -476.0, 24.0, 6.0],
    [4.0, 16.0, 24.0, 16.0, 4.0],
    [1.0, 4.0, 6.0, 4.0, 1.0],
];
const SHARPEN_SCALE: f32 = -1.0 / 256.0;

/// Sharpens every image in place, overwriting each `[i]` slice with its
/// filtered version. Same-size output, reflect-101 borders.
pub fn sharpen(images: &mut Array4<f32>) {
    let (n, height, width, channels) = images.dim();
    let mut filtered = Array3::<f32>::zeros((height, width, channels));
    for i in 0..n {
        {
            let img = images.index_axis(Axis(0), i);
            for y in 0..height {
                for x in 0..width {
                    for c in 0..channels {
                        let mut acc = 0.0f32;
                        for (ky, row) in SHARPEN_TAPS.iter().enumerate() {
                            let sy = reflect(y as isize + ky as isize - 2, height);
                            for (kx, tap) in row.iter().enumerate() {
                                let sx = reflect(x as isize + kx as isize - 2, width);
                                acc += tap * img[[sy, sx, c]];
                            }
                        }
                        filtered[[y, x, c]] = SHARPEN_SCALE * acc;
                    }
                }
            }
        }
        images.index_axis_mut(Axis(0), i).assign(&filtered);
    }
}

// Mirrors an out-of-range index without repeating the edge sample.
fn reflect(index: isize, len: usize) -> usize {
    let last = len as isize - 1;
    let mut i = index;
    while i < 0 || i > last {
        if i < 0 {
            i = -i;
        }
        if i > last {
            i = 2 * last - i;
        }
    }
    i as usize
}

/// Extracts a fixed-size validation subset, walking images in array order.
///
/// With `gate_by_class_count` false an image is taken whenever its label
/// value is below `count_per_class` (the historical behavior, which skips
/// every class numbered `count_per_class` and up); with it true each class
/// contributes at most `count_per_class` images. Output arrays are
/// zero-padded if the source runs out before `count_per_class * num_classes`
/// images are collected.
pub fn extract_validation_set(
    images: &Array4<f32>,
    labels: &Array1<i64>,
    count_per_class: usize,
    num_classes: usize,
    gate_by_class_count: bool,
) -> (Array4<f32>, Array1<i64>) {
    let valid_size = count_per_class * num_classes;
    let mut valid_images = Array4::<f32>::zeros((valid_size, IMAGE_SIDE, IMAGE_SIDE, CHANNELS));
    let mut valid_labels = Array1::<i64>::zeros(valid_size);
    let mut counter = vec![0usize; num_classes];

    let mut valid_index = 0;
    for i in 0..images.len_of(Axis(0)) {
        let label = labels[i];
        let take = if gate_by_class_count {
            (label as usize) < num_classes && counter[label as usize] < count_per_class
        } else {
            (label as usize) < count_per_class
        };
        if !take {
            continue;
        }
        valid_images
            .index_axis_mut(Axis(0), valid_index)
            .assign(&images.index_axis(Axis(0), i));
        valid_labels[valid_index] = label;
        valid_index += 1;
        counter[label as usize] += 1;
        if valid_index == valid_size {
            break;
        }
    }

    (valid_images, valid_labels)
}
