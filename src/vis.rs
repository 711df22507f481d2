use image::{ImageBuffer, Rgb};
use ndarray::{Array1, Array4};
use rand::seq::index;
use rand::thread_rng;
use std::error::Error;
use std::path::Path;

pub const SAMPLE_COUNT: usize = 8;
const GRID_COLS: usize = 4;

/// Renders a random sample of the dataset as a 2x4 grid PNG.
///
/// Picks up to [`SAMPLE_COUNT`] distinct indices, min/max-normalizes the
/// sampled pixels to [0, 255], and writes the tiles row-major to `path`,
/// overwriting any previous grid. Each tile's class name is printed to the
/// console: with `caption_by_grid_position` true the name is looked up from
/// the label at the tile's grid position (the historical behavior), with it
/// false from the label at the sampled index. The dataset itself is left
/// untouched. Saving fails if the parent directory does not exist.
pub fn save_sample_grid(
    images: &Array4<f32>,
    labels: &Array1<i64>,
    label_names: &[String],
    path: &Path,
    caption_by_grid_position: bool,
) -> Result<(), Box<dyn Error>> {
    let (n, height, width, channels) = images.dim();
    if channels != 3 {
        return Err(format!("sample grid expects 3 channels, got {}", channels).into());
    }
    let count = SAMPLE_COUNT.min(n);
    let items = index::sample(&mut thread_rng(), n, count).into_vec();

    let min_val = items
        .iter()
        .flat_map(|&item| images.index_axis(ndarray::Axis(0), item))
        .fold(f32::INFINITY, |a, &b| a.min(b));
    let max_val = items
        .iter()
        .flat_map(|&item| images.index_axis(ndarray::Axis(0), item))
        .fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let range = if (max_val - min_val).abs() < 1e-6 {
        1.0
    } else {
        max_val - min_val
    };

    let rows = SAMPLE_COUNT.div_ceil(GRID_COLS);
    let mut grid: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::new((GRID_COLS * width) as u32, (rows * height) as u32);

    for (i, &item) in items.iter().enumerate() {
        let x0 = (i % GRID_COLS) * width;
        let y0 = (i / GRID_COLS) * height;
        let tile = images.index_axis(ndarray::Axis(0), item);
        for y in 0..height {
            for x in 0..width {
                let pixel = Rgb([
                    normalize(tile[[y, x, 0]], min_val, range),
                    normalize(tile[[y, x, 1]], min_val, range),
                    normalize(tile[[y, x, 2]], min_val, range),
                ]);
                grid.put_pixel((x0 + x) as u32, (y0 + y) as u32, pixel);
            }
        }

        let label = if caption_by_grid_position {
            labels[i]
        } else {
            labels[item]
        };
        let name = label_names
            .get(label as usize)
            .map(String::as_str)
            .unwrap_or("?");
        println!("sample tile {}: {}", i, name);
    }

    grid.save(path)?;
    Ok(())
}

fn normalize(value: f32, min_val: f32, range: f32) -> u8 {
    (((value - min_val) / range) * 255.0) as u8
}
