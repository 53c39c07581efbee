#![allow(dead_code)]

use anyhow::Result;
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use video_datasets::readers::ClipLayout;

/// Writes one sequence directory of PNG frames; `pixel(t, x, y)` colors frame `t`.
pub fn write_sequence<F>(
    root: &Path,
    name: &str,
    frames: usize,
    (height, width): (u32, u32),
    pixel: F,
) -> Result<()>
where
    F: Fn(usize, u32, u32) -> [u8; 3],
{
    let dir = root.join(name);
    fs::create_dir_all(&dir)?;
    for t in 0..frames {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb(pixel(t, x, y)));
        img.save(dir.join(format!("{:04}.png", t)))?;
    }
    Ok(())
}

/// Single-color frames with a 5-frame burst of alternating colors starting at
/// `burst_start`.
pub fn burst_pixel(burst_start: usize) -> impl Fn(usize, u32, u32) -> [u8; 3] {
    move |t, _, _| {
        if (burst_start..burst_start + 5).contains(&t) && t % 2 == 0 {
            [250, 40, 10]
        } else {
            [20, 20, 200]
        }
    }
}

/// Left half static, right half flipping between black and white every frame.
pub fn half_moving_pixel(width: u32) -> impl Fn(usize, u32, u32) -> [u8; 3] {
    move |t, x, _| {
        if x >= width / 2 && t % 2 == 1 {
            [255, 255, 255]
        } else {
            [0, 0, 0]
        }
    }
}

/// Writes a serialized clip `<stem>.seq`; `value(t, x, y, c)` gives each byte.
pub fn write_clip<F>(dir: &Path, stem: &str, layout: &ClipLayout, value: F) -> Result<()>
where
    F: Fn(usize, u32, u32, usize) -> u8,
{
    fs::create_dir_all(dir)?;
    let channels = layout.depth.channels();
    let mut bytes = Vec::with_capacity(layout.clip_bytes());
    for t in 0..layout.sequence_length {
        for y in 0..layout.height {
            for x in 0..layout.width {
                for c in 0..channels {
                    bytes.push(value(t, x, y, c));
                }
            }
        }
    }
    fs::write(dir.join(format!("{}.seq", stem)), bytes)?;
    Ok(())
}
