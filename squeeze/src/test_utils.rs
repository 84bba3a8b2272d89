//! Test utilities shared by the handler and codec tests.

use crate::config::Config;
use axum_test::{TestServer, multipart::Part};
use image::{DynamicImage, ImageOutputFormat, RgbImage, codecs::jpeg::JpegEncoder};
use std::io::Cursor;
use std::path::Path;

/// Development config writing artifacts to `output_dir`.
pub fn create_test_config(output_dir: &Path) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    }
}

pub fn create_test_server(config: Config) -> TestServer {
    crate::Application::new(config)
        .expect("Failed to create application")
        .into_test_server()
}

/// Smooth gradient, so JPEG output size tracks quality predictably
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) * 127 / (width + height).max(1)) as u8,
        ])
    })
}

pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_to(&mut out, ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn sample_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(&gradient(width, height))
        .unwrap();
    out
}

/// Multipart file part the compress handler accepts as `image`
pub fn image_part(data: &[u8], file_name: &str) -> Part {
    Part::bytes(data.to_vec())
        .file_name(file_name.to_string())
        .mime_type("application/octet-stream")
}
