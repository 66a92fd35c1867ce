use crate::util::encode_data_uri;
use anyhow::{anyhow, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::path::Path;
use tracing::{debug, warn};

/// Bounds for the ingestion pipeline. Uploads are scaled down to fit
/// max_width x max_height, encoded as JPEG at `quality`, and re-encoded once
/// at `retry_quality` if the first pass exceeds `max_encoded_bytes`.
#[derive(Debug, Clone, Copy)]
pub struct IngestLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub max_encoded_bytes: usize,
    pub quality: u8,
    pub retry_quality: u8,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 600,
            max_encoded_bytes: 500_000,
            quality: 80,
            retry_quality: 60,
        }
    }
}

/// One user-selected file, read into memory along with its declared media
/// type. The type is what the picker claims, not a sniffed one; misnamed
/// files are caught later by the decoder.
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageSource {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("<unnamed>")
            .to_string();
        let media_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string());
        Ok(Self { name, media_type, bytes })
    }
}

/// Final compressed payload, ready to be stored inline.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
    pub encoded_len: usize,
}

/// A file the batch skipped, with a user-presentable reason.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

/// Everything one upload action produced. Successes keep input order;
/// per-file failures land in `skipped` and never abort the batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub images: Vec<ProcessedImage>,
    pub skipped: Vec<SkippedFile>,
}

/// Compute the scaled-down size preserving aspect ratio. Never upscales.
/// Tie-break matches the original pipeline: landscape inputs are constrained
/// by width first, everything else by height first.
pub fn fit_dimensions(width: u32, height: u32, limits: &IngestLimits) -> (u32, u32) {
    let (mut w, mut h) = (width as f64, height as f64);
    if width > height {
        if w > limits.max_width as f64 {
            h = h * limits.max_width as f64 / w;
            w = limits.max_width as f64;
        }
    } else if h > limits.max_height as f64 {
        w = w * limits.max_height as f64 / h;
        h = limits.max_height as f64;
    }
    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut enc = JpegEncoder::new_with_quality(&mut buf, quality);
    enc.encode_image(&img.to_rgb8())?;
    Ok(buf)
}

/// Run the full per-file pipeline: media-type gate, decode, resize,
/// two-pass JPEG encode, data-URI serialize.
pub fn compress_image(src: &ImageSource, limits: &IngestLimits) -> Result<ProcessedImage> {
    match &src.media_type {
        Some(mt) if mt.starts_with("image/") => {}
        Some(mt) => return Err(anyhow!("not an image file (type {})", mt)),
        None => return Err(anyhow!("not an image file (unknown type)")),
    }

    let img = image::load_from_memory(&src.bytes)
        .map_err(|e| anyhow!("could not decode image: {}", e))?;

    let (tw, th) = fit_dimensions(img.width(), img.height(), limits);
    let resized = if (tw, th) != (img.width(), img.height()) {
        img.resize_exact(tw, th, FilterType::Triangle)
    } else {
        img
    };

    let mut encoded = encode_jpeg(&resized, limits.quality)?;
    if encoded.len() > limits.max_encoded_bytes {
        debug!(
            "first pass for {} is {} bytes, re-encoding at quality {}",
            src.name,
            encoded.len(),
            limits.retry_quality
        );
        // Single retry; the result is kept even if still over the threshold.
        encoded = encode_jpeg(&resized, limits.retry_quality)?;
    }

    Ok(ProcessedImage {
        data_uri: encode_data_uri("image/jpeg", &encoded),
        width: tw,
        height: th,
        encoded_len: encoded.len(),
    })
}

/// Process one upload batch. Files run concurrently on blocking threads, but
/// the outcome is only returned once every file has settled, so the caller
/// commits the whole batch in a single step. Output order follows input
/// order.
pub async fn process_batch(files: Vec<ImageSource>, limits: IngestLimits) -> BatchOutcome {
    let tasks: Vec<_> = files
        .into_iter()
        .map(|src| {
            tokio::task::spawn_blocking(move || {
                let name = src.name.clone();
                (name, compress_image(&src, &limits))
            })
        })
        .collect();

    let mut outcome = BatchOutcome::default();
    for joined in futures::future::join_all(tasks).await {
        match joined {
            Ok((name, Ok(img))) => {
                debug!(
                    "processed {} -> {}x{}, {} bytes",
                    name, img.width, img.height, img.encoded_len
                );
                outcome.images.push(img);
            }
            Ok((name, Err(e))) => {
                warn!("skipping {}: {}", name, e);
                outcome.skipped.push(SkippedFile { name, reason: e.to_string() });
            }
            Err(e) => {
                warn!("image task failed: {}", e);
                outcome.skipped.push(SkippedFile {
                    name: "<unknown>".into(),
                    reason: e.to_string(),
                });
            }
        }
    }
    outcome
}
