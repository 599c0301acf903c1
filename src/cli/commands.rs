use anyhow::{Context, Result};
use futures::future::try_join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{
    ColorizeOptions, EnhanceOptions, ExpandOptions, OcrFormat, OcrLanguage, OcrOptions, PicWish,
    RemoveBackgroundOptions, T2iQuality, T2iSize, T2iTheme, TextToImageRequest,
};
use crate::results::ResultAsset;

/// Run `work` behind a spinner that stays up until it resolves
async fn with_spinner<T, F>(message: String, work: F) -> Result<T>
where
    F: Future<Output = crate::Result<T>>,
{
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} [{elapsed_precise}] {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));

    let result = work.await;
    match &result {
        Ok(_) => pb.finish_and_clear(),
        Err(_) => pb.abandon_with_message("failed"),
    }
    Ok(result?)
}

/// Save a result and report where it went
async fn save_asset(asset: &ResultAsset, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    asset
        .save(output)
        .await
        .with_context(|| format!("Failed to save {}", asset.url()))?;
    let size = asset.bytes().await?.len() as u64;
    println!("{} ({})", output.display(), format_bytes(size));
    Ok(())
}

/// `photo.jpg` + `enhanced` -> `photo_enhanced.jpg`, next to the source
pub fn derived_output(source: &Path, suffix: &str, extension: Option<&str>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let extension = extension
        .map(str::to_string)
        .or_else(|| source.extension().map(|e| e.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "png".to_string());
    source.with_file_name(format!("{}_{}.{}", stem, suffix, extension))
}

/// `out.jpg`, 2 -> `out_2.jpg`
pub fn numbered_output(output: &Path, index: u32) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{}_{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}_{}", stem, index),
    };
    output.with_file_name(name)
}

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f64 = bytes as f64;
    let exponent = (bytes_f64.ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let value = bytes_f64 / 1024_f64.powi(exponent as i32);

    if exponent == 0 {
        format!("{} {}", bytes, UNITS[exponent])
    } else {
        format!("{:.2} {}", value, UNITS[exponent])
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub async fn cmd_enhance(
    picwish: &PicWish,
    source: &Path,
    output: Option<&Path>,
    keep_watermark: bool,
    no_face: bool,
) -> Result<()> {
    let options = EnhanceOptions {
        no_watermark: !keep_watermark,
        enhance_face: !no_face,
    };
    let image = with_spinner(
        format!("Enhancing {}", display_name(source)),
        picwish.enhance(source, &options),
    )
    .await?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| derived_output(source, "enhanced", None));
    save_asset(&image, &output).await
}

pub async fn cmd_remove_bg(
    picwish: &PicWish,
    source: &Path,
    output: Option<&Path>,
    keep_watermark: bool,
) -> Result<()> {
    let options = RemoveBackgroundOptions {
        no_watermark: !keep_watermark,
    };
    let image = with_spinner(
        format!("Removing background from {}", display_name(source)),
        picwish.remove_background(source, &options),
    )
    .await?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| derived_output(source, "nobg", Some("png")));
    save_asset(&image, &output).await?;
    if let Some(mask) = &image.mask_url {
        println!("mask: {}", mask);
    }
    Ok(())
}

pub async fn cmd_ocr(
    picwish: &PicWish,
    source: &Path,
    output: Option<&Path>,
    format: OcrFormat,
    languages: Vec<OcrLanguage>,
) -> Result<()> {
    let options = OcrOptions { format, languages };
    let result = with_spinner(
        format!("Recognizing text in {}", display_name(source)),
        picwish.ocr(source, &options),
    )
    .await?;

    match output {
        Some(output) => save_asset(&result, output).await,
        None if format == OcrFormat::Txt => {
            print!("{}", result.text().await?);
            Ok(())
        }
        None => {
            let output = derived_output(source, "ocr", Some(format.extension()));
            save_asset(&result, &output).await
        }
    }
}

pub async fn cmd_colorize(
    picwish: &PicWish,
    source: &Path,
    output: Option<&Path>,
    keep_watermark: bool,
) -> Result<()> {
    let options = ColorizeOptions {
        no_watermark: !keep_watermark,
    };
    let image = with_spinner(
        format!("Colorizing {}", display_name(source)),
        picwish.colorize(source, &options),
    )
    .await?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| derived_output(source, "colorized", None));
    save_asset(&image, &output).await
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_t2i(
    picwish: &PicWish,
    prompt: &str,
    output: &Path,
    theme: T2iTheme,
    size: T2iSize,
    quality: T2iQuality,
    batch_size: u32,
    negative_prompt: Option<String>,
    max_attempts: u32,
) -> Result<()> {
    let request = TextToImageRequest {
        theme,
        size,
        quality,
        batch_size,
        negative_prompt,
        max_attempts,
        ..TextToImageRequest::new(prompt)
    };
    let images = with_spinner("Generating".to_string(), picwish.text_to_image(&request)).await?;

    if images.is_empty() {
        println!("No images generated");
        return Ok(());
    }
    let single = images.len() == 1;
    let paths: Vec<PathBuf> = (1u32..)
        .take(images.len())
        .map(|n| {
            if single {
                output.to_path_buf()
            } else {
                numbered_output(output, n)
            }
        })
        .collect();
    try_join_all(images.iter().zip(&paths).map(|(image, path)| save_asset(image, path))).await?;
    Ok(())
}

pub struct ExpandArgs {
    pub horizontal_ratio: f64,
    pub vertical_ratio: f64,
    pub count: u32,
    pub prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub keep_watermark: bool,
}

pub async fn cmd_expand(
    picwish: &PicWish,
    source: &Path,
    output: Option<&Path>,
    args: ExpandArgs,
) -> Result<()> {
    let options = ExpandOptions {
        horizontal_ratio: args.horizontal_ratio,
        vertical_ratio: args.vertical_ratio,
        image_count: args.count,
        prompt: args.prompt,
        negative_prompt: args.negative_prompt,
        no_watermark: !args.keep_watermark,
    };
    let images = with_spinner(
        format!("Expanding {}", display_name(source)),
        picwish.expand(source, &options),
    )
    .await?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| derived_output(source, "expanded", None));
    let single = images.len() == 1;
    let paths: Vec<PathBuf> = images
        .iter()
        .map(|image| {
            if single {
                output.clone()
            } else {
                numbered_output(&output, image.index)
            }
        })
        .collect();
    try_join_all(images.iter().zip(&paths).map(|(image, path)| save_asset(image, path))).await?;
    Ok(())
}
