//! Command-line front end
//!
//! ```bash
//! picwish enhance photo.jpg -o photo_hd.jpg
//! picwish remove-bg product.png
//! picwish ocr scan.png --format pdf --language english,german
//! picwish colorize old.jpg --keep-watermark
//! picwish t2i "A cat" --size fhd-16x9 --batch-size 2
//! picwish expand beach.jpg --count 2 --prompt "more sand"
//! ```

pub mod args;
pub mod commands;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config;
use crate::core::PicWish;
use args::{Cli, Commands};
use commands::*;

/// Load configuration, build the client and run the selected command
pub async fn run(cli: Cli) -> Result<()> {
    cli.validate().context("Invalid arguments")?;
    debug!("CLI arguments: {:?}", cli);

    let mut config = config::load_config(cli.config.as_deref())?;
    if cli.insecure {
        config.http.insecure_tls = true;
    }
    let picwish = PicWish::new(config).context("Failed to build HTTP client")?;

    match cli.command {
        Commands::Enhance {
            source,
            output,
            keep_watermark,
            no_face,
        } => cmd_enhance(&picwish, &source, output.as_deref(), keep_watermark, no_face).await,
        Commands::RemoveBg {
            source,
            output,
            keep_watermark,
        } => cmd_remove_bg(&picwish, &source, output.as_deref(), keep_watermark).await,
        Commands::Ocr {
            source,
            output,
            format,
            language,
        } => cmd_ocr(&picwish, &source, output.as_deref(), format, language).await,
        Commands::Colorize {
            source,
            output,
            keep_watermark,
        } => cmd_colorize(&picwish, &source, output.as_deref(), keep_watermark).await,
        Commands::T2i {
            prompt,
            output,
            theme,
            size,
            quality,
            batch_size,
            negative_prompt,
            max_attempts,
        } => {
            cmd_t2i(
                &picwish,
                &prompt,
                &output,
                theme,
                size,
                quality,
                batch_size,
                negative_prompt,
                max_attempts,
            )
            .await
        }
        Commands::Expand {
            source,
            output,
            horizontal_ratio,
            vertical_ratio,
            count,
            prompt,
            negative_prompt,
            keep_watermark,
        } => {
            let args = ExpandArgs {
                horizontal_ratio,
                vertical_ratio,
                count,
                prompt,
                negative_prompt,
                keep_watermark,
            };
            cmd_expand(&picwish, &source, output.as_deref(), args).await
        }
    }
}
