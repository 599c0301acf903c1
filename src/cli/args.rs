use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::{OcrFormat, OcrLanguage, T2iQuality, T2iSize, T2iTheme};

/// picwish - PicWish image processing from the command line
#[derive(Parser, Debug)]
#[command(name = "picwish")]
#[command(version, about = "PicWish image processing client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (YAML); environment variables are used otherwise
    #[arg(long, global = true, env = "PICWISH_CONFIG")]
    pub config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Disable TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upscale and sharpen an image
    Enhance {
        /// Source image
        source: PathBuf,

        /// Output file (default: <source>_enhanced.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the watermarked result
        #[arg(long)]
        keep_watermark: bool,

        /// Skip face enhancement
        #[arg(long)]
        no_face: bool,
    },

    /// Cut out the foreground
    RemoveBg {
        /// Source image
        source: PathBuf,

        /// Output file (default: <source>_nobg.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the watermarked result
        #[arg(long)]
        keep_watermark: bool,
    },

    /// Recognize text in an image
    Ocr {
        /// Source image
        source: PathBuf,

        /// Output file; txt results go to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output document format
        #[arg(long, value_enum, default_value = "txt")]
        format: OcrFormat,

        /// Languages to recognize (comma-separated)
        #[arg(long, value_enum, value_delimiter = ',', default_value = "default")]
        language: Vec<OcrLanguage>,
    },

    /// Colorize a black and white photo
    Colorize {
        /// Source image
        source: PathBuf,

        /// Output file (default: <source>_colorized.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the watermarked result
        #[arg(long)]
        keep_watermark: bool,
    },

    /// Generate images from a text prompt
    T2i {
        /// Prompt describing the image
        prompt: String,

        /// Output file; numbered when more than one image is generated
        #[arg(short, long, default_value = "t2i.jpg")]
        output: PathBuf,

        #[arg(long, value_enum, default_value = "general")]
        theme: T2iTheme,

        #[arg(long, value_enum, default_value = "hd-1x1")]
        size: T2iSize,

        #[arg(long, value_enum, default_value = "high")]
        quality: T2iQuality,

        /// Number of images to generate
        #[arg(long, default_value = "1")]
        batch_size: u32,

        /// What the image should not contain
        #[arg(long)]
        negative_prompt: Option<String>,

        /// Attempts while the prompt is reported as blocked
        #[arg(long, default_value = "3")]
        max_attempts: u32,
    },

    /// Extend an image beyond its borders
    Expand {
        /// Source image
        source: PathBuf,

        /// Output file (default: <source>_expanded.<ext>); numbered per variant
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, default_value = "1.5")]
        horizontal_ratio: f64,

        #[arg(long, default_value = "1.5")]
        vertical_ratio: f64,

        /// Number of variants
        #[arg(long, default_value = "1")]
        count: u32,

        #[arg(long)]
        prompt: Option<String>,

        #[arg(long)]
        negative_prompt: Option<String>,

        /// Keep the watermarked result
        #[arg(long)]
        keep_watermark: bool,
    },
}

impl Cli {
    /// Validate arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        match &self.command {
            Commands::T2i {
                batch_size,
                max_attempts,
                prompt,
                ..
            } => {
                if prompt.trim().is_empty() {
                    anyhow::bail!("Prompt cannot be empty");
                }
                if *batch_size == 0 {
                    anyhow::bail!("Batch size must be greater than 0");
                }
                if *max_attempts == 0 {
                    anyhow::bail!("Max attempts must be greater than 0");
                }
            }
            Commands::Expand {
                count,
                horizontal_ratio,
                vertical_ratio,
                ..
            } => {
                if *count == 0 {
                    anyhow::bail!("Count must be greater than 0");
                }
                if *horizontal_ratio < 1.0 || *vertical_ratio < 1.0 {
                    anyhow::bail!("Expansion ratios must be at least 1.0");
                }
            }
            _ => {}
        }
        Ok(())
    }
}
