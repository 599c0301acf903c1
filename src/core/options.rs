//! Per-operation parameters and the vendor enumerations they use

use clap::ValueEnum;
use serde_json::{json, Map, Value};

/// Vendor status returned when a text-to-image prompt is rejected
pub const PROMPT_BLOCKED_STATUS: i64 = 4003;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OcrLanguage {
    /// ChinesePRC, English and Digits
    #[default]
    Default,
    Digits,
    English,
    ChinesePrc,
    ChineseTaiwan,
    French,
    German,
    Japanese,
    Portuguese,
    Spanish,
    Italian,
    Bulgarian,
    Croatian,
    Czech,
    Danish,
    Dutch,
    Finnish,
    Greek,
    Hungarian,
    Korean,
    Norwegian,
    Polish,
    Russian,
    Slovenian,
    Swedish,
    Turkish,
}

impl OcrLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrLanguage::Default => "ChinesePRC,English,Digits",
            OcrLanguage::Digits => "Digits",
            OcrLanguage::English => "English",
            OcrLanguage::ChinesePrc => "ChinesePRC",
            OcrLanguage::ChineseTaiwan => "ChineseTaiwan",
            OcrLanguage::French => "French",
            OcrLanguage::German => "German",
            OcrLanguage::Japanese => "Japanese",
            OcrLanguage::Portuguese => "Portuguese",
            OcrLanguage::Spanish => "Spanish",
            OcrLanguage::Italian => "Italian",
            OcrLanguage::Bulgarian => "Bulgarian",
            OcrLanguage::Croatian => "Croatian",
            OcrLanguage::Czech => "Czech",
            OcrLanguage::Danish => "Danish",
            OcrLanguage::Dutch => "Dutch",
            OcrLanguage::Finnish => "Finnish",
            OcrLanguage::Greek => "Greek",
            OcrLanguage::Hungarian => "Hungarian",
            OcrLanguage::Korean => "Korean",
            OcrLanguage::Norwegian => "Norwegian",
            OcrLanguage::Polish => "Polish",
            OcrLanguage::Russian => "Russian",
            OcrLanguage::Slovenian => "Slovenian",
            OcrLanguage::Swedish => "Swedish",
            OcrLanguage::Turkish => "Turkish",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OcrFormat {
    Pdf,
    Docx,
    Pptx,
    Xlsx,
    #[default]
    Txt,
}

impl OcrFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrFormat::Pdf => "pdf",
            OcrFormat::Docx => "docx",
            OcrFormat::Pptx => "pptx",
            OcrFormat::Xlsx => "xlsx",
            OcrFormat::Txt => "txt",
        }
    }

    /// File extension of the output document
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum T2iQuality {
    Low = 0,
    #[default]
    High = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum T2iTheme {
    #[default]
    General = 0,
    DigitalArt = 1,
    #[value(name = "3d")]
    ThreeD = 2,
    Photography = 3,
    Anime = 4,
    Cyberpunk = 5,
    Painting = 6,
    PixelArt = 7,
    Illustration = 8,
    Sketch = 9,
}

/// Output sizes accepted by text-to-image: HD and FHD in six aspect ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum T2iSize {
    #[default]
    #[value(name = "hd-1x1")]
    Hd1x1,
    #[value(name = "hd-3x2")]
    Hd3x2,
    #[value(name = "hd-4x3")]
    Hd4x3,
    #[value(name = "hd-3x4")]
    Hd3x4,
    #[value(name = "hd-16x9")]
    Hd16x9,
    #[value(name = "hd-9x16")]
    Hd9x16,
    #[value(name = "fhd-1x1")]
    Fhd1x1,
    #[value(name = "fhd-3x2")]
    Fhd3x2,
    #[value(name = "fhd-4x3")]
    Fhd4x3,
    #[value(name = "fhd-3x4")]
    Fhd3x4,
    #[value(name = "fhd-16x9")]
    Fhd16x9,
    #[value(name = "fhd-9x16")]
    Fhd9x16,
}

impl T2iSize {
    /// `(width, height)` in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            T2iSize::Hd1x1 => (616, 616),
            T2iSize::Hd3x2 => (768, 512),
            T2iSize::Hd4x3 => (704, 528),
            T2iSize::Hd3x4 => (528, 704),
            T2iSize::Hd16x9 => (904, 512),
            T2iSize::Hd9x16 => (512, 904),
            T2iSize::Fhd1x1 => (1024, 1024),
            T2iSize::Fhd3x2 => (1008, 672),
            T2iSize::Fhd4x3 => (1024, 768),
            T2iSize::Fhd3x4 => (768, 1024),
            T2iSize::Fhd16x9 => (1024, 576),
            T2iSize::Fhd9x16 => (576, 1024),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnhanceOptions {
    pub no_watermark: bool,
    pub enhance_face: bool,
}

impl Default for EnhanceOptions {
    fn default() -> Self {
        Self {
            no_watermark: true,
            enhance_face: true,
        }
    }
}

impl EnhanceOptions {
    pub(crate) fn params(&self) -> Map<String, Value> {
        object(json!({ "type": if self.enhance_face { 2 } else { 1 } }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveBackgroundOptions {
    pub no_watermark: bool,
}

impl Default for RemoveBackgroundOptions {
    fn default() -> Self {
        Self { no_watermark: true }
    }
}

impl RemoveBackgroundOptions {
    pub(crate) fn params(&self) -> Map<String, Value> {
        object(json!({ "output_type": 1 }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OcrOptions {
    pub format: OcrFormat,
    /// Languages to recognize; empty means [`OcrLanguage::Default`]
    pub languages: Vec<OcrLanguage>,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            format: OcrFormat::default(),
            languages: vec![OcrLanguage::Default],
        }
    }
}

impl OcrOptions {
    pub fn task_language(&self) -> String {
        if self.languages.is_empty() {
            return OcrLanguage::Default.as_str().to_string();
        }
        self.languages
            .iter()
            .map(OcrLanguage::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub(crate) fn params(&self) -> Map<String, Value> {
        object(json!({
            "format": self.format.as_str(),
            "task_language": self.task_language(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorizeOptions {
    pub no_watermark: bool,
}

impl Default for ColorizeOptions {
    fn default() -> Self {
        Self { no_watermark: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextToImageRequest {
    pub prompt: String,
    pub theme: T2iTheme,
    pub size: T2iSize,
    pub quality: T2iQuality,
    pub batch_size: u32,
    pub negative_prompt: Option<String>,
    /// Create+poll cycles tried while the prompt is reported as blocked
    pub max_attempts: u32,
}

impl TextToImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            theme: T2iTheme::default(),
            size: T2iSize::default(),
            quality: T2iQuality::default(),
            batch_size: 1,
            negative_prompt: None,
            max_attempts: 3,
        }
    }

    pub(crate) fn params(&self) -> Map<String, Value> {
        let (width, height) = self.size.dimensions();
        let mut params = object(json!({
            "theme": self.theme as u8,
            "width": width,
            "height": height,
            "prompt": self.prompt,
            "batch_size": self.batch_size,
            "quality": self.quality as u8,
        }));
        if let Some(negative) = &self.negative_prompt {
            params.insert("negative_prompt".to_string(), Value::from(negative.as_str()));
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpandOptions {
    pub horizontal_ratio: f64,
    pub vertical_ratio: f64,
    /// Number of variants to generate, read back from `image1..imageN`
    pub image_count: u32,
    pub prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub no_watermark: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            horizontal_ratio: 1.5,
            vertical_ratio: 1.5,
            image_count: 1,
            prompt: None,
            negative_prompt: None,
            no_watermark: true,
        }
    }
}

impl ExpandOptions {
    pub(crate) fn params(&self) -> Map<String, Value> {
        let mut params = object(json!({
            "horizontal_ratio": self.horizontal_ratio,
            "vertical_ratio": self.vertical_ratio,
            "image_count": self.image_count,
        }));
        if let Some(prompt) = &self.prompt {
            params.insert("prompt".to_string(), Value::from(prompt.as_str()));
        }
        if let Some(negative) = &self.negative_prompt {
            params.insert("negative_prompt".to_string(), Value::from(negative.as_str()));
        }
        params
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
