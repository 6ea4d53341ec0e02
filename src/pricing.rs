//! OpenAI price list, as of July 2025.
//!
//! Token rates are USD per million tokens. Image models also carry the flat
//! per-image price table used to guess which quality tier was produced.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WordImageError;

/// Output quality tier of the image model.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Let the model choose
    #[default]
    Auto,
    /// Cheapest tier
    Low,
    /// Middle tier
    Medium,
    /// Most detailed tier
    High,
}

impl Quality {
    /// Lowercase API name of the tier
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = WordImageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(WordImageError::InvalidField(format!(
                "quality must be one of auto, low, medium, high (got {other:?})"
            ))),
        }
    }
}

/// Per-token rates for a chat model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChatPricing {
    /// USD per 1M prompt tokens
    pub input_per_mtok: f64,
    /// USD per 1M completion tokens
    pub output_per_mtok: f64,
}

/// Flat price of one image of a given size at each tier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SizePricing {
    /// Size label as sent to the API, eg `1024x1024`
    pub size: &'static str,
    /// Tier prices; order matters for tie breaking
    pub tiers: &'static [(Quality, f64)],
}

/// Rates for an image edit model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImagePricing {
    /// USD per 1M text prompt tokens
    pub text_input_per_mtok: f64,
    /// USD per 1M input image tokens
    pub image_input_per_mtok: f64,
    /// USD per 1M output image tokens
    pub output_per_mtok: f64,
    /// Flat per-image prices by size, first entry is the fallback size
    pub sizes: &'static [SizePricing],
}

impl ImagePricing {
    /// Tier prices for `size`, falling back to the first listed size.
    pub fn tiers_for(&self, size: &str) -> &'static [(Quality, f64)] {
        self.sizes
            .iter()
            .find(|entry| entry.size == size)
            .or_else(|| self.sizes.first())
            .map(|entry| entry.tiers)
            .unwrap_or(&[])
    }
}

/// Pricing entry for a model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ModelPricing {
    /// Text completion model
    Chat(ChatPricing),
    /// Image edit model
    Image(ImagePricing),
}

const SQUARE_TIERS: &[(Quality, f64)] = &[
    (Quality::Low, 0.011),
    (Quality::Medium, 0.042),
    (Quality::High, 0.167),
    (Quality::Auto, 0.042),
];

const RECT_TIERS: &[(Quality, f64)] = &[
    (Quality::Low, 0.016),
    (Quality::Medium, 0.063),
    (Quality::High, 0.25),
    (Quality::Auto, 0.063),
];

const GPT_IMAGE_1: ImagePricing = ImagePricing {
    text_input_per_mtok: 5.0,
    image_input_per_mtok: 10.0,
    output_per_mtok: 40.0,
    sizes: &[
        SizePricing {
            size: "1024x1024",
            tiers: SQUARE_TIERS,
        },
        SizePricing {
            size: "1024x1536",
            tiers: RECT_TIERS,
        },
        SizePricing {
            size: "1536x1024",
            tiers: RECT_TIERS,
        },
    ],
};

static PRICING: &[(&str, ModelPricing)] = &[
    (
        "gpt-4o-mini",
        ModelPricing::Chat(ChatPricing {
            input_per_mtok: 0.60,
            output_per_mtok: 2.40,
        }),
    ),
    (
        "gpt-4o",
        ModelPricing::Chat(ChatPricing {
            input_per_mtok: 5.0,
            output_per_mtok: 20.0,
        }),
    ),
    (
        "gpt-4",
        ModelPricing::Chat(ChatPricing {
            input_per_mtok: 30.0,
            output_per_mtok: 60.0,
        }),
    ),
    ("gpt-image-1", ModelPricing::Image(GPT_IMAGE_1)),
];

/// Exact-name lookup in the price list.
pub fn lookup(model: &str) -> Option<&'static ModelPricing> {
    PRICING
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, pricing)| pricing)
}

/// Chat rates for `model`, `None` when unknown or not a chat model.
pub fn chat_pricing(model: &str) -> Option<ChatPricing> {
    match lookup(model)? {
        ModelPricing::Chat(pricing) => Some(*pricing),
        ModelPricing::Image(_) => None,
    }
}

/// Image rates for `model`, `None` when unknown or not an image model.
pub fn image_pricing(model: &str) -> Option<ImagePricing> {
    match lookup(model)? {
        ModelPricing::Image(pricing) => Some(*pricing),
        ModelPricing::Chat(_) => None,
    }
}
