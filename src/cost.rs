//! Turns token usage into estimated dollar costs.
//!
//! Everything here is pure: no I/O, no failures. An unknown model yields zero
//! costs with an `error` string set, callers check that field.

use serde::{Deserialize, Serialize};

use crate::pricing::{self, ImagePricing, Quality};

const PER_MILLION: f64 = 1_000_000.0;

/// Cost of the scene (chat completion) call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatCost {
    /// Model the usage was reported for
    pub model: String,
    /// Prompt tokens billed
    pub prompt_tokens: u64,
    /// Completion tokens billed
    pub completion_tokens: u64,
    /// Sum of prompt and completion tokens
    pub total_tokens: u64,
    /// USD for the prompt
    pub input_cost: f64,
    /// USD for the completion
    pub output_cost: f64,
    /// USD total
    pub total_cost: f64,
    /// Set when the model has no chat pricing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cost of the image edit call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageCost {
    /// Model the usage was reported for
    pub model: String,
    /// Inferred output tier, or the requested one when nothing could be inferred
    pub quality: Quality,
    /// Requested image size
    pub size: String,
    /// Number of images requested
    pub count: u32,
    /// Text prompt tokens
    pub prompt_tokens: u64,
    /// Input image tokens
    pub image_tokens: u64,
    /// Output image tokens
    pub output_tokens: u64,
    /// USD for text and image input
    pub input_cost: f64,
    /// USD for the output image
    pub output_cost: f64,
    /// USD total
    pub total_cost: f64,
    /// Set when the model has no image pricing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Chat and image costs for one word, plus their sum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Scene call cost
    pub chat_cost: ChatCost,
    /// Image call cost
    pub image_cost: ImageCost,
    /// Sum of both totals
    pub total_cost: f64,
}

/// Cost of a chat completion from its token counts.
pub fn chat_cost(model: &str, prompt_tokens: u64, completion_tokens: u64) -> ChatCost {
    let total_tokens = prompt_tokens + completion_tokens;
    let Some(rates) = pricing::chat_pricing(model) else {
        return ChatCost {
            model: model.to_string(),
            prompt_tokens,
            completion_tokens,
            total_tokens,
            input_cost: 0.0,
            output_cost: 0.0,
            total_cost: 0.0,
            error: Some(format!("Unknown model: {model}")),
        };
    };

    let input_cost = prompt_tokens as f64 / PER_MILLION * rates.input_per_mtok;
    let output_cost = completion_tokens as f64 / PER_MILLION * rates.output_per_mtok;
    ChatCost {
        model: model.to_string(),
        prompt_tokens,
        completion_tokens,
        total_tokens,
        input_cost,
        output_cost,
        total_cost: input_cost + output_cost,
        error: None,
    }
}

/// Cost of an image edit.
///
/// Output is billed per token. The `quality` reported back is not the one
/// requested: the API doesn't say which tier it actually produced, so it is
/// guessed with [`estimate_quality`]. That guess is approximate.
#[allow(clippy::too_many_arguments)]
pub fn image_cost(
    model: &str,
    quality: Quality,
    size: &str,
    count: u32,
    prompt_tokens: u64,
    image_tokens: u64,
    output_tokens: u64,
) -> ImageCost {
    let Some(rates) = pricing::image_pricing(model) else {
        return ImageCost {
            model: model.to_string(),
            quality,
            size: size.to_string(),
            count,
            prompt_tokens,
            image_tokens,
            output_tokens,
            input_cost: 0.0,
            output_cost: 0.0,
            total_cost: 0.0,
            error: Some(format!("Unknown model: {model}")),
        };
    };

    let input_cost = (prompt_tokens as f64 * rates.text_input_per_mtok
        + image_tokens as f64 * rates.image_input_per_mtok)
        / PER_MILLION;
    let output_cost = output_tokens as f64 / PER_MILLION * rates.output_per_mtok;
    let quality = estimate_quality(&rates, output_cost, size).unwrap_or(quality);

    ImageCost {
        model: model.to_string(),
        quality,
        size: size.to_string(),
        count,
        prompt_tokens,
        image_tokens,
        output_tokens,
        input_cost,
        output_cost,
        total_cost: input_cost + output_cost,
        error: None,
    }
}

/// Nearest-price guess of the tier an image was produced at.
///
/// Picks the tier whose flat price is closest to `token_cost`; on a tie the
/// earlier table entry wins. `None` only if the model lists no sizes.
pub fn estimate_quality(rates: &ImagePricing, token_cost: f64, size: &str) -> Option<Quality> {
    let mut best: Option<(Quality, f64)> = None;
    for (quality, price) in rates.tiers_for(size) {
        let diff = (token_cost - price).abs();
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((*quality, diff)),
        }
    }
    best.map(|(quality, _)| quality)
}

/// Combines both sub-costs; no rounding.
pub fn total_cost(chat_cost: ChatCost, image_cost: ImageCost) -> CostBreakdown {
    let total_cost = chat_cost.total_cost + image_cost.total_cost;
    CostBreakdown {
        chat_cost,
        image_cost,
        total_cost,
    }
}

/// Human readable summary, amounts rounded to 6 decimals for display only.
pub fn format_cost_display(breakdown: &CostBreakdown) -> String {
    let chat = &breakdown.chat_cost;
    let image = &breakdown.image_cost;

    let mut lines = vec!["Generation cost".to_string()];
    match &chat.error {
        Some(err) => lines.push(format!("- Scene text: cost unavailable ({err})")),
        None => lines.push(format!(
            "- Scene text: ${:.6} ({} tokens)",
            chat.total_cost, chat.total_tokens
        )),
    }
    match &image.error {
        Some(err) => lines.push(format!("- Image: cost unavailable ({err})")),
        None => {
            lines.push(format!(
                "- Image input: ${:.6} ({} prompt + {} image tokens)",
                image.input_cost, image.prompt_tokens, image.image_tokens
            ));
            lines.push(format!(
                "- Image output: ${:.6} ({} tokens -> {} quality, {})",
                image.output_cost, image.output_tokens, image.quality, image.size
            ));
        }
    }
    lines.push(format!("- Total: ${:.6}", breakdown.total_cost));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn chat_output_cost_is_linear_in_completion_tokens() {
        for model in ["gpt-4o-mini", "gpt-4o", "gpt-4"] {
            let one = chat_cost(model, 100, 1_000);
            let three = chat_cost(model, 100, 3_000);
            assert!(one.error.is_none());
            assert!(close(three.output_cost, one.output_cost * 3.0), "{model}");
            assert!(close(three.input_cost, one.input_cost), "{model}");
        }
    }

    #[test]
    fn chat_cost_uses_per_million_rates() {
        let cost = chat_cost("gpt-4o-mini", 1_000_000, 500_000);
        assert!(close(cost.input_cost, 0.60));
        assert!(close(cost.output_cost, 1.20));
        assert!(close(cost.total_cost, 1.80));
        assert_eq!(cost.total_tokens, 1_500_000);
    }

    #[test]
    fn unknown_models_cost_nothing_and_say_why() {
        let chat = chat_cost("mystery-model", 10, 10);
        assert_eq!(chat.total_cost, 0.0);
        assert!(chat.error.as_deref().is_some_and(|e| !e.is_empty()));

        let image = image_cost("mystery-model", Quality::High, "1024x1024", 1, 10, 10, 10);
        assert_eq!(image.total_cost, 0.0);
        assert!(image.error.as_deref().is_some_and(|e| !e.is_empty()));
        assert_eq!(image.quality, Quality::High);
    }

    #[test]
    fn chat_models_have_no_image_pricing() {
        let image = image_cost("gpt-4o-mini", Quality::Auto, "1024x1024", 1, 1, 1, 1);
        assert!(image.error.is_some());
    }

    #[test]
    fn image_cost_splits_text_and_image_input() {
        let cost = image_cost("gpt-image-1", Quality::Auto, "1024x1024", 1, 200, 300, 0);
        assert!(close(cost.input_cost, (200.0 * 5.0 + 300.0 * 10.0) / 1_000_000.0));
        assert!(close(cost.output_cost, 0.0));
    }

    #[test]
    fn exact_tier_price_selects_that_tier() {
        // 4175 tokens * $40 / 1M == $0.167, the square high tier price
        let cost = image_cost("gpt-image-1", Quality::Auto, "1024x1024", 1, 0, 0, 4175);
        assert!(close(cost.output_cost, 0.167));
        assert_eq!(cost.quality, Quality::High);

        // 275 tokens == $0.011, low
        let cost = image_cost("gpt-image-1", Quality::High, "1024x1024", 1, 0, 0, 275);
        assert_eq!(cost.quality, Quality::Low);
    }

    #[test]
    fn nearest_tier_wins_and_ties_go_to_table_order() {
        let rates = pricing::image_pricing("gpt-image-1").expect("image pricing");
        assert_eq!(
            estimate_quality(&rates, 0.05, "1024x1024"),
            Some(Quality::Medium)
        );
        // medium and auto share a price, medium is listed first
        assert_eq!(
            estimate_quality(&rates, 0.042, "1024x1024"),
            Some(Quality::Medium)
        );
        assert_eq!(
            estimate_quality(&rates, 0.2, "1536x1024"),
            Some(Quality::High)
        );
        assert_eq!(
            estimate_quality(&rates, 0.0, "not-a-size"),
            Some(Quality::Low)
        );
    }

    #[test]
    fn total_is_plain_sum() {
        let chat = chat_cost("gpt-4o-mini", 1234, 567);
        let image = image_cost("gpt-image-1", Quality::Auto, "1024x1024", 1, 50, 300, 1056);
        let expected = chat.total_cost + image.total_cost;
        let breakdown = total_cost(chat, image);
        assert_eq!(breakdown.total_cost, expected);
    }

    #[test]
    fn display_rounds_to_six_places() {
        let breakdown = total_cost(
            chat_cost("gpt-4o-mini", 1, 1),
            image_cost("gpt-image-1", Quality::Auto, "1024x1024", 1, 0, 0, 4175),
        );
        let text = format_cost_display(&breakdown);
        assert!(text.contains("$0.167000"), "{text}");
        assert!(text.contains("high quality"), "{text}");
        assert!(text.contains("- Total: $0.167003"), "{text}");
    }

    #[test]
    fn display_reports_unknown_models() {
        let breakdown = total_cost(
            chat_cost("mystery-model", 1, 1),
            image_cost("gpt-image-1", Quality::Auto, "1024x1024", 1, 0, 0, 0),
        );
        let text = format_cost_display(&breakdown);
        assert!(text.contains("Unknown model: mystery-model"), "{text}");
    }
}
