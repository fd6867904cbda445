use image::RgbImage;

use crate::compress::encode_jpeg;
use crate::error::CompressionError;
use crate::CompressionBudget;

/// Quality (percent) at or above which the coarse step applies. Most photos
/// fit typical budgets within a coarse step or two; the fine step is reserved
/// for the harder cases near the quality floor.
const COARSE_THRESHOLD: u32 = 50;

/// Outcome of a successful quality descent.
#[derive(Debug)]
pub(crate) struct SearchOutcome {
    pub data: Vec<u8>,
    /// Quality of the final encode, in percent.
    pub quality: u32,
}

/// Quality arithmetic runs in integer percent so the steps are exact; the
/// public API stays in 0.0–1.0 floats.
pub(crate) fn to_percent(quality: f32) -> u32 {
    (quality * 100.0).round() as u32
}

/// One step of the quality descent policy: coarse step at or above the
/// threshold, fine step below it, clamped at the floor.
pub(crate) fn next_quality(quality: u32, floor: u32, step_coarse: u32, step_fine: u32) -> u32 {
    let step = if quality >= COARSE_THRESHOLD {
        step_coarse
    } else {
        step_fine
    };
    quality.saturating_sub(step).max(floor)
}

/// Re-encode at decreasing quality until the output fits `budget.max_bytes`
/// or the quality floor is reached.
///
/// Quality strictly decreases by at least the fine step each iteration and is
/// bounded below by the floor, so the loop runs at most
/// `(initial − floor) / step_fine + 1` encode passes regardless of image
/// content. If even the floor encode exceeds the budget the search fails
/// with `BudgetUnreachable`; it never returns an oversized result.
pub(crate) fn fit_to_budget(
    image: &RgbImage,
    budget: &CompressionBudget,
) -> Result<SearchOutcome, CompressionError> {
    let floor = to_percent(budget.min_quality);
    // Steps below 1% would stall the descent; validation already rejects
    // non-positive steps, this guards the rounding.
    let step_coarse = to_percent(budget.quality_step_large).max(1);
    let step_fine = to_percent(budget.quality_step_small).max(1);
    let mut quality = to_percent(budget.initial_quality);

    loop {
        let data = encode_jpeg(image, quality as f32 / 100.0)?;
        log::debug!(
            "encode pass at quality {quality}%: {} bytes against budget {}",
            data.len(),
            budget.max_bytes
        );

        if data.len() <= budget.max_bytes {
            return Ok(SearchOutcome { data, quality });
        }
        if quality <= floor {
            return Err(CompressionError::BudgetUnreachable {
                max_bytes: budget.max_bytes,
                achieved_bytes: data.len(),
                quality: quality as f32 / 100.0,
            });
        }

        quality = next_quality(quality, floor, step_coarse, step_fine);
    }
}
