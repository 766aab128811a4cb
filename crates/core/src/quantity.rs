//! Quantity input handling
//!
//! Quantity fields are free text. A keystroke that does not parse never
//! surfaces an error; the previous valid value is kept instead.

/// Parses a cart quantity field.
///
/// Returns `previous` for non-numeric or negative input. Zero is a valid
/// result and means the line should be removed.
pub fn parse_quantity_input(input: &str, previous: u32) -> u32 {
    let trimmed = input.trim();

    if trimmed.starts_with('-') {
        return previous;
    }

    trimmed.parse::<u32>().unwrap_or(previous)
}

/// Clamps the detail-view quantity picker to `1..=stock`.
///
/// A product without a stock figure still allows a single unit.
pub fn clamp_detail_quantity(requested: u32, stock: u32) -> u32 {
    requested.clamp(1, stock.max(1))
}
