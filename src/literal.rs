use crate::{
    error::RenderError,
    labels::{resolve_label, LabelMap},
    model::IntegerValue,
};

/// Splits a value into `(negative, magnitude)` using the sign bit of its declared width.
///
/// This is plain two's complement: the minimum value of a width comes back negative.
pub(crate) fn signed_magnitude(int: IntegerValue) -> Result<(bool, u64), RenderError> {
    let mask = checked_mask(int)?;
    let value = int.value & mask;
    let sign_bit = 1u64 << (int.bits - 1);
    if value & sign_bit != 0 {
        Ok((true, value.wrapping_neg() & mask))
    } else {
        Ok((false, value))
    }
}

/// The value cut down to its declared width.
pub(crate) fn truncated(int: IntegerValue) -> Result<u64, RenderError> {
    Ok(int.value & checked_mask(int)?)
}

fn checked_mask(int: IntegerValue) -> Result<u64, RenderError> {
    match int.bits {
        8 | 16 | 32 | 64 => int.mask().ok_or(RenderError::UnsupportedWidth { bits: int.bits }),
        bits => {
            ::tracing::error!(bits, value = int.value, "unsupported integer literal width");
            Err(RenderError::UnsupportedWidth { bits })
        }
    }
}

/// Formats an immediate as hex, or as a label when a 32/64-bit value names a known address.
///
/// A value prints as negative only when its sign bit is set and at least one lower bit is
/// set, so the minimum value of each width prints as positive (`0x80` at 8 bits).
pub fn format_integer(int: IntegerValue, labels: Option<&LabelMap>) -> Result<String, RenderError> {
    let mask = checked_mask(int)?;
    if matches!(int.bits, 32 | 64) {
        if let Some(label) = resolve_label(int.value, labels) {
            return Ok(label.to_string());
        }
    }

    let value = int.value & mask;
    let sign_bit = 1u64 << (int.bits - 1);
    let lower_bits = sign_bit - 1;
    if value & sign_bit != 0 && value & lower_bits != 0 {
        Ok(format!("-{:#x}", value.wrapping_neg() & mask))
    } else {
        Ok(format!("{:#x}", value))
    }
}
