// src/common/validation.rs

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::common::error::AppError;

// Payload rules shared by the handlers

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("This field cannot be blank.".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("The quantity cannot be negative.".into());
        return Err(err);
    }
    Ok(())
}

/// `value` without surrounding whitespace; `BlankField` when nothing is left.
pub fn required(field: &'static str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_is_blank() {
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("\t\n").is_err());
        assert!(validate_not_blank(" Rice ").is_ok());
    }

    #[test]
    fn required_trims_or_rejects() {
        assert_eq!(required("name", "  Rice ").unwrap(), "Rice");
        assert!(matches!(required("name", "   "), Err(AppError::BlankField("name"))));
    }

    #[test]
    fn negative_quantities_are_invalid() {
        assert!(validate_not_negative(&Decimal::new(-1, 2)).is_err());
        assert!(validate_not_negative(&Decimal::ZERO).is_ok());
    }
}
