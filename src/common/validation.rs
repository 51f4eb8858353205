// src/common/validation.rs
//
// Validadores customizados usados nos payloads (`#[validate(custom(...))]`).

use rust_decimal::Decimal;
use validator::ValidationError;

pub fn not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

pub fn positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.add_param("exclusive_min".into(), &0.0);
        err.message = Some("O valor deve ser maior que zero.".into());
        return Err(err);
    }
    Ok(())
}

pub fn percent(val: &Decimal) -> Result<(), ValidationError> {
    if (val.is_sign_negative() && !val.is_zero()) || *val > Decimal::from(1000) {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.add_param("max".into(), &1000.0);
        err.message = Some("Percentual fora do intervalo permitido.".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_is_not_negative_but_is_not_positive() {
        assert!(not_negative(&dec!(0)).is_ok());
        assert!(positive(&dec!(0)).is_err());
    }

    #[test]
    fn negative_values_are_rejected() {
        assert!(not_negative(&dec!(-0.01)).is_err());
        assert!(positive(&dec!(-5)).is_err());
        assert!(percent(&dec!(-1)).is_err());
    }

    #[test]
    fn percent_accepts_regular_margins() {
        assert!(percent(&dec!(25)).is_ok());
        assert!(percent(&dec!(0)).is_ok());
        assert!(percent(&dec!(1001)).is_err());
    }
}
