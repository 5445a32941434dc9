use num_bigint::BigInt;

use crate::{
    error::ConversionError,
    value::{CqlValue, CqlVarint, FromCqlValue},
};

impl From<BigInt> for CqlVarint {
    fn from(value: BigInt) -> Self {
        Self::from_signed_bytes_be(value.to_signed_bytes_be())
    }
}

impl From<&CqlVarint> for BigInt {
    fn from(value: &CqlVarint) -> Self {
        BigInt::from_signed_bytes_be(value.as_signed_bytes_be())
    }
}

impl From<BigInt> for CqlValue {
    fn from(value: BigInt) -> Self {
        Self::Varint(value.into())
    }
}

impl FromCqlValue for BigInt {
    fn from_cql(value: Option<CqlValue>) -> Result<Self, ConversionError> {
        Ok((&CqlVarint::from_cql(value)?).into())
    }
}

#[cfg(feature = "bigdecimal")]
mod decimal {
    use bigdecimal::BigDecimal;
    use num_bigint::BigInt;

    use crate::{
        error::ConversionError,
        value::{CqlDecimal, CqlValue, FromCqlValue},
    };

    impl TryFrom<BigDecimal> for CqlDecimal {
        type Error = ConversionError;
        fn try_from(value: BigDecimal) -> Result<Self, Self::Error> {
            let (unscaled, scale) = value.into_bigint_and_exponent();
            Ok(Self {
                unscaled: unscaled.into(),
                scale: scale
                    .try_into()
                    .map_err(|_| ConversionError::OutOfRange("decimal scale"))?,
            })
        }
    }

    impl From<&CqlDecimal> for BigDecimal {
        fn from(value: &CqlDecimal) -> Self {
            BigDecimal::new(BigInt::from(&value.unscaled), value.scale.into())
        }
    }

    impl FromCqlValue for BigDecimal {
        fn from_cql(value: Option<CqlValue>) -> Result<Self, ConversionError> {
            Ok((&CqlDecimal::from_cql(value)?).into())
        }
    }
}
