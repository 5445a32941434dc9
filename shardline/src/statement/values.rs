use shardline_cql::{CqlValue, MaybeValue};

use crate::utils::tuples;

/// Values bound to a statement, in bind marker order.
///
/// Tuples bind non-null values; nulls and unset values go through [`MaybeValue`] sequences.
pub trait IntoValues {
    fn into_values(self) -> Vec<MaybeValue<CqlValue>>;
}

impl IntoValues for () {
    fn into_values(self) -> Vec<MaybeValue<CqlValue>> {
        Vec::new()
    }
}

impl IntoValues for Vec<MaybeValue<CqlValue>> {
    fn into_values(self) -> Vec<MaybeValue<CqlValue>> {
        self
    }
}

impl IntoValues for &[MaybeValue<CqlValue>] {
    fn into_values(self) -> Vec<MaybeValue<CqlValue>> {
        self.to_vec()
    }
}

impl<const N: usize> IntoValues for [MaybeValue<CqlValue>; N] {
    fn into_values(self) -> Vec<MaybeValue<CqlValue>> {
        self.into()
    }
}

impl IntoValues for Vec<CqlValue> {
    fn into_values(self) -> Vec<MaybeValue<CqlValue>> {
        self.into_iter().map(MaybeValue::Value).collect()
    }
}

macro_rules! values_tuple {
    ($($values:ident/$idx:tt),*; $len:literal) => {
        impl<V0, $($values,)*> IntoValues for (V0, $($values,)*)
        where
            V0: Into<CqlValue>,
            $($values: Into<CqlValue>,)*
        {
            fn into_values(self) -> Vec<MaybeValue<CqlValue>> {
                vec![
                    MaybeValue::Value(self.0.into()),
                    $(MaybeValue::Value(self.$idx.into()),)*
                ]
            }
        }
    };
}

tuples!(values_tuple);
