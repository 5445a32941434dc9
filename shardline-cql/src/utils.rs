use std::{fmt::Display, io};

// match ($($tp:ident/$idx:tt),*;$len:literal)
macro_rules! tuples {
    ($macro:ident) => {
        $macro!(T0/0; 1);
        $macro!(T0/0, T1/1; 2);
        $macro!(T0/0, T1/1, T2/2; 3);
        $macro!(T0/0, T1/1, T2/2, T3/3; 4);
        $macro!(T0/0, T1/1, T2/2, T3/3, T4/4; 5);
        $macro!(T0/0, T1/1, T2/2, T3/3, T4/4, T5/5; 6);
        $macro!(T0/0, T1/1, T2/2, T3/3, T4/4, T5/5, T6/6; 7);
        $macro!(T0/0, T1/1, T2/2, T3/3, T4/4, T5/5, T6/6, T7/7; 8);
        $macro!(T0/0, T1/1, T2/2, T3/3, T4/4, T5/5, T6/6, T7/7, T8/8; 9);
        $macro!(T0/0, T1/1, T2/2, T3/3, T4/4, T5/5, T6/6, T7/7, T8/8, T9/9; 10);
        $macro!(T0/0, T1/1, T2/2, T3/3, T4/4, T5/5, T6/6, T7/7, T8/8, T9/9, T10/10; 11);
        $macro!(T0/0, T1/1, T2/2, T3/3, T4/4, T5/5, T6/6, T7/7, T8/8, T9/9, T10/10, T11/11; 12);
    };
}

pub(crate) use tuples;

pub(crate) fn invalid_data(
    error: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, error)
}

pub(crate) fn join_display<T>(elems: impl IntoIterator<Item = T>) -> String
where
    T: Display,
{
    elems
        .into_iter()
        .map(|elem| elem.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

macro_rules! flags {
    ($($flag:path: $cond:expr),* $(,)?) => {{
        let mut flags = ::enumflags2::BitFlags::empty();
        $(
            if $cond {
                flags |= $flag;
            }
        )*
        flags
    }};
}

pub(crate) use flags;
