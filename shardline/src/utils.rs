use std::{io, net::SocketAddr};

pub(crate) const DEFAULT_PORT: u16 = 9042;

// Resolve the given hostname using a DNS lookup if necessary.
// The resolution may return multiple IPs and the function returns one of them.
// It prefers to return IPv4s first, and only if there are none, IPv6s.
pub(crate) async fn resolve_hostname(hostname: &str) -> io::Result<SocketAddr> {
    let addrs: Result<Vec<_>, _> = match tokio::net::lookup_host(hostname).await {
        Err(err) => match tokio::net::lookup_host((hostname, DEFAULT_PORT)).await {
            Ok(addrs) => Ok(addrs.collect()),
            Err(_) => Err(err),
        },
        Ok(addrs) => Ok(addrs.collect()),
    };
    #[cfg(feature = "tracing")]
    if let Err(ref error) = addrs {
        tracing::warn!(hostname, %error, "failed hostname lookup");
    }
    let addrs = addrs?;
    addrs
        .iter()
        .cloned()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.into_iter().next())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("Could not resolve {hostname}"),
            )
        })
}

// match ($($values:ident/$idx:tt),*; $len:literal), `V0/0` being implicit
macro_rules! tuples {
    ($macro:ident) => {
        $macro!(; 1);
        $macro!(V1/1; 2);
        $macro!(V1/1, V2/2; 3);
        $macro!(V1/1, V2/2, V3/3; 4);
        $macro!(V1/1, V2/2, V3/3, V4/4; 5);
        $macro!(V1/1, V2/2, V3/3, V4/4, V5/5; 6);
        $macro!(V1/1, V2/2, V3/3, V4/4, V5/5, V6/6; 7);
        $macro!(V1/1, V2/2, V3/3, V4/4, V5/5, V6/6, V7/7; 8);
        $macro!(V1/1, V2/2, V3/3, V4/4, V5/5, V6/6, V7/7, V8/8; 9);
        $macro!(V1/1, V2/2, V3/3, V4/4, V5/5, V6/6, V7/7, V8/8, V9/9; 10);
        $macro!(V1/1, V2/2, V3/3, V4/4, V5/5, V6/6, V7/7, V8/8, V9/9, V10/10; 11);
        $macro!(V1/1, V2/2, V3/3, V4/4, V5/5, V6/6, V7/7, V8/8, V9/9, V10/10, V11/11; 12);
        $macro!(V1/1, V2/2, V3/3, V4/4, V5/5, V6/6, V7/7, V8/8, V9/9, V10/10, V11/11, V12/12; 13);
        $macro!(V1/1, V2/2, V3/3, V4/4, V5/5, V6/6, V7/7, V8/8, V9/9, V10/10, V11/11, V12/12, V13/13; 14);
        $macro!(V1/1, V2/2, V3/3, V4/4, V5/5, V6/6, V7/7, V8/8, V9/9, V10/10, V11/11, V12/12, V13/13, V14/14; 15);
        $macro!(V1/1, V2/2, V3/3, V4/4, V5/5, V6/6, V7/7, V8/8, V9/9, V10/10, V11/11, V12/12, V13/13, V14/14, V15/15; 16);
    };
}

pub(crate) use tuples;
