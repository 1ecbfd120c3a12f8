//! Host name checks performed before any socket is opened.

use std::sync::LazyLock;

use regex::Regex;

/// Dotted quad, each octet 0..=255 without leading zeros.
static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])$")
        .unwrap()
});

static HOSTNAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9.-]+$").unwrap());

/// Accept `localhost`, a dotted-quad IPv4 address, or a name made of ASCII
/// letters, digits, `.` and `-`.
///
/// Name resolution decides whether such a name actually exists.
pub fn is_valid_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost") || is_ipv4(host) || HOSTNAME.is_match(host)
}

pub fn is_ipv4(host: &str) -> bool {
    IPV4.is_match(host)
}
