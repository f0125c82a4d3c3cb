//! Zone selection and challenge record naming.

/// Label every DNS-01 challenge record starts with.
pub const ACME_CHALLENGE_LABEL: &str = "_acme-challenge";

/// Pick the zone that should hold the challenge record for
/// `domain`.
///
/// Among all zones that are a suffix of `domain` on a label
/// boundary, the longest wins, so a delegated sub-zone is chosen
/// over its parent. Returns `None` when no zone matches.
///
/// Example: zones `["example.com", "s.example.com"]` and domain
/// `"a.s.example.com"` -> `Some("s.example.com")`
#[must_use]
pub fn resolve_zone<'a, I>(zones: I, domain: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<&'a str> = None;
    for zone in zones {
        if !is_zone_of(zone, domain) {
            continue;
        }
        if best.is_none_or(|b| zone.len() > b.len()) {
            best = Some(zone);
        }
    }
    best
}

fn is_zone_of(zone: &str, domain: &str) -> bool {
    strip_zone(domain, zone).is_some()
}

/// Labels of `domain` left of `zone`, compared without regard to
/// ASCII case. `Some("")` when they are the same name.
fn strip_zone<'d>(domain: &'d str, zone: &str) -> Option<&'d str> {
    if zone.is_empty() || domain.len() < zone.len() {
        return None;
    }
    let split = domain.len() - zone.len();
    if !domain.is_char_boundary(split) {
        return None;
    }
    let (rest, tail) = domain.split_at(split);
    if !tail.eq_ignore_ascii_case(zone) {
        return None;
    }
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_suffix('.')
    }
}

/// Host label of the challenge record relative to `zone`.
///
/// Example: `("s.example.com", "example.com")` ->
/// `"_acme-challenge.s"`; `("example.com", "example.com")` ->
/// `"_acme-challenge"`
#[must_use]
pub fn record_name_for(domain: &str, zone: &str) -> String {
    match strip_zone(domain, zone) {
        Some("") => ACME_CHALLENGE_LABEL.to_string(),
        Some(sub) => format!("{ACME_CHALLENGE_LABEL}.{}", sub.to_ascii_lowercase()),
        None => format!("{ACME_CHALLENGE_LABEL}.{}", domain.to_ascii_lowercase()),
    }
}

/// Fully-qualified name of a record inside `zone`.
#[must_use]
pub fn record_fqdn(record_name: &str, zone: &str) -> String {
    format!("{record_name}.{zone}")
}
