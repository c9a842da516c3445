//! Canonical query encoding used for both signing and transport bodies.
//!
//! The gateway verifies signatures against a PHP `http_build_query` rendering
//! of the request, so the encoder reproduces that rendering exactly:
//!
//! 1. Top-level names are ordered with [`php_compatible_cmp`] (stable, so
//!    names that compare equal keep insertion order).
//! 2. Nested groups are flattened to `parent[child]` names, children in
//!    insertion order.
//! 3. Names and values are form-encoded (`+` for space, `%XX` for everything
//!    outside `A-Za-z0-9-._`), with `*` always emitted as `%2A`.
//! 4. Encoded line breaks (`%0D%0A`, `%0A%0D`, `%0D`) collapse to `%0A`.
//! 5. [`EQUALS_MARKER`] is restored to a literal `=`.

use std::{cmp::Ordering, sync::LazyLock};

use regex::Regex;
use url::form_urlencoded;

use crate::fields::FieldSet;

/// Marker a caller can embed in a value to emit a literal, unencoded `=`.
///
/// The gateway reads some packed values as nested query strings; the marker
/// survives form-encoding untouched and is swapped back afterwards.
pub const EQUALS_MARKER: &str = "__EQUAL__SIGN__";

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(?i)%0D%0A|%0A%0D|%0D").expect("line break pattern is valid"));

/// Orders field names the way the gateway's PHP reference does.
///
/// A name is compared by its bytes up to and including its first `[`, with
/// that `[` weighted as `0`; anything after it is ignored, since PHP orders a
/// nested parameter only by its parent name. A name that is a strict prefix
/// of the other sorts first. The order is total, so names with equal keys
/// keep insertion order under a stable sort.
///
/// # Examples
///
/// ```
/// use threeds_gateway::encoding::php_compatible_cmp;
///
/// let mut keys = vec!["aB", "a[", "aA"];
/// keys.sort_by(|a, b| php_compatible_cmp(a, b));
/// assert_eq!(keys, ["a[", "aA", "aB"]);
/// ```
#[must_use]
pub fn php_compatible_cmp(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(sort_key(b))
}

fn sort_key(name: &str) -> impl Iterator<Item = u8> + '_ {
    let bytes = name.as_bytes();
    let end = bytes.iter().position(|&byte| byte == b'[').map_or(bytes.len(), |pos| pos + 1);
    bytes[..end].iter().map(|&byte| bracket_as_zero(byte))
}

const fn bracket_as_zero(byte: u8) -> u8 {
    if byte == b'[' { b'0' } else { byte }
}

/// Encodes a field set into its canonical `&`-joined `name=value` form.
///
/// The output is byte-identical for equal inputs and is the exact string the
/// signature is computed over.
///
/// # Examples
///
/// ```
/// use threeds_gateway::{encoding::encode, fields::FieldSet};
///
/// let fields = FieldSet::from([("b", "x y"), ("a", "1*2")]);
/// assert_eq!(encode(&fields), "a=1%2A2&b=x+y");
/// ```
#[must_use]
pub fn encode(fields: &FieldSet) -> String {
    let mut entries: Vec<_> = fields.iter().collect();
    entries.sort_by(|(a, _), (b, _)| php_compatible_cmp(a, b));
    let sorted: FieldSet = entries.into_iter().map(|(name, value)| (name, value.clone())).collect();

    let body = sorted
        .flatten()
        .iter()
        .map(|(name, value)| format!("{}={}", encode_component(name), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&");

    let body = LINE_BREAKS.replace_all(&body, "%0A");
    body.replace(EQUALS_MARKER, "=")
}

/// Form-encodes one name or value.
///
/// The WHATWG serializer leaves `*` as is where PHP emits `%2A`; it is the only
/// byte on which the two disagree.
fn encode_component(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes()).collect::<String>().replace('*', "%2A")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut keys: Vec<&str>) -> Vec<&str> {
        keys.sort_by(|a, b| php_compatible_cmp(a, b));
        keys
    }

    #[test]
    fn test_sort_plain_keys() {
        assert_eq!(sorted(vec!["a", "c", "b"]), ["a", "b", "c"]);
        assert_eq!(sorted(vec!["a", "aaa", "aa"]), ["a", "aa", "aaa"]);
        assert_eq!(sorted(vec!["acc", "ab", "aa", "ac", "aaa"]), ["aa", "aaa", "ab", "ac", "acc"]);
    }

    #[test]
    fn test_sort_bracket_as_zero() {
        assert_eq!(sorted(vec!["aB", "a[", "aA"]), ["a[", "aA", "aB"]);
        assert_eq!(sorted(vec!["aa", "ab", "aA", "a["]), ["a[", "aA", "aa", "ab"]);
    }

    #[test]
    fn test_sort_is_case_sensitive_bytewise() {
        assert_eq!(sorted(vec!["merchantid", "merchantID"]), ["merchantID", "merchantid"]);
    }

    #[test]
    fn test_nested_names_compare_equal_after_bracket() {
        assert_eq!(php_compatible_cmp("info[b]", "info[a]"), Ordering::Equal);
        assert_eq!(php_compatible_cmp("info[a]", "infoZ"), Ordering::Less);
        assert_eq!(php_compatible_cmp("info", "info[a]"), Ordering::Less);
    }

    #[test]
    fn test_cmp_bracket_and_digit_names_are_transitive() {
        assert_eq!(php_compatible_cmp("a[", "a0a"), Ordering::Less);
        assert_eq!(php_compatible_cmp("a0a", "a0b"), Ordering::Less);
        assert_eq!(php_compatible_cmp("a[", "a0b"), Ordering::Less);
        assert_eq!(php_compatible_cmp("a[", "a0"), Ordering::Equal);
        assert_eq!(php_compatible_cmp("a[x", "a[y"), Ordering::Equal);
    }

    #[test]
    fn test_sort_bracket_and_digit_names_is_total() {
        let alphabet = ["a", "0", "[", "b", "1"];
        let mut names = Vec::new();
        for first in alphabet {
            names.push(first.to_owned());
            for second in alphabet {
                names.push(format!("{first}{second}"));
                for third in alphabet {
                    names.push(format!("{first}{second}{third}"));
                }
            }
        }
        names.reverse();
        names.sort_by(|a, b| php_compatible_cmp(a, b));

        for (i, earlier) in names.iter().enumerate() {
            for later in &names[i + 1..] {
                assert_ne!(php_compatible_cmp(earlier, later), Ordering::Greater, "{earlier} > {later}");
            }
        }
    }

    #[test]
    fn test_encode_bracket_and_digit_names_ignore_insertion_order() {
        let forward = FieldSet::from([("a0b", "1"), ("a[", "2"), ("a0a", "3")]);
        let backward = FieldSet::from([("a0a", "3"), ("a[", "2"), ("a0b", "1")]);
        assert_eq!(encode(&forward), "a%5B=2&a0a=3&a0b=1");
        assert_eq!(encode(&forward), encode(&backward));
    }

    #[test]
    fn test_encode_sorts_groups_by_parent_only() {
        let mut fields = FieldSet::new();
        fields.insert("info0", "flat");
        fields.insert("info", FieldSet::from([("b", "2"), ("a", "1")]));
        fields.insert("infoA", "x");
        assert_eq!(encode(&fields), "info%5Bb%5D=2&info%5Ba%5D=1&info0=flat&infoA=x");
    }

    #[test]
    fn test_encode_sorts_and_joins() {
        let mut fields = FieldSet::new();
        fields.insert("transactionUnique", "X");
        fields.insert("action", "SALE");
        fields.insert("amount", 1001);
        fields.insert("merchantID", "100856");
        assert_eq!(
            encode(&fields),
            "action=SALE&amount=1001&merchantID=100856&transactionUnique=X"
        );
    }

    #[test]
    fn test_encode_nested_group_keeps_child_order() {
        let info = FieldSet::from([("deviceType", "desktop"), ("deviceChannel", "browser")]);
        let mut fields = FieldSet::new();
        fields.insert("zeta", "z");
        fields.insert("browserInfo", info);
        fields.insert("action", "SALE");

        assert_eq!(
            encode(&fields),
            "action=SALE&browserInfo%5BdeviceType%5D=desktop&browserInfo%5BdeviceChannel%5D=browser&zeta=z"
        );
    }

    #[test]
    fn test_encode_star_is_never_dropped() {
        let fields = FieldSet::from([("accept", "text/html, */*;q=0.1")]);
        let encoded = encode(&fields);
        assert_eq!(encoded, "accept=text%2Fhtml%2C+%2A%2F%2A%3Bq%3D0.1");
        assert!(!encoded.contains('*'));
    }

    #[test]
    fn test_encode_normalises_line_breaks() {
        let fields = FieldSet::from([("a", "x\r\ny"), ("b", "x\n\ry"), ("c", "x\ry"), ("d", "x\ny")]);
        assert_eq!(encode(&fields), "a=x%0Ay&b=x%0Ay&c=x%0Ay&d=x%0Ay");
    }

    #[test]
    fn test_encode_restores_equals_marker() {
        let fields = FieldSet::from([("packed", format!("[cres]{EQUALS_MARKER}abc"))]);
        assert_eq!(encode(&fields), "packed=%5Bcres%5D=abc");
    }

    #[test]
    fn test_encode_literal_equals_is_escaped() {
        let fields = FieldSet::from([("a", "b=c")]);
        assert_eq!(encode(&fields), "a=b%3Dc");
    }

    #[test]
    fn test_encode_is_deterministic() {
        let fields = FieldSet::from([("b", "2"), ("a", "1"), ("c", "é ü")]);
        assert_eq!(encode(&fields), encode(&fields.clone()));
        assert_eq!(encode(&fields), "a=1&b=2&c=%C3%A9+%C3%BC");
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode(&FieldSet::new()), "");
    }
}
