//! Filter operations. A filter passes the unmodified input or rejects
//! with N/A; it never returns a derived value.

use dj_core::values::Applied;
use regex::Regex;

/// Character-count metrics usable with `min` and `max`.
pub fn metric(entry: &str, name: &str) -> Option<usize> {
    let value = match name {
        "length" => entry.chars().count(),
        "lower" => entry.chars().filter(|c| c.is_lowercase()).count(),
        "upper" => entry.chars().filter(|c| c.is_uppercase()).count(),
        "digits" => entry.chars().filter(|c| c.is_ascii_digit()).count(),
        "special" => entry.chars().filter(|c| !c.is_alphanumeric()).count(),
        "unique" => {
            let mut chars: Vec<char> = entry.chars().collect();
            chars.sort_unstable();
            chars.dedup();
            chars.len()
        }
        _ => return None,
    };
    Some(value)
}

pub fn min(entry: &str, name: &str, bound: usize) -> Option<Applied> {
    metric(entry, name).map(|v| Applied::verdict(entry, v >= bound))
}

pub fn max(entry: &str, name: &str, bound: usize) -> Option<Applied> {
    metric(entry, name).map(|v| Applied::verdict(entry, v <= bound))
}

/// Passes when the entry contains at least one of the given characters.
pub fn has(entry: &str, chars: &str) -> Applied {
    Applied::verdict(entry, entry.chars().any(|c| chars.contains(c)))
}

pub fn matches(entry: &str, re: &Regex) -> Applied {
    Applied::verdict(entry, re.is_match(entry))
}

/// At least one cased character and every cased character lowercase.
pub fn is_lower(entry: &str) -> Applied {
    let mut cased = false;
    for c in entry.chars() {
        if c.is_uppercase() {
            return Applied::verdict(entry, false);
        }
        if c.is_lowercase() {
            cased = true;
        }
    }
    Applied::verdict(entry, cased)
}

pub fn is_upper(entry: &str) -> Applied {
    let mut cased = false;
    for c in entry.chars() {
        if c.is_lowercase() {
            return Applied::verdict(entry, false);
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    Applied::verdict(entry, cased)
}

pub fn is_no(entry: &str) -> Applied {
    Applied::verdict(
        entry,
        !entry.is_empty() && entry.chars().all(|c| c.is_ascii_digit()),
    )
}

pub fn is_sc(entry: &str) -> Applied {
    Applied::verdict(
        entry,
        !entry.is_empty() && entry.chars().all(|c| !c.is_alphanumeric()),
    )
}

/// The entry's collapsed character-class sequence: `l` lower, `u` upper,
/// `d` digit, `s` special. `Audi2024!` -> `uld s` collapsed to "ulds".
pub fn class_sequence(entry: &str) -> String {
    let mut out = String::new();
    let mut last = None;
    for c in entry.chars() {
        let class = if c.is_uppercase() {
            'u'
        } else if c.is_ascii_digit() {
            'd'
        } else if c.is_alphabetic() {
            'l'
        } else {
            's'
        };
        if last != Some(class) {
            out.push(class);
        }
        last = Some(class);
    }
    out
}

/// With an argument: the class sequence must equal it. Without: the entry
/// must mix at least two character classes.
pub fn is_pattern(entry: &str, classes: Option<&str>) -> Applied {
    let seq = class_sequence(entry);
    let pass = match classes {
        Some(expected) => seq == expected,
        None => {
            let mut distinct: Vec<char> = seq.chars().collect();
            distinct.sort_unstable();
            distinct.dedup();
            distinct.len() >= 2
        }
    };
    Applied::verdict(entry, pass)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_length() {
        assert!(min("abc", "length", 3).unwrap().is_productive());
        assert!(min("ab", "length", 3).unwrap().is_na());
        assert!(max("abc", "length", 3).unwrap().is_productive());
        assert!(max("abcd", "length", 3).unwrap().is_na());
    }

    #[test]
    fn test_filter_returns_input_verbatim() {
        let r = min("Abc", "length", 1).unwrap();
        assert_eq!(r.entries(), ["Abc"]);
    }

    #[test]
    fn test_metrics() {
        assert_eq!(metric("Audi2024!", "upper"), Some(1));
        assert_eq!(metric("Audi2024!", "digits"), Some(4));
        assert_eq!(metric("Audi2024!", "special"), Some(1));
        assert_eq!(metric("aabb", "unique"), Some(2));
        assert_eq!(metric("x", "bogus"), None);
    }

    #[test]
    fn test_has() {
        assert!(has("a-b", "-_").is_productive());
        assert!(has("ab", "-_").is_na());
    }

    #[test]
    fn test_is_lower_upper() {
        assert!(is_lower("abc1").is_productive());
        assert!(is_lower("Abc").is_na());
        assert!(is_lower("123").is_na());
        assert!(is_upper("ABC").is_productive());
        assert!(is_upper("AbC").is_na());
    }

    #[test]
    fn test_is_no_is_sc() {
        assert!(is_no("2024").is_productive());
        assert!(is_no("20x24").is_na());
        assert!(is_sc("!!").is_productive());
        assert!(is_sc("!a").is_na());
    }

    #[test]
    fn test_class_sequence() {
        assert_eq!(class_sequence("Audi2024!"), "ulds");
        assert_eq!(class_sequence("abc"), "l");
    }

    #[test]
    fn test_is_pattern() {
        assert!(is_pattern("Audi2024!", Some("ulds")).is_productive());
        assert!(is_pattern("Audi2024!", Some("ld")).is_na());
        assert!(is_pattern("abc123", None).is_productive());
        assert!(is_pattern("abc", None).is_na());
    }
}
