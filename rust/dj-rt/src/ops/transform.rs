//! Transformer operations. Every function returns N/A when the derived
//! entry would equal the input verbatim.

use dj_core::values::Applied;

pub fn lower(entry: &str) -> Applied {
    Applied::changed(entry, entry.to_lowercase())
}

pub fn upper(entry: &str) -> Applied {
    Applied::changed(entry, entry.to_uppercase())
}

/// First character uppercased, the rest lowercased.
pub fn capitalize(entry: &str) -> Applied {
    let mut chars = entry.chars();
    let out = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    };
    Applied::changed(entry, out)
}

/// Uppercases the first letter of every alphabetic run.
pub fn title(entry: &str) -> Applied {
    let mut out = String::with_capacity(entry.len());
    let mut at_word_start = true;
    for c in entry.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    Applied::changed(entry, out)
}

pub fn reverse(entry: &str) -> Applied {
    Applied::changed(entry, entry.chars().rev().collect())
}

pub fn remove(entry: &str, chars: &str) -> Applied {
    let out: String = entry.chars().filter(|c| !chars.contains(*c)).collect();
    Applied::changed(entry, out)
}

pub fn remove_ws(entry: &str) -> Applied {
    let out: String = entry.chars().filter(|c| !c.is_whitespace()).collect();
    Applied::changed(entry, out)
}

/// Collapses every whitespace run into a single space and trims the ends.
pub fn fold_ws(entry: &str) -> Applied {
    let out = entry.split_whitespace().collect::<Vec<_>>().join(" ");
    Applied::changed(entry, out)
}

pub fn strip(entry: &str, chars: Option<&str>) -> Applied {
    let out = match chars {
        Some(set) => entry.trim_matches(|c| set.contains(c)),
        None => entry.trim(),
    };
    Applied::changed(entry, out.to_string())
}

/// Splits on a separator. Not applicable when the separator never occurs.
pub fn split(entry: &str, sep: &str) -> Applied {
    if sep.is_empty() || !entry.contains(sep) {
        return Applied::na();
    }
    Applied::from_entries(entry.split(sep).map(|s| s.to_string()))
}

/// One variant per target character, with every occurrence of any source
/// character replaced by it.
pub fn map(entry: &str, chars: &str, targets: &str) -> Applied {
    if !entry.chars().any(|c| chars.contains(c)) {
        return Applied::na();
    }
    Applied::from_entries(targets.chars().map(|t| {
        entry
            .chars()
            .map(|c| if chars.contains(c) { t } else { c })
            .collect::<String>()
    }))
}

/// Applies a two-column mapping table, first column to second, in order.
pub fn replace(entry: &str, table: &[(String, String)]) -> Applied {
    let mut out = entry.to_string();
    for (from, to) in table {
        if !from.is_empty() {
            out = out.replace(from.as_str(), to);
        }
    }
    Applied::changed(entry, out)
}

pub fn append(entry: &str, suffix: &str) -> Applied {
    Applied::changed(entry, format!("{}{}", entry, suffix))
}

pub fn prepend(entry: &str, prefix: &str) -> Applied {
    Applied::changed(entry, format!("{}{}", prefix, entry))
}

/// Collapses adjacent runs of one repeated character: `aaabbbccc` -> `abc`.
pub fn deduplicate(entry: &str) -> Applied {
    let mut out = String::with_capacity(entry.len());
    let mut last: Option<char> = None;
    for c in entry.chars() {
        if last != Some(c) {
            out.push(c);
        }
        last = Some(c);
    }
    Applied::changed(entry, out)
}

/// Moves the first character to the end.
pub fn rotate(entry: &str) -> Applied {
    let mut chars = entry.chars();
    let out = match chars.next() {
        Some(first) => {
            let mut rest: String = chars.collect();
            rest.push(first);
            rest
        }
        None => String::new(),
    };
    Applied::changed(entry, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_na_on_unchanged() {
        assert!(lower("abc").is_na());
        assert_eq!(lower("AbC").entries(), ["abc"]);
    }

    #[test]
    fn test_lower_idempotent() {
        let once = lower("AbC").entries()[0].clone();
        assert!(lower(&once).is_na());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("aUDI").entries(), ["Audi"]);
        assert!(capitalize("Audi").is_na());
    }

    #[test]
    fn test_title() {
        assert_eq!(title("audi rs").entries(), ["Audi Rs"]);
    }

    #[test]
    fn test_reverse_twice_is_identity() {
        let once = reverse("abc").entries()[0].clone();
        assert_eq!(reverse(&once).entries(), ["abc"]);
    }

    #[test]
    fn test_remove() {
        assert_eq!(remove("a-b-c", "-").entries(), ["abc"]);
        assert!(remove("abc", "-").is_na());
        // idempotent once applied
        assert!(remove("abc", "-").is_na());
    }

    #[test]
    fn test_remove_ws() {
        assert_eq!(remove_ws("a b c").entries(), ["abc"]);
        assert!(remove_ws("abc").is_na());
    }

    #[test]
    fn test_fold_ws() {
        assert_eq!(fold_ws("a  b\tc").entries(), ["a b c"]);
    }

    #[test]
    fn test_strip() {
        assert_eq!(strip("  ab  ", None).entries(), ["ab"]);
        assert_eq!(strip("--ab--", Some("-")).entries(), ["ab"]);
    }

    #[test]
    fn test_split() {
        assert_eq!(split("A Test", " ").entries(), ["A", "Test"]);
        assert!(split("abc", " ").is_na());
    }

    #[test]
    fn test_split_drops_empty_parts() {
        assert_eq!(split("a  b", " ").entries(), ["a", "b"]);
    }

    #[test]
    fn test_map_one_variant_per_target() {
        assert_eq!(map("Audi RS", " ", "-_").entries(), ["Audi-RS", "Audi_RS"]);
        assert!(map("AudiRS", " ", "-_").is_na());
    }

    #[test]
    fn test_replace_table() {
        let table = vec![("ss".to_string(), "ß".to_string())];
        assert_eq!(replace("strasse", &table).entries(), ["straße"]);
        assert!(replace("weg", &table).is_na());
    }

    #[test]
    fn test_append_prepend() {
        assert_eq!(append("a", "!").entries(), ["a!"]);
        assert_eq!(prepend("a", "$").entries(), ["$a"]);
        assert!(append("a", "").is_na());
    }

    #[test]
    fn test_deduplicate() {
        assert_eq!(deduplicate("aaabbbccc").entries(), ["abc"]);
        assert!(deduplicate("abc").is_na());
        // twice equals once
        let once = deduplicate("aabbaa").entries()[0].clone();
        assert!(deduplicate(&once).is_na());
    }

    #[test]
    fn test_rotate() {
        assert_eq!(rotate("abc").entries(), ["bca"]);
        assert!(rotate("a").is_na());
    }
}
