//! Extractor operations. Matches are returned as an ilist; N/A when
//! nothing matched.

use dj_core::values::Applied;
use regex::Regex;

pub fn find_all(entry: &str, re: &Regex) -> Applied {
    let matches: Vec<String> = re.find_iter(entry).map(|m| m.as_str().to_string()).collect();
    if matches.is_empty() {
        Applied::na()
    } else {
        Applied::from_entries(matches)
    }
}

/// Maximal runs of ASCII digits.
pub fn get_no(entry: &str) -> Applied {
    runs(entry, |c| c.is_ascii_digit())
}

/// Maximal runs of special (non-alphanumeric) characters.
pub fn get_sc(entry: &str) -> Applied {
    runs(entry, |c| !c.is_alphanumeric())
}

/// Maximal alphabetic runs.
pub fn segments(entry: &str) -> Applied {
    runs(entry, |c| c.is_alphabetic())
}

fn runs(entry: &str, pred: impl Fn(char) -> bool) -> Applied {
    let mut out = Vec::new();
    let mut cur = String::new();
    for c in entry.chars() {
        if pred(c) {
            cur.push(c);
        } else if !cur.is_empty() {
            out.push(std::mem::take(&mut cur));
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    if out.is_empty() {
        Applied::na()
    } else {
        Applied::from_entries(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_all() {
        let re = Regex::new("[A-Z][a-z]+").unwrap();
        assert_eq!(find_all("AudiRSModel", &re).entries(), ["Audi", "Model"]);
        assert!(find_all("lowercase", &re).is_na());
    }

    #[test]
    fn test_get_no() {
        assert_eq!(get_no("abc123def45").entries(), ["123", "45"]);
        assert!(get_no("abcdef").is_na());
    }

    #[test]
    fn test_get_sc() {
        assert_eq!(get_sc("a!!b--c").entries(), ["!!", "--"]);
        assert!(get_sc("abc").is_na());
    }

    #[test]
    fn test_segments() {
        assert_eq!(segments("audi2024rs").entries(), ["audi", "rs"]);
        assert!(segments("123").is_na());
    }
}
