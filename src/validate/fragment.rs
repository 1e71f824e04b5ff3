//! Fragment checks with a "did you mean" hint.

use crate::parser::Document;

/// Calculates the Levenshtein distance between two strings.
#[allow(clippy::needless_range_loop)]
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let chars1: Vec<char> = s1.chars().collect();
    let chars2: Vec<char> = s2.chars().collect();
    let len1 = chars1.len();
    let len2 = chars2.len();

    if len1 == 0 {
        return len2;
    }
    if len2 == 0 {
        return len1;
    }

    let mut prev: Vec<usize> = (0..=len2).collect();
    let mut row = vec![0; len2 + 1];
    for i in 0..len1 {
        row[0] = i + 1;
        for j in 0..len2 {
            let cost = usize::from(chars1[i] != chars2[j]);
            row[j + 1] = (prev[j + 1] + 1).min(row[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[len2]
}

/// The anchor of `doc` closest to `fragment`; ties go to the earliest.
pub fn closest_anchor<'a>(doc: &'a Document, fragment: &str) -> Option<&'a str> {
    closest(doc.anchors().iter().map(String::as_str), fragment)
}

pub(crate) fn closest<'a>(candidates: impl Iterator<Item = &'a str>, wanted: &str) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;
    for candidate in candidates {
        let distance = levenshtein_distance(wanted, candidate);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate, distance)),
        }
    }
    best.map(|(anchor, _)| anchor)
}

/// Describe a fragment `doc` does not define, or `None` if it does.
///
/// `place` names the document in the message ("this document", a path).
pub fn check_fragment(doc: &Document, fragment: &str, place: &str) -> Option<String> {
    if fragment.is_empty() || doc.has_anchor(fragment) {
        return None;
    }
    let hint = match closest_anchor(doc, fragment) {
        Some(anchor) => format!(" (closest: `#{anchor}`)"),
        None => " (document has no anchors)".to_string(),
    };
    Some(format!("no anchor `#{fragment}` in {place}{hint}"))
}
