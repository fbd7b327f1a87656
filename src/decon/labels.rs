//! Short per-file labels for intermediate script outputs

use std::collections::HashSet;

fn is_separator(c: char) -> bool {
    matches!(c, '.' | '_' | '-' | '/')
}

/// Remove the prefix and suffix shared by every name
///
/// Both ends snap to a separator (`.`, `_`, `-`, `/`) so that labels keep
/// whole words: `seed.errts.1D` / `seed.fitts.1D` give `errts` / `fitts`
/// rather than `err` / `fit`. With fewer than two names the list is returned
/// unchanged.
pub fn strip_common_form(names: &[String]) -> Vec<String> {
    if names.len() < 2 {
        return names.to_vec();
    }

    let chars: Vec<Vec<char>> = names.iter().map(|n| n.chars().collect()).collect();
    let shortest = chars.iter().map(Vec::len).min().unwrap_or(0);

    let mut prefix = 0;
    while prefix < shortest && chars.iter().all(|c| c[prefix] == chars[0][prefix]) {
        prefix += 1;
    }
    // keep through the last separator inside the shared prefix
    prefix = chars[0][..prefix]
        .iter()
        .rposition(|&c| is_separator(c))
        .map(|p| p + 1)
        .unwrap_or(0);

    let mut suffix = 0;
    while suffix < shortest - prefix
        && chars
            .iter()
            .all(|c| c[c.len() - 1 - suffix] == chars[0][chars[0].len() - 1 - suffix])
    {
        suffix += 1;
    }
    // start the shared suffix at its first separator
    let first = &chars[0];
    suffix = first[first.len() - suffix..]
        .iter()
        .position(|&c| is_separator(c))
        .map(|p| suffix - p)
        .unwrap_or(0);

    chars
        .iter()
        .map(|c| c[prefix..c.len() - suffix].iter().collect())
        .collect()
}

/// Two-digit labels for each input, e.g. `01.errts`, `02.fitts`
///
/// Falls back to positional `NN.ts` labels when shortening leaves the first
/// name unchanged, or yields an empty, duplicate or path-like label.
pub fn file_labels(infiles: &[String]) -> Vec<String> {
    let short = strip_common_form(infiles);

    let mut seen = HashSet::new();
    let usable = short.len() == infiles.len()
        && short.first() != infiles.first()
        && short
            .iter()
            .all(|l| !l.is_empty() && !l.contains('/') && seen.insert(l.as_str()));

    (1..=infiles.len())
        .map(|index| {
            if usable {
                format!("{:02}.{}", index, short[index - 1])
            } else {
                format!("{:02}.ts", index)
            }
        })
        .collect()
}
