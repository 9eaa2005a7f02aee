//! Glob-style matching over cache keys.
//!
//! Follows the store's `MATCH`/`KEYS` dialect: `*` matches any run of
//! characters, `?` exactly one, `[...]` a character class (with `^` negation
//! and `a-z` ranges) and `\` escapes the next character.
//!
//! Only an unescaped `*` turns a caller key into a pattern key; see [`is_pattern`].

/// Wildcard marker that makes a key a pattern key.
pub const WILDCARD: char = '*';

/// Returns true if `key` contains an unescaped wildcard marker.
///
/// A `\*` matches a literal star in the store's MATCH dialect, so a key whose
/// only stars are escaped stays a literal key.
///
/// # Examples
///
/// ```
/// use relcache_core::cache::is_pattern;
///
/// assert!(is_pattern("user:*"));
/// assert!(!is_pattern("user:1"));
/// assert!(!is_pattern(r"user:\*"));
/// ```
pub fn is_pattern(key: &str) -> bool {
    let mut chars = key.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            WILDCARD => return true,
            _ => {}
        }
    }
    false
}

/// Checks if a cache key matches a glob pattern.
///
/// # Examples
///
/// ```
/// use relcache_core::cache::pattern_matches;
///
/// assert!(pattern_matches("user:*", "user:123"));
/// assert!(pattern_matches("user:?", "user:1"));
/// assert!(pattern_matches("user:[0-9]*", "user:42"));
/// assert!(!pattern_matches("user:*", "other:1"));
/// ```
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    // Position of the last `*` seen and the key index it was tried against.
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        if p < pattern.len() {
            match pattern[p] {
                '*' => {
                    backtrack = Some((p, k));
                    p += 1;
                    continue;
                }
                '?' => {
                    p += 1;
                    k += 1;
                    continue;
                }
                '[' => {
                    if let Some((matched, next)) = match_class(&pattern, p, key[k]) {
                        if matched {
                            p = next;
                            k += 1;
                            continue;
                        }
                    } else if key[k] == '[' {
                        // Unterminated class is a literal bracket.
                        p += 1;
                        k += 1;
                        continue;
                    }
                }
                '\\' if p + 1 < pattern.len() => {
                    if pattern[p + 1] == key[k] {
                        p += 2;
                        k += 1;
                        continue;
                    }
                }
                c => {
                    if c == key[k] {
                        p += 1;
                        k += 1;
                        continue;
                    }
                }
            }
        }

        match backtrack {
            Some((star, from)) => {
                p = star + 1;
                k = from + 1;
                backtrack = Some((star, from + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// Matches `c` against the class starting at `pattern[start] == '['`.
///
/// Returns `(matched, index after the closing bracket)`, or `None` when the
/// class is never closed.
fn match_class(pattern: &[char], start: usize, c: char) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negated = pattern.get(i) == Some(&'^');
    if negated {
        i += 1;
    }

    let mut matched = false;
    let mut first = true;
    while i < pattern.len() {
        let current = pattern[i];
        if current == ']' && !first {
            return Some((matched != negated, i + 1));
        }
        first = false;

        let (low, consumed) = if current == '\\' && i + 1 < pattern.len() {
            (pattern[i + 1], 2)
        } else {
            (current, 1)
        };
        i += consumed;

        if pattern.get(i) == Some(&'-') && pattern.get(i + 1).is_some_and(|n| *n != ']') {
            let high = pattern[i + 1];
            i += 2;
            let (low, high) = if low <= high { (low, high) } else { (high, low) };
            if (low..=high).contains(&c) {
                matched = true;
            }
        } else if low == c {
            matched = true;
        }
    }

    None
}
