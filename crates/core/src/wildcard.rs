// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filename wildcard matching for wipe patterns
//!
//! Supports `*` matching any run of characters (including none). This is the
//! only metacharacter the wipe pattern set uses.

/// Check if `name` matches `pattern`
pub fn matches(pattern: &str, name: &str) -> bool {
    match_bytes(pattern.as_bytes(), name.as_bytes())
}

fn match_bytes(pattern: &[u8], name: &[u8]) -> bool {
    match (pattern.first(), name.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            // `*` consumes zero characters, or one and stays greedy
            match_bytes(&pattern[1..], name)
                || (!name.is_empty() && match_bytes(pattern, &name[1..]))
        }
        (Some(p), Some(n)) if p == n => match_bytes(&pattern[1..], &name[1..]),
        _ => false,
    }
}

#[cfg(test)]
#[path = "wildcard_tests.rs"]
mod tests;
