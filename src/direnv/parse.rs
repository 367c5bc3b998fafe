// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

use std::collections::BTreeMap;

/// Variables direnv wants active for a directory.
pub type EnvDiff = BTreeMap<String, String>;

/// Prefix of `direnv status` output when the rc file is allowed.
const ALLOWED_MARKER: &str = "Found RC allowed true";

/// Parses `direnv export json` output.
///
/// Anything other than a flat object of string values (including empty
/// output) yields an empty diff.
#[must_use]
pub fn parse_export(output: &str) -> EnvDiff {
    if output.trim().is_empty() {
        return EnvDiff::new();
    }
    serde_json::from_str(output).unwrap_or_default()
}

/// Returns true if `direnv status` output reports an allowed rc file.
#[must_use]
pub fn parse_status(output: &str) -> bool {
    output.starts_with(ALLOWED_MARKER)
}
