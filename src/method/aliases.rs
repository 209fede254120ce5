//! Country-name aliases and normalization

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
  /// Whole name equals the pattern (case-insensitive)
  Exact,
  /// Name contains the pattern anywhere (case-insensitive)
  Contains,
}

#[derive(Debug, Clone)]
pub struct AliasRule {
  pub kind: MatchKind,
  pub pattern: &'static str,
  pub replacement: &'static str,
}

impl AliasRule {
  fn matches(&self, name_lower: &str) -> bool {
    let pattern = self.pattern.to_lowercase();
    match self.kind {
      MatchKind::Exact => name_lower == pattern,
      MatchKind::Contains => name_lower.contains(&pattern),
    }
  }
}

/// Alias rules in priority order. First match wins.
pub const ALIAS_RULES: &[AliasRule] = &[
  AliasRule {
    kind: MatchKind::Exact,
    pattern: "Republic of India",
    replacement: "India",
  },
  AliasRule {
    kind: MatchKind::Exact,
    pattern: "United States of America",
    replacement: "United States",
  },
  AliasRule {
    kind: MatchKind::Exact,
    pattern: "USA",
    replacement: "United States",
  },
  AliasRule {
    kind: MatchKind::Exact,
    pattern: "UK",
    replacement: "United Kingdom",
  },
  AliasRule {
    kind: MatchKind::Exact,
    pattern: "UAE",
    replacement: "United Arab Emirates",
  },
  AliasRule {
    kind: MatchKind::Exact,
    pattern: "KSA",
    replacement: "Saudi Arabia",
  },
  AliasRule {
    kind: MatchKind::Contains,
    pattern: "India",
    replacement: "India",
  },
  AliasRule {
    kind: MatchKind::Contains,
    pattern: "United States",
    replacement: "United States",
  },
  AliasRule {
    kind: MatchKind::Contains,
    pattern: "Saudi",
    replacement: "Saudi Arabia",
  },
];

/// Trim a country name and map known aliases to their canonical form.
/// Names no rule matches come back trimmed but otherwise unchanged.
pub fn normalize_country_name(name: &str) -> String {
  let trimmed = name.trim();
  let lower = trimmed.to_lowercase();

  ALIAS_RULES
    .iter()
    .find(|rule| rule.matches(&lower))
    .map(|rule| rule.replacement.to_string())
    .unwrap_or_else(|| trimmed.to_string())
}
