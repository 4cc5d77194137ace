//! Semantic-version decision engine.
//!
//! Aggregates the classified commit stream into one bump decision with a
//! strict precedence: any breaking change forces major, any feature forces
//! minor, everything else is patch. The current version string is parsed, not
//! guessed: anything that isn't `MAJOR.MINOR.PATCH` (optionally prefixed,
//! optionally with a pre-release suffix) is rejected.

use semver::Version;

use crate::{
   error::{ChangelogError, Result},
   types::{BumpLevel, Category, NormalizedCommit, VersionDecision},
};

/// Parsed current version: a non-numeric prefix (echoed unchanged in output)
/// plus the semver core.
#[derive(Debug, Clone)]
pub struct CurrentVersion {
   /// Leading non-numeric text, e.g. `v` in `v1.2.3` (may be empty)
   pub prefix:  String,
   pub version: Version,
}

impl CurrentVersion {
   /// Parse a version string such as `1.2.3`, `v1.2.3`, or
   /// `release-2.0.0-rc.1`. Fails with `InvalidVersionFormat` rather than
   /// guessing.
   pub fn parse(input: &str) -> Result<Self> {
      let trimmed = input.trim();
      let digit_at = trimmed
         .find(|c: char| c.is_ascii_digit())
         .ok_or_else(|| ChangelogError::InvalidVersionFormat { input: input.to_string() })?;

      let (prefix, numeric) = trimmed.split_at(digit_at);
      let version = Version::parse(numeric)
         .map_err(|_| ChangelogError::InvalidVersionFormat { input: input.to_string() })?;

      Ok(Self { prefix: prefix.to_string(), version })
   }

   /// True for 0.x.y versions, where semver semantics are not yet stable
   pub const fn is_pre_stable(&self) -> bool {
      self.version.major == 0
   }

   /// Apply a bump level and format the result, echoing the original prefix.
   /// Pre-release and build metadata are cleared: the decision names the next
   /// release, not another candidate.
   pub fn bumped(&self, level: BumpLevel) -> String {
      let v = &self.version;
      let next = match level {
         BumpLevel::Major => Version::new(v.major + 1, 0, 0),
         BumpLevel::Minor => Version::new(v.major, v.minor + 1, 0),
         BumpLevel::Patch => Version::new(v.major, v.minor, v.patch + 1),
      };
      format!("{}{next}", self.prefix)
   }
}

/// Decide the bump level for the classified stream.
///
/// Precedence is strict and never reordered: breaking, then feature, then
/// patch. For pre-stable (0.x) versions a minor decision keeps its level but
/// the rationale flags the situation so callers can apply their own policy.
pub fn decide(current: &CurrentVersion, commits: &[NormalizedCommit]) -> VersionDecision {
   let breaking = commits.iter().filter(|c| c.is_breaking).count();
   let features = commits
      .iter()
      .filter(|c| c.category == Category::Feature)
      .count();
   let fixes = commits
      .iter()
      .filter(|c| c.category == Category::Fix)
      .count();

   let (bump_level, mut rationale) = if breaking > 0 {
      (BumpLevel::Major, format!("contains {breaking} breaking change(s)"))
   } else if features > 0 {
      (BumpLevel::Minor, format!("adds {features} new feature(s)"))
   } else if fixes > 0 {
      (BumpLevel::Patch, format!("contains {fixes} bug fix(es)"))
   } else {
      (BumpLevel::Patch, "contains maintenance and minor updates".to_string())
   };

   if current.is_pre_stable() && bump_level == BumpLevel::Minor {
      rationale.push_str("; project is pre-stable (0.x), minor changes may break consumers");
   }

   VersionDecision { bump_level, rationale }
}
