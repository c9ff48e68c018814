//! Rule lookups against the `rule_values` table.
//!
//! Rules toggle exporter behaviour. A lookup never fails: a missing row, an
//! unparseable value or an unreachable store all resolve to the rule's default.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;

pub const MULTICLASSING_ENABLED: &str = "Custom:MulticlassingEnabled";
pub const IMPLIED_TARGETING: &str = "Spells:UseSpellImpliedTargeting";
pub const SKILL_CAP_MAX_LEVEL: &str = "Character:SkillCapMaxLevel";
pub const MAX_LEVEL: &str = "Character:MaxLevel";

/// Default for `Character:MaxLevel` when the rule is not stored.
pub const DEFAULT_MAX_LEVEL: i64 = 65;

/// Read access to the rules store.
pub struct RuleStore<'a> {
    conn: &'a Connection,
    ruleset_id: Option<i64>,
}

impl<'a> RuleStore<'a> {
    pub const fn new(conn: &'a Connection, ruleset_id: Option<i64>) -> Self {
        Self { conn, ruleset_id }
    }

    /// Raw stored text for a rule, `None` when absent or unreadable.
    pub fn raw(&self, name: &str) -> Option<String> {
        match self.query(name) {
            Ok(value) => value,
            Err(err) => {
                warn!(rule = name, error = %err, "rule lookup failed, using default");
                None
            }
        }
    }

    fn query(&self, name: &str) -> Result<Option<String>> {
        let value = match self.ruleset_id {
            Some(ruleset_id) => self
                .conn
                .query_row(
                    "SELECT rule_value FROM rule_values WHERE ruleset_id = ?1 AND rule_name = ?2 LIMIT 1",
                    params![ruleset_id, name],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?,
            None => self
                .conn
                .query_row(
                    "SELECT rule_value FROM rule_values WHERE rule_name = ?1 LIMIT 1",
                    params![name],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?,
        };
        Ok(value.flatten())
    }

    /// Boolean rule: true only when the stored text is exactly `true`.
    pub fn bool(&self, name: &str) -> bool {
        self.raw(name).is_some_and(|value| value == "true")
    }

    /// Integer rule, `None` when absent or not an integer.
    pub fn int(&self, name: &str) -> Option<i64> {
        let raw = self.raw(name)?;
        match raw.trim().parse::<i64>() {
            Ok(value) => Some(value),
            Err(_) => {
                debug!(rule = name, value = %raw, "rule value is not an integer");
                None
            }
        }
    }

    /// Highest level emitted in the skill cap export.
    ///
    /// `Character:SkillCapMaxLevel` when positive, otherwise
    /// `Character:MaxLevel`. Clamped to the byte-sized level range.
    pub fn skill_cap_max_level(&self) -> u8 {
        let level = self
            .int(SKILL_CAP_MAX_LEVEL)
            .filter(|level| *level > 0)
            .unwrap_or_else(|| self.int(MAX_LEVEL).unwrap_or(DEFAULT_MAX_LEVEL));
        u8::try_from(level.clamp(1, i64::from(u8::MAX))).unwrap_or(u8::MAX)
    }
}

/// Rule values read once at the start of an export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleSnapshot {
    pub multiclassing: bool,
    pub implied_targeting: bool,
    pub skill_cap_max_level: u8,
}

impl RuleSnapshot {
    pub fn load(store: &RuleStore<'_>) -> Self {
        let snapshot = Self {
            multiclassing: store.bool(MULTICLASSING_ENABLED),
            implied_targeting: store.bool(IMPLIED_TARGETING),
            skill_cap_max_level: store.skill_cap_max_level(),
        };
        debug!(?snapshot, "loaded rules");
        snapshot
    }
}

impl Default for RuleSnapshot {
    fn default() -> Self {
        Self {
            multiclassing: false,
            implied_targeting: false,
            skill_cap_max_level: u8::try_from(DEFAULT_MAX_LEVEL).unwrap_or(u8::MAX),
        }
    }
}

/// `Enabled`/`Disabled` label used in export log lines.
pub const fn toggle_label(enabled: bool) -> &'static str {
    if enabled { "Enabled" } else { "Disabled" }
}
