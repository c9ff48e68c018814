//! Skill cap export.
//!
//! Derives the effective cap for every usable (class, skill, level) and writes
//! `class^skill^level^cap^0` lines grouped by class, then skill, then level.
//!
//! ## Modes
//! - **Legacy**: each class uses its own configured caps.
//! - **Multiclass**: each (skill, level) uses the highest cap among all classes
//!   able to use the skill. Emission is still gated per class on usability.
//!
//! In both modes a cap never drops below the cap emitted at the previous level
//! for the same (class, skill); levels without a configured row carry the
//! previous value forward.

use std::fmt;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::export::writer::write_file;
use crate::rules::{RuleSnapshot, toggle_label};

/// Warrior.
pub const FIRST_CLASS: u8 = 1;
/// Berserker.
pub const LAST_CLASS: u8 = 16;
pub const CLASS_COUNT: usize = (LAST_CLASS - FIRST_CLASS + 1) as usize;

/// 1H Blunt.
pub const FIRST_SKILL: u8 = 0;
/// 2H Piercing.
pub const LAST_SKILL: u8 = 77;
pub const MAX_SKILLS: usize = LAST_SKILL as usize + 1;

/// Levels held by the multiclass scratch table. Independent of the emitted
/// level range, which comes from the rules.
pub const MAX_LEVELS: usize = 100;

/// Read access to configured skill caps.
pub trait SkillCapSource {
    /// True when the class has a cap row for the skill at any level.
    fn is_usable(&self, skill_id: u8, class_id: u8) -> Result<bool>;

    /// Cap configured at exactly this level, if any.
    fn cap_at(&self, skill_id: u8, class_id: u8, level: u8) -> Result<Option<u32>>;
}

/// `skill_caps` table accessor.
pub struct SkillCapTable<'a> {
    conn: &'a Connection,
}

impl<'a> SkillCapTable<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SkillCapSource for SkillCapTable<'_> {
    fn is_usable(&self, skill_id: u8, class_id: u8) -> Result<bool> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT EXISTS(SELECT 1 FROM skill_caps WHERE class_id = ?1 AND skill_id = ?2)",
        )?;
        let usable = stmt.query_row(params![class_id, skill_id], |row| row.get(0))?;
        Ok(usable)
    }

    fn cap_at(&self, skill_id: u8, class_id: u8, level: u8) -> Result<Option<u32>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT cap FROM skill_caps WHERE class_id = ?1 AND skill_id = ?2 AND level = ?3 LIMIT 1",
        )?;
        let cap: Option<Option<i64>> = stmt
            .query_row(params![class_id, skill_id, level], |row| row.get(0))
            .optional()?;
        Ok(cap
            .flatten()
            .map(|cap| u32::try_from(cap.max(0)).unwrap_or(u32::MAX)))
    }
}

/// One emitted skill cap row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectiveSkillCap {
    pub class_id: u8,
    pub skill_id: u8,
    pub level: u8,
    pub cap: u32,
}

impl fmt::Display for EffectiveSkillCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // trailing field is unused by the client and always 0
        write!(
            f,
            "{}^{}^{}^{}^0",
            self.class_id, self.skill_id, self.level, self.cap
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapMode {
    Legacy,
    Multiclass,
}

impl CapMode {
    pub const fn from_multiclassing(enabled: bool) -> Self {
        if enabled { Self::Multiclass } else { Self::Legacy }
    }
}

/// Usability of every (skill, class) pair, resolved once per run.
#[derive(Debug, Clone)]
pub struct Usability {
    grid: Vec<[bool; CLASS_COUNT]>,
}

impl Usability {
    pub fn resolve<S: SkillCapSource + ?Sized>(source: &S) -> Result<Self> {
        let mut grid = vec![[false; CLASS_COUNT]; MAX_SKILLS];
        for (skill_id, classes) in (FIRST_SKILL..=LAST_SKILL).zip(grid.iter_mut()) {
            for (class_id, usable) in (FIRST_CLASS..=LAST_CLASS).zip(classes.iter_mut()) {
                *usable = source.is_usable(skill_id, class_id)?;
            }
        }
        Ok(Self { grid })
    }

    pub fn is_usable(&self, skill_id: u8, class_id: u8) -> bool {
        let Some(class_index) = class_id.checked_sub(FIRST_CLASS) else {
            return false;
        };
        self.grid
            .get(usize::from(skill_id))
            .and_then(|classes| classes.get(usize::from(class_index)))
            .copied()
            .unwrap_or(false)
    }

    fn classes_for(&self, skill_id: u8) -> Vec<u8> {
        (FIRST_CLASS..=LAST_CLASS)
            .filter(|class_id| self.is_usable(skill_id, *class_id))
            .collect()
    }
}

/// Highest cap per (skill, level) across every class able to use the skill.
///
/// Values are exact-level maxima; carry-forward happens at emission.
#[derive(Debug, Clone)]
pub struct ScratchTable {
    caps: Vec<[u32; MAX_LEVELS]>,
}

impl ScratchTable {
    pub fn build<S: SkillCapSource + ?Sized>(source: &S, usability: &Usability) -> Result<Self> {
        let mut caps = vec![[0; MAX_LEVELS]; MAX_SKILLS];
        for (skill_id, levels) in (FIRST_SKILL..=LAST_SKILL).zip(caps.iter_mut()) {
            let classes = usability.classes_for(skill_id);
            if classes.is_empty() {
                continue;
            }
            for (level, slot) in (1..=u8::MAX).zip(levels.iter_mut()) {
                let mut highest: u32 = 0;
                for &class_id in &classes {
                    if let Some(cap) = source.cap_at(skill_id, class_id, level)? {
                        highest = highest.max(cap);
                    }
                }
                *slot = highest;
            }
        }
        Ok(Self { caps })
    }

    /// Scratch value for (skill, level); 0 outside the table bounds.
    pub fn get(&self, skill_id: u8, level: u8) -> u32 {
        let Some(level_index) = usize::from(level).checked_sub(1) else {
            return 0;
        };
        self.caps
            .get(usize::from(skill_id))
            .and_then(|levels| levels.get(level_index))
            .copied()
            .unwrap_or(0)
    }
}

/// Computes effective skill caps in class, skill, level order.
pub struct SkillCapAggregator<'a, S: ?Sized> {
    source: &'a S,
    mode: CapMode,
    max_level: u8,
}

impl<'a, S: SkillCapSource + ?Sized> SkillCapAggregator<'a, S> {
    pub const fn new(source: &'a S, mode: CapMode, max_level: u8) -> Self {
        Self {
            source,
            mode,
            max_level,
        }
    }

    /// Feed every effective cap to `emit`, stopping at the first error.
    pub fn for_each<F>(&self, mut emit: F) -> Result<()>
    where
        F: FnMut(EffectiveSkillCap) -> Result<()>,
    {
        let usability = Usability::resolve(self.source)?;
        let scratch = match self.mode {
            CapMode::Multiclass => Some(ScratchTable::build(self.source, &usability)?),
            CapMode::Legacy => None,
        };
        debug!(mode = ?self.mode, max_level = self.max_level, "aggregating skill caps");

        for class_id in FIRST_CLASS..=LAST_CLASS {
            for skill_id in FIRST_SKILL..=LAST_SKILL {
                if !usability.is_usable(skill_id, class_id) {
                    continue;
                }

                let mut previous_cap = 0;
                for level in 1..=self.max_level {
                    let cap = match &scratch {
                        Some(scratch) => scratch.get(skill_id, level),
                        None => self
                            .source
                            .cap_at(skill_id, class_id, level)?
                            .unwrap_or(0),
                    };
                    // caps never regress as level increases
                    let cap = cap.max(previous_cap);

                    emit(EffectiveSkillCap {
                        class_id,
                        skill_id,
                        level,
                        cap,
                    })?;
                    previous_cap = cap;
                }
            }
        }
        Ok(())
    }

    pub fn collect(&self) -> Result<Vec<EffectiveSkillCap>> {
        let mut rows = Vec::new();
        self.for_each(|row| {
            rows.push(row);
            Ok(())
        })?;
        Ok(rows)
    }
}

/// Write `SkillCaps.txt` from the content database.
pub fn export(content: &Connection, rules: &RuleSnapshot, path: &Path) -> Result<usize> {
    info!(
        "Exporting Skill Caps. Multiclassing Mutations {}",
        toggle_label(rules.multiclassing)
    );

    let table = SkillCapTable::new(content);
    let aggregator = SkillCapAggregator::new(
        &table,
        CapMode::from_multiclassing(rules.multiclassing),
        rules.skill_cap_max_level,
    );
    write_file(path, |out| aggregator.for_each(|row| out.write_row(&row)))
}
