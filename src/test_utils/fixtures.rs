use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};
use tempfile::TempDir;

use crate::error::Result;
use crate::export::skill_caps::SkillCapSource;

/// Tables read by the exporters, in the shape the server schema uses.
pub const SCHEMA: &str = "
    CREATE TABLE rule_values (
        ruleset_id INTEGER NOT NULL DEFAULT 1,
        rule_name TEXT NOT NULL,
        rule_value TEXT,
        notes TEXT
    );
    CREATE TABLE skill_caps (
        skill_id INTEGER NOT NULL,
        class_id INTEGER NOT NULL,
        level INTEGER NOT NULL,
        cap INTEGER,
        UNIQUE (class_id, skill_id, level)
    );
    CREATE TABLE spells_new (
        id INTEGER PRIMARY KEY,
        name TEXT,
        targettype INTEGER,
        resisttype INTEGER
    );
    CREATE TABLE base_data (
        level INTEGER NOT NULL,
        class INTEGER NOT NULL,
        hp REAL,
        mana REAL,
        hp_fac REAL DEFAULT 0.5
    );
    CREATE TABLE db_str (
        id INTEGER NOT NULL,
        type INTEGER NOT NULL,
        value TEXT
    );
";

/// Skill cap rows as `(class_id, skill_id, level, cap)`.
pub type SkillCapRow = (u8, u8, u8, i64);
/// Spell rows as `(id, name, targettype, resisttype)`.
pub type SpellRow<'a> = (i64, Option<&'a str>, Option<i64>, Option<i64>);

/// Expected `SkillCaps.txt` for [`ExportFixture::seeded`] with multiclassing off.
pub const SEEDED_SKILL_CAPS_LEGACY: &str = "\
1^0^1^5^0
1^0^2^10^0
1^0^3^10^0
1^11^1^1^0
1^11^2^1^0
1^11^3^1^0
2^0^1^8^0
2^0^2^8^0
2^0^3^20^0
";

/// Expected `SkillCaps.txt` for [`ExportFixture::seeded`] with multiclassing on.
pub const SEEDED_SKILL_CAPS_MULTICLASS: &str = "\
1^0^1^8^0
1^0^2^10^0
1^0^3^20^0
1^11^1^1^0
1^11^2^1^0
1^11^3^1^0
2^0^1^8^0
2^0^2^10^0
2^0^3^20^0
";

/// Expected `spells_us.txt` for [`ExportFixture::seeded`] with implied targeting on.
pub const SEEDED_SPELLS_IMPLIED: &str = "\
1^Minor Healing^5^0
2^Pet Heal^6^1
3^Master Ward^6^
";

/// Expected `BaseData.txt` for [`ExportFixture::seeded`].
pub const SEEDED_BASE_DATA: &str = "\
1^1^10^^0.5
1^2^12^^0.5
";

/// Expected `dbstr_us.txt` for [`ExportFixture::seeded`].
pub const SEEDED_DB_STRINGS: &str = "\
Major^Minor^String(New)
1^1^Hello
1^2^
";

fn schema_db() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch(SCHEMA).expect("create schema");
    conn
}

fn insert_skill_caps(conn: &Connection, rows: &[SkillCapRow]) {
    for (class_id, skill_id, level, cap) in rows {
        conn.execute(
            "INSERT INTO skill_caps (class_id, skill_id, level, cap) VALUES (?1, ?2, ?3, ?4)",
            params![class_id, skill_id, level, cap],
        )
        .expect("insert skill cap");
    }
}

fn insert_spells(conn: &Connection, rows: &[SpellRow<'_>]) {
    for (id, name, target_type, resist_type) in rows {
        conn.execute(
            "INSERT INTO spells_new (id, name, targettype, resisttype) VALUES (?1, ?2, ?3, ?4)",
            params![id, name, target_type, resist_type],
        )
        .expect("insert spell");
    }
}

fn insert_base_data(conn: &Connection, rows: &[(i64, i64, f64)]) {
    for (level, class, hp) in rows {
        conn.execute(
            "INSERT INTO base_data (level, class, hp) VALUES (?1, ?2, ?3)",
            params![level, class, hp],
        )
        .expect("insert base data");
    }
}

fn insert_db_strings(conn: &Connection, rows: &[(i64, i64, Option<&str>)]) {
    for (id, kind, value) in rows {
        conn.execute(
            "INSERT INTO db_str (id, type, value) VALUES (?1, ?2, ?3)",
            params![id, kind, value],
        )
        .expect("insert db string");
    }
}

/// In-memory database holding the given skill caps.
pub fn skill_caps_db(rows: &[SkillCapRow]) -> Connection {
    let conn = schema_db();
    insert_skill_caps(&conn, rows);
    conn
}

/// In-memory database holding the given spells.
pub fn spells_db(rows: &[SpellRow<'_>]) -> Connection {
    let conn = schema_db();
    insert_spells(&conn, rows);
    conn
}

/// In-memory database holding base data rows `(level, class, hp)`.
pub fn base_data_db(rows: &[(i64, i64, f64)]) -> Connection {
    let conn = schema_db();
    insert_base_data(&conn, rows);
    conn
}

/// In-memory database holding db strings `(id, type, value)`.
pub fn db_strings_db(rows: &[(i64, i64, Option<&str>)]) -> Connection {
    let conn = schema_db();
    insert_db_strings(&conn, rows);
    conn
}

/// Skill cap source backed by a map, counting cap lookups.
#[derive(Debug, Default)]
pub struct MemorySkillCaps {
    entries: BTreeMap<(u8, u8, u8), u32>,
    cap_lookups: Cell<usize>,
}

impl MemorySkillCaps {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cap for (class, skill, level).
    #[must_use]
    pub fn with(mut self, class_id: u8, skill_id: u8, level: u8, cap: u32) -> Self {
        self.insert(class_id, skill_id, level, cap);
        self
    }

    pub fn insert(&mut self, class_id: u8, skill_id: u8, level: u8, cap: u32) {
        self.entries.insert((class_id, skill_id, level), cap);
    }

    /// Number of `cap_at` calls made so far.
    pub fn cap_lookups(&self) -> usize {
        self.cap_lookups.get()
    }

    /// True when any entry exists for (class, skill).
    pub fn defines(&self, class_id: u8, skill_id: u8) -> bool {
        self.entries
            .range((class_id, skill_id, 0)..=(class_id, skill_id, u8::MAX))
            .next()
            .is_some()
    }
}

impl SkillCapSource for MemorySkillCaps {
    fn is_usable(&self, skill_id: u8, class_id: u8) -> Result<bool> {
        Ok(self.defines(class_id, skill_id))
    }

    fn cap_at(&self, skill_id: u8, class_id: u8, level: u8) -> Result<Option<u32>> {
        self.cap_lookups.set(self.cap_lookups.get() + 1);
        Ok(self.entries.get(&(class_id, skill_id, level)).copied())
    }
}

/// On-disk database plus server directory for end-to-end export tests.
pub struct ExportFixture {
    pub temp_dir: TempDir,
    db_path: PathBuf,
}

impl Default for ExportFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportFixture {
    /// Empty schema, no rows.
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("eqemu.db");
        let conn = Connection::open(&db_path).expect("create fixture db");
        conn.execute_batch(SCHEMA).expect("create schema");

        println!("[FIXTURE] Created database: {db_path:?}");
        Self { temp_dir, db_path }
    }

    /// Schema plus a small data set covering every export.
    ///
    /// `Character:MaxLevel` is 3 and implied targeting is enabled.
    #[must_use]
    pub fn seeded() -> Self {
        let fixture = Self::new();
        let conn = fixture.open_writable();
        fixture.insert_rule("Character:MaxLevel", "3");
        fixture.insert_rule("Spells:UseSpellImpliedTargeting", "true");
        insert_skill_caps(
            &conn,
            &[
                (1, 0, 1, 5),
                (1, 0, 2, 10),
                (2, 0, 1, 8),
                (2, 0, 3, 20),
                (1, 11, 1, 1),
            ],
        );
        insert_spells(
            &conn,
            &[
                (1, Some("Minor Healing"), Some(5), Some(0)),
                (2, Some("Pet Heal"), Some(14), Some(1)),
                (3, Some("Master Ward"), Some(38), None),
            ],
        );
        insert_base_data(&conn, &[(1, 2, 12.0), (1, 1, 10.0)]);
        insert_db_strings(&conn, &[(1, 2, None), (1, 1, Some("Hello"))]);
        fixture
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn server_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn export_dir(&self) -> PathBuf {
        self.server_path().join("export")
    }

    pub fn open_writable(&self) -> Connection {
        Connection::open(&self.db_path).expect("open fixture db")
    }

    /// Connection used as the primary database handle in tests.
    pub fn open_primary(&self) -> Connection {
        self.open_writable()
    }

    pub fn execute(&self, sql: &str) {
        self.open_writable()
            .execute_batch(sql)
            .expect("execute fixture sql");
    }

    pub fn insert_rule(&self, name: &str, value: &str) {
        self.open_writable()
            .execute(
                "INSERT INTO rule_values (rule_name, rule_value) VALUES (?1, ?2)",
                params![name, value],
            )
            .expect("insert rule");
    }

    pub fn set_rule(&self, name: &str, value: &str) {
        self.open_writable()
            .execute(
                "DELETE FROM rule_values WHERE rule_name = ?1",
                params![name],
            )
            .expect("delete rule");
        self.insert_rule(name, value);
    }

    /// Write a config file pointing at this fixture and return its path.
    pub fn write_config(&self) -> PathBuf {
        let path = self.temp_dir.path().join("client_export.toml");
        let contents = format!(
            "[database]\npath = {:?}\n\n[paths]\nserver = {:?}\n",
            self.db_path.display().to_string(),
            self.server_path().display().to_string(),
        );
        std::fs::write(&path, contents).expect("write fixture config");
        path
    }

    pub fn read_export(&self, file_name: &str) -> String {
        std::fs::read_to_string(self.export_dir().join(file_name)).expect("read export file")
    }
}
