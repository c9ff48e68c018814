use proptest::prelude::*;
use rusqlite::{Connection, params};
use tempfile::tempdir;

use client_export::export::spells;
use client_export::export::writer::{FlatFileWriter, write_query};
use client_export::rules::RuleSnapshot;
use client_export::test_utils::fixtures::spells_db;

fn export_spells(conn: &Connection, implied_targeting: bool) -> String {
    let dir = tempdir().unwrap();
    let path = dir.path().join("spells_us.txt");
    let rules = RuleSnapshot {
        implied_targeting,
        ..RuleSnapshot::default()
    };
    spells::export(conn, &rules, &path).unwrap();
    std::fs::read_to_string(&path).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_nulls_never_shift_columns(
        rows in prop::collection::vec(
            (
                prop::option::of("[a-zA-Z0-9 ]{0,8}"),
                prop::option::of(-1000i64..1000),
                prop::option::of("[a-z]{1,4}"),
            ),
            0..20,
        )
    ) {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE sample (id INTEGER PRIMARY KEY, a TEXT, b INTEGER, c TEXT);").unwrap();
        for (id, (a, b, c)) in rows.iter().enumerate() {
            conn.execute(
                "INSERT INTO sample (id, a, b, c) VALUES (?1, ?2, ?3, ?4)",
                params![i64::try_from(id).unwrap(), a, b, c],
            ).unwrap();
        }

        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut out = FlatFileWriter::create(&path).unwrap();
        write_query(&conn, "SELECT * FROM sample ORDER BY id", &mut out).unwrap();
        prop_assert_eq!(out.finish().unwrap(), rows.len());

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        prop_assert_eq!(lines.len(), rows.len());
        for (line, (a, b, c)) in lines.iter().zip(&rows) {
            let fields: Vec<&str> = line.split('^').collect();
            prop_assert_eq!(fields.len(), 4);
            prop_assert_eq!(fields[1], a.as_deref().unwrap_or(""));
            prop_assert_eq!(fields[2], b.map(|b| b.to_string()).unwrap_or_default());
            prop_assert_eq!(fields[3], c.as_deref().unwrap_or(""));
        }
    }

    #[test]
    fn test_implied_targeting_leaves_other_rows_identical(
        target_types in prop::collection::vec(
            prop::option::of((0i64..60).prop_filter("sentinel", |value| *value != 14 && *value != 38)),
            0..15,
        )
    ) {
        let rows: Vec<_> = target_types
            .iter()
            .enumerate()
            .map(|(id, target)| (i64::try_from(id).unwrap() + 1, Some("Spell"), *target, Some(14)))
            .collect();
        let conn = spells_db(&rows);
        prop_assert_eq!(export_spells(&conn, true), export_spells(&conn, false));
    }

    #[test]
    fn test_implied_targeting_only_touches_target_field(
        target_types in prop::collection::vec(prop::sample::select(vec![5i64, 6, 14, 38]), 1..15)
    ) {
        let rows: Vec<_> = target_types
            .iter()
            .enumerate()
            .map(|(id, target)| (i64::try_from(id).unwrap() + 1, Some("Spell"), Some(*target), Some(38)))
            .collect();
        let conn = spells_db(&rows);
        let on = export_spells(&conn, true);
        let off = export_spells(&conn, false);

        prop_assert_eq!(on.lines().count(), off.lines().count());
        for ((on_line, off_line), target) in on.lines().zip(off.lines()).zip(&target_types) {
            let on_fields: Vec<&str> = on_line.split('^').collect();
            let off_fields: Vec<&str> = off_line.split('^').collect();
            prop_assert_eq!(on_fields.len(), off_fields.len());
            let expected = if *target == 14 || *target == 38 { "6".to_string() } else { target.to_string() };
            prop_assert_eq!(on_fields[2], expected.as_str());
            prop_assert_eq!(off_fields[2], target.to_string());
            prop_assert_eq!(&on_fields[..2], &off_fields[..2]);
            prop_assert_eq!(on_fields[3], off_fields[3]);
        }
    }
}
