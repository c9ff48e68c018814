use client_export::app::ExportContext;
use client_export::config::Config;
use client_export::export::{ExportDriver, ExportKind};
use client_export::test_utils::fixtures::{
    ExportFixture, SEEDED_BASE_DATA, SEEDED_SKILL_CAPS_LEGACY, SEEDED_SKILL_CAPS_MULTICLASS,
    SEEDED_SPELLS_IMPLIED,
};

fn config_for(primary: &ExportFixture, content: Option<&ExportFixture>) -> Config {
    let mut config = Config::default();
    config.database.path = primary.db_path().to_path_buf();
    config.database.content_path = content.map(|fixture| fixture.db_path().to_path_buf());
    config.paths.server = primary.server_path().to_path_buf();
    config
}

#[test]
fn test_content_tables_come_from_content_database() {
    let primary = ExportFixture::new();
    primary.insert_rule("Character:MaxLevel", "3");
    primary.insert_rule("Spells:UseSpellImpliedTargeting", "true");
    primary.execute("INSERT INTO db_str (id, type, value) VALUES (7, 1, 'Primary Only')");
    let content = ExportFixture::seeded();

    let ctx = ExportContext::connect(config_for(&primary, Some(&content))).unwrap();
    let driver = ExportDriver::from_context(&ctx);
    let reports = driver.run_all(&ExportKind::ALL);
    assert!(reports.iter().all(|report| report.is_ok()), "{reports:?}");

    assert_eq!(primary.read_export("spells_us.txt"), SEEDED_SPELLS_IMPLIED);
    assert_eq!(primary.read_export("SkillCaps.txt"), SEEDED_SKILL_CAPS_LEGACY);
    assert_eq!(primary.read_export("BaseData.txt"), SEEDED_BASE_DATA);
    assert_eq!(
        primary.read_export("dbstr_us.txt"),
        "Major^Minor^String(New)\n7^1^Primary Only\n"
    );
}

#[test]
fn test_rules_are_read_from_primary_database() {
    let primary = ExportFixture::new();
    primary.insert_rule("Character:MaxLevel", "3");
    primary.insert_rule("Custom:MulticlassingEnabled", "true");
    let content = ExportFixture::seeded();
    // content-side rule rows must not be consulted
    content.set_rule("Custom:MulticlassingEnabled", "false");

    let ctx = ExportContext::connect(config_for(&primary, Some(&content))).unwrap();
    let driver = ExportDriver::from_context(&ctx);
    assert!(driver.rules().multiclassing);
    assert!(driver.run(ExportKind::Skills).is_ok());
    assert_eq!(
        primary.read_export("SkillCaps.txt"),
        SEEDED_SKILL_CAPS_MULTICLASS
    );
}

#[test]
fn test_ruleset_id_selects_rule_rows() {
    let fixture = ExportFixture::seeded();
    fixture.execute(
        "INSERT INTO rule_values (ruleset_id, rule_name, rule_value)
         VALUES (2, 'Custom:MulticlassingEnabled', 'true'),
                (2, 'Character:MaxLevel', '2')",
    );

    let mut config = config_for(&fixture, None);
    config.rules.ruleset_id = Some(2);
    let ctx = ExportContext::connect(config).unwrap();
    let rules = ExportDriver::from_context(&ctx).rules();
    assert!(rules.multiclassing);
    assert_eq!(rules.skill_cap_max_level, 2);
    assert!(!rules.implied_targeting);
}

#[test]
fn test_skill_cap_max_level_overrides_max_level() {
    let fixture = ExportFixture::seeded();
    fixture.insert_rule("Character:SkillCapMaxLevel", "1");

    let ctx = ExportContext::connect(config_for(&fixture, None)).unwrap();
    let driver = ExportDriver::from_context(&ctx);
    assert!(driver.run(ExportKind::Skills).is_ok());
    assert_eq!(
        fixture.read_export("SkillCaps.txt"),
        "1^0^1^5^0\n1^11^1^1^0\n2^0^1^8^0\n"
    );
}
