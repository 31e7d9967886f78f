use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["poigrid", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["poigrid", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["poigrid"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn crawl_defaults_to_live_run_with_configured_budget() {
    let cli = Cli::try_parse_from(["poigrid", "crawl"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Crawl {
            dry_run: false,
            budget: None
        })
    ));
}

#[test]
fn crawl_dry_run_with_budget_override() {
    let cli = Cli::try_parse_from(["poigrid", "crawl", "--dry-run", "--budget", "50"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Crawl {
            dry_run: true,
            budget: Some(50)
        })
    ));
}

#[test]
fn crawl_rejects_non_numeric_budget() {
    let result = Cli::try_parse_from(["poigrid", "crawl", "--budget", "lots"]);
    assert!(result.is_err());
}

#[test]
fn grid_accepts_explicit_profile_and_page_cap() {
    let cli = Cli::try_parse_from([
        "poigrid",
        "grid",
        "--profile",
        "/tmp/other.yaml",
        "--max-pages",
        "2",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Grid { ref profile, max_pages: 2 })
            if profile == &PathBuf::from("/tmp/other.yaml")
    ));
}

#[test]
fn print_grid_accepts_shipped_profile() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/crawl.yaml");
    let profile = poigrid_core::load_crawl_profile(&path).expect("shipped profile must load");
    crawl::print_grid(&profile, 3, false).expect("shipped profile must produce a grid");
}

#[test]
fn crawl_dry_run_reads_only_the_profile() {
    let plan = poigrid_core::PlanConfig {
        log_level: "info".to_string(),
        crawl_path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/crawl.yaml"),
        max_pages_per_tile: 3,
    };
    crawl::dry_run(&plan).expect("dry run needs no credentials or database");
}

#[test]
fn parses_load_command_with_default_keyword() {
    let cli = Cli::try_parse_from([
        "poigrid",
        "load",
        "exports/poi.json",
        "--location",
        "Rotterdam, Netherlands",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Load { ref file, ref location, ref keyword })
            if file == &PathBuf::from("exports/poi.json")
                && location == "Rotterdam, Netherlands"
                && keyword == "unknown"
    ));
}

#[test]
fn load_requires_a_location() {
    assert!(Cli::try_parse_from(["poigrid", "load", "poi.json"]).is_err());
}

#[test]
fn read_export_converts_file_records() {
    let path = std::env::temp_dir().join(format!("poigrid-export-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"[
            {"place_id": "ChIJ-1", "name": "Bakkerij", "lat": "51.92", "lng": 4.47,
             "types": "bakery, food", "search_keyword": "bakery",
             "fetched_at": "2025-11-07 19:32:48.907788 UTC"},
            {"name": "no id"}
        ]"#,
    )
    .unwrap();

    let batch = load::read_export(&path, "Rotterdam, Netherlands", "unknown").unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(batch.rows.len(), 1);
    assert_eq!(batch.rows[0].keyword, "bakery");
    assert_eq!(batch.rows[0].categories, vec!["bakery", "food"]);
    assert_eq!(batch.skipped.len(), 1);
}

#[test]
fn read_export_reports_missing_file() {
    let err = load::read_export(
        std::path::Path::new("/nonexistent/poigrid/export.json"),
        "Rotterdam, Netherlands",
        "unknown",
    )
    .unwrap_err();
    assert!(err.to_string().contains("failed to read"));
}
