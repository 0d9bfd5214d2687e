use super::*;

#[test]
fn parses_crawl_with_output_dir() {
    let cli = Cli::try_parse_from(["pharmacrawl", "crawl", "--output", "/tmp/out"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Crawl { output: Some(ref p) } if p == &PathBuf::from("/tmp/out")
    ));
}

#[test]
fn parses_targets_json_flag() {
    let cli = Cli::try_parse_from(["pharmacrawl", "targets", "--json"]).expect("valid args");
    assert!(matches!(cli.command, Commands::Targets { json: true }));
}

#[test]
fn global_catalog_flag_follows_subcommand() {
    let cli = Cli::try_parse_from(["pharmacrawl", "targets", "--catalog", "alt.yaml"])
        .expect("valid args");
    assert_eq!(cli.catalog, Some(PathBuf::from("alt.yaml")));
}

#[test]
fn extract_defaults_to_current_lookup() {
    let cli = Cli::try_parse_from(["pharmacrawl", "extract", "saved.html"]).expect("valid args");
    assert!(matches!(
        cli.command,
        Commands::Extract {
            site: SiteVariant::Current,
            listing: None,
            page: 1,
            id: 0,
            ..
        }
    ));
}

#[test]
fn extract_accepts_legacy_site() {
    let cli = Cli::try_parse_from(["pharmacrawl", "extract", "failed_legacy_999.html", "--site", "legacy", "--id", "999"])
        .expect("valid args");
    assert!(matches!(
        cli.command,
        Commands::Extract {
            site: SiteVariant::Legacy,
            id: 999,
            ..
        }
    ));
}

#[test]
fn missing_command_is_an_error() {
    assert!(Cli::try_parse_from(["pharmacrawl"]).is_err());
}

#[test]
fn listing_flag_builds_listing_target() {
    let target = inspect::inspection_target(
        SiteVariant::Current,
        Some("https://shop.aversi.ge/ka/medication/-/".to_string()),
        3,
        0,
    );
    assert_eq!(target.page_number(), Some(3));
    assert_eq!(target.category(), "https://shop.aversi.ge/ka/medication/-/");
}

#[test]
fn extract_records_reads_saved_product_page() {
    let html = include_str!("../../pharmacrawl-scraper/tests/fixtures/current_product.html");
    let target = inspect::inspection_target(SiteVariant::Current, None, 1, 5521);
    let records = inspect::extract_records(html, &target);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Vitamin C 1000mg");
    assert_eq!(records[0].price, "11.20");
}
