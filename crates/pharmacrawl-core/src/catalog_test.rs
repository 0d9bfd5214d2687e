use std::io::Write;

use super::*;

const MINIMAL: &str = r#"
origins:
  legacy: https://www.aversi.ge
  current: https://shop.aversi.ge
"#;

fn catalog_from(yaml: &str) -> CatalogFile {
    serde_yaml::from_str(yaml).expect("valid catalog yaml")
}

fn listing(url: &str, start_page: u32, end_page: u32, page_size: u32) -> ListingDescriptor {
    ListingDescriptor {
        url: url.to_string(),
        start_page,
        end_page,
        page_size,
        site: SiteVariant::Current,
        category: None,
    }
}

#[test]
fn minimal_catalog_has_empty_work_lists() {
    let catalog = catalog_from(MINIMAL);
    assert!(catalog.direct_lookups.is_empty());
    assert!(catalog.listings.is_empty());
    assert!(catalog.discovery.is_none());
    validate_catalog(&catalog).unwrap();
}

#[test]
fn listing_defaults_to_first_page_on_current_site() {
    let catalog = catalog_from(
        r#"
origins:
  legacy: https://www.aversi.ge
  current: https://shop.aversi.ge
listings:
  - url: https://shop.aversi.ge/ka/medication/-/
    end_page: 12
    page_size: 192
"#,
    );
    let descriptor = &catalog.listings[0];
    assert_eq!(descriptor.start_page, 1);
    assert_eq!(descriptor.site, SiteVariant::Current);
    assert_eq!(
        descriptor.category_label(),
        "https://shop.aversi.ge/ka/medication/-/"
    );
}

#[test]
fn category_label_prefers_explicit_name() {
    let mut descriptor = listing("https://shop.aversi.ge/ka/care-products/oral-care/", 1, 2, 24);
    descriptor.category = Some("oral-care".to_string());
    assert_eq!(descriptor.category_label(), "oral-care");
}

#[test]
fn validate_rejects_duplicate_lookup_identifiers() {
    let mut catalog = catalog_from(MINIMAL);
    catalog.direct_lookups.legacy = vec![999, 469, 999];
    let err = validate_catalog(&catalog).unwrap_err();
    assert!(err.to_string().contains("duplicate legacy direct lookup identifier 999"));
}

#[test]
fn validate_allows_same_identifier_on_both_sites() {
    let mut catalog = catalog_from(MINIMAL);
    catalog.direct_lookups.legacy = vec![840];
    catalog.direct_lookups.current = vec![840];
    validate_catalog(&catalog).unwrap();
}

#[test]
fn validate_rejects_inverted_page_range() {
    let mut catalog = catalog_from(MINIMAL);
    catalog.listings = vec![listing("https://shop.aversi.ge/ka/medication/", 5, 2, 192)];
    let err = validate_catalog(&catalog).unwrap_err();
    assert!(err.to_string().contains("start_page 5 is after end_page 2"));
}

#[test]
fn validate_rejects_zero_page_size() {
    let mut catalog = catalog_from(MINIMAL);
    catalog.listings = vec![listing("https://shop.aversi.ge/ka/medication/", 1, 2, 0)];
    let err = validate_catalog(&catalog).unwrap_err();
    assert!(err.to_string().contains("page_size must be positive"));
}

#[test]
fn validate_rejects_relative_listing_url() {
    let mut catalog = catalog_from(MINIMAL);
    catalog.listings = vec![listing("/ka/medication/", 1, 2, 192)];
    let err = validate_catalog(&catalog).unwrap_err();
    assert!(err.to_string().contains("not an absolute URL"));
}

#[test]
fn validate_rejects_bad_discovery_pattern() {
    let mut catalog = catalog_from(MINIMAL);
    catalog.discovery = Some(DiscoveryConfig {
        enabled: true,
        index_url: "https://shop.aversi.ge/ka/".to_string(),
        link_selector: ".ty-menu__submenu-link".to_string(),
        path_pattern: "^/ka/(medication".to_string(),
        deny: vec![],
        start_page: 1,
        end_page: 50,
        page_size: 192,
    });
    let err = validate_catalog(&catalog).unwrap_err();
    assert!(err.to_string().contains("not a valid regex"));
}

#[test]
fn load_catalog_reads_and_validates_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
origins:
  legacy: https://www.aversi.ge
  current: https://shop.aversi.ge
direct_lookups:
  legacy: [90414, 36365]
  current: [840]
discovery:
  index_url: https://shop.aversi.ge/ka/
  link_selector: ".ty-menu__submenu-item .ty-menu__submenu-link"
  path_pattern: "^/ka/medication/"
  end_page: 50
  page_size: 192
"#
    )
    .unwrap();

    let catalog = load_catalog(file.path()).unwrap();
    assert_eq!(catalog.direct_lookups.len(), 3);
    let discovery = catalog.discovery.unwrap();
    assert!(discovery.enabled);
    assert_eq!(discovery.start_page, 1);
}

#[test]
fn load_catalog_missing_file_is_io_error() {
    let err = load_catalog(Path::new("/nonexistent/catalog.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::CatalogFileIo { .. }));
}
