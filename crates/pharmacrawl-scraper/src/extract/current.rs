use std::sync::LazyLock;

use pharmacrawl_core::SiteVariant;
use scraper::{ElementRef, Html, Selector};

use super::{lookup_code, page_label, select_text, Extractor};
use crate::types::{RawRecord, Target};

static TILE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".col-tile").expect("valid tile selector"));
static TILE_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".product-title").expect("valid tile title selector"));
static TILE_PRICE_OLD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".ty-list-price:last-child").expect("valid tile old price selector")
});
static TILE_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".ty-price-num").expect("valid tile price selector"));
static TILE_CODE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[name$="[product_code]"]"#).expect("valid product code selector")
});

static BLOCK_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".ty-product-block-title").expect("valid block title selector")
});
static BLOCK_TITLE_TEXT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".ty-product-block-title > bdi").expect("valid block title text selector")
});
static PRODUCT_ID: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-ca-product-id]").expect("valid product id selector"));

/// Storefront markup: tiled category listings and single product blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentExtractor;

impl Extractor for CurrentExtractor {
    fn extract(&self, html: &Html, target: &Target) -> Vec<RawRecord> {
        match target {
            Target::ListingPage { .. } => extract_tiles(html, target),
            Target::DirectLookup { .. } => extract_product_block(html, target),
        }
    }
}

fn extract_tiles(html: &Html, target: &Target) -> Vec<RawRecord> {
    let page_number = page_label(target);
    let records: Vec<RawRecord> = html
        .select(&TILE)
        .filter_map(|tile| {
            let title = select_text(tile, &TILE_TITLE);
            if title.trim().is_empty() {
                return None;
            }
            Some(RawRecord {
                title,
                price_text: select_text(tile, &TILE_PRICE),
                price_old_text: select_text(tile, &TILE_PRICE_OLD),
                product_code: tile_code(tile),
                category: target.category().to_string(),
                page_number: page_number.clone(),
                source_site: SiteVariant::Current,
            })
        })
        .collect();

    tracing::debug!(target = %target, records = records.len(), "extracted listing tiles");
    records
}

fn tile_code(tile: ElementRef<'_>) -> String {
    tile.select(&TILE_CODE)
        .next()
        .and_then(|input| input.value().attr("value"))
        .unwrap_or_default()
        .to_string()
}

fn extract_product_block(html: &Html, target: &Target) -> Vec<RawRecord> {
    if html.select(&BLOCK_TITLE).next().is_none() {
        tracing::debug!(target = %target, "no .ty-product-block-title in product document");
        return Vec::new();
    }

    let root = html.root_element();
    let title = select_text(root, &BLOCK_TITLE_TEXT);
    if title.trim().is_empty() {
        return Vec::new();
    }

    let product_id = html
        .select(&PRODUCT_ID)
        .next()
        .and_then(|el| el.value().attr("data-ca-product-id"))
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()));

    let (price_text, price_old_text) = match product_id {
        Some(id) => (
            id_suffixed_text(root, "sec_discounted_price_", id),
            id_suffixed_text(root, "sec_list_price_", id),
        ),
        None => {
            tracing::debug!(target = %target, "product block has no numeric data-ca-product-id");
            (String::new(), String::new())
        }
    };

    vec![RawRecord {
        title,
        price_text,
        price_old_text,
        product_code: lookup_code(target),
        category: target.category().to_string(),
        page_number: page_label(target),
        source_site: SiteVariant::Current,
    }]
}

fn id_suffixed_text(root: ElementRef<'_>, prefix: &str, id: &str) -> String {
    match Selector::parse(&format!("#{prefix}{id}")) {
        Ok(selector) => select_text(root, &selector),
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_html;

    fn listing() -> Target {
        Target::ListingPage {
            base_url: "https://shop.aversi.ge/ka/medication/-/".to_string(),
            page_number: 2,
            page_size: 192,
            site: SiteVariant::Current,
            last_page: 12,
            category: "https://shop.aversi.ge/ka/medication/-/".to_string(),
        }
    }

    fn lookup() -> Target {
        Target::DirectLookup {
            identifier: 840,
            site: SiteVariant::Current,
        }
    }

    #[test]
    fn tiles_without_titles_are_dropped() {
        let html = r#"
            <div class="col-tile">
              <a class="product-title">Aspirin 500mg</a>
              <span class="ty-price-num">5,50</span>
              <input type="hidden" name="product_data[1][product_code]" value="A100">
            </div>
            <div class="col-tile"><a class="product-title"></a></div>"#;
        let records = extract_html(html, &listing());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product_code, "A100");
        assert_eq!(records[0].page_number, "2");
        assert_eq!(records[0].category, "https://shop.aversi.ge/ka/medication/-/");
    }

    #[test]
    fn tile_old_price_uses_last_child_list_price() {
        let html = r#"
            <div class="col-tile">
              <a class="product-title">Nurofen</a>
              <span class="ty-strike"><span class="ty-list-price">12,40</span></span>
              <span class="ty-price-num">9,90</span>
            </div>"#;
        let records = extract_html(html, &listing());
        assert_eq!(records[0].price_old_text, "12,40");
        assert_eq!(records[0].price_text, "9,90");
        assert_eq!(records[0].product_code, "");
    }

    #[test]
    fn product_block_prices_use_id_suffixed_nodes() {
        let html = r#"
            <div class="ty-product-block" data-ca-product-id="5521">
              <h1 class="ty-product-block-title"><bdi>Vitamin C 1000mg</bdi></h1>
              <span id="sec_list_price_5521">14,00</span>
              <span id="sec_discounted_price_5521">11,20</span>
            </div>"#;
        let records = extract_html(html, &lookup());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Vitamin C 1000mg");
        assert_eq!(records[0].price_text, "11,20");
        assert_eq!(records[0].price_old_text, "14,00");
        assert_eq!(records[0].product_code, "840");
        assert_eq!(records[0].page_number, "");
    }

    #[test]
    fn product_block_without_title_node_yields_nothing() {
        let html = r#"<div data-ca-product-id="5521"><h1>Not found</h1></div>"#;
        assert!(extract_html(html, &lookup()).is_empty());
    }

    #[test]
    fn product_block_without_id_keeps_blank_prices() {
        let html = r#"<h1 class="ty-product-block-title"><bdi>Bandage</bdi></h1>"#;
        let records = extract_html(html, &lookup());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price_text, "");
    }
}
