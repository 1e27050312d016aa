//! Catalog site variant: categories from the section list, paginated
//! listing pages that carry the item records themselves, so no second
//! fetch round is needed per item.

use crate::utils::{prev_element, text_of};
use crate::{CrawlerError, Listing, Site};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

const E: &str = "Invalid selector";
lazy_static! {
    static ref SECTION: Selector =
        Selector::parse(".catalog-section-list-item-wrapper").expect(E);
    static ref SECTION_NAME: Selector =
        Selector::parse(".catalog-section-list-item-name").expect(E);
    static ref A: Selector = Selector::parse("a").expect(E);
    static ref NEXT_PAGE: Selector = Selector::parse(".system-pagenavigation-item-next").expect(E);
    static ref ITEM: Selector = Selector::parse(".catalog-section-item-wrapper").expect(E);
    static ref IMG: Selector = Selector::parse("img").expect(E);
    static ref TITLE: Selector = Selector::parse("div.intec-cl-text-hover").expect(E);
    static ref DESCRIPTION: Selector =
        Selector::parse("div.catalog-section-item-description").expect(E);
    static ref PRICE: Selector = Selector::parse("div.catalog-section-item-price-base").expect(E);
}

/// Placeholder for items without a description block.
const NO_DESCRIPTION: &str = "---";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KenzoItem {
    pub image: String,
    pub title: String,
    pub description: String,
    pub price: String,
}

#[derive(Debug)]
pub struct Kenzo {
    seed: String,
    base: String,
}

impl Kenzo {
    pub fn new(seed: impl Into<String>) -> Kenzo {
        let seed = seed.into();
        let base = seed
            .trim_end_matches('/')
            .trim_end_matches("/catalog")
            .to_string();
        Kenzo { seed, base }
    }

    fn item_record(&self, item: ElementRef) -> Result<KenzoItem, CrawlerError> {
        let img = item
            .select(&IMG)
            .next()
            .ok_or(CrawlerError::MissingElement("item image"))?;
        let src = img
            .value()
            .attr("src")
            .ok_or(CrawlerError::MissingElement("item image src"))?;
        let title = item
            .select(&TITLE)
            .next()
            .ok_or(CrawlerError::MissingElement("item title"))?;
        let price = item
            .select(&PRICE)
            .next()
            .ok_or(CrawlerError::MissingElement("item price"))?;
        let description = item
            .select(&DESCRIPTION)
            .next()
            .map(|el| text_of(el).trim().to_string())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());

        Ok(KenzoItem {
            image: format!("{}{}", self.base, src),
            title: text_of(title).trim().to_string(),
            description,
            price: text_of(price).replace('₽', "").trim().to_string(),
        })
    }
}

impl Default for Kenzo {
    fn default() -> Self {
        Kenzo::new("https://kenzo29.ru/catalog")
    }
}

impl Site for Kenzo {
    type Record = KenzoItem;

    fn seed_url(&self) -> &str {
        &self.seed
    }

    fn categories(&self, doc: &Html) -> Result<Vec<(String, String)>, CrawlerError> {
        let mut out = Vec::new();
        for wrapper in doc.select(&SECTION) {
            let name = wrapper
                .select(&SECTION_NAME)
                .next()
                .ok_or(CrawlerError::MissingElement("section name"))?;
            let a = wrapper
                .select(&A)
                .next()
                .ok_or(CrawlerError::MissingElement("section link"))?;
            let href = a
                .value()
                .attr("href")
                .ok_or(CrawlerError::MissingElement("section href"))?;
            let url = format!("{}{}", self.seed, href.replacen("/catalog", "", 1));
            out.push((text_of(name).trim().to_string(), url));
        }
        Ok(out)
    }

    fn page_count(&self, doc: &Html) -> Result<Option<u32>, CrawlerError> {
        let Some(next) = doc.select(&NEXT_PAGE).next() else {
            return Ok(None);
        };
        let prev = prev_element(next).ok_or_else(|| CrawlerError::PageCount(String::new()))?;
        let text = text_of(prev).trim().to_string();
        let count = text
            .parse::<u32>()
            .map_err(|_| CrawlerError::PageCount(text))?;
        Ok(Some(count))
    }

    fn page_url(&self, category_url: &str, page: u32) -> String {
        format!("{category_url}?PAGEN_1={page}")
    }

    fn listing(&self, doc: &Html) -> Result<Listing<KenzoItem>, CrawlerError> {
        let mut records = Vec::new();
        for item in doc.select(&ITEM) {
            records.push(self.item_record(item)?);
        }
        Ok(Listing::Records(records))
    }

    fn article(&self, doc: &Html) -> Result<KenzoItem, CrawlerError> {
        let item = doc
            .select(&ITEM)
            .next()
            .ok_or(CrawlerError::MissingElement("catalog item"))?;
        self.item_record(item)
    }
}
