//! News site variant: categories from the sidebar menu, paginated listing
//! pages of article links, one article record per fetched article page.

use crate::utils::{parent_element, prev_element, text_of};
use crate::{CrawlerError, Listing, Site};
use lazy_static::lazy_static;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

const E: &str = "Invalid selector";
lazy_static! {
    static ref CAT_ITEM: Selector = Selector::parse(".cat-item").expect(E);
    static ref A: Selector = Selector::parse("a").expect(E);
    static ref NEXT_PAGE: Selector = Selector::parse(".next.page-numbers").expect(E);
    static ref THUMB: Selector = Selector::parse(".content-thumb").expect(E);
    static ref ARTICLE: Selector = Selector::parse("article").expect(E);
    static ref HEADER: Selector = Selector::parse("header").expect(E);
    static ref DATE: Selector = Selector::parse("span.entry-meta-date").expect(E);
    static ref BODY: Selector = Selector::parse("div.entry-content").expect(E);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrpBuyArticle {
    pub title: String,
    pub date: String,
    pub body: String,
}

#[derive(Debug)]
pub struct XrpBuy {
    seed: String,
}

impl XrpBuy {
    pub fn new(seed: impl Into<String>) -> XrpBuy {
        XrpBuy { seed: seed.into() }
    }
}

impl Default for XrpBuy {
    fn default() -> Self {
        XrpBuy::new("https://xrp-buy.ru/")
    }
}

impl Site for XrpBuy {
    type Record = XrpBuyArticle;

    fn seed_url(&self) -> &str {
        &self.seed
    }

    fn skip_label(&self, label: &str) -> bool {
        label == "Видео"
    }

    fn categories(&self, doc: &Html) -> Result<Vec<(String, String)>, CrawlerError> {
        // The first category entry marks the navigation container; its
        // parent holds one link per category.
        let item = doc
            .select(&CAT_ITEM)
            .next()
            .ok_or(CrawlerError::MissingElement("cat-item"))?;
        let menu = parent_element(item).ok_or(CrawlerError::MissingElement("category menu"))?;

        let mut out = Vec::new();
        for a in menu.select(&A) {
            let Some(href) = a.value().attr("href") else {
                continue;
            };
            out.push((text_of(a), href.to_string()));
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
        format!("{category_url}page/{page}")
    }

    fn listing(&self, doc: &Html) -> Result<Listing<XrpBuyArticle>, CrawlerError> {
        let mut links = Vec::new();
        for item in doc.select(&THUMB) {
            let a = item
                .select(&A)
                .next()
                .ok_or(CrawlerError::MissingElement("content-thumb link"))?;
            let href = a
                .value()
                .attr("href")
                .ok_or(CrawlerError::MissingElement("content-thumb href"))?;
            links.push(href.to_string());
        }
        Ok(Listing::Links(links))
    }

    fn article(&self, doc: &Html) -> Result<XrpBuyArticle, CrawlerError> {
        let article = doc
            .select(&ARTICLE)
            .next()
            .ok_or(CrawlerError::MissingElement("article"))?;
        let header = article
            .select(&HEADER)
            .next()
            .ok_or(CrawlerError::MissingElement("article header"))?;
        let date = article
            .select(&DATE)
            .next()
            .ok_or(CrawlerError::MissingElement("entry-meta-date"))?;
        let body = article
            .select(&BODY)
            .next()
            .ok_or(CrawlerError::MissingElement("entry-content"))?;

        Ok(XrpBuyArticle {
            title: text_of(header).replace('\n', ""),
            date: text_of(date),
            body: text_of(body).replace('\n', ""),
        })
    }
}
