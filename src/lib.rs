use futures::future::join_all;
use scraper::Html;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

pub mod config;
pub mod error;
pub mod fetcher;
pub mod kenzo;
pub mod store;
pub mod translit;
pub mod xrpbuy;

mod utils;

pub use config::Config;
pub use error::CrawlerError;
pub use fetcher::Fetcher;
pub use store::Store;

/// One listing page either links out to article pages or carries the
/// records itself (the catalog variant).
#[derive(Debug)]
pub enum Listing<R> {
    Links(Vec<String>),
    Records(Vec<R>),
}

/// Site-specific markup knowledge. Everything network- and storage-related
/// lives outside; implementations only read parsed documents.
pub trait Site {
    type Record: Serialize + DeserializeOwned;

    fn seed_url(&self) -> &str;

    /// Exact-label entries to leave out of the category map.
    fn skip_label(&self, label: &str) -> bool {
        let _ = label;
        false
    }

    /// Raw `(label, url)` pairs from the seed page's navigation container.
    fn categories(&self, doc: &Html) -> Result<Vec<(String, String)>, CrawlerError>;

    /// Total page count read next to the pagination indicator, `None` when
    /// the category has a single page. An indicator without a parseable
    /// count is an error.
    fn page_count(&self, doc: &Html) -> Result<Option<u32>, CrawlerError>;

    fn page_url(&self, category_url: &str, page: u32) -> String;

    fn listing(&self, doc: &Html) -> Result<Listing<Self::Record>, CrawlerError>;

    fn article(&self, doc: &Html) -> Result<Self::Record, CrawlerError>;
}

/// Normalized category: the name is whitespace-collapsed and
/// transliterated, and uniquely determines the output file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub url: String,
}

impl Category {
    pub fn file_stem(&self) -> String {
        self.name.to_lowercase()
    }
}

/// One failed unit of work (a category or a single article).
#[derive(Debug)]
pub struct Failure {
    pub unit: String,
    pub error: String,
}

impl Failure {
    fn new(unit: impl Into<String>, error: &CrawlerError) -> Failure {
        Failure {
            unit: unit.into(),
            error: error.to_string(),
        }
    }
}

/// End-of-run summary. Failures are collected per unit instead of aborting
/// sibling categories.
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub categories: usize,
    pub links: usize,
    pub records: usize,
    pub failures: Vec<Failure>,
}

/// Build the category map from an already parsed seed page: collapse
/// whitespace in each label, drop skip-listed entries, transliterate.
/// Colliding normalized names resolve last-write-wins.
pub fn categories_from_seed<S: Site>(site: &S, doc: &Html) -> Result<Vec<Category>, CrawlerError> {
    let mut map = BTreeMap::new();
    for (label, url) in site.categories(doc)? {
        let label = translit::collapse_label(&label);
        if site.skip_label(&label) {
            continue;
        }
        map.insert(translit::to_latin(&label), url);
    }
    Ok(map
        .into_iter()
        .map(|(name, url)| Category { name, url })
        .collect())
}

/// Fetch the seed page and persist the discovered category map.
pub async fn discover<S: Site>(
    site: &S,
    fetcher: &Fetcher,
    store: &Store,
) -> Result<Vec<Category>, CrawlerError> {
    let html = fetcher.fetch(site.seed_url()).await?;
    let categories = {
        let doc = Html::parse_document(&html);
        categories_from_seed(site, &doc)?
    };
    store.write_categories(&categories).await?;
    info!("Discovered {} categories", categories.len());
    Ok(categories)
}

/// Run both crawl phases over the given categories.
///
/// Phase one fans out one future per category and walks its pagination,
/// persisting the link list (or, for the catalog variant, the records).
/// Phase two processes each category's persisted links, strictly in order
/// within a category, re-persisting the output after every record. A failed
/// category or article lands in the report; its siblings keep going.
pub async fn crawl<S: Site>(
    site: &S,
    fetcher: &Fetcher,
    store: &Store,
    categories: &[Category],
) -> Result<CrawlReport, CrawlerError> {
    let mut report = CrawlReport {
        categories: categories.len(),
        ..CrawlReport::default()
    };

    info!("Discovering links for {} categories", categories.len());
    let listings = join_all(categories.iter().map(|cat| async move {
        let listing = crawl_category(site, fetcher, cat).await;
        (cat, listing)
    }))
    .await;

    let mut with_links = Vec::new();
    for (cat, listing) in listings {
        match listing {
            Ok(Listing::Links(links)) => {
                info!("{}: {} article links", cat.name, links.len());
                store.write_links(cat, &links).await?;
                report.links += links.len();
                with_links.push(cat);
            }
            Ok(Listing::Records(records)) => {
                info!("{}: {} records", cat.name, records.len());
                store.write_records(cat, &records).await?;
                report.records += records.len();
            }
            Err(e) => {
                warn!("Category {} failed: {}", cat.name, e);
                report.failures.push(Failure::new(cat.name.as_str(), &e));
            }
        }
    }

    let extracted = join_all(with_links.iter().map(|&cat| async move {
        let result = extract_category(site, fetcher, store, cat).await;
        (cat, result)
    }))
    .await;

    for (cat, result) in extracted {
        match result {
            Ok((count, failures)) => {
                report.records += count;
                report.failures.extend(failures);
            }
            Err(e) => {
                warn!("Category {} failed: {}", cat.name, e);
                report.failures.push(Failure::new(cat.name.as_str(), &e));
            }
        }
    }

    Ok(report)
}

/// Walk one category's listing pages and collect its items, page order
/// first, document order within a page. When a pagination indicator is
/// present, every page including the first goes through the page-url
/// convention.
async fn crawl_category<S: Site>(
    site: &S,
    fetcher: &Fetcher,
    category: &Category,
) -> Result<Listing<S::Record>, CrawlerError> {
    let first = fetcher.fetch(&category.url).await?;
    let pages = {
        let doc = Html::parse_document(&first);
        site.page_count(&doc)?
    };

    let Some(pages) = pages else {
        let doc = Html::parse_document(&first);
        return site.listing(&doc);
    };

    let mut links = Vec::new();
    let mut records = Vec::new();
    let mut yields_records = false;
    for page in 1..=pages {
        let html = fetcher.fetch(&site.page_url(&category.url, page)).await?;
        let listing = {
            let doc = Html::parse_document(&html);
            site.listing(&doc)?
        };
        // An empty page still tells us which variant the site yields.
        match listing {
            Listing::Links(l) => links.extend(l),
            Listing::Records(r) => {
                yields_records = true;
                records.extend(r);
            }
        }
    }

    if yields_records {
        Ok(Listing::Records(records))
    } else {
        Ok(Listing::Links(links))
    }
}

/// Read a category's persisted link list and extract its articles one by
/// one. The accumulated output is re-persisted after every record so the
/// file on disk is always complete up to the last success. Per-article
/// failures are collected and do not stop the category.
async fn extract_category<S: Site>(
    site: &S,
    fetcher: &Fetcher,
    store: &Store,
    category: &Category,
) -> Result<(usize, Vec<Failure>), CrawlerError> {
    let links = store.read_links(category).await?;

    let mut records = Vec::new();
    let mut failures = Vec::new();
    for url in links {
        let html = match fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Skipping article {}: {}", url, e);
                failures.push(Failure::new(url.as_str(), &e));
                continue;
            }
        };

        let record = {
            let doc = Html::parse_document(&html);
            site.article(&doc)
        };
        match record {
            Ok(record) => {
                records.push(record);
                store.write_records(category, &records).await?;
                info!("[{}] {} {}", records.len(), category.name, url);
            }
            Err(e) => {
                warn!("Skipping article {}: {}", url, e);
                failures.push(Failure::new(url.as_str(), &e));
            }
        }
    }

    Ok((records.len(), failures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kenzo::Kenzo;
    use crate::xrpbuy::{XrpBuy, XrpBuyArticle};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn seed_with_skip_listed_category_yields_one_entry() {
        let doc = Html::parse_document(
            r#"<ul>
                 <li class="cat-item"><a href="https://xrp-buy.ru/novosti/">Новости</a></li>
                 <li class="cat-item"><a href="https://xrp-buy.ru/video/">Видео</a></li>
               </ul>"#,
        );
        let categories = categories_from_seed(&XrpBuy::default(), &doc).unwrap();
        assert_eq!(
            categories,
            vec![Category {
                name: "Novosti".to_string(),
                url: "https://xrp-buy.ru/novosti/".to_string(),
            }]
        );
    }

    #[test]
    fn colliding_normalized_names_keep_the_last_url() {
        let doc = Html::parse_document(
            r#"<ul>
                 <li class="cat-item"><a href="/first/">Новости</a></li>
                 <li class="cat-item"><a href="/second/">Новости</a></li>
               </ul>"#,
        );
        let categories = categories_from_seed(&XrpBuy::default(), &doc).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].url, "/second/");
    }

    /// Serves a fixed body per request path; unknown paths get 500.
    /// Requested paths are recorded in arrival order.
    async fn stub_site(
        routes: HashMap<String, String>,
    ) -> (String, std::sync::Arc<std::sync::Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let requests = log.clone();

        tokio::spawn(async move {
            loop {
                let (mut sock, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 4096];
                let n = sock.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).into_owned();
                let path = request
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();
                requests.lock().unwrap().push(path.clone());

                let response = match routes.get(&path) {
                    Some(body) => format!(
                        "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    ),
                    None => {
                        "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                            .to_string()
                    }
                };
                let _ = sock.write_all(response.as_bytes()).await;
            }
        });

        (base, log)
    }

    fn listing_page<S: AsRef<str>>(links: &[S]) -> String {
        links
            .iter()
            .map(|l| {
                format!(
                    "<div class=\"content-thumb\"><a href=\"{}\">x</a></div>\n",
                    l.as_ref()
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn paginator_issues_one_fetch_per_page_in_order() {
        let mut routes = HashMap::new();
        routes.insert(
            "/novosti/".to_string(),
            r##"<nav>
                 <a class="page-numbers" href="#">2</a>
                 <a class="next page-numbers" href="#">Next</a>
               </nav>"##
                .to_string(),
        );
        routes.insert(
            "/novosti/page/1".to_string(),
            listing_page(&["https://x/a1", "https://x/a2"]),
        );
        routes.insert(
            "/novosti/page/2".to_string(),
            listing_page(&["https://x/a3"]),
        );
        let (base, log) = stub_site(routes).await;

        let config = Config {
            max_retries: 0,
            retry_delay: Duration::from_millis(10),
            ..Config::default()
        };
        let fetcher = Fetcher::new(&config).unwrap();
        let category = Category {
            name: "Novosti".to_string(),
            url: format!("{base}/novosti/"),
        };

        let listing = crawl_category(&XrpBuy::default(), &fetcher, &category)
            .await
            .unwrap();
        let Listing::Links(links) = listing else {
            panic!("expected links");
        };
        assert_eq!(links, vec!["https://x/a1", "https://x/a2", "https://x/a3"]);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["/novosti/", "/novosti/page/1", "/novosti/page/2"]
        );
    }

    #[tokio::test]
    async fn empty_paginated_catalog_category_stays_a_record_listing() {
        let mut routes = HashMap::new();
        routes.insert(
            "/catalog/picca".to_string(),
            r#"<div>
                 <span>1</span>
                 <span class="system-pagenavigation-item-next">→</span>
               </div>"#
                .to_string(),
        );
        routes.insert("/catalog/picca?PAGEN_1=1".to_string(), "<div></div>".to_string());
        let (base, _) = stub_site(routes).await;

        let config = Config {
            max_retries: 0,
            retry_delay: Duration::from_millis(10),
            ..Config::default()
        };
        let fetcher = Fetcher::new(&config).unwrap();
        let category = Category {
            name: "Picca".to_string(),
            url: format!("{base}/catalog/picca"),
        };

        let listing = crawl_category(&Kenzo::default(), &fetcher, &category)
            .await
            .unwrap();
        let Listing::Records(records) = listing else {
            panic!("expected records");
        };
        assert!(records.is_empty());
    }

    fn article_page(title: &str, date: &str, body: &str) -> String {
        format!(
            r#"<article>
                 <header>{title}</header>
                 <span class="entry-meta-date">{date}</span>
                 <div class="entry-content"><p>{body}</p></div>
               </article>"#
        )
    }

    #[tokio::test]
    async fn full_pipeline_with_failure_isolation() {
        let mut routes = HashMap::new();
        routes.insert(
            "/".to_string(),
            r##"<ul>
                  <li class="cat-item"><a href="/novosti/">Новости</a></li>
                  <li class="cat-item"><a href="/video/">Видео</a></li>
                </ul>"##
                .to_string(),
        );
        routes.insert(
            "/a1".to_string(),
            article_page("First", "01.01.2023", "Body one"),
        );
        routes.insert(
            "/a2".to_string(),
            article_page("Second", "02.01.2023", "Body two"),
        );
        // "/broken" is deliberately absent: always 500.

        // Article urls in the listing must be absolute, so one stub serves
        // the articles and a second one, aware of the first's address,
        // serves the seed and the listing page.
        let (base, _) = stub_site(routes.clone()).await;
        let mut full_routes = routes;
        full_routes.insert(
            "/novosti/".to_string(),
            listing_page(&[
                format!("{base}/a1"),
                format!("{base}/broken"),
                format!("{base}/a2"),
            ]),
        );
        let (seed_base, _) = stub_site(full_routes).await;

        let root = std::env::temp_dir().join("category-crawler-pipeline");
        let _ = tokio::fs::remove_dir_all(&root).await;
        let config = Config {
            max_retries: 1,
            retry_delay: Duration::from_millis(10),
            obj_dir: root.join("obj"),
            data_dir: root.join("data"),
            ..Config::default()
        };

        let site = XrpBuy::new(format!("{seed_base}/"));
        let fetcher = Fetcher::new(&config).unwrap();
        let store = Store::new(&config).await.unwrap();

        // The seed's category link is relative; point the discovered
        // category at the stub that serves the listing.
        let mut categories = discover(&site, &fetcher, &store).await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Novosti");
        categories[0].url = format!("{seed_base}/novosti/");

        let report = crawl(&site, &fetcher, &store, &categories).await.unwrap();

        assert_eq!(report.categories, 1);
        assert_eq!(report.links, 3);
        assert_eq!(report.records, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].unit.ends_with("/broken"));

        let links = store.read_links(&categories[0]).await.unwrap();
        assert_eq!(links.len(), 3);

        let records: Vec<XrpBuyArticle> = store.read_records(&categories[0]).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "First");
        assert_eq!(records[1].title, "Second");
    }
}
