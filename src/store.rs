use crate::{Category, Config, CrawlerError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// File-backed persistence, one output file per category:
///
/// - `obj/categories.json` — category name to category url
/// - `obj/cats/<category>.txt` — newline-delimited article urls
/// - `data/<category>.json` — json array of extracted records
pub struct Store {
    obj_dir: PathBuf,
    cats_dir: PathBuf,
    data_dir: PathBuf,
}

impl Store {
    pub async fn new(config: &Config) -> Result<Store, CrawlerError> {
        let store = Store {
            obj_dir: config.obj_dir.clone(),
            cats_dir: config.cats_dir(),
            data_dir: config.data_dir.clone(),
        };
        for dir in [&store.obj_dir, &store.cats_dir, &store.data_dir] {
            fs::create_dir_all(dir).await?;
            debug!("Using directory {}", dir.display());
        }
        Ok(store)
    }

    pub async fn write_categories(&self, categories: &[Category]) -> Result<(), CrawlerError> {
        let map: BTreeMap<&str, &str> = categories
            .iter()
            .map(|c| (c.name.as_str(), c.url.as_str()))
            .collect();
        let json = serde_json::to_string_pretty(&map)?;
        fs::write(self.obj_dir.join("categories.json"), json).await?;
        Ok(())
    }

    pub async fn read_categories(&self) -> Result<Vec<Category>, CrawlerError> {
        let raw = fs::read_to_string(self.obj_dir.join("categories.json")).await?;
        let map: BTreeMap<String, String> = serde_json::from_str(&raw)?;
        Ok(map
            .into_iter()
            .map(|(name, url)| Category { name, url })
            .collect())
    }

    pub async fn write_links(
        &self,
        category: &Category,
        links: &[String],
    ) -> Result<(), CrawlerError> {
        let mut out = String::new();
        for link in links {
            out.push_str(link);
            out.push('\n');
        }
        fs::write(self.links_path(category), out).await?;
        Ok(())
    }

    pub async fn read_links(&self, category: &Category) -> Result<Vec<String>, CrawlerError> {
        let raw = fs::read_to_string(self.links_path(category)).await?;
        Ok(raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToString::to_string)
            .collect())
    }

    /// Persist the full accumulated record list for a category. Called after
    /// every appended record, so the file on disk always holds the complete
    /// array extracted so far.
    pub async fn write_records<R: Serialize>(
        &self,
        category: &Category,
        records: &[R],
    ) -> Result<(), CrawlerError> {
        let json = serde_json::to_string_pretty(records)?;
        fs::write(self.records_path(category), json).await?;
        Ok(())
    }

    pub async fn read_records<R: DeserializeOwned>(
        &self,
        category: &Category,
    ) -> Result<Vec<R>, CrawlerError> {
        let raw = fs::read_to_string(self.records_path(category)).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn links_path(&self, category: &Category) -> PathBuf {
        self.cats_dir.join(format!("{}.txt", category.file_stem()))
    }

    fn records_path(&self, category: &Category) -> PathBuf {
        self.data_dir.join(format!("{}.json", category.file_stem()))
    }
}
