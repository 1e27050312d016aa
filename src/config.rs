use std::path::PathBuf;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36";

/// Run parameters, passed explicitly into every component so tests can
/// point the crawler at local endpoints and shorten the retry delay.
#[derive(Debug, Clone)]
pub struct Config {
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub max_in_flight: usize,
    pub obj_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            user_agent: USER_AGENT.to_string(),
            max_retries: 5,
            retry_delay: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            max_in_flight: 10,
            obj_dir: PathBuf::from("obj"),
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Config {
    /// Directory holding the per-category link lists.
    pub fn cats_dir(&self) -> PathBuf {
        self.obj_dir.join("cats")
    }
}
