//! User-agent rotation and the realistic header set sent with every plain request

use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, DNT, REFERER,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};

pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const ACCEPT_LANGUAGE_FR: &str = "fr-FR,fr;q=0.9,en-US;q=0.8,en;q=0.7";

/// Browser-client hint headers sent alongside the user agent
const STATIC_HEADERS: &[(&str, &str)] = &[
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-ch-ua", "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\""),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
];

/// Cycles through a pool of user-agent strings. The starting point is random so that
/// consecutive runs do not open with the same client fingerprint.
#[derive(Debug, Clone)]
pub struct UserAgentRotation {
    agents: Vec<String>,
    current: usize,
}

impl UserAgentRotation {
    pub fn new(agents: Vec<String>) -> Self {
        let current = if agents.is_empty() {
            0
        } else {
            rand::thread_rng().gen_range(0..agents.len())
        };
        Self { agents, current }
    }

    /// Rotation over a fixed pool starting at `current`
    pub fn starting_at(agents: Vec<String>, current: usize) -> Self {
        let current = if agents.is_empty() { 0 } else { current % agents.len() };
        Self { agents, current }
    }

    pub fn current(&self) -> &str {
        self.agents
            .get(self.current)
            .map_or(DEFAULT_USER_AGENTS[0], String::as_str)
    }

    /// Advance to the next user agent and return it
    pub fn rotate(&mut self) -> &str {
        if !self.agents.is_empty() {
            self.current = (self.current + 1) % self.agents.len();
        }
        self.current()
    }

    /// Full header set for the current user agent. `referer` is added for requests that
    /// follow a page of the same site.
    pub fn headers(&self, referer: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        insert(&mut headers, USER_AGENT, self.current());
        insert(&mut headers, ACCEPT, ACCEPT_HTML);
        insert(&mut headers, ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_FR);
        insert(&mut headers, DNT, "1");
        insert(&mut headers, UPGRADE_INSECURE_REQUESTS, "1");
        insert(&mut headers, CACHE_CONTROL, "max-age=0");
        for (name, value) in STATIC_HEADERS {
            insert(&mut headers, HeaderName::from_static(*name), value);
        }
        if let Some(referer) = referer {
            insert(&mut headers, REFERER, referer);
        }
        headers
    }
}

impl Default for UserAgentRotation {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENTS.iter().map(ToString::to_string).collect())
    }
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    // Values come from fixed tables or a parsed URL; anything unrepresentable is skipped
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
