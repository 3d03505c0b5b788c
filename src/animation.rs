#![cfg(feature = "web")]

use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

/// Fetches Lottie animation JSON. Failures are swallowed: a page whose
/// animation cannot be loaded is simply rendered without one.
pub struct AnimationLoader {
    http: Option<reqwest::Client>,
    cache: RwLock<HashMap<String, Value>>,
}

impl AnimationLoader {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .ok();
        AnimationLoader {
            http,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Loader that never fetches anything.
    pub fn disabled() -> Self {
        AnimationLoader {
            http: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Successful fetches are cached for the life of the process; failures
    /// are retried on the next render.
    pub async fn load(&self, url: &str) -> Option<Value> {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned();
        if cached.is_some() {
            return cached;
        }

        let http = self.http.as_ref()?;
        let response = match http.get(url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!("animation {} returned {}", url, r.status());
                return None;
            }
            Err(e) => {
                debug!("animation {} failed: {}", url, e);
                return None;
            }
        };
        let json: Value = match response.json().await {
            Ok(json) => json,
            Err(e) => {
                debug!("animation {} is not JSON: {}", url, e);
                return None;
            }
        };

        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), json.clone());
        Some(json)
    }
}

impl Default for AnimationLoader {
    fn default() -> Self {
        Self::new()
    }
}
