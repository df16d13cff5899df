//! Client for the homework review API.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use crate::error::{Error, Result};

pub const ENDPOINT: &str = "https://practicum.yandex.ru/api/user_api/homework_statuses/";

/// Source of homework status payloads, keyed by a `from_date` cursor.
#[async_trait]
pub trait StatusSource {
    /// Fetch every status update recorded after `from_date`.
    ///
    /// Returns the raw JSON body; shape validation is the caller's job.
    async fn fetch(&self, from_date: i64) -> Result<Value>;
}

pub struct PracticumClient {
    http: reqwest::Client,
    token: String,
}

impl PracticumClient {
    pub fn new(http: reqwest::Client, token: String) -> Self {
        Self { http, token }
    }
}

#[async_trait]
impl StatusSource for PracticumClient {
    async fn fetch(&self, from_date: i64) -> Result<Value> {
        let response = self
            .http
            .get(ENDPOINT)
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .query(&[("from_date", from_date)])
            .send()
            .await
            .map_err(|source| Error::Fetch {
                endpoint: ENDPOINT,
                from_date,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::FetchStatus {
                endpoint: ENDPOINT,
                from_date,
                status,
            });
        }

        response.json().await.map_err(|source| Error::Fetch {
            endpoint: ENDPOINT,
            from_date,
            source,
        })
    }
}
