pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{RunData, Tweet, TweetAuthor, TweetSearchInput};

use serde::de::DeserializeOwned;
use serde::Serialize;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Actor ID for apidojo/tweet-scraper.
const TWEET_SCRAPER: &str = "61RPP7dywgiy0JPD0";

/// Seconds the API may hold a run-status request open.
const WAIT_FOR_FINISH_SECS: u32 = 60;

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, BASE_URL.to_string())
    }

    /// Point the client at a different API root (proxies, local fakes).
    pub fn with_base_url(token: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Start an actor run. Returns immediately with run metadata.
    pub async fn start_run<I: Serialize>(&self, actor_id: &str, input: &I) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", self.base_url, actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let api_resp: ApiResponse<RunData> = checked(resp).await?.json().await?;
        Ok(api_resp.data)
    }

    /// Long-poll a run until it reaches a terminal status.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        let url = format!(
            "{}/actor-runs/{}?waitForFinish={}",
            self.base_url, run_id, WAIT_FOR_FINISH_SECS
        );
        loop {
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let run = checked(resp).await?.json::<ApiResponse<RunData>>().await?.data;
            match run.status.as_str() {
                "SUCCEEDED" => return Ok(run),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(ApifyError::RunFailed {
                        run_id: run.id,
                        status: run.status,
                    });
                }
                _ => tracing::debug!(run_id, status = %run.status, "Run still in progress"),
            }
        }
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", self.base_url, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        Ok(checked(resp).await?.json().await?)
    }

    /// Search recent tweets matching `query` within `radius_km` of a point.
    /// Blocks until the actor run finishes.
    pub async fn search_tweets(
        &self,
        query: &str,
        lat: f64,
        lng: f64,
        radius_km: u32,
        limit: u32,
    ) -> Result<Vec<Tweet>> {
        let input = TweetSearchInput::geo(query, lat, lng, radius_km, limit);
        tracing::info!(search = %input.search_terms[0], limit, "Starting geo search");

        let run = self.start_run(TWEET_SCRAPER, &input).await?;
        tracing::debug!(run_id = %run.id, "Apify run started");

        let completed = self.wait_for_run(&run.id).await?;
        let tweets: Vec<Tweet> = self
            .get_dataset_items(&completed.default_dataset_id)
            .await?;
        tracing::info!(
            run_id = %completed.id,
            count = tweets.len(),
            "Fetched tweets"
        );

        Ok(tweets)
    }
}

/// Turn a non-2xx response into `ApifyError::Api`, keeping the body as the message.
async fn checked(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(ApifyError::Api {
        status: status.as_u16(),
        message,
    })
}
