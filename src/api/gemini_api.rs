use crate::error::{GeminiError, IsRetryable, NexusError};
use crate::types::aistudio::{GenerateContentRequest, GeminiResponse};
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::warn;

pub struct GeminiApi;

impl GeminiApi {
    /// `POST {base}/models/{model}:generateContent`, retried on transport
    /// errors and upstream 5xx/429.
    pub async fn generate_content(
        client: reqwest::Client,
        base_url: &str,
        model: &str,
        api_key: &str,
        retry_policy: ExponentialBuilder,
        body: &GenerateContentRequest,
    ) -> Result<GeminiResponse, NexusError> {
        let model = model.trim_start_matches("models/");
        let url = format!(
            "{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model
        );

        (|| async {
            let resp = client
                .post(url.as_str())
                .header("x-goog-api-key", api_key)
                .json(body)
                .send()
                .await?;
            let status = resp.status();
            if !status.is_success() {
                let bytes = resp.bytes().await?;
                return Err(match serde_json::from_slice::<GeminiError>(&bytes) {
                    Ok(err) => NexusError::GeminiServerError(err),
                    Err(_) => NexusError::UpstreamStatus(status),
                });
            }
            Ok(resp.json::<GeminiResponse>().await?)
        })
        .retry(retry_policy)
        .when(|e: &NexusError| e.is_retryable())
        .notify(|err, dur: Duration| {
            warn!("Gemini generateContent retrying after error {}, sleeping {:?}", err, dur);
        })
        .await
    }
}
