use backon::ExponentialBuilder;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::GeminiApi;
use crate::config::{FALLBACK_SQL, LlmConfig};
use crate::error::NexusError;
use crate::types::SchemaSnapshot;
use crate::types::aistudio::GenerateContentRequest;

const PROMPT_TEMPLATE: &str = "\
You are a SQL assistant that returns ONLY a safe read-only SQL query.
Use ONLY the tables and columns given in the schema.
Return a single SELECT query.
No explanations.

Schema:
{schema}

Question:
{question}

SQL:
";

/// Turns a question plus schema into SQL via Gemini.
///
/// Never fails: a missing key, an upstream error or an empty answer all
/// degrade to [`FALLBACK_SQL`].
pub struct SqlGenerator {
    client: reqwest::Client,
    cfg: LlmConfig,
}

impl SqlGenerator {
    pub fn new(cfg: LlmConfig) -> Result<Self, NexusError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sqlnexus/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(cfg.timeout())
            .build()?;
        if cfg.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            warn!("GOOGLE_API_KEY missing; SQL generation will use the fallback query");
        }
        Ok(Self { client, cfg })
    }

    fn retry_policy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(3))
            .with_max_times(self.cfg.max_retries)
            .with_jitter()
    }

    pub async fn generate(&self, schema: &SchemaSnapshot, question: &str) -> String {
        match self.try_generate(schema, question).await {
            Ok(sql) => sql,
            Err(e) => {
                warn!(error = %e, "SQL generation failed; using fallback query");
                FALLBACK_SQL.to_string()
            }
        }
    }

    /// Like [`SqlGenerator::generate`] but surfaces the failure.
    pub async fn try_generate(
        &self,
        schema: &SchemaSnapshot,
        question: &str,
    ) -> Result<String, NexusError> {
        let api_key = self
            .cfg
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| NexusError::Generation("no API key configured".to_string()))?;

        let prompt = build_prompt(schema, question);
        let body = GenerateContentRequest::from_prompt(prompt);
        let resp = GeminiApi::generate_content(
            self.client.clone(),
            &self.cfg.base_url,
            &self.cfg.model,
            api_key,
            self.retry_policy(),
            &body,
        )
        .await?;

        let text = resp
            .first_text()
            .ok_or_else(|| NexusError::Generation("model returned no text".to_string()))?;
        let sql = clean_sql(&text);
        if sql.is_empty() {
            return Err(NexusError::Generation("model returned empty SQL".to_string()));
        }
        info!(model = %self.cfg.model, "SQL generated");
        Ok(sql)
    }
}

pub fn build_prompt(schema: &SchemaSnapshot, question: &str) -> String {
    let schema_text = schema
        .iter()
        .map(|(table, cols)| format!("{}: {}", table, cols.join(", ")))
        .collect::<Vec<_>>()
        .join("\n");
    PROMPT_TEMPLATE
        .replace("{schema}", &schema_text)
        .replace("{question}", question.trim())
}

/// Strip markdown code fences and stray backticks from a model answer.
pub fn clean_sql(text: &str) -> String {
    let mut cleaned = text.trim().to_string();
    if cleaned.starts_with("```") {
        cleaned = cleaned.replace("```sql", "").replace("```SQL", "").replace("```", "");
        cleaned = cleaned.trim().to_string();
    }
    cleaned.trim_matches('`').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SchemaSnapshot {
        let mut s = SchemaSnapshot::new();
        s.insert(
            "t".to_string(),
            vec!["id (INTEGER)".to_string(), "name (TEXT)".to_string()],
        );
        s
    }

    #[test]
    fn prompt_lists_schema_and_question() {
        let prompt = build_prompt(&schema(), "  how many rows? ");
        assert!(prompt.contains("t: id (INTEGER), name (TEXT)"));
        assert!(prompt.contains("Question:\nhow many rows?\n"));
        assert!(prompt.trim_end().ends_with("SQL:"));
    }

    #[test]
    fn fences_are_removed() {
        assert_eq!(clean_sql("```sql\nSELECT 1;\n```"), "SELECT 1;");
        assert_eq!(clean_sql("```\nSELECT 2\n```"), "SELECT 2");
        assert_eq!(clean_sql("`SELECT 3`"), "SELECT 3");
        assert_eq!(clean_sql("  SELECT 4  "), "SELECT 4");
    }

    #[tokio::test]
    async fn missing_key_falls_back() {
        let generator = SqlGenerator::new(LlmConfig::default()).unwrap();
        assert_eq!(generator.generate(&schema(), "anything").await, FALLBACK_SQL);
        assert!(matches!(
            generator.try_generate(&schema(), "anything").await,
            Err(NexusError::Generation(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_upstream_falls_back() {
        let cfg = LlmConfig {
            api_key: Some("k".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            max_retries: 0,
            timeout_secs: 2,
            ..LlmConfig::default()
        };
        let generator = SqlGenerator::new(cfg).unwrap();
        assert_eq!(generator.generate(&schema(), "anything").await, FALLBACK_SQL);
    }
}
