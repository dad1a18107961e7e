//! End-to-end evidence gathering: plan, resolve, fetch, extract, score, digest.

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::budget::{self, Budget, BudgetParams, TokenCounter};
use crate::config::{ConfigError, PipelineConfig};
use crate::digest::rank_and_group;
use crate::estimator::{Estimator, EstimatorError, Judgment};
use crate::extract;
use crate::fetch::{self, FailedUrl, FetchOptions};
use crate::planner::{PlannerError, QueryPlanner};
use crate::relevance::{
    DateRecognizer, EmbedError, Embedder, ScoreOptions, Scorer, extract_event_date,
};
use crate::search::{self, ResolveLimits, SearchProvider};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("query planning failed: {0}")]
    Planner(#[from] PlannerError),

    #[error("question could not be embedded: {0}")]
    Embed(#[from] EmbedError),

    #[error("estimation failed: {0}")]
    Estimator(#[from] EstimatorError),
}

/// Everything one `gather` run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub digest: String,
    pub budget: Budget,
    pub queries: Vec<String>,
    pub urls: Vec<String>,
    pub failed: Vec<FailedUrl>,
}

impl Evidence {
    fn empty(budget: Budget) -> Self {
        Self {
            digest: String::new(),
            budget,
            queries: Vec::new(),
            urls: Vec::new(),
            failed: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub evidence: Evidence,
    pub judgment: Judgment,
}

pub struct Pipeline<P, S, E, R, T> {
    config: PipelineConfig,
    http: Client,
    planner: P,
    search: S,
    embedder: E,
    recognizer: R,
    tokens: T,
}

impl<P, S, E, R, T> Pipeline<P, S, E, R, T>
where
    P: QueryPlanner,
    S: SearchProvider,
    E: Embedder,
    R: DateRecognizer,
    T: TokenCounter,
{
    pub fn new(
        config: PipelineConfig,
        http: Client,
        planner: P,
        search: S,
        embedder: E,
        recognizer: R,
        tokens: T,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            http,
            planner,
            search,
            embedder,
            recognizer,
            tokens,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Builds the evidence digest for `question`, sized so that it fits next
    /// to `prompt_template` in the estimator's context window.
    pub async fn gather(
        &self,
        question: &str,
        prompt_template: &str,
    ) -> Result<Evidence, PipelineError> {
        let budget = budget::budget(
            &BudgetParams::from(&self.config),
            question,
            prompt_template,
            &self.tokens,
        );
        if !budget.has_room() {
            warn!(
                max_evidence_tokens = budget.max_evidence_tokens,
                max_words = budget.max_words,
                "prompt leaves no room for evidence"
            );
            return Ok(Evidence::empty(budget));
        }

        let queries = self.planner.plan(question).await?;
        info!(count = queries.len(), "queries planned");

        let urls = search::resolve(
            &queries,
            &self.search,
            &ResolveLimits::from(&self.config),
        )
        .await?;
        info!(count = urls.len(), "URLs resolved");

        let report = fetch::fetch_all(&self.http, &urls, &FetchOptions::from(&self.config)).await?;
        info!(
            fetched = report.documents.len(),
            failed = report.failed.len(),
            "pages fetched"
        );

        let event_date = extract_event_date(question, &self.recognizer);
        let query_embedding = self.embedder.embed(question)?;
        let scorer = Scorer::new(
            &self.embedder,
            &self.recognizer,
            ScoreOptions::from(&self.config),
        );

        let mut scored = Vec::new();
        for doc in &report.documents {
            let dated = match extract::extract(doc) {
                Ok(d) => d,
                Err(e) => {
                    warn!(error = %e, "dropping document");
                    continue;
                }
            };
            if dated.clean_text.is_empty() {
                debug!(url = %dated.url, "dropping document without text");
                continue;
            }
            scored.extend(scorer.score(&dated, &query_embedding, event_date));
        }
        info!(sentences = scored.len(), "sentences above threshold");

        let digest = rank_and_group(scored, budget.word_limit());
        let digest = self
            .tokens
            .truncate(&digest, budget.token_limit())
            .to_string();

        Ok(Evidence {
            digest,
            budget,
            queries,
            urls,
            failed: report.failed,
        })
    }

    /// Gathers evidence and hands it to `estimator`.
    pub async fn evaluate(
        &self,
        question: &str,
        prompt_template: &str,
        estimator: &impl Estimator,
    ) -> Result<Assessment, PipelineError> {
        let evidence = self.gather(question, prompt_template).await?;
        let judgment = estimator.estimate(question, &evidence.digest).await?;
        Ok(Assessment {
            evidence,
            judgment,
        })
    }
}
