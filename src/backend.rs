//! Client for the external intake services: landing content, questions,
//! and quiz results.
//!
//! Every service replies with a `{ success, data, message? }` envelope. A
//! `success: false` reply is a business failure; network errors, unexpected
//! statuses and unparsable bodies are transport failures. Nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::BackendConfig;
use crate::domain::{LandingContent, Question};

const UA: &str = "intake-frontend/0.1";

#[derive(Debug, Error)]
pub enum BackendError {
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("service replied with HTTP {status}")]
  Status { status: u16 },

  #[error("malformed service response: {0}")]
  Decode(#[from] serde_json::Error),

  /// The service answered but reported failure.
  #[error("{}", .0.as_deref().unwrap_or("request rejected by service"))]
  Rejected(Option<String>),
}

impl BackendError {
  pub fn is_business(&self) -> bool {
    matches!(self, BackendError::Rejected(_))
  }
}

/// One answer as sent to the results service.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedResponse {
  pub question_id: String,
  pub selected_options: Option<Vec<String>>,
  pub written_answer: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuizSubmission {
  pub responses: Vec<SubmittedResponse>,
}

/// Category → score, in the order the service listed them.
pub type TotalScores = serde_json::Map<String, serde_json::Value>;

#[derive(Deserialize)]
struct Envelope<T> {
  #[serde(default)]
  success: Option<bool>,
  data: Option<T>,
  #[serde(default)]
  message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizResultData {
  #[serde(default)]
  total_scores: TotalScores,
}

#[async_trait]
pub trait IntakeBackend: Send + Sync {
  async fn landing_content(&self) -> Result<LandingContent, BackendError>;
  async fn questions(&self) -> Result<Vec<Question>, BackendError>;
  async fn submit_results(&self, submission: &QuizSubmission) -> Result<TotalScores, BackendError>;
}

#[derive(Clone)]
pub struct HttpBackend {
  pub client: reqwest::Client,
  pub base_url: String,
}

impl HttpBackend {
  pub fn new(cfg: &BackendConfig) -> Result<Self, BackendError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = cfg.request_timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(Self {
      client: builder.build()?,
      base_url: cfg.base_url.trim_end_matches('/').to_string(),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  /// Reads the envelope. The body is parsed even on error statuses so a
  /// service-provided `message` still reaches the user.
  async fn read_envelope<T: DeserializeOwned>(res: reqwest::Response) -> Result<Envelope<T>, BackendError> {
    let status = res.status();
    let body = res.text().await?;
    match serde_json::from_str::<Envelope<T>>(&body) {
      Ok(env) if status.is_success() || env.success == Some(false) => Ok(env),
      Ok(_) => Err(BackendError::Status { status: status.as_u16() }),
      Err(_) if !status.is_success() => Err(BackendError::Status { status: status.as_u16() }),
      Err(e) => Err(e.into()),
    }
  }

  /// `success` is optional on the landing endpoint; only an explicit `false` fails.
  fn unwrap_data<T>(env: Envelope<T>) -> Result<T, BackendError> {
    if env.success == Some(false) {
      return Err(BackendError::Rejected(env.message));
    }
    env.data.ok_or_else(|| BackendError::Rejected(env.message))
  }
}

#[async_trait]
impl IntakeBackend for HttpBackend {
  #[instrument(level = "info", skip(self))]
  async fn landing_content(&self) -> Result<LandingContent, BackendError> {
    let res = self.client.get(self.url("/api/v1/landing-page-content"))
      .query(&[("latest", "true")])
      .header(USER_AGENT, UA)
      .header(ACCEPT, "application/json")
      .send().await?;
    Self::unwrap_data(Self::read_envelope::<LandingContent>(res).await?)
  }

  #[instrument(level = "info", skip(self))]
  async fn questions(&self) -> Result<Vec<Question>, BackendError> {
    let res = self.client.get(self.url("/api/v1/questions"))
      .header(USER_AGENT, UA)
      .header(ACCEPT, "application/json")
      .send().await?;
    let env = Self::read_envelope::<Vec<Question>>(res).await?;
    if env.success != Some(true) {
      warn!(target: "questionnaire", message = ?env.message, "Questions service reported failure");
      return Err(BackendError::Rejected(env.message));
    }
    let questions = env.data.ok_or(BackendError::Rejected(env.message))?;
    info!(target: "questionnaire", count = questions.len(), "Fetched questions");
    Ok(questions)
  }

  #[instrument(level = "info", skip(self, submission), fields(responses = submission.responses.len()))]
  async fn submit_results(&self, submission: &QuizSubmission) -> Result<TotalScores, BackendError> {
    let res = self.client.post(self.url("/api/v1/quiz-results"))
      .header(USER_AGENT, UA)
      .header(CONTENT_TYPE, "application/json")
      .json(submission)
      .send().await?;
    let env = Self::read_envelope::<QuizResultData>(res).await?;
    if env.success != Some(true) {
      return Err(BackendError::Rejected(env.message));
    }
    let data = env.data.ok_or(BackendError::Rejected(env.message))?;
    info!(target: "submission", categories = data.total_scores.len(), "Quiz results received");
    Ok(data.total_scores)
  }
}
