//! Review and submission: lists stored answers against the question set,
//! posts them to the results service, and turns the returned category scores
//! into a program recommendation.

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::backend::{BackendError, IntakeBackend, QuizSubmission, SubmittedResponse, TotalScores};
use crate::config::CategoryLabels;
use crate::domain::{Question, Response};
use crate::navigator::Route;
use crate::store::{ResponseStore, StoreError};

pub const UNKNOWN_QUESTION: &str = "Unknown Question";
pub const UNKNOWN_OPTION: &str = "Unknown Option";
const DEFAULT_REJECTION: &str = "There was an error submitting your responses.";

#[derive(Debug, Error)]
pub enum SubmitError {
  /// The results service answered with a failure.
  #[error("{0}")]
  Rejected(String),

  #[error("There was an error submitting your responses. Please try again.")]
  Transport(#[source] BackendError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

impl From<BackendError> for SubmitError {
  fn from(e: BackendError) -> Self {
    match e {
      BackendError::Rejected(msg) => SubmitError::Rejected(msg.unwrap_or_else(|| DEFAULT_REJECTION.to_string())),
      other => SubmitError::Transport(other),
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Answer {
  Written(String),
  Options(Vec<String>),
  Unanswered,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReviewItem {
  pub number: usize,
  pub question: String,
  pub answer: Answer,
  /// Where "Edit" leads; `None` when the question is not in the current set.
  pub edit: Option<Route>,
}

/// Everything the review page shows.
#[derive(Debug, Default)]
pub struct Review {
  pub items: Vec<ReviewItem>,
  /// Set when the question list could not be fetched.
  pub notice: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
  pub name: Option<String>,
  /// `None` when the service returned no numeric scores.
  pub category: Option<String>,
  pub recommendation: Option<String>,
}

pub fn question_text(questions: &[Question], question_id: &str) -> String {
  questions
    .iter()
    .find(|q| q.id == question_id)
    .map(|q| q.text.clone())
    .unwrap_or_else(|| UNKNOWN_QUESTION.to_string())
}

pub fn option_text(questions: &[Question], question_id: &str, option_id: &str) -> String {
  questions
    .iter()
    .find(|q| q.id == question_id)
    .and_then(|q| q.option(option_id))
    .map(|o| o.text.clone())
    .unwrap_or_else(|| UNKNOWN_OPTION.to_string())
}

pub fn review_items(questions: &[Question], responses: &[Response]) -> Vec<ReviewItem> {
  responses
    .iter()
    .enumerate()
    .map(|(i, r)| {
      let answer = match (r.written_answer.as_deref(), r.selection()) {
        (Some(text), _) if !text.is_empty() => Answer::Written(text.to_string()),
        (_, selected) if !selected.is_empty() => Answer::Options(
          selected.iter().map(|id| option_text(questions, &r.question_id, id)).collect(),
        ),
        _ => Answer::Unanswered,
      };
      ReviewItem {
        number: i + 1,
        question: question_text(questions, &r.question_id),
        answer,
        edit: questions.iter().position(|q| q.id == r.question_id).map(Route::Question),
      }
    })
    .collect()
}

/// Written answer to the first question asking for a name.
pub fn respondent_name(questions: &[Question], responses: &[Response]) -> Option<String> {
  let q = questions.iter().find(|q| q.text.to_lowercase().contains("name"))?;
  responses
    .iter()
    .find(|r| r.question_id == q.id)
    .and_then(|r| r.written_answer.clone())
    .filter(|n| !n.trim().is_empty())
}

/// Wire payload; empty selections and empty text go out as null.
pub fn build_submission(responses: &[Response]) -> QuizSubmission {
  QuizSubmission {
    responses: responses
      .iter()
      .map(|r| SubmittedResponse {
        question_id: r.question_id.clone(),
        selected_options: r.selected_options.clone().filter(|s| !s.is_empty()),
        written_answer: r.written_answer.clone().filter(|w| !w.is_empty()),
      })
      .collect(),
  }
}

/// Highest-scoring category. The first maximum in service order wins ties;
/// non-numeric scores are skipped.
pub fn top_category(scores: &TotalScores) -> Option<&str> {
  scores
    .iter()
    .filter_map(|(k, v)| v.as_f64().map(|s| (k.as_str(), s)))
    .fold(None, |best: Option<(&str, f64)>, (k, s)| match best {
      Some((_, b)) if b >= s => best,
      _ => Some((k, s)),
    })
    .map(|(k, _)| k)
}

pub struct SubmissionCoordinator<'a> {
  backend: &'a dyn IntakeBackend,
  store: &'a ResponseStore,
  labels: &'a CategoryLabels,
}

impl<'a> SubmissionCoordinator<'a> {
  pub fn new(backend: &'a dyn IntakeBackend, store: &'a ResponseStore, labels: &'a CategoryLabels) -> Self {
    Self { backend, store, labels }
  }

  /// Stored answers against a freshly fetched question list. A failed fetch
  /// degrades labels to "unknown" and sets a notice.
  #[instrument(level = "info", skip(self))]
  pub async fn review(&self) -> Result<Review, StoreError> {
    let responses = self.store.load().await?.unwrap_or_default();
    let (questions, notice) = match self.backend.questions().await {
      Ok(qs) => (qs, None),
      Err(e) => {
        warn!(target: "submission", error = %e, "Question fetch failed on review");
        (Vec::new(), Some("Failed to load questions. Please try again.".to_string()))
      }
    };
    Ok(Review { items: review_items(&questions, &responses), notice })
  }

  /// Posts every stored answer. Stored state is cleared only on success.
  #[instrument(level = "info", skip(self))]
  pub async fn submit(&self) -> Result<Outcome, SubmitError> {
    let responses = self.store.load().await?.unwrap_or_default();
    let submission = build_submission(&responses);

    let scores = match self.backend.submit_results(&submission).await {
      Ok(scores) => scores,
      Err(e) => {
        error!(target: "submission", error = %e, business = e.is_business(), "Submission failed");
        return Err(e.into());
      }
    };

    let category = top_category(&scores).map(str::to_string);
    let recommendation = category.as_deref().map(|c| self.labels.label_for(c));
    // The name only decorates the result page.
    let name = match self.backend.questions().await {
      Ok(qs) => respondent_name(&qs, &responses),
      Err(_) => None,
    };

    self.store.clear().await?;
    info!(target: "submission", category = ?category, responses = responses.len(), "Submission accepted");
    Ok(Outcome { name, category, recommendation })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use serde_json::json;

  use super::*;
  use crate::backend::stub::StubBackend;
  use crate::domain::{QuestionOption, Variant};
  use crate::store::MemoryStore;

  fn scores(v: serde_json::Value) -> TotalScores {
    v.as_object().cloned().unwrap()
  }

  fn questions() -> Vec<Question> {
    vec![
      Question {
        id: "q-name".into(),
        text: "What is your first Name?".into(),
        variant: Variant::FreeText,
        options: vec![],
        required: true,
        category: String::new(),
      },
      Question {
        id: "q-goal".into(),
        text: "Main goal?".into(),
        variant: Variant::MultiSelect,
        options: vec![
          QuestionOption { id: "o-strength".into(), text: "Strength".into(), score: Default::default(), image: None },
          QuestionOption { id: "o-fat".into(), text: "Fat loss".into(), score: Default::default(), image: None },
        ],
        required: false,
        category: String::new(),
      },
    ]
  }

  fn answered() -> Vec<Response> {
    vec![
      Response { question_id: "q-name".into(), selected_options: None, written_answer: Some("Riley".into()) },
      Response { question_id: "q-goal".into(), selected_options: Some(vec!["o-fat".into()]), written_answer: None },
    ]
  }

  async fn seeded_store() -> ResponseStore {
    let store = ResponseStore::new(Arc::new(MemoryStore::new()), "s");
    store.save(&answered()).await.unwrap();
    store
  }

  #[test]
  fn first_maximum_wins_ties() {
    assert_eq!(top_category(&scores(json!({"TRT": 5, "Build": 9, "Lean": 9}))), Some("Build"));
    assert_eq!(top_category(&scores(json!({"Lean": 1.5, "GLP1": 2}))), Some("GLP1"));
  }

  #[test]
  fn non_numeric_and_empty_scores() {
    assert_eq!(top_category(&scores(json!({"TRT": "high", "Lean": 0}))), Some("Lean"));
    assert_eq!(top_category(&scores(json!({}))), None);
  }

  #[test]
  fn submission_nulls_empty_answers() {
    let responses = vec![
      Response { question_id: "a".into(), selected_options: Some(vec![]), written_answer: None },
      Response { question_id: "b".into(), selected_options: None, written_answer: Some(String::new()) },
    ];
    let body = serde_json::to_value(build_submission(&responses)).unwrap();
    assert_eq!(body, json!({"responses": [
      {"questionId": "a", "selectedOptions": null, "writtenAnswer": null},
      {"questionId": "b", "selectedOptions": null, "writtenAnswer": null},
    ]}));
  }

  #[test]
  fn review_items_degrade_unknown_ids() {
    let mut responses = answered();
    responses.push(Response { question_id: "gone".into(), selected_options: Some(vec!["x".into()]), written_answer: None });
    responses.push(Response { question_id: "q-goal".into(), selected_options: Some(vec!["o-old".into()]), written_answer: None });
    responses.push(Response { question_id: "q-name".into(), selected_options: None, written_answer: Some(String::new()) });

    let items = review_items(&questions(), &responses);
    assert_eq!(items[0].answer, Answer::Written("Riley".into()));
    assert_eq!(items[0].edit, Some(Route::Question(0)));
    assert_eq!(items[1].answer, Answer::Options(vec!["Fat loss".into()]));
    assert_eq!(items[2].question, UNKNOWN_QUESTION);
    assert_eq!(items[2].answer, Answer::Options(vec![UNKNOWN_OPTION.into()]));
    assert_eq!(items[2].edit, None);
    assert_eq!(items[3].answer, Answer::Options(vec![UNKNOWN_OPTION.into()]));
    assert_eq!(items[4].answer, Answer::Unanswered);
    assert_eq!(items[4].number, 5);
  }

  #[test]
  fn name_comes_from_name_question() {
    assert_eq!(respondent_name(&questions(), &answered()).as_deref(), Some("Riley"));
    assert_eq!(respondent_name(&questions()[1..], &answered()), None);
  }

  #[tokio::test]
  async fn successful_submission_clears_store() {
    let store = seeded_store().await;
    let backend = StubBackend {
      questions: Some(questions()),
      results: Some(Ok(scores(json!({"TRT": 5, "Build": 9, "Lean": 9})))),
      ..Default::default()
    };
    let labels = CategoryLabels::default();

    let outcome = SubmissionCoordinator::new(&backend, &store, &labels).submit().await.unwrap();
    assert_eq!(outcome.category.as_deref(), Some("Build"));
    assert_eq!(outcome.recommendation.as_deref(), Some("Build (Muscle Building)"));
    assert_eq!(outcome.name.as_deref(), Some("Riley"));
    assert_eq!(store.load().await.unwrap(), None);

    let sent = backend.submitted.lock().unwrap();
    assert_eq!(sent[0].responses.len(), 2);
    assert_eq!(sent[0].responses[1].selected_options, Some(vec!["o-fat".to_string()]));
  }

  #[tokio::test]
  async fn rejected_submission_keeps_store() {
    let store = seeded_store().await;
    let backend = StubBackend { results: Some(Err(Some("Scoring unavailable".into()))), ..Default::default() };
    let labels = CategoryLabels::default();

    let err = SubmissionCoordinator::new(&backend, &store, &labels).submit().await.unwrap_err();
    assert_eq!(err.to_string(), "Scoring unavailable");
    assert_eq!(store.load().await.unwrap(), Some(answered()));
  }

  #[tokio::test]
  async fn transport_failure_keeps_store_and_allows_retry() {
    let store = seeded_store().await;
    let labels = CategoryLabels::default();
    let down = StubBackend::default();
    let err = SubmissionCoordinator::new(&down, &store, &labels).submit().await.unwrap_err();
    assert!(matches!(err, SubmitError::Transport(_)));
    assert_eq!(store.load().await.unwrap(), Some(answered()));

    let up = StubBackend { results: Some(Ok(scores(json!({"Lean": 3})))), ..Default::default() };
    let outcome = SubmissionCoordinator::new(&up, &store, &labels).submit().await.unwrap();
    assert_eq!(outcome.recommendation.as_deref(), Some("Lean (Fat Loss / Lean Body)"));
    assert_eq!(outcome.name, None);
  }

  #[tokio::test]
  async fn review_without_questions_sets_notice() {
    let store = seeded_store().await;
    let labels = CategoryLabels::default();
    let down = StubBackend::default();
    let review = SubmissionCoordinator::new(&down, &store, &labels).review().await.unwrap();
    assert!(review.notice.is_some());
    assert_eq!(review.items.len(), 2);
    assert_eq!(review.items[0].question, UNKNOWN_QUESTION);
  }
}
