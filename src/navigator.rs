//! Sequential question flow: resolves the current question and its response,
//! gates "advance" on validation, and computes where prev/next lead.
//!
//! Index `i` ranges over `[0, N)`. Retreating from 0 leads to the landing
//! page; advancing from `N - 1` leads to the review page.

use std::fmt;

use thiserror::Error;
use tracing::{info, instrument};

use crate::domain::{initial_responses, Question, Response, Variant};
use crate::store::{ResponseStore, StoreError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
  Landing,
  Question(usize),
  Review,
}

impl Route {
  pub fn path(&self) -> String {
    match self {
      Route::Landing => "/".to_string(),
      Route::Question(i) => format!("/questions/{i}"),
      Route::Review => "/submit".to_string(),
    }
  }
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.path())
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
  #[error("Please answer this question before proceeding.")]
  Required,
}

#[derive(Debug, Error)]
pub enum AdvanceError {
  #[error(transparent)]
  Invalid(#[from] ValidationError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Structural check. Only required questions can fail; sliders always carry
/// a selection.
pub fn validate(question: &Question, response: &Response) -> Result<(), ValidationError> {
  if !question.required {
    return Ok(());
  }
  let answered = match question.variant {
    Variant::SingleSelect | Variant::MultiSelect => !response.selection().is_empty(),
    Variant::FreeText => response.written_answer.as_deref().is_some_and(|t| !t.trim().is_empty()),
    Variant::Slider => true,
  };
  if answered { Ok(()) } else { Err(ValidationError::Required) }
}

pub struct Navigator<'a> {
  questions: &'a [Question],
  index: usize,
}

impl<'a> Navigator<'a> {
  /// `None` when `index` is past the last question.
  pub fn new(questions: &'a [Question], index: usize) -> Option<Self> {
    (index < questions.len()).then_some(Self { questions, index })
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn total(&self) -> usize {
    self.questions.len()
  }

  pub fn current(&self) -> &'a Question {
    &self.questions[self.index]
  }

  pub fn is_last(&self) -> bool {
    self.index + 1 == self.questions.len()
  }

  pub fn prev(&self) -> Route {
    match self.index {
      0 => Route::Landing,
      i => Route::Question(i - 1),
    }
  }

  pub fn next(&self) -> Route {
    if self.is_last() { Route::Review } else { Route::Question(self.index + 1) }
  }

  /// Response to show for the current question. Seeds the store with initial
  /// responses for every question when nothing is stored yet.
  #[instrument(level = "debug", skip(self, store), fields(index = self.index))]
  pub async fn resolve(&self, store: &ResponseStore) -> Result<Response, StoreError> {
    let current = self.current();
    let stored = match store.load().await? {
      Some(responses) => responses,
      None => {
        let fresh = initial_responses(self.questions);
        store.save(&fresh).await?;
        info!(target: "questionnaire", count = fresh.len(), "Initialized stored responses");
        fresh
      }
    };
    Ok(stored
      .into_iter()
      .find(|r| r.question_id == current.id)
      .unwrap_or_else(|| current.initial_response()))
  }

  /// Validates `response`, commits it and returns the next route.
  #[instrument(level = "info", skip(self, store, response), fields(index = self.index, question = %self.current().id))]
  pub async fn advance(&self, store: &ResponseStore, response: Response) -> Result<Route, AdvanceError> {
    validate(self.current(), &response)?;
    self.commit(store, response).await?;
    let next = self.next();
    info!(target: "questionnaire", %next, "Advanced");
    Ok(next)
  }

  pub fn retreat(&self) -> Route {
    self.prev()
  }

  /// Replace the stored response for this question, or insert it at the
  /// question's position when missing.
  async fn commit(&self, store: &ResponseStore, response: Response) -> Result<(), StoreError> {
    let mut responses = match store.load().await? {
      Some(r) => r,
      None => initial_responses(self.questions),
    };
    if let Some(slot) = responses.iter_mut().find(|r| r.question_id == response.question_id) {
      *slot = response;
    } else {
      let at = responses
        .iter()
        .position(|r| {
          self.questions
            .iter()
            .position(|q| q.id == r.question_id)
            .is_some_and(|qi| qi > self.index)
        })
        .unwrap_or(responses.len());
      responses.insert(at, response);
    }
    store.save(&responses).await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::domain::QuestionOption;
  use crate::store::MemoryStore;

  fn q(id: &str, variant: Variant, required: bool) -> Question {
    Question {
      id: id.into(),
      text: format!("Question {id}"),
      variant,
      options: vec![
        QuestionOption { id: format!("{id}-a"), text: "A".into(), score: Default::default(), image: None },
        QuestionOption { id: format!("{id}-b"), text: "B".into(), score: Default::default(), image: None },
      ],
      required,
      category: String::new(),
    }
  }

  fn flow() -> Vec<Question> {
    vec![
      q("name", Variant::FreeText, true),
      q("goal", Variant::SingleSelect, true),
      q("symptoms", Variant::MultiSelect, true),
      q("energy", Variant::Slider, true),
    ]
  }

  fn store() -> ResponseStore {
    ResponseStore::new(Arc::new(MemoryStore::new()), "test")
  }

  #[test]
  fn routes_render_paths() {
    assert_eq!(Route::Landing.path(), "/");
    assert_eq!(Route::Question(2).path(), "/questions/2");
    assert_eq!(Route::Review.to_string(), "/submit");
  }

  #[test]
  fn boundaries_lead_to_landing_and_review() {
    let qs = flow();
    let first = Navigator::new(&qs, 0).unwrap();
    assert_eq!(first.prev(), Route::Landing);
    assert_eq!(first.retreat(), Route::Landing);
    assert_eq!(first.next(), Route::Question(1));

    let last = Navigator::new(&qs, 3).unwrap();
    assert_eq!(last.prev(), Route::Question(2));
    assert_eq!(last.next(), Route::Review);

    assert!(Navigator::new(&qs, 4).is_none());
  }

  #[test]
  fn required_select_needs_a_selection() {
    for variant in [Variant::SingleSelect, Variant::MultiSelect] {
      let question = q("s", variant, true);
      let mut r = question.initial_response();
      assert_eq!(validate(&question, &r), Err(ValidationError::Required));
      r.selected_options = None;
      assert_eq!(validate(&question, &r), Err(ValidationError::Required));
      r.selected_options = Some(vec!["s-a".into()]);
      assert_eq!(validate(&question, &r), Ok(()));
    }
  }

  #[test]
  fn required_text_rejects_blank_answers() {
    let question = q("t", Variant::FreeText, true);
    let mut r = question.initial_response();
    for blank in ["", "   ", "\n\t"] {
      r.written_answer = Some(blank.into());
      assert_eq!(validate(&question, &r), Err(ValidationError::Required));
    }
    r.written_answer = None;
    assert_eq!(validate(&question, &r), Err(ValidationError::Required));
    r.written_answer = Some(" Jo ".into());
    assert_eq!(validate(&question, &r), Ok(()));
  }

  #[test]
  fn optional_questions_and_sliders_always_pass() {
    let optional = q("o", Variant::MultiSelect, false);
    assert_eq!(validate(&optional, &optional.initial_response()), Ok(()));
    let slider = q("sl", Variant::Slider, true);
    assert_eq!(validate(&slider, &slider.initial_response()), Ok(()));
  }

  #[tokio::test]
  async fn resolve_seeds_store_with_initial_responses() {
    let qs = flow();
    let store = store();
    let nav = Navigator::new(&qs, 3).unwrap();

    let r = nav.resolve(&store).await.unwrap();
    assert_eq!(r.selected_options, Some(vec!["energy-a".to_string()]));

    let stored = store.load().await.unwrap().unwrap();
    assert_eq!(stored, initial_responses(&qs));
  }

  #[tokio::test]
  async fn advance_persists_and_moves_on() {
    let qs = flow();
    let store = store();
    let nav = Navigator::new(&qs, 1).unwrap();
    let mut r = nav.resolve(&store).await.unwrap();

    r.selected_options = Some(vec![]);
    assert!(matches!(nav.advance(&store, r.clone()).await, Err(AdvanceError::Invalid(_))));
    assert_eq!(store.load().await.unwrap().unwrap()[1].selection(), Vec::<String>::new());

    r.selected_options = Some(vec!["goal-b".into()]);
    assert_eq!(nav.advance(&store, r).await.unwrap(), Route::Question(2));
    assert_eq!(store.load().await.unwrap().unwrap()[1].selection(), ["goal-b"]);

    // A revisit resolves the committed answer.
    let again = Navigator::new(&qs, 1).unwrap().resolve(&store).await.unwrap();
    assert_eq!(again.selection(), ["goal-b"]);
  }

  #[tokio::test]
  async fn advancing_from_last_question_reaches_review() {
    let qs = flow();
    let store = store();
    let nav = Navigator::new(&qs, 3).unwrap();
    let r = nav.resolve(&store).await.unwrap();
    assert_eq!(nav.advance(&store, r).await.unwrap(), Route::Review);
  }

  #[tokio::test]
  async fn commit_inserts_missing_response_in_question_order() {
    let qs = flow();
    let store = store();
    let mut partial = initial_responses(&qs);
    partial.remove(2);
    store.save(&partial).await.unwrap();

    let nav = Navigator::new(&qs, 2).unwrap();
    let mut r = nav.resolve(&store).await.unwrap();
    r.selected_options = Some(vec!["symptoms-a".into()]);
    nav.advance(&store, r).await.unwrap();

    let ids: Vec<_> = store.load().await.unwrap().unwrap().into_iter().map(|r| r.question_id).collect();
    assert_eq!(ids, ["name", "goal", "symptoms", "energy"]);
  }
}
