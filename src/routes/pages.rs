//! Page handlers. Each page mount fetches what it shows; service failures and
//! validation problems are rendered as a notice on the page.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  response::{Html, Redirect, Response},
  Form,
};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::domain::{self, Question};
use crate::error::AppError;
use crate::input;
use crate::navigator::{AdvanceError, Navigator, Route};
use crate::protocol::{FormAction, QuestionForm};
use crate::session::Session;
use crate::state::AppState;
use crate::submission::{SubmissionCoordinator, SubmitError};
use crate::views::{landing_view, question_view, result_view, review_view};

const LOAD_FAILED: &str = "Failed to load questions. Please try again.";

fn redirect(session: &Session, route: Route) -> Response {
  session.attach(Redirect::to(&route.path()))
}

fn message_page(state: &AppState, session: &Session, heading: &str, detail: &str, notice: Option<&str>) -> Result<Response, AppError> {
  let html = state.views.page("message", heading, notice, &json!({ "heading": heading, "detail": detail }))?;
  Ok(session.attach(Html(html)))
}

/// Outcome of fetching questions for a page mount.
enum Loaded {
  Questions(Vec<Question>),
  /// Nothing to navigate; show this page instead.
  Page(Response),
}

async fn load_questions(state: &AppState, session: &Session) -> Result<Loaded, AppError> {
  match state.backend.questions().await {
    Ok(qs) if qs.is_empty() => {
      Ok(Loaded::Page(message_page(state, session, "No questions found", "Please try again later.", None)?))
    }
    Ok(qs) => Ok(Loaded::Questions(qs)),
    Err(e) => {
      warn!(target: "questionnaire", error = %e, "Question fetch failed");
      Ok(Loaded::Page(message_page(state, session, "Questions unavailable", "Please try again later.", Some(LOAD_FAILED))?))
    }
  }
}

fn render_question(state: &AppState, session: &Session, nav: &Navigator<'_>, response: &domain::Response, notice: Option<&str>) -> Result<Response, AppError> {
  let title = format!("Question {} of {}", nav.index() + 1, nav.total());
  let html = state.views.page("question", &title, notice, &question_view(nav, response))?;
  Ok(session.attach(Html(html)))
}

#[instrument(level = "info", skip(state), fields(session = %session.id))]
pub async fn landing(State(state): State<Arc<AppState>>, session: Session) -> Result<Response, AppError> {
  let (content, notice) = match state.backend.landing_content().await {
    Ok(c) => (c, None),
    Err(e) => {
      warn!(target: "intake_frontend", error = %e, "Landing content fetch failed");
      (Default::default(), Some("Failed to load page content. Please try again."))
    }
  };
  let html = state.views.page("landing", "Welcome", notice, &landing_view(&content))?;
  Ok(session.attach(Html(html)))
}

#[instrument(level = "info", skip(state), fields(session = %session.id, %index))]
pub async fn question_page(
  State(state): State<Arc<AppState>>,
  session: Session,
  Path(index): Path<usize>,
) -> Result<Response, AppError> {
  let questions = match load_questions(&state, &session).await? {
    Loaded::Questions(qs) => qs,
    Loaded::Page(page) => return Ok(page),
  };
  let Some(nav) = Navigator::new(&questions, index) else {
    return Ok(redirect(&session, Route::Review));
  };
  let store = state.responses(&session);
  let response = state.current_response(&session, &nav, &store).await?;
  render_question(&state, &session, &nav, &response, None)
}

#[instrument(level = "info", skip(state, form), fields(session = %session.id, %index, action = ?form.action))]
pub async fn question_action(
  State(state): State<Arc<AppState>>,
  session: Session,
  Path(index): Path<usize>,
  Form(form): Form<QuestionForm>,
) -> Result<Response, AppError> {
  let questions = match load_questions(&state, &session).await? {
    Loaded::Questions(qs) => qs,
    Loaded::Page(page) => return Ok(page),
  };
  let Some(nav) = Navigator::new(&questions, index) else {
    return Ok(redirect(&session, Route::Review));
  };

  // Without a returned cookie there is nothing to edit; show the page and let
  // the browser come back with its session.
  if session.fresh {
    return Ok(redirect(&session, Route::Question(index)));
  }

  if form.action == Some(FormAction::Retreat) {
    state.drop_draft(&session).await;
    return Ok(redirect(&session, nav.retreat()));
  }

  let store = state.responses(&session);
  let mut draft = state.current_response(&session, &nav, &store).await?;
  for interaction in form.interactions() {
    input::apply(nav.current(), &mut draft, interaction);
  }

  if form.action != Some(FormAction::Advance) {
    state.put_draft(&session, draft).await;
    return Ok(redirect(&session, Route::Question(index)));
  }

  match nav.advance(&store, draft.clone()).await {
    Ok(next) => {
      state.drop_draft(&session).await;
      Ok(redirect(&session, next))
    }
    Err(AdvanceError::Invalid(e)) => {
      info!(target: "questionnaire", %index, "Advance blocked: required question unanswered");
      let notice = e.to_string();
      let page = render_question(&state, &session, &nav, &draft, Some(&notice));
      state.put_draft(&session, draft).await;
      page
    }
    Err(AdvanceError::Store(e)) => Err(e.into()),
  }
}

#[instrument(level = "info", skip(state), fields(session = %session.id))]
pub async fn review(State(state): State<Arc<AppState>>, session: Session) -> Result<Response, AppError> {
  let store = state.responses(&session);
  let review = SubmissionCoordinator::new(state.backend.as_ref(), &store, &state.labels).review().await?;
  let html = state.views.page("review", "Review Your Answers", review.notice.as_deref(), &review_view(&review.items))?;
  Ok(session.attach(Html(html)))
}

#[instrument(level = "info", skip(state), fields(session = %session.id))]
pub async fn submit(State(state): State<Arc<AppState>>, session: Session) -> Result<Response, AppError> {
  let store = state.responses(&session);
  let coordinator = SubmissionCoordinator::new(state.backend.as_ref(), &store, &state.labels);
  match coordinator.submit().await {
    Ok(outcome) => {
      state.drop_draft(&session).await;
      let html = state.views.page("result", "Your results", None, &result_view(&outcome))?;
      Ok(session.attach(Html(html)))
    }
    Err(SubmitError::Store(e)) => Err(e.into()),
    Err(e) => {
      // Stored answers are untouched; the review page offers a retry.
      let notice = e.to_string();
      let review = coordinator.review().await?;
      let html = state.views.page("review", "Review Your Answers", Some(&notice), &review_view(&review.items))?;
      Ok(session.attach(Html(html)))
    }
  }
}
