//! Turns user interaction into changes of the current question's response.
//!
//! Only the transient draft is touched here; committing to the response store
//! is the navigator's job on advance. Enter in the text field submits the
//! question form through its OK control, so it needs no case of its own.

use tracing::debug;

use crate::domain::{Question, Response, Variant};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interaction {
  /// An option was clicked (select variants).
  Select(String),
  /// The text field now holds this value.
  Type(String),
  /// The slider moved to this 1-based position.
  Slide(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
  Updated,
  /// Interaction does not apply to this question.
  Ignored,
}

pub fn apply(question: &Question, response: &mut Response, interaction: Interaction) -> Effect {
  let effect = match (question.variant, interaction) {
    (Variant::SingleSelect, Interaction::Select(id)) if question.option(&id).is_some() => {
      response.selected_options = Some(vec![id]);
      Effect::Updated
    }
    (Variant::MultiSelect, Interaction::Select(id)) if question.option(&id).is_some() => {
      toggle(response, id);
      Effect::Updated
    }
    (Variant::FreeText, Interaction::Type(text)) => {
      response.written_answer = Some(text);
      Effect::Updated
    }
    (Variant::Slider, Interaction::Slide(ordinal)) => match option_at(question, ordinal) {
      Some(id) => {
        response.selected_options = Some(vec![id]);
        Effect::Updated
      }
      None => Effect::Ignored,
    },
    _ => Effect::Ignored,
  };
  debug!(target: "questionnaire", question = %question.id, ?effect, "Interaction applied");
  effect
}

fn toggle(response: &mut Response, id: String) {
  let selection = response.selected_options.get_or_insert_with(Vec::new);
  if let Some(pos) = selection.iter().position(|s| *s == id) {
    selection.remove(pos);
  } else {
    selection.push(id);
  }
}

/// Option identifier at a 1-based slider position, clamped into range.
pub fn option_at(question: &Question, ordinal: u32) -> Option<String> {
  let last = question.options.len().checked_sub(1)?;
  let idx = (ordinal.max(1) as usize - 1).min(last);
  Some(question.options[idx].id.clone())
}

/// 1-based slider position of the current selection (1 when unset).
pub fn ordinal_of(question: &Question, response: &Response) -> u32 {
  response
    .selection()
    .first()
    .and_then(|id| question.options.iter().position(|o| o.id == *id))
    .map(|pos| pos as u32 + 1)
    .unwrap_or(1)
}
