//! Domain models: questions, their options and input variants, and the
//! per-question responses collected during a session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Input modality of a question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
  /// Picking an option replaces the selection.
  SingleSelect,
  /// Picking an option toggles its membership.
  MultiSelect,
  /// Written answer, submitted with Enter or the OK control.
  FreeText,
  /// Ordinal position over the options; always holds exactly one selection.
  Slider,
}

impl Variant {
  /// Resolve the service's `type` tag. `multiple-choice` is split on the
  /// `allowMultipleSelections` flag.
  pub fn from_tag(tag: &str, allow_multiple: bool) -> Option<Self> {
    match tag {
      "multiple-choice" if allow_multiple => Some(Variant::MultiSelect),
      "multiple-choice" | "single-select" => Some(Variant::SingleSelect),
      "multi-select" => Some(Variant::MultiSelect),
      "text" | "free-text" => Some(Variant::FreeText),
      "slider" => Some(Variant::Slider),
      _ => None,
    }
  }

  pub fn is_select(self) -> bool {
    matches!(self, Variant::SingleSelect | Variant::MultiSelect)
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
  #[serde(rename = "_id")]
  pub id: String,
  pub text: String,
  /// Contribution of this option to each category score.
  #[serde(default)]
  pub score: HashMap<String, f64>,
  /// Illustration shown under slider positions.
  #[serde(default)]
  pub image: Option<String>,
}

/// Question exactly as the questions service sends it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionWire {
  #[serde(rename = "_id")]
  id: String,
  text: String,
  #[serde(rename = "type")]
  kind: String,
  #[serde(default)]
  allow_multiple_selections: bool,
  #[serde(default)]
  options: Vec<QuestionOption>,
  #[serde(default)]
  is_required: bool,
  #[serde(default)]
  category: String,
}

/// A question definition. Immutable once fetched.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "QuestionWire")]
pub struct Question {
  pub id: String,
  pub text: String,
  pub variant: Variant,
  pub options: Vec<QuestionOption>,
  pub required: bool,
  pub category: String,
}

impl TryFrom<QuestionWire> for Question {
  type Error = String;

  fn try_from(w: QuestionWire) -> Result<Self, Self::Error> {
    let variant = Variant::from_tag(&w.kind, w.allow_multiple_selections)
      .ok_or_else(|| format!("unknown question type '{}' on question {}", w.kind, w.id))?;
    Ok(Self {
      id: w.id,
      text: w.text,
      variant,
      options: w.options,
      required: w.is_required,
      category: w.category,
    })
  }
}

impl Question {
  pub fn option(&self, option_id: &str) -> Option<&QuestionOption> {
    self.options.iter().find(|o| o.id == option_id)
  }

  /// Response a question starts with the first time it is visited.
  pub fn initial_response(&self) -> Response {
    let (selected_options, written_answer) = match self.variant {
      Variant::SingleSelect | Variant::MultiSelect => (Some(Vec::new()), None),
      Variant::FreeText => (None, Some(String::new())),
      Variant::Slider => (self.options.first().map(|o| vec![o.id.clone()]), None),
    };
    Response { question_id: self.id.clone(), selected_options, written_answer }
  }
}

/// The captured answer to one question.
/// Select and slider variants use `selected_options`; free-text uses `written_answer`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
  pub question_id: String,
  pub selected_options: Option<Vec<String>>,
  pub written_answer: Option<String>,
}

impl Response {
  pub fn selection(&self) -> &[String] {
    self.selected_options.as_deref().unwrap_or(&[])
  }

  pub fn is_selected(&self, option_id: &str) -> bool {
    self.selection().iter().any(|id| id == option_id)
  }
}

/// Fresh responses for every question, in question order.
pub fn initial_responses(questions: &[Question]) -> Vec<Response> {
  questions.iter().map(Question::initial_response).collect()
}

/// Landing page copy served by the content service.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandingContent {
  #[serde(default)] pub heading: String,
  #[serde(default)] pub sub_heading: String,
  #[serde(default)] pub button_text: String,
  #[serde(default)] pub completion_time: String,
  #[serde(default)] pub logo: Option<String>,
}
