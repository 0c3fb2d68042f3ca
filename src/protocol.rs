//! Request/response DTOs for the page forms and the JSON endpoints.

use serde::{Deserialize, Serialize};

use crate::input::Interaction;

/// Which navigation control submitted the question form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormAction {
    Advance,
    Retreat,
}

/// Body of `POST /questions/{index}`.
///
/// Option buttons post `select`, the text field posts `answer`, the slider
/// posts `ordinal`. The OK and Back buttons add `action`.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionForm {
    #[serde(default)]
    pub action: Option<FormAction>,
    #[serde(default)]
    pub select: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub ordinal: Option<u32>,
}

impl QuestionForm {
    pub fn interactions(&self) -> Vec<Interaction> {
        let mut out = Vec::new();
        if let Some(text) = &self.answer {
            out.push(Interaction::Type(text.clone()));
        }
        if let Some(ordinal) = self.ordinal {
            out.push(Interaction::Slide(ordinal));
        }
        if let Some(id) = &self.select {
            out.push(Interaction::Select(id.clone()));
        }
        out
    }
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
