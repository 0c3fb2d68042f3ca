//! Page templates (Handlebars, HTML-escaped) and the view models fed to them.

use handlebars::{Handlebars, RenderError, TemplateError};
use serde_json::{json, Value};
use tracing::warn;

use crate::domain::{LandingContent, Response, Variant};
use crate::input::ordinal_of;
use crate::navigator::{Navigator, Route};
use crate::submission::{Answer, Outcome, ReviewItem};

const TEMPLATES: &[(&str, &str)] = &[
  ("layout", include_str!("../templates/layout.hbs")),
  ("landing", include_str!("../templates/landing.hbs")),
  ("question", include_str!("../templates/question.hbs")),
  ("message", include_str!("../templates/message.hbs")),
  ("review", include_str!("../templates/review.hbs")),
  ("result", include_str!("../templates/result.hbs")),
];

pub struct Views {
  hb: Handlebars<'static>,
}

impl Views {
  pub fn new() -> Result<Self, TemplateError> {
    let mut hb = Handlebars::new();
    for (name, src) in TEMPLATES {
      hb.register_template_string(name, *src)?;
    }
    Ok(Self { hb })
  }

  /// Renders `template` into the shared layout. `notice` shows as an alert
  /// banner; a `logo` in `data` replaces the default one.
  pub fn page(&self, template: &str, title: &str, notice: Option<&str>, data: &Value) -> Result<String, RenderError> {
    let body = self.hb.render(template, data)?;
    self.hb.render("layout", &json!({ "title": title, "notice": notice, "logo": data.get("logo"), "body": body }))
  }
}

/// Option letters A, B, C...; past Z the position number is used.
pub fn option_letter(index: usize) -> String {
  u8::try_from(index)
    .ok()
    .filter(|i| *i < 26)
    .map(|i| char::from(b'A' + i).to_string())
    .unwrap_or_else(|| (index + 1).to_string())
}

/// Service-supplied image URLs are used only when absolute http(s) or
/// site-relative.
pub fn safe_image_url(url: &str) -> Option<&str> {
  let url = url.trim();
  let lower = url.to_ascii_lowercase();
  let ok = lower.starts_with("https://")
    || lower.starts_with("http://")
    || (url.starts_with('/') && !url.starts_with("//"));
  if !ok && !url.is_empty() {
    warn!(target: "intake_frontend", "Ignoring image URL with unsupported scheme");
  }
  ok.then_some(url)
}

pub fn landing_view(content: &LandingContent) -> Value {
  let button_text = if content.button_text.is_empty() { "Start" } else { content.button_text.as_str() };
  json!({
    "heading": content.heading,
    "sub_heading": content.sub_heading,
    "button_text": button_text,
    "completion_time": content.completion_time,
    "logo": content.logo.as_deref().and_then(safe_image_url),
    "start": Route::Question(0).path(),
  })
}

pub fn question_view(nav: &Navigator<'_>, response: &Response) -> Value {
  let q = nav.current();
  let options: Vec<Value> = q
    .options
    .iter()
    .enumerate()
    .map(|(i, o)| json!({
      "id": o.id,
      "text": o.text,
      "letter": option_letter(i),
      "selected": response.is_selected(&o.id),
      "image": o.image.as_deref().and_then(safe_image_url),
    }))
    .collect();

  let ordinal = ordinal_of(q, response);
  let slider_option = q.options.get(ordinal as usize - 1);

  json!({
    "number": nav.index() + 1,
    "total": nav.total(),
    "text": q.text,
    "required": q.required,
    "is_select": q.variant.is_select(),
    "is_multi": q.variant == Variant::MultiSelect,
    "is_text": q.variant == Variant::FreeText,
    "is_slider": q.variant == Variant::Slider,
    "options": options,
    "answer": response.written_answer.as_deref().unwrap_or(""),
    "ordinal": ordinal,
    "max_ordinal": q.options.len().max(1),
    "slider_label": slider_option.map(|o| o.text.as_str()),
    "slider_image": slider_option.and_then(|o| o.image.as_deref()).and_then(safe_image_url),
    "action": Route::Question(nav.index()).path(),
    "prev": nav.prev().path(),
    "next": nav.next().path(),
  })
}

pub fn review_view(items: &[ReviewItem]) -> Value {
  let items: Vec<Value> = items
    .iter()
    .map(|item| {
      let (written, options) = match &item.answer {
        Answer::Written(text) => (Some(text.as_str()), Vec::new()),
        Answer::Options(labels) => (None, labels.clone()),
        Answer::Unanswered => (None, Vec::new()),
      };
      json!({
        "number": item.number,
        "question": item.question,
        "written": written,
        "options": options,
        "edit": item.edit.map(|r| r.path()),
      })
    })
    .collect();
  json!({ "items": items, "submit": Route::Review.path() })
}

pub fn result_view(outcome: &Outcome) -> Value {
  json!({
    "name": outcome.name,
    "recommendation": outcome.recommendation,
    "home": Route::Landing.path(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Question, QuestionOption};

  fn slider() -> Vec<Question> {
    vec![Question {
      id: "energy".into(),
      text: "Energy <level>".into(),
      variant: Variant::Slider,
      options: vec![
        QuestionOption { id: "lo".into(), text: "Low".into(), score: Default::default(), image: Some("/lo.png".into()) },
        QuestionOption { id: "hi".into(), text: "High".into(), score: Default::default(), image: None },
      ],
      required: true,
      category: String::new(),
    }]
  }

  #[test]
  fn only_http_or_relative_images_are_used() {
    assert_eq!(safe_image_url("https://cdn.test/logo.png"), Some("https://cdn.test/logo.png"));
    assert_eq!(safe_image_url("/logo.svg"), Some("/logo.svg"));
    assert_eq!(safe_image_url("javascript:alert(1)"), None);
    assert_eq!(safe_image_url("JavaScript:alert(1)"), None);
    assert_eq!(safe_image_url("data:image/svg+xml;base64,AAAA"), None);
    assert_eq!(safe_image_url("//evil.test/x.png"), None);
  }

  #[test]
  fn landing_drops_unsafe_logo() {
    let content = LandingContent { logo: Some("javascript:alert(1)".into()), ..Default::default() };
    let views = Views::new().unwrap();
    let html = views.page("landing", "Welcome", None, &landing_view(&content)).unwrap();
    assert!(!html.contains("javascript:"));
    assert!(html.contains(r#"src="/logo.svg""#));
  }

  #[test]
  fn letters_run_a_to_z() {
    assert_eq!(option_letter(0), "A");
    assert_eq!(option_letter(25), "Z");
    assert_eq!(option_letter(26), "27");
  }

  #[test]
  fn templates_register_and_escape() {
    let views = Views::new().unwrap();
    let qs = slider();
    let nav = Navigator::new(&qs, 0).unwrap();
    let html = views.page("question", "Question 1", Some("Please answer"), &question_view(&nav, &qs[0].initial_response())).unwrap();
    assert!(html.contains("Energy &lt;level&gt;"));
    assert!(html.contains("Please answer"));
    assert!(html.contains(r#"href="/submit""#));
    assert!(html.contains(r#"href="/""#));
  }

  #[test]
  fn slider_view_tracks_selected_position() {
    let qs = slider();
    let nav = Navigator::new(&qs, 0).unwrap();
    let mut r = qs[0].initial_response();
    let v = question_view(&nav, &r);
    assert_eq!(v["ordinal"], 1);
    assert_eq!(v["slider_label"], "Low");
    assert_eq!(v["slider_image"], "/lo.png");

    r.selected_options = Some(vec!["hi".into()]);
    let v = question_view(&nav, &r);
    assert_eq!(v["ordinal"], 2);
    assert_eq!(v["max_ordinal"], 2);
    assert_eq!(v["slider_image"], Value::Null);
  }

  #[test]
  fn review_view_splits_answer_kinds() {
    let items = vec![
      ReviewItem { number: 1, question: "Name".into(), answer: Answer::Written("Kai".into()), edit: Some(Route::Question(0)) },
      ReviewItem { number: 2, question: "Gone".into(), answer: Answer::Unanswered, edit: None },
    ];
    let v = review_view(&items);
    assert_eq!(v["items"][0]["written"], "Kai");
    assert_eq!(v["items"][0]["edit"], "/questions/0");
    assert_eq!(v["items"][1]["written"], Value::Null);
    assert_eq!(v["items"][1]["edit"], Value::Null);
  }
}
