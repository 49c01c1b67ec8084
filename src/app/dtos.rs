use serde::Serialize;
use serde_json::{json, Value};
use crate::store::{Document, FieldValue, MergeFields};
use crate::utils::{text_utils, time_utils};
use super::error::Error;

pub const ANONYMOUS: &'static str = "Anonymous";
const JUST_NOW: &'static str = "Just now";

// Documents come back schemaless from the store. The
// conversions here are lenient: whatever can't be read is
// treated as absent instead of failing the whole snapshot.

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleStats {
  pub likes: u64,
  pub views: u64,
  pub last_viewed: Option<i64>
}

impl From<&Document> for ArticleStats {
  fn from(doc: &Document) -> Self {
    Self {
      likes: counter(doc, "likes"),
      views: counter(doc, "views"),
      last_viewed: doc.i64_field("lastViewed")
    }
  }
}

fn counter(doc: &Document, name: &str) -> u64 {
  doc.data.get(name).and_then(Value::as_u64).unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
  pub id: String,
  pub name: String,
  pub text: String,
  // Missing until the server timestamp is known.
  pub timestamp: Option<i64>
}

impl Comment {
  // A document without any text isn't a comment we can show.
  pub fn from_document(doc: &Document) -> Option<Comment> {
    let text = doc.str_field("text")?;
    if text_utils::is_blank(text) {
      return None;
    }
    Some(Comment {
      id: doc.id.clone(),
      name: display_name(doc.str_field("name").unwrap_or("")),
      text: text.to_string(),
      timestamp: doc.i64_field("timestamp")
    })
  }

  pub fn initial(&self) -> String {
    text_utils::initial(&self.name)
  }

  pub fn display_date(&self) -> String {
    self.timestamp
      .and_then(|ts| time_utils::timestamp_millis_to_date_string(
        ts,
        time_utils::DateFormat::USCompact
      ))
      .unwrap_or(String::from(JUST_NOW))
  }
}

pub fn display_name(name: &str) -> String {
  if text_utils::is_blank(name) {
    String::from(ANONYMOUS)
  } else {
    name.to_string()
  }
}

/// A validated comment ready to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
  pub name: String,
  pub text: String
}

impl NewComment {
  // The body is sent as typed, only the blank check trims.
  pub fn new(name: &str, text: &str) -> Result<NewComment, Error> {
    if text_utils::is_blank(text) {
      return Err(Error::Validation(String::from("Comment body cannot be empty")));
    }
    Ok(NewComment {
      name: display_name(name),
      text: text.to_string()
    })
  }
}

impl From<NewComment> for MergeFields {
  fn from(comment: NewComment) -> Self {
    let mut fields = MergeFields::new();
    fields.insert(String::from("name"), FieldValue::Set(json!(comment.name)));
    fields.insert(String::from("text"), FieldValue::Set(json!(comment.text)));
    fields.insert(String::from("timestamp"), FieldValue::ServerTimestamp);
    fields
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactMessage {
  pub name: String,
  pub email: String,
  pub message: String
}

impl From<ContactMessage> for MergeFields {
  fn from(message: ContactMessage) -> Self {
    let mut fields = MergeFields::new();
    fields.insert(String::from("name"), FieldValue::Set(json!(message.name)));
    fields.insert(String::from("email"), FieldValue::Set(json!(message.email)));
    fields.insert(String::from("message"), FieldValue::Set(json!(message.message)));
    fields.insert(String::from("timestamp"), FieldValue::ServerTimestamp);
    fields
  }
}

// Following structs are the data models handed to the
// template engine.

#[derive(Debug, Serialize)]
pub struct CommentEntry {
  pub initial: String,
  pub name: String,
  pub date: String,
  pub text: String
}

impl From<&Comment> for CommentEntry {
  fn from(comment: &Comment) -> Self {
    Self {
      initial: comment.initial(),
      name: comment.name.clone(),
      date: comment.display_date(),
      text: comment.text.clone()
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ArticlePanel {
  pub heart: &'static str,
  pub liked: bool,
  pub likes_label: String,
  pub views_label: String,
  pub share_url: String,
  pub comments: Vec<CommentEntry>,
  pub form_name: String,
  pub form_text: String,
  pub submit_label: &'static str,
  pub submitting: bool
}

#[derive(Debug, Serialize)]
pub struct ContactPanel {
  pub success: bool,
  pub name: String,
  pub email: String,
  pub message: String,
  pub button_label: &'static str,
  pub sending: bool,
  pub countdown_label: String
}
