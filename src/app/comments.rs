use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use log::{debug, error, info, warn};
use crate::store::{CollectionQuery, Document, Order, OrderBy, Subscription};
use crate::writer::{PendingWrite, WriteOp};
use super::dtos::{Comment, NewComment};
use super::error::Error;
use super::helpers;
use super::ClientContext;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubmitState {
  Idle,
  Submitting
}

/// What the comment form currently holds.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentForm {
  pub name: String,
  pub text: String,
  pub state: SubmitState
}

impl Default for CommentForm {
  fn default() -> Self {
    Self {
      name: String::new(),
      text: String::new(),
      state: SubmitState::Idle
    }
  }
}

/// Live list of the most recent comments of an article plus the
/// form used to append new ones.
pub struct CommentStream {
  ctx: ClientContext,
  article_id: String,
  window: usize,
  feed: Option<Subscription<Vec<Document>>>,
  // What's shown once the feed is gone.
  frozen: Vec<Comment>,
  form: Arc<Mutex<CommentForm>>
}

impl CommentStream {

  /// Never fails: without a subscription the list just stays empty.
  pub fn open(ctx: &ClientContext, article_id: &str) -> Self {
    let window = ctx.settings().comment_window;
    let query = CollectionQuery::new(ctx.paths().comments(article_id))
      .order(OrderBy::new(Order::Desc, "timestamp"))
      .limit(window);
    let feed = match ctx.store().subscribe_query(&query) {
      Ok(feed) => Some(feed),
      Err(e) => {
        warn!("Could not subscribe to comments of {} - {}", article_id, e);
        None
      }
    };
    Self {
      ctx: ctx.clone(),
      article_id: article_id.to_string(),
      window,
      feed,
      frozen: Vec::new(),
      form: Arc::new(Mutex::new(CommentForm::default()))
    }
  }

  /// Newest first, at most one window worth of comments, as of
  /// the latest push.
  pub fn comments(&self) -> Vec<Comment> {
    match &self.feed {
      Some(feed) => feed.latest()
        .map(|docs| to_comments(&docs, self.window))
        .unwrap_or_default(),
      None => self.frozen.clone()
    }
  }

  pub fn is_live(&self) -> bool {
    self.feed.as_ref().map(Subscription::is_active).unwrap_or(false)
  }

  /// Waits for the next push. False once closed or if the
  /// subscription never opened.
  pub async fn changed(&mut self) -> bool {
    match self.feed.as_mut() {
      Some(feed) => feed.changed().await,
      None => false
    }
  }

  /// Releases the subscription. The list keeps showing the last
  /// pushed comments and never changes again.
  pub fn close(&mut self) {
    if let Some(mut feed) = self.feed.take() {
      self.frozen = feed.latest()
        .map(|docs| to_comments(&docs, self.window))
        .unwrap_or_default();
      feed.unsubscribe();
      debug!("Comment stream of {} closed", self.article_id);
    }
  }

  pub fn set_name(&self, name: &str) {
    lock(&self.form).name = name.to_string();
  }

  pub fn set_text(&self, text: &str) {
    lock(&self.form).text = text.to_string();
  }

  pub fn form(&self) -> CommentForm {
    lock(&self.form).clone()
  }

  pub fn is_submitting(&self) -> bool {
    lock(&self.form).state == SubmitState::Submitting
  }

  pub fn button_label(&self) -> &'static str {
    helpers::comment_button_label(self.is_submitting())
  }

  /// Appends the comment in the form. Refused while another one is
  /// in flight and when the body is blank, leaving the form as is.
  /// The text is cleared once the store accepted the comment; on
  /// failure it stays there for a manual retry.
  pub fn submit(&self) -> Result<PendingWrite, Error> {
    let comment = {
      let mut form = lock(&self.form);
      if form.state == SubmitState::Submitting {
        return Err(Error::Busy);
      }
      let comment = NewComment::new(&form.name, &form.text)?;
      form.state = SubmitState::Submitting;
      comment
    };
    let form = self.form.clone();
    let article_id = self.article_id.clone();
    let op = WriteOp::Append {
      collection: self.ctx.paths().comments(&self.article_id),
      fields: comment.into()
    };
    let pending = self.ctx.writer().submit_with(op, move |result| {
      let mut form = lock(&form);
      form.state = SubmitState::Idle;
      match result {
        Ok(_) => {
          info!("Comment posted on {}", article_id);
          form.text.clear();
        },
        Err(e) => error!("Error posting comment on {}: {}", article_id, e)
      }
    });
    if pending.is_err() {
      lock(&self.form).state = SubmitState::Idle;
    }
    pending
  }

}

impl Drop for CommentStream {
  fn drop(&mut self) {
    self.close();
  }
}

// A panic while holding the form can't leave it in a state
// worse than what the user typed, so poisoning is ignored.
fn lock(form: &Mutex<CommentForm>) -> MutexGuard<'_, CommentForm> {
  form.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_comments(docs: &[Document], window: usize) -> Vec<Comment> {
  docs.iter()
    .filter_map(|doc| {
      let comment = Comment::from_document(doc);
      if comment.is_none() {
        warn!("Skipping unreadable comment document {}", doc.id);
      }
      comment
    })
    .take(window)
    .collect()
}
