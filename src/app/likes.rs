use log::{debug, error, info};
use crate::store::{FieldValue, MergeFields};
use crate::writer::{PendingWrite, WriteOp};
use super::error::Error;
use super::ClientContext;

#[derive(Debug)]
pub enum LikeOutcome {
  /// Nothing was sent, the button should already be disabled.
  AlreadyLiked,
  /// The increment is queued. The handle can be awaited or dropped.
  Sent(PendingWrite),
  /// The increment never left. The local flag stays set anyway.
  Lost(Error)
}

/// One-way like button. The count shown next to it comes from
/// the stats subscription, this only owns the "did I click" part.
pub struct LikeToggle {
  ctx: ClientContext,
  article_id: String,
  liked: bool
}

impl LikeToggle {

  pub fn new(ctx: &ClientContext, article_id: &str) -> Self {
    let liked = match ctx.flags().is_liked(article_id) {
      Ok(liked) => liked,
      Err(e) => {
        error!("Could not read the liked flag for {} - {}", article_id, e);
        false
      }
    };
    Self {
      ctx: ctx.clone(),
      article_id: article_id.to_string(),
      liked
    }
  }

  pub fn is_liked(&self) -> bool {
    self.liked
  }

  pub fn like(&mut self) -> LikeOutcome {
    if self.liked {
      debug!("Article {} is already liked, ignoring", self.article_id);
      return LikeOutcome::AlreadyLiked;
    }
    // Optimistic: local state and the durable flag flip before
    // the store hears about it, and are never rolled back.
    self.liked = true;
    if let Err(e) = self.ctx.flags().mark_liked(&self.article_id) {
      error!("Could not persist the liked flag for {} - {}", self.article_id, e);
    }
    let mut fields = MergeFields::new();
    fields.insert(String::from("likes"), FieldValue::Increment(1));
    let op = WriteOp::UpsertMerge {
      path: self.ctx.paths().stats_doc(&self.article_id),
      fields
    };
    match self.ctx.writer().submit(op) {
      Ok(pending) => {
        info!("Liked article {}", self.article_id);
        LikeOutcome::Sent(pending)
      },
      Err(e) => {
        error!("Like for {} was lost - {}", self.article_id, e);
        LikeOutcome::Lost(e)
      }
    }
  }

}
