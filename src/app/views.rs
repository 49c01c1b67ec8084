use log::{debug, error};
use crate::store::{FieldValue, MergeFields};
use crate::writer::WriteOp;
use super::ClientContext;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewOutcome {
  Counted,
  AlreadyCounted,
  // The session flag couldn't be read or written. Not counting
  // is the safe side of at-most-once.
  Skipped
}

/// Counts one view per article and per session. Safe to call on
/// every render, only the first call in a session sends anything.
/// Never fails: a lost view is acceptable.
pub fn record_view(ctx: &ClientContext, article_id: &str) -> ViewOutcome {
  let flags = ctx.flags();
  match flags.is_viewed(article_id) {
    Ok(true) => {
      debug!("Article {} already counted in this session", article_id);
      return ViewOutcome::AlreadyCounted;
    },
    Ok(false) => (),
    Err(e) => {
      error!("Could not read the viewed flag for {} - {}", article_id, e);
      return ViewOutcome::Skipped;
    }
  }
  // Flag first: if it can't be stored, a re-render could count
  // the view a second time.
  if let Err(e) = flags.mark_viewed(article_id) {
    error!("Could not set the viewed flag for {} - {}", article_id, e);
    return ViewOutcome::Skipped;
  }
  let mut fields = MergeFields::new();
  fields.insert(String::from("views"), FieldValue::Increment(1));
  fields.insert(String::from("lastViewed"), FieldValue::ServerTimestamp);
  let op = WriteOp::UpsertMerge {
    path: ctx.paths().stats_doc(article_id),
    fields
  };
  if let Err(e) = ctx.writer().fire(op) {
    // No retry, that view is gone for this session.
    error!("View increment for {} was lost - {}", article_id, e);
  }
  ViewOutcome::Counted
}
