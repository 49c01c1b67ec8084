use log::info;
use super::comments::{CommentForm, CommentStream};
use super::dtos::{ArticlePanel, ArticleStats, Comment, CommentEntry};
use super::error::Error;
use super::helpers;
use super::likes::{LikeOutcome, LikeToggle};
use super::stats::StatsFeed;
use super::views::{record_view, ViewOutcome};
use super::ClientContext;
use crate::writer::PendingWrite;

/// Everything shown under an article: counters, like button,
/// share link and the discussion. Opening one counts the view.
/// Opening and closing never fail, whatever the store does.
pub struct ArticleView {
  ctx: ClientContext,
  article_id: String,
  view: ViewOutcome,
  stats: StatsFeed,
  likes: LikeToggle,
  comments: CommentStream
}

impl ArticleView {

  pub fn open(ctx: &ClientContext, article_id: &str) -> Self {
    info!("Opening article view for {}", article_id);
    let view = record_view(ctx, article_id);
    Self {
      ctx: ctx.clone(),
      article_id: article_id.to_string(),
      view,
      stats: StatsFeed::open(ctx, article_id),
      likes: LikeToggle::new(ctx, article_id),
      comments: CommentStream::open(ctx, article_id)
    }
  }

  pub fn article_id(&self) -> &str {
    &self.article_id
  }

  pub fn view_outcome(&self) -> ViewOutcome {
    self.view
  }

  pub fn stats(&self) -> ArticleStats {
    self.stats.current()
  }

  pub fn likes(&self) -> u64 {
    self.stats.current().likes
  }

  pub fn views(&self) -> u64 {
    self.stats.current().views
  }

  pub fn is_liked(&self) -> bool {
    self.likes.is_liked()
  }

  pub fn like(&mut self) -> LikeOutcome {
    self.likes.like()
  }

  pub fn comments(&self) -> Vec<Comment> {
    self.comments.comments()
  }

  pub fn set_comment_name(&self, name: &str) {
    self.comments.set_name(name);
  }

  pub fn set_comment_text(&self, text: &str) {
    self.comments.set_text(text);
  }

  pub fn comment_form(&self) -> CommentForm {
    self.comments.form()
  }

  pub fn submit_comment(&self) -> Result<PendingWrite, Error> {
    self.comments.submit()
  }

  pub fn share_url(&self) -> String {
    format!(
      "{}/post/{}",
      self.ctx.settings().site_root.trim_end_matches('/'),
      self.article_id
    )
  }

  pub fn is_live(&self) -> bool {
    self.stats.is_live() || self.comments.is_live()
  }

  /// Waits for the next push on either subscription. False
  /// once the view is closed.
  pub async fn changed(&mut self) -> bool {
    let stats_live = self.stats.is_live();
    let comments_live = self.comments.is_live();
    tokio::select! {
      changed = self.stats.changed(), if stats_live => changed,
      changed = self.comments.changed(), if comments_live => changed,
      else => false
    }
  }

  /// Template model of the whole bar and discussion.
  pub fn panel(&self) -> ArticlePanel {
    let stats = self.stats.current();
    let liked = self.likes.is_liked();
    let form = self.comments.form();
    let submitting = self.comments.is_submitting();
    ArticlePanel {
      heart: helpers::heart(liked),
      liked,
      likes_label: helpers::likes_label(stats.likes),
      views_label: helpers::views_label(stats.views),
      share_url: self.share_url(),
      comments: self.comments.comments().iter().map(CommentEntry::from).collect(),
      form_name: form.name,
      form_text: form.text,
      submit_label: helpers::comment_button_label(submitting),
      submitting
    }
  }

  /// Releases both subscriptions before returning. Anything the
  /// store pushes afterwards is ignored.
  pub fn close(&mut self) {
    self.stats.close();
    self.comments.close();
  }

}

impl Drop for ArticleView {
  fn drop(&mut self) {
    self.close();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use crate::app::tests::{context, context_with_flags};
  use crate::flags::{FlagStore, MemoryFlagStore};
  use crate::store::FieldValue;
  use crate::testing::RecordingStore;

  #[tokio::test]
  async fn intro_to_rust_scenario() {
    let store = Arc::new(RecordingStore::new());
    let durable = Arc::new(MemoryFlagStore::new());
    let ctx = context_with_flags(store.clone(), durable.clone(), Arc::new(MemoryFlagStore::new()));
    let mut view = ArticleView::open(&ctx, "intro-to-rust");
    assert_eq!(ViewOutcome::Counted, view.view_outcome());
    ctx.flush().await.unwrap();
    assert_eq!(1, view.views());
    assert_eq!(0, view.likes());

    match view.like() {
      LikeOutcome::Sent(pending) => { pending.settled().await.unwrap(); },
      other => panic!("unexpected outcome {:?}", other)
    }
    assert_eq!(Some(String::from("true")), durable.get("liked_intro-to-rust").unwrap());
    assert_eq!(1, view.likes());
    assert!(matches!(view.like(), LikeOutcome::AlreadyLiked));
    ctx.flush().await.unwrap();
    let merges = store.merges();
    assert_eq!(2, merges.len());
    assert_eq!(Some(&FieldValue::Increment(1)), merges[0].1.get("views"));
    assert_eq!(Some(&FieldValue::Increment(1)), merges[1].1.get("likes"));

    view.set_comment_name("");
    view.set_comment_text("Great post!");
    view.submit_comment().unwrap().settled().await.unwrap();
    let comments = view.comments();
    assert_eq!("Anonymous", comments[0].name);
    assert_eq!("Great post!", comments[0].text);

    let panel = view.panel();
    assert_eq!("❤️", panel.heart);
    assert_eq!("1 Likes", panel.likes_label);
    assert_eq!("1 Views", panel.views_label);
    assert_eq!("A", panel.comments[0].initial);
    assert_eq!("", panel.form_text);
  }

  #[tokio::test]
  async fn reopening_in_the_same_session_does_not_count() {
    let store = Arc::new(RecordingStore::new());
    let ctx = context(store.clone());
    drop(ArticleView::open(&ctx, "a"));
    let view = ArticleView::open(&ctx, "a");
    assert_eq!(ViewOutcome::AlreadyCounted, view.view_outcome());
    ctx.flush().await.unwrap();
    assert_eq!(1, view.views());
  }

  #[tokio::test]
  async fn share_url_points_to_the_post() {
    let store = Arc::new(RecordingStore::new());
    let ctx = context(store);
    let view = ArticleView::open(&ctx, "intro-to-rust");
    assert_eq!("https://lairsbug-blogs.netlify.app/post/intro-to-rust", view.share_url());
  }

  #[tokio::test]
  async fn teardown_releases_everything() {
    let store = Arc::new(RecordingStore::new());
    let ctx = context(store.clone());
    let other = context(store.clone());
    let mut view = ArticleView::open(&ctx, "a");
    ctx.flush().await.unwrap();
    assert_eq!(2, store.listener_count());
    view.close();
    assert_eq!(0, store.listener_count());
    assert!(!view.is_live());

    let mut remote = ArticleView::open(&other, "a");
    let _ = remote.like();
    remote.set_comment_text("too late");
    remote.submit_comment().unwrap().settled().await.unwrap();
    other.flush().await.unwrap();

    assert_eq!(0, view.likes());
    assert_eq!(1, view.views());
    assert!(view.comments().is_empty());
    assert!(!view.changed().await);
    remote.close();
    assert_eq!(0, store.listener_count());
  }

  #[tokio::test]
  async fn unreachable_feeds_never_block_the_view() {
    let store = Arc::new(RecordingStore::new());
    store.fail_subscriptions(true);
    let ctx = context(store.clone());
    let mut view = ArticleView::open(&ctx, "a");
    assert_eq!(ViewOutcome::Counted, view.view_outcome());
    assert!(!view.is_live());

    match view.like() {
      LikeOutcome::Sent(pending) => { pending.settled().await.unwrap(); },
      other => panic!("unexpected outcome {:?}", other)
    }
    view.set_comment_text("still works");
    view.submit_comment().unwrap().settled().await.unwrap();
    ctx.flush().await.unwrap();

    // Writes landed, the view just never hears about them:
    let doc = store.stats_document("a");
    assert_eq!(Some(1), doc.i64_field("views"));
    assert_eq!(Some(1), doc.i64_field("likes"));
    assert_eq!(1, store.comment_documents("a").len());
    assert_eq!(0, view.likes());
    assert_eq!(0, view.views());
    assert!(view.is_liked());
    assert!(view.comments().is_empty());
    assert_eq!("", view.comment_form().text);
    assert!(!view.changed().await);
    assert_eq!("0 Views", view.panel().views_label);

    view.close();
    assert_eq!(0, store.listener_count());
  }
}
