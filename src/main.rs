use std::env;
use std::sync::Arc;
use std::time::Duration;
use color_eyre::Result;
use eyre::{eyre, WrapErr};
use dotenv::dotenv;
use getopts::Options;
use log::{debug, error, info};
use lairsbug_interactions::app::{ArticleView, ClientContext, ContactForm, LikeOutcome};
use lairsbug_interactions::config::{Config, InteractionSettings};
use lairsbug_interactions::db::{open_file_pool, SqliteStore};
use lairsbug_interactions::flags::{MemoryFlagStore, SqliteFlagStore};
use lairsbug_interactions::render::Renderer;
use lairsbug_interactions::utils::time_utils::{timestamp_millis_to_date_string, DateFormat};

// Copy pasted this from getopts doc.
fn print_usage(program: &str, opts: Options) {
  let brief = format!("Usage: {} [options]", program);
  print!("{}", opts.usage(&brief));
}

/**
 * Opens a fresh session on the interactions database, does
 * whatever was asked on the command line and prints the
 * resulting panels. Every run counts as a new browser tab,
 * the liked flags survive between runs though.
 */
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  dotenv().ok();
  env_logger::Builder::from_env(
    env_logger::Env::default().default_filter_or("info")
  ).init();
  color_eyre::install()?;

  let args: Vec<String> = env::args().collect();
  let program = args[0].clone();
  let mut opts = Options::new();
  opts.optopt("a", "article", "Open the view of an article", "ARTICLE_ID");
  opts.optflag("l", "like", "Like the article");
  opts.optopt("c", "comment", "Post a comment on the article", "TEXT");
  opts.optopt("n", "name", "Name to post the comment under", "NAME");
  opts.optopt("w", "watch", "Keep printing the article panel on changes", "SECONDS");
  opts.optopt("", "contact-name", "Name for the contact form", "NAME");
  opts.optopt("", "contact-email", "Email for the contact form", "EMAIL");
  opts.optopt("", "contact-message", "Send a contact message", "MESSAGE");
  opts.optflag("h", "help", "Program usage");
  let opt_matches = opts.parse(&args[1..])?;
  if opt_matches.opt_present("h") {
    print_usage(&program, opts);
    return Ok(());
  }

  let config = Config::from_env()?;
  debug!("Current config: {:?}", config);

  let pool = open_file_pool(&config.db_path)?;
  let store = Arc::new(SqliteStore::open(pool)?);
  let flags_pool = open_file_pool(&config.flags_db_path)?;
  let durable = Arc::new(SqliteFlagStore::open(flags_pool)?);
  let session = Arc::new(MemoryFlagStore::new());
  let settings: InteractionSettings = config.into();
  let ctx = ClientContext::open(store, durable, session, settings)?;
  let renderer = Renderer::new()?;

  if let Some(article_id) = opt_matches.opt_str("a") {
    let mut view = ArticleView::open(&ctx, &article_id);

    if opt_matches.opt_present("l") {
      match view.like() {
        LikeOutcome::AlreadyLiked => info!("You already liked {}", article_id),
        LikeOutcome::Sent(pending) => {
          if let Err(e) = pending.settled().await {
            error!("Like didn't make it - {}", e);
          }
        },
        LikeOutcome::Lost(e) => error!("Like didn't make it - {}", e)
      }
    }

    if let Some(text) = opt_matches.opt_str("c") {
      view.set_comment_name(&opt_matches.opt_str("n").unwrap_or_default());
      view.set_comment_text(&text);
      match view.submit_comment() {
        Ok(pending) => {
          if let Err(e) = pending.settled().await {
            error!("Comment didn't make it - {}", e);
          }
        },
        Err(e) => error!("Comment refused - {}", e)
      }
    }

    ctx.flush().await?;
    println!("{}", renderer.render_article(&view.panel())?);
    if let Some(last_viewed) = view.stats().last_viewed.and_then(|ts|
      timestamp_millis_to_date_string(ts, DateFormat::Standard)
    ) {
      info!("{} was last viewed on {} (UTC)", article_id, last_viewed);
    }

    if let Some(seconds) = opt_matches.opt_str("w") {
      let seconds: u64 = seconds.parse()
        .context("Watch duration has to be a number of seconds")?;
      let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);
      info!("Watching {} for {} seconds...", article_id, seconds);
      loop {
        match tokio::time::timeout_at(deadline, view.changed()).await {
          Ok(true) => println!("{}", renderer.render_article(&view.panel())?),
          Ok(false) => break,
          // Deadline reached:
          Err(_) => break
        }
      }
    }
    view.close();
  }

  if let Some(message) = opt_matches.opt_str("contact-message") {
    let form = ContactForm::new(&ctx);
    form.set_name(&opt_matches.opt_str("contact-name").unwrap_or_default());
    form.set_email(&opt_matches.opt_str("contact-email").unwrap_or_default());
    form.set_message(&message);
    let submission = form.submit()
      .map_err(|e| eyre!("Contact message refused - {}", e))?;
    if let Err(e) = submission.settled().await {
      error!("Contact message didn't make it - {}", e);
    }
    println!("{}", renderer.render_contact(&form.panel())?);
  }

  ctx.flush().await?;
  Ok(())
}
