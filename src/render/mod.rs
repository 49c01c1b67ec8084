// Plain text rendering of the interaction panels, meant for
// a terminal. The templates are compiled into the binary so
// the CLI works from any directory.

use color_eyre::Result;
use eyre::WrapErr;
use handlebars::Handlebars;
use crate::app::dtos::{ArticlePanel, ContactPanel};

const ARTICLE_TEMPLATE: &'static str = include_str!("../../templates/article.hbs");
const CONTACT_TEMPLATE: &'static str = include_str!("../../templates/contact.hbs");

pub struct Renderer {
  hb: Handlebars<'static>
}

impl Renderer {

  pub fn new() -> Result<Renderer> {
    let mut hb = Handlebars::new();
    // Not HTML, escaping would mangle quotes in comments.
    hb.register_escape_fn(handlebars::no_escape);
    hb.set_strict_mode(true);
    hb.register_template_string("article", ARTICLE_TEMPLATE)
      .context("Registering the article template")?;
    hb.register_template_string("contact", CONTACT_TEMPLATE)
      .context("Registering the contact template")?;
    Ok(Renderer { hb })
  }

  pub fn render_article(&self, panel: &ArticlePanel) -> Result<String> {
    self.hb.render("article", panel)
      .context("Rendering the article panel")
  }

  pub fn render_contact(&self, panel: &ContactPanel) -> Result<String> {
    self.hb.render("contact", panel)
      .context("Rendering the contact panel")
  }

}
