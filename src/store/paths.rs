use std::fmt;

// Paths are plain '/' separated strings like in most document
// databases. Collections and documents don't alternate strictly,
// the prefix just mirrors how the data was laid out historically.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
  pub fn new(path: &str) -> Self {
    CollectionPath(path.trim_matches('/').to_string())
  }

  pub fn child(&self, segment: &str) -> Self {
    CollectionPath(format!("{}/{}", self.0, segment))
  }

  pub fn doc(&self, id: &str) -> DocPath {
    DocPath {
      collection: self.clone(),
      id: id.to_string()
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for CollectionPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
  pub collection: CollectionPath,
  pub id: String
}

impl fmt::Display for DocPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.collection, self.id)
  }
}

/// Where the interaction documents live for a given app id.
#[derive(Debug, Clone)]
pub struct StorePaths {
  root: CollectionPath
}

impl StorePaths {
  pub fn new(app_id: &str) -> Self {
    Self {
      root: CollectionPath::new(&format!("artifacts/{}/public/data", app_id))
    }
  }

  pub fn stats_doc(&self, article_id: &str) -> DocPath {
    self.root.child("stats").doc(article_id)
  }

  pub fn comments(&self, article_id: &str) -> CollectionPath {
    self.root.child(&format!("comments_{}", article_id))
  }

  pub fn contact_messages(&self) -> CollectionPath {
    self.root.child("contact_messages")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn article_paths_share_the_app_prefix() {
    let paths = StorePaths::new("default-app-id");
    assert_eq!(
      "artifacts/default-app-id/public/data/stats/intro-to-rust",
      paths.stats_doc("intro-to-rust").to_string()
    );
    assert_eq!(
      "artifacts/default-app-id/public/data/comments_intro-to-rust",
      paths.comments("intro-to-rust").as_str()
    );
    assert_eq!(
      "artifacts/default-app-id/public/data/contact_messages",
      paths.contact_messages().as_str()
    );
  }

  #[test]
  fn collection_path_ignores_outer_slashes() {
    assert_eq!("a/b", CollectionPath::new("/a/b/").as_str());
  }
}
