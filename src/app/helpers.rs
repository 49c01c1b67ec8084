use regex::Regex;
use lazy_static::lazy_static;

// Same level of checking as an <input type="email">: something,
// an @, something with a dot in it. Anything smarter belongs
// to whoever reads the messages.
pub fn is_valid_email(email: &str) -> bool {
  lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
      r"^[^@\s]+@[^@\s]+\.[^@\s]+$"
    ).unwrap();
  }
  EMAIL_REGEX.is_match(email.trim())
}

pub fn likes_label(likes: u64) -> String {
  format!("{} Likes", likes)
}

pub fn views_label(views: u64) -> String {
  format!("{} Views", views)
}

pub fn heart(liked: bool) -> &'static str {
  if liked { "❤️" } else { "🤍" }
}

pub fn comment_button_label(submitting: bool) -> &'static str {
  if submitting { "Posting..." } else { "Post Comment" }
}

pub fn countdown_label(seconds: u32) -> String {
  format!("Reset in {:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn basic_email_format() {
    assert!(is_valid_email("someone@example.org"));
    assert!(is_valid_email("  first.last+tag@mail.example.co.uk "));
    assert!(!is_valid_email("someone"));
    assert!(!is_valid_email("someone@example"));
    assert!(!is_valid_email("some one@example.org"));
    assert!(!is_valid_email("@example.org"));
  }

  #[test]
  fn labels() {
    assert_eq!("3 Likes", likes_label(3));
    assert_eq!("0 Views", views_label(0));
    assert_eq!("Posting...", comment_button_label(true));
    assert_eq!("Post Comment", comment_button_label(false));
    assert_eq!("Reset in 00:30", countdown_label(30));
    assert_eq!("Reset in 00:05", countdown_label(5));
  }

  #[test]
  fn countdown_label_carries_minutes() {
    assert_eq!("Reset in 01:00", countdown_label(60));
    assert_eq!("Reset in 01:30", countdown_label(90));
    assert_eq!("Reset in 10:05", countdown_label(605));
  }
}
