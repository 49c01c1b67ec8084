// Stole this from StackOverflow, of course
// https://stackoverflow.com/questions/53570839/quick-function-to-convert-a-strings-first-letter-to-uppercase
pub fn first_letter_to_upper(s1: String) -> String {
  let mut c = s1.chars();
  match c.next() {
    None => String::new(),
    Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
  }
}

// Used for the little avatar bubble next to comments.
pub fn initial(name: &str) -> String {
  name.trim().chars().next()
    .map(|c| first_letter_to_upper(c.to_string()))
    .unwrap_or(String::new())
}

pub fn is_blank(value: &str) -> bool {
  value.trim().is_empty()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_letter_to_upper_on_two_words() {
    let sut = String::from("hello world");
    let expected = String::from("Hello world");
    assert_eq!(first_letter_to_upper(sut), expected);
  }

  #[test]
  fn initial_is_one_upper_case_letter() {
    assert_eq!("A", initial("anonymous"));
    assert_eq!("É", initial("  élodie"));
    assert_eq!("", initial("   "));
  }

  #[test]
  fn whitespace_only_is_blank() {
    assert!(is_blank(""));
    assert!(is_blank(" \n\t "));
    assert!(!is_blank(" a "));
  }

}
