/*
 * Contact widget. Unlike the article components it isn't tied
 * to an article and lives as long as the page does. Both
 * outcomes of a submission reset themselves after a while,
 * which is what the timer task spawned by submit() is for.
 */

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use futures::channel::oneshot;
use log::{debug, error, info};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use crate::utils::text_utils;
use crate::writer::{WriteOp, WriteResult};
use super::dtos::{ContactMessage, ContactPanel};
use super::error::Error;
use super::helpers;
use super::ClientContext;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactStatus {
  Idle,
  Sending,
  Success,
  Error
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactSnapshot {
  pub name: String,
  pub email: String,
  pub message: String,
  pub status: ContactStatus,
  // Seconds left before the success screen goes away.
  pub countdown: u32
}

struct ContactState {
  name: String,
  email: String,
  message: String,
  status: ContactStatus,
  countdown: u32,
  // Bumped on every submission. Timers of an older submission
  // compare it and give up.
  generation: u64
}

impl ContactState {
  fn clear_fields(&mut self) {
    self.name.clear();
    self.email.clear();
    self.message.clear();
  }
}

/// Handle on a running submission, resolves when the store
/// answered and the form moved to Success or Error.
#[derive(Debug)]
pub struct ContactSubmission {
  rx: oneshot::Receiver<WriteResult>
}

impl ContactSubmission {
  pub async fn settled(self) -> WriteResult {
    self.rx.await.unwrap_or(Err(Error::Disconnected))
  }
}

pub struct ContactForm {
  ctx: ClientContext,
  state: Arc<Mutex<ContactState>>,
  timer: Mutex<Option<JoinHandle<()>>>
}

impl ContactForm {

  pub fn new(ctx: &ClientContext) -> Self {
    Self {
      ctx: ctx.clone(),
      state: Arc::new(Mutex::new(ContactState {
        name: String::new(),
        email: String::new(),
        message: String::new(),
        status: ContactStatus::Idle,
        countdown: 0,
        generation: 0
      })),
      timer: Mutex::new(None)
    }
  }

  pub fn set_name(&self, name: &str) {
    lock(&self.state).name = name.to_string();
  }

  pub fn set_email(&self, email: &str) {
    lock(&self.state).email = email.to_string();
  }

  pub fn set_message(&self, message: &str) {
    lock(&self.state).message = message.to_string();
  }

  pub fn status(&self) -> ContactStatus {
    lock(&self.state).status
  }

  pub fn snapshot(&self) -> ContactSnapshot {
    let state = lock(&self.state);
    ContactSnapshot {
      name: state.name.clone(),
      email: state.email.clone(),
      message: state.message.clone(),
      status: state.status,
      countdown: state.countdown
    }
  }

  pub fn panel(&self) -> ContactPanel {
    let snapshot = self.snapshot();
    let button_label = match snapshot.status {
      ContactStatus::Sending => "Sending...",
      ContactStatus::Error => "Error - Try Again",
      _ => "Send Message"
    };
    ContactPanel {
      success: snapshot.status == ContactStatus::Success,
      name: snapshot.name,
      email: snapshot.email,
      message: snapshot.message,
      button_label,
      sending: snapshot.status == ContactStatus::Sending,
      countdown_label: helpers::countdown_label(snapshot.countdown)
    }
  }

  /// Sends the message currently in the form. The reset timers
  /// run on the current tokio runtime, without one the call is
  /// refused. Allowed from Idle and Error only; invalid fields
  /// are rejected without touching the state.
  pub fn submit(&self) -> Result<ContactSubmission, Error> {
    let runtime = Handle::try_current().map_err(|e| {
      error!("Contact form submitted outside of a runtime - {}", e);
      Error::NoRuntime
    })?;
    let (message, generation) = {
      let mut state = lock(&self.state);
      match state.status {
        ContactStatus::Sending | ContactStatus::Success => return Err(Error::Busy),
        _ => ()
      }
      let message = validate(&state.name, &state.email, &state.message)?;
      state.status = ContactStatus::Sending;
      state.countdown = 0;
      state.generation += 1;
      (message, state.generation)
    };
    let op = WriteOp::Append {
      collection: self.ctx.paths().contact_messages(),
      fields: message.into()
    };
    let state = self.state.clone();
    let error_cooldown = self.ctx.settings().contact_error_cooldown;
    let pending = match self.ctx.writer().submit(op) {
      Ok(pending) => pending,
      Err(e) => {
        // Never left. Same as a store failure from the
        // user's point of view.
        if !show_error(&state, generation) {
          return Err(e);
        }
        let task = runtime.spawn(async move {
          reset_after_error(&state, generation, error_cooldown).await;
        });
        self.replace_timer(task);
        return Err(e);
      }
    };
    let (tx, rx) = oneshot::channel();
    let success_cooldown = self.ctx.settings().contact_success_cooldown;
    let task = runtime.spawn(async move {
      let result = pending.settled().await;
      let succeeded = result.is_ok();
      if succeeded {
        let mut state = lock(&state);
        if state.generation != generation {
          return;
        }
        info!("Contact message sent");
        state.status = ContactStatus::Success;
        state.countdown = success_cooldown;
        state.clear_fields();
      } else if !show_error(&state, generation) {
        return;
      }
      let _ = tx.send(result);
      if succeeded {
        countdown(&state, generation).await;
      } else {
        reset_after_error(&state, generation, error_cooldown).await;
      }
    });
    self.replace_timer(task);
    Ok(ContactSubmission { rx })
  }

  // Only the latest submission can have a live timer.
  fn replace_timer(&self, task: JoinHandle<()>) {
    if let Some(previous) = lock(&self.timer).replace(task) {
      previous.abort();
    }
  }

}

impl Drop for ContactForm {
  fn drop(&mut self) {
    if let Some(task) = lock(&self.timer).take() {
      task.abort();
    }
  }
}

// Input stays there for another try. False when a newer
// submission took over.
fn show_error(state: &Mutex<ContactState>, generation: u64) -> bool {
  let mut state = lock(state);
  if state.generation != generation {
    return false;
  }
  state.status = ContactStatus::Error;
  true
}

async fn reset_after_error(state: &Mutex<ContactState>, generation: u64, cooldown: u32) {
  tokio::time::sleep(Duration::from_secs(cooldown as u64)).await;
  let mut state = lock(state);
  if state.generation == generation && state.status == ContactStatus::Error {
    debug!("Contact form back to idle after an error");
    state.status = ContactStatus::Idle;
  }
}

async fn countdown(state: &Mutex<ContactState>, generation: u64) {
  loop {
    tokio::time::sleep(Duration::from_secs(1)).await;
    let mut state = lock(state);
    if state.generation != generation {
      return;
    }
    state.countdown = state.countdown.saturating_sub(1);
    if state.countdown == 0 {
      state.status = ContactStatus::Idle;
      state.clear_fields();
      debug!("Contact form reset after success");
      return;
    }
  }
}

fn validate(name: &str, email: &str, message: &str) -> Result<ContactMessage, Error> {
  if text_utils::is_blank(name) {
    return Err(Error::Validation(String::from("Name is required")));
  }
  if text_utils::is_blank(message) {
    return Err(Error::Validation(String::from("Message is required")));
  }
  if !helpers::is_valid_email(email) {
    error!("Rejected contact email: {}", email);
    return Err(Error::Validation(String::from("Email address is invalid")));
  }
  Ok(ContactMessage {
    name: name.to_string(),
    email: email.trim().to_string(),
    message: message.to_string()
  })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
