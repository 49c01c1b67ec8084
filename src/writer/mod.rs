/*
 * All the writes of one client context go through a single
 * worker thread fed by a bounded channel. Callers never wait
 * on the store: they either fire and forget or get a
 * PendingWrite they can await whenever they want.
 */

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use futures::channel::oneshot;
use color_eyre::Result;
use eyre::WrapErr;
use log::{debug, error, info};
use crate::app::error::{map_store_error, Error};
use crate::store::{CollectionPath, DocPath, DocumentStore, MergeFields};

#[derive(Debug, Clone)]
pub enum WriteOp {
  UpsertMerge {
    path: DocPath,
    fields: MergeFields
  },
  Append {
    collection: CollectionPath,
    fields: MergeFields
  }
}

impl fmt::Display for WriteOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WriteOp::UpsertMerge { path, .. } => write!(f, "merge into {}", path),
      WriteOp::Append { collection, .. } => write!(f, "append to {}", collection)
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteAck {
  Merged,
  Appended(String)
}

pub type WriteResult = std::result::Result<WriteAck, Error>;

/// Runs on the writer thread right after the write settled,
/// before anyone awaiting the PendingWrite is woken up.
pub type SettleFn = Box<dyn FnOnce(&WriteResult) + Send>;

struct WriteRequest {
  op: WriteOp,
  on_settled: Option<SettleFn>,
  reply: Option<oneshot::Sender<WriteResult>>
}

enum WriteMessage {
  Close,
  Flush(oneshot::Sender<()>),
  Write(WriteRequest)
}

/// Completion handle of a queued write. Dropping it is fine,
/// the write still happens.
#[derive(Debug)]
#[must_use = "dropping the handle is fine but then nobody learns how the write went"]
pub struct PendingWrite {
  rx: oneshot::Receiver<WriteResult>
}

impl PendingWrite {
  pub async fn settled(self) -> WriteResult {
    self.rx.await.unwrap_or(Err(Error::Disconnected))
  }
}

pub struct WriteQueue {
  tx: SyncSender<WriteMessage>,
  thread_handle: Option<JoinHandle<()>>
}

impl WriteQueue {

  pub fn open(
    store: Arc<dyn DocumentStore>,
    queue_size: usize
  ) -> Result<WriteQueue>
  {
    // Producers never block on this, see try_send below. The
    // buffer just has to be large enough for bursts of clicks.
    let (tx, rx) = mpsc::sync_channel::<WriteMessage>(queue_size);
    info!("Starting writer thread...");
    let thread_handle = thread::Builder::new()
      .name(String::from("interactions-writer"))
      .spawn(move || loop {
        match rx.recv() {
          Ok(WriteMessage::Close) => {
            info!("Writer thread terminating...");
            break;
          },
          Ok(WriteMessage::Flush(done)) => {
            // Everything queued before this message is settled.
            let _ = done.send(());
          },
          Ok(WriteMessage::Write(request)) => {
            let result = execute(store.as_ref(), &request.op);
            if let Err(e) = &result {
              error!("Error from writer thread: could not {} - {}", request.op, e);
            }
            if let Some(on_settled) = request.on_settled {
              on_settled(&result);
            }
            if let Some(reply) = request.reply {
              // The receiver may be long gone, that's allowed.
              let _ = reply.send(result);
            }
          },
          // Every sender is gone:
          Err(_) => break
        }
      })
      .context("Spawning the writer thread")?;
    Ok(WriteQueue {
      tx,
      thread_handle: Some(thread_handle)
    })
  }

  /// Fire and forget. A full buffer drops the write with an
  /// error in the logs instead of blocking the caller.
  pub fn fire(&self, op: WriteOp) -> std::result::Result<(), Error> {
    debug!("Queueing fire and forget write: {}", op);
    let request = WriteRequest {
      op,
      on_settled: None,
      reply: None
    };
    match self.tx.try_send(WriteMessage::Write(request)) {
      Ok(_) => Ok(()),
      Err(TrySendError::Full(WriteMessage::Write(request))) => {
        error!("Writer thread buffer is full, dropping write: {}", request.op);
        Ok(())
      },
      Err(TrySendError::Full(_)) => Ok(()),
      Err(TrySendError::Disconnected(_)) => {
        error!("Writer thread is dead, dropping write");
        Err(Error::Disconnected)
      }
    }
  }

  pub fn submit(&self, op: WriteOp) -> std::result::Result<PendingWrite, Error> {
    self.enqueue(op, None)
  }

  /// Like submit, with a callback run on the writer thread as
  /// soon as the write settled. The callback is not called when
  /// the write could not be queued at all.
  pub fn submit_with<F>(&self, op: WriteOp, on_settled: F) -> std::result::Result<PendingWrite, Error>
    where F: FnOnce(&WriteResult) + Send + 'static
  {
    self.enqueue(op, Some(Box::new(on_settled)))
  }

  /// Resolves once every write queued before the call has settled.
  pub async fn flush(&self) -> std::result::Result<(), Error> {
    let (done, wait) = oneshot::channel();
    // Blocks only if the buffer is full, flushing is rare.
    self.tx.send(WriteMessage::Flush(done))
      .map_err(|_| Error::Disconnected)?;
    wait.await.map_err(|_| Error::Disconnected)
  }

  fn enqueue(
    &self,
    op: WriteOp,
    on_settled: Option<SettleFn>
  ) -> std::result::Result<PendingWrite, Error> {
    debug!("Queueing write: {}", op);
    let (reply, rx) = oneshot::channel();
    let request = WriteRequest {
      op,
      on_settled,
      reply: Some(reply)
    };
    match self.tx.try_send(WriteMessage::Write(request)) {
      Ok(_) => Ok(PendingWrite { rx }),
      Err(TrySendError::Full(_)) => {
        error!("Writer thread buffer is full, write refused");
        Err(Error::QueueFull)
      },
      Err(TrySendError::Disconnected(_)) => {
        error!("Writer thread is dead, write refused");
        Err(Error::Disconnected)
      }
    }
  }

}

fn execute(store: &dyn DocumentStore, op: &WriteOp) -> WriteResult {
  match op {
    WriteOp::UpsertMerge { path, fields } => store.upsert_merge(path, fields)
      .map(|_| WriteAck::Merged)
      .map_err(map_store_error),
    WriteOp::Append { collection, fields } => store.append(collection, fields)
      .map(WriteAck::Appended)
      .map_err(map_store_error)
  }
}

// Pending writes are drained before the Close message is
// reached, so nothing queued gets lost on shutdown.
impl Drop for WriteQueue {
  fn drop(&mut self) {
    match self.tx.send(WriteMessage::Close) {
      Ok(_) => info!("WriteQueue is closing..."),
      Err(e) => error!("Could not close WriteQueue - {}", e)
    }
    if let Some(handle) = self.thread_handle.take() {
      if handle.join().is_err() {
        error!("Writer thread panicked");
      }
    }
  }
}
