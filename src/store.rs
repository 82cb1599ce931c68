use crate::db::NoteDatabase;
use crate::errors::AppResult;
use crate::models::Note;
use crate::registry::SharedRegistry;
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

const CHANGE_BUFFER: usize = 256;

static NOTE_STORES: Lazy<SharedRegistry<NoteStore>> = Lazy::new(SharedRegistry::new);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub note_id: i64,
}

#[derive(Debug)]
pub struct NoteStore {
    db: Arc<NoteDatabase>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl NoteStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        let db = NoteDatabase::new(path)?;
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Ok(Self {
            db: Arc::new(db),
            changes,
        })
    }

    pub fn shared(path: &Path) -> AppResult<Arc<Self>> {
        NOTE_STORES.get_or_try_init(path, Self::open)
    }

    // Writes publish from the blocking task itself, so a caller dropping the
    // future after the commit cannot swallow the change event.
    pub async fn insert(&self, note: Note) -> AppResult<Note> {
        let db = self.db.clone();
        let changes = self.changes.clone();
        tokio::task::spawn_blocking(move || {
            let stored = db.insert_note(&note)?;
            tracing::debug!(note_id = stored.id, "note inserted");
            publish(&changes, ChangeKind::Inserted, stored.id);
            Ok(stored)
        })
        .await?
    }

    pub async fn update(&self, note: Note) -> AppResult<Note> {
        let db = self.db.clone();
        let changes = self.changes.clone();
        tokio::task::spawn_blocking(move || {
            let stored = db.update_note(&note)?;
            tracing::debug!(note_id = stored.id, "note updated");
            publish(&changes, ChangeKind::Updated, stored.id);
            Ok(stored)
        })
        .await?
    }

    /// Returns `false` when no row had `note.id`.
    pub async fn delete(&self, note: &Note) -> AppResult<bool> {
        let db = self.db.clone();
        let changes = self.changes.clone();
        let id = note.id;
        tokio::task::spawn_blocking(move || {
            let removed = db.delete_note(id)?;
            if removed {
                tracing::debug!(note_id = id, "note deleted");
                publish(&changes, ChangeKind::Deleted, id);
            }
            Ok(removed)
        })
        .await?
    }

    pub async fn count(&self) -> AppResult<i64> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.count_notes()).await?
    }

    pub fn get_all(&self) -> LiveQuery<Vec<Note>> {
        LiveQuery::new(
            self.db.clone(),
            self.changes.subscribe(),
            None,
            Arc::new(|db: &NoteDatabase| db.list_notes()),
        )
    }

    pub fn get_by_id(&self, id: i64) -> LiveQuery<Option<Note>> {
        LiveQuery::new(
            self.db.clone(),
            self.changes.subscribe(),
            Some(id),
            Arc::new(move |db: &NoteDatabase| db.get_note(id)),
        )
    }

    pub fn observer_count(&self) -> usize {
        self.changes.receiver_count()
    }
}

fn publish(changes: &broadcast::Sender<ChangeEvent>, kind: ChangeKind, note_id: i64) {
    // no receivers is fine
    let _ = changes.send(ChangeEvent { kind, note_id });
}

type QueryFn<T> = Arc<dyn Fn(&NoteDatabase) -> AppResult<T> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiveState {
    Pending,
    Open,
    Done,
}

/// A query result that is re-delivered whenever the underlying rows change.
///
/// The first [`next`](LiveQuery::next) yields the current snapshot. Later calls wait
/// for a relevant commit; several commits landing between two calls are folded into
/// one emission of the latest state. A failed query is delivered once and ends the
/// sequence. Dropping the value releases its subscription.
pub struct LiveQuery<T> {
    db: Arc<NoteDatabase>,
    receiver: broadcast::Receiver<ChangeEvent>,
    watched_id: Option<i64>,
    query: QueryFn<T>,
    state: LiveState,
}

impl<T: Send + 'static> LiveQuery<T> {
    fn new(
        db: Arc<NoteDatabase>,
        receiver: broadcast::Receiver<ChangeEvent>,
        watched_id: Option<i64>,
        query: QueryFn<T>,
    ) -> Self {
        Self {
            db,
            receiver,
            watched_id,
            query,
            state: LiveState::Pending,
        }
    }

    pub async fn next(&mut self) -> Option<AppResult<T>> {
        match self.state {
            LiveState::Done => return None,
            LiveState::Pending => {
                // the snapshot below already reflects anything queued so far
                self.drain_pending();
                self.state = LiveState::Open;
            }
            LiveState::Open => {
                if !self.wait_for_change().await {
                    self.state = LiveState::Done;
                    return None;
                }
                self.drain_pending();
            }
        }

        let db = self.db.clone();
        let query = self.query.clone();
        let result = match tokio::task::spawn_blocking(move || query(&db)).await {
            Ok(result) => result,
            Err(error) => Err(error.into()),
        };
        if let Err(error) = &result {
            tracing::warn!(error = %error, "live query failed; closing sequence");
            self.state = LiveState::Done;
        }
        Some(result)
    }

    fn is_relevant(&self, event: &ChangeEvent) -> bool {
        self.watched_id.map_or(true, |id| id == event.note_id)
    }

    async fn wait_for_change(&mut self) -> bool {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.is_relevant(&event) => return true,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "live query lagged; re-querying");
                    return true;
                }
                Err(RecvError::Closed) => return false,
            }
        }
    }

    fn drain_pending(&mut self) {
        loop {
            match self.receiver.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }
}
