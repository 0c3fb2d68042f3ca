//! Application state: backend client, session storage, transient drafts,
//! category labels, and page templates.
//!
//! Drafts hold the response being edited on the current question page. They
//! live only in memory and reach the response store on advance.
//!
//! A session that has not sent its cookie back yet owns nothing: pages render
//! from initial responses and nothing is stored or drafted for it. Sessions
//! that go idle are swept by `spawn_session_sweeper`.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::backend::{BackendError, HttpBackend, IntakeBackend};
use crate::config::{AppConfig, CategoryLabels, StorageKind};
use crate::domain::Response;
use crate::navigator::Navigator;
use crate::session::Session;
use crate::store::{FileStore, KeyValueStore, MemoryStore, ResponseStore, StoreError};
use crate::views::Views;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build backend client: {0}")]
    Backend(#[from] BackendError),

    #[error("failed to load templates: {0}")]
    Templates(#[from] handlebars::TemplateError),
}

/// Pending response for one session, with when it was last edited.
#[derive(Clone, Debug)]
pub struct Draft {
    pub response: Response,
    touched: Instant,
}

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn IntakeBackend>,
    pub storage: Arc<dyn KeyValueStore>,
    pub drafts: Arc<RwLock<HashMap<Uuid, Draft>>>,
    pub labels: CategoryLabels,
    pub views: Arc<Views>,
}

impl AppState {
    /// Build state from config: HTTP backend client and the configured storage.
    #[instrument(level = "info", skip_all)]
    pub fn from_config(cfg: &AppConfig) -> Result<Self, StartupError> {
        let backend = HttpBackend::new(&cfg.backend)?;
        info!(target: "intake_frontend", base_url = %backend.base_url, "Backend client ready");

        let storage: Arc<dyn KeyValueStore> = match cfg.storage.kind {
            StorageKind::Memory => {
                info!(target: "intake_frontend", "Session storage: in-memory");
                Arc::new(MemoryStore::new())
            }
            StorageKind::File => {
                let fs = FileStore::new(&cfg.storage.dir);
                info!(target: "intake_frontend", dir = %fs.dir().display(), "Session storage: files");
                Arc::new(fs)
            }
        };

        Self::new(Arc::new(backend), storage, cfg.labels.clone())
    }

    pub fn new(
        backend: Arc<dyn IntakeBackend>,
        storage: Arc<dyn KeyValueStore>,
        labels: CategoryLabels,
    ) -> Result<Self, StartupError> {
        Ok(Self {
            backend,
            storage,
            drafts: Arc::new(RwLock::new(HashMap::new())),
            labels,
            views: Arc::new(Views::new()?),
        })
    }

    pub fn responses(&self, session: &Session) -> ResponseStore {
        ResponseStore::new(self.storage.clone(), &session.key())
    }

    /// Response to edit on the navigator's question: the pending draft when it
    /// belongs to this question, otherwise what the store resolves. A draft for
    /// another question is dropped. A fresh session gets the initial response
    /// and leaves the store untouched.
    #[instrument(level = "debug", skip(self, nav, store), fields(session = %session.id, index = nav.index()))]
    pub async fn current_response(
        &self,
        session: &Session,
        nav: &Navigator<'_>,
        store: &ResponseStore,
    ) -> Result<Response, StoreError> {
        if session.fresh {
            return Ok(nav.current().initial_response());
        }
        let question_id = &nav.current().id;
        {
            let mut drafts = self.drafts.write().await;
            match drafts.get(&session.id) {
                Some(d) if d.response.question_id == *question_id => return Ok(d.response.clone()),
                Some(_) => {
                    drafts.remove(&session.id);
                }
                None => {}
            }
        }
        nav.resolve(store).await
    }

    pub async fn put_draft(&self, session: &Session, response: Response) {
        let draft = Draft { response, touched: Instant::now() };
        self.drafts.write().await.insert(session.id, draft);
    }

    pub async fn drop_draft(&self, session: &Session) {
        self.drafts.write().await.remove(&session.id);
    }

    /// Drops drafts and stored responses idle for at least `max_idle`.
    /// Returns `(drafts, stored)` removal counts.
    #[instrument(level = "debug", skip(self))]
    pub async fn sweep_idle(&self, max_idle: Duration) -> Result<(usize, usize), StoreError> {
        let drafts = {
            let mut drafts = self.drafts.write().await;
            let before = drafts.len();
            drafts.retain(|_, d| d.touched.elapsed() < max_idle);
            before - drafts.len()
        };
        let stored = self.storage.evict_idle(max_idle).await?;
        Ok((drafts, stored))
    }
}

/// Periodically sweeps idle sessions until the runtime shuts down.
pub fn spawn_session_sweeper(state: Arc<AppState>, every: Duration, max_idle: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match state.sweep_idle(max_idle).await {
                Ok((0, 0)) => debug!(target: "intake_frontend", "Session sweep: nothing idle"),
                Ok((drafts, stored)) => {
                    info!(target: "intake_frontend", drafts, stored, "Session sweep removed idle sessions")
                }
                Err(e) => warn!(target: "intake_frontend", error = %e, "Session sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::stub::StubBackend;
    use crate::domain::{Question, Variant};

    fn state() -> AppState {
        AppState::new(
            Arc::new(StubBackend::default()),
            Arc::new(MemoryStore::new()),
            CategoryLabels::default(),
        )
        .unwrap()
    }

    fn text_question(id: &str) -> Question {
        Question {
            id: id.into(),
            text: id.into(),
            variant: Variant::FreeText,
            options: vec![],
            required: false,
            category: String::new(),
        }
    }

    #[tokio::test]
    async fn draft_is_reused_only_for_its_question() {
        let st = state();
        let session = Session { id: Uuid::new_v4(), fresh: false };
        let store = st.responses(&session);
        let qs = vec![text_question("a"), text_question("b")];

        let mut draft = qs[0].initial_response();
        draft.written_answer = Some("pending".into());
        st.put_draft(&session, draft.clone()).await;

        let nav_a = Navigator::new(&qs, 0).unwrap();
        assert_eq!(st.current_response(&session, &nav_a, &store).await.unwrap(), draft);

        let nav_b = Navigator::new(&qs, 1).unwrap();
        let r = st.current_response(&session, &nav_b, &store).await.unwrap();
        assert_eq!(r.question_id, "b");
        assert!(st.drafts.read().await.is_empty());

        // The draft never reached the store.
        let stored = st.current_response(&session, &nav_a, &store).await.unwrap();
        assert_eq!(stored.written_answer.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn fresh_session_resolves_without_storing() {
        let kv = Arc::new(MemoryStore::new());
        let st = AppState::new(Arc::new(StubBackend::default()), kv.clone(), CategoryLabels::default()).unwrap();
        let session = Session { id: Uuid::new_v4(), fresh: true };
        let qs = vec![text_question("a")];
        let nav = Navigator::new(&qs, 0).unwrap();

        let r = st.current_response(&session, &nav, &st.responses(&session)).await.unwrap();
        assert_eq!(r, qs[0].initial_response());
        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn sweep_removes_idle_drafts_and_stored_responses() {
        let kv = Arc::new(MemoryStore::new());
        let st = AppState::new(Arc::new(StubBackend::default()), kv.clone(), CategoryLabels::default()).unwrap();
        let session = Session { id: Uuid::new_v4(), fresh: false };
        let qs = vec![text_question("a")];
        let nav = Navigator::new(&qs, 0).unwrap();
        st.current_response(&session, &nav, &st.responses(&session)).await.unwrap();
        st.put_draft(&session, qs[0].initial_response()).await;

        assert_eq!(st.sweep_idle(Duration::from_secs(3600)).await.unwrap(), (0, 0));
        assert_eq!(kv.len().await, 1);

        assert_eq!(st.sweep_idle(Duration::ZERO).await.unwrap(), (1, 1));
        assert!(st.drafts.read().await.is_empty());
        assert!(kv.is_empty().await);
    }
}
