use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::models::Snapshot;
use crate::services::board_state::{BoardEffect, BoardEvent, BoardState, RefreshOrdering, Ticket};
use crate::services::notifier::Notifier;
use crate::services::remote_store::RemoteStore;
use crate::services::renderer::BoardView;

/// Drives [`BoardState`] against a [`RemoteStore`].
///
/// Cloning is cheap; every clone shares the same board. Results are fed back
/// as they complete, and each change is published on a `watch` channel that
/// renderers subscribe to.
#[derive(Clone)]
pub struct ViewModel {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn RemoteStore>,
    notifier: Notifier,
    state: Mutex<BoardState>,
    view_tx: watch::Sender<Arc<BoardView>>,
}

impl ViewModel {
    pub fn new(store: Arc<dyn RemoteStore>, notifier: Notifier, ordering: RefreshOrdering) -> Self {
        let state = BoardState::new(ordering);
        let (view_tx, _) = watch::channel(Arc::new(state.view()));
        Self {
            inner: Arc::new(Inner {
                store,
                notifier,
                state: Mutex::new(state),
                view_tx,
            }),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<BoardView>> {
        self.inner.view_tx.subscribe()
    }

    pub fn view(&self) -> Arc<BoardView> {
        self.inner.view_tx.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.lock().current().cloned()
    }

    pub fn is_uninitialized(&self) -> bool {
        let state = self.lock();
        state.current().is_none() && state.load_error().is_none()
    }

    /// Re-fetches the whole board. A failure shows up as the view's load error.
    pub async fn refresh(&self) {
        self.run(BoardEvent::Refresh).await;
    }

    pub async fn submit_registration(&self, activity: &str, email: &str) {
        self.run(BoardEvent::SubmitRegistration {
            activity: activity.to_string(),
            email: email.to_string(),
        })
        .await;
    }

    /// Returns once the removal is applied locally; the confirming refresh
    /// keeps running in the background.
    pub async fn submit_unregistration(&self, activity: &str, email: &str) {
        self.run(BoardEvent::SubmitUnregistration {
            activity: activity.to_string(),
            email: email.to_string(),
        })
        .await;
    }

    async fn run(&self, event: BoardEvent) {
        let mut queue: VecDeque<BoardEffect> = self.dispatch(event).into();

        while let Some(effect) = queue.pop_front() {
            let next = match effect {
                BoardEffect::Fetch {
                    ticket,
                    background: true,
                } => {
                    let vm = self.clone();
                    tokio::spawn(async move { vm.fetch(ticket).await });
                    continue;
                }
                BoardEffect::Fetch { ticket, .. } => {
                    self.fetch(ticket).await;
                    continue;
                }
                BoardEffect::Register { activity, email } => {
                    let result = self.inner.store.register(&activity, &email).await;
                    BoardEvent::RegistrationSettled {
                        activity,
                        email,
                        result,
                    }
                }
                BoardEffect::Unregister { activity, email } => {
                    let result = self.inner.store.unregister(&activity, &email).await;
                    BoardEvent::UnregistrationSettled {
                        activity,
                        email,
                        result,
                    }
                }
                local @ (BoardEffect::Notify { .. } | BoardEffect::Publish) => {
                    warn!("local effect reached the request queue: {:?}", local);
                    continue;
                }
            };
            queue.extend(self.dispatch(next));
        }
    }

    async fn fetch(&self, ticket: Ticket) {
        debug!("refresh #{} issued", ticket);
        let result = self.inner.store.list_activities().await;
        let leftover = self.dispatch(BoardEvent::ActivitiesLoaded { ticket, result });
        if !leftover.is_empty() {
            warn!("refresh #{} produced unexpected requests: {:?}", ticket, leftover);
        }
    }

    /// Applies one event, performs the local effects it produced and hands back
    /// the ones that need the network.
    fn dispatch(&self, event: BoardEvent) -> Vec<BoardEffect> {
        let (effects, view) = {
            let mut state = self.lock();
            let effects = state.update(event);
            let view = effects
                .contains(&BoardEffect::Publish)
                .then(|| Arc::new(state.view()));
            (effects, view)
        };

        if let Some(view) = view {
            self.inner.view_tx.send_replace(view);
        }

        let mut remote = Vec::new();
        for effect in effects {
            match effect {
                BoardEffect::Publish => {}
                BoardEffect::Notify { text, kind } => self.inner.notifier.show(text, kind),
                other => remote.push(other),
            }
        }
        remote
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
