//! Reconciliation state machine for the board.
//!
//! Every input (user action or settled request) is a [`BoardEvent`] fed to
//! [`BoardState::update`], which mutates the state and answers with the
//! [`BoardEffect`]s the driver must carry out. Nothing here touches the
//! network or a clock.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{MessageKind, MutationKind, PendingMutation, Snapshot};
use crate::services::remote_store::{MutationReceipt, RemoteStoreError};
use crate::services::renderer::{self, BoardView};

pub const LOAD_FAILED_TEXT: &str = "Failed to load activities. Please try again later.";
pub const MISSING_INPUT_TEXT: &str = "Please choose an activity and enter an email.";
pub const REJECTED_FALLBACK_TEXT: &str = "An error occurred";
pub const SIGNUP_FAILED_TEXT: &str = "Failed to sign up. Please try again.";
pub const UNREGISTER_FAILED_TEXT: &str = "Failed to unregister. Please try again.";

/// How overlapping refresh responses are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshOrdering {
    /// Whichever response lands last wins, even if it was issued first.
    #[default]
    Completion,
    /// Responses older than the one already applied are dropped.
    Issue,
}

pub type Ticket = u64;

#[derive(Debug, Clone)]
pub enum BoardEvent {
    Refresh,
    SubmitRegistration {
        activity: String,
        email: String,
    },
    SubmitUnregistration {
        activity: String,
        email: String,
    },
    ActivitiesLoaded {
        ticket: Ticket,
        result: Result<Snapshot, RemoteStoreError>,
    },
    RegistrationSettled {
        activity: String,
        email: String,
        result: Result<MutationReceipt, RemoteStoreError>,
    },
    UnregistrationSettled {
        activity: String,
        email: String,
        result: Result<MutationReceipt, RemoteStoreError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEffect {
    /// `background` refreshes are not awaited by the action that caused them.
    Fetch { ticket: Ticket, background: bool },
    Register { activity: String, email: String },
    Unregister { activity: String, email: String },
    Notify { text: String, kind: MessageKind },
    Publish,
}

#[derive(Debug, Default)]
pub struct BoardState {
    current: Option<Arc<Snapshot>>,
    load_error: Option<String>,
    // In-flight requests per key; identical submissions stack.
    pending: BTreeMap<PendingMutation, usize>,
    ordering: RefreshOrdering,
    issued: Ticket,
    applied: Ticket,
}

impl BoardState {
    pub fn new(ordering: RefreshOrdering) -> Self {
        Self {
            ordering,
            ..Self::default()
        }
    }

    pub fn current(&self) -> Option<&Arc<Snapshot>> {
        self.current.as_ref()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn pending(&self) -> &BTreeMap<PendingMutation, usize> {
        &self.pending
    }

    pub fn view(&self) -> BoardView {
        renderer::render_board(
            self.current.as_deref(),
            self.load_error.as_deref(),
            &self.pending,
        )
    }

    pub fn update(&mut self, event: BoardEvent) -> Vec<BoardEffect> {
        match event {
            BoardEvent::Refresh => vec![self.issue_fetch(false)],

            BoardEvent::SubmitRegistration { activity, email } => {
                self.submit(MutationKind::Register, activity, email)
            }

            BoardEvent::SubmitUnregistration { activity, email } => {
                self.submit(MutationKind::Unregister, activity, email)
            }

            BoardEvent::ActivitiesLoaded { ticket, result } => self.apply_loaded(ticket, result),

            BoardEvent::RegistrationSettled {
                activity,
                email,
                result,
            } => {
                self.settle(MutationKind::Register, &activity, &email);
                match result {
                    Ok(receipt) => {
                        info!("{} signed up for {}", email, activity);
                        vec![
                            BoardEffect::Publish,
                            BoardEffect::Notify {
                                text: receipt.message,
                                kind: MessageKind::Success,
                            },
                            self.issue_fetch(false),
                        ]
                    }
                    Err(e) => vec![
                        BoardEffect::Publish,
                        failure_notice(e, SIGNUP_FAILED_TEXT),
                    ],
                }
            }

            BoardEvent::UnregistrationSettled {
                activity,
                email,
                result,
            } => {
                self.settle(MutationKind::Unregister, &activity, &email);
                match result {
                    Ok(receipt) => {
                        info!("{} unregistered from {}", email, activity);
                        let patched = self
                            .current
                            .as_ref()
                            .and_then(|s| s.without_participant(&activity, &email));
                        if let Some(patched) = patched {
                            self.current = Some(Arc::new(patched));
                        }
                        vec![
                            BoardEffect::Publish,
                            BoardEffect::Notify {
                                text: receipt.message,
                                kind: MessageKind::Success,
                            },
                            self.issue_fetch(true),
                        ]
                    }
                    Err(e) => vec![
                        BoardEffect::Publish,
                        failure_notice(e, UNREGISTER_FAILED_TEXT),
                    ],
                }
            }
        }
    }

    fn issue_fetch(&mut self, background: bool) -> BoardEffect {
        self.issued += 1;
        BoardEffect::Fetch {
            ticket: self.issued,
            background,
        }
    }

    fn submit(&mut self, kind: MutationKind, activity: String, email: String) -> Vec<BoardEffect> {
        // Values are sent as given; unregister keys come straight from the server.
        if activity.trim().is_empty() || email.trim().is_empty() {
            return vec![BoardEffect::Notify {
                text: MISSING_INPUT_TEXT.to_string(),
                kind: MessageKind::Error,
            }];
        }

        *self
            .pending
            .entry(PendingMutation {
                kind,
                activity: activity.clone(),
                email: email.clone(),
            })
            .or_insert(0) += 1;
        let request = match kind {
            MutationKind::Register => BoardEffect::Register { activity, email },
            MutationKind::Unregister => BoardEffect::Unregister { activity, email },
        };
        vec![BoardEffect::Publish, request]
    }

    fn settle(&mut self, kind: MutationKind, activity: &str, email: &str) {
        let key = PendingMutation {
            kind,
            activity: activity.to_string(),
            email: email.to_string(),
        };
        if let Some(count) = self.pending.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(&key);
            }
        }
    }

    fn apply_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Snapshot, RemoteStoreError>,
    ) -> Vec<BoardEffect> {
        if self.ordering == RefreshOrdering::Issue && ticket < self.applied {
            debug!(
                "dropping refresh #{} (already applied #{})",
                ticket, self.applied
            );
            return Vec::new();
        }
        self.applied = self.applied.max(ticket);

        match result {
            Ok(snapshot) => {
                debug!("refresh #{} loaded {} activities", ticket, snapshot.len());
                self.current = Some(Arc::new(snapshot));
                self.load_error = None;
            }
            Err(e) => {
                debug!("refresh #{} failed: {}", ticket, e);
                self.load_error = Some(LOAD_FAILED_TEXT.to_string());
            }
        }
        vec![BoardEffect::Publish]
    }
}

fn failure_notice(err: RemoteStoreError, transport_text: &str) -> BoardEffect {
    let text = match err {
        RemoteStoreError::Rejected { detail, .. } => {
            detail.unwrap_or_else(|| REJECTED_FALLBACK_TEXT.to_string())
        }
        RemoteStoreError::Network(_) | RemoteStoreError::Decode(_) => transport_text.to_string(),
    };
    BoardEffect::Notify {
        text,
        kind: MessageKind::Error,
    }
}
