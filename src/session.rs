//! Per-user view state for the study UI.
//!
//! A [`Session`] is an explicit state machine: the UI sends [`Action`]s,
//! [`Session::apply`] performs the transition and [`Session::render`]
//! produces the snapshot the page draws.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{CandidateBatch, Flashcard, StoredFlashcard};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Home,
    Extract,
    Generate,
    Study,
    Manage,
}

/// A user action on the UI.
///
/// Decks never travel over the wire: the server draws them from the store
/// and hands them to [`Session::start_study`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Navigate { view: View },
    ShowAnswer,
    NextCard,
    PreviousCard,
    FinishStudy,
    SetPending { batch: CandidateBatch },
    ClearPending,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    view: View,
    pending: Option<CandidateBatch>,
    deck: Vec<Flashcard>,
    index: usize,
    show_answer: bool,
    last_seen: DateTime<Utc>,
}

/// What the UI draws for one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub view: View,
    pub pending: Option<CandidateBatch>,
    pub study: Option<StudyView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudyView {
    /// 1-based position of the current card
    pub current: usize,
    pub total: usize,
    pub term: String,
    /// Only present once the answer has been revealed
    pub answer: Option<Answer>,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub can_finish: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub translation: String,
    pub example: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            view: View::Home,
            pending: None,
            deck: Vec::new(),
            index: 0,
            show_answer: false,
            last_seen: Utc::now(),
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// Build a study deck from stored records, in random order.
    pub fn shuffled_deck(records: &[StoredFlashcard]) -> Vec<Flashcard> {
        let mut deck: Vec<Flashcard> = records.iter().map(StoredFlashcard::to_flashcard).collect();
        deck.shuffle(&mut rand::rng());
        deck
    }

    pub fn apply(&mut self, action: Action) {
        self.last_seen = Utc::now();
        match action {
            Action::Navigate { view } => {
                if view == View::Study {
                    // Restart the deck already held
                    let deck = std::mem::take(&mut self.deck);
                    self.start_study(deck);
                } else {
                    self.view = view;
                }
            }
            Action::ShowAnswer => {
                if self.view == View::Study && !self.deck.is_empty() {
                    self.show_answer = true;
                }
            }
            Action::NextCard => {
                if self.view == View::Study && self.index + 1 < self.deck.len() {
                    self.index += 1;
                    self.show_answer = false;
                }
            }
            Action::PreviousCard => {
                if self.view == View::Study && self.index > 0 {
                    self.index -= 1;
                    self.show_answer = false;
                }
            }
            Action::FinishStudy => {
                if self.view == View::Study && self.on_last_card() {
                    self.view = View::Home;
                    self.index = 0;
                    self.show_answer = false;
                }
            }
            Action::SetPending { batch } => self.pending = Some(batch),
            Action::ClearPending => self.pending = None,
        }
    }

    /// Enter Study with `deck`, at its first card with the answer hidden.
    pub fn start_study(&mut self, deck: Vec<Flashcard>) {
        self.last_seen = Utc::now();
        self.view = View::Study;
        self.deck = deck;
        self.index = 0;
        self.show_answer = false;
    }

    /// Clear the pending batch only if it is still `saved`. Returns whether it
    /// was cleared; a batch set after `saved` was read stays pending.
    pub fn clear_pending_if(&mut self, saved: &CandidateBatch) -> bool {
        self.last_seen = Utc::now();
        if self.pending.as_ref() == Some(saved) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    fn on_last_card(&self) -> bool {
        self.deck.is_empty() || self.index + 1 == self.deck.len()
    }

    pub fn render(&self) -> SessionView {
        let study = if self.view == View::Study {
            self.deck.get(self.index).map(|card| StudyView {
                current: self.index + 1,
                total: self.deck.len(),
                term: card.term.clone(),
                answer: self.show_answer.then(|| Answer {
                    translation: card.translation.clone(),
                    example: card.example.clone(),
                }),
                can_go_back: self.show_answer && self.index > 0,
                can_go_forward: self.show_answer && self.index + 1 < self.deck.len(),
                can_finish: self.show_answer && self.on_last_card(),
            })
        } else {
            None
        };

        SessionView {
            id: self.id,
            view: self.view,
            pending: self.pending.clone(),
            study,
        }
    }
}

/// Live sessions, bounded by evicting the least recently used.
pub struct SessionStore {
    sessions: HashMap<Uuid, Session>,
    capacity: usize,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn create(&mut self) -> SessionView {
        if self.sessions.len() >= self.capacity {
            if let Some(oldest) = self
                .sessions
                .values()
                .min_by_key(|s| s.last_seen)
                .map(|s| s.id)
            {
                tracing::debug!("Evicting idle session {oldest}");
                self.sessions.remove(&oldest);
            }
        }
        let session = Session::new();
        let view = session.render();
        self.sessions.insert(session.id, session);
        view
    }

    pub fn get(&self, id: &Uuid) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
