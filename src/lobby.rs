//! Async driver for many rooms
//!
//! Each room lives in its own tokio task and only ever changes in response to
//! a [`Command`] read from its channel, so a room is never touched by two
//! callers at once. Alarms the room schedules become sleeping tasks that post
//! the alarm back onto the same channel when they wake. Stale timer ticks are
//! dropped by the timer itself.
//!
//! Rooms are registered by [`RoomCode`] in a shared [`DashMap`]. A room
//! removes itself once it should be torn down, and forwards its
//! [`GameSummary`] to the lobby's summary channel when the game ends.

use std::{collections::HashMap, sync::Arc, time::Duration};

use dashmap::{DashMap, mapref::entry::Entry};
use derive_where::derive_where;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::{
    AlarmMessage,
    config::Settings,
    error::Error,
    mode::Mode,
    quiz::Quiz,
    room::{GameSummary, IncomingMessage, Room},
    room_code::{CODE_SPACE, RoomCode},
    session::Tunnel,
    watcher::Id,
};

/// Everything a room task reacts to
#[derive(Debug)]
pub enum Command<T> {
    /// Admit a participant, or reconnect a known one with a fresh tunnel
    Join {
        /// Participant ID
        id: Id,
        /// Requested username, ignored on reconnection
        username: String,
        /// Connection to the participant
        tunnel: T,
        /// Outcome of the admission
        reply: oneshot::Sender<Result<(), Error>>,
    },
    /// The participant's connection dropped
    Disconnect(Id),
    /// The participant left for good
    Leave(Id),
    /// A message from a participant
    Message(Id, IncomingMessage),
    /// A scheduled alarm came due
    Alarm(AlarmMessage),
}

/// Sending side of a room task
#[derive(Debug)]
#[derive_where(Clone)]
pub struct RoomHandle<T> {
    sender: mpsc::UnboundedSender<Command<T>>,
}

impl<T> RoomHandle<T> {
    /// Admits a participant and waits for the outcome
    ///
    /// # Errors
    ///
    /// Returns whatever [`Room::join`] returns, or `Error::Closed` if the
    /// room has shut down.
    pub async fn join(&self, id: Id, username: String, tunnel: T) -> Result<(), Error> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Command::Join {
                id,
                username,
                tunnel,
                reply,
            })
            .map_err(|_| Error::Closed)?;
        response.await.map_err(|_| Error::Closed)?
    }

    /// Reports a dropped connection
    pub fn disconnect(&self, id: Id) {
        let _ = self.sender.send(Command::Disconnect(id));
    }

    /// Reports that a participant left for good
    pub fn leave(&self, id: Id) {
        let _ = self.sender.send(Command::Leave(id));
    }

    /// Forwards a participant's message
    pub fn send(&self, id: Id, message: IncomingMessage) {
        let _ = self.sender.send(Command::Message(id, message));
    }

    /// Whether the room task has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Registry of running rooms
#[derive_where(Clone)]
pub struct Lobby<T> {
    rooms: Arc<DashMap<RoomCode, RoomHandle<T>>>,
    settings: Settings,
    summaries: mpsc::UnboundedSender<(RoomCode, GameSummary)>,
}

impl<T: Tunnel + Clone + Send + 'static> Lobby<T> {
    /// Creates an empty lobby whose rooms use `settings`
    ///
    /// The receiver yields one summary per finished game.
    pub fn new(settings: Settings) -> (Self, mpsc::UnboundedReceiver<(RoomCode, GameSummary)>) {
        let (summaries, receiver) = mpsc::unbounded_channel();
        (
            Self {
                rooms: Arc::new(DashMap::new()),
                settings,
                summaries,
            },
            receiver,
        )
    }

    /// Opens a room and spawns its task
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns whatever [`Room::new`] returns, or `Error::LobbyFull` if no
    /// room code is free.
    pub fn open(
        &self,
        quiz: Quiz,
        mode: Mode,
        organiser: Id,
        organiser_name: &str,
        tunnel: T,
    ) -> Result<RoomCode, Error> {
        if self.rooms.len() >= CODE_SPACE {
            return Err(Error::LobbyFull);
        }
        let room = Room::new(quiz, mode, self.settings, organiser, organiser_name)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let code = loop {
            if let Entry::Vacant(slot) = self.rooms.entry(RoomCode::new()) {
                let code = *slot.key();
                slot.insert(RoomHandle {
                    sender: sender.clone(),
                });
                break code;
            }
        };

        let mut tunnels = HashMap::new();
        tunnels.insert(organiser, tunnel);

        let task = RoomTask {
            code,
            room,
            tunnels,
            alarms: sender.downgrade(),
            rooms: Arc::clone(&self.rooms),
            summaries: self.summaries.clone(),
        };
        drop(sender);

        info!(%code, ?mode, "room registered");
        tokio::spawn(task.run(receiver));

        Ok(code)
    }

    /// Looks up a running room
    pub fn get(&self, code: RoomCode) -> Option<RoomHandle<T>> {
        self.rooms.get(&code).map(|handle| handle.clone())
    }

    /// Unregisters a room, stopping its task once every handle is dropped
    pub fn close(&self, code: RoomCode) -> bool {
        self.rooms.remove(&code).is_some()
    }

    /// Number of registered rooms
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room is registered
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

struct RoomTask<T> {
    code: RoomCode,
    room: Room,
    tunnels: HashMap<Id, T>,
    alarms: mpsc::WeakUnboundedSender<Command<T>>,
    rooms: Arc<DashMap<RoomCode, RoomHandle<T>>>,
    summaries: mpsc::UnboundedSender<(RoomCode, GameSummary)>,
}

impl<T: Tunnel + Clone + Send + 'static> RoomTask<T> {
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Command<T>>) {
        while let Some(command) = receiver.recv().await {
            self.handle(command);

            if let Some(summary) = self.room.take_summary() {
                let _ = self.summaries.send((self.code, summary));
            }

            let tunnels = &self.tunnels;
            if self.room.should_teardown(|id| tunnels.get(&id).cloned()) {
                break;
            }
        }

        self.rooms.remove(&self.code);
        info!(code = %self.code, "room torn down");
    }

    fn handle(&mut self, command: Command<T>) {
        let alarms = self.alarms.clone();
        let schedule_message = move |alarm: AlarmMessage, delay: Duration| {
            let alarms = alarms.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(sender) = alarms.upgrade() {
                    let _ = sender.send(Command::Alarm(alarm));
                }
            });
        };

        match command {
            Command::Join {
                id,
                username,
                tunnel,
                reply,
            } => {
                let known = self.room.player(id).is_some();
                self.tunnels.insert(id, tunnel);

                let tunnels = &self.tunnels;
                let result = self
                    .room
                    .join(id, &username, |id| tunnels.get(&id).cloned());
                if result.is_err() && !known {
                    self.tunnels.remove(&id);
                }
                let _ = reply.send(result);
            }
            Command::Disconnect(id) => {
                debug!(code = %self.code, participant = %id, "participant disconnected");
                self.tunnels.remove(&id);
            }
            Command::Leave(id) => {
                let tunnels = &self.tunnels;
                self.room
                    .leave(id, schedule_message, |id| tunnels.get(&id).cloned());
                self.tunnels.remove(&id);
            }
            Command::Message(id, message) => {
                let tunnels = &self.tunnels;
                self.room
                    .receive_message(id, message, schedule_message, |id| {
                        tunnels.get(&id).cloned()
                    });
            }
            Command::Alarm(alarm) => {
                let tunnels = &self.tunnels;
                self.room
                    .receive_alarm(alarm, schedule_message, |id| tunnels.get(&id).cloned());
            }
        }

        let room = &self.room;
        self.tunnels.retain(|id, _| room.player(*id).is_some());
    }
}
