//! Room orchestration
//!
//! A [`Room`] owns the game cursor, the timer, the grading and voting
//! bookkeeping and the membership registry of one live quiz. Everything that
//! happens to a room arrives through one of three entry points:
//! [`Room::receive_message`] for participant commands,
//! [`Room::receive_alarm`] for scheduled alarms and [`Room::join`] /
//! [`Room::leave`] for membership changes. Each entry point runs to
//! completion and then re-evaluates the state machine until it settles,
//! running the entry side effects of every state it passes through.
//!
//! Invalid commands are ignored without an error; the transport decides
//! what, if anything, to tell the sender.

use std::{sync::Arc, time::Duration};

use garde::Validate;
use indexmap::IndexSet;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tracing::{debug, info, warn};
use web_time::SystemTime;

use crate::{
    TruncatedVec,
    config::Settings,
    constants::room::LEADERBOARD_LIMIT,
    error::Error,
    game::Game,
    grades::{Grade, GradeCounts, GradeManager},
    leaderboard::{Leaderboard, Standing},
    mode::Mode,
    names::Names,
    player::{self, Player, PlayerState, RoundResult},
    quiz::{Question, QuestionType, QuestionView, Quiz},
    session::Tunnel,
    state::{Snapshot, State},
    timer::{self, TickHandler, Timer},
    verificator::Verificator,
    votes::{Selection, VoteList},
    watcher::{Id, Role, Watchers},
};

/// Alarms scheduled by the room itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Leave the answers screen of the given round
    Advance {
        /// Round the alarm was scheduled in
        round: usize,
    },
}

/// Messages received from participants, split by the sender's authority
#[derive(Debug, Deserialize, Clone)]
pub enum IncomingMessage {
    /// Commands only the organiser may send
    Organiser(IncomingOrganiserMessage),
    /// Answers sent by whoever plays in this room
    Player(IncomingPlayerMessage),
}

/// Commands sent by the organiser
#[derive(Debug, Deserialize, Clone)]
pub enum IncomingOrganiserMessage {
    /// Start the game
    Start,
    /// Leave the answers screen
    Next,
    /// Stop the current round as if time ran out
    EndRound,
    /// Pause or resume the running countdown
    TogglePause,
    /// Grades for the current long answer round
    Grade(Vec<Grade>),
    /// Remove a participant from the room
    Kick(Id),
    /// Toggle whether a participant is muted
    Mute(Id),
    /// Close or open the room to new participants
    Lock(bool),
}

/// Messages sent by players while answering
#[derive(Debug, Deserialize, Clone)]
pub enum IncomingPlayerMessage {
    /// Toggle one choice of a multiple choice question
    Select(Selection),
    /// Submit the final multiple choice answer
    AnswerMcq(IndexSet<usize>),
    /// Update the long answer draft
    Draft {
        /// Whether the text differs from the previous draft
        is_changed: bool,
        /// The draft text
        answer_text: String,
    },
    /// Submit the final long answer
    AnswerLaq(String),
}

/// A player's long answer as shown to the organiser for grading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaqAnswer {
    /// Player username
    pub username: String,
    /// Captured answer, empty if none
    pub answer: String,
}

/// Record emitted once when a game finishes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSummary {
    /// Quiz title
    pub title: String,
    /// Players in the roster when the game started
    pub starting_player_count: usize,
    /// When the game started
    pub start_date: SystemTime,
    /// Best cumulative score
    pub highest_score: u64,
}

/// Updates broadcast while the game runs
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// Players currently waiting in the room
    Lobby(TruncatedVec<String>),
    /// Presentation countdown
    Presentation {
        /// Units left before the first question
        remaining: u64,
    },
    /// A new question is on screen
    NewQuestion {
        /// Zero-based question index
        index: usize,
        /// Number of questions in the quiz
        count: usize,
        /// The question without correctness information
        question: QuestionView,
    },
    /// Players may answer now
    Answering,
    /// Round countdown
    Countdown {
        /// Units left in the round
        remaining: u64,
    },
    /// The countdown switched to panic speed
    Panic,
    /// The countdown was paused or resumed
    Paused(bool),
    /// The round ran out of time
    TimedOut,
    /// The organiser is grading long answers
    Evaluating,
    /// Long answers to grade, organiser only
    LaqAnswers(Vec<LaqAnswer>),
    /// Results of the round are on screen
    ShowingAnswers {
        /// Texts of every correct choice
        correct_answers: Vec<String>,
        /// Final vote tally of the round
        votes: VoteList,
    },
    /// Live standings, organiser only
    Leaderboard(TruncatedVec<Standing>),
    /// Live vote tally, organiser only
    Votes(VoteList),
    /// Grade histogram per round, organiser only
    GradeCounts(Vec<GradeCounts>),
    /// Final standings and per-round statistics
    GameOver {
        /// Final standings
        leaderboard: TruncatedVec<Standing>,
        /// For each round, players who earned points and players who didn't
        stats: Vec<(usize, usize)>,
    },
    /// Whether the room accepts new participants, organiser only
    Locked(bool),
}

/// Full view of the current phase, sent on (re)connection
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum SyncMessage {
    /// Waiting for the organiser to start
    Joining {
        /// Players currently waiting
        players: TruncatedVec<String>,
        /// Whether the room is locked
        locked: bool,
    },
    /// Presentation countdown
    Presentation {
        /// Units left before the first question
        remaining: u64,
    },
    /// A question is being answered
    Answering {
        /// Zero-based question index
        index: usize,
        /// Number of questions in the quiz
        count: usize,
        /// The question without correctness information
        question: QuestionView,
        /// Units left in the round
        remaining: u64,
        /// The recipient's round state if they play
        player_state: Option<PlayerState>,
    },
    /// The round ran out of time
    TimedOut,
    /// The organiser is grading long answers
    Evaluation,
    /// Results of the round are on screen
    ShowingAnswers {
        /// Zero-based index of the question just shown
        index: usize,
        /// Number of questions in the quiz
        count: usize,
        /// Texts of every correct choice
        correct_answers: Vec<String>,
        /// The recipient's cumulative score if they play
        score: Option<u64>,
    },
    /// The game has finished
    Over {
        /// Final standings
        leaderboard: TruncatedVec<Standing>,
    },
    /// The recipient is not part of this room
    NotAllowed,
}

/// A live quiz room
#[derive(Debug)]
pub struct Room {
    game: Game,
    mode: Mode,
    settings: Settings,
    verificator: Verificator,
    timer: Timer,
    grades: GradeManager,
    votes: VoteList,
    vote_history: Vec<VoteList>,
    watchers: Watchers,
    names: Names,
    leaderboard: Leaderboard,
    organiser: Id,
    locked: bool,
    round: usize,
    round_question: usize,
    first_correct: Option<Id>,
    panicked: bool,
    teardown_armed: bool,
    timed_out_at: Option<SystemTime>,
    start_date: Option<SystemTime>,
    starting_player_count: usize,
    summary: Option<GameSummary>,
}

impl Room {
    /// Opens a room for `quiz` with the organiser already inside
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyQuiz` for a quiz without questions,
    /// `Error::Invalid` if the quiz or settings fail validation and
    /// `Error::Name` if the organiser's username is rejected.
    pub fn new(
        quiz: Quiz,
        mode: Mode,
        settings: Settings,
        organiser: Id,
        organiser_name: &str,
    ) -> Result<Self, Error> {
        if quiz.is_empty() {
            return Err(Error::EmptyQuiz);
        }
        quiz.validate()?;
        settings.validate()?;

        let mut names = Names::default();
        let username = names.set_name(organiser, organiser_name)?;
        let game = Game::new(Arc::new(quiz))?;
        let votes = VoteList::new(game.current_question());

        info!(organiser = %organiser, ?mode, title = %game.quiz().title, "room opened");

        Ok(Self {
            game,
            mode,
            verificator: Verificator::new(settings.first_correct_bonus),
            timer: Timer::new(&settings),
            settings,
            grades: GradeManager::default(),
            votes,
            vote_history: Vec::new(),
            watchers: Watchers::with_organiser(organiser, Player::new(username)),
            names,
            leaderboard: Leaderboard::default(),
            organiser,
            locked: false,
            round: 0,
            round_question: 0,
            first_correct: None,
            panicked: false,
            teardown_armed: false,
            timed_out_at: None,
            start_date: None,
            starting_player_count: 0,
            summary: None,
        })
    }

    // Queries

    /// Current phase
    pub fn state(&self) -> State {
        self.game.state()
    }

    /// How this room is played
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The organiser's participant ID
    pub fn organiser(&self) -> Id {
        self.organiser
    }

    /// Whether the room refuses new participants
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// A participant's player record
    pub fn player(&self, id: Id) -> Option<&Player> {
        self.watchers.player(id)
    }

    /// A participant's role
    pub fn role(&self, id: Id) -> Option<Role> {
        self.watchers.role(id)
    }

    /// The live vote tally of the current round
    pub fn votes(&self) -> &VoteList {
        &self.votes
    }

    /// Final vote tallies of every round shown so far
    pub fn vote_history(&self) -> &[VoteList] {
        &self.vote_history
    }

    /// Grade histograms of every round shown so far
    pub fn grade_history(&self) -> &[GradeCounts] {
        self.grades.history()
    }

    /// The room's timer
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// When the current round ran out of time, if it did
    pub fn timed_out_at(&self) -> Option<SystemTime> {
        self.timed_out_at
    }

    /// Number of rounds started
    pub fn round(&self) -> usize {
        self.round
    }

    /// Whether the room can be dropped
    ///
    /// True while still joining if the organiser has no live connection, or
    /// once a round has started and nobody is connected anymore.
    pub fn should_teardown<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, tunnel_finder: F) -> bool {
        if self.game.state().is_joining() {
            return !self.watchers.is_alive(self.organiser, &tunnel_finder);
        }
        self.teardown_armed
            && self
                .watchers
                .iter()
                .all(|(id, _)| !self.watchers.is_alive(id, &tunnel_finder))
    }

    /// Yields the game summary once the game is over
    pub fn take_summary(&mut self) -> Option<GameSummary> {
        self.summary.take()
    }

    // Membership

    /// Admits a new participant, or resynchronizes a known one
    ///
    /// # Errors
    ///
    /// Returns `Error::Locked` if the room is locked, `Error::Name` if the
    /// username is rejected and `Error::Membership` if the room is full.
    pub fn join<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        watcher_id: Id,
        username: &str,
        tunnel_finder: F,
    ) -> Result<(), Error> {
        if self.watchers.has_watcher(watcher_id) {
            self.update_session(watcher_id, &tunnel_finder);
            return Ok(());
        }
        if self.locked {
            return Err(Error::Locked);
        }

        let username = self.names.set_name(watcher_id, username)?;
        if let Err(e) =
            self.watchers
                .add_watcher(watcher_id, self.mode.joiner_role(), Player::new(username))
        {
            self.names.release(watcher_id);
            return Err(e.into());
        }

        info!(participant = %watcher_id, "participant joined");

        if self.game.state().is_joining() {
            self.announce_lobby(&tunnel_finder);
        } else {
            self.send_organiser_leaderboard(&tunnel_finder);
        }
        self.update_session(watcher_id, &tunnel_finder);

        Ok(())
    }

    /// Handles a participant leaving voluntarily
    ///
    /// Before the game starts the participant is forgotten. Afterwards they
    /// stay on the leaderboard as [`PlayerState::Left`].
    pub fn leave<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        watcher_id: Id,
        mut schedule_message: S,
        tunnel_finder: F,
    ) {
        if self.game.state().is_joining() {
            if watcher_id == self.organiser || self.watchers.remove_watcher(watcher_id).is_none() {
                return;
            }
            self.names.release(watcher_id);
            info!(participant = %watcher_id, "participant left before start");
            self.announce_lobby(&tunnel_finder);
            return;
        }

        let Some(player) = self.watchers.player_mut(watcher_id) else {
            return;
        };
        if player.has_left() {
            return;
        }
        let selected = player.selected().clone();
        player.leave();

        info!(participant = %watcher_id, "participant left");

        if self.game.state() == State::Answering {
            self.withdraw_votes(&selected);
            self.send_organiser_votes(&tunnel_finder);
        }
        self.send_organiser_leaderboard(&tunnel_finder);
        self.evaluate(&mut schedule_message, &tunnel_finder);
    }

    // Incoming

    /// Checks that the sender may send this kind of message
    fn follows(&self, message: &IncomingMessage, watcher_id: Id, role: Role) -> bool {
        match message {
            IncomingMessage::Organiser(_) => watcher_id == self.organiser,
            IncomingMessage::Player(_) => self.mode.resolve_participant(role),
        }
    }

    /// Routes a participant's message
    pub fn receive_message<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        watcher_id: Id,
        message: IncomingMessage,
        mut schedule_message: S,
        tunnel_finder: F,
    ) {
        let Some(role) = self.watchers.role(watcher_id) else {
            return;
        };

        if !self.follows(&message, watcher_id, role) {
            warn!(participant = %watcher_id, ?role, ?message, "message not allowed for sender");
            return;
        }

        match message {
            IncomingMessage::Organiser(message) => self.receive_organiser_message(
                role,
                message,
                &mut schedule_message,
                &tunnel_finder,
            ),
            IncomingMessage::Player(message) => self.receive_player_message(
                watcher_id,
                message,
                &mut schedule_message,
                &tunnel_finder,
            ),
        }
    }

    fn receive_organiser_message<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        role: Role,
        message: IncomingOrganiserMessage,
        schedule_message: &mut S,
        tunnel_finder: &F,
    ) {
        let state = self.game.state();

        match message {
            IncomingOrganiserMessage::Start => {
                if !state.is_joining() || !self.mode.can_start(role) {
                    return;
                }
                self.game.receive_start();
                self.start_date = Some(SystemTime::now());
                self.watchers.set_role(self.organiser, self.mode.post_start());
                self.starting_player_count = self.roster(tunnel_finder).len();

                info!(
                    organiser = %self.organiser,
                    mode = ?self.mode,
                    players = self.starting_player_count,
                    "game started"
                );
            }
            IncomingOrganiserMessage::Next => {
                if state != State::ShowingAnswers {
                    return;
                }
                self.game.mark_ready();
            }
            IncomingOrganiserMessage::EndRound => {
                if state != State::Answering {
                    return;
                }
                self.timer.skip();
                self.timer.pause();
            }
            IncomingOrganiserMessage::TogglePause => {
                if !matches!(state, State::Presentation | State::Answering) {
                    return;
                }
                let paused = self.timer.toggle_pause(schedule_message);
                self.watchers
                    .announce(&UpdateMessage::Paused(paused).into(), tunnel_finder);
                return;
            }
            IncomingOrganiserMessage::Grade(grades) => {
                if state != State::Evaluation {
                    return;
                }
                self.grades.grade(grades);
            }
            IncomingOrganiserMessage::Kick(target) => {
                if !self.kick(target, tunnel_finder) {
                    return;
                }
            }
            IncomingOrganiserMessage::Mute(target) => {
                self.toggle_mute(target, tunnel_finder);
                return;
            }
            IncomingOrganiserMessage::Lock(locked) => {
                if self.mode.can_lock(self.game.received_start()) {
                    self.locked = locked;
                }
                self.send_organiser(UpdateMessage::Locked(self.locked), tunnel_finder);
                return;
            }
        }

        self.evaluate(schedule_message, tunnel_finder);
    }

    fn receive_player_message<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        watcher_id: Id,
        message: IncomingPlayerMessage,
        schedule_message: &mut S,
        tunnel_finder: &F,
    ) {
        if self.game.state() != State::Answering {
            return;
        }
        let question = self.game.current_question();
        let question_type = question.question_type();
        let choice_count = question.choices().len();

        let Some(player) = self.watchers.player_mut(watcher_id) else {
            return;
        };
        if matches!(player.state(), PlayerState::Submitted | PlayerState::Left) {
            return;
        }

        match (message, question_type) {
            (IncomingPlayerMessage::Select(selection), QuestionType::Mcq) => {
                if selection.index >= choice_count {
                    return;
                }
                if player.select_answer(selection) {
                    self.votes.toggle(selection);
                }
                self.send_organiser_votes(tunnel_finder);
                self.send_organiser_leaderboard(tunnel_finder);
                return;
            }
            (IncomingPlayerMessage::AnswerMcq(answers), QuestionType::Mcq) => {
                let previous = player.selected().clone();
                for index in answers.difference(&previous) {
                    self.votes.toggle(Selection {
                        index: *index,
                        is_selected: true,
                    });
                }
                for index in previous.difference(&answers) {
                    self.votes.toggle(Selection {
                        index: *index,
                        is_selected: false,
                    });
                }

                if self.first_correct.is_none()
                    && self
                        .verificator
                        .verify_mcq(self.game.current_question(), &answers, false)
                        .is_correct
                {
                    self.first_correct = Some(watcher_id);
                }

                player.answer_mcq(answers);
                self.send_organiser_votes(tunnel_finder);
            }
            (
                IncomingPlayerMessage::Draft {
                    is_changed,
                    answer_text,
                },
                QuestionType::Laq,
            ) => {
                player.interact_laq(is_changed, answer_text);
                self.send_organiser_leaderboard(tunnel_finder);
                return;
            }
            (IncomingPlayerMessage::AnswerLaq(text), QuestionType::Laq) => {
                player.answer_laq(text);
            }
            (message, question_type) => {
                debug!(participant = %watcher_id, ?message, ?question_type, "answer does not fit question");
                return;
            }
        }

        self.send_organiser_leaderboard(tunnel_finder);
        self.evaluate(schedule_message, tunnel_finder);
    }

    /// Handles a scheduled alarm
    pub fn receive_alarm<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        message: crate::AlarmMessage,
        mut schedule_message: S,
        tunnel_finder: F,
    ) {
        match message {
            crate::AlarmMessage::Timer(timer::AlarmMessage::Tick { generation }) => {
                if !self.timer.fire(generation) {
                    return;
                }
                match self.timer.handler() {
                    Some(TickHandler::Presentation) => self.presentation_tick(&tunnel_finder),
                    Some(TickHandler::Answering) => self.answering_tick(&tunnel_finder),
                    None => {}
                }
                self.timer.rearm(&mut schedule_message);
            }
            crate::AlarmMessage::Room(AlarmMessage::Advance { round }) => {
                if self.game.state() != State::ShowingAnswers || round != self.round {
                    return;
                }
                self.game.mark_ready();
            }
        }

        self.evaluate(&mut schedule_message, &tunnel_finder);
    }

    // Ticks

    fn presentation_tick<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, tunnel_finder: &F) {
        self.watchers.announce(
            &UpdateMessage::Presentation {
                remaining: self.timer.remaining(),
            }
            .into(),
            tunnel_finder,
        );
        if self.timer.is_done() {
            self.timer.pause();
        }
    }

    fn answering_tick<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, tunnel_finder: &F) {
        let remaining = self.timer.remaining();
        self.watchers
            .announce(&UpdateMessage::Countdown { remaining }.into(), tunnel_finder);

        let threshold = match self.current_question_type() {
            QuestionType::Mcq => self.settings.mcq_panic_threshold,
            QuestionType::Laq => self.settings.laq_panic_threshold,
        };
        if !self.panicked && remaining > 0 && remaining <= threshold {
            self.panicked = true;
            self.timer.panic();
            debug!(remaining, round = self.round, "round panicking");
            self.watchers.announce(&UpdateMessage::Panic.into(), tunnel_finder);
        }

        if self.timer.is_done() {
            self.timer.pause();
        }
    }

    // State machine

    fn snapshot<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, tunnel_finder: &F) -> Snapshot {
        let roster = self.roster(tunnel_finder);

        Snapshot {
            received_start: self.game.received_start(),
            timer_done: self.timer.is_done(),
            question_type: self.current_question_type(),
            all_submitted: !roster.is_empty()
                && roster
                    .iter()
                    .all(|id| self.watchers.player(*id).is_some_and(Player::has_submitted)),
            graded: self.grades.is_graded(),
            ready_for_next: self.game.is_ready_for_next_question(),
            has_next_question: self.game.has_next_question(),
        }
    }

    /// Applies transitions until the state machine settles
    fn evaluate<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        schedule_message: &mut S,
        tunnel_finder: &F,
    ) {
        loop {
            let current = self.game.state();
            let next = current.next(&self.snapshot(tunnel_finder));
            if next == current {
                return;
            }

            debug!(from = %current, to = %next, question = self.game.question_index(), "state transition");
            self.game.set_state(next);

            match next {
                State::Joining => {}
                State::Presentation => self.enter_presentation(schedule_message, tunnel_finder),
                State::Answering => self.enter_answering(schedule_message, tunnel_finder),
                State::TimedOut => self.enter_timed_out(tunnel_finder),
                State::Evaluation => self.enter_evaluation(tunnel_finder),
                State::ShowingAnswers => self.enter_showing_answers(schedule_message, tunnel_finder),
                State::Over => self.enter_over(tunnel_finder),
            }
        }
    }

    fn enter_presentation<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        schedule_message: &mut S,
        tunnel_finder: &F,
    ) {
        self.timer.on_tick(TickHandler::Presentation);
        self.timer
            .start_countdown(self.settings.presentation_delay, schedule_message);
        self.watchers.announce(
            &UpdateMessage::Presentation {
                remaining: self.timer.remaining(),
            }
            .into(),
            tunnel_finder,
        );
    }

    fn enter_answering<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        schedule_message: &mut S,
        tunnel_finder: &F,
    ) {
        self.game.clear_ready();
        self.round += 1;
        self.round_question = self.game.question_index();
        self.first_correct = None;
        self.panicked = false;
        self.timed_out_at = None;
        self.timer.stop_panicking();

        let question = self.game.current_question();
        let time_limit = question.time_limit;
        let view = question.view();

        self.watchers.announce(
            &UpdateMessage::NewQuestion {
                index: self.round_question,
                count: self.game.question_count(),
                question: view,
            }
            .into(),
            tunnel_finder,
        );
        self.watchers
            .announce(&UpdateMessage::Answering.into(), tunnel_finder);

        self.teardown_armed = true;

        for player in self.watchers.players_mut() {
            player.start_round();
        }
        self.grades.start_round();
        self.votes = VoteList::new(self.game.current_question());

        self.send_organiser_leaderboard(tunnel_finder);
        self.send_organiser_votes(tunnel_finder);

        self.timer.on_tick(TickHandler::Answering);
        self.timer.start_countdown(time_limit, schedule_message);
    }

    fn enter_timed_out<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, tunnel_finder: &F) {
        self.timer.pause();
        self.timed_out_at = Some(SystemTime::now());

        let question_type = self.current_question_type();
        for id in self.scoring_roster() {
            if let Some(player) = self.watchers.player_mut(id) {
                player.capture_draft(question_type);
            }
        }

        self.watchers
            .announce(&UpdateMessage::TimedOut.into(), tunnel_finder);
    }

    fn enter_evaluation<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, tunnel_finder: &F) {
        self.timer.pause();

        let answers = self
            .scoring_roster()
            .into_iter()
            .filter_map(|id| self.watchers.player(id))
            .map(|player| LaqAnswer {
                username: player.username().to_owned(),
                answer: player.laq_answer().to_owned(),
            })
            .collect_vec();
        self.send_organiser(UpdateMessage::LaqAnswers(answers), tunnel_finder);

        let organiser = self.organiser;
        self.watchers.announce_with(
            |id, _| (id != organiser).then(|| UpdateMessage::Evaluating.into()),
            tunnel_finder,
        );
    }

    fn enter_showing_answers<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        schedule_message: &mut S,
        tunnel_finder: &F,
    ) {
        self.timer.pause();

        let Some(question) = self.game.question(self.round_question).cloned() else {
            return;
        };
        let question_type = question.question_type();

        let mut scores = Vec::new();
        for id in self.scoring_roster() {
            let Some(player) = self.watchers.player_mut(id) else {
                continue;
            };
            let verdict = match question_type {
                QuestionType::Mcq => self.verificator.verify_mcq(
                    &question,
                    player.mcq_answer(),
                    self.first_correct == Some(id),
                ),
                QuestionType::Laq => self
                    .verificator
                    .verify_laq(&question, self.grades.grade_for(player.username())),
            };
            player.add_points(&verdict);
            scores.push((id, verdict.points));

            let result = player::UpdateMessage::Result(RoundResult {
                verdict,
                score: player.score(),
            });
            self.watchers
                .send_message(&result.into(), id, tunnel_finder);
        }

        self.watchers.announce(
            &UpdateMessage::ShowingAnswers {
                correct_answers: question.correct_answers(),
                votes: self.votes.clone(),
            }
            .into(),
            tunnel_finder,
        );

        let grade_history = self.grades.push_grades().to_vec();
        self.vote_history.push(self.votes.clone());
        self.leaderboard.add_scores(&scores);

        self.send_organiser(UpdateMessage::GradeCounts(grade_history), tunnel_finder);
        self.send_organiser_leaderboard(tunnel_finder);

        if !self.game.advance() {
            let standings = self.standings();
            self.leaderboard.finalize(standings);
        }

        if let Some(delay) = self.mode.auto_advance(&self.settings) {
            schedule_message(AlarmMessage::Advance { round: self.round }.into(), delay);
        }
    }

    fn enter_over<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, tunnel_finder: &F) {
        self.timer.pause();

        let leaderboard = self
            .leaderboard
            .final_standings()
            .cloned()
            .unwrap_or_else(|| self.standings());
        self.watchers.announce(
            &UpdateMessage::GameOver {
                leaderboard,
                stats: self.leaderboard.round_stats(),
            }
            .into(),
            tunnel_finder,
        );

        let highest_score = self
            .watchers
            .ids(self.mode.roster_role())
            .filter_map(|id| self.watchers.player(id))
            .map(Player::score)
            .max()
            .unwrap_or_default();
        let summary = GameSummary {
            title: self.game.quiz().title.clone(),
            starting_player_count: self.starting_player_count,
            start_date: self.start_date.unwrap_or_else(SystemTime::now),
            highest_score,
        };
        info!(
            title = %summary.title,
            players = summary.starting_player_count,
            highest_score,
            "game over"
        );
        self.summary = Some(summary);

        self.watchers.set_role(self.organiser, Role::Member);

        let muted = self
            .watchers
            .iter()
            .filter(|(_, watcher)| watcher.player.is_muted())
            .map(|(id, _)| id)
            .collect_vec();
        for id in muted {
            if let Some(player) = self.watchers.player_mut(id) {
                player.set_muted(false);
            }
            self.watchers
                .send_message(&player::UpdateMessage::Muted(false).into(), id, tunnel_finder);
        }
    }

    // Organiser actions

    /// Removes a participant, returning whether anyone was removed
    fn kick<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, target: Id, tunnel_finder: &F) -> bool {
        if target == self.organiser {
            return false;
        }
        let Some(watcher) = self.watchers.remove_watcher(target) else {
            return false;
        };
        self.names.release(target);

        if self.game.state() == State::Answering {
            self.withdraw_votes(watcher.player.selected());
            self.send_organiser_votes(tunnel_finder);
        }

        self.watchers
            .send_message(&player::UpdateMessage::Kicked.into(), target, tunnel_finder);
        self.watchers.remove_watcher_session(target, tunnel_finder);

        info!(participant = %target, "participant kicked");

        if self.game.state().is_joining() {
            self.announce_lobby(tunnel_finder);
        } else {
            self.send_organiser_leaderboard(tunnel_finder);
        }
        true
    }

    fn toggle_mute<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, target: Id, tunnel_finder: &F) {
        let Some(player) = self.watchers.player_mut(target) else {
            return;
        };
        let is_muted = !player.is_muted();
        player.set_muted(is_muted);

        self.watchers.send_message(
            &player::UpdateMessage::Muted(is_muted).into(),
            target,
            tunnel_finder,
        );
        self.send_organiser_leaderboard(tunnel_finder);
    }

    // Helpers

    fn current_question_type(&self) -> QuestionType {
        self.game
            .question(self.round_question)
            .map_or(QuestionType::Mcq, Question::question_type)
    }

    /// Connected participants who answer and have not left
    fn roster<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, tunnel_finder: &F) -> Vec<Id> {
        self.watchers
            .live_ids(self.mode.roster_role(), tunnel_finder)
            .into_iter()
            .filter(|id| self.watchers.player(*id).is_some_and(|p| !p.has_left()))
            .collect_vec()
    }

    /// Registered participants who answer and have not left, connected or not
    fn scoring_roster(&self) -> Vec<Id> {
        self.watchers
            .ids(self.mode.roster_role())
            .filter(|id| self.watchers.player(*id).is_some_and(|p| !p.has_left()))
            .collect_vec()
    }

    fn standings(&self) -> TruncatedVec<Standing> {
        Leaderboard::standings(
            self.watchers
                .ids(self.mode.roster_role())
                .filter_map(|id| self.watchers.player(id)),
        )
    }

    fn lobby<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, tunnel_finder: &F) -> TruncatedVec<String> {
        let names = self
            .watchers
            .live_ids(self.mode.joiner_role(), tunnel_finder)
            .into_iter()
            .filter_map(|id| self.watchers.player(id))
            .map(|player| player.username().to_owned())
            .collect_vec();
        let exact_count = names.len();
        TruncatedVec::new(names.into_iter(), LEADERBOARD_LIMIT, exact_count)
    }

    fn withdraw_votes(&mut self, selected: &IndexSet<usize>) {
        for index in selected {
            self.votes.toggle(Selection {
                index: *index,
                is_selected: false,
            });
        }
    }

    fn announce_lobby<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, tunnel_finder: &F) {
        self.watchers
            .announce(&UpdateMessage::Lobby(self.lobby(tunnel_finder)).into(), tunnel_finder);
    }

    fn send_organiser<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        message: UpdateMessage,
        tunnel_finder: &F,
    ) {
        self.watchers
            .send_message(&message.into(), self.organiser, tunnel_finder);
    }

    fn send_organiser_leaderboard<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, tunnel_finder: &F) {
        self.send_organiser(UpdateMessage::Leaderboard(self.standings()), tunnel_finder);
    }

    fn send_organiser_votes<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, tunnel_finder: &F) {
        self.send_organiser(UpdateMessage::Votes(self.votes.clone()), tunnel_finder);
    }

    // Synchronization

    /// Builds the full view of the current phase for one participant
    pub fn state_message<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        watcher_id: Id,
        tunnel_finder: F,
    ) -> crate::SyncMessage {
        let Some(role) = self.watchers.role(watcher_id) else {
            return SyncMessage::NotAllowed.into();
        };
        let plays = self.mode.resolve_participant(role);
        let player = self.watchers.player(watcher_id).filter(|_| plays);

        match self.game.state() {
            State::Joining => SyncMessage::Joining {
                players: self.lobby(&tunnel_finder),
                locked: self.locked,
            },
            State::Presentation => SyncMessage::Presentation {
                remaining: self.timer.remaining(),
            },
            State::Answering => SyncMessage::Answering {
                index: self.round_question,
                count: self.game.question_count(),
                question: self.game.current_question().view(),
                remaining: self.timer.remaining(),
                player_state: player.map(Player::state),
            },
            State::TimedOut => SyncMessage::TimedOut,
            State::Evaluation => SyncMessage::Evaluation,
            State::ShowingAnswers => SyncMessage::ShowingAnswers {
                index: self.round_question,
                count: self.game.question_count(),
                correct_answers: self
                    .game
                    .question(self.round_question)
                    .map(Question::correct_answers)
                    .unwrap_or_default(),
                score: player.map(Player::score),
            },
            State::Over => SyncMessage::Over {
                leaderboard: self
                    .leaderboard
                    .final_standings()
                    .cloned()
                    .unwrap_or_else(|| self.standings()),
            },
        }
        .into()
    }

    /// Sends the current phase to one participant
    ///
    /// The organiser also receives the live leaderboard and vote tally.
    pub fn update_session<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        watcher_id: Id,
        tunnel_finder: F,
    ) {
        self.watchers.send_state(
            &self.state_message(watcher_id, &tunnel_finder),
            watcher_id,
            &tunnel_finder,
        );

        if watcher_id == self.organiser && self.game.state() == State::Answering {
            self.send_organiser_leaderboard(&tunnel_finder);
            self.send_organiser_votes(&tunnel_finder);
        }
    }
}
