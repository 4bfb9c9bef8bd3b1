//! Undercover Server Edge
//!
//! Hosts any number of independent games, one per chat room, on behalf of a
//! chat transport. It owns:
//! - The room → session mapping and its lifecycle
//! - The process-wide word category and the dictionary
//! - The random source for role and word draws
//! - Translation between wire messages and engine operations
//!
//! # Architecture
//!
//! The transport resolves platform facts (friendship, moderator rights,
//! mentions) before calling in. Calls for one room must be serialized by
//! the caller; the registry itself is a plain `&mut self` owner.
//!
//! A session leaves the mapping when it finishes or is deleted, so the room
//! is immediately free for a new game.

#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod intent;

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use prost::Message;
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{debug, info, warn};
use undercover_engine::{
    BanError, BanOutcome, CapacityError, CategoryError, ChatError, ChatOutcome, DeleteError,
    EndDiscussionError, GameSession, JoinError, LeaveError, Occupancy, PlayerId,
    SelectCategoryError, StartError, StartReport, VoteError, VoteOutcome, VotingRound, WordAssigner,
    WordBank,
};
use undercover_wire::{IntentProto, OutcomeProto};

use codec::{encode_outcome, reject};
use config::{ConfigError, ServerConfig};
use intent::{Intent, Outcome, Rejection};

/// Chat room identifier, opaque to the engine.
pub type RoomId = u64;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateError {
    #[error("room {0} already has a game")]
    AlreadyExists(RoomId),
}

/// Failure of an operation addressed to a room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError<E> {
    #[error("room {0} has no game")]
    NotFound(RoomId),
    #[error("{0}")]
    Session(E),
}

// ============================================================================
// Session Registry
// ============================================================================

/// All live games of one process.
pub struct SessionRegistry {
    config: ServerConfig,
    sessions: HashMap<RoomId, GameSession>,
    assigner: WordAssigner,
    rng: StdRng,
}

impl SessionRegistry {
    /// Create a registry over an already loaded dictionary.
    pub fn new(config: ServerConfig, bank: WordBank) -> Result<Self, ConfigError> {
        config.session.validate()?;
        let assigner = WordAssigner::new(bank, config.default_category.clone())?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        info!(
            category = assigner.category(),
            categories = assigner.bank().categories().count(),
            seeded = config.seed.is_some(),
            "session registry ready"
        );

        Ok(Self {
            config,
            sessions: HashMap::new(),
            assigner,
            rng,
        })
    }

    /// Create a registry, reading the dictionary the config points at.
    pub fn from_config(config: ServerConfig) -> Result<Self, ConfigError> {
        let bank = config.load_word_bank()?;
        Self::new(config, bank)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the game in `room_id`, if any.
    pub fn session(&self, room_id: RoomId) -> Option<&GameSession> {
        self.sessions.get(&room_id)
    }

    /// Number of live games.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// The process-wide default category.
    pub fn word_category(&self) -> &str {
        self.assigner.category()
    }

    /// Every category in the dictionary, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.assigner.bank().categories().map(str::to_string).collect()
    }

    /// Switch the default category for games started from now on.
    pub fn change_word_category(&mut self, category: &str) -> Result<(), CategoryError> {
        self.assigner.change_category(category)?;
        info!(category, "word category changed");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Open a game in `room_id` hosted by `host_id`. The host is not enrolled.
    pub fn create_session(
        &mut self,
        room_id: RoomId,
        host_id: PlayerId,
    ) -> Result<&GameSession, CreateError> {
        match self.sessions.entry(room_id) {
            Entry::Occupied(_) => Err(CreateError::AlreadyExists(room_id)),
            Entry::Vacant(slot) => {
                info!(room_id, host_id, "game created");
                Ok(slot.insert(GameSession::new(host_id, self.config.session)))
            }
        }
    }

    /// Remove the game in `room_id`, whatever its phase, and return it.
    pub fn delete_session(
        &mut self,
        room_id: RoomId,
        caller_id: PlayerId,
        is_privileged: bool,
    ) -> Result<GameSession, RoomError<DeleteError>> {
        let Some(session) = self.sessions.get(&room_id) else {
            return Err(RoomError::NotFound(room_id));
        };
        session
            .authorize_delete(caller_id, is_privileged)
            .map_err(RoomError::Session)?;

        let Some(session) = self.sessions.remove(&room_id) else {
            return Err(RoomError::NotFound(room_id));
        };
        info!(room_id, caller_id, status = %session.status(), "game deleted");
        Ok(session)
    }

    // ------------------------------------------------------------------------
    // Lobby
    // ------------------------------------------------------------------------

    pub fn join_session(
        &mut self,
        room_id: RoomId,
        player_id: PlayerId,
        is_friend: bool,
    ) -> Result<Occupancy, RoomError<JoinError>> {
        let occupancy = self
            .session_mut(room_id)
            .and_then(|session| {
                session
                    .join(player_id, is_friend)
                    .map_err(RoomError::Session)
            })?;
        debug!(room_id, player_id, joined = occupancy.joined, "player joined");
        Ok(occupancy)
    }

    pub fn leave_session(
        &mut self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<Occupancy, RoomError<LeaveError>> {
        let occupancy = self
            .session_mut(room_id)
            .and_then(|session| {
                session
                    .leave(player_id)
                    .map_err(RoomError::Session)
            })?;
        debug!(room_id, player_id, joined = occupancy.joined, "player left");
        Ok(occupancy)
    }

    pub fn ban_player(
        &mut self,
        room_id: RoomId,
        caller_id: PlayerId,
        target_id: Option<PlayerId>,
    ) -> Result<BanOutcome, RoomError<BanError>> {
        let outcome = self
            .session_mut(room_id)
            .and_then(|session| {
                session
                    .ban(caller_id, target_id)
                    .map_err(RoomError::Session)
            })?;
        debug!(room_id, target_id, removed = outcome.removed, "player banned");
        Ok(outcome)
    }

    pub fn set_max_players(
        &mut self,
        room_id: RoomId,
        caller_id: PlayerId,
        max_players: usize,
    ) -> Result<(), RoomError<CapacityError>> {
        self.session_mut(room_id)
            .and_then(|session| {
                session
                    .set_max_players(caller_id, max_players)
                    .map_err(RoomError::Session)
            })?;
        debug!(room_id, max_players, "capacity changed");
        Ok(())
    }

    /// Pick the category this room's game draws from.
    pub fn select_category(
        &mut self,
        room_id: RoomId,
        caller_id: PlayerId,
        category: &str,
    ) -> Result<(), RoomError<SelectCategoryError>> {
        let Some(session) = self.sessions.get_mut(&room_id) else {
            return Err(RoomError::NotFound(room_id));
        };
        session
            .select_category(caller_id, category, self.assigner.bank())
            .map_err(RoomError::Session)?;
        debug!(room_id, category, "room category selected");
        Ok(())
    }

    pub fn start_session(
        &mut self,
        room_id: RoomId,
        caller_id: PlayerId,
    ) -> Result<StartReport, RoomError<StartError>> {
        let Some(session) = self.sessions.get_mut(&room_id) else {
            return Err(RoomError::NotFound(room_id));
        };
        let report = session
            .start(caller_id, &self.assigner, &mut self.rng)
            .map_err(RoomError::Session)?;
        info!(
            room_id,
            players = report.assignments.len(),
            category = session.category().unwrap_or(self.assigner.category()),
            "game started"
        );
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Play
    // ------------------------------------------------------------------------

    /// Screen a chat line. A leak finishes the game and frees the room.
    pub fn submit_chat_line(
        &mut self,
        room_id: RoomId,
        player_id: PlayerId,
        text: &str,
    ) -> Result<ChatOutcome, RoomError<ChatError>> {
        let outcome = self
            .session_mut(room_id)
            .and_then(|session| {
                session
                    .submit_chat_line(player_id, text)
                    .map_err(RoomError::Session)
            })?;

        if let ChatOutcome::Leaked(report) = &outcome {
            info!(
                room_id,
                player_id,
                winner = report.victory.winner.as_str(),
                "word leaked, game over"
            );
            self.sessions.remove(&room_id);
        }
        Ok(outcome)
    }

    pub fn end_discussion(
        &mut self,
        room_id: RoomId,
        caller_id: PlayerId,
    ) -> Result<VotingRound, RoomError<EndDiscussionError>> {
        let round = self
            .session_mut(room_id)
            .and_then(|session| {
                session
                    .end_discussion(caller_id)
                    .map_err(RoomError::Session)
            })?;
        debug!(room_id, candidates = round.candidates.len(), "voting opened");
        Ok(round)
    }

    /// Record a ballot. A decisive round that ends the game frees the room.
    pub fn cast_vote(
        &mut self,
        room_id: RoomId,
        voter_id: PlayerId,
        target_index: usize,
    ) -> Result<VoteOutcome, RoomError<VoteError>> {
        let outcome = self
            .session_mut(room_id)
            .and_then(|session| {
                session
                    .cast_vote(voter_id, target_index)
                    .map_err(RoomError::Session)
            })?;

        match &outcome {
            VoteOutcome::Accepted(progress) => {
                debug!(
                    room_id,
                    cast = progress.cast,
                    eligible = progress.eligible,
                    "ballot recorded"
                );
            }
            VoteOutcome::Tie { leaders } => {
                debug!(room_id, ?leaders, "round tied, discussion resumes");
            }
            VoteOutcome::Eliminated {
                player_id,
                role,
                report,
                ..
            } => {
                info!(room_id, player_id, role = role.as_str(), "player eliminated");
                if let Some(report) = report {
                    info!(room_id, winner = report.victory.winner.as_str(), "game over");
                    self.sessions.remove(&room_id);
                }
            }
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------------

    /// Run one typed intent.
    pub fn dispatch(&mut self, intent: Intent) -> Result<Outcome, Rejection> {
        debug!(?intent, "dispatching intent");
        let result = match intent {
            Intent::Create { room_id, host_id } => self
                .create_session(room_id, host_id)
                .map(|_| Outcome::Created)
                .map_err(reject),
            Intent::Delete {
                room_id,
                caller_id,
                is_privileged,
            } => self
                .delete_session(room_id, caller_id, is_privileged)
                .map(|_| Outcome::Deleted)
                .map_err(reject),
            Intent::Join {
                room_id,
                player_id,
                is_friend,
            } => self
                .join_session(room_id, player_id, is_friend)
                .map(Outcome::Joined)
                .map_err(reject),
            Intent::Leave { room_id, player_id } => self
                .leave_session(room_id, player_id)
                .map(Outcome::Left)
                .map_err(reject),
            Intent::Ban {
                room_id,
                caller_id,
                target_id,
            } => self
                .ban_player(room_id, caller_id, target_id)
                .map(Outcome::Banned)
                .map_err(reject),
            Intent::Start { room_id, caller_id } => self
                .start_session(room_id, caller_id)
                .map(Outcome::Started)
                .map_err(reject),
            Intent::ChatLine {
                room_id,
                player_id,
                text,
            } => self
                .submit_chat_line(room_id, player_id, &text)
                .map(Outcome::Chat)
                .map_err(reject),
            Intent::EndDiscussion { room_id, caller_id } => self
                .end_discussion(room_id, caller_id)
                .map(Outcome::VotingStarted)
                .map_err(reject),
            Intent::Vote {
                room_id,
                voter_id,
                target_index,
            } => self
                .cast_vote(room_id, voter_id, target_index)
                .map(Outcome::Vote)
                .map_err(reject),
            Intent::ChangeCategory { category } => self
                .change_word_category(&category)
                .map(|()| Outcome::CategoryChanged)
                .map_err(reject),
            Intent::SelectCategory {
                room_id,
                caller_id,
                category,
            } => self
                .select_category(room_id, caller_id, &category)
                .map(|()| Outcome::CategorySelected)
                .map_err(reject),
            Intent::SetMaxPlayers {
                room_id,
                caller_id,
                max_players,
            } => self
                .set_max_players(room_id, caller_id, max_players)
                .map(|()| Outcome::CapacityChanged)
                .map_err(reject),
            Intent::ListCategories => Ok(Outcome::Categories(self.categories())),
        };

        if let Err(rejection) = &result {
            debug!(code = ?rejection.code, detail = %rejection.detail, "intent rejected");
        }
        result
    }

    /// Decode an [`IntentProto`], run it and encode the [`OutcomeProto`].
    ///
    /// Undecodable or incomplete intents yield a MALFORMED outcome and leave
    /// every session untouched.
    pub fn handle_encoded(&mut self, bytes: &[u8]) -> Vec<u8> {
        let response = match IntentProto::decode(bytes) {
            Ok(proto) => match Intent::try_from(proto) {
                Ok(intent) => encode_outcome(&self.dispatch(intent)),
                Err(reason) => {
                    warn!(reason, "incomplete intent");
                    OutcomeProto::malformed(reason)
                }
            },
            Err(err) => {
                warn!(error = %err, len = bytes.len(), "undecodable intent");
                OutcomeProto::malformed(err.to_string())
            }
        };
        response.encode_to_vec()
    }

    fn session_mut<E>(&mut self, room_id: RoomId) -> Result<&mut GameSession, RoomError<E>> {
        self.sessions
            .get_mut(&room_id)
            .ok_or(RoomError::NotFound(room_id))
    }
}

// ============================================================================
// Tests
// ============================================================================
