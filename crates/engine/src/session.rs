//! Game session state machine.
//!
//! ```text
//! WAITING ──start──▶ DISCUSSING ──end discussion──▶ VOTING
//!                      ▲    │                         │
//!                      │    └──word leak──▶ FINISHED ◀┤ decisive + win
//!                      └──── tie, or decisive without a win
//! ```
//!
//! The roster, the words and the roles are frozen once the session leaves
//! WAITING. The per-round [`VoteTally`] exists only inside the VOTING phase.

use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use rand::seq::index;
use serde::Deserialize;
use thiserror::Error;

use crate::player::{Player, PlayerId, Role};
use crate::tally::{BallotError, RoundResult, TallyProgress, VoteTally};
use crate::words::{WordAssigner, WordBank, WordError, WordPair};

// ============================================================================
// Defaults
// ============================================================================

/// Fewest joined players a session can start with.
pub const DEFAULT_MIN_PLAYERS: usize = 3;

/// Most players a session admits.
pub const DEFAULT_MAX_PLAYERS: usize = 10;

/// Spies drawn at start.
pub const DEFAULT_SPY_COUNT: usize = 1;

/// Spies win once this many active players or fewer remain.
pub const SPY_WIN_THRESHOLD: usize = 2;

// ============================================================================
// Configuration
// ============================================================================

/// How a chat line is matched against the speaker's word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakRule {
    /// The line contains the whole word as a contiguous substring.
    #[default]
    Substring,
    /// The line contains any single (non-whitespace) character of the word.
    AnyCharacter,
}

impl LeakRule {
    /// Whether `line` exposes `word`.
    pub fn leaks(self, line: &str, word: &str) -> bool {
        match self {
            Self::Substring => !word.is_empty() && line.contains(word),
            Self::AnyCharacter => word
                .chars()
                .filter(|c| !c.is_whitespace())
                .any(|c| line.contains(c)),
        }
    }
}

/// Per-session rules, fixed once the session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub min_players: usize,
    pub max_players: usize,
    pub spy_count: usize,
    pub leak_rule: LeakRule,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_players: DEFAULT_MIN_PLAYERS,
            max_players: DEFAULT_MAX_PLAYERS,
            spy_count: DEFAULT_SPY_COUNT,
            leak_rule: LeakRule::Substring,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionConfigError {
    #[error("spy_count must be at least 1")]
    NoSpies,
    #[error(
        "min_players ({min_players}) must exceed {} for a vote to decide the game",
        SPY_WIN_THRESHOLD
    )]
    TooFewPlayers { min_players: usize },
    #[error("spy_count ({spy_count}) must be below min_players ({min_players})")]
    TooManySpies { spy_count: usize, min_players: usize },
    #[error("max_players ({max_players}) must be at least min_players ({min_players})")]
    CapacityBelowMinimum {
        max_players: usize,
        min_players: usize,
    },
}

impl SessionConfig {
    /// Check that every startable roster holds more players than spies and
    /// more than [`SPY_WIN_THRESHOLD`] players.
    ///
    /// At the threshold itself no elimination is possible: two active players
    /// can only vote for each other, so every round ties.
    pub fn validate(&self) -> Result<(), SessionConfigError> {
        if self.spy_count == 0 {
            return Err(SessionConfigError::NoSpies);
        }
        if self.min_players <= SPY_WIN_THRESHOLD {
            return Err(SessionConfigError::TooFewPlayers {
                min_players: self.min_players,
            });
        }
        if self.spy_count >= self.min_players {
            return Err(SessionConfigError::TooManySpies {
                spy_count: self.spy_count,
                min_players: self.min_players,
            });
        }
        if self.max_players < self.min_players {
            return Err(SessionConfigError::CapacityBelowMinimum {
                max_players: self.max_players,
                min_players: self.min_players,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Status and Results
// ============================================================================

/// Public view of the session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    Waiting,
    Discussing,
    Voting,
    Finished,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Discussing => "discussing",
            Self::Voting => "voting",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VictoryCause {
    /// No spy remains active.
    AllSpiesEliminated,
    /// Too few active players remain to outvote the spies.
    SpiesOutlasted,
    /// A player said their own word; their side lost.
    WordLeaked { by: PlayerId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Victory {
    pub winner: Role,
    pub cause: VictoryCause,
}

/// Final reveal of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameReport {
    pub victory: Victory,
    pub words: WordPair,
    /// Every joined player in roster order, with final role and liveness.
    pub players: Vec<Player>,
}

/// Joined count against capacity after a roster change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub joined: usize,
    pub capacity: usize,
}

/// Result of a successful ban.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BanOutcome {
    /// The target was in the roster and has been removed.
    pub removed: bool,
}

/// Secret assignments made at start, for private delivery to each player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    pub words: WordPair,
    /// Roster order.
    pub assignments: Vec<(PlayerId, Role)>,
}

/// Valid vote targets of a newly opened round: `(roster index, player)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingRound {
    pub candidates: Vec<(usize, PlayerId)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Nothing exposed; discussion continues.
    Clean,
    /// The speaker exposed their word and the game is over.
    Leaked(GameReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Ballot recorded; the round is still open.
    Accepted(TallyProgress),
    /// Round resolved without a single leader. Discussion resumes.
    Tie { leaders: Vec<usize> },
    /// Round resolved and one player is out. `report` is set when that ended
    /// the game; otherwise discussion resumes.
    Eliminated {
        index: usize,
        player_id: PlayerId,
        role: Role,
        report: Option<GameReport>,
    },
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("the room is full ({capacity} players)")]
    RoomFull { capacity: usize },
    #[error("player is banned from this session")]
    Banned,
    #[error("player must befriend the bot first")]
    FriendRequired,
    #[error("player has already joined")]
    AlreadyJoined,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeaveError {
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("the host cannot leave; delete the session instead")]
    IsHost,
    #[error("player has not joined")]
    NotJoined,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BanError {
    #[error("only the host can ban players")]
    NotHost,
    #[error("ban target could not be resolved")]
    InvalidTarget,
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("the host cannot ban themselves")]
    SelfBan,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("only the host can change capacity")]
    NotHost,
    #[error("capacity cannot be below the minimum of {min_players} players")]
    BelowMinimum { min_players: usize },
    #[error("capacity cannot be below the {joined} players already joined")]
    BelowRoster { joined: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectCategoryError {
    #[error("only the host can select the word category")]
    NotHost,
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("unknown word category `{0}`")]
    UnknownCategory(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("only the host can start the game")]
    NotHost,
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("{joined} players joined, at least {required} required")]
    InsufficientPlayers { joined: usize, required: usize },
    #[error(transparent)]
    Words(#[from] WordError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("chat lines are not judged while {0}")]
    WrongState(SessionStatus),
    #[error("speaker is not an active player")]
    NotActive,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndDiscussionError {
    #[error("only the host can end the discussion")]
    NotHost,
    #[error("no discussion to end while {0}")]
    WrongState(SessionStatus),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    #[error("votes are not accepted while {0}")]
    WrongState(SessionStatus),
    #[error("voter is not an active player")]
    NotActive,
    #[error(transparent)]
    Ballot(#[from] BallotError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeleteError {
    #[error("only the host or a moderator can delete the session")]
    NotAuthorized,
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone)]
enum Phase {
    Waiting,
    Discussing,
    Voting(VoteTally),
    Finished(Victory),
}

/// One game scoped to a room.
///
/// All methods are synchronous and never block. The host program must
/// serialize calls on a single session.
#[derive(Debug, Clone)]
pub struct GameSession {
    host_id: PlayerId,
    config: SessionConfig,
    phase: Phase,
    /// Join order; the index is the public vote-target reference.
    roster: Vec<Player>,
    ban_list: HashSet<PlayerId>,
    /// Host-selected category overriding the process-wide default.
    category: Option<String>,
    words: Option<WordPair>,
}

impl GameSession {
    /// Open a session in WAITING. The host is not enrolled automatically.
    ///
    /// `config` is expected to have passed [`SessionConfig::validate`].
    pub fn new(host_id: PlayerId, config: SessionConfig) -> Self {
        debug_assert!(config.validate().is_ok(), "invalid session config");
        Self {
            host_id,
            config,
            phase: Phase::Waiting,
            roster: Vec::new(),
            ban_list: HashSet::new(),
            category: None,
            words: None,
        }
    }

    pub fn host_id(&self) -> PlayerId {
        self.host_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        match self.phase {
            Phase::Waiting => SessionStatus::Waiting,
            Phase::Discussing => SessionStatus::Discussing,
            Phase::Voting(_) => SessionStatus::Voting,
            Phase::Finished(_) => SessionStatus::Finished,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished(_))
    }

    pub fn victory(&self) -> Option<Victory> {
        match self.phase {
            Phase::Finished(victory) => Some(victory),
            _ => None,
        }
    }

    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.roster.iter().find(|p| p.id() == id)
    }

    pub fn active_players(&self) -> impl Iterator<Item = (usize, &Player)> {
        self.roster.iter().enumerate().filter(|(_, p)| p.is_active())
    }

    pub fn is_banned(&self, id: PlayerId) -> bool {
        self.ban_list.contains(&id)
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Both words, once started.
    pub fn words(&self) -> Option<&WordPair> {
        self.words.as_ref()
    }

    /// The open round's tally, while VOTING.
    pub fn current_vote(&self) -> Option<&VoteTally> {
        match &self.phase {
            Phase::Voting(tally) => Some(tally),
            _ => None,
        }
    }

    fn occupancy(&self) -> Occupancy {
        Occupancy {
            joined: self.roster.len(),
            capacity: self.config.max_players,
        }
    }

    // ------------------------------------------------------------------------
    // WAITING
    // ------------------------------------------------------------------------

    /// Enroll a player. `is_friend` is the transport's already-resolved
    /// roster check.
    pub fn join(&mut self, player_id: PlayerId, is_friend: bool) -> Result<Occupancy, JoinError> {
        if !matches!(self.phase, Phase::Waiting) {
            return Err(JoinError::AlreadyStarted);
        }
        if self.roster.len() >= self.config.max_players {
            return Err(JoinError::RoomFull {
                capacity: self.config.max_players,
            });
        }
        if self.ban_list.contains(&player_id) {
            return Err(JoinError::Banned);
        }
        if !is_friend {
            return Err(JoinError::FriendRequired);
        }
        if self.player(player_id).is_some() {
            return Err(JoinError::AlreadyJoined);
        }

        self.roster.push(Player::new(player_id));
        Ok(self.occupancy())
    }

    pub fn leave(&mut self, player_id: PlayerId) -> Result<Occupancy, LeaveError> {
        if !matches!(self.phase, Phase::Waiting) {
            return Err(LeaveError::AlreadyStarted);
        }
        if player_id == self.host_id {
            return Err(LeaveError::IsHost);
        }
        let Some(position) = self.roster.iter().position(|p| p.id() == player_id) else {
            return Err(LeaveError::NotJoined);
        };

        self.roster.remove(position);
        Ok(self.occupancy())
    }

    /// Bar `target` from the session, removing them if already joined.
    /// `target` is `None` when the transport could not resolve it.
    pub fn ban(
        &mut self,
        caller: PlayerId,
        target: Option<PlayerId>,
    ) -> Result<BanOutcome, BanError> {
        if caller != self.host_id {
            return Err(BanError::NotHost);
        }
        let Some(target) = target else {
            return Err(BanError::InvalidTarget);
        };
        if !matches!(self.phase, Phase::Waiting) {
            return Err(BanError::AlreadyStarted);
        }
        if target == caller {
            return Err(BanError::SelfBan);
        }

        self.ban_list.insert(target);
        let before = self.roster.len();
        self.roster.retain(|p| p.id() != target);
        Ok(BanOutcome {
            removed: self.roster.len() < before,
        })
    }

    pub fn set_max_players(
        &mut self,
        caller: PlayerId,
        max_players: usize,
    ) -> Result<(), CapacityError> {
        if !matches!(self.phase, Phase::Waiting) {
            return Err(CapacityError::AlreadyStarted);
        }
        if caller != self.host_id {
            return Err(CapacityError::NotHost);
        }
        if max_players < self.config.min_players {
            return Err(CapacityError::BelowMinimum {
                min_players: self.config.min_players,
            });
        }
        if max_players < self.roster.len() {
            return Err(CapacityError::BelowRoster {
                joined: self.roster.len(),
            });
        }

        self.config.max_players = max_players;
        Ok(())
    }

    /// Pick the category this session draws from, overriding the default.
    pub fn select_category(
        &mut self,
        caller: PlayerId,
        category: &str,
        bank: &WordBank,
    ) -> Result<(), SelectCategoryError> {
        if caller != self.host_id {
            return Err(SelectCategoryError::NotHost);
        }
        if !matches!(self.phase, Phase::Waiting) {
            return Err(SelectCategoryError::AlreadyStarted);
        }
        if !bank.contains(category) {
            return Err(SelectCategoryError::UnknownCategory(category.to_string()));
        }

        self.category = Some(category.to_string());
        Ok(())
    }

    /// Draw words and spies, then open the first discussion.
    ///
    /// On any error the session is left untouched in WAITING.
    ///
    /// # Panics
    ///
    /// If the session was built from a config that fails
    /// [`SessionConfig::validate`] and the roster is not larger than
    /// `spy_count`.
    pub fn start<R>(
        &mut self,
        caller: PlayerId,
        assigner: &WordAssigner,
        rng: &mut R,
    ) -> Result<StartReport, StartError>
    where
        R: Rng + ?Sized,
    {
        if caller != self.host_id {
            return Err(StartError::NotHost);
        }
        if !matches!(self.phase, Phase::Waiting) {
            return Err(StartError::AlreadyStarted);
        }
        if self.roster.len() < self.config.min_players {
            return Err(StartError::InsufficientPlayers {
                joined: self.roster.len(),
                required: self.config.min_players,
            });
        }

        let words = assigner.assign(self.category.as_deref(), rng)?;

        assert!(
            self.config.spy_count < self.roster.len(),
            "spy_count {} must be below roster size {}",
            self.config.spy_count,
            self.roster.len()
        );
        for spy in index::sample(rng, self.roster.len(), self.config.spy_count) {
            self.roster[spy].assign_role(Role::Spy);
        }

        self.words = Some(words.clone());
        self.phase = Phase::Discussing;

        Ok(StartReport {
            words,
            assignments: self.roster.iter().map(|p| (p.id(), p.role())).collect(),
        })
    }

    // ------------------------------------------------------------------------
    // DISCUSSING
    // ------------------------------------------------------------------------

    /// Judge a discussion line. A line exposing the speaker's own word ends
    /// the game in favour of the other side.
    pub fn submit_chat_line(
        &mut self,
        player_id: PlayerId,
        text: &str,
    ) -> Result<ChatOutcome, ChatError> {
        if !matches!(self.phase, Phase::Discussing) {
            return Err(ChatError::WrongState(self.status()));
        }
        let role = match self.player(player_id) {
            Some(player) if player.is_active() => player.role(),
            _ => return Err(ChatError::NotActive),
        };

        let word = self.started_words().word_for(role);
        if !self.config.leak_rule.leaks(text, word) {
            return Ok(ChatOutcome::Clean);
        }

        let victory = Victory {
            winner: role.opponent(),
            cause: VictoryCause::WordLeaked { by: player_id },
        };
        self.phase = Phase::Finished(victory);
        Ok(ChatOutcome::Leaked(self.report(victory)))
    }

    /// Close the discussion and open a vote among the active players.
    pub fn end_discussion(&mut self, caller: PlayerId) -> Result<VotingRound, EndDiscussionError> {
        if caller != self.host_id {
            return Err(EndDiscussionError::NotHost);
        }
        if !matches!(self.phase, Phase::Discussing) {
            return Err(EndDiscussionError::WrongState(self.status()));
        }

        let candidates: Vec<(usize, PlayerId)> = self
            .active_players()
            .map(|(index, player)| (index, player.id()))
            .collect();
        self.phase = Phase::Voting(VoteTally::open(candidates.iter().map(|&(index, _)| index)));
        Ok(VotingRound { candidates })
    }

    // ------------------------------------------------------------------------
    // VOTING
    // ------------------------------------------------------------------------

    /// Record a ballot and, once every active player has voted, resolve the
    /// round.
    ///
    /// # Panics
    /// If the tally resolves to a roster index that does not exist.
    pub fn cast_vote(
        &mut self,
        voter: PlayerId,
        target_index: usize,
    ) -> Result<VoteOutcome, VoteError> {
        let status = self.status();
        let Phase::Voting(tally) = &mut self.phase else {
            return Err(VoteError::WrongState(status));
        };
        let Some(voter_index) = self
            .roster
            .iter()
            .position(|p| p.id() == voter && p.is_active())
        else {
            return Err(VoteError::NotActive);
        };

        let progress = tally.record(voter, voter_index, target_index)?;
        if !progress.is_complete() {
            return Ok(VoteOutcome::Accepted(progress));
        }

        let Phase::Voting(tally) = std::mem::replace(&mut self.phase, Phase::Discussing) else {
            unreachable!("phase left VOTING while recording a ballot");
        };
        let index = match tally.resolve() {
            RoundResult::Tie { leaders, .. } => return Ok(VoteOutcome::Tie { leaders }),
            RoundResult::Decisive { index, .. } => index,
        };

        assert!(
            index < self.roster.len(),
            "vote resolved to roster index {index} of {}",
            self.roster.len()
        );
        let eliminated = &mut self.roster[index];
        eliminated.eliminate();
        let (player_id, role) = (eliminated.id(), eliminated.role());

        let report = self.evaluate_victory().map(|victory| {
            self.phase = Phase::Finished(victory);
            self.report(victory)
        });

        Ok(VoteOutcome::Eliminated {
            index,
            player_id,
            role,
            report,
        })
    }

    // ------------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------------

    /// Check that `caller` may delete this session. `is_privileged` is the
    /// transport's moderator flag.
    pub fn authorize_delete(
        &self,
        caller: PlayerId,
        is_privileged: bool,
    ) -> Result<(), DeleteError> {
        if caller == self.host_id || is_privileged {
            Ok(())
        } else {
            Err(DeleteError::NotAuthorized)
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Civilians win when no spy is active; otherwise spies win at two or
    /// fewer active players. The first check requires zero active spies and
    /// the second at least one, so at most one can hold.
    fn evaluate_victory(&self) -> Option<Victory> {
        let (active, spies) = self
            .roster
            .iter()
            .filter(|p| p.is_active())
            .fold((0, 0), |(active, spies), p| {
                (active + 1, spies + usize::from(p.role() == Role::Spy))
            });

        if spies == 0 {
            Some(Victory {
                winner: Role::Civilian,
                cause: VictoryCause::AllSpiesEliminated,
            })
        } else if active <= SPY_WIN_THRESHOLD {
            Some(Victory {
                winner: Role::Spy,
                cause: VictoryCause::SpiesOutlasted,
            })
        } else {
            None
        }
    }

    fn started_words(&self) -> &WordPair {
        match &self.words {
            Some(words) => words,
            None => unreachable!("session left WAITING without words"),
        }
    }

    fn report(&self, victory: Victory) -> GameReport {
        GameReport {
            victory,
            words: self.started_words().clone(),
            players: self.roster.clone(),
        }
    }

    #[cfg(test)]
    fn rig_spies(&mut self, spies: &[usize]) {
        for (index, player) in self.roster.iter_mut().enumerate() {
            let role = if spies.contains(&index) {
                Role::Spy
            } else {
                Role::Civilian
            };
            player.assign_role(role);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
