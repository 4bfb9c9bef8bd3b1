//! Undercover Game Engine
//!
//! Rules engine for "Undercover", a moderator-less social-deduction word
//! game. Most players receive one secret word, a few spies receive a related
//! one; players describe their word in free discussion and repeatedly vote
//! out a suspect until one side wins.
//!
//! # Architecture Constraints
//!
//! The engine MUST NOT:
//! - Perform I/O (the word dictionary is handed in already parsed)
//! - Read wall-clock time or expose timers
//! - Block or suspend
//! - Inspect platform roles or rosters (callers pass resolved booleans)
//!
//! Every operation returns a definite success or a named failure. Invariant
//! violations that can only come from a caller bug panic instead.
//!
//! # Components
//!
//! - [`Player`]: identity, liveness and role
//! - [`WordAssigner`]: draws a word pair from a [`WordBank`]
//! - [`VoteTally`]: one round of ballots and its plurality resolution
//! - [`GameSession`]: the state machine tying them together
//!
//! Sessions share no state. The host program keeps one per room and
//! serializes the calls made on each.

#![deny(unsafe_code)]

pub mod player;
pub mod session;
pub mod tally;
pub mod words;

pub use player::{Liveness, Player, PlayerId, Role};
pub use session::{
    BanError, BanOutcome, CapacityError, ChatError, ChatOutcome, DeleteError, EndDiscussionError,
    GameReport, GameSession, JoinError, LeakRule, LeaveError, Occupancy, SelectCategoryError,
    SessionConfig, SessionConfigError, SessionStatus, StartError, StartReport, Victory,
    VictoryCause, VoteError, VoteOutcome, VotingRound,
};
pub use tally::{BallotError, RoundResult, TallyProgress, VoteTally};
pub use words::{CategoryError, WordAssigner, WordBank, WordError, WordPair};
