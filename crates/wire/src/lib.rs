//! Undercover Wire Protocol Types
//!
//! Protobuf messages exchanged between a chat transport and the process
//! hosting the engine. The transport turns platform events into an
//! [`IntentProto`] and renders the returned [`OutcomeProto`] into messages.
//!
//! # Message Categories
//!
//! - **Intents**: one message shape for every command, discriminated by
//!   [`IntentKind`]; fields irrelevant to a kind are left at their defaults.
//! - **Outcomes**: success payloads and the named rejection, discriminated by
//!   [`OutcomeStatus`] and [`RejectionCode`].

#![deny(unsafe_code)]

use prost::Message;
use undercover_engine::{Player, Role, VictoryCause, WordPair};

// ============================================================================
// Type Aliases (matching engine crate)
// ============================================================================

/// PlayerId type alias for wire protocol.
pub type PlayerId = u64;

/// RoomId type alias for wire protocol.
pub type RoomId = u64;

// ============================================================================
// Enumerations
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum IntentKind {
    Unspecified = 0,
    Create = 1,
    Delete = 2,
    Join = 3,
    Leave = 4,
    Ban = 5,
    Start = 6,
    ChatLine = 7,
    EndDiscussion = 8,
    Vote = 9,
    ChangeCategory = 10,
    SelectCategory = 11,
    SetMaxPlayers = 12,
    ListCategories = 13,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OutcomeStatus {
    Success = 0,
    Rejected = 1,
    /// The intent could not be decoded or was missing required fields.
    Malformed = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum RejectionCode {
    Unspecified = 0,
    NotFound = 1,
    AlreadyExists = 2,
    AlreadyStarted = 3,
    RoomFull = 4,
    Banned = 5,
    FriendRequired = 6,
    AlreadyJoined = 7,
    IsHost = 8,
    NotJoined = 9,
    SelfBan = 10,
    NotHost = 11,
    InvalidTarget = 12,
    InsufficientPlayers = 13,
    WrongState = 14,
    NotActive = 15,
    SelfVote = 16,
    AlreadyVoted = 17,
    NotAuthorized = 18,
    UnknownCategory = 19,
    BelowMinimum = 20,
    BelowRoster = 21,
    /// The word dictionary entry drawn at start was unusable.
    WordConfig = 22,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Side {
    Unspecified = 0,
    Civilian = 1,
    Spy = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum VictoryCauseKind {
    Unspecified = 0,
    AllSpiesEliminated = 1,
    SpiesOutlasted = 2,
    WordLeaked = 3,
}

// ============================================================================
// Transport → Engine
// ============================================================================

/// A command from the transport.
#[derive(Clone, PartialEq, Message)]
pub struct IntentProto {
    #[prost(enumeration = "IntentKind", tag = "1")]
    pub kind: i32,

    #[prost(uint64, tag = "2")]
    pub room_id: RoomId,

    /// The player issuing the command (host, voter, speaker, ...).
    #[prost(uint64, tag = "3")]
    pub caller_id: PlayerId,

    /// Ban target. Absent when the transport could not resolve a mention.
    #[prost(uint64, optional, tag = "4")]
    pub target_id: Option<PlayerId>,

    /// Vote target as a roster index.
    #[prost(uint32, optional, tag = "5")]
    pub target_index: Option<u32>,

    /// Chat line, or category name for category commands.
    #[prost(string, tag = "6")]
    pub text: String,

    /// Transport-resolved friend check for joins.
    #[prost(bool, tag = "7")]
    pub is_friend: bool,

    /// Transport-resolved moderator flag for deletes.
    #[prost(bool, tag = "8")]
    pub is_privileged: bool,

    #[prost(uint32, optional, tag = "9")]
    pub max_players: Option<u32>,
}

// ============================================================================
// Engine → Transport
// ============================================================================

#[derive(Clone, PartialEq, Message)]
pub struct WordPairProto {
    #[prost(string, tag = "1")]
    pub civilian: String,

    #[prost(string, tag = "2")]
    pub spy: String,
}

/// One roster entry, as a vote candidate, a secret assignment or a reveal.
#[derive(Clone, PartialEq, Message)]
pub struct PlayerProto {
    #[prost(uint64, tag = "1")]
    pub player_id: PlayerId,

    /// Roster index, the public vote-target reference.
    #[prost(uint32, tag = "2")]
    pub index: u32,

    #[prost(enumeration = "Side", tag = "3")]
    pub side: i32,

    #[prost(bool, tag = "4")]
    pub active: bool,
}

/// Result of one intent.
#[derive(Clone, PartialEq, Message)]
pub struct OutcomeProto {
    #[prost(enumeration = "OutcomeStatus", tag = "1")]
    pub status: i32,

    #[prost(enumeration = "RejectionCode", tag = "2")]
    pub rejection: i32,

    /// Human-readable reason for a rejection or malformed intent.
    #[prost(string, tag = "3")]
    pub detail: String,

    #[prost(uint32, tag = "4")]
    pub joined: u32,

    #[prost(uint32, tag = "5")]
    pub capacity: u32,

    /// Both words, on start and on game over.
    #[prost(message, optional, tag = "6")]
    pub words: Option<WordPairProto>,

    /// Assignments on start, candidates on end of discussion, reveal on game over.
    #[prost(message, repeated, tag = "7")]
    pub players: Vec<PlayerProto>,

    #[prost(bool, tag = "8")]
    pub leaked: bool,

    #[prost(bool, tag = "9")]
    pub round_resolved: bool,

    #[prost(bool, tag = "10")]
    pub tie: bool,

    #[prost(uint32, repeated, tag = "11")]
    pub tied_indices: Vec<u32>,

    #[prost(uint32, optional, tag = "12")]
    pub eliminated_index: Option<u32>,

    #[prost(uint64, optional, tag = "13")]
    pub eliminated_player: Option<PlayerId>,

    #[prost(bool, tag = "14")]
    pub game_over: bool,

    #[prost(enumeration = "Side", optional, tag = "15")]
    pub winning_side: Option<i32>,

    #[prost(enumeration = "VictoryCauseKind", tag = "16")]
    pub victory_cause: i32,

    #[prost(uint32, tag = "17")]
    pub votes_cast: u32,

    #[prost(uint32, tag = "18")]
    pub votes_eligible: u32,

    #[prost(string, repeated, tag = "19")]
    pub categories: Vec<String>,

    /// Ban removed a joined player.
    #[prost(bool, tag = "20")]
    pub removed: bool,
}

impl OutcomeProto {
    /// An empty successful outcome.
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn rejected(code: RejectionCode, detail: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Rejected as i32,
            rejection: code as i32,
            detail: detail.into(),
            ..Self::default()
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Malformed as i32,
            detail: detail.into(),
            ..Self::default()
        }
    }
}

// ============================================================================
// Conversion Traits
// ============================================================================

impl From<Role> for Side {
    fn from(role: Role) -> Self {
        match role {
            Role::Civilian => Self::Civilian,
            Role::Spy => Self::Spy,
        }
    }
}

impl TryFrom<Side> for Role {
    type Error = &'static str;

    fn try_from(side: Side) -> Result<Self, Self::Error> {
        match side {
            Side::Civilian => Ok(Self::Civilian),
            Side::Spy => Ok(Self::Spy),
            Side::Unspecified => Err("side must be civilian or spy"),
        }
    }
}

impl From<&WordPair> for WordPairProto {
    fn from(words: &WordPair) -> Self {
        Self {
            civilian: words.civilian().to_string(),
            spy: words.spy().to_string(),
        }
    }
}

impl From<VictoryCause> for VictoryCauseKind {
    fn from(cause: VictoryCause) -> Self {
        match cause {
            VictoryCause::AllSpiesEliminated => Self::AllSpiesEliminated,
            VictoryCause::SpiesOutlasted => Self::SpiesOutlasted,
            VictoryCause::WordLeaked { .. } => Self::WordLeaked,
        }
    }
}

impl PlayerProto {
    /// Full reveal of the player seated at `index`.
    pub fn reveal(index: usize, player: &Player) -> Self {
        Self {
            player_id: player.id(),
            index: index as u32,
            side: Side::from(player.role()) as i32,
            active: player.is_active(),
        }
    }

    /// Seat and identity only, without the secret side.
    pub fn seat(index: usize, player_id: PlayerId) -> Self {
        Self {
            player_id,
            index: index as u32,
            side: Side::Unspecified as i32,
            active: true,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_intent_roundtrip() {
        let msg = IntentProto {
            kind: IntentKind::Vote as i32,
            room_id: 900,
            caller_id: 7,
            target_index: Some(0),
            ..Default::default()
        };
        let decoded = IntentProto::decode(msg.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.kind(), IntentKind::Vote);
        // Index 0 must survive as present, not collapse into "absent".
        assert_eq!(decoded.target_index, Some(0));
        assert_eq!(decoded.target_id, None);
    }

    #[test]
    fn test_unknown_kind_reads_as_unspecified() {
        let msg = IntentProto {
            kind: 99,
            ..Default::default()
        };
        let decoded = IntentProto::decode(msg.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.kind(), IntentKind::Unspecified);
    }

    #[test]
    fn test_rejected_outcome() {
        let msg = OutcomeProto::rejected(RejectionCode::AlreadyVoted, "already voted this round");
        let decoded = OutcomeProto::decode(msg.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.status(), OutcomeStatus::Rejected);
        assert_eq!(decoded.rejection(), RejectionCode::AlreadyVoted);
        assert_eq!(decoded.detail, "already voted this round");
    }

    #[test]
    fn test_default_outcome_is_ok() {
        let decoded = OutcomeProto::decode(&b""[..]).unwrap();
        assert_eq!(decoded.status(), OutcomeStatus::Success);
        assert_eq!(decoded.winning_side, None);
    }

    #[test]
    fn test_side_conversions() {
        assert_eq!(Side::from(Role::Spy), Side::Spy);
        assert_eq!(Role::try_from(Side::Civilian), Ok(Role::Civilian));
        assert!(Role::try_from(Side::Unspecified).is_err());
    }

    #[test]
    fn test_victory_cause_kind() {
        assert_eq!(
            VictoryCauseKind::from(VictoryCause::WordLeaked { by: 3 }),
            VictoryCauseKind::WordLeaked
        );
        assert_eq!(
            VictoryCauseKind::from(VictoryCause::SpiesOutlasted),
            VictoryCauseKind::SpiesOutlasted
        );
    }
}
