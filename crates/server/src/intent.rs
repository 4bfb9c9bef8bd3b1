//! Typed intents and their outcomes.
//!
//! One [`Intent`] per transport command. Dispatch yields either an
//! [`Outcome`] or a [`Rejection`] carrying the named failure kind.

use std::fmt;

use undercover_engine::{
    BanOutcome, ChatOutcome, Occupancy, PlayerId, StartReport, VoteOutcome, VotingRound,
};
use undercover_wire::RejectionCode;

use crate::RoomId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Create {
        room_id: RoomId,
        host_id: PlayerId,
    },
    Delete {
        room_id: RoomId,
        caller_id: PlayerId,
        is_privileged: bool,
    },
    Join {
        room_id: RoomId,
        player_id: PlayerId,
        is_friend: bool,
    },
    Leave {
        room_id: RoomId,
        player_id: PlayerId,
    },
    Ban {
        room_id: RoomId,
        caller_id: PlayerId,
        target_id: Option<PlayerId>,
    },
    Start {
        room_id: RoomId,
        caller_id: PlayerId,
    },
    ChatLine {
        room_id: RoomId,
        player_id: PlayerId,
        text: String,
    },
    EndDiscussion {
        room_id: RoomId,
        caller_id: PlayerId,
    },
    Vote {
        room_id: RoomId,
        voter_id: PlayerId,
        target_index: usize,
    },
    ChangeCategory {
        category: String,
    },
    SelectCategory {
        room_id: RoomId,
        caller_id: PlayerId,
        category: String,
    },
    SetMaxPlayers {
        room_id: RoomId,
        caller_id: PlayerId,
        max_players: usize,
    },
    ListCategories,
}

impl Intent {
    /// Room the intent targets, if any.
    pub fn room_id(&self) -> Option<RoomId> {
        match self {
            Self::Create { room_id, .. }
            | Self::Delete { room_id, .. }
            | Self::Join { room_id, .. }
            | Self::Leave { room_id, .. }
            | Self::Ban { room_id, .. }
            | Self::Start { room_id, .. }
            | Self::ChatLine { room_id, .. }
            | Self::EndDiscussion { room_id, .. }
            | Self::Vote { room_id, .. }
            | Self::SelectCategory { room_id, .. }
            | Self::SetMaxPlayers { room_id, .. } => Some(*room_id),
            Self::ChangeCategory { .. } | Self::ListCategories => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Deleted,
    Joined(Occupancy),
    Left(Occupancy),
    Banned(BanOutcome),
    Started(StartReport),
    Chat(ChatOutcome),
    VotingStarted(VotingRound),
    Vote(VoteOutcome),
    CategoryChanged,
    CategorySelected,
    CapacityChanged,
    Categories(Vec<String>),
}

/// A named failure, flattened across operations for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub code: RejectionCode,
    pub detail: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.detail)
    }
}
