//! Conversions between wire messages and typed intents/outcomes.

use std::fmt;

use undercover_engine::{
    BallotError, BanError, CapacityError, CategoryError, ChatError, ChatOutcome, DeleteError,
    EndDiscussionError, GameReport, JoinError, LeaveError, SelectCategoryError, StartError,
    VoteError, VoteOutcome, WordError,
};
use undercover_wire::{
    IntentKind, IntentProto, OutcomeProto, PlayerProto, RejectionCode, Side, VictoryCauseKind,
    WordPairProto,
};

use crate::intent::{Intent, Outcome, Rejection};
use crate::{CreateError, RoomError};

// ============================================================================
// Rejection Codes
// ============================================================================

/// Maps an operation failure onto the flat wire taxonomy.
pub trait RejectionKind {
    fn rejection_code(&self) -> RejectionCode;
}

/// Flatten any operation failure into a [`Rejection`].
pub fn reject<E>(err: E) -> Rejection
where
    E: RejectionKind + fmt::Display,
{
    Rejection {
        code: err.rejection_code(),
        detail: err.to_string(),
    }
}

impl<E: RejectionKind> RejectionKind for RoomError<E> {
    fn rejection_code(&self) -> RejectionCode {
        match self {
            Self::NotFound(_) => RejectionCode::NotFound,
            Self::Session(err) => err.rejection_code(),
        }
    }
}

impl RejectionKind for CreateError {
    fn rejection_code(&self) -> RejectionCode {
        match self {
            Self::AlreadyExists(_) => RejectionCode::AlreadyExists,
        }
    }
}

impl RejectionKind for JoinError {
    fn rejection_code(&self) -> RejectionCode {
        match self {
            Self::AlreadyStarted => RejectionCode::AlreadyStarted,
            Self::RoomFull { .. } => RejectionCode::RoomFull,
            Self::Banned => RejectionCode::Banned,
            Self::FriendRequired => RejectionCode::FriendRequired,
            Self::AlreadyJoined => RejectionCode::AlreadyJoined,
        }
    }
}

impl RejectionKind for LeaveError {
    fn rejection_code(&self) -> RejectionCode {
        match self {
            Self::AlreadyStarted => RejectionCode::AlreadyStarted,
            Self::IsHost => RejectionCode::IsHost,
            Self::NotJoined => RejectionCode::NotJoined,
        }
    }
}

impl RejectionKind for BanError {
    fn rejection_code(&self) -> RejectionCode {
        match self {
            Self::NotHost => RejectionCode::NotHost,
            Self::InvalidTarget => RejectionCode::InvalidTarget,
            Self::AlreadyStarted => RejectionCode::AlreadyStarted,
            Self::SelfBan => RejectionCode::SelfBan,
        }
    }
}

impl RejectionKind for CapacityError {
    fn rejection_code(&self) -> RejectionCode {
        match self {
            Self::AlreadyStarted => RejectionCode::AlreadyStarted,
            Self::NotHost => RejectionCode::NotHost,
            Self::BelowMinimum { .. } => RejectionCode::BelowMinimum,
            Self::BelowRoster { .. } => RejectionCode::BelowRoster,
        }
    }
}

impl RejectionKind for SelectCategoryError {
    fn rejection_code(&self) -> RejectionCode {
        match self {
            Self::NotHost => RejectionCode::NotHost,
            Self::AlreadyStarted => RejectionCode::AlreadyStarted,
            Self::UnknownCategory(_) => RejectionCode::UnknownCategory,
        }
    }
}

impl RejectionKind for StartError {
    fn rejection_code(&self) -> RejectionCode {
        match self {
            Self::NotHost => RejectionCode::NotHost,
            Self::AlreadyStarted => RejectionCode::AlreadyStarted,
            Self::InsufficientPlayers { .. } => RejectionCode::InsufficientPlayers,
            Self::Words(WordError::UnknownCategory(_)) => RejectionCode::UnknownCategory,
            Self::Words(_) => RejectionCode::WordConfig,
        }
    }
}

impl RejectionKind for ChatError {
    fn rejection_code(&self) -> RejectionCode {
        match self {
            Self::WrongState(_) => RejectionCode::WrongState,
            Self::NotActive => RejectionCode::NotActive,
        }
    }
}

impl RejectionKind for EndDiscussionError {
    fn rejection_code(&self) -> RejectionCode {
        match self {
            Self::NotHost => RejectionCode::NotHost,
            Self::WrongState(_) => RejectionCode::WrongState,
        }
    }
}

impl RejectionKind for VoteError {
    fn rejection_code(&self) -> RejectionCode {
        match self {
            Self::WrongState(_) => RejectionCode::WrongState,
            Self::NotActive => RejectionCode::NotActive,
            Self::Ballot(BallotError::InvalidTarget(_)) => RejectionCode::InvalidTarget,
            Self::Ballot(BallotError::SelfVote) => RejectionCode::SelfVote,
            Self::Ballot(BallotError::AlreadyVoted) => RejectionCode::AlreadyVoted,
        }
    }
}

impl RejectionKind for DeleteError {
    fn rejection_code(&self) -> RejectionCode {
        match self {
            Self::NotAuthorized => RejectionCode::NotAuthorized,
        }
    }
}

impl RejectionKind for CategoryError {
    fn rejection_code(&self) -> RejectionCode {
        match self {
            Self::UnknownCategory(_) => RejectionCode::UnknownCategory,
        }
    }
}

// ============================================================================
// Wire → Intent
// ============================================================================

impl TryFrom<IntentProto> for Intent {
    type Error = &'static str;

    fn try_from(proto: IntentProto) -> Result<Self, Self::Error> {
        let room_id = proto.room_id;
        let caller_id = proto.caller_id;

        let intent = match proto.kind() {
            IntentKind::Unspecified => return Err("intent kind is missing or unknown"),
            IntentKind::Create => Self::Create {
                room_id,
                host_id: caller_id,
            },
            IntentKind::Delete => Self::Delete {
                room_id,
                caller_id,
                is_privileged: proto.is_privileged,
            },
            IntentKind::Join => Self::Join {
                room_id,
                player_id: caller_id,
                is_friend: proto.is_friend,
            },
            IntentKind::Leave => Self::Leave {
                room_id,
                player_id: caller_id,
            },
            IntentKind::Ban => Self::Ban {
                room_id,
                caller_id,
                target_id: proto.target_id,
            },
            IntentKind::Start => Self::Start { room_id, caller_id },
            IntentKind::ChatLine => Self::ChatLine {
                room_id,
                player_id: caller_id,
                text: proto.text,
            },
            IntentKind::EndDiscussion => Self::EndDiscussion { room_id, caller_id },
            IntentKind::Vote => Self::Vote {
                room_id,
                voter_id: caller_id,
                target_index: proto.target_index.ok_or("vote requires target_index")? as usize,
            },
            IntentKind::ChangeCategory => Self::ChangeCategory {
                category: non_empty(proto.text)?,
            },
            IntentKind::SelectCategory => Self::SelectCategory {
                room_id,
                caller_id,
                category: non_empty(proto.text)?,
            },
            IntentKind::SetMaxPlayers => Self::SetMaxPlayers {
                room_id,
                caller_id,
                max_players: proto.max_players.ok_or("capacity change requires max_players")?
                    as usize,
            },
            IntentKind::ListCategories => Self::ListCategories,
        };
        Ok(intent)
    }
}

fn non_empty(category: String) -> Result<String, &'static str> {
    if category.trim().is_empty() {
        Err("category name is empty")
    } else {
        Ok(category)
    }
}

// ============================================================================
// Outcome → Wire
// ============================================================================

/// Encode a dispatch result for the transport.
pub fn encode_outcome(result: &Result<Outcome, Rejection>) -> OutcomeProto {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(rejection) => return OutcomeProto::rejected(rejection.code, rejection.detail.clone()),
    };

    let mut proto = OutcomeProto::ok();
    match outcome {
        Outcome::Created
        | Outcome::Deleted
        | Outcome::CategoryChanged
        | Outcome::CategorySelected
        | Outcome::CapacityChanged
        | Outcome::Chat(ChatOutcome::Clean) => {}
        Outcome::Joined(occupancy) | Outcome::Left(occupancy) => {
            proto.joined = occupancy.joined as u32;
            proto.capacity = occupancy.capacity as u32;
        }
        Outcome::Banned(ban) => proto.removed = ban.removed,
        Outcome::Started(report) => {
            proto.words = Some(WordPairProto::from(&report.words));
            proto.players = report
                .assignments
                .iter()
                .enumerate()
                .map(|(index, &(player_id, role))| PlayerProto {
                    player_id,
                    index: index as u32,
                    side: Side::from(role) as i32,
                    active: true,
                })
                .collect();
        }
        Outcome::Chat(ChatOutcome::Leaked(report)) => {
            proto.leaked = true;
            apply_report(&mut proto, report);
        }
        Outcome::VotingStarted(round) => {
            proto.votes_eligible = round.candidates.len() as u32;
            proto.players = round
                .candidates
                .iter()
                .map(|&(index, player_id)| PlayerProto::seat(index, player_id))
                .collect();
        }
        Outcome::Vote(VoteOutcome::Accepted(progress)) => {
            proto.votes_cast = progress.cast as u32;
            proto.votes_eligible = progress.eligible as u32;
        }
        Outcome::Vote(VoteOutcome::Tie { leaders }) => {
            proto.round_resolved = true;
            proto.tie = true;
            proto.tied_indices = leaders.iter().map(|&i| i as u32).collect();
        }
        Outcome::Vote(VoteOutcome::Eliminated {
            index,
            player_id,
            report,
            ..
        }) => {
            proto.round_resolved = true;
            proto.eliminated_index = Some(*index as u32);
            proto.eliminated_player = Some(*player_id);
            if let Some(report) = report {
                apply_report(&mut proto, report);
            }
        }
        Outcome::Categories(categories) => proto.categories = categories.clone(),
    }
    proto
}

fn apply_report(proto: &mut OutcomeProto, report: &GameReport) {
    proto.game_over = true;
    proto.winning_side = Some(Side::from(report.victory.winner) as i32);
    proto.victory_cause = VictoryCauseKind::from(report.victory.cause) as i32;
    proto.words = Some(WordPairProto::from(&report.words));
    proto.players = report
        .players
        .iter()
        .enumerate()
        .map(|(index, player)| PlayerProto::reveal(index, player))
        .collect();
}

#[cfg(test)]
mod tests {
    use undercover_engine::{Occupancy, TallyProgress, VotingRound};
    use undercover_wire::OutcomeStatus;

    use super::*;

    #[test]
    fn test_vote_intent_requires_index() {
        let proto = IntentProto {
            kind: IntentKind::Vote as i32,
            room_id: 5,
            caller_id: 6,
            ..Default::default()
        };
        assert!(Intent::try_from(proto.clone()).is_err());

        let proto = IntentProto {
            target_index: Some(2),
            ..proto
        };
        assert_eq!(
            Intent::try_from(proto),
            Ok(Intent::Vote {
                room_id: 5,
                voter_id: 6,
                target_index: 2
            })
        );
    }

    #[test]
    fn test_category_intents_require_name() {
        let proto = IntentProto {
            kind: IntentKind::ChangeCategory as i32,
            text: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(Intent::try_from(proto), Err("category name is empty"));
    }

    #[test]
    fn test_unspecified_kind_rejected() {
        assert!(Intent::try_from(IntentProto::default()).is_err());
    }

    #[test]
    fn test_ban_without_target_keeps_none() {
        let proto = IntentProto {
            kind: IntentKind::Ban as i32,
            room_id: 1,
            caller_id: 2,
            ..Default::default()
        };
        assert_eq!(
            Intent::try_from(proto),
            Ok(Intent::Ban {
                room_id: 1,
                caller_id: 2,
                target_id: None
            })
        );
    }

    #[test]
    fn test_rejection_codes() {
        assert_eq!(
            reject(RoomError::<JoinError>::NotFound(3)).code,
            RejectionCode::NotFound
        );
        assert_eq!(
            reject(RoomError::Session(VoteError::Ballot(BallotError::AlreadyVoted))).code,
            RejectionCode::AlreadyVoted
        );
        let word_error = StartError::Words(WordError::EmptyCategory("x".to_string()));
        assert_eq!(reject(word_error).code, RejectionCode::WordConfig);
    }

    #[test]
    fn test_encode_rejection() {
        let rejection = reject(LeaveError::IsHost);
        let proto = encode_outcome(&Err(rejection));
        assert_eq!(proto.status(), OutcomeStatus::Rejected);
        assert_eq!(proto.rejection(), RejectionCode::IsHost);
        assert!(!proto.detail.is_empty());
    }

    #[test]
    fn test_encode_progress_and_round() {
        let proto = encode_outcome(&Ok(Outcome::Joined(Occupancy {
            joined: 4,
            capacity: 10,
        })));
        assert_eq!((proto.joined, proto.capacity), (4, 10));

        let proto = encode_outcome(&Ok(Outcome::VotingStarted(VotingRound {
            candidates: vec![(0, 11), (2, 13)],
        })));
        assert_eq!(proto.votes_eligible, 2);
        assert_eq!(proto.players[1].index, 2);
        assert_eq!(proto.players[1].side(), Side::Unspecified);

        let proto = encode_outcome(&Ok(Outcome::Vote(VoteOutcome::Accepted(TallyProgress {
            cast: 1,
            eligible: 2,
        }))));
        assert!(!proto.round_resolved);
        assert_eq!((proto.votes_cast, proto.votes_eligible), (1, 2));

        let proto = encode_outcome(&Ok(Outcome::Vote(VoteOutcome::Tie {
            leaders: vec![0, 2],
        })));
        assert!(proto.round_resolved && proto.tie);
        assert_eq!(proto.tied_indices, vec![0, 2]);
        assert_eq!(proto.eliminated_index, None);
    }
}
