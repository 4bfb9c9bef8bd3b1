//! Players and their game-assigned roles.

/// Stable external identifier of a participant (e.g. a chat account id).
///
/// The engine never interprets the value; it is only compared for equality.
pub type PlayerId = u64;

/// Side a player belongs to for the duration of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Majority side, all holding the same word.
    Civilian,
    /// Minority side, holding the related word.
    Spy,
}

impl Role {
    /// The side that wins when this side loses.
    pub fn opponent(self) -> Self {
        match self {
            Self::Civilian => Self::Spy,
            Self::Spy => Self::Civilian,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Civilian => "civilian",
            Self::Spy => "spy",
        }
    }
}

/// Whether a player still takes part in discussion and voting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Liveness {
    Active,
    Eliminated,
}

/// A participant in a session.
///
/// Owned by [`crate::GameSession`]. The role is a placeholder (`Civilian`)
/// until the session starts and is frozen afterward; liveness only moves from
/// `Active` to `Eliminated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    id: PlayerId,
    role: Role,
    liveness: Liveness,
}

impl Player {
    pub(crate) fn new(id: PlayerId) -> Self {
        Self {
            id,
            role: Role::Civilian,
            liveness: Liveness::Active,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    pub fn is_active(&self) -> bool {
        self.liveness == Liveness::Active
    }

    pub(crate) fn assign_role(&mut self, role: Role) {
        self.role = role;
    }

    pub(crate) fn eliminate(&mut self) {
        self.liveness = Liveness::Eliminated;
    }
}
