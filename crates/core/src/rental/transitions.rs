//! The legal-transition table for a single game record.

use serde::{Deserialize, Serialize};

use crate::error::RentalError;
use crate::models::GameStatus;

/// Operator intent against one record. Deletion is not a transition and
/// is handled separately by the desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RentalAction {
    /// User places a hold (찜) on an available item.
    PlaceHold,
    /// Admin confirms physical pickup of a held item (수령).
    ConfirmPickup,
    /// Admin or the holder cancels a hold.
    CancelHold,
    /// Return of a rented or lost item (반납).
    Return,
    /// Admin marks a rented item as lost.
    MarkLost,
    /// Admin marks a lost item as found and back on the shelf.
    MarkFound,
    /// Admin walk-in rental (현장대여), skipping the hold step.
    DirectRent,
}

impl RentalAction {
    /// Actions only an authenticated admin may trigger.
    pub fn requires_admin(self) -> bool {
        !matches!(self, RentalAction::PlaceHold | RentalAction::CancelHold)
    }

    /// Actions that must be given a renter name at trigger time.
    pub fn requires_renter_input(self) -> bool {
        matches!(self, RentalAction::PlaceHold | RentalAction::DirectRent)
    }
}

/// What happens to the `renter` field when a transition is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenterEffect {
    /// Renter supplied with the action is written to the record.
    Set,
    /// Existing renter is kept (accountability for pickups and losses).
    Retain,
    /// Renter is cleared.
    Clear,
}

/// Result of a legal transition lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub to: GameStatus,
    pub renter: RenterEffect,
}

/// Look up the transition for `action` on a record in state `from`.
///
/// Anything not in the table is rejected; the persistence collaborator
/// remains the final authority and may still refuse the request.
pub fn apply(from: GameStatus, action: RentalAction) -> Result<Transition, RentalError> {
    use GameStatus::*;
    use RentalAction::*;

    let transition = match (from, action) {
        (Available, PlaceHold) => Transition { to: Dibs, renter: RenterEffect::Set },
        (Available, DirectRent) => Transition { to: Rented, renter: RenterEffect::Set },
        (Dibs, ConfirmPickup) => Transition { to: Rented, renter: RenterEffect::Retain },
        (Dibs, CancelHold) => Transition { to: Available, renter: RenterEffect::Clear },
        (Rented, Return) => Transition { to: Available, renter: RenterEffect::Clear },
        (Rented, MarkLost) => Transition { to: Lost, renter: RenterEffect::Retain },
        (Lost, MarkFound) => Transition { to: Available, renter: RenterEffect::Clear },
        _ => return Err(RentalError::IllegalTransition { from, action }),
    };
    Ok(transition)
}

/// Actions the UI may offer for a record in the given state.
pub fn legal_actions(status: GameStatus) -> &'static [RentalAction] {
    use RentalAction::*;
    match status {
        GameStatus::Available => &[PlaceHold, DirectRent],
        GameStatus::Dibs => &[ConfirmPickup, CancelHold],
        GameStatus::Rented => &[Return, MarkLost],
        GameStatus::Lost => &[MarkFound],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_legal_row() {
        let ok = [
            (GameStatus::Available, RentalAction::PlaceHold, GameStatus::Dibs),
            (GameStatus::Available, RentalAction::DirectRent, GameStatus::Rented),
            (GameStatus::Dibs, RentalAction::ConfirmPickup, GameStatus::Rented),
            (GameStatus::Dibs, RentalAction::CancelHold, GameStatus::Available),
            (GameStatus::Rented, RentalAction::Return, GameStatus::Available),
            (GameStatus::Rented, RentalAction::MarkLost, GameStatus::Lost),
            (GameStatus::Lost, RentalAction::MarkFound, GameStatus::Available),
        ];
        for (from, action, to) in ok {
            let transition = apply(from, action).unwrap();
            assert_eq!(transition.to, to, "{from:?} + {action:?}");
        }
    }

    #[test]
    fn off_table_transitions_are_rejected() {
        assert!(apply(GameStatus::Available, RentalAction::Return).is_err());
        assert!(apply(GameStatus::Lost, RentalAction::MarkLost).is_err());
        assert!(apply(GameStatus::Rented, RentalAction::PlaceHold).is_err());
        assert!(apply(GameStatus::Dibs, RentalAction::DirectRent).is_err());
    }

    #[test]
    fn renter_effects_match_the_table() {
        assert_eq!(
            apply(GameStatus::Dibs, RentalAction::ConfirmPickup).unwrap().renter,
            RenterEffect::Retain
        );
        assert_eq!(
            apply(GameStatus::Rented, RentalAction::MarkLost).unwrap().renter,
            RenterEffect::Retain
        );
        assert_eq!(
            apply(GameStatus::Rented, RentalAction::Return).unwrap().renter,
            RenterEffect::Clear
        );
        assert_eq!(
            apply(GameStatus::Available, RentalAction::DirectRent).unwrap().renter,
            RenterEffect::Set
        );
    }

    #[test]
    fn legal_actions_only_offer_table_rows() {
        for status in [
            GameStatus::Available,
            GameStatus::Dibs,
            GameStatus::Rented,
            GameStatus::Lost,
        ] {
            for action in legal_actions(status) {
                assert!(apply(status, *action).is_ok());
            }
        }
    }
}
