//! Pure planning of confirmation-gated transitions, including the
//! batch-cascade decision for multi-item renters.
//!
//! Planning never touches the network: it inspects the current snapshot
//! and produces the prompt to show plus the request each answer maps to.
//! The desk (or the TUI modal flow) drives the prompt and hands the
//! answer back to [`ActionPlan::resolve`].

use crate::error::RentalError;
use crate::models::{GameRecord, GameStatus};
use crate::session::SessionContext;

use super::transitions::{apply, RentalAction, RenterEffect};

/// Caller-supplied context for one action.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    /// Renter name entered at trigger time; required for `PlaceHold`
    /// and `DirectRent`.
    pub renter_name: Option<String>,
    /// Who is acting. Admin-only actions are rejected for guests.
    pub session: SessionContext,
}

impl ActionContext {
    pub fn admin() -> Self {
        Self {
            renter_name: None,
            session: SessionContext::admin(),
        }
    }

    pub fn with_renter(mut self, name: impl Into<String>) -> Self {
        self.renter_name = Some(name.into());
        self
    }
}

/// Answer to a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeChoice {
    /// Yes: run the cascade (or the single transition for plain prompts).
    Confirm,
    /// No: fall back to the originally targeted record only.
    Decline,
    /// Close the prompt without acting.
    Dismiss,
}

/// Prompt the UI must present before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSpec {
    /// Plain yes/no confirmation naming the one affected game.
    Single { message: String },
    /// Three-way choice: cascade to all of the renter's items, fall back
    /// to the single item, or abort.
    Cascade {
        message: String,
        renter: String,
        count: usize,
    },
}

impl PromptSpec {
    pub fn message(&self) -> &str {
        match self {
            PromptSpec::Single { message } | PromptSpec::Cascade { message, .. } => message,
        }
    }
}

/// Request to hand to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreRequest {
    UpdateStatus {
        id: i64,
        status: GameStatus,
        renter: Option<String>,
    },
    ReturnAll { renter: String },
    ApproveAll { renter: String },
}

/// A validated action waiting on its confirmation prompt.
#[derive(Debug, Clone)]
pub struct ActionPlan {
    pub game_id: i64,
    pub game_name: String,
    pub action: RentalAction,
    pub prompt: PromptSpec,
    single: StoreRequest,
    cascade: Option<StoreRequest>,
}

impl ActionPlan {
    /// Map the operator's answer to the request to send, if any.
    pub fn resolve(&self, choice: CascadeChoice) -> Option<StoreRequest> {
        match (&self.cascade, choice) {
            (Some(batch), CascadeChoice::Confirm) => Some(batch.clone()),
            (Some(_), CascadeChoice::Decline) => Some(self.single.clone()),
            (None, CascadeChoice::Confirm) => Some(self.single.clone()),
            // Declining a plain confirm is the same as dismissing it.
            _ => None,
        }
    }

    /// Whether this plan carries the three-way cascade prompt.
    pub fn is_cascade(&self) -> bool {
        self.cascade.is_some()
    }
}

/// Validate `action` against the current snapshot and build its plan.
///
/// Rejections here happen before any request is sent: unknown ids,
/// off-table transitions, missing admin rights and blank renter input
/// for `PlaceHold`/`DirectRent`.
pub fn plan_action(
    games: &[GameRecord],
    game_id: i64,
    action: RentalAction,
    ctx: &ActionContext,
) -> Result<ActionPlan, RentalError> {
    let game = games
        .iter()
        .find(|game| game.id == game_id)
        .ok_or(RentalError::UnknownGame(game_id))?;

    if action.requires_admin() && !ctx.session.authenticated {
        return Err(RentalError::auth(format!(
            "{action:?} requires an authenticated admin"
        )));
    }

    let transition = apply(game.status, action)?;

    let supplied_renter = match transition.renter {
        RenterEffect::Set => {
            let name = ctx
                .renter_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| RentalError::validation("대여자 이름을 입력해주세요."))?;
            Some(name.to_string())
        }
        RenterEffect::Retain => game.renter().map(str::to_string),
        RenterEffect::Clear => None,
    };

    let single = StoreRequest::UpdateStatus {
        id: game.id,
        status: transition.to,
        renter: supplied_renter,
    };

    let cascade = cascade_request(games, game, action);
    let prompt = match &cascade {
        Some((request, count)) => {
            // Matching is exact-string equality on the stored renter;
            // differently formatted names never cascade together.
            let renter = game.renter().unwrap_or_default().to_string();
            let verb = match request {
                StoreRequest::ReturnAll { .. } => "반납",
                _ => "수령",
            };
            PromptSpec::Cascade {
                message: format!(
                    "{renter}님의 게임 {count}개를 모두 {verb} 처리하시겠습니까? (아니오: [{name}]만 처리)",
                    name = game.name
                ),
                renter,
                count: *count,
            }
        }
        None => PromptSpec::Single {
            message: single_prompt_message(game, action, transition.to),
        },
    };

    Ok(ActionPlan {
        game_id: game.id,
        game_name: game.name.clone(),
        action,
        prompt,
        single,
        cascade: cascade.map(|(request, _)| request),
    })
}

/// Count the renter's items in the matching source state and build the
/// batch request when more than one would be affected.
fn cascade_request(
    games: &[GameRecord],
    target: &GameRecord,
    action: RentalAction,
) -> Option<(StoreRequest, usize)> {
    let renter = target.renter()?;
    let (source, request) = match action {
        RentalAction::Return => (
            GameStatus::Rented,
            StoreRequest::ReturnAll { renter: renter.to_string() },
        ),
        RentalAction::ConfirmPickup => (
            GameStatus::Dibs,
            StoreRequest::ApproveAll { renter: renter.to_string() },
        ),
        _ => return None,
    };

    let count = games
        .iter()
        .filter(|game| game.status == source && game.renter() == Some(renter))
        .count();
    if count > 1 {
        Some((request, count))
    } else {
        None
    }
}

fn single_prompt_message(game: &GameRecord, action: RentalAction, to: GameStatus) -> String {
    match action {
        RentalAction::ConfirmPickup => "현장 수령 확인하시겠습니까?".to_string(),
        RentalAction::Return => "반납 처리하시겠습니까?".to_string(),
        RentalAction::DirectRent => format!("[{}] 현장 대여 처리하시겠습니까?", game.name),
        _ => format!(
            "[{}] 상태를 '{}'(으)로 변경하시겠습니까?",
            game.name,
            to.label()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(id: i64, status: GameStatus, renter: Option<&str>) -> GameRecord {
        GameRecord {
            id,
            name: format!("게임{id}"),
            category: String::new(),
            status,
            renter: renter.map(str::to_string),
            tags: String::new(),
            difficulty: None,
            players: None,
            genre: String::new(),
            image: String::new(),
            bgg_id: String::new(),
            location: String::new(),
        }
    }

    #[test]
    fn multi_item_return_offers_cascade() {
        let games = vec![
            game(1, GameStatus::Rented, Some("김보드")),
            game(2, GameStatus::Rented, Some("김보드")),
            game(3, GameStatus::Rented, Some("박주사위")),
        ];
        let plan =
            plan_action(&games, 1, RentalAction::Return, &ActionContext::admin()).unwrap();
        assert!(plan.is_cascade());
        match &plan.prompt {
            PromptSpec::Cascade { renter, count, .. } => {
                assert_eq!(renter, "김보드");
                assert_eq!(*count, 2);
            }
            other => panic!("expected cascade prompt, got {other:?}"),
        }

        assert_eq!(
            plan.resolve(CascadeChoice::Confirm),
            Some(StoreRequest::ReturnAll { renter: "김보드".to_string() })
        );
        assert_eq!(
            plan.resolve(CascadeChoice::Decline),
            Some(StoreRequest::UpdateStatus {
                id: 1,
                status: GameStatus::Available,
                renter: None,
            })
        );
        assert_eq!(plan.resolve(CascadeChoice::Dismiss), None);
    }

    #[test]
    fn single_item_return_gets_plain_confirm() {
        let games = vec![
            game(1, GameStatus::Rented, Some("김보드")),
            game(2, GameStatus::Rented, Some("박주사위")),
        ];
        let plan =
            plan_action(&games, 1, RentalAction::Return, &ActionContext::admin()).unwrap();
        assert!(!plan.is_cascade());
        assert!(matches!(plan.prompt, PromptSpec::Single { .. }));
        // Declining a plain confirm sends nothing.
        assert_eq!(plan.resolve(CascadeChoice::Decline), None);
        assert!(plan.resolve(CascadeChoice::Confirm).is_some());
    }

    #[test]
    fn pickup_cascade_counts_only_dibs() {
        let games = vec![
            game(1, GameStatus::Dibs, Some("김보드")),
            game(2, GameStatus::Dibs, Some("김보드")),
            game(3, GameStatus::Rented, Some("김보드")),
        ];
        let plan =
            plan_action(&games, 1, RentalAction::ConfirmPickup, &ActionContext::admin())
                .unwrap();
        match &plan.prompt {
            PromptSpec::Cascade { count, .. } => assert_eq!(*count, 2),
            other => panic!("expected cascade prompt, got {other:?}"),
        }
        assert_eq!(
            plan.resolve(CascadeChoice::Confirm),
            Some(StoreRequest::ApproveAll { renter: "김보드".to_string() })
        );
    }

    #[test]
    fn renter_match_is_exact_string_equality() {
        // A trailing space is a different renter string.
        let games = vec![
            game(1, GameStatus::Rented, Some("김보드")),
            game(2, GameStatus::Rented, Some("김보드 ")),
        ];
        let plan =
            plan_action(&games, 1, RentalAction::Return, &ActionContext::admin()).unwrap();
        assert!(!plan.is_cascade());

        let games = vec![
            game(1, GameStatus::Rented, Some("김보드")),
            game(2, GameStatus::Rented, Some("김 보드")),
        ];
        let plan =
            plan_action(&games, 1, RentalAction::Return, &ActionContext::admin()).unwrap();
        assert!(!plan.is_cascade());
    }

    #[test]
    fn direct_rent_requires_renter_name() {
        let games = vec![game(1, GameStatus::Available, None)];

        let err = plan_action(&games, 1, RentalAction::DirectRent, &ActionContext::admin())
            .unwrap_err();
        assert!(matches!(err, RentalError::Validation(_)));

        let err = plan_action(
            &games,
            1,
            RentalAction::DirectRent,
            &ActionContext::admin().with_renter("   "),
        )
        .unwrap_err();
        assert!(matches!(err, RentalError::Validation(_)));

        let plan = plan_action(
            &games,
            1,
            RentalAction::DirectRent,
            &ActionContext::admin().with_renter("김보드"),
        )
        .unwrap();
        assert_eq!(
            plan.resolve(CascadeChoice::Confirm),
            Some(StoreRequest::UpdateStatus {
                id: 1,
                status: GameStatus::Rented,
                renter: Some("김보드".to_string()),
            })
        );
    }

    #[test]
    fn admin_actions_rejected_for_guests() {
        let games = vec![game(1, GameStatus::Rented, Some("김보드"))];
        let guest = ActionContext::default();
        let err = plan_action(&games, 1, RentalAction::Return, &guest).unwrap_err();
        assert!(matches!(err, RentalError::Auth(_)));
    }

    #[test]
    fn hold_keeps_renter_on_pickup() {
        let games = vec![game(1, GameStatus::Dibs, Some("김보드"))];
        let plan =
            plan_action(&games, 1, RentalAction::ConfirmPickup, &ActionContext::admin())
                .unwrap();
        assert_eq!(
            plan.resolve(CascadeChoice::Confirm),
            Some(StoreRequest::UpdateStatus {
                id: 1,
                status: GameStatus::Rented,
                renter: Some("김보드".to_string()),
            })
        );
    }

    #[test]
    fn unknown_game_is_rejected() {
        let games = vec![game(1, GameStatus::Available, None)];
        let err =
            plan_action(&games, 99, RentalAction::PlaceHold, &ActionContext::default())
                .unwrap_err();
        assert!(matches!(err, RentalError::UnknownGame(99)));
    }
}
