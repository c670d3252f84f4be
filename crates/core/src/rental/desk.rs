//! The rental desk: confirmation gate → cascade decision → request →
//! wholesale reload, all against the injected collaborators.

use tracing::{info, warn};

use crate::catalog::CatalogCache;
use crate::error::RentalError;

use super::plan::{plan_action, ActionContext, CascadeChoice, PromptSpec, StoreRequest};
use super::store::{CatalogStore, GameEdit};
use super::transitions::RentalAction;

/// Injected confirmation capability. The TUI
/// answers these from its modal flow; tests script the answers.
pub trait PromptProvider {
    /// Plain yes/no confirmation.
    fn confirm(&mut self, message: &str) -> bool;
    /// Three-way cascade choice.
    fn choose(&mut self, message: &str) -> CascadeChoice;
}

/// How a requested action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The request was sent and acknowledged; `transitioned` records
    /// touched (1 for single transitions, N for a cascade).
    Completed { transitioned: usize },
    /// The operator backed out before anything was sent.
    Aborted,
}

/// Drives state-changing actions end to end.
///
/// The desk owns the catalog snapshot and is the only writer path: every
/// mutation is one round trip to the store followed by a full refetch.
/// On failure the snapshot is left untouched and the error is returned
/// for the operator to see.
#[derive(Clone)]
pub struct RentalDesk<S> {
    store: S,
    cache: CatalogCache,
}

impl<S: CatalogStore> RentalDesk<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: CatalogCache::new(),
        }
    }

    /// Read-only handle to the snapshot, for the filter engine and UI.
    pub fn cache(&self) -> CatalogCache {
        self.cache.clone()
    }

    /// Refetch the collection and install it as the new snapshot.
    pub async fn reload(&self) -> Result<usize, RentalError> {
        let games = self.store.fetch_games().await?;
        let total = games.len();
        self.cache.install(games);
        info!(total, "catalog reloaded");
        Ok(total)
    }

    /// Single entry point per action: validate, prompt, send, reload.
    pub async fn request_transition(
        &self,
        prompts: &mut impl PromptProvider,
        game_id: i64,
        action: RentalAction,
        ctx: &ActionContext,
    ) -> Result<ActionOutcome, RentalError> {
        let snapshot = self.cache.games();
        let plan = plan_action(&snapshot, game_id, action, ctx)?;

        let choice = match &plan.prompt {
            PromptSpec::Single { message } => {
                if prompts.confirm(message) {
                    CascadeChoice::Confirm
                } else {
                    CascadeChoice::Dismiss
                }
            }
            PromptSpec::Cascade { message, .. } => prompts.choose(message),
        };

        let Some(request) = plan.resolve(choice) else {
            info!(game_id, ?action, "action aborted at prompt");
            return Ok(ActionOutcome::Aborted);
        };

        let transitioned = self.submit(request).await?;
        info!(game_id, ?action, transitioned, "transition completed");
        Ok(ActionOutcome::Completed { transitioned })
    }

    /// Send an already-confirmed request and refresh the snapshot.
    /// Interactive frontends that run their own prompt flow (modals)
    /// land here after [`super::plan::ActionPlan::resolve`].
    pub async fn submit(&self, request: StoreRequest) -> Result<usize, RentalError> {
        let transitioned = match request {
            StoreRequest::UpdateStatus { id, status, renter } => {
                self.store
                    .update_game_status(id, status, renter.as_deref())
                    .await?;
                1
            }
            StoreRequest::ReturnAll { renter } => self.store.return_all_by_renter(&renter).await?,
            StoreRequest::ApproveAll { renter } => {
                self.store.approve_all_dibs_by_renter(&renter).await?
            }
        };
        self.reload().await?;
        Ok(transitioned)
    }

    /// Delete without a prompt; the caller has already confirmed.
    pub async fn remove(&self, game_id: i64) -> Result<(), RentalError> {
        let game = self
            .cache
            .game(game_id)
            .ok_or(RentalError::UnknownGame(game_id))?;
        self.store.delete_game(game_id).await?;
        self.reload().await?;
        warn!(game_id, name = %game.name, "game deleted");
        Ok(())
    }

    /// Apply an already-confirmed edit.
    pub async fn apply_edit(&self, game_id: i64, edit: &GameEdit) -> Result<(), RentalError> {
        if edit.name.trim().is_empty() {
            return Err(RentalError::validation("이름은 필수입니다."));
        }
        if self.cache.game(game_id).is_none() {
            return Err(RentalError::UnknownGame(game_id));
        }
        self.store.edit_game(game_id, edit).await?;
        self.reload().await?;
        Ok(())
    }

    /// Delete a record outright; legal from any state, irreversible.
    pub async fn delete_game(
        &self,
        prompts: &mut impl PromptProvider,
        game_id: i64,
    ) -> Result<ActionOutcome, RentalError> {
        let game = self
            .cache
            .game(game_id)
            .ok_or(RentalError::UnknownGame(game_id))?;
        if !prompts.confirm(&format!("[{}] 정말 삭제합니까?", game.name)) {
            return Ok(ActionOutcome::Aborted);
        }
        self.remove(game_id).await?;
        Ok(ActionOutcome::Completed { transitioned: 1 })
    }

    /// Overwrite descriptive fields after confirmation.
    pub async fn edit_game(
        &self,
        prompts: &mut impl PromptProvider,
        game_id: i64,
        edit: &GameEdit,
    ) -> Result<ActionOutcome, RentalError> {
        if edit.name.trim().is_empty() {
            return Err(RentalError::validation("이름은 필수입니다."));
        }
        if !prompts.confirm(&format!("[{}] 정보를 수정하시겠습니까?", edit.name)) {
            return Ok(ActionOutcome::Aborted);
        }
        self.apply_edit(game_id, edit).await?;
        Ok(ActionOutcome::Completed { transitioned: 1 })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::models::{GameRecord, GameStatus};

    #[derive(Default)]
    struct MemoryState {
        games: Vec<GameRecord>,
        calls: Vec<String>,
        fail_mutations: bool,
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        state: Arc<Mutex<MemoryState>>,
    }

    impl MemoryStore {
        fn with_games(games: Vec<GameRecord>) -> Self {
            let store = Self::default();
            store.state.lock().games = games;
            store
        }

        fn calls(&self) -> Vec<String> {
            self.state.lock().calls.clone()
        }

        fn games(&self) -> Vec<GameRecord> {
            self.state.lock().games.clone()
        }

        fn fail_mutations(&self) {
            self.state.lock().fail_mutations = true;
        }
    }

    impl CatalogStore for MemoryStore {
        async fn fetch_games(&self) -> Result<Vec<GameRecord>, RentalError> {
            let mut state = self.state.lock();
            state.calls.push("fetch".to_string());
            Ok(state.games.clone())
        }

        async fn update_game_status(
            &self,
            id: i64,
            status: GameStatus,
            renter: Option<&str>,
        ) -> Result<(), RentalError> {
            let mut state = self.state.lock();
            if state.fail_mutations {
                return Err(RentalError::persistence("simulated outage"));
            }
            state.calls.push(format!("update:{id}"));
            let game = state
                .games
                .iter_mut()
                .find(|game| game.id == id)
                .ok_or(RentalError::UnknownGame(id))?;
            game.status = status;
            game.renter = renter.map(str::to_string);
            Ok(())
        }

        async fn edit_game(&self, id: i64, fields: &GameEdit) -> Result<(), RentalError> {
            let mut state = self.state.lock();
            state.calls.push(format!("edit:{id}"));
            let game = state
                .games
                .iter_mut()
                .find(|game| game.id == id)
                .ok_or(RentalError::UnknownGame(id))?;
            game.name = fields.name.clone();
            game.tags = fields.tags.clone();
            Ok(())
        }

        async fn delete_game(&self, id: i64) -> Result<(), RentalError> {
            let mut state = self.state.lock();
            state.calls.push(format!("delete:{id}"));
            state.games.retain(|game| game.id != id);
            Ok(())
        }

        async fn return_all_by_renter(&self, renter: &str) -> Result<usize, RentalError> {
            let mut state = self.state.lock();
            if state.fail_mutations {
                return Err(RentalError::persistence("simulated outage"));
            }
            state.calls.push(format!("return_all:{renter}"));
            let mut count = 0;
            for game in &mut state.games {
                if game.status == GameStatus::Rented && game.renter.as_deref() == Some(renter) {
                    game.status = GameStatus::Available;
                    game.renter = None;
                    count += 1;
                }
            }
            Ok(count)
        }

        async fn approve_all_dibs_by_renter(&self, renter: &str) -> Result<usize, RentalError> {
            let mut state = self.state.lock();
            state.calls.push(format!("approve_all:{renter}"));
            let mut count = 0;
            for game in &mut state.games {
                if game.status == GameStatus::Dibs && game.renter.as_deref() == Some(renter) {
                    game.status = GameStatus::Rented;
                    count += 1;
                }
            }
            Ok(count)
        }
    }

    #[derive(Default)]
    struct ScriptedPrompts {
        confirm_answer: bool,
        choice_answer: Option<CascadeChoice>,
        seen: Vec<String>,
    }

    impl PromptProvider for ScriptedPrompts {
        fn confirm(&mut self, message: &str) -> bool {
            self.seen.push(format!("confirm:{message}"));
            self.confirm_answer
        }

        fn choose(&mut self, message: &str) -> CascadeChoice {
            self.seen.push(format!("choose:{message}"));
            self.choice_answer.unwrap_or(CascadeChoice::Dismiss)
        }
    }

    fn rented(id: i64, renter: &str) -> GameRecord {
        GameRecord {
            id,
            name: format!("게임{id}"),
            category: String::new(),
            status: GameStatus::Rented,
            renter: Some(renter.to_string()),
            tags: String::new(),
            difficulty: None,
            players: None,
            genre: String::new(),
            image: String::new(),
            bgg_id: String::new(),
            location: String::new(),
        }
    }

    async fn desk_with(games: Vec<GameRecord>) -> (RentalDesk<MemoryStore>, MemoryStore) {
        let store = MemoryStore::with_games(games);
        let desk = RentalDesk::new(store.clone());
        desk.reload().await.unwrap();
        (desk, store)
    }

    #[tokio::test]
    async fn cascade_confirm_transitions_every_item() {
        let (desk, store) = desk_with(vec![
            rented(1, "김보드"),
            rented(2, "김보드"),
            rented(3, "김보드"),
        ])
        .await;

        let mut prompts = ScriptedPrompts {
            choice_answer: Some(CascadeChoice::Confirm),
            ..Default::default()
        };
        let outcome = desk
            .request_transition(&mut prompts, 2, RentalAction::Return, &ActionContext::admin())
            .await
            .unwrap();

        assert_eq!(outcome, ActionOutcome::Completed { transitioned: 3 });
        assert!(store
            .games()
            .iter()
            .all(|game| game.status == GameStatus::Available && game.renter.is_none()));
        // One batch request, no per-item updates.
        let calls = store.calls();
        assert!(calls.contains(&"return_all:김보드".to_string()));
        assert!(!calls.iter().any(|call| call.starts_with("update:")));
    }

    #[tokio::test]
    async fn cascade_decline_transitions_only_the_target() {
        let (desk, store) =
            desk_with(vec![rented(1, "김보드"), rented(2, "김보드")]).await;

        let mut prompts = ScriptedPrompts {
            choice_answer: Some(CascadeChoice::Decline),
            ..Default::default()
        };
        let outcome = desk
            .request_transition(&mut prompts, 1, RentalAction::Return, &ActionContext::admin())
            .await
            .unwrap();

        assert_eq!(outcome, ActionOutcome::Completed { transitioned: 1 });
        let games = store.games();
        assert_eq!(
            games.iter().find(|game| game.id == 1).unwrap().status,
            GameStatus::Available
        );
        assert_eq!(
            games.iter().find(|game| game.id == 2).unwrap().status,
            GameStatus::Rented
        );
    }

    #[tokio::test]
    async fn cascade_dismiss_sends_nothing() {
        let (desk, store) =
            desk_with(vec![rented(1, "김보드"), rented(2, "김보드")]).await;

        let mut prompts = ScriptedPrompts::default();
        let outcome = desk
            .request_transition(&mut prompts, 1, RentalAction::Return, &ActionContext::admin())
            .await
            .unwrap();

        assert_eq!(outcome, ActionOutcome::Aborted);
        let calls = store.calls();
        assert!(calls.iter().all(|call| call == "fetch"));
        assert!(store.games().iter().all(|game| game.status == GameStatus::Rented));
    }

    #[tokio::test]
    async fn lone_rental_gets_plain_confirm_not_three_way() {
        let (desk, _store) = desk_with(vec![rented(1, "김보드")]).await;

        let mut prompts = ScriptedPrompts {
            confirm_answer: true,
            ..Default::default()
        };
        let outcome = desk
            .request_transition(&mut prompts, 1, RentalAction::Return, &ActionContext::admin())
            .await
            .unwrap();

        assert_eq!(outcome, ActionOutcome::Completed { transitioned: 1 });
        assert_eq!(prompts.seen.len(), 1);
        assert!(prompts.seen[0].starts_with("confirm:"));
    }

    #[tokio::test]
    async fn direct_rent_with_blank_name_sends_no_request() {
        let mut game = rented(1, "");
        game.status = GameStatus::Available;
        game.renter = None;
        let (desk, store) = desk_with(vec![game]).await;
        let fetches_before = store.calls().len();

        let mut prompts = ScriptedPrompts {
            confirm_answer: true,
            ..Default::default()
        };
        let err = desk
            .request_transition(
                &mut prompts,
                1,
                RentalAction::DirectRent,
                &ActionContext::admin().with_renter("   "),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RentalError::Validation(_)));
        assert!(prompts.seen.is_empty());
        assert_eq!(store.calls().len(), fetches_before);
        assert_eq!(store.games()[0].status, GameStatus::Available);
    }

    #[tokio::test]
    async fn deletion_disappears_from_next_reload() {
        let (desk, store) =
            desk_with(vec![rented(1, "김보드"), rented(2, "박주사위")]).await;

        let mut prompts = ScriptedPrompts {
            confirm_answer: true,
            ..Default::default()
        };
        let outcome = desk.delete_game(&mut prompts, 1).await.unwrap();

        assert_eq!(outcome, ActionOutcome::Completed { transitioned: 1 });
        assert!(desk.cache().game(1).is_none());
        assert!(desk.cache().game(2).is_some());
        assert!(store.calls().contains(&"delete:1".to_string()));
    }

    #[tokio::test]
    async fn persistence_failure_leaves_the_snapshot_untouched() {
        let (desk, store) = desk_with(vec![rented(1, "김보드")]).await;
        store.fail_mutations();

        let mut prompts = ScriptedPrompts {
            confirm_answer: true,
            ..Default::default()
        };
        let err = desk
            .request_transition(&mut prompts, 1, RentalAction::Return, &ActionContext::admin())
            .await
            .unwrap_err();

        assert!(matches!(err, RentalError::Persistence(_)));
        assert_eq!(desk.cache().game(1).unwrap().status, GameStatus::Rented);
    }

    #[tokio::test]
    async fn edit_requires_a_name() {
        let (desk, _store) = desk_with(vec![rented(1, "김보드")]).await;
        let mut prompts = ScriptedPrompts {
            confirm_answer: true,
            ..Default::default()
        };
        let edit = GameEdit { name: " ".to_string(), ..Default::default() };
        let err = desk.edit_game(&mut prompts, 1, &edit).await.unwrap_err();
        assert!(matches!(err, RentalError::Validation(_)));
        assert!(prompts.seen.is_empty());
    }
}
