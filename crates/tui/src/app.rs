use std::{cmp, io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc, time::Instant};
use tracing::{error, info};

use shelfside_core::{
    api::{ApiClient, AuthResponse, NewGame, ProductHit},
    catalog::{category_options, filter::ALL_CATEGORIES, CatalogFilter, SearchDebouncer},
    config::RECOMMENDATION_DEFAULTS,
    error::RentalError,
    models::{
        ConfigItem, GameRecord, GameStatus, LogKind, RentalLogEntry, UserRecord, DEFAULT_CATEGORY,
    },
    rental::{
        legal_actions, plan_action, ActionContext, ActionPlan, CascadeChoice, GameEdit,
        RentalAction, RentalDesk, StoreRequest,
    },
    session::SessionContext,
};

const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
struct Theme {
    accent: Color,
    muted: Color,
    success: Color,
    warning: Color,
    danger: Color,
    info: Color,
    selection_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Cyan,
            muted: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
            info: Color::Blue,
            selection_bg: Color::DarkGray,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Search,
    RenterFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Catalog,
    AddGame,
    Config,
}

/// Single-line text input for the renter-name and password prompts.
#[derive(Debug, Clone, Default)]
struct TextPrompt {
    input: String,
}

impl TextPrompt {
    fn insert(&mut self, ch: char) {
        if !ch.is_control() {
            self.input.push(ch);
        }
    }

    fn backspace(&mut self) {
        self.input.pop();
    }
}

const LOGIN_LABELS: [&str; 4] = ["이름 (회원가입 시)", "학번", "전화번호 (회원가입 시)", "비밀번호"];

/// Combined login/signup form. A filled name field means signup; an
/// empty one means login with student id and password only.
#[derive(Debug, Clone, Default)]
struct LoginModal {
    fields: [String; 4],
    field: usize,
    pending_hold: Option<i64>,
}

impl LoginModal {
    fn new(pending_hold: Option<i64>) -> Self {
        Self {
            pending_hold,
            ..Default::default()
        }
    }

    fn name(&self) -> &str {
        &self.fields[0]
    }

    fn student_id(&self) -> &str {
        &self.fields[1]
    }

    fn phone(&self) -> &str {
        &self.fields[2]
    }

    fn password(&self) -> &str {
        &self.fields[3]
    }

    fn next_field(&mut self) {
        self.field = (self.field + 1) % self.fields.len();
    }

    fn prev_field(&mut self) {
        self.field = (self.field + self.fields.len() - 1) % self.fields.len();
    }

    fn insert(&mut self, ch: char) {
        if !ch.is_control() {
            self.fields[self.field].push(ch);
        }
    }

    fn backspace(&mut self) {
        self.fields[self.field].pop();
    }
}

const FORM_LABELS: [&str; 7] = ["이름", "카테고리", "난이도", "장르", "인원", "태그", "이미지 URL"];

/// Edit/add form over the descriptive fields. `game_id` is `None` for
/// the add-game flow, where `product_id`/`bgg_id` ride along.
#[derive(Debug, Clone, Default)]
struct GameFormModal {
    game_id: Option<i64>,
    product_id: String,
    bgg_id: String,
    values: [String; 7],
    field: usize,
}

impl GameFormModal {
    fn for_edit(game: &GameRecord) -> Self {
        Self {
            game_id: Some(game.id),
            values: [
                game.name.clone(),
                game.category.clone(),
                game
                    .difficulty
                    .map(|score| format!("{score:.1}"))
                    .unwrap_or_default(),
                game.genre.clone(),
                game.players.clone().unwrap_or_default(),
                game.tags.clone(),
                game.image.clone(),
            ],
            ..Default::default()
        }
    }

    fn for_new(hit: &ProductHit) -> Self {
        let mut form = Self::blank();
        form.values[0] = hit.title.clone();
        form.values[6] = hit.image.clone();
        form.product_id = hit.product_id.clone();
        form
    }

    fn blank() -> Self {
        let mut form = Self::default();
        form.values[1] = DEFAULT_CATEGORY.to_string();
        form
    }

    fn next_field(&mut self) {
        self.field = (self.field + 1) % self.values.len();
    }

    fn prev_field(&mut self) {
        self.field = (self.field + self.values.len() - 1) % self.values.len();
    }

    fn insert(&mut self, ch: char) {
        if !ch.is_control() {
            self.values[self.field].push(ch);
        }
    }

    fn backspace(&mut self) {
        self.values[self.field].pop();
    }

    fn to_edit(&self) -> GameEdit {
        GameEdit {
            name: self.values[0].trim().to_string(),
            category: self.values[1].trim().to_string(),
            difficulty: self.values[2].trim().parse().ok(),
            genre: self.values[3].trim().to_string(),
            players: self.values[4].trim().to_string(),
            tags: self.values[5].trim().to_string(),
            image: self.values[6].trim().to_string(),
        }
    }

    fn to_new_game(&self) -> NewGame {
        NewGame {
            name: self.values[0].trim().to_string(),
            category: self.values[1].trim().to_string(),
            players: self.values[4].trim().to_string(),
            tags: self.values[5].trim().to_string(),
            image: self.values[6].trim().to_string(),
            bgg_id: self.bgg_id.clone(),
            product_id: self.product_id.clone(),
        }
    }
}

enum Modal {
    Action(ActionPlan),
    DeleteConfirm { game_id: i64, name: String },
    ConfigSaveConfirm,
    RenterPrompt { game_id: i64, prompt: TextPrompt },
    Password(TextPrompt),
    Login(LoginModal),
    Form(GameFormModal),
    Logs { game_name: String, entries: Vec<RentalLogEntry> },
}

enum AppEvent {
    Input(Event),
    Tick,
    Reloaded(Result<usize, RentalError>),
    RequestDone(Result<usize, RentalError>),
    DeleteDone(Result<(), RentalError>),
    EditDone(Result<(), RentalError>),
    LogsLoaded {
        game_name: String,
        result: Result<Vec<RentalLogEntry>, RentalError>,
    },
    ConfigLoaded(Result<Vec<ConfigItem>, RentalError>),
    ConfigSaved(Result<(), RentalError>),
    AdminChecked(Result<(), RentalError>),
    AuthFinished {
        result: Result<AuthResponse, RentalError>,
        fallback: Option<UserRecord>,
        pending_hold: Option<i64>,
    },
    ProductsFound(Result<Vec<ProductHit>, RentalError>),
    GameAdded(Result<(), RentalError>),
}

#[derive(Debug, Default)]
struct AddGameState {
    keyword: String,
    results: Vec<ProductHit>,
    cursor: usize,
    focus_results: bool,
    searching: bool,
}

#[derive(Debug, Default)]
struct ConfigState {
    items: Vec<ConfigItem>,
    cursor: usize,
    field: usize,
}

impl ConfigState {
    fn current_field_mut(&mut self) -> Option<&mut String> {
        let field = self.field;
        self.items.get_mut(self.cursor).map(|item| match field {
            0 => &mut item.label,
            1 => &mut item.value,
            _ => &mut item.color,
        })
    }
}

struct UiState {
    games: Vec<GameRecord>,
    filtered: Vec<GameRecord>,
    cursor: usize,
    offset: usize,
    list_height: usize,
    status: String,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            games: Vec::new(),
            filtered: Vec::new(),
            cursor: 0,
            offset: 0,
            list_height: 1,
            status: "불러오는 중...".to_string(),
            should_quit: false,
        }
    }
}

impl UiState {
    fn move_cursor(&mut self, delta: isize) {
        if self.filtered.is_empty() {
            return;
        }
        let len = self.filtered.len() as isize;
        let mut idx = self.cursor as isize + delta;
        if idx < 0 {
            idx = 0;
        } else if idx >= len {
            idx = len - 1;
        }
        self.cursor = idx as usize;
        self.ensure_cursor_visible();
    }

    fn move_to(&mut self, index: usize) {
        if self.filtered.is_empty() {
            return;
        }
        self.cursor = index.min(self.filtered.len() - 1);
        self.ensure_cursor_visible();
    }

    fn move_to_end(&mut self) {
        if self.filtered.is_empty() {
            return;
        }
        self.cursor = self.filtered.len() - 1;
        self.ensure_cursor_visible();
    }

    fn page_down(&mut self) {
        if self.filtered.is_empty() || self.list_height == 0 {
            return;
        }
        let delta = self.list_height.min(self.filtered.len());
        self.move_cursor(delta as isize);
    }

    fn page_up(&mut self) {
        if self.filtered.is_empty() || self.list_height == 0 {
            return;
        }
        let delta = self.list_height.min(self.filtered.len());
        self.move_cursor(-(delta as isize));
    }

    fn visible_games(&self, height: usize) -> &[GameRecord] {
        if self.filtered.is_empty() {
            return &[];
        }
        let end = (self.offset + height).min(self.filtered.len());
        &self.filtered[self.offset..end]
    }

    fn current_game(&self) -> Option<&GameRecord> {
        self.filtered.get(self.cursor)
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn clamp_cursor(&mut self) {
        if self.filtered.is_empty() {
            self.cursor = 0;
            self.offset = 0;
        } else if self.cursor >= self.filtered.len() {
            self.cursor = self.filtered.len() - 1;
        }
    }

    fn ensure_cursor_visible(&mut self) {
        if self.filtered.is_empty() || self.list_height == 0 {
            self.offset = 0;
            return;
        }
        let height = self.list_height;
        let max_offset = self.filtered.len().saturating_sub(height);

        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }
        if self.offset > max_offset {
            self.offset = max_offset;
        }
    }
}

pub struct ShelfsideApp {
    api: ApiClient,
    desk: RentalDesk<ApiClient>,
    state: UiState,
    filter: CatalogFilter,
    debouncer: SearchDebouncer,
    session: SessionContext,
    mode: Mode,
    screen: Screen,
    modal: Option<Modal>,
    add_game: AddGameState,
    config: ConfigState,
    theme: Theme,
    pending_request: bool,
    event_tx: Option<mpsc::Sender<AppEvent>>,
}

impl ShelfsideApp {
    pub fn new(api: ApiClient) -> Self {
        let desk = RentalDesk::new(api.clone());
        Self {
            api,
            desk,
            state: UiState::default(),
            filter: CatalogFilter::default(),
            debouncer: SearchDebouncer::new(),
            session: SessionContext::default(),
            mode: Mode::Browse,
            screen: Screen::Catalog,
            modal: None,
            add_game: AddGameState::default(),
            config: ConfigState::default(),
            theme: Theme::default(),
            pending_request: false,
            event_tx: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);
        self.spawn_reload();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }

            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }

            if self.state.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    self.state.set_status(format!("오류: {err}"));
                }
                true
            }
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            Some(AppEvent::Reloaded(result)) => {
                match result {
                    Ok(total) => {
                        self.refresh_from_cache();
                        self.state.set_status(format!("게임 {total}개 불러왔습니다."));
                    }
                    Err(err) => {
                        error!(?err, "catalog reload failed");
                        self.state.set_status(format!("불러오기 실패: {err}"));
                    }
                }
                true
            }
            Some(AppEvent::RequestDone(result)) => {
                self.pending_request = false;
                match result {
                    Ok(count) => {
                        self.refresh_from_cache();
                        self.state.set_status(format!("처리되었습니다 ({count}건)."));
                    }
                    Err(err) => self.state.set_status(format!("오류: {err}")),
                }
                true
            }
            Some(AppEvent::DeleteDone(result)) => {
                self.pending_request = false;
                match result {
                    Ok(()) => {
                        self.refresh_from_cache();
                        self.state.set_status("삭제되었습니다.".to_string());
                    }
                    Err(err) => self.state.set_status(format!("삭제 실패: {err}")),
                }
                true
            }
            Some(AppEvent::EditDone(result)) => {
                self.pending_request = false;
                match result {
                    Ok(()) => {
                        self.refresh_from_cache();
                        self.state.set_status("저장되었습니다.".to_string());
                    }
                    Err(err) => self.state.set_status(format!("저장 실패: {err}")),
                }
                true
            }
            Some(AppEvent::LogsLoaded { game_name, result }) => {
                match result {
                    Ok(entries) => self.modal = Some(Modal::Logs { game_name, entries }),
                    Err(err) => self.state.set_status(format!("기록 조회 실패: {err}")),
                }
                true
            }
            Some(AppEvent::ConfigLoaded(result)) => {
                let items = match result {
                    Ok(items) if !items.is_empty() => items,
                    Ok(_) => RECOMMENDATION_DEFAULTS.clone(),
                    Err(err) => {
                        self.state.set_status(format!("설정 조회 실패: {err}"));
                        RECOMMENDATION_DEFAULTS.clone()
                    }
                };
                self.config = ConfigState {
                    items,
                    cursor: 0,
                    field: 0,
                };
                true
            }
            Some(AppEvent::ConfigSaved(result)) => {
                self.pending_request = false;
                match result {
                    Ok(()) => self.state.set_status("설정이 저장되었습니다.".to_string()),
                    Err(err) => self.state.set_status(format!("설정 저장 실패: {err}")),
                }
                true
            }
            Some(AppEvent::AdminChecked(result)) => {
                match result {
                    Ok(()) => {
                        self.session.authenticated = true;
                        info!("admin gate passed");
                        self.state.set_status("관리자 모드입니다.".to_string());
                    }
                    Err(err) => {
                        self.state.set_status(format!("{err}"));
                        self.modal = Some(Modal::Password(TextPrompt::default()));
                    }
                }
                true
            }
            Some(AppEvent::AuthFinished {
                result,
                fallback,
                pending_hold,
            }) => {
                self.finish_auth(result, fallback, pending_hold);
                true
            }
            Some(AppEvent::ProductsFound(result)) => {
                self.add_game.searching = false;
                match result {
                    Ok(hits) => {
                        let found = hits.len();
                        self.add_game.focus_results = found > 0;
                        self.add_game.cursor = 0;
                        self.add_game.results = hits;
                        self.state.set_status(format!("검색 결과 {found}건."));
                    }
                    Err(err) => self.state.set_status(format!("상품 검색 실패: {err}")),
                }
                true
            }
            Some(AppEvent::GameAdded(result)) => {
                self.pending_request = false;
                match result {
                    Ok(()) => {
                        self.screen = Screen::Catalog;
                        self.add_game = AddGameState::default();
                        self.state.set_status("등록되었습니다.".to_string());
                        self.spawn_reload();
                    }
                    Err(err) => self.state.set_status(format!("등록 실패: {err}")),
                }
                true
            }
            None => false,
        }
    }

    fn handle_tick(&mut self) {
        let committed = self
            .debouncer
            .poll(Instant::now())
            .map(str::to_string);
        if let Some(term) = committed {
            self.filter.search = term;
            self.apply_filter();
        }
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if self.modal.is_some() {
            self.handle_modal_key(key);
            return Ok(());
        }
        match self.screen {
            Screen::Catalog => self.handle_catalog_key(key),
            Screen::AddGame => self.handle_add_game_key(key),
            Screen::Config => self.handle_config_key(key),
        }
        Ok(())
    }

    fn handle_catalog_key(&mut self, key: KeyEvent) {
        match self.mode {
            Mode::Browse => self.handle_browse_key(key),
            Mode::Search => self.handle_search_key(key),
            Mode::RenterFilter => self.handle_renter_filter_key(key),
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.state.should_quit = true,
            KeyCode::Char('r') => self.spawn_reload(),
            KeyCode::Char('/') => {
                self.mode = Mode::Search;
                self.state
                    .set_status("검색어 입력 (#태그 또는 이름, Enter/Esc 종료)".to_string());
            }
            KeyCode::Char('n') => {
                if self.session.authenticated {
                    self.mode = Mode::RenterFilter;
                    self.state.set_status("대여자 이름으로 필터".to_string());
                }
            }
            KeyCode::Char('c') => self.cycle_category(),
            KeyCode::Char('d') => {
                self.filter.difficulty = self.filter.difficulty.next();
                self.apply_filter();
            }
            KeyCode::Char('p') => {
                self.filter.players = self.filter.players.next();
                self.apply_filter();
            }
            KeyCode::Char('a') => {
                self.filter.available_only = !self.filter.available_only;
                self.apply_filter();
            }
            KeyCode::Char('x') => {
                self.filter.reset();
                self.debouncer.reset();
                self.apply_filter();
                self.state.set_status("필터를 초기화했습니다.".to_string());
            }
            KeyCode::Down | KeyCode::Char('j') => self.state.move_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.state.move_cursor(-1),
            KeyCode::PageDown => self.state.page_down(),
            KeyCode::PageUp => self.state.page_up(),
            KeyCode::Home | KeyCode::Char('g') => self.state.move_to(0),
            KeyCode::End | KeyCode::Char('G') => self.state.move_to_end(),
            KeyCode::Char('l') => self.open_logs(),
            KeyCode::Char('h') => self.start_action(RentalAction::PlaceHold),
            KeyCode::Char('u') => self.start_action(RentalAction::CancelHold),
            KeyCode::Char('v') => self.start_action(RentalAction::ConfirmPickup),
            KeyCode::Char('b') => self.start_action(RentalAction::Return),
            KeyCode::Char('o') => self.start_action(RentalAction::MarkLost),
            KeyCode::Char('f') => self.start_action(RentalAction::MarkFound),
            KeyCode::Char('w') => self.start_action(RentalAction::DirectRent),
            KeyCode::Char('e') => self.open_edit_form(),
            KeyCode::Char('D') => self.confirm_delete(),
            KeyCode::Char('m') => self.toggle_member(),
            KeyCode::Char('A') => self.toggle_admin(),
            KeyCode::Char('t') => self.open_config_screen(),
            KeyCode::Char('+') => self.open_add_game_screen(),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                if self.debouncer.flush() {
                    self.filter.search = self.debouncer.committed().to_string();
                    self.apply_filter();
                }
                self.mode = Mode::Browse;
            }
            KeyCode::Esc => self.mode = Mode::Browse,
            KeyCode::Backspace => {
                let mut staged = self.debouncer.staged().to_string();
                staged.pop();
                self.debouncer.set(staged, Instant::now());
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                let mut staged = self.debouncer.staged().to_string();
                staged.push(ch);
                self.debouncer.set(staged, Instant::now());
            }
            _ => {}
        }
    }

    fn handle_renter_filter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.mode = Mode::Browse,
            KeyCode::Backspace => {
                self.filter.renter.pop();
                self.apply_filter();
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                self.filter.renter.push(ch);
                self.apply_filter();
            }
            _ => {}
        }
    }

    fn handle_add_game_key(&mut self, key: KeyEvent) {
        if self.add_game.focus_results {
            match key.code {
                KeyCode::Esc => self.add_game.focus_results = false,
                KeyCode::Up => {
                    if self.add_game.cursor == 0 {
                        self.add_game.focus_results = false;
                    } else {
                        self.add_game.cursor -= 1;
                    }
                }
                KeyCode::Down => {
                    if self.add_game.cursor + 1 < self.add_game.results.len() {
                        self.add_game.cursor += 1;
                    }
                }
                KeyCode::Enter => {
                    if let Some(hit) = self.add_game.results.get(self.add_game.cursor) {
                        self.modal = Some(Modal::Form(GameFormModal::for_new(hit)));
                    }
                }
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Esc => {
                self.screen = Screen::Catalog;
                self.add_game = AddGameState::default();
            }
            KeyCode::Enter => self.run_product_search(),
            KeyCode::Tab => self.modal = Some(Modal::Form(GameFormModal::blank())),
            KeyCode::Down if !self.add_game.results.is_empty() => {
                self.add_game.focus_results = true;
            }
            KeyCode::Backspace => {
                self.add_game.keyword.pop();
            }
            KeyCode::Char(ch) if !ch.is_control() => self.add_game.keyword.push(ch),
            _ => {}
        }
    }

    fn handle_config_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.screen = Screen::Catalog,
            KeyCode::Up => {
                if self.config.cursor > 0 {
                    self.config.cursor -= 1;
                }
            }
            KeyCode::Down => {
                if self.config.cursor + 1 < self.config.items.len() {
                    self.config.cursor += 1;
                }
            }
            KeyCode::Tab => self.config.field = (self.config.field + 1) % 3,
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.modal = Some(Modal::ConfigSaveConfirm);
            }
            KeyCode::Backspace => {
                if let Some(field) = self.config.current_field_mut() {
                    field.pop();
                }
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                if let Some(field) = self.config.current_field_mut() {
                    field.push(ch);
                }
            }
            _ => {}
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) {
        let Some(modal) = self.modal.take() else {
            return;
        };
        match modal {
            Modal::Action(plan) => {
                let choice = match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                        CascadeChoice::Confirm
                    }
                    KeyCode::Char('n') | KeyCode::Char('N') => CascadeChoice::Decline,
                    KeyCode::Esc => CascadeChoice::Dismiss,
                    _ => {
                        self.modal = Some(Modal::Action(plan));
                        return;
                    }
                };
                match plan.resolve(choice) {
                    Some(request) => self.submit_request(request),
                    None => self.state.set_status("취소되었습니다.".to_string()),
                }
            }
            Modal::DeleteConfirm { game_id, name } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.submit_delete(game_id)
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.state.set_status("취소되었습니다.".to_string());
                }
                _ => self.modal = Some(Modal::DeleteConfirm { game_id, name }),
            },
            Modal::ConfigSaveConfirm => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => self.submit_config(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.state.set_status("취소되었습니다.".to_string());
                }
                _ => self.modal = Some(Modal::ConfigSaveConfirm),
            },
            Modal::RenterPrompt { game_id, mut prompt } => match key.code {
                KeyCode::Enter => {
                    let planned = self.plan_into_modal(
                        game_id,
                        RentalAction::DirectRent,
                        Some(prompt.input.clone()),
                    );
                    if !planned {
                        self.modal = Some(Modal::RenterPrompt { game_id, prompt });
                    }
                }
                KeyCode::Esc => {}
                KeyCode::Backspace => {
                    prompt.backspace();
                    self.modal = Some(Modal::RenterPrompt { game_id, prompt });
                }
                KeyCode::Char(ch) => {
                    prompt.insert(ch);
                    self.modal = Some(Modal::RenterPrompt { game_id, prompt });
                }
                _ => self.modal = Some(Modal::RenterPrompt { game_id, prompt }),
            },
            Modal::Password(mut prompt) => match key.code {
                KeyCode::Enter => self.submit_admin_password(prompt.input),
                KeyCode::Esc => {}
                KeyCode::Backspace => {
                    prompt.backspace();
                    self.modal = Some(Modal::Password(prompt));
                }
                KeyCode::Char(ch) => {
                    prompt.insert(ch);
                    self.modal = Some(Modal::Password(prompt));
                }
                _ => self.modal = Some(Modal::Password(prompt)),
            },
            Modal::Login(mut login) => match key.code {
                KeyCode::Enter => self.submit_login(login),
                KeyCode::Esc => {}
                KeyCode::Tab | KeyCode::Down => {
                    login.next_field();
                    self.modal = Some(Modal::Login(login));
                }
                KeyCode::BackTab | KeyCode::Up => {
                    login.prev_field();
                    self.modal = Some(Modal::Login(login));
                }
                KeyCode::Backspace => {
                    login.backspace();
                    self.modal = Some(Modal::Login(login));
                }
                KeyCode::Char(ch) => {
                    login.insert(ch);
                    self.modal = Some(Modal::Login(login));
                }
                _ => self.modal = Some(Modal::Login(login)),
            },
            Modal::Form(mut form) => match key.code {
                KeyCode::Enter => self.save_form(form),
                KeyCode::Esc => {}
                KeyCode::Tab | KeyCode::Down => {
                    form.next_field();
                    self.modal = Some(Modal::Form(form));
                }
                KeyCode::BackTab | KeyCode::Up => {
                    form.prev_field();
                    self.modal = Some(Modal::Form(form));
                }
                KeyCode::Backspace => {
                    form.backspace();
                    self.modal = Some(Modal::Form(form));
                }
                KeyCode::Char(ch) => {
                    form.insert(ch);
                    self.modal = Some(Modal::Form(form));
                }
                _ => self.modal = Some(Modal::Form(form)),
            },
            // Any key closes the read-only log view.
            Modal::Logs { .. } => {}
        }
    }

    fn apply_filter(&mut self) {
        self.state.filtered = self.filter.apply(&self.state.games);
        self.state.cursor = 0;
        self.state.offset = 0;
    }

    /// Re-read the snapshot after a mutation, keeping the selection on
    /// the same record when it is still visible.
    fn refresh_from_cache(&mut self) {
        let selected = self.state.current_game().map(|game| game.id);
        self.state.games = self.desk.cache().games();
        self.state.filtered = self.filter.apply(&self.state.games);
        match selected.and_then(|id| {
            self.state
                .filtered
                .iter()
                .position(|game| game.id == id)
        }) {
            Some(pos) => self.state.cursor = pos,
            None => self.state.clamp_cursor(),
        }
        self.state.ensure_cursor_visible();
    }

    fn cycle_category(&mut self) {
        let options = category_options(&self.state.games);
        let current = match self.filter.category.as_deref() {
            None => 0,
            Some(selected) => options
                .iter()
                .position(|option| option == selected)
                .unwrap_or(0),
        };
        let next = (current + 1) % options.len();
        self.filter.category = if next == 0 {
            None
        } else {
            Some(options[next].clone())
        };
        self.apply_filter();
    }

    fn require_admin(&mut self) -> bool {
        if self.session.authenticated {
            return true;
        }
        self.state.set_status("관리자 인증이 필요합니다.".to_string());
        self.modal = Some(Modal::Password(TextPrompt::default()));
        false
    }

    fn busy(&mut self) -> bool {
        if self.pending_request {
            self.state.set_status("이전 요청 처리 중입니다.".to_string());
            true
        } else {
            false
        }
    }

    fn start_action(&mut self, action: RentalAction) {
        let Some(game) = self.state.current_game().cloned() else {
            self.state.set_status("선택된 게임이 없습니다.".to_string());
            return;
        };
        if action.requires_admin() && !self.require_admin() {
            return;
        }
        match action {
            RentalAction::PlaceHold => self.start_place_hold(game.id),
            RentalAction::DirectRent => {
                self.modal = Some(Modal::RenterPrompt {
                    game_id: game.id,
                    prompt: TextPrompt::default(),
                });
            }
            RentalAction::CancelHold => {
                let own_hold = matches!(
                    (game.renter(), self.session.user_name()),
                    (Some(holder), Some(user)) if holder == user
                );
                if !self.session.authenticated && !own_hold {
                    self.state
                        .set_status("본인의 찜만 취소할 수 있습니다.".to_string());
                    return;
                }
                self.plan_into_modal(game.id, action, None);
            }
            _ => {
                self.plan_into_modal(game.id, action, None);
            }
        }
    }

    fn start_place_hold(&mut self, game_id: i64) {
        match self.session.user_name().map(str::to_string) {
            Some(name) => {
                self.plan_into_modal(game_id, RentalAction::PlaceHold, Some(name));
            }
            None => {
                self.state
                    .set_status("찜하려면 로그인이 필요합니다.".to_string());
                self.modal = Some(Modal::Login(LoginModal::new(Some(game_id))));
            }
        }
    }

    fn plan_into_modal(
        &mut self,
        game_id: i64,
        action: RentalAction,
        renter: Option<String>,
    ) -> bool {
        let ctx = ActionContext {
            renter_name: renter,
            session: self.session.clone(),
        };
        match plan_action(&self.state.games, game_id, action, &ctx) {
            Ok(plan) => {
                self.modal = Some(Modal::Action(plan));
                true
            }
            Err(err) => {
                self.state.set_status(format!("오류: {err}"));
                false
            }
        }
    }

    fn open_logs(&mut self) {
        let Some(game) = self.state.current_game().cloned() else {
            self.state.set_status("선택된 게임이 없습니다.".to_string());
            return;
        };
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let api = self.api.clone();
        self.state
            .set_status(format!("[{}] 기록 불러오는 중...", game.name));
        spawn(async move {
            let result = api.fetch_game_logs(game.id).await;
            let _ = tx
                .send(AppEvent::LogsLoaded {
                    game_name: game.name,
                    result,
                })
                .await;
        });
    }

    fn open_edit_form(&mut self) {
        if !self.require_admin() {
            return;
        }
        let Some(game) = self.state.current_game().cloned() else {
            self.state.set_status("선택된 게임이 없습니다.".to_string());
            return;
        };
        self.modal = Some(Modal::Form(GameFormModal::for_edit(&game)));
    }

    fn confirm_delete(&mut self) {
        if !self.require_admin() {
            return;
        }
        let Some(game) = self.state.current_game().cloned() else {
            self.state.set_status("선택된 게임이 없습니다.".to_string());
            return;
        };
        self.modal = Some(Modal::DeleteConfirm {
            game_id: game.id,
            name: game.name,
        });
    }

    fn toggle_member(&mut self) {
        if self.session.user.is_some() {
            self.session.user = None;
            self.state.set_status("로그아웃되었습니다.".to_string());
        } else {
            self.modal = Some(Modal::Login(LoginModal::new(None)));
        }
    }

    fn toggle_admin(&mut self) {
        if self.session.authenticated {
            self.session.authenticated = false;
            self.filter.renter.clear();
            self.apply_filter();
            self.state.set_status("관리자 모드를 해제했습니다.".to_string());
        } else {
            self.modal = Some(Modal::Password(TextPrompt::default()));
        }
    }

    fn open_config_screen(&mut self) {
        if !self.require_admin() {
            return;
        }
        self.screen = Screen::Config;
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let api = self.api.clone();
        spawn(async move {
            let result = api.fetch_config().await;
            let _ = tx.send(AppEvent::ConfigLoaded(result)).await;
        });
    }

    fn open_add_game_screen(&mut self) {
        if !self.require_admin() {
            return;
        }
        self.screen = Screen::AddGame;
        self.add_game = AddGameState::default();
        self.state
            .set_status("검색어 입력 후 Enter, Tab: 직접 입력".to_string());
    }

    fn run_product_search(&mut self) {
        let keyword = self.add_game.keyword.trim().to_string();
        if keyword.is_empty() {
            self.state.set_status("검색어를 입력해주세요.".to_string());
            return;
        }
        if self.add_game.searching {
            return;
        }
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let api = self.api.clone();
        self.add_game.searching = true;
        self.state.set_status(format!("'{keyword}' 검색 중..."));
        spawn(async move {
            let result = api.search_products(&keyword).await;
            let _ = tx.send(AppEvent::ProductsFound(result)).await;
        });
    }

    fn submit_request(&mut self, request: StoreRequest) {
        if self.busy() {
            return;
        }
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let desk = self.desk.clone();
        self.pending_request = true;
        self.state.set_status("요청 전송 중...".to_string());
        spawn(async move {
            let result = desk.submit(request).await;
            let _ = tx.send(AppEvent::RequestDone(result)).await;
        });
    }

    fn submit_delete(&mut self, game_id: i64) {
        if self.busy() {
            return;
        }
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let desk = self.desk.clone();
        self.pending_request = true;
        spawn(async move {
            let result = desk.remove(game_id).await;
            let _ = tx.send(AppEvent::DeleteDone(result)).await;
        });
    }

    fn submit_config(&mut self) {
        if self.busy() {
            return;
        }
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let api = self.api.clone();
        let items = self.config.items.clone();
        self.pending_request = true;
        spawn(async move {
            let result = api.save_config(&items).await;
            let _ = tx.send(AppEvent::ConfigSaved(result)).await;
        });
    }

    fn submit_admin_password(&mut self, candidate: String) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let api = self.api.clone();
        self.state.set_status("확인 중...".to_string());
        spawn(async move {
            let result = api.verify_admin_password(candidate.trim()).await;
            let _ = tx.send(AppEvent::AdminChecked(result)).await;
        });
    }

    fn submit_login(&mut self, login: LoginModal) {
        let student_id = login.student_id().trim().to_string();
        let password = login.password().trim().to_string();
        if student_id.is_empty() || password.is_empty() {
            self.state
                .set_status("학번과 비밀번호를 입력해주세요.".to_string());
            self.modal = Some(Modal::Login(login));
            return;
        }
        let name = login.name().trim().to_string();
        let phone = login.phone().trim().to_string();
        let pending_hold = login.pending_hold;
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let api = self.api.clone();
        if name.is_empty() {
            self.state.set_status("로그인 중...".to_string());
            spawn(async move {
                let result = api.login_user(&student_id, &password).await;
                let _ = tx
                    .send(AppEvent::AuthFinished {
                        result,
                        fallback: None,
                        pending_hold,
                    })
                    .await;
            });
        } else {
            if phone.is_empty() {
                self.state
                    .set_status("회원가입에는 전화번호가 필요합니다.".to_string());
                self.modal = Some(Modal::Login(login));
                return;
            }
            let user = UserRecord {
                name,
                student_id,
                phone,
                password,
            };
            let fallback = user.clone();
            self.state.set_status("회원가입 중...".to_string());
            spawn(async move {
                let result = api.signup_user(&user).await;
                let _ = tx
                    .send(AppEvent::AuthFinished {
                        result,
                        fallback: Some(fallback),
                        pending_hold,
                    })
                    .await;
            });
        }
    }

    fn finish_auth(
        &mut self,
        result: Result<AuthResponse, RentalError>,
        fallback: Option<UserRecord>,
        pending_hold: Option<i64>,
    ) {
        match result {
            Ok(response) if response.success => {
                let user = response.user.or(fallback);
                let greeting = user
                    .as_ref()
                    .map(|user| format!("{}님 환영합니다.", user.name))
                    .unwrap_or_else(|| "로그인되었습니다.".to_string());
                self.session.user = user;
                self.state.set_status(greeting);
                if let Some(game_id) = pending_hold {
                    self.start_place_hold(game_id);
                }
            }
            Ok(response) => {
                self.state.set_status(
                    response
                        .message
                        .unwrap_or_else(|| "로그인에 실패했습니다.".to_string()),
                );
                // Password fields are never carried over after a failure.
                self.modal = Some(Modal::Login(LoginModal::new(pending_hold)));
            }
            Err(err) => {
                self.state.set_status(format!("{err}"));
                self.modal = Some(Modal::Login(LoginModal::new(pending_hold)));
            }
        }
    }

    fn spawn_reload(&mut self) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let desk = self.desk.clone();
        self.state.set_status("불러오는 중...".to_string());
        spawn(async move {
            let result = desk.reload().await;
            let _ = tx.send(AppEvent::Reloaded(result)).await;
        });
    }

    fn status_color(&self, status: GameStatus) -> Color {
        match status {
            GameStatus::Available => self.theme.success,
            GameStatus::Dibs => self.theme.warning,
            GameStatus::Rented => self.theme.info,
            GameStatus::Lost => self.theme.muted,
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        match self.screen {
            Screen::Catalog => self.draw_catalog(frame, area),
            Screen::AddGame => self.draw_add_game(frame, area),
            Screen::Config => self.draw_config(frame, area),
        }
        if let Some(modal) = self.modal.take() {
            self.render_modal(frame, &modal);
            self.modal = Some(modal);
        }
    }

    fn draw_catalog(&mut self, frame: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(3),
            ])
            .split(area);
        self.render_filter_bar(frame, rows[0]);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(rows[1]);
        self.render_game_list(frame, columns[0]);
        self.render_game_info(frame, columns[1]);
        self.render_status(frame, rows[2]);
    }

    fn render_filter_bar(&self, frame: &mut Frame, area: Rect) {
        let mut title = "shelfside".to_string();
        if self.session.authenticated {
            title.push_str(" [관리자]");
        }
        if let Some(name) = self.session.user_name() {
            title.push_str(&format!(" [{name}]"));
        }

        let search_display = if self.mode == Mode::Search {
            format!("{}▏", self.debouncer.staged())
        } else if self.debouncer.staged().is_empty() {
            "-".to_string()
        } else {
            self.debouncer.staged().to_string()
        };
        let mut spans = vec![
            Span::styled("검색 ", Style::default().fg(self.theme.muted)),
            Span::raw(search_display),
            Span::styled("  분류 ", Style::default().fg(self.theme.muted)),
            Span::raw(
                self.filter
                    .category
                    .as_deref()
                    .unwrap_or(ALL_CATEGORIES)
                    .to_string(),
            ),
            Span::styled("  난이도 ", Style::default().fg(self.theme.muted)),
            Span::raw(self.filter.difficulty.label()),
            Span::styled("  인원 ", Style::default().fg(self.theme.muted)),
            Span::raw(self.filter.players.label()),
            Span::styled("  대여가능만 ", Style::default().fg(self.theme.muted)),
            Span::raw(if self.filter.available_only { "켬" } else { "끔" }),
        ];
        if self.session.authenticated {
            spans.push(Span::styled("  대여자 ", Style::default().fg(self.theme.muted)));
            let renter_display = if self.mode == Mode::RenterFilter {
                format!("{}▏", self.filter.renter)
            } else if self.filter.renter.is_empty() {
                "-".to_string()
            } else {
                self.filter.renter.clone()
            };
            spans.push(Span::raw(renter_display));
        }

        let paragraph = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(paragraph, area);
    }

    fn render_game_list(&mut self, frame: &mut Frame, area: Rect) {
        self.state.list_height = area.height.saturating_sub(2) as usize;
        self.state.clamp_cursor();
        self.state.ensure_cursor_visible();

        let mut list_state = ListState::default();
        let height = area.height.saturating_sub(2) as usize;
        let games = self.state.visible_games(height);
        if !games.is_empty() {
            let selected = self
                .state
                .cursor
                .saturating_sub(self.state.offset)
                .min(games.len().saturating_sub(1));
            list_state.select(Some(selected));
        }
        let items: Vec<ListItem> = games
            .iter()
            .enumerate()
            .map(|(idx, game)| {
                let global_index = self.state.offset + idx;
                let is_selected = self.state.cursor == global_index;
                let marker = if is_selected {
                    Span::styled(
                        "▶ ",
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw("  ")
                };
                let status = Span::styled(
                    format!("[{}] ", game.status.label()),
                    Style::default().fg(self.status_color(game.status)),
                );
                let name = Span::styled(
                    game.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                );
                let mut line = vec![marker, status, name];
                if let Some(renter) = game.renter() {
                    line.push(Span::styled(
                        format!(" · {renter}"),
                        Style::default().fg(self.theme.muted),
                    ));
                }
                ListItem::new(Line::from(line))
            })
            .collect();

        let title = format!("게임 ({})", self.state.filtered.len());
        let block = Block::default().borders(Borders::ALL).title(title);
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_game_info(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("상세 정보");
        if let Some(game) = self.state.current_game() {
            let mut lines = vec![Line::from(Span::styled(
                game.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ))];
            lines.push(Line::from(format!("분류: {}", game.category())));
            lines.push(Line::from(vec![
                Span::raw("상태: "),
                Span::styled(
                    game.status.label(),
                    Style::default().fg(self.status_color(game.status)),
                ),
            ]));
            if let Some(renter) = game.renter() {
                lines.push(Line::from(format!("대여자: {renter}")));
            }
            if let Some(score) = game.difficulty {
                lines.push(Line::from(format!("난이도: {score:.1}")));
            }
            if let Some(players) = &game.players {
                lines.push(Line::from(format!("인원: {players}")));
            }
            if !game.genre.is_empty() {
                lines.push(Line::from(format!("장르: {}", game.genre)));
            }
            if !game.tags.is_empty() {
                lines.push(Line::from(format!("태그: {}", game.tags)));
            }
            if !game.location.is_empty() {
                lines.push(Line::from(format!("위치: {}", game.location)));
            }
            if !game.image.is_empty() {
                lines.push(Line::from(Span::styled(
                    game.image.clone(),
                    Style::default().fg(self.theme.muted),
                )));
            }
            let actions: Vec<&str> = legal_actions(game.status)
                .iter()
                .map(|action| action_title(*action))
                .collect();
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("가능한 작업: {}", actions.join(", ")),
                Style::default().fg(self.theme.muted),
            )));
            let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
        } else {
            let paragraph = Paragraph::new("표시할 게임이 없습니다.").block(block);
            frame.render_widget(paragraph, area);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("상태");
        let hints = if self.session.authenticated {
            "q 종료  / 검색  n 대여자  c d p a 필터  x 초기화  v 수령  b 반납  w 현장대여  o 분실  f 회수  e 수정  D 삭제  + 등록  t 설정  A 관리자"
        } else {
            "q 종료  / 검색  c 분류  d 난이도  p 인원  a 대여가능  x 초기화  h 찜  u 찜취소  l 기록  m 로그인  A 관리자"
        };
        let paragraph = Paragraph::new(vec![
            Line::from(self.state.status.clone()),
            Line::from(Span::styled(hints, Style::default().fg(self.theme.muted))),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_add_game(&mut self, frame: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(3),
            ])
            .split(area);

        let input_display = if self.add_game.focus_results {
            self.add_game.keyword.clone()
        } else {
            format!("{}▏", self.add_game.keyword)
        };
        let input = Paragraph::new(input_display)
            .block(Block::default().borders(Borders::ALL).title("게임 등록 - 검색어"));
        frame.render_widget(input, rows[0]);

        let mut list_state = ListState::default();
        if self.add_game.focus_results && !self.add_game.results.is_empty() {
            list_state.select(Some(self.add_game.cursor));
        }
        let items: Vec<ListItem> = self
            .add_game
            .results
            .iter()
            .map(|hit| ListItem::new(Line::from(hit.title.clone())))
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("검색 결과"))
            .highlight_style(
                Style::default()
                    .bg(self.theme.selection_bg)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_stateful_widget(list, rows[1], &mut list_state);

        let paragraph = Paragraph::new(vec![
            Line::from(self.state.status.clone()),
            Line::from(Span::styled(
                "Enter 검색/선택  ↑↓ 이동  Tab 직접 입력  Esc 뒤로",
                Style::default().fg(self.theme.muted),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title("상태"));
        frame.render_widget(paragraph, rows[2]);
    }

    fn draw_config(&mut self, frame: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .split(area);

        let field_names = ["라벨", "값", "색상"];
        let mut list_state = ListState::default();
        if !self.config.items.is_empty() {
            list_state.select(Some(self.config.cursor));
        }
        let items: Vec<ListItem> = self
            .config
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let parts = [&item.label, &item.value, &item.color];
                let mut spans = Vec::new();
                for (field, part) in parts.iter().enumerate() {
                    if field > 0 {
                        spans.push(Span::styled(" | ", Style::default().fg(self.theme.muted)));
                    }
                    let active = idx == self.config.cursor && field == self.config.field;
                    let style = if active {
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    spans.push(Span::styled(format!("{}: {}", field_names[field], part), style));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("추천 버튼 설정"))
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, rows[0], &mut list_state);

        let paragraph = Paragraph::new(vec![
            Line::from(self.state.status.clone()),
            Line::from(Span::styled(
                "↑↓ 항목  Tab 필드  Ctrl+S 저장  Esc 뒤로",
                Style::default().fg(self.theme.muted),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title("상태"));
        frame.render_widget(paragraph, rows[1]);
    }

    fn render_modal(&self, frame: &mut Frame, modal: &Modal) {
        match modal {
            Modal::Action(plan) => self.render_action_modal(frame, plan),
            Modal::DeleteConfirm { name, .. } => self.render_confirm_modal(
                frame,
                "삭제",
                &format!("[{name}] 정말 삭제합니까?"),
                self.theme.danger,
            ),
            Modal::ConfigSaveConfirm => self.render_confirm_modal(
                frame,
                "설정 저장",
                "추천 버튼 설정을 저장하시겠습니까?",
                self.theme.accent,
            ),
            Modal::RenterPrompt { prompt, .. } => {
                self.render_input_modal(frame, "현장 대여", "대여자 이름", &prompt.input, false)
            }
            Modal::Password(prompt) => {
                self.render_input_modal(frame, "관리자 인증", "암호", &prompt.input, true)
            }
            Modal::Login(login) => self.render_login_modal(frame, login),
            Modal::Form(form) => self.render_form_modal(frame, form),
            Modal::Logs { game_name, entries } => {
                self.render_logs_modal(frame, game_name, entries)
            }
        }
    }

    fn render_action_modal(&self, frame: &mut Frame, plan: &ActionPlan) {
        let area = modal_area(frame.size(), 60, 8);
        frame.render_widget(Clear, area);

        let helper = if plan.is_cascade() {
            Line::from(vec![
                Span::styled("Y", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" 전체  "),
                Span::styled("N", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" 이 게임만  "),
                Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" 취소"),
            ])
        } else {
            Line::from(vec![
                Span::styled("Y", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" 확인  "),
                Span::styled("N/Esc", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" 취소"),
            ])
        };
        let paragraph = Paragraph::new(vec![
            Line::from(plan.prompt.message().to_string()),
            Line::from(""),
            helper,
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(action_title(plan.action)),
        )
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_confirm_modal(&self, frame: &mut Frame, title: &str, message: &str, color: Color) {
        let area = modal_area(frame.size(), 56, 7);
        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(message.to_string(), Style::default().fg(color))),
            Line::from(""),
            Line::from(vec![
                Span::styled("Y", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" 확인  "),
                Span::styled("N/Esc", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" 취소"),
            ]),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_input_modal(
        &self,
        frame: &mut Frame,
        title: &str,
        label: &str,
        input: &str,
        mask: bool,
    ) {
        let area = modal_area(frame.size(), 50, 7);
        frame.render_widget(Clear, area);
        let shown = if mask {
            "*".repeat(input.chars().count())
        } else {
            input.to_string()
        };
        let paragraph = Paragraph::new(vec![
            Line::from(format!("{label}:")),
            Line::from(vec![
                Span::styled("> ", Style::default().fg(self.theme.accent)),
                Span::raw(format!("{shown}▏")),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" 확인  "),
                Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" 취소"),
            ]),
        ])
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_login_modal(&self, frame: &mut Frame, login: &LoginModal) {
        let area = modal_area(frame.size(), 54, 10);
        frame.render_widget(Clear, area);
        let mut lines = Vec::new();
        for (idx, label) in LOGIN_LABELS.iter().enumerate() {
            let value = if idx == 3 {
                "*".repeat(login.fields[idx].chars().count())
            } else {
                login.fields[idx].clone()
            };
            let style = if idx == login.field {
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let marker = if idx == login.field { "▏" } else { "" };
            lines.push(Line::from(Span::styled(
                format!("{label}: {value}{marker}"),
                style,
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "이름을 채우면 회원가입, 비우면 로그인",
            Style::default().fg(self.theme.muted),
        )));
        lines.push(Line::from(Span::styled(
            "Enter 제출  Tab 다음 필드  Esc 취소",
            Style::default().fg(self.theme.muted),
        )));
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("로그인 / 회원가입"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_form_modal(&self, frame: &mut Frame, form: &GameFormModal) {
        let area = modal_area(frame.size(), 64, 13);
        frame.render_widget(Clear, area);
        let title = if form.game_id.is_some() {
            "게임 정보 수정"
        } else {
            "게임 등록"
        };
        let mut lines = Vec::new();
        for (idx, label) in FORM_LABELS.iter().enumerate() {
            let style = if idx == form.field {
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let marker = if idx == form.field { "▏" } else { "" };
            lines.push(Line::from(Span::styled(
                format!("{label}: {}{marker}", form.values[idx]),
                style,
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter 저장  Tab/↑↓ 필드 이동  Esc 취소",
            Style::default().fg(self.theme.muted),
        )));
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_logs_modal(&self, frame: &mut Frame, game_name: &str, entries: &[RentalLogEntry]) {
        let height = cmp::min(entries.len() as u16 + 4, 18).max(6);
        let area = modal_area(frame.size(), 60, height);
        frame.render_widget(Clear, area);
        let mut lines: Vec<Line> = entries
            .iter()
            .map(|entry| {
                let kind = match entry.kind {
                    LogKind::Rent => "대여",
                    LogKind::Return => "반납",
                    LogKind::Other => "기타",
                };
                Line::from(format!(
                    "{}  {}  {}",
                    entry.date.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    kind,
                    entry.value
                ))
            })
            .collect();
        if lines.is_empty() {
            lines.push(Line::from("기록이 없습니다."));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "아무 키나 눌러 닫기",
            Style::default().fg(self.theme.muted),
        )));
        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("[{game_name}] 대여 기록")),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn save_form(&mut self, form: GameFormModal) {
        if self.pending_request {
            self.state.set_status("이전 요청 처리 중입니다.".to_string());
            self.modal = Some(Modal::Form(form));
            return;
        }
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        match form.game_id {
            Some(game_id) => {
                let edit = form.to_edit();
                if edit.name.is_empty() {
                    self.state.set_status("이름은 필수입니다.".to_string());
                    self.modal = Some(Modal::Form(form));
                    return;
                }
                let desk = self.desk.clone();
                self.pending_request = true;
                self.state.set_status("저장 중...".to_string());
                spawn(async move {
                    let result = desk.apply_edit(game_id, &edit).await;
                    let _ = tx.send(AppEvent::EditDone(result)).await;
                });
            }
            None => {
                let game = form.to_new_game();
                if game.name.is_empty() {
                    self.state.set_status("이름은 필수입니다.".to_string());
                    self.modal = Some(Modal::Form(form));
                    return;
                }
                let api = self.api.clone();
                self.pending_request = true;
                self.state.set_status("등록 중...".to_string());
                spawn(async move {
                    let result = api.add_game(&game).await;
                    let _ = tx.send(AppEvent::GameAdded(result)).await;
                });
            }
        }
    }
}

fn action_title(action: RentalAction) -> &'static str {
    match action {
        RentalAction::PlaceHold => "찜",
        RentalAction::ConfirmPickup => "수령 확인",
        RentalAction::CancelHold => "찜 취소",
        RentalAction::Return => "반납",
        RentalAction::MarkLost => "분실 처리",
        RentalAction::MarkFound => "분실 회수",
        RentalAction::DirectRent => "현장 대여",
    }
}

fn modal_area(frame_area: Rect, width: u16, height: u16) -> Rect {
    let width = cmp::min(width, frame_area.width.saturating_sub(2)).max(20);
    let height = cmp::min(height, frame_area.height.saturating_sub(2)).max(5);
    let x = frame_area.x + (frame_area.width.saturating_sub(width)) / 2;
    let y = frame_area.y + (frame_area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(id: i64, status: GameStatus) -> GameRecord {
        GameRecord {
            id,
            name: format!("게임{id}"),
            category: String::new(),
            status,
            renter: None,
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
    fn cursor_stays_within_filtered_list() {
        let mut state = UiState::default();
        state.filtered = vec![game(1, GameStatus::Available), game(2, GameStatus::Rented)];
        state.list_height = 10;
        state.move_cursor(5);
        assert_eq!(state.cursor, 1);
        state.move_cursor(-5);
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn clamp_after_shrinking_snapshot() {
        let mut state = UiState::default();
        state.filtered = vec![
            game(1, GameStatus::Available),
            game(2, GameStatus::Available),
            game(3, GameStatus::Available),
        ];
        state.cursor = 2;
        state.filtered.truncate(1);
        state.clamp_cursor();
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn form_round_trips_difficulty_text() {
        let mut record = game(7, GameStatus::Available);
        record.difficulty = Some(2.5);
        record.players = Some("2~4인".to_string());
        let form = GameFormModal::for_edit(&record);
        let edit = form.to_edit();
        assert_eq!(edit.difficulty, Some(2.5));
        assert_eq!(edit.players, "2~4인");

        let mut blank = GameFormModal::blank();
        blank.values[0] = "신작".to_string();
        blank.values[2] = "없음".to_string();
        let edit = blank.to_edit();
        assert_eq!(edit.difficulty, None);
        assert_eq!(edit.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn login_modal_field_cycling_wraps() {
        let mut login = LoginModal::new(None);
        assert_eq!(login.field, 0);
        login.prev_field();
        assert_eq!(login.field, 3);
        login.next_field();
        assert_eq!(login.field, 0);
        login.insert('김');
        assert_eq!(login.name(), "김");
    }
}
