#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table, TableState, Tabs, Wrap,
};
use tokio::sync::mpsc;

use crate::board::{
    BoardController, BoardEvent, Bounds, DropOutcome, DropZone, Gesture, Point, StatusBuckets,
    StatusChangeResult, StatusDispatcher, snapshot_from, spawn_status_worker, with_status,
};
use crate::config;
use crate::task::filter::TaskFilters;
use crate::task::model::{self, Project, Task, TaskStatus, TeamMember};
use crate::task::stats::DashboardStats;
use crate::task::storage::{ProjectStorage, TaskStorage};
use crate::task::team::team_members;
use crate::tui;
use crate::tui::widgets::{
    TextInput, Toast, centered_rect, clamp_rect, cursor_x_for_text, priority_style,
    search_popup_rect, status_icon, status_style, truncate_str,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TabId {
    Board,
    Dashboard,
    Team,
    Help,
}

impl TabId {
    const ALL: [TabId; 4] = [TabId::Board, TabId::Dashboard, TabId::Team, TabId::Help];

    fn title(self) -> &'static str {
        match self {
            TabId::Board => "Board",
            TabId::Dashboard => "Dashboard",
            TabId::Team => "Team",
            TabId::Help => "Help",
        }
    }

    fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Searching,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CardHit {
    task_id: String,
    status: TaskStatus,
    row: usize,
    rect: Rect,
}

/// Screen geometry of the last drawn board, used to hit-test mouse events.
#[derive(Debug, Clone, Default)]
struct BoardLayout {
    columns: Vec<(TaskStatus, Rect)>,
    cards: Vec<CardHit>,
}

impl BoardLayout {
    fn drop_zones(&self) -> Vec<DropZone> {
        self.columns
            .iter()
            .map(|(status, rect)| DropZone::new(status.as_str(), Bounds::from(*rect)))
            .collect()
    }

    fn card_at(&self, at: Point) -> Option<&CardHit> {
        self.cards
            .iter()
            .find(|c| Bounds::from(c.rect).contains(at))
    }

    fn card_rect(&self, task_id: &str) -> Option<Rect> {
        self.cards
            .iter()
            .find(|c| c.task_id == task_id)
            .map(|c| c.rect)
    }

    fn column_rect(&self, status: TaskStatus) -> Option<Rect> {
        self.columns
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, r)| *r)
    }
}

#[derive(Debug)]
struct AppState {
    cfg: config::Config,

    tab: TabId,
    mode: Mode,

    tasks_store: TaskStorage,
    projects_store: ProjectStorage,
    board: BoardController<StatusDispatcher>,
    results: mpsc::UnboundedReceiver<StatusChangeResult>,
    in_flight: usize,

    all_tasks: Vec<Task>,
    projects: Vec<Project>,
    stats: DashboardStats,
    team: Vec<TeamMember>,
    team_state: TableState,

    search: String,
    search_input: TextInput,
    /// Board limited to one project (by id), cycled with `p`.
    project_filter: Option<String>,

    cursor: (TaskStatus, usize),
    offsets: [usize; 3],
    layout: BoardLayout,
    keyboard_drag: bool,
    detail: Option<Arc<Task>>,

    needs_refresh: bool,
    last_refresh: Instant,

    toast: Option<Toast>,
    last_error: Option<String>,
    should_quit: bool,
}

impl AppState {
    fn new(
        cfg: config::Config,
        tasks_store: TaskStorage,
        projects_store: ProjectStorage,
        dispatcher: StatusDispatcher,
        results: mpsc::UnboundedReceiver<StatusChangeResult>,
    ) -> Self {
        Self {
            board: BoardController::new(dispatcher, cfg.board.drag_config()),
            cfg,
            tab: TabId::Board,
            mode: Mode::Normal,
            tasks_store,
            projects_store,
            results,
            in_flight: 0,
            all_tasks: Vec::new(),
            projects: Vec::new(),
            stats: DashboardStats::default(),
            team: Vec::new(),
            team_state: TableState::default(),
            search: String::new(),
            search_input: TextInput::new(""),
            project_filter: None,
            cursor: (TaskStatus::Todo, 0),
            offsets: [0; 3],
            layout: BoardLayout::default(),
            keyboard_drag: false,
            detail: None,
            needs_refresh: true,
            last_refresh: Instant::now(),
            toast: None,
            last_error: None,
            should_quit: false,
        }
    }

    /// Drops any press or drag in progress, e.g. when the release was never delivered.
    fn cancel_gesture(&mut self) {
        if let Some(ev) = self.board.drag_cancel() {
            handle_board_event(self, ev);
        }
        self.keyboard_drag = false;
    }

    fn selected_task(&self) -> Option<&Arc<Task>> {
        let (status, row) = self.cursor;
        self.board.bucket(status).get(row)
    }

    fn clamp_cursor(&mut self) {
        let (status, row) = self.cursor;
        let len = self.board.bucket(status).len();
        self.cursor.1 = row.min(len.saturating_sub(1));
    }

    fn move_row(&mut self, delta: i64) {
        let (status, row) = self.cursor;
        let len = self.board.bucket(status).len();
        if len == 0 {
            self.cursor.1 = 0;
            return;
        }
        let max = i64::try_from(len - 1).unwrap_or(i64::MAX);
        let cur = i64::try_from(row).unwrap_or(0);
        let next = (cur + delta).clamp(0, max);
        self.cursor.1 = usize::try_from(next).unwrap_or(0);
    }

    fn move_column(&mut self, delta: i64) {
        self.cursor.0 = step_column(self.cursor.0, delta);
        self.clamp_cursor();
    }

    fn focus_task(&mut self, task_id: &str) {
        if let Some((status, row)) = self.board.buckets().locate(task_id) {
            self.cursor = (status, row);
        }
    }

    fn select_tab(&mut self, tab: TabId) {
        if tab != self.tab {
            self.cancel_gesture();
        }
        self.tab = tab;
    }

    fn project_name(&self, id: &str) -> String {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .map_or_else(|| id.to_owned(), |p| p.name.clone())
    }

    fn recompute_derived(&mut self) {
        self.stats = DashboardStats::collect(&self.all_tasks, &self.projects, model::today());
        self.team = team_members(&self.all_tasks);
        let len = self.team.len();
        let sel = self.team_state.selected().unwrap_or(0);
        self.team_state
            .select(Some(sel.min(len.saturating_sub(1))));
    }
}

fn step_column(status: TaskStatus, delta: i64) -> TaskStatus {
    let len = i64::try_from(TaskStatus::ALL.len()).unwrap_or(3);
    let cur = i64::try_from(status.index()).unwrap_or(0);
    let next = (cur + delta).clamp(0, len - 1);
    TaskStatus::ALL[usize::try_from(next).unwrap_or(0)]
}

/// All projects, then each project in turn, then back to all.
fn next_project_filter(current: Option<&str>, projects: &[Project]) -> Option<String> {
    let next = match current {
        None => projects.first(),
        Some(id) => match projects.iter().position(|p| p.id == id) {
            Some(i) => projects.get(i + 1),
            None => projects.first(),
        },
    };
    next.map(|p| p.id.clone())
}

pub async fn run(cfg: config::Config) -> anyhow::Result<()> {
    let tasks_store = TaskStorage::new(config::expand_path(&cfg.store.tasks_dir)?);
    let projects_store = ProjectStorage::new(config::expand_path(&cfg.store.projects_dir)?);
    tasks_store.ensure_dir()?;

    let (dispatcher, requests) = StatusDispatcher::channel();
    let (results_tx, results) = mpsc::unbounded_channel();
    let worker = spawn_status_worker(tasks_store.clone(), requests, results_tx);

    let terminal = tui::init_terminal()?;
    let mut guard = TerminalGuard::new(terminal);

    let mut app = AppState::new(cfg, tasks_store, projects_store, dispatcher, results);

    loop {
        if let Some(toast) = &app.toast
            && Instant::now() >= toast.until
        {
            app.toast = None;
        }

        while let Ok(result) = app.results.try_recv() {
            handle_status_result(&mut app, result);
        }

        let interval = Duration::from_millis(app.cfg.ui.refresh_interval_ms.max(250));
        // Hold periodic re-fetches while changes are in flight so the optimistic patch sticks.
        if app.in_flight == 0 && app.last_refresh.elapsed() >= interval {
            app.needs_refresh = true;
        }
        if app.needs_refresh {
            if let Err(e) = refresh_data(&mut app) {
                app.last_error = Some(format!("{e:#}"));
            }
            app.needs_refresh = false;
            app.last_refresh = Instant::now();
        }

        {
            let Some(terminal) = guard.terminal.as_mut() else {
                anyhow::bail!("terminal unavailable");
            };
            terminal.draw(|f| draw(f, &mut app))?;
        }

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => handle_key(key, &mut app),
                Event::Mouse(mouse) => handle_mouse(mouse, &mut app),
                _ => {}
            }
        }
    }

    // Closing the request side lets the worker finish queued writes and exit.
    let AppState { board, results, .. } = app;
    drop(board);
    if tokio::time::timeout(Duration::from_secs(2), worker)
        .await
        .is_err()
    {
        tracing::warn!("status worker did not finish in time");
    }
    drop(results);
    drop(guard);
    Ok(())
}

fn refresh_data(app: &mut AppState) -> anyhow::Result<()> {
    let tasks = app.tasks_store.list()?;
    app.projects = app.projects_store.list()?;
    let changed = tasks != app.all_tasks;
    app.all_tasks = tasks;
    app.recompute_derived();
    if changed {
        rebuild_board(app);
    }
    Ok(())
}

/// Supplies a fresh snapshot of the visible tasks to the board.
fn rebuild_board(app: &mut AppState) {
    let filters = TaskFilters {
        project_id: app.project_filter.clone(),
        search: Some(app.search.clone()),
        ..TaskFilters::default()
    };
    let visible = filters.apply(app.all_tasks.clone());
    app.board.set_tasks(snapshot_from(visible));
    app.clamp_cursor();
}

fn handle_status_result(app: &mut AppState, result: StatusChangeResult) {
    app.in_flight = app.in_flight.saturating_sub(1);
    match result.outcome {
        Ok(task) => {
            app.toast = Some(Toast::info(format!(
                "{} → {}",
                truncate_str(&task.title, 40),
                task.status.label()
            )));
        }
        Err(e) => {
            app.last_error = Some(format!(
                "could not move {} to {}: {e}",
                result.change.task_id,
                result.change.status.label()
            ));
        }
    }
    // The store is the source of truth once every queued write has landed; a failed move
    // reverts then. Earlier re-fetches would undo patches whose writes are still queued.
    if app.in_flight == 0 {
        app.needs_refresh = true;
    }
}

fn handle_board_event(app: &mut AppState, event: BoardEvent) {
    match event {
        BoardEvent::TaskActivated(task) => {
            app.focus_task(&task.id);
            app.detail = Some(task);
        }
        BoardEvent::DragStarted(task) => {
            app.keyboard_drag = false;
            app.focus_task(&task.id);
        }
        BoardEvent::Dropped(outcome) => apply_drop(app, outcome),
        BoardEvent::Cancelled => app.keyboard_drag = false,
    }
}

fn apply_drop(app: &mut AppState, outcome: DropOutcome) {
    app.keyboard_drag = false;
    match outcome {
        DropOutcome::Moved { task_id, from, to } => {
            app.in_flight += 1;
            let patched = with_status(app.board.snapshot(), &task_id, to);
            app.board.set_tasks(patched);
            if let Some(t) = app.all_tasks.iter_mut().find(|t| t.id == task_id) {
                t.status = to;
            }
            app.recompute_derived();
            app.focus_task(&task_id);
            app.toast = Some(Toast::info(format!(
                "Moving {task_id}: {} → {}",
                from.label(),
                to.label()
            )));
        }
        DropOutcome::StaleTask => {
            app.toast = Some(Toast::info("Task is no longer on the board"));
        }
        DropOutcome::NoTarget | DropOutcome::SameStatus => {}
    }
}

fn handle_mouse(mouse: MouseEvent, app: &mut AppState) {
    if app.tab != TabId::Board || app.mode != Mode::Normal {
        return;
    }
    let at = Point::new(i32::from(mouse.column), i32::from(mouse.row));
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if app.detail.is_some() {
                app.detail = None;
                return;
            }
            if app.keyboard_drag {
                return;
            }
            let Some(hit) = app.layout.card_at(at).cloned() else {
                return;
            };
            // A new press means the previous release was lost.
            if !matches!(app.board.gesture(), Gesture::Idle) {
                app.cancel_gesture();
            }
            app.cursor = (hit.status, hit.row);
            app.board
                .pointer_down(&hit.task_id, at, Bounds::from(hit.rect));
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if app.keyboard_drag {
                return;
            }
            let zones = app.layout.drop_zones();
            if let Some(ev) = app.board.pointer_move(at, &zones) {
                handle_board_event(app, ev);
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            if app.keyboard_drag {
                return;
            }
            let zones = app.layout.drop_zones();
            if let Some(ev) = app.board.pointer_up(at, &zones) {
                handle_board_event(app, ev);
            }
        }
        MouseEventKind::ScrollDown if !app.board.is_dragging() => app.move_row(1),
        MouseEventKind::ScrollUp if !app.board.is_dragging() => app.move_row(-1),
        _ => {}
    }
}

fn handle_key(key: KeyEvent, app: &mut AppState) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
        app.should_quit = true;
        return;
    }

    app.last_error = None;

    if app.mode == Mode::Searching {
        handle_search_key(key, app);
        return;
    }

    if app.detail.is_some() {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q' | ' ')
        ) {
            app.detail = None;
        }
        return;
    }

    if app.board.is_dragging() {
        handle_drag_key(key, app);
        return;
    }

    if matches!(key.code, KeyCode::Esc) && !matches!(app.board.gesture(), Gesture::Idle) {
        app.cancel_gesture();
        return;
    }

    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('1') => {
            app.select_tab(TabId::Board);
            return;
        }
        KeyCode::Char('2') => {
            app.select_tab(TabId::Dashboard);
            return;
        }
        KeyCode::Char('3') => {
            app.select_tab(TabId::Team);
            return;
        }
        KeyCode::Char('4') => {
            app.select_tab(TabId::Help);
            return;
        }
        KeyCode::Tab => {
            app.select_tab(app.tab.next());
            return;
        }
        KeyCode::BackTab => {
            app.select_tab(app.tab.prev());
            return;
        }
        KeyCode::Char('r') => {
            app.needs_refresh = true;
            app.toast = Some(Toast::info("Refreshing…"));
            return;
        }
        _ => {}
    }

    match app.tab {
        TabId::Board => handle_board_key(key, app),
        TabId::Team => handle_team_key(key, app),
        TabId::Dashboard | TabId::Help => {}
    }
}

fn handle_board_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.move_row(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_row(-1),
        KeyCode::Char('h') | KeyCode::Left => app.move_column(-1),
        KeyCode::Char('l') | KeyCode::Right => app.move_column(1),
        KeyCode::Char('g') | KeyCode::Home => app.cursor.1 = 0,
        KeyCode::Char('G') | KeyCode::End => {
            let len = app.board.bucket(app.cursor.0).len();
            app.cursor.1 = len.saturating_sub(1);
        }
        KeyCode::Enter => {
            app.cancel_gesture();
            app.detail = app.selected_task().cloned();
        }
        KeyCode::Char(' ') => pick_up_selected(app),
        KeyCode::Char('/') => {
            app.cancel_gesture();
            app.search_input = TextInput::new(app.search.clone());
            app.mode = Mode::Searching;
        }
        KeyCode::Char('p') => {
            app.project_filter = next_project_filter(app.project_filter.as_deref(), &app.projects);
            let label = app
                .project_filter
                .as_deref()
                .map_or_else(|| "all projects".to_owned(), |id| app.project_name(id));
            app.toast = Some(Toast::info(format!("Board: {label}")));
            rebuild_board(app);
        }
        KeyCode::Esc if !app.search.is_empty() => {
            app.search.clear();
            rebuild_board(app);
        }
        _ => {}
    }
}

fn pick_up_selected(app: &mut AppState) {
    let Some(task) = app.selected_task().cloned() else {
        return;
    };
    let Some(rect) = app.layout.card_rect(&task.id) else {
        return;
    };
    // A pending mouse press never became a drag; the keyboard takes over.
    app.cancel_gesture();
    let at = Point::new(i32::from(rect.x), i32::from(rect.y));
    if app.board.drag_start(&task.id, at, Bounds::from(rect)) {
        app.board.drag_over(Some(task.status.as_str()));
        app.keyboard_drag = true;
    }
}

fn handle_drag_key(key: KeyEvent, app: &mut AppState) {
    if matches!(key.code, KeyCode::Esc) {
        if let Some(ev) = app.board.drag_cancel() {
            handle_board_event(app, ev);
        }
        return;
    }
    if !app.keyboard_drag {
        return;
    }
    let hovered = app
        .board
        .session()
        .and_then(|s| s.hover())
        .and_then(TaskStatus::from_column_id);
    match key.code {
        KeyCode::Char('h') | KeyCode::Left => {
            let next = hovered.map_or(TaskStatus::Todo, |s| step_column(s, -1));
            app.board.drag_over(Some(next.as_str()));
        }
        KeyCode::Char('l') | KeyCode::Right => {
            let next = hovered.map_or(TaskStatus::Completed, |s| step_column(s, 1));
            app.board.drag_over(Some(next.as_str()));
        }
        KeyCode::Char(' ') | KeyCode::Enter => {
            let outcome = app.board.drag_end_hovered();
            apply_drop(app, outcome);
        }
        _ => {}
    }
}

fn handle_team_key(key: KeyEvent, app: &mut AppState) {
    let len = app.team.len();
    if len == 0 {
        return;
    }
    let sel = app.team_state.selected().unwrap_or(0);
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.team_state.select(Some((sel + 1).min(len - 1))),
        KeyCode::Char('k') | KeyCode::Up => app.team_state.select(Some(sel.saturating_sub(1))),
        _ => {}
    }
}

fn handle_search_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Esc => app.mode = Mode::Normal,
        KeyCode::Enter => {
            app.search = app.search_input.as_str().trim().to_owned();
            app.mode = Mode::Normal;
            rebuild_board(app);
        }
        _ => handle_text_input_key(key, &mut app.search_input),
    }
}

fn handle_text_input_key(key: KeyEvent, input: &mut TextInput) {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        KeyCode::Char(c) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT)
            {
                input.insert_char(c);
            }
        }
        _ => {}
    }
}

fn draw(f: &mut Frame<'_>, app: &mut AppState) {
    let area = f.area();

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    draw_tabs(f, root[0], app);
    match app.tab {
        TabId::Board => draw_board_tab(f, root[1], app),
        TabId::Dashboard => draw_dashboard_tab(f, root[1], app),
        TabId::Team => draw_team_tab(f, root[1], app),
        TabId::Help => draw_help_tab(f, root[1]),
    }
    draw_footer(f, root[2], app);

    if let Some(task) = &app.detail {
        draw_detail(f, task, &app.projects);
    }
    if app.mode == Mode::Searching {
        draw_search_popup(f, app);
    }
}

fn draw_tabs(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    let titles: Vec<Line> = TabId::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let idx = i + 1;
            let title = match t {
                TabId::Board => format!("{} [{idx}] ({})", t.title(), app.board.snapshot().len()),
                TabId::Team => format!("{} [{idx}] ({})", t.title(), app.team.len()),
                _ => format!("{} [{idx}]", t.title()),
            };
            Line::from(title)
        })
        .collect();

    let selected = TabId::ALL.iter().position(|t| *t == app.tab).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" | ");
    f.render_widget(tabs, chunks[0]);

    let dir = config::tilde_path(&app.tasks_store.dir().to_string_lossy());
    let path = Paragraph::new(Line::from(dir))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Right);
    f.render_widget(path, chunks[1]);
}

/// Places columns and the visible cards of each column inside `area`.
///
/// `offsets` holds each column's scroll position and is adjusted so the cursor stays visible.
fn layout_board(
    area: Rect,
    buckets: &StatusBuckets,
    card_height: u16,
    offsets: &mut [usize; 3],
    cursor: (TaskStatus, usize),
) -> BoardLayout {
    let card_height = card_height.max(3);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let mut layout = BoardLayout::default();
    for (status, col) in TaskStatus::ALL.into_iter().zip(cols.iter().copied()) {
        layout.columns.push((status, col));

        let inner = Block::default().borders(Borders::ALL).inner(col);
        let visible = usize::from(inner.height / card_height);
        let tasks = buckets.get(status);
        let offset = &mut offsets[status.index()];
        *offset = (*offset).min(tasks.len().saturating_sub(visible.max(1)));
        if cursor.0 == status && visible > 0 {
            if cursor.1 < *offset {
                *offset = cursor.1;
            } else if cursor.1 >= *offset + visible {
                *offset = cursor.1 + 1 - visible;
            }
        }

        let mut y = inner.y;
        for (row, task) in tasks.iter().enumerate().skip(*offset).take(visible) {
            layout.cards.push(CardHit {
                task_id: task.id.clone(),
                status,
                row,
                rect: Rect::new(inner.x, y, inner.width, card_height),
            });
            y += card_height;
        }
    }
    layout
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardLook {
    Normal,
    Selected,
    /// The card being dragged, left behind in its column.
    Ghost,
    Floating,
}

fn draw_board_tab(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    app.layout = layout_board(
        area,
        app.board.buckets(),
        app.cfg.ui.card_height,
        &mut app.offsets,
        app.cursor,
    );

    let session = app.board.session();
    let dragged = session.map(|s| s.task().id.clone());
    let hover = session.and_then(|s| s.hover()).map(str::to_owned);

    for (status, rect) in &app.layout.columns {
        let count = app.board.bucket(*status).len();
        let hovered = hover.as_deref() == Some(status.as_str());
        let border = if hovered {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else if app.cursor.0 == *status {
            Style::default().fg(Color::LightBlue)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let title = Line::from(vec![
            Span::styled(
                format!(" {} ", status.label()),
                status_style(*status).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("({count}) "), Style::default().fg(Color::DarkGray)),
        ]);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title);
        f.render_widget(block, *rect);

        if count == 0 {
            let inner = Block::default().borders(Borders::ALL).inner(*rect);
            let p = Paragraph::new("No tasks")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            f.render_widget(p, inner);
        }
    }

    for hit in &app.layout.cards {
        let Some(task) = app.board.bucket(hit.status).get(hit.row) else {
            continue;
        };
        let look = if dragged.as_deref() == Some(task.id.as_str()) {
            CardLook::Ghost
        } else if app.cursor == (hit.status, hit.row) && dragged.is_none() {
            CardLook::Selected
        } else {
            CardLook::Normal
        };
        draw_card(f, hit.rect, task, look, app.cfg.ui.icons);
    }

    let Some(session) = session else {
        return;
    };
    let overlay = if app.keyboard_drag {
        hover
            .as_deref()
            .and_then(TaskStatus::from_column_id)
            .and_then(|s| app.layout.column_rect(s))
            .map(|col| {
                let inner = Block::default().borders(Borders::ALL).inner(col);
                Rect::new(inner.x, inner.y, inner.width, app.cfg.ui.card_height.max(3))
            })
    } else {
        let b = session.overlay_bounds();
        Some(Rect::new(
            u16::try_from(b.x.max(0)).unwrap_or(0),
            u16::try_from(b.y.max(0)).unwrap_or(0),
            u16::try_from(b.width.max(0)).unwrap_or(0),
            u16::try_from(b.height.max(0)).unwrap_or(0),
        ))
    };
    if let Some(rect) = overlay {
        let rect = clamp_rect(rect, area);
        f.render_widget(Clear, rect);
        draw_card(f, rect, session.task(), CardLook::Floating, app.cfg.ui.icons);
    }
}

fn draw_card(f: &mut Frame<'_>, rect: Rect, task: &Task, look: CardLook, icons: bool) {
    let border = match look {
        CardLook::Normal => Style::default().fg(Color::Gray),
        CardLook::Selected => Style::default()
            .fg(Color::LightBlue)
            .add_modifier(Modifier::BOLD),
        CardLook::Ghost => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM),
        CardLook::Floating => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    };
    let block = Block::default().borders(Borders::ALL).border_style(border);
    let inner = block.inner(rect);
    f.render_widget(block, rect);

    let width = usize::from(inner.width);
    let mut title = task.title.clone();
    if icons {
        title = format!("{} {title}", status_icon(task.status));
    }
    let mut meta = vec![Span::styled(
        task.priority.as_str(),
        priority_style(task.priority),
    )];
    if let Some(user) = &task.assignee {
        meta.push(Span::raw(format!(" @{}", user.name)));
    }
    if let Some(due) = &task.due_date {
        let style = if task.is_overdue(model::today()) {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        meta.push(Span::styled(format!(" {due}"), style));
    }

    let mut lines = vec![Line::from(truncate_str(&title, width))];
    if inner.height > 1 {
        lines.push(Line::from(meta));
    }
    let text_style = if look == CardLook::Ghost {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM)
    } else {
        Style::default()
    };
    f.render_widget(Paragraph::new(lines).style(text_style), inner);
}

fn draw_dashboard_tab(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(7),
            Constraint::Min(3),
        ])
        .split(area);

    let s = &app.stats;
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Completion"))
        .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
        .percent(s.completion_percent())
        .label(format!(
            "{}% ({}/{})",
            s.completion_percent(),
            s.completed_tasks,
            s.total_tasks
        ));
    f.render_widget(gauge, rows[0]);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let task_lines = vec![
        Line::from(format!("Total:       {}", s.total_tasks)),
        Line::from(Span::styled(
            format!("To do:       {}", s.todo_tasks),
            status_style(TaskStatus::Todo),
        )),
        Line::from(Span::styled(
            format!("In progress: {}", s.in_progress_tasks),
            status_style(TaskStatus::InProgress),
        )),
        Line::from(Span::styled(
            format!("Done:        {}", s.completed_tasks),
            status_style(TaskStatus::Completed),
        )),
        Line::from(Span::styled(
            format!("Overdue:     {}", s.overdue_tasks),
            Style::default().fg(Color::Red),
        )),
    ];
    f.render_widget(
        Paragraph::new(task_lines).block(Block::default().borders(Borders::ALL).title("Tasks")),
        cols[0],
    );

    let project_lines = vec![
        Line::from(format!("Total:   {}", s.total_projects)),
        Line::from(format!("Active:  {}", s.active_projects)),
        Line::from(format!("Pending: {}", s.pending_tasks)),
    ];
    f.render_widget(
        Paragraph::new(project_lines)
            .block(Block::default().borders(Borders::ALL).title("Projects")),
        cols[1],
    );

    let today = model::today();
    let overdue: Vec<Row> = app
        .all_tasks
        .iter()
        .filter(|t| t.is_overdue(today))
        .map(|t| {
            Row::new(vec![
                Cell::from(t.id.clone()),
                Cell::from(t.due_date.clone().unwrap_or_default())
                    .style(Style::default().fg(Color::Red)),
                Cell::from(t.status.label()).style(status_style(t.status)),
                Cell::from(t.title.clone()),
            ])
        })
        .collect();
    let table = Table::new(
        overdue,
        vec![
            Constraint::Length(8),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Min(10),
        ],
    )
    .header(
        Row::new(vec!["ID", "DUE", "STATUS", "TITLE"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title("Overdue"));
    f.render_widget(table, rows[2]);
}

fn draw_team_tab(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    let headers = Row::new(vec!["NAME", "EMAIL", "TASKS"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = app.team.iter().map(|m| {
        Row::new(vec![
            Cell::from(m.name.clone()),
            Cell::from(m.email.clone()),
            Cell::from(m.tasks_count.to_string()),
        ])
    });
    let table = Table::new(
        rows,
        vec![
            Constraint::Percentage(35),
            Constraint::Percentage(50),
            Constraint::Length(6),
        ],
    )
    .header(headers)
    .block(Block::default().borders(Borders::ALL).title("Team"))
    .row_highlight_style(
        Style::default()
            .fg(Color::Black)
            .bg(Color::LightBlue)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▸ ");

    f.render_stateful_widget(table, area, &mut app.team_state);
}

fn draw_help_tab(f: &mut Frame<'_>, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Help");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = vec![
        Line::from("taskboard"),
        Line::from(""),
        Line::from("Global keys:"),
        Line::from("  1-4 / Tab   Switch tabs"),
        Line::from("  r           Refresh"),
        Line::from("  q / Ctrl-C  Quit"),
        Line::from(""),
        Line::from("Board tab:"),
        Line::from("  h/j/k/l     Move selection"),
        Line::from("  Enter       Task details"),
        Line::from("  /           Search (Esc clears)"),
        Line::from("  p           Cycle project filter"),
        Line::from("  space       Pick up the selected card"),
        Line::from("  h/l         While carrying: choose column"),
        Line::from("  space/Enter While carrying: drop"),
        Line::from("  Esc         Cancel the drag"),
        Line::from(""),
        Line::from("Mouse:"),
        Line::from("  click       Task details"),
        Line::from("  drag        Move a card to another column"),
        Line::from(""),
        Line::from("Team tab:"),
        Line::from("  j/k         Move selection"),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let mut left = if app.mode == Mode::Searching {
        "Enter apply • Esc cancel".to_owned()
    } else if app.detail.is_some() {
        "Esc close".to_owned()
    } else if app.board.is_dragging() && app.keyboard_drag {
        "h/l choose column • space/Enter drop • Esc cancel".to_owned()
    } else if app.board.is_dragging() {
        "release to drop • Esc cancel".to_owned()
    } else {
        match app.tab {
            TabId::Board => "q quit • 1-4 tabs • h/j/k/l move • space pick up • Enter details • / search • p project • r refresh".to_owned(),
            TabId::Team => "q quit • 1-4 tabs • j/k move • r refresh".to_owned(),
            TabId::Dashboard | TabId::Help => "q quit • 1-4 tabs • r refresh".to_owned(),
        }
    };

    if let Some(err) = &app.last_error {
        left = format!("Error: {err}");
    } else if let Some(toast) = &app.toast {
        left.clone_from(&toast.message);
    }

    let mut right = Vec::new();
    if let Some(session) = app.board.session() {
        let target = session
            .hover()
            .and_then(TaskStatus::from_column_id)
            .map_or("-", TaskStatus::label);
        right.push(format!(
            "Moving: {} → {target}",
            truncate_str(&session.task().title, 30)
        ));
    }
    if let Some(id) = app.project_filter.as_deref() {
        right.push(format!("Project: {}", app.project_name(id)));
    }
    if !app.search.is_empty() {
        right.push(format!("Search: {}", app.search));
    }
    if app.in_flight > 0 {
        right.push(format!("Saving: {}", app.in_flight));
    }

    let spans = vec![
        Span::styled(left, Style::default().fg(Color::White).bg(Color::Blue)),
        Span::raw(" "),
        Span::styled(
            right.join(" • "),
            Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::DIM),
        ),
    ];

    let p = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Blue));
    f.render_widget(p, area);
}

fn draw_detail(f: &mut Frame<'_>, task: &Task, projects: &[Project]) {
    let area = centered_rect(60, 60, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Task {}", task.id));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let project = task
        .project_id
        .as_deref()
        .map(|id| {
            projects
                .iter()
                .find(|p| p.id == id)
                .map_or_else(|| id.to_owned(), |p| p.name.clone())
        })
        .unwrap_or_else(|| "-".to_owned());
    let assignee = task
        .assignee
        .as_ref()
        .map_or_else(|| "-".to_owned(), |u| format!("{} <{}>", u.name, u.email));
    let due = match &task.due_date {
        Some(d) if task.is_overdue(model::today()) => format!("{d} (overdue)"),
        Some(d) => d.clone(),
        None => "-".to_owned(),
    };

    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(Span::styled(
            task.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Status:   ", label),
            Span::styled(task.status.label(), status_style(task.status)),
        ]),
        Line::from(vec![
            Span::styled("Priority: ", label),
            Span::styled(task.priority.as_str(), priority_style(task.priority)),
        ]),
        Line::from(vec![Span::styled("Project:  ", label), Span::raw(project)]),
        Line::from(vec![Span::styled("Assignee: ", label), Span::raw(assignee)]),
        Line::from(vec![Span::styled("Due:      ", label), Span::raw(due)]),
        Line::from(vec![
            Span::styled("Created:  ", label),
            Span::raw(task.created_at.clone()),
        ]),
        Line::from(vec![
            Span::styled("Updated:  ", label),
            Span::raw(task.updated_at.clone()),
        ]),
    ];
    if let Some(desc) = task.description.as_deref().filter(|d| !d.trim().is_empty()) {
        lines.push(Line::from(""));
        lines.extend(desc.lines().map(|l| Line::from(l.to_owned())));
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn draw_search_popup(f: &mut Frame<'_>, app: &AppState) {
    let area = search_popup_rect(f.area());
    f.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).title("Search");
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(Paragraph::new(app.search_input.as_str()), inner);
    f.set_cursor_position((
        inner.x + cursor_x_for_text(app.search_input.as_str(), app.search_input.cursor()),
        inner.y,
    ));
}

struct TerminalGuard {
    terminal: Option<ratatui::Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>>,
}

impl TerminalGuard {
    fn new(
        terminal: ratatui::Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>,
    ) -> Self {
        Self {
            terminal: Some(terminal),
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Some(terminal) = self.terminal.take() {
            let _ = tui::restore_terminal(terminal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{StatusChange, partition};
    use crate::task::model::TaskPriority;

    fn tasks(specs: &[(&str, TaskStatus)]) -> Vec<Arc<Task>> {
        specs
            .iter()
            .map(|(id, status)| {
                let mut t = Task::new(format!("task {id}"), *status, TaskPriority::Medium);
                t.id = (*id).to_owned();
                Arc::new(t)
            })
            .collect()
    }

    #[test]
    fn layout_places_cards_under_their_columns() {
        let buckets = partition(&tasks(&[
            ("a", TaskStatus::Todo),
            ("b", TaskStatus::Todo),
            ("c", TaskStatus::Completed),
        ]));
        let mut offsets = [0; 3];
        let layout = layout_board(
            Rect::new(0, 0, 90, 20),
            &buckets,
            4,
            &mut offsets,
            (TaskStatus::Todo, 0),
        );

        assert_eq!(layout.columns.len(), 3);
        assert_eq!(layout.cards.len(), 3);

        let b = layout.card_rect("b").unwrap();
        assert_eq!(b, Rect::new(1, 5, 28, 4));
        let hit = layout.card_at(Point::new(3, 6)).unwrap();
        assert_eq!(hit.task_id, "b");
        assert_eq!(hit.row, 1);

        let c = layout.card_at(Point::new(65, 2)).unwrap();
        assert_eq!(c.status, TaskStatus::Completed);
        assert!(layout.card_at(Point::new(35, 2)).is_none());
    }

    #[test]
    fn drop_zones_use_column_identifiers() {
        let buckets = partition(&[]);
        let mut offsets = [0; 3];
        let layout = layout_board(
            Rect::new(0, 0, 90, 20),
            &buckets,
            4,
            &mut offsets,
            (TaskStatus::Todo, 0),
        );
        let ids: Vec<String> = layout.drop_zones().into_iter().map(|z| z.id).collect();
        assert_eq!(ids, ["TODO", "IN_PROGRESS", "COMPLETED"]);
        assert_eq!(
            layout.column_rect(TaskStatus::InProgress),
            Some(Rect::new(30, 0, 30, 20))
        );
    }

    #[test]
    fn layout_scrolls_to_keep_cursor_visible() {
        let specs: Vec<(String, TaskStatus)> = (0..10)
            .map(|i| (format!("t{i}"), TaskStatus::InProgress))
            .collect();
        let refs: Vec<(&str, TaskStatus)> = specs.iter().map(|(s, st)| (s.as_str(), *st)).collect();
        let buckets = partition(&tasks(&refs));
        let mut offsets = [0; 3];
        // 14 inner rows fit three 4-row cards.
        let layout = layout_board(
            Rect::new(0, 0, 90, 16),
            &buckets,
            4,
            &mut offsets,
            (TaskStatus::InProgress, 7),
        );
        assert_eq!(offsets[1], 5);
        let rows: Vec<usize> = layout.cards.iter().map(|c| c.row).collect();
        assert_eq!(rows, [5, 6, 7]);
    }

    #[test]
    fn column_steps_stop_at_the_edges() {
        assert_eq!(step_column(TaskStatus::Todo, -1), TaskStatus::Todo);
        assert_eq!(step_column(TaskStatus::Todo, 1), TaskStatus::InProgress);
        assert_eq!(step_column(TaskStatus::InProgress, 1), TaskStatus::Completed);
        assert_eq!(step_column(TaskStatus::Completed, 1), TaskStatus::Completed);
    }

    fn board_app(
        dir: &std::path::Path,
        specs: &[(&str, TaskStatus)],
    ) -> (AppState, mpsc::UnboundedReceiver<StatusChange>) {
        let tasks_store = TaskStorage::new(dir.join("tasks"));
        for (id, status) in specs {
            let mut t = Task::new(format!("task {id}"), *status, TaskPriority::Medium);
            t.id = (*id).to_owned();
            tasks_store.save(&t).unwrap();
        }
        let (dispatcher, requests) = StatusDispatcher::channel();
        let (_results_tx, results) = mpsc::unbounded_channel();
        let mut app = AppState::new(
            config::Config::default(),
            tasks_store,
            ProjectStorage::new(dir.join("projects")),
            dispatcher,
            results,
        );
        refresh_data(&mut app).unwrap();
        relayout(&mut app);
        (app, requests)
    }

    fn relayout(app: &mut AppState) {
        app.layout = layout_board(
            Rect::new(0, 0, 90, 20),
            app.board.buckets(),
            4,
            &mut app.offsets,
            app.cursor,
        );
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn pressed_task(app: &AppState) -> Option<String> {
        match app.board.gesture() {
            Gesture::Pressed { task, .. } => Some(task.id.clone()),
            _ => None,
        }
    }

    fn keyboard_move(app: &mut AppState, cursor: (TaskStatus, usize), steps_right: usize) {
        app.cursor = cursor;
        handle_key(key(KeyCode::Char(' ')), app);
        assert!(app.keyboard_drag);
        for _ in 0..steps_right {
            handle_key(key(KeyCode::Char('l')), app);
        }
        handle_key(key(KeyCode::Enter), app);
        assert!(!app.board.is_dragging());
    }

    #[test]
    fn release_swallowed_by_search_does_not_block_later_drags() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _requests) =
            board_app(dir.path(), &[("a", TaskStatus::Todo), ("b", TaskStatus::Todo)]);

        handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 3, 2), &mut app);
        assert_eq!(pressed_task(&app).as_deref(), Some("a"));

        handle_key(key(KeyCode::Char('/')), &mut app);
        assert_eq!(app.mode, Mode::Searching);
        assert!(matches!(app.board.gesture(), Gesture::Idle));
        handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 3, 2), &mut app);
        handle_key(key(KeyCode::Esc), &mut app);
        handle_key(key(KeyCode::Esc), &mut app);
        assert_eq!(app.mode, Mode::Normal);

        handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 3, 6), &mut app);
        assert_eq!(pressed_task(&app).as_deref(), Some("b"));
        handle_key(key(KeyCode::Char(' ')), &mut app);
        assert!(app.keyboard_drag);
        assert_eq!(
            app.board.session().map(|s| s.task().id.as_str()),
            Some("b")
        );
    }

    #[test]
    fn escape_cancels_a_pending_press() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _requests) =
            board_app(dir.path(), &[("a", TaskStatus::Todo), ("b", TaskStatus::Todo)]);

        handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 3, 2), &mut app);
        handle_key(key(KeyCode::Esc), &mut app);
        assert!(matches!(app.board.gesture(), Gesture::Idle));

        // A later release has nothing to activate.
        handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 3, 2), &mut app);
        assert!(app.detail.is_none());
    }

    #[test]
    fn new_press_replaces_one_whose_release_was_lost() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _requests) =
            board_app(dir.path(), &[("a", TaskStatus::Todo), ("b", TaskStatus::Todo)]);

        handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 3, 2), &mut app);
        handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 3, 6), &mut app);
        assert_eq!(pressed_task(&app).as_deref(), Some("b"));

        handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 3, 6), &mut app);
        assert_eq!(app.detail.as_ref().map(|t| t.id.as_str()), Some("b"));
    }

    #[test]
    fn drop_patches_the_board_and_holds_refresh_until_writes_land() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut requests) =
            board_app(dir.path(), &[("a", TaskStatus::Todo), ("b", TaskStatus::Todo)]);

        keyboard_move(&mut app, (TaskStatus::Todo, 0), 1);
        assert_eq!(app.in_flight, 1);
        assert_eq!(app.board.bucket(TaskStatus::InProgress)[0].id, "a");
        assert_eq!(app.stats.in_progress_tasks, 1);
        assert_eq!(app.cursor, (TaskStatus::InProgress, 0));
        assert_eq!(
            requests.try_recv().unwrap(),
            StatusChange {
                task_id: "a".to_owned(),
                status: TaskStatus::InProgress,
            }
        );

        keyboard_move(&mut app, (TaskStatus::Todo, 0), 2);
        assert_eq!(app.in_flight, 2);
        assert_eq!(app.board.bucket(TaskStatus::Completed)[0].id, "b");
        assert_eq!(requests.try_recv().unwrap().task_id, "b");

        app.needs_refresh = false;
        let saved_a = app.tasks_store.update_status("a", TaskStatus::InProgress).unwrap();
        handle_status_result(
            &mut app,
            StatusChangeResult {
                change: StatusChange {
                    task_id: "a".to_owned(),
                    status: TaskStatus::InProgress,
                },
                outcome: Ok(saved_a),
            },
        );
        assert_eq!(app.in_flight, 1);
        assert!(!app.needs_refresh, "b is still queued");

        let saved_b = app.tasks_store.update_status("b", TaskStatus::Completed).unwrap();
        handle_status_result(
            &mut app,
            StatusChangeResult {
                change: StatusChange {
                    task_id: "b".to_owned(),
                    status: TaskStatus::Completed,
                },
                outcome: Ok(saved_b),
            },
        );
        assert_eq!(app.in_flight, 0);
        assert!(app.needs_refresh);
        assert!(app.toast.is_some());

        refresh_data(&mut app).unwrap();
        assert_eq!(app.board.bucket(TaskStatus::InProgress)[0].id, "a");
        assert_eq!(app.board.bucket(TaskStatus::Completed)[0].id, "b");
    }

    #[test]
    fn failed_change_is_reported_and_reverted_by_the_refetch() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _requests) = board_app(dir.path(), &[("a", TaskStatus::Todo)]);

        keyboard_move(&mut app, (TaskStatus::Todo, 0), 2);
        assert_eq!(app.board.bucket(TaskStatus::Completed).len(), 1);

        app.needs_refresh = false;
        handle_status_result(
            &mut app,
            StatusChangeResult {
                change: StatusChange {
                    task_id: "a".to_owned(),
                    status: TaskStatus::Completed,
                },
                outcome: Err("disk full".to_owned()),
            },
        );
        assert_eq!(app.in_flight, 0);
        assert!(app.needs_refresh);
        assert!(app.last_error.as_deref().is_some_and(|e| e.contains("disk full")));

        refresh_data(&mut app).unwrap();
        assert_eq!(app.board.bucket(TaskStatus::Todo)[0].id, "a");
        assert!(app.board.bucket(TaskStatus::Completed).is_empty());
    }

    #[test]
    fn same_column_drop_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut requests) = board_app(dir.path(), &[("a", TaskStatus::Todo)]);

        keyboard_move(&mut app, (TaskStatus::Todo, 0), 0);
        assert_eq!(app.in_flight, 0);
        assert!(requests.try_recv().is_err());
    }

    #[test]
    fn project_key_cycles_the_board_filter() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _requests) = board_app(dir.path(), &[]);
        let web = Project::new("Website", "");
        let api = Project::new("Api", "");
        app.projects_store.save(&web).unwrap();
        app.projects_store.save(&api).unwrap();
        for (id, project) in [("w1", &web), ("w2", &web), ("a1", &api)] {
            let mut t = Task::new(format!("task {id}"), TaskStatus::Todo, TaskPriority::Medium);
            t.id = id.to_owned();
            t.project_id = Some(project.id.clone());
            app.tasks_store.save(&t).unwrap();
        }
        refresh_data(&mut app).unwrap();
        assert_eq!(app.board.snapshot().len(), 3);

        handle_key(key(KeyCode::Char('p')), &mut app);
        let first = app.projects[0].id.clone();
        assert_eq!(app.project_filter.as_deref(), Some(first.as_str()));
        assert!(
            app.board
                .snapshot()
                .iter()
                .all(|t| t.project_id.as_deref() == Some(first.as_str()))
        );

        handle_key(key(KeyCode::Char('p')), &mut app);
        handle_key(key(KeyCode::Char('p')), &mut app);
        assert!(app.project_filter.is_none());
        assert_eq!(app.board.snapshot().len(), 3);
    }

    #[test]
    fn project_filter_cycle_wraps_and_survives_deleted_projects() {
        let a = Project::new("A", "");
        let b = Project::new("B", "");
        let projects = vec![a.clone(), b.clone()];
        assert_eq!(next_project_filter(None, &projects), Some(a.id.clone()));
        assert_eq!(next_project_filter(Some(a.id.as_str()), &projects), Some(b.id.clone()));
        assert_eq!(next_project_filter(Some(b.id.as_str()), &projects), None);
        assert_eq!(next_project_filter(Some("gone"), &projects), Some(a.id));
        assert_eq!(next_project_filter(None, &[]), None);
    }
}
