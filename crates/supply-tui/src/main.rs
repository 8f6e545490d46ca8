//! Terminal UI for the supply-chain node.
use std::{
    io,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    layout::{Constraint, Direction, Flex, Layout, Rect},
    prelude::*,
    widgets::*,
    Frame,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use supply_core::{
    chain::ChainHead, Block as LedgerBlock, PricePoint, Product, ProductStatus, Role,
    Transaction, User,
};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug, Clone)]
struct Args {
    /// Base URL of the running supply-node (e.g. http://127.0.0.1:8080)
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    node: String,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    #[default]
    Login,
    Main,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    #[default]
    Dashboard,
    Products,
    Ledger,
    Market,
}

/// What the one-line input box is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    NewProduct,
    Margin,
    RetailPrice,
    BatchSize,
}

impl Prompt {
    fn title(self) -> &'static str {
        match self {
            Prompt::NewProduct => "New product name",
            Prompt::Margin => "Distributor margin % (5-40)",
            Prompt::RetailPrice => "Retail price",
            Prompt::BatchSize => "Batch size",
        }
    }

    /// Role allowed to open this prompt.
    fn role(self) -> Role {
        match self {
            Prompt::NewProduct | Prompt::BatchSize => Role::Manufacturer,
            Prompt::Margin => Role::Distributor,
            Prompt::RetailPrice => Role::Retailer,
        }
    }

    /// Route suffix and JSON body for a product-scoped prompt.
    fn request(self, text: &str) -> std::result::Result<(&'static str, serde_json::Value), String> {
        let text = text.trim();
        match self {
            Prompt::NewProduct => Err("not a product update".into()),
            Prompt::Margin => match text.parse::<f64>() {
                Ok(m) if (5.0..=40.0).contains(&m) => Ok(("margin", json!({ "margin": m }))),
                _ => Err(format!("margin must be a number between 5 and 40, got {text:?}")),
            },
            Prompt::RetailPrice => match text.parse::<f64>() {
                Ok(p) if p.is_finite() && p > 0.0 => Ok(("retail-price", json!({ "price": p }))),
                _ => Err(format!("retail price must be a positive number, got {text:?}")),
            },
            Prompt::BatchSize => match text.parse::<u32>() {
                Ok(n) if n > 0 => Ok(("batch-size", json!({ "size": n }))),
                _ => Err(format!("batch size must be a positive whole number, got {text:?}")),
            },
        }
    }
}

#[derive(Debug)]
struct App {
    args: Args,
    http: Client,
    screen: Screen,
    tab: Tab,
    // login form
    login_role: usize,
    login_password: String,
    login_status: Option<String>,
    user: Option<User>,
    // dashboard
    head: Option<ChainHead>,
    users: Vec<User>,
    last_refresh: Instant,
    // products
    products: Vec<Product>,
    product_cursor: usize,
    product_state: TableState,
    product_txs: Vec<Transaction>,
    detail_popup: bool,
    payment_popup: bool,
    input: Option<(Prompt, String)>,
    status: Option<String>,
    // ledger
    blocks: Vec<LedgerBlock>,
    block_cursor: usize,
    block_state: TableState,
}

const ITEM_HEIGHT: usize = 1;

impl App {
    fn new(args: Args) -> Self {
        Self {
            args,
            http: Client::new(),
            screen: Screen::Login,
            tab: Tab::Dashboard,
            login_role: 0,
            login_password: String::new(),
            login_status: None,
            user: None,
            head: None,
            users: Vec::new(),
            last_refresh: Instant::now(),
            products: Vec::new(),
            product_cursor: 0,
            product_state: TableState::default(),
            product_txs: Vec::new(),
            detail_popup: false,
            payment_popup: false,
            input: None,
            status: None,
            blocks: Vec::new(),
            block_cursor: 0,
            block_state: TableState::default(),
        }
    }

    fn role(&self) -> Role {
        Role::ALL[self.login_role % Role::ALL.len()]
    }

    fn selected(&self) -> Option<&Product> {
        self.products.get(self.product_cursor)
    }

    fn address_of(&self, role: Role) -> Option<String> {
        self.users
            .iter()
            .find(|u| u.role == role)
            .map(|u| u.address.clone())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let base = &self.args.node;
        Ok(self
            .http
            .get(format!("{base}{path}"))
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await?)
    }

    /// POST and report `ok` or the node's error message.
    async fn post(&mut self, path: &str, body: serde_json::Value, ok: &str) {
        let base = &self.args.node;
        let result = self
            .http
            .post(format!("{base}{path}"))
            .json(&body)
            .send()
            .await;
        self.status = Some(match result {
            Ok(resp) if resp.status().is_success() => ok.to_string(),
            Ok(resp) => {
                let code = resp.status();
                let body = resp.text().await.unwrap_or_default();
                format!("❌ {code} {body}")
            }
            Err(e) => {
                warn!(path, error = %e, "request failed");
                format!("❌ POST {path} failed: {e}")
            }
        });
        self.refresh().await;
    }

    async fn login(&mut self) {
        let base = &self.args.node;
        let body = json!({ "role": self.role(), "password": self.login_password });
        match self
            .http
            .post(format!("{base}/auth/login"))
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(resp) => match resp.json::<User>().await {
                Ok(user) => {
                    self.user = Some(user);
                    self.login_password.clear();
                    self.login_status = None;
                    self.screen = Screen::Main;
                    self.tab = Tab::Dashboard;
                    self.refresh().await;
                }
                Err(e) => self.login_status = Some(format!("Failed to decode user: {e}")),
            },
            Err(e) => self.login_status = Some(format!("Login failed: {e}")),
        }
    }

    fn logout(&mut self) {
        self.user = None;
        self.screen = Screen::Login;
        self.detail_popup = false;
        self.payment_popup = false;
        self.input = None;
    }

    /// Re-read everything; the node pushes nothing.
    async fn refresh(&mut self) {
        if let Ok(head) = self.get::<ChainHead>("/chain/head").await {
            self.head = Some(head);
        }
        if let Ok(users) = self.get::<Vec<User>>("/users").await {
            if let Some(me) = &self.user {
                if let Some(fresh) = users.iter().find(|u| u.address == me.address) {
                    self.user = Some(fresh.clone());
                }
            }
            self.users = users;
        }
        match self.get::<Vec<Product>>("/products").await {
            Ok(products) => {
                self.products = products;
                if self.product_cursor >= self.products.len() {
                    self.product_cursor = self.products.len().saturating_sub(1);
                }
            }
            Err(e) => self.status = Some(format!("Failed to load products: {e}")),
        }
        if let Ok(blocks) = self
            .get::<Vec<LedgerBlock>>("/chain/blocks?limit=250&dir=desc")
            .await
        {
            self.blocks = blocks;
        }
        self.load_product_txs().await;
        self.last_refresh = Instant::now();
    }

    async fn load_product_txs(&mut self) {
        let Some(id) = self.selected().map(|p| p.id.clone()) else {
            self.product_txs.clear();
            return;
        };
        self.product_txs = self
            .get::<Vec<Transaction>>(&format!("/products/{id}/transactions"))
            .await
            .unwrap_or_default();
    }

    /// Open `prompt` if the logged-in role may use it.
    fn open_prompt(&mut self, prompt: Prompt) {
        let role = self.user.as_ref().map(|u| u.role);
        if role != Some(prompt.role()) {
            self.status = Some(format!("Only a {} can edit: {}", prompt.role(), prompt.title()));
            return;
        }
        if prompt != Prompt::NewProduct && self.selected().is_none() {
            self.status = Some("No product selected".into());
            return;
        }
        self.input = Some((prompt, String::new()));
    }

    async fn submit_input(&mut self) {
        let Some((prompt, text)) = self.input.take() else {
            return;
        };
        let Some(me) = self.user.clone() else {
            return;
        };
        if prompt == Prompt::NewProduct {
            if text.trim().is_empty() {
                self.status = Some("Product name is empty".into());
                return;
            }
            let body = json!({ "name": text, "manufacturer": me.address });
            self.post("/products", body, "✅ Product created").await;
            return;
        }
        let Some(product) = self.selected().cloned() else {
            return;
        };
        match prompt.request(&text) {
            Ok((route, body)) => {
                self.post(
                    &format!("/products/{}/{route}", product.id),
                    body,
                    &format!("✅ {} updated for {}", prompt.title(), product.name),
                )
                .await
            }
            Err(msg) => self.status = Some(msg),
        }
    }

    async fn advance(&mut self) {
        let (Some(me), Some(product)) = (self.user.clone(), self.selected().cloned()) else {
            return;
        };
        let next = match next_step(me.role, product.status) {
            Some(next) => next,
            None => {
                self.status = Some(format!(
                    "A {} cannot advance a product that is {}",
                    me.role, product.status
                ));
                return;
            }
        };
        let to = match next {
            ProductStatus::InTransit => self.address_of(Role::Distributor),
            ProductStatus::Delivered => self.address_of(Role::Retailer),
            ProductStatus::Manufactured => None,
        }
        .unwrap_or_else(|| me.address.clone());
        let body = json!({ "status": next, "from": me.address, "to": to });
        self.post(
            &format!("/products/{}/status", product.id),
            body,
            &format!("✅ {} is now {next}", product.name),
        )
        .await;
    }

    async fn pay(&mut self) {
        self.payment_popup = false;
        let (Some(me), Some(product)) = (self.user.clone(), self.selected().cloned()) else {
            return;
        };
        let body = json!({ "from": me.address, "to": product.current_location });
        self.post(
            &format!("/products/{}/payment", product.id),
            body,
            &format!("✅ Paid {} for {}", product.price, product.name),
        )
        .await;
    }

    async fn inspect(&mut self) {
        let (Some(me), Some(product)) = (self.user.clone(), self.selected().cloned()) else {
            return;
        };
        let body = json!({ "inspector": me.address });
        self.post(
            &format!("/products/{}/inspection", product.id),
            body,
            "✅ Inspection recorded",
        )
        .await;
    }

    async fn next_row(&mut self) {
        match self.tab {
            Tab::Products | Tab::Market => {
                if self.products.is_empty() {
                    return;
                }
                self.product_cursor = (self.product_cursor + 1) % self.products.len();
                self.product_state.select(Some(self.product_cursor * ITEM_HEIGHT));
                self.load_product_txs().await;
            }
            Tab::Ledger => {
                if self.blocks.is_empty() {
                    return;
                }
                self.block_cursor = (self.block_cursor + 1) % self.blocks.len();
                self.block_state.select(Some(self.block_cursor * ITEM_HEIGHT));
            }
            Tab::Dashboard => {}
        }
    }

    async fn previous_row(&mut self) {
        match self.tab {
            Tab::Products | Tab::Market => {
                if self.products.is_empty() {
                    return;
                }
                self.product_cursor = self
                    .product_cursor
                    .checked_sub(1)
                    .unwrap_or(self.products.len() - 1);
                self.product_state.select(Some(self.product_cursor * ITEM_HEIGHT));
                self.load_product_txs().await;
            }
            Tab::Ledger => {
                if self.blocks.is_empty() {
                    return;
                }
                self.block_cursor = self
                    .block_cursor
                    .checked_sub(1)
                    .unwrap_or(self.blocks.len() - 1);
                self.block_state.select(Some(self.block_cursor * ITEM_HEIGHT));
            }
            Tab::Dashboard => {}
        }
    }
}

/// Where `role` may take a product currently in `status`, if anywhere.
fn next_step(role: Role, status: ProductStatus) -> Option<ProductStatus> {
    if role.can_advance(status) {
        status.next()
    } else {
        None
    }
}

/// (day offset, price) pairs for the chart, with the newest point at x = 0.
fn chart_points(history: &[PricePoint]) -> Vec<(f64, f64)> {
    let Some(last) = history.last() else {
        return Vec::new();
    };
    const DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;
    history
        .iter()
        .map(|p| {
            let age = last.timestamp.saturating_sub(p.timestamp) as f64 / DAY;
            (-age, p.price as f64)
        })
        .collect()
}

/// First 8 and last 4 characters of long identifiers. Locations are free text, so count chars.
fn short(hash: &str) -> String {
    let len = hash.chars().count();
    if len > 14 {
        let head: String = hash.chars().take(8).collect();
        let tail: String = hash.chars().skip(len - 4).collect();
        format!("{head}…{tail}")
    } else {
        hash.to_string()
    }
}

/// Waypoints as `lat,lng` pairs, the current position marked.
fn route_line(p: &Product) -> String {
    p.route
        .iter()
        .map(|c| {
            let here = (c.lat - p.coordinates.lat).abs() < 1e-9
                && (c.lng - p.coordinates.lng).abs() < 1e-9;
            let point = format!("{:.2},{:.2}", c.lat, c.lng);
            if here {
                format!("[{point}]")
            } else {
                point
            }
        })
        .collect::<Vec<_>>()
        .join(" → ")
}

#[tokio::main]
async fn main() -> Result<()> {
    // tracing
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();
    // terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(args.clone());

    let res = run_app(&mut terminal, &mut app).await;

    // restore
    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if crossterm::event::poll(Duration::from_millis(200))? {
            if let CEvent::Key(key) = event::read()? {
                if handle_key(app, key).await? {
                    break;
                }
            }
        }

        if app.screen == Screen::Main && app.last_refresh.elapsed() >= Duration::from_secs(5) {
            app.refresh().await;
        }
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Ok(true);
    }

    if app.screen == Screen::Login {
        match key.code {
            KeyCode::Esc => return Ok(true),
            KeyCode::Left => {
                app.login_role = (app.login_role + Role::ALL.len() - 1) % Role::ALL.len();
            }
            KeyCode::Right | KeyCode::Tab => {
                app.login_role = (app.login_role + 1) % Role::ALL.len();
            }
            KeyCode::Char(c) if !c.is_control() => app.login_password.push(c),
            KeyCode::Backspace => {
                app.login_password.pop();
            }
            KeyCode::Enter => app.login().await,
            _ => {}
        }
        return Ok(false);
    }

    // an open input box swallows every key
    if let Some((_, text)) = app.input.as_mut() {
        match key.code {
            KeyCode::Esc => app.input = None,
            KeyCode::Char(c) if !c.is_control() => text.push(c),
            KeyCode::Backspace => {
                text.pop();
            }
            KeyCode::Enter => app.submit_input().await,
            _ => {}
        }
        return Ok(false);
    }

    if app.payment_popup {
        match key.code {
            KeyCode::Enter | KeyCode::Char('y') => app.pay().await,
            KeyCode::Esc | KeyCode::Char('n') => app.payment_popup = false,
            _ => {}
        }
        return Ok(false);
    }

    match key.code {
        KeyCode::Esc if app.detail_popup => app.detail_popup = false,
        KeyCode::Esc | KeyCode::Char('q') => return Ok(true),
        KeyCode::Tab => {
            app.tab = match app.tab {
                Tab::Dashboard => Tab::Products,
                Tab::Products => Tab::Ledger,
                Tab::Ledger => Tab::Market,
                Tab::Market => Tab::Dashboard,
            };
        }
        KeyCode::BackTab => {
            app.tab = match app.tab {
                Tab::Dashboard => Tab::Market,
                Tab::Products => Tab::Dashboard,
                Tab::Ledger => Tab::Products,
                Tab::Market => Tab::Ledger,
            };
        }
        KeyCode::Char('r') => app.refresh().await,
        KeyCode::Char('l') => app.logout(),
        KeyCode::Down => app.next_row().await,
        KeyCode::Up => app.previous_row().await,
        _ if app.tab == Tab::Products => match key.code {
            KeyCode::Enter => app.detail_popup = !app.detail_popup,
            KeyCode::Char('n') => app.open_prompt(Prompt::NewProduct),
            KeyCode::Char('m') => app.open_prompt(Prompt::Margin),
            KeyCode::Char('t') => app.open_prompt(Prompt::RetailPrice),
            KeyCode::Char('b') => app.open_prompt(Prompt::BatchSize),
            KeyCode::Char('a') => app.advance().await,
            KeyCode::Char('p') if app.selected().is_some() => app.payment_popup = true,
            KeyCode::Char('i') => app.inspect().await,
            _ => {}
        },
        _ => {}
    }
    Ok(false)
}

fn ui(f: &mut Frame, app: &mut App) {
    if app.screen == Screen::Login {
        render_login(f, f.area(), app);
        return;
    }

    let size = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(size);

    let titles = ["Dashboard", "Products", "Ledger", "Market"]
        .iter()
        .map(|t| Line::from(*t))
        .collect::<Vec<_>>();
    let who = app
        .user
        .as_ref()
        .map(|u| format!("supply-tui · {} ({})", u.name, u.role))
        .unwrap_or_else(|| "supply-tui".into());
    let tabs = Tabs::new(titles)
        .select(app.tab as usize)
        .block(Block::default().borders(Borders::ALL).title(who))
        .style(Style::default().fg(Color::Green))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match app.tab {
        Tab::Dashboard => render_dashboard(f, chunks[1], app),
        Tab::Products => render_products(f, chunks[1], app),
        Tab::Ledger => render_ledger(f, chunks[1], app),
        Tab::Market => render_market(f, chunks[1], app),
    }

    let help = Paragraph::new(format!(
        "q quit • TAB tabs • r refresh • l logout • Products: ↑/↓ select, Enter details, a advance, p pay, i inspect   {}",
        app.status.clone().unwrap_or_default()
    ))
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().borders(Borders::ALL).title("help"));
    f.render_widget(help, chunks[2]);
}

fn render_login(f: &mut Frame, area: Rect, app: &App) {
    let area = centered_area(area, 50, 40);
    let roles = Role::ALL
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let style = if i == app.login_role {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Span::styled(format!(" {r} "), style)
        })
        .collect::<Vec<_>>();
    let lines = vec![
        Line::from("Role (←/→):"),
        Line::from(roles),
        Line::from(""),
        Line::from(format!("Password: {}", "*".repeat(app.login_password.len()))),
        Line::from(""),
        Line::from("Enter to log in, Esc to quit"),
        Line::from(app.login_status.clone().unwrap_or_default()).red(),
    ];
    let form = Paragraph::new(lines).block(
        Block::bordered()
            .title("Supply chain login")
            .border_style(Style::new().green()),
    );
    f.render_widget(Clear, area);
    f.render_widget(form, area);
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let mut lines = Vec::new();
    if let Some(u) = &app.user {
        lines.push(Line::from(format!("Name       : {}", u.name)));
        lines.push(Line::from(format!("Address    : {}", u.address)));
        lines.push(Line::from(format!("Balance    : {}", u.balance)));
        lines.push(Line::from(format!("Volume     : {}", u.trading_volume)));
        lines.push(Line::from(format!("Reputation : {:.1}", u.reputation)));
        lines.push(Line::from(format!("Certified  : {}", u.certifications.join(", "))));
    }
    let me = Paragraph::new(lines).block(Block::default().title("Account").borders(Borders::ALL));
    f.render_widget(me, chunks[0]);

    let count = |s: ProductStatus| app.products.iter().filter(|p| p.status == s).count();
    let mut overview = vec![
        Line::from(format!("Products      : {}", app.products.len())),
        Line::from(format!("  manufactured: {}", count(ProductStatus::Manufactured))),
        Line::from(format!("  in transit  : {}", count(ProductStatus::InTransit))),
        Line::from(format!("  delivered   : {}", count(ProductStatus::Delivered))),
    ];
    if let Some(h) = &app.head {
        overview.push(Line::from(format!("Chain height  : {}", h.height)));
        overview.push(Line::from(format!(
            "Tip hash      : {}",
            h.tip_hash.as_deref().map(short).unwrap_or_else(|| "-".into())
        )));
    }
    let overview =
        Paragraph::new(overview).block(Block::default().title("Overview").borders(Borders::ALL));
    f.render_widget(overview, chunks[1]);
}

fn render_products(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    let rows = app.products.iter().enumerate().map(|(i, p)| {
        Row::new(vec![
            Cell::from(p.name.clone()),
            Cell::from(p.status.to_string()),
            Cell::from(p.price.to_string()),
            Cell::from(format!("{:.0}", p.retail_price)),
            Cell::from(p.quality.to_string()),
            Cell::from(p.inspection_status.as_str()),
            Cell::from(format!("{:?}", p.payment_status).to_lowercase()),
            Cell::from(short(&p.current_location)),
        ])
        .style(if i == app.product_cursor {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        })
    });
    let table = Table::new(
        rows,
        vec![
            Constraint::Length(20),
            Constraint::Length(13),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(11),
            Constraint::Length(16),
        ],
    )
    .header(
        Row::new(vec![
            "name", "status", "price", "retail", "quality", "inspected", "payment", "location",
        ])
        .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title("Products"));
    f.render_stateful_widget(table, chunks[0], &mut app.product_state);

    let (title, input) = match &app.input {
        Some((prompt, text)) => (
            prompt.title(),
            format!("{text}▏ (Enter to submit, Esc to cancel)"),
        ),
        None => (
            "Input",
            "n new product • m margin • t retail price • b batch size".to_string(),
        ),
    };
    f.render_widget(
        Paragraph::new(input).block(Block::default().borders(Borders::ALL).title(title)),
        chunks[1],
    );

    if app.detail_popup {
        render_detail(f, area, app);
    }
    if app.payment_popup {
        render_payment(f, area, app);
    }
}

fn render_detail(f: &mut Frame, area: Rect, app: &App) {
    let popup = Block::bordered()
        .style(Style::default().bg(Color::Black).fg(Color::Yellow))
        .title("Product details")
        .title_style(Style::new().yellow().bold())
        .border_style(Style::new().red().bold());
    let items = match app.selected() {
        None => vec!["No product selected".to_string()],
        Some(p) => {
            let mut items = vec![
                format!(" Id          : {}", p.id),
                format!(" Name        : {}", p.name),
                format!(" Manufacturer: {}", p.manufacturer),
                format!(" Status      : {}", p.status),
                format!(" Location    : {}", p.current_location),
                format!(" Coordinates : {:.4}, {:.4}", p.coordinates.lat, p.coordinates.lng),
                format!(" Route       : {}", route_line(p)),
                format!(" Retail price: {:.2}", p.retail_price),
                format!(" Environment : {}°C, {}% RH", p.temperature, p.humidity),
                format!(" Margin      : {:.1}%", p.distributor_margin),
                format!(" Batch / MOQ : {} / {}", p.batch_size, p.minimum_order_quantity),
                format!(" Sustainab.  : {}", p.sustainability_score),
                format!(" Certified   : {}", p.certifications.join(", ")),
                format!(" Tx hash     : {}", p.transaction_hash),
                " History:".to_string(),
            ];
            items.extend(
                app.product_txs
                    .iter()
                    .map(|tx| format!("   {} {} → {}", tx.action, short(&tx.from), short(&tx.to))),
            );
            items
        }
    };
    let list = List::new(items).block(popup.clone());
    let popup_area = centered_area(area, 70, 80);
    // clears out any background in the area before rendering the popup
    f.render_widget(Clear, popup_area);
    f.render_widget(popup, popup_area);
    f.render_widget(list, popup_area);
}

fn render_payment(f: &mut Frame, area: Rect, app: &App) {
    let (Some(p), Some(me)) = (app.selected(), app.user.as_ref()) else {
        return;
    };
    let affordable = me.balance >= p.price;
    let lines = vec![
        Line::from(format!("Product : {}", p.name)),
        Line::from(format!("Pay to  : {}", p.current_location)),
        Line::from(format!("Amount  : {}", p.price)),
        Line::from(format!("Balance : {} → {}", me.balance, me.balance.saturating_sub(p.price))),
        Line::from(""),
        if affordable {
            Line::from("Enter/y to confirm, Esc/n to cancel").green()
        } else {
            Line::from("Insufficient balance").red()
        },
    ];
    let modal = Paragraph::new(lines).block(
        Block::bordered()
            .title("Confirm payment")
            .style(Style::default().bg(Color::Black))
            .border_style(Style::new().cyan().bold()),
    );
    let popup_area = centered_area(area, 40, 40);
    f.render_widget(Clear, popup_area);
    f.render_widget(modal, popup_area);
}

fn render_ledger(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.blocks.iter().enumerate().map(|(i, b)| {
        let actions = b
            .transactions
            .iter()
            .map(|t| t.action.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        Row::new(vec![
            Cell::from(b.index.to_string()),
            Cell::from(b.timestamp.to_string()),
            Cell::from(b.nonce.to_string()),
            Cell::from(short(&b.hash)),
            Cell::from(short(&b.previous_hash)),
            Cell::from(actions),
        ])
        .style(if i == app.block_cursor {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        })
    });
    let table = Table::new(
        rows,
        vec![
            Constraint::Length(6),
            Constraint::Length(14),
            Constraint::Length(8),
            Constraint::Length(16),
            Constraint::Length(16),
            Constraint::Min(20),
        ],
    )
    .header(
        Row::new(vec!["idx", "ts", "nonce", "hash", "prev", "transactions"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title("Ledger blocks"));
    f.render_stateful_widget(table, area, &mut app.block_state);
}

fn render_market(f: &mut Frame, area: Rect, app: &App) {
    let Some(p) = app.selected() else {
        f.render_widget(
            Paragraph::new("No products yet").block(Block::bordered().title("Market")),
            area,
        );
        return;
    };
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    let points = chart_points(&p.price_history);
    let (lo, hi) = points
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    let (lo, hi) = if points.is_empty() { (0.0, 1.0) } else { (lo * 0.98, hi * 1.02) };
    let x_lo = points.first().map(|&(x, _)| x).unwrap_or(-1.0);
    let dataset = Dataset::default()
        .name(p.name.clone())
        .marker(ratatui::symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);
    let chart = Chart::new(vec![dataset])
        .block(Block::bordered().title(format!("{} price history", p.name)))
        .x_axis(
            Axis::default()
                .title("days")
                .bounds([x_lo, 0.0])
                .labels(vec![Span::raw(format!("{x_lo:.0}")), Span::raw("now")]),
        )
        .y_axis(
            Axis::default()
                .title("price")
                .bounds([lo, hi])
                .labels(vec![Span::raw(format!("{lo:.0}")), Span::raw(format!("{hi:.0}"))]),
        );
    f.render_widget(chart, chunks[0]);

    let a = &p.market_analysis;
    let trend = match a.trend {
        supply_core::Trend::Bullish => Line::from("Trend      : bullish ▲").green(),
        supply_core::Trend::Bearish => Line::from("Trend      : bearish ▼").red(),
        supply_core::Trend::Neutral => Line::from("Trend      : neutral ■"),
    };
    let lines = vec![
        Line::from(format!("Mean price : {:.0}", a.mean_price)),
        Line::from(format!("Volatility : {:.2}%", a.volatility)),
        trend,
        Line::from(format!("Volume     : {}", a.volume)),
        Line::from(""),
        Line::from("Predictions"),
        Line::from(format!("  short    : {:.0}", a.predictions.short_term)),
        Line::from(format!("  medium   : {:.0}", a.predictions.medium_term)),
        Line::from(format!("  long     : {:.0}", a.predictions.long_term)),
    ];
    f.render_widget(
        Paragraph::new(lines).block(Block::bordered().title("Analysis")),
        chunks[1],
    );
}

/// Create a centered rect using the given percentage of the available rect
fn centered_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    // vertically center a strip that's percent_y tall
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let [area] = vertical.areas(area);

    // horizontally center a strip that's percent_x wide within that strip
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = horizontal.areas(area);

    area
}
