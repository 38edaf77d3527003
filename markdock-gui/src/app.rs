use std::sync::Arc;

use chrono::Utc;
use eframe::egui::{self, Color32, RichText, Rounding, Stroke};
use markdock_core::display::{cache_age_label, time_ago};
use markdock_core::{ApiKeyStatus, Article, Backend, Config, Theme};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{error, warn};
use url::Url;

const ACCENT: Color32 = Color32::from_rgb(0, 122, 204);
const ERROR_RED: Color32 = Color32::from_rgb(229, 57, 53);
const OK_GREEN: Color32 = Color32::from_rgb(67, 160, 71);

pub struct AppInit {
    pub runtime: Arc<Runtime>,
    pub backend: Arc<Backend>,
    pub config: Config,
    pub key_status: ApiKeyStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Chart,
    Screener,
    News,
}

impl View {
    fn next(self) -> Self {
        match self {
            View::Chart => View::Screener,
            View::Screener => View::News,
            View::News => View::Chart,
        }
    }

    fn label(self) -> &'static str {
        match self {
            View::Chart => "Chart",
            View::Screener => "Screener",
            View::News => "News",
        }
    }
}

enum NewsState {
    Idle,
    Loading,
    Loaded {
        articles: Arc<[Article]>,
        cache_age: i64,
    },
    Failed(String),
}

enum UiEvent {
    News {
        result: Result<Arc<[Article]>, String>,
        cache_age: i64,
    },
    SettingsSaved(Result<(), String>),
    ApiKeySaved(Result<(), String>),
}

pub struct MarkDockApp {
    ctx: egui::Context,
    runtime: Arc<Runtime>,
    backend: Arc<Backend>,
    events_tx: mpsc::UnboundedSender<UiEvent>,
    events_rx: mpsc::UnboundedReceiver<UiEvent>,
    symbol: String,
    symbol_input: String,
    theme: Theme,
    view: View,
    news: NewsState,
    feedback: Option<(bool, String)>,
    show_key_prompt: bool,
    key_input: String,
    key_feedback: Option<String>,
}

impl MarkDockApp {
    pub fn new(init: AppInit, ctx: egui::Context) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            ctx,
            runtime: init.runtime,
            backend: init.backend,
            events_tx,
            events_rx,
            symbol: init.config.symbol.clone(),
            symbol_input: init.config.symbol,
            theme: init.config.theme,
            view: View::Chart,
            news: NewsState::Idle,
            feedback: None,
            show_key_prompt: init.key_status == ApiKeyStatus::Missing,
            key_input: String::new(),
            key_feedback: None,
        }
    }

    fn apply_visuals(&self, ctx: &egui::Context) {
        let mut visuals = match self.theme {
            Theme::Dark => egui::Visuals::dark(),
            Theme::Light => egui::Visuals::light(),
        };
        visuals.hyperlink_color = ACCENT;
        visuals.selection.bg_fill = Color32::from_rgba_unmultiplied(0, 122, 204, 60);
        visuals.selection.stroke = Stroke::new(1.0, ACCENT);
        visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, ACCENT);
        visuals.widgets.noninteractive.rounding = Rounding::same(3.0);
        visuals.widgets.inactive.rounding = Rounding::same(3.0);
        visuals.widgets.hovered.rounding = Rounding::same(3.0);
        visuals.widgets.active.rounding = Rounding::same(3.0);
        ctx.set_visuals(visuals);
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                UiEvent::News { result, cache_age } => {
                    self.news = match result {
                        Ok(articles) => NewsState::Loaded {
                            articles,
                            cache_age,
                        },
                        Err(message) => NewsState::Failed(message),
                    };
                }
                UiEvent::SettingsSaved(Ok(())) => {
                    self.feedback = Some((true, "Settings saved".to_owned()));
                }
                UiEvent::SettingsSaved(Err(message)) => {
                    self.feedback = Some((false, message));
                }
                UiEvent::ApiKeySaved(Ok(())) => {
                    self.show_key_prompt = false;
                    self.key_input.clear();
                    self.key_feedback = None;
                    if self.view == View::News {
                        self.request_news(false);
                    }
                }
                UiEvent::ApiKeySaved(Err(message)) => {
                    self.key_feedback = Some(message);
                }
            }
        }
    }

    fn request_news(&mut self, force: bool) {
        if matches!(self.news, NewsState::Loading) {
            return;
        }
        self.news = NewsState::Loading;
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let ctx = self.ctx.clone();
        self.runtime.spawn(async move {
            let result = if force {
                backend.refresh_news().await
            } else {
                backend.fetch_news().await
            };
            let result = result.map_err(|err| {
                warn!(error = %err, "news request failed");
                err.to_string()
            });
            let cache_age = backend.cached_news_age().await;
            if tx.send(UiEvent::News { result, cache_age }).is_err() {
                warn!("ui event receiver dropped");
            }
            ctx.request_repaint();
        });
    }

    fn save_settings(&mut self) {
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let ctx = self.ctx.clone();
        let symbol = self.symbol.clone();
        let theme = self.theme;
        self.runtime.spawn(async move {
            let result = backend
                .save_settings(&symbol, theme)
                .await
                .map_err(|err| {
                    error!(error = %err, "failed to save settings");
                    format!("Could not save settings: {err}")
                });
            let _ = tx.send(UiEvent::SettingsSaved(result));
            ctx.request_repaint();
        });
    }

    fn save_api_key(&mut self) {
        let key = self.key_input.trim().to_owned();
        if key.is_empty() {
            self.key_feedback = Some("Please enter a key".to_owned());
            return;
        }
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let ctx = self.ctx.clone();
        self.runtime.spawn(async move {
            let result = backend
                .save_api_key(&key)
                .await
                .map_err(|err| format!("Could not save key: {err}"));
            let _ = tx.send(UiEvent::ApiKeySaved(result));
            ctx.request_repaint();
        });
    }

    fn apply_symbol(&mut self) {
        let symbol = self.symbol_input.trim().to_uppercase();
        if symbol.is_empty() {
            self.feedback = Some((false, "Symbol cannot be empty".to_owned()));
            return;
        }
        self.symbol_input = symbol.clone();
        self.symbol = symbol;
        self.save_settings();
    }

    fn draw_control_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("control_bar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.symbol_input)
                        .hint_text("EXCHANGE:SYMBOL")
                        .desired_width(180.0),
                );
                if response.changed() {
                    self.symbol_input = self.symbol_input.to_uppercase();
                }
                let submitted =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Apply").clicked() || submitted {
                    self.apply_symbol();
                }

                if let Some((ok, msg)) = &self.feedback {
                    let color = if *ok { OK_GREEN } else { ERROR_RED };
                    ui.label(RichText::new(msg.clone()).color(color).size(12.0));
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let theme_label = match self.theme {
                        Theme::Dark => "Light mode",
                        Theme::Light => "Dark mode",
                    };
                    if ui.button(theme_label).clicked() {
                        self.theme = self.theme.toggled();
                        self.save_settings();
                    }
                    let next = self.view.next();
                    if ui
                        .button(format!("View: {}", self.view.label()))
                        .on_hover_text(format!("Switch to {}", next.label()))
                        .clicked()
                    {
                        self.view = next;
                        if self.view == View::News && matches!(self.news, NewsState::Idle) {
                            self.request_news(false);
                        }
                    }
                    if ui.small_button("API key").clicked() {
                        self.show_key_prompt = true;
                    }
                });
            });
            ui.add_space(4.0);
        });
    }

    fn draw_main_content(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| match self.view {
            View::Chart => self.draw_widget_view(
                ui,
                "Advanced chart",
                chart_url(&self.symbol, self.theme),
            ),
            View::Screener => {
                self.draw_widget_view(ui, "Stock screener", screener_url(self.theme))
            }
            View::News => self.draw_news(ui),
        });
    }

    fn draw_widget_view(&self, ui: &mut egui::Ui, title: &str, url: Option<Url>) {
        ui.vertical_centered(|ui| {
            ui.add_space(60.0);
            ui.heading(RichText::new(title).size(20.0));
            ui.label(RichText::new(&self.symbol).strong().size(16.0));
            ui.add_space(10.0);
            match url {
                Some(url) => {
                    if ui.button("Open in browser").clicked() {
                        if let Err(err) = webbrowser::open(url.as_str()) {
                            warn!(error = %err, url = %url, "failed to open browser");
                        }
                    }
                    ui.label(RichText::new(url.as_str()).weak().size(12.0));
                }
                None => {
                    ui.label(RichText::new("Could not build widget URL").color(ERROR_RED));
                }
            }
        });
    }

    fn draw_news(&mut self, ui: &mut egui::Ui) {
        match &self.news {
            NewsState::Idle | NewsState::Loading => {
                ui.vertical_centered(|ui| {
                    ui.add_space(60.0);
                    ui.spinner();
                    ui.label("Loading news...");
                });
            }
            NewsState::Failed(message) => {
                let message = message.clone();
                ui.vertical_centered(|ui| {
                    ui.add_space(60.0);
                    ui.label(RichText::new(message).color(ERROR_RED));
                    if ui.button("Retry").clicked() {
                        self.request_news(false);
                    }
                });
            }
            NewsState::Loaded {
                articles,
                cache_age,
            } => {
                let articles = Arc::clone(articles);
                let cache_age = *cache_age;
                self.draw_news_list(ui, &articles, cache_age);
            }
        }
    }

    fn draw_news_list(&mut self, ui: &mut egui::Ui, articles: &[Article], cache_age: i64) {
        ui.horizontal(|ui| {
            ui.heading(RichText::new("Financial News").size(18.0));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("Refresh").clicked() {
                    self.request_news(true);
                }
                if let Some(label) = cache_age_label(cache_age) {
                    ui.label(RichText::new(label).weak().size(12.0))
                        .on_hover_text("Data cached to minimize API calls");
                }
                ui.label(RichText::new(format!("{} articles", articles.len())).size(13.0));
            });
        });
        ui.separator();

        if articles.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(50.0);
                ui.label(RichText::new("No articles available").size(16.0));
            });
            return;
        }

        let now = Utc::now();
        egui::ScrollArea::vertical()
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for article in articles {
                    egui::Frame::group(ui.style()).show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        if let Some(image_url) = card_image_url(article) {
                            ui.add(
                                egui::Image::new(image_url)
                                    .max_height(160.0)
                                    .max_width(ui.available_width())
                                    .rounding(Rounding::same(3.0)),
                            );
                        }
                        ui.horizontal_wrapped(|ui| {
                            ui.label(RichText::new(article.source()).weak().size(12.0));
                            if let Some(published) = article.published_at {
                                ui.label(RichText::new("•").weak().size(12.0));
                                ui.label(RichText::new(time_ago(published, now)).weak().size(12.0));
                            }
                        });
                        ui.hyperlink_to(
                            RichText::new(&article.title).strong().size(16.0),
                            &article.url,
                        );
                        if let Some(description) = &article.description {
                            ui.add(
                                egui::Label::new(RichText::new(description).size(13.0))
                                    .wrap(true),
                            );
                        }
                        if !article.categories.is_empty() {
                            ui.horizontal(|ui| {
                                for category in article.categories.iter().take(3) {
                                    ui.label(
                                        RichText::new(category)
                                            .size(11.0)
                                            .background_color(ui.visuals().faint_bg_color),
                                    );
                                }
                            });
                        }
                    });
                    ui.add_space(6.0);
                }
            });
    }

    fn draw_key_prompt(&mut self, ctx: &egui::Context) {
        if !self.show_key_prompt {
            return;
        }
        let mut open = true;
        egui::Window::new("News API key")
            .collapsible(false)
            .resizable(false)
            .open(&mut open)
            .show(ctx, |ui| {
                ui.label("Enter your Currents API key to load financial news.");
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.key_input)
                        .password(true)
                        .desired_width(280.0),
                );
                let submitted =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Save").clicked() || submitted {
                    self.save_api_key();
                }
                if let Some(message) = &self.key_feedback {
                    ui.label(RichText::new(message.clone()).color(ERROR_RED).size(12.0));
                }
            });
        if !open {
            self.show_key_prompt = false;
        }
    }
}

impl eframe::App for MarkDockApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        self.apply_visuals(ctx);
        self.draw_control_bar(ctx);
        self.draw_main_content(ctx);
        self.draw_key_prompt(ctx);
    }
}

fn chart_url(symbol: &str, theme: Theme) -> Option<Url> {
    Url::parse_with_params(
        "https://www.tradingview.com/chart/",
        &[("symbol", symbol), ("theme", theme.as_str())],
    )
    .ok()
}

fn screener_url(theme: Theme) -> Option<Url> {
    Url::parse_with_params(
        "https://www.tradingview.com/screener/",
        &[("theme", theme.as_str())],
    )
    .ok()
}

/// Only absolute http(s) links are handed to the image loader.
fn card_image_url(article: &Article) -> Option<&str> {
    let raw = article.image_url.as_deref()?;
    let parsed = Url::parse(raw).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(raw)
}
