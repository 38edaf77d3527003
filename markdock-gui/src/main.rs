mod app;

use std::sync::Arc;

use eframe::{egui, NativeOptions};
use markdock_core::{Backend, SettingsStore};
use reqwest::{redirect, ClientBuilder};
use tokio::runtime::Runtime;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::app::{AppInit, MarkDockApp};

fn main() -> eframe::Result<()> {
    init_tracing();

    let runtime = Arc::new(Runtime::new().expect("failed to initialise Tokio runtime"));
    let client = ClientBuilder::new()
        .redirect(redirect::Policy::limited(5))
        .user_agent("MarkDock/0.1")
        .build()
        .expect("failed to build HTTP client");

    let store = open_settings_store();
    let backend = Arc::new(runtime.block_on(Backend::new(store, client)));
    let key_status = runtime.block_on(backend.startup());
    let config = runtime.block_on(backend.load_settings());

    let init = AppInit {
        runtime,
        backend,
        config,
        key_status,
    };

    eframe::run_native(
        "MarkDock",
        NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([1024.0, 1024.0])
                .with_min_inner_size([640.0, 480.0]),
            ..Default::default()
        },
        Box::new(move |cc| {
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Box::new(MarkDockApp::new(init, cc.egui_ctx.clone()))
        }),
    )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn open_settings_store() -> SettingsStore {
    match SettingsStore::open_default() {
        Ok(store) => store,
        Err(err) => {
            // No platform config dir: keep settings next to the working directory.
            warn!(error = %err, "falling back to local settings file");
            SettingsStore::open("markdock-config.json")
        }
    }
}
