pub mod config;
pub mod dispatcher;
pub mod error;
pub mod processor;
pub mod session;

#[cfg(feature = "desktop")]
mod commands;

pub use config::RetouchConfig;
pub use dispatcher::{Command, CommandDispatcher, KeyChord};
pub use error::RetouchError;
pub use processor::{HttpProcessor, RemoteProcessor};
pub use session::{Outcome, Refusal, SessionController, SessionView};

#[cfg(feature = "desktop")]
pub fn run() {
    use tauri::Manager;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tauri::Builder::default()
        .plugin(tauri_plugin_store::Builder::new().build())
        .invoke_handler(tauri::generate_handler![
            commands::config::get_config,
            commands::config::get_preference,
            commands::config::set_preference,
            commands::health::run_health_check,
            commands::session::get_session,
            commands::session::load_image,
            commands::session::update_draft,
            commands::session::run_command,
            commands::session::handle_key,
            commands::session::export_image,
        ])
        .setup(|app| {
            let mut config = RetouchConfig::load().unwrap_or_else(|e| {
                tracing::warn!("{}, falling back to defaults", e);
                RetouchConfig::default()
            });
            if std::env::var(config::PROCESSOR_URL_ENV).is_err() {
                commands::config::apply_stored_url(app.handle(), &mut config);
            }

            let processor = HttpProcessor::new(&config)?;
            let export_dir = dirs::download_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(std::env::temp_dir);
            let controller = SessionController::new(processor, &config);
            app.manage(CommandDispatcher::new(controller, export_dir));
            app.manage(config);

            // Initial connectivity probe for the status badge
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                let dispatcher = handle.state::<commands::session::AppDispatcher>();
                dispatcher.dispatch(Command::CheckConnection).await;
            });
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
