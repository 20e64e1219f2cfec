pub mod downloader;
pub mod settings;

#[cfg(feature = "desktop")]
mod commands;

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use tauri::Manager;

    tauri::Builder::default()
        .plugin(
            tauri_plugin_log::Builder::default()
                .level(log::LevelFilter::Info)
                .level_for("tao", log::LevelFilter::Error)
                .level_for("video_downloader_lib", log::LevelFilter::Debug)
                .build(),
        )
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let settings = settings::AppSettings::load();
            log::info!(
                "[App] saving downloads to {}",
                settings.resolved_output_dir().display()
            );
            app.manage(commands::AppState::new(settings));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::classify_url,
            commands::download_video,
            commands::get_tools_status,
            commands::open_output_dir,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
