#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

#[cfg(not(target_arch = "wasm32"))]
#[derive(clap::Parser)]
#[command(version, about = "Tune exposure and colour of photo folders listed in data.json")]
struct Cli {
    /// Directory holding data.json and one sub-directory per folder.
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(clap::Subcommand)]
enum Command {
    /// Rebuild data.json from the folders and images on disk.
    Sync {
        /// Start from an empty manifest instead of the existing data.json.
        #[arg(long)]
        overwrite: bool,
    },
}

// When compiling natively:
#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use clap::Parser as _;
    use std::process::ExitCode;

    // Log to stderr (if you run with `RUST_LOG=debug`).
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Sync { overwrite }) => {
            let data_dir = cli
                .data_dir
                .unwrap_or_else(|| folder_tuner::config::DEFAULT_DATA_DIR.to_owned());
            match folder_tuner::sync::sync_manifest(std::path::Path::new(&data_dir), overwrite) {
                Ok(_) => ExitCode::SUCCESS,
                Err(e) => {
                    log::error!("Sync failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        None => {
            let native_options = eframe::NativeOptions {
                viewport: egui::ViewportBuilder::default()
                    .with_inner_size([1280.0, 900.0])
                    .with_min_inner_size([480.0, 320.0]),
                ..Default::default()
            };
            match folder_tuner::EditorApp::run(native_options, cli.data_dir) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    log::error!("Failed to start the editor: {e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

// When compiling to web using trunk:
#[cfg(target_arch = "wasm32")]
fn main() {
    use eframe::wasm_bindgen::JsCast as _;

    // Redirect `log` message to `console.log` and friends:
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();

    let web_options = eframe::WebOptions::default();

    wasm_bindgen_futures::spawn_local(async {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document to start in");
            return;
        };

        let Some(canvas) = document
            .get_element_by_id("the_canvas_id")
            .and_then(|el| el.dyn_into::<web_sys::HtmlCanvasElement>().ok())
        else {
            log::error!("the_canvas_id is missing or not a canvas");
            return;
        };

        let start_result = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| Ok(Box::new(folder_tuner::EditorApp::new(cc, None)))),
            )
            .await;

        // Remove the loading text and spinner:
        if let Some(loading_text) = document.get_element_by_id("loading_text") {
            match start_result {
                Ok(_) => {
                    loading_text.remove();
                }
                Err(e) => {
                    loading_text.set_inner_html("<p> The app has crashed. See the developer console for details. </p>");
                    log::error!("Failed to start eframe: {e:?}");
                }
            }
        }
    });
}
