use crate::config::{STRIP_GAP_RANGE, Settings, THUMB_HEIGHT_RANGE};
use crate::file_picker;
use crate::folder_panel::{FolderPanel, PanelAction};
use crate::loader::{AssetSource, FolderJob, LoadEvent, Loader, MANIFEST_FILE};
use crate::manifest::{AdjustmentPatch, Manifest};
use crate::overlay::Overlay;
use crate::strip::number_label;

struct Notice {
    text: String,
    is_error: bool,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// The editor: one section per manifest folder plus the shared overlay.
pub struct EditorApp {
    settings: Settings,
    // Edited in the menu, applied by Reload.
    pending: Settings,

    loader: Loader,
    manifest: Option<Manifest>,
    panels: Vec<FolderPanel>,
    overlay: Overlay,

    startup_error: Option<String>,
    notice: Option<Notice>,
}

impl EditorApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>, data_dir: Option<String>) -> Self {
        // Note that you must enable the `persistence` feature for this to work.
        let stored = cc
            .storage
            .and_then(|storage| eframe::get_value::<Settings>(storage, eframe::APP_KEY));
        let settings = Settings::resolve(stored, data_dir);

        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let loader = Loader::new(cc.egui_ctx.clone(), AssetSource::new(settings.data_dir.clone()));
        loader.fetch_manifest();

        Self {
            pending: settings.clone(),
            settings,
            loader,
            manifest: None,
            panels: Vec::new(),
            overlay: Overlay::new(egui::vec2(1280.0, 800.0)),
            startup_error: None,
            notice: None,
        }
    }

    /// Run the app with provided NativeOptions.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn run(options: eframe::NativeOptions, data_dir: Option<String>) -> Result<(), eframe::Error> {
        eframe::run_native(
            "folder_tuner",
            options,
            Box::new(|cc| Ok(Box::new(EditorApp::new(cc, data_dir)))),
        )
    }

    /// Drop everything loaded so far and start again from the manifest.
    fn reload(&mut self, ctx: &egui::Context) {
        self.settings = Settings::resolve(Some(self.pending.clone()), None);
        self.pending = self.settings.clone();
        log::info!("Reloading from {}", self.settings.data_dir);

        // Events still in flight for the old loader are dropped with its channel.
        self.loader = Loader::new(ctx.clone(), AssetSource::new(self.settings.data_dir.clone()));
        self.manifest = None;
        self.panels.clear();
        self.overlay.close();
        self.startup_error = None;
        self.loader.fetch_manifest();
    }

    fn start_build(&mut self, manifest: Manifest) {
        let mut jobs = Vec::with_capacity(manifest.len());
        for (name, entry) in manifest.iter() {
            match FolderPanel::new(name, entry, self.settings.thumb_height as f32, self.settings.strip_gap) {
                Ok(panel) => {
                    jobs.push(FolderJob {
                        folder: name.to_owned(),
                        files: entry.files.clone(),
                    });
                    self.panels.push(panel);
                }
                Err(e) => log::error!("Skipping folder: {e}"),
            }
        }
        log::info!("Manifest has {} folder(s), building {}", manifest.len(), jobs.len());
        self.loader.build_folders(jobs, self.settings.thumb_height);
        self.manifest = Some(manifest);
    }

    fn panel_mut(&mut self, folder: &str) -> Option<&mut FolderPanel> {
        self.panels.iter_mut().find(|p| p.name() == folder)
    }

    fn handle_event(&mut self, ctx: &egui::Context, event: LoadEvent) {
        match event {
            LoadEvent::Manifest(Ok(manifest)) => self.start_build(manifest),
            LoadEvent::Manifest(Err(e)) => {
                log::error!("Error loading {MANIFEST_FILE}: {e}");
                self.startup_error = Some(format!("Failed to load {}: {e}", self.loader.source().manifest_path()));
            }
            LoadEvent::FolderStarted { folder } => {
                if let Some(panel) = self.panel_mut(&folder) {
                    panel.start_loading();
                }
            }
            LoadEvent::Thumbnail {
                folder,
                index,
                file,
                image,
            } => {
                if let Some(panel) = self.panel_mut(&folder) {
                    panel.add_thumbnail(ctx, index, &file, image);
                }
            }
            LoadEvent::ThumbnailFailed {
                folder,
                index,
                path,
                error,
            } => {
                log::error!("Error loading image {path}: {error}");
                if let Some(panel) = self.panel_mut(&folder) {
                    panel.mark_failed(index);
                }
            }
            LoadEvent::FolderFinished { folder } => {
                log::debug!("Finished {folder}");
                if let Some(panel) = self.panel_mut(&folder) {
                    panel.finish_loading();
                }
            }
            LoadEvent::FullImage { request, result } => self.overlay.finish_loading(ctx, request, result),
        }
    }

    /// Copy exposure and hsv values from a user-picked document.
    fn apply_loaded_json(&mut self, text: &str) {
        let Some(manifest) = &mut self.manifest else {
            self.notice = Some(Notice::error("Nothing to apply it to yet, the manifest is not loaded."));
            return;
        };

        match AdjustmentPatch::from_json_str(text) {
            Ok(patch) => {
                let touched = manifest.apply_patch(&patch);
                for name in &touched {
                    let panel = self.panels.iter_mut().find(|p| p.name() == name);
                    if let (Some(panel), Some(entry)) = (panel, manifest.folder(name)) {
                        panel.sync_sliders(entry);
                        panel.refresh_filters(entry);
                    }
                }
                log::info!("Applied {} of {} folder(s) from file", touched.len(), patch.len());
                self.notice = Some(Notice::info("JSON loaded successfully!"));
            }
            Err(e) => {
                log::warn!("Rejected picked file: {e}");
                self.notice = Some(Notice::error("Invalid JSON file."));
            }
        }
    }

    fn save_manifest(&mut self) {
        let Some(manifest) = &self.manifest else {
            return;
        };
        let result = manifest
            .to_pretty_json()
            .and_then(|text| file_picker::save_json(MANIFEST_FILE, &text));
        if let Err(e) = result {
            log::error!("Saving failed: {e}");
            self.notice = Some(Notice::error(format!("Saving failed: {e}")));
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        egui::MenuBar::new().ui(ui, |ui| {
            // NOTE: no File->Quit on web pages!
            let is_web = cfg!(target_arch = "wasm32");
            ui.menu_button("File", |ui| {
                if ui.button("Load…").clicked() {
                    file_picker::open_json_picker();
                    ui.close();
                }
                if ui.add_enabled(self.manifest.is_some(), egui::Button::new("Save")).clicked() {
                    self.save_manifest();
                    ui.close();
                }
                if !is_web {
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                }
            });

            ui.menu_button("Settings", |ui| {
                ui.horizontal(|ui| {
                    ui.label("Data directory:");
                    ui.text_edit_singleline(&mut self.pending.data_dir);
                });
                ui.horizontal(|ui| {
                    ui.label("Thumbnail height:");
                    ui.add(egui::DragValue::new(&mut self.pending.thumb_height).range(THUMB_HEIGHT_RANGE));
                });
                ui.horizontal(|ui| {
                    ui.label("Gap:");
                    ui.add(egui::DragValue::new(&mut self.pending.strip_gap).range(STRIP_GAP_RANGE));
                });
                if ui.button("Reload").clicked() {
                    self.reload(ctx);
                    ui.close();
                }
            });
            ui.add_space(16.0);

            egui::widgets::global_theme_preference_buttons(ui);

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                egui::warn_if_debug_build(ui);
                if let Some(manifest) = &self.manifest {
                    ui.weak(format!("{} folder(s) in {}", manifest.len(), self.settings.data_dir));
                }
            });
        });
    }

    fn show_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = &self.notice else {
            return;
        };
        let mut open = true;
        let mut dismissed = false;
        egui::Window::new("Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .open(&mut open)
            .show(ctx, |ui| {
                if notice.is_error {
                    ui.colored_label(ui.visuals().error_fg_color, &notice.text);
                } else {
                    ui.label(&notice.text);
                }
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if !open || dismissed {
            self.notice = None;
        }
    }

    fn show_folders(&mut self, ui: &mut egui::Ui) {
        if let Some(err) = &self.startup_error {
            ui.colored_label(ui.visuals().error_fg_color, err);
            ui.label("Check the data directory under Settings and press Reload.");
            return;
        }
        let Some(manifest) = &mut self.manifest else {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(format!("Loading {}…", self.loader.source().manifest_path()));
            });
            return;
        };

        let mut clicked = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for panel in &mut self.panels {
                let Some(entry) = manifest.folder_mut(panel.name()) else {
                    continue;
                };
                if let Some(PanelAction::OpenImage { index, file }) = panel.show(ui, entry) {
                    clicked = Some((panel.name().to_owned(), panel.filters(), index, file));
                }
                ui.separator();
            }
        });

        if let Some((folder, filters, index, file)) = clicked {
            log::info!("Opening image {} of {folder}", number_label(index));
            let path = self.loader.source().image_path(&folder, &file);
            self.overlay.open(&self.loader, path, filters);
        }
    }
}

impl eframe::App for EditorApp {
    /// Called by the framework to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.settings);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        for event in self.loader.poll() {
            self.handle_event(ctx, event);
        }
        match file_picker::take_selected_json() {
            Some(Ok(text)) => self.apply_loaded_json(&text),
            Some(Err(e)) => {
                log::warn!("Could not read picked file: {e}");
                self.notice = Some(Notice::error(format!("Could not read the file: {e}")));
            }
            None => {}
        }
        if self.overlay.is_open() && ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.overlay.close();
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            self.menu_bar(ctx, ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.overlay.is_open() {
                self.overlay.show(ui);
            } else {
                self.overlay.set_viewport(ui.available_size());
                self.show_folders(ui);
            }
        });

        self.show_notice(ctx);
    }
}
