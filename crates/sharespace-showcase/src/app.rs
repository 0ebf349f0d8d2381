use std::path::PathBuf;

use egui::{
    Align, Color32, FontFamily, FontId, Frame, Layout, Margin, RichText,
    ScrollArea, Stroke, Vec2,
};
use tokio::sync::mpsc;

use crate::controller::{Control, Example, InfoBlock, PanelSection, UiAction};
use crate::session::SessionCommand;
use crate::state::{Phase, SharedState};

// ── Colours ───────────────────────────────────────────────────────────────────

const BG_PANEL:  Color32 = Color32::from_rgb(28,  30,  36);
const BG_INSET:  Color32 = Color32::from_rgb(20,  22,  28);
const BG_CARD:   Color32 = Color32::from_rgb(36,  38,  46);
const ACCENT:    Color32 = Color32::from_rgb(99, 144, 255);
const TEXT_DIM:  Color32 = Color32::from_rgb(130, 135, 148);
const TEXT_NORM: Color32 = Color32::from_rgb(210, 215, 230);
const ERROR_RED: Color32 = Color32::from_rgb(220, 100, 100);

// ── App struct ────────────────────────────────────────────────────────────────

pub struct ShowcaseApp {
    state:            SharedState,
    cmd_tx:           mpsc::Sender<SessionCommand>,
    example:          Example,
    /// Contents of the BVH path field.
    file_path:        String,
    auto_scroll_logs: bool,
}

impl ShowcaseApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        state: SharedState,
        cmd_tx: mpsc::Sender<SessionCommand>,
        example: Example,
    ) -> Self {
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill               = BG_PANEL;
        visuals.panel_fill                = BG_PANEL;
        visuals.extreme_bg_color          = BG_INSET;
        visuals.faint_bg_color            = BG_CARD;
        visuals.widgets.inactive.bg_fill  = BG_CARD;
        visuals.widgets.hovered.bg_fill   = Color32::from_rgb(50, 53, 65);
        visuals.widgets.active.bg_fill    = Color32::from_rgb(65, 68, 82);
        cc.egui_ctx.set_visuals(visuals);

        let mut style = (*cc.egui_ctx.style()).clone();
        style.text_styles.insert(
            egui::TextStyle::Body,
            FontId::new(14.0, FontFamily::Proportional),
        );
        style.text_styles.insert(
            egui::TextStyle::Button,
            FontId::new(13.5, FontFamily::Proportional),
        );
        cc.egui_ctx.set_style(style);

        Self {
            state,
            cmd_tx,
            example,
            file_path: String::new(),
            auto_scroll_logs: true,
        }
    }

    fn dispatch(&self, action: UiAction) {
        if let Err(e) = self.cmd_tx.try_send(SessionCommand::Dispatch(action)) {
            tracing::warn!("UI action dropped: {}", e);
            self.state.lock().unwrap().push_log(format!("[WARN] UI action dropped: {e}"));
        }
    }
}

impl Drop for ShowcaseApp {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(SessionCommand::Shutdown);
    }
}

// ── eframe::App implementation ────────────────────────────────────────────────

impl eframe::App for ShowcaseApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Snapshot state to avoid holding the lock across rendering
        let snap = {
            let s = self.state.lock().unwrap();
            StateSnapshot {
                phase:        s.phase.clone(),
                motion_label: s.motion_label(),
                motion_error: s.motion_error.clone(),
                playing:      s.playing,
                frames_sent:  s.frames_sent,
                logs:         s.logs.iter().cloned().collect(),
            }
        };

        egui::TopBottomPanel::top("header")
            .frame(Frame::none().fill(BG_PANEL).inner_margin(Margin::symmetric(10.0, 8.0)))
            .show(ctx, |ui| {
                self.render_header(ui, &snap);
            });

        let panel = self.example.panel();
        if !panel.is_empty() {
            let mut clicked = None;
            egui::SidePanel::left("settings")
                .resizable(true)
                .default_width(280.0)
                .frame(Frame::none().fill(BG_CARD).inner_margin(Margin::symmetric(12.0, 10.0)))
                .show(ctx, |ui| {
                    ScrollArea::vertical().id_salt("settings_scroll").show(ui, |ui| {
                        for section in &panel {
                            if let Some(action) = self.render_section(ui, section, &snap) {
                                clicked = Some(action);
                            }
                            ui.add_space(12.0);
                        }
                    });
                });
            if let Some(action) = clicked {
                self.dispatch(action);
            }
        }

        egui::CentralPanel::default()
            .frame(Frame::none().fill(BG_PANEL).inner_margin(Margin::symmetric(12.0, 10.0)))
            .show(ctx, |ui| {
                ui.set_min_size(Vec2::new(420.0, 480.0));

                render_status_card(ui, &snap);
                ui.add_space(10.0);

                let blocks = self.example.instructions();
                if !blocks.is_empty() {
                    card(ui, |ui| render_instructions(ui, &blocks));
                    ui.add_space(10.0);
                }

                render_log_panel(ui, &snap.logs, &mut self.auto_scroll_logs);
            });

        // Frame counter and connection state change without input events.
        ctx.request_repaint_after(std::time::Duration::from_millis(250));
    }
}

// ── Rendering helpers ─────────────────────────────────────────────────────────

impl ShowcaseApp {
    fn render_header(&mut self, ui: &mut egui::Ui, snap: &StateSnapshot) {
        ui.horizontal(|ui| {
            ui.label(
                RichText::new("Sharespace")
                    .font(FontId::new(24.0, FontFamily::Proportional))
                    .strong()
                    .color(Color32::WHITE),
            );
            ui.label(
                RichText::new("Showcase")
                    .font(FontId::new(24.0, FontFamily::Proportional))
                    .color(ACCENT),
            );
            ui.add_space(16.0);

            egui::ComboBox::from_label(RichText::new("Example").color(TEXT_DIM))
                .selected_text(self.example.name())
                .width(200.0)
                .show_ui(ui, |ui| {
                    for example in Example::ALL {
                        ui.selectable_value(&mut self.example, example, example.name());
                    }
                });

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(
                    RichText::new(snap.phase.label())
                        .font(FontId::new(12.5, FontFamily::Proportional))
                        .color(TEXT_NORM),
                );
                let (rect, _) = ui.allocate_exact_size(Vec2::splat(12.0), egui::Sense::hover());
                ui.painter().circle_filled(rect.center(), 5.0, snap.phase.color());
            });
        });
    }

    /// Draws one settings section and returns the action of a clicked control.
    fn render_section(
        &mut self,
        ui: &mut egui::Ui,
        section: &PanelSection,
        snap: &StateSnapshot,
    ) -> Option<UiAction> {
        let mut clicked = None;

        if let Some(title) = section.title {
            ui.label(RichText::new(title).strong().color(TEXT_NORM));
        }
        if let Some(note) = section.note {
            ui.label(
                RichText::new(note)
                    .color(TEXT_DIM)
                    .font(FontId::new(12.0, FontFamily::Proportional)),
            );
        }
        ui.add_space(4.0);

        ui.horizontal_wrapped(|ui| {
            for control in &section.controls {
                match control {
                    Control::Button { label, action } => {
                        let button = egui::Button::new(label.as_str())
                            .fill(BG_INSET)
                            .stroke(Stroke::new(1.0, Color32::from_rgb(60, 65, 80)));
                        if ui.add_enabled(action.enabled(snap.playing), button).clicked() {
                            clicked = Some(action.clone());
                        }
                    }
                    Control::Portrait { label, action } => {
                        let tile = egui::Button::new(
                            RichText::new(label.as_str())
                                .font(FontId::new(18.0, FontFamily::Proportional))
                                .color(Color32::WHITE),
                        )
                        .fill(BG_INSET)
                        .stroke(Stroke::new(1.0, ACCENT));
                        if ui.add_sized([110.0, 90.0], tile).clicked() {
                            clicked = Some(action.clone());
                        }
                    }
                    Control::FilePicker => {
                        ui.end_row();
                        ui.add(
                            egui::TextEdit::singleline(&mut self.file_path)
                                .hint_text("path/to/motion.bvh")
                                .desired_width(170.0),
                        );
                        let path = self.file_path.trim();
                        if ui
                            .add_enabled(!path.is_empty(), egui::Button::new("Select a file"))
                            .clicked()
                        {
                            clicked = Some(UiAction::LoadMotionFile(PathBuf::from(path)));
                        }
                    }
                    Control::MotionFileLabel => {
                        ui.end_row();
                        ui.vertical(|ui| {
                            ui.label(
                                RichText::new(&snap.motion_label)
                                    .color(TEXT_NORM)
                                    .font(FontId::new(12.5, FontFamily::Proportional)),
                            );
                            if let Some(err) = &snap.motion_error {
                                ui.label(
                                    RichText::new(err)
                                        .color(ERROR_RED)
                                        .font(FontId::new(12.0, FontFamily::Proportional)),
                                );
                            }
                        });
                    }
                }
            }
        });

        clicked
    }
}

fn render_status_card(ui: &mut egui::Ui, snap: &StateSnapshot) {
    card(ui, |ui| {
        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(Vec2::splat(12.0), egui::Sense::hover());
            ui.painter().circle_filled(rect.center(), 5.0, snap.phase.color());

            ui.label(RichText::new(snap.phase.label()).strong().color(TEXT_NORM));

            match &snap.phase {
                Phase::Connecting { attempt } if *attempt > 0 => {
                    ui.label(RichText::new(format!("(attempt {})", attempt + 1)).color(TEXT_DIM));
                }
                Phase::Connected { host, session_id } => {
                    ui.label(RichText::new(host).color(Color32::WHITE).strong());
                    ui.label(
                        RichText::new(format!("session {session_id}"))
                            .color(TEXT_DIM)
                            .font(FontId::new(11.5, FontFamily::Monospace)),
                    );
                }
                Phase::Disconnected(reason) => {
                    ui.label(
                        RichText::new(format!(": {reason}"))
                            .color(ERROR_RED)
                            .font(FontId::new(12.0, FontFamily::Proportional)),
                    );
                }
                _ => {}
            }
        });

        if snap.playing {
            ui.add_space(4.0);
            ui.label(
                RichText::new(format!("Streaming motion: {} frames sent", snap.frames_sent))
                    .color(ACCENT)
                    .font(FontId::new(12.5, FontFamily::Proportional)),
            );
        }
    });
}

fn render_instructions(ui: &mut egui::Ui, blocks: &[InfoBlock]) {
    let mut step = 0;
    for block in blocks {
        match block {
            InfoBlock::Heading(text) => {
                ui.add_space(4.0);
                ui.label(
                    RichText::new(*text)
                        .font(FontId::new(17.0, FontFamily::Proportional))
                        .strong()
                        .color(Color32::WHITE),
                );
                step = 0;
            }
            InfoBlock::Paragraph(text) => {
                ui.label(RichText::new(*text).color(TEXT_NORM));
            }
            InfoBlock::Step(text) => {
                step += 1;
                ui.label(RichText::new(format!("{step}. {text}")).color(TEXT_NORM));
            }
            InfoBlock::Code(text) => {
                Frame::none()
                    .fill(BG_INSET)
                    .inner_margin(Margin::symmetric(8.0, 4.0))
                    .rounding(egui::Rounding::same(4.0))
                    .show(ui, |ui| {
                        ui.label(
                            RichText::new(*text)
                                .font(FontId::new(12.0, FontFamily::Monospace))
                                .color(Color32::from_rgb(120, 180, 120)),
                        );
                    });
            }
        }
        ui.add_space(3.0);
    }
}

fn render_log_panel(ui: &mut egui::Ui, logs: &[String], auto_scroll: &mut bool) {
    ui.horizontal(|ui| {
        ui.label(
            RichText::new("Log")
                .color(TEXT_DIM)
                .font(FontId::new(12.0, FontFamily::Proportional)),
        );
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            ui.checkbox(
                auto_scroll,
                RichText::new("auto-scroll").color(TEXT_DIM).font(FontId::new(11.5, FontFamily::Proportional)),
            );
        });
    });
    ui.add_space(3.0);

    let log_height = (ui.available_size().y - 20.0).max(120.0);

    Frame::none()
        .fill(BG_INSET)
        .inner_margin(Margin::symmetric(8.0, 6.0))
        .stroke(Stroke::new(1.0, Color32::from_rgb(45, 48, 60)))
        .rounding(egui::Rounding::same(6.0))
        .show(ui, |ui| {
            ScrollArea::vertical()
                .id_salt("log_scroll")
                .max_height(log_height)
                .auto_shrink([false, false])
                .stick_to_bottom(*auto_scroll)
                .show(ui, |ui| {
                    ui.set_min_width(ui.available_width());
                    for line in logs {
                        let color = if line.starts_with("[ERROR]") {
                            Color32::from_rgb(220, 80, 70)
                        } else if line.starts_with("[WARN]") {
                            Color32::from_rgb(220, 165, 50)
                        } else if line.starts_with("[HOST]") {
                            ACCENT
                        } else {
                            Color32::from_rgb(160, 170, 185)
                        };
                        ui.label(
                            RichText::new(line)
                                .font(FontId::new(11.5, FontFamily::Monospace))
                                .color(color),
                        );
                    }
                });
        });
}

// ── Utilities ─────────────────────────────────────────────────────────────────

fn card(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui)) {
    Frame::none()
        .fill(BG_CARD)
        .inner_margin(Margin::symmetric(12.0, 10.0))
        .rounding(egui::Rounding::same(8.0))
        .stroke(Stroke::new(1.0, Color32::from_rgb(50, 53, 68)))
        .show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            add_contents(ui);
        });
}

// ── Snapshot (to avoid holding lock during paint) ─────────────────────────────

struct StateSnapshot {
    phase:        Phase,
    motion_label: String,
    motion_error: Option<String>,
    playing:      bool,
    frames_sent:  u64,
    logs:         Vec<String>,
}
