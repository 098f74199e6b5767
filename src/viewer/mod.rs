use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use eframe::egui;
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::bridge::run_bridge;
use crate::config::SurfaceSettings;
use crate::document::template::TemplateSpec;
use crate::document::{NodeId, NodeRole, VisualTree};
use crate::drag::{DRAG_OVER_CLASS, DRAGGING_CLASS, DragController, DragPhase, VerticalSpan};
use crate::gateway::{HostPort, MessageGateway, Surface, resume_data_message};

const APP_TITLE: &str = "resume_surface";
const SIDEBAR_REGION: &str = "sidebar";
const DRAG_HANDLE: &str = "⠿";
const DRAGGING_OPACITY: f32 = 0.5;
const REPAINT_INTERVAL: Duration = Duration::from_millis(60);

pub fn run_viewer(
    settings: &SurfaceSettings,
    template: TemplateSpec,
    initial_payload: Option<Value>,
) -> Result<()> {
    let runtime_handle = Handle::try_current().context("viewer requires a tokio runtime")?;
    let (host, gateway) = MessageGateway::install();

    if let Some(payload) = initial_payload {
        host.post(resume_data_message(payload));
    }
    if let Some(bind) = settings.bridge_bind.clone() {
        spawn_bridge(&runtime_handle, host.clone(), bind);
    }

    let surface = Surface::new(&template, settings.rebind_delay);
    info!(
        regions = template.regions.len(),
        rebind_delay_ms = settings.rebind_delay.as_millis() as u64,
        bridge = settings.bridge_bind.as_deref().unwrap_or("<disabled>"),
        "starting resume viewer"
    );

    eframe::run_native(
        APP_TITLE,
        eframe::NativeOptions::default(),
        Box::new(move |_cc| Ok(Box::new(ViewerApp::new(surface, gateway, host)))),
    )
    .map_err(|error| anyhow::anyhow!("viewer UI exited with error: {error}"))
}

fn spawn_bridge(handle: &Handle, host: HostPort, bind: String) {
    let _task = handle.spawn(async move {
        if let Err(error) = run_bridge(host, &bind).await {
            warn!(bind = %bind, error = %format!("{error:#}"), "host bridge stopped");
        }
    });
}

#[derive(Debug, Default)]
struct FrameSignals {
    edits: Vec<(NodeId, String)>,
    drag_started: Option<NodeId>,
    drag_stopped: bool,
    hit_rects: Vec<(NodeId, egui::Rect)>,
}

struct ViewerApp {
    surface: Surface,
    gateway: MessageGateway,
    // Held so the listener stays connected when no bridge is running.
    _host: HostPort,
    status: String,
}

impl ViewerApp {
    fn new(surface: Surface, gateway: MessageGateway, host: HostPort) -> Self {
        Self {
            surface,
            gateway,
            _host: host,
            status: "Waiting for resume data".to_owned(),
        }
    }

    fn pump(&mut self, now: Instant) {
        let consumed = self.gateway.drain(&mut self.surface, now);
        if consumed > 0 {
            self.status = format!("Rendered delivery {}", self.surface.deliveries());
        }
        if self.surface.tick(now) {
            self.status = format!(
                "Rendered delivery {} ({} drag handles)",
                self.surface.deliveries(),
                self.surface.drag().binding_count()
            );
        }
    }

    fn apply_signals(&mut self, ctx: &egui::Context, signals: FrameSignals) {
        for (node, text) in signals.edits {
            self.surface.edit_text(node, text);
        }

        if let Some(node) = signals.drag_started {
            let outcome = self.surface.start_drag(node);
            tracing::debug!(node = node.get(), ?outcome, "drag handle pressed");
        }

        if self.surface.drag().phase() != DragPhase::Dragging {
            return;
        }

        let pointer = ctx.pointer_interact_pos();
        let target = pointer.and_then(|pos| pick_target(&signals.hit_rects, pos));

        if ctx.input(|input| input.key_pressed(egui::Key::Escape)) {
            self.surface.cancel_drag();
            return;
        }

        if let (Some(pos), Some((hovered, _))) = (pointer, target) {
            let hit_rects = &signals.hit_rects;
            self.surface
                .hover_drag(hovered, pos.y, |id| span_of(hit_rects, id));
        }

        if signals.drag_stopped {
            let outcome = self.surface.release_drag(target.map(|(node, _)| node));
            self.status = format!("Drag finished: {outcome:?}");
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump(Instant::now());

        let mut signals = FrameSignals::default();
        let tree = self.surface.tree();
        let drag = self.surface.drag();

        egui::TopBottomPanel::bottom("viewer_status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                ui.separator();
                ui.label(format!("Drag: {:?}", drag.phase()));
                if self.gateway.is_disconnected() {
                    ui.colored_label(
                        egui::Color32::from_rgb(173, 33, 33),
                        "Host disconnected",
                    );
                }
            });
        });

        if let Some(sidebar) = tree.region(SIDEBAR_REGION) {
            egui::SidePanel::left("resume_sidebar")
                .resizable(true)
                .default_width(280.0)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        draw_children(ui, tree, drag, sidebar, &mut signals);
                    });
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                for region in tree.children(tree.root()) {
                    let is_sidebar = tree
                        .get(*region)
                        .is_some_and(|node| node.name.as_deref() == Some(SIDEBAR_REGION));
                    if !is_sidebar {
                        draw_children(ui, tree, drag, *region, &mut signals);
                    }
                }
            });
        });

        self.apply_signals(ctx, signals);
        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}

fn draw_children(
    ui: &mut egui::Ui,
    tree: &VisualTree,
    drag: &DragController,
    parent: NodeId,
    signals: &mut FrameSignals,
) {
    for child in tree.children(parent) {
        draw_node(ui, tree, drag, *child, signals);
    }
}

fn draw_node(
    ui: &mut egui::Ui,
    tree: &VisualTree,
    drag: &DragController,
    id: NodeId,
    signals: &mut FrameSignals,
) {
    let Some(node) = tree.get(id) else {
        return;
    };
    if node.hidden {
        return;
    }

    match node.role() {
        NodeRole::Root | NodeRole::Region => draw_children(ui, tree, drag, id, signals),
        NodeRole::Section | NodeRole::Item => {
            let highlighted = node.has_class(DRAG_OVER_CLASS);
            let mut frame = egui::Frame::group(ui.style());
            if highlighted {
                frame = frame.stroke(egui::Stroke::new(2.0, ui.visuals().selection.bg_fill));
            }
            let response = frame
                .show(ui, |ui| {
                    if node.has_class(DRAGGING_CLASS) {
                        ui.set_opacity(DRAGGING_OPACITY);
                    }
                    ui.horizontal_top(|ui| {
                        if drag.is_bound(id) {
                            let handle = ui.add(
                                egui::Label::new(DRAG_HANDLE).sense(egui::Sense::drag()),
                            );
                            if handle.drag_started() {
                                signals.drag_started = Some(id);
                            }
                            if handle.drag_stopped() {
                                signals.drag_stopped = true;
                            }
                        }
                        ui.vertical(|ui| draw_children(ui, tree, drag, id, signals));
                    });
                })
                .response;
            signals.hit_rects.push((id, response.rect));
        }
        NodeRole::Heading => {
            ui.heading(&node.text);
        }
        NodeRole::Field if node.editable => {
            let mut text = node.text.clone();
            let edit = ui.add(
                egui::TextEdit::singleline(&mut text)
                    .hint_text(node.name.as_deref().unwrap_or_default())
                    .frame(false),
            );
            if edit.changed() {
                signals.edits.push((id, text));
            }
        }
        NodeRole::Field => {
            ui.label(&node.text);
        }
        NodeRole::Bar => {
            let percent = node.percent.unwrap_or_default();
            ui.add(egui::ProgressBar::new(f32::from(percent) / 100.0).desired_width(160.0));
        }
        NodeRole::Placeholder => {
            ui.add(egui::Separator::default().spacing(14.0));
        }
    }
}

// Smallest containing rect wins: items are nested in sections.
fn pick_target(rects: &[(NodeId, egui::Rect)], pos: egui::Pos2) -> Option<(NodeId, egui::Rect)> {
    rects
        .iter()
        .filter(|(_, rect)| rect.contains(pos))
        .min_by(|(_, left), (_, right)| left.area().total_cmp(&right.area()))
        .copied()
}

fn span_of(rects: &[(NodeId, egui::Rect)], id: NodeId) -> Option<VerticalSpan> {
    rects
        .iter()
        .find(|(node, _)| *node == id)
        .map(|(_, rect)| VerticalSpan::new(rect.top(), rect.height()))
}
