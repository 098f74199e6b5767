use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, warn};

use crate::document::template::TemplateSpec;
use crate::document::{NodeId, NodeRole, VisualTree};
use crate::drag::{DragController, DropOutcome, HoverOutcome, StartOutcome, VerticalSpan};
use crate::profile::{CanonicalProfile, normalize};
use crate::render::visibility::{apply_visibility, refresh_visibility};
use crate::render::{RenderReport, SectionRenderer};
use crate::section::SectionKind;

pub const RESUME_DATA_MESSAGE: &str = "RESUME_DATA";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeRejection {
    NotAnObject,
    MissingType,
    UnexpectedType(String),
    MissingPayload,
}

impl EnvelopeRejection {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotAnObject => "not_an_object",
            Self::MissingType => "missing_type",
            Self::UnexpectedType(_) => "unexpected_type",
            Self::MissingPayload => "missing_payload",
        }
    }
}

pub fn resume_data_message(payload: Value) -> Value {
    json!({ "type": RESUME_DATA_MESSAGE, "payload": payload })
}

pub fn open_envelope(message: &Value) -> Result<&Value, EnvelopeRejection> {
    let envelope = message.as_object().ok_or(EnvelopeRejection::NotAnObject)?;
    let kind = envelope
        .get("type")
        .and_then(Value::as_str)
        .ok_or(EnvelopeRejection::MissingType)?;
    if kind != RESUME_DATA_MESSAGE {
        return Err(EnvelopeRejection::UnexpectedType(kind.to_owned()));
    }

    envelope
        .get("payload")
        .filter(|payload| !payload.is_null())
        .ok_or(EnvelopeRejection::MissingPayload)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Rendered(RenderReport),
    Ignored(EnvelopeRejection),
}

#[derive(Debug, Clone)]
pub struct Surface {
    tree: VisualTree,
    drag: DragController,
    rebind_delay: Duration,
    pending_rebind: Option<Instant>,
    profile: Option<CanonicalProfile>,
    deliveries: u64,
}

impl Surface {
    pub fn new(template: &TemplateSpec, rebind_delay: Duration) -> Self {
        let mut tree = template.build_tree();
        let mut drag = DragController::default();
        drag.rebind(&mut tree);
        Self {
            tree,
            drag,
            rebind_delay,
            pending_rebind: None,
            profile: None,
            deliveries: 0,
        }
    }

    pub fn tree(&self) -> &VisualTree {
        &self.tree
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn profile(&self) -> Option<&CanonicalProfile> {
        self.profile.as_ref()
    }

    pub fn deliveries(&self) -> u64 {
        self.deliveries
    }

    pub fn rebind_due(&self) -> Option<Instant> {
        self.pending_rebind
    }

    pub fn deliver(&mut self, message: &Value, now: Instant) -> Delivery {
        let payload = match open_envelope(message) {
            Ok(payload) => payload,
            Err(rejection) => {
                debug!(reason = rejection.label(), "ignoring host message");
                return Delivery::Ignored(rejection);
            }
        };

        let profile = normalize(payload);
        let report = SectionRenderer::render_profile(&mut self.tree, &profile);
        let evaluated = refresh_visibility(&mut self.tree);

        self.deliveries += 1;
        self.profile = Some(profile);
        self.pending_rebind = Some(now + self.rebind_delay);
        info!(
            delivery = self.deliveries,
            created_items = report.created_items(),
            evaluated_sections = evaluated,
            unrecognized_sections = report.unrecognized.len(),
            "rendered host payload"
        );
        Delivery::Rendered(report)
    }

    pub fn tick(&mut self, now: Instant) -> bool {
        match self.pending_rebind {
            Some(deadline) if now >= deadline => {
                self.pending_rebind = None;
                self.drag.rebind(&mut self.tree);
                true
            }
            _ => false,
        }
    }

    pub fn edit_text(&mut self, node: NodeId, text: impl Into<String>) -> bool {
        if !self.tree.set_text(node, text) {
            return false;
        }

        let section = self
            .tree
            .enclosing(node, NodeRole::Section)
            .and_then(|slot| {
                let tag = self.tree.get(slot)?.section.as_deref()?;
                Some((slot, SectionKind::from_tag(tag)?))
            });
        if let Some((slot, kind)) = section
            && let Some(hidden) = apply_visibility(&mut self.tree, kind, slot)
        {
            debug!(section = %kind, hidden, "visibility re-evaluated after edit");
        }
        true
    }

    pub fn start_drag(&mut self, node: NodeId) -> StartOutcome {
        self.drag.start(&mut self.tree, node)
    }

    pub fn hover_drag<F>(&mut self, hovered: NodeId, pointer_y: f32, span_of: F) -> HoverOutcome
    where
        F: Fn(NodeId) -> Option<VerticalSpan>,
    {
        self.drag.hover(&mut self.tree, hovered, pointer_y, span_of)
    }

    pub fn release_drag(&mut self, target: Option<NodeId>) -> DropOutcome {
        self.drag.release(&mut self.tree, target)
    }

    pub fn cancel_drag(&mut self) -> DropOutcome {
        self.drag.cancel(&mut self.tree)
    }
}

#[derive(Debug, Clone)]
pub struct HostPort {
    tx: UnboundedSender<Value>,
}

impl HostPort {
    pub fn post(&self, message: Value) -> bool {
        self.tx.send(message).is_ok()
    }
}

#[derive(Debug)]
pub struct MessageGateway {
    rx: UnboundedReceiver<Value>,
    disconnected: bool,
}

impl MessageGateway {
    pub fn install() -> (HostPort, Self) {
        let (tx, rx) = unbounded_channel();
        (
            HostPort { tx },
            Self {
                rx,
                disconnected: false,
            },
        )
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    pub fn drain(&mut self, surface: &mut Surface, now: Instant) -> usize {
        let mut consumed = 0;
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    surface.deliver(&message, now);
                    consumed += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        warn!("all host ports dropped; no further payloads will arrive");
                    }
                    self.disconnected = true;
                    break;
                }
            }
        }
        consumed
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use serde_json::json;

    use crate::document::template::TemplateSpec;
    use crate::drag::{DragPhase, StartOutcome, VerticalSpan};
    use crate::section::SectionKind;
    use crate::test_support::sample_payload;

    use super::{
        Delivery, EnvelopeRejection, MessageGateway, Surface, open_envelope, resume_data_message,
    };

    fn surface() -> Surface {
        Surface::new(&TemplateSpec::default(), Duration::from_millis(50))
    }

    #[test]
    fn open_envelope_filters_on_discriminant() {
        assert_eq!(
            open_envelope(&json!("hello")),
            Err(EnvelopeRejection::NotAnObject)
        );
        assert_eq!(
            open_envelope(&json!({ "payload": {} })),
            Err(EnvelopeRejection::MissingType)
        );
        assert_eq!(
            open_envelope(&json!({ "type": "PING", "payload": {} })),
            Err(EnvelopeRejection::UnexpectedType("PING".to_owned()))
        );
        assert_eq!(
            open_envelope(&json!({ "type": "RESUME_DATA", "payload": null })),
            Err(EnvelopeRejection::MissingPayload)
        );
        assert!(open_envelope(&json!({ "type": "RESUME_DATA", "payload": {} })).is_ok());
    }

    #[test]
    fn ignored_message_leaves_tree_untouched() {
        let mut surface = surface();
        let before = surface.tree().clone();
        let delivery = surface.deliver(&json!({ "type": "OTHER" }), Instant::now());
        assert!(matches!(delivery, Delivery::Ignored(_)));
        assert_eq!(surface.tree(), &before);
        assert_eq!(surface.rebind_due(), None);
        assert_eq!(surface.deliveries(), 0);
    }

    #[test]
    fn rebind_waits_for_settle_delay() {
        let mut surface = surface();
        let now = Instant::now();
        surface.deliver(&resume_data_message(sample_payload()), now);
        let passes = surface.drag().bind_passes();

        assert!(!surface.tick(now + Duration::from_millis(10)));
        assert_eq!(surface.drag().bind_passes(), passes);

        assert!(surface.tick(now + Duration::from_millis(50)));
        assert_eq!(surface.drag().bind_passes(), passes + 1);
        assert!(!surface.tick(now + Duration::from_millis(100)));
    }

    #[test]
    fn regenerated_items_are_draggable_only_after_rebind() {
        let mut surface = surface();
        let now = Instant::now();
        surface.deliver(&resume_data_message(sample_payload()), now);

        let slot = surface
            .tree()
            .section_slot("experience")
            .expect("experience slot should exist");
        let item = surface
            .tree()
            .children_with_class(slot, SectionKind::Experience.marker_class())[0];
        assert!(matches!(
            surface.start_drag(item),
            StartOutcome::Ignored(_)
        ));

        surface.tick(now + Duration::from_secs(1));
        assert!(matches!(
            surface.start_drag(item),
            StartOutcome::Started { .. }
        ));
    }

    #[test]
    fn payload_during_drag_renders_and_abandons_gesture() {
        let mut surface = surface();
        let now = Instant::now();
        let sidebar = surface.tree().region("sidebar").expect("sidebar should exist");
        let sections = surface.tree().children(sidebar).to_vec();

        surface.start_drag(sections[0]);
        surface.hover_drag(sections[1], 30.0, |_| Some(VerticalSpan::new(0.0, 20.0)));
        assert_eq!(surface.drag().phase(), DragPhase::Dragging);

        let delivery = surface.deliver(&resume_data_message(sample_payload()), now);
        assert!(matches!(delivery, Delivery::Rendered(_)));
        surface.tick(now + Duration::from_secs(1));

        assert_eq!(surface.drag().phase(), DragPhase::Idle);
        assert_eq!(surface.drag().placeholder(), None);
        assert_eq!(surface.tree().children(sidebar), sections.as_slice());
    }

    #[test]
    fn clearing_every_skill_name_collapses_section_live() {
        let mut surface = surface();
        surface.deliver(&resume_data_message(sample_payload()), Instant::now());
        let slot = surface
            .tree()
            .section_slot("skills")
            .expect("skills slot should exist");
        assert!(!surface.tree().is_hidden(slot));

        let name_fields = surface
            .tree()
            .children_with_class(slot, SectionKind::Skills.marker_class())
            .into_iter()
            .flat_map(|item| surface.tree().descendants(item).collect::<Vec<_>>())
            .filter(|id| {
                surface
                    .tree()
                    .get(*id)
                    .is_some_and(|node| node.name.as_deref() == Some("name"))
            })
            .collect::<Vec<_>>();
        assert!(!name_fields.is_empty());

        for field in &name_fields {
            assert!(surface.edit_text(*field, "  "));
        }
        assert!(surface.tree().is_hidden(slot));

        assert!(surface.edit_text(name_fields[0], "Rust"));
        assert!(!surface.tree().is_hidden(slot));
    }

    #[tokio::test]
    async fn gateway_drains_every_queued_message() {
        let (port, mut gateway) = MessageGateway::install();
        let mut surface = surface();

        assert!(port.post(json!({ "type": "NOISE" })));
        assert!(port.post(resume_data_message(sample_payload())));
        let consumed = gateway.drain(&mut surface, Instant::now());
        assert_eq!(consumed, 2);
        assert_eq!(surface.deliveries(), 1);

        drop(port);
        assert_eq!(gateway.drain(&mut surface, Instant::now()), 0);
        assert!(gateway.is_disconnected());
    }
}
