use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::Deserialize;
use tracing::{debug, info};

use super::contracts::{Color, ImageHandle, InputEvent, PixelRect, RenderError, Renderer};
use super::scheduler::{CompletionSignal, SchedulerHandle};

/// Configuration shared across all scenes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub debug_collision: bool,
}

/// Services handed to scene callbacks: shared configuration plus the handles
/// scenes and interaction tasks use to request navigation and spawn work.
pub struct SceneContext {
    pub config: GameConfig,
    pub nav: NavHandle,
    pub scheduler: SchedulerHandle,
}

pub trait Scene {
    fn name(&self) -> &'static str {
        "scene"
    }
    fn set_config(&mut self, _config: GameConfig) {}
    fn on_enter(&mut self) {}
    fn on_exit(&mut self) {}
    fn handle_events(&mut self, _events: &[InputEvent], _ctx: &mut SceneContext) {}
    fn update(&mut self, delta_seconds: f32, ctx: &mut SceneContext);
    fn render(&mut self, renderer: &mut dyn Renderer);
    fn should_exit(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(u64);

enum NavCommand {
    SetScene(Box<dyn Scene>),
    PushOverlay {
        id: OverlayId,
        scene: Box<dyn Scene>,
        blocking: bool,
        completion: Option<CompletionSignal>,
    },
    PushScene {
        id: OverlayId,
        scene: Box<dyn Scene>,
    },
    PopOverlay {
        id: Option<OverlayId>,
    },
}

#[derive(Default)]
struct NavState {
    commands: VecDeque<NavCommand>,
    next_overlay_id: u64,
}

/// Queued navigation requests. Cloneable handle passed to scenes, NPC
/// behaviors, and interaction tasks; the [`SceneManager`] drains the queue at
/// fixed points each frame, so navigation never reentrantly mutates the
/// manager mid-dispatch.
#[derive(Clone, Default)]
pub struct NavHandle {
    inner: Rc<RefCell<NavState>>,
}

impl NavHandle {
    pub fn set_scene(&self, scene: Box<dyn Scene>) {
        self.enqueue(NavCommand::SetScene(scene));
    }

    pub fn push_overlay(&self, scene: Box<dyn Scene>) -> OverlayId {
        let id = self.allocate();
        self.enqueue(NavCommand::PushOverlay {
            id,
            scene,
            blocking: false,
            completion: None,
        });
        id
    }

    /// Blocking push: input and updates stop reaching scenes below it. If no
    /// base scene exists yet when the command is applied, it becomes the base.
    pub fn push_scene(&self, scene: Box<dyn Scene>) -> OverlayId {
        let id = self.allocate();
        self.enqueue(NavCommand::PushScene { id, scene });
        id
    }

    /// Builds an overlay that knows how to pop itself.
    pub fn push_overlay_with(
        &self,
        build: impl FnOnce(UiPopHandle) -> Box<dyn Scene>,
    ) -> OverlayId {
        self.push_built(build, None, false)
    }

    /// Overlay push used by interaction tasks: the completion signal resolves
    /// when the overlay is popped.
    pub fn push_overlay_with_completion(
        &self,
        build: impl FnOnce(UiPopHandle) -> Box<dyn Scene>,
        completion: CompletionSignal,
        blocking: bool,
    ) -> OverlayId {
        self.push_built(build, Some(completion), blocking)
    }

    pub fn pop_overlay(&self, id: OverlayId) {
        self.enqueue(NavCommand::PopOverlay { id: Some(id) });
    }

    pub fn pop_top_overlay(&self) {
        self.enqueue(NavCommand::PopOverlay { id: None });
    }

    fn push_built(
        &self,
        build: impl FnOnce(UiPopHandle) -> Box<dyn Scene>,
        completion: Option<CompletionSignal>,
        blocking: bool,
    ) -> OverlayId {
        let id = self.allocate();
        let scene = build(UiPopHandle {
            id,
            nav: self.clone(),
        });
        self.enqueue(NavCommand::PushOverlay {
            id,
            scene,
            blocking,
            completion,
        });
        id
    }

    fn allocate(&self) -> OverlayId {
        let mut state = self.inner.borrow_mut();
        let id = OverlayId(state.next_overlay_id);
        state.next_overlay_id = state.next_overlay_id.wrapping_add(1);
        id
    }

    fn enqueue(&self, command: NavCommand) {
        self.inner.borrow_mut().commands.push_back(command);
    }

    fn drain(&self) -> Vec<NavCommand> {
        self.inner.borrow_mut().commands.drain(..).collect()
    }
}

/// Lets an overlay scene pop itself without holding the manager.
#[derive(Clone)]
pub struct UiPopHandle {
    id: OverlayId,
    nav: NavHandle,
}

impl UiPopHandle {
    pub fn overlay_id(&self) -> OverlayId {
        self.id
    }

    pub fn pop(&self) {
        self.nav.pop_overlay(self.id);
    }
}

struct OverlayEntry {
    id: OverlayId,
    scene: Box<dyn Scene>,
    blocking: bool,
    completion: Option<CompletionSignal>,
}

/// Owns the base scene and the overlay stack. Overlays are stored bottom to
/// top: the last entry is topmost for input and renders last.
pub struct SceneManager {
    base: Option<Box<dyn Scene>>,
    overlays: Vec<OverlayEntry>,
    context: SceneContext,
    exit_requested: bool,
}

impl SceneManager {
    pub fn new(config: GameConfig) -> Self {
        Self::with_services(config, NavHandle::default(), SchedulerHandle::default())
    }

    pub fn with_services(config: GameConfig, nav: NavHandle, scheduler: SchedulerHandle) -> Self {
        Self {
            base: None,
            overlays: Vec::new(),
            context: SceneContext {
                config,
                nav,
                scheduler,
            },
            exit_requested: false,
        }
    }

    pub fn config(&self) -> GameConfig {
        self.context.config
    }

    pub fn nav(&self) -> NavHandle {
        self.context.nav.clone()
    }

    pub fn scheduler_handle(&self) -> SchedulerHandle {
        self.context.scheduler.clone()
    }

    pub fn context_mut(&mut self) -> &mut SceneContext {
        &mut self.context
    }

    pub fn has_base(&self) -> bool {
        self.base.is_some()
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Replaces the base scene: clears every overlay, exits the old base, and
    /// enters the new one. The manager's own exit flag resets.
    pub fn set_scene(&mut self, mut scene: Box<dyn Scene>) {
        self.clear_overlays();
        if let Some(mut old) = self.base.take() {
            old.on_exit();
        }
        scene.set_config(self.context.config);
        self.exit_requested = false;
        scene.on_enter();
        info!(scene = scene.name(), "scene_set");
        self.base = Some(scene);
    }

    pub fn push_overlay(&mut self, scene: Box<dyn Scene>) -> OverlayId {
        let id = self.context.nav.allocate();
        self.install_overlay(id, scene, false, None);
        id
    }

    /// Blocking push. Returns `None` when there was no base scene yet and the
    /// scene became the base instead.
    pub fn push_scene(&mut self, scene: Box<dyn Scene>) -> Option<OverlayId> {
        if self.base.is_none() {
            self.set_scene(scene);
            return None;
        }
        let id = self.context.nav.allocate();
        self.install_overlay(id, scene, true, None);
        Some(id)
    }

    /// Removes the topmost overlay, or a specific one when `id` is given.
    pub fn pop_overlay(&mut self, id: Option<OverlayId>) -> bool {
        let position = match id {
            None => match self.overlays.len().checked_sub(1) {
                Some(position) => position,
                None => return false,
            },
            Some(id) => match self.overlays.iter().position(|entry| entry.id == id) {
                Some(position) => position,
                None => return false,
            },
        };
        let entry = self.overlays.remove(position);
        self.finalize_overlay(entry);
        true
    }

    pub fn clear_overlays(&mut self) {
        while let Some(entry) = self.overlays.pop() {
            self.finalize_overlay(entry);
        }
    }

    pub fn should_exit(&self) -> bool {
        if self.exit_requested {
            return true;
        }
        if self.base.as_ref().is_some_and(|scene| scene.should_exit()) {
            return true;
        }
        self.overlays.iter().any(|entry| entry.scene.should_exit())
    }

    pub fn base_requested_exit(&self) -> bool {
        self.base.as_ref().is_some_and(|scene| scene.should_exit())
    }

    /// Forwards events to the topmost non-blocked overlay chain, then to the
    /// base scene when no blocking overlay intervenes.
    pub fn handle_events(&mut self, events: &[InputEvent]) {
        if self.base.is_none() {
            return;
        }
        let (targets, include_base) = self.forward_targets();
        let Self {
            overlays,
            base,
            context,
            ..
        } = self;
        for index in targets {
            overlays[index].scene.handle_events(events, context);
        }
        if include_base {
            if let Some(base) = base.as_mut() {
                base.handle_events(events, context);
            }
        }
    }

    /// Updates along the same route as events, then pops any overlay that
    /// requested exit. Exit checks are unconditional: an overlay below a
    /// blocking one is still cleaned up.
    pub fn update(&mut self, delta_seconds: f32) {
        if self.base.is_none() {
            return;
        }
        let (targets, include_base) = self.forward_targets();
        {
            let Self {
                overlays,
                base,
                context,
                ..
            } = self;
            for index in targets {
                overlays[index].scene.update(delta_seconds, context);
            }
            if include_base {
                if let Some(base) = base.as_mut() {
                    base.update(delta_seconds, context);
                }
            }
        }

        let mut index = 0;
        while index < self.overlays.len() {
            if self.overlays[index].scene.should_exit() {
                let entry = self.overlays.remove(index);
                self.finalize_overlay(entry);
            } else {
                index += 1;
            }
        }
    }

    /// Renders bottom to top. Only the base scene may clear the canvas;
    /// overlays draw through a proxy whose `clear` is a no-op.
    pub fn render(&mut self, renderer: &mut dyn Renderer) {
        let Some(base) = self.base.as_mut() else {
            return;
        };
        base.render(renderer);
        if self.overlays.is_empty() {
            return;
        }
        let mut overlay_renderer = OverlayRenderer { inner: renderer };
        for entry in self.overlays.iter_mut() {
            entry.scene.render(&mut overlay_renderer);
        }
    }

    /// Applies queued navigation commands. Runs until the queue is empty so
    /// commands enqueued by lifecycle hooks apply in the same pump.
    pub fn pump_navigation(&mut self) {
        loop {
            let commands = self.context.nav.drain();
            if commands.is_empty() {
                return;
            }
            for command in commands {
                self.apply(command);
            }
        }
    }

    fn apply(&mut self, command: NavCommand) {
        match command {
            NavCommand::SetScene(scene) => self.set_scene(scene),
            NavCommand::PushOverlay {
                id,
                scene,
                blocking,
                completion,
            } => self.install_overlay(id, scene, blocking, completion),
            NavCommand::PushScene { id, scene } => {
                if self.base.is_none() {
                    self.set_scene(scene);
                } else {
                    self.install_overlay(id, scene, true, None);
                }
            }
            NavCommand::PopOverlay { id } => {
                self.pop_overlay(id);
            }
        }
    }

    fn install_overlay(
        &mut self,
        id: OverlayId,
        mut scene: Box<dyn Scene>,
        blocking: bool,
        completion: Option<CompletionSignal>,
    ) {
        scene.set_config(self.context.config);
        scene.on_enter();
        debug!(overlay = ?id, scene = scene.name(), blocking, "overlay_pushed");
        self.overlays.push(OverlayEntry {
            id,
            scene,
            blocking,
            completion,
        });
    }

    fn finalize_overlay(&mut self, mut entry: OverlayEntry) {
        entry.scene.on_exit();
        debug!(overlay = ?entry.id, scene = entry.scene.name(), "overlay_popped");
        if let Some(completion) = entry.completion.take() {
            completion.set();
        }
    }

    /// Overlay indices topmost-first, stopping at (and including) the first
    /// blocking overlay; the base is included only when nothing blocks.
    fn forward_targets(&self) -> (Vec<usize>, bool) {
        let mut targets = Vec::with_capacity(self.overlays.len());
        let mut include_base = true;
        for index in (0..self.overlays.len()).rev() {
            targets.push(index);
            if self.overlays[index].blocking {
                include_base = false;
                break;
            }
        }
        (targets, include_base)
    }
}

/// Renderer proxy handed to overlay scenes so they composite over whatever is
/// beneath them instead of wiping it.
struct OverlayRenderer<'a> {
    inner: &'a mut dyn Renderer,
}

impl Renderer for OverlayRenderer<'_> {
    fn size(&self) -> (u32, u32) {
        self.inner.size()
    }

    fn clear(&mut self, _color: Color) {}

    fn draw_rect(&mut self, color: Color, rect: PixelRect) {
        self.inner.draw_rect(color, rect);
    }

    fn draw_rect_outline(&mut self, color: Color, rect: PixelRect, width: i32) {
        self.inner.draw_rect_outline(color, rect, width);
    }

    fn draw_image(&mut self, image: &ImageHandle, source: PixelRect, destination: (i32, i32)) {
        self.inner.draw_image(image, source, destination);
    }

    fn draw_text(
        &mut self,
        text: &str,
        position: (i32, i32),
        color: Color,
        font_size: i32,
        center: bool,
    ) {
        self.inner.draw_text(text, position, color, font_size, center);
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.inner.present()
    }
}
