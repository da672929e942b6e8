//! Pane host: creates, updates and destroys panes on the UI thread
//!
//! Every [`UiCommand`] lands here. Pointer input is routed by surface id
//! from the X11 event handlers.

use std::collections::{BTreeMap, HashMap};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::common::color::Opacity;
use crate::common::types::{Position, Rect};
use crate::config::{PaneSettings, RuleHandle};

use super::backend::{
    Compositor, PaneId, PaneMenu, SurfaceHost, SurfaceId, SurfaceSpec, ThumbnailId, WindowId,
};
use super::border::BorderMode;
use super::commands::{CommandSender, UiCommand};
use super::countdown;
use super::drag::Release;
use super::pane::OverlayPane;
use super::session::Session;
use super::snapping;

pub struct PaneHost<B, M>
where
    B: SurfaceHost + Compositor,
    M: PaneMenu,
{
    backend: B,
    menu: M,
    session: Arc<Session>,
    /// Handed to countdown tasks
    commands: CommandSender,
    /// Ordered by creation, which is also the snapping order
    panes: BTreeMap<PaneId, OverlayPane>,
    by_surface: HashMap<SurfaceId, PaneId>,
    visible: bool,
    next_generation: u64,
}

impl<B, M> PaneHost<B, M>
where
    B: SurfaceHost + Compositor,
    M: PaneMenu,
{
    pub fn new(backend: B, menu: M, session: Arc<Session>, commands: CommandSender) -> Self {
        Self {
            backend,
            menu,
            session,
            commands,
            panes: BTreeMap::new(),
            by_surface: HashMap::new(),
            visible: true,
            next_generation: 0,
        }
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn pane(&self, pane: PaneId) -> Option<&OverlayPane> {
        self.panes.get(&pane)
    }

    pub fn pane_for_surface(&self, surface: SurfaceId) -> Option<PaneId> {
        self.by_surface.get(&surface).copied()
    }

    pub fn pane_count(&self) -> usize {
        self.panes.len()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn handle(&mut self, command: UiCommand) -> ControlFlow<()> {
        match command {
            UiCommand::CreatePane {
                pane,
                window,
                title,
                rule,
            } => self.create_pane(pane, window, title, rule),
            UiCommand::SetBorder { pane, mode } => self.set_border(pane, mode),
            UiCommand::DestroyPane { pane } => {
                self.destroy_pane(pane);
            }
            UiCommand::CountdownFrame {
                pane,
                generation,
                fraction,
                done,
            } => self.countdown_frame(pane, generation, fraction, done),
            UiCommand::HideCountdown { pane, generation } => self.hide_countdown(pane, generation),
            UiCommand::Activate { pane } => self.activate(pane),
            UiCommand::Report(message) => self.menu.report(&message),
            UiCommand::ToggleVisibility => self.toggle_visibility(),
            UiCommand::Save => self.save(),
            UiCommand::Backup => self.backup(),
            UiCommand::Exit => {
                self.exit();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn release_resources(&mut self, surface: SurfaceId, thumbnail: Option<ThumbnailId>) {
        if let Some(thumbnail) = thumbnail
            && let Err(e) = self.backend.unregister_thumbnail(thumbnail)
        {
            warn!(error = %e, "Failed to unregister thumbnail");
        }
        if let Err(e) = self.backend.destroy_surface(surface) {
            warn!(surface, error = %e, "Failed to destroy pane surface");
        }
    }

    fn build_pane(
        &mut self,
        pane: PaneId,
        window: WindowId,
        title: &str,
        rule: &RuleHandle,
    ) -> Result<OverlayPane> {
        let settings = PaneSettings::resolve(&rule.snapshot(), self.session.store().defaults(), title);

        let surface = self.backend.create_surface(&SurfaceSpec {
            title: format!("Preview: {}", title),
            label: settings.label.clone(),
            bounds: settings.outer_bounds(),
            opacity: settings.opacity,
            visible: self.visible,
        })?;

        let thumbnail = match self.backend.register_thumbnail(surface, window) {
            Ok(thumbnail) => thumbnail,
            Err(e) => {
                self.release_resources(surface, None);
                return Err(e.into());
            }
        };

        let overlay = OverlayPane::new(
            pane,
            window,
            title.to_string(),
            Arc::downgrade(rule),
            settings,
            surface,
            thumbnail,
        );

        let painted = self
            .backend
            .update_thumbnail(thumbnail, &overlay.thumbnail_properties(self.visible))
            .and_then(|()| {
                self.backend.paint_border(
                    surface,
                    overlay.settings.outer_size(),
                    overlay.settings.border_width,
                    overlay.border_color(),
                )
            });
        if let Err(e) = painted {
            self.release_resources(surface, Some(thumbnail));
            return Err(e);
        }

        Ok(overlay)
    }

    /// Builds a pane and binds it; the pending-creation slot is released either way
    pub fn create_pane(&mut self, pane: PaneId, window: WindowId, title: String, rule: RuleHandle) {
        if self.session.is_shutting_down() {
            self.session.finish_creation();
            return;
        }

        match self.build_pane(pane, window, &title, &rule) {
            Ok(overlay) => {
                info!(pane = pane.0, window, title = %title, "Created pane");
                self.menu.add_entry(pane, &overlay.settings.label);
                self.by_surface.insert(overlay.surface, pane);
                self.panes.insert(pane, overlay);
                self.session.bind(pane, window, rule);
            }
            Err(e) => {
                error!(pane = pane.0, window, title = %title, error = format!("{:#}", e), "Failed to create pane");
            }
        }
        self.session.finish_creation();
    }

    pub fn set_border(&mut self, pane: PaneId, mode: BorderMode) {
        let Some(overlay) = self.panes.get_mut(&pane) else {
            return;
        };
        if !overlay.border.transition(mode) {
            return;
        }
        debug!(pane = pane.0, ?mode, "Border mode changed");
        if let Err(e) = self.backend.paint_border(
            overlay.surface,
            overlay.settings.outer_size(),
            overlay.settings.border_width,
            overlay.border_color(),
        ) {
            warn!(pane = pane.0, error = %e, "Failed to paint border");
        }
    }

    /// Returns false when the pane was already gone
    pub fn destroy_pane(&mut self, pane: PaneId) -> bool {
        self.session.unbind(pane);
        let Some(overlay) = self.panes.remove(&pane) else {
            return false;
        };
        self.by_surface.remove(&overlay.surface);
        self.menu.remove_entry(pane);
        self.release_resources(overlay.surface, Some(overlay.thumbnail));
        info!(pane = pane.0, window = overlay.target, "Destroyed pane");
        true
    }

    pub fn pointer_pressed(&mut self, surface: SurfaceId, cursor: Position, now: Instant) {
        let Some(pane) = self.pane_for_surface(surface) else {
            return;
        };
        let delay = self.session.store().defaults().move_delay();
        self.next_generation += 1;
        let generation = self.next_generation;

        let Some(overlay) = self.panes.get_mut(&pane) else {
            return;
        };
        overlay.drag.press(cursor, overlay.origin, now);
        overlay.countdown_anchor = overlay.countdown_anchor_for(cursor);
        let (handle, _task) = countdown::start(self.commands.clone(), pane, generation, now, delay);
        overlay.countdown = Some(handle);
    }

    pub fn pointer_moved(&mut self, surface: SurfaceId, cursor: Position, now: Instant) {
        let Some(pane) = self.pane_for_surface(surface) else {
            return;
        };
        let defaults = self.session.store().defaults();
        let delay = defaults.move_delay();
        let distance = defaults.magnetize_distance();

        let others: Vec<Rect> = self
            .panes
            .iter()
            .filter(|(id, _)| **id != pane)
            .map(|(_, other)| other.bounds())
            .collect();

        let Some(overlay) = self.panes.get_mut(&pane) else {
            return;
        };
        let Some(candidate) = overlay.drag.motion(cursor, overlay.origin, now, delay) else {
            if overlay.drag.pending_since().is_none()
                && let Some(countdown) = &overlay.countdown
            {
                countdown.stop();
            }
            return;
        };

        let screen = self
            .backend
            .screen_bounds(overlay.settings.screen_index)
            .inspect_err(|e| debug!(error = %e, "Screen bounds unavailable"))
            .ok()
            .flatten();
        let target = snapping::magnetize(
            Rect::from_parts(candidate, overlay.settings.outer_size()),
            screen,
            &others,
            distance,
        );

        if target != overlay.origin {
            match self.backend.move_surface(overlay.surface, target) {
                Ok(()) => overlay.origin = target,
                Err(e) => warn!(pane = pane.0, error = %e, "Failed to move pane"),
            }
        }
    }

    pub fn pointer_released(&mut self, surface: SurfaceId) {
        let Some(pane) = self.pane_for_surface(surface) else {
            return;
        };
        let Some(overlay) = self.panes.get_mut(&pane) else {
            return;
        };
        if !overlay.drag.is_pressed() {
            return;
        }
        if let Some(countdown) = &overlay.countdown {
            countdown.stop();
        }

        match overlay.drag.release() {
            Release::Click => self.activate(pane),
            Release::Moved => {
                let origin = overlay.inner_origin();
                match overlay.rule.upgrade() {
                    Some(rule) => {
                        info!(pane = pane.0, x = origin.x, y = origin.y, "Pane moved");
                        rule.set_position(origin);
                        self.session.store().mark_dirty();
                        self.save_quietly();
                    }
                    None => debug!(pane = pane.0, "Rule is gone, position not written back"),
                }
            }
        }
    }

    pub fn hover(&mut self, surface: SurfaceId, entered: bool) {
        let Some(overlay) = self
            .pane_for_surface(surface)
            .and_then(|pane| self.panes.get_mut(&pane))
        else {
            return;
        };
        overlay.hovered = entered;
        let opacity = if entered {
            Opacity::from_fraction(1.0)
        } else {
            overlay.settings.opacity
        };
        if let Err(e) = self.backend.set_surface_opacity(surface, opacity) {
            debug!(surface, error = %e, "Failed to change hover opacity");
        }
    }

    /// Redraw border and thumbnail after an expose
    pub fn repaint(&mut self, surface: SurfaceId) {
        let Some(overlay) = self
            .pane_for_surface(surface)
            .and_then(|pane| self.panes.get(&pane))
        else {
            return;
        };
        let result = self
            .backend
            .update_thumbnail(overlay.thumbnail, &overlay.thumbnail_properties(self.visible))
            .and_then(|()| {
                self.backend.paint_border(
                    surface,
                    overlay.settings.outer_size(),
                    overlay.settings.border_width,
                    overlay.border_color(),
                )
            });
        if let Err(e) = result {
            debug!(surface, error = %e, "Failed to repaint pane");
        }
    }

    fn countdown_frame(&mut self, pane: PaneId, generation: u64, fraction: f64, done: oneshot::Sender<()>) {
        if let Some(overlay) = self.panes.get(&pane)
            && overlay
                .countdown
                .as_ref()
                .is_some_and(|c| c.generation() == generation)
            && let Err(e) = self
                .backend
                .paint_countdown(overlay.surface, overlay.countdown_anchor, fraction)
        {
            debug!(pane = pane.0, error = %e, "Failed to paint countdown");
        }
        let _ = done.send(());
    }

    fn hide_countdown(&mut self, pane: PaneId, generation: u64) {
        let Some(overlay) = self.panes.get_mut(&pane) else {
            return;
        };
        if !overlay
            .countdown
            .as_ref()
            .is_some_and(|c| c.generation() == generation)
        {
            return;
        }
        overlay.countdown = None;
        let surface = overlay.surface;
        if let Err(e) = self.backend.clear_countdown(surface) {
            debug!(pane = pane.0, error = %e, "Failed to clear countdown");
        }
        self.repaint(surface);
    }

    /// Bring the target to the foreground, restoring it when minimized
    pub fn activate(&mut self, pane: PaneId) {
        let Some(target) = self.panes.get(&pane).map(|p| p.target) else {
            return;
        };
        if let Err(e) = self.backend.activate_window(target) {
            warn!(window = target, error = %e, "Failed to activate window");
            return;
        }
        match self.backend.is_iconic(target) {
            Ok(true) => {
                if let Err(e) = self.backend.restore_window(target) {
                    warn!(window = target, error = %e, "Failed to restore window");
                }
            }
            Ok(false) => {}
            Err(e) => debug!(window = target, error = %e, "Iconic query failed"),
        }
    }

    pub fn toggle_visibility(&mut self) {
        self.visible = !self.visible;
        info!(visible = self.visible, "Toggled pane visibility");
        for overlay in self.panes.values() {
            if let Err(e) = self.backend.set_surface_visible(overlay.surface, self.visible) {
                warn!(pane = overlay.id.0, error = %e, "Failed to change pane visibility");
            }
            if let Err(e) = self
                .backend
                .update_thumbnail(overlay.thumbnail, &overlay.thumbnail_properties(self.visible))
            {
                debug!(pane = overlay.id.0, error = %e, "Failed to update thumbnail visibility");
            }
        }
    }

    /// Save after a drag; only failures reach the user
    fn save_quietly(&mut self) {
        if let Err(e) = self.session.store().save() {
            error!(error = %e, "Failed to save configuration");
            self.menu.report(&e.to_string());
        }
    }

    pub fn save(&mut self) {
        match self.session.store().save() {
            Ok(()) => self.menu.report("Configuration saved"),
            Err(e) => {
                error!(error = %e, "Failed to save configuration");
                self.menu.report(&e.to_string());
            }
        }
    }

    pub fn backup(&mut self) {
        match self.session.store().backup() {
            Ok(path) => self
                .menu
                .report(&format!("Backup written to {}", path.display())),
            Err(e) => {
                error!(error = %e, "Failed to write backup");
                self.menu.report(&e.to_string());
            }
        }
    }

    pub fn exit(&mut self) {
        info!("Exit requested");
        self.session.request_shutdown();
        let panes: Vec<PaneId> = self.panes.keys().copied().collect();
        for pane in panes {
            self.destroy_pane(pane);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::color::Argb;
    use crate::common::types::Dimensions;
    use crate::config::{ConfigStore, Document, GlobalDefaults, MatchRule};
    use crate::daemon::backend::ThumbnailProperties;
    use crate::daemon::commands::{self, CommandReceiver};
    use crate::errors::EngineError;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        CreateSurface(Rect, String),
        DestroySurface(SurfaceId),
        Move(SurfaceId, Position),
        Opacity(SurfaceId, f64),
        Visible(SurfaceId, bool),
        Border(SurfaceId, Argb),
        Countdown(SurfaceId, f64),
        ClearCountdown(SurfaceId),
        Register(SurfaceId, WindowId),
        Update(ThumbnailId, ThumbnailProperties),
        Unregister(ThumbnailId),
        Activate(WindowId),
        Restore(WindowId),
    }

    #[derive(Default)]
    struct FakeBackend {
        calls: Vec<Call>,
        next_surface: SurfaceId,
        fail_register: bool,
        iconic: bool,
        screen: Option<Rect>,
    }

    impl FakeBackend {
        fn borders(&self) -> usize {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Border(..)))
                .count()
        }
    }

    impl SurfaceHost for FakeBackend {
        fn create_surface(&mut self, spec: &SurfaceSpec) -> Result<SurfaceId> {
            self.next_surface += 1;
            self.calls.push(Call::CreateSurface(spec.bounds, spec.label.clone()));
            Ok(self.next_surface)
        }
        fn destroy_surface(&mut self, surface: SurfaceId) -> Result<()> {
            self.calls.push(Call::DestroySurface(surface));
            Ok(())
        }
        fn move_surface(&mut self, surface: SurfaceId, origin: Position) -> Result<()> {
            self.calls.push(Call::Move(surface, origin));
            Ok(())
        }
        fn set_surface_opacity(&mut self, surface: SurfaceId, opacity: Opacity) -> Result<()> {
            self.calls.push(Call::Opacity(surface, opacity.fraction()));
            Ok(())
        }
        fn set_surface_visible(&mut self, surface: SurfaceId, visible: bool) -> Result<()> {
            self.calls.push(Call::Visible(surface, visible));
            Ok(())
        }
        fn paint_border(&mut self, surface: SurfaceId, _: Dimensions, _: u32, color: Argb) -> Result<()> {
            self.calls.push(Call::Border(surface, color));
            Ok(())
        }
        fn paint_countdown(&mut self, surface: SurfaceId, _: Position, fraction: f64) -> Result<()> {
            self.calls.push(Call::Countdown(surface, fraction));
            Ok(())
        }
        fn clear_countdown(&mut self, surface: SurfaceId) -> Result<()> {
            self.calls.push(Call::ClearCountdown(surface));
            Ok(())
        }
        fn screen_bounds(&self, index: usize) -> Result<Option<Rect>> {
            Ok(if index == 0 { self.screen } else { None })
        }
        fn activate_window(&mut self, window: WindowId) -> Result<()> {
            self.calls.push(Call::Activate(window));
            Ok(())
        }
        fn restore_window(&mut self, window: WindowId) -> Result<()> {
            self.calls.push(Call::Restore(window));
            Ok(())
        }
        fn is_iconic(&self, _: WindowId) -> Result<bool> {
            Ok(self.iconic)
        }
    }

    impl Compositor for FakeBackend {
        fn register_thumbnail(
            &mut self,
            surface: SurfaceId,
            source: WindowId,
        ) -> Result<ThumbnailId, EngineError> {
            if self.fail_register {
                return Err(EngineError::CompositorRegistration {
                    window: source,
                    reason: "no composite".to_string(),
                });
            }
            self.calls.push(Call::Register(surface, source));
            Ok(ThumbnailId(surface + 100))
        }
        fn update_thumbnail(&mut self, id: ThumbnailId, properties: &ThumbnailProperties) -> Result<()> {
            self.calls.push(Call::Update(id, *properties));
            Ok(())
        }
        fn unregister_thumbnail(&mut self, id: ThumbnailId) -> Result<()> {
            self.calls.push(Call::Unregister(id));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeMenu {
        entries: Vec<(PaneId, String)>,
        reports: Vec<String>,
    }

    impl PaneMenu for FakeMenu {
        fn add_entry(&mut self, pane: PaneId, label: &str) {
            self.entries.push((pane, label.to_string()));
        }
        fn remove_entry(&mut self, pane: PaneId) {
            self.entries.retain(|(p, _)| *p != pane);
        }
        fn report(&mut self, message: &str) {
            self.reports.push(message.to_string());
        }
    }

    struct Harness {
        host: PaneHost<FakeBackend, FakeMenu>,
        session: Arc<Session>,
        _rx: CommandReceiver,
        _dir: tempfile::TempDir,
    }

    fn harness(rules: Vec<MatchRule>, defaults: GlobalDefaults) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::from_document(
            dir.path().join("config.json"),
            Document {
                windows: rules,
                defaults,
            },
        );
        let session = Arc::new(Session::new(Arc::new(store)));
        let (tx, rx) = commands::channel();
        let backend = FakeBackend {
            screen: Some(Rect::new(0, 0, 1920, 1080)),
            ..Default::default()
        };
        let host = PaneHost::new(backend, FakeMenu::default(), Arc::clone(&session), tx);
        Harness {
            host,
            session,
            _rx: rx,
            _dir: dir,
        }
    }

    fn notepad() -> MatchRule {
        MatchRule {
            title: Some("Notepad".to_string()),
            x: 100,
            y: 100,
            width: 400,
            height: 300,
            border_width: Some(0),
            ..Default::default()
        }
    }

    fn create(h: &mut Harness, pane: u64, window: WindowId) -> PaneId {
        let rule = h.session.store().rules()[0].clone();
        h.session.begin_creation();
        h.host
            .create_pane(PaneId(pane), window, "Notepad".to_string(), rule);
        PaneId(pane)
    }

    #[test]
    fn test_create_binds_then_releases_counter() {
        let mut h = harness(vec![notepad()], GlobalDefaults::default());
        let pane = create(&mut h, 1, 10);

        assert_eq!(h.session.pending_creations(), 0);
        assert_eq!(h.session.snapshot().len(), 1);
        assert_eq!(h.host.pane_count(), 1);
        assert_eq!(h.host.menu.entries, vec![(pane, "Notepad".to_string())]);

        let calls = &h.host.backend.calls;
        assert_eq!(
            calls[0],
            Call::CreateSurface(Rect::new(100, 100, 400, 300), "Notepad".to_string())
        );
        assert_eq!(calls[1], Call::Register(1, 10));
        assert!(matches!(
            calls[2],
            Call::Update(ThumbnailId(101), ThumbnailProperties { visible: true, client_area_only: true, .. })
        ));
        assert!(matches!(calls[3], Call::Border(1, _)));
    }

    #[test]
    fn test_label_override_titles_the_pane() {
        let mut rule = notepad();
        rule.title_label_override = Some("Notes".to_string());
        let mut h = harness(vec![rule], GlobalDefaults::default());
        let pane = create(&mut h, 1, 10);

        assert_eq!(
            h.host.backend.calls[0],
            Call::CreateSurface(Rect::new(100, 100, 400, 300), "Notes".to_string())
        );
        assert_eq!(h.host.menu.entries, vec![(pane, "Notes".to_string())]);
    }

    #[test]
    fn test_registration_failure_aborts_one_pane() {
        let mut h = harness(vec![notepad()], GlobalDefaults::default());
        h.host.backend.fail_register = true;
        create(&mut h, 1, 10);

        assert_eq!(h.session.pending_creations(), 0);
        assert!(h.session.snapshot().is_empty());
        assert_eq!(h.host.pane_count(), 0);
        assert!(h.host.menu.entries.is_empty());
        assert!(h.host.backend.calls.contains(&Call::DestroySurface(1)));
    }

    #[test]
    fn test_border_repaints_only_on_change() {
        let mut h = harness(vec![notepad()], GlobalDefaults::default());
        let pane = create(&mut h, 1, 10);
        let initial = h.host.backend.borders();

        h.host.set_border(pane, BorderMode::Inactive);
        assert_eq!(h.host.backend.borders(), initial);
        h.host.set_border(pane, BorderMode::Active);
        h.host.set_border(pane, BorderMode::Active);
        assert_eq!(h.host.backend.borders(), initial + 1);
        h.host.set_border(pane, BorderMode::Minimized);
        assert_eq!(h.host.backend.borders(), initial + 2);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut h = harness(vec![notepad()], GlobalDefaults::default());
        let pane = create(&mut h, 1, 10);

        assert!(h.host.destroy_pane(pane));
        assert!(!h.host.destroy_pane(pane));
        assert!(h.session.snapshot().is_empty());
        assert!(h.host.menu.entries.is_empty());

        let unregisters = h
            .host
            .backend
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Unregister(_)))
            .count();
        assert_eq!(unregisters, 1);
    }

    #[tokio::test]
    async fn test_click_activates_and_restores_iconic_target() {
        let mut h = harness(vec![notepad()], GlobalDefaults::default());
        create(&mut h, 1, 10);
        h.host.backend.iconic = true;

        let now = Instant::now();
        h.host.pointer_pressed(1, Position::new(150, 150), now);
        h.host.pointer_released(1);

        let calls = &h.host.backend.calls;
        assert!(calls.contains(&Call::Activate(10)));
        assert!(calls.contains(&Call::Restore(10)));
    }

    #[tokio::test]
    async fn test_drag_snaps_and_writes_back_inner_origin() {
        let defaults = GlobalDefaults {
            millisecond_delay_to_move: Some(0),
            ..Default::default()
        };
        let mut rule = notepad();
        rule.border_width = Some(5);
        let mut h = harness(vec![rule], defaults);
        create(&mut h, 1, 10);

        // Outer origin is (95, 95); drag so the left edge lands at x = 15
        let now = Instant::now();
        h.host.pointer_pressed(1, Position::new(195, 195), now);
        h.host
            .pointer_moved(1, Position::new(115, 195), now + Duration::from_millis(1));

        let pane = h.host.pane(PaneId(1)).unwrap();
        assert_eq!(pane.origin, Position::new(0, 95));
        assert!(h.host.backend.calls.contains(&Call::Move(1, Position::new(0, 95))));

        h.host.pointer_released(1);
        let written = h.session.store().rules()[0].snapshot();
        assert_eq!((written.x, written.y), (5, 100));
        assert!(!h.session.store().is_dirty());
        assert!(!h.host.backend.calls.contains(&Call::Activate(10)));
    }

    #[tokio::test]
    async fn test_deviation_before_delay_is_a_click() {
        let mut h = harness(vec![notepad()], GlobalDefaults::default());
        create(&mut h, 1, 10);

        let now = Instant::now();
        h.host.pointer_pressed(1, Position::new(150, 150), now);
        h.host
            .pointer_moved(1, Position::new(160, 150), now + Duration::from_millis(10));
        h.host.pointer_released(1);

        assert!(!h.host.backend.calls.iter().any(|c| matches!(c, Call::Move(..))));
        assert!(h.host.backend.calls.contains(&Call::Activate(10)));
        assert_eq!(h.session.store().rules()[0].snapshot().x, 100);
    }

    #[tokio::test]
    async fn test_stale_countdown_frames_are_ignored() {
        let mut h = harness(vec![notepad()], GlobalDefaults::default());
        let pane = create(&mut h, 1, 10);
        h.host.pointer_pressed(1, Position::new(150, 150), Instant::now());
        let current = h.host.pane(pane).unwrap().countdown.as_ref().unwrap().generation();

        let (done, painted) = oneshot::channel();
        h.host.handle(UiCommand::CountdownFrame {
            pane,
            generation: current + 5,
            fraction: 0.5,
            done,
        });
        assert!(painted.await.is_ok());
        assert!(!h.host.backend.calls.iter().any(|c| matches!(c, Call::Countdown(..))));

        let (done, painted) = oneshot::channel();
        h.host.handle(UiCommand::CountdownFrame {
            pane,
            generation: current,
            fraction: 0.5,
            done,
        });
        assert!(painted.await.is_ok());
        assert!(h.host.backend.calls.contains(&Call::Countdown(1, 0.5)));

        h.host.handle(UiCommand::HideCountdown {
            pane,
            generation: current,
        });
        assert!(h.host.backend.calls.contains(&Call::ClearCountdown(1)));
        assert!(h.host.pane(pane).unwrap().countdown.is_none());
    }

    #[test]
    fn test_hover_swaps_opacity() {
        let mut h = harness(vec![notepad()], GlobalDefaults::default());
        create(&mut h, 1, 10);
        h.host.hover(1, true);
        h.host.hover(1, false);
        let calls = &h.host.backend.calls;
        assert!(calls.contains(&Call::Opacity(1, 1.0)));
        assert!(calls.contains(&Call::Opacity(1, 0.75)));
    }

    #[test]
    fn test_toggle_visibility_applies_to_new_panes() {
        let mut h = harness(vec![notepad()], GlobalDefaults::default());
        create(&mut h, 1, 10);
        h.host.handle(UiCommand::ToggleVisibility);
        assert!(!h.host.is_visible());
        assert!(h.host.backend.calls.contains(&Call::Visible(1, false)));

        h.host.destroy_pane(PaneId(1));
        create(&mut h, 2, 11);
        assert!(h.host.backend.calls.iter().any(|c| matches!(
            c,
            Call::Update(_, ThumbnailProperties { visible: false, .. })
        )));
    }

    #[test]
    fn test_save_and_backup_report_status() {
        let mut h = harness(vec![notepad()], GlobalDefaults::default());
        h.host.handle(UiCommand::Save);
        h.host.handle(UiCommand::Backup);
        assert_eq!(h.host.menu.reports[0], "Configuration saved");
        assert!(h.host.menu.reports[1].starts_with("Backup written to"));
        assert!(h.session.store().path().exists());
    }

    #[test]
    fn test_exit_tears_down_everything() {
        let mut h = harness(vec![notepad()], GlobalDefaults::default());
        create(&mut h, 1, 10);
        assert_eq!(h.host.handle(UiCommand::Exit), ControlFlow::Break(()));
        assert!(h.session.is_shutting_down());
        assert_eq!(h.host.pane_count(), 0);
        assert!(h.session.snapshot().is_empty());
    }
}
