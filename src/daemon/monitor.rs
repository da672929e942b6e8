//! Monitor loop: reconciles live windows with panes
//!
//! Runs on its own thread. Each tick it updates borders of bound panes,
//! matches unbound windows against the unmatched rules and tears down panes
//! whose window disappeared. Matching, unmatched-set recomputation and
//! teardown only happen while no pane creation is in flight on the UI thread.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::RuleHandle;
use crate::constants::monitor;
use crate::errors::EngineError;

use super::backend::{PaneId, WindowId, WindowSystem};
use super::border::BorderMode;
use super::commands::{CommandSender, UiCommand};
use super::matcher::{self, Candidate};
use super::session::{Binding, Session};

/// Whether the loop should keep running after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Stopped,
}

/// One enumeration pass over the desktop
#[derive(Debug, Default)]
struct Enumeration {
    windows: Vec<Candidate>,
    foreground: Option<WindowId>,
}

pub struct Monitor<W: WindowSystem> {
    desktop: W,
    session: Arc<Session>,
    commands: CommandSender,
    /// Eligible rules not bound to a pane
    unmatched: Vec<RuleHandle>,
    needs_reload: bool,
    /// Panes whose destruction was requested but not yet unbound
    closing: HashSet<PaneId>,
    own_pid: u32,
}

impl<W: WindowSystem> Monitor<W> {
    pub fn new(desktop: W, session: Arc<Session>, commands: CommandSender) -> Self {
        let mut monitor = Self {
            desktop,
            session,
            commands,
            unmatched: Vec::new(),
            needs_reload: false,
            closing: HashSet::new(),
            own_pid: std::process::id(),
        };
        monitor.reload_unmatched();
        monitor
    }

    /// Override the process id whose windows are skipped
    pub fn with_own_pid(mut self, pid: u32) -> Self {
        self.own_pid = pid;
        self
    }

    pub fn unmatched(&self) -> &[RuleHandle] {
        &self.unmatched
    }

    /// Eligible rules minus those bound to panes that are not closing
    fn reload_unmatched(&mut self) {
        let bound: Vec<RuleHandle> = self
            .session
            .snapshot()
            .into_iter()
            .filter(|(pane, _)| !self.closing.contains(pane))
            .map(|(_, binding)| binding.rule)
            .collect();

        self.unmatched = self
            .session
            .store()
            .rules()
            .into_iter()
            .filter(|rule| rule.is_eligible())
            .filter(|rule| !bound.iter().any(|b| Arc::ptr_eq(b, rule)))
            .collect();

        debug!(unmatched = self.unmatched.len(), "Recomputed unmatched rules");
    }

    fn enumerate_once(&self) -> anyhow::Result<Enumeration> {
        let mut windows = Vec::new();
        for window in self.desktop.top_level_windows()? {
            if self.desktop.owning_pid(window)? == Some(self.own_pid) {
                continue;
            }
            let Some(title) = self.desktop.window_title(window)? else {
                continue;
            };
            if title.is_empty() {
                continue;
            }
            match self.desktop.window_bounds(window)? {
                Some(bounds) if !bounds.size().is_empty() => {}
                _ => continue,
            }
            windows.push(Candidate { window, title });
        }

        Ok(Enumeration {
            windows,
            foreground: self.desktop.foreground_window()?,
        })
    }

    /// Enumeration with immediate retries
    fn enumerate(&self) -> Result<Enumeration, EngineError> {
        let mut last_error = None;
        for attempt in 1..=monitor::ENUMERATION_ATTEMPTS {
            match self.enumerate_once() {
                Ok(enumeration) => return Ok(enumeration),
                Err(e) => {
                    debug!(attempt, error = %e, "Window enumeration failed, retrying");
                    last_error = Some(e);
                }
            }
        }
        Err(EngineError::EnumerationTransient {
            attempts: monitor::ENUMERATION_ATTEMPTS,
            reason: last_error.map(|e| format!("{:#}", e)).unwrap_or_default(),
        })
    }

    fn post(&self, command: UiCommand) -> bool {
        if self.commands.send(command).is_err() {
            debug!("UI thread is gone, dropping command");
            return false;
        }
        true
    }

    /// One reconciliation pass
    pub fn tick(&mut self) -> Tick {
        if self.session.is_shutting_down() {
            return Tick::Stopped;
        }

        // Sampled once: a creation finishing mid-tick must not unlock matching
        // against bindings captured before it was bound
        let idle = self.session.is_idle();

        if self.needs_reload && idle {
            self.reload_unmatched();
            self.needs_reload = false;
        }

        let bound = self.session.snapshot();

        let enumeration = match self.enumerate() {
            Ok(enumeration) => enumeration,
            Err(err) => {
                warn!(error = %err, "Skipping reconciliation for this tick");
                return Tick::Continue;
            }
        };
        let seen: HashSet<WindowId> = enumeration.windows.iter().map(|c| c.window).collect();
        let bound_windows: HashSet<WindowId> = bound.iter().map(|(_, b)| b.window).collect();

        for (pane, binding) in &bound {
            if !seen.contains(&binding.window) || self.closing.contains(pane) {
                continue;
            }
            let is_foreground = enumeration.foreground == Some(binding.window);
            let is_iconic = !is_foreground
                && self
                    .desktop
                    .is_iconic(binding.window)
                    .inspect_err(|e| debug!(window = binding.window, error = %e, "Iconic query failed"))
                    .unwrap_or(false);
            self.post(UiCommand::SetBorder {
                pane: *pane,
                mode: BorderMode::from_status(is_foreground, is_iconic),
            });
        }

        if idle {
            let unbound: Vec<Candidate> = enumeration
                .windows
                .iter()
                .filter(|c| !bound_windows.contains(&c.window))
                .cloned()
                .collect();
            self.match_windows(&unbound);
        }

        // Requests posted by this tick keep teardown waiting
        if idle && self.session.is_idle() {
            self.tear_down_stale(&bound, &seen);
        }

        Tick::Continue
    }

    fn match_windows(&mut self, unbound: &[Candidate]) {
        if unbound.is_empty() || self.unmatched.is_empty() {
            return;
        }

        let store = Arc::clone(self.session.store());
        let plan = matcher::match_batch(unbound, &self.unmatched, |rule| store.mint(rule));
        if plan.matches.is_empty() {
            return;
        }

        for found in &plan.matches {
            info!(window = found.window, title = %found.title, "Requesting pane for window");
            self.session.begin_creation();
            let sent = self.post(UiCommand::CreatePane {
                pane: self.session.allocate_pane(),
                window: found.window,
                title: found.title.clone(),
                rule: Arc::clone(&found.rule),
            });
            if !sent {
                self.session.finish_creation();
            }
        }
        self.needs_reload = true;

        if plan.apply(&store)
            && let Err(err) = store.save()
        {
            error!(error = %err, "Failed to save rewritten rules");
            self.post(UiCommand::Report(err.to_string()));
        }
    }

    fn tear_down_stale(&mut self, bound: &[(PaneId, Binding)], seen: &HashSet<WindowId>) {
        for (pane, binding) in bound {
            if seen.contains(&binding.window) || self.closing.contains(pane) {
                continue;
            }
            info!(pane = pane.0, window = binding.window, "Target window closed, tearing down pane");
            if binding.rule.is_eligible()
                && !self.unmatched.iter().any(|r| Arc::ptr_eq(r, &binding.rule))
            {
                self.unmatched.push(Arc::clone(&binding.rule));
            }
            self.post(UiCommand::DestroyPane { pane: *pane });
            self.closing.insert(*pane);
        }

        // Forget panes the UI thread has already unbound
        self.closing
            .retain(|pane| bound.iter().any(|(bound_pane, _)| bound_pane == pane));
    }

    /// First full pass, binding windows that are already open
    pub fn bootstrap(&mut self) -> Tick {
        info!(rules = self.unmatched.len(), "Bootstrapping window monitor");
        self.tick()
    }

    pub async fn run(mut self) {
        let interval = self.session.store().defaults().poll_interval();
        let mut state = self.bootstrap();
        while state == Tick::Continue {
            tokio::time::sleep(interval).await;
            state = self.tick();
        }
        info!("Window monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Rect;
    use crate::config::{ConfigStore, Document, GlobalDefaults, MatchRule};
    use crate::daemon::commands::{self, CommandReceiver};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    struct FakeWindow {
        title: String,
        pid: u32,
        iconic: bool,
    }

    type Hook = Box<dyn FnOnce() + Send>;

    #[derive(Default, Clone)]
    struct FakeDesktop {
        windows: Arc<Mutex<Vec<(WindowId, FakeWindow)>>>,
        foreground: Arc<Mutex<Option<WindowId>>>,
        failures: Arc<Mutex<usize>>,
        /// Runs inside the next enumeration, standing in for the UI thread
        during_enumeration: Arc<Mutex<Option<Hook>>>,
    }

    impl FakeDesktop {
        fn open(&self, window: WindowId, title: &str) {
            self.windows.lock().unwrap().push((
                window,
                FakeWindow {
                    title: title.to_string(),
                    pid: 100,
                    iconic: false,
                },
            ));
        }

        fn open_owned(&self, window: WindowId, title: &str, pid: u32) {
            self.open(window, title);
            self.windows.lock().unwrap().last_mut().unwrap().1.pid = pid;
        }

        fn close(&self, window: WindowId) {
            self.windows.lock().unwrap().retain(|(w, _)| *w != window);
        }

        fn set_iconic(&self, window: WindowId, iconic: bool) {
            for (w, info) in self.windows.lock().unwrap().iter_mut() {
                if *w == window {
                    info.iconic = iconic;
                }
            }
        }

        fn get(&self, window: WindowId) -> Option<FakeWindow> {
            self.windows
                .lock()
                .unwrap()
                .iter()
                .find(|(w, _)| *w == window)
                .map(|(_, info)| info.clone())
        }
    }

    impl WindowSystem for FakeDesktop {
        fn top_level_windows(&self) -> anyhow::Result<Vec<WindowId>> {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                anyhow::bail!("transient enumeration failure");
            }
            drop(failures);
            if let Some(hook) = self.during_enumeration.lock().unwrap().take() {
                hook();
            }
            Ok(self.windows.lock().unwrap().iter().map(|(w, _)| *w).collect())
        }

        fn window_title(&self, window: WindowId) -> anyhow::Result<Option<String>> {
            Ok(self.get(window).map(|w| w.title))
        }

        fn owning_pid(&self, window: WindowId) -> anyhow::Result<Option<u32>> {
            Ok(self.get(window).map(|w| w.pid))
        }

        fn foreground_window(&self) -> anyhow::Result<Option<WindowId>> {
            Ok(*self.foreground.lock().unwrap())
        }

        fn is_iconic(&self, window: WindowId) -> anyhow::Result<bool> {
            Ok(self.get(window).is_some_and(|w| w.iconic))
        }

        fn window_bounds(&self, window: WindowId) -> anyhow::Result<Option<Rect>> {
            Ok(self.get(window).map(|_| Rect::new(0, 0, 800, 600)))
        }
    }

    fn rule(title: &str, width: i32, height: i32) -> MatchRule {
        MatchRule {
            title: Some(title.to_string()),
            width,
            height,
            ..Default::default()
        }
    }

    struct Harness {
        desktop: FakeDesktop,
        session: Arc<Session>,
        monitor: Monitor<FakeDesktop>,
        rx: CommandReceiver,
        _dir: tempfile::TempDir,
    }

    fn harness(rules: Vec<MatchRule>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::from_document(
            dir.path().join("config.json"),
            Document {
                windows: rules,
                defaults: GlobalDefaults::default(),
            },
        );
        let session = Arc::new(Session::new(Arc::new(store)));
        let desktop = FakeDesktop::default();
        let (tx, rx) = commands::channel();
        let monitor = Monitor::new(desktop.clone(), Arc::clone(&session), tx).with_own_pid(42);
        Harness {
            desktop,
            session,
            monitor,
            rx,
            _dir: dir,
        }
    }

    fn drain(rx: &mut CommandReceiver) -> Vec<UiCommand> {
        let mut out = Vec::new();
        while let Ok(command) = rx.try_recv() {
            out.push(command);
        }
        out
    }

    /// Plays the UI thread: binds every requested pane and unbinds destroyed ones
    fn settle(h: &mut Harness) -> (Vec<PaneId>, Vec<PaneId>, HashMap<PaneId, BorderMode>) {
        let mut created = Vec::new();
        let mut destroyed = Vec::new();
        let mut borders = HashMap::new();
        for command in drain(&mut h.rx) {
            match command {
                UiCommand::CreatePane {
                    pane, window, rule, ..
                } => {
                    h.session.bind(pane, window, rule);
                    h.session.finish_creation();
                    created.push(pane);
                }
                UiCommand::DestroyPane { pane } => {
                    h.session.unbind(pane);
                    destroyed.push(pane);
                }
                UiCommand::SetBorder { pane, mode } => {
                    borders.insert(pane, mode);
                }
                _ => {}
            }
        }
        (created, destroyed, borders)
    }

    #[test]
    fn test_exact_match_binds_once_across_ticks() {
        let mut h = harness(vec![rule("Notepad", 300, 200)]);
        h.desktop.open(1, "Notepad");

        assert_eq!(h.monitor.bootstrap(), Tick::Continue);
        let (created, _, _) = settle(&mut h);
        assert_eq!(created.len(), 1);

        for _ in 0..3 {
            h.monitor.tick();
            let (created, destroyed, borders) = settle(&mut h);
            assert!(created.is_empty());
            assert!(destroyed.is_empty());
            assert_eq!(borders.len(), 1);
        }
        assert_eq!(h.session.snapshot().len(), 1);
        assert_eq!(h.session.store().rules().len(), 1);
        assert!(h.monitor.unmatched().is_empty());
    }

    #[test]
    fn test_pattern_rule_forks_per_window() {
        let mut h = harness(vec![rule("Chrome.*", 400, 300)]);
        h.desktop.open(1, "Chrome - Tab A");
        h.desktop.open(2, "Chrome - Tab B");

        h.monitor.bootstrap();
        let (created, _, _) = settle(&mut h);
        assert_eq!(created.len(), 2);

        let rules = h.session.store().rules();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].snapshot().disabled, Some(true));
        assert!(rules[1..].iter().all(|r| r.snapshot().disabled == Some(false)));

        // The rewritten document was saved
        assert!(!h.session.store().is_dirty());
        assert!(h.session.store().path().exists());

        h.monitor.tick();
        let (created, _, _) = settle(&mut h);
        assert!(created.is_empty());
        assert_eq!(h.session.store().rules().len(), 3);
    }

    #[test]
    fn test_closed_window_tears_down_once_and_returns_rule() {
        let mut h = harness(vec![rule("Notepad", 300, 200)]);
        h.desktop.open(1, "Notepad");
        h.monitor.bootstrap();
        let (created, _, _) = settle(&mut h);
        let pane = created[0];

        h.monitor.tick();
        settle(&mut h);

        h.desktop.close(1);
        h.monitor.tick();
        let commands = drain(&mut h.rx);
        let destroys: Vec<_> = commands
            .iter()
            .filter(|c| matches!(c, UiCommand::DestroyPane { pane: p } if *p == pane))
            .collect();
        assert_eq!(destroys.len(), 1);
        assert_eq!(h.monitor.unmatched().len(), 1);

        // UI has not processed the destroy yet: no second request
        h.monitor.tick();
        assert!(
            drain(&mut h.rx)
                .iter()
                .all(|c| !matches!(c, UiCommand::DestroyPane { .. }))
        );

        h.session.unbind(pane);
        h.desktop.open(2, "Notepad");
        h.monitor.tick();
        let (created, _, _) = settle(&mut h);
        assert_eq!(created.len(), 1);
    }

    #[test]
    fn test_pending_creation_gates_matching_and_teardown() {
        let mut h = harness(vec![rule("Notepad", 300, 200), rule("Editor", 300, 200)]);
        h.desktop.open(1, "Notepad");
        h.monitor.bootstrap();

        // CreatePane not processed yet: pending counter is 1
        let first = drain(&mut h.rx);
        assert_eq!(first.len(), 1);
        assert_eq!(h.session.pending_creations(), 1);

        h.desktop.open(2, "Editor");
        h.monitor.tick();
        assert!(drain(&mut h.rx).is_empty());

        // Simulate the UI thread finishing the first pane
        if let UiCommand::CreatePane {
            pane, window, rule, ..
        } = first.into_iter().next().unwrap()
        {
            h.session.bind(pane, window, rule);
            h.session.finish_creation();
        }

        h.monitor.tick();
        let (created, _, _) = settle(&mut h);
        assert_eq!(created.len(), 1);
        assert_eq!(h.session.snapshot().len(), 2);
    }

    #[test]
    fn test_creation_bound_during_enumeration_is_not_requested_again() {
        let mut h = harness(vec![rule("Notepad", 300, 200)]);
        h.desktop.open(1, "Notepad");
        h.monitor.bootstrap();

        let Some(UiCommand::CreatePane {
            pane, window, rule, ..
        }) = drain(&mut h.rx).into_iter().next()
        else {
            panic!("expected a pane request");
        };

        // The UI thread binds the pane while the monitor is enumerating
        let session = Arc::clone(&h.session);
        *h.desktop.during_enumeration.lock().unwrap() = Some(Box::new(move || {
            session.bind(pane, window, rule);
            session.finish_creation();
        }));

        h.monitor.tick();
        let (created, destroyed, _) = settle(&mut h);
        assert!(created.is_empty());
        assert!(destroyed.is_empty());

        h.monitor.tick();
        let (created, _, _) = settle(&mut h);
        assert!(created.is_empty());
        assert_eq!(h.session.snapshot().len(), 1);
        assert!(h.monitor.unmatched().is_empty());
    }

    #[test]
    fn test_failed_creation_leaves_rule_unmatched() {
        let mut h = harness(vec![rule("Notepad", 300, 200)]);
        h.desktop.open(1, "Notepad");
        h.monitor.bootstrap();

        // UI thread fails to build the pane: counter released, nothing bound
        assert_eq!(drain(&mut h.rx).len(), 1);
        h.session.finish_creation();

        h.monitor.tick();
        let (created, _, _) = settle(&mut h);
        assert_eq!(created.len(), 1);
    }

    #[test]
    fn test_border_modes_follow_window_status() {
        let mut h = harness(vec![rule("Notepad", 300, 200)]);
        h.desktop.open(1, "Notepad");
        h.monitor.bootstrap();
        let (created, _, _) = settle(&mut h);
        let pane = created[0];

        h.monitor.tick();
        assert_eq!(settle(&mut h).2[&pane], BorderMode::Inactive);

        h.desktop.set_iconic(1, true);
        h.monitor.tick();
        assert_eq!(settle(&mut h).2[&pane], BorderMode::Minimized);

        *h.desktop.foreground.lock().unwrap() = Some(1);
        h.monitor.tick();
        assert_eq!(settle(&mut h).2[&pane], BorderMode::Active);
    }

    #[test]
    fn test_own_windows_are_skipped() {
        let mut h = harness(vec![rule("Preview: Notepad", 300, 200)]);
        h.desktop.open_owned(9, "Preview: Notepad", 42);
        h.monitor.bootstrap();
        assert!(drain(&mut h.rx).is_empty());
    }

    #[test]
    fn test_transient_enumeration_is_retried() {
        let mut h = harness(vec![rule("Notepad", 300, 200)]);
        h.desktop.open(1, "Notepad");
        *h.desktop.failures.lock().unwrap() = 2;
        h.monitor.bootstrap();
        let (created, _, _) = settle(&mut h);
        assert_eq!(created.len(), 1);
    }

    #[test]
    fn test_failed_enumeration_never_tears_down() {
        let mut h = harness(vec![rule("Notepad", 300, 200)]);
        h.desktop.open(1, "Notepad");
        h.monitor.bootstrap();
        settle(&mut h);

        *h.desktop.failures.lock().unwrap() = monitor::ENUMERATION_ATTEMPTS;
        assert_eq!(h.monitor.tick(), Tick::Continue);
        assert!(drain(&mut h.rx).is_empty());
        assert_eq!(h.session.snapshot().len(), 1);
    }

    #[test]
    fn test_shutdown_stops_loop() {
        let mut h = harness(vec![]);
        h.session.request_shutdown();
        assert_eq!(h.monitor.tick(), Tick::Stopped);
    }

    #[test]
    fn test_ineligible_rules_never_match() {
        let mut disabled = rule("Notepad", 300, 200);
        disabled.disabled = Some(true);
        let mut h = harness(vec![disabled, rule("Editor", 0, 200)]);
        h.desktop.open(1, "Notepad");
        h.desktop.open(2, "Editor");
        h.monitor.bootstrap();
        assert!(drain(&mut h.rx).is_empty());
        assert!(h.monitor.unmatched().is_empty());
    }
}
