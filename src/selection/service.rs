use crate::error::GliderError;
use crate::ipc::{ExpandedMessage, HostMessage, MenuMessage, WindowMessage};
use crate::selection::clipboard::{ArboardClipboard, ClipboardAccess};
use crate::selection::coordinator::{Coordinator, CoordinatorParts};
use crate::selection::hook::{DefaultHookBackend, HookBackend};
use crate::selection::monitor::{enable_per_monitor_dpi, DisplayTopology, SystemTopology};
use crate::selection::overlay::{ContentSink, DefaultOverlayFactory, OverlayFactory};
use crate::selection::platform::{default_platform, SelectionPlatform};
use crate::selection::types::InputEvent;
use crate::settings::Settings;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Upper bound on how long the worker waits for input before looking at
/// host commands again.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStatus {
    Stopped,
    Running,
    /// The OS refused the hook; only an explicit [`GliderService::start`]
    /// tries again.
    PermissionDenied,
    Failed,
}

/// The host's notification channel for persistent failures.
pub trait HostNotifier: Send + Sync {
    fn notify(&self, message: &str);
}

#[derive(Debug, Default)]
pub struct LogNotifier;

impl HostNotifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!(%message, "host notification");
    }
}

pub type ClipboardFactory = Arc<dyn Fn() -> Box<dyn ClipboardAccess> + Send + Sync>;
pub type TopologyFactory = Arc<dyn Fn() -> Box<dyn DisplayTopology> + Send + Sync>;

/// Everything besides the hook that the service builds a coordinator from.
#[derive(Clone)]
pub struct ServiceParts {
    pub platform: Arc<dyn SelectionPlatform>,
    pub clipboard: ClipboardFactory,
    pub topology: TopologyFactory,
    pub overlays: Arc<dyn OverlayFactory>,
    pub notifier: Arc<dyn HostNotifier>,
}

impl ServiceParts {
    /// The running OS, with overlay content delivered to `sink`.
    pub fn system(settings: &Settings, sink: Arc<dyn ContentSink>) -> Self {
        enable_per_monitor_dpi();
        let platform = default_platform(settings);
        tracing::info!(platform = platform.name(), "selection platform");
        let uniform_scale = platform.uniform_scale();
        Self {
            platform,
            clipboard: Arc::new(|| Box::new(ArboardClipboard) as Box<dyn ClipboardAccess>),
            topology: Arc::new(move || {
                Box::new(SystemTopology::new(uniform_scale)) as Box<dyn DisplayTopology>
            }),
            overlays: Arc::new(DefaultOverlayFactory::new(sink)),
            notifier: Arc::new(LogNotifier),
        }
    }
}

enum LoopCommand {
    Menu(MenuMessage),
    Expanded(ExpandedMessage),
    Session(bool),
    HostOpened,
    Shutdown,
}

struct WorkerHandle {
    command_tx: Sender<LoopCommand>,
    join: JoinHandle<()>,
}

/// Enables and disables the selection menu. One worker thread per enabled
/// lifetime owns the coordinator; the hook feeds it over a channel.
pub struct GliderService {
    settings: Settings,
    backend: Box<dyn HookBackend>,
    parts: ServiceParts,
    worker: Option<WorkerHandle>,
    status: HookStatus,
    signed_in: bool,
}

impl GliderService {
    pub fn new(settings: Settings, sink: Arc<dyn ContentSink>) -> Self {
        let parts = ServiceParts::system(&settings, sink);
        Self::new_with_backend(settings, Box::new(DefaultHookBackend::default()), parts)
    }

    pub fn new_with_backend(
        settings: Settings,
        backend: Box<dyn HookBackend>,
        parts: ServiceParts,
    ) -> Self {
        Self {
            settings,
            backend,
            parts,
            worker: None,
            status: HookStatus::Stopped,
            signed_in: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn status(&self) -> HookStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    /// Session state survives enable/disable cycles; the menu only appears for
    /// a signed-in user.
    pub fn set_signed_in(&mut self, signed_in: bool) {
        self.signed_in = signed_in;
        self.post(LoopCommand::Session(signed_in));
    }

    pub fn start(&mut self) {
        self.settings.glider_enabled = true;
        if self.status == HookStatus::PermissionDenied {
            self.status = HookStatus::Stopped;
        }
        self.start_running();
    }

    pub fn stop(&mut self) {
        self.settings.glider_enabled = false;
        self.stop_running();
    }

    pub fn apply_settings(&mut self, settings: Settings) {
        if self.settings == settings {
            return;
        }

        let enabled = settings.glider_enabled;
        let should_restart = self.worker.is_some();
        self.settings = settings;

        if enabled {
            if should_restart {
                self.stop_running();
            }
            self.start_running();
        } else {
            self.stop_running();
        }
    }

    pub fn post_menu(&self, message: MenuMessage) {
        self.post(LoopCommand::Menu(message));
    }

    pub fn post_expanded(&self, message: ExpandedMessage) {
        self.post(LoopCommand::Expanded(message));
    }

    pub fn handle_host_message(&mut self, message: HostMessage) {
        match message {
            HostMessage::Settings { data } => self.apply_settings(data),
            HostMessage::Menu(message) => self.post_menu(message),
            HostMessage::Expanded(message) => self.post_expanded(message),
            HostMessage::Window(WindowMessage::Login { .. }) => self.set_signed_in(true),
            HostMessage::Window(WindowMessage::Logout) => self.set_signed_in(false),
            HostMessage::Window(WindowMessage::Open) => self.post(LoopCommand::HostOpened),
        }
    }

    fn post(&self, command: LoopCommand) {
        match &self.worker {
            Some(worker) => {
                if worker.command_tx.send(command).is_err() {
                    tracing::warn!("selection worker is gone, message dropped");
                }
            }
            None => tracing::debug!("selection menu disabled, message dropped"),
        }
    }

    fn start_running(&mut self) {
        if self.worker.is_some() || !self.settings.glider_enabled {
            return;
        }
        if self.status == HookStatus::PermissionDenied {
            tracing::debug!("hook permission missing, waiting for an explicit start");
            return;
        }

        let parts = CoordinatorParts {
            platform: Arc::clone(&self.parts.platform),
            clipboard: (self.parts.clipboard)(),
            topology: (self.parts.topology)(),
            overlays: Arc::clone(&self.parts.overlays),
        };
        let mut coordinator = match Coordinator::new(&self.settings, parts) {
            Ok(coordinator) => coordinator,
            Err(err) => {
                tracing::error!(?err, "failed to create overlay windows");
                self.status = HookStatus::Failed;
                return;
            }
        };
        coordinator.set_signed_in(self.signed_in);

        let (event_tx, event_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel();

        if let Err(err) = self.backend.install(event_tx) {
            coordinator.teardown();
            if GliderError::is_permission(&err) {
                tracing::error!(?err, "global mouse hook denied");
                self.status = HookStatus::PermissionDenied;
                self.parts.notifier.notify(
                    "Text selection menu needs input monitoring permission. \
                     Grant it and enable the feature again.",
                );
            } else {
                tracing::error!(?err, "failed to install mouse hook");
                self.status = HookStatus::Failed;
            }
            return;
        }

        let join = thread::spawn(move || worker_loop(coordinator, event_rx, command_rx));
        self.worker = Some(WorkerHandle { command_tx, join });
        self.status = HookStatus::Running;
        tracing::info!("selection menu enabled");
    }

    fn stop_running(&mut self) {
        if self.worker.is_none() && !self.backend.is_installed() {
            if !self.settings.glider_enabled {
                self.status = HookStatus::Stopped;
            }
            return;
        }

        if let Err(err) = self.backend.uninstall() {
            tracing::error!(?err, "failed to uninstall mouse hook");
        }

        if let Some(worker) = self.worker.take() {
            let _ = worker.command_tx.send(LoopCommand::Shutdown);
            let _ = worker.join.join();
        }
        self.status = HookStatus::Stopped;
        tracing::info!("selection menu disabled");
    }
}

impl Drop for GliderService {
    fn drop(&mut self) {
        self.stop_running();
    }
}

fn worker_loop(
    mut coordinator: Coordinator,
    event_rx: Receiver<InputEvent>,
    command_rx: Receiver<LoopCommand>,
) {
    let mut hook_connected = true;
    loop {
        loop {
            match command_rx.try_recv() {
                Ok(LoopCommand::Menu(message)) => coordinator.handle_menu(message),
                Ok(LoopCommand::Expanded(message)) => coordinator.handle_expanded(message),
                Ok(LoopCommand::Session(signed_in)) => coordinator.set_signed_in(signed_in),
                Ok(LoopCommand::HostOpened) => coordinator.host_opened(),
                Ok(LoopCommand::Shutdown) | Err(TryRecvError::Disconnected) => {
                    coordinator.teardown();
                    return;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        let now = Instant::now();
        coordinator.fire_due(now);
        let timeout = coordinator
            .next_deadline()
            .map_or(POLL_INTERVAL, |deadline| {
                deadline.saturating_duration_since(now).min(POLL_INTERVAL)
            });

        if !hook_connected {
            thread::sleep(timeout);
            continue;
        }
        match event_rx.recv_timeout(timeout) {
            Ok(event) => coordinator.handle_input(&event, Instant::now()),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => hook_connected = false,
        }
    }
}
