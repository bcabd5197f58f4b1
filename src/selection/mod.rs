//! Global text-selection capture and the contextual overlay it drives.

pub mod clipboard;
pub mod coordinator;
pub mod engine;
pub mod expanded;
pub mod hook;
pub mod monitor;
pub mod overlay;
pub mod placement;
pub mod platform;
pub mod service;
pub mod types;

pub use clipboard::{
    ArboardClipboard, ClipboardAccess, CopyTrigger, MemoryClipboard, SelectionExtractor,
};
pub use coordinator::{Coordinator, CoordinatorParts, OverlayState, SuppressSource};
pub use engine::{GestureReducer, Signal};
pub use expanded::{ExpandedGeometry, ExpandedSpawner};
pub use hook::{DefaultHookBackend, HookBackend, MockHookBackend, MockHookHandle};
pub use monitor::{
    display_contains_point, display_nearest_point, enable_per_monitor_dpi, DisplayInfo,
    DisplayTopology, StaticTopology, SystemTopology,
};
pub use overlay::{
    ContentMessage, ContentSink, OverlayFactory, OverlayRecord, OverlayRole, OverlayWindow,
    RecordingContentSink, RecordingOverlayFactory,
};
pub use placement::{place, MenuGeometry, PlacementMemory, PlacementResult};
pub use platform::{default_platform, SelectionPlatform, SelectionProbe};
pub use service::{GliderService, HookStatus, HostNotifier, ServiceParts};
pub use types::{
    CapturedSelection, InputEvent, InputKind, LogicalPoint, MouseButton, Placement, Rect,
    ScreenPoint, SelectionSpan, Size,
};
