//! Per-OS behaviour of the selection pipeline, chosen once at startup.

use crate::error::GliderError;
use crate::selection::clipboard::CopyTrigger;
use crate::settings::Settings;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Whether the OS reports an active text selection in the foreground window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionProbe {
    Active,
    Inactive,
    /// The probe could not answer; the gesture proceeds.
    Unknown,
}

impl SelectionProbe {
    pub fn should_extract(self) -> bool {
        !matches!(self, SelectionProbe::Inactive)
    }

    /// Interpret the probe helper's stdout: `0` means no selection, any other
    /// integer means a selection is active.
    pub fn from_output(stdout: &str) -> Self {
        match stdout.trim().parse::<i64>() {
            Ok(0) => SelectionProbe::Inactive,
            Ok(_) => SelectionProbe::Active,
            Err(_) => SelectionProbe::Unknown,
        }
    }
}

pub trait SelectionPlatform: CopyTrigger + Send + Sync {
    fn name(&self) -> &'static str;
    fn probe_selection(&self) -> SelectionProbe;
    /// `true` when window coordinates are not DPI-virtualized, so every
    /// display is treated as scale 1.0.
    fn uniform_scale(&self) -> bool;
}

/// Ctrl+C through `SendInput`, plus the optional out-of-process selection probe.
#[derive(Debug, Default)]
pub struct WindowsPlatform {
    probe_path: Option<PathBuf>,
}

impl WindowsPlatform {
    pub fn new(probe_path: Option<PathBuf>) -> Self {
        Self { probe_path }
    }
}

impl CopyTrigger for WindowsPlatform {
    fn send_copy(&self) -> anyhow::Result<()> {
        #[cfg(target_os = "windows")]
        {
            send_ctrl_c_windows()
        }
        #[cfg(not(target_os = "windows"))]
        {
            Err(GliderError::Keystroke("SendInput is only available on Windows".into()).into())
        }
    }
}

impl SelectionPlatform for WindowsPlatform {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn probe_selection(&self) -> SelectionProbe {
        let Some(path) = &self.probe_path else {
            return SelectionProbe::Unknown;
        };
        match run_probe(path) {
            Ok(probe) => probe,
            Err(err) => {
                tracing::debug!(?err, path = %path.display(), "selection probe failed");
                SelectionProbe::Unknown
            }
        }
    }

    fn uniform_scale(&self) -> bool {
        false
    }
}

fn run_probe(path: &Path) -> anyhow::Result<SelectionProbe> {
    let output = std::process::Command::new(path)
        .output()
        .map_err(|e| GliderError::Probe(e.to_string()))?;
    Ok(SelectionProbe::from_output(&String::from_utf8_lossy(
        &output.stdout,
    )))
}

#[cfg(target_os = "windows")]
fn send_ctrl_c_windows() -> anyhow::Result<()> {
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
        VIRTUAL_KEY, VK_CONTROL,
    };

    const VK_C: VIRTUAL_KEY = VIRTUAL_KEY(0x43);

    let key = |vk: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS| INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };

    // key down in order, key up in reverse order
    let inputs = [
        key(VK_CONTROL, KEYBD_EVENT_FLAGS(0)),
        key(VK_C, KEYBD_EVENT_FLAGS(0)),
        key(VK_C, KEYEVENTF_KEYUP),
        key(VK_CONTROL, KEYEVENTF_KEYUP),
    ];
    let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
    if sent as usize != inputs.len() {
        return Err(GliderError::Keystroke(format!(
            "SendInput injected {sent} of {} events",
            inputs.len()
        ))
        .into());
    }
    Ok(())
}

/// Cmd+C through `rdev`; window coordinates are already in points.
#[derive(Debug, Default)]
pub struct MacPlatform;

impl CopyTrigger for MacPlatform {
    fn send_copy(&self) -> anyhow::Result<()> {
        simulate_chord(rdev::Key::MetaLeft, rdev::Key::KeyC)
    }
}

impl SelectionPlatform for MacPlatform {
    fn name(&self) -> &'static str {
        "macos"
    }

    fn probe_selection(&self) -> SelectionProbe {
        SelectionProbe::Active
    }

    fn uniform_scale(&self) -> bool {
        true
    }
}

/// Ctrl+C through `rdev`.
#[derive(Debug, Default)]
pub struct LinuxPlatform;

impl CopyTrigger for LinuxPlatform {
    fn send_copy(&self) -> anyhow::Result<()> {
        simulate_chord(rdev::Key::ControlLeft, rdev::Key::KeyC)
    }
}

impl SelectionPlatform for LinuxPlatform {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn probe_selection(&self) -> SelectionProbe {
        SelectionProbe::Active
    }

    fn uniform_scale(&self) -> bool {
        true
    }
}

fn simulate_chord(modifier: rdev::Key, key: rdev::Key) -> anyhow::Result<()> {
    use rdev::EventType;

    let steps = [
        EventType::KeyPress(modifier),
        EventType::KeyPress(key),
        EventType::KeyRelease(key),
        EventType::KeyRelease(modifier),
    ];
    for step in &steps {
        rdev::simulate(step)
            .map_err(|e| GliderError::Keystroke(format!("{step:?}: {e:?}")))?;
        // Some window servers drop events that arrive back to back.
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    Ok(())
}

pub fn default_platform(settings: &Settings) -> Arc<dyn SelectionPlatform> {
    let probe_path = settings.selection_probe_path.as_ref().map(PathBuf::from);
    if cfg!(target_os = "windows") {
        Arc::new(WindowsPlatform::new(probe_path))
    } else if cfg!(target_os = "macos") {
        Arc::new(MacPlatform)
    } else {
        Arc::new(LinuxPlatform)
    }
}
