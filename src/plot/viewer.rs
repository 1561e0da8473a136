//! Handing a rendered chart to an image viewer.

use crate::error::PlotError;
use std::path::Path;
use std::process::Command;
use tracing::{info, warn};

/// Platform default for opening an image.
struct DefaultViewer {
    program: &'static str,
    args: &'static [&'static str],
    /// Whether the command waits for the viewer window to close.
    blocks: bool,
}

fn default_viewer() -> DefaultViewer {
    if cfg!(target_os = "windows") {
        DefaultViewer {
            program: "cmd",
            args: &["/C", "start", "/WAIT", ""],
            blocks: true,
        }
    } else if cfg!(target_os = "macos") {
        DefaultViewer {
            program: "open",
            args: &["-W"],
            blocks: true,
        }
    } else {
        // xdg-open hands the file to the desktop handler and exits
        DefaultViewer {
            program: "xdg-open",
            args: &[],
            blocks: false,
        }
    }
}

/// Open `path` in a viewer and block until the viewer process exits.
///
/// `viewer` is a command line such as `feh --scale-down`; the image path is
/// appended as the last argument. Without one the platform opener is used,
/// which on Linux returns as soon as the desktop handler has started.
pub fn open_blocking(path: &Path, viewer: Option<&str>) -> Result<(), PlotError> {
    let (mut command, name) = match viewer {
        Some(line) => {
            let mut parts = line.split_whitespace();
            let program = parts.next().unwrap_or_default();
            let mut command = Command::new(program);
            command.args(parts);
            (command, line.to_string())
        }
        None => {
            let default = default_viewer();
            if !default.blocks {
                warn!(
                    "{} does not wait for the viewer to close; set plot.viewer (e.g. \"eog\") to block",
                    default.program
                );
            }
            let mut command = Command::new(default.program);
            command.args(default.args);
            (command, default.program.to_string())
        }
    };
    command.arg(path);

    info!("Opening {} with {}", path.display(), name);

    let status = command
        .status()
        .map_err(|source| PlotError::Viewer { viewer: name.clone(), source })?;

    if !status.success() {
        warn!("Viewer '{}' exited with {}", name, status);
    }
    Ok(())
}
