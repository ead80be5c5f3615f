//! # Decoder Path Resolver
//!
//! This module handles finding and checking the external decoder:
//! - Explicit paths are used as given
//! - Bare names are looked up in the system PATH
//! - `<decoder> -version` must answer with an ffmpeg banner

use crate::args;
use crate::error::{Result, VideoHashError};
use crate::runner::BatchRunner;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Banner prefix printed by `ffmpeg -version`
const VERSION_BANNER: &str = "ffmpeg version";

/// Resolve the decoder to an executable path.
///
/// A path with a directory component is returned unchanged. A bare name
/// (`ffmpeg`) is searched in PATH and returned unchanged when not found,
/// leaving the spawn to report the failure.
pub fn resolve_tool(tool: &Path) -> PathBuf {
    if tool.components().count() > 1 {
        return tool.to_path_buf();
    }

    let name = tool.to_string_lossy();
    match find_in_system_path(&name) {
        Some(path) => {
            debug!("Resolved tool: {} -> {:?}", name, path);
            path
        }
        None => {
            warn!("Tool not found in PATH: {}", name);
            tool.to_path_buf()
        }
    }
}

/// Find tool in system PATH
fn find_in_system_path(tool_name: &str) -> Option<PathBuf> {
    let extension = if cfg!(windows) && !tool_name.ends_with(".exe") { ".exe" } else { "" };
    let tool_with_ext = format!("{}{}", tool_name, extension);

    env::split_paths(&env::var_os("PATH")?)
        .map(|dir| dir.join(&tool_with_ext))
        .find(|path| path.is_file())
}

/// Run `<decoder> -version` and check that it is really ffmpeg.
///
/// Distinguishes a wrong path (`ToolNotFound`) from a wrong program
/// (`ToolMisbehaved`). A decoder that does not answer within `timeout_secs`
/// is killed and counts as misbehaving.
pub async fn verify_decoder(decoder: &Path, timeout_secs: Option<u64>) -> Result<String> {
    let tool = format!("{} -version", decoder.display());

    let outcome = BatchRunner::new(1)
        .with_timeout(timeout_secs)
        .run(&[args![decoder.display(), "-version"]])
        .await?;
    let output = &outcome.outputs[0];

    if output.timed_out {
        return Err(VideoHashError::tool_misbehaved(tool, "no answer before the timeout"));
    }

    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    if !text.contains(VERSION_BANNER) {
        return Err(VideoHashError::tool_misbehaved(tool, output.text().trim()));
    }

    let version = text.lines().next().unwrap_or_default().trim().to_string();
    debug!("Decoder verified: {}", version);
    Ok(version)
}
