//! Narration capability: spoken playback of assistant messages.
//!
//! The store only needs to start a narration and later cancel it or ask
//! whether it finished; how speech is produced is up to the `Narrator`.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use thiserror::Error;
use tracing::debug;

/// Rate multiplier applied to every narration
pub const NARRATION_RATE: f32 = 1.2;
/// Preferred narration voice
pub const PREFERRED_VOICE: &str = "en-US";

/// Words per minute a speech engine uses at rate 1.0
const BASE_SPEECH_WPM: f32 = 175.0;

#[derive(Debug, Error)]
pub enum NarrationError {
    #[error("narration is not available on this system")]
    Unavailable,

    #[error("failed to start narration: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Text plus voice parameters for one narration.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<String>,
}

impl Utterance {
    /// Utterance with the default narration parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rate: NARRATION_RATE,
            pitch: 1.0,
            volume: 1.0,
            voice: Some(PREFERRED_VOICE.to_string()),
        }
    }
}

/// A narration in progress.
pub trait NarrationHandle: Send {
    /// True once playback ended on its own (or was cancelled).
    fn is_finished(&mut self) -> bool;

    /// Stop playback. Idempotent.
    fn cancel(&mut self);
}

/// Something that can speak text.
pub trait Narrator: Send + Sync {
    fn speak(&self, utterance: &Utterance) -> Result<Box<dyn NarrationHandle>, NarrationError>;
}

// ============================================================================
// CommandNarrator
// ============================================================================

/// Narrates through a system speech command run as a child process.
///
/// Understands espeak/espeak-ng flags, and macOS `say`.
#[derive(Debug, Clone)]
pub struct CommandNarrator {
    program: PathBuf,
}

impl CommandNarrator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use `NARRATOR_COMMAND` if set, otherwise the first speech command found
    /// on `PATH`. `None` when nothing is available (or `NARRATOR_COMMAND=disabled`).
    pub fn from_env() -> Option<Self> {
        match std::env::var("NARRATOR_COMMAND") {
            Ok(cmd) if cmd.eq_ignore_ascii_case("disabled") => None,
            Ok(cmd) if !cmd.trim().is_empty() => {
                let path = PathBuf::from(cmd.trim());
                if path.components().count() > 1 {
                    path.is_file().then(|| Self::new(path))
                } else {
                    find_in_path(&path).map(Self::new)
                }
            }
            _ => ["espeak-ng", "espeak", "say"]
                .iter()
                .find_map(|name| find_in_path(Path::new(name)))
                .map(Self::new),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn is_say(&self) -> bool {
        self.program.file_name().and_then(|n| n.to_str()) == Some("say")
    }

    /// Command-line arguments for `utterance`.
    pub fn args(&self, utterance: &Utterance) -> Vec<String> {
        let wpm = (BASE_SPEECH_WPM * utterance.rate).round() as u32;
        let mut args = Vec::new();

        if self.is_say() {
            args.push("-r".to_string());
            args.push(wpm.to_string());
        } else {
            args.push("-s".to_string());
            args.push(wpm.to_string());
            args.push("-p".to_string());
            args.push(((50.0 * utterance.pitch).round() as u32).min(99).to_string());
            args.push("-a".to_string());
            args.push(((100.0 * utterance.volume).round() as u32).min(200).to_string());
            if let Some(voice) = &utterance.voice {
                args.push("-v".to_string());
                args.push(voice.to_lowercase());
            }
        }

        args.push(utterance.text.clone());
        args
    }
}

impl Narrator for CommandNarrator {
    fn speak(&self, utterance: &Utterance) -> Result<Box<dyn NarrationHandle>, NarrationError> {
        debug!(program = %self.program.display(), chars = utterance.text.len(), "Starting narration");
        let child = Command::new(&self.program)
            .args(self.args(utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Box::new(ChildNarration { child: Some(child) }))
    }
}

struct ChildNarration {
    child: Option<Child>,
}

impl NarrationHandle for ChildNarration {
    fn is_finished(&mut self) -> bool {
        match self.child.as_mut().map(|c| c.try_wait()) {
            Some(Ok(None)) => false,
            Some(Ok(Some(_))) | Some(Err(_)) | None => {
                self.child = None;
                true
            }
        }
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for ChildNarration {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn find_in_path(name: &Path) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_utterance() {
        let u = Utterance::new("hello");
        assert_eq!(u.rate, 1.2);
        assert_eq!(u.pitch, 1.0);
        assert_eq!(u.volume, 1.0);
        assert_eq!(u.voice.as_deref(), Some("en-US"));
    }

    #[test]
    fn test_espeak_args() {
        let narrator = CommandNarrator::new("/usr/bin/espeak-ng");
        let args = narrator.args(&Utterance::new("read this"));
        assert_eq!(
            args,
            vec!["-s", "210", "-p", "50", "-a", "100", "-v", "en-us", "read this"]
        );
    }

    #[test]
    fn test_say_args() {
        let narrator = CommandNarrator::new("/usr/bin/say");
        let args = narrator.args(&Utterance::new("read this"));
        assert_eq!(args, vec!["-r", "210", "read this"]);
    }

    #[test]
    fn test_missing_program_fails_to_spawn() {
        let narrator = CommandNarrator::new("/nonexistent/pacechat-speech-binary");
        let result = narrator.speak(&Utterance::new("x"));
        assert!(matches!(result, Err(NarrationError::Spawn(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_child_narration_finishes_and_cancels() {
        // `true` exits immediately; `sleep` stays alive until cancelled
        let quick = Command::new("true").spawn().unwrap();
        let mut handle = ChildNarration { child: Some(quick) };
        let mut finished = false;
        for _ in 0..100 {
            if handle.is_finished() {
                finished = true;
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(finished);

        let slow = Command::new("sleep").arg("5").spawn().unwrap();
        let mut handle = ChildNarration { child: Some(slow) };
        assert!(!handle.is_finished());
        handle.cancel();
        assert!(handle.is_finished());
    }
}
