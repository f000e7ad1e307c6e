//! Speech synthesis collaborator
//!
//! The compiler's only obligation toward speech output is producing the
//! rendered text; playback is entirely the collaborator's problem. The
//! interpreter talks to a `Speaker`, the SSA code generator instead emits a
//! call sequence that shells out to the same command.

use crate::error::ProsaResult;
use std::io;
use std::process::Command;

/// Default speech synthesis command, also embedded in generated code.
pub const SPEECH_COMMAND: &str = "espeak";

pub trait Speaker {
    /// Hand the rendered text over and wait until it has been spoken.
    fn say(&mut self, text: &str) -> ProsaResult<()>;
}

/// Runs an external speech synthesis command with the text as its argument.
pub struct CommandSpeaker {
    program: String,
}

impl CommandSpeaker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CommandSpeaker {
    fn default() -> Self {
        Self::new(SPEECH_COMMAND)
    }
}

impl Speaker for CommandSpeaker {
    fn say(&mut self, text: &str) -> ProsaResult<()> {
        let status = Command::new(&self.program).arg(text).status()?;
        if !status.success() {
            return Err(io::Error::other(format!(
                "speech command '{}' exited with {}",
                self.program, status
            ))
            .into());
        }
        Ok(())
    }
}

/// Swallows speech output. Used by tests and anywhere audio is unwanted.
pub struct NullSpeaker;

impl Speaker for NullSpeaker {
    fn say(&mut self, _text: &str) -> ProsaResult<()> {
        Ok(())
    }
}
