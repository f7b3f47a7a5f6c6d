//! OS input-injection seam.
//!
//! Injection itself is external; the arbiter is the only caller of this
//! interface, which keeps cursor, click, and scroll calls serialized. The
//! default adapter shells out to an `xdotool`-compatible injector.

use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};

use crate::event::Button;

/// Input-injection sink interface.
pub trait InputSink: Send {
    /// Place the cursor at absolute screen pixels.
    fn move_cursor(&mut self, x: i32, y: i32) -> Result<()>;
    /// Synthesize a click.
    fn click(&mut self, button: Button) -> Result<()>;
    /// Synthesize scroll ticks; positive scrolls up/away.
    fn scroll(&mut self, amount: i32) -> Result<()>;
}

// xdotool wheel buttons.
const WHEEL_UP: &str = "4";
const WHEEL_DOWN: &str = "5";

/// Adapter invoking an `xdotool`-compatible injector command.
pub struct CommandSink {
    program: Vec<String>,
}

impl CommandSink {
    pub fn new(command: &str) -> Result<Self> {
        let program = shell_words::split(command)
            .with_context(|| format!("failed to parse injector command {command:?}"))?;
        if program.is_empty() {
            return Err(anyhow!("injector command is empty"));
        }
        Ok(Self { program })
    }

    fn run(&self, args: &[String]) -> Result<()> {
        let status = Command::new(&self.program[0])
            .args(&self.program[1..])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("failed to start injector {:?}", self.program[0]))?;
        if status.success() {
            Ok(())
        } else {
            Err(anyhow!("injector exited with status {status}"))
        }
    }
}

impl InputSink for CommandSink {
    fn move_cursor(&mut self, x: i32, y: i32) -> Result<()> {
        self.run(&["mousemove".to_string(), x.to_string(), y.to_string()])
    }

    fn click(&mut self, button: Button) -> Result<()> {
        let number = match button {
            Button::Left => "1",
            Button::Right => "3",
        };
        self.run(&["click".to_string(), number.to_string()])
    }

    fn scroll(&mut self, amount: i32) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let wheel = if amount > 0 { WHEEL_UP } else { WHEEL_DOWN };
        self.run(&[
            "click".to_string(),
            "--repeat".to_string(),
            amount.unsigned_abs().to_string(),
            wheel.to_string(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injector_command_is_split_shell_style() {
        let sink = CommandSink::new("xdotool --clearmodifiers").expect("parse command");
        assert_eq!(sink.program, vec!["xdotool", "--clearmodifiers"]);
        assert!(CommandSink::new("").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn zero_scroll_is_a_no_op_even_with_a_broken_injector() {
        let mut sink = CommandSink::new("false").expect("parse command");
        assert!(sink.scroll(0).is_ok());
        assert!(sink.scroll(1).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn injection_failure_names_the_status() {
        let mut sink = CommandSink::new("false").expect("parse command");
        let err = sink.click(Button::Left).expect_err("injector must fail");
        assert!(err.to_string().contains("status"));
    }
}
