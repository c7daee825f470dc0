//! Console stand-ins for the door hardware
//!
//! Without a GPIO board the controller runs from a terminal: one Enter
//! press is the button going down, the next Enter is the button coming
//! back up, and PINs are typed on their own line. Ctrl-C or end of input
//! cancels the session.
//!
//! Lines arrive on an unbounded tokio channel fed by an async stdin task.
//! The orchestrator itself is blocking, so it must run on a blocking thread
//! (`spawn_blocking`) and drains the channel with `blocking_recv`.

use std::io::{self, Write};
use std::time::Instant;

use doorward_core::{Cancelled, IndicatorDriver, InputDevice, Signal};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One event from the terminal
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleEvent {
    Line(String),
    Interrupt,
}

/// Handle that cancels a blocked [`ConsoleInput`] from another task
#[derive(Clone, Debug)]
pub struct InterruptHandle {
    sender: mpsc::UnboundedSender<ConsoleEvent>,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        // Receiver gone means the session already ended
        let _ = self.sender.send(ConsoleEvent::Interrupt);
    }
}

/// Button and keypad backed by terminal lines
#[derive(Debug)]
pub struct ConsoleInput {
    receiver: mpsc::UnboundedReceiver<ConsoleEvent>,
    sender: mpsc::UnboundedSender<ConsoleEvent>,
    closed: bool,
}

impl ConsoleInput {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<ConsoleEvent>,
        sender: mpsc::UnboundedSender<ConsoleEvent>,
    ) -> Self {
        Self {
            receiver,
            sender,
            closed: false,
        }
    }

    /// Read stdin on a tokio task; end of input interrupts
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_stdin() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let reader = sender.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if reader.send(ConsoleEvent::Line(line)).is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("stdin read failed: {}", e);
                        break;
                    }
                }
            }
            let _ = reader.send(ConsoleEvent::Interrupt);
        });
        Self::new(receiver, sender)
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            sender: self.sender.clone(),
        }
    }

    fn next_line(&mut self) -> Result<String, Cancelled> {
        if self.closed {
            return Err(Cancelled);
        }
        match self.receiver.blocking_recv() {
            Some(ConsoleEvent::Line(line)) => Ok(line),
            Some(ConsoleEvent::Interrupt) | None => {
                self.closed = true;
                Err(Cancelled)
            }
        }
    }
}

fn prompt(text: &str) {
    let mut stdout = io::stdout();
    let _ = write!(stdout, "{}", text);
    let _ = stdout.flush();
}

impl InputDevice for ConsoleInput {
    fn wait_for_press(&mut self) -> Result<Instant, Cancelled> {
        prompt("[button] Enter to press: ");
        self.next_line()?;
        Ok(Instant::now())
    }

    fn wait_for_release(&mut self) -> Result<Instant, Cancelled> {
        prompt("[button] Enter to release: ");
        self.next_line()?;
        Ok(Instant::now())
    }

    fn solicit_credential(&mut self) -> Result<String, Cancelled> {
        prompt("Enter PIN: ");
        self.next_line().map(|line| line.trim().to_string())
    }
}

/// Indicator driver that reports every transition through tracing
#[derive(Debug, Default)]
pub struct TracingIndicators {
    grant: bool,
    deny: bool,
    unlock: bool,
}

impl TracingIndicators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self, signal: Signal) -> bool {
        match signal {
            Signal::Grant => self.grant,
            Signal::Deny => self.deny,
            Signal::Unlock => self.unlock,
        }
    }
}

impl IndicatorDriver for TracingIndicators {
    fn set(&mut self, signal: Signal, on: bool) {
        let slot = match signal {
            Signal::Grant => &mut self.grant,
            Signal::Deny => &mut self.deny,
            Signal::Unlock => &mut self.unlock,
        };
        if *slot == on {
            return;
        }
        *slot = on;
        if signal == Signal::Unlock {
            info!("Door {}", if on { "UNLOCKED" } else { "locked" });
        } else {
            debug!("{:?} indicator {}", signal, if on { "on" } else { "off" });
        }
    }
}
