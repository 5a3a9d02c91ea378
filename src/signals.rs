//! Operator interrupts
//!
//! Ctrl-C does not stop the process while a program runs; it asks the
//! interpreter to drop into the debugger at the next step boundary. The
//! listener only ever sets the interrupt flag.

use std::io;
use std::thread;

use crate::interpreter::debugger::InterruptHandle;

/// Start a background listener that interrupts on every Ctrl-C
pub fn spawn_interrupt_listener(handle: InterruptHandle) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("interrupt-listener".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::warn!(error = %e, "interrupt listener stopped");
                        break;
                    }
                    tracing::debug!("interrupt requested");
                    handle.interrupt();
                }
            })
        })?;

    Ok(())
}
