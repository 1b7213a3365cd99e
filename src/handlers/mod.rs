//! DCC++ command handlers.
//!
//! One unit struct per command identifier, grouped by what they act on:
//!
//! | Module | Commands |
//! |--------|----------|
//! | `entities` | `T` `Tex` `a` `Z` `Zex` `S` |
//! | `locomotive` | `t` `tex` `f` `fex` |
//! | `system` | `s` `E` `e` `1` `0` `c` `F` `estop` `C` |
//! | `programming` | `R` `W` `B` `w` `b` |
//!
//! [`register_all`] installs the full set; output and sensor commands are
//! left out when their feature is disabled.

pub mod entities;
pub mod locomotive;
pub mod programming;
pub mod system;

use crate::config::StationConfig;
use crate::registry::{
    CommandError, CommandHandler, CommandRegistry, COMMAND_FAILED_RESPONSE,
    COMMAND_SUCCESSFUL_RESPONSE,
};

/// Registers every handler enabled by `config`.
///
/// Built-in identifiers are unique, so a clash here is a wiring bug: it
/// panics in debug builds and is logged and skipped in release builds.
pub fn register_all(registry: &mut CommandRegistry, config: &StationConfig) {
    for handler in builtin_handlers(config) {
        if let Err(err) = registry.register(handler) {
            if cfg!(debug_assertions) {
                panic!("built-in handler clash: {err}");
            }
            log::error!("[Registry] Built-in handler skipped: {err}");
        }
    }
}

fn builtin_handlers(config: &StationConfig) -> Vec<Box<dyn CommandHandler>> {
    let mut handlers: Vec<Box<dyn CommandHandler>> = vec![
        Box::new(locomotive::Throttle),
        Box::new(locomotive::ThrottleEx),
        Box::new(locomotive::Function),
        Box::new(locomotive::FunctionEx),
        Box::new(system::Consist),
        Box::new(entities::Accessory),
        Box::new(system::PowerOn),
        Box::new(system::PowerOff),
        Box::new(system::CurrentDraw),
        Box::new(system::Status),
        Box::new(programming::ReadCv),
        Box::new(programming::WriteCvByte),
        Box::new(programming::WriteCvBit),
        Box::new(programming::WriteOpsCvByte),
        Box::new(programming::WriteOpsCvBit),
        Box::new(system::EraseAll),
        Box::new(system::StoreAll),
    ];
    if config.features.outputs {
        handlers.push(Box::new(entities::OutputCommand));
        handlers.push(Box::new(entities::OutputEx));
    }
    handlers.push(Box::new(entities::TurnoutCommand));
    handlers.push(Box::new(entities::TurnoutEx));
    if config.features.sensors {
        handlers.push(Box::new(entities::SensorCommand));
    }
    handlers.push(Box::new(system::FreeHeap));
    handlers.push(Box::new(system::EmergencyStop));
    handlers
}

/// `<O>` on success, `<X>` on failure.
pub(crate) fn ack(ok: bool) -> String {
    if ok {
        COMMAND_SUCCESSFUL_RESPONSE
    } else {
        COMMAND_FAILED_RESPONSE
    }
    .to_string()
}

pub(crate) fn arity(command: &'static str, args: &[&str]) -> CommandError {
    CommandError::Arity {
        command,
        count: args.len(),
    }
}

pub(crate) fn no_args(command: &'static str, args: &[&str]) -> Result<(), CommandError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(arity(command, args))
    }
}
