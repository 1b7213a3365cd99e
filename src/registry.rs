//! Command registry and dispatcher.
//!
//! Every DCC++ command identifier (`t`, `Z`, `s`, ...) maps to exactly one
//! [`CommandHandler`]. The registry is built once at startup, rejects
//! duplicate identifiers, and routes tokenized frames to their handler.
//!
//! # Dispatch
//!
//! A frame interior such as `Z 5 12 4` is split on whitespace. The first
//! token selects the handler; the rest are passed as positional arguments.
//! Unknown identifiers and handler errors both produce the `<X>` sentinel;
//! the error detail is only logged, never sent over the wire.
//!
//! # Example
//!
//! ```rust
//! use rs_cmdstation::registry::{CommandError, CommandHandler, CommandRegistry};
//! use rs_cmdstation::station::StationContext;
//! use rs_cmdstation::StationConfig;
//!
//! struct Ping;
//!
//! impl CommandHandler for Ping {
//!     fn id(&self) -> &'static str {
//!         "ping"
//!     }
//!
//!     fn process(&self, _ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
//!         Ok(format!("<pong {}>", args.len()))
//!     }
//! }
//!
//! let mut registry = CommandRegistry::new();
//! registry.register(Box::new(Ping)).unwrap();
//!
//! let mut ctx = StationContext::with_mocks(StationConfig::default());
//! assert_eq!(registry.dispatch(&mut ctx, "ping a b"), "<pong 2>");
//! assert_eq!(registry.dispatch(&mut ctx, "nope"), "<X>");
//! ```

use core::num::ParseIntError;
use core::str::FromStr;

use thiserror::Error;

use crate::config::StationConfig;
use crate::station::StationContext;

/// Generic success acknowledgement.
pub const COMMAND_SUCCESSFUL_RESPONSE: &str = "<O>";

/// Generic failure sentinel.
pub const COMMAND_FAILED_RESPONSE: &str = "<X>";

/// Commands that produce no output.
pub const COMMAND_NO_RESPONSE: &str = "";

/// Why a single command failed.
///
/// Local to one frame: the dispatcher logs it and answers `<X>`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// An argument could not be parsed as a number.
    #[error("argument `{value}` is not a valid number: {source}")]
    InvalidNumber {
        /// The offending argument text.
        value: String,
        /// Underlying parse failure.
        source: ParseIntError,
    },
    /// An argument was numeric but outside the accepted range.
    #[error("argument `{0}` is out of range")]
    OutOfRange(String),
    /// The argument count matches none of the command's forms.
    #[error("no form of `{command}` takes {count} arguments")]
    Arity {
        /// Command identifier.
        command: &'static str,
        /// Number of arguments received.
        count: usize,
    },
    /// The command is understood but cannot be carried out.
    #[error("command rejected: {0}")]
    Rejected(String),
}

/// Errors raised while building the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler with this identifier is already registered.
    #[error("command `{0}` is already registered")]
    Duplicate(&'static str),
}

/// Parses a positional argument as a number.
pub fn parse_arg<T>(value: &str) -> Result<T, CommandError>
where
    T: FromStr<Err = ParseIntError>,
{
    value.parse().map_err(|source| CommandError::InvalidNumber {
        value: value.to_string(),
        source,
    })
}

/// Parses a DCC++ boolean argument: the text `1` is true, `0` is false.
pub fn parse_flag(value: &str) -> Result<bool, CommandError> {
    match parse_arg::<i32>(value)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(CommandError::OutOfRange(value.to_string())),
    }
}

/// Splits a frame interior into whitespace-separated tokens.
pub fn tokenize(frame: &str) -> Vec<&str> {
    frame.split_whitespace().collect()
}

/// A handler bound to one command identifier.
///
/// Handlers must run to completion quickly: they execute on the single
/// scheduler thread and may never wait on I/O.
pub trait CommandHandler: Send {
    /// The identifier this handler answers to (case-sensitive).
    fn id(&self) -> &'static str;

    /// Processes one command.
    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError>;
}

/// Maps identifiers to handlers.
///
/// Holds no layout state of its own; everything a handler touches lives in
/// the [`StationContext`] passed to [`dispatch`](Self::dispatch).
#[derive(Default)]
pub struct CommandRegistry {
    handlers: Vec<Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the full DCC++ command set for `config`.
    pub fn with_default_handlers(config: &StationConfig) -> Self {
        let mut registry = Self::new();
        crate::handlers::register_all(&mut registry, config);
        log::info!("[Registry] {} commands registered", registry.len());
        registry
    }

    /// Registers a handler.
    ///
    /// A second handler with an existing identifier is rejected and logged;
    /// the first registration stays active.
    pub fn register(&mut self, handler: Box<dyn CommandHandler>) -> Result<(), RegistryError> {
        let id = handler.id();
        if self.get(id).is_some() {
            log::error!("[Registry] Ignoring attempt to register second command with ID: {id}");
            return Err(RegistryError::Duplicate(id));
        }
        log::trace!("[Registry] Registering command {id}");
        self.handlers.push(handler);
        Ok(())
    }

    /// Looks up the handler for an identifier.
    pub fn get(&self, id: &str) -> Option<&dyn CommandHandler> {
        self.handlers
            .iter()
            .find(|handler| handler.id() == id)
            .map(|handler| handler.as_ref())
    }

    /// Returns true if a handler is registered for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered identifiers in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.iter().map(|handler| handler.id())
    }

    /// Tokenizes a frame interior and runs the matching handler.
    ///
    /// Returns the handler's response verbatim, or `<X>` when the identifier
    /// is unknown or the handler fails.
    pub fn dispatch(&self, ctx: &mut StationContext, frame: &str) -> String {
        let tokens = tokenize(frame);
        let Some((&id, args)) = tokens.split_first() else {
            log::warn!("[Registry] Empty command frame");
            return COMMAND_FAILED_RESPONSE.to_string();
        };

        log::trace!("[Registry] Command: {id}, argument count: {}", args.len());

        let Some(handler) = self.get(id) else {
            log::error!("[Registry] No command handler for [{id}]");
            return COMMAND_FAILED_RESPONSE.to_string();
        };

        match handler.process(ctx, args) {
            Ok(response) => response,
            Err(err) => {
                log::warn!("[Registry] <{frame}> failed: {err}");
                COMMAND_FAILED_RESPONSE.to_string()
            }
        }
    }
}

impl core::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}
