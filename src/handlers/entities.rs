//! Turnout, output and sensor commands.
//!
//! The classic entity commands share one shape, selected by argument count:
//!
//! | Args | `T` | `Z` | `S` |
//! |------|-----|-----|-----|
//! | 0 | list | list | list |
//! | 1 | delete | delete | delete |
//! | 2 | throw | set | - |
//! | 3 | create/update | create/update | create/update |

use crate::entity::turnout::address_from_board;
use crate::entity::{
    Entity, EntityError, OutputConfig, OutputFlags, SensorConfig, Turnout, TurnoutConfig,
    TurnoutType,
};
use crate::registry::{parse_arg, parse_flag, CommandError, CommandHandler};
use crate::station::StationContext;

use super::{ack, arity};

fn parse_type(value: &str) -> Result<TurnoutType, CommandError> {
    TurnoutType::try_from(parse_arg::<u8>(value)?)
        .map_err(|_| CommandError::OutOfRange(value.to_string()))
}

fn remove_logged(removed: bool, kind: &str, id: u16) -> String {
    if !removed {
        log::warn!("[{kind}] Cannot delete {id}: not found");
    }
    ack(removed)
}

// ============================================================================
// Turnouts
// ============================================================================

/// `<T>`, `<T id>`, `<T id throw>`, `<T id board index>`.
pub struct TurnoutCommand;

impl CommandHandler for TurnoutCommand {
    fn id(&self) -> &'static str {
        "T"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        match *args {
            [] => Ok(ctx.turnouts.status_lines()),
            [id] => {
                let id = parse_arg(id)?;
                let removed = ctx.turnouts.remove(id);
                if removed {
                    ctx.mark_dirty();
                }
                Ok(remove_logged(removed, "Turnout", id))
            }
            [id, thrown] => {
                let id = parse_arg(id)?;
                let thrown = parse_flag(thrown)?;
                Ok(ctx.set_turnout(id, thrown).unwrap_or_else(|| ack(false)))
            }
            [id, board, index] => {
                let id: u16 = parse_arg(id)?;
                let board = parse_arg(board)?;
                let index = parse_arg(index)?;
                let kind = ctx
                    .turnouts
                    .get(id)
                    .map(|turnout| turnout.kind())
                    .unwrap_or_default();
                let result = address_from_board(board, index)
                    .and_then(|address| ctx.create_turnout(id, TurnoutConfig::new(address, kind)));
                if let Err(err) = &result {
                    log::warn!("[Turnout] Cannot create {id}: {err}");
                }
                Ok(ack(result.is_ok()))
            }
            _ => Err(arity("T", args)),
        }
    }
}

/// `<Tex id>` toggles; `<Tex id address type>` creates by address;
/// `<Tex -1 address type>` retypes or auto-creates the turnout at `address`.
pub struct TurnoutEx;

impl CommandHandler for TurnoutEx {
    fn id(&self) -> &'static str {
        "Tex"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        match *args {
            [id] => {
                let Ok(id) = u16::try_from(parse_arg::<i32>(id)?) else {
                    return Ok(ack(false));
                };
                let Some(thrown) = ctx.turnouts.get(id).map(|turnout| !turnout.is_active()) else {
                    return Ok(ack(false));
                };
                Ok(ctx.set_turnout(id, thrown).unwrap_or_else(|| ack(false)))
            }
            [id, address, kind] => {
                let id = parse_arg::<i32>(id)?;
                let address: u16 = parse_arg(address)?;
                let kind = parse_type(kind)?;

                let result = if id >= 0 {
                    let id = u16::try_from(id).map_err(|_| CommandError::OutOfRange(id.to_string()))?;
                    ctx.create_turnout(id, TurnoutConfig::new(address, kind))
                } else if let Some(existing) = ctx.turnouts.find_by_binding(address).map(Entity::id) {
                    if let Some(turnout) = ctx.turnouts.get_mut(existing) {
                        turnout.set_kind(kind);
                    }
                    ctx.mark_dirty();
                    Ok(())
                } else {
                    match ctx.turnouts.next_id() {
                        Some(id) => ctx.create_turnout(id, TurnoutConfig::new(address, kind)),
                        None => Err(EntityError::IdsExhausted(Turnout::KIND)),
                    }
                };

                if let Err(err) = &result {
                    log::warn!("[Turnout] Cannot create turnout at {address}: {err}");
                }
                Ok(ack(result.is_ok()))
            }
            _ => Err(arity("Tex", args)),
        }
    }
}

/// `<a board index throw>`: drives the turnout at the decoded accessory
/// address, creating it first if no turnout uses that address.
pub struct Accessory;

impl CommandHandler for Accessory {
    fn id(&self) -> &'static str {
        "a"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        let [board, index, thrown] = *args else {
            return Err(arity("a", args));
        };
        let board = parse_arg(board)?;
        let index = parse_arg(index)?;
        let thrown = parse_flag(thrown)?;

        let address = address_from_board(board, index)
            .map_err(|err| CommandError::Rejected(err.to_string()))?;

        let id = match ctx.turnouts.find_by_binding(address) {
            Some(turnout) => turnout.id(),
            None => {
                let id = ctx.turnouts.next_id().ok_or_else(|| {
                    CommandError::Rejected(EntityError::IdsExhausted(Turnout::KIND).to_string())
                })?;
                ctx.create_turnout(id, TurnoutConfig::new(address, TurnoutType::default()))
                    .map_err(|err| CommandError::Rejected(err.to_string()))?;
                log::info!("[Turnout] Created turnout {id} for accessory address {address}");
                id
            }
        };

        Ok(ctx.set_turnout(id, thrown).unwrap_or_else(|| ack(false)))
    }
}

// ============================================================================
// Outputs
// ============================================================================

/// `<Z>`, `<Z id>`, `<Z id state>`, `<Z id pin iflag>`.
pub struct OutputCommand;

impl CommandHandler for OutputCommand {
    fn id(&self) -> &'static str {
        "Z"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        match *args {
            [] => Ok(ctx.outputs.status_lines()),
            [id] => {
                let id = parse_arg(id)?;
                let removed = ctx.outputs.remove(id);
                if removed {
                    ctx.mark_dirty();
                }
                Ok(remove_logged(removed, "Output", id))
            }
            [id, active] => {
                let id = parse_arg(id)?;
                let active = parse_flag(active)?;
                Ok(ctx.set_output(id, active).unwrap_or_else(|| ack(false)))
            }
            [id, pin, flags] => {
                let id = parse_arg(id)?;
                let pin = parse_arg(pin)?;
                let flags = OutputFlags::from_bits(parse_arg(flags)?);
                let result = ctx.create_output(id, OutputConfig::new(pin, flags));
                if let Err(err) = &result {
                    log::warn!("[Output] Cannot create {id}: {err}");
                }
                Ok(ack(result.is_ok()))
            }
            _ => Err(arity("Z", args)),
        }
    }
}

/// `<Zex id>`: toggles an output.
pub struct OutputEx;

impl CommandHandler for OutputEx {
    fn id(&self) -> &'static str {
        "Zex"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        let [id] = *args else {
            return Err(arity("Zex", args));
        };
        let id = parse_arg(id)?;
        let Some(active) = ctx.outputs.get(id).map(|output| !output.is_active()) else {
            return Ok(ack(false));
        };
        Ok(ctx.set_output(id, active).unwrap_or_else(|| ack(false)))
    }
}

// ============================================================================
// Sensors
// ============================================================================

/// `<S>`, `<S id>`, `<S id pin pullup>`.
pub struct SensorCommand;

impl CommandHandler for SensorCommand {
    fn id(&self) -> &'static str {
        "S"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        match *args {
            [] => Ok(ctx.sensors.status_lines()),
            [id] => {
                let id = parse_arg(id)?;
                let removed = ctx.sensors.remove(id);
                if removed {
                    ctx.mark_dirty();
                }
                Ok(remove_logged(removed, "Sensor", id))
            }
            [id, pin, pull_up] => {
                let id = parse_arg(id)?;
                let pin = parse_arg(pin)?;
                let pull_up = parse_flag(pull_up)?;
                let result = ctx.create_sensor(id, SensorConfig::new(pin, pull_up));
                if let Err(err) = &result {
                    log::warn!("[Sensor] Cannot create {id}: {err}");
                }
                Ok(ack(result.is_ok()))
            }
            _ => Err(arity("S", args)),
        }
    }
}
