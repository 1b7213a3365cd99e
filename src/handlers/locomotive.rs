//! Throttle and function commands.
//!
//! Every locomotive command addresses the roster with long 128-step
//! addressing; the roster creates the locomotive on first use.

use crate::locomotive::{AddressMode, MAX_FUNCTION, MAX_SPEED};
use crate::registry::{parse_arg, parse_flag, CommandError, CommandHandler, COMMAND_NO_RESPONSE};
use crate::station::StationContext;

use super::arity;

const THROTTLE_MODE: AddressMode = AddressMode::Long;

fn speed_step(value: &str) -> Result<Option<u8>, CommandError> {
    let speed: i16 = parse_arg(value)?;
    if speed < 0 {
        return Ok(None);
    }
    u8::try_from(speed)
        .ok()
        .filter(|&speed| speed <= MAX_SPEED)
        .map(Some)
        .ok_or_else(|| CommandError::OutOfRange(value.to_string()))
}

/// `<t register loco speed direction>`. A negative speed is an emergency stop.
pub struct Throttle;

impl CommandHandler for Throttle {
    fn id(&self) -> &'static str {
        "t"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        let [register, address, speed, direction] = *args else {
            return Err(arity("t", args));
        };
        let register: usize = parse_arg(register)?;
        let address: u16 = parse_arg(address)?;
        let speed = speed_step(speed)?;
        let forward = parse_flag(direction)?;

        let loco = ctx.roster.get_or_create(address, THROTTLE_MODE);
        match speed {
            Some(speed) => loco.set_speed(speed),
            None => loco.emergency_stop(),
        }
        loco.set_direction(forward);
        Ok(loco.status_line(register))
    }
}

/// `<tex loco speed direction>`. Negative values leave that field unchanged.
pub struct ThrottleEx;

impl CommandHandler for ThrottleEx {
    fn id(&self) -> &'static str {
        "tex"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        let [address, speed, direction] = *args else {
            return Err(arity("tex", args));
        };
        let address: u16 = parse_arg(address)?;
        let speed = speed_step(speed)?;
        let direction: i8 = parse_arg(direction)?;

        let loco = ctx.roster.get_or_create(address, THROTTLE_MODE);
        if let Some(speed) = speed {
            loco.set_speed(speed);
        }
        if direction >= 0 {
            loco.set_direction(direction != 0);
        }
        Ok(loco.status_line(0))
    }
}

/// `<f loco byte [byte2]>`: legacy function group update.
pub struct Function;

impl CommandHandler for Function {
    fn id(&self) -> &'static str {
        "f"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        let (address, byte, byte2) = match *args {
            [address, byte] => (address, byte, None),
            [address, byte, byte2] => (address, byte, Some(parse_arg(byte2)?)),
            _ => return Err(arity("f", args)),
        };
        let address: u16 = parse_arg(address)?;
        let byte: u8 = parse_arg(byte)?;

        ctx.roster
            .get_or_create(address, THROTTLE_MODE)
            .apply_function_bytes(byte, byte2);
        Ok(COMMAND_NO_RESPONSE.to_string())
    }
}

/// `<fex loco function state>`: sets a single function F0-F28.
pub struct FunctionEx;

impl CommandHandler for FunctionEx {
    fn id(&self) -> &'static str {
        "fex"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        let [address, function, state] = *args else {
            return Err(arity("fex", args));
        };
        let address: u16 = parse_arg(address)?;
        let number: u8 = parse_arg(function)?;
        let on = parse_arg::<u8>(state)? != 0;
        if number > MAX_FUNCTION {
            return Err(CommandError::OutOfRange(function.to_string()));
        }

        ctx.roster
            .get_or_create(address, THROTTLE_MODE)
            .set_function(number, on);
        Ok(COMMAND_NO_RESPONSE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::{CommandStation, StationConfig};

    #[test]
    fn throttle_reply_and_state() {
        let mut station = CommandStation::with_mocks(StationConfig::default());
        assert_eq!(station.dispatch("t 1 3 64 1"), "<T 1 64 1>");
        assert_eq!(station.dispatch("t 2 3 10 0"), "<T 2 10 0>");

        let loco = station.ctx.roster.get(3).unwrap();
        assert_eq!(loco.speed(), 10);
        assert!(!loco.is_forward());
    }

    #[test]
    fn negative_speed_is_emergency_stop() {
        let mut station = CommandStation::with_mocks(StationConfig::default());
        station.dispatch("t 1 3 64 1");
        assert_eq!(station.dispatch("t 1 3 -1 1"), "<T 1 0 1>");
        assert!(station.ctx.roster.get(3).unwrap().is_estopped());
    }

    #[test]
    fn throttle_rejects_bad_input() {
        let mut station = CommandStation::with_mocks(StationConfig::default());
        assert_eq!(station.dispatch("t 1 3 128 1"), "<X>");
        assert_eq!(station.dispatch("t 1 3 fast 1"), "<X>");
        assert_eq!(station.dispatch("t 1 3 10"), "<X>");
        assert!(station.ctx.roster.is_empty());
    }

    #[test]
    fn throttle_ex_leaves_negative_fields() {
        let mut station = CommandStation::with_mocks(StationConfig::default());
        assert_eq!(station.dispatch("tex 5 40 0"), "<T 0 40 0>");
        assert_eq!(station.dispatch("tex 5 -1 1"), "<T 0 40 1>");
        assert_eq!(station.dispatch("tex 5 20 -1"), "<T 0 20 1>");
    }

    #[test]
    fn function_commands_have_no_response() {
        let mut station = CommandStation::with_mocks(StationConfig::default());
        assert_eq!(station.dispatch("f 3 144"), "");
        assert!(station.ctx.roster.get(3).unwrap().function(0));

        assert_eq!(station.dispatch("f 3 222 1"), "");
        assert!(station.ctx.roster.get(3).unwrap().function(13));

        assert_eq!(station.dispatch("fex 3 28 1"), "");
        assert!(station.ctx.roster.get(3).unwrap().function(28));
        assert_eq!(station.dispatch("fex 3 29 1"), "<X>");
        assert_eq!(station.dispatch("f 3"), "<X>");
    }
}
