//! Station-wide commands: status, persistence, track power, diagnostics.

use crate::power::TrackPower;
use crate::registry::{
    CommandError, CommandHandler, COMMAND_FAILED_RESPONSE, COMMAND_SUCCESSFUL_RESPONSE,
};
use crate::station::StationContext;

use super::no_args;

/// `<s>`: full status dump. JMRI also uses it as a keep-alive.
pub struct Status;

impl CommandHandler for Status {
    fn id(&self) -> &'static str {
        "s"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        no_args("s", args)?;
        Ok(ctx.status())
    }
}

/// `<E>`: stores every entity, replying `<e turnouts sensors outputs>`.
pub struct StoreAll;

impl CommandHandler for StoreAll {
    fn id(&self) -> &'static str {
        "E"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        no_args("E", args)?;
        let counts = ctx
            .store_all()
            .map_err(|err| CommandError::Rejected(err.to_string()))?;
        Ok(format!(
            "<e {} {} {}>",
            counts.turnouts, counts.sensors, counts.outputs
        ))
    }
}

/// `<e>`: clears every entity and stores the empty collections.
pub struct EraseAll;

impl CommandHandler for EraseAll {
    fn id(&self) -> &'static str {
        "e"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        no_args("e", args)?;
        ctx.clear_all();
        ctx.store_all()
            .map_err(|err| CommandError::Rejected(err.to_string()))?;
        log::info!("[Store] All entities erased");
        Ok(COMMAND_SUCCESSFUL_RESPONSE.to_string())
    }
}

/// `<1>`: requests OPS power on. Applied by the next power check.
pub struct PowerOn;

impl CommandHandler for PowerOn {
    fn id(&self) -> &'static str {
        "1"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        no_args("1", args)?;
        ctx.power.request(true);
        Ok("<p1 OPS>".to_string())
    }
}

/// `<0>`: requests OPS power off. Applied by the next power check.
pub struct PowerOff;

impl CommandHandler for PowerOff {
    fn id(&self) -> &'static str {
        "0"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        no_args("0", args)?;
        ctx.power.request(false);
        Ok("<p0 OPS>".to_string())
    }
}

/// `<c>`: track power and current.
pub struct CurrentDraw;

impl CommandHandler for CurrentDraw {
    fn id(&self) -> &'static str {
        "c"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        no_args("c", args)?;
        Ok(TrackPower::state_for_dccpp(ctx.hw.track.as_ref()))
    }
}

/// `<F>`: free heap.
pub struct FreeHeap;

impl CommandHandler for FreeHeap {
    fn id(&self) -> &'static str {
        "F"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        no_args("F", args)?;
        Ok(format!("<f {}>", ctx.hw.system.free_heap_bytes()))
    }
}

/// `<estop>`: stops every locomotive.
pub struct EmergencyStop;

impl CommandHandler for EmergencyStop {
    fn id(&self) -> &'static str {
        "estop"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        no_args("estop", args)?;
        ctx.roster.emergency_stop_all();
        ctx.hw.track.emergency_stop();
        log::warn!("[Power] Emergency stop");
        Ok(COMMAND_SUCCESSFUL_RESPONSE.to_string())
    }
}

/// `<C ...>`: consist control is not supported.
pub struct Consist;

impl CommandHandler for Consist {
    fn id(&self) -> &'static str {
        "C"
    }

    fn process(&self, _ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        log::debug!("[Consist] Ignoring consist command with {} arguments", args.len());
        Ok(COMMAND_FAILED_RESPONSE.to_string())
    }
}
