//! CV programming on the programming track and on the main (OPS) track.
//!
//! Programming-track replies echo the caller's callback number and
//! sub-number so a throttle can match them to its request:
//! `<r{cb}|{cbsub}|{cv} {value}>`, with `-1` as the value when the decoder
//! did not acknowledge. Main-track writes cannot be verified and always
//! answer `<O>`.

use crate::registry::{parse_arg, parse_flag, CommandError, CommandHandler, COMMAND_SUCCESSFUL_RESPONSE};
use crate::station::StationContext;

use super::arity;

/// Highest CV number a decoder exposes.
pub const MAX_CV: u16 = 1024;

fn cv_number(value: &str) -> Result<u16, CommandError> {
    let cv: u16 = parse_arg(value)?;
    if (1..=MAX_CV).contains(&cv) {
        Ok(cv)
    } else {
        Err(CommandError::OutOfRange(value.to_string()))
    }
}

fn bit_number(value: &str) -> Result<u8, CommandError> {
    let bit: u8 = parse_arg(value)?;
    if bit <= 7 {
        Ok(bit)
    } else {
        Err(CommandError::OutOfRange(value.to_string()))
    }
}

/// Callback pair echoed in programming-track replies.
struct Callback {
    num: i32,
    sub: i32,
}

impl Callback {
    fn parse(num: &str, sub: &str) -> Result<Self, CommandError> {
        Ok(Self {
            num: parse_arg(num)?,
            sub: parse_arg(sub)?,
        })
    }

    fn reply(&self, cv: u16, tail: &str) -> String {
        format!("<r{}|{}|{} {}>", self.num, self.sub, cv, tail)
    }
}

/// `<R cv cb cbsub>`: reads a CV.
pub struct ReadCv;

impl CommandHandler for ReadCv {
    fn id(&self) -> &'static str {
        "R"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        let [cv, num, sub] = *args else {
            return Err(arity("R", args));
        };
        let cv = cv_number(cv)?;
        let callback = Callback::parse(num, sub)?;

        let value = match ctx.hw.track.read_cv(cv) {
            Some(value) => i16::from(value),
            None => {
                log::warn!("[Prog] No acknowledgement reading CV {cv}");
                -1
            }
        };
        Ok(callback.reply(cv, &value.to_string()))
    }
}

/// `<W cv value cb cbsub>`: writes a CV byte.
pub struct WriteCvByte;

impl CommandHandler for WriteCvByte {
    fn id(&self) -> &'static str {
        "W"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        let [cv, value, num, sub] = *args else {
            return Err(arity("W", args));
        };
        let cv = cv_number(cv)?;
        let value: u8 = parse_arg(value)?;
        let callback = Callback::parse(num, sub)?;

        let verified = if ctx.hw.track.write_cv_byte(cv, value) {
            i16::from(value)
        } else {
            log::warn!("[Prog] Write of {value} to CV {cv} not verified");
            -1
        };
        Ok(callback.reply(cv, &verified.to_string()))
    }
}

/// `<B cv bit value cb cbsub>`: writes one CV bit.
pub struct WriteCvBit;

impl CommandHandler for WriteCvBit {
    fn id(&self) -> &'static str {
        "B"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        let [cv, bit, value, num, sub] = *args else {
            return Err(arity("B", args));
        };
        let cv = cv_number(cv)?;
        let bit = bit_number(bit)?;
        let value = parse_flag(value)?;
        let callback = Callback::parse(num, sub)?;

        let verified = if ctx.hw.track.write_cv_bit(cv, bit, value) {
            i8::from(value)
        } else {
            log::warn!("[Prog] Write of CV {cv} bit {bit} not verified");
            -1
        };
        Ok(callback.reply(cv, &format!("{bit} {verified}")))
    }
}

/// `<w loco cv value>`: writes a CV byte on the main track.
pub struct WriteOpsCvByte;

impl CommandHandler for WriteOpsCvByte {
    fn id(&self) -> &'static str {
        "w"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        let [address, cv, value] = *args else {
            return Err(arity("w", args));
        };
        let address: u16 = parse_arg(address)?;
        let cv = cv_number(cv)?;
        let value: u8 = parse_arg(value)?;

        ctx.hw.track.write_ops_cv_byte(address, cv, value);
        Ok(COMMAND_SUCCESSFUL_RESPONSE.to_string())
    }
}

/// `<b loco cv bit value>`: writes one CV bit on the main track.
pub struct WriteOpsCvBit;

impl CommandHandler for WriteOpsCvBit {
    fn id(&self) -> &'static str {
        "b"
    }

    fn process(&self, ctx: &mut StationContext, args: &[&str]) -> Result<String, CommandError> {
        let [address, cv, bit, value] = *args else {
            return Err(arity("b", args));
        };
        let address: u16 = parse_arg(address)?;
        let cv = cv_number(cv)?;
        let bit = bit_number(bit)?;
        let value = parse_flag(value)?;

        ctx.hw.track.write_ops_cv_bit(address, cv, bit, value);
        Ok(COMMAND_SUCCESSFUL_RESPONSE.to_string())
    }
}
