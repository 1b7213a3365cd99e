//! Status LED strip: colors chosen by the station, pushed by a periodic task.

use crate::scheduler::{Action, Task};
use crate::station::CommandStation;
use crate::traits::{PixelBus, Rgb};

/// Number of status LEDs on the strip.
pub const LED_COUNT: usize = 5;

/// The status LEDs, in strip order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Led {
    /// WiFi station link.
    WifiStation = 0,
    /// WiFi soft access point.
    WifiAp = 1,
    /// Bootloader / firmware update.
    Bootloader = 2,
    /// OPS (main) track power.
    OpsTrack = 3,
    /// Programming track power.
    ProgTrack = 4,
}

impl Led {
    /// Every LED in strip order.
    pub const ALL: [Led; LED_COUNT] = [
        Led::WifiStation,
        Led::WifiAp,
        Led::Bootloader,
        Led::OpsTrack,
        Led::ProgTrack,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// A steady or blinking LED color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LedColor {
    /// Dark.
    #[default]
    Off,
    /// Steady red.
    Red,
    /// Steady green.
    Green,
    /// Steady blue.
    Blue,
    /// Steady yellow.
    Yellow,
    /// Blinking red.
    RedBlink,
    /// Blinking green.
    GreenBlink,
    /// Blinking blue.
    BlueBlink,
    /// Blinking yellow.
    YellowBlink,
}

impl LedColor {
    /// The lit color.
    pub fn rgb(self) -> Rgb {
        match self {
            LedColor::Off => Rgb::OFF,
            LedColor::Red | LedColor::RedBlink => Rgb::RED,
            LedColor::Green | LedColor::GreenBlink => Rgb::GREEN,
            LedColor::Blue | LedColor::BlueBlink => Rgb::BLUE,
            LedColor::Yellow | LedColor::YellowBlink => Rgb::YELLOW,
        }
    }

    /// Returns true for the blinking variants.
    pub fn is_blinking(self) -> bool {
        matches!(
            self,
            LedColor::RedBlink | LedColor::GreenBlink | LedColor::BlueBlink | LedColor::YellowBlink
        )
    }
}

/// Requested LED colors plus the blink phase of each LED.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusLeds {
    colors: [LedColor; LED_COUNT],
    lit: [bool; LED_COUNT],
}

impl StatusLeds {
    /// All LEDs off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a color. Blinking restarts in the lit phase.
    pub fn set(&mut self, led: Led, color: LedColor) {
        self.colors[led.index()] = color;
        self.lit[led.index()] = false;
    }

    /// The requested color of an LED.
    pub fn color(&self, led: Led) -> LedColor {
        self.colors[led.index()]
    }

    /// Pixel colors for the next refresh, advancing every blink phase.
    pub fn next_frame(&mut self) -> [Rgb; LED_COUNT] {
        let mut frame = [Rgb::OFF; LED_COUNT];
        for (index, pixel) in frame.iter_mut().enumerate() {
            let color = self.colors[index];
            *pixel = if color.is_blinking() {
                let lit = self.lit[index];
                self.lit[index] = !lit;
                if lit {
                    Rgb::OFF
                } else {
                    color.rgb()
                }
            } else {
                color.rgb()
            };
        }
        frame
    }
}

/// Resumption point of [`StatusLedTask`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedStep {
    /// Push the next frame.
    Refresh,
}

/// Refreshes the LED strip from [`StatusLeds`] at a fixed interval.
pub struct StatusLedTask {
    bus: Box<dyn PixelBus>,
    interval_ms: u64,
}

impl StatusLedTask {
    /// Creates the task over a pixel bus.
    pub fn new(bus: Box<dyn PixelBus>) -> Self {
        Self {
            bus,
            interval_ms: 0,
        }
    }
}

impl Task for StatusLedTask {
    type State = LedStep;

    fn name(&self) -> &'static str {
        "status-led"
    }

    fn init(&mut self, station: &mut CommandStation) -> Action<LedStep> {
        let config = &station.ctx.config;
        if !config.features.status_led {
            return Action::Exit;
        }
        self.interval_ms = u64::from(config.timing.status_led_interval_ms);
        log::info!(
            "[Status] Initializing {} LEDs, refresh every {} ms",
            self.bus.len(),
            self.interval_ms
        );
        for index in 0..self.bus.len() {
            self.bus.set_pixel(index, Rgb::OFF);
        }
        self.bus.show();
        Action::Sleep {
            ms: self.interval_ms,
            next: LedStep::Refresh,
        }
    }

    fn step(&mut self, _: LedStep, station: &mut CommandStation, _elapsed_ms: u64) -> Action<LedStep> {
        let frame = station.ctx.leds.next_frame();
        for (index, color) in frame.into_iter().enumerate().take(self.bus.len()) {
            if self.bus.pixel(index) != color {
                self.bus.set_pixel(index, color);
            }
        }
        self.bus.show();
        Action::Sleep {
            ms: self.interval_ms,
            next: LedStep::Refresh,
        }
    }
}
