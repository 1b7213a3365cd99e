//! Peripheral traits for the status LED strip and the auxiliary serial link.

/// An RGB color for a status pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Creates a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// All channels off.
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    /// Full red.
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    /// Full green.
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    /// Full blue.
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    /// Red plus green.
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
}

/// Addressable LED strip (WS281x style).
///
/// Pixel writes are buffered until [`show`](Self::show) latches them.
pub trait PixelBus: Send {
    /// Number of pixels on the bus.
    fn len(&self) -> usize;

    /// Returns true if the bus has no pixels.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sets the buffered color of one pixel.
    fn set_pixel(&mut self, index: usize, color: Rgb);

    /// Returns the buffered color of one pixel.
    fn pixel(&self, index: usize) -> Rgb;

    /// Latches buffered colors out to the strip.
    fn show(&mut self);
}

/// Non-blocking byte-oriented serial port.
pub trait SerialPort: Send {
    /// Reads whatever bytes are available into `buf`, returning the count.
    ///
    /// Must return `0` immediately when nothing is pending.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Queues bytes for transmission.
    fn write(&mut self, bytes: &[u8]);
}
