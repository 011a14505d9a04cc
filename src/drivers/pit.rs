//! 8253/8254 PIT driver: programs channel 0 for a periodic square wave at
//! the requested frequency (§4.3).

use crate::config::PIT_BASE_HZ;
use crate::io::{Io, Pio};

const CHANNEL_0_DATA: u16 = 0x40;
const COMMAND: u16 = 0x43;

/// Channel 0, lo/hi byte access, mode 3 (square wave), binary.
const COMMAND_CHANNEL0_MODE3: u8 = 0b0011_0110;

/// Programs channel 0 to fire at `hz`. Divisor is truncated to 16 bits,
/// matching real PIT hardware (a requested rate below ~18 Hz aliases).
pub fn program(hz: u32) {
    let divisor = (PIT_BASE_HZ / hz) as u16;

    let mut command = Pio::<u8>::new(COMMAND);
    let mut data = Pio::<u8>::new(CHANNEL_0_DATA);

    command.write(COMMAND_CHANNEL0_MODE3);
    data.write((divisor & 0xFF) as u8);
    data.write((divisor >> 8) as u8);

    log::info!("pit: programmed for {} Hz, divisor={}", hz, divisor);
}
