//! Pin mapping for a three-axis (X/Y/Z) STM32F407 CNC controller board.
//! A starting point; verify against your own board's schematic before use.

use embassy_stm32::gpio::{AnyPin, Pin};

/// Holds every pin the firmware binds to a peripheral role.
pub struct BoardPins {
    pub led: AnyPin,
    pub stepper_x_step: AnyPin,
    pub stepper_x_dir: AnyPin,
    pub stepper_y_step: AnyPin,
    pub stepper_y_dir: AnyPin,
    pub stepper_z_step: AnyPin,
    pub stepper_z_dir: AnyPin,
    pub endstop_x_min: AnyPin,
    pub endstop_y_min: AnyPin,
    pub endstop_z_min: AnyPin,
    pub uart_tx: AnyPin,
    pub uart_rx: AnyPin,
}

impl BoardPins {
    /// Creates a new `BoardPins` from the board's peripherals singleton.
    pub fn new(p: embassy_stm32::Peripherals) -> Self {
        use embassy_stm32::gpio::Pin as _;

        // Note: these are example pins; verify them against your own board.
        Self {
            led: p.PB1.degrade(),
            stepper_x_step: p.PE2.degrade(),
            stepper_x_dir: p.PB8.degrade(),
            stepper_y_step: p.PC5.degrade(),
            stepper_y_dir: p.PB2.degrade(),
            stepper_z_step: p.PE3.degrade(),
            stepper_z_dir: p.PB9.degrade(),
            endstop_x_min: p.PA4.degrade(),
            endstop_y_min: p.PA5.degrade(),
            endstop_z_min: p.PA6.degrade(),
            uart_tx: p.PA9.degrade(),
            uart_rx: p.PA10.degrade(),
        }
    }
}
