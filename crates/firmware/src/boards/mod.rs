//! Board-specific pin mappings. One module per supported board; the
//! `rtic_app`/`embassy_app` wiring picks whichever one the build targets.

pub mod stm32f407;
