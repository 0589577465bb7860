#![cfg_attr(not(test), no_std)]
#![no_main]
#![cfg_attr(feature = "embassy-rt", feature(type_alias_impl_trait))]

#[cfg(feature = "defmt-logging")]
use defmt_rtt as _; // global logger
#[cfg(feature = "defmt-logging")]
use panic_probe as _;

pub mod boards;
pub mod exec;
pub mod interop;
pub mod safety;

#[cfg(feature = "embassy-rt")]
mod embassy_app;
#[cfg(feature = "embassy-rt")]
use embassy_app as _;

#[cfg(feature = "rtic-rt")]
mod rtic_app;
#[cfg(feature = "rtic-rt")]
use rtic_app as _;
