//! # Embassy Firmware Entry Point
//!
//! The Embassy-executor counterpart to `rtic_app`: same DDA tick, load
//! request, and cooperative controller dispatch, realized as an
//! `#[interrupt]`-bound DDA handler plus two async tasks instead of RTIC
//! hardware tasks. Holds no motion-planning logic of its own — it proxies
//! `tinyg-driver-stepper`'s port/timer traits and drives
//! `tinyg-controller::ControllerLoop` and `crate::exec::MotionFeed`.

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{AnyPin, Level, Output, Speed};
use embassy_stm32::interrupt;
use embassy_stm32::peripherals::TIM2;
use embassy_stm32::timer::low_level::Timer as LlTimer;
use embassy_stm32::Config;
use embassy_time::{Duration, Timer};

use tinyg_canon::{AxisConfig, CanonicalMachine};
use tinyg_controller::{ControllerLoop, TickInputs};
use tinyg_driver_endstop::{Endstops, Polarity};
use tinyg_driver_stepper::{AtomicGpioPort, DdaTimer, PowerMode, StepperRuntime};
use tinyg_motion::{AxisLimits, MotionPlanner, MAX_AXES};

use crate::boards::stm32f407::pins::BoardPins;
use crate::exec::MotionFeed;
use crate::interop::{DefmtSink, NoWords, NullPersistence};
use crate::safety::{check_stepper_sentinel, SentinelMonitor};

const MOTORS: usize = 3;
const DDA_PERIOD_US: u32 = 20;

type ControllerImpl = ControllerLoop<NoWords, DefmtSink, NullPersistence>;

/// Everything the DDA interrupt and the load task touch, guarded by a
/// `critical_section::Mutex` the way a bare interrupt handler and an async
/// task share state outside of Embassy's own executor.
struct StepperHardware {
    runtime: StepperRuntime<MOTORS>,
    step_pins: [Output<'static>; MOTORS],
    dir_pins: [Output<'static>; MOTORS],
}

static STEPPER: Mutex<RefCell<Option<StepperHardware>>> = Mutex::new(RefCell::new(None));

struct PinArrayPort<'a> {
    pins: &'a mut [Output<'static>; MOTORS],
}

impl AtomicGpioPort for PinArrayPort<'_> {
    fn set_and_clear_atomic(&mut self, set_mask: u8, clear_mask: u8) {
        for (i, pin) in self.pins.iter_mut().enumerate() {
            if set_mask & (1 << i) != 0 {
                pin.set_high();
            } else if clear_mask & (1 << i) != 0 {
                pin.set_low();
            }
        }
    }
    fn write(&mut self, mask: u8) {
        for (i, pin) in self.pins.iter_mut().enumerate() {
            pin.set_level(((mask & (1 << i) != 0) as u8).into());
        }
    }
}

/// Thin wrapper around the raw TIM2 register block, since Embassy's timer
/// driver is built around its async API and the DDA tick needs to arm a
/// one-shot reload from inside an interrupt context.
struct RawDdaTimer;

impl DdaTimer for RawDdaTimer {
    fn start(&mut self, ticks: u32) {
        let tim = LlTimer::new(unsafe { embassy_stm32::peripherals::TIM2::steal() });
        tim.set_counting_mode(embassy_stm32::timer::low_level::CountingMode::EdgeAlignedUp);
        tim.set_frequency(embassy_stm32::time::Hertz(1_000_000 / DDA_PERIOD_US.max(1)));
        tim.set_autoreload_value(0, ticks.max(1));
        tim.start();
    }
    fn stop(&mut self) {
        let tim = LlTimer::new(unsafe { embassy_stm32::peripherals::TIM2::steal() });
        tim.stop();
    }
    fn request_load(&mut self) {
        embassy_stm32::pac::EXTI.swier(0).modify(|w| w.set_line(3, true));
    }
}

#[interrupt]
fn TIM2() {
    critical_section::with(|cs| {
        let mut slot = STEPPER.borrow_ref_mut(cs);
        if let Some(hw) = slot.as_mut() {
            let step_port = Mutex::new(RefCell::new(PinArrayPort { pins: &mut hw.step_pins }));
            let dir_port = Mutex::new(RefCell::new(PinArrayPort { pins: &mut hw.dir_pins }));
            let timer_port = Mutex::new(RefCell::new(RawDdaTimer));
            hw.runtime.on_dda_tick(&step_port, &dir_port, &timer_port);
        }
    });
}

#[interrupt]
fn EXTI3() {
    embassy_stm32::pac::EXTI.pr(0).write(|w| w.set_line(3, true));
    critical_section::with(|cs| {
        let mut slot = STEPPER.borrow_ref_mut(cs);
        if let Some(hw) = slot.as_mut() {
            let dir_port = Mutex::new(RefCell::new(PinArrayPort { pins: &mut hw.dir_pins }));
            let timer_port = Mutex::new(RefCell::new(RawDdaTimer));
            hw.runtime.on_load_request(&dir_port, &timer_port);
        }
    });
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    defmt::info!("Initializing firmware...");

    let config = Config::default();
    let p = embassy_stm32::init(config);
    let pins = BoardPins::new(p);

    let step_pins = [
        Output::new(pins.stepper_x_step, Level::Low, Speed::VeryHigh),
        Output::new(pins.stepper_y_step, Level::Low, Speed::VeryHigh),
        Output::new(pins.stepper_z_step, Level::Low, Speed::VeryHigh),
    ];
    let dir_pins = [
        Output::new(pins.stepper_x_dir, Level::Low, Speed::Low),
        Output::new(pins.stepper_y_dir, Level::Low, Speed::Low),
        Output::new(pins.stepper_z_dir, Level::Low, Speed::Low),
    ];
    critical_section::with(|cs| {
        STEPPER.borrow_ref_mut(cs).replace(StepperHardware {
            runtime: StepperRuntime::new([PowerMode::OnWhenMoving; MOTORS]),
            step_pins,
            dir_pins,
        });
    });

    unsafe {
        cortex_m::peripheral::NVIC::unmask(embassy_stm32::interrupt::TIM2);
        cortex_m::peripheral::NVIC::unmask(embassy_stm32::interrupt::EXTI3);
    }

    let watchdog = embassy_stm32::wdg::IndependentWatchdog::new(unsafe { embassy_stm32::peripherals::IWDG::steal() }, 500_000);
    let sentinel = SentinelMonitor::new(watchdog);

    spawner.spawn(led_task(pins.led)).unwrap();
    spawner
        .spawn(controller_task(
            pins.endstop_x_min,
            pins.endstop_y_min,
            pins.endstop_z_min,
            sentinel,
        ))
        .unwrap();

    defmt::info!("Initialization complete.");
}

#[embassy_executor::task]
async fn led_task(led_pin: AnyPin) {
    let mut led = Output::new(led_pin, Level::High, Speed::Low);
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(500)).await;
    }
}

/// Cooperative controller tick, same ordered dispatch as the RTIC
/// realization's `controller_task`: poll switches, check the sentinel,
/// tick, pump the planner into the stepper runtime, feed the watchdog.
#[embassy_executor::task]
async fn controller_task(x_min: AnyPin, y_min: AnyPin, z_min: AnyPin, mut sentinel: SentinelMonitor<'static>) {
    use embassy_stm32::gpio::{Input, Pull};

    let switch_pins = [
        Input::new(x_min, Pull::Up),
        Input::new(y_min, Pull::Up),
        Input::new(z_min, Pull::Up),
    ];
    let mut switches = Endstops::new(switch_pins, [Polarity::NormallyOpen; MOTORS], 3);

    let mut limits = [AxisLimits::default(); MAX_AXES];
    for limit in limits.iter_mut() {
        limit.max_velocity = 3000.0;
        limit.max_accel = 8000.0;
        limit.max_jerk = 500_000.0;
        limit.junction_deviation = 0.01;
    }
    let mut controller: ControllerImpl = ControllerLoop::new(
        CanonicalMachine::new([AxisConfig::default(); MAX_AXES]),
        MotionPlanner::new(limits),
        NoWords,
        DefmtSink,
        NullPersistence,
    );
    let mut feed = MotionFeed::new([160.0; MAX_AXES], DDA_PERIOD_US);

    let mut planner_idle = true;
    loop {
        sentinel.feed_watchdog();
        let debounced = switches.poll().unwrap_or([false; MOTORS]);
        let switch_triggered = debounced.iter().any(|&s| s);

        let (sentinel_ok, idle_after) = critical_section::with(|cs| {
            let mut slot = STEPPER.borrow_ref_mut(cs);
            match slot.as_mut() {
                Some(hw) => {
                    let ok = check_stepper_sentinel(&hw.runtime, &mut sentinel.latch).is_ok();
                    controller.tick(TickInputs { switch_triggered, planner_idle, sentinel_ok: ok });
                    (ok, feed.pump(&mut controller, &mut hw.runtime))
                }
                None => (false, true),
            }
        });
        let _ = sentinel_ok;
        planner_idle = idle_after;

        Timer::after(Duration::from_millis(1)).await;
    }
}
