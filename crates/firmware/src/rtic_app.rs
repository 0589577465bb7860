//! # RTIC-based Firmware Entry Point
//!
//! Binds the DDA timer interrupt, the load software interrupt, and the
//! cooperative controller tick to real STM32F407 interrupts at the
//! priorities §5 specifies: DDA and load highest, USART next, the
//! controller tick cooperative in a lowest-priority software task.
//!
//! This module holds no motion-planning logic of its own: it proxies the
//! `AtomicGpioPort`/`DdaTimer` traits `tinyg-driver-stepper` already
//! defines and drives `tinyg-controller::ControllerLoop` and
//! `crate::exec::MotionFeed`, which own the actual behavior.

#![allow(unused_imports)]

#[rtic::app(device = stm32f4xx_hal::pac, dispatchers = [EXTI0, EXTI1, EXTI2])]
mod app {
    use core::cell::RefCell;
    use critical_section::Mutex;
    use stm32f4xx_hal::{
        gpio::{ErasedPin, Input, Output, PushPull},
        pac::{TIM2, USART1},
        prelude::*,
        serial::{Config as SerialConfig, Event as SerialEvent, Rx, Serial, Tx},
        timer::{CounterUs, Event as TimerEvent},
        watchdog::IndependentWatchdog,
    };
    use rtic_monotonics::{systick::*, Monotonic};

    use tinyg_canon::{AxisConfig, CanonicalMachine};
    use tinyg_controller::{ControllerLoop, TickInputs};
    use tinyg_driver_endstop::{Endstops, Polarity};
    use tinyg_driver_stepper::{AtomicGpioPort, DdaTimer, PowerMode, StepperRuntime};
    use tinyg_motion::{AxisLimits, MotionPlanner, MAX_AXES};

    use crate::exec::MotionFeed;
    use crate::interop::{DefmtSink, NoWords, NullPersistence};
    use crate::safety::{check_stepper_sentinel, EmergencyStopLatch};

    const MOTORS: usize = 3;
    const DDA_PERIOD_US: u32 = 20; // 50kHz DDA tick

    type ControllerImpl = ControllerLoop<NoWords, DefmtSink, NullPersistence>;
    type SwitchPin = stm32f4xx_hal::gpio::Pin<'A', 4, Input>;

    /// Bundles everything the DDA/load tasks and the controller tick all
    /// need exclusive-but-shared access to. Coarse-grained by design: this
    /// is the seam the stepper driver crate defines, not a place for
    /// motion-planning logic.
    struct StepperHardware {
        runtime: StepperRuntime<MOTORS>,
        step_pins: [ErasedPin<Output<PushPull>>; MOTORS],
        dir_pins: [ErasedPin<Output<PushPull>>; MOTORS],
        timer: CounterUs<TIM2>,
    }

    /// Bridges an owned slice of erased output pins to the bit-mask
    /// `AtomicGpioPort` the stepper runtime expects. The runtime's API
    /// takes `&Mutex<RefCell<PORT>>`; a fresh wrapper is constructed around
    /// each call's borrow, mirroring how `StepperRuntime`'s own tests wrap
    /// their mock ports.
    struct PinArrayPort<'a> {
        pins: &'a mut [ErasedPin<Output<PushPull>>; MOTORS],
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
                pin.set_state((mask & (1 << i) != 0).into());
            }
        }
    }

    struct DdaTimerProxy<'a> {
        tim: &'a mut CounterUs<TIM2>,
    }

    impl DdaTimer for DdaTimerProxy<'_> {
        fn start(&mut self, ticks: u32) {
            self.tim.start((ticks * DDA_PERIOD_US).micros()).unwrap();
        }
        fn stop(&mut self) {
            self.tim.cancel().ok();
        }
        fn request_load(&mut self) {
            load_task::spawn().ok();
        }
    }

    #[shared]
    struct Shared {
        usart_tx: Tx<USART1>,
        hw: StepperHardware,
    }

    #[local]
    struct Local {
        led: stm32f4xx_hal::gpio::Pin<'D', 12, Output<PushPull>>,
        switches: Endstops<MOTORS, SwitchPin>,
        watchdog: IndependentWatchdog,
        latch: EmergencyStopLatch,
        controller: ControllerImpl,
        feed: MotionFeed,
        usart_rx: Rx<USART1>,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        defmt::info!("RTIC init");
        let dp = cx.device;

        let rcc = dp.RCC.constrain();
        let clocks = rcc.cfgr.use_hse(8.MHz()).sysclk(168.MHz()).freeze();

        let systick_mono_token = rtic_monotonics::create_systick_token!();
        Systick::start(cx.core.SYST, clocks.hclk().0, systick_mono_token);

        let mut watchdog = IndependentWatchdog::new(dp.IWDG);
        watchdog.start(500u32.millis());

        let gpiod = dp.GPIOD.split();
        let mut led = gpiod.pd12.into_push_pull_output();
        led.set_high();

        let gpioa = dp.GPIOA.split();
        let tx_pin = gpioa.pa9.into_alternate();
        let rx_pin = gpioa.pa10.into_alternate();
        let serial_config = SerialConfig::default().baudrate(250_000.bps());
        let (usart_tx, mut usart_rx) = Serial::new(dp.USART1, (tx_pin, rx_pin), serial_config, &clocks)
            .unwrap()
            .split();
        usart_rx.listen(SerialEvent::Rxne);

        let mut dda_timer = dp.TIM2.counter_us(&clocks);
        dda_timer.listen(TimerEvent::Update);

        let gpioe = dp.GPIOE.split();
        let gpiob = dp.GPIOB.split();
        let gpioc = dp.GPIOC.split();
        let step_pins = [
            gpioe.pe2.into_push_pull_output().erase(),
            gpioc.pc5.into_push_pull_output().erase(),
            gpioe.pe3.into_push_pull_output().erase(),
        ];
        let dir_pins = [
            gpiob.pb8.into_push_pull_output().erase(),
            gpiob.pb2.into_push_pull_output().erase(),
            gpiob.pb9.into_push_pull_output().erase(),
        ];

        let switch_pins = [gpioa.pa4.into_pull_up_input(), gpioa.pa5.into_pull_up_input(), gpioa.pa6.into_pull_up_input()];
        let switches = Endstops::new(switch_pins, [Polarity::NormallyOpen; MOTORS], 3);

        let mut limits = [AxisLimits::default(); MAX_AXES];
        for limit in limits.iter_mut() {
            limit.max_velocity = 3000.0;
            limit.max_accel = 8000.0;
            limit.max_jerk = 500_000.0;
            limit.junction_deviation = 0.01;
        }
        let controller = ControllerLoop::new(
            CanonicalMachine::new([AxisConfig::default(); MAX_AXES]),
            MotionPlanner::new(limits),
            NoWords,
            DefmtSink,
            NullPersistence,
        );
        let feed = MotionFeed::new([160.0; MAX_AXES], DDA_PERIOD_US);

        controller_task::spawn().ok();

        defmt::info!("RTIC init complete");

        (
            Shared {
                usart_tx,
                hw: StepperHardware {
                    runtime: StepperRuntime::new([PowerMode::OnWhenMoving; MOTORS]),
                    step_pins,
                    dir_pins,
                    timer: dda_timer,
                },
            },
            Local { led, switches, watchdog, latch: EmergencyStopLatch::new(), controller, feed, usart_rx },
        )
    }

    #[idle(local = [led])]
    fn idle(cx: idle::Context) -> ! {
        loop {
            cx.local.led.toggle();
            Systick::delay(500.millis()).unwrap();
        }
    }

    /// DDA tick: highest priority. Advances every motor's accumulator and
    /// requests a load when the running segment runs out.
    #[task(binds = TIM2, shared = [hw], priority = 4)]
    fn dda_isr(mut cx: dda_isr::Context) {
        cx.shared.hw.lock(|hw| {
            hw.timer.clear_interrupt(TimerEvent::Update);
            let StepperHardware { runtime, step_pins, dir_pins, timer } = hw;
            let step_port = Mutex::new(RefCell::new(PinArrayPort { pins: step_pins }));
            let dir_port = Mutex::new(RefCell::new(PinArrayPort { pins: dir_pins }));
            let timer_port = Mutex::new(RefCell::new(DdaTimerProxy { tim: timer }));
            runtime.on_dda_tick(&step_port, &dir_port, &timer_port);
        });
    }

    /// Load software task: same priority as the DDA tick, so it never
    /// preempts it — matching §5's "load software interrupt... spawned
    /// from the DDA task."
    #[task(shared = [hw], priority = 4)]
    async fn load_task(mut cx: load_task::Context) {
        cx.shared.hw.lock(|hw| {
            let StepperHardware { runtime, dir_pins, timer, .. } = hw;
            let dir_port = Mutex::new(RefCell::new(PinArrayPort { pins: dir_pins }));
            let timer_port = Mutex::new(RefCell::new(DdaTimerProxy { tim: timer }));
            runtime.on_load_request(&dir_port, &timer_port);
        });
    }

    /// Cooperative controller tick: runs the ordered §5 dispatch once per
    /// period, feeds the stepper runtime from the planner, checks the
    /// sentinel, and feeds the watchdog.
    #[task(local = [switches, watchdog, latch, controller, feed], shared = [hw], priority = 1)]
    async fn controller_task(mut cx: controller_task::Context) {
        let mut planner_idle = true;
        loop {
            cx.local.watchdog.feed();
            let debounced = cx.local.switches.poll().unwrap_or([false; MOTORS]);
            let switch_triggered = debounced.iter().any(|&s| s);

            planner_idle = cx.shared.hw.lock(|hw| {
                let sentinel_ok = check_stepper_sentinel(&hw.runtime, cx.local.latch).is_ok();
                cx.local.controller.tick(TickInputs { switch_triggered, planner_idle, sentinel_ok });
                cx.local.feed.pump(cx.local.controller, &mut hw.runtime)
            });

            Systick::delay(1u64.millis()).await;
        }
    }

    /// Communication task: feeds raw bytes to the (currently out-of-scope)
    /// wire lexer. Left as a stub per §6's explicit non-goal on the line
    /// protocol.
    #[task(binds = USART1, local = [usart_rx], priority = 2)]
    fn usart_task(cx: usart_task::Context) {
        let _ = cx.local.usart_rx.read();
    }
}
