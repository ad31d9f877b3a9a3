#![allow(missing_docs)]
//! Matrix clock firmware: a 32x8 WS2812 panel on PIN_27 showing the time, a firmware update
//! bar, and a network status pixel, with brightness from a potentiometer on PIN_26.
//!
//! The network stack, updater, and time source publish into `NETWORK`, `UPDATE`, and
//! `CLOCK`. Until a time source calls `CLOCK.set_utc_time`, the clock shows `--:--`.

#![no_std]
#![no_main]
#![cfg(not(feature = "host"))]
#![allow(clippy::future_not_send, reason = "single-threaded")]

use core::{convert::Infallible, panic};

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_rp::adc::{self, Adc};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::Pull;
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::{self, Pio};
use embassy_rp::pio_programs::ws2812::{PioWs2812, PioWs2812Program};
use embassy_time::Timer;
use matrix_envoy::{
    MATRIX_LEN, MatrixCompositor, MatrixCompositorStatic, MatrixPixelSink, Result,
    app_manager::AppManager,
    apps::{ClockApp, StatusApp, UpdateProgressApp},
    brightness::{PotentiometerLevel, brightness_loop},
    compositor::compositor_loop,
    config::DisplayConfig,
    led_strip::{Current, pixel_sink_loop},
    status::{NetworkStatus, SoftClock, UpdateProgress},
};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => pio::InterruptHandler<PIO0>;
    ADC_IRQ_FIFO => adc::InterruptHandler;
});

// A 3 A supply for 256 LEDs.
const CONFIG: DisplayConfig =
    DisplayConfig::DEFAULT.with_current_budget(Current::Milliamps(3000), MATRIX_LEN);

// Pacific standard time.
const UTC_OFFSET_MINUTES: i32 = -8 * 60;

// 12-bit ADC.
const ADC_FULL_SCALE: u16 = 4095;

static PIXEL_SINK: MatrixPixelSink = CONFIG.pixel_sink();
static COMPOSITOR_STATIC: MatrixCompositorStatic = MatrixCompositor::new_static();
static POTENTIOMETER: PotentiometerLevel = PotentiometerLevel::new();
static NETWORK: NetworkStatus = NetworkStatus::new();
static UPDATE: UpdateProgress = UpdateProgress::new();
static CLOCK: SoftClock = SoftClock::new(UTC_OFFSET_MINUTES);

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(spawner: Spawner) -> Result<Infallible> {
    let p = embassy_rp::init(Default::default());

    // LED panel
    let Pio {
        mut common, sm0, ..
    } = Pio::new(p.PIO0, Irqs);
    let program = PioWs2812Program::new(&mut common);
    let driver = PioWs2812::new(&mut common, sm0, p.DMA_CH0, p.PIN_27, &program);
    spawner.spawn(pixel_sink_task(driver))?;

    // Brightness knob
    let adc = Adc::new(p.ADC, Irqs, adc::Config::default());
    let knob = adc::Channel::new_pin(p.PIN_26, Pull::None);
    spawner.spawn(potentiometer_task(adc, knob))?;
    spawner.spawn(brightness_task())?;

    static COMPOSITOR: StaticCell<MatrixCompositor> = StaticCell::new();
    let compositor: &'static MatrixCompositor =
        COMPOSITOR.init(MatrixCompositor::new(&COMPOSITOR_STATIC, &CONFIG)?);
    spawner.spawn(compositor_task(compositor))?;

    // Producers, highest priority first when due together.
    let mut update_app = UpdateProgressApp::new(compositor, &UPDATE);
    let mut status_app = StatusApp::new(compositor, &NETWORK);
    let mut clock_app = ClockApp::new(compositor, &CLOCK);
    let mut apps: AppManager<'_> = AppManager::new();
    apps.register(&mut update_app, 3)?;
    apps.register(&mut status_app, 2)?;
    apps.register(&mut clock_app, 1)?;
    apps.start_all()?;

    info!("matrix clock running");
    apps.run().await
}

#[embassy_executor::task]
async fn pixel_sink_task(driver: PioWs2812<'static, PIO0, 0, MATRIX_LEN>) -> ! {
    pixel_sink_loop(&PIXEL_SINK, driver, CONFIG.refresh_period).await
}

#[embassy_executor::task]
async fn compositor_task(compositor: &'static MatrixCompositor) -> ! {
    compositor_loop(compositor, &PIXEL_SINK, CONFIG.composite_period).await
}

#[embassy_executor::task]
async fn brightness_task() -> ! {
    brightness_loop(
        &PIXEL_SINK,
        POTENTIOMETER.smoothed(),
        CONFIG.brightness_poll_period,
    )
    .await
}

#[embassy_executor::task]
async fn potentiometer_task(
    mut adc: Adc<'static, adc::Async>,
    mut knob: adc::Channel<'static>,
) -> ! {
    loop {
        match adc.read(&mut knob).await {
            Ok(sample) => POTENTIOMETER.set_adc_sample(sample, ADC_FULL_SCALE),
            Err(_) => warn!("potentiometer read failed"),
        }
        Timer::after(CONFIG.brightness_poll_period).await;
    }
}
