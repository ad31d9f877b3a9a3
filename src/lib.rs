//! Display core for a Pico-driven WS2812 LED matrix clock.
//!
//! Independently scheduled producers (clock, update progress, network status) each draw
//! into their own [`LayerBuffer`](layer::LayerBuffer). The [`Compositor`](compositor::Compositor)
//! merges the active buffers by [`Layer`](layer::Layer) precedence into one physical frame,
//! maps it onto the serpentine LED wiring, and hands it to the
//! [`PixelSink`](led_strip::PixelSink), which applies brightness and transmits at the
//! strip's own refresh rate.
//!
//! # Glossary
//!
//! - **Layer:** precedence tier (Background < Foreground < Popup < System) deciding occlusion.
//! - **Layer buffer:** a producer-owned rectangular pixel surface placed on the display.
//! - **Compositor:** merges all active layer buffers into one physical frame buffer.
//! - **Pixel sink:** owns the physical pixel array; handles brightness and transmission.
//! - **Transparent:** the [`TRANSPARENT`](led2d::TRANSPARENT) cell, which contributes nothing.
//! - **Producer:** an independently scheduled [`App`](app_manager::App) that draws into one buffer.
#![cfg_attr(not(feature = "host"), no_std)]
#![allow(async_fn_in_trait, reason = "single-threaded embedded")]

// Compile-time checks: exactly one board must be selected (unless testing with host feature)
#[cfg(all(not(any(feature = "pico1", feature = "pico2")), not(feature = "host")))]
compile_error!("Must enable exactly one board feature: 'pico1' or 'pico2'");

#[cfg(all(feature = "pico1", feature = "pico2"))]
compile_error!("Cannot enable both 'pico1' and 'pico2' features simultaneously");

// Compile-time checks: exactly one architecture must be selected (unless testing with host feature)
#[cfg(all(not(any(feature = "arm", feature = "riscv")), not(feature = "host")))]
compile_error!("Must enable exactly one architecture feature: 'arm' or 'riscv'");

#[cfg(all(feature = "arm", feature = "riscv"))]
compile_error!("Cannot enable both 'arm' and 'riscv' features simultaneously");

// Compile-time check: pico1 only supports ARM
#[cfg(all(feature = "pico1", feature = "riscv"))]
compile_error!("Pico 1 (RP2040) only supports ARM architecture, not RISC-V");

// Must come first so the logging macros are visible to every module below.
#[macro_use]
mod fmt;

pub mod app_manager;
pub mod apps;
pub mod brightness;
pub mod compositor;
pub mod config;
mod error;
pub mod graphics;
pub mod layer;
pub mod led2d;
pub mod led_strip;
pub mod status;
#[cfg(feature = "host")]
pub mod to_png;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};

/// Number of LED columns on the appliance panel.
pub const MATRIX_WIDTH: usize = 32;
/// Number of LED rows on the appliance panel.
pub const MATRIX_HEIGHT: usize = 8;
/// Total LEDs on the appliance panel (`MATRIX_WIDTH * MATRIX_HEIGHT`).
pub const MATRIX_LEN: usize = MATRIX_WIDTH * MATRIX_HEIGHT;
/// Layer buffers the appliance compositor can hold at once.
pub const MAX_LAYERS: usize = 16;

/// Compositor sized for the appliance panel.
pub type MatrixCompositor =
    compositor::Compositor<MATRIX_WIDTH, MATRIX_HEIGHT, MATRIX_LEN, MAX_LAYERS>;
/// Static resources for [`MatrixCompositor`].
pub type MatrixCompositorStatic = compositor::CompositorStatic<MATRIX_LEN, MAX_LAYERS>;
/// Pixel sink sized for the appliance panel.
pub type MatrixPixelSink = led_strip::PixelSink<MATRIX_LEN>;
