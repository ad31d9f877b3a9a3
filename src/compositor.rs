//! Buffer registry and compositor.
//!
//! [`CompositorStatic`] is a fixed arena of layer-buffer slots that lives in a `static`.
//! Producers ask the [`Compositor`] for a buffer and get back a [`LayerHandle`]: the slot
//! index plus the slot's generation at allocation time. Handles are neither `Clone` nor
//! `Copy`, so each buffer has exactly one writer, and a handle that outlives its buffer is
//! detected (the generation moves on) instead of aliasing whatever reuses the slot.
//!
//! Every slot sits behind its own lock. A producer's [`Compositor::with_buffer`] closure
//! and a [`Compositor::composite`] read of the same buffer never interleave, so the
//! compositor only ever sees whole updates. Producers working on different buffers never
//! contend with each other.
//!
//! Composition, every cycle:
//!
//! 1. Clear the physical frame to transparent.
//! 2. For each [`Layer`] from Background to System, for each registered buffer in
//!    registration order, skip it if it is inactive or on another layer.
//! 3. Copy each non-transparent cell to `(buffer.x + x, buffer.y + y)`, dropping cells
//!    that fall off the display. The last writer wins; opacity is not blended.
//!
//! [`Compositor::push_frame`] then maps each `(row, col)` to its strip index and writes
//! the whole frame into the [`PixelSink`] under one lock.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Ticker};
use heapless::Vec;
use portable_atomic::{AtomicBool, Ordering};

use crate::config::DisplayConfig;
use crate::layer::{Layer, LayerBuffer};
use crate::led2d::layout::PixelMapper;
use crate::led2d::{Frame2d, cell_to_rgb};
use crate::led_strip::{Frame1d, PixelSink};
use crate::{Error, Result};

/// Exclusive write access to one layer buffer.
///
/// Returned by [`Compositor::create_buffer`] and consumed by
/// [`Compositor::release_buffer`].
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerHandle {
    index: u8,
    generation: u32,
}

impl LayerHandle {
    /// Arena slot the buffer lives in.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index as usize
    }

    /// Slot generation the handle was issued for.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

struct Slot<const N: usize> {
    generation: u32,
    buffer: Option<LayerBuffer<N>>,
}

impl<const N: usize> Slot<N> {
    const EMPTY: Self = Self {
        generation: 0,
        buffer: None,
    };
}

type SlotCell<const N: usize> = Mutex<CriticalSectionRawMutex, RefCell<Slot<N>>>;

/// Static resources for a [`Compositor`]: `CAP` buffer slots of `N` cells each.
pub struct CompositorStatic<const N: usize, const CAP: usize> {
    slots: [SlotCell<N>; CAP],
    // Indices of occupied slots in registration order.
    registry: Mutex<CriticalSectionRawMutex, RefCell<Vec<u8, CAP>>>,
    initialized: AtomicBool,
}

impl<const N: usize, const CAP: usize> CompositorStatic<N, CAP> {
    /// Creates static resources.
    #[must_use]
    pub const fn new_static() -> Self {
        assert!(CAP <= u8::MAX as usize, "CAP must fit in a u8 slot index");
        Self {
            slots: [const { Mutex::new(RefCell::new(Slot::EMPTY)) }; CAP],
            registry: Mutex::new(RefCell::new(Vec::new())),
            initialized: AtomicBool::new(false),
        }
    }

    /// `true` once a [`Compositor`] has claimed these resources.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Maximum number of live buffers.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// Number of live buffers.
    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.registry.lock(|registry| registry.borrow().len())
    }

    /// Allocate and register a transparent buffer.
    ///
    /// # Errors
    ///
    /// - [`Error::NotInitialized`] before a compositor has claimed these resources.
    /// - [`Error::InvalidArgument`] for a zero width or height.
    /// - [`Error::AllocationFailed`] if `width * height` exceeds the slot size `N`.
    /// - [`Error::ResourceExhausted`] if all `CAP` slots are in use; nothing is registered.
    pub fn create_buffer(
        &self,
        owner: &str,
        width: usize,
        height: usize,
        x: usize,
        y: usize,
        layer: Layer,
    ) -> Result<LayerHandle> {
        if !self.is_initialized() {
            warn!("{}: buffer requested before compositor init", owner);
            return Err(Error::NotInitialized);
        }
        let buffer = LayerBuffer::new(owner, width, height, x, y, layer).inspect_err(|err| {
            warn!("{}: {}x{} buffer rejected: {}", owner, width, height, err);
        })?;

        let handle = self.registry.lock(|registry| {
            let mut registry = registry.borrow_mut();
            let index = (0..CAP)
                .filter_map(|index| u8::try_from(index).ok())
                .find(|index| !registry.contains(index))
                .ok_or(Error::ResourceExhausted)?;
            let slot = self
                .slots
                .get(usize::from(index))
                .ok_or(Error::ResourceExhausted)?;
            registry
                .push(index)
                .map_err(|_| Error::ResourceExhausted)?;
            let generation = slot.lock(|slot| {
                let mut slot = slot.borrow_mut();
                slot.buffer = Some(buffer);
                slot.generation
            });
            Ok(LayerHandle { index, generation })
        });

        match &handle {
            Ok(handle) => info!(
                "{}: {}x{} {} buffer at ({}, {}) in slot {}",
                owner,
                width,
                height,
                layer,
                x,
                y,
                handle.index()
            ),
            Err(err) => warn!("{}: no buffer slot: {}", owner, err),
        }
        handle
    }

    /// Run `f` with exclusive access to the buffer behind `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleLayerHandle`] if the buffer has been released.
    pub fn with_buffer<R>(
        &self,
        handle: &LayerHandle,
        f: impl FnOnce(&mut LayerBuffer<N>) -> R,
    ) -> Result<R> {
        let slot = self
            .slots
            .get(handle.index())
            .ok_or(Error::StaleLayerHandle)?;
        slot.lock(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.generation != handle.generation {
                return Err(Error::StaleLayerHandle);
            }
            slot.buffer.as_mut().map(f).ok_or(Error::StaleLayerHandle)
        })
    }

    /// Unregister and free a buffer. The slot's generation moves on, so no handle issued
    /// for this buffer can reach the slot's next occupant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleLayerHandle`] if the buffer was already released.
    pub fn release_buffer(&self, handle: LayerHandle) -> Result<()> {
        let slot = self
            .slots
            .get(handle.index())
            .ok_or(Error::StaleLayerHandle)?;
        self.registry.lock(|registry| {
            let released = slot.lock(|slot| {
                let mut slot = slot.borrow_mut();
                if slot.generation != handle.generation || slot.buffer.is_none() {
                    return Err(Error::StaleLayerHandle);
                }
                slot.generation = slot.generation.wrapping_add(1);
                Ok(slot.buffer.take())
            })?;
            registry.borrow_mut().retain(|index| *index != handle.index);
            if let Some(buffer) = released {
                info!("{}: released slot {}", buffer.owner(), handle.index());
            }
            Ok(())
        })
    }

    fn composite_into<const W: usize, const H: usize>(&self, frame: &mut Frame2d<W, H>) {
        frame.clear();
        self.registry.lock(|registry| {
            let registry = registry.borrow();
            for layer in Layer::ALL {
                for slot in registry
                    .iter()
                    .filter_map(|index| self.slots.get(usize::from(*index)))
                {
                    slot.lock(|slot| {
                        if let Some(buffer) = slot.borrow().buffer.as_ref()
                            && buffer.is_active()
                            && buffer.layer() == layer
                        {
                            blit(frame, buffer);
                        }
                    });
                }
            }
        });
    }
}

fn blit<const W: usize, const H: usize, const N: usize>(
    frame: &mut Frame2d<W, H>,
    buffer: &LayerBuffer<N>,
) {
    let (origin_x, origin_y) = buffer.position();
    for (local_y, row) in buffer.pixels().chunks(buffer.width()).enumerate() {
        let Some(target_row) = origin_y
            .checked_add(local_y)
            .and_then(|y| frame.0.get_mut(y))
        else {
            break;
        };
        for (local_x, cell) in row.iter().enumerate() {
            if cell.is_none() {
                continue;
            }
            let Some(target) = origin_x
                .checked_add(local_x)
                .and_then(|x| target_row.get_mut(x))
            else {
                break;
            };
            *target = *cell;
        }
    }
}

/// Merges layer buffers into the physical frame and feeds the pixel sink.
///
/// `W`×`H` is the logical display, `N = W * H` is both the strip length and the slot size,
/// and `CAP` is the number of buffer slots.
pub struct Compositor<const W: usize, const H: usize, const N: usize, const CAP: usize> {
    resources: &'static CompositorStatic<N, CAP>,
    mapper: PixelMapper<N, W, H>,
    frame: Mutex<CriticalSectionRawMutex, RefCell<Frame2d<W, H>>>,
}

impl<const W: usize, const H: usize, const N: usize, const CAP: usize> Compositor<W, H, N, CAP> {
    const GEOMETRY: () = assert!(W * H == N, "W*H must equal N");

    /// Creates static resources.
    #[must_use]
    pub const fn new_static() -> CompositorStatic<N, CAP> {
        CompositorStatic::new_static()
    }

    /// Claim `resources` and build the pixel mapper for `config.rotation`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedRotation`] if the rotation has no wiring table.
    /// - [`Error::ResourceExhausted`] if another compositor already claimed `resources`.
    pub fn new(
        resources: &'static CompositorStatic<N, CAP>,
        config: &DisplayConfig,
    ) -> Result<Self> {
        let () = Self::GEOMETRY;
        let mapper = PixelMapper::for_rotation(config.rotation).inspect_err(|err| {
            error!("compositor init failed: {}", err);
        })?;
        if resources
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            error!("compositor resources already claimed");
            return Err(Error::ResourceExhausted);
        }
        info!("compositor ready: {}x{}, {} buffer slots", W, H, CAP);
        Ok(Self {
            resources,
            mapper,
            frame: Mutex::new(RefCell::new(Frame2d::new())),
        })
    }

    /// The arena this compositor draws from.
    #[must_use]
    pub const fn resources(&self) -> &'static CompositorStatic<N, CAP> {
        self.resources
    }

    /// See [`CompositorStatic::create_buffer`].
    ///
    /// # Errors
    ///
    /// See [`CompositorStatic::create_buffer`].
    pub fn create_buffer(
        &self,
        owner: &str,
        width: usize,
        height: usize,
        x: usize,
        y: usize,
        layer: Layer,
    ) -> Result<LayerHandle> {
        self.resources
            .create_buffer(owner, width, height, x, y, layer)
    }

    /// See [`CompositorStatic::with_buffer`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleLayerHandle`] if the buffer has been released.
    pub fn with_buffer<R>(
        &self,
        handle: &LayerHandle,
        f: impl FnOnce(&mut LayerBuffer<N>) -> R,
    ) -> Result<R> {
        self.resources.with_buffer(handle, f)
    }

    /// See [`CompositorStatic::release_buffer`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleLayerHandle`] if the buffer was already released.
    pub fn release_buffer(&self, handle: LayerHandle) -> Result<()> {
        self.resources.release_buffer(handle)
    }

    /// Number of live buffers.
    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.resources.buffer_count()
    }

    /// Rebuild the physical frame from every active buffer.
    pub fn composite(&self) {
        let mut frame = Frame2d::new();
        self.resources.composite_into(&mut frame);
        self.frame.lock(|current| *current.borrow_mut() = frame);
    }

    /// Snapshot of the last composited frame.
    #[must_use]
    pub fn frame(&self) -> Frame2d<W, H> {
        self.frame.lock(|frame| *frame.borrow())
    }

    /// The last composited frame in strip order, transparent cells dark.
    #[must_use]
    pub fn strip_frame(&self) -> Frame1d<N> {
        let frame = self.frame();
        let mut strip = Frame1d::new();
        for (row_index, row) in frame.iter().enumerate() {
            for (col_index, cell) in row.iter().enumerate() {
                let Ok(led_index) = self.mapper.map_to_physical_index(row_index, col_index) else {
                    continue;
                };
                if let Some(pixel) = strip.get_mut(led_index) {
                    *pixel = cell_to_rgb(*cell);
                }
            }
        }
        strip
    }

    /// Write the last composited frame into `sink` as one strip frame.
    pub fn push_frame(&self, sink: &PixelSink<N>) {
        sink.write_frame(&self.strip_frame());
    }
}

/// Composite and push to `sink` once per `period`, forever.
pub async fn compositor_loop<const W: usize, const H: usize, const N: usize, const CAP: usize>(
    compositor: &'static Compositor<W, H, N, CAP>,
    sink: &'static PixelSink<N>,
    period: Duration,
) -> ! {
    info!("compositor loop every {} ms", period.as_millis());
    let mut ticker = Ticker::every(period);
    loop {
        compositor.composite();
        compositor.push_frame(sink);
        ticker.next().await;
    }
}
