//! Crate-wide error type.

use derive_more::{Display, Error};

use crate::app_manager::AppState;
use crate::led2d::layout::Rotation;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors produced by the display core, the app supervisor, and the firmware glue.
#[derive(Debug, Display, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Every slot of a fixed-capacity table is in use.
    #[display("capacity exhausted")]
    ResourceExhausted,

    /// An argument was outside its documented domain (for example a zero-sized buffer).
    #[display("invalid argument")]
    InvalidArgument,

    /// The compositor has not been initialized yet.
    #[display("compositor not initialized")]
    NotInitialized,

    /// A coordinate or index fell outside its surface.
    #[display("coordinate out of bounds")]
    OutOfBounds,

    /// The LED driver failed to shift a frame out.
    #[display("LED transmit failed")]
    HardwareTransmitFailure,

    /// Pixel storage for a layer buffer could not be reserved.
    #[display("layer buffer allocation failed")]
    AllocationFailed,

    /// The handle refers to a buffer that has since been released.
    #[display("stale layer handle")]
    StaleLayerHandle,

    /// The requested display rotation has no wiring table.
    #[display("unsupported rotation {_0:?}")]
    UnsupportedRotation(#[error(not(source))] Rotation),

    /// No app with the given name is registered.
    #[display("app not found")]
    AppNotFound,

    /// An app with the same name is already registered.
    #[display("app already registered")]
    DuplicateApp,

    /// The app's `init` hook failed.
    #[display("app init failed")]
    AppInitFailed,

    /// The app lifecycle does not allow this state change.
    #[display("invalid app state transition {from:?} -> {to:?}")]
    InvalidStateTransition {
        /// State the app was in.
        from: AppState,
        /// State that was requested.
        to: AppState,
    },

    /// An embassy task could not be spawned.
    #[cfg(not(feature = "host"))]
    #[display("task spawn failed")]
    TaskSpawn(#[error(not(source))] embassy_executor::SpawnError),
}

#[cfg(not(feature = "host"))]
impl From<embassy_executor::SpawnError> for Error {
    fn from(error: embassy_executor::SpawnError) -> Self {
        Self::TaskSpawn(error)
    }
}
