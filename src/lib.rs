//! Hands-free assistive input control: voice, hand gesture, and gaze fused
//! into one serialized stream of OS pointer actions.
//!
//! Three modality processors run as independent threads and publish semantic
//! events onto a shared bus; a single arbiter consumes the bus and is the
//! only caller of the input-injection sink. Perception, speech, injection,
//! and profile storage are external collaborators behind trait seams with
//! subprocess-backed default adapters.

pub mod arbiter;
pub mod calibration;
pub mod command;
pub mod config;
pub mod event;
pub mod eye;
pub mod gesture;
pub mod landmark;
pub mod perception;
pub mod profile;
pub mod session;
pub mod sink;
pub mod speech;
pub mod telemetry;
pub mod voice;

pub use config::{AppConfig, Mode};
pub use event::{Button, EventKind, SemanticEvent, Source};
pub use landmark::LandmarkFrame;
pub use profile::{CalibrationBounds, JsonProfileStore, Profile, ProfileStore};
pub use session::{run_session, ModalityInputs, ScreenSize, SessionContext};
