//! Interactive session: the loaded image, the current configuration,
//! and the bookkeeping that keeps superseded results off the screen.
//!
//! A [`Session`] is in one of two states ([`SessionState`]). Until an
//! image is loaded, computing anything yields the informational
//! [`SessionError::NoImage`]. Once one is loaded, each family decides
//! when results are recomputed ([`TriggerMode`]): morphology and edge
//! detection on every configuration change, smoothing only on
//! [`Session::apply`].
//!
//! Hosts that compute off the UI thread use [`Ticket`]s. Every load,
//! configuration change, and [`Session::begin`] advances the session's
//! generation; [`Session::complete`] accepts a result only if its ticket
//! still carries the latest generation (last write wins).

use std::sync::Arc;

use crate::config::OperationConfig;
use crate::decode;
use crate::registry::TriggerMode;
use crate::types::{Dimensions, DynamicImage, OperationResult, PipelineError};

/// Whether an image is available to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the user to provide an image.
    NoImageLoaded,
    /// An image is loaded and operations can run.
    ImageLoaded,
}

/// Errors surfaced by a [`Session`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No image has been loaded yet. Not a failure: the host should
    /// prompt for input.
    #[error("please upload an image to get started")]
    NoImage,

    /// The provided bytes could not be decoded.
    #[error(transparent)]
    Decode(#[from] PipelineError),
}

impl SessionError {
    /// Whether this is an "awaiting input" notice rather than a failure.
    #[must_use]
    pub const fn is_informational(&self) -> bool {
        matches!(self, Self::NoImage)
    }

    /// Message suitable for showing to an end user.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::NoImage => "Please upload an image to get started",
            Self::Decode(e) => e.user_message(),
        }
    }
}

/// Snapshot of one computation request.
///
/// Carries everything needed to compute the result elsewhere, so it can
/// be handed to a worker. Hand the result back through
/// [`Session::complete`].
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    image: Arc<DynamicImage>,
    config: OperationConfig,
}

impl Ticket {
    /// Generation this ticket was issued for.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The configuration snapshot.
    #[must_use]
    pub const fn config(&self) -> &OperationConfig {
        &self.config
    }

    /// The image snapshot.
    #[must_use]
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Compute the result for this snapshot.
    #[must_use = "returns the operation result"]
    pub fn run(&self) -> OperationResult {
        crate::compute_result(&self.image, &self.config)
    }
}

/// Holds the loaded image and the current configuration.
#[derive(Debug, Default)]
pub struct Session {
    image: Option<Arc<DynamicImage>>,
    config: OperationConfig,
    generation: u64,
    in_flight: Option<u64>,
}

impl Session {
    /// Empty session with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty session starting from `config` (normalized).
    #[must_use]
    pub fn with_config(config: OperationConfig) -> Self {
        Self {
            config: config.normalized(),
            ..Self::default()
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        if self.image.is_some() {
            SessionState::ImageLoaded
        } else {
            SessionState::NoImageLoaded
        }
    }

    /// The loaded image, if any.
    #[must_use]
    pub fn image(&self) -> Option<&DynamicImage> {
        self.image.as_deref()
    }

    /// The current (normalized) configuration.
    #[must_use]
    pub const fn config(&self) -> &OperationConfig {
        &self.config
    }

    /// Current generation. Advances on every load, configuration
    /// change, and [`begin`](Self::begin).
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Decode `bytes` and make the result the current image.
    ///
    /// On failure the session is left exactly as it was. On success,
    /// returns the recomputed result if the current family recomputes
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Decode`] if the bytes are empty or not a
    /// decodable image.
    pub fn load(&mut self, bytes: &[u8]) -> Result<Option<OperationResult>, SessionError> {
        let image = decode::decode(bytes)?;
        Ok(self.load_image(image))
    }

    /// Make an already-decoded image the current image.
    ///
    /// Returns the recomputed result if the current family recomputes
    /// immediately.
    pub fn load_image(&mut self, image: DynamicImage) -> Option<OperationResult> {
        log::info!("loaded {} image", Dimensions::of(&image));
        self.image = Some(Arc::new(image));
        self.advance();
        self.recompute_if_immediate()
    }

    /// Replace the configuration.
    ///
    /// Out-of-range parameters are clamped (and logged). Returns the
    /// recomputed result when an image is loaded and the new
    /// configuration's family recomputes immediately; otherwise `None`.
    pub fn configure(&mut self, config: OperationConfig) -> Option<OperationResult> {
        self.config = config.normalized();
        log::debug!("configured {}", self.config.operation());
        self.advance();
        self.recompute_if_immediate()
    }

    /// Compute the result for the current image and configuration.
    ///
    /// Supersedes any outstanding [`Ticket`]. The computation holds the
    /// session exclusively, so its own result is always current.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImage`] if no image is loaded.
    pub fn apply(&mut self) -> Result<OperationResult, SessionError> {
        let ticket = self.begin()?;
        let result = ticket.run();
        self.in_flight = None;
        Ok(result)
    }

    /// Issue a ticket for the current image and configuration,
    /// superseding any outstanding ticket.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImage`] if no image is loaded.
    pub fn begin(&mut self) -> Result<Ticket, SessionError> {
        let image = self.image.clone().ok_or(SessionError::NoImage)?;
        self.advance();
        self.in_flight = Some(self.generation);
        Ok(Ticket {
            generation: self.generation,
            image,
            config: self.config,
        })
    }

    /// Hand back the result computed for `ticket`.
    ///
    /// Returns the result if `ticket` is still the latest request;
    /// returns `None` (and drops the result) if it was superseded by a
    /// newer ticket, load, or configuration change, or was already
    /// completed.
    pub fn complete(&mut self, ticket: &Ticket, result: OperationResult) -> Option<OperationResult> {
        if self.in_flight == Some(ticket.generation) && ticket.generation == self.generation {
            self.in_flight = None;
            Some(result)
        } else {
            log::warn!(
                "dropping stale {} result (generation {} superseded by {})",
                ticket.config.operation(),
                ticket.generation,
                self.generation,
            );
            None
        }
    }

    fn advance(&mut self) {
        self.generation += 1;
        self.in_flight = None;
    }

    fn recompute_if_immediate(&mut self) -> Option<OperationResult> {
        if self.config.family().trigger() != TriggerMode::Immediate {
            return None;
        }
        self.apply().ok()
    }
}
