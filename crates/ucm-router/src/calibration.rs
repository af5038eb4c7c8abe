//! Calibration coupling.
//!
//! While a voice-call use case is active the enabled RX and TX endpoints
//! resolve to a calibration pair that is pushed to the DSP. Pushes are
//! deduplicated per card: the loader only hears about a pair that differs
//! from the last one it accepted.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use ucm_core::{Capability, Result, UcmError};

use crate::config::{default_remap_rules, RemapRule};

/// Pushes calibration profiles to the audio DSP.
pub trait CalibrationLoader: Send {
    /// Voice calibration for an RX/TX pair.
    fn apply(&mut self, rx: i32, tx: i32) -> Result<()>;

    /// Calibration for a single endpoint outside of a call.
    fn apply_generic(&mut self, id: i32, capability: Capability) -> Result<()>;
}

/// Loader for cards without DSP calibration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCalibration;

impl CalibrationLoader for NoCalibration {
    fn apply(&mut self, _rx: i32, _tx: i32) -> Result<()> {
        Ok(())
    }

    fn apply_generic(&mut self, _id: i32, _capability: Capability) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationCall {
    Voice { rx: i32, tx: i32 },
    Generic { id: i32, capability: Capability },
}

#[derive(Debug, Default)]
struct Recorded {
    calls: Vec<CalibrationCall>,
    failing: bool,
}

/// Loader that records every call; clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingCalibration {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingCalibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<CalibrationCall> {
        self.inner.lock().calls.clone()
    }

    /// Only the voice pairs, in push order.
    pub fn voice_calls(&self) -> Vec<(i32, i32)> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                CalibrationCall::Voice { rx, tx } => Some((*rx, *tx)),
                CalibrationCall::Generic { .. } => None,
            })
            .collect()
    }

    /// Make every subsequent call fail.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().failing = failing;
    }

    fn record(&self, call: CalibrationCall) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.failing {
            return Err(UcmError::State("calibration loader unavailable".into()));
        }
        inner.calls.push(call);
        Ok(())
    }
}

impl CalibrationLoader for RecordingCalibration {
    fn apply(&mut self, rx: i32, tx: i32) -> Result<()> {
        self.record(CalibrationCall::Voice { rx, tx })
    }

    fn apply_generic(&mut self, id: i32, capability: Capability) -> Result<()> {
        self.record(CalibrationCall::Generic { id, capability })
    }
}

/// Per-card calibration state: the loader, remap rules and the last pair
/// the loader accepted.
pub struct CalibrationCoupler {
    loader: Box<dyn CalibrationLoader>,
    rules: Vec<RemapRule>,
    external: bool,
    last: Option<(i32, i32)>,
}

impl CalibrationCoupler {
    pub fn new(loader: Box<dyn CalibrationLoader>) -> Self {
        Self {
            loader,
            rules: default_remap_rules(),
            external: false,
            last: None,
        }
    }

    pub fn with_rules(mut self, rules: Vec<RemapRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Voice calibration is owned by another component; track the pair
    /// without calling the loader.
    pub fn with_external_voice(mut self, external: bool) -> Self {
        self.external = external;
        self
    }

    /// The pair after the first matching remap rule.
    pub fn resolve(&self, rx: i32, tx: i32) -> (i32, i32) {
        match self.rules.iter().find(|r| r.matches(rx, tx)) {
            Some(rule) => {
                debug!(rx, tx, replacement = rule.replacement, "remapping tx calibration");
                (rx, rule.replacement)
            }
            None => (rx, tx),
        }
    }

    /// Last pair pushed (or tracked) for this card.
    pub fn last_pair(&self) -> Option<(i32, i32)> {
        self.last
    }

    /// Bring the loader in line with the voice routing state. `None` means
    /// no voice-call use case is active.
    pub(crate) fn sync_voice(&mut self, ids: Option<(Option<i32>, Option<i32>)>) {
        let Some(ids) = ids else {
            if self.last.take().is_some() {
                debug!("voice calibration cleared");
            }
            return;
        };
        let (Some(rx), Some(tx)) = ids else {
            return;
        };
        let pair = self.resolve(rx, tx);
        if self.last == Some(pair) {
            return;
        }
        if self.external {
            debug!(rx = pair.0, tx = pair.1, "voice calibration handled externally");
            self.last = Some(pair);
            return;
        }
        match self.loader.apply(pair.0, pair.1) {
            Ok(()) => {
                info!(rx = pair.0, tx = pair.1, "voice calibration applied");
                self.last = Some(pair);
            }
            Err(e) => warn!(rx = pair.0, tx = pair.1, error = %e, "voice calibration failed"),
        }
    }

    pub(crate) fn apply_generic(&mut self, id: i32, capability: Capability) {
        if let Err(e) = self.loader.apply_generic(id, capability) {
            warn!(id, %capability, error = %e, "generic calibration failed");
        }
    }

    pub(crate) fn reset(&mut self) {
        self.last = None;
    }
}

impl std::fmt::Debug for CalibrationCoupler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibrationCoupler")
            .field("rules", &self.rules)
            .field("external", &self.external)
            .field("last", &self.last)
            .finish()
    }
}
