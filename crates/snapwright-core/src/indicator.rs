//! Snap indicator messages.
//!
//! The engine never draws anything. After a successful snap it sends an
//! [`IndicatorMessage`] to whatever [`Indicator`] the host installed, and the
//! host decides how to draw it and when to remove it.

use std::time::Duration;

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::candidate::{SnapSource, SnapTarget};
use crate::results::SnapResult;

/// "Show a marker at `point` for `duration`".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorMessage {
    pub point: Point,
    pub source: SnapSource,
    pub target: SnapTarget,
    /// Tooltip text, e.g. "cusp node to grid intersection".
    pub description: String,
    pub duration: Duration,
}

impl IndicatorMessage {
    /// Message for a snapped result; `None` when nothing snapped.
    pub fn for_result(result: &SnapResult, persistence_seconds: f64) -> Option<Self> {
        if !result.is_snapped() {
            return None;
        }
        Some(Self {
            point: result.point,
            source: result.source,
            target: result.target,
            description: format!("{} to {}", result.source.description(), result.target.description()),
            duration: Duration::from_secs_f64(persistence_seconds.max(0.0)),
        })
    }
}

/// Receiver of indicator messages, implemented by the rendering side.
pub trait Indicator {
    fn show(&mut self, message: IndicatorMessage);

    /// Remove whatever is shown (the drag ended or was cancelled).
    fn clear(&mut self);
}

/// Indicator that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn show(&mut self, message: IndicatorMessage) {
        log::info!(
            "Snapped {} at ({:.3}, {:.3})",
            message.description,
            message.point.x,
            message.point.y
        );
    }

    fn clear(&mut self) {
        log::trace!("Snap indicator cleared");
    }
}
