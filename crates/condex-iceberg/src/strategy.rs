//! Chunk sizing strategies for progressive disclosure.
//!
//! Every strategy produces the size of the *next* chunk from the
//! unfilled remainder; the controller clamps to the remainder so the
//! final chunk never overshoots the total.

use condex_core::{Amount, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};

use crate::error::{IcebergError, IcebergResult};

/// How the visible chunk size evolves across reveals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RevealStrategy {
    /// Constant chunk size per reveal.
    Fixed { chunk: Amount },
    /// Chunk is a fixed fraction of the unfilled remainder.
    Percentage { visible_bps: u32 },
    /// Chunk fraction rises when recent chunks filled faster than the
    /// target duration and falls otherwise, bounded to [floor, ceiling].
    Adaptive {
        initial_bps: u32,
        floor_bps: u32,
        ceiling_bps: u32,
        target_fill_secs: i64,
    },
    /// Chunk fraction grows monotonically with time since order start,
    /// modeling increasing urgency.
    TimeBased {
        initial_bps: u32,
        growth_bps_per_hour: u32,
        ceiling_bps: u32,
    },
}

impl RevealStrategy {
    /// Validate strategy parameters.
    pub fn validate(&self) -> IcebergResult<()> {
        let bps_ok = |bps: u32, name: &str| -> IcebergResult<()> {
            if bps == 0 || bps > BPS_DENOMINATOR {
                return Err(IcebergError::Configuration(format!(
                    "{name} must be in 1..={BPS_DENOMINATOR} bps, got {bps}"
                )));
            }
            Ok(())
        };

        match self {
            Self::Fixed { chunk } => {
                if !chunk.is_positive() {
                    return Err(IcebergError::Configuration(
                        "fixed chunk must be positive".into(),
                    ));
                }
            }
            Self::Percentage { visible_bps } => bps_ok(*visible_bps, "visible_bps")?,
            Self::Adaptive {
                initial_bps,
                floor_bps,
                ceiling_bps,
                target_fill_secs,
            } => {
                bps_ok(*initial_bps, "initial_bps")?;
                bps_ok(*floor_bps, "floor_bps")?;
                bps_ok(*ceiling_bps, "ceiling_bps")?;
                if floor_bps > ceiling_bps {
                    return Err(IcebergError::Configuration(
                        "adaptive floor above ceiling".into(),
                    ));
                }
                if *initial_bps < *floor_bps || *initial_bps > *ceiling_bps {
                    return Err(IcebergError::Configuration(
                        "adaptive initial level outside [floor, ceiling]".into(),
                    ));
                }
                if *target_fill_secs <= 0 {
                    return Err(IcebergError::Configuration(
                        "adaptive target fill duration must be positive".into(),
                    ));
                }
            }
            Self::TimeBased {
                initial_bps,
                ceiling_bps,
                ..
            } => {
                bps_ok(*initial_bps, "initial_bps")?;
                bps_ok(*ceiling_bps, "ceiling_bps")?;
                if initial_bps > ceiling_bps {
                    return Err(IcebergError::Configuration(
                        "time-based initial level above ceiling".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Size of the next chunk, before clamping to the remainder.
    ///
    /// `adaptive_bps` is the controller-maintained adaptive level;
    /// `elapsed_secs` is time since the order started.
    #[must_use]
    pub fn chunk_size(&self, remaining: Amount, adaptive_bps: u32, elapsed_secs: i64) -> Amount {
        match self {
            Self::Fixed { chunk } => *chunk,
            Self::Percentage { visible_bps } => remaining.mul_bps(*visible_bps),
            Self::Adaptive { .. } => remaining.mul_bps(adaptive_bps),
            Self::TimeBased {
                initial_bps,
                growth_bps_per_hour,
                ceiling_bps,
            } => {
                let hours = (elapsed_secs.max(0) / 3600) as u64;
                let grown = u64::from(*initial_bps) + u64::from(*growth_bps_per_hour) * hours;
                let bps = grown.min(u64::from(*ceiling_bps)) as u32;
                remaining.mul_bps(bps)
            }
        }
    }

    /// Adjusted adaptive level after a chunk that took `fill_secs` to
    /// fill. Faster than target raises the level by half, slower lowers
    /// it by a third, always clamped to [floor, ceiling]. Identity for
    /// non-adaptive strategies.
    #[must_use]
    pub fn adjust_adaptive(&self, current_bps: u32, fill_secs: i64) -> u32 {
        let Self::Adaptive {
            floor_bps,
            ceiling_bps,
            target_fill_secs,
            ..
        } = self
        else {
            return current_bps;
        };
        let adjusted = if fill_secs <= *target_fill_secs {
            current_bps.saturating_mul(3) / 2
        } else {
            current_bps.saturating_mul(2) / 3
        };
        adjusted.clamp(*floor_bps, *ceiling_bps)
    }
}
