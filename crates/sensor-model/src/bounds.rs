//! Shared y-axis bounds across the plotted channels.

use serde::{Deserialize, Serialize};

use dispviz_common::error::{DispvizError, DispvizResult};

use crate::channel::ChannelSelection;
use crate::table::SampleTable;

/// Closed y-axis range `[min, max]` fixed for a whole animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    /// Global minimum and maximum over the given named sequences.
    ///
    /// An empty sequence, an empty set of sequences, or a set with no
    /// numeric (non-NaN) samples yields `EmptyChannel`.
    pub fn from_channels<'a, I>(channels: I) -> DispvizResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a [f64])>,
    {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut last_name = None;

        for (name, samples) in channels {
            if samples.is_empty() {
                return Err(DispvizError::EmptyChannel {
                    name: name.to_string(),
                });
            }
            for &v in samples {
                min = min.min(v);
                max = max.max(v);
            }
            last_name = Some(name);
        }

        let Some(name) = last_name else {
            return Err(DispvizError::EmptyChannel {
                name: "<no channels selected>".to_string(),
            });
        };

        // f64::min/max skip NaN, so the fold only stays infinite when
        // nothing numeric was seen.
        if min > max {
            return Err(DispvizError::EmptyChannel {
                name: name.to_string(),
            });
        }

        Ok(Self { min, max })
    }

    /// Bounds over every channel in the selection.
    pub fn for_selection(table: &SampleTable, selection: &ChannelSelection) -> DispvizResult<Self> {
        let names = selection.channel_names();
        let columns = selection.resolve(table)?;
        let bounds = Self::from_channels(names.into_iter().zip(columns))?;
        tracing::debug!(min = bounds.min, max = bounds.max, "Axis bounds computed");
        Ok(bounds)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}
