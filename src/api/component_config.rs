use serde::{Deserialize, Serialize};

use crate::core::Viewport;
use crate::error::{ChartError, ChartResult};
use crate::labels::{CollisionMode, LabelPlacementConfig};

use super::ChartKind;

pub const DEFAULT_ANIMATION_DURATION_MS: u64 = 750;

/// Bootstrap configuration of one chart component instance.
///
/// Serializable so hosts can persist a component setup next to its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartComponentConfig {
    pub kind: ChartKind,
    pub viewport: Viewport,
    #[serde(default)]
    pub labels: LabelPlacementConfig,
    #[serde(default = "default_animation_duration_ms")]
    pub animation_duration_ms: u64,
}

impl ChartComponentConfig {
    #[must_use]
    pub fn new(kind: ChartKind, viewport: Viewport) -> Self {
        Self {
            kind,
            viewport,
            labels: LabelPlacementConfig::default(),
            animation_duration_ms: DEFAULT_ANIMATION_DURATION_MS,
        }
    }

    #[must_use]
    pub fn with_labels(mut self, labels: LabelPlacementConfig) -> Self {
        self.labels = labels;
        self
    }

    #[must_use]
    pub fn with_collision_mode(mut self, collision: CollisionMode) -> Self {
        self.labels.collision = collision;
        self
    }

    /// Fixes the occupancy grid resolution instead of deriving it from size.
    #[must_use]
    pub fn with_label_cell_size(mut self, cell_size_px: f64) -> Self {
        self.labels.cell_size_px = Some(cell_size_px);
        self
    }

    #[must_use]
    pub fn with_animation_duration_ms(mut self, duration_ms: u64) -> Self {
        self.animation_duration_ms = duration_ms;
        self
    }

    pub fn validate(self) -> ChartResult<Self> {
        if !self.viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }
        let labels = self.labels.validate()?;
        Ok(Self { labels, ..self })
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ChartError::InvalidData(format!("failed to serialize config: {e}")))
    }

    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| ChartError::InvalidData(format!("failed to parse config: {e}")))?;
        config.validate()
    }
}

fn default_animation_duration_ms() -> u64 {
    DEFAULT_ANIMATION_DURATION_MS
}

#[cfg(test)]
mod tests {
    use super::ChartComponentConfig;
    use crate::api::ChartKind;
    use crate::core::Viewport;
    use crate::labels::CollisionMode;

    #[test]
    fn json_round_trip_keeps_label_settings() {
        let config = ChartComponentConfig::new(ChartKind::BarChart, Viewport::new(640, 480))
            .with_collision_mode(CollisionMode::HideOnly)
            .with_label_cell_size(2.0);
        let json = config.to_json_pretty().expect("serialize");
        let parsed = ChartComponentConfig::from_json_str(&json).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let parsed = ChartComponentConfig::from_json_str(
            r#"{"kind":"dumbbell-plot","viewport":{"width":300,"height":200}}"#,
        )
        .expect("parse");
        assert_eq!(parsed.animation_duration_ms, 750);
        assert_eq!(parsed.labels.collision, CollisionMode::Auto);
    }

    #[test]
    fn zero_viewport_is_rejected() {
        let result = ChartComponentConfig::from_json_str(
            r#"{"kind":"bar-chart","viewport":{"width":0,"height":200}}"#,
        );
        assert!(result.is_err());
    }
}
