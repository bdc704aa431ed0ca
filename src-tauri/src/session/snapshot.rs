use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest accepted factor for any adjustment.
pub const FACTOR_MIN: f64 = 0.0;
/// Highest accepted factor for any adjustment.
pub const FACTOR_MAX: f64 = 3.0;
/// Factor that leaves the image unchanged.
pub const IDENTITY_FACTOR: f64 = 1.0;

/// One of the three tunable sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Brightness,
    Contrast,
    Saturation,
}

/// The parameter triple sent to the processor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adjustments {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
}

impl Adjustments {
    pub const IDENTITY: Adjustments = Adjustments {
        brightness: IDENTITY_FACTOR,
        contrast: IDENTITY_FACTOR,
        saturation: IDENTITY_FACTOR,
    };

    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Brightness => self.brightness,
            Field::Contrast => self.contrast,
            Field::Saturation => self.saturation,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Adjustments {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// An immutable parameter set plus the moment it was captured.
///
/// Two snapshots are equal only if all three factors and the timestamp match;
/// use [`Snapshot::same_adjustments`] to compare the parameters alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    brightness: f64,
    contrast: f64,
    saturation: f64,
    created_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot, clamping every factor into `[FACTOR_MIN, FACTOR_MAX]`.
    /// Non-finite factors fall back to the identity value.
    pub fn new(adjustments: Adjustments) -> Self {
        Self::at(adjustments, Utc::now())
    }

    pub fn at(adjustments: Adjustments, created_at: DateTime<Utc>) -> Self {
        Self {
            brightness: sanitize(adjustments.brightness),
            contrast: sanitize(adjustments.contrast),
            saturation: sanitize(adjustments.saturation),
            created_at,
        }
    }

    pub fn identity() -> Self {
        Self::new(Adjustments::IDENTITY)
    }

    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    pub fn contrast(&self) -> f64 {
        self.contrast
    }

    pub fn saturation(&self) -> f64 {
        self.saturation
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn adjustments(&self) -> Adjustments {
        Adjustments {
            brightness: self.brightness,
            contrast: self.contrast,
            saturation: self.saturation,
        }
    }

    /// A copy with one factor replaced. The copy keeps the original timestamp;
    /// drafts are re-stamped when they are committed.
    ///
    /// Returns `None` for NaN, which no slider can produce.
    pub fn with_field(&self, field: Field, value: f64) -> Option<Self> {
        if value.is_nan() {
            return None;
        }
        let mut adjustments = self.adjustments();
        match field {
            Field::Brightness => adjustments.brightness = value,
            Field::Contrast => adjustments.contrast = value,
            Field::Saturation => adjustments.saturation = value,
        }
        Some(Self::at(adjustments, self.created_at))
    }

    /// Same factors, fresh timestamp.
    pub fn restamped(&self) -> Self {
        Self::new(self.adjustments())
    }

    pub fn same_adjustments(&self, other: &Snapshot) -> bool {
        self.adjustments() == other.adjustments()
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(FACTOR_MIN, FACTOR_MAX)
    } else if value == f64::INFINITY {
        FACTOR_MAX
    } else if value == f64::NEG_INFINITY {
        FACTOR_MIN
    } else {
        IDENTITY_FACTOR
    }
}
