//! VISSIM places the network in a local cartesian system, registered against one reference point
//! of the background map in (spherical) Mercator meters. This converts local coordinates to WGS84.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const EARTH_RADIUS: f64 = 6378137.0;
/// Corrects the latitude of the Mercator sphere to the WGS84 ellipsoid
const MERCATOR_CORRECTION: f64 = 1.001120232;

/// The value the simulator uses for each point.
#[allow(clippy::approx_constant)]
pub const PI_SHORT: f64 = 3.14159265358979;
/// The value used to derive the reference latitude and local scale.
#[allow(clippy::excessive_precision)]
pub const PI_LONG: f64 = 3.14159265358979323846264338;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFrame {
    /// Reference point of the background map, in Mercator meters
    pub x_refmap: f64,
    pub y_refmap: f64,
    /// The same point in the network's local coordinates
    pub x_refnet: f64,
    pub y_refnet: f64,
}

impl Default for ReferenceFrame {
    fn default() -> Self {
        Self {
            x_refmap: -9772674.016,
            y_refmap: 5317775.409,
            x_refnet: 0.0,
            y_refnet: 0.0,
        }
    }
}

/// Published outputs were produced with two slightly different values of pi: `PI_LONG` for the
/// reference latitude and scale, `PI_SHORT` for every converted point. `Single` uses one value
/// for both steps, which shifts results in the last few digits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PiConvention {
    Dual,
    Single(f64),
}

impl Default for PiConvention {
    fn default() -> Self {
        PiConvention::Dual
    }
}

impl PiConvention {
    fn for_reference(self) -> f64 {
        match self {
            PiConvention::Dual => PI_LONG,
            PiConvention::Single(pi) => pi,
        }
    }

    fn for_points(self) -> f64 {
        match self {
            PiConvention::Dual => PI_SHORT,
            PiConvention::Single(pi) => pi,
        }
    }
}

// longitude is x, latitude is y
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GeoPoint({}, {})", self.longitude, self.latitude)
    }
}

/// Bound to one reference frame. Holds no mutable state, so one instance can be shared by any
/// number of parsers and threads.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transformer {
    frame: ReferenceFrame,
    pi: PiConvention,
    reference_latitude: f64,
    local_scale: f64,
}

impl Transformer {
    pub fn new(frame: ReferenceFrame) -> Result<Self> {
        Self::with_pi(frame, PiConvention::Dual)
    }

    pub fn with_pi(frame: ReferenceFrame, pi: PiConvention) -> Result<Self> {
        for (name, value) in [
            ("x_refmap", frame.x_refmap),
            ("y_refmap", frame.y_refmap),
            ("x_refnet", frame.x_refnet),
            ("y_refnet", frame.y_refnet),
        ] {
            if !value.is_finite() {
                return Err(Error::InvalidReferenceFrame(format!("{name} is {value}")));
            }
        }

        let pi_ref = pi.for_reference();
        let reference_latitude = inverse_mercator_latitude(frame.y_refmap, pi_ref);
        if !reference_latitude.is_finite() || reference_latitude.abs() >= 90.0 {
            return Err(Error::InvalidReferenceFrame(format!(
                "y_refmap {} implies latitude {}",
                frame.y_refmap, reference_latitude
            )));
        }
        let local_scale = 1.0 / (reference_latitude * pi_ref / 180.0).cos();
        if !local_scale.is_finite() {
            return Err(Error::InvalidReferenceFrame(format!(
                "no local scale at latitude {reference_latitude}"
            )));
        }

        Ok(Self {
            frame,
            pi,
            reference_latitude,
            local_scale,
        })
    }

    pub fn frame(&self) -> &ReferenceFrame {
        &self.frame
    }

    /// In degrees
    pub fn reference_latitude(&self) -> f64 {
        self.reference_latitude
    }

    pub fn local_scale(&self) -> f64 {
        self.local_scale
    }

    /// Pathological input can produce infinite or NaN results; see `checked_transform`.
    pub fn transform(&self, x: f64, y: f64) -> GeoPoint {
        let mercator_x = (x - self.frame.x_refnet) * self.local_scale + self.frame.x_refmap;
        let mercator_y = (y - self.frame.y_refnet) * self.local_scale + self.frame.y_refmap;

        let pi = self.pi.for_points();
        GeoPoint {
            longitude: MERCATOR_CORRECTION * mercator_x / (pi * EARTH_RADIUS / 180.0),
            latitude: inverse_mercator_latitude(mercator_y, pi),
        }
    }

    /// None if the result isn't a finite coordinate
    pub fn checked_transform(&self, x: f64, y: f64) -> Option<GeoPoint> {
        Some(self.transform(x, y)).filter(|pt| pt.is_finite())
    }
}

/// In degrees
fn inverse_mercator_latitude(mercator_y: f64, pi: f64) -> f64 {
    (2.0 * (MERCATOR_CORRECTION * mercator_y / EARTH_RADIUS).exp().atan() - pi / 2.0)
        / (pi / 180.0)
}
