//! 3MF transform attributes.
//!
//! 3MF writes `m00 m01 m02 m10 m11 m12 m20 m21 m22 m30 m31 m32` for a
//! matrix applied to row vectors, so the linear part is the transpose of
//! our row-major `[A | t]` and the translation comes last.

use crate::model::ModelInstance;
use crate::{CoordF, Error, Result};
use std::f64::consts::{FRAC_PI_2, PI};

/// Number of values in a 3MF transform attribute.
pub const TRANSFORM_SIZE: usize = 12;

/// Quaternion pole threshold for the Euler decomposition.
const POLE_THRESHOLD: CoordF = 0.499;

/// Parse a `transform` attribute; exactly twelve numbers are required.
pub fn parse_transform(value: &str) -> Result<[CoordF; TRANSFORM_SIZE]> {
    let values = value
        .split_whitespace()
        .map(|v| {
            v.parse::<CoordF>()
                .map_err(|_| Error::Tmf(format!("invalid transform value '{}'", v)))
        })
        .collect::<Result<Vec<_>>>()?;
    values.try_into().map_err(|v: Vec<CoordF>| {
        Error::Tmf(format!(
            "transform needs {} values, found {}",
            TRANSFORM_SIZE,
            v.len()
        ))
    })
}

pub fn format_transform(values: &[CoordF; TRANSFORM_SIZE]) -> String {
    values
        .iter()
        .map(|&v| if v == 0.0 { "0".to_string() } else { v.to_string() })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Row-major `[A | t]` to 3MF order.
pub fn to_tmf(m: &[CoordF; 12]) -> [CoordF; TRANSFORM_SIZE] {
    [
        m[0], m[4], m[8], m[1], m[5], m[9], m[2], m[6], m[10], m[3], m[7], m[11],
    ]
}

/// 3MF order to row-major `[A | t]`.
pub fn from_tmf(v: &[CoordF; TRANSFORM_SIZE]) -> [CoordF; 12] {
    [
        v[0], v[3], v[6], v[9], v[1], v[4], v[7], v[10], v[2], v[5], v[8], v[11],
    ]
}

/// Split a 3MF transform into translation, per-axis scale and rotation.
///
/// Scale is the norm of each row of the 3MF linear part; the remaining
/// rotation goes through a quaternion to angles about X, Y and Z. Near the
/// poles the X angle is fixed at zero.
pub fn decompose(v: &[CoordF; TRANSFORM_SIZE]) -> ModelInstance {
    let mut m = *v;
    let offset = [m[9], m[10], m[11]];

    let mut scale = [1.0; 3];
    for (row, s) in scale.iter_mut().enumerate() {
        let r = &mut m[row * 3..row * 3 + 3];
        let norm = (r[0] * r[0] + r[1] * r[1] + r[2] * r[2]).sqrt();
        *s = norm;
        if norm > 0.0 {
            r.iter_mut().for_each(|x| *x /= norm);
        }
    }

    let mut qw = (1.0 + m[0] + m[4] + m[8]).max(0.0).sqrt() / 2.0;
    let mut qx = (1.0 + m[0] - m[4] - m[8]).max(0.0).sqrt() / 2.0;
    let mut qy = (1.0 - m[0] + m[4] - m[8]).max(0.0).sqrt() / 2.0;
    let mut qz = (1.0 - m[0] - m[4] + m[8]).max(0.0).sqrt() / 2.0;
    if m[5] - m[7] <= 0.0 {
        qx = -qx;
    }
    if m[6] - m[2] <= 0.0 {
        qy = -qy;
    }
    if m[1] - m[3] <= 0.0 {
        qz = -qz;
    }
    let norm = (qw * qw + qx * qx + qy * qy + qz * qz).sqrt();
    if norm > 0.0 {
        qw /= norm;
        qx /= norm;
        qy /= norm;
        qz /= norm;
    }

    let test = qx * qy + qz * qw;
    let rotation = if test > POLE_THRESHOLD {
        [0.0, 2.0 * qx.atan2(qw), FRAC_PI_2]
    } else if test < -POLE_THRESHOLD {
        [0.0, -2.0 * qx.atan2(qw), -FRAC_PI_2]
    } else {
        let x = (2.0 * qx * qw - 2.0 * qy * qz).atan2(1.0 - 2.0 * qx * qx - 2.0 * qz * qz);
        let y = (2.0 * qy * qw - 2.0 * qx * qz).atan2(1.0 - 2.0 * qy * qy - 2.0 * qz * qz);
        let z = (2.0 * qx * qy + 2.0 * qz * qw).clamp(-1.0, 1.0).asin();
        [x, y, z].map(|a| if a < 0.0 { a + 2.0 * PI } else { a })
    };

    ModelInstance {
        offset,
        scaling_factor: scale,
        rotation,
    }
}
