//! Placement transform calculator
//!
//! Positions are in board units with the board centre at the scene origin.
//! Rotations are XYZ Euler angles in degrees, applied X first, then Y, then Z.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::entities::{PlacementRecord, Side};

/// Rigid transform: translation plus XYZ Euler rotation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f64; 3],
    pub rotation: [f64; 3],
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: [0.0; 3],
        rotation: [0.0; 3],
    };

    pub fn new(position: [f64; 3], rotation: [f64; 3]) -> Self {
        Self { position, rotation }
    }

    pub fn is_identity(&self) -> bool {
        self.position == [0.0; 3] && self.rotation == [0.0; 3]
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        let [rx, ry, rz] = self.rotation.map(f64::to_radians);
        let [x, y, z] = self.position;
        Isometry3::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::from_euler_angles(rx, ry, rz),
        )
    }

    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        let (rx, ry, rz) = iso.rotation.euler_angles();
        let t: Vector3<f64> = iso.translation.vector;
        Self {
            position: [t.x, t.y, t.z],
            rotation: [rx.to_degrees(), ry.to_degrees(), rz.to_degrees()],
        }
    }

    /// Absolute transform of a child placed at `relative` inside `self`.
    ///
    /// A zero relative transform returns the parent unchanged, bit for bit.
    pub fn compose(&self, relative: &Transform) -> Transform {
        if relative.is_identity() {
            return *self;
        }
        Self::from_isometry(&(self.to_isometry() * relative.to_isometry()))
    }
}

/// Physical board dimensions used to place components on its surfaces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardGeometry {
    pub width: f64,
    pub height: f64,
    pub thickness: f64,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            thickness: 1.6,
        }
    }
}

impl BoardGeometry {
    /// Z of the surface a component on `side` sits on
    pub fn surface_z(&self, side: Side) -> f64 {
        match side {
            Side::Top => self.thickness,
            Side::Bottom => 0.0,
        }
    }

    /// Offset moving board coordinates so the board centre is the origin
    pub fn origin_offset(&self) -> [f64; 2] {
        [-self.width / 2.0, -self.height / 2.0]
    }
}

/// Absolute transform of a top-level component.
///
/// Top: `(x, y, thickness)`, rotation `(0, 0, rot)`. Bottom: X mirrored,
/// `(-x, y, 0)`, rotation `(180, 0, rot)`. Both are then shifted by the
/// board origin offset.
pub fn placement_transform(record: &PlacementRecord, board: &BoardGeometry) -> Transform {
    let [ox, oy] = board.origin_offset();
    let z = board.surface_z(record.side);

    match record.side {
        Side::Top => Transform::new(
            [record.x + ox, record.y + oy, z],
            [0.0, 0.0, record.rotation],
        ),
        Side::Bottom => Transform::new(
            [-record.x + ox, record.y + oy, z],
            [180.0, 0.0, record.rotation],
        ),
    }
}
