use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Pinhole intrinsics plus the mounting of the camera on the vehicle body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub fx: f64,
    pub fy: f64,
    pub cu: f64,
    pub cv: f64,
    pub width: u32,
    pub height: u32,
    /// Yaw, pitch, roll of the camera relative to the body, degrees.
    #[serde(default)]
    pub mount_ypr_deg: [f64; 3],
}

impl Camera {
    pub fn k(&self) -> na::Matrix3<f64> {
        na::Matrix3::new(
            self.fx, 0.0, self.cu, //
            0.0, self.fy, self.cv, //
            0.0, 0.0, 1.0,
        )
    }

    pub fn inverse_k(&self) -> Result<na::Matrix3<f64>> {
        self.k().try_inverse().ok_or(Error::SingularIntrinsics)
    }

    /// Rotation taking camera axes (x right, y down, z forward) to body axes
    /// (x forward, y right, z down), including the mount angles.
    pub fn cam2body(&self) -> na::Matrix3<f64> {
        let base = na::Matrix3::new(
            0.0, 0.0, 1.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0,
        );
        ypr_to_rotation(self.mount_ypr_deg) * base
    }

    /// Pixel where the NED point `p` appears, `None` when it is behind the
    /// camera or outside the image.
    pub fn project_point(&self, pose: &CameraPose, p: &na::Vector3<f64>) -> Option<glam::DVec2> {
        let cam2ned = pose.body2ned() * self.cam2body();
        let pc = cam2ned.transpose() * (p - pose.position());
        if pc.z <= 0.0 {
            return None;
        }
        let uv = self.k() * (pc / pc.z);
        let inside = (0.0..self.width as f64).contains(&uv.x)
            && (0.0..self.height as f64).contains(&uv.y);
        inside.then(|| glam::DVec2::new(uv.x, uv.y))
    }
}

/// Position and attitude of the body in the local north-east-down frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub ned: [f64; 3],
    /// Yaw, pitch, roll, degrees.
    pub ypr_deg: [f64; 3],
}

impl CameraPose {
    pub fn new(ned: [f64; 3], ypr_deg: [f64; 3]) -> CameraPose {
        CameraPose { ned, ypr_deg }
    }

    pub fn position(&self) -> na::Vector3<f64> {
        na::Vector3::from(self.ned)
    }

    pub fn body2ned(&self) -> na::Matrix3<f64> {
        ypr_to_rotation(self.ypr_deg)
    }

    /// Height above the NED origin (positive up).
    pub fn altitude(&self) -> f64 {
        -self.ned[2]
    }
}

/// `Rz(yaw) * Ry(pitch) * Rx(roll)` from angles in degrees.
pub fn ypr_to_rotation(ypr_deg: [f64; 3]) -> na::Matrix3<f64> {
    let [yaw, pitch, roll] = ypr_deg.map(f64::to_radians);
    na::Rotation3::from_euler_angles(roll, pitch, yaw).into_inner()
}

/// Composes the matrix mapping a homogeneous pixel to a NED direction.
pub fn pixel_to_ned_matrix(
    inverse_k: &na::Matrix3<f64>,
    cam2body: &na::Matrix3<f64>,
    body2ned: &na::Matrix3<f64>,
) -> na::Matrix3<f64> {
    body2ned * cam2body * inverse_k
}

/// Unit ray in the navigation frame for pixel `uv`.
pub fn project_vector(pixel_to_ned: &na::Matrix3<f64>, uv: glam::DVec2) -> na::Vector3<f64> {
    (pixel_to_ned * na::Vector3::new(uv.x, uv.y, 1.0)).normalize()
}
