use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use glam::{Mat4, Vec3};

use crate::hmd::Eye;
use crate::platform::TextureHandle;

use super::convert::{hmd34_from_mat4, mat4_from_hmd34, mat4_from_hmd44};
use super::{VrError, VrRuntime, VrSystemInfo};

type Hmd34 = [[f32; 4]; 3];

/// Average adult interpupillary distance, metres.
pub const DEFAULT_IPD: f32 = 0.064;

/// Calls observed by a [`SimulatedRuntime`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatedRecord {
    pub inits: usize,
    pub poses_served: usize,
    pub submissions: Vec<(Eye, TextureHandle)>,
    pub shutdowns: usize,
}

/// Headset stand-in for development without hardware.
///
/// Symmetric perspective per eye, eye offsets of ±IPD/2 on X, and head poses
/// taken from a script (or a slow idle sway once the script runs out).
/// Matrices are produced in the row-major layouts a real runtime hands out
/// and go through [`super::convert`] like theirs would.
#[derive(Debug)]
pub struct SimulatedRuntime {
    ipd: f32,
    fov_y: f32,
    target_size: (u32, u32),
    poses: VecDeque<Result<Hmd34, VrError>>,
    init_error: Option<VrError>,
    query_error: Option<Eye>,
    submit_error: Option<Eye>,
    record: Rc<RefCell<SimulatedRecord>>,
}

impl SimulatedRuntime {
    pub fn new() -> Self {
        Self {
            ipd: DEFAULT_IPD,
            fov_y: 100f32.to_radians(),
            target_size: (1440, 1600),
            poses: VecDeque::new(),
            init_error: None,
            query_error: None,
            submit_error: None,
            record: Rc::new(RefCell::new(SimulatedRecord::default())),
        }
    }

    pub fn with_ipd(mut self, ipd: f32) -> Self {
        self.ipd = ipd;
        self
    }

    pub fn with_target_size(mut self, width: u32, height: u32) -> Self {
        self.target_size = (width, height);
        self
    }

    /// Makes `init` fail with `error`.
    pub fn failing_init(mut self, error: VrError) -> Self {
        self.init_error = Some(error);
        self
    }

    /// Makes the projection query for `eye` fail.
    pub fn failing_projection(mut self, eye: Eye) -> Self {
        self.query_error = Some(eye);
        self
    }

    /// Makes every submission for `eye` fail.
    pub fn failing_submit(mut self, eye: Eye) -> Self {
        self.submit_error = Some(eye);
        self
    }

    /// Queues the results of upcoming `head_pose` calls.
    pub fn script_poses(mut self, poses: impl IntoIterator<Item = Result<Mat4, VrError>>) -> Self {
        self.poses
            .extend(poses.into_iter().map(|p| p.map(hmd34_from_mat4)));
        self
    }

    /// Shared view of the calls this runtime has seen.
    pub fn record(&self) -> Rc<RefCell<SimulatedRecord>> {
        Rc::clone(&self.record)
    }

    fn idle_pose(frame: usize) -> Mat4 {
        let yaw = (frame as f32 * 0.02).sin() * 0.15;
        Mat4::from_rotation_y(yaw) * Mat4::from_translation(Vec3::new(0.0, -1.7, 0.0))
    }
}

impl Default for SimulatedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl VrRuntime for SimulatedRuntime {
    fn init(&mut self) -> Result<VrSystemInfo, VrError> {
        self.record.borrow_mut().inits += 1;

        if let Some(e) = self.init_error.clone() {
            return Err(e);
        }

        Ok(VrSystemInfo {
            runtime_name: "simulated".to_string(),
            recommended_target_size: Some(self.target_size),
        })
    }

    fn projection(&mut self, eye: Eye, near: f32, far: f32) -> Result<Mat4, VrError> {
        if self.query_error == Some(eye) {
            return Err(VrError::Query {
                what: "projection",
                eye,
                reason: "no display".to_string(),
            });
        }

        let (w, h) = self.target_size;
        let aspect = w as f32 / h.max(1) as f32;
        let f = 1.0 / (self.fov_y * 0.5).tan();
        let r = far / (near - far);
        Ok(mat4_from_hmd44(&[
            [f / aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, r, r * near],
            [0.0, 0.0, -1.0, 0.0],
        ]))
    }

    fn eye_to_head(&mut self, eye: Eye) -> Result<Mat4, VrError> {
        let half = self.ipd * 0.5;
        let x = match eye {
            Eye::Left => -half,
            Eye::Right => half,
        };
        Ok(mat4_from_hmd34(&[
            [1.0, 0.0, 0.0, x],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ]))
    }

    fn head_pose(&mut self) -> Result<Mat4, VrError> {
        let mut record = self.record.borrow_mut();
        let frame = record.poses_served;
        record.poses_served += 1;

        match self.poses.pop_front() {
            Some(pose) => pose.map(|m| mat4_from_hmd34(&m)),
            None => Ok(Self::idle_pose(frame)),
        }
    }

    fn submit(&mut self, eye: Eye, texture: TextureHandle) -> Result<(), VrError> {
        if self.submit_error == Some(eye) {
            return Err(VrError::Submit {
                eye,
                reason: "texture rejected".to_string(),
            });
        }

        self.record.borrow_mut().submissions.push((eye, texture));
        Ok(())
    }

    fn shutdown(&mut self) {
        self.record.borrow_mut().shutdowns += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_offsets_are_half_ipd_apart() {
        let mut rt = SimulatedRuntime::new().with_ipd(0.06);
        let l = rt.eye_to_head(Eye::Left).unwrap().w_axis.x;
        let r = rt.eye_to_head(Eye::Right).unwrap().w_axis.x;
        assert!((r - l - 0.06).abs() < 1e-6);
    }

    #[test]
    fn projection_matches_glam_perspective() {
        let mut rt = SimulatedRuntime::new().with_target_size(1600, 900);
        let p = rt.projection(Eye::Left, 0.1, 100.0).unwrap();
        let expected = Mat4::perspective_rh(100f32.to_radians(), 1600.0 / 900.0, 0.1, 100.0);
        assert!(p.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn failing_projection_reports_a_query_error() {
        let mut rt = SimulatedRuntime::new().failing_projection(Eye::Right);
        assert!(rt.projection(Eye::Left, 0.1, 100.0).is_ok());
        assert!(matches!(
            rt.projection(Eye::Right, 0.1, 100.0),
            Err(VrError::Query { what: "projection", eye: Eye::Right, .. })
        ));
    }

    #[test]
    fn scripted_rotated_pose_survives_the_native_layout() {
        let pose = Mat4::from_rotation_y(0.5) * Mat4::from_translation(Vec3::new(0.1, 1.6, -0.2));
        let mut rt = SimulatedRuntime::new().script_poses([Ok(pose)]);
        assert!(rt.head_pose().unwrap().abs_diff_eq(pose, 1e-6));
    }

    #[test]
    fn scripted_poses_come_first() {
        let pose = Mat4::from_translation(Vec3::Z);
        let mut rt = SimulatedRuntime::new()
            .script_poses([Ok(pose), Err(VrError::Pose("lost tracking".into()))]);

        assert_eq!(rt.head_pose().unwrap(), pose);
        assert!(rt.head_pose().is_err());
        assert!(rt.head_pose().is_ok());
        assert_eq!(rt.record().borrow().poses_served, 3);
    }

    #[test]
    fn failing_submit_records_nothing_for_that_eye() {
        let mut rt = SimulatedRuntime::new().failing_submit(Eye::Left);
        assert!(rt.submit(Eye::Left, TextureHandle(1)).is_err());
        rt.submit(Eye::Right, TextureHandle(2)).unwrap();
        assert_eq!(
            rt.record().borrow().submissions,
            vec![(Eye::Right, TextureHandle(2))]
        );
    }
}
