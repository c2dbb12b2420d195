use glam::Mat4;

/// Stereo eye selector.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    /// Render and submit order.
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];
}

/// Per-eye projection, eye-to-head and view matrices.
///
/// `eye_*` transforms are fixed once VR is initialized. `view_*` are
/// recomputed every frame from the head pose. The active pair returned by
/// [`projection`](Self::projection) and [`view`](Self::view) follows
/// `current_eye`; switching eyes never touches stored matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct HmdCamera {
    current_eye: Eye,

    pub projection_left: Mat4,
    pub projection_right: Mat4,
    pub eye_left: Mat4,
    pub eye_right: Mat4,
    pub view_left: Mat4,
    pub view_right: Mat4,
}

impl HmdCamera {
    pub fn new() -> Self {
        Self {
            current_eye: Eye::Left,
            projection_left: Mat4::IDENTITY,
            projection_right: Mat4::IDENTITY,
            eye_left: Mat4::IDENTITY,
            eye_right: Mat4::IDENTITY,
            view_left: Mat4::IDENTITY,
            view_right: Mat4::IDENTITY,
        }
    }

    pub fn current_eye(&self) -> Eye {
        self.current_eye
    }

    pub fn set_current_eye(&mut self, eye: Eye) {
        self.current_eye = eye;
    }

    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.projection_for(self.current_eye)
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        self.view_for(self.current_eye)
    }

    pub fn projection_for(&self, eye: Eye) -> Mat4 {
        match eye {
            Eye::Left => self.projection_left,
            Eye::Right => self.projection_right,
        }
    }

    pub fn eye_for(&self, eye: Eye) -> Mat4 {
        match eye {
            Eye::Left => self.eye_left,
            Eye::Right => self.eye_right,
        }
    }

    pub fn view_for(&self, eye: Eye) -> Mat4 {
        match eye {
            Eye::Left => self.view_left,
            Eye::Right => self.view_right,
        }
    }

    pub fn set_projection(&mut self, eye: Eye, m: Mat4) {
        match eye {
            Eye::Left => self.projection_left = m,
            Eye::Right => self.projection_right = m,
        }
    }

    pub fn set_eye(&mut self, eye: Eye, m: Mat4) {
        match eye {
            Eye::Left => self.eye_left = m,
            Eye::Right => self.eye_right = m,
        }
    }

    /// `view_eye = eye_eye * head_pose` for both eyes.
    pub fn update_views(&mut self, head_pose: Mat4) {
        self.view_left = self.eye_left * head_pose;
        self.view_right = self.eye_right * head_pose;
    }
}

impl Default for HmdCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn seeded() -> HmdCamera {
        let mut cam = HmdCamera::new();
        cam.projection_left = Mat4::from_scale(Vec3::splat(2.0));
        cam.projection_right = Mat4::from_scale(Vec3::splat(3.0));
        cam.view_left = Mat4::from_translation(Vec3::X);
        cam.view_right = Mat4::from_translation(Vec3::Y);
        cam
    }

    #[test]
    fn active_pair_follows_current_eye() {
        let mut cam = seeded();
        assert_eq!(cam.current_eye(), Eye::Left);
        assert_eq!(cam.projection(), cam.projection_left);
        assert_eq!(cam.view(), cam.view_left);

        cam.set_current_eye(Eye::Right);
        assert_eq!(cam.projection(), cam.projection_right);
        assert_eq!(cam.view(), cam.view_right);
    }

    #[test]
    fn switching_eyes_leaves_matrices_untouched() {
        let mut cam = seeded();
        let before = cam.clone();

        cam.set_current_eye(Eye::Right);
        cam.set_current_eye(Eye::Left);

        assert_eq!(cam, before);
    }

    #[test]
    fn views_compose_eye_with_head_pose() {
        let mut cam = HmdCamera::new();
        cam.set_eye(Eye::Left, Mat4::from_translation(Vec3::new(0.03, 0.0, 0.0)));
        cam.set_eye(Eye::Right, Mat4::from_translation(Vec3::new(-0.03, 0.0, 0.0)));

        let head = Mat4::from_translation(Vec3::new(0.0, 1.7, 0.0));
        cam.update_views(head);

        assert_eq!(cam.view_for(Eye::Left), cam.eye_left * head);
        assert_eq!(cam.view_for(Eye::Right), cam.eye_right * head);
        assert_ne!(cam.view_left, cam.view_right);
    }
}
