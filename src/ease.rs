//! Scalar easing helpers shared by the drive and audio layers.

/// Step `current` toward `target` by at most `max_delta`, never overshooting.
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(delta)
    }
}

/// Linear interpolation with `t` clamped to [0, 1].
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Position of `v` between `a` and `b`, clamped to [0, 1]. A degenerate range
/// yields 0.
pub fn inverse_lerp(a: f32, b: f32, v: f32) -> f32 {
    if a == b {
        0.0
    } else {
        ((v - a) / (b - a)).clamp(0.0, 1.0)
    }
}

/// Exponential approach: covers `rate * dt` of the remaining gap per call.
pub fn approach(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    lerp(current, target, rate * dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_towards_never_overshoots() {
        assert_eq!(move_towards(0.0, 1.0, 0.3), 0.3);
        assert_eq!(move_towards(0.9, 1.0, 0.3), 1.0);
        assert_eq!(move_towards(0.0, -1.0, 0.25), -0.25);
        assert_eq!(move_towards(0.5, 0.5, 0.1), 0.5);
    }

    #[test]
    fn lerp_clamps() {
        assert_eq!(lerp(1.0, 0.5, 2.0), 0.5);
        assert_eq!(lerp(1.0, 0.5, -1.0), 1.0);
        assert_eq!(inverse_lerp(10.0, 150.0, 5.0), 0.0);
        assert_eq!(inverse_lerp(10.0, 150.0, 80.0), 0.5);
        assert_eq!(inverse_lerp(3.0, 3.0, 3.0), 0.0);
    }

    #[test]
    fn approach_converges() {
        let mut v = 0.0;
        for _ in 0..200 {
            v = approach(v, 1.0, 10.0, 1.0 / 60.0);
        }
        assert!((v - 1.0).abs() < 1e-4);
    }
}
