//! Synthetic pen strokes.
//!
//! Stands in for the input-device layer when no real stylus is attached:
//! generates a hover-in, a pressure-varying wave stroke and a lift-off,
//! expressed in the device's pixel space.

use std::f32::consts::{FRAC_PI_4, PI, TAU};

use tablink_core::{DeviceDescriptor, StylusAction, StylusSample};

/// Points in the drawn part of the demo stroke.
pub const DEMO_POINTS: usize = 240;

/// Scale a point from unit space (0..1 on both axes) to device pixels.
pub fn to_device(device: &DeviceDescriptor, u: f32, v: f32) -> (f32, f32) {
    let x = u.clamp(0.0, 1.0) * device.width.max(1) as f32;
    let y = v.clamp(0.0, 1.0) * device.height.max(1) as f32;
    (x, y)
}

/// A full stroke: three hover samples, Down, `points` moves along a sine
/// wave across the middle of the surface, then Up.
pub fn demo_stroke(device: &DeviceDescriptor, points: usize) -> Vec<StylusSample> {
    let mut samples = Vec::with_capacity(points + 5);
    let point = |t: f32| {
        let u = 0.1 + 0.8 * t;
        let v = 0.5 + 0.25 * (t * TAU).sin();
        to_device(device, u, v)
    };

    let (x0, y0) = point(0.0);
    for lift in [30.0, 20.0, 10.0] {
        samples.push(StylusSample::new(StylusAction::Hover, x0, y0 - lift, 0.0));
    }
    samples.push(StylusSample::new(StylusAction::Down, x0, y0, 0.2));

    for i in 1..=points {
        let t = i as f32 / points.max(1) as f32;
        let (x, y) = point(t);
        // Pressure swells towards the middle of the stroke.
        let pressure = 0.2 + 0.7 * (t * PI).sin();
        samples.push(
            StylusSample::new(StylusAction::Move, x, y, pressure)
                .with_tilt(FRAC_PI_4 * (1.0 - t), t * PI),
        );
    }

    let (x1, y1) = point(1.0);
    samples.push(StylusSample::new(StylusAction::Up, x1, y1, 0.0));
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stroke_shape() {
        let device = DeviceDescriptor::new(2000, 1000, 60.0);
        let stroke = demo_stroke(&device, 50);

        assert_eq!(stroke.len(), 50 + 5);
        assert_eq!(stroke[0].action, StylusAction::Hover);
        assert_eq!(stroke[3].action, StylusAction::Down);
        assert_eq!(stroke.last().unwrap().action, StylusAction::Up);
        assert!(
            stroke[4..stroke.len() - 1]
                .iter()
                .all(|s| s.action == StylusAction::Move)
        );
    }

    #[test]
    fn stroke_stays_on_surface() {
        let device = DeviceDescriptor::new(800, 600, 60.0);
        for s in demo_stroke(&device, DEMO_POINTS) {
            assert!((0.0..=800.0).contains(&s.x));
            assert!((0.0..=600.0).contains(&s.y));
            assert!((0.0..=1.0).contains(&s.pressure));
        }
    }

    #[test]
    fn scaling() {
        let device = DeviceDescriptor::new(1920, 1080, 60.0);
        assert_eq!(to_device(&device, 0.5, 0.5), (960.0, 540.0));
        assert_eq!(to_device(&device, 2.0, -1.0), (1920.0, 0.0));
    }
}
