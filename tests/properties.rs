//! Property-based tests for the track registry and the alert gate.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use dashtrack::config::{AlertConfig, MotionConfig, TrackingConfig};
use dashtrack::{
    AlertGate, BoundingBox, FrameSample, MotionBackend, RecognizedObject, TrackId, TrackRegistry,
};
use proptest::prelude::*;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

fn frame() -> FrameSample {
    let stride = WIDTH as usize * 3;
    FrameSample::from_rgb(
        vec![0u8; stride * HEIGHT as usize],
        WIDTH,
        HEIGHT,
        stride,
        Instant::now(),
    )
}

/// A detection somewhere inside the frame; sides may fall below the minimum.
fn arb_detection() -> impl Strategy<Value = RecognizedObject> {
    (0.0..300.0f32, 0.0..220.0f32, 0.0..60.0f32, 0.0..60.0f32).prop_map(|(x, y, w, h)| {
        RecognizedObject::new("car", "Car", 0.8, BoundingBox::new(x, y, x + w, y + h))
    })
}

fn registry() -> TrackRegistry<MotionBackend> {
    let mut registry = TrackRegistry::new(
        MotionBackend::new(MotionConfig::default()),
        TrackingConfig::default(),
    );
    registry.init().unwrap();
    registry
}

fn ids(objects: &[RecognizedObject]) -> Vec<TrackId> {
    objects.iter().map(|o| o.track_id.unwrap()).collect()
}

proptest! {
    #[test]
    fn test_seeding_skips_small_boxes(detections in prop::collection::vec(arb_detection(), 0..12)) {
        let min_side = TrackingConfig::default().min_box_side;
        let eligible = detections
            .iter()
            .filter(|d| d.location.to_rect().has_min_side(min_side))
            .count();

        let mut registry = registry();
        let tracked = registry.seed_from(&frame(), detections).unwrap();

        prop_assert_eq!(tracked.len(), eligible);
        for object in tracked {
            prop_assert!(object.location.to_rect().has_min_side(min_side));
        }
    }

    #[test]
    fn test_advance_never_adds_tracks(
        detections in prop::collection::vec(arb_detection(), 0..12),
        steps in 1usize..40,
    ) {
        let mut registry = registry();
        let seeded = ids(registry.seed_from(&frame(), detections).unwrap());
        let unique: HashSet<TrackId> = seeded.iter().copied().collect();
        prop_assert_eq!(unique.len(), seeded.len());

        let mut previous: HashSet<TrackId> = unique;
        for _ in 0..steps {
            let current = ids(registry.advance(&frame(), 20.0).unwrap());
            let set: HashSet<TrackId> = current.iter().copied().collect();
            prop_assert_eq!(set.len(), current.len());
            prop_assert!(set.is_subset(&previous));
            previous = set;
        }
    }

    #[test]
    fn test_alerts_respect_cooldown(
        steps in prop::collection::vec((0u64..400, 0.0..30.0f64, any::<bool>()), 1..60),
    ) {
        let config = AlertConfig::default();
        let (min_speed, cooldown) = (config.min_speed, config.cooldown());
        let mut gate = AlertGate::new(config);
        let mut now = Instant::now();
        let mut last_fire: Option<Instant> = None;

        for (dt_ms, speed, danger) in steps {
            now += Duration::from_millis(dt_ms);
            gate.observe_danger(danger);
            if gate.evaluate_at(speed, now) {
                prop_assert!(danger && speed > min_speed);
                if let Some(last) = last_fire {
                    prop_assert!(now.duration_since(last) >= cooldown);
                }
                last_fire = Some(now);
            }
        }
    }
}
