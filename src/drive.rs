// ==============================================================================
// drive.rs — DRIVE / BRAKE STATE MACHINE
// ------------------------------------------------------------------------------
// Per frame, in order:
//   1) run repeating tasks already scheduled (coast decay, traction recovery)
//   2) steering
//   3) longitudinal intent:
//        throttle >  0.1 → forward  (brake first while rolling backwards)
//        throttle < -0.1 → reverse  (brake first while rolling forwards)
//        released, handbrake up, not coasting → start coast decay
//        otherwise      → throttle off
//   4) handbrake held → lock; release edge → traction recovery
//
// Coast decay fires immediately, then every COAST_PERIOD, and cancels itself
// once the chassis is below COAST_STOP_SPEED. Recovery steps once on the
// release edge, then once per frame until the drift axis is back at zero.
// Anything that supersedes a task cancels it first.
// ==============================================================================

use serde::Serialize;
use tracing::debug;

use crate::config::VehicleConfig;
use crate::ease::{inverse_lerp, lerp, move_towards};
use crate::input::DriverInput;
use crate::rig::{LocalVelocity, WheelRig};
use crate::schedule::{TaskSlot, TaskToken};
use crate::traction::TractionParameters;
use crate::wheels::WheelPos;

const INTENT_THRESHOLD: f32 = 0.1;
const REVERSAL_VELOCITY: f32 = 1.0; // m/s
const DRIFT_LATERAL_VELOCITY: f32 = 2.5; // m/s

const THROTTLE_RISE_RATE: f32 = 3.0;
const THROTTLE_RELAX_RATE: f32 = 10.0;
const TORQUE_PER_MULTIPLIER: f32 = 50.0;

const COAST_PERIOD: f32 = 0.1;
const COAST_STOP_SPEED: f32 = 0.25; // m/s

const DRIFT_RISE_RATE: f32 = 1.0;
const DRIFT_RECOVER_RATE: f32 = 1.0 / 1.5;

const GAMEPAD_STEER_EXPONENT: f32 = 1.5;
const GAMEPAD_RATE_FACTOR: f32 = 0.5;
const DIGITAL_RATE_FACTOR: f32 = 2.0;
const STEER_GATE_SPEEDS: (f32, f32) = (10.0, 150.0); // km/h
const STEER_GATE_MIN: f32 = 0.5;

/// (speed above which the band applies, brake multiplier), km/h.
const BRAKE_BANDS: [(f32, f32); 5] = [(120.0, 0.8), (80.0, 1.0), (40.0, 1.2), (10.0, 1.5), (2.0, 2.0)];
const BRAKE_BAND_FLOOR: f32 = 3.0;

/// Chassis velocity scaling applied alongside brake torque, km/h.
const BRAKE_SCRUB: [(f32, f32); 3] = [(50.0, 0.995), (2.0, 0.99), (0.5, 0.96)];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VehicleState {
    pub speed: f32, // km/h, signed, front-left wheel
    #[serde(skip)]
    pub local_velocity: LocalVelocity,
    pub throttle_axis: f32,
    pub steering_axis: f32,
    pub drift_axis: f32,
    pub is_drifting: bool,
    pub is_traction_locked: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    #[default]
    Coasting,
    Forward,
    Reverse,
    BrakingToForward,
    BrakingToReverse,
    HandbrakeLocked,
}

#[derive(Debug, Clone, Copy)]
struct DriveTuning {
    acceleration_multiplier: f32,
    max_steering_angle: f32,
    steering_speed: f32,
    brake_force: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    fn sign(self) -> f32 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }
}

#[derive(Debug)]
pub struct DriveController {
    tuning: DriveTuning,
    state: VehicleState,
    mode: DriveMode,
    coast: TaskSlot,
    coast_task: Option<TaskToken>,
    coasting: bool,
    recovery: TaskSlot,
    recovery_task: Option<TaskToken>,
}

impl DriveController {
    pub fn new(config: &VehicleConfig) -> Self {
        Self {
            tuning: DriveTuning {
                acceleration_multiplier: config.acceleration_multiplier,
                max_steering_angle: config.max_steering_angle,
                steering_speed: config.steering_speed,
                brake_force: config.brake_force,
            },
            state: VehicleState::default(),
            mode: DriveMode::default(),
            coast: TaskSlot::new(),
            coast_task: None,
            coasting: false,
            recovery: TaskSlot::new(),
            recovery_task: None,
        }
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    pub fn is_coasting(&self) -> bool {
        self.coast.is_active()
    }

    /// Run one frame. Returns true when the drift flag was re-evaluated this
    /// frame, which is when cosmetic effects should refresh.
    pub fn update(
        &mut self,
        input: &DriverInput,
        params: TractionParameters,
        rig: &mut dyn WheelRig,
        dt: f32,
    ) -> bool {
        self.sense(rig);
        let mut drift_refreshed = self.run_tasks(params, rig, dt);

        self.apply_steering(input, rig, dt);

        let throttle = input.throttle;
        if throttle > INTENT_THRESHOLD {
            self.stop_coasting();
            self.drive(Direction::Forward, throttle, params, rig, dt);
            drift_refreshed = true;
        } else if throttle < -INTENT_THRESHOLD {
            self.stop_coasting();
            self.drive(Direction::Reverse, -throttle, params, rig, dt);
            drift_refreshed = true;
        } else if !input.handbrake_held && !self.coasting {
            self.start_coasting(params, rig, dt);
            drift_refreshed = true;
        } else {
            self.throttle_off(rig);
        }

        if input.handbrake_held {
            self.stop_coasting();
            self.handbrake(rig, dt);
            drift_refreshed = true;
        } else if input.handbrake_released {
            self.recover_traction(dt);
        }

        self.sense(rig);
        drift_refreshed
    }

    fn sense(&mut self, rig: &dyn WheelRig) {
        self.state.speed = rig.speed_kmh();
        self.state.local_velocity = rig.local_velocity();
    }

    fn set_mode(&mut self, mode: DriveMode) {
        if self.mode != mode {
            debug!(from = ?self.mode, to = ?mode, speed = self.state.speed, "drive mode");
            self.mode = mode;
        }
    }

    fn run_tasks(&mut self, params: TractionParameters, rig: &mut dyn WheelRig, dt: f32) -> bool {
        let mut refreshed = false;

        for _ in 0..self.coast.advance(dt) {
            if !self.coast.is_active() {
                break;
            }
            self.coast_step(params, rig, dt);
            refreshed = true;
        }

        for _ in 0..self.recovery.advance(dt) {
            if !self.recovery.is_active() {
                break;
            }
            self.recovery_step(dt);
        }

        refreshed
    }

    // ---- longitudinal ----

    fn drive(
        &mut self,
        dir: Direction,
        magnitude: f32,
        params: TractionParameters,
        rig: &mut dyn WheelRig,
        dt: f32,
    ) {
        self.update_drift_state(rig);

        let v = rig.local_velocity().longitudinal;
        let against_motion = match dir {
            Direction::Forward => v < -REVERSAL_VELOCITY,
            Direction::Reverse => v > REVERSAL_VELOCITY,
        };

        if against_motion {
            self.state.throttle_axis =
                move_towards(self.state.throttle_axis, 0.0, dt * THROTTLE_RELAX_RATE);
            self.brakes(rig);
            self.set_mode(match dir {
                Direction::Forward => DriveMode::BrakingToForward,
                Direction::Reverse => DriveMode::BrakingToReverse,
            });
        } else {
            rig.wheels_mut().set_brake_torque(0.0);
            // drive torque always carries the sign of the intent
            if self.state.throttle_axis * dir.sign() < 0.0 {
                self.state.throttle_axis = 0.0;
            }
            self.state.throttle_axis = move_towards(
                self.state.throttle_axis,
                dir.sign() * magnitude.min(1.0),
                dt * THROTTLE_RISE_RATE,
            );
            self.apply_drive(dir, params, rig);
            self.set_mode(match dir {
                Direction::Forward => DriveMode::Forward,
                Direction::Reverse => DriveMode::Reverse,
            });
        }
    }

    fn apply_drive(&mut self, dir: Direction, params: TractionParameters, rig: &mut dyn WheelRig) {
        let cap = match dir {
            Direction::Forward => params.top_speed,
            Direction::Reverse => params.reverse_top_speed,
        };
        let torque = if rig.speed_kmh().abs() < cap {
            self.tuning.acceleration_multiplier * TORQUE_PER_MULTIPLIER * self.state.throttle_axis
        } else {
            0.0
        };
        rig.wheels_mut().set_motor_torque(torque);
    }

    /// Speed-banded brake torque on all four wheels plus a small direct
    /// velocity scrub; near standstill the chassis is halted outright.
    pub fn brakes(&mut self, rig: &mut dyn WheelRig) {
        let speed = rig.speed_kmh().abs();
        let wheels = rig.wheels_mut();
        wheels.set_motor_torque(0.0);
        wheels.set_brake_torque(self.tuning.brake_force * brake_band(speed));

        match BRAKE_SCRUB.iter().find(|(above, _)| speed > *above) {
            Some(&(_, factor)) => rig.scale_velocity(factor),
            None => rig.halt(),
        }
    }

    pub fn throttle_off(&mut self, rig: &mut dyn WheelRig) {
        rig.wheels_mut().set_motor_torque(0.0);
    }

    fn start_coasting(&mut self, params: TractionParameters, rig: &mut dyn WheelRig, dt: f32) {
        self.coasting = true;
        self.coast_task = Some(self.coast.start(COAST_PERIOD, COAST_PERIOD));
        self.set_mode(DriveMode::Coasting);
        self.coast_step(params, rig, dt);
    }

    fn stop_coasting(&mut self) {
        self.coast.cancel();
        self.coast_task = None;
        self.coasting = false;
    }

    // The coasting flag stays set after the decay stops itself; a new decay
    // needs some other intent first.
    fn coast_step(&mut self, params: TractionParameters, rig: &mut dyn WheelRig, dt: f32) {
        self.update_drift_state(rig);
        self.state.throttle_axis =
            move_towards(self.state.throttle_axis, 0.0, dt * THROTTLE_RELAX_RATE);

        rig.scale_velocity(1.0 / (1.0 + params.coasting_drag));
        let wheels = rig.wheels_mut();
        wheels.set_motor_torque(0.0);
        wheels.set_brake_torque(0.0);

        if rig.linear_speed() < COAST_STOP_SPEED {
            rig.stop_linear();
            if let Some(token) = self.coast_task.take() {
                self.coast.cancel_token(token);
            }
            debug!("coast decay finished");
        }
    }

    // ---- handbrake ----

    fn handbrake(&mut self, rig: &mut dyn WheelRig, dt: f32) {
        self.recovery.cancel();
        self.recovery_task = None;
        self.state.drift_axis = move_towards(self.state.drift_axis, 1.0, dt * DRIFT_RISE_RATE);
        self.state.is_traction_locked = true;
        self.set_mode(DriveMode::HandbrakeLocked);
        self.update_drift_state(rig);
    }

    fn recover_traction(&mut self, dt: f32) {
        self.recovery.cancel();
        self.recovery_task = None;
        self.recovery_step(dt);
        if self.state.drift_axis > 0.0 {
            self.recovery_task = Some(self.recovery.start(0.0, 0.0));
        }
        if self.mode == DriveMode::HandbrakeLocked {
            self.set_mode(DriveMode::Coasting);
        }
    }

    fn recovery_step(&mut self, dt: f32) {
        self.state.is_traction_locked = false;
        self.state.drift_axis = move_towards(self.state.drift_axis, 0.0, dt * DRIFT_RECOVER_RATE);
        if self.state.drift_axis <= 0.0 {
            if let Some(token) = self.recovery_task.take() {
                self.recovery.cancel_token(token);
            }
        }
    }

    fn update_drift_state(&mut self, rig: &dyn WheelRig) {
        self.state.is_drifting = rig.local_velocity().lateral.abs() > DRIFT_LATERAL_VELOCITY;
    }

    // ---- steering ----

    fn apply_steering(&mut self, input: &DriverInput, rig: &mut dyn WheelRig, dt: f32) {
        let base = self.tuning.steering_speed;
        let (target, rate) = if input.source.is_analog() {
            let x = input.steer;
            let shaped = x.abs().powf(GAMEPAD_STEER_EXPONENT).copysign(x);
            let (lo, hi) = STEER_GATE_SPEEDS;
            let gate = lerp(1.0, STEER_GATE_MIN, inverse_lerp(lo, hi, self.state.speed.abs()));
            (shaped * gate, base * GAMEPAD_RATE_FACTOR)
        } else {
            (input.steer, base * DIGITAL_RATE_FACTOR)
        };

        self.state.steering_axis =
            move_towards(self.state.steering_axis, target, dt * 10.0 * rate).clamp(-1.0, 1.0);

        let angle = self.state.steering_axis * self.tuning.max_steering_angle;
        let wheels = rig.wheels_mut();
        for pos in WheelPos::FRONT {
            let w = &mut wheels[pos];
            w.steer_angle = lerp(w.steer_angle, angle, rate);
        }
    }
}

fn brake_band(speed: f32) -> f32 {
    BRAKE_BANDS
        .iter()
        .find(|(above, _)| speed > *above)
        .map_or(BRAKE_BAND_FLOOR, |&(_, mult)| mult)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gearbox::GearTable;
    use crate::input::SteeringSource;
    use crate::rig::fake::FakeRig;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn params(cfg: &VehicleConfig) -> TractionParameters {
        TractionParameters {
            grip: cfg.surfaces.asphalt_grip,
            coasting_drag: cfg.coasting_drag,
            top_speed: cfg.max_speed,
            reverse_top_speed: cfg.max_reverse_speed,
        }
    }

    fn throttle(t: f32) -> DriverInput {
        DriverInput {
            throttle: t,
            ..Default::default()
        }
    }

    fn handbrake() -> DriverInput {
        DriverInput {
            handbrake_held: true,
            ..Default::default()
        }
    }

    fn released() -> DriverInput {
        DriverInput {
            handbrake_released: true,
            ..Default::default()
        }
    }

    #[test]
    fn brake_bands() {
        assert_eq!(brake_band(200.0), 0.8);
        assert_eq!(brake_band(100.0), 1.0);
        assert_eq!(brake_band(60.0), 1.2);
        assert_eq!(brake_band(20.0), 1.5);
        assert_eq!(brake_band(5.0), 2.0);
        assert_eq!(brake_band(1.0), 3.0);
        assert_eq!(brake_band(120.0), 1.0);
    }

    #[test]
    fn reverse_while_rolling_forward_brakes_first() {
        let cfg = VehicleConfig::default();
        let mut drive = DriveController::new(&cfg);
        let mut rig = FakeRig::new().with_longitudinal(20.0); // 72 km/h
        drive.update(&throttle(-1.0), params(&cfg), &mut rig, DT);

        assert_eq!(drive.mode(), DriveMode::BrakingToReverse);
        for (_, w) in rig.wheels.iter() {
            assert_eq!(w.motor_torque, 0.0);
            assert_eq!(w.brake_torque, cfg.brake_force * 1.2);
        }
        assert!((rig.velocity.longitudinal - 20.0 * 0.995).abs() < 1e-4);
    }

    #[test]
    fn braking_near_standstill_halts() {
        let cfg = VehicleConfig::default();
        let mut drive = DriveController::new(&cfg);
        let mut rig = FakeRig::new();
        rig.velocity.longitudinal = -1.1; // rpm still at rest
        rig.angular = 0.7;
        drive.brakes(&mut rig);
        assert_eq!(rig.velocity.longitudinal, 0.0);
        assert_eq!(rig.angular, 0.0);
    }

    #[test]
    fn forward_from_rest_accelerates_monotonically() {
        let cfg = VehicleConfig::default();
        let mut drive = DriveController::new(&cfg);
        let gears = GearTable::new(6, cfg.max_speed).unwrap();
        let mut rig = FakeRig::new();

        let mut last_axis = 0.0;
        let mut last_speed = 0.0;
        let mut last_gear = 1;
        for _ in 0..600 {
            drive.update(&throttle(1.0), params(&cfg), &mut rig, DT);
            rig.step(DT);
            let s = drive.state();
            assert!(s.throttle_axis >= last_axis);
            let speed = rig.speed_kmh();
            assert!(speed > last_speed, "{speed} <= {last_speed}");
            let gear = gears.gear_for(speed);
            assert!(gear >= last_gear);
            last_axis = s.throttle_axis;
            last_speed = speed;
            last_gear = gear;
        }
        assert_eq!(last_axis, 1.0);
        assert!(last_gear > 1);
        assert_eq!(drive.mode(), DriveMode::Forward);
    }

    #[test]
    fn intent_flip_at_rest_never_drives_backwards() {
        let cfg = VehicleConfig::default();
        let mut drive = DriveController::new(&cfg);
        let mut rig = FakeRig::new();

        for _ in 0..30 {
            drive.update(&throttle(-1.0), params(&cfg), &mut rig, DT);
            rig.set_longitudinal(0.0);
        }
        assert!(drive.state().throttle_axis < -0.9);

        drive.update(&throttle(1.0), params(&cfg), &mut rig, DT);
        assert!(drive.state().throttle_axis > 0.0);
        for (_, w) in rig.wheels.iter() {
            assert!(w.motor_torque > 0.0, "{}", w.motor_torque);
        }

        for _ in 0..30 {
            drive.update(&throttle(1.0), params(&cfg), &mut rig, DT);
            rig.set_longitudinal(0.0);
        }
        drive.update(&throttle(-1.0), params(&cfg), &mut rig, DT);
        assert!(drive.state().throttle_axis < 0.0);
        for (_, w) in rig.wheels.iter() {
            assert!(w.motor_torque < 0.0, "{}", w.motor_torque);
        }
    }

    #[test]
    fn no_drive_torque_past_top_speed() {
        let cfg = VehicleConfig::default();
        let mut drive = DriveController::new(&cfg);
        let mut rig = FakeRig::new().with_longitudinal(cfg.max_speed / 3.6 + 1.0);
        drive.update(&throttle(1.0), params(&cfg), &mut rig, DT);
        for (_, w) in rig.wheels.iter() {
            assert_eq!(w.motor_torque, 0.0);
        }
    }

    #[test]
    fn coast_from_300_decays_without_brakes() {
        let cfg = VehicleConfig::default();
        let mut drive = DriveController::new(&cfg);
        let mut rig = FakeRig::new().with_longitudinal(300.0 / 3.6);
        let p = params(&cfg);

        drive.update(&throttle(0.0), p, &mut rig, DT);
        assert!(drive.is_coasting());
        assert!(rig.speed_kmh() < 300.0);

        let mut last = rig.speed_kmh();
        let mut decay_steps = 1;
        for _ in 0..180 {
            drive.update(&throttle(0.0), p, &mut rig, DT);
            rig.step(DT);
            for (_, w) in rig.wheels.iter() {
                assert_eq!(w.brake_torque, 0.0);
                assert_eq!(w.motor_torque, 0.0);
            }
            let speed = rig.speed_kmh();
            assert!(speed <= last);
            if speed < last {
                decay_steps += 1;
            }
            last = speed;
        }
        // ~3 s at one step per 0.1 s
        assert!(decay_steps >= 28, "{decay_steps}");
    }

    #[test]
    fn handbrake_two_seconds_then_release() {
        let cfg = VehicleConfig::default();
        let mut drive = DriveController::new(&cfg);
        let mut rig = FakeRig::new();
        let p = params(&cfg);

        let mut rise_frames = None;
        for frame in 1..=120 {
            drive.update(&handbrake(), p, &mut rig, DT);
            assert!(drive.state().is_traction_locked);
            if rise_frames.is_none() && drive.state().drift_axis >= 1.0 {
                rise_frames = Some(frame);
            }
        }
        let rise_frames = rise_frames.unwrap();
        assert_eq!(drive.state().drift_axis, 1.0);
        assert_eq!(drive.mode(), DriveMode::HandbrakeLocked);

        drive.update(&released(), p, &mut rig, DT);
        assert!(!drive.state().is_traction_locked);

        let mut fall_frames = 1;
        while drive.state().drift_axis > 0.0 {
            drive.update(&DriverInput::default(), p, &mut rig, DT);
            assert!(!drive.state().is_traction_locked);
            fall_frames += 1;
            assert!(fall_frames < 1000);
        }
        let ratio = fall_frames as f32 / rise_frames as f32;
        assert!((ratio - 1.5).abs() < 0.05, "{fall_frames} / {rise_frames}");
    }

    #[test]
    fn handbrake_cancels_coasting_and_recovery() {
        let cfg = VehicleConfig::default();
        let mut drive = DriveController::new(&cfg);
        let mut rig = FakeRig::new().with_longitudinal(30.0);
        let p = params(&cfg);

        drive.update(&DriverInput::default(), p, &mut rig, DT);
        assert!(drive.is_coasting());
        drive.update(&handbrake(), p, &mut rig, DT);
        assert!(!drive.is_coasting());

        drive.update(&released(), p, &mut rig, DT);
        drive.update(&handbrake(), p, &mut rig, DT);
        assert!(!drive.recovery.is_active());
        assert!(drive.state().is_traction_locked);
    }

    #[test]
    fn finished_tasks_release_their_tokens() {
        let cfg = VehicleConfig::default();
        let mut drive = DriveController::new(&cfg);
        let mut rig = FakeRig::new().with_longitudinal(0.2);
        let p = params(&cfg);

        drive.update(&DriverInput::default(), p, &mut rig, DT);
        assert!(!drive.is_coasting());
        assert!(drive.coast_task.is_none());
        assert_eq!(rig.velocity.longitudinal, 0.0);

        for _ in 0..30 {
            drive.update(&handbrake(), p, &mut rig, DT);
        }
        drive.update(&released(), p, &mut rig, DT);
        assert!(drive.recovery_task.is_some());
        assert!(drive.recovery.is_active());
        while drive.state().drift_axis > 0.0 {
            drive.update(&DriverInput::default(), p, &mut rig, DT);
        }
        assert!(drive.recovery_task.is_none());
        assert!(!drive.recovery.is_active());
    }

    #[test]
    fn drift_flag_tracks_lateral_velocity() {
        let cfg = VehicleConfig::default();
        let mut drive = DriveController::new(&cfg);
        let mut rig = FakeRig::new().with_longitudinal(10.0);
        rig.velocity.lateral = 3.0;
        assert!(drive.update(&throttle(1.0), params(&cfg), &mut rig, DT));
        assert!(drive.state().is_drifting);
        rig.velocity.lateral = 1.0;
        drive.update(&throttle(1.0), params(&cfg), &mut rig, DT);
        assert!(!drive.state().is_drifting);
    }

    #[test]
    fn keyboard_steering_is_faster_than_gamepad() {
        let cfg = VehicleConfig::default();
        let mut key = DriveController::new(&cfg);
        let mut pad = DriveController::new(&cfg);
        let mut rig_a = FakeRig::new();
        let mut rig_b = FakeRig::new();

        let k = DriverInput {
            steer: 1.0,
            source: SteeringSource::Keyboard,
            handbrake_held: true,
            ..Default::default()
        };
        let g = DriverInput {
            source: SteeringSource::Gamepad,
            ..k
        };
        key.update(&k, params(&cfg), &mut rig_a, DT);
        pad.update(&g, params(&cfg), &mut rig_b, DT);

        // keyboard: 10 * 0.5 * 2 = 10/s, gamepad: 10 * 0.5 * 0.5 = 2.5/s
        assert!((key.state().steering_axis - 10.0 * DT).abs() < 1e-5);
        assert!((pad.state().steering_axis - 2.5 * DT).abs() < 1e-5);
        let fl = rig_a.wheels[WheelPos::FrontLeft].steer_angle;
        assert_eq!(fl, rig_a.wheels[WheelPos::FrontRight].steer_angle);
        assert!(fl > 0.0);
        assert_eq!(rig_a.wheels[WheelPos::RearLeft].steer_angle, 0.0);
    }

    #[test]
    fn gamepad_steering_is_gated_at_speed() {
        let cfg = VehicleConfig::default();
        let mut drive = DriveController::new(&cfg);
        let mut rig = FakeRig::new().with_longitudinal(200.0 / 3.6);
        let input = DriverInput {
            steer: 1.0,
            source: SteeringSource::Gamepad,
            handbrake_held: true,
            ..Default::default()
        };
        for _ in 0..600 {
            drive.update(&input, params(&cfg), &mut rig, DT);
            rig.set_longitudinal(200.0 / 3.6);
        }
        assert!((drive.state().steering_axis - 0.5).abs() < 1e-4);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(256))]

        #[test]
        fn prop_forward_never_drives_while_rolling_back(
            v in -90.0f32..-1.01,
            t in 0.11f32..=1.0,
            prior in -400.0f32..400.0,
        ) {
            let cfg = VehicleConfig::default();
            let mut drive = DriveController::new(&cfg);
            let mut rig = FakeRig::new().with_longitudinal(v);
            rig.wheels.set_motor_torque(prior);
            drive.update(&throttle(t), params(&cfg), &mut rig, DT);
            for (_, w) in rig.wheels.iter() {
                prop_assert!(w.motor_torque <= 0.0);
            }
        }

        #[test]
        fn prop_coast_decay_reaches_zero(
            v in prop_oneof![-120.0f32..-0.3, 0.3f32..120.0],
            drag in 0.01f32..1.0,
        ) {
            let mut cfg = VehicleConfig::default();
            cfg.coasting_drag = drag;
            let mut drive = DriveController::new(&cfg);
            let mut rig = FakeRig::new().with_longitudinal(v);
            let p = params(&cfg);

            let mut steps = 0;
            while rig.velocity.longitudinal != 0.0 {
                drive.update(&DriverInput::default(), p, &mut rig, COAST_PERIOD);
                steps += 1;
                prop_assert!(steps <= 1000, "no stop after {} steps from {}", steps, v);
            }
            prop_assert!(!drive.is_coasting());
        }
    }
}
