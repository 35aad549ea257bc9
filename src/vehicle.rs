// ==============================================================================
// vehicle.rs — ONE CONTROLLED CAR
// ------------------------------------------------------------------------------
// Glues the controller layers together over a WheelRig:
//
//   fixed_update (physics clock)
//     reference wheel hit → classify → traction (grip / drag / top speed)
//     → gear boundaries follow the effective top speed
//
//   update (frame clock)
//     raw input → DriverInput → drive/brake machine → wheel commands
//     → engine audio → effects + UI readout
//
// The traction parameters read by the drive layer are always the ones written
// by the last fixed_update.
// ==============================================================================

use tracing::debug;

use crate::audio::service::AudioService;
use crate::audio::{AudioInput, EngineAudio};
use crate::config::{AudioConfig, VehicleConfig};
use crate::drive::{DriveController, VehicleState};
use crate::input::{InputSampler, RawInput};
use crate::rig::WheelRig;
use crate::surface::{SurfaceSample, classify};
use crate::telemetry::{TelemetryFrame, TelemetrySink};
use crate::traction::{TractionModel, TractionParameters};
use crate::wheels::{WheelCommand, WheelPos};

#[derive(Debug)]
pub struct Vehicle {
    config: VehicleConfig,
    sampler: InputSampler,
    traction: TractionModel,
    drive: DriveController,
    audio: EngineAudio,
    telemetry: TelemetrySink,
    surface: SurfaceSample,
}

impl Vehicle {
    pub fn new(
        config: &VehicleConfig,
        audio_config: &AudioConfig,
        rig: &mut dyn WheelRig,
        audio: Option<&mut AudioService>,
    ) -> Self {
        let traction = TractionModel::capture(rig, config);
        let audio = EngineAudio::new(audio_config, traction.params().top_speed, audio);

        let mut telemetry = TelemetrySink::new(config);
        telemetry.refresh_effects(&VehicleState::default());

        Self {
            config: config.clone(),
            sampler: InputSampler::new(&config.touch),
            traction,
            drive: DriveController::new(config),
            audio,
            telemetry,
            surface: SurfaceSample::default(),
        }
    }

    pub fn fixed_update(&mut self, rig: &mut dyn WheelRig) -> TractionParameters {
        let hit = rig.wheels()[self.config.reference_wheel].ground.clone();
        let sample = classify(hit.as_ref(), &self.config.surfaces);
        if sample.class != self.surface.class {
            debug!(from = ?self.surface.class, to = ?sample.class, "surface");
        }
        self.surface = sample;

        let handbrake = self.drive.state().is_traction_locked;
        let params = self.traction.update(sample, handbrake, rig);
        self.audio.retarget(params.top_speed);
        params
    }

    pub fn update(&mut self, rig: &mut dyn WheelRig, raw: &RawInput, dt: f32) {
        let input = self.sampler.sample(raw);

        if self.drive.update(&input, self.traction.params(), rig, dt) {
            self.telemetry.refresh_effects(self.drive.state());
        }

        let state = *self.drive.state();
        self.audio.update(
            AudioInput {
                speed: state.speed,
                throttle_axis: state.throttle_axis,
                is_drifting: state.is_drifting,
                is_traction_locked: state.is_traction_locked,
            },
            dt,
        );
        self.telemetry.tick(&state, self.audio.gear(), dt);
    }

    /// Contact with another collider. Only track borders make a sound.
    pub fn on_contact(&self, tag: Option<&str>, point: [f32; 3], audio: Option<&mut AudioService>) {
        if tag == Some(self.config.surfaces.border_tag.as_str()) {
            self.audio.border_hit(point, audio);
        }
    }

    pub fn state(&self) -> &VehicleState {
        self.drive.state()
    }

    pub fn surface(&self) -> SurfaceSample {
        self.surface
    }

    pub fn audio(&self) -> &EngineAudio {
        &self.audio
    }

    pub fn commands(&self, rig: &dyn WheelRig) -> [(WheelPos, WheelCommand); 4] {
        rig.wheels().commands()
    }

    pub fn telemetry(&self) -> TelemetryFrame {
        self.telemetry
            .frame(self.drive.state(), self.surface.class, self.drive.mode())
    }
}
