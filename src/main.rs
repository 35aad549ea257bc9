mod audio;
mod config;
mod drive;
mod ease;
mod error;
mod gearbox;
mod input;
mod net;
mod physics;
mod rig;
mod schedule;
mod state;
mod surface;
mod suspension;
mod telemetry;
mod traction;
mod vehicle;
mod wheels;

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::net::start_websocket_server;
use crate::physics::PhysicsWorld;
use crate::state::SharedGameState;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("drivetrain_server=info")),
        )
        .init();

    let config = match ServerConfig::load_from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(
        bind = %config.bind_addr,
        physics_hz = config.physics_hz,
        frame_hz = config.frame_hz,
        "starting drivetrain server"
    );

    let physics = Arc::new(Mutex::new(PhysicsWorld::new(&config.vehicle.surfaces)));
    let addr = config.bind_addr.clone();
    let physics_dt = 1.0 / config.physics_hz;
    let frame_period = Duration::from_secs_f32(1.0 / config.frame_hz);
    let state = Arc::new(Mutex::new(SharedGameState::new(config)));

    tokio::spawn(start_websocket_server(
        addr,
        Arc::clone(&state),
        Arc::clone(&physics),
    ));

    // Fixed physics clock and a free frame clock, both on this thread.
    let mut physics_ticker = interval(Duration::from_secs_f32(physics_dt));
    physics_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut frame_ticker = interval(frame_period);
    frame_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_frame = Instant::now();

    loop {
        tokio::select! {
            _ = physics_ticker.tick() => {
                let mut phys = physics.lock().await;
                let mut game = state.lock().await;
                game.fixed_update(&mut phys, physics_dt);
            }
            _ = frame_ticker.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last_frame).as_secs_f32();
                last_frame = now;

                let mut phys = physics.lock().await;
                let mut game = state.lock().await;
                game.frame_update(&mut phys, dt);
                game.broadcast_snapshot(&mut phys);
            }
        }
    }
}
