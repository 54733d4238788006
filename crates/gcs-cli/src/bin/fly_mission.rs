//! Demo: arm the simulated vehicle, fly a two-waypoint mission, and
//! stream telemetry and signals until the mission completes.

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tokio::time::timeout;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gcs_core::models::{DroneConfig, FlightMode, Waypoint};
use gcs_core::DroneEvent;
use gcs_core::DroneService;
use gcs_sim::SimDroneService;

/// Fly a simulated two-waypoint mission and print what the vehicle reports
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Mission altitude in meters
    #[arg(long, default_value_t = 20.0)]
    altitude: f64,

    /// Horizontal speed limit in m/s
    #[arg(long, default_value_t = 15.0)]
    max_speed: f64,

    /// Altitude ceiling in meters
    #[arg(long, default_value_t = 120.0)]
    max_altitude: f64,

    /// Overall timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fly_mission=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let config = DroneConfig {
        max_speed: args.max_speed,
        max_altitude: args.max_altitude,
        ..DroneConfig::default()
    };
    let service = SimDroneService::new(config);
    let mut rx = service.subscribe();
    service.start();
    service.connect();

    // Legs offset from the vehicle's spawn point, roughly 120 m each.
    let home = gcs_core::Telemetry::default().coordinates;
    service.set_armed(true);
    service.set_waypoints(vec![
        Waypoint {
            id: "wp-0".to_string(),
            lat: home.lat + 0.0011,
            lng: home.lng,
            altitude: args.altitude,
            index: 0,
        },
        Waypoint {
            id: "wp-1".to_string(),
            lat: home.lat + 0.0011,
            lng: home.lng - 0.0011,
            altitude: args.altitude,
            index: 1,
        },
    ]);
    service.set_flight_mode(FlightMode::AutoMission);

    let run = async {
        let mut telemetry_count = 0u64;
        loop {
            match rx.recv().await {
                Ok(DroneEvent::Log(log)) => {
                    tracing::info!(level = ?log.level, "{}", log.message);
                    if log.message.contains("Mission complete") {
                        break;
                    }
                }
                Ok(DroneEvent::Status(status)) => {
                    tracing::info!("Link status: {status:?}");
                }
                Ok(DroneEvent::Telemetry(t)) => {
                    telemetry_count += 1;
                    // One line every ~2 seconds of sim time.
                    if telemetry_count % 40 == 0 {
                        tracing::info!(
                            "alt {:.1} m, home {:.0} m, speed {:.1} m/s, battery {:.1}%",
                            t.altitude,
                            t.distance_home,
                            t.speed_h,
                            t.battery
                        );
                    }
                }
                Ok(DroneEvent::Objects(_)) => {}
                Err(err) => anyhow::bail!("event stream ended: {err}"),
            }
        }
        Ok(())
    };

    let result = timeout(Duration::from_secs(args.timeout), run).await;
    service.set_armed(false);
    service.stop();

    match result {
        Ok(inner) => inner,
        Err(_) => anyhow::bail!("mission did not complete within {}s", args.timeout),
    }
}
