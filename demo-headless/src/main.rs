use airflow_sim_core::{AirflowSimulation, FanId, OpeningId, ZoneId};
use clap::Parser;

/// Airflow simulation demo with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "airflow-sim-demo")]
#[command(about = "Multi-zone apartment airflow simulation demo", long_about = None)]
struct Args {
    /// Simulated duration in seconds
    #[arg(short, long, default_value_t = 30.0)]
    duration: f32,

    /// Ambient (outside) temperature in °C
    #[arg(short, long, default_value_t = 22.0)]
    ambient: f32,

    /// AC target temperature in °C
    #[arg(long, default_value_t = 16.0)]
    ac_temperature: f32,

    /// AC flow strength in %
    #[arg(long, default_value_t = 50.0)]
    ac_flow: f32,

    /// Disable the AC unit
    #[arg(long)]
    no_ac: bool,

    /// Enable the stair fan
    #[arg(long)]
    stair_fan: bool,

    /// Enable the bedroom fan
    #[arg(long)]
    bedroom_fan: bool,

    /// Fan flow strength in %
    #[arg(long, default_value_t = 50.0)]
    fan_flow: f32,

    /// Open the left window
    #[arg(long)]
    left_window: bool,

    /// Open the right window
    #[arg(long)]
    right_window: bool,

    /// Close the bedroom door
    #[arg(long)]
    close_door: bool,

    /// Window opening height in % of the full 1.5m sash
    #[arg(long, default_value_t = 100.0)]
    window_height: f32,

    /// Particle density target
    #[arg(long, default_value_t = 100)]
    density: u32,

    /// Flow speed multiplier applied to the frame time
    #[arg(long, default_value_t = 1.0)]
    flow_speed: f32,

    /// RNG seed
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Report interval in seconds
    #[arg(short, long, default_value_t = 1.0)]
    report_interval: f32,
}

fn main() {
    let args = Args::parse();

    println!("=== Airflow Simulation Demo ===\n");

    let mut sim = AirflowSimulation::with_seed(args.seed);
    sim.set_ambient_temperature(args.ambient);
    sim.set_ac_settings(args.ac_temperature, args.ac_flow);
    sim.set_ac_active(!args.no_ac);
    sim.set_particle_density(args.density);
    sim.set_flow_speed(args.flow_speed);

    if args.stair_fan {
        sim.set_fan_flow(FanId::StairFan, args.fan_flow);
        sim.set_fan_active(FanId::StairFan, true);
    }
    if args.bedroom_fan {
        sim.set_fan_flow(FanId::BedroomFan, args.fan_flow);
        sim.set_fan_active(FanId::BedroomFan, true);
    }
    sim.set_opening_state(OpeningId::LeftWindow, args.left_window);
    sim.set_opening_state(OpeningId::RightWindow, args.right_window);
    let sash = 1.5 * args.window_height / 100.0;
    sim.set_opening_height(OpeningId::LeftWindow, sash);
    sim.set_opening_height(OpeningId::RightWindow, sash);
    if args.close_door {
        sim.set_opening_state(OpeningId::BedroomDoor, false);
    }

    let apartment = sim.apartment();
    println!(
        "Apartment: {:.0}x{:.0}m, floor plane at {:.0}m",
        apartment.width, apartment.height, apartment.floor_height
    );
    println!(
        "Ambient: {:.1}°C, AC: {} ({:.1}°C at {:.0}%)",
        args.ambient,
        if args.no_ac { "off" } else { "on" },
        args.ac_temperature,
        args.ac_flow
    );
    println!(
        "Fans: stair {}, bedroom {} ({:.0}%)",
        if args.stair_fan { "on" } else { "off" },
        if args.bedroom_fan { "on" } else { "off" },
        args.fan_flow
    );
    println!(
        "Openings: door {}, left window {}, right window {}\n",
        if args.close_door { "closed" } else { "open" },
        if args.left_window { "open" } else { "closed" },
        if args.right_window { "open" } else { "closed" }
    );

    println!("Time(s) | Particles | Lower(°C) | Mezzanine(°C) | Bedroom(°C)");
    println!("--------|-----------|-----------|---------------|------------");

    let frame_dt = 1.0 / 60.0;
    let mut time = 0.0;
    let mut next_report = 0.0;

    while time < args.duration {
        sim.update(frame_dt * sim.flow_speed());
        time += frame_dt;

        if time >= next_report {
            println!(
                "{:7.1} | {:9} | {:9.2} | {:13.2} | {:11.2}",
                time,
                sim.particle_count(),
                sim.zone_average_temperature(ZoneId::LowerFloor),
                sim.zone_average_temperature(ZoneId::UpperMezzanine),
                sim.zone_average_temperature(ZoneId::UpperBedroom),
            );
            next_report += args.report_interval;
        }
    }

    println!("\n=== Simulation Complete ===");
    println!("Simulated time: {:.1}s ({} frames)", time, sim.frame_count());
    println!("Final particle count: {}", sim.particle_count());
    for id in ZoneId::ALL {
        println!(
            "Zone {:?}: smoothed {:.2}°C, particle mean {:.2}°C",
            id,
            sim.apartment().zone(id).temperature,
            sim.zone_average_temperature(id),
        );
    }
}
