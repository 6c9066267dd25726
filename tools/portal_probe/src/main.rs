use std::env;
use std::fs;
use std::path::Path;

use glam::{Quat, Vec2, Vec3};
use serde::Deserialize;
use tracing::info;

use riftgate_core::{
    Perspective, PortalConfig, PortalEvent, PortalSystem, Pose, Ray, RenderCamera, SlotId, Surface,
    TravellerId,
};

const TRIGGER_RADIUS: f32 = 1.0;

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    config: PortalConfig,
    surfaces: Vec<SurfaceSpec>,
    #[serde(default)]
    shots: Vec<ShotSpec>,
    traveller: Option<TravellerSpec>,
    camera: Option<CameraSpec>,
    #[serde(default)]
    run: RunSpec,
}

#[derive(Debug, Deserialize)]
struct SurfaceSpec {
    center: Vec3,
    normal: Vec3,
    u_axis: Vec3,
    half_extents: Vec2,
}

#[derive(Debug, Deserialize)]
struct ShotSpec {
    slot: String,
    origin: Vec3,
    direction: Vec3,
    view_right: Vec3,
}

#[derive(Debug, Deserialize)]
struct TravellerSpec {
    start: Vec3,
    velocity: Vec3,
}

#[derive(Debug, Deserialize)]
struct CameraSpec {
    position: Vec3,
    forward: Vec3,
}

#[derive(Debug, Deserialize)]
struct RunSpec {
    ticks: u32,
    dt: f32,
}

impl Default for RunSpec {
    fn default() -> Self {
        Self {
            ticks: 120,
            dt: 1.0 / 60.0,
        }
    }
}

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("Usage: portal_probe <scenario.toml>");
        std::process::exit(2);
    };

    if let Err(err) = run(Path::new(&path)) {
        eprintln!("portal_probe error: {err}");
        std::process::exit(1);
    }
}

fn run(path: &Path) -> Result<(), String> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    let scenario: Scenario =
        toml::from_str(&text).map_err(|err| format!("failed to parse {}: {err}", path.display()))?;

    let mut system = PortalSystem::new(scenario.config.clone());
    for spec in &scenario.surfaces {
        system.add_surface(Surface::new(
            spec.center,
            spec.normal,
            spec.u_axis,
            spec.half_extents,
        ));
    }

    for shot in &scenario.shots {
        let slot = parse_slot(&shot.slot)?;
        let ray = Ray {
            origin: shot.origin,
            direction: shot.direction,
        };
        let placed = system.place_or_update_portal(slot, &ray, shot.view_right);
        if !placed {
            info!("shot for portal {slot:?} found no valid placement");
        }
    }

    if let Some(spec) = &scenario.traveller {
        simulate_traveller(&mut system, spec, &scenario.run);
    }

    if let Some(spec) = &scenario.camera {
        report_render_passes(&system, spec);
    }

    Ok(())
}

fn parse_slot(name: &str) -> Result<SlotId, String> {
    match name {
        "A" | "a" => Ok(SlotId::A),
        "B" | "b" => Ok(SlotId::B),
        other => Err(format!("unknown portal slot '{other}' (expected A or B)")),
    }
}

fn simulate_traveller(system: &mut PortalSystem, spec: &TravellerSpec, run: &RunSpec) {
    let id = TravellerId(1);
    let mut position = spec.start;
    let mut velocity = spec.velocity;
    let mut inside = [false; 2];

    system.update_traveller(id, Pose::new(position, Quat::IDENTITY), velocity, Vec3::ZERO);

    for tick in 0..run.ticks {
        position += velocity * run.dt;
        system.update_traveller(id, Pose::new(position, Quat::IDENTITY), velocity, Vec3::ZERO);
        sync_trigger_volumes(system, id, position, &mut inside);

        for event in system.tick_travellers(run.dt) {
            info!("tick {tick}: {event:?}");
            if let PortalEvent::Teleported { .. } = event {
                // Adopt the post-teleport state the system wrote back.
                if let Some(traveller) = system.traveller(id) {
                    position = traveller.pose.position;
                    velocity = traveller.velocity;
                }
                inside = [false; 2];
            }
        }
    }

    info!(
        "traveller finished at {position} with velocity {velocity} after {} ticks",
        run.ticks
    );
}

fn sync_trigger_volumes(
    system: &mut PortalSystem,
    id: TravellerId,
    position: Vec3,
    inside: &mut [bool; 2],
) {
    for slot in [SlotId::A, SlotId::B] {
        let near = system
            .portal_state(slot)
            .is_some_and(|placement| placement.position.distance(position) <= TRIGGER_RADIUS);
        if near && !inside[slot.index()] {
            system.notify_traveller_entered_volume(id, slot);
            inside[slot.index()] = true;
        } else if !near && inside[slot.index()] {
            system.notify_traveller_exited_volume(id, slot);
            inside[slot.index()] = false;
        }
    }
}

fn report_render_passes(system: &PortalSystem, spec: &CameraSpec) {
    let camera = RenderCamera {
        pose: Pose::look_to(spec.position, spec.forward, Vec3::Y),
        lens: Perspective::default(),
    };

    let passes = system.render_portals(&camera);
    info!("{} portal view passes this frame", passes.len());
    for pass in &passes {
        info!(
            "  portal {:?} level {} camera at {}",
            pass.slot, pass.level, pass.camera.position
        );
    }
}
