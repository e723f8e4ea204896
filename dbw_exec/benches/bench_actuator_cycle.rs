//! # Actuator Control Cycle Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use bus_if::eqpt::{
    ctrl::{ControlRequest, DesiredTrajectory, FeatureState, LongControlPhase},
    state::{
        AccDecelRequest, BusCounters, CruiseState, Drivetrain, GearState, VehicleStateSnapshot,
    },
};
use bus_if::vehicle::Platform;
use dbw_lib::actuator_ctrl::{ActuatorCtrl, InputData};
use util::module::State;

fn actuator_cycle_benchmark(c: &mut Criterion) {
    // ---- Build controller and a cruising scenario ----

    const TUNING: &str = r#"
        [long_control]
        max_accel_torq = 362.0
        vehicle_mass = 2326.0
        torq_start = 95.0
        hyst_gap = 0.06

        [auto_follow]
        speed_1_2_bars_mph = 15.0
        speed_2_3_bars_mph = 30.0
        speed_3_4_bars_mph = 65.0
    "#;

    let mut ctrl = ActuatorCtrl::from_tuning_str(TUNING).unwrap();

    let base_state = VehicleStateSnapshot {
        v_ego_ms: 24.0,
        a_ego_raw_ms2: 0.2,
        standstill: false,
        gas_pressed: false,
        brake_pressed: false,
        cruise: CruiseState {
            enabled: true,
            speed_ms: 27.0,
        },
        eps_torque: 12.0,
        steer_fault: false,
        torq_status: 2,
        lkas_active: true,
        lkas_heartbeat_echo: vec![0x00, 0x00, 0x00],
        gear: GearState::Drive,
        display_model_id: 0x64,
        platform: Platform::Minivan2020,
        drivetrain: Drivetrain::Combustion { engine_rpm: 1650.0 },
        acc_decel: AccDecelRequest::default(),
        counters: BusCounters::default(),
        button_events: Vec::new(),
    };

    let base_request = ControlRequest {
        enabled: true,
        trajectory: DesiredTrajectory {
            v_target_future_ms: 26.0,
            accel_ms2: 0.4,
            phase: LongControlPhase::Holding,
            steer: 0.2,
        },
        cancel: false,
        resume_speed_ms: 2.0,
        feature: FeatureState {
            lane_assist_only: false,
            auto_follow: true,
            acc_eco: 0,
            max_cruise_ms: 30.0,
            follow_distance: 2,
            hud_alert: 0,
            notify_ui: false,
        },
    };

    // Bench one full arbitration cycle. The native counters advance every
    // iteration so no arbiter takes its duplicate-frame shortcut.
    let mut cycle: u32 = 0;

    c.bench_function("ActuatorCtrl::proc", |b| {
        b.iter(|| {
            cycle = cycle.wrapping_add(1);

            let mut state = base_state.clone();
            state.counters = BusCounters {
                cycle,
                long_status: cycle,
                steer_frame: (cycle % 16) as u8,
                button: cycle,
            };

            let input = InputData {
                enabled: true,
                state: Some(state),
                request: Some(base_request.clone()),
            };

            ctrl.proc(&input).unwrap()
        })
    });
}

criterion_group!(benches, actuator_cycle_benchmark);
criterion_main!(benches);
