//! Integration tests for the fly-scan lifecycle over mock hardware.
//!
//! These exercise the public API end to end: configure, prepare, start,
//! observe triggers, and recover, with timing driven by tokio's paused
//! clock so nothing really sleeps.

use flyscan::hardware::mock::{MockAxis, MockDetector, StuckAxis};
use flyscan::{
    AxisController, ConfigError, ConstantVelocityMove, ControllerState, DeviceError,
    MoveController, MoveProfile, ScanController, ScanError, TrajectoryMove, TriggerSchedule,
    Trajectory,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

fn one_axis() -> Vec<Arc<dyn AxisController>> {
    vec![Arc::new(MockAxis::new("x"))]
}

fn line_trajectory(values: &[f64]) -> Trajectory {
    let mut trajectory = Trajectory::new(1);
    for &value in values {
        trajectory.add_point(vec![Some(value)]).unwrap();
    }
    trajectory
}

#[tokio::test(start_paused = true)]
async fn constant_velocity_scan_fires_six_triggers_in_order() {
    let axis = Arc::new(MockAxis::new("x"));
    let mut controller = MoveController::new(vec![axis.clone()]);

    controller
        .configure_profile(MoveProfile::ConstantVelocity(ConstantVelocityMove::new(
            0.0, 10.0, 2.0, 0.25,
        )))
        .await
        .unwrap();
    assert!((controller.total_time().unwrap() - 1.5).abs() < 1e-12);

    let mut events = controller.subscribe();
    controller.prepare_for_move().await.unwrap();
    assert_eq!(axis.current_position().await, 0.0);

    controller.start_move().await.unwrap();
    controller.wait_while_moving().await.unwrap();

    for (index, expected) in [0.0, 2.0, 4.0, 6.0, 8.0, 10.0].iter().enumerate() {
        let event = events.recv().await.unwrap();
        assert_eq!(event.index, index);
        assert_eq!(event.positions, vec![Some(*expected)]);
    }
    assert!(events.try_recv().is_err());

    assert_eq!(controller.state(), ControllerState::Idle);
    assert_eq!(axis.current_position().await, 10.0);
}

#[tokio::test(start_paused = true)]
async fn cancel_mid_move_delivers_a_prefix_and_resets_clean() {
    let mut controller = MoveController::new(one_axis());
    controller
        .configure(
            line_trajectory(&[0.0, 1.0, 2.0, 3.0, 4.0]),
            TriggerSchedule::uniform(10.0).unwrap(),
        )
        .await
        .unwrap();

    let mut events = controller.subscribe();
    controller.prepare_for_move().await.unwrap();
    controller.start_move().await.unwrap();

    // Let points 0..=2 fire, then abort while point 3's interval runs.
    for expected in 0..3 {
        assert_eq!(events.recv().await.unwrap().index, expected);
    }
    let stop_started = tokio::time::Instant::now();
    controller.stop_and_reset().await.unwrap();

    // Cooperative cancel lands within one point interval.
    assert!(stop_started.elapsed() <= Duration::from_secs(10));
    assert_eq!(controller.state(), ControllerState::Idle);
    assert!(!controller.is_moving());

    // No further triggers after the cancel.
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn stop_and_reset_lands_in_idle_from_every_state() {
    // Idle, twice in a row.
    let mut controller = MoveController::new(one_axis());
    tokio_test::assert_ok!(controller.stop_and_reset().await);
    tokio_test::assert_ok!(controller.stop_and_reset().await);
    assert_eq!(controller.state(), ControllerState::Idle);

    // Configured.
    controller
        .configure(
            line_trajectory(&[0.0, 1.0]),
            TriggerSchedule::uniform(0.1).unwrap(),
        )
        .await
        .unwrap();
    controller.stop_and_reset().await.unwrap();
    assert_eq!(controller.state(), ControllerState::Idle);
    assert!(matches!(
        controller.total_time(),
        Err(ConfigError::ScheduleUnset)
    ));

    // Prepared.
    controller
        .configure(
            line_trajectory(&[0.0, 1.0]),
            TriggerSchedule::uniform(0.1).unwrap(),
        )
        .await
        .unwrap();
    controller.prepare_for_move().await.unwrap();
    controller.stop_and_reset().await.unwrap();
    assert_eq!(controller.state(), ControllerState::Idle);

    // Moving.
    controller
        .configure(
            line_trajectory(&[0.0, 1.0, 2.0]),
            TriggerSchedule::uniform(100.0).unwrap(),
        )
        .await
        .unwrap();
    controller.prepare_for_move().await.unwrap();
    controller.start_move().await.unwrap();
    controller.stop_and_reset().await.unwrap();
    assert_eq!(controller.state(), ControllerState::Idle);
    assert!(!controller.is_moving());

    // Error, via a stuck axis.
    let mut stuck = MoveController::new(vec![Arc::new(StuckAxis::new("jam"))]);
    stuck
        .configure(
            line_trajectory(&[0.0, 1.0]),
            TriggerSchedule::uniform(0.1).unwrap(),
        )
        .await
        .unwrap();
    assert!(stuck.prepare_for_move().await.is_err());
    assert_eq!(stuck.state(), ControllerState::Error);
    stuck.stop_and_reset().await.unwrap();
    assert_eq!(stuck.state(), ControllerState::Idle);
}

#[tokio::test]
async fn start_move_without_configuration_spawns_nothing() {
    let mut controller = MoveController::new(one_axis());
    let err = controller.start_move().await.unwrap_err();
    assert!(matches!(
        err,
        ScanError::Device(DeviceError::InvalidState { .. })
    ));
    assert!(!controller.is_moving());

    // The controller is still usable without a reset.
    controller
        .configure(
            line_trajectory(&[0.0]),
            TriggerSchedule::uniform(0.1).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(controller.state(), ControllerState::Configured);
}

#[tokio::test(start_paused = true)]
async fn wait_while_moving_is_a_no_op_when_idle() {
    let mut controller = MoveController::new(one_axis());
    controller.wait_while_moving().await.unwrap();
    assert_eq!(controller.state(), ControllerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn explicit_trajectory_with_deltas_runs_to_completion() {
    let mut profile = TrajectoryMove::new(2);
    profile.set_axis_trajectory(0, vec![0.0, 1.0, 2.0]).unwrap();
    profile.set_axis_trajectory(1, vec![7.0, 7.0, 7.0]).unwrap();
    profile.set_trigger_deltas(vec![0.5, 0.25, 0.25]).unwrap();

    let x = Arc::new(MockAxis::new("x"));
    let y = Arc::new(MockAxis::new("y"));
    let mut controller = MoveController::new(vec![x.clone(), y.clone()]);

    controller
        .configure_profile(MoveProfile::Trajectory(profile))
        .await
        .unwrap();
    assert!((controller.total_time().unwrap() - 1.0).abs() < 1e-12);

    let started = tokio::time::Instant::now();
    controller.prepare_for_move().await.unwrap();
    controller.start_move().await.unwrap();
    controller.wait_while_moving().await.unwrap();

    // The move spans the sum of its deltas on the virtual clock.
    assert!(started.elapsed() >= Duration::from_secs_f64(1.0));
    assert_eq!(x.current_position().await, 2.0);
    assert_eq!(y.current_position().await, 7.0);
    assert_eq!(controller.state(), ControllerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn scan_controller_arms_and_triggers_detectors() {
    let controller = MoveController::new(one_axis());
    let mut scan = ScanController::new(controller);

    let detector = Arc::new(MockDetector::new("pilatus"));
    scan.set_detectors(vec![detector.clone()]).unwrap();

    scan.configure(
        line_trajectory(&[0.0, 1.0, 2.0]),
        TriggerSchedule::uniform(0.1).unwrap(),
    )
    .await
    .unwrap();
    scan.prepare_for_move().await.unwrap();
    assert!(detector.is_armed());

    scan.start_move().await.unwrap();
    scan.wait_while_moving().await.unwrap();
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }

    assert_eq!(detector.trigger_count(), 3);
    assert_eq!(scan.point_being_prepared(), 3);
    assert_eq!(scan.state(), ControllerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn controller_is_reusable_after_a_completed_scan() {
    let mut controller = MoveController::new(one_axis());

    for run in 0..2 {
        controller
            .configure(
                line_trajectory(&[0.0, 1.0]),
                TriggerSchedule::uniform(0.1).unwrap(),
            )
            .await
            .unwrap();
        controller.prepare_for_move().await.unwrap();
        controller.start_move().await.unwrap();
        controller.wait_while_moving().await.unwrap();
        assert_eq!(
            controller.state(),
            ControllerState::Idle,
            "run {run} should land in Idle"
        );
    }
}
