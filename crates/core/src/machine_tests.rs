// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::MachineId;
use proptest::prelude::*;
use yare::parameterized;

fn all_statuses() -> [MachineStatus; 7] {
    use MachineStatus::*;
    [
        Booting,
        Up,
        Integrating,
        Working,
        PendingDisintegration,
        Disintegrating,
        Disintegrated,
    ]
}

#[parameterized(
    booting_to_up = { MachineStatus::Booting, MachineStatus::Up, true },
    up_to_integrating = { MachineStatus::Up, MachineStatus::Integrating, true },
    integrating_to_working = { MachineStatus::Integrating, MachineStatus::Working, true },
    integrating_timeout = { MachineStatus::Integrating, MachineStatus::Disintegrated, true },
    working_to_pd = { MachineStatus::Working, MachineStatus::PendingDisintegration, true },
    pd_reactivation = { MachineStatus::PendingDisintegration, MachineStatus::Working, true },
    pd_to_disintegrating = { MachineStatus::PendingDisintegration, MachineStatus::Disintegrating, true },
    disintegrating_timeout = { MachineStatus::Disintegrating, MachineStatus::Disintegrated, true },
    booting_cannot_skip_to_working = { MachineStatus::Booting, MachineStatus::Working, false },
    working_cannot_regress_to_up = { MachineStatus::Working, MachineStatus::Up, false },
    disintegrated_is_terminal = { MachineStatus::Disintegrated, MachineStatus::Booting, false },
)]
fn transition_legality(from: MachineStatus, to: MachineStatus, expected: bool) {
    assert_eq!(from.is_legal_transition(&to), expected);
}

#[test]
fn display_uses_hyphenated_lowercase() {
    assert_eq!(MachineStatus::PendingDisintegration.to_string(), "pending-disintegration");
    assert_eq!(MachineStatus::Booting.to_string(), "booting");
}

#[test]
fn recompute_load_is_allocated_fraction() {
    let mut m = Machine::new(MachineId::new("m1"), Utc::now(), "site-a", "cloud", "default");
    m.slot_status = vec![
        (SlotState::Allocated, String::new()),
        (SlotState::Idle, String::new()),
        (SlotState::Idle, String::new()),
        (SlotState::Idle, String::new()),
    ];
    m.recompute_load();
    assert_eq!(m.machine_load, 0.25);
}

#[test]
fn recompute_load_no_op_on_empty_slots() {
    let mut m = Machine::new(MachineId::new("m1"), Utc::now(), "site-a", "cloud", "default");
    m.machine_load = 0.5;
    m.recompute_load();
    assert_eq!(m.machine_load, 0.5);
}

proptest! {
    #[test]
    fn legal_transitions_never_regress_except_the_two_documented_cases(
        from_idx in 0..7usize,
        to_idx in 0..7usize,
    ) {
        let statuses = all_statuses();
        let from = statuses[from_idx];
        let to = statuses[to_idx];
        if from.is_legal_transition(&to) {
            let rank = |s: MachineStatus| -> i32 {
                use MachineStatus::*;
                match s {
                    Booting => 0,
                    Up => 1,
                    Integrating => 2,
                    Working => 3,
                    PendingDisintegration => 4,
                    Disintegrating => 5,
                    Disintegrated => 6,
                }
            };
            let is_documented_regression = matches!(
                (from, to),
                (MachineStatus::PendingDisintegration, MachineStatus::Working)
                    | (MachineStatus::Integrating, MachineStatus::Disintegrated)
                    | (MachineStatus::Disintegrating, MachineStatus::Disintegrated)
            );
            prop_assert!(rank(to) >= rank(from) || is_documented_regression);
        }
    }
}
