// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end kernel tests, played against the mock device.
//!
//! These act as the trap layer: they call `schedule` as the timer interrupt
//! would and `route_syscall` as the software-interrupt stub would, and
//! observe the kernel's decisions through the mock.

use drv_mock::MockDevice;
use toast_abi::{
    Pid, Priority, Sysnum, MON_BLOCKED, MON_OK, REG_R0, REG_R1, SYS_LED_BLUE,
};
use toast_kern::sched::{Kernel, KernelConfig};

const QUANTUM: u32 = 0x40;
const TRAMPOLINE: u32 = 0x8000;
const ROOT_ENTRY: u32 = 0x1_0000;
const IDLE_ENTRY: u32 = 0x2_0000;

fn boot() -> (Kernel<MockDevice>, usize) {
    let config = KernelConfig {
        quantum: QUANTUM,
        trampoline: TRAMPOLINE,
        root_entry: ROOT_ENTRY,
        root_param: 0,
        idle_entry: IDLE_ENTRY,
    };
    let mut kernel = Kernel::new(config, MockDevice::new());
    let root = kernel.start();
    (kernel, root)
}

/// Issues a syscall the way the trap stub would, returning the (possibly
/// updated) argument vector and the switch decision.
fn syscall(
    kernel: &mut Kernel<MockDevice>,
    running: usize,
    sysnum: Sysnum,
    args: [u32; 4],
) -> ([u32; 4], Option<usize>) {
    let mut args = args;
    let next = kernel.route_syscall(running, sysnum as u32, &mut args);
    (args, next)
}

fn fork(
    kernel: &mut Kernel<MockDevice>,
    running: usize,
    entry: u32,
    param: u32,
    priority: u32,
) -> usize {
    let (args, next) = syscall(
        kernel,
        running,
        Sysnum::Fork,
        [entry, param, priority, 0],
    );
    assert_eq!(next, None, "fork must not switch");
    args[0] as usize
}

#[test]
fn boot_runs_root_first() {
    let (kernel, root) = boot();
    assert_eq!(root, 0);
    assert_eq!(kernel.device().timer_quantum(), Some(QUANTUM));
    assert!(kernel
        .device()
        .console_text()
        .contains("TOAST kernel starting"));
    // Root and idle exist; root is more important.
    let root_prio = kernel.procs().get(root).unwrap().priority();
    let idle_prio = kernel.procs().get(1).unwrap().priority();
    assert!(root_prio.is_more_important_than(idle_prio));
    assert_eq!(idle_prio, Priority::IDLE);
    // Startup popped root off the ready queue; idle is still waiting.
    assert!(!kernel.is_ready(root));
    assert!(kernel.is_ready(1));
}

#[test]
#[should_panic(expected = "code=14")]
fn double_start_is_fatal() {
    let (mut kernel, _) = boot();
    kernel.start();
}

#[test]
fn no_pending_timer_means_no_preemption() {
    let (mut kernel, root) = boot();
    assert_eq!(kernel.schedule(root), root);
}

#[test]
fn quantum_preempts_to_equal_priority_round_robin() {
    let (mut kernel, root) = boot();
    let a = fork(&mut kernel, root, 0x3000, 0, 1);
    let b = fork(&mut kernel, root, 0x4000, 0, 1);

    // Root parks itself; the first forked process runs.
    let (_, next) =
        syscall(&mut kernel, root, Sysnum::SleepMillis, [1000, 0, 0, 0]);
    assert_eq!(next, Some(a));

    // Each quantum rotates within the priority band.
    kernel.device_mut().fire_timer();
    assert_eq!(kernel.schedule(a), b);
    kernel.device_mut().fire_timer();
    assert_eq!(kernel.schedule(b), a);
}

#[test]
fn more_important_process_always_wins() {
    let (mut kernel, root) = boot();
    let low = fork(&mut kernel, root, 0x3000, 0, 5);
    let high = fork(&mut kernel, root, 0x4000, 0, 1);
    assert!(low < high, "creation order");

    let (_, next) = syscall(&mut kernel, root, Sysnum::Exit, [0, 0, 0, 0]);
    assert_eq!(next, Some(high));
}

#[test]
fn sleeper_is_roused_only_after_its_deadline() {
    let (mut kernel, root) = boot();
    let idle = 1;

    let (_, next) =
        syscall(&mut kernel, root, Sysnum::SleepMillis, [10, 0, 0, 0]);
    assert_eq!(next, Some(idle));
    assert!(!kernel.is_ready(root));

    // 9ms: quantum fires but root stays asleep, idle keeps running.
    kernel.device_mut().advance(9_000);
    kernel.device_mut().fire_timer();
    assert_eq!(kernel.schedule(idle), idle);
    assert!(!kernel.is_ready(root));

    // Past the deadline the next tick hands the CPU back to root.
    kernel.device_mut().advance(2_000);
    kernel.device_mut().fire_timer();
    assert_eq!(kernel.schedule(idle), root);
}

#[test]
fn yield_rotates_through_the_ready_queue() {
    let (mut kernel, root) = boot();
    let idle = 1;
    // Nothing else at root's priority: yielding comes straight back.
    let (_, next) = syscall(&mut kernel, root, Sysnum::Yield, [0; 4]);
    assert_eq!(next, Some(root));

    let (_, next) = syscall(&mut kernel, root, Sysnum::Exit, [0; 4]);
    assert_eq!(next, Some(idle));
}

#[test]
fn exit_records_code_and_never_reschedules() {
    let (mut kernel, root) = boot();
    let (_, next) = syscall(&mut kernel, root, Sysnum::Exit, [3, 0, 0, 0]);
    assert_ne!(next, Some(root));
    let dead = kernel.procs().get(root).unwrap();
    assert!(!dead.is_live());
    assert_eq!(dead.exit_code(), 3);
    assert!(!kernel.is_ready(root));
}

#[test]
fn clock_millis_reads_the_time_source() {
    let (mut kernel, root) = boot();
    kernel.device_mut().set_clock(1_234_567);
    let (args, next) =
        syscall(&mut kernel, root, Sysnum::ClockMillis, [0; 4]);
    assert_eq!(next, None);
    assert_eq!(args[0], 1_234);
}

#[test]
fn get_pid_reports_the_caller() {
    let (mut kernel, root) = boot();
    let (args, next) = syscall(&mut kernel, root, Sysnum::GetPid, [0; 4]);
    assert_eq!(next, None);
    assert_eq!(args[0], root as u32);
}

#[test]
fn set_led_reaches_the_gpio_driver() {
    let (mut kernel, root) = boot();
    let (_, next) = syscall(
        &mut kernel,
        root,
        Sysnum::SetLed,
        [SYS_LED_BLUE, 1, 0, 0],
    );
    assert_eq!(next, None);
    assert!(kernel
        .device()
        .gpio_writes()
        .contains(&(SYS_LED_BLUE, true)));
}

#[test]
fn fork_builds_the_child_and_reports_its_pid() {
    let (mut kernel, root) = boot();
    let child = fork(&mut kernel, root, 0x3000, 77, 2);
    assert_ne!(child, root);
    assert!(kernel.is_ready(child));

    let p = kernel.procs().get(child).unwrap();
    assert_eq!(p.priority(), Priority(2));
    assert_eq!(p.parent(), Some(Pid::from_index(root)));
    assert_eq!(p.save().pc, TRAMPOLINE);
    assert_eq!(p.save().regs[REG_R0], 0x3000);
    assert_eq!(p.save().regs[REG_R1], 77);
}

#[test]
#[should_panic(expected = "code=8")]
fn forking_past_the_table_is_fatal() {
    let (mut kernel, root) = boot();
    // Root and idle occupy two of the eight slots.
    for _ in 0..6 {
        fork(&mut kernel, root, 0x3000, 0, 3);
    }
    fork(&mut kernel, root, 0x3000, 0, 3);
}

#[test]
fn monitor_enter_exit_uncontended() {
    let (mut kernel, root) = boot();
    let (args, next) = syscall(&mut kernel, root, Sysnum::MonCreate, [0; 4]);
    assert_eq!(next, None);
    let mid = args[0];

    let (args, next) =
        syscall(&mut kernel, root, Sysnum::MonEnter, [mid, 0, 0, 0]);
    assert_eq!(next, None, "uncontended enter never blocks");
    assert_eq!(args[0], MON_OK);
    assert_eq!(kernel.monitors().owner_of(mid as usize), Some(root));

    let (_, next) =
        syscall(&mut kernel, root, Sysnum::MonExit, [mid, 0, 0, 0]);
    assert_eq!(next, None);
    assert_eq!(kernel.monitors().owner_of(mid as usize), None);
}

#[test]
fn contended_monitor_hands_off_on_exit() {
    let (mut kernel, root) = boot();
    let contender = fork(&mut kernel, root, 0x3000, 0, 0);
    let (args, _) = syscall(&mut kernel, root, Sysnum::MonCreate, [0; 4]);
    let mid = args[0];

    syscall(&mut kernel, root, Sysnum::MonEnter, [mid, 0, 0, 0]);

    // Hand the CPU to the contender so it can trap in itself.
    let (_, next) = syscall(&mut kernel, root, Sysnum::Yield, [0; 4]);
    assert_eq!(next, Some(contender));

    // The contender blocks and the CPU goes back to root.
    let (args, next) =
        syscall(&mut kernel, contender, Sysnum::MonEnter, [mid, 0, 0, 0]);
    assert_eq!(args[0], MON_BLOCKED);
    assert_eq!(next, Some(root));
    assert!(!kernel.is_ready(contender));

    // Root lets go: ownership transfers without a re-enter, and the new
    // owner is runnable with an OK status waiting in its r0.
    syscall(&mut kernel, root, Sysnum::MonExit, [mid, 0, 0, 0]);
    assert_eq!(kernel.monitors().owner_of(mid as usize), Some(contender));
    assert!(kernel.is_ready(contender));
    let granted = kernel.procs().get(contender).unwrap();
    assert_eq!(granted.save().regs[REG_R0], MON_OK);
}

#[test]
fn wait_and_notify_move_one_process_at_a_time() {
    let (mut kernel, root) = boot();
    let worker = fork(&mut kernel, root, 0x3000, 0, 0);
    let (args, _) = syscall(&mut kernel, root, Sysnum::MonCreate, [0; 4]);
    let mid = args[0];

    // Root takes the monitor and waits; the monitor frees up.
    syscall(&mut kernel, root, Sysnum::MonEnter, [mid, 0, 0, 0]);
    let (args, next) =
        syscall(&mut kernel, root, Sysnum::MonWait, [mid, 0, 0, 0]);
    assert_eq!(args[0], MON_BLOCKED);
    assert_eq!(next, Some(worker));
    assert_eq!(kernel.monitors().owner_of(mid as usize), None);

    // The worker acquires, notifies, and releases. Notify alone must not
    // grant ownership to the waiter.
    syscall(&mut kernel, worker, Sysnum::MonEnter, [mid, 0, 0, 0]);
    syscall(&mut kernel, worker, Sysnum::MonNotify, [mid, 0, 0, 0]);
    assert_eq!(kernel.monitors().owner_of(mid as usize), Some(worker));
    assert!(!kernel.is_ready(root));

    syscall(&mut kernel, worker, Sysnum::MonExit, [mid, 0, 0, 0]);
    assert_eq!(kernel.monitors().owner_of(mid as usize), Some(root));
    assert!(kernel.is_ready(root));
}

#[test]
#[should_panic(expected = "code=12")]
fn monitor_pool_exhaustion_is_fatal() {
    let (mut kernel, root) = boot();
    for _ in 0..5 {
        syscall(&mut kernel, root, Sysnum::MonCreate, [0; 4]);
    }
}

#[test]
#[should_panic(expected = "code=2")]
fn bad_monitor_id_is_fatal() {
    let (mut kernel, root) = boot();
    syscall(&mut kernel, root, Sysnum::MonEnter, [3, 0, 0, 0]);
}

#[test]
#[should_panic(expected = "code=3")]
fn exit_of_unowned_monitor_is_fatal() {
    let (mut kernel, root) = boot();
    let (args, _) = syscall(&mut kernel, root, Sysnum::MonCreate, [0; 4]);
    syscall(&mut kernel, root, Sysnum::MonExit, [args[0], 0, 0, 0]);
}

#[test]
fn unknown_syscall_is_reported_and_ignored() {
    let (mut kernel, root) = boot();
    let mut args = [0u32; 4];
    let next = kernel.route_syscall(root, 0x7777, &mut args);
    assert_eq!(next, None);
    assert!(kernel
        .device()
        .console_text()
        .contains("unknown syscall 0x7777"));
}

#[test]
fn log_syscall_tags_the_message_with_the_pid() {
    let (mut kernel, root) = boot();
    kernel.device_mut().map_user(0x9000, b"tick\0garbage");
    let (_, next) =
        syscall(&mut kernel, root, Sysnum::Log, [0x9000, 0, 0, 0]);
    assert_eq!(next, None);
    let text = kernel.device().console_text();
    assert!(text.contains("P0: tick\r\n"), "got: {text:?}");
    assert!(!text.contains("garbage"));
}

#[test]
fn heartbeat_led_toggles_on_each_quantum() {
    let (mut kernel, root) = boot();
    kernel.device_mut().fire_timer();
    kernel.schedule(root);
    kernel.device_mut().fire_timer();
    kernel.schedule(root);
    let writes = kernel.device().gpio_writes();
    let pulses: Vec<bool> = writes
        .iter()
        .filter(|(pin, _)| *pin == SYS_LED_BLUE)
        .map(|(_, level)| *level)
        .collect();
    assert_eq!(pulses, vec![true, false]);
}
