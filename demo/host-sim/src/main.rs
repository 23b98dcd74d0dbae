// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted kernel run on the mock device.
//!
//! Plays the trap layer's role by hand: boots the kernel, issues a fixed
//! sequence of syscalls and timer ticks on behalf of imaginary user
//! programs, and dumps the resulting console transcript. Useful for eyeball
//! checks of scheduling and monitor behavior without hardware.

use drv_mock::MockDevice;
use toast_abi::Sysnum;
use toast_kern::sched::{Kernel, KernelConfig};

fn syscall(
    kernel: &mut Kernel<MockDevice>,
    running: usize,
    sysnum: Sysnum,
    mut args: [u32; 4],
) -> ([u32; 4], usize) {
    let next = kernel.route_syscall(running, sysnum as u32, &mut args);
    (args, next.unwrap_or(running))
}

fn tick(kernel: &mut Kernel<MockDevice>, running: usize) -> usize {
    kernel.device_mut().advance(1_000);
    kernel.device_mut().fire_timer();
    kernel.schedule(running)
}

fn main() {
    let config = KernelConfig {
        quantum: 0x40,
        trampoline: 0x8000,
        root_entry: 0x1_0000,
        root_param: 0,
        idle_entry: 0x2_0000,
    };
    let mut kernel = Kernel::new(config, MockDevice::new());

    // Back some user memory so the log syscall has messages to read.
    kernel.device_mut().map_user(0x9000, b"root: hello\0");
    kernel.device_mut().map_user(0x9100, b"worker: in monitor\0");
    kernel.device_mut().map_user(0x9200, b"root: got monitor back\0");

    let mut running = kernel.start();
    let root = running;

    syscall(&mut kernel, running, Sysnum::Log, [0x9000, 0, 0, 0]);

    // Root spawns a worker at its own priority and takes a monitor.
    let (args, _) =
        syscall(&mut kernel, running, Sysnum::Fork, [0x3000, 0, 0, 0]);
    let worker = args[0] as usize;
    let (args, _) = syscall(&mut kernel, running, Sysnum::MonCreate, [0; 4]);
    let mid = args[0];
    syscall(&mut kernel, running, Sysnum::MonEnter, [mid, 0, 0, 0]);

    // Quantum expires; the worker gets the CPU and blocks on the monitor.
    running = tick(&mut kernel, running);
    assert_eq!(running, worker);
    let (_, next) =
        syscall(&mut kernel, running, Sysnum::MonEnter, [mid, 0, 0, 0]);
    running = next;
    assert_eq!(running, root);

    // Root releases; ownership passes to the worker, which runs at the
    // next tick, speaks, and exits.
    syscall(&mut kernel, running, Sysnum::MonExit, [mid, 0, 0, 0]);
    running = tick(&mut kernel, running);
    while running != worker {
        running = tick(&mut kernel, running);
    }
    syscall(&mut kernel, running, Sysnum::Log, [0x9100, 0, 0, 0]);
    syscall(&mut kernel, running, Sysnum::MonExit, [mid, 0, 0, 0]);
    let (_, next) = syscall(&mut kernel, running, Sysnum::Exit, [0; 4]);
    running = next;

    // Root reclaims the monitor, reports, and sleeps out the demo.
    while running != root {
        running = tick(&mut kernel, running);
    }
    syscall(&mut kernel, running, Sysnum::MonEnter, [mid, 0, 0, 0]);
    syscall(&mut kernel, running, Sysnum::Log, [0x9200, 0, 0, 0]);
    syscall(&mut kernel, running, Sysnum::MonExit, [mid, 0, 0, 0]);
    let (_, next) =
        syscall(&mut kernel, running, Sysnum::SleepMillis, [50, 0, 0, 0]);
    running = next;

    for _ in 0..60 {
        running = tick(&mut kernel, running);
    }

    print!("{}", kernel.device().console_text());
    println!("--- final running: process {running}");
}
