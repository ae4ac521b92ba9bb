use std::env;
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use emu::backup::{BackupSelection, BackupType};
use emu::emu_thread::spawn;
use emu::gba::{Gba, GbaConfig};
use emu::hardware::Hardware;
use emu::keypad::Key;
use emu::message::Message;
use pretty_assertions::assert_eq;

/// Counts the frames it is asked to run, shared with the test thread.
#[derive(Clone, Default)]
struct FrameCounter {
    frames: Arc<Mutex<u32>>,
}

impl FrameCounter {
    fn frames(&self) -> u32 {
        *self.frames.lock().unwrap()
    }

    fn wait_for(&self, frames: u32) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while self.frames() < frames {
            assert!(Instant::now() < deadline, "emulator thread did not run");
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Hardware for FrameCounter {
    fn cleanup(&mut self) {}

    fn init(&mut self, _gba: &mut Gba) {}

    fn run_for(&mut self, gba: &mut Gba, _cycles: u32) {
        *self.frames.lock().unwrap() += 1;
        // Pretend the game saved.
        if let Some(byte) = gba.memory.backup.data_mut().first_mut() {
            *byte = 0x42;
        }
    }
}

#[test]
fn run_and_shutdown() {
    let counter = FrameCounter::default();
    let handle = spawn(Gba::default(), counter.clone());

    handle.send(Message::LoadRom(vec![0; 255]));
    handle.send(Message::SetBackupType(BackupSelection::Manual(
        BackupType::Sram,
    )));
    handle.send(Message::Run { speed: 0 });
    counter.wait_for(5);
    handle.send(Message::Pause);

    let backup_mailbox = handle.backup_mailbox();
    let gba = handle.shutdown();

    assert!(gba.started);
    assert_eq!(gba.memory.rom_size(), 255);
    assert_eq!(backup_mailbox.take().map(|data| data[0]), Some(0x42));
}

#[test]
fn backup_is_published_while_running() {
    let counter = FrameCounter::default();
    let handle = spawn(Gba::default(), counter.clone());
    let backup_mailbox = handle.backup_mailbox();

    handle.send(Message::SetBackupType(BackupSelection::Manual(
        BackupType::Flash64,
    )));
    handle.send(Message::Run { speed: 0 });
    counter.wait_for(1);

    let deadline = Instant::now() + Duration::from_secs(10);
    let data = loop {
        if let Some(data) = backup_mailbox.take() {
            break data;
        }
        assert!(Instant::now() < deadline, "backup never published");
        thread::sleep(Duration::from_millis(1));
    };

    assert_eq!(data.len(), BackupType::Flash64.size());
    assert_eq!(data[0], 0x42);
    drop(handle);
}

#[test]
fn paced_run_keeps_real_time() {
    let counter = FrameCounter::default();
    let handle = spawn(Gba::default(), counter.clone());

    // Ten frames at 4x are about 42ms of wall-clock time.
    let start = Instant::now();
    handle.send(Message::Run { speed: 4 });
    counter.wait_for(10);

    assert!(start.elapsed() >= Duration::from_millis(30));
    drop(handle);
}

#[test]
fn producers_on_many_threads() {
    let counter = FrameCounter::default();
    let handle = spawn(Gba::default(), counter);

    let producers: Vec<_> = [Key::A, Key::B, Key::L, Key::R]
        .into_iter()
        .map(|key| {
            let queue = handle.queue();
            thread::spawn(move || {
                for i in 0..100 {
                    queue.push(Message::KeyInput {
                        key,
                        pressed: i % 2 == 0,
                    });
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    // Each producer ended on a release.
    let gba = handle.shutdown();
    assert_eq!(gba.keypad.key_input, 0x03FF);
}

/// Set in the child process that is expected to die on a bus fault.
const BUS_FAULT_CHILD: &str = "KUMQUAT_BUS_FAULT_CHILD";

#[test]
fn bus_fault_aborts_the_process() {
    struct Wild;

    impl Hardware for Wild {
        fn cleanup(&mut self) {}

        fn init(&mut self, gba: &mut Gba) {
            gba.bus.write32(0x0400_0000, 0);
        }

        fn run_for(&mut self, _gba: &mut Gba, _cycles: u32) {}
    }

    if env::var_os(BUS_FAULT_CHILD).is_some() {
        let gba = Gba::new(GbaConfig {
            memory_size: 0x100,
            big_endian: false,
        });
        let handle = spawn(gba, Wild);
        handle.send(Message::Reset);
        // Keep producing: the process must go down regardless.
        loop {
            handle.send(Message::Pause);
            thread::sleep(Duration::from_millis(1));
        }
    }

    let output = Command::new(env::current_exe().unwrap())
        .args(["bus_fault_aborts_the_process", "--exact", "--nocapture"])
        .env(BUS_FAULT_CHILD, "1")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Segmentation fault: invalid write of size 32 at address 0x04000000"),
        "{stderr}"
    );
}
