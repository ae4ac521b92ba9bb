//! # Emulator Thread
//!
//! The emulated console lives on a dedicated thread. Every other thread talks to it
//! by pushing [`Message`]s into a shared [`MessageQueue`].
//!
//! ```text
//! ┌─────────────────────────┐              ┌─────────────────────────────┐
//! │     Emulator Thread     │              │   Producer threads          │
//! │                         │              │   (UI, input, scripts)      │
//! │  ┌─────────────────┐    │   Messages   │    ┌─────────────────────┐  │
//! │  │      Gba        │    │ ◄─────────── │    │     EmuHandle       │  │
//! │  │  (owned here)   │    │ (Mutex<Vec>) │    │   - send messages   │  │
//! │  └────────┬────────┘    │              │    └─────────────────────┘  │
//! │           ▼             │              │                             │
//! │  loop {                 │              │                             │
//! │    drain and apply      │              │                             │
//! │    if running:          │              │                             │
//! │      run one frame      │              │                             │
//! │    pace to frame rate   │              │                             │
//! │  }                      │              │                             │
//! └─────────────────────────┘              └─────────────────────────────┘
//! ```
//!
//! Only the queue and the [`BackupMailbox`] are shared. The [`Gba`] and the
//! [`Hardware`] driving it are touched by the emulator thread alone, until it exits and
//! hands the `Gba` back.
//!
//! A panic on the emulator thread (an invalid bus access, for instance) aborts the
//! whole process: nothing would drain the queue anymore.

use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::process;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::backup::{BackupSelection, BackupSource};
use crate::backup_mailbox::BackupMailbox;
use crate::clock::{Clock, SystemClock};
use crate::frame_pacer::{CYCLES_PER_FRAME, FramePacer};
use crate::gba::{Gba, RunState};
use crate::hardware::Hardware;
use crate::message::{DeviceState, Message};
use crate::message_queue::MessageQueue;

/// How long to wait between two polls of the queue when there is nothing to run.
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// The emulator loop, owning the console and the hardware driving it.
pub struct EmuThread<H, C = SystemClock> {
    gba: Gba,
    hardware: H,
    clock: C,
    pacer: FramePacer,
    queue: Arc<MessageQueue>,
    backup_mailbox: Arc<BackupMailbox>,
}

impl<H: Hardware, C: Clock> EmuThread<H, C> {
    pub fn new(gba: Gba, hardware: H, clock: C, queue: Arc<MessageQueue>) -> Self {
        let pacer = FramePacer::new(&clock);
        Self {
            gba,
            hardware,
            clock,
            pacer,
            queue,
            backup_mailbox: Arc::default(),
        }
    }

    /// Where the backup storage is published every time emulated code changes it.
    #[must_use]
    pub fn backup_mailbox(&self) -> Arc<BackupMailbox> {
        Arc::clone(&self.backup_mailbox)
    }

    #[must_use]
    pub const fn gba(&self) -> &Gba {
        &self.gba
    }

    #[must_use]
    pub const fn hardware(&self) -> &H {
        &self.hardware
    }

    #[must_use]
    pub const fn pacer(&self) -> &FramePacer {
        &self.pacer
    }

    /// Run until an [`Message::Exit`] is received.
    pub fn run(mut self) -> (Gba, H) {
        while self.tick().is_continue() {}
        self.publish_backup();

        tracing::info!("emulator thread exiting");
        (self.gba, self.hardware)
    }

    /// One loop iteration: apply pending messages, run a frame if running, then pace.
    pub fn tick(&mut self) -> ControlFlow<()> {
        self.process_messages()?;

        if self.gba.is_running() {
            self.hardware.run_for(&mut self.gba, CYCLES_PER_FRAME);
            self.publish_backup();
        } else if self.pacer.is_unbounded() {
            // sleep briefly to avoid busy-waiting
            self.clock.sleep(IDLE_SLEEP);
        }

        self.pacer.pace(&mut self.clock);

        ControlFlow::Continue(())
    }

    fn publish_backup(&mut self) {
        if let Some(data) = self.gba.take_dirty_backup() {
            self.backup_mailbox.publish(data);
        }
    }

    /// Apply every queued message in order. Breaks on exit, dropping whatever follows.
    fn process_messages(&mut self) -> ControlFlow<()> {
        for message in self.queue.drain_all() {
            self.process_message(message)?;
        }

        ControlFlow::Continue(())
    }

    fn process_message(&mut self, message: Message) -> ControlFlow<()> {
        match message {
            Message::Exit => return ControlFlow::Break(()),
            Message::LoadBios(data) => {
                let dropped = self.gba.memory.load_bios(&data);
                if dropped > 0 {
                    tracing::warn!("BIOS is {} bytes long, {dropped} bytes ignored", data.len());
                }
                tracing::info!("BIOS loaded");
            }
            Message::LoadRom(data) => {
                let dropped = self.gba.memory.load_rom(&data);
                if dropped > 0 {
                    tracing::warn!("ROM is {} bytes long, {dropped} bytes ignored", data.len());
                }
                tracing::info!("ROM loaded ({} bytes)", self.gba.memory.rom_size());
                self.hardware.lookup_game(&mut self.gba);
            }
            Message::LoadBackup(data) => {
                let dropped = self.gba.memory.load_backup(&data);
                if dropped > 0 {
                    tracing::warn!(
                        "backup data is {} bytes long, {dropped} bytes ignored",
                        data.len()
                    );
                }
            }
            Message::SetBackupType(selection) => self.set_backup_type(selection),
            Message::Reset => self.reset(),
            Message::Run { speed } => {
                self.gba.started = true;
                self.gba.run_state = RunState::Running;
                self.gba.speed = speed;
                self.pacer.set_speed(speed);
            }
            Message::Pause => self.gba.run_state = RunState::Paused,
            Message::KeyInput { key, pressed } => self.gba.set_key(key, pressed),
            Message::Quickload(path) => {
                // Run control belongs to the producers, not to the save state.
                let (run_state, started, speed) =
                    (self.gba.run_state, self.gba.started, self.gba.speed);

                match self.hardware.quickload(&mut self.gba, &path) {
                    Ok(()) => tracing::info!("state loaded from {}", path.display()),
                    Err(e) => tracing::error!("quickload from {} failed: {e}", path.display()),
                }

                self.gba.run_state = run_state;
                self.gba.started = started;
                self.gba.speed = speed;
            }
            Message::Quicksave(path) => match self.hardware.quicksave(&self.gba, &path) {
                Ok(()) => tracing::info!("state saved to {}", path.display()),
                Err(e) => tracing::error!("quicksave to {} failed: {e}", path.display()),
            },
            Message::SetAudioResampleFreq(frequency) => self.gba.resample_frequency = frequency,
            Message::SetColorCorrection(enabled) => self.gba.color_correction = enabled,
            Message::SetRtcState(state) => self.set_rtc_state(state),
        }

        ControlFlow::Continue(())
    }

    fn set_backup_type(&mut self, selection: BackupSelection) {
        if self.gba.started {
            tracing::debug!("game already started, backup type change ignored");
            return;
        }

        let backup = match selection {
            BackupSelection::AutoDetect => {
                let kind = self.hardware.detect_backup(&self.gba);
                let backup = &mut self.gba.memory.backup;
                backup.kind = kind;
                backup.source = BackupSource::AutoDetect;
                backup
            }
            BackupSelection::Manual(kind) => {
                let backup = &mut self.gba.memory.backup;
                backup.kind = kind;
                backup.source = BackupSource::Manual;
                backup
            }
        };
        backup.init();

        tracing::info!("backup storage: {:?} ({:?})", backup.kind, backup.source);
    }

    fn set_rtc_state(&mut self, state: DeviceState) {
        if self.gba.started {
            tracing::debug!("game already started, RTC change ignored");
            return;
        }

        let rtc = &mut self.gba.rtc;
        (rtc.auto_detect, rtc.enabled) = match state {
            DeviceState::AutoDetect => (true, false),
            DeviceState::Enabled => (false, true),
            DeviceState::Disabled => (false, false),
        };
    }

    fn reset(&mut self) {
        self.hardware.cleanup();
        self.gba.reset_memory_and_io();
        self.hardware.init(&mut self.gba);
        self.gba.started = false;

        tracing::debug!("reset");
    }
}

/// Handle for producer threads to communicate with the emulator thread.
pub struct EmuHandle {
    queue: Arc<MessageQueue>,
    backup_mailbox: Arc<BackupMailbox>,
    thread_handle: Option<JoinHandle<Gba>>,
}

impl EmuHandle {
    /// Send a message to the emulator thread.
    pub fn send(&self, message: Message) {
        self.queue.push(message);
    }

    /// The queue itself, for producers living on other threads.
    #[must_use]
    pub fn queue(&self) -> Arc<MessageQueue> {
        Arc::clone(&self.queue)
    }

    /// Backup content written by the game, for the frontend to persist while running.
    ///
    /// The last copy is published when the thread exits, so it is still reachable after
    /// [`EmuHandle::shutdown`].
    #[must_use]
    pub fn backup_mailbox(&self) -> Arc<BackupMailbox> {
        Arc::clone(&self.backup_mailbox)
    }

    /// Stop the emulator thread and take the console back.
    ///
    /// # Panics
    ///
    /// Re-raises a panic of the emulator thread, although the thread started by
    /// [`spawn`] aborts the process before it can be joined.
    #[must_use]
    pub fn shutdown(mut self) -> Gba {
        self.queue.push(Message::Exit);
        let handle = self
            .thread_handle
            .take()
            .expect("the thread handle is only taken here or on drop");

        match handle.join() {
            Ok(gba) => gba,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

impl Drop for EmuHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            self.queue.push(Message::Exit);
            let _ = handle.join();
        }
    }
}

/// Spawn the emulator thread and return a handle for communication.
pub fn spawn<H: Hardware + 'static>(gba: Gba, hardware: H) -> EmuHandle {
    let queue = Arc::new(MessageQueue::new());
    let emu_thread = EmuThread::new(gba, hardware, SystemClock::default(), Arc::clone(&queue));
    let backup_mailbox = emu_thread.backup_mailbox();

    let thread_handle = thread::spawn(move || {
        match panic::catch_unwind(AssertUnwindSafe(|| emu_thread.run())) {
            Ok((gba, _)) => gba,
            Err(_) => {
                // The panic message has already been printed by the hook.
                tracing::error!("fatal error on the emulator thread, aborting");
                process::abort()
            }
        }
    });

    EmuHandle {
        queue,
        backup_mailbox,
        thread_handle: Some(thread_handle),
    }
}
