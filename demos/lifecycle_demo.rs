//! Lifecycle demo: Drive an event loop through a full activity lifecycle.
//!
//! Plays the part of the host platform: starts the activity, hands over a
//! window and an input queue, feeds a few input events, saves state and
//! tears everything down. The application animates at ~60 fps from a timer
//! while it has a window.
//!
//! Run with `RUST_LOG=trace` to see every command.

use env_logger::Env;
use glue::{
    event_queue, Command, Glue, Handler, InputEvent, KeyAction, KeyCode, Looper, MetaState,
    MotionAction, NativeWindow, Rect, Timer, TimerId,
};
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct Animation {
    frames: u64,
    taps: u32,
    timer: TimerId,
}

impl Handler for Animation {
    fn on_command(&mut self, looper: &mut Looper, cmd: Command) {
        log::info!("app: {cmd} (activity {:?})", looper.activity_state());
        match cmd {
            Command::WindowInit => {
                let proxy = looper.proxy();
                match looper.add_timer(Timer::new(Duration::from_millis(16), move |_, _| {
                    proxy.invalidate();
                })) {
                    Ok(id) => self.timer = id,
                    Err(err) => log::error!("app: no animation: {err}"),
                }
            }
            Command::WindowTerm => {
                if !self.timer.is_none() {
                    looper.remove_timer(self.timer);
                    self.timer = TimerId::NONE;
                }
            }
            Command::ContentRectChanged => {
                log::info!("app: content area {:?}", looper.content_rect());
            }
            _ => {}
        }
    }

    fn on_input(&mut self, _looper: &mut Looper, event: InputEvent) -> bool {
        match event {
            InputEvent::Motion {
                action: MotionAction::Up,
                ..
            } => {
                self.taps += 1;
                true
            }
            InputEvent::Key { code, .. } => {
                log::info!("app: key {code:?}");
                code == KeyCode::Back
            }
            InputEvent::Motion { .. } => false,
        }
    }

    fn on_save_state(&mut self, _looper: &mut Looper) -> Option<Vec<u8>> {
        Some(format!("frames={} taps={}", self.frames, self.taps).into_bytes())
    }

    fn on_redraw(&mut self, looper: &mut Looper) {
        if looper.window().is_some() {
            self.frames += 1;
        }
    }
}

fn main() -> glue::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    println!("Activity Glue Lifecycle Demo");
    println!("============================");

    let glue = Glue::builder()
        .saved_state(b"frames=0 taps=0".to_vec())
        .spawn(Animation::default())?;

    glue.on_start()?;
    glue.on_resume()?;

    let Some(window) = NativeWindow::from_raw(0x7f00_1000) else {
        unreachable!("non-null handle");
    };
    glue.on_window_created(window)?;
    glue.on_content_rect_changed(Rect::from_edges(0, 48, 1080, 2340));
    glue.on_window_focus_changed(true);

    let (input, queue) = event_queue(64);
    glue.on_input_queue_created(queue)?;
    for i in 0..3u8 {
        let x = f32::from(i) * 100.0;
        input.push(InputEvent::Motion {
            action: MotionAction::Down,
            pointer_id: 0,
            x,
            y: 200.0,
            meta: MetaState::empty(),
        });
        input.push(InputEvent::Motion {
            action: MotionAction::Up,
            pointer_id: 0,
            x,
            y: 200.0,
            meta: MetaState::empty(),
        });
    }
    input.push(InputEvent::Key {
        action: KeyAction::Down,
        code: KeyCode::Back,
        meta: MetaState::empty(),
        repeat: 0,
    });

    // Let the animation run for a while.
    thread::sleep(Duration::from_millis(250));

    glue.on_window_focus_changed(false);
    glue.on_pause()?;
    if let Some(state) = glue.on_save_instance_state()? {
        println!("Saved state: {}", String::from_utf8_lossy(&state));
    }
    glue.on_input_queue_destroyed()?;
    glue.on_window_destroyed()?;
    glue.on_stop()?;

    let code = glue.destroy()?;
    println!("Event loop exited with code {code}");
    Ok(())
}
