use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::EventLoopExtPumpEvents;
use winit::window::{Window, WindowBuilder};

use crate::app::contracts::{EventSource, InputEvent, Key, TimeSource};

const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to create render surface: {0}")]
    CreateSurface(#[source] pixels::Error),
}

/// Polls the winit event loop once per frame and translates window events
/// into the engine's input contract.
pub struct WindowEventPump {
    event_loop: EventLoop<()>,
    window: Arc<Window>,
    pending: Vec<InputEvent>,
}

impl WindowEventPump {
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self, BackendError> {
        let event_loop = EventLoop::new().map_err(BackendError::CreateEventLoop)?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(title)
                .with_inner_size(LogicalSize::new(f64::from(width), f64::from(height)))
                .build(&event_loop)
                .map_err(BackendError::CreateWindow)?,
        );
        Ok(Self {
            event_loop,
            window,
            pending: Vec::new(),
        })
    }

    pub fn window(&self) -> Arc<Window> {
        Arc::clone(&self.window)
    }
}

impl EventSource for WindowEventPump {
    fn poll(&mut self) -> Vec<InputEvent> {
        let Self {
            event_loop,
            window,
            pending,
        } = self;
        let window_id = window.id();
        let _status = event_loop.pump_events(Some(Duration::ZERO), |event, _target| {
            let Event::WindowEvent {
                window_id: id,
                event,
            } = event
            else {
                return;
            };
            if id != window_id {
                return;
            }
            match event {
                WindowEvent::CloseRequested => pending.push(InputEvent::Quit),
                WindowEvent::KeyboardInput { event, .. } => {
                    if let Some(translated) = translate_key_event(&event) {
                        pending.push(translated);
                    }
                }
                _ => {}
            }
        });
        std::mem::take(pending)
    }
}

fn translate_key_event(event: &KeyEvent) -> Option<InputEvent> {
    translate_physical_key(
        event.physical_key,
        event.state == ElementState::Pressed,
        event.repeat,
    )
}

fn translate_physical_key(key: PhysicalKey, pressed: bool, repeat: bool) -> Option<InputEvent> {
    if repeat {
        return None;
    }
    let key = match key {
        PhysicalKey::Code(KeyCode::ArrowUp) | PhysicalKey::Code(KeyCode::KeyW) => Key::Up,
        PhysicalKey::Code(KeyCode::ArrowDown) | PhysicalKey::Code(KeyCode::KeyS) => Key::Down,
        PhysicalKey::Code(KeyCode::ArrowLeft) | PhysicalKey::Code(KeyCode::KeyA) => Key::Left,
        PhysicalKey::Code(KeyCode::ArrowRight) | PhysicalKey::Code(KeyCode::KeyD) => Key::Right,
        PhysicalKey::Code(KeyCode::Enter) | PhysicalKey::Code(KeyCode::NumpadEnter) => Key::Enter,
        PhysicalKey::Code(KeyCode::Escape) => {
            return pressed.then_some(InputEvent::Quit);
        }
        _ => return None,
    };
    Some(if pressed {
        InputEvent::KeyDown(key)
    } else {
        InputEvent::KeyUp(key)
    })
}

/// Sleeps toward the frame budget and reports the delta since the previous
/// tick, clamped so a stalled frame cannot explode the simulation step.
pub struct FrameClock {
    last: Instant,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self {
            last: Instant::now(),
        }
    }
}

impl TimeSource for FrameClock {
    fn tick(&mut self, target_fps: u32) -> f32 {
        let target = Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1)));
        let elapsed = self.last.elapsed();
        if elapsed < target {
            thread::sleep(target - elapsed);
        }
        let now = Instant::now();
        let delta = now.saturating_duration_since(self.last).min(MAX_FRAME_DELTA);
        self.last = now;
        delta.as_secs_f32()
    }
}
