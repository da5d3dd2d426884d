use std::cell::{Cell, RefCell};
use std::error::Error;
use std::rc::Rc;

use tracing::{debug, warn};

use super::scene::{NavHandle, Scene, UiPopHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Complete,
}

pub type TaskError = Box<dyn Error>;

/// A cooperative unit of work advanced once per frame by the scheduler.
/// Suspension is explicit: a task that is waiting returns `Pending` and is
/// polled again next frame.
pub trait FrameTask {
    fn poll(&mut self, nav: &NavHandle) -> Result<TaskStatus, TaskError>;
}

impl<F> FrameTask for F
where
    F: FnMut(&NavHandle) -> Result<TaskStatus, TaskError>,
{
    fn poll(&mut self, nav: &NavHandle) -> Result<TaskStatus, TaskError> {
        self(nav)
    }
}

/// A task that finishes on its first poll.
pub fn completed_task() -> Box<dyn FrameTask> {
    Box::new(|_: &NavHandle| -> Result<TaskStatus, TaskError> { Ok(TaskStatus::Complete) })
}

/// Single-owner write, multi-owner read flag resolved exactly once. The
/// overlay-pop path sets it; tasks and scenes poll it.
#[derive(Debug, Clone, Default)]
pub struct CompletionSignal {
    set: Rc<Cell<bool>>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.set.set(true);
    }

    pub fn is_set(&self) -> bool {
        self.set.get()
    }
}

/// Handle to a spawned task. Completion covers success and failure alike;
/// failures are logged and swallowed so a bad interaction callback cannot
/// wedge the scene that launched it.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    done: CompletionSignal,
}

impl TaskHandle {
    pub fn is_complete(&self) -> bool {
        self.done.is_set()
    }
}

struct ScheduledTask {
    task: Box<dyn FrameTask>,
    done: CompletionSignal,
}

/// Spawn queue handle cloned into scenes and controllers. Spawned tasks start
/// running on the next scheduler tick.
#[derive(Clone, Default)]
pub struct SchedulerHandle {
    spawned: Rc<RefCell<Vec<ScheduledTask>>>,
}

impl SchedulerHandle {
    pub fn spawn(&self, task: Box<dyn FrameTask>) -> TaskHandle {
        let done = CompletionSignal::new();
        self.spawned.borrow_mut().push(ScheduledTask {
            task,
            done: done.clone(),
        });
        TaskHandle { done }
    }
}

/// Owns the running tasks and advances each one once per tick. Strictly
/// single-threaded; the game loop ticks it between event routing and the
/// simulation update.
#[derive(Default)]
pub struct FrameScheduler {
    handle: SchedulerHandle,
    running: Vec<ScheduledTask>,
}

impl FrameScheduler {
    pub fn for_handle(handle: SchedulerHandle) -> Self {
        Self {
            handle,
            running: Vec::new(),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.running.len() + self.handle.spawned.borrow().len()
    }

    pub fn tick(&mut self, nav: &NavHandle) {
        let mut spawned: Vec<ScheduledTask> = self.handle.spawned.borrow_mut().drain(..).collect();
        self.running.append(&mut spawned);

        let mut index = 0;
        while index < self.running.len() {
            match self.running[index].task.poll(nav) {
                Ok(TaskStatus::Pending) => index += 1,
                Ok(TaskStatus::Complete) => {
                    let finished = self.running.remove(index);
                    finished.done.set();
                }
                Err(error) => {
                    warn!(error = %error, "interaction_task_failed");
                    let failed = self.running.remove(index);
                    failed.done.set();
                }
            }
        }
    }
}

type OverlaySceneBuilder = Box<dyn FnOnce(UiPopHandle) -> Box<dyn Scene>>;

/// Task that pushes an overlay scene on its first poll, then waits until the
/// overlay is popped. The pop path resolves the completion signal, which is
/// observed on the following tick.
pub struct OverlayTask {
    build: Option<OverlaySceneBuilder>,
    completion: CompletionSignal,
    blocking: bool,
}

impl OverlayTask {
    pub fn overlay(build: impl FnOnce(UiPopHandle) -> Box<dyn Scene> + 'static) -> Self {
        Self {
            build: Some(Box::new(build)),
            completion: CompletionSignal::new(),
            blocking: false,
        }
    }

    pub fn blocking(build: impl FnOnce(UiPopHandle) -> Box<dyn Scene> + 'static) -> Self {
        Self {
            build: Some(Box::new(build)),
            completion: CompletionSignal::new(),
            blocking: true,
        }
    }

    pub fn boxed(self) -> Box<dyn FrameTask> {
        Box::new(self)
    }
}

impl FrameTask for OverlayTask {
    fn poll(&mut self, nav: &NavHandle) -> Result<TaskStatus, TaskError> {
        if let Some(build) = self.build.take() {
            let id = nav.push_overlay_with_completion(build, self.completion.clone(), self.blocking);
            debug!(overlay = ?id, "interaction_overlay_opened");
            return Ok(TaskStatus::Pending);
        }
        Ok(if self.completion.is_set() {
            TaskStatus::Complete
        } else {
            TaskStatus::Pending
        })
    }
}
