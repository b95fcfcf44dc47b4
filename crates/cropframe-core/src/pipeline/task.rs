//! Cancellable background execution for load and crop work.
//!
//! Geometry stays on the interaction thread; decode and crop work runs on a
//! worker thread and communicates back over a channel. Cancellation is
//! cooperative: the worker checks its [`CancelToken`] before starting heavy
//! work and again before publishing, so a cancelled task never delivers a
//! buffer — the result is dropped in the worker. A [`TaskSlot`] holds at
//! most one live task; starting a new one cancels and replaces the old one
//! (last writer wins), and a stale worker's send simply fails once its
//! receiver is gone. No locks are involved beyond the atomic flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::{execute, CropError, CropOutput, CropRequest};
use crate::decode::{load_sampled, DecodeError, LoadedImage, MemoryBudget, SourceOpener};
use crate::encode::OutputSink;
use crate::sample::TextureCeiling;

/// Shared cancellation flag between a task owner and its worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A running background task producing one value.
pub struct TaskHandle<T> {
    token: CancelToken,
    receiver: Receiver<T>,
    thread: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> TaskHandle<T> {
    /// Run `work` on a new worker thread.
    ///
    /// The worker observes the token twice: before doing anything and after
    /// producing the value; a cancellation seen at either point means
    /// nothing is published.
    pub fn spawn<F>(work: F) -> Self
    where
        F: FnOnce(&CancelToken) -> T + Send + 'static,
    {
        let token = CancelToken::new();
        let worker_token = token.clone();
        let (sender, receiver) = mpsc::channel();
        let thread = std::thread::spawn(move || {
            if worker_token.is_cancelled() {
                return;
            }
            let result = work(&worker_token);
            if worker_token.is_cancelled() {
                // The owner moved on while we were working; the result is
                // dropped here, never delivered.
                return;
            }
            let _ = sender.send(result);
        });
        Self {
            token,
            receiver,
            thread: Some(thread),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Non-blocking poll. `None` means not finished yet or nothing will
    /// ever arrive (cancelled).
    pub fn try_result(&self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the worker exits, then collect its result if one was
    /// published.
    pub fn wait(mut self) -> Option<T> {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        match self.receiver.try_recv() {
            Ok(value) => Some(value),
            Err(_) => None,
        }
    }
}

impl<T> Drop for TaskHandle<T> {
    fn drop(&mut self) {
        // Replaced or abandoned tasks are cancelled; the worker thread is
        // detached and winds down on its own.
        self.token.cancel();
    }
}

/// Holds at most one live task of a kind; starting a new one cancels and
/// replaces the previous one.
pub struct TaskSlot<T> {
    current: Option<TaskHandle<T>>,
}

impl<T> Default for TaskSlot<T> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<T: Send + 'static> TaskSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel whatever is running and start `work` in its place.
    pub fn start<F>(&mut self, work: F)
    where
        F: FnOnce(&CancelToken) -> T + Send + 'static,
    {
        self.cancel();
        self.current = Some(TaskHandle::spawn(work));
    }

    /// Cancel the current task, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Poll the current task; a delivered result clears the slot.
    pub fn try_result(&mut self) -> Option<T> {
        let result = self.current.as_ref()?.try_result();
        if result.is_some() {
            self.current = None;
        }
        result
    }

    /// Block for the current task's result; clears the slot either way.
    pub fn wait_result(&mut self) -> Option<T> {
        self.current.take()?.wait()
    }
}

/// Result of a background load.
pub struct LoadOutcome {
    pub source_id: String,
    pub result: Result<LoadedImage, DecodeError>,
}

/// One load slot and one crop slot per view instance.
///
/// The capabilities are shared immutably with the workers; the only mutable
/// state is the slot references, which only the scheduling thread touches.
pub struct CropScheduler {
    opener: Arc<dyn SourceOpener>,
    sink: Arc<dyn OutputSink>,
    budget: MemoryBudget,
    ceiling: TextureCeiling,
    load_slot: TaskSlot<LoadOutcome>,
    crop_slot: TaskSlot<Result<CropOutput, CropError>>,
}

impl CropScheduler {
    pub fn new(
        opener: Arc<dyn SourceOpener>,
        sink: Arc<dyn OutputSink>,
        budget: MemoryBudget,
        ceiling: TextureCeiling,
    ) -> Self {
        Self {
            opener,
            sink,
            budget,
            ceiling,
            load_slot: TaskSlot::new(),
            crop_slot: TaskSlot::new(),
        }
    }

    /// Start loading `id` for display, cancelling any load in flight.
    pub fn start_load(&mut self, id: &str, req_width: u32, req_height: u32) {
        let opener = Arc::clone(&self.opener);
        let ceiling = self.ceiling;
        let source_id = id.to_string();
        self.load_slot.start(move |_token| {
            let result = load_sampled(&*opener, &source_id, req_width, req_height, &ceiling);
            LoadOutcome { source_id, result }
        });
    }

    /// Start a crop from an immutable request snapshot, cancelling any crop
    /// in flight.
    pub fn start_crop(&mut self, request: CropRequest) {
        let opener = Arc::clone(&self.opener);
        let sink = Arc::clone(&self.sink);
        let budget = self.budget;
        self.crop_slot.start(move |_token| {
            execute(&request, &*opener, &budget, &*sink)
        });
    }

    pub fn is_loading(&self) -> bool {
        self.load_slot.is_active()
    }

    pub fn is_cropping(&self) -> bool {
        self.crop_slot.is_active()
    }

    pub fn poll_load(&mut self) -> Option<LoadOutcome> {
        self.load_slot.try_result()
    }

    pub fn poll_crop(&mut self) -> Option<Result<CropOutput, CropError>> {
        self.crop_slot.try_result()
    }

    /// Block for the pending load result.
    pub fn wait_load(&mut self) -> Option<LoadOutcome> {
        self.load_slot.wait_result()
    }

    /// Block for the pending crop result.
    pub fn wait_crop(&mut self) -> Option<Result<CropOutput, CropError>> {
        self.crop_slot.wait_result()
    }

    /// Cancel everything, e.g. when the view goes away.
    pub fn cancel_all(&mut self) {
        self.load_slot.cancel();
        self.crop_slot.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{DecodedImage, ImageReader};
    use crate::encode::EncodeError;
    use crate::geometry::rect::ImageRect;
    use crate::pipeline::{CropSource, OutputSpec};
    use crate::transform::resize::SizeMode;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc::Sender;
    use std::sync::Mutex;

    /// Payload whose drop is observable.
    struct Tracked {
        label: &'static str,
        drops: Arc<AtomicUsize>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_spawn_delivers_result() {
        let handle = TaskHandle::spawn(|_token| 2 + 2);
        assert_eq!(handle.wait(), Some(4));
    }

    #[test]
    fn test_cancelled_before_publish_is_discarded() {
        let drops = Arc::new(AtomicUsize::new(0));
        let drops_worker = Arc::clone(&drops);

        // The worker waits for the gate, so cancellation always lands
        // before it finishes.
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let handle = TaskHandle::spawn(move |_token| {
            let _ = gate_rx.recv();
            Tracked {
                label: "a",
                drops: drops_worker,
            }
        });
        handle.cancel();
        gate_tx.send(()).unwrap();

        assert!(handle.wait().is_none());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_slot_replacement_discards_first_result() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut slot: TaskSlot<Tracked> = TaskSlot::new();

        let (gate_a_tx, gate_a_rx) = mpsc::channel::<()>();
        let drops_a = Arc::clone(&drops);
        slot.start(move |_token| {
            let _ = gate_a_rx.recv();
            Tracked {
                label: "a",
                drops: drops_a,
            }
        });

        // Replacing the slot cancels task A before it finishes.
        let drops_b = Arc::clone(&drops);
        slot.start(move |_token| Tracked {
            label: "b",
            drops: drops_b,
        });
        gate_a_tx.send(()).unwrap();

        let delivered = slot.wait_result().expect("task B publishes");
        assert_eq!(delivered.label, "b");
        drop(delivered);

        // Both payloads eventually drop; only B's was ever delivered.
        while drops.load(Ordering::SeqCst) < 2 {
            std::thread::yield_now();
        }
        assert!(slot.try_result().is_none());
    }

    /// Opener whose `open` blocks until the test releases a gate token.
    struct GatedOpener {
        image: DecodedImage,
        gate: Mutex<mpsc::Receiver<()>>,
    }

    struct MemoryReader {
        image: DecodedImage,
    }

    impl ImageReader for MemoryReader {
        fn decode_bounds(&mut self) -> Result<(u32, u32), DecodeError> {
            Ok((self.image.width, self.image.height))
        }

        fn decode_whole(&mut self, _sample_size: u32) -> Result<DecodedImage, DecodeError> {
            Ok(self.image.clone())
        }

        fn decode_region(
            &mut self,
            region: ImageRect,
            _sample_size: u32,
        ) -> Result<DecodedImage, DecodeError> {
            Ok(self.image.sub_image(region))
        }
    }

    impl SourceOpener for GatedOpener {
        fn open(&self, _id: &str) -> Result<Box<dyn ImageReader>, DecodeError> {
            let _ = self.gate.lock().unwrap().recv();
            Ok(Box::new(MemoryReader {
                image: self.image.clone(),
            }))
        }
    }

    struct NullSink;
    impl OutputSink for NullSink {
        fn write(&self, _destination: &str, _bytes: &[u8]) -> Result<(), EncodeError> {
            Ok(())
        }
    }

    fn gated_scheduler(width: u32, height: u32) -> (CropScheduler, Sender<()>) {
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let image = DecodedImage::new(width, height, vec![9u8; (width * height * 3) as usize]);
        let opener = GatedOpener {
            image,
            gate: Mutex::new(gate_rx),
        };
        let scheduler = CropScheduler::new(
            Arc::new(opener),
            Arc::new(NullSink),
            MemoryBudget::unlimited(),
            TextureCeiling::default(),
        );
        (scheduler, gate_tx)
    }

    fn stream_request(points: [f32; 8], org: (u32, u32)) -> CropRequest {
        CropRequest {
            source: CropSource::Stream("img".to_string()),
            points,
            degrees_rotated: 0,
            org_width: org.0,
            org_height: org.1,
            fixed_aspect: false,
            aspect_x: 1.0,
            aspect_y: 1.0,
            req_width: 0,
            req_height: 0,
            flip_horizontally: false,
            flip_vertically: false,
            size_mode: SizeMode::None,
            output: None,
        }
    }

    #[test]
    fn test_superseding_crop_task_wins() {
        let (mut scheduler, gate) = gated_scheduler(100, 100);

        // Task A selects 10x10, task B selects 20x20; B supersedes A while
        // A is still blocked in open().
        scheduler.start_crop(stream_request(
            [0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0],
            (100, 100),
        ));
        scheduler.start_crop(stream_request(
            [0.0, 0.0, 20.0, 0.0, 20.0, 20.0, 0.0, 20.0],
            (100, 100),
        ));
        gate.send(()).unwrap();
        gate.send(()).unwrap();

        let output = scheduler
            .wait_crop()
            .expect("superseding task publishes")
            .expect("crop succeeds");
        assert_eq!(output.image.unwrap().width, 20);

        // Nothing else is ever published.
        assert!(scheduler.poll_crop().is_none());
        assert!(!scheduler.is_cropping());
    }

    #[test]
    fn test_scheduler_load_and_crop_slots_are_independent() {
        let (mut scheduler, gate) = gated_scheduler(64, 64);

        scheduler.start_load("img", 64, 64);
        scheduler.start_crop(stream_request(
            [0.0, 0.0, 32.0, 0.0, 32.0, 32.0, 0.0, 32.0],
            (64, 64),
        ));
        assert!(scheduler.is_loading());
        assert!(scheduler.is_cropping());

        gate.send(()).unwrap();
        gate.send(()).unwrap();

        let load = scheduler.wait_load().expect("load publishes");
        assert_eq!(load.source_id, "img");
        assert_eq!(load.result.unwrap().image.width, 64);

        let crop = scheduler.wait_crop().expect("crop publishes").unwrap();
        assert_eq!(crop.image.unwrap().width, 32);
    }

    #[test]
    fn test_cancel_all_silences_everything() {
        let (mut scheduler, gate) = gated_scheduler(64, 64);
        scheduler.start_load("img", 64, 64);
        scheduler.cancel_all();
        gate.send(()).unwrap();

        assert!(scheduler.wait_load().is_none());
        assert!(!scheduler.is_loading());
    }

    #[test]
    fn test_crop_task_writes_to_destination() {
        let (mut scheduler, gate) = gated_scheduler(64, 64);
        let mut request = stream_request(
            [0.0, 0.0, 32.0, 0.0, 32.0, 32.0, 0.0, 32.0],
            (64, 64),
        );
        request.output = Some(OutputSpec {
            destination: "result.jpg".to_string(),
            format: crate::encode::OutputFormat::Jpeg,
            quality: 90,
        });
        scheduler.start_crop(request);
        gate.send(()).unwrap();

        let output = scheduler.wait_crop().unwrap().unwrap();
        assert!(output.image.is_none());
        assert_eq!(output.destination.as_deref(), Some("result.jpg"));
    }
}
