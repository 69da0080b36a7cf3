//! CPU/GPU frame pacing for a rotating set of frame slots.
//!
//! Every slot (back buffer, command allocator, constant buffer) is tagged with
//! the fence value that the queue signals once the slot's last submission has
//! executed. Before a slot is recorded into again the pacer blocks until the
//! fence has reached that value, and not any longer.

use eyre::bail;
use tracing::trace;

/// The GPU side of the fence: a queue that can signal values and a fence whose
/// completed value can be observed and waited on.
pub trait GpuTimeline {
    /// Enqueues a signal of `value` behind all work submitted so far.
    fn signal(&mut self, value: u64) -> eyre::Result<()>;

    /// The highest value the GPU has reached.
    fn completed_value(&self) -> u64;

    /// Blocks the calling thread until `completed_value() >= value`. No timeout.
    fn wait_for_value(&mut self, value: u64) -> eyre::Result<()>;
}

/// The display side: presents the current back buffer and reports which back
/// buffer comes next.
pub trait Presenter {
    fn present(&mut self, sync_interval: u32) -> eyre::Result<()>;
    fn current_back_buffer_index(&self) -> u32;
}

/// Lifecycle of a frame slot as seen from the CPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Recording,
    Submitted,
}

pub struct FramePacer<const N: usize> {
    frame_index: usize,
    fence_values: [u64; N],
    slot_states: [SlotState; N],
    last_signaled: u64,
    pending_submission: bool,
}

impl<const N: usize> FramePacer<N> {
    /// Value the fence object must be created with.
    pub const INITIAL_FENCE_VALUE: u64 = 0;

    /// Starts pacing at the back buffer the swap chain currently reports.
    pub fn new(frame_index: u32) -> eyre::Result<Self> {
        let frame_index = frame_index as usize;
        if frame_index >= N {
            bail!("back buffer index {frame_index} out of range for {N} frame slots");
        }
        let mut fence_values = [Self::INITIAL_FENCE_VALUE; N];
        fence_values[frame_index] += 1;
        Ok(Self {
            frame_index,
            fence_values,
            slot_states: [SlotState::Idle; N],
            last_signaled: Self::INITIAL_FENCE_VALUE,
            pending_submission: false,
        })
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn fence_value(&self, slot: usize) -> u64 {
        self.fence_values[slot]
    }

    pub fn last_signaled(&self) -> u64 {
        self.last_signaled
    }

    pub fn slot_state(&self, slot: usize) -> SlotState {
        self.slot_states[slot]
    }

    /// Marks the current slot as being recorded and returns its index.
    pub fn begin_recording(&mut self) -> usize {
        debug_assert_ne!(
            self.slot_states[self.frame_index],
            SlotState::Submitted,
            "slot {} recorded before its previous submission retired",
            self.frame_index
        );
        self.slot_states[self.frame_index] = SlotState::Recording;
        self.frame_index
    }

    /// Records that command lists were executed on the queue since the last
    /// signal.
    pub fn mark_submitted(&mut self) {
        self.slot_states[self.frame_index] = SlotState::Submitted;
        self.pending_submission = true;
    }

    /// Blocks until every submission made so far has completed on the GPU.
    ///
    /// A second call with no submission in between signals nothing and does
    /// not wait.
    pub fn wait_for_gpu<T: GpuTimeline>(&mut self, timeline: &mut T) -> eyre::Result<()> {
        if self.pending_submission {
            let value = self.fence_values[self.frame_index];
            timeline.signal(value)?;
            self.last_signaled = value;
            self.fence_values[self.frame_index] += 1;
            self.pending_submission = false;
        }

        if timeline.completed_value() < self.last_signaled {
            trace!(value = self.last_signaled, "draining gpu");
            timeline.wait_for_value(self.last_signaled)?;
        }

        self.slot_states = [SlotState::Idle; N];
        Ok(())
    }

    /// Presents the current back buffer, then moves to the next slot, waiting
    /// only if that slot's last submission has not retired yet.
    ///
    /// When this returns the new current slot may be written by the host.
    pub fn present<P: Presenter, T: GpuTimeline>(
        &mut self,
        presenter: &mut P,
        timeline: &mut T,
        sync_interval: u32,
    ) -> eyre::Result<()> {
        // On failure nothing is signaled and the submission stays pending,
        // so a later wait_for_gpu still drains it.
        presenter.present(sync_interval)?;

        // Tag the slot just presented with the value the queue reaches once
        // its command list has executed.
        let current_value = self.fence_values[self.frame_index];
        timeline.signal(current_value)?;
        self.last_signaled = current_value;
        self.pending_submission = false;
        self.slot_states[self.frame_index] = SlotState::Submitted;

        // The swap chain decides which back buffer comes next.
        let next_index = presenter.current_back_buffer_index() as usize;
        if next_index >= N {
            bail!("swap chain reported back buffer {next_index}, only {N} frame slots exist");
        }
        self.frame_index = next_index;

        // Block only while the next slot's previous frame is still in flight.
        let retire_value = self.fence_values[next_index];
        if timeline.completed_value() < retire_value {
            trace!(slot = next_index, value = retire_value, "waiting for frame slot");
            timeline.wait_for_value(retire_value)?;
        }
        self.slot_states[next_index] = SlotState::Idle;

        // The next signal must exceed every value handed out so far.
        self.fence_values[next_index] = current_value + 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// GPU that only makes progress when it is waited on, unless `keeps_up`.
    #[derive(Default)]
    struct MockTimeline {
        completed: u64,
        keeps_up: bool,
        signals: Vec<u64>,
        waits: Vec<u64>,
    }

    impl GpuTimeline for MockTimeline {
        fn signal(&mut self, value: u64) -> eyre::Result<()> {
            self.signals.push(value);
            if self.keeps_up {
                self.completed = self.completed.max(value);
            }
            Ok(())
        }

        fn completed_value(&self) -> u64 {
            self.completed
        }

        fn wait_for_value(&mut self, value: u64) -> eyre::Result<()> {
            self.waits.push(value);
            self.completed = self.completed.max(value);
            Ok(())
        }
    }

    struct MockSwapChain {
        index: u32,
        buffer_count: u32,
        presented: Vec<(u32, u32)>,
        device_removed: bool,
    }

    impl MockSwapChain {
        fn new(index: u32, buffer_count: u32) -> Self {
            Self {
                index,
                buffer_count,
                presented: Vec::new(),
                device_removed: false,
            }
        }
    }

    impl Presenter for MockSwapChain {
        fn present(&mut self, sync_interval: u32) -> eyre::Result<()> {
            if self.device_removed {
                bail!("device removed");
            }
            self.presented.push((self.index, sync_interval));
            self.index = (self.index + 1) % self.buffer_count;
            Ok(())
        }

        fn current_back_buffer_index(&self) -> u32 {
            self.index
        }
    }

    fn render_frame<const N: usize>(
        pacer: &mut FramePacer<N>,
        swap_chain: &mut MockSwapChain,
        timeline: &mut MockTimeline,
    ) {
        pacer.begin_recording();
        pacer.mark_submitted();
        pacer.present(swap_chain, timeline, 1).unwrap();
    }

    #[test]
    fn new_bumps_current_slot_only() {
        let pacer = FramePacer::<2>::new(1).unwrap();
        assert_eq!(pacer.frame_index(), 1);
        assert_eq!(pacer.fence_value(0), 0);
        assert_eq!(pacer.fence_value(1), 1);
        assert!(FramePacer::<2>::new(2).is_err());
    }

    #[test]
    fn slot_is_never_reused_before_its_fence_retires() {
        let mut pacer = FramePacer::<2>::new(0).unwrap();
        let mut swap_chain = MockSwapChain::new(0, 2);
        let mut timeline = MockTimeline::default();
        let mut last_signal_per_slot = [None; 2];

        for _ in 0..50 {
            let slot = pacer.frame_index();
            if let Some(value) = last_signal_per_slot[slot] {
                assert!(
                    timeline.completed_value() >= value,
                    "slot {slot} reused at {} before {value} retired",
                    timeline.completed_value()
                );
            }
            render_frame(&mut pacer, &mut swap_chain, &mut timeline);
            last_signal_per_slot[slot] = timeline.signals.last().copied();
        }
        assert!(!timeline.waits.is_empty());
    }

    #[test]
    fn slot_order_follows_the_swap_chain() {
        let mut pacer = FramePacer::<3>::new(1).unwrap();
        let mut swap_chain = MockSwapChain::new(1, 3);
        let mut timeline = MockTimeline::default();

        let mut visited = vec![pacer.frame_index()];
        for _ in 0..7 {
            render_frame(&mut pacer, &mut swap_chain, &mut timeline);
            assert_eq!(
                pacer.frame_index(),
                swap_chain.current_back_buffer_index() as usize
            );
            visited.push(pacer.frame_index());
        }
        assert_eq!(visited, vec![1, 2, 0, 1, 2, 0, 1, 2]);
        let presented: Vec<u32> = swap_chain.presented.iter().map(|(i, _)| *i).collect();
        assert_eq!(presented, vec![1, 2, 0, 1, 2, 0, 1]);
    }

    #[test]
    fn out_of_range_back_buffer_index_is_an_error() {
        let mut pacer = FramePacer::<2>::new(0).unwrap();
        let mut swap_chain = MockSwapChain::new(0, 3);
        let mut timeline = MockTimeline::default();
        render_frame(&mut pacer, &mut swap_chain, &mut timeline);
        pacer.mark_submitted();
        assert!(pacer.present(&mut swap_chain, &mut timeline, 1).is_err());
    }

    #[test]
    fn signaled_values_strictly_increase() {
        let mut pacer = FramePacer::<2>::new(0).unwrap();
        let mut swap_chain = MockSwapChain::new(0, 2);
        let mut timeline = MockTimeline::default();

        for frame in 0..20 {
            render_frame(&mut pacer, &mut swap_chain, &mut timeline);
            if frame % 5 == 0 {
                pacer.mark_submitted();
                pacer.wait_for_gpu(&mut timeline).unwrap();
            }
        }
        assert!(timeline.signals.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn no_wait_when_gpu_keeps_up() {
        let mut pacer = FramePacer::<2>::new(0).unwrap();
        let mut swap_chain = MockSwapChain::new(0, 2);
        let mut timeline = MockTimeline {
            keeps_up: true,
            ..Default::default()
        };
        for _ in 0..10 {
            render_frame(&mut pacer, &mut swap_chain, &mut timeline);
        }
        assert!(timeline.waits.is_empty());
        assert_eq!(timeline.signals.len(), 10);
    }

    #[test]
    fn wait_for_gpu_twice_is_a_no_op_the_second_time() {
        let mut pacer = FramePacer::<2>::new(0).unwrap();
        let mut swap_chain = MockSwapChain::new(0, 2);
        let mut timeline = MockTimeline::default();
        render_frame(&mut pacer, &mut swap_chain, &mut timeline);
        render_frame(&mut pacer, &mut swap_chain, &mut timeline);

        pacer.wait_for_gpu(&mut timeline).unwrap();
        assert_eq!(timeline.completed_value(), pacer.last_signaled());

        let signals = timeline.signals.len();
        let waits = timeline.waits.len();
        let fence_values = [pacer.fence_value(0), pacer.fence_value(1)];

        pacer.wait_for_gpu(&mut timeline).unwrap();
        assert_eq!(timeline.signals.len(), signals);
        assert_eq!(timeline.waits.len(), waits);
        assert_eq!([pacer.fence_value(0), pacer.fence_value(1)], fence_values);
    }

    #[test]
    fn wait_for_gpu_signals_pending_upload_work() {
        let mut pacer = FramePacer::<2>::new(0).unwrap();
        let mut timeline = MockTimeline::default();

        pacer.mark_submitted();
        pacer.wait_for_gpu(&mut timeline).unwrap();
        assert_eq!(timeline.signals, vec![1]);
        assert_eq!(timeline.waits, vec![1]);
        assert_eq!(pacer.fence_value(0), 2);

        let mut swap_chain = MockSwapChain::new(0, 2);
        render_frame(&mut pacer, &mut swap_chain, &mut timeline);
        assert_eq!(timeline.signals, vec![1, 2]);
        assert_eq!(pacer.fence_value(1), 3);
    }

    #[test]
    fn failed_present_still_drains_the_gpu_once() {
        let mut pacer = FramePacer::<2>::new(0).unwrap();
        let mut swap_chain = MockSwapChain::new(0, 2);
        let mut timeline = MockTimeline::default();
        render_frame(&mut pacer, &mut swap_chain, &mut timeline);
        assert_eq!(timeline.signals, vec![1]);

        swap_chain.device_removed = true;
        pacer.begin_recording();
        pacer.mark_submitted();
        assert!(pacer.present(&mut swap_chain, &mut timeline, 1).is_err());
        assert_eq!(timeline.signals, vec![1]);
        assert_eq!(pacer.frame_index(), 1);

        let pending_value = pacer.fence_value(1);
        pacer.wait_for_gpu(&mut timeline).unwrap();
        assert_eq!(timeline.signals, vec![1, pending_value]);
        assert_eq!(timeline.completed_value(), pending_value);
        assert_eq!(pacer.slot_state(1), SlotState::Idle);

        let waits = timeline.waits.len();
        pacer.wait_for_gpu(&mut timeline).unwrap();
        assert_eq!(timeline.signals, vec![1, pending_value]);
        assert_eq!(timeline.waits.len(), waits);
    }

    #[test]
    fn slot_states_cycle_through_recording_and_submission() {
        let mut pacer = FramePacer::<2>::new(0).unwrap();
        let mut swap_chain = MockSwapChain::new(0, 2);
        let mut timeline = MockTimeline::default();

        assert_eq!(pacer.slot_state(0), SlotState::Idle);
        pacer.begin_recording();
        assert_eq!(pacer.slot_state(0), SlotState::Recording);
        pacer.mark_submitted();
        assert_eq!(pacer.slot_state(0), SlotState::Submitted);
        pacer.present(&mut swap_chain, &mut timeline, 1).unwrap();
        assert_eq!(pacer.slot_state(0), SlotState::Submitted);
        assert_eq!(pacer.slot_state(1), SlotState::Idle);

        pacer.wait_for_gpu(&mut timeline).unwrap();
        assert_eq!(pacer.slot_state(0), SlotState::Idle);
    }

    #[test]
    fn sync_interval_is_forwarded() {
        let mut pacer = FramePacer::<2>::new(0).unwrap();
        let mut swap_chain = MockSwapChain::new(0, 2);
        let mut timeline = MockTimeline::default();
        pacer.mark_submitted();
        pacer.present(&mut swap_chain, &mut timeline, 0).unwrap();
        assert_eq!(swap_chain.presented, vec![(0, 0)]);
    }
}
