//! Bar-style amplitude waveform.
//!
//! Keeps the full amplitude history of a recording and derives the window of
//! bars that fits the view. While recording the window follows the newest
//! samples; during replay a cursor walks the history one sample per tick.

use std::sync::Arc;

/// Reference peak used for normalization (maximum signed 16-bit magnitude).
pub const PEAK_AMPLITUDE: f32 = i16::MAX as f32;

/// Geometry used to lay out bars, in view units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarStyle {
    /// Horizontal distance between the left edges of adjacent bars
    pub pitch: f32,
    /// Empty space at the right of every bar
    pub gap: f32,
    /// Extra height added to every bar so silence still shows
    pub padding: f32,
    /// Fraction of the view height a full-scale sample occupies
    pub height_ratio: f32,
}

impl Default for BarStyle {
    fn default() -> Self {
        Self {
            pitch: 15.0,
            gap: 5.0,
            padding: 3.0,
            height_ratio: 0.8,
        }
    }
}

/// One drawn rectangle. Coordinates grow right and down from the view origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Bar {
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Immutable set of bars produced by one recompute.
pub type BarSnapshot = Arc<[Bar]>;

/// Amplitude history plus the bars currently on screen.
#[derive(Debug, Clone)]
pub struct WaveformView {
    width: f32,
    height: f32,
    style: BarStyle,
    /// Display heights in arrival order, one per tick
    history: Vec<f32>,
    bars: BarSnapshot,
    /// Replay position into `history`
    cursor: usize,
    /// Bumped on every invalidate so the renderer can tell when to redraw
    generation: u64,
}

impl WaveformView {
    pub fn new(width: f32, height: f32, style: BarStyle) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            style,
            history: Vec::new(),
            bars: Arc::from(Vec::new()),
            cursor: 0,
            generation: 0,
        }
    }

    /// Updates the view size. Bars are laid out with the new size on the next
    /// add or replay.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    /// Normalizes `raw_amplitude`, appends it to the history and rebuilds the
    /// window from the newest samples.
    pub fn add_amplitude(&mut self, raw_amplitude: f32) -> BarSnapshot {
        let amplitude = (raw_amplitude / PEAK_AMPLITUDE) * self.height * self.style.height_ratio;
        self.history.push(amplitude);

        let window = last_n(&self.history, self.max_bars());
        self.bars = self.layout(window);
        self.invalidate();
        self.bars.clone()
    }

    /// Shows the window ending at the replay cursor and advances the cursor.
    ///
    /// `_elapsed` is the playback time of the tick. The window is driven by the
    /// cursor alone, so replay stays in step only while ticks arrive at the
    /// cadence they had during recording.
    pub fn replay_amplitude(&mut self, _elapsed: std::time::Duration) -> BarSnapshot {
        let played = &self.history[..self.cursor.min(self.history.len())];
        let window = last_n(played, self.max_bars());
        self.bars = self.layout(window);

        self.cursor = (self.cursor + 1).min(self.history.len());
        self.invalidate();
        self.bars.clone()
    }

    /// Drops the amplitude history. The bars on screen stay until the next
    /// add or replay.
    pub fn clear_data(&mut self) {
        self.history.clear();
    }

    /// Removes all bars and rewinds replay to the start.
    pub fn clear_wave(&mut self) {
        self.bars = Arc::from(Vec::new());
        self.cursor = 0;
        self.invalidate();
    }

    /// Current bars for drawing.
    pub fn bars(&self) -> BarSnapshot {
        self.bars.clone()
    }

    pub fn history(&self) -> &[f32] {
        &self.history
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of bars that fit the current width.
    pub fn max_bars(&self) -> usize {
        if self.style.pitch <= 0.0 {
            return 0;
        }
        (self.width / self.style.pitch) as usize
    }

    fn layout(&self, amplitudes: &[f32]) -> BarSnapshot {
        let mid = self.height / 2.0;
        let BarStyle { pitch, gap, padding, .. } = self.style;

        amplitudes
            .iter()
            .enumerate()
            .map(|(i, &amp)| {
                let top = mid - amp / 2.0 - padding;
                let left = i as f32 * pitch;
                Bar {
                    left,
                    top,
                    right: left + pitch - gap,
                    bottom: top + amp + padding,
                }
            })
            .collect()
    }

    fn invalidate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

fn last_n(values: &[f32], n: usize) -> &[f32] {
    &values[values.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn view(width: f32, height: f32) -> WaveformView {
        WaveformView::new(width, height, BarStyle::default())
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_history_grows_with_each_add() {
        let mut wave = view(300.0, 200.0);
        for (i, raw) in [0.0, 100.0, 32767.0, 5.0].iter().enumerate() {
            wave.add_amplitude(*raw);
            assert_eq!(wave.history().len(), i + 1);
        }
        assert!(approx(wave.history()[1], 100.0 / PEAK_AMPLITUDE * 200.0 * 0.8));
    }

    #[test]
    fn test_peak_sample_uses_eighty_percent_of_height() {
        let mut wave = view(300.0, 200.0);
        wave.add_amplitude(PEAK_AMPLITUDE);
        assert!(approx(wave.history()[0], 160.0));
    }

    #[test]
    fn test_fifty_samples_show_last_twenty_bars() {
        let mut wave = view(300.0, 200.0);
        let mut bars = wave.bars();
        for _ in 0..50 {
            bars = wave.add_amplitude(16000.0);
        }

        assert_eq!(wave.history().len(), 50);
        assert_eq!(bars.len(), 20);
        let expected = 16000.0 / 32767.0 * 200.0 * 0.8;
        assert!(approx(wave.history()[49], expected));
        assert!((expected - 78.13).abs() < 0.01);
        // bar height includes padding
        assert!(approx(bars[0].height(), expected + 3.0));
        assert!((bars[0].height() - 81.13).abs() < 0.01);
    }

    #[test]
    fn test_bar_geometry() {
        let mut wave = view(300.0, 200.0);
        wave.add_amplitude(0.0);
        let bars = wave.add_amplitude(PEAK_AMPLITUDE);

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0], Bar { left: 0.0, top: 97.0, right: 10.0, bottom: 100.0 });
        let second = bars[1];
        assert!(approx(second.left, 15.0));
        assert!(approx(second.right, 25.0));
        assert!(approx(second.top, 100.0 - 80.0 - 3.0));
        assert!(approx(second.bottom, second.top + 160.0 + 3.0));
    }

    #[test]
    fn test_bar_count_is_bounded_by_available_history() {
        let mut wave = view(300.0, 200.0);
        for n in 1..=25 {
            let bars = wave.add_amplitude(1000.0);
            assert_eq!(bars.len(), n.min(20));
        }
    }

    #[test]
    fn test_narrow_view_has_no_bars() {
        let mut wave = view(14.0, 200.0);
        assert_eq!(wave.max_bars(), 0);
        assert!(wave.add_amplitude(1000.0).is_empty());
        assert_eq!(wave.history().len(), 1);
    }

    #[test]
    fn test_clear_data_keeps_bars_until_next_update() {
        let mut wave = view(300.0, 200.0);
        wave.add_amplitude(1000.0);
        wave.add_amplitude(2000.0);
        let before = wave.bars();

        wave.clear_data();
        assert!(wave.history().is_empty());
        assert_eq!(wave.bars(), before);

        let after = wave.add_amplitude(3000.0);
        assert_eq!(after.len(), 1);
    }

    #[test]
    fn test_replay_walks_history_from_start() {
        let mut wave = view(300.0, 200.0);
        let mut recorded = Vec::new();
        for raw in [1000.0, 2000.0, 3000.0] {
            recorded.push(wave.add_amplitude(raw));
        }

        wave.clear_wave();
        assert!(wave.bars().is_empty());
        assert_eq!(wave.cursor(), 0);

        // first replay tick shows the state before any sample arrived
        assert!(wave.replay_amplitude(Duration::from_millis(60)).is_empty());
        for (i, expected) in recorded.iter().enumerate() {
            let replayed = wave.replay_amplitude(Duration::from_millis(60 * (i as u64 + 2)));
            assert_eq!(&replayed, expected);
        }
    }

    #[test]
    fn test_replay_window_slides_like_recording() {
        let mut wave = view(45.0, 100.0);
        let mut recorded = Vec::new();
        for i in 0..6 {
            recorded.push(wave.add_amplitude(1000.0 * i as f32));
        }

        wave.clear_wave();
        wave.replay_amplitude(Duration::ZERO);
        for expected in &recorded {
            assert_eq!(&wave.replay_amplitude(Duration::ZERO), expected);
        }
        assert_eq!(wave.bars().len(), 3);
    }

    #[test]
    fn test_replay_cursor_stops_at_history_end() {
        let mut wave = view(300.0, 200.0);
        wave.add_amplitude(1000.0);
        wave.add_amplitude(2000.0);
        wave.clear_wave();

        for _ in 0..10 {
            wave.replay_amplitude(Duration::ZERO);
        }
        assert_eq!(wave.cursor(), 2);
        assert_eq!(wave.bars().len(), 2);
    }

    #[test]
    fn test_replay_without_history_is_empty() {
        let mut wave = view(300.0, 200.0);
        assert!(wave.replay_amplitude(Duration::ZERO).is_empty());
        assert_eq!(wave.cursor(), 0);
    }

    #[test]
    fn test_every_update_invalidates() {
        let mut wave = view(300.0, 200.0);
        let g0 = wave.generation();
        wave.add_amplitude(1.0);
        wave.replay_amplitude(Duration::ZERO);
        wave.clear_wave();
        assert_eq!(wave.generation(), g0 + 3);

        // clearing history alone does not redraw
        wave.clear_data();
        assert_eq!(wave.generation(), g0 + 3);
    }

    #[test]
    fn test_resize_applies_on_next_update() {
        let mut wave = view(300.0, 200.0);
        wave.add_amplitude(1000.0);
        wave.resize(30.0, 200.0);
        assert_eq!(wave.bars().len(), 1);

        wave.add_amplitude(1000.0);
        wave.add_amplitude(1000.0);
        assert_eq!(wave.bars().len(), 2);
        assert_eq!(wave.max_bars(), 2);
    }
}
